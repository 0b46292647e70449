//! Captured register-window snapshots.

use sid_core::Memory;

/// One immutable snapshot of the SID register window, taken right after a
/// completed play-routine invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    bytes: Box<[u8]>,
}

impl Frame {
    /// Snapshot `len` bytes starting at `base`.
    pub(crate) fn capture(memory: &Memory, base: u16, len: usize) -> Self {
        Self {
            bytes: memory.window(base, len).into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sid_core::Bus;

    #[test]
    fn capture_copies_the_window() {
        let mut mem = Memory::new();
        for i in 0..25u16 {
            mem.write(0xD400 + i, 0xA0 | i as u8);
        }

        let frame = Frame::capture(&mem, 0xD400, 25);
        assert_eq!(frame.len(), 25);
        assert_eq!(frame.bytes()[0], 0xA0);
        assert_eq!(frame.bytes()[24], 0xA0 | 24);

        // Snapshots are copies: later writes don't leak in.
        mem.write(0xD400, 0x00);
        assert_eq!(frame.bytes()[0], 0xA0);
    }
}
