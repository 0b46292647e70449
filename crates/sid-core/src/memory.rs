//! Flat 64 KiB address space.

use thiserror::Error;

use crate::Bus;

/// Size of the emulated address space in bytes.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// Errors from loading a payload into memory.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    #[error("payload of {len} bytes at ${base:04X} extends past end of memory")]
    PastEndOfMemory { base: u16, len: usize },
}

/// The full 64 KiB address space of the emulated machine.
///
/// Addressing is total: every `u16` resolves to a byte, so reads and writes
/// cannot fail. The SID register window lives at $D400..$D419 but is plain
/// storage here; the capture layer reads it back after each play call.
pub struct Memory {
    bytes: Box<[u8; ADDRESS_SPACE]>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; ADDRESS_SPACE]),
        }
    }

    /// Copy `payload` into memory starting at `base`.
    ///
    /// Fails if the payload would extend past the top of the address space.
    /// The original player refuses such files outright rather than wrapping.
    pub fn load(&mut self, payload: &[u8], base: u16) -> Result<(), LoadError> {
        let start = base as usize;
        let end = start
            .checked_add(payload.len())
            .filter(|&end| end <= ADDRESS_SPACE)
            .ok_or(LoadError::PastEndOfMemory {
                base,
                len: payload.len(),
            })?;
        self.bytes[start..end].copy_from_slice(payload);
        Ok(())
    }

    /// Read without the `&mut` the bus trait requires. Used by capture.
    pub fn peek(&self, address: u16) -> u8 {
        self.bytes[address as usize]
    }

    /// Borrow a sub-range of memory, e.g. the SID register window.
    /// Truncated at the top of the address space; callers that need the
    /// full requested length must validate the range beforehand.
    pub fn window(&self, base: u16, len: usize) -> &[u8] {
        let start = base as usize;
        let end = (start + len).min(ADDRESS_SPACE);
        &self.bytes[start..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for Memory {
    fn read(&mut self, address: u16) -> u8 {
        self.bytes[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.bytes[address as usize] = value;
    }
}
