//! Capture session configuration.

use std::time::Duration;

/// SID register window base address.
pub const SID_BASE: u16 = 0xD400;

/// Number of SID registers captured per frame.
pub const SID_WINDOW: usize = 25;

/// Kernal IRQ handler exit points. A play routine installed as an interrupt
/// handler ends by jumping into one of these instead of returning.
pub const KERNAL_IRQ_EXITS: [u16; 2] = [0xEA31, 0xEA81];

/// Hard per-invocation instruction ceiling (the runaway guard).
pub const DEFAULT_INSTRUCTION_CEILING: u32 = 0x10_0000;

/// One capture session's parameters.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Play routine invocations per second.
    pub frame_rate: u32,
    /// Playback duration in seconds.
    pub seconds: u32,
    /// First frame to emit; earlier frames are executed but not captured.
    pub first_frame: u32,
    /// Instructions allowed per routine invocation before aborting.
    pub instruction_ceiling: u32,
    /// Base address of the captured register window.
    pub window_base: u16,
    /// Length of the captured register window in bytes.
    pub window_len: usize,
    /// PC values treated as routine completion besides a direct return.
    pub terminal_addresses: Vec<u16>,
}

impl SessionConfig {
    /// Total play invocations for the session: frames skipped before
    /// `first_frame` still have to be executed to advance playback state.
    pub fn total_frames(&self) -> u64 {
        u64::from(self.first_frame) + u64::from(self.seconds) * u64::from(self.frame_rate)
    }

    /// Synthetic real-time delay between frames.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frame_rate.max(1)))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_rate: 50,
            seconds: 300,
            first_frame: 0,
            instruction_ceiling: DEFAULT_INSTRUCTION_CEILING,
            window_base: SID_BASE,
            window_len: SID_WINDOW,
            terminal_addresses: KERNAL_IRQ_EXITS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pal_capture() {
        let config = SessionConfig::default();
        assert_eq!(config.frame_rate, 50);
        assert_eq!(config.window_base, 0xD400);
        assert_eq!(config.window_len, 25);
        assert_eq!(config.frame_duration(), Duration::from_micros(20_000));
    }

    #[test]
    fn skipped_frames_count_toward_total() {
        let config = SessionConfig {
            frame_rate: 50,
            seconds: 2,
            first_frame: 10,
            ..SessionConfig::default()
        };
        assert_eq!(config.total_frames(), 110);
    }
}
