//! Frame-synchronized SID playback engine.
//!
//! Runs a tune's init routine once, then its play routine once per tick,
//! snapshotting the SID register window after each completed invocation.
//! Real-time pacing and transport live outside this crate; the engine runs
//! as fast as the host allows.

mod config;
mod frame;
mod player;

pub use config::{
    DEFAULT_INSTRUCTION_CEILING, KERNAL_IRQ_EXITS, SID_BASE, SID_WINDOW, SessionConfig,
};
pub use frame::Frame;
pub use player::{Frames, Player, PlayerError};
