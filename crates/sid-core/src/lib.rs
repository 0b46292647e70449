//! Address space and bus interface for the sidstream emulation core.

mod bus;
mod memory;

pub use bus::Bus;
pub use memory::{ADDRESS_SPACE, LoadError, Memory};
