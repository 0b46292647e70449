//! Memory bus interface.

/// Memory bus interface.
///
/// The CPU accesses memory through this trait. Implementations decide how
/// addresses resolve; every address in the 16-bit range must succeed, so
/// neither method returns a result.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}
