//! 6502 status register (P) operations.
//!
//! Bit layout: N V - B D I Z C. Bit 5 reads back as 1 on real hardware;
//! B is not a stored flag, it only exists in the byte pushed by BRK/PHP.

/// Carry
pub const C: u8 = 0x01;
/// Zero
pub const Z: u8 = 0x02;
/// Interrupt disable
pub const I: u8 = 0x04;
/// Decimal mode
pub const D: u8 = 0x08;
/// Break (only meaningful in the pushed copy)
pub const B: u8 = 0x10;
/// Unused, always reads 1
pub const U: u8 = 0x20;
/// Overflow
pub const V: u8 = 0x40;
/// Negative
pub const N: u8 = 0x80;

/// The processor status register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status(u8);

impl Status {
    /// Power-on state: I set, bit 5 always 1.
    pub const fn power_on() -> Self {
        Self(I | U)
    }

    pub const fn is_set(self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    pub fn set(&mut self, mask: u8, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Set Z and N from a result byte.
    pub fn update_zn(&mut self, value: u8) {
        self.set(Z, value == 0);
        self.set(N, value & 0x80 != 0);
    }

    /// Carry as a 0/1 operand for ADC/ROL-style arithmetic.
    pub const fn carry_bit(self) -> u8 {
        self.0 & C
    }

    /// The byte PHP pushes: B and U forced on.
    pub const fn for_push(self) -> u8 {
        self.0 | B | U
    }

    /// Restore from a pulled byte: B discarded, U forced on.
    pub fn restore(&mut self, value: u8) {
        self.0 = (value | U) & !B;
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::power_on()
    }
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        Self(value | U)
    }
}
