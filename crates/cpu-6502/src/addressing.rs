//! 6502 addressing modes and effective-address computation.
//!
//! - Immediate: #$nn (operand follows the opcode)
//! - Zero Page: $nn, plus X/Y indexed variants that wrap within page zero
//! - Absolute: $nnnn, plus X/Y indexed variants that carry across pages
//! - Indirect: ($nnnn), JMP only, with the page-boundary fetch bug
//! - Indexed Indirect: ($nn,X) — pointer in zero page, indexed before deref
//! - Indirect Indexed: ($nn),Y — zero-page pointer, indexed after deref
//! - Relative: signed branch offset
//! - Implied / Accumulator: no memory operand

use sid_core::Bus;

use crate::Mos6502;

/// Addressing mode identifier, as carried by the opcode table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
    Relative,
}

impl Mos6502 {
    /// Fetch the byte at PC and advance PC.
    pub(crate) fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian word at PC.
    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// Read a word with the 6502 page-boundary bug: when `addr` is $xxFF the
    /// high byte comes from $xx00 rather than the next page. JMP ($nnnn) only.
    pub(crate) fn read_word_page_bug(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr);
        u16::from_le_bytes([low, high])
    }

    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(0x0100 | u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | u16::from(self.sp))
    }

    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    pub(crate) fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    /// Compute the effective address for a memory-operand mode.
    ///
    /// Returns the address and whether indexing crossed a page, which costs
    /// read instructions one extra cycle (stores and read-modify-write
    /// already carry the penalty in their base cost).
    pub(crate) fn resolve(&mut self, bus: &mut impl Bus, mode: Mode) -> (u16, bool) {
        match mode {
            Mode::ZeroPage => (u16::from(self.fetch(bus)), false),
            Mode::ZeroPageX => (u16::from(self.fetch(bus).wrapping_add(self.x)), false),
            Mode::ZeroPageY => (u16::from(self.fetch(bus).wrapping_add(self.y)), false),
            Mode::Absolute => (self.fetch_word(bus), false),
            Mode::AbsoluteX => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.x));
                (addr, page_crossed(base, addr))
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.y));
                (addr, page_crossed(base, addr))
            }
            Mode::Indirect => {
                let ptr = self.fetch_word(bus);
                (self.read_word_page_bug(bus, ptr), false)
            }
            Mode::IndexedIndirect => {
                let ptr = self.fetch(bus).wrapping_add(self.x);
                let low = bus.read(u16::from(ptr));
                let high = bus.read(u16::from(ptr.wrapping_add(1)));
                (u16::from_le_bytes([low, high]), false)
            }
            Mode::IndirectIndexed => {
                let ptr = self.fetch(bus);
                let low = bus.read(u16::from(ptr));
                let high = bus.read(u16::from(ptr.wrapping_add(1)));
                let base = u16::from_le_bytes([low, high]);
                let addr = base.wrapping_add(u16::from(self.y));
                (addr, page_crossed(base, addr))
            }
            Mode::Implied | Mode::Accumulator | Mode::Immediate | Mode::Relative => {
                unreachable!("mode {mode:?} has no effective address")
            }
        }
    }

    /// Effective address for store and read-modify-write operations; page
    /// crossing never adds a cycle here.
    pub(crate) fn address(&mut self, bus: &mut impl Bus, mode: Mode) -> u16 {
        self.resolve(bus, mode).0
    }

    /// Read the operand value for a read-class instruction, charging the
    /// page-cross penalty where the mode allows one.
    pub(crate) fn read_operand(&mut self, bus: &mut impl Bus, mode: Mode) -> u8 {
        match mode {
            Mode::Immediate => self.fetch(bus),
            Mode::Accumulator => self.a,
            _ => {
                let (addr, crossed) = self.resolve(bus, mode);
                if crossed {
                    self.cycles += 1;
                }
                bus.read(addr)
            }
        }
    }

    /// Take a branch if `condition` holds. Taken branches cost one extra
    /// cycle, two if the target is on a different page.
    pub(crate) fn branch_if(&mut self, bus: &mut impl Bus, condition: bool) {
        let offset = self.fetch(bus) as i8;
        if condition {
            let target = self.pc.wrapping_add(offset as u16);
            self.cycles += if page_crossed(self.pc, target) { 2 } else { 1 };
            self.pc = target;
        }
    }
}

fn page_crossed(from: u16, to: u16) -> bool {
    (from & 0xFF00) != (to & 0xFF00)
}
