//! 6502 processor status register (P) flag bits.
//!
//! Layout, bit 7 to bit 0: N V b1 b2 D I Z C. The two break-context bits only
//! exist in the copy pushed to the stack; the live register keeps whatever the
//! last reset or `set_processor_status` left in them.

pub const FLAG_CARRY: u8 = 1 << 0;
pub const FLAG_ZERO: u8 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u8 = 1 << 2;
pub const FLAG_DECIMAL: u8 = 1 << 3; // 2A03 has no BCD; bit is stored but ignored
pub const FLAG_BREAK: u8 = 1 << 4; // b2: set by BRK / PHP stack frame
pub const FLAG_UNUSED: u8 = 1 << 5; // b1: reads back as 1 after reset
pub const FLAG_OVERFLOW: u8 = 1 << 6;
pub const FLAG_NEGATIVE: u8 = 1 << 7;

/// Both break-context bits.
pub const BREAK_BITS: u8 = FLAG_UNUSED | FLAG_BREAK;

/// Eight independent status flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub n: bool,
    pub v: bool,
    pub b1: bool,
    pub b2: bool,
    pub d: bool,
    pub i: bool,
    pub z: bool,
    pub c: bool,
}

impl Flags {
    /// Power-up state: b1 and interrupt-disable set ($24).
    pub fn power_up() -> Self {
        Self {
            b1: true,
            i: true,
            ..Self::default()
        }
    }

    /// Pack into the P byte.
    pub fn to_byte(self) -> u8 {
        let mut p = 0;
        for (set, bit) in [
            (self.n, FLAG_NEGATIVE),
            (self.v, FLAG_OVERFLOW),
            (self.b1, FLAG_UNUSED),
            (self.b2, FLAG_BREAK),
            (self.d, FLAG_DECIMAL),
            (self.i, FLAG_INTERRUPT_DISABLE),
            (self.z, FLAG_ZERO),
            (self.c, FLAG_CARRY),
        ] {
            if set {
                p |= bit;
            }
        }
        p
    }

    pub fn from_byte(p: u8) -> Self {
        Self {
            n: p & FLAG_NEGATIVE != 0,
            v: p & FLAG_OVERFLOW != 0,
            b1: p & FLAG_UNUSED != 0,
            b2: p & FLAG_BREAK != 0,
            d: p & FLAG_DECIMAL != 0,
            i: p & FLAG_INTERRUPT_DISABLE != 0,
            z: p & FLAG_ZERO != 0,
            c: p & FLAG_CARRY != 0,
        }
    }
}
