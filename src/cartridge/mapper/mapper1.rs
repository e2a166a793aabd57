//! Mapper 1 (MMC1): bank switching via 5-bit shift register.
//!
//! [MMC1](https://www.nesdev.org/wiki/MMC1): any write to $8000-$FFFF with bit 7 set
//! resets the shift register and forces PRG mode 3. Otherwise bit 0 is shifted in
//! (LSB first). The register starts with a sentinel 1 in bit 4; when that bit
//! reaches bit 0 the next write completes five bits, which latch into the
//! register picked by address bits 13-14: control ($8000), CHR bank 0 ($A000),
//! CHR bank 1 ($C000) or PRG bank ($E000). Control bits 0-1 = mirroring, bits
//! 2-3 = PRG mode, bit 4 = CHR mode.

use crate::cartridge::mapper::Mirroring;

/// $8000 bytes of low memory plus sixteen 16KB PRG banks loaded at physical $8000.
pub const STORAGE_SIZE: usize = 0x4_8000;
pub const MAX_PRG_BANKS: u8 = 16;

/// Empty shift register: only the sentinel bit is set.
pub const SHIFT_RESET: u8 = 0x10;
/// Power-up control: PRG mode 3 ($8000 switchable, $C000 fixed to the last bank).
const CONTROL_RESET: u8 = 0x0C;

/// MMC1 state: shift register, control byte, CHR and PRG bank selects.
#[derive(Debug, Clone)]
pub struct Mapper1 {
    shift_reg: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl Mapper1 {
    pub fn new() -> Self {
        Self {
            shift_reg: SHIFT_RESET,
            control: CONTROL_RESET,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    /// PRG bank mode from control bits 2-3: 0/1 = 32KB; 2 = first bank fixed at $8000;
    /// 3 = last bank fixed at $C000.
    pub fn prg_bank_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    pub fn shift_register(&self) -> u8 {
        self.shift_reg
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn chr_banks(&self) -> (u8, u8) {
        (self.chr_bank0, self.chr_bank1)
    }

    pub fn prg_bank(&self) -> u8 {
        self.prg_bank
    }

    /// Physical index for a PRG address ($8000-$FFFF).
    pub fn translate(&self, addr: u16, prg_banks: u8) -> u32 {
        let addr = addr as u32;
        let bank = (self.prg_bank & 0x0F) as u32;
        match self.prg_bank_mode() {
            0 | 1 => addr + (bank >> 1) * 0x8000,
            2 => {
                if addr < 0xC000 {
                    addr
                } else {
                    0x8000 + bank * 0x4000 + (addr - 0xC000)
                }
            }
            _ => {
                if addr < 0xC000 {
                    addr + bank * 0x4000
                } else {
                    let last = prg_banks.saturating_sub(1) as u32;
                    0x8000 + last * 0x4000 + (addr - 0xC000)
                }
            }
        }
    }

    /// Serial port write into ROM space.
    pub fn write(&mut self, addr: u16, data: u8) {
        if data & 0x80 != 0 {
            self.shift_reg = SHIFT_RESET;
            self.control |= CONTROL_RESET;
            return;
        }

        let full = self.shift_reg & 1 != 0;
        self.shift_reg = (self.shift_reg >> 1) | ((data & 1) << 4);
        if !full {
            return;
        }

        let value = self.shift_reg & 0x1F;
        match (addr >> 13) & 0b11 {
            0 => self.control = value,
            1 => self.chr_bank0 = value,
            2 => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
        log::debug!("MMC1: latched ${value:02X} via ${addr:04X}");
        self.shift_reg = SHIFT_RESET;
    }

    /// Mirroring from control bits 0-1.
    pub fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::OneScreenLower,
            1 => Mirroring::OneScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
}

impl Default for Mapper1 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serial_write(mapper: &mut Mapper1, addr: u16, value: u8) {
        for bit in 0..5 {
            mapper.write(addr, (value >> bit) & 1);
        }
    }

    #[test]
    fn five_writes_latch_selected_register() {
        let mut mapper = Mapper1::new();
        serial_write(&mut mapper, 0xE000, 0b00101);
        assert_eq!(mapper.prg_bank(), 0b00101);
        assert_eq!(mapper.shift_register(), SHIFT_RESET);

        serial_write(&mut mapper, 0xA123, 0b10011);
        serial_write(&mut mapper, 0xDFFF, 0b00110);
        assert_eq!(mapper.chr_banks(), (0b10011, 0b00110));

        serial_write(&mut mapper, 0x8000, 0b00010);
        assert_eq!(mapper.control(), 0b00010);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn only_fifth_write_address_selects_register() {
        let mut mapper = Mapper1::new();
        for _ in 0..4 {
            mapper.write(0x8000, 1);
        }
        assert_ne!(mapper.shift_register(), SHIFT_RESET);
        mapper.write(0xE000, 0);
        assert_eq!(mapper.prg_bank(), 0b01111);
        assert_eq!(mapper.control(), 0x0C);
    }

    #[test]
    fn bit7_resets_shift_and_forces_mode3() {
        let mut mapper = Mapper1::new();
        serial_write(&mut mapper, 0x8000, 0b00000);
        assert_eq!(mapper.prg_bank_mode(), 0);
        mapper.write(0x8000, 1);
        mapper.write(0x8000, 1);
        mapper.write(0x8000, 0x80);
        assert_eq!(mapper.shift_register(), SHIFT_RESET);
        assert_eq!(mapper.prg_bank_mode(), 3);
    }

    #[test]
    fn prg_translation_per_mode() {
        let mut mapper = Mapper1::new();
        serial_write(&mut mapper, 0xE000, 2);
        // Mode 3: switchable low half, last bank high.
        assert_eq!(mapper.translate(0x8000, 8), 0x8000 + 2 * 0x4000);
        assert_eq!(mapper.translate(0xC000, 8), 0x8000 + 7 * 0x4000);

        serial_write(&mut mapper, 0x8000, 0b01000);
        assert_eq!(mapper.prg_bank_mode(), 2);
        assert_eq!(mapper.translate(0x8001, 8), 0x8001);
        assert_eq!(mapper.translate(0xC001, 8), 0x8000 + 2 * 0x4000 + 1);

        serial_write(&mut mapper, 0x8000, 0b00000);
        assert_eq!(mapper.translate(0x8000, 8), 0x8000 + 0x8000);
        assert_eq!(mapper.translate(0xFFFF, 8), 0xFFFF + 0x8000);
    }
}
