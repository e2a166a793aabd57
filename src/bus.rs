//! CPU address space for the NES.
//!
//! Maps the 64KB logical space onto RAM, the PPU register port and the
//! cartridge mapper. [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map):
//!
//! - $0000-$1FFF: 2KB internal RAM, mirrored every $800
//! - $2000-$3FFF: PPU registers, mirrored every 8 bytes
//! - $4000-$7FFF: APU/IO, expansion and save RAM (plain storage here)
//! - $8000-$FFFF: PRG ROM through the mapper

use crate::{
    cartridge::mapper::{Mapper, Mirroring, ROM_BASE, mapper0::Mapper0},
    error::CartridgeError,
    ppu::ppu::PPU,
};

/// 3 PPU dots per CPU cycle.
pub const PPU_TICKS_PER_CPU_CYCLE: usize = 3;

/// Size of one PRG bank.
pub const PRG_BANK_SIZE: usize = 0x4000;

/// Trait for memory-mapped I/O and bus access used by the CPU.
pub trait Bus {
    /// Mapped read; may have side effects (PPUSTATUS).
    fn read(&mut self, addr: u16) -> u8;
    /// Mapped read without side effects.
    fn peek(&self, addr: u16) -> u8;
    /// Mapped write; ROM-space writes go to the mapper.
    fn write(&mut self, addr: u16, data: u8);
    /// Raw physical read, no translation.
    fn read_direct(&self, addr: u32) -> u8;
    /// Raw physical write, no translation.
    fn write_direct(&mut self, addr: u32, data: u8);
    /// Advance the PPU clock for `cycles` CPU cycles.
    fn tick(&mut self, cycles: usize);

    /// PPU (scanline, dot), reported in trace records.
    fn ppu_position(&self) -> (u16, u16) {
        (0, 0)
    }

    /// Little-endian word. With `wrap_page` the high byte is fetched from the start of
    /// the same page when `addr` is the last byte of a page (JMP ($xxFF) bug).
    fn read_word(&mut self, addr: u16, wrap_page: bool) -> u16 {
        let hi_addr = next_word_byte(addr, wrap_page);
        let lo = self.read(addr) as u16;
        let hi = self.read(hi_addr) as u16;
        (hi << 8) | lo
    }

    fn peek_word(&self, addr: u16, wrap_page: bool) -> u16 {
        let hi_addr = next_word_byte(addr, wrap_page);
        ((self.peek(hi_addr) as u16) << 8) | self.peek(addr) as u16
    }
}

fn next_word_byte(addr: u16, wrap_page: bool) -> u16 {
    if wrap_page {
        (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF)
    } else {
        addr.wrapping_add(1)
    }
}

/// Main NES address space: flat physical store, mapper state and the PPU clock.
pub struct AddressSpace {
    store: Vec<u8>,
    /// PRG ROM size in 16KB banks.
    prg_banks: u8,
    mapper: Mapper,
    pub ppu: PPU,
}

impl AddressSpace {
    /// Empty address space with storage sized for `mapper`.
    pub fn new(mapper: Mapper) -> Self {
        Self {
            store: vec![0; mapper.storage_size()],
            prg_banks: 0,
            mapper,
            ppu: PPU::new(),
        }
    }

    /// NROM address space, handy for tests and raw program images.
    pub fn nrom() -> Self {
        Self::new(Mapper::Nrom(Mapper0::new(Mirroring::Horizontal)))
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn prg_banks(&self) -> u8 {
        self.prg_banks
    }

    /// Set the PRG ROM size in 16KB banks.
    pub fn set_bank_size(&mut self, banks: u8) -> Result<(), CartridgeError> {
        let max = self.mapper.max_prg_banks();
        if banks > max {
            return Err(CartridgeError::PrgTooLarge {
                mapper: self.mapper.id(),
                banks: banks as usize,
                max,
            });
        }
        self.prg_banks = banks;
        Ok(())
    }

    /// Copy a PRG image to physical $8000 and record its bank count.
    pub fn load_prg(&mut self, prg: &[u8]) -> Result<(), CartridgeError> {
        let banks = prg.len().div_ceil(PRG_BANK_SIZE);
        let max = self.mapper.max_prg_banks();
        if banks > max as usize {
            return Err(CartridgeError::PrgTooLarge {
                mapper: self.mapper.id(),
                banks,
                max,
            });
        }
        self.set_bank_size(banks as u8)?;
        for (i, &byte) in prg.iter().enumerate() {
            self.write_direct(ROM_BASE as u32 + i as u32, byte);
        }
        log::info!(
            "loaded {} PRG bank(s) for mapper {}",
            banks,
            self.mapper.id()
        );
        Ok(())
    }

    /// Zero all storage and return mapper registers to power-up state.
    pub fn clear(&mut self) {
        self.store.fill(0);
        self.mapper.reset();
    }

    pub fn graphics(&self) -> &PPU {
        &self.ppu
    }

    /// Physical index of a non-PPU logical address.
    fn map(&self, addr: u16) -> u32 {
        match addr {
            0x0000..=0x1FFF => (addr & 0x07FF) as u32,
            0x2000..=0x7FFF => addr as u32,
            _ => self.mapper.translate(addr, self.prg_banks),
        }
    }
}

fn is_ppu_port(addr: u16) -> bool {
    (0x2000..0x4000).contains(&addr)
}

impl Bus for AddressSpace {
    fn read(&mut self, addr: u16) -> u8 {
        if is_ppu_port(addr) {
            return self.ppu.read_register((addr & 7) as usize);
        }
        self.read_direct(self.map(addr))
    }

    fn peek(&self, addr: u16) -> u8 {
        if is_ppu_port(addr) {
            return self.ppu.peek_register((addr & 7) as usize);
        }
        self.read_direct(self.map(addr))
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x2000..=0x3FFF => self.ppu.write_register((addr & 7) as usize, data),
            // Cartridge: mapper registers (e.g. MMC1) or dropped ROM writes
            0x8000..=0xFFFF => self.mapper.write(addr, data),
            _ => {
                let index = self.map(addr);
                self.write_direct(index, data);
            }
        }
    }

    fn read_direct(&self, addr: u32) -> u8 {
        self.store.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_direct(&mut self, addr: u32, data: u8) {
        if let Some(byte) = self.store.get_mut(addr as usize) {
            *byte = data;
        }
    }

    fn tick(&mut self, cycles: usize) {
        self.ppu.advance(cycles * PPU_TICKS_PER_CPU_CYCLE);
    }

    fn ppu_position(&self) -> (u16, u16) {
        (self.ppu.scanline, self.ppu.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::mapper1::Mapper1;
    use proptest::prelude::*;

    fn nrom_with_banks(banks: usize) -> AddressSpace {
        let mut space = AddressSpace::nrom();
        let prg: Vec<u8> = (0..banks * PRG_BANK_SIZE).map(|i| (i / 0x100) as u8).collect();
        space.load_prg(&prg).unwrap();
        space
    }

    proptest! {
        #[test]
        fn ram_mirrors_every_2k(addr in 0u16..0x800, value in any::<u8>(), mirror in 0u16..4) {
            let mut space = AddressSpace::nrom();
            space.write(addr + mirror * 0x800, value);
            for m in 0..4 {
                prop_assert_eq!(space.read(addr + m * 0x800), value);
            }
        }
    }

    #[test]
    fn ppu_registers_mirror_every_8_bytes() {
        let mut space = AddressSpace::nrom();
        space.write(0x3FF8, 0xAB);
        assert_eq!(space.ppu.registers[0], 0xAB);
        assert_eq!(space.peek(0x2000), 0xAB);
        assert_eq!(space.peek(0x2F10), 0xAB);
        // Never backed by storage.
        assert_eq!(space.read_direct(0x2000), 0);
    }

    #[test]
    fn single_bank_nrom_mirrors_upper_half() {
        let mut space = nrom_with_banks(1);
        assert_eq!(space.read(0x8123), space.read(0xC123));
        assert_eq!(space.read(0xFF00), 0x3F);
    }

    #[test]
    fn two_bank_nrom_is_identity() {
        let mut space = nrom_with_banks(2);
        assert_eq!(space.read(0xC000), 0x40);
        assert_eq!(space.read(0x8000), 0x00);
    }

    #[test]
    fn nrom_ignores_rom_writes() {
        let mut space = nrom_with_banks(2);
        space.write(0x8000, 0x99);
        assert_eq!(space.read(0x8000), 0x00);
    }

    #[test]
    fn read_word_wraps_within_page() {
        let mut space = AddressSpace::nrom();
        space.write(0x02FF, 0x34);
        space.write(0x0300, 0x12);
        space.write(0x0200, 0x56);
        assert_eq!(space.read_word(0x02FF, false), 0x1234);
        assert_eq!(space.read_word(0x02FF, true), 0x5634);
        assert_eq!(space.peek_word(0x02FF, true), 0x5634);
    }

    #[test]
    fn status_read_through_bus_clears_vblank() {
        let mut space = AddressSpace::nrom();
        space.tick(241 * 341 / 3 + 1);
        assert_eq!(space.graphics().scanline, 241);
        assert!(space.graphics().vblank());
        assert_eq!(space.peek(0x2002), 0xA0);
        assert_eq!(space.read(0x200A), 0xA0);
        assert!(!space.graphics().vblank());
        assert_eq!(space.peek(0x2002), 0x20);
    }

    #[test]
    fn mmc1_switches_prg_bank() {
        let mut space = AddressSpace::new(Mapper::Mmc1(Mapper1::new()));
        let prg: Vec<u8> = (0..4 * PRG_BANK_SIZE).map(|i| (i / PRG_BANK_SIZE) as u8).collect();
        space.load_prg(&prg).unwrap();
        assert_eq!(space.read(0x8000), 0);
        assert_eq!(space.read(0xC000), 3);
        for bit in [0, 1, 0, 0, 0] {
            space.write(0xE000, bit);
        }
        assert_eq!(space.read(0x8000), 2);
        assert_eq!(space.read(0xFFFF), 3);
    }

    #[test]
    fn oversized_prg_is_rejected() {
        let mut space = AddressSpace::nrom();
        let prg = vec![0; 3 * PRG_BANK_SIZE];
        assert!(matches!(
            space.load_prg(&prg),
            Err(CartridgeError::PrgTooLarge { banks: 3, .. })
        ));
    }

    #[test]
    fn clear_zeroes_storage() {
        let mut space = AddressSpace::nrom();
        space.write(0x0010, 1);
        space.write(0x6000, 2);
        space.clear();
        assert_eq!(space.read(0x0010), 0);
        assert_eq!(space.read(0x6000), 0);
    }
}
