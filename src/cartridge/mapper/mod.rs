//! NES mappers for PRG address translation.
//!
//! Mapper0 (NROM), Mapper1 (MMC1), and the [`Mapper`] variant the address space
//! dispatches through.

use crate::error::CartridgeError;

/// Nametable mirroring mode reported to the graphics side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    OneScreenLower,
    OneScreenUpper,
    FourScreen,
}

pub mod mapper0;
pub mod mapper1;

use mapper0::Mapper0;
use mapper1::Mapper1;

/// First CPU address owned by the cartridge mapper.
pub const ROM_BASE: u16 = 0x8000;

/// Supported bank-switching strategies, chosen once at load time.
#[derive(Debug, Clone)]
pub enum Mapper {
    Nrom(Mapper0),
    Mmc1(Mapper1),
}

impl Mapper {
    /// Build the mapper for an iNES mapper number.
    pub fn from_id(id: u8, mirroring: Mirroring) -> Result<Self, CartridgeError> {
        match id {
            0 => Ok(Mapper::Nrom(Mapper0::new(mirroring))),
            1 => Ok(Mapper::Mmc1(Mapper1::new())),
            _ => Err(CartridgeError::UnsupportedMapper(id)),
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Mapper::Nrom(_) => 0,
            Mapper::Mmc1(_) => 1,
        }
    }

    /// Bytes of physical storage the address space must provide.
    pub fn storage_size(&self) -> usize {
        match self {
            Mapper::Nrom(_) => mapper0::STORAGE_SIZE,
            Mapper::Mmc1(_) => mapper1::STORAGE_SIZE,
        }
    }

    pub fn max_prg_banks(&self) -> u8 {
        match self {
            Mapper::Nrom(_) => mapper0::MAX_PRG_BANKS,
            Mapper::Mmc1(_) => mapper1::MAX_PRG_BANKS,
        }
    }

    /// Physical index of a PRG address. Pure given the current bank registers.
    pub fn translate(&self, addr: u16, prg_banks: u8) -> u32 {
        match self {
            Mapper::Nrom(m) => m.translate(addr, prg_banks),
            Mapper::Mmc1(m) => m.translate(addr, prg_banks),
        }
    }

    /// CPU write into ROM space: dropped (NROM) or a register update (MMC1).
    pub fn write(&mut self, addr: u16, data: u8) {
        match self {
            Mapper::Nrom(m) => m.write(addr, data),
            Mapper::Mmc1(m) => m.write(addr, data),
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        match self {
            Mapper::Nrom(m) => m.mirroring(),
            Mapper::Mmc1(m) => m.mirroring(),
        }
    }

    /// Return bank registers to their power-up state.
    pub fn reset(&mut self) {
        if let Mapper::Mmc1(m) = self {
            *m = Mapper1::new();
        }
    }
}
