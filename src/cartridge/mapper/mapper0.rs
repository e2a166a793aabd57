//! Mapper 0 (NROM): no bank switching, 16/32KB PRG.

use crate::cartridge::mapper::Mirroring;

/// Physical store for NROM: the plain 64KB logical space.
pub const STORAGE_SIZE: usize = 0x1_0000;
/// NROM-256 holds two 16KB banks.
pub const MAX_PRG_BANKS: u8 = 2;

/// NROM: fixed PRG; a single 16KB bank is mirrored into $C000-$FFFF.
#[derive(Debug, Clone)]
pub struct Mapper0 {
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(mirroring: Mirroring) -> Self {
        Self { mirroring }
    }

    /// Physical index for a PRG address ($8000-$FFFF).
    pub fn translate(&self, addr: u16, prg_banks: u8) -> u32 {
        if addr >= 0xC000 && prg_banks == 1 {
            (addr - 0x4000) as u32
        } else {
            addr as u32
        }
    }

    /// PRG ROM is read-only; the write is dropped.
    pub fn write(&mut self, addr: u16, data: u8) {
        log::warn!("NROM: ignoring write ${data:02X} to ROM at ${addr:04X}");
    }

    /// Board-wired nametable mirroring from the header.
    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
