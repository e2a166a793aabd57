//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6-10), an optional 512-byte trainer,
//! then PRG ROM, then CHR ROM. Only PRG ROM reaches the CPU address space; CHR is kept for
//! inspection.

use std::{fs, path::Path};

use crate::{
    bus::{AddressSpace, PRG_BANK_SIZE},
    cartridge::mapper::{Mapper, Mirroring},
    error::CartridgeError,
};

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const CHR_BANK_SIZE: usize = 0x2000;
const SIGNATURE: [u8; 4] = *b"NES\x1A";

/// Decoded iNES header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// PRG ROM size in 16 KiB units.
    pub prg_banks: u8,
    /// CHR ROM size in 8 KiB units (0 = board uses CHR RAM).
    pub chr_banks: u8,
    /// PRG RAM size in 8 KiB units (0 infers 8 KiB).
    pub prg_ram_banks: u8,
    pub mapper_id: u8,
    pub mirroring: Mirroring,
    /// Battery-backed PRG RAM.
    pub battery: bool,
    pub trainer: bool,
    pub four_screen: bool,
    pub vs_unisystem: bool,
    pub playchoice10: bool,
    /// Flags 7 bits 2-3 == 0b10. Parsed but NES 2.0 fields are not interpreted.
    pub nes2: bool,
    pub flags9: u8,
    pub flags10: u8,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_SIZE {
            return Err(CartridgeError::Truncated {
                needed: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let magic = [data[0], data[1], data[2], data[3]];
        if magic != SIGNATURE {
            return Err(CartridgeError::MalformedHeader(magic));
        }

        let flags6 = data[6];
        let flags7 = data[7];
        let four_screen = flags6 & 0b0000_1000 != 0;
        let mirroring = if four_screen {
            Mirroring::FourScreen
        } else if flags6 & 0b0000_0001 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(Self {
            prg_banks: data[4],
            chr_banks: data[5],
            prg_ram_banks: data[8],
            mapper_id: (flags6 >> 4) | (flags7 & 0xF0),
            mirroring,
            battery: flags6 & 0b0000_0010 != 0,
            trainer: flags6 & 0b0000_0100 != 0,
            four_screen,
            vs_unisystem: flags7 & 0b0000_0001 != 0,
            playchoice10: flags7 & 0b0000_0010 != 0,
            nes2: flags7 & 0b0000_1100 == 0b0000_1000,
            flags9: data[9],
            flags10: data[10],
        })
    }
}

/// A parsed cartridge image.
pub struct Cartridge {
    pub header: Header,
    pub trainer: Option<Vec<u8>>,
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
}

impl Cartridge {
    /// Validate and split an iNES image.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let header = Header::parse(data)?;

        let trainer_size = if header.trainer { TRAINER_SIZE } else { 0 };
        let prg_start = HEADER_SIZE + trainer_size;
        let prg_end = prg_start + header.prg_banks as usize * PRG_BANK_SIZE;
        let chr_end = prg_end + header.chr_banks as usize * CHR_BANK_SIZE;
        if data.len() < chr_end {
            return Err(CartridgeError::Truncated {
                needed: chr_end,
                actual: data.len(),
            });
        }

        log::info!(
            "iNES: {} PRG bank(s), {} CHR bank(s), {} PRG RAM, mapper {}, {:?} mirroring",
            header.prg_banks,
            header.chr_banks,
            header.prg_ram_banks,
            header.mapper_id,
            header.mirroring
        );

        Ok(Self {
            trainer: header.trainer.then(|| data[HEADER_SIZE..prg_start].to_vec()),
            prg_rom: data[prg_start..prg_end].to_vec(),
            chr_rom: data[prg_end..chr_end].to_vec(),
            header,
        })
    }

    /// Load cartridge from an iNES file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        log::info!("read {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(&data)
    }

    pub fn mapper(&self) -> Result<Mapper, CartridgeError> {
        Mapper::from_id(self.header.mapper_id, self.header.mirroring)
    }

    /// Build the mapper and copy PRG ROM to physical $8000.
    pub fn into_address_space(self) -> Result<AddressSpace, CartridgeError> {
        let mut space = AddressSpace::new(self.mapper()?);
        space.load_prg(&self.prg_rom)?;
        Ok(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;

    fn image(prg_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, 1, flags6, flags7];
        data.resize(HEADER_SIZE, 0);
        if flags6 & 0b100 != 0 {
            data.extend(std::iter::repeat_n(0xEE, TRAINER_SIZE));
        }
        for bank in 0..prg_banks {
            data.extend(std::iter::repeat_n(bank + 1, PRG_BANK_SIZE));
        }
        data.extend(std::iter::repeat_n(0xCC, CHR_BANK_SIZE));
        data
    }

    #[test]
    fn decodes_header_flags() {
        let cart = Cartridge::from_bytes(&image(2, 0b0001_0011, 0b0000_1011)).unwrap();
        let h = &cart.header;
        assert_eq!(h.prg_banks, 2);
        assert_eq!(h.chr_banks, 1);
        assert_eq!(h.mapper_id, 1);
        assert_eq!(h.mirroring, Mirroring::Vertical);
        assert!(h.battery);
        assert!(!h.trainer);
        assert!(h.vs_unisystem && h.playchoice10 && h.nes2);
        assert_eq!(cart.prg_rom.len(), 2 * PRG_BANK_SIZE);
        assert_eq!(cart.chr_rom.len(), CHR_BANK_SIZE);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = image(1, 0, 0);
        data[3] = 0x00;
        assert!(matches!(
            Cartridge::from_bytes(&data),
            Err(CartridgeError::MalformedHeader([0x4E, 0x45, 0x53, 0x00]))
        ));
    }

    #[test]
    fn rejects_truncated_image() {
        let data = image(2, 0, 0);
        assert!(matches!(
            Cartridge::from_bytes(&data[..HEADER_SIZE + PRG_BANK_SIZE]),
            Err(CartridgeError::Truncated { .. })
        ));
        assert!(matches!(
            Cartridge::from_bytes(&data[..8]),
            Err(CartridgeError::Truncated { needed: HEADER_SIZE, actual: 8 })
        ));
    }

    #[test]
    fn trainer_is_skipped() {
        let cart = Cartridge::from_bytes(&image(1, 0b0000_0100, 0)).unwrap();
        assert_eq!(cart.trainer.as_deref().map(<[u8]>::len), Some(TRAINER_SIZE));
        assert!(cart.prg_rom.iter().all(|&b| b == 1));
    }

    #[test]
    fn unknown_mapper_fails_before_execution() {
        let cart = Cartridge::from_bytes(&image(1, 0x40, 0)).unwrap();
        assert!(matches!(
            cart.into_address_space(),
            Err(CartridgeError::UnsupportedMapper(4))
        ));
    }

    #[test]
    fn address_space_sees_prg() {
        let mut space = Cartridge::from_bytes(&image(1, 0, 0))
            .unwrap()
            .into_address_space()
            .unwrap();
        assert_eq!(space.prg_banks(), 1);
        assert_eq!(space.read(0x8000), 1);
        assert_eq!(space.read(0xFFFF), 1);
    }
}
