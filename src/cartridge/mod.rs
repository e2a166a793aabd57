//! NES cartridge loading and mapper support.
//!
//! - **cartridge**: parses iNES (.nes) images and builds the CPU address space.
//! - **mapper**: NROM (0) and MMC1 (1) PRG address translation and bank switching.

pub mod cartridge;
pub mod mapper;
