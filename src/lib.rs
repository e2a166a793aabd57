//! Famicore: the NES CPU core and its clock domain, written in Rust.
//!
//! Implements the parts of the NES chipset the CPU can observe, as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide).
//!
//! ## Modules (NESdev references)
//!
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM mirroring, PPU
//!   register port, cartridge space; 3 PPU cycles per CPU cycle
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading; [Mapper](https://www.nesdev.org/wiki/Mapper) NROM (0), MMC1 (1)
//! - **clock** – cycle-paced engine thread: request, drain (stop) and kill
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: table-driven, official + undocumented opcodes
//! - **ppu** – [PPU frame timing](https://www.nesdev.org/wiki/PPU_frame_timing): dot counter, vblank flag
//! - **trace** – per-instruction records, nestest log format and comparison
//! - **logger** – `log` backend used by the binary
//! - **error** – error types

pub mod bus;
pub mod cartridge;
pub mod clock;
pub mod cpu;
pub mod error;
pub mod logger;
pub mod ppu;
pub mod trace;
