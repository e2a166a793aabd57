//! Error types for the CPU core, cartridge loading and the driver.

use std::io;

use thiserror::Error;

/// Faults raised by the instruction engine. All are fatal to the current run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    /// The opcode has no addressing-mode or instruction table entry.
    #[error("unsupported opcode ${opcode:02X} at ${pc:04X}")]
    UnsupportedOpcode { opcode: u8, pc: u16 },
}

/// Failures while decoding an iNES image or building its address space.
#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("missing iNES signature (found {0:02X?})")]
    MalformedHeader([u8; 4]),

    #[error("image truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),

    #[error("mapper {mapper} addresses at most {max} PRG banks, image has {banks}")]
    PrgTooLarge { mapper: u8, banks: usize, max: u8 },

    #[error("cannot read cartridge: {0}")]
    Io(#[from] io::Error),
}

/// Top-level error for the driver and the binary.
#[derive(Error, Debug)]
pub enum EmuError {
    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error(transparent)]
    Cartridge(#[from] CartridgeError),

    #[error("engine thread panicked")]
    EnginePanicked,

    #[error("trace log: {0}")]
    Io(#[from] io::Error),

    #[error("trace mismatch on line {line}: {detail}")]
    TraceMismatch { line: usize, detail: String },
}
