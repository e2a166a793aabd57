//! 6502 CPU core for the NES (2A03, no decimal mode).
//!
//! Table-driven: every opcode is decoded through [`opcodes::OPCODES`] into an
//! addressing mode, an instruction and a cycle cost. Includes the undocumented
//! opcodes nestest exercises. Memory goes through the [`crate::bus::Bus`] trait.

pub mod cpu;
pub mod flags;
pub mod opcodes;
