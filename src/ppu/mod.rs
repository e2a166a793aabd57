//! PPU (Picture Processing Unit) clock domain for the NES.
//!
//! See [PPU frame timing](https://www.nesdev.org/wiki/PPU_frame_timing) and
//! [PPU registers](https://www.nesdev.org/wiki/PPU_registers). 341-dot scanlines,
//! 262 scanlines per frame, vblank flag in PPUSTATUS. No pixel pipeline.

pub mod ppu;
