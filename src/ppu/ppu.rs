//! NES PPU clock domain.
//!
//! Only the timing side of the 2C02 is modelled: the dot counter, the derived
//! scanline/position pair and the eight-byte register file behind $2000-$2007.
//! The CPU observes it through PPUSTATUS bit 7 (vertical blank), which is set on
//! dot 0 of scanline 241 and cleared on dot 0 of the pre-render scanline.

/// Dots per scanline.
pub const DOTS_PER_SCANLINE: u64 = 341;
/// Scanlines per frame (NTSC).
pub const SCANLINES_PER_FRAME: u64 = 262;
/// First vertical-blank scanline.
pub const VBLANK_SCANLINE: u16 = 241;
/// Pre-render scanline; vblank ends here.
pub const PRE_RENDER_SCANLINE: u16 = 261;

pub const PPUCTRL: usize = 0;
pub const PPUMASK: usize = 1;
pub const PPUSTATUS: usize = 2;

const STATUS_VBLANK: u8 = 0x80;
/// PPUSTATUS at power-up: sprite overflow set.
const STATUS_POWER_UP: u8 = 0x20;
/// PPUSTATUS bits 0-4 echo the last value written to any register.
const OPEN_BUS_MASK: u8 = 0x1F;

/// PPU clock: tick counter plus the register file the CPU can see.
pub struct PPU {
    /// Total dots since power-up (odd-frame skips included).
    pub ticks: u64,
    pub scanline: u16,
    /// Dot within the current scanline.
    pub position: u16,
    pub registers: [u8; 8],
}

impl PPU {
    /// PPU at scanline 0, dot 0. Only PPUSTATUS has a non-zero power-up value.
    pub fn new() -> Self {
        let mut registers = [0; 8];
        registers[PPUSTATUS] = STATUS_POWER_UP;
        Self {
            ticks: 0,
            scanline: 0,
            position: 0,
            registers,
        }
    }

    /// CPU read of register `index` (0-7). Reading PPUSTATUS clears vblank.
    pub fn read_register(&mut self, index: usize) -> u8 {
        let value = self.registers[index & 7];
        if index & 7 == PPUSTATUS {
            self.registers[PPUSTATUS] &= !STATUS_VBLANK;
        }
        value
    }

    /// Side-effect free register read (trace/debug).
    pub fn peek_register(&self, index: usize) -> u8 {
        self.registers[index & 7]
    }

    /// CPU write of register `index` (0-7). PPUSTATUS itself is read-only.
    pub fn write_register(&mut self, index: usize, data: u8) {
        let index = index & 7;
        if index != PPUSTATUS {
            self.registers[index] = data;
        }
        let status = self.registers[PPUSTATUS];
        self.registers[PPUSTATUS] = (status & !OPEN_BUS_MASK) | (data & OPEN_BUS_MASK);
    }

    pub fn vblank(&self) -> bool {
        self.registers[PPUSTATUS] & STATUS_VBLANK != 0
    }

    /// Background or sprite rendering enabled in PPUMASK.
    pub fn rendering_enabled(&self) -> bool {
        self.registers[PPUMASK] & 0b0001_1000 != 0
    }

    fn odd_frame(&self) -> bool {
        (self.ticks / (DOTS_PER_SCANLINE * SCANLINES_PER_FRAME)) % 2 == 1
    }

    /// Advance the clock by `n` dots.
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Process the current dot, then move to the next one.
    fn tick(&mut self) {
        match (self.scanline, self.position) {
            (VBLANK_SCANLINE, 0) => self.registers[PPUSTATUS] |= STATUS_VBLANK,
            (PRE_RENDER_SCANLINE, 0) => self.registers[PPUSTATUS] &= !STATUS_VBLANK,
            _ => {}
        }

        // Odd frames drop the last pre-render dot while rendering.
        if self.scanline == PRE_RENDER_SCANLINE
            && self.position == 339
            && self.rendering_enabled()
            && self.odd_frame()
        {
            self.ticks += 1;
        }
        self.ticks += 1;

        self.scanline = ((self.ticks / DOTS_PER_SCANLINE) % SCANLINES_PER_FRAME) as u16;
        self.position = (self.ticks % DOTS_PER_SCANLINE) as u16;
    }
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanline_and_position_follow_ticks() {
        let mut ppu = PPU::new();
        ppu.advance(21);
        assert_eq!((ppu.scanline, ppu.position), (0, 21));
        ppu.advance(341);
        assert_eq!((ppu.scanline, ppu.position), (1, 21));
        assert_eq!(ppu.ticks, 362);
    }

    #[test]
    fn frame_wraps_to_scanline_zero() {
        let mut ppu = PPU::new();
        ppu.advance((DOTS_PER_SCANLINE * SCANLINES_PER_FRAME) as usize + 5);
        assert_eq!((ppu.scanline, ppu.position), (0, 5));
    }

    #[test]
    fn power_up_status() {
        let ppu = PPU::new();
        assert_eq!(ppu.peek_register(PPUSTATUS), 0x20);
        assert!(!ppu.vblank());
    }

    #[test]
    fn vblank_set_and_cleared() {
        let mut ppu = PPU::new();
        ppu.advance(241 * 341);
        assert_eq!((ppu.scanline, ppu.position), (241, 0));
        assert!(!ppu.vblank());
        // Dot (241,0) raises the flag, so it is already visible at (241,1).
        ppu.advance(1);
        assert_eq!((ppu.scanline, ppu.position), (241, 1));
        assert!(ppu.vblank());
        assert_eq!(ppu.peek_register(PPUSTATUS), 0xA0);
        ppu.advance(20 * 341 - 1);
        assert_eq!((ppu.scanline, ppu.position), (261, 0));
        assert!(ppu.vblank());
        ppu.advance(1);
        assert!(!ppu.vblank());
    }

    #[test]
    fn status_read_clears_vblank() {
        let mut ppu = PPU::new();
        ppu.advance(241 * 341 + 1);
        assert_eq!(ppu.peek_register(PPUSTATUS) & 0x80, 0x80);
        assert_eq!(ppu.read_register(PPUSTATUS) & 0x80, 0x80);
        assert_eq!(ppu.read_register(PPUSTATUS) & 0x80, 0);
    }

    #[test]
    fn writes_latch_open_bus_bits() {
        let mut ppu = PPU::new();
        ppu.write_register(PPUCTRL, 0xFF);
        assert_eq!(ppu.registers[PPUCTRL], 0xFF);
        assert_eq!(ppu.registers[PPUSTATUS], 0x3F);
        ppu.write_register(PPUSTATUS, 0x80);
        assert_eq!(ppu.registers[PPUSTATUS], 0x20);
    }

    #[test]
    fn odd_frame_skips_a_dot_when_rendering() {
        let frame = (DOTS_PER_SCANLINE * SCANLINES_PER_FRAME) as usize;
        let mut ppu = PPU::new();
        ppu.write_register(PPUMASK, 0x08);
        ppu.advance(frame);
        // Second frame is odd: dot 340 of the pre-render line is skipped.
        ppu.advance(frame - 1);
        assert_eq!((ppu.scanline, ppu.position), (0, 0));
        assert_eq!(ppu.ticks, 2 * frame as u64);
    }
}
