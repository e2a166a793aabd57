//! Static opcode descriptor table.
//!
//! One entry per opcode byte: addressing mode, instruction, legality, base cycle
//! count and whether the opcode pays the conditional extra cycle (page crossing
//! for indexed reads, taken branch for relative jumps). Covers the official set
//! plus the undocumented combined read-modify-write opcodes nestest exercises.
//! Bytes without an entry (the JAM/KIL column and the unstable store/AND
//! combinations) decode to [`CpuError::UnsupportedOpcode`].

use std::fmt;

use crate::error::CpuError;

/// Operand addressing rule for an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    /// `($zp,X)`
    IndirectX,
    /// `($zp),Y`
    IndirectY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `($addr)`, JMP only
    Indirect,
    Relative,
    /// No operand bytes; shifts and rotates act on A.
    Implied,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    pub const fn operand_len(self) -> u16 {
        match self {
            AddressingMode::Implied => 0,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            _ => 1,
        }
    }

    /// Three-letter tag used by the table dump.
    pub const fn name(self) -> &'static str {
        match self {
            AddressingMode::Immediate => "IMM",
            AddressingMode::ZeroPage => "ZPG",
            AddressingMode::ZeroPageX => "ZPX",
            AddressingMode::ZeroPageY => "ZPY",
            AddressingMode::IndirectX => "IZX",
            AddressingMode::IndirectY => "IZY",
            AddressingMode::Absolute => "ABS",
            AddressingMode::AbsoluteX => "ABX",
            AddressingMode::AbsoluteY => "ABY",
            AddressingMode::Indirect => "IND",
            AddressingMode::Relative => "REL",
            AddressingMode::Implied => "NUL",
        }
    }
}

/// Instruction mnemonics. Everything after `TYA` is undocumented.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
    DCP, ISB, LAX, RLA, RRA, SAX, SLO, SRE,
}

impl Instruction {
    /// Shifts and rotates: the only instructions that use A when there is no operand.
    pub const fn is_shift(self) -> bool {
        matches!(
            self,
            Instruction::ASL | Instruction::LSR | Instruction::ROL | Instruction::ROR
        )
    }

    /// Instructions that never look at the byte at their effective address.
    pub const fn skips_operand_read(self) -> bool {
        matches!(
            self,
            Instruction::STA
                | Instruction::STX
                | Instruction::STY
                | Instruction::SAX
                | Instruction::JMP
                | Instruction::JSR
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Decoded properties of one opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub opcode: u8,
    pub mode: AddressingMode,
    pub instruction: Instruction,
    pub legal: bool,
    /// Base cycle count.
    pub cycles: u8,
    /// Pays +1 on page crossing (indexed reads) or on a taken branch.
    pub extra_cycle: bool,
}

/// The full table, indexed by opcode.
pub static OPCODES: [Option<OpcodeInfo>; 256] = build();

const fn build() -> [Option<OpcodeInfo>; 256] {
    let mut out = [None; 256];
    let mut i = 0;
    while i < 256 {
        out[i] = match (table::MODES[i], table::INSTRUCTIONS[i]) {
            (Some(mode), Some(instruction)) => Some(OpcodeInfo {
                opcode: i as u8,
                mode,
                instruction,
                legal: table::LEGAL[i] != 0,
                cycles: table::CYCLES[i],
                extra_cycle: table::EXTRA[i] != 0,
            }),
            _ => None,
        };
        i += 1;
    }
    out
}

pub fn addressing_mode(opcode: u8) -> Option<AddressingMode> {
    OPCODES[opcode as usize].map(|info| info.mode)
}

pub fn instruction(opcode: u8) -> Option<Instruction> {
    OPCODES[opcode as usize].map(|info| info.instruction)
}

/// Whether the opcode belongs to the documented 6502 set.
pub fn is_legal(opcode: u8) -> bool {
    table::LEGAL[opcode as usize] != 0
}

/// Base cycles for the opcode plus the conditional extras already computed.
pub fn cycle_count(opcode: u8, extra_cycles: usize) -> usize {
    table::CYCLES[opcode as usize] as usize + extra_cycles
}

/// Look up an opcode fetched from `pc`, failing on bytes with no entry.
pub fn decode(opcode: u8, pc: u16) -> Result<&'static OpcodeInfo, CpuError> {
    OPCODES[opcode as usize]
        .as_ref()
        .ok_or(CpuError::UnsupportedOpcode { opcode, pc })
}

#[rustfmt::skip]
mod table {
    use super::{AddressingMode, Instruction};

    const IMM: Option<AddressingMode> = Some(AddressingMode::Immediate);
    const ZPG: Option<AddressingMode> = Some(AddressingMode::ZeroPage);
    const ZPX: Option<AddressingMode> = Some(AddressingMode::ZeroPageX);
    const ZPY: Option<AddressingMode> = Some(AddressingMode::ZeroPageY);
    const IZX: Option<AddressingMode> = Some(AddressingMode::IndirectX);
    const IZY: Option<AddressingMode> = Some(AddressingMode::IndirectY);
    const ABS: Option<AddressingMode> = Some(AddressingMode::Absolute);
    const ABX: Option<AddressingMode> = Some(AddressingMode::AbsoluteX);
    const ABY: Option<AddressingMode> = Some(AddressingMode::AbsoluteY);
    const IND: Option<AddressingMode> = Some(AddressingMode::Indirect);
    const REL: Option<AddressingMode> = Some(AddressingMode::Relative);
    const NUL: Option<AddressingMode> = Some(AddressingMode::Implied);
    const XXX: Option<AddressingMode> = None;

    macro_rules! mnemonics {
        ($($name:ident),* $(,)?) => {
            $(const $name: Option<Instruction> = Some(Instruction::$name);)*
        };
    }

    mnemonics!(
        ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
        CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
        JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
        RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
        DCP, ISB, LAX, RLA, RRA, SAX, SLO, SRE,
    );
    const YYY: Option<Instruction> = None;

    pub(super) const MODES: [Option<AddressingMode>; 256] = [
    /*  x0   x1   x2   x3   x4   x5   x6   x7   x8   x9   xA   xB   xC   xD   xE   xF */
        NUL, IZX, XXX, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, XXX, ABS, ABS, ABS, ABS, // 0x
        REL, IZY, XXX, IZY, ZPX, ZPX, ZPX, ZPX, NUL, ABY, NUL, ABY, ABX, ABX, ABX, ABX, // 1x
        ABS, IZX, XXX, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, XXX, ABS, ABS, ABS, ABS, // 2x
        REL, IZY, XXX, IZY, ZPX, ZPX, ZPX, ZPX, NUL, ABY, NUL, ABY, ABX, ABX, ABX, ABX, // 3x
        NUL, IZX, XXX, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, XXX, ABS, ABS, ABS, ABS, // 4x
        REL, IZY, XXX, IZY, ZPX, ZPX, ZPX, ZPX, NUL, ABY, NUL, ABY, ABX, ABX, ABX, ABX, // 5x
        NUL, IZX, XXX, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, XXX, IND, ABS, ABS, ABS, // 6x
        REL, IZY, XXX, IZY, ZPX, ZPX, ZPX, ZPX, NUL, ABY, NUL, ABY, ABX, ABX, ABX, ABX, // 7x
        IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, XXX, ABS, ABS, ABS, ABS, // 8x
        REL, IZY, XXX, XXX, ZPX, ZPX, ZPY, ZPY, NUL, ABY, NUL, XXX, XXX, ABX, XXX, XXX, // 9x
        IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, IMM, ABS, ABS, ABS, ABS, // Ax
        REL, IZY, XXX, IZY, ZPX, ZPX, ZPY, ZPY, NUL, ABY, NUL, XXX, ABX, ABX, ABY, ABY, // Bx
        IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, XXX, ABS, ABS, ABS, ABS, // Cx
        REL, IZY, XXX, IZY, ZPX, ZPX, ZPX, ZPX, NUL, ABY, NUL, ABY, ABX, ABX, ABX, ABX, // Dx
        IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, NUL, IMM, NUL, IMM, ABS, ABS, ABS, ABS, // Ex
        REL, IZY, XXX, IZY, ZPX, ZPX, ZPX, ZPX, NUL, ABY, NUL, ABY, ABX, ABX, ABX, ABX, // Fx
    ];

    pub(super) const INSTRUCTIONS: [Option<Instruction>; 256] = [
    /*  x0   x1   x2   x3   x4   x5   x6   x7   x8   x9   xA   xB   xC   xD   xE   xF */
        BRK, ORA, YYY, SLO, NOP, ORA, ASL, SLO, PHP, ORA, ASL, YYY, NOP, ORA, ASL, SLO, // 0x
        BPL, ORA, YYY, SLO, NOP, ORA, ASL, SLO, CLC, ORA, NOP, SLO, NOP, ORA, ASL, SLO, // 1x
        JSR, AND, YYY, RLA, BIT, AND, ROL, RLA, PLP, AND, ROL, YYY, BIT, AND, ROL, RLA, // 2x
        BMI, AND, YYY, RLA, NOP, AND, ROL, RLA, SEC, AND, NOP, RLA, NOP, AND, ROL, RLA, // 3x
        RTI, EOR, YYY, SRE, NOP, EOR, LSR, SRE, PHA, EOR, LSR, YYY, JMP, EOR, LSR, SRE, // 4x
        BVC, EOR, YYY, SRE, NOP, EOR, LSR, SRE, CLI, EOR, NOP, SRE, NOP, EOR, LSR, SRE, // 5x
        RTS, ADC, YYY, RRA, NOP, ADC, ROR, RRA, PLA, ADC, ROR, YYY, JMP, ADC, ROR, RRA, // 6x
        BVS, ADC, YYY, RRA, NOP, ADC, ROR, RRA, SEI, ADC, NOP, RRA, NOP, ADC, ROR, RRA, // 7x
        NOP, STA, NOP, SAX, STY, STA, STX, SAX, DEY, NOP, TXA, YYY, STY, STA, STX, SAX, // 8x
        BCC, STA, YYY, YYY, STY, STA, STX, SAX, TYA, STA, TXS, YYY, YYY, STA, YYY, YYY, // 9x
        LDY, LDA, LDX, LAX, LDY, LDA, LDX, LAX, TAY, LDA, TAX, LAX, LDY, LDA, LDX, LAX, // Ax
        BCS, LDA, YYY, LAX, LDY, LDA, LDX, LAX, CLV, LDA, TSX, YYY, LDY, LDA, LDX, LAX, // Bx
        CPY, CMP, NOP, DCP, CPY, CMP, DEC, DCP, INY, CMP, DEX, YYY, CPY, CMP, DEC, DCP, // Cx
        BNE, CMP, YYY, DCP, NOP, CMP, DEC, DCP, CLD, CMP, NOP, DCP, NOP, CMP, DEC, DCP, // Dx
        CPX, SBC, NOP, ISB, CPX, SBC, INC, ISB, INX, SBC, NOP, SBC, CPX, SBC, INC, ISB, // Ex
        BEQ, SBC, YYY, ISB, NOP, SBC, INC, ISB, SED, SBC, NOP, ISB, NOP, SBC, INC, ISB, // Fx
    ];

    pub(super) const LEGAL: [u8; 256] = [
    /*  x0 x1 x2 x3 x4 x5 x6 x7 x8 x9 xA xB xC xD xE xF */
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 1, 0, 0, 1, 1, 0, // 0x
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, // 1x
        1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, // 2x
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, // 3x
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, // 4x
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, // 5x
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, // 6x
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, // 7x
        0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 1, 0, 1, 1, 1, 0, // 8x
        1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 0, 0, 1, 0, 0, // 9x
        1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, // Ax
        1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, // Bx
        1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, // Cx
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, // Dx
        1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, // Ex
        1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, // Fx
    ];

    pub(super) const CYCLES: [u8; 256] = [
    /*  x0 x1 x2 x3 x4 x5 x6 x7 x8 x9 xA xB xC xD xE xF */
        7, 6, 0, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 0x
        2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 1x
        6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 2x
        2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 3x
        6, 6, 0, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // 4x
        2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 5x
        6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 6x
        2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 7x
        2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 8x
        2, 6, 0, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // 9x
        2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // Ax
        2, 5, 0, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // Bx
        2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // Cx
        2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // Dx
        2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // Ex
        2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // Fx
    ];

    pub(super) const EXTRA: [u8; 256] = [
    /*  x0 x1 x2 x3 x4 x5 x6 x7 x8 x9 xA xB xC xD xE xF */
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 0x
        1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 1x
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 2x
        1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 3x
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 4x
        1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 5x
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 6x
        1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // 7x
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 8x
        1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 9x
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // Ax
        1, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 1, // Bx
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // Cx
        1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // Dx
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // Ex
        1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, // Fx
    ];
}
