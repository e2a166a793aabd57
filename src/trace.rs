//! Per-instruction trace records and the nestest log format.
//!
//! The CPU hands a [`TraceRecord`] to its [`TraceSink`] after decoding and
//! address resolution, before the instruction executes, so registers and the
//! operand value are the pre-execution state. [`NestestLog`] renders records
//! in the layout of the reference `nestest.log`:
//!
//! ```text
//! C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7
//! ```

use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    cpu::opcodes::{AddressingMode, Instruction},
    error::EmuError,
};

/// End of the register columns (`... SP:FD`) in a nestest line.
pub const REGISTER_COLUMNS_END: usize = 73;

/// Operand as resolved by the addressing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperandTrace {
    /// Raw operand: zero-page byte or absolute word.
    pub base: u16,
    /// Intermediate pointer: `($zp,X)` slot or `($zp),Y` target before indexing.
    pub pointer: u16,
    /// Effective address.
    pub address: u16,
    /// Byte at the effective address before execution.
    pub value: u8,
}

/// Everything the core reports about one executed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub pc: u16,
    pub opcode: u8,
    pub operand_bytes: Vec<u8>,
    pub instruction: Instruction,
    pub mode: AddressingMode,
    pub legal: bool,
    pub operand: OperandTrace,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub sp: u8,
    pub scanline: u16,
    pub position: u16,
    pub cycles: usize,
}

/// Receiver of trace records. Lives on the engine thread.
pub trait TraceSink: Send {
    fn record(&mut self, record: &TraceRecord);

    /// Flush buffered output and report the first write error, if any.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory sink whose handle can be cloned out before the CPU moves threads.
#[derive(Clone, Default)]
pub struct SharedTrace {
    records: Arc<Mutex<Vec<TraceRecord>>>,
}

impl SharedTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceSink for SharedTrace {
    fn record(&mut self, record: &TraceRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Writes records as nestest log lines.
pub struct NestestLog<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> NestestLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// Hand back the writer, or the first error hit while writing.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write + Send> TraceSink for NestestLog<W> {
    fn record(&mut self, record: &TraceRecord) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{}", format_line(record)) {
            self.error = Some(err);
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()
    }
}

/// Disassembly of the operand, nestest style.
pub fn format_operand(record: &TraceRecord) -> String {
    let op = &record.operand;
    match record.mode {
        AddressingMode::Immediate => format!("#${:02X}", op.value),
        AddressingMode::ZeroPage => format!("${:02X} = {:02X}", op.address, op.value),
        AddressingMode::ZeroPageX => {
            format!("${:02X},X @ {:02X} = {:02X}", op.base, op.address, op.value)
        }
        AddressingMode::ZeroPageY => {
            format!("${:02X},Y @ {:02X} = {:02X}", op.base, op.address, op.value)
        }
        AddressingMode::IndirectX => format!(
            "(${:02X},X) @ {:02X} = {:04X} = {:02X}",
            op.base, op.pointer, op.address, op.value
        ),
        AddressingMode::IndirectY => format!(
            "(${:02X}),Y = {:04X} @ {:04X} = {:02X}",
            op.base, op.pointer, op.address, op.value
        ),
        AddressingMode::Absolute => match record.instruction {
            Instruction::JMP | Instruction::JSR => format!("${:04X}", op.address),
            _ => format!("${:04X} = {:02X}", op.address, op.value),
        },
        AddressingMode::AbsoluteX => {
            format!("${:04X},X @ {:04X} = {:02X}", op.base, op.address, op.value)
        }
        AddressingMode::AbsoluteY => {
            format!("${:04X},Y @ {:04X} = {:02X}", op.base, op.address, op.value)
        }
        AddressingMode::Indirect => format!("(${:04X}) = {:04X}", op.base, op.address),
        AddressingMode::Relative => format!("${:04X}", op.address),
        AddressingMode::Implied if record.instruction.is_shift() => "A".to_string(),
        AddressingMode::Implied => String::new(),
    }
}

/// One full nestest line, without the trailing newline.
pub fn format_line(record: &TraceRecord) -> String {
    let bytes = std::iter::once(record.opcode)
        .chain(record.operand_bytes.iter().copied())
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    let marker = if record.legal { ' ' } else { '*' };
    format!(
        "{:04X}  {:<8} {}{} {:<28}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PPU:{:>3},{:>3} CYC:{}",
        record.pc,
        bytes,
        marker,
        record.instruction,
        format_operand(record),
        record.a,
        record.x,
        record.y,
        record.p,
        record.sp,
        record.scanline,
        record.position,
        record.cycles,
    )
}

/// Compare our log against a reference log line by line.
///
/// Only the first `end` columns of each line are compared when given. Stops at
/// the end of `ours`; returns the number of lines checked.
pub fn compare_logs(ours: &str, reference: &str, end: Option<usize>) -> Result<usize, EmuError> {
    let mut reference_lines = reference.lines();
    let mut checked = 0;

    for (i, emu_line) in ours.lines().enumerate() {
        let line = i + 1;
        let Some(ref_line) = reference_lines.next() else {
            return Err(EmuError::TraceMismatch {
                line,
                detail: "reference log ended early".to_string(),
            });
        };
        checked = line;
        if emu_line == ref_line {
            continue;
        }

        let mut emu_tokens = emu_line.split_whitespace();
        let mut ref_tokens = ref_line.split_whitespace();
        for what in ["Address", "Opcode"] {
            let expected = ref_tokens.next().unwrap_or("");
            let saw = emu_tokens.next().unwrap_or("");
            if expected != saw {
                return Err(EmuError::TraceMismatch {
                    line,
                    detail: format!("{what} mismatch: {expected} expected, but saw {saw}"),
                });
            }
        }

        let (ref_fragment, emu_fragment) = match end {
            Some(end) => (prefix(ref_line, end), prefix(emu_line, end)),
            None => (ref_line, emu_line),
        };
        if ref_fragment != emu_fragment {
            return Err(EmuError::TraceMismatch {
                line,
                detail: format!("\nExpected: {ref_fragment}\nSaw:      {emu_fragment}"),
            });
        }
    }
    Ok(checked)
}

fn prefix(line: &str, end: usize) -> &str {
    line.get(..end).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mode: AddressingMode, instruction: Instruction, bytes: &[u8]) -> TraceRecord {
        TraceRecord {
            pc: 0xC000,
            opcode: 0x4C,
            operand_bytes: bytes.to_vec(),
            instruction,
            mode,
            legal: true,
            operand: OperandTrace::default(),
            a: 0,
            x: 0,
            y: 0,
            p: 0x24,
            sp: 0xFD,
            scanline: 0,
            position: 21,
            cycles: 7,
        }
    }

    #[test]
    fn jmp_line_matches_nestest() {
        let mut r = record(AddressingMode::Absolute, Instruction::JMP, &[0xF5, 0xC5]);
        r.operand.address = 0xC5F5;
        assert_eq!(
            format_line(&r),
            "C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7"
        );
    }

    #[test]
    fn illegal_opcode_is_starred() {
        let mut r = record(AddressingMode::ZeroPage, Instruction::NOP, &[0xA9]);
        r.pc = 0xC6BD;
        r.opcode = 0x04;
        r.legal = false;
        r.operand.address = 0xA9;
        let line = format_line(&r);
        assert!(line.starts_with("C6BD  04 A9    *NOP $A9 = 00"), "{line}");
        assert_eq!(line.find("A:"), Some(48));
    }

    #[test]
    fn operand_renderings() {
        let mut r = record(AddressingMode::IndirectY, Instruction::LDA, &[0x89]);
        r.operand = OperandTrace {
            base: 0x89,
            pointer: 0x0300,
            address: 0x0300,
            value: 0x89,
        };
        assert_eq!(format_operand(&r), "($89),Y = 0300 @ 0300 = 89");

        r.mode = AddressingMode::IndirectX;
        r.operand = OperandTrace {
            base: 0x80,
            pointer: 0x80,
            address: 0x0200,
            value: 0x5A,
        };
        assert_eq!(format_operand(&r), "($80,X) @ 80 = 0200 = 5A");

        r.mode = AddressingMode::Implied;
        r.instruction = Instruction::LSR;
        assert_eq!(format_operand(&r), "A");
        r.instruction = Instruction::INX;
        assert_eq!(format_operand(&r), "");
    }

    #[test]
    fn compare_reports_first_mismatch() {
        let reference = "C000  4C F5 C5  JMP\nC5F5  A2 00     LDX\n";
        assert_eq!(compare_logs(reference, reference, None).unwrap(), 2);

        let ours = "C000  4C F5 C5  JMP\nC5F6  A2 00     LDX\n";
        match compare_logs(ours, reference, None) {
            Err(EmuError::TraceMismatch { line, detail }) => {
                assert_eq!(line, 2);
                assert!(detail.starts_with("Address mismatch"), "{detail}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn compare_can_ignore_trailing_columns() {
        let reference = "C000  4C  A:00 PPU:  0, 21";
        let ours = "C000  4C  A:00 PPU:  0, 24";
        assert!(compare_logs(ours, reference, None).is_err());
        assert_eq!(compare_logs(ours, reference, Some(14)).unwrap(), 1);
    }
}
