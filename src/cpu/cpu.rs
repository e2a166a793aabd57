use std::io;

use crate::{
    bus::Bus,
    cpu::{
        flags::{BREAK_BITS, Flags},
        opcodes::{AddressingMode, Instruction, OpcodeInfo, cycle_count, decode},
    },
    error::CpuError,
    trace::{OperandTrace, TraceRecord, TraceSink},
};

pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;
pub const STACK_BASE: u16 = 0x0100;

/// SP after the reset sequence (three phantom pushes from $00).
const RESET_SP: u8 = 0xFD;
/// The reset sequence takes 7 cycles.
pub const RESET_CYCLES: usize = 7;

/// Operand location produced by the addressing stage.
#[derive(Debug, Clone, Copy, Default)]
struct Operand {
    base: u16,
    pointer: u16,
    address: u16,
    page_crossed: bool,
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub flags: Flags,
    pub cycles: usize,
    pub bus: B,
    trace: Option<Box<dyn TraceSink>>,
}

impl<B: Bus> CPU<B> {
    /// Power-on state; call [`CPU::reset`] before stepping.
    pub fn new(bus: B) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: RESET_SP,
            pc: 0,
            flags: Flags::power_up(),
            cycles: 0,
            bus,
            trace: None,
        }
    }

    /// Run the reset sequence: registers to their reset values, PC from the
    /// reset vector, 7 cycles spent (and 21 PPU dots).
    pub fn reset(&mut self) {
        self.sp = RESET_SP;
        self.flags = Flags::power_up();
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.load_reset_vector();

        self.cycles = RESET_CYCLES;
        self.bus.tick(RESET_CYCLES);
        log::info!("CPU reset, PC=${:04X}", self.pc);
    }

    pub fn load_reset_vector(&mut self) {
        self.pc = self.bus.read_word(RESET_VECTOR, false);
    }

    /// Start execution somewhere other than the reset vector (nestest runs from $C000).
    pub fn set_program_counter(&mut self, addr: u16) {
        self.pc = addr;
    }

    pub fn processor_status(&self) -> u8 {
        self.flags.to_byte()
    }

    pub fn set_processor_status(&mut self, status: u8) {
        self.flags = Flags::from_byte(status);
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.trace.take()
    }

    pub fn flush_trace(&mut self) -> io::Result<()> {
        match self.trace.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    /// Execute one instruction and return the cycles it consumed.
    ///
    /// Effects are applied all at once; the PPU is advanced by 3 dots per cycle
    /// afterwards.
    pub fn step(&mut self) -> Result<usize, CpuError> {
        let pc = self.pc;
        let opcode = self.bus.read(pc);
        let info = decode(opcode, pc).inspect_err(|err| log::error!("{err}"))?;
        self.pc = pc.wrapping_add(1);

        let operand = self.resolve(info.mode);
        // Branches and indirect JMP only need the address.
        let fetched = !info.instruction.skips_operand_read()
            && !matches!(
                info.mode,
                AddressingMode::Implied | AddressingMode::Relative | AddressingMode::Indirect
            );
        let value = match info.mode {
            AddressingMode::Implied => self.a,
            _ if fetched => self.bus.read(operand.address),
            _ => 0,
        };

        if self.trace.is_some() {
            let record = self.trace_record(pc, info, &operand, fetched, value);
            if let Some(sink) = self.trace.as_mut() {
                sink.record(&record);
            }
        }

        let mut extra = self.execute(info, &operand, value);
        if info.extra_cycle && operand.page_crossed {
            extra += 1;
        }

        let cycles = cycle_count(info.opcode, extra);
        self.cycles += cycles;
        self.bus.tick(cycles);
        Ok(cycles)
    }

    fn fetch_byte(&mut self) -> u8 {
        let byte = self.bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }

    /// Consume the operand bytes and compute the effective address.
    fn resolve(&mut self, mode: AddressingMode) -> Operand {
        match mode {
            AddressingMode::Implied => Operand::default(),
            AddressingMode::Immediate => {
                let address = self.pc;
                self.pc = self.pc.wrapping_add(1);
                Operand {
                    base: address,
                    address,
                    ..Operand::default()
                }
            }
            AddressingMode::ZeroPage => {
                let address = self.fetch_byte() as u16;
                Operand {
                    base: address,
                    address,
                    ..Operand::default()
                }
            }
            AddressingMode::ZeroPageX | AddressingMode::ZeroPageY => {
                let index = if mode == AddressingMode::ZeroPageX { self.x } else { self.y };
                let base = self.fetch_byte();
                Operand {
                    base: base as u16,
                    address: base.wrapping_add(index) as u16,
                    ..Operand::default()
                }
            }
            AddressingMode::Absolute => {
                let address = self.fetch_word();
                Operand {
                    base: address,
                    address,
                    ..Operand::default()
                }
            }
            AddressingMode::AbsoluteX | AddressingMode::AbsoluteY => {
                let index = if mode == AddressingMode::AbsoluteX { self.x } else { self.y };
                let base = self.fetch_word();
                let address = base.wrapping_add(index as u16);
                Operand {
                    base,
                    address,
                    page_crossed: crosses_page(base, address),
                    ..Operand::default()
                }
            }
            AddressingMode::IndirectX => {
                let base = self.fetch_byte();
                let pointer = base.wrapping_add(self.x) as u16;
                Operand {
                    base: base as u16,
                    pointer,
                    address: self.bus.read_word(pointer, true),
                    page_crossed: false,
                }
            }
            AddressingMode::IndirectY => {
                let base = self.fetch_byte() as u16;
                let pointer = self.bus.read_word(base, true);
                let address = pointer.wrapping_add(self.y as u16);
                Operand {
                    base,
                    pointer,
                    address,
                    page_crossed: crosses_page(pointer, address),
                }
            }
            AddressingMode::Indirect => {
                // Hardware bug: the pointer's high byte never leaves its page.
                let base = self.fetch_word();
                Operand {
                    base,
                    address: self.bus.read_word(base, true),
                    ..Operand::default()
                }
            }
            AddressingMode::Relative => {
                let offset = self.fetch_byte() as i8;
                let address = self.pc.wrapping_add(offset as u16);
                Operand {
                    base: address,
                    address,
                    ..Operand::default()
                }
            }
        }
    }

    fn trace_record(
        &self,
        pc: u16,
        info: &OpcodeInfo,
        operand: &Operand,
        fetched: bool,
        value: u8,
    ) -> TraceRecord {
        let operand_bytes = (1..=info.mode.operand_len())
            .map(|i| self.bus.peek(pc.wrapping_add(i)))
            .collect();
        let value = if fetched || info.mode == AddressingMode::Implied {
            value
        } else {
            self.bus.peek(operand.address)
        };
        let (scanline, position) = self.bus.ppu_position();
        TraceRecord {
            pc,
            opcode: info.opcode,
            operand_bytes,
            instruction: info.instruction,
            mode: info.mode,
            legal: info.legal,
            operand: OperandTrace {
                base: operand.base,
                pointer: operand.pointer,
                address: operand.address,
                value,
            },
            a: self.a,
            x: self.x,
            y: self.y,
            p: self.processor_status(),
            sp: self.sp,
            scanline,
            position,
            cycles: self.cycles,
        }
    }

    /// Apply the instruction. Returns branch cycles (page-cross extras are added by `step`).
    fn execute(&mut self, info: &OpcodeInfo, operand: &Operand, m: u8) -> usize {
        let addr = operand.address;
        let mode = info.mode;
        match info.instruction {
            Instruction::ADC => self.adc(m),
            Instruction::SBC => self.adc(!m),
            Instruction::AND => {
                self.a &= m;
                self.set_nz(self.a);
            }
            Instruction::ORA => {
                self.a |= m;
                self.set_nz(self.a);
            }
            Instruction::EOR => {
                self.a ^= m;
                self.set_nz(self.a);
            }
            Instruction::ASL | Instruction::LSR | Instruction::ROL | Instruction::ROR => {
                self.shift(info.instruction, mode, addr, m);
            }
            Instruction::BIT => {
                self.flags.z = self.a & m == 0;
                self.flags.v = m & 0x40 != 0;
                self.flags.n = m & 0x80 != 0;
            }

            Instruction::BCC => return self.branch(!self.flags.c, addr),
            Instruction::BCS => return self.branch(self.flags.c, addr),
            Instruction::BEQ => return self.branch(self.flags.z, addr),
            Instruction::BNE => return self.branch(!self.flags.z, addr),
            Instruction::BMI => return self.branch(self.flags.n, addr),
            Instruction::BPL => return self.branch(!self.flags.n, addr),
            Instruction::BVS => return self.branch(self.flags.v, addr),
            Instruction::BVC => return self.branch(!self.flags.v, addr),

            Instruction::BRK => self.brk(),
            Instruction::CLC => self.flags.c = false,
            Instruction::CLD => self.flags.d = false,
            Instruction::CLI => self.flags.i = false,
            Instruction::CLV => self.flags.v = false,
            Instruction::SEC => self.flags.c = true,
            Instruction::SED => self.flags.d = true,
            Instruction::SEI => self.flags.i = true,

            Instruction::CMP => self.compare(self.a, m),
            Instruction::CPX => self.compare(self.x, m),
            Instruction::CPY => self.compare(self.y, m),

            Instruction::DEC => {
                let r = m.wrapping_sub(1);
                self.bus.write(addr, r);
                self.set_nz(r);
            }
            Instruction::INC => {
                let r = m.wrapping_add(1);
                self.bus.write(addr, r);
                self.set_nz(r);
            }
            Instruction::DEX => {
                self.x = self.x.wrapping_sub(1);
                self.set_nz(self.x);
            }
            Instruction::DEY => {
                self.y = self.y.wrapping_sub(1);
                self.set_nz(self.y);
            }
            Instruction::INX => {
                self.x = self.x.wrapping_add(1);
                self.set_nz(self.x);
            }
            Instruction::INY => {
                self.y = self.y.wrapping_add(1);
                self.set_nz(self.y);
            }

            Instruction::JMP => self.pc = addr,
            Instruction::JSR => {
                self.push_word(self.pc.wrapping_sub(1));
                self.pc = addr;
            }
            Instruction::RTS => self.pc = self.pop_word().wrapping_add(1),
            Instruction::RTI => {
                self.plp();
                self.pc = self.pop_word();
            }

            Instruction::LDA => {
                self.a = m;
                self.set_nz(m);
            }
            Instruction::LDX => {
                self.x = m;
                self.set_nz(m);
            }
            Instruction::LDY => {
                self.y = m;
                self.set_nz(m);
            }
            Instruction::LAX => {
                self.a = m;
                self.x = m;
                self.set_nz(m);
            }

            Instruction::NOP => {}

            Instruction::PHA => self.push(self.a),
            Instruction::PHP => self.push(self.processor_status() | BREAK_BITS),
            Instruction::PLA => {
                self.a = self.pop();
                self.set_nz(self.a);
            }
            Instruction::PLP => self.plp(),

            Instruction::STA => self.bus.write(addr, self.a),
            Instruction::STX => self.bus.write(addr, self.x),
            Instruction::STY => self.bus.write(addr, self.y),
            Instruction::SAX => self.bus.write(addr, self.a & self.x),

            Instruction::TAX => {
                self.x = self.a;
                self.set_nz(self.x);
            }
            Instruction::TAY => {
                self.y = self.a;
                self.set_nz(self.y);
            }
            Instruction::TSX => {
                self.x = self.sp;
                self.set_nz(self.x);
            }
            Instruction::TXA => {
                self.a = self.x;
                self.set_nz(self.a);
            }
            Instruction::TXS => self.sp = self.x,
            Instruction::TYA => {
                self.a = self.y;
                self.set_nz(self.a);
            }

            // Undocumented read-modify-write combos
            Instruction::DCP => {
                let r = m.wrapping_sub(1);
                self.bus.write(addr, r);
                self.compare(self.a, r);
            }
            Instruction::ISB => {
                let r = m.wrapping_add(1);
                self.bus.write(addr, r);
                self.adc(!r);
            }
            Instruction::SLO => {
                let r = self.shift(Instruction::ASL, mode, addr, m);
                self.a |= r;
                self.set_nz(self.a);
            }
            Instruction::SRE => {
                let r = self.shift(Instruction::LSR, mode, addr, m);
                self.a ^= r;
                self.set_nz(self.a);
            }
            Instruction::RLA => {
                let r = self.shift(Instruction::ROL, mode, addr, m);
                self.a &= r;
                self.set_nz(self.a);
            }
            Instruction::RRA => {
                let r = self.shift(Instruction::ROR, mode, addr, m);
                self.adc(r);
            }
        }
        0
    }

    pub fn set_nz(&mut self, value: u8) {
        self.flags.z = value == 0;
        self.flags.n = value & 0x80 != 0;
    }

    /// 9-bit add with carry; SBC is `adc(!m)`.
    fn adc(&mut self, m: u8) {
        let sum = self.a as u16 + m as u16 + self.flags.c as u16;
        let result = sum as u8;
        self.flags.c = sum > 0xFF;
        self.flags.v = (self.a ^ result) & (m ^ result) & 0x80 != 0;
        self.a = result;
        self.set_nz(result);
    }

    fn compare(&mut self, register: u8, m: u8) {
        self.flags.c = register >= m;
        self.set_nz(register.wrapping_sub(m));
    }

    /// ASL/LSR/ROL/ROR on A (implied) or memory. Returns the result.
    fn shift(&mut self, op: Instruction, mode: AddressingMode, addr: u16, m: u8) -> u8 {
        let carry_in = self.flags.c as u8;
        let (result, carry_out) = match op {
            Instruction::ASL => (m << 1, m & 0x80 != 0),
            Instruction::LSR => (m >> 1, m & 0x01 != 0),
            Instruction::ROL => ((m << 1) | carry_in, m & 0x80 != 0),
            _ => ((m >> 1) | (carry_in << 7), m & 0x01 != 0),
        };
        self.flags.c = carry_out;
        self.set_nz(result);
        if mode == AddressingMode::Implied {
            self.a = result;
        } else {
            self.bus.write(addr, result);
        }
        result
    }

    /// Taken: +1 cycle, +1 more when the target is on another page than the next instruction.
    fn branch(&mut self, condition: bool, target: u16) -> usize {
        if !condition {
            return 0;
        }
        let extra = if crosses_page(self.pc, target) { 2 } else { 1 };
        self.pc = target;
        extra
    }

    fn brk(&mut self) {
        self.push_word(self.pc.wrapping_add(1)); // skip the padding byte
        self.push(self.processor_status() | BREAK_BITS);
        self.flags.i = true;
        self.pc = self.bus.read_word(IRQ_VECTOR, false);
    }

    /// Pull P; the break bits are not real flags and keep their current value.
    fn plp(&mut self) {
        let pulled = Flags::from_byte(self.pop());
        self.flags = Flags {
            b1: self.flags.b1,
            b2: self.flags.b2,
            ..pulled
        };
    }

    fn push(&mut self, value: u8) {
        let addr = STACK_BASE | self.sp as u16;
        self.bus.write_direct(addr as u32, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = STACK_BASE | self.sp as u16;
        self.bus.read_direct(addr as u32)
    }

    fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }
}

fn crosses_page(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}
