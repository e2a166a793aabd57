//! Famicore command-line driver.
//!
//! Loads a cartridge, moves the CPU onto its engine thread and feeds it cycles.
//! Usage: famicore nestest test/nestest.nes --reference test/nestest.log

use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
};

use ansi_term::Colour::{Green, Red};
use clap::{Parser, Subcommand, ValueEnum};
use famicore::{
    bus::{AddressSpace, Bus},
    cartridge::cartridge::Cartridge,
    clock::Console,
    cpu::{
        cpu::CPU,
        opcodes::{addressing_mode, instruction, is_legal},
    },
    error::EmuError,
    logger,
    trace::{NestestLog, REGISTER_COLUMNS_END, compare_logs},
};
use log::LevelFilter;

/// CPU cycle counter at the end of the reference nestest.log.
const NESTEST_CYCLES: u64 = 26_555;
/// One NTSC frame: 341 * 262 / 3 CPU cycles.
const FRAME_CYCLES: u64 = 29_781;

#[derive(Parser, Debug)]
#[command(name = "famicore")]
#[command(about = "Cycle-paced NES 6502 core", long_about = None)]
struct Args {
    /// error, warn, info, debug, trace or off
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run nestest in automation mode and write a nestest-format trace
    Nestest {
        /// Path to nestest.nes
        rom: PathBuf,

        /// Stop once the CPU cycle counter (7 after reset) reaches this value
        #[arg(long, default_value_t = NESTEST_CYCLES)]
        cycles: u64,

        /// Where to write the trace
        #[arg(long, default_value = "nestest-trace.log")]
        trace: PathBuf,

        /// Reference log to compare against
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Compare PC, bytes, disassembly and registers only (ignore PPU and CYC)
        #[arg(long)]
        registers_only: bool,

        /// Start address in hex
        #[arg(long, value_parser = parse_address, default_value = "C000")]
        start: u16,
    },
    /// Run a cartridge from its reset vector
    Run {
        rom: PathBuf,

        #[arg(long, default_value_t = FRAME_CYCLES)]
        cycles: u64,
    },
    /// Print one of the opcode tables as a 16x16 grid
    Table {
        #[arg(value_enum, default_value_t = TableKind::Instructions)]
        kind: TableKind,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TableKind {
    Modes,
    Instructions,
    Legal,
}

fn parse_address(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches('$').trim_start_matches("0x");
    u16::from_str_radix(digits, 16).map_err(|err| format!("bad address {s:?}: {err}"))
}

fn main() -> Result<(), EmuError> {
    let args = Args::parse();
    if let Err(err) = logger::init(args.log_level) {
        eprintln!("{err}");
    }

    match args.command {
        Command::Nestest {
            rom,
            cycles,
            trace,
            reference,
            registers_only,
            start,
        } => nestest(rom, cycles, trace, reference, registers_only, start),
        Command::Run { rom, cycles } => run(rom, cycles),
        Command::Table { kind } => {
            print_table(kind);
            Ok(())
        }
    }
}

fn nestest(
    rom: PathBuf,
    cycles: u64,
    trace: PathBuf,
    reference: Option<PathBuf>,
    registers_only: bool,
    start: u16,
) -> Result<(), EmuError> {
    let mut space = Cartridge::load(&rom)?.into_address_space()?;
    // APU and I/O registers read back $FF on the test's hardware.
    for addr in 0x4000..=0x401F {
        space.write(addr, 0xFF);
    }

    let mut cpu = CPU::new(space);
    cpu.reset();
    cpu.set_program_counter(start);
    cpu.set_trace_sink(Box::new(NestestLog::new(BufWriter::new(File::create(
        &trace,
    )?))));

    let budget = cycles.saturating_sub(cpu.cycles as u64);
    let cpu = drive(cpu, budget)?;
    log::info!(
        "nestest result codes: $02=${:02X} $03=${:02X}",
        cpu.bus.peek(0x0002),
        cpu.bus.peek(0x0003)
    );

    let Some(reference) = reference else {
        return Ok(());
    };
    let ours = fs::read_to_string(&trace)?;
    let theirs = fs::read_to_string(&reference)?;
    let end = registers_only.then_some(REGISTER_COLUMNS_END);
    match compare_logs(&ours, &theirs, end) {
        Ok(lines) => {
            println!("{} {} lines match", Green.bold().paint("PASS"), lines);
            Ok(())
        }
        Err(err) => {
            println!("{} {}", Red.bold().paint("FAIL"), err);
            Err(err)
        }
    }
}

fn run(rom: PathBuf, cycles: u64) -> Result<(), EmuError> {
    let mut cpu = CPU::new(Cartridge::load(&rom)?.into_address_space()?);
    cpu.reset();
    let cpu = drive(cpu, cycles)?;
    let (scanline, position) = cpu.bus.ppu_position();
    println!(
        "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PPU:{:>3},{:>3} CYC:{}",
        cpu.pc,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.processor_status(),
        cpu.sp,
        scanline,
        position,
        cpu.cycles
    );
    Ok(())
}

/// Hand the CPU to an engine thread, grant `cycles` one by one, drain and take it back.
fn drive(cpu: CPU<AddressSpace>, cycles: u64) -> Result<CPU<AddressSpace>, EmuError> {
    let console = Console::start(cpu);
    for _ in 0..cycles {
        console.request_cycle();
    }
    let mut cpu = console.stop()?;
    cpu.flush_trace()?;
    Ok(cpu)
}

fn print_table(kind: TableKind) {
    print!("   ");
    for col in 0..16 {
        print!("  x{col:X}");
    }
    println!();
    for row in 0..16u8 {
        print!("{row:X}x ");
        for col in 0..16u8 {
            let opcode = (row << 4) | col;
            let cell = match kind {
                TableKind::Modes => addressing_mode(opcode).map_or("---", |m| m.name()).to_string(),
                TableKind::Instructions => {
                    instruction(opcode).map_or_else(|| "---".to_string(), |i| i.to_string())
                }
                TableKind::Legal => u8::from(is_legal(opcode)).to_string(),
            };
            print!(" {cell:>3}");
        }
        println!();
    }
}
