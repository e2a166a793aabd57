//! Cycle pacing between a driver thread and the CPU engine thread.
//!
//! The driver grants cycles one at a time (or in batches) through
//! [`Console::request_cycles`]; the engine consumes exactly the cycles it was
//! granted and blocks otherwise. An instruction is executed when its first
//! cycle is granted, and the engine then waits out its remaining cycles.
//!
//! Shutdown comes in two flavours:
//! - [`Console::stop`] drains every cycle requested so far, then halts.
//! - [`Console::kill`] halts as soon as the instruction in flight is done and
//!   discards the rest.

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use crate::{
    bus::Bus,
    cpu::cpu::CPU,
    error::{CpuError, EmuError},
};

/// Lifecycle of the engine thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Draining,
    Terminated,
}

/// Outcome of waiting for a cycle grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Proceed,
    Halt,
}

#[derive(Debug)]
struct GateState {
    requested: u64,
    executed: u64,
    /// Set by a graceful stop: the engine halts once `executed` reaches it.
    drain_limit: Option<u64>,
    killed: bool,
    state: RunState,
}

/// Shared counters plus the condvar both sides sleep on.
#[derive(Debug)]
pub struct CycleGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl CycleGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                requested: 0,
                executed: 0,
                drain_limit: None,
                killed: false,
                state: RunState::Idle,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn request_cycles(&self, n: u64) {
        let mut s = self.lock();
        s.requested += n;
        log::trace!("requested {} cycle(s), total {}", n, s.requested);
        self.changed.notify_all();
    }

    /// Let the engine finish what has been requested, then halt.
    pub fn drain(&self) {
        let mut s = self.lock();
        s.drain_limit = Some(s.requested);
        if s.state == RunState::Running {
            s.state = RunState::Draining;
        }
        log::trace!("draining up to cycle {}", s.requested);
        self.changed.notify_all();
    }

    /// Halt without consuming outstanding requests.
    pub fn kill(&self) {
        let mut s = self.lock();
        s.killed = true;
        log::trace!("killed at cycle {} of {}", s.executed, s.requested);
        self.changed.notify_all();
    }

    /// Block until one more cycle has been granted and count it as executed.
    pub fn wait_for_cycle(&self) -> Wait {
        let mut s = self.lock();
        loop {
            if s.killed || s.drain_limit.is_some_and(|limit| s.executed >= limit) {
                return Wait::Halt;
            }
            if s.requested > s.executed {
                s.executed += 1;
                self.changed.notify_all();
                return Wait::Proceed;
            }
            s = self
                .changed
                .wait(s)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    fn set_state(&self, state: RunState) {
        let mut s = self.lock();
        log::trace!("engine {:?} -> {:?}", s.state, state);
        s.state = state;
        self.changed.notify_all();
    }

    pub fn executed(&self) -> u64 {
        self.lock().executed
    }

    pub fn requested(&self) -> u64 {
        self.lock().requested
    }
}

impl Default for CycleGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine loop: one instruction per granted first cycle, then its remaining cycles.
pub fn run<B: Bus>(cpu: &mut CPU<B>, gate: &CycleGate) -> Result<(), CpuError> {
    'engine: loop {
        if gate.wait_for_cycle() == Wait::Halt {
            break;
        }
        let cycles = cpu.step()?;
        for _ in 1..cycles {
            if gate.wait_for_cycle() == Wait::Halt {
                break 'engine;
            }
        }
    }
    Ok(())
}

type Engine<B> = JoinHandle<(CPU<B>, Result<(), CpuError>)>;

/// Driver-side handle to a CPU running on its own thread.
pub struct Console<B: Bus + Send + 'static> {
    gate: Arc<CycleGate>,
    engine: Option<Engine<B>>,
}

impl<B: Bus + Send + 'static> Console<B> {
    /// Move `cpu` onto a new engine thread. Nothing executes until cycles are requested.
    pub fn start(mut cpu: CPU<B>) -> Self {
        let gate = Arc::new(CycleGate::new());
        gate.set_state(RunState::Running);

        let engine_gate = Arc::clone(&gate);
        let engine = thread::spawn(move || {
            let result = run(&mut cpu, &engine_gate);
            if let Err(err) = &result {
                log::error!("engine halted: {err}");
            }
            engine_gate.set_state(RunState::Terminated);
            (cpu, result)
        });
        log::info!("engine started");

        Self {
            gate,
            engine: Some(engine),
        }
    }

    pub fn request_cycle(&self) {
        self.gate.request_cycles(1);
    }

    pub fn request_cycles(&self, n: u64) {
        self.gate.request_cycles(n);
    }

    /// Graceful: execute every cycle requested so far, then hand the CPU back.
    pub fn stop(mut self) -> Result<CPU<B>, EmuError> {
        self.gate.drain();
        self.join()
    }

    /// Forceful: finish the current instruction, discard the rest, hand the CPU back.
    pub fn kill(mut self) -> Result<CPU<B>, EmuError> {
        self.gate.kill();
        self.join()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), RunState::Running | RunState::Draining)
    }

    pub fn state(&self) -> RunState {
        self.gate.state()
    }

    pub fn cycles_executed(&self) -> u64 {
        self.gate.executed()
    }

    fn join(&mut self) -> Result<CPU<B>, EmuError> {
        let engine = self.engine.take().ok_or(EmuError::EnginePanicked)?;
        let (cpu, result) = engine.join().map_err(|_| EmuError::EnginePanicked)?;
        log::info!(
            "engine stopped after {} of {} requested cycles",
            self.gate.executed(),
            self.gate.requested()
        );
        result?;
        Ok(cpu)
    }
}

impl<B: Bus + Send + 'static> Drop for Console<B> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.gate.kill();
            // Decode failures are already logged by the engine thread.
            if engine.join().is_err() {
                log::error!("engine thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{AddressSpace, PRG_BANK_SIZE};

    /// One NROM bank of NOPs with the reset vector pointing at $8000.
    fn nop_cpu() -> CPU<AddressSpace> {
        let mut prg = vec![0xEA; PRG_BANK_SIZE];
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        let mut space = AddressSpace::nrom();
        space.load_prg(&prg).unwrap();
        let mut cpu = CPU::new(space);
        cpu.reset();
        cpu
    }

    #[test]
    fn nothing_runs_without_requests() {
        let console = Console::start(nop_cpu());
        assert!(console.is_running());
        assert_eq!(console.state(), RunState::Running);
        let cpu = console.kill().unwrap();
        assert_eq!(cpu.cycles, 7);
        assert_eq!(cpu.pc, 0x8000);
    }

    #[test]
    fn stop_drains_requested_cycles() {
        let console = Console::start(nop_cpu());
        for _ in 0..100 {
            console.request_cycle();
        }
        let cpu = console.stop().unwrap();
        assert_eq!(cpu.cycles, 7 + 100);
        assert_eq!(cpu.pc, 0x8000 + 50);
    }

    #[test]
    fn stop_mid_instruction_keeps_its_effects() {
        let console = Console::start(nop_cpu());
        console.request_cycles(5);
        let cpu = console.stop().unwrap();
        // Third NOP started on cycle 5 and is applied whole.
        assert_eq!(cpu.pc, 0x8003);
        assert_eq!(cpu.cycles, 7 + 6);
    }

    #[test]
    fn kill_discards_outstanding_cycles() {
        let requested = 10_000_000;
        let console = Console::start(nop_cpu());
        console.request_cycles(requested);
        while console.cycles_executed() == 0 {
            thread::yield_now();
        }
        let cpu = console.kill().unwrap();
        assert!((cpu.cycles as u64) < 7 + requested / 2);
    }

    #[test]
    fn killed_gate_ignores_pending_requests() {
        let gate = CycleGate::new();
        gate.request_cycles(5);
        gate.kill();
        assert_eq!(gate.wait_for_cycle(), Wait::Halt);
        assert_eq!(gate.executed(), 0);
        assert_eq!(gate.requested(), 5);
    }

    #[test]
    fn drained_gate_consumes_pending_requests() {
        let gate = CycleGate::new();
        gate.request_cycles(5);
        gate.drain();
        for _ in 0..5 {
            assert_eq!(gate.wait_for_cycle(), Wait::Proceed);
        }
        assert_eq!(gate.wait_for_cycle(), Wait::Halt);
        assert_eq!(gate.executed(), 5);
    }

    #[test]
    fn engine_never_runs_ahead_of_requests() {
        let gate = CycleGate::new();
        gate.request_cycles(3);
        assert_eq!(gate.wait_for_cycle(), Wait::Proceed);
        assert_eq!(gate.wait_for_cycle(), Wait::Proceed);
        assert_eq!(gate.wait_for_cycle(), Wait::Proceed);
        gate.drain();
        assert_eq!(gate.wait_for_cycle(), Wait::Halt);
        assert_eq!(gate.executed(), 3);
        assert_eq!(gate.state(), RunState::Idle);
    }

    #[test]
    fn drop_reaps_a_failed_engine() {
        let mut prg = vec![0x02; PRG_BANK_SIZE];
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        let mut space = AddressSpace::nrom();
        space.load_prg(&prg).unwrap();
        let mut cpu = CPU::new(space);
        cpu.reset();

        let console = Console::start(cpu);
        console.request_cycles(10);
        while console.state() != RunState::Terminated {
            thread::yield_now();
        }
        assert!(!console.is_running());
        drop(console);
    }

    #[test]
    fn decode_failure_surfaces_on_stop() {
        let mut prg = vec![0x02; PRG_BANK_SIZE];
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        let mut space = AddressSpace::nrom();
        space.load_prg(&prg).unwrap();
        let mut cpu = CPU::new(space);
        cpu.reset();

        let console = Console::start(cpu);
        console.request_cycles(10);
        assert!(matches!(
            console.stop(),
            Err(EmuError::Cpu(CpuError::UnsupportedOpcode { opcode: 0x02, pc: 0x8000 }))
        ));
    }
}
