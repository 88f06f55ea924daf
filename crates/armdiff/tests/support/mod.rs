//! Shared helpers for the armdiff integration tests.

#![allow(dead_code)]

use armdiff::adapter::{Adapter, ExecError, LoadError, StateError};
use armdiff::config::{HarnessConfig, default_layout};
use armdiff::{Arm32, Corpus, CorpusEntry, MachineState, ReferenceAdapter, SubjectAdapter};

pub const SEED: u64 = 0x00c0_ffee;

pub fn template() -> MachineState<Arm32> {
    HarnessConfig::new().initial_state(SEED).unwrap()
}

pub fn adapters() -> (ReferenceAdapter, SubjectAdapter) {
    let layout = default_layout().unwrap();
    (
        ReferenceAdapter::new(layout.clone()),
        SubjectAdapter::new(layout),
    )
}

pub fn single(opcode: &[u8], mnemonic: &str) -> Corpus {
    Corpus::new(mnemonic, vec![CorpusEntry::new(opcode, mnemonic)]).unwrap()
}

/// Install `input`, execute one instruction at its PC and capture.
pub fn step<A: Adapter<Arm32>>(
    adapter: &mut A,
    input: &MachineState<Arm32>,
    span: usize,
) -> MachineState<Arm32> {
    adapter.install_state(input).unwrap();
    adapter.execute_one(input.pc(), span).unwrap();
    adapter.capture_state().unwrap()
}

/// Adapter wrapper that records traffic and can misbehave on request.
pub struct Spy<T> {
    inner: T,
    pub executions: usize,
    pub installed: Vec<MachineState<Arm32>>,
    corrupt_r0_at: Vec<usize>,
    invert_carry: bool,
}

impl<T: Adapter<Arm32>> Spy<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            executions: 0,
            installed: Vec::new(),
            corrupt_r0_at: Vec::new(),
            invert_carry: false,
        }
    }

    /// Flip bit 0 of the captured `r0` after the given executions (0-based).
    pub fn corrupt_r0_at(mut self, executions: &[usize]) -> Self {
        self.corrupt_r0_at = executions.to_vec();
        self
    }

    /// Report the carry flag inverted.
    pub fn invert_carry(mut self) -> Self {
        self.invert_carry = true;
        self
    }
}

impl<T: Adapter<Arm32>> Adapter<Arm32> for Spy<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn load_code(&mut self, code: &[u8]) -> Result<(), LoadError> {
        self.inner.load_code(code)
    }

    fn install_state(&mut self, state: &MachineState<Arm32>) -> Result<(), StateError> {
        self.installed.push(state.clone());
        self.inner.install_state(state)
    }

    fn execute_one(&mut self, entry: u32, max_span: usize) -> Result<(), ExecError> {
        self.executions += 1;
        self.inner.execute_one(entry, max_span)
    }

    fn capture_state(&self) -> Result<MachineState<Arm32>, StateError> {
        let mut state = self.inner.capture_state()?;
        let current = self.executions.checked_sub(1);
        if current.is_some_and(|n| self.corrupt_r0_at.contains(&n)) {
            let r0 = state.register("r0").unwrap_or_default();
            state.set_register("r0", r0 ^ 1)?;
        }
        if self.invert_carry {
            let c = state.flag("c").unwrap_or_default();
            state.set_flag("c", !c)?;
        }
        Ok(state)
    }
}
