//! Engine adapters.
//!
//! An [`Adapter`] drives one engine through the per-entry protocol: load the
//! corpus once, then for every entry install a state, execute exactly one
//! instruction and capture the result. The runner only ever sees
//! `dyn Adapter`, so both engines are driven by identical code.

mod reference;
mod subject;

use armdiff_state::{Arch, MachineState};
use thiserror::Error;
use unicorn_engine::unicorn_const::uc_error;

use crate::engine::SemanticsError;

pub use reference::ReferenceAdapter;
pub use subject::SubjectAdapter;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("code of {len} bytes does not fit a {capacity:#x}-byte mapping")]
    TooLarge { len: usize, capacity: usize },

    #[error("code is already loaded")]
    AlreadyLoaded,

    #[error(transparent)]
    Unicorn(#[from] UcError),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("no code loaded")]
    NotLoaded,

    #[error("region {name} [{base:#x}, +{size:#x}) is outside engine memory")]
    Unmapped { name: String, base: u64, size: usize },

    #[error(transparent)]
    Layout(#[from] armdiff_state::StateError),

    #[error(transparent)]
    Unicorn(#[from] UcError),

    #[error(transparent)]
    Semantics(#[from] SemanticsError),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no code loaded")]
    NotLoaded,

    #[error("instruction at {addr:#x} does not fit in {max_span} bytes")]
    SpanExceeded { addr: u64, max_span: usize },

    #[error("engine retired {retired} instructions instead of one")]
    Granularity { retired: usize },

    #[error(transparent)]
    Unicorn(#[from] UcError),

    #[error(transparent)]
    Semantics(#[from] SemanticsError),
}

/// Status code returned by the Unicorn reference engine.
#[derive(Debug, Clone, Copy, Error)]
#[error("unicorn: {0:?}")]
pub struct UcError(pub uc_error);

/// One execution engine behind the differential protocol.
pub trait Adapter<A: Arch> {
    /// Short engine name for diagnostics.
    fn name(&self) -> &str;

    /// Place the concatenated corpus at the code base, once per adapter.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot allocate or write the code region.
    fn load_code(&mut self, code: &[u8]) -> Result<(), LoadError>;

    /// Reset engine memory to the loaded code alone, then write every
    /// register, flag and window of `state`. Nothing written by an earlier
    /// entry survives.
    ///
    /// # Errors
    ///
    /// Fails if the engine rejects any part of the state.
    fn install_state(&mut self, state: &MachineState<A>) -> Result<(), StateError>;

    /// Execute exactly one instruction at `entry`, never looking past
    /// `entry + max_span`.
    ///
    /// # Errors
    ///
    /// Fails on engine faults and whenever exactly-one-instruction execution
    /// cannot be guaranteed.
    fn execute_one(&mut self, entry: A::Word, max_span: usize) -> Result<(), ExecError>;

    /// Read the engine state back without modifying it. PC bit 0 is cleared.
    ///
    /// # Errors
    ///
    /// Fails if a register or window cannot be read.
    fn capture_state(&self) -> Result<MachineState<A>, StateError>;
}
