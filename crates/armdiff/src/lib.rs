//! Differential instruction testing for ARM Thumb execution engines.
//!
//! Every entry of a [`Corpus`] is executed, one instruction at a time, on a
//! reference engine and on a subject engine starting from the same
//! [`MachineState`]. The two resulting states are compared field by field:
//!
//! ```text
//! Corpus -> DifferentialRunner -> { ReferenceAdapter, SubjectAdapter }
//!        -> compare_states -> Verdict -> RunOutcome
//! ```
//!
//! The runner only talks to engines through [`Adapter`]. The reference is
//! the Unicorn CPU emulator with a packed APSR; the subject is a
//! lift-and-evaluate semantics context with field-wise flags
//! ([`engine::SemanticsContext`]).
//!
//! Only registers, flags and the sampled memory windows are compared. A
//! write outside every window goes unnoticed, and is discarded before the
//! next entry: each install starts from memory holding only the code.

pub mod adapter;
pub mod compare;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;
pub mod runner;

pub use adapter::{Adapter, ExecError, LoadError, ReferenceAdapter, SubjectAdapter};
pub use armdiff_state::{Arch, Arm32, MachineState, RegionRole, RegionSpec, StateLayout};
pub use compare::{ByteDiff, DiffKind, StateDiff, byte_diff, compare_states};
pub use config::HarnessConfig;
pub use corpus::{Corpus, CorpusEntry, CorpusError};
pub use error::{HarnessError, SetupError, Side};
pub use runner::{DifferentialRunner, EntryResult, FailureMode, RunOutcome, RunStats, Verdict};
