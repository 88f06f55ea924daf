//! Differential runner.
//!
//! For every corpus entry the runner clones the initial template, points PC
//! at the entry, runs the reference and then the subject adapter for exactly
//! one instruction and compares the captured states. Only the running PC and
//! the immutable template survive from one entry to the next.

use std::time::Instant;

use armdiff_state::{Arch, MachineState};
use tracing::{debug, info, info_span, warn};

use crate::adapter::{Adapter, ExecError};
use crate::compare::{StateDiff, compare_states};
use crate::config::{DEFAULT_MARGIN, HarnessConfig};
use crate::corpus::{Corpus, CorpusEntry};
use crate::error::{HarnessError, Side};
use crate::metrics;

/// What to do after the first mismatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Halt at the first failing entry.
    #[default]
    FailFast,
    /// Keep going past mismatches. Execution errors still halt.
    CollectAll,
}

/// Input and both outputs of a disagreeing entry.
#[derive(Debug, Clone)]
pub struct Mismatch<A: Arch> {
    pub input: MachineState<A>,
    pub reference: MachineState<A>,
    pub subject: MachineState<A>,
    pub diff: StateDiff<A::Word>,
}

#[derive(Debug)]
pub enum Verdict<A: Arch> {
    Pass,
    Mismatch(Box<Mismatch<A>>),
    /// An engine faulted or could not guarantee single-step execution.
    ExecutionError { side: Side, error: ExecError },
}

impl<A: Arch> Verdict<A> {
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub const fn is_execution_error(&self) -> bool {
        matches!(self, Self::ExecutionError { .. })
    }
}

/// Verdict of one executed entry.
#[derive(Debug)]
pub struct EntryResult<A: Arch> {
    /// Position in the corpus.
    pub index: usize,
    /// Address the entry executed at.
    pub address: A::Word,
    pub entry: CorpusEntry,
    pub verdict: Verdict<A>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub passed: usize,
    pub mismatched: usize,
    pub errored: usize,
    /// Entries excluded by the filter.
    pub skipped: usize,
}

impl RunStats {
    pub const fn executed(&self) -> usize {
        self.passed + self.mismatched + self.errored
    }

    pub const fn failed(&self) -> usize {
        self.mismatched + self.errored
    }
}

#[derive(Debug)]
pub enum RunOutcome<A: Arch> {
    AllPassed(RunStats),
    /// Fail-fast stop, or an execution error halting a run with no earlier
    /// failures.
    FirstFailure {
        stats: RunStats,
        failure: EntryResult<A>,
    },
    /// Collect-all result, in corpus order.
    Failures {
        stats: RunStats,
        failures: Vec<EntryResult<A>>,
    },
}

impl<A: Arch> RunOutcome<A> {
    pub const fn stats(&self) -> RunStats {
        match self {
            Self::AllPassed(stats)
            | Self::FirstFailure { stats, .. }
            | Self::Failures { stats, .. } => *stats,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::AllPassed(_))
    }

    pub fn failures(&self) -> Vec<&EntryResult<A>> {
        match self {
            Self::AllPassed(_) => Vec::new(),
            Self::FirstFailure { failure, .. } => vec![failure],
            Self::Failures { failures, .. } => failures.iter().collect(),
        }
    }
}

type Observer<'a, A> = Box<dyn FnMut(&EntryResult<A>) + 'a>;

/// Drives two adapters through a corpus.
pub struct DifferentialRunner<'a, A: Arch> {
    reference: &'a mut dyn Adapter<A>,
    subject: &'a mut dyn Adapter<A>,
    template: MachineState<A>,
    margin: usize,
    mode: FailureMode,
    filter: Option<String>,
    observer: Option<Observer<'a, A>>,
}

impl<'a, A: Arch> DifferentialRunner<'a, A> {
    /// `template` is the run's initial state; its PC is the code base.
    pub fn new(
        reference: &'a mut dyn Adapter<A>,
        subject: &'a mut dyn Adapter<A>,
        template: MachineState<A>,
    ) -> Self {
        Self {
            reference,
            subject,
            template,
            margin: DEFAULT_MARGIN,
            mode: FailureMode::default(),
            filter: None,
            observer: None,
        }
    }

    /// Take margin, failure mode and filter from `config`.
    #[must_use]
    pub fn configure(mut self, config: &HarnessConfig) -> Self {
        self.margin = config.margin();
        self.mode = config.failure_mode();
        self.filter = config.filter().map(str::to_string);
        self
    }

    #[must_use]
    pub const fn with_margin(mut self, margin: usize) -> Self {
        self.margin = margin;
        self
    }

    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Called with every verdict as soon as it is produced.
    #[must_use]
    pub fn with_observer(mut self, observer: impl FnMut(&EntryResult<A>) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub const fn template(&self) -> &MachineState<A> {
        &self.template
    }

    /// Load `corpus` into both adapters and test every selected entry.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Setup`] if an adapter fails to load, install
    /// or capture. Mismatches and execution errors are verdicts, not errors.
    pub fn run(&mut self, corpus: &Corpus) -> Result<RunOutcome<A>, HarnessError> {
        let span = info_span!("run", corpus = corpus.name(), entries = corpus.len());
        let _guard = span.enter();

        let code = corpus.code();
        self.reference
            .load_code(&code)
            .map_err(|e| HarnessError::setup(Side::Reference, e))?;
        self.subject
            .load_code(&code)
            .map_err(|e| HarnessError::setup(Side::Subject, e))?;
        metrics::record_corpus(corpus.name(), corpus.len());
        info!(
            reference = self.reference.name(),
            subject = self.subject.name(),
            bytes = code.len(),
            "corpus loaded"
        );

        let mut pc = self.template.pc();
        let mut stats = RunStats::default();
        let mut failures = Vec::new();

        for (index, entry) in corpus.iter().enumerate() {
            let address = pc;
            pc = A::wrapping_add(pc, entry.len() as u64);

            if !self.selected(entry) {
                stats.skipped += 1;
                continue;
            }

            let started = Instant::now();
            let verdict = self.run_entry(address, entry)?;
            metrics::record_entry(corpus.name(), &verdict, started.elapsed());

            let result = EntryResult {
                index,
                address,
                entry: entry.clone(),
                verdict,
            };
            if let Some(observer) = self.observer.as_mut() {
                observer(&result);
            }

            match &result.verdict {
                Verdict::Pass => {
                    stats.passed += 1;
                    debug!(
                        index,
                        address = %format_args!("{address:#x}"),
                        mnemonic = entry.mnemonic(),
                        "pass"
                    );
                }
                Verdict::Mismatch(mismatch) => {
                    stats.mismatched += 1;
                    warn!(
                        index,
                        mnemonic = entry.mnemonic(),
                        fields = ?mismatch.diff.field_names(),
                        "mismatch"
                    );
                    if self.mode == FailureMode::FailFast {
                        return Ok(RunOutcome::FirstFailure {
                            stats,
                            failure: result,
                        });
                    }
                    failures.push(result);
                }
                Verdict::ExecutionError { side, error } => {
                    stats.errored += 1;
                    warn!(index, mnemonic = entry.mnemonic(), %side, %error, "execution error");
                    if failures.is_empty() {
                        return Ok(RunOutcome::FirstFailure {
                            stats,
                            failure: result,
                        });
                    }
                    failures.push(result);
                    return Ok(RunOutcome::Failures { stats, failures });
                }
            }
        }

        info!(
            passed = stats.passed,
            failed = stats.failed(),
            skipped = stats.skipped,
            "run finished"
        );
        if failures.is_empty() {
            Ok(RunOutcome::AllPassed(stats))
        } else {
            Ok(RunOutcome::Failures { stats, failures })
        }
    }

    fn selected(&self, entry: &CorpusEntry) -> bool {
        self.filter
            .as_deref()
            .is_none_or(|f| entry.mnemonic().contains(f))
    }

    fn run_entry(
        &mut self,
        address: A::Word,
        entry: &CorpusEntry,
    ) -> Result<Verdict<A>, HarnessError> {
        let mut input = self.template.clone();
        input.set_pc(address);
        let max_span = entry.len().saturating_add(self.margin);

        let reference = step(&mut *self.reference, &input, address, max_span, Side::Reference)?;
        let reference = match reference {
            Ok(state) => state,
            Err(error) => {
                return Ok(Verdict::ExecutionError {
                    side: Side::Reference,
                    error,
                });
            }
        };
        let subject = match step(&mut *self.subject, &input, address, max_span, Side::Subject)? {
            Ok(state) => state,
            Err(error) => {
                return Ok(Verdict::ExecutionError {
                    side: Side::Subject,
                    error,
                });
            }
        };

        Ok(match compare_states(&reference, &subject) {
            None => Verdict::Pass,
            Some(diff) => Verdict::Mismatch(Box::new(Mismatch {
                input,
                reference,
                subject,
                diff,
            })),
        })
    }
}

/// Install, execute, capture. The inner `Err` is an execution verdict.
fn step<A: Arch>(
    adapter: &mut dyn Adapter<A>,
    input: &MachineState<A>,
    entry: A::Word,
    max_span: usize,
    side: Side,
) -> Result<Result<MachineState<A>, ExecError>, HarnessError> {
    adapter
        .install_state(input)
        .map_err(|e| HarnessError::setup(side, e))?;
    if let Err(error) = adapter.execute_one(entry, max_span) {
        return Ok(Err(error));
    }
    adapter
        .capture_state()
        .map(Ok)
        .map_err(|e| HarnessError::setup(side, e))
}
