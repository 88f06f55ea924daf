//! `armdiff run`.

use armdiff::adapter::{ReferenceAdapter, SubjectAdapter};
use armdiff::config::HarnessConfig;
use armdiff::corpus::Corpus;
use armdiff::report;
use armdiff::runner::{DifferentialRunner, EntryResult, FailureMode, RunOutcome};
use armdiff::{Arm32, HarnessError};
use console::style;

use crate::cli::{CorpusArgs, EXIT_FAILURE, EXIT_SETUP, EXIT_SUCCESS};
use crate::terminal::{self, Progress};

pub struct RunOptions {
    pub seed: Option<u64>,
    pub margin: usize,
    pub collect_all: bool,
    pub filter: Option<String>,
    pub verbose_diff: bool,
    pub silent: bool,
}

impl RunOptions {
    fn config(&self) -> HarnessConfig {
        let mode = if self.collect_all {
            FailureMode::CollectAll
        } else {
            FailureMode::FailFast
        };
        let mut config = HarnessConfig::new()
            .with_margin(self.margin)
            .with_failure_mode(mode);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(filter) = &self.filter {
            config = config.with_filter(filter.as_str());
        }
        config
    }
}

pub fn cmd_run(corpus: &CorpusArgs, options: &RunOptions) -> i32 {
    let corpus = match corpus.load() {
        Ok(corpus) => corpus,
        Err(err) => {
            terminal::error(&err.to_string());
            return EXIT_SETUP;
        }
    };

    let config = options.config();
    let seed = config.resolve_seed();
    if !options.silent {
        terminal::info(&format!(
            "{}: {} entries, seed {seed}",
            corpus.name(),
            corpus.len()
        ));
    }

    let progress = (!options.silent).then(|| Progress::new(corpus.len() as u64, corpus.name()));

    let outcome = execute(&corpus, &config, seed, options, progress.as_ref());
    if let Some(progress) = &progress {
        progress.finish();
    }

    match outcome {
        Ok(outcome) => {
            let summary = report::summary_line(corpus.name(), &outcome.stats());
            if outcome.is_success() {
                if !options.silent {
                    terminal::success(&summary);
                }
                EXIT_SUCCESS
            } else {
                terminal::error(&summary);
                terminal::dim(&format!("reproduce with --seed {seed}"));
                EXIT_FAILURE
            }
        }
        Err(err) => {
            terminal::error(&err.to_string());
            EXIT_SETUP
        }
    }
}

/// Adapters are dropped, releasing their memory, before this returns.
fn execute(
    corpus: &Corpus,
    config: &HarnessConfig,
    seed: u64,
    options: &RunOptions,
    progress: Option<&Progress>,
) -> Result<RunOutcome<Arm32>, HarnessError> {
    let layout = config.layout()?;
    let template = config.initial_state(seed)?;
    let mut reference = ReferenceAdapter::new(layout.clone());
    let mut subject = SubjectAdapter::new(layout);

    let mut runner = DifferentialRunner::new(&mut reference, &mut subject, template)
        .configure(config)
        .with_observer(|result| {
            let print = || print_result(result, options);
            match progress {
                Some(progress) => {
                    progress.suspend(print);
                    progress.set_position(result.index as u64 + 1);
                }
                None => print(),
            }
        });
    runner.run(corpus)
}

fn print_result(result: &EntryResult<Arm32>, options: &RunOptions) {
    if result.verdict.is_pass() {
        if !options.silent {
            println!("{}", style(report::ok_line(result.entry.mnemonic())).green());
        }
        return;
    }

    let text = report::failure_report(result, options.verbose_diff);
    let (headline, details) = text.split_once('\n').unwrap_or((text.as_str(), ""));
    println!("{}", style(headline).red().bold());
    print!("{details}");
}
