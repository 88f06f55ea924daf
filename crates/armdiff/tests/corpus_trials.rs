//! One trial per built-in corpus entry, run on both bundled engines, plus
//! a decode check of every label.

use armdiff::config::CODE_BASE;
use armdiff::corpus::BUILTINS;
use armdiff::report;
use armdiff::{Corpus, CorpusEntry, DifferentialRunner, RunOutcome};
use armdiff_isa::{decode, disasm};
use libtest_mimic::{Arguments, Failed, Trial};

mod support;

fn main() {
    let args = Arguments::from_args();

    let mut trials = Vec::new();
    for builtin in BUILTINS {
        for (index, entry) in builtin.entries().into_iter().enumerate() {
            let name = format!("{}::{index:02}::{}", builtin.name, entry.mnemonic());
            let corpus_name = builtin.name;
            trials.push(Trial::test(name, move || run_entry(corpus_name, &entry)));
        }
        let corpus_name = builtin.name;
        trials.push(Trial::test(format!("{corpus_name}::labels"), move || {
            check_labels(corpus_name)
        }));
    }

    libtest_mimic::run(&args, trials).exit();
}

fn run_entry(corpus_name: &str, entry: &CorpusEntry) -> Result<(), Failed> {
    let corpus =
        Corpus::new(corpus_name, vec![entry.clone()]).map_err(|e| Failed::from(e.to_string()))?;
    let (mut reference, mut subject) = support::adapters();
    let outcome = DifferentialRunner::new(&mut reference, &mut subject, support::template())
        .run(&corpus)
        .map_err(|e| Failed::from(format!("setup: {e}")))?;

    match outcome {
        RunOutcome::AllPassed(stats) if stats.passed == 1 => Ok(()),
        RunOutcome::AllPassed(stats) => Err(format!("unexpected stats {stats:?}").into()),
        outcome => {
            let failures = outcome.failures();
            Err(failures
                .iter()
                .map(|f| report::failure_report(*f, false))
                .collect::<String>()
                .into())
        }
    }
}

fn check_labels(corpus_name: &str) -> Result<(), Failed> {
    let corpus = Corpus::builtin(corpus_name).map_err(|e| Failed::from(e.to_string()))?;
    for (offset, entry) in corpus.offsets() {
        let address = u32::try_from(CODE_BASE + offset as u64)
            .map_err(|e| Failed::from(e.to_string()))?;
        let decoded = decode(entry.opcode(), address)
            .map_err(|e| Failed::from(format!("{}: {e}", entry.mnemonic())))?;
        if usize::from(decoded.size) != entry.len() {
            return Err(format!("{}: decoded {} bytes", entry.mnemonic(), decoded.size).into());
        }
        let text = disasm(&decoded);
        if text != entry.mnemonic() {
            return Err(format!("{}: decodes as {text}", entry.mnemonic()).into());
        }
    }
    Ok(())
}
