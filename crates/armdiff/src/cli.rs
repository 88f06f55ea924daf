//! CLI definitions and argument types.

use std::path::PathBuf;

use armdiff::config::DEFAULT_MARGIN;
use armdiff::corpus::{Corpus, CorpusError};
use clap::{Args, Parser, Subcommand};

/// Exit code when every executed entry passes.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a mismatch or execution error.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when the run could not be set up.
pub const EXIT_SETUP: i32 = 2;

#[derive(Parser)]
#[command(name = "armdiff")]
#[command(about = "Differential tester for ARM Thumb execution engines")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the instructions under test come from.
#[derive(Args)]
pub struct CorpusArgs {
    /// Built-in corpus (see `armdiff list`)
    #[arg(long, default_value = "thumb-loadstore", conflicts_with = "file")]
    pub corpus: String,

    /// Corpus file: `HEX BYTES | mnemonic` or `(b"\x..", "mnemonic")` per line
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl CorpusArgs {
    pub fn load(&self) -> Result<Corpus, CorpusError> {
        match &self.file {
            Some(path) => Corpus::from_file(path),
            None => Corpus::builtin(&self.corpus),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every corpus entry on both engines and compare the results
    Run {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Seed for the random initial registers and flags
        #[arg(long)]
        seed: Option<u64>,

        /// Bytes past each opcode the engines may look at
        #[arg(long, default_value_t = DEFAULT_MARGIN)]
        margin: usize,

        /// Keep going after a mismatch (execution errors still stop the run)
        #[arg(long)]
        collect_all: bool,

        /// Only run entries whose mnemonic contains this string
        #[arg(long)]
        filter: Option<String>,

        /// Hexdump differing memory windows in full
        #[arg(long)]
        verbose_diff: bool,
    },
    /// List built-in corpora
    List,
    /// Decode every corpus entry and show it next to its label
    Disasm {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
}
