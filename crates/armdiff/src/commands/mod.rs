//! Command implementations.

mod disasm;
mod list;
mod run;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Run { .. } => handle_run(cli),
        Commands::List => list::cmd_list(),
        Commands::Disasm { corpus } => disasm::cmd_disasm(corpus),
    }
}

fn handle_run(cli: &Cli) -> i32 {
    let Commands::Run {
        corpus,
        seed,
        margin,
        collect_all,
        filter,
        verbose_diff,
    } = &cli.command
    else {
        unreachable!("run command variant mismatch");
    };

    run::cmd_run(
        corpus,
        &run::RunOptions {
            seed: *seed,
            margin: *margin,
            collect_all: *collect_all,
            filter: filter.clone(),
            verbose_diff: *verbose_diff,
            silent: cli.silent,
        },
    )
}
