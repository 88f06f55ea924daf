//! `armdiff list`.

use armdiff::corpus::BUILTINS;

use crate::cli::EXIT_SUCCESS;
use crate::terminal::{Alignment, Table};

pub fn cmd_list() -> i32 {
    let mut table = Table::new(vec!["corpus", "entries", "description"]).with_alignments(vec![
        Alignment::Left,
        Alignment::Right,
        Alignment::Left,
    ]);
    for builtin in BUILTINS {
        table.add_row(vec![
            builtin.name.to_string(),
            builtin.len().to_string(),
            builtin.description.to_string(),
        ]);
    }
    table.print();
    EXIT_SUCCESS
}
