//! `armdiff disasm`: vet a corpus before running it.

use armdiff::config::CODE_BASE;
use armdiff::{Arch, Arm32};
use armdiff_isa::{decode, disasm};

use crate::cli::{CorpusArgs, EXIT_FAILURE, EXIT_SETUP, EXIT_SUCCESS};
use crate::terminal::{self, Table};

/// Decode each entry at the address it would run at. Fails if any entry
/// does not decode, or decodes to something other than its label.
pub fn cmd_disasm(corpus: &CorpusArgs) -> i32 {
    let corpus = match corpus.load() {
        Ok(corpus) => corpus,
        Err(err) => {
            terminal::error(&err.to_string());
            return EXIT_SETUP;
        }
    };

    let mut table = Table::new(vec!["address", "bytes", "decoded", "label", "match"]);
    let mut bad = 0usize;
    for (offset, entry) in corpus.offsets() {
        let address = Arm32::from_u64(CODE_BASE + offset as u64);
        let (decoded, matches) = match decode(entry.opcode(), address) {
            Ok(instr) if usize::from(instr.size) == entry.len() => {
                let text = disasm(&instr);
                let matches = text == entry.mnemonic();
                (text, matches)
            }
            Ok(instr) => (format!("{} (size {})", disasm(&instr), instr.size), false),
            Err(err) => (format!("<{err}>"), false),
        };
        if !matches {
            bad += 1;
        }
        table.add_row(vec![
            format!("{address:#x}"),
            entry.hex(),
            decoded,
            entry.mnemonic().to_string(),
            if matches { "yes" } else { "no" }.to_string(),
        ]);
    }
    table.print();

    if bad == 0 {
        terminal::success(&format!(
            "{}: all {} entries decode to their label",
            corpus.name(),
            corpus.len()
        ));
        EXIT_SUCCESS
    } else {
        terminal::warning(&format!(
            "{}: {bad} of {} entries differ from their label",
            corpus.name(),
            corpus.len()
        ));
        EXIT_FAILURE
    }
}
