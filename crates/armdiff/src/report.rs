//! Plain-text rendering of verdicts.
//!
//! Everything here returns strings without styling; the binary decides
//! where they go and how they are coloured.

use std::fmt::Write as _;

use armdiff_state::{Arch, MachineState, RegionRole};

use crate::compare::{ByteDiff, DiffKind, StateDiff, byte_diff};
use crate::runner::{EntryResult, Mismatch, RunStats, Verdict};

const BYTES_PER_ROW: usize = 16;

pub fn ok_line(mnemonic: &str) -> String {
    format!("[OK] {mnemonic}")
}

/// Headline for a failed entry; names the first differing window.
pub fn ko_line<A: Arch>(result: &EntryResult<A>) -> String {
    let mnemonic = result.entry.mnemonic();
    match &result.verdict {
        Verdict::Mismatch(mismatch) if mismatch.diff.first_kind() == Some(DiffKind::Region) => {
            format!("[KO] {mnemonic} ({} differs!)", mismatch.diff.regions[0].name)
        }
        _ => format!("[KO] {mnemonic}"),
    }
}

/// `name: input | reference ==/!= subject` for every register and flag.
pub fn state_table<A: Arch>(
    input: &MachineState<A>,
    reference: &MachineState<A>,
    subject: &MachineState<A>,
) -> String {
    let width = A::hex_width();
    let mut out = String::new();
    let registers = input
        .named_registers()
        .zip(reference.registers())
        .zip(subject.registers());
    for (((name, i), r), s) in registers {
        let op = if r == s { "==" } else { "!=" };
        let _ = writeln!(out, "{name:>3}: {i:0width$x} | {r:0width$x} {op} {s:0width$x}");
    }
    let flags = input
        .named_flags()
        .zip(reference.flags())
        .zip(subject.flags());
    for (((name, i), r), s) in flags {
        let op = if r == s { "==" } else { "!=" };
        let _ = writeln!(
            out,
            "{name:>3}: {:>width$} | {:>width$} {op} {:>width$}",
            u8::from(i),
            u8::from(*r),
            u8::from(*s)
        );
    }
    out
}

/// One line per differing field, reference value first.
pub fn field_diff_lines<W: std::fmt::LowerHex>(diff: &StateDiff<W>) -> String {
    let mut out = String::new();
    for region in &diff.regions {
        let _ = writeln!(out, "\t{}: (reference) != (subject)", region.name);
    }
    for reg in &diff.registers {
        let _ = writeln!(
            out,
            "\t{}: {:#x} (reference) != {:#x} (subject)",
            reg.name, reg.reference, reg.subject
        );
    }
    for flag in &diff.flags {
        let _ = writeln!(
            out,
            "\t{}: {:#x} (reference) != {:#x} (subject)",
            flag.name,
            u8::from(flag.reference),
            u8::from(flag.subject)
        );
    }
    out
}

/// `IN|REF|SUB` listing, prefixed by the address when annotated.
pub fn byte_table(diffs: &[ByteDiff]) -> String {
    let mut out = String::from("IN|REF|SUB\n");
    for d in diffs {
        if let Some(addr) = d.address {
            let _ = write!(out, "{addr:x}: ");
        }
        let _ = writeln!(out, "{:02x}|{:02x}|{:02x}", d.input, d.reference, d.subject);
    }
    out
}

/// Classic 16-bytes-per-row dump starting at `base`.
pub fn hexdump(base: u64, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(BYTES_PER_ROW).enumerate() {
        let _ = write!(out, "{:08x}:", base + (row * BYTES_PER_ROW) as u64);
        for byte in chunk {
            let _ = write!(out, " {byte:02x}");
        }
        out.push('\n');
    }
    out
}

/// Full diagnosis of a mismatch: byte listings for differing windows,
/// field diffs, then the register and flag table.
pub fn mismatch_report<A: Arch>(mismatch: &Mismatch<A>, verbose: bool) -> String {
    let mut out = String::new();
    let sp = A::to_u64(mismatch.input.sp());

    for region in &mismatch.diff.regions {
        let (Some(input), Some(reference), Some(subject)) = (
            mismatch.input.region(&region.name),
            mismatch.reference.region(&region.name),
            mismatch.subject.region(&region.name),
        ) else {
            continue;
        };
        let annotate = (region.role == RegionRole::Stack).then_some(sp);
        let diffs = byte_diff(input.bytes(), reference.bytes(), subject.bytes(), annotate);
        out.push_str(&byte_table(&diffs));

        if verbose {
            let states = [("input", input), ("reference", reference), ("subject", subject)];
            for (label, state) in states {
                let _ = writeln!(out, "{} ({label}):", region.name);
                out.push_str(&hexdump(state.base(), state.bytes()));
            }
        }
    }

    if !mismatch.diff.registers.is_empty() || !mismatch.diff.flags.is_empty() {
        out.push_str(&field_diff_lines(&mismatch.diff));
    }
    out.push_str(&state_table(
        &mismatch.input,
        &mismatch.reference,
        &mismatch.subject,
    ));
    out
}

/// Headline plus details for any failed entry.
pub fn failure_report<A: Arch>(result: &EntryResult<A>, verbose: bool) -> String {
    let mut out = ko_line(result);
    out.push('\n');
    match &result.verdict {
        Verdict::Pass => {}
        Verdict::Mismatch(mismatch) => out.push_str(&mismatch_report(mismatch, verbose)),
        Verdict::ExecutionError { side, error } => {
            let _ = writeln!(out, "\t{side}: {error}");
        }
    }
    out
}

pub fn summary_line(corpus: &str, stats: &RunStats) -> String {
    let mut line = format!(
        "{corpus}: {} passed, {} mismatched, {} errored",
        stats.passed, stats.mismatched, stats.errored
    );
    if stats.skipped > 0 {
        let _ = write!(line, ", {} skipped", stats.skipped);
    }
    line
}
