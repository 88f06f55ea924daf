//! Terminal UI utilities for progress indication and styled output.

use std::fmt::Write as _;
use std::io::{self, Write};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over corpus entries.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new(total: u64, message: &str) -> Self {
        let bar = ProgressBar::new(total);
        let bar_style = ProgressStyle::with_template("{msg} [{bar:30.cyan/dim}] {pos}/{len}")
            .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("━╸━"));
        bar.set_style(bar_style);
        bar.set_message(message.to_string());
        Self { bar }
    }

    pub fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    /// Hide the bar while `f` prints, then redraw it.
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

// ============================================================================
// Styled output helpers
// ============================================================================

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", style("→").cyan(), message);
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Print a dimmed message to stderr.
pub fn dim(message: &str) {
    eprintln!("  {}", style(message).dim());
}

// ============================================================================
// Table output
// ============================================================================

/// A builder for markdown tables.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

/// Column alignment.
#[derive(Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

impl Table {
    pub fn new(headers: Vec<&str>) -> Self {
        let count = headers.len();
        Self {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            alignments: vec![Alignment::Left; count],
        }
    }

    #[must_use]
    pub fn with_alignments(mut self, alignments: Vec<Alignment>) -> Self {
        self.alignments = alignments;
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render as a markdown table. Widths count characters, not bytes.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let mut output = String::new();

        output.push('|');
        for (i, header) in self.headers.iter().enumerate() {
            let w = widths.get(i).copied().unwrap_or(0);
            let _ = write!(output, " {header:^w$} |");
        }
        output.push('\n');

        output.push('|');
        for (i, &width) in widths.iter().enumerate() {
            let _ = match self.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => write!(output, ":{:-<w$}|", "", w = width + 1),
                Alignment::Right => write!(output, "{:-<w$}:|", "", w = width + 1),
            };
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for (i, cell) in row.iter().enumerate() {
                let w = widths.get(i).copied().unwrap_or(0);
                let _ = match self.alignments.get(i).copied().unwrap_or_default() {
                    Alignment::Left => write!(output, " {cell:<w$} |"),
                    Alignment::Right => write!(output, " {cell:>w$} |"),
                };
            }
            output.push('\n');
        }

        output
    }

    /// Print the table to stdout.
    pub fn print(&self) {
        print!("{}", self.render());
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_render() {
        let mut table = Table::new(vec!["name", "entries"])
            .with_alignments(vec![Alignment::Left, Alignment::Right]);
        table.add_row(vec!["thumb-loadstore".to_string(), "65".to_string()]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "|      name       | entries |");
        assert_eq!(lines[1], "|:----------------|--------:|");
        assert_eq!(lines[2], "| thumb-loadstore |      65 |");
    }
}
