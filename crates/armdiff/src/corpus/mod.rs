//! Instruction corpora.
//!
//! A [`Corpus`] is an ordered list of `(opcode bytes, mnemonic)` entries.
//! The concatenated opcodes form the code region both engines load, so an
//! entry's address is the code base plus the sizes of all entries before it.
//! Mnemonics are labels for reports and are never parsed.

mod builtin;
mod parse;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use builtin::{BUILTINS, Builtin};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("corpus {0} has no entries")]
    Empty(String),

    #[error("unknown built-in corpus: {0}")]
    Unknown(String),
}

/// One instruction under test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusEntry {
    opcode: Vec<u8>,
    mnemonic: String,
}

impl CorpusEntry {
    pub fn new(opcode: impl Into<Vec<u8>>, mnemonic: impl Into<String>) -> Self {
        Self {
            opcode: opcode.into(),
            mnemonic: mnemonic.into(),
        }
    }

    pub fn opcode(&self) -> &[u8] {
        &self.opcode
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn len(&self) -> usize {
        self.opcode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opcode.is_empty()
    }

    /// Opcode as space-separated hex bytes.
    pub fn hex(&self) -> String {
        let mut out = String::with_capacity(self.opcode.len() * 3);
        for (i, byte) in self.opcode.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

/// Named, ordered, non-empty list of entries.
#[derive(Clone, Debug)]
pub struct Corpus {
    name: String,
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// # Errors
    ///
    /// Returns [`CorpusError::Empty`] if there are no entries, and
    /// [`CorpusError::Parse`] for an entry without opcode bytes.
    pub fn new(name: impl Into<String>, entries: Vec<CorpusEntry>) -> Result<Self, CorpusError> {
        let name = name.into();
        if entries.is_empty() {
            return Err(CorpusError::Empty(name));
        }
        if let Some(idx) = entries.iter().position(CorpusEntry::is_empty) {
            return Err(CorpusError::Parse {
                line: idx + 1,
                message: "entry has no opcode bytes".to_string(),
            });
        }
        Ok(Self { name, entries })
    }

    /// Look up one of the [`BUILTINS`].
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Unknown`] for names not in [`BUILTINS`].
    pub fn builtin(name: &str) -> Result<Self, CorpusError> {
        let builtin = BUILTINS
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| CorpusError::Unknown(name.to_string()))?;
        Self::new(builtin.name, builtin.entries())
    }

    /// Read a corpus file; the corpus is named after the file stem.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or a line does not parse.
    pub fn from_file(path: &Path) -> Result<Self, CorpusError> {
        let text = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        Self::parse(name, &text)
    }

    /// Parse corpus text, one entry per line.
    ///
    /// Accepted forms are `08 68 | ldr r0, [r1]` and
    /// `(b"\x08\x68", "ldr r0, [r1]")`. Blank lines and lines starting with
    /// `#` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Parse`] with the 1-based line number of the
    /// first malformed line, or [`CorpusError::Empty`].
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, CorpusError> {
        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some(entry) = parse::parse_line(line).map_err(|message| CorpusError::Parse {
                line: idx + 1,
                message,
            })? {
                entries.push(entry);
            }
        }
        Self::new(name, entries)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CorpusEntry> {
        self.entries.iter()
    }

    /// All opcodes back to back, as loaded at the code base.
    pub fn code(&self) -> Vec<u8> {
        self.entries
            .iter()
            .flat_map(|e| e.opcode.iter().copied())
            .collect()
    }

    /// `(offset, entry)` pairs, offsets relative to the code base.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, &CorpusEntry)> + '_ {
        self.entries.iter().scan(0usize, |offset, entry| {
            let at = *offset;
            *offset += entry.len();
            Some((at, entry))
        })
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a CorpusEntry;
    type IntoIter = std::slice::Iter<'a, CorpusEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
