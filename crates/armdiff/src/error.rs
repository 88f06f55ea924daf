//! Crate-level error types.

use std::fmt;

use thiserror::Error;

use crate::adapter::{LoadError, StateError};
use crate::corpus::CorpusError;

/// Which engine an error or verdict refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Reference,
    Subject,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Subject => "subject",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter failure outside of instruction execution.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("load failed: {0}")]
    Load(#[from] LoadError),

    #[error("state transfer failed: {0}")]
    State(#[from] StateError),
}

/// Errors that abort a run before a verdict can be produced.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{side} adapter: {source}")]
    Setup {
        side: Side,
        #[source]
        source: SetupError,
    },

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error("invalid state layout: {0}")]
    Layout(#[from] armdiff_state::StateError),
}

impl HarnessError {
    pub(crate) fn setup(side: Side, source: impl Into<SetupError>) -> Self {
        Self::Setup {
            side,
            source: source.into(),
        }
    }
}
