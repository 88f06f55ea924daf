//! The subject engine: a lift-and-evaluate [`SemanticsContext`].

mod sem;

pub use sem::{Instruction, SemanticsContext, SemanticsError};
