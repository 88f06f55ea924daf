//! Intermediate representation for instruction semantics.
//!
//! This crate provides IR types with no ARM-specific knowledge and an
//! evaluator that runs one lifted instruction against any [`Machine`].
//! Thumb lifting lives in `armdiff-isa`.

mod eval;
mod expr;
mod instr;
mod stmt;

pub use eval::*;
pub use expr::*;
pub use instr::*;
pub use stmt::*;
