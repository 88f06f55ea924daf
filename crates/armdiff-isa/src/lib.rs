//! Thumb instruction set: decoding, lifting to IR, and disassembly.
//!
//! Covers the 16-bit Thumb data-processing and load/store encodings plus the
//! 32-bit Thumb-2 load/store group (single, dual and multiple). Everything
//! else decodes to [`DecodeError::Unsupported`] rather than being guessed at.

mod encode;
pub mod thumb;
mod types;

pub use encode::*;
pub use thumb::{decode, disasm, lift};
pub use types::*;
