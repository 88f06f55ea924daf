//! Architecture marker types.

use std::fmt::{Debug, LowerHex};
use std::hash::Hash;

/// Trait for architecture-dependent state shape.
///
/// Uses marker types with associated items, so a `MachineState<Arm32>` and a
/// state for another architecture can never be compared by accident.
pub trait Arch: Copy + Clone + Send + Sync + Default + Debug + PartialEq + Eq + 'static {
    /// Natural word type (u32 for 32-bit targets).
    type Word: Copy + Default + Eq + Hash + Debug + LowerHex + Send + Sync + Into<u64>;

    /// Short architecture name used in reports.
    const NAME: &'static str;

    /// Bytes per word.
    const WORD_BYTES: usize;

    /// Register names, in state order.
    const REGISTERS: &'static [&'static str];

    /// Condition flag names, in state order.
    const FLAGS: &'static [&'static str];

    /// Index of the program counter in `REGISTERS`.
    const PC: usize;

    /// Index of the stack pointer in `REGISTERS`.
    const SP: usize;

    /// Truncate a u64 to word width.
    fn from_u64(val: u64) -> Self::Word;

    /// Zero-extend a word to u64.
    #[inline]
    fn to_u64(val: Self::Word) -> u64 {
        val.into()
    }

    /// Add `delta` to a word, wrapping at the architecture width.
    #[inline]
    fn wrapping_add(val: Self::Word, delta: u64) -> Self::Word {
        Self::from_u64(Self::to_u64(val).wrapping_add(delta))
    }

    /// Hex digits needed to print one word.
    #[inline]
    fn hex_width() -> usize {
        Self::WORD_BYTES * 2
    }

    /// Index of a register by name.
    fn register_index(name: &str) -> Option<usize> {
        Self::REGISTERS.iter().position(|r| *r == name)
    }

    /// Index of a flag by name.
    fn flag_index(name: &str) -> Option<usize> {
        Self::FLAGS.iter().position(|f| *f == name)
    }
}

/// Marker type for 32-bit ARM (A32/T32 share the register file).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Arm32;

impl Arch for Arm32 {
    type Word = u32;

    const NAME: &'static str = "arm32";
    const WORD_BYTES: usize = 4;
    const REGISTERS: &'static [&'static str] = &[
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp",
        "lr", "pc",
    ];
    const FLAGS: &'static [&'static str] = &["n", "z", "c", "v"];
    const PC: usize = 15;
    const SP: usize = 13;

    #[inline]
    fn from_u64(val: u64) -> u32 {
        val as u32
    }
}
