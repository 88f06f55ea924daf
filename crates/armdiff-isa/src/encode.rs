//! Bit-field helpers for Thumb encodings.

/// Extract bits `[hi:lo]` of a halfword.
#[inline]
pub const fn bits(hw: u16, hi: u32, lo: u32) -> u16 {
    (hw >> lo) & ((1 << (hi - lo + 1)) - 1)
}

/// Extract a register field `[hi:lo]`.
#[inline]
pub const fn reg_field(hw: u16, hi: u32, lo: u32) -> u8 {
    bits(hw, hi, lo) as u8
}

/// Test a single bit.
#[inline]
pub const fn bit(hw: u16, n: u32) -> bool {
    (hw >> n) & 1 != 0
}

/// Little-endian halfword at `bytes[off..off + 2]`.
#[inline]
pub fn halfword(bytes: &[u8], off: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*bytes.get(off)?, *bytes.get(off + 1)?]))
}

/// Whether the first halfword opens a 32-bit encoding.
#[inline]
pub const fn is_wide(hw1: u16) -> bool {
    matches!(bits(hw1, 15, 11), 0b11101..=0b11111)
}

/// Registers in a list, lowest first.
pub fn reg_list(regs: u16) -> impl Iterator<Item = u8> {
    (0..16u8).filter(move |r| regs & (1 << r) != 0)
}

/// Whether `reg` is in the list.
#[inline]
pub const fn in_list(regs: u16, reg: u8) -> bool {
    regs & (1 << reg) != 0
}

/// Lowest register in a non-empty list.
#[inline]
pub const fn lowest_reg(regs: u16) -> u8 {
    regs.trailing_zeros() as u8
}
