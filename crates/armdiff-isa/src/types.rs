//! Core types for the Thumb instruction set.

use thiserror::Error;

/// Core register index (0..=15).
pub type Reg = u8;

pub const SP: Reg = 13;
pub const LR: Reg = 14;
pub const PC: Reg = 15;

/// Register name as printed in disassembly.
#[must_use]
pub const fn reg_name(reg: Reg) -> &'static str {
    const NAMES: [&str; 16] = [
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp",
        "lr", "pc",
    ];
    NAMES[(reg & 0xf) as usize]
}

/// Why a byte sequence did not decode to an executable instruction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated instruction: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("undefined encoding {raw:#x}")]
    Undefined { raw: u32 },

    #[error("unpredictable encoding {raw:#x}: {reason}")]
    Unpredictable { raw: u32, reason: &'static str },

    #[error("unsupported encoding {raw:#x}")]
    Unsupported { raw: u32 },
}

/// Width and direction of a single-register memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemOp {
    Ldr,
    Ldrb,
    Ldrh,
    Ldrsb,
    Ldrsh,
    Str,
    Strb,
    Strh,
}

impl MemOp {
    pub const fn is_load(self) -> bool {
        matches!(
            self,
            Self::Ldr | Self::Ldrb | Self::Ldrh | Self::Ldrsb | Self::Ldrsh
        )
    }

    /// Access width in bytes.
    pub const fn width(self) -> u8 {
        match self {
            Self::Ldr | Self::Str => 4,
            Self::Ldrh | Self::Ldrsh | Self::Strh => 2,
            Self::Ldrb | Self::Ldrsb | Self::Strb => 1,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Ldrsb | Self::Ldrsh)
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Ldr => "ldr",
            Self::Ldrb => "ldrb",
            Self::Ldrh => "ldrh",
            Self::Ldrsb => "ldrsb",
            Self::Ldrsh => "ldrsh",
            Self::Str => "str",
            Self::Strb => "strb",
            Self::Strh => "strh",
        }
    }
}

/// Offset part of an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offset {
    Imm(u32),
    /// `rm << shift`.
    Reg { rm: Reg, shift: u8 },
}

/// Indexing mode: `index` selects pre-indexing, `wback` writes the
/// offset address back to the base register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddrMode {
    pub index: bool,
    pub add: bool,
    pub wback: bool,
}

impl AddrMode {
    /// Plain `[rn, #imm]`.
    pub const OFFSET: Self = Self {
        index: true,
        add: true,
        wback: false,
    };

    /// From the P/U/W bits of a 32-bit encoding.
    pub const fn from_puw(p: bool, u: bool, w: bool) -> Self {
        Self {
            index: p,
            add: u,
            wback: w,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    Lsl,
    Lsr,
    Asr,
}

/// Second operand of a three-operand add/sub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    Imm(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Imm8Op {
    Mov,
    Cmp,
    Add,
    Sub,
}

/// Two-register ALU operations, in encoding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    And,
    Eor,
    Lsl,
    Lsr,
    Asr,
    Adc,
    Sbc,
    Ror,
    Tst,
    Rsb,
    Cmp,
    Cmn,
    Orr,
    Mul,
    Bic,
    Mvn,
}

impl AluOp {
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0xf {
            0 => Self::And,
            1 => Self::Eor,
            2 => Self::Lsl,
            3 => Self::Lsr,
            4 => Self::Asr,
            5 => Self::Adc,
            6 => Self::Sbc,
            7 => Self::Ror,
            8 => Self::Tst,
            9 => Self::Rsb,
            10 => Self::Cmp,
            11 => Self::Cmn,
            12 => Self::Orr,
            13 => Self::Mul,
            14 => Self::Bic,
            _ => Self::Mvn,
        }
    }

    /// Flag-only operations that write no register.
    pub const fn is_compare(self) -> bool {
        matches!(self, Self::Tst | Self::Cmp | Self::Cmn)
    }
}

/// High-register operations (no flags except `cmp`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HiRegOp {
    Add,
    Cmp,
    Mov,
}

/// A decoded Thumb instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    /// `adr rd, #imm` relative to the word-aligned PC.
    Adr { rd: Reg, imm: u32 },
    /// Single load/store with base register.
    Mem {
        op: MemOp,
        rt: Reg,
        rn: Reg,
        offset: Offset,
        mode: AddrMode,
    },
    /// PC-relative load.
    LdrLit { op: MemOp, rt: Reg, imm: u32, add: bool },
    /// `ldrd`/`strd`.
    Dual {
        load: bool,
        rt: Reg,
        rt2: Reg,
        rn: Reg,
        imm: u32,
        mode: AddrMode,
    },
    /// `ldm`/`stm`, increment-after or decrement-before.
    Multi {
        load: bool,
        rn: Reg,
        regs: u16,
        wback: bool,
        decrement: bool,
    },
    Push { regs: u16 },
    Pop { regs: u16 },
    /// Shift by immediate; `imm` is the effective amount (1..=32, or 0 for `movs`).
    ShiftImm { op: ShiftOp, rd: Reg, rm: Reg, imm: u8 },
    AddSub {
        sub: bool,
        rd: Reg,
        rn: Reg,
        operand: Operand,
    },
    Imm8 { op: Imm8Op, rdn: Reg, imm: u32 },
    Alu { op: AluOp, rdn: Reg, rm: Reg },
    HiReg { op: HiRegOp, rdn: Reg, rm: Reg },
    /// `add rd, sp, #imm`.
    AddSpImm { rd: Reg, imm: u32 },
    /// `add sp, #imm` / `sub sp, #imm`.
    AdjustSp { sub: bool, imm: u32 },
}

impl Instr {
    /// Whether executing this instruction may read or write memory.
    pub const fn accesses_memory(&self) -> bool {
        matches!(
            self,
            Self::Mem { .. }
                | Self::LdrLit { .. }
                | Self::Dual { .. }
                | Self::Multi { .. }
                | Self::Push { .. }
                | Self::Pop { .. }
        )
    }
}

/// An instruction together with where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedInstr {
    pub instr: Instr,
    /// Address of the first byte.
    pub addr: u32,
    /// 2 or 4.
    pub size: u8,
    /// Halfwords as read; first halfword in the upper 16 bits for 32-bit forms.
    pub raw: u32,
}

impl DecodedInstr {
    /// Value of PC as seen by this instruction.
    pub const fn pc_value(&self) -> u32 {
        self.addr.wrapping_add(4)
    }

    /// `Align(PC, 4)` used by literal addressing.
    pub const fn aligned_pc(&self) -> u32 {
        self.pc_value() & !3
    }

    pub const fn next_addr(&self) -> u32 {
        self.addr.wrapping_add(self.size as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg_names() {
        assert_eq!(reg_name(0), "r0");
        assert_eq!(reg_name(SP), "sp");
        assert_eq!(reg_name(LR), "lr");
        assert_eq!(reg_name(PC), "pc");
    }

    #[test]
    fn test_memop_properties() {
        assert!(MemOp::Ldrsh.is_load());
        assert!(MemOp::Ldrsh.is_signed());
        assert_eq!(MemOp::Ldrsh.width(), 2);
        assert!(!MemOp::Strb.is_load());
        assert_eq!(MemOp::Strb.width(), 1);
    }

    #[test]
    fn test_aligned_pc() {
        let d = DecodedInstr {
            instr: Instr::Adr { rd: 0, imm: 0 },
            addr: 0x10_0002,
            size: 2,
            raw: 0,
        };
        assert_eq!(d.pc_value(), 0x10_0006);
        assert_eq!(d.aligned_pc(), 0x10_0004);
        assert_eq!(d.next_addr(), 0x10_0004);
    }
}
