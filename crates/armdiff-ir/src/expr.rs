//! Expression IR.
//!
//! All values are 32-bit. Comparison nodes produce 0 or 1. Shift amounts are
//! taken from the full right operand: `Sll`/`Srl` by 32 or more yield 0, `Sra`
//! by 32 or more yields the sign fill, `Ror` uses the amount modulo 32.

use std::fmt;

/// Expression node kinds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ExprKind {
    // Leaves
    Imm,
    Read,

    // Arithmetic
    Add,
    Sub,
    Mul,

    // Bitwise
    And,
    Or,
    Xor,
    Not,
    Sll,
    Srl,
    Sra,
    Ror,

    // Comparison
    Eq,
    Ne,
    Ltu,

    // Ternary
    Select,
}

impl ExprKind {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Not => "~",
            Self::Sll => "<<",
            Self::Srl => ">>",
            Self::Sra => ">>s",
            Self::Ror => "ror",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ltu => "<u",
            Self::Imm | Self::Read | Self::Select => "?",
        }
    }
}

/// Address spaces for reads/writes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Space {
    /// Core register, indexed 0..=15.
    Reg,
    /// Condition flag, indexed by [`Flag`].
    Flag,
    /// Byte-addressed memory.
    Mem,
    /// Per-instruction scratch value.
    Temp,
}

/// Condition flag indices in [`Space::Flag`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Flag {
    N = 0,
    Z = 1,
    C = 2,
    V = 3,
}

/// Expression tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Immediate value, or the index for register/flag/temp reads.
    pub imm: u32,
    pub space: Space,
    /// Access width in bytes for memory reads.
    pub width: u8,
    /// Sign-extend memory reads.
    pub signed: bool,
    pub left: Option<Box<Expr>>,
    pub right: Option<Box<Expr>>,
    pub third: Option<Box<Expr>>,
}

impl Default for Expr {
    fn default() -> Self {
        Self {
            kind: ExprKind::Imm,
            imm: 0,
            space: Space::Reg,
            width: 4,
            signed: false,
            left: None,
            right: None,
            third: None,
        }
    }
}

impl Expr {
    pub fn imm(val: u32) -> Self {
        Self {
            kind: ExprKind::Imm,
            imm: val,
            ..Default::default()
        }
    }

    fn read(space: Space, idx: u32) -> Self {
        Self {
            kind: ExprKind::Read,
            space,
            imm: idx,
            ..Default::default()
        }
    }

    /// Read a core register.
    pub fn reg(idx: u8) -> Self {
        Self::read(Space::Reg, u32::from(idx))
    }

    /// Read a flag as 0 or 1.
    pub fn flag(flag: Flag) -> Self {
        Self::read(Space::Flag, flag as u32)
    }

    /// Read a scratch value.
    pub fn temp(idx: u8) -> Self {
        Self::read(Space::Temp, u32::from(idx))
    }

    /// Zero-extending memory read at a computed address.
    pub fn mem_u(addr: Self, width: u8) -> Self {
        Self {
            kind: ExprKind::Read,
            space: Space::Mem,
            width,
            signed: false,
            left: Some(Box::new(addr)),
            ..Default::default()
        }
    }

    /// Sign-extending memory read at a computed address.
    pub fn mem_s(addr: Self, width: u8) -> Self {
        Self {
            signed: true,
            ..Self::mem_u(addr, width)
        }
    }

    fn binop(kind: ExprKind, left: Self, right: Self) -> Self {
        Self {
            kind,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            ..Default::default()
        }
    }

    pub fn add(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Add, left, right)
    }

    pub fn sub(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Sub, left, right)
    }

    pub fn mul(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Mul, left, right)
    }

    pub fn and(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::And, left, right)
    }

    pub fn or(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Or, left, right)
    }

    pub fn xor(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Xor, left, right)
    }

    pub fn sll(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Sll, left, right)
    }

    pub fn srl(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Srl, left, right)
    }

    pub fn sra(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Sra, left, right)
    }

    pub fn ror(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Ror, left, right)
    }

    pub fn eq(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Eq, left, right)
    }

    pub fn ne(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Ne, left, right)
    }

    pub fn ltu(left: Self, right: Self) -> Self {
        Self::binop(ExprKind::Ltu, left, right)
    }

    pub fn not(val: Self) -> Self {
        Self {
            kind: ExprKind::Not,
            left: Some(Box::new(val)),
            ..Default::default()
        }
    }

    /// `cond != 0 ? then_val : else_val`.
    pub fn select(cond: Self, then_val: Self, else_val: Self) -> Self {
        Self {
            kind: ExprKind::Select,
            left: Some(Box::new(cond)),
            right: Some(Box::new(then_val)),
            third: Some(Box::new(else_val)),
            ..Default::default()
        }
    }

    // ===== Bit helpers =====

    /// Bit `n` of `val` as 0 or 1.
    pub fn bit(val: Self, n: u32) -> Self {
        Self::and(Self::srl(val, Self::imm(n)), Self::imm(1))
    }

    /// Sign bit of `val`.
    pub fn msb(val: Self) -> Self {
        Self::srl(val, Self::imm(31))
    }

    /// 1 when `val` is zero.
    pub fn is_zero(val: Self) -> Self {
        Self::eq(val, Self::imm(0))
    }

    /// Word-align an address downwards.
    pub fn align4(val: Self) -> Self {
        Self::and(val, Self::imm(!3))
    }

    pub fn is_imm(&self) -> bool {
        self.kind == ExprKind::Imm
    }

    pub(crate) fn flag_name(idx: u32) -> &'static str {
        ["N", "Z", "C", "V"][idx as usize & 3]
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sub =
            |e: &Option<Box<Self>>| e.as_deref().map_or_else(String::new, ToString::to_string);
        match self.kind {
            ExprKind::Imm => write!(f, "{:#x}", self.imm),
            ExprKind::Read => match self.space {
                Space::Reg => write!(f, "r{}", self.imm),
                Space::Flag => f.write_str(Self::flag_name(self.imm)),
                Space::Temp => write!(f, "t{}", self.imm),
                Space::Mem => {
                    let sign = if self.signed { "s" } else { "u" };
                    write!(f, "mem{}{}[{}]", sign, self.width * 8, sub(&self.left))
                }
            },
            ExprKind::Not => write!(f, "~{}", sub(&self.left)),
            ExprKind::Select => write!(
                f,
                "({} ? {} : {})",
                sub(&self.left),
                sub(&self.right),
                sub(&self.third)
            ),
            kind => write!(
                f,
                "({} {} {})",
                sub(&self.left),
                kind.symbol(),
                sub(&self.right)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = Expr::add(Expr::reg(1), Expr::imm(4));
        assert_eq!(e.to_string(), "(r1 + 0x4)");

        let e = Expr::mem_s(Expr::temp(0), 2);
        assert_eq!(e.to_string(), "mems16[t0]");

        let e = Expr::select(Expr::flag(Flag::C), Expr::imm(1), Expr::imm(0));
        assert_eq!(e.to_string(), "(C ? 0x1 : 0x0)");
    }

    #[test]
    fn test_bit_helper_shape() {
        let e = Expr::bit(Expr::reg(0), 31);
        assert_eq!(e.kind, ExprKind::And);
        assert_eq!(e.left.as_ref().map(|l| l.kind), Some(ExprKind::Srl));
        assert!(e.right.as_ref().is_some_and(|r| r.is_imm()));
    }
}
