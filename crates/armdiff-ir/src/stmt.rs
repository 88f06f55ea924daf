//! Statement IR.
//!
//! Statements run in order; each one observes the writes of those before it.

use std::fmt;

use crate::expr::{Expr, Flag, Space};

/// Statement kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// Write to register/flag/memory/temp.
    Write {
        space: Space,
        addr: Expr,
        value: Expr,
        width: u8,
    },
    /// Conditional execution.
    If {
        cond: Expr,
        then_stmts: Vec<Stmt>,
        else_stmts: Vec<Stmt>,
    },
}

impl Stmt {
    pub fn write_reg(reg: u8, value: Expr) -> Self {
        Self::Write {
            space: Space::Reg,
            addr: Expr::imm(u32::from(reg)),
            value,
            width: 4,
        }
    }

    /// Write bit 0 of `value` to a flag.
    pub fn write_flag(flag: Flag, value: Expr) -> Self {
        Self::Write {
            space: Space::Flag,
            addr: Expr::imm(flag as u32),
            value,
            width: 1,
        }
    }

    pub fn write_mem(addr: Expr, value: Expr, width: u8) -> Self {
        Self::Write {
            space: Space::Mem,
            addr,
            value,
            width,
        }
    }

    pub fn write_temp(idx: u8, value: Expr) -> Self {
        Self::Write {
            space: Space::Temp,
            addr: Expr::imm(u32::from(idx)),
            value,
            width: 4,
        }
    }

    pub fn if_then(cond: Expr, then_stmts: Vec<Self>) -> Self {
        Self::If {
            cond,
            then_stmts,
            else_stmts: Vec::new(),
        }
    }

    pub fn if_then_else(cond: Expr, then_stmts: Vec<Self>, else_stmts: Vec<Self>) -> Self {
        Self::If {
            cond,
            then_stmts,
            else_stmts,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write {
                space,
                addr,
                value,
                width,
            } => match space {
                Space::Reg => write!(f, "r{} = {value}", addr.imm),
                Space::Flag => write!(f, "{} = {value}", Expr::flag_name(addr.imm)),
                Space::Temp => write!(f, "t{} = {value}", addr.imm),
                Space::Mem => write!(f, "mem{}[{addr}] = {value}", width * 8),
            },
            Self::If {
                cond,
                then_stmts,
                else_stmts,
            } => {
                write!(f, "if {cond} {{ ")?;
                for s in then_stmts {
                    write!(f, "{s}; ")?;
                }
                write!(f, "}}")?;
                if !else_stmts.is_empty() {
                    write!(f, " else {{ ")?;
                    for s in else_stmts {
                        write!(f, "{s}; ")?;
                    }
                    write!(f, "}}")?;
                }
                Ok(())
            }
        }
    }
}
