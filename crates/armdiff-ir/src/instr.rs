//! Single instruction IR.

use std::fmt;

use crate::expr::Expr;
use crate::stmt::Stmt;

/// Where execution continues after an instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Terminator {
    /// Fall through to `pc + size`.
    #[default]
    Fall,
    /// Continue at a computed address (interworking bit already cleared).
    JumpDyn { addr: Expr },
}

/// IR for a single instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrIR {
    /// Address of this instruction.
    pub pc: u32,
    /// Instruction size in bytes (2 or 4).
    pub size: u8,
    pub statements: Vec<Stmt>,
    pub terminator: Terminator,
}

impl InstrIR {
    pub const fn new(pc: u32, size: u8, statements: Vec<Stmt>, terminator: Terminator) -> Self {
        Self {
            pc,
            size,
            statements,
            terminator,
        }
    }

    /// Address of the next sequential instruction.
    pub const fn next_pc(&self) -> u32 {
        self.pc.wrapping_add(self.size as u32)
    }

    pub const fn is_wide(&self) -> bool {
        self.size == 4
    }
}

impl fmt::Display for InstrIR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:#x} ({} bytes):", self.pc, self.size)?;
        for stmt in &self.statements {
            writeln!(f, "  {stmt}")?;
        }
        match &self.terminator {
            Terminator::Fall => write!(f, "  -> {:#x}", self.next_pc()),
            Terminator::JumpDyn { addr } => write!(f, "  -> {addr}"),
        }
    }
}
