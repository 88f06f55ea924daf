//! IR evaluation.

use thiserror::Error;

use crate::expr::{Expr, ExprKind, Flag, Space};
use crate::instr::{InstrIR, Terminator};
use crate::stmt::Stmt;

/// Number of scratch temps available to one instruction.
pub const NUM_TEMPS: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("memory access of {width} bytes at {addr:#x} failed")]
    Memory { addr: u32, width: u8 },

    #[error("invalid access width {0}")]
    InvalidWidth(u8),

    #[error("invalid {space:?} index {index}")]
    InvalidIndex { space: Space, index: u32 },

    #[error("malformed {0:?} node")]
    Malformed(ExprKind),
}

/// Architectural state the evaluator reads and writes.
pub trait Machine {
    fn reg(&self, idx: u8) -> u32;
    fn set_reg(&mut self, idx: u8, value: u32);
    fn flag(&self, flag: Flag) -> bool;
    fn set_flag(&mut self, flag: Flag, value: bool);

    /// Little-endian load of `width` bytes, zero-extended.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Memory`] if the access cannot be performed.
    fn load(&mut self, addr: u32, width: u8) -> Result<u32, EvalError>;

    /// Little-endian store of the low `width` bytes of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Memory`] if the access cannot be performed.
    fn store(&mut self, addr: u32, value: u32, width: u8) -> Result<(), EvalError>;
}

impl Flag {
    pub const fn from_index(idx: u32) -> Option<Self> {
        match idx {
            0 => Some(Self::N),
            1 => Some(Self::Z),
            2 => Some(Self::C),
            3 => Some(Self::V),
            _ => None,
        }
    }
}

/// Evaluates statements with a private set of temps.
#[derive(Debug, Default)]
pub struct Evaluator {
    temps: [u32; NUM_TEMPS],
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one instruction and return the address execution continues at.
    ///
    /// # Errors
    ///
    /// Propagates memory faults and rejects malformed IR. Statements before
    /// the failing one have already taken effect.
    pub fn execute<M: Machine>(&mut self, ir: &InstrIR, m: &mut M) -> Result<u32, EvalError> {
        self.temps = [0; NUM_TEMPS];
        self.run(&ir.statements, m)?;
        match &ir.terminator {
            Terminator::Fall => Ok(ir.next_pc()),
            Terminator::JumpDyn { addr } => self.eval(addr, m),
        }
    }

    fn run<M: Machine>(&mut self, stmts: &[Stmt], m: &mut M) -> Result<(), EvalError> {
        for stmt in stmts {
            match stmt {
                Stmt::Write {
                    space,
                    addr,
                    value,
                    width,
                } => {
                    let value = self.eval(value, m)?;
                    let at = self.eval(addr, m)?;
                    match space {
                        Space::Reg => m.set_reg(reg_index(at)?, value),
                        Space::Flag => {
                            let flag = Flag::from_index(at).ok_or(EvalError::InvalidIndex {
                                space: Space::Flag,
                                index: at,
                            })?;
                            m.set_flag(flag, value & 1 != 0);
                        }
                        Space::Temp => *self.temp_mut(at)? = value,
                        Space::Mem => m.store(at, value, check_width(*width)?)?,
                    }
                }
                Stmt::If {
                    cond,
                    then_stmts,
                    else_stmts,
                } => {
                    if self.eval(cond, m)? != 0 {
                        self.run(then_stmts, m)?;
                    } else {
                        self.run(else_stmts, m)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn temp_mut(&mut self, idx: u32) -> Result<&mut u32, EvalError> {
        self.temps
            .get_mut(idx as usize)
            .ok_or(EvalError::InvalidIndex {
                space: Space::Temp,
                index: idx,
            })
    }

    /// Evaluate an expression to a 32-bit value.
    ///
    /// # Errors
    ///
    /// Fails on memory faults and malformed nodes.
    pub fn eval<M: Machine>(&self, e: &Expr, m: &mut M) -> Result<u32, EvalError> {
        let operand = |side: &Option<Box<Expr>>, m: &mut M| -> Result<u32, EvalError> {
            let side = side.as_deref().ok_or(EvalError::Malformed(e.kind))?;
            self.eval(side, m)
        };

        let value = match e.kind {
            ExprKind::Imm => e.imm,
            ExprKind::Read => match e.space {
                Space::Reg => m.reg(reg_index(e.imm)?),
                Space::Flag => {
                    let flag = Flag::from_index(e.imm).ok_or(EvalError::InvalidIndex {
                        space: Space::Flag,
                        index: e.imm,
                    })?;
                    u32::from(m.flag(flag))
                }
                Space::Temp => *self
                    .temps
                    .get(e.imm as usize)
                    .ok_or(EvalError::InvalidIndex {
                        space: Space::Temp,
                        index: e.imm,
                    })?,
                Space::Mem => {
                    let addr = operand(&e.left, m)?;
                    let width = check_width(e.width)?;
                    let raw = m.load(addr, width)?;
                    if e.signed { sign_extend(raw, width) } else { raw }
                }
            },
            ExprKind::Not => !operand(&e.left, m)?,
            ExprKind::Select => {
                if operand(&e.left, m)? != 0 {
                    operand(&e.right, m)?
                } else {
                    operand(&e.third, m)?
                }
            }
            kind => {
                let a = operand(&e.left, m)?;
                let b = operand(&e.right, m)?;
                binop(kind, a, b)
            }
        };
        Ok(value)
    }
}

fn binop(kind: ExprKind, a: u32, b: u32) -> u32 {
    match kind {
        ExprKind::Add => a.wrapping_add(b),
        ExprKind::Sub => a.wrapping_sub(b),
        ExprKind::Mul => a.wrapping_mul(b),
        ExprKind::And => a & b,
        ExprKind::Or => a | b,
        ExprKind::Xor => a ^ b,
        ExprKind::Sll => a.checked_shl(b).unwrap_or(0),
        ExprKind::Srl => a.checked_shr(b).unwrap_or(0),
        ExprKind::Sra => {
            let shift = b.min(31);
            ((a as i32) >> shift) as u32
        }
        ExprKind::Ror => a.rotate_right(b & 31),
        ExprKind::Eq => u32::from(a == b),
        ExprKind::Ne => u32::from(a != b),
        ExprKind::Ltu => u32::from(a < b),
        ExprKind::Imm | ExprKind::Read | ExprKind::Not | ExprKind::Select => 0,
    }
}

fn reg_index(idx: u32) -> Result<u8, EvalError> {
    u8::try_from(idx)
        .ok()
        .filter(|r| *r < 16)
        .ok_or(EvalError::InvalidIndex {
            space: Space::Reg,
            index: idx,
        })
}

const fn check_width(width: u8) -> Result<u8, EvalError> {
    match width {
        1 | 2 | 4 => Ok(width),
        _ => Err(EvalError::InvalidWidth(width)),
    }
}

const fn sign_extend(value: u32, width: u8) -> u32 {
    match width {
        1 => value as u8 as i8 as i32 as u32,
        2 => value as u16 as i16 as i32 as u32,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct TestMachine {
        regs: [u32; 16],
        flags: [bool; 4],
        mem: BTreeMap<u32, u8>,
    }

    impl Machine for TestMachine {
        fn reg(&self, idx: u8) -> u32 {
            self.regs[idx as usize]
        }
        fn set_reg(&mut self, idx: u8, value: u32) {
            self.regs[idx as usize] = value;
        }
        fn flag(&self, flag: Flag) -> bool {
            self.flags[flag as usize]
        }
        fn set_flag(&mut self, flag: Flag, value: bool) {
            self.flags[flag as usize] = value;
        }
        fn load(&mut self, addr: u32, width: u8) -> Result<u32, EvalError> {
            let mut v = 0u32;
            for i in 0..u32::from(width) {
                let b = self.mem.get(&addr.wrapping_add(i)).copied().unwrap_or(0);
                v |= u32::from(b) << (8 * i);
            }
            Ok(v)
        }
        fn store(&mut self, addr: u32, value: u32, width: u8) -> Result<(), EvalError> {
            for i in 0..u32::from(width) {
                self.mem.insert(addr.wrapping_add(i), (value >> (8 * i)) as u8);
            }
            Ok(())
        }
    }

    #[test]
    fn test_shift_edges() {
        assert_eq!(binop(ExprKind::Sll, 1, 32), 0);
        assert_eq!(binop(ExprKind::Srl, 0x8000_0000, 32), 0);
        assert_eq!(binop(ExprKind::Sra, 0x8000_0000, 32), 0xffff_ffff);
        assert_eq!(binop(ExprKind::Sra, 0x4000_0000, 200), 0);
        assert_eq!(binop(ExprKind::Ror, 0x0000_0001, 33), 0x8000_0000);
    }

    #[test]
    fn test_signed_load() {
        let mut m = TestMachine::default();
        m.mem.insert(0x100, 0x80);
        let ev = Evaluator::new();
        let e = Expr::mem_s(Expr::imm(0x100), 1);
        assert_eq!(ev.eval(&e, &mut m), Ok(0xffff_ff80));
        let e = Expr::mem_u(Expr::imm(0x100), 1);
        assert_eq!(ev.eval(&e, &mut m), Ok(0x80));
    }

    #[test]
    fn test_statements_see_earlier_writes() {
        let mut m = TestMachine::default();
        m.regs[1] = 0x1000;
        let ir = InstrIR::new(
            0x200,
            2,
            vec![
                Stmt::write_temp(0, Expr::reg(1)),
                Stmt::write_reg(1, Expr::add(Expr::temp(0), Expr::imm(4))),
                Stmt::write_mem(Expr::temp(0), Expr::reg(1), 4),
                Stmt::write_flag(Flag::C, Expr::imm(3)),
            ],
            Terminator::Fall,
        );
        let next = Evaluator::new().execute(&ir, &mut m).unwrap();
        assert_eq!(next, 0x202);
        assert_eq!(m.regs[1], 0x1004);
        assert_eq!(m.load(0x1000, 4), Ok(0x1004));
        assert!(m.flags[Flag::C as usize]);
    }

    #[test]
    fn test_jump_and_if() {
        let mut m = TestMachine::default();
        m.regs[0] = 1;
        let ir = InstrIR::new(
            0x200,
            2,
            vec![Stmt::if_then_else(
                Expr::reg(0),
                vec![Stmt::write_reg(2, Expr::imm(7))],
                vec![Stmt::write_reg(2, Expr::imm(9))],
            )],
            Terminator::JumpDyn {
                addr: Expr::imm(0x400),
            },
        );
        assert_eq!(Evaluator::new().execute(&ir, &mut m), Ok(0x400));
        assert_eq!(m.regs[2], 7);
    }

    #[test]
    fn test_malformed_and_bad_indices() {
        let mut m = TestMachine::default();
        let ev = Evaluator::new();
        let broken = Expr {
            kind: ExprKind::Add,
            ..Expr::default()
        };
        assert_eq!(
            ev.eval(&broken, &mut m),
            Err(EvalError::Malformed(ExprKind::Add))
        );
        assert!(matches!(
            ev.eval(&Expr::reg(16), &mut m),
            Err(EvalError::InvalidIndex { .. })
        ));
        assert_eq!(
            ev.eval(&Expr::mem_u(Expr::imm(0), 3), &mut m),
            Err(EvalError::InvalidWidth(3))
        );
    }
}
