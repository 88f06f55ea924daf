//! Thumb to IR lifting.
//!
//! Operands are copied into scratch temps before any architectural write so
//! that later statements never observe a half-updated register file.

use armdiff_ir::{Expr, Flag, InstrIR, Stmt, Terminator};

use crate::encode::reg_list;
use crate::types::{
    AddrMode, AluOp, DecodedInstr, HiRegOp, Imm8Op, Instr, MemOp, Offset, Operand, PC, Reg, SP,
    ShiftOp,
};

/// Base register value, or first ALU operand.
const T_BASE: u8 = 0;
/// Effective address, or second ALU operand.
const T_ADDR: u8 = 1;
/// Result before it is committed.
const T_RES: u8 = 2;
/// Offset address for writeback.
const T_OFF: u8 = 3;

/// Lift a decoded instruction to IR.
#[must_use]
pub fn lift(d: &DecodedInstr) -> InstrIR {
    let mut out = Vec::new();
    let mut term = Terminator::Fall;

    match d.instr {
        Instr::Adr { rd, imm } => {
            out.push(Stmt::write_reg(rd, Expr::imm(d.aligned_pc().wrapping_add(imm))));
        }
        Instr::Mem {
            op,
            rt,
            rn,
            offset,
            mode,
        } => lift_mem(d, &mut out, op, rt, rn, offset, mode),
        Instr::LdrLit { op, rt, imm, add } => {
            let base = d.aligned_pc();
            let addr = if add {
                base.wrapping_add(imm)
            } else {
                base.wrapping_sub(imm)
            };
            out.push(Stmt::write_reg(rt, load(Expr::imm(addr), op)));
        }
        Instr::Dual {
            load,
            rt,
            rt2,
            rn,
            imm,
            mode,
        } => lift_dual(d, &mut out, load, [rt, rt2], rn, imm, mode),
        Instr::Multi {
            load,
            rn,
            regs,
            wback,
            decrement,
        } => lift_multi(&mut out, load, rn, regs, wback, decrement),
        Instr::Push { regs } => lift_multi(&mut out, false, SP, regs, true, true),
        Instr::Pop { regs } => lift_multi(&mut out, true, SP, regs, true, false),
        Instr::ShiftImm { op, rd, rm, imm } => lift_shift_imm(&mut out, op, rd, rm, imm),
        Instr::AddSub {
            sub,
            rd,
            rn,
            operand,
        } => {
            let b = match operand {
                Operand::Reg(rm) => Expr::reg(rm),
                Operand::Imm(imm) => Expr::imm(imm),
            };
            if sub {
                add_with_carry(&mut out, Expr::reg(rn), Expr::not(b), Expr::imm(1));
            } else {
                add_with_carry(&mut out, Expr::reg(rn), b, Expr::imm(0));
            }
            out.push(Stmt::write_reg(rd, Expr::temp(T_RES)));
        }
        Instr::Imm8 { op, rdn, imm } => match op {
            Imm8Op::Mov => {
                out.push(Stmt::write_temp(T_RES, Expr::imm(imm)));
                set_nz(&mut out);
                out.push(Stmt::write_reg(rdn, Expr::temp(T_RES)));
            }
            Imm8Op::Cmp => add_with_carry(&mut out, Expr::reg(rdn), Expr::imm(!imm), Expr::imm(1)),
            Imm8Op::Add => {
                add_with_carry(&mut out, Expr::reg(rdn), Expr::imm(imm), Expr::imm(0));
                out.push(Stmt::write_reg(rdn, Expr::temp(T_RES)));
            }
            Imm8Op::Sub => {
                add_with_carry(&mut out, Expr::reg(rdn), Expr::imm(!imm), Expr::imm(1));
                out.push(Stmt::write_reg(rdn, Expr::temp(T_RES)));
            }
        },
        Instr::Alu { op, rdn, rm } => lift_alu(&mut out, op, rdn, rm),
        Instr::HiReg { op, rdn, rm } => {
            let value = match op {
                HiRegOp::Add => Some(Expr::add(read(d, rdn), read(d, rm))),
                HiRegOp::Mov => Some(read(d, rm)),
                HiRegOp::Cmp => {
                    add_with_carry(&mut out, read(d, rdn), Expr::not(read(d, rm)), Expr::imm(1));
                    None
                }
            };
            if let Some(value) = value {
                if rdn == PC {
                    term = Terminator::JumpDyn {
                        addr: Expr::and(value, Expr::imm(!1)),
                    };
                } else {
                    out.push(Stmt::write_reg(rdn, value));
                }
            }
        }
        Instr::AddSpImm { rd, imm } => {
            out.push(Stmt::write_reg(rd, Expr::add(Expr::reg(SP), Expr::imm(imm))));
        }
        Instr::AdjustSp { sub, imm } => {
            let value = if sub {
                Expr::sub(Expr::reg(SP), Expr::imm(imm))
            } else {
                Expr::add(Expr::reg(SP), Expr::imm(imm))
            };
            out.push(Stmt::write_reg(SP, value));
        }
    }

    InstrIR::new(d.addr, d.size, out, term)
}

/// Register read; PC reads as the instruction address plus 4.
fn read(d: &DecodedInstr, r: Reg) -> Expr {
    if r == PC {
        Expr::imm(d.pc_value())
    } else {
        Expr::reg(r)
    }
}

fn load(addr: Expr, op: MemOp) -> Expr {
    if op.is_signed() {
        Expr::mem_s(addr, op.width())
    } else {
        Expr::mem_u(addr, op.width())
    }
}

/// Compute `T_OFF` and return the effective address.
fn address(out: &mut Vec<Stmt>, base: Expr, offset: Expr, mode: AddrMode) -> Expr {
    out.push(Stmt::write_temp(T_BASE, base));
    let offset_addr = if mode.add {
        Expr::add(Expr::temp(T_BASE), offset)
    } else {
        Expr::sub(Expr::temp(T_BASE), offset)
    };
    out.push(Stmt::write_temp(T_OFF, offset_addr));
    if mode.index {
        Expr::temp(T_OFF)
    } else {
        Expr::temp(T_BASE)
    }
}

fn lift_mem(
    d: &DecodedInstr,
    out: &mut Vec<Stmt>,
    op: MemOp,
    rt: Reg,
    rn: Reg,
    offset: Offset,
    mode: AddrMode,
) {
    let offset = match offset {
        Offset::Imm(imm) => Expr::imm(imm),
        Offset::Reg { rm, shift } => Expr::sll(Expr::reg(rm), Expr::imm(u32::from(shift))),
    };
    let addr = address(out, read(d, rn), offset, mode);

    if op.is_load() {
        out.push(Stmt::write_temp(T_RES, load(addr, op)));
        if mode.wback {
            out.push(Stmt::write_reg(rn, Expr::temp(T_OFF)));
        }
        out.push(Stmt::write_reg(rt, Expr::temp(T_RES)));
    } else {
        out.push(Stmt::write_mem(addr, read(d, rt), op.width()));
        if mode.wback {
            out.push(Stmt::write_reg(rn, Expr::temp(T_OFF)));
        }
    }
}

fn lift_dual(
    d: &DecodedInstr,
    out: &mut Vec<Stmt>,
    load: bool,
    regs: [Reg; 2],
    rn: Reg,
    imm: u32,
    mode: AddrMode,
) {
    let addr = address(out, read(d, rn), Expr::imm(imm), mode);
    out.push(Stmt::write_temp(T_ADDR, addr));

    for (k, r) in regs.into_iter().enumerate() {
        let at = Expr::add(Expr::temp(T_ADDR), Expr::imm(4 * k as u32));
        if load {
            out.push(Stmt::write_reg(r, Expr::mem_u(at, 4)));
        } else {
            out.push(Stmt::write_mem(at, Expr::reg(r), 4));
        }
    }
    if mode.wback {
        out.push(Stmt::write_reg(rn, Expr::temp(T_OFF)));
    }
}

fn lift_multi(out: &mut Vec<Stmt>, load: bool, rn: Reg, regs: u16, wback: bool, decrement: bool) {
    let span = 4 * regs.count_ones();
    out.push(Stmt::write_temp(T_BASE, Expr::reg(rn)));
    let start = if decrement {
        Expr::sub(Expr::temp(T_BASE), Expr::imm(span))
    } else {
        Expr::temp(T_BASE)
    };
    out.push(Stmt::write_temp(T_ADDR, start));

    for (k, r) in reg_list(regs).enumerate() {
        let at = Expr::add(Expr::temp(T_ADDR), Expr::imm(4 * k as u32));
        if load {
            out.push(Stmt::write_reg(r, Expr::mem_u(at, 4)));
        } else {
            out.push(Stmt::write_mem(at, Expr::reg(r), 4));
        }
    }

    if wback {
        let end = if decrement {
            Expr::temp(T_ADDR)
        } else {
            Expr::add(Expr::temp(T_BASE), Expr::imm(span))
        };
        out.push(Stmt::write_reg(rn, end));
    }
}

fn set_nz(out: &mut Vec<Stmt>) {
    out.push(Stmt::write_flag(Flag::N, Expr::msb(Expr::temp(T_RES))));
    out.push(Stmt::write_flag(Flag::Z, Expr::is_zero(Expr::temp(T_RES))));
}

/// `T_RES = a + b + carry` with all four flags.
///
/// Carry out of bit 31 is `(a & b) | ((a | b) & !r)`, signed overflow is
/// `(a ^ r) & (b ^ r)`, both taken at the sign bit.
fn add_with_carry(out: &mut Vec<Stmt>, a: Expr, b: Expr, carry: Expr) {
    let (ta, tb, tr) = (
        || Expr::temp(T_BASE),
        || Expr::temp(T_ADDR),
        || Expr::temp(T_RES),
    );
    out.push(Stmt::write_temp(T_BASE, a));
    out.push(Stmt::write_temp(T_ADDR, b));
    out.push(Stmt::write_temp(T_RES, Expr::add(Expr::add(ta(), tb()), carry)));

    let carry_out = Expr::or(
        Expr::and(ta(), tb()),
        Expr::and(Expr::or(ta(), tb()), Expr::not(tr())),
    );
    let overflow = Expr::and(Expr::xor(ta(), tr()), Expr::xor(tb(), tr()));
    out.push(Stmt::write_flag(Flag::C, Expr::msb(carry_out)));
    out.push(Stmt::write_flag(Flag::V, Expr::msb(overflow)));
    set_nz(out);
}

fn lift_shift_imm(out: &mut Vec<Stmt>, op: ShiftOp, rd: Reg, rm: Reg, imm: u8) {
    let amount = u32::from(imm);
    let value = || Expr::temp(T_BASE);
    out.push(Stmt::write_temp(T_BASE, Expr::reg(rm)));

    let (result, carry) = match op {
        ShiftOp::Lsl if amount == 0 => (value(), None),
        ShiftOp::Lsl => (
            Expr::sll(value(), Expr::imm(amount)),
            Some(Expr::bit(value(), 32 - amount)),
        ),
        ShiftOp::Lsr => (
            Expr::srl(value(), Expr::imm(amount)),
            Some(Expr::bit(value(), amount - 1)),
        ),
        ShiftOp::Asr => (
            Expr::sra(value(), Expr::imm(amount)),
            Some(Expr::bit(value(), amount - 1)),
        ),
    };

    out.push(Stmt::write_temp(T_RES, result));
    if let Some(carry) = carry {
        out.push(Stmt::write_flag(Flag::C, carry));
    }
    set_nz(out);
    out.push(Stmt::write_reg(rd, Expr::temp(T_RES)));
}

/// Register-specified shift; amount is the bottom byte of `rm`.
fn lift_shift_reg(out: &mut Vec<Stmt>, op: AluOp, rdn: Reg, rm: Reg) {
    let value = || Expr::temp(T_BASE);
    let amount = || Expr::temp(T_ADDR);
    out.push(Stmt::write_temp(T_BASE, Expr::reg(rdn)));
    out.push(Stmt::write_temp(T_ADDR, Expr::and(Expr::reg(rm), Expr::imm(0xff))));

    let bit_at = |pos: Expr| Expr::and(Expr::srl(value(), pos), Expr::imm(1));
    let minus_one = || Expr::sub(amount(), Expr::imm(1));
    let (result, carry) = match op {
        AluOp::Lsl => (
            Expr::sll(value(), amount()),
            Expr::select(
                Expr::ltu(amount(), Expr::imm(33)),
                bit_at(Expr::sub(Expr::imm(32), amount())),
                Expr::imm(0),
            ),
        ),
        AluOp::Lsr => (
            Expr::srl(value(), amount()),
            Expr::select(
                Expr::ltu(amount(), Expr::imm(33)),
                bit_at(minus_one()),
                Expr::imm(0),
            ),
        ),
        AluOp::Asr => (
            Expr::sra(value(), amount()),
            Expr::select(
                Expr::ltu(amount(), Expr::imm(32)),
                bit_at(minus_one()),
                Expr::msb(value()),
            ),
        ),
        _ => (
            Expr::ror(value(), amount()),
            Expr::msb(Expr::temp(T_RES)),
        ),
    };

    out.push(Stmt::write_temp(T_RES, result));
    out.push(Stmt::write_flag(
        Flag::C,
        Expr::select(Expr::is_zero(amount()), Expr::flag(Flag::C), carry),
    ));
    set_nz(out);
    out.push(Stmt::write_reg(rdn, Expr::temp(T_RES)));
}

fn lift_alu(out: &mut Vec<Stmt>, op: AluOp, rdn: Reg, rm: Reg) {
    let (d, m) = (|| Expr::reg(rdn), || Expr::reg(rm));

    let logical = match op {
        AluOp::And | AluOp::Tst => Some(Expr::and(d(), m())),
        AluOp::Eor => Some(Expr::xor(d(), m())),
        AluOp::Orr => Some(Expr::or(d(), m())),
        AluOp::Bic => Some(Expr::and(d(), Expr::not(m()))),
        AluOp::Mvn => Some(Expr::not(m())),
        AluOp::Mul => Some(Expr::mul(d(), m())),
        _ => None,
    };
    if let Some(result) = logical {
        out.push(Stmt::write_temp(T_RES, result));
        set_nz(out);
        if !op.is_compare() {
            out.push(Stmt::write_reg(rdn, Expr::temp(T_RES)));
        }
        return;
    }

    match op {
        AluOp::Lsl | AluOp::Lsr | AluOp::Asr | AluOp::Ror => lift_shift_reg(out, op, rdn, rm),
        AluOp::Adc => add_with_carry(out, d(), m(), Expr::flag(Flag::C)),
        AluOp::Sbc => add_with_carry(out, d(), Expr::not(m()), Expr::flag(Flag::C)),
        AluOp::Rsb => add_with_carry(out, Expr::not(m()), Expr::imm(0), Expr::imm(1)),
        AluOp::Cmp => add_with_carry(out, d(), Expr::not(m()), Expr::imm(1)),
        _ => add_with_carry(out, d(), m(), Expr::imm(0)),
    }
    if matches!(op, AluOp::Adc | AluOp::Sbc | AluOp::Rsb) {
        out.push(Stmt::write_reg(rdn, Expr::temp(T_RES)));
    }
}
