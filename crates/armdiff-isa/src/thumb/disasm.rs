//! Thumb disassembly.
//!
//! Output uses unified syntax with hex immediates, matching the mnemonics
//! stored alongside corpus entries.

use crate::encode::reg_list;
use crate::types::{
    AddrMode, AluOp, DecodedInstr, HiRegOp, Imm8Op, Instr, Offset, Operand, Reg, ShiftOp, reg_name,
};

/// Format a decoded instruction.
#[must_use]
pub fn disasm(decoded: &DecodedInstr) -> String {
    match decoded.instr {
        Instr::Adr { rd, imm } => format!("adr {}, {imm:#x}", reg_name(rd)),
        Instr::Mem {
            op,
            rt,
            rn,
            offset,
            mode,
        } => format!(
            "{} {}, {}",
            op.mnemonic(),
            reg_name(rt),
            format_address(rn, offset, mode)
        ),
        Instr::LdrLit { op, rt, imm, add } => format!(
            "{} {}, [pc, #{}{imm:#x}]",
            op.mnemonic(),
            reg_name(rt),
            if add { "" } else { "-" }
        ),
        Instr::Dual {
            load,
            rt,
            rt2,
            rn,
            imm,
            mode,
        } => format!(
            "{} {}, {}, {}",
            if load { "ldrd" } else { "strd" },
            reg_name(rt),
            reg_name(rt2),
            format_address(rn, Offset::Imm(imm), mode)
        ),
        Instr::Multi {
            load,
            rn,
            regs,
            wback,
            decrement,
        } => format!(
            "{}{} {}{}, {}",
            if load { "ldm" } else { "stm" },
            if decrement { "db" } else { "" },
            reg_name(rn),
            if wback { "!" } else { "" },
            format_reg_list(regs)
        ),
        Instr::Push { regs } => format!("push {}", format_reg_list(regs)),
        Instr::Pop { regs } => format!("pop {}", format_reg_list(regs)),
        Instr::ShiftImm { op, rd, rm, imm } => {
            if op == ShiftOp::Lsl && imm == 0 {
                format!("movs {}, {}", reg_name(rd), reg_name(rm))
            } else {
                format!(
                    "{}s {}, {}, #{imm:#x}",
                    shift_name(op),
                    reg_name(rd),
                    reg_name(rm)
                )
            }
        }
        Instr::AddSub {
            sub,
            rd,
            rn,
            operand,
        } => {
            let operand = match operand {
                Operand::Reg(rm) => reg_name(rm).to_string(),
                Operand::Imm(imm) => format!("#{imm:#x}"),
            };
            format!(
                "{} {}, {}, {operand}",
                if sub { "subs" } else { "adds" },
                reg_name(rd),
                reg_name(rn)
            )
        }
        Instr::Imm8 { op, rdn, imm } => {
            let mnemonic = match op {
                Imm8Op::Mov => "movs",
                Imm8Op::Cmp => "cmp",
                Imm8Op::Add => "adds",
                Imm8Op::Sub => "subs",
            };
            format!("{mnemonic} {}, #{imm:#x}", reg_name(rdn))
        }
        Instr::Alu { op, rdn, rm } => format_alu(op, rdn, rm),
        Instr::HiReg { op, rdn, rm } => {
            let mnemonic = match op {
                HiRegOp::Add => "add",
                HiRegOp::Cmp => "cmp",
                HiRegOp::Mov => "mov",
            };
            format!("{mnemonic} {}, {}", reg_name(rdn), reg_name(rm))
        }
        Instr::AddSpImm { rd, imm } => format!("add {}, sp, #{imm:#x}", reg_name(rd)),
        Instr::AdjustSp { sub, imm } => {
            format!("{} sp, #{imm:#x}", if sub { "sub" } else { "add" })
        }
    }
}

const fn shift_name(op: ShiftOp) -> &'static str {
    match op {
        ShiftOp::Lsl => "lsl",
        ShiftOp::Lsr => "lsr",
        ShiftOp::Asr => "asr",
    }
}

fn format_alu(op: AluOp, rdn: Reg, rm: Reg) -> String {
    let (d, m) = (reg_name(rdn), reg_name(rm));
    match op {
        AluOp::Rsb => format!("rsbs {d}, {m}, #0x0"),
        AluOp::Mul => format!("muls {d}, {m}, {d}"),
        _ => {
            let mnemonic = match op {
                AluOp::And => "ands",
                AluOp::Eor => "eors",
                AluOp::Lsl => "lsls",
                AluOp::Lsr => "lsrs",
                AluOp::Asr => "asrs",
                AluOp::Adc => "adcs",
                AluOp::Sbc => "sbcs",
                AluOp::Ror => "rors",
                AluOp::Tst => "tst",
                AluOp::Cmp => "cmp",
                AluOp::Cmn => "cmn",
                AluOp::Orr => "orrs",
                AluOp::Bic => "bics",
                AluOp::Mvn | AluOp::Rsb | AluOp::Mul => "mvns",
            };
            format!("{mnemonic} {d}, {m}")
        }
    }
}

fn format_address(rn: Reg, offset: Offset, mode: AddrMode) -> String {
    let base = reg_name(rn);
    let offset = match offset {
        Offset::Imm(0) if mode.add => None,
        Offset::Imm(imm) => Some(format!("#{}{imm:#x}", if mode.add { "" } else { "-" })),
        Offset::Reg { rm, shift: 0 } => Some(reg_name(rm).to_string()),
        Offset::Reg { rm, shift } => Some(format!("{}, lsl #{shift}", reg_name(rm))),
    };

    match (mode.index, offset) {
        (true, None) => format!("[{base}]{}", if mode.wback { "!" } else { "" }),
        (true, Some(off)) => format!("[{base}, {off}]{}", if mode.wback { "!" } else { "" }),
        (false, None) => format!("[{base}], #0x0"),
        (false, Some(off)) => format!("[{base}], {off}"),
    }
}

fn format_reg_list(regs: u16) -> String {
    let mut out = String::from("{");
    for (i, r) in reg_list(regs).enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(reg_name(r));
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use crate::thumb::decode;

    fn dis(bytes: &[u8]) -> String {
        super::disasm(&decode(bytes, 0x10_0000).unwrap())
    }

    #[test]
    fn test_disasm_load_store_forms() {
        assert_eq!(dis(b"\x08\xa0"), "adr r0, 0x20");
        assert_eq!(dis(b"\x91\xe8\x3c\x00"), "ldm r1, {r2, r3, r4, r5}");
        assert_eq!(dis(b"\x3c\xc9"), "ldm r1!, {r2, r3, r4, r5}");
        assert_eq!(dis(b"\x08\x68"), "ldr r0, [r1]");
        assert_eq!(dis(b"\x51\xf8\x04\x0c"), "ldr r0, [r1, #-0x4]");
        assert_eq!(dis(b"\x51\xf8\x00\x0f"), "ldr r0, [r1]!");
        assert_eq!(dis(b"\x51\xf8\x04\x0d"), "ldr r0, [r1, #-0x4]!");
        assert_eq!(dis(b"\x51\xf8\x04\x09"), "ldr r0, [r1], #-0x4");
        assert_eq!(dis(b"\xd1\xf8\x00\xd0"), "ldr sp, [r1]");
        assert_eq!(dis(b"\x00\x98"), "ldr r0, [sp]");
        assert_eq!(dis(b"\x71\xe8\x01\x02"), "ldrd r0, r2, [r1], #-0x4");
        assert_eq!(dis(b"\xe1\xe9\x00\x02"), "strd r0, r2, [r1]!");
        assert_eq!(dis(b"\x88\x80"), "strh r0, [r1, #0x4]");
        assert_eq!(dis(b"\x01\x48"), "ldr r0, [pc, #0x4]");
    }

    #[test]
    fn test_disasm_data_processing() {
        assert_eq!(dis(b"\x2a\x20"), "movs r0, #0x2a");
        assert_eq!(dis(b"\x88\x18"), "adds r0, r1, r2");
        assert_eq!(dis(b"\xc8\x1f"), "subs r0, r1, #0x7");
        assert_eq!(dis(b"\x08\x10"), "asrs r0, r1, #0x20");
        assert_eq!(dis(b"\x08\x00"), "movs r0, r1");
        assert_eq!(dis(b"\x48\x42"), "rsbs r0, r1, #0x0");
        assert_eq!(dis(b"\x48\x43"), "muls r0, r1, r0");
        assert_eq!(dis(b"\x08\x42"), "tst r0, r1");
        assert_eq!(dis(b"\x88\x46"), "mov r8, r1");
        assert_eq!(dis(b"\x04\xa8"), "add r0, sp, #0x10");
        assert_eq!(dis(b"\x82\xb0"), "sub sp, #0x8");
        assert_eq!(dis(b"\x10\xb5"), "push {r4, lr}");
    }
}
