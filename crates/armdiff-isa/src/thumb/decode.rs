//! 16-bit Thumb decoding.

use crate::encode::{bit, bits, in_list, lowest_reg, reg_field};
use crate::types::{
    AddrMode, AluOp, DecodeError, HiRegOp, Imm8Op, Instr, MemOp, Offset, Operand, PC, ShiftOp,
};

pub(super) fn decode16(hw: u16) -> Result<Instr, DecodeError> {
    let raw = u32::from(hw);
    let unsupported = DecodeError::Unsupported { raw };

    match bits(hw, 15, 13) {
        0b000 => Ok(decode_shift_add_sub(hw)),
        0b001 => Ok(Instr::Imm8 {
            op: match bits(hw, 12, 11) {
                0 => Imm8Op::Mov,
                1 => Imm8Op::Cmp,
                2 => Imm8Op::Add,
                _ => Imm8Op::Sub,
            },
            rdn: reg_field(hw, 10, 8),
            imm: u32::from(bits(hw, 7, 0)),
        }),
        0b010 => decode_data_or_reg_offset(hw),
        0b011 => {
            let op = match bits(hw, 12, 11) {
                0b00 => MemOp::Str,
                0b01 => MemOp::Ldr,
                0b10 => MemOp::Strb,
                _ => MemOp::Ldrb,
            };
            let scale = if op.width() == 4 { 2 } else { 0 };
            Ok(imm_offset(op, hw, u32::from(bits(hw, 10, 6)) << scale))
        }
        0b100 => {
            if bit(hw, 12) {
                // SP-relative word access
                let op = if bit(hw, 11) { MemOp::Ldr } else { MemOp::Str };
                Ok(Instr::Mem {
                    op,
                    rt: reg_field(hw, 10, 8),
                    rn: crate::SP,
                    offset: Offset::Imm(u32::from(bits(hw, 7, 0)) << 2),
                    mode: AddrMode::OFFSET,
                })
            } else {
                let op = if bit(hw, 11) { MemOp::Ldrh } else { MemOp::Strh };
                Ok(imm_offset(op, hw, u32::from(bits(hw, 10, 6)) << 1))
            }
        }
        0b101 => {
            if bit(hw, 12) {
                decode_misc(hw)
            } else {
                let rd = reg_field(hw, 10, 8);
                let imm = u32::from(bits(hw, 7, 0)) << 2;
                if bit(hw, 11) {
                    Ok(Instr::AddSpImm { rd, imm })
                } else {
                    Ok(Instr::Adr { rd, imm })
                }
            }
        }
        0b110 if !bit(hw, 12) => decode_ldm_stm(hw),
        _ => Err(unsupported),
    }
}

fn imm_offset(op: MemOp, hw: u16, imm: u32) -> Instr {
    Instr::Mem {
        op,
        rt: reg_field(hw, 2, 0),
        rn: reg_field(hw, 5, 3),
        offset: Offset::Imm(imm),
        mode: AddrMode::OFFSET,
    }
}

fn decode_shift_add_sub(hw: u16) -> Instr {
    let rd = reg_field(hw, 2, 0);
    let rm = reg_field(hw, 5, 3);
    match bits(hw, 12, 11) {
        0b11 => {
            let field = reg_field(hw, 8, 6);
            let operand = if bit(hw, 10) {
                Operand::Imm(u32::from(field))
            } else {
                Operand::Reg(field)
            };
            Instr::AddSub {
                sub: bit(hw, 9),
                rd,
                rn: rm,
                operand,
            }
        }
        op => {
            let imm5 = reg_field(hw, 10, 6);
            let (op, imm) = match op {
                0b00 => (ShiftOp::Lsl, imm5),
                0b01 => (ShiftOp::Lsr, if imm5 == 0 { 32 } else { imm5 }),
                _ => (ShiftOp::Asr, if imm5 == 0 { 32 } else { imm5 }),
            };
            Instr::ShiftImm { op, rd, rm, imm }
        }
    }
}

fn decode_data_or_reg_offset(hw: u16) -> Result<Instr, DecodeError> {
    let raw = u32::from(hw);

    if bit(hw, 12) {
        let op = match bits(hw, 11, 9) {
            0b000 => MemOp::Str,
            0b001 => MemOp::Strh,
            0b010 => MemOp::Strb,
            0b011 => MemOp::Ldrsb,
            0b100 => MemOp::Ldr,
            0b101 => MemOp::Ldrh,
            0b110 => MemOp::Ldrb,
            _ => MemOp::Ldrsh,
        };
        return Ok(Instr::Mem {
            op,
            rt: reg_field(hw, 2, 0),
            rn: reg_field(hw, 5, 3),
            offset: Offset::Reg {
                rm: reg_field(hw, 8, 6),
                shift: 0,
            },
            mode: AddrMode::OFFSET,
        });
    }

    if bit(hw, 11) {
        // LDR (literal)
        return Ok(Instr::LdrLit {
            op: MemOp::Ldr,
            rt: reg_field(hw, 10, 8),
            imm: u32::from(bits(hw, 7, 0)) << 2,
            add: true,
        });
    }

    if !bit(hw, 10) {
        return Ok(Instr::Alu {
            op: AluOp::from_bits(bits(hw, 9, 6)),
            rdn: reg_field(hw, 2, 0),
            rm: reg_field(hw, 5, 3),
        });
    }

    // Special data processing on the full register file
    let rdn = (reg_field(hw, 7, 7) << 3) | reg_field(hw, 2, 0);
    let rm = reg_field(hw, 6, 3);
    match bits(hw, 9, 8) {
        0b00 => {
            if rdn == PC && rm == PC {
                return Err(DecodeError::Unpredictable {
                    raw,
                    reason: "add with pc as both operands",
                });
            }
            Ok(Instr::HiReg {
                op: HiRegOp::Add,
                rdn,
                rm,
            })
        }
        0b01 => {
            if rdn < 8 && rm < 8 {
                return Err(DecodeError::Unpredictable {
                    raw,
                    reason: "high-register cmp with two low registers",
                });
            }
            if rdn == PC || rm == PC {
                return Err(DecodeError::Unpredictable {
                    raw,
                    reason: "cmp with pc",
                });
            }
            Ok(Instr::HiReg {
                op: HiRegOp::Cmp,
                rdn,
                rm,
            })
        }
        0b10 => Ok(Instr::HiReg {
            op: HiRegOp::Mov,
            rdn,
            rm,
        }),
        _ => Err(DecodeError::Unsupported { raw }),
    }
}

fn decode_misc(hw: u16) -> Result<Instr, DecodeError> {
    let raw = u32::from(hw);
    match bits(hw, 11, 8) {
        0b0000 => Ok(Instr::AdjustSp {
            sub: bit(hw, 7),
            imm: u32::from(bits(hw, 6, 0)) << 2,
        }),
        0b0100 | 0b0101 => {
            let regs = bits(hw, 7, 0) | (u16::from(bit(hw, 8)) << crate::LR);
            if regs == 0 {
                return Err(DecodeError::Unpredictable {
                    raw,
                    reason: "empty register list",
                });
            }
            Ok(Instr::Push { regs })
        }
        0b1100 => {
            let regs = bits(hw, 7, 0);
            if regs == 0 {
                return Err(DecodeError::Unpredictable {
                    raw,
                    reason: "empty register list",
                });
            }
            Ok(Instr::Pop { regs })
        }
        // pop with pc is an interworking branch
        _ => Err(DecodeError::Unsupported { raw }),
    }
}

fn decode_ldm_stm(hw: u16) -> Result<Instr, DecodeError> {
    let raw = u32::from(hw);
    let load = bit(hw, 11);
    let rn = reg_field(hw, 10, 8);
    let regs = bits(hw, 7, 0);

    if regs == 0 {
        return Err(DecodeError::Unpredictable {
            raw,
            reason: "empty register list",
        });
    }
    if !load && in_list(regs, rn) && lowest_reg(regs) != rn {
        return Err(DecodeError::Unpredictable {
            raw,
            reason: "stm writes back a base that is not the lowest stored register",
        });
    }

    Ok(Instr::Multi {
        load,
        rn,
        regs,
        wback: !load || !in_list(regs, rn),
        decrement: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_loads_and_stores() {
        assert_eq!(
            decode16(0x6848),
            Ok(Instr::Mem {
                op: MemOp::Ldr,
                rt: 0,
                rn: 1,
                offset: Offset::Imm(4),
                mode: AddrMode::OFFSET,
            })
        );
        assert_eq!(
            decode16(0x8088),
            Ok(Instr::Mem {
                op: MemOp::Strh,
                rt: 0,
                rn: 1,
                offset: Offset::Imm(4),
                mode: AddrMode::OFFSET,
            })
        );
        assert_eq!(
            decode16(0x9800),
            Ok(Instr::Mem {
                op: MemOp::Ldr,
                rt: 0,
                rn: crate::SP,
                offset: Offset::Imm(0),
                mode: AddrMode::OFFSET,
            })
        );
        assert_eq!(decode16(0xa008), Ok(Instr::Adr { rd: 0, imm: 0x20 }));
    }

    #[test]
    fn test_decode_ldm_writeback() {
        assert_eq!(
            decode16(0xc93c),
            Ok(Instr::Multi {
                load: true,
                rn: 1,
                regs: 0x3c,
                wback: true,
                decrement: false,
            })
        );
        // base in the list suppresses writeback for ldm
        assert!(matches!(
            decode16(0xc906),
            Ok(Instr::Multi { wback: false, .. })
        ));
    }

    #[test]
    fn test_decode_stm_base_not_lowest() {
        // stm r1!, {r0, r1}
        assert!(matches!(
            decode16(0xc103),
            Err(DecodeError::Unpredictable { .. })
        ));
        // stm r1!, {r1, r2} is fine
        assert!(decode16(0xc106).is_ok());
    }

    #[test]
    fn test_decode_shifts() {
        assert_eq!(
            decode16(0x0808),
            Ok(Instr::ShiftImm {
                op: ShiftOp::Lsr,
                rd: 0,
                rm: 1,
                imm: 32
            })
        );
        assert_eq!(
            decode16(0x0108),
            Ok(Instr::ShiftImm {
                op: ShiftOp::Lsl,
                rd: 0,
                rm: 1,
                imm: 4
            })
        );
    }

    #[test]
    fn test_decode_hireg() {
        assert_eq!(
            decode16(0x4688),
            Ok(Instr::HiReg {
                op: HiRegOp::Mov,
                rdn: 8,
                rm: 1
            })
        );
        // cmp r0, r1 in the high-register form
        assert!(matches!(
            decode16(0x4508),
            Err(DecodeError::Unpredictable { .. })
        ));
    }

    #[test]
    fn test_decode_push_pop() {
        assert_eq!(decode16(0xb510), Ok(Instr::Push { regs: 0x4010 }));
        assert_eq!(decode16(0xbc30), Ok(Instr::Pop { regs: 0x30 }));
        // pop {pc}
        assert!(matches!(
            decode16(0xbd00),
            Err(DecodeError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_decode_branches_unsupported() {
        assert!(matches!(
            decode16(0xd000),
            Err(DecodeError::Unsupported { .. })
        ));
        assert!(matches!(
            decode16(0x4770),
            Err(DecodeError::Unsupported { .. })
        ));
    }
}
