//! 32-bit Thumb-2 load/store decoding.

use crate::encode::{bit, bits, in_list, reg_field};
use crate::types::{AddrMode, DecodeError, Instr, MemOp, Offset, PC, Reg, SP};

pub(super) fn decode32(hw1: u16, hw2: u16) -> Result<Instr, DecodeError> {
    let raw = (u32::from(hw1) << 16) | u32::from(hw2);

    match bits(hw1, 15, 9) {
        0b111_0100 => {
            if bit(hw1, 6) {
                decode_dual(hw1, hw2, raw)
            } else {
                decode_multiple(hw1, hw2, raw)
            }
        }
        0b111_1100 => decode_single(hw1, hw2, raw),
        _ => Err(DecodeError::Unsupported { raw }),
    }
}

const fn unpredictable(raw: u32, reason: &'static str) -> DecodeError {
    DecodeError::Unpredictable { raw, reason }
}

fn decode_multiple(hw1: u16, hw2: u16, raw: u32) -> Result<Instr, DecodeError> {
    let decrement = match bits(hw1, 8, 7) {
        0b01 => false,
        0b10 => true,
        // srs / rfe
        _ => return Err(DecodeError::Unsupported { raw }),
    };
    let wback = bit(hw1, 5);
    let load = bit(hw1, 4);
    let rn = reg_field(hw1, 3, 0);
    let regs = hw2;

    if load && bit(regs, 15) {
        // loading pc branches
        return Err(DecodeError::Unsupported { raw });
    }
    if rn == PC || regs.count_ones() < 2 {
        return Err(unpredictable(raw, "bad base or register list"));
    }
    if bit(regs, 13) || bit(regs, 15) {
        return Err(unpredictable(raw, "sp or pc in register list"));
    }
    if wback && in_list(regs, rn) {
        return Err(unpredictable(raw, "writeback base in register list"));
    }

    Ok(Instr::Multi {
        load,
        rn,
        regs,
        wback,
        decrement,
    })
}

fn decode_dual(hw1: u16, hw2: u16, raw: u32) -> Result<Instr, DecodeError> {
    let p = bit(hw1, 8);
    let w = bit(hw1, 5);
    if !p && !w {
        // exclusives and table branches
        return Err(DecodeError::Unsupported { raw });
    }

    let load = bit(hw1, 4);
    let rn = reg_field(hw1, 3, 0);
    let rt = reg_field(hw2, 15, 12);
    let rt2 = reg_field(hw2, 11, 8);
    let imm = u32::from(bits(hw2, 7, 0)) << 2;

    if rn == PC {
        if load && !w {
            // literal form
            return Err(DecodeError::Unsupported { raw });
        }
        return Err(unpredictable(raw, "pc base"));
    }
    if w && (rn == rt || rn == rt2) {
        return Err(unpredictable(raw, "writeback base overlaps a transfer register"));
    }
    if is_sp_or_pc(rt) || is_sp_or_pc(rt2) {
        return Err(unpredictable(raw, "sp or pc transfer register"));
    }
    if load && rt == rt2 {
        return Err(unpredictable(raw, "ldrd into the same register twice"));
    }

    Ok(Instr::Dual {
        load,
        rt,
        rt2,
        rn,
        imm,
        mode: AddrMode::from_puw(p, bit(hw1, 7), w),
    })
}

const fn is_sp_or_pc(r: Reg) -> bool {
    r == SP || r == PC
}

fn decode_single(hw1: u16, hw2: u16, raw: u32) -> Result<Instr, DecodeError> {
    let signed = bit(hw1, 8);
    let load = bit(hw1, 4);
    let rn = reg_field(hw1, 3, 0);
    let rt = reg_field(hw2, 15, 12);

    let op = match (load, signed, bits(hw1, 6, 5)) {
        (true, false, 0b00) => MemOp::Ldrb,
        (true, false, 0b01) => MemOp::Ldrh,
        (true, false, 0b10) => MemOp::Ldr,
        (true, true, 0b00) => MemOp::Ldrsb,
        (true, true, 0b01) => MemOp::Ldrsh,
        (false, false, 0b00) => MemOp::Strb,
        (false, false, 0b01) => MemOp::Strh,
        (false, false, 0b10) => MemOp::Str,
        _ => return Err(DecodeError::Undefined { raw }),
    };

    if load && rt == PC {
        // word loads into pc branch; narrow ones are preload hints
        return Err(DecodeError::Unsupported { raw });
    }

    if rn == PC {
        if !load {
            return Err(DecodeError::Undefined { raw });
        }
        return Ok(Instr::LdrLit {
            op,
            rt,
            imm: u32::from(bits(hw2, 11, 0)),
            add: bit(hw1, 7),
        });
    }

    let (offset, mode) = if bit(hw1, 7) {
        (Offset::Imm(u32::from(bits(hw2, 11, 0))), AddrMode::OFFSET)
    } else if bit(hw2, 11) {
        let mode = AddrMode::from_puw(bit(hw2, 10), bit(hw2, 9), bit(hw2, 8));
        if mode.index && mode.add && !mode.wback {
            // unprivileged ldrt/strt family
            return Err(DecodeError::Unsupported { raw });
        }
        if !mode.index && !mode.wback {
            return Err(DecodeError::Undefined { raw });
        }
        (Offset::Imm(u32::from(bits(hw2, 7, 0))), mode)
    } else if bits(hw2, 11, 6) == 0 {
        let rm = reg_field(hw2, 3, 0);
        if is_sp_or_pc(rm) {
            return Err(unpredictable(raw, "sp or pc offset register"));
        }
        let shift = reg_field(hw2, 5, 4);
        (Offset::Reg { rm, shift }, AddrMode::OFFSET)
    } else {
        return Err(DecodeError::Undefined { raw });
    };

    if mode.wback && rn == rt {
        return Err(unpredictable(raw, "writeback base equals transfer register"));
    }
    if !load && rt == PC {
        return Err(unpredictable(raw, "store of pc"));
    }
    if op.width() < 4 && rt == SP {
        return Err(unpredictable(raw, "narrow access with sp"));
    }

    Ok(Instr::Mem {
        op,
        rt,
        rn,
        offset,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ldm_w() {
        assert_eq!(
            decode32(0xe891, 0x003c),
            Ok(Instr::Multi {
                load: true,
                rn: 1,
                regs: 0x3c,
                wback: false,
                decrement: false,
            })
        );
        assert_eq!(
            decode32(0xe881, 0x003c),
            Ok(Instr::Multi {
                load: false,
                rn: 1,
                regs: 0x3c,
                wback: false,
                decrement: false,
            })
        );
    }

    #[test]
    fn test_decode_ldm_w_rejects_single_register() {
        assert!(matches!(
            decode32(0xe891, 0x0004),
            Err(DecodeError::Unpredictable { .. })
        ));
    }

    #[test]
    fn test_decode_ldrd_modes() {
        let cases = [
            (0xe9d1, 0x0200, AddrMode::from_puw(true, true, false), 0),
            (0xe951, 0x0201, AddrMode::from_puw(true, false, false), 4),
            (0xe9f1, 0x0201, AddrMode::from_puw(true, true, true), 4),
            (0xe871, 0x0201, AddrMode::from_puw(false, false, true), 4),
        ];
        for (hw1, hw2, mode, imm) in cases {
            assert_eq!(
                decode32(hw1, hw2),
                Ok(Instr::Dual {
                    load: true,
                    rt: 0,
                    rt2: 2,
                    rn: 1,
                    imm,
                    mode,
                }),
                "{hw1:#x} {hw2:#x}"
            );
        }
    }

    #[test]
    fn test_decode_ldrd_writeback_overlap() {
        // ldrd r1, r2, [r1], #4
        assert!(matches!(
            decode32(0xe8f1, 0x1201),
            Err(DecodeError::Unpredictable { .. })
        ));
    }

    #[test]
    fn test_decode_single_forms() {
        assert_eq!(
            decode32(0xf8d1, 0xd000),
            Ok(Instr::Mem {
                op: MemOp::Ldr,
                rt: SP,
                rn: 1,
                offset: Offset::Imm(0),
                mode: AddrMode::OFFSET,
            })
        );
        assert_eq!(
            decode32(0xf851, 0x0b04),
            Ok(Instr::Mem {
                op: MemOp::Ldr,
                rt: 0,
                rn: 1,
                offset: Offset::Imm(4),
                mode: AddrMode::from_puw(false, true, true),
            })
        );
        assert_eq!(
            decode32(0xf911, 0x0c04),
            Ok(Instr::Mem {
                op: MemOp::Ldrsb,
                rt: 0,
                rn: 1,
                offset: Offset::Imm(4),
                mode: AddrMode::from_puw(true, false, false),
            })
        );
        assert_eq!(
            decode32(0xf9b1, 0x00a0),
            Ok(Instr::Mem {
                op: MemOp::Ldrsh,
                rt: 0,
                rn: 1,
                offset: Offset::Imm(0xa0),
                mode: AddrMode::OFFSET,
            })
        );
    }

    #[test]
    fn test_decode_single_rejects() {
        // ldr r1, [r1, #4]!
        assert!(matches!(
            decode32(0xf851, 0x1f04),
            Err(DecodeError::Unpredictable { .. })
        ));
        // ldrt
        assert!(matches!(
            decode32(0xf851, 0x0e04),
            Err(DecodeError::Unsupported { .. })
        ));
        // P=0, W=0
        assert!(matches!(
            decode32(0xf851, 0x0a04),
            Err(DecodeError::Undefined { .. })
        ));
        // ldr pc, [r1]
        assert!(matches!(
            decode32(0xf8d1, 0xf000),
            Err(DecodeError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_decode_literal() {
        assert_eq!(
            decode32(0xf85f, 0x0008),
            Ok(Instr::LdrLit {
                op: MemOp::Ldr,
                rt: 0,
                imm: 8,
                add: false,
            })
        );
    }

    #[test]
    fn test_decode_data_processing_unsupported() {
        // add.w r0, r1, r2
        assert!(matches!(
            decode32(0xeb01, 0x0002),
            Err(DecodeError::Unsupported { .. })
        ));
    }
}
