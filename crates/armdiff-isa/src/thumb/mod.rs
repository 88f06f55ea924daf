//! Thumb / Thumb-2 decode, lift, disasm.

mod decode;
mod decode32;
mod disasm;
mod lift;

use crate::encode::{halfword, is_wide};
use crate::types::{DecodeError, DecodedInstr};

pub use disasm::disasm;
pub use lift::lift;

/// Decode one instruction from the start of `bytes`, located at `addr`.
///
/// Extra trailing bytes are ignored.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the bytes are short, undefined,
/// unpredictable, or outside the supported subset.
pub fn decode(bytes: &[u8], addr: u32) -> Result<DecodedInstr, DecodeError> {
    let hw1 = halfword(bytes, 0).ok_or(DecodeError::Truncated {
        needed: 2,
        available: bytes.len(),
    })?;

    if !is_wide(hw1) {
        let instr = decode::decode16(hw1)?;
        return Ok(DecodedInstr {
            instr,
            addr,
            size: 2,
            raw: u32::from(hw1),
        });
    }

    let hw2 = halfword(bytes, 2).ok_or(DecodeError::Truncated {
        needed: 4,
        available: bytes.len(),
    })?;
    let instr = decode32::decode32(hw1, hw2)?;
    Ok(DecodedInstr {
        instr,
        addr,
        size: 4,
        raw: (u32::from(hw1) << 16) | u32::from(hw2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AddrMode, Instr, MemOp, Offset};

    #[test]
    fn test_decode_sizes() {
        let d = decode(&[0x08, 0x68], 0x10_0000).unwrap();
        assert_eq!(d.size, 2);
        assert_eq!(d.raw, 0x6808);

        let d = decode(&[0x51, 0xf8, 0x04, 0x0c], 0x10_0000).unwrap();
        assert_eq!(d.size, 4);
        assert_eq!(d.raw, 0xf851_0c04);
        assert_eq!(
            d.instr,
            Instr::Mem {
                op: MemOp::Ldr,
                rt: 0,
                rn: 1,
                offset: Offset::Imm(4),
                mode: AddrMode::from_puw(true, false, false),
            }
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let d = decode(&[0x08, 0x68, 0xff, 0xff, 0xff], 0).unwrap();
        assert_eq!(d.size, 2);
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(
            decode(&[], 0),
            Err(DecodeError::Truncated {
                needed: 2,
                available: 0
            })
        );
        assert_eq!(
            decode(&[0x51, 0xf8], 0),
            Err(DecodeError::Truncated {
                needed: 4,
                available: 2
            })
        );
    }
}
