//! Subject engine: lift-and-evaluate semantics.
//!
//! A [`SemanticsContext`] holds concrete register values, flags as separate
//! fields and a sparse byte memory. [`SemanticsContext::processing`] decodes
//! one [`Instruction`], lifts it to IR and evaluates the IR in place.

use armdiff_ir::{EvalError, Evaluator, Flag, Machine};
use armdiff_isa::{DecodeError, decode, disasm, lift};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum SemanticsError {
    #[error("invalid register index {0}")]
    InvalidRegister(u8),

    #[error("pc {0:#x} is not in Thumb state")]
    ArmState(u32),

    #[error("instruction address {address:#x} does not match pc {pc:#x}")]
    AddressMismatch { address: u32, pc: u32 },

    #[error("cannot decode instruction at {address:#x}: {source}")]
    Decode {
        address: u32,
        #[source]
        source: DecodeError,
    },

    #[error("cannot evaluate instruction at {address:#x}: {source}")]
    Eval {
        address: u32,
        #[source]
        source: EvalError,
    },
}

/// Opcode bytes at an address, filled in by [`SemanticsContext::processing`].
#[derive(Clone, Debug, Default)]
pub struct Instruction {
    opcode: Vec<u8>,
    address: u32,
    size: u8,
    disassembly: String,
}

impl Instruction {
    pub fn new(opcode: &[u8]) -> Self {
        Self {
            opcode: opcode.to_vec(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_address(mut self, address: u32) -> Self {
        self.address = address;
        self
    }

    pub fn opcode(&self) -> &[u8] {
        &self.opcode
    }

    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Bytes consumed by the last `processing` call; 0 before.
    pub const fn size(&self) -> u8 {
        self.size
    }

    pub fn disassembly(&self) -> &str {
        &self.disassembly
    }
}

#[derive(Debug, Default)]
pub struct SemanticsContext {
    regs: [u32; 16],
    flags: [bool; 4],
    thumb: bool,
    memory: FxHashMap<u32, u8>,
    evaluator: Evaluator,
}

impl SemanticsContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`SemanticsError::InvalidRegister`] for indices above 15.
    pub fn register_value(&self, reg: u8) -> Result<u32, SemanticsError> {
        self.regs
            .get(usize::from(reg))
            .copied()
            .ok_or(SemanticsError::InvalidRegister(reg))
    }

    /// Set a register; for PC, bit 0 selects Thumb state and is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticsError::InvalidRegister`] for indices above 15.
    pub fn set_register_value(&mut self, reg: u8, value: u32) -> Result<(), SemanticsError> {
        if reg == 15 {
            self.thumb = value & 1 != 0;
            self.regs[15] = value & !1;
            return Ok(());
        }
        let slot = self
            .regs
            .get_mut(usize::from(reg))
            .ok_or(SemanticsError::InvalidRegister(reg))?;
        *slot = value;
        Ok(())
    }

    pub const fn flag_value(&self, flag: Flag) -> bool {
        self.flags[flag as usize]
    }

    pub const fn set_flag_value(&mut self, flag: Flag, value: bool) {
        self.flags[flag as usize] = value;
    }

    pub const fn is_thumb(&self) -> bool {
        self.thumb
    }

    /// Bytes never written read as zero.
    pub fn memory_area(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let at = addr.wrapping_add(i as u32);
                self.memory.get(&at).copied().unwrap_or(0)
            })
            .collect()
    }

    pub fn set_memory_area(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.memory.insert(addr.wrapping_add(i as u32), b);
        }
    }

    /// Execute one instruction at its address and advance PC.
    ///
    /// On success `inst` carries the decoded size and disassembly.
    ///
    /// # Errors
    ///
    /// Fails if the context is not in Thumb state, the address disagrees
    /// with PC, or the opcode does not decode.
    pub fn processing(&mut self, inst: &mut Instruction) -> Result<(), SemanticsError> {
        let pc = self.regs[15];
        if !self.thumb {
            return Err(SemanticsError::ArmState(pc));
        }
        if inst.address != pc {
            return Err(SemanticsError::AddressMismatch {
                address: inst.address,
                pc,
            });
        }

        let decoded = decode(&inst.opcode, inst.address).map_err(|source| {
            SemanticsError::Decode {
                address: inst.address,
                source,
            }
        })?;
        let ir = lift(&decoded);
        trace!(ir = %ir, "lifted");

        let mut evaluator = std::mem::take(&mut self.evaluator);
        let result = evaluator.execute(&ir, self);
        self.evaluator = evaluator;
        let next = result.map_err(|source| SemanticsError::Eval {
            address: inst.address,
            source,
        })?;

        self.regs[15] = next;
        inst.size = decoded.size;
        inst.disassembly = disasm(&decoded);
        Ok(())
    }
}

impl Machine for SemanticsContext {
    fn reg(&self, idx: u8) -> u32 {
        self.regs[usize::from(idx & 0xf)]
    }

    fn set_reg(&mut self, idx: u8, value: u32) {
        self.regs[usize::from(idx & 0xf)] = value;
    }

    fn flag(&self, flag: Flag) -> bool {
        self.flag_value(flag)
    }

    fn set_flag(&mut self, flag: Flag, value: bool) {
        self.set_flag_value(flag, value);
    }

    fn load(&mut self, addr: u32, width: u8) -> Result<u32, EvalError> {
        let mut buf = [0u8; 4];
        for (i, slot) in buf.iter_mut().take(usize::from(width)).enumerate() {
            *slot = self
                .memory
                .get(&addr.wrapping_add(i as u32))
                .copied()
                .unwrap_or(0);
        }
        Ok(u32::from_le_bytes(buf))
    }

    fn store(&mut self, addr: u32, value: u32, width: u8) -> Result<(), EvalError> {
        let bytes = value.to_le_bytes();
        self.set_memory_area(addr, &bytes[..usize::from(width)]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumb_context(pc: u32) -> SemanticsContext {
        let mut ctx = SemanticsContext::new();
        ctx.set_register_value(15, pc | 1).unwrap();
        ctx
    }

    #[test]
    fn test_post_indexed_store() {
        // str r0, [r1], #0x4
        let mut ctx = thumb_context(0x10_0000);
        ctx.set_register_value(0, 0xdead_beef).unwrap();
        ctx.set_register_value(1, 0x30_0028).unwrap();

        let mut inst = Instruction::new(b"\x41\xf8\x04\x0b").with_address(0x10_0000);
        ctx.processing(&mut inst).unwrap();

        assert_eq!(inst.size(), 4);
        assert_eq!(inst.disassembly(), "str r0, [r1], #0x4");
        assert_eq!(ctx.memory_area(0x30_0028, 4), vec![0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(ctx.register_value(1).unwrap(), 0x30_002c);
        assert_eq!(ctx.register_value(15).unwrap(), 0x10_0004);
    }

    #[test]
    fn test_flags_are_fields() {
        // adds r0, r1, r2 overflowing into carry
        let mut ctx = thumb_context(0x10_0000);
        ctx.set_register_value(1, 0xffff_ffff).unwrap();
        ctx.set_register_value(2, 1).unwrap();
        let mut inst = Instruction::new(b"\x88\x18").with_address(0x10_0000);
        ctx.processing(&mut inst).unwrap();

        assert_eq!(ctx.register_value(0).unwrap(), 0);
        assert!(ctx.flag_value(Flag::Z));
        assert!(ctx.flag_value(Flag::C));
        assert!(!ctx.flag_value(Flag::N));
        assert!(!ctx.flag_value(Flag::V));
    }

    #[test]
    fn test_requires_thumb_state_and_matching_pc() {
        let mut ctx = SemanticsContext::new();
        ctx.set_register_value(15, 0x10_0000).unwrap();
        let mut inst = Instruction::new(b"\x08\x68").with_address(0x10_0000);
        assert!(matches!(
            ctx.processing(&mut inst),
            Err(SemanticsError::ArmState(0x10_0000))
        ));

        let mut ctx = thumb_context(0x10_0000);
        let mut inst = Instruction::new(b"\x08\x68").with_address(0x10_0002);
        assert!(matches!(
            ctx.processing(&mut inst),
            Err(SemanticsError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_opcode() {
        let mut ctx = thumb_context(0x10_0000);
        let mut inst = Instruction::new(b"\x51\xf8").with_address(0x10_0000);
        assert!(matches!(
            ctx.processing(&mut inst),
            Err(SemanticsError::Decode {
                source: DecodeError::Truncated { needed: 4, .. },
                ..
            })
        ));
        assert_eq!(ctx.register_value(15).unwrap(), 0x10_0000);
    }

    #[test]
    fn test_unwritten_memory_reads_zero() {
        let ctx = SemanticsContext::new();
        assert_eq!(ctx.memory_area(0xffff_fffe, 4), vec![0; 4]);
    }
}
