//! Adapter over the lift-and-evaluate [`SemanticsContext`].

use armdiff_ir::Flag;
use armdiff_isa::DecodeError;
use armdiff_state::{Arch, Arm32, MachineState, StateLayout};
use tracing::trace;

use super::{Adapter, ExecError, LoadError, StateError};
use crate::config::CODE_BASE;
use crate::engine::{Instruction, SemanticsContext, SemanticsError};

/// Highest address + 1 the subject's 32-bit memory can hold.
const ADDRESS_SPACE: u64 = 1 << 32;

/// Longest Thumb encoding; the fetch never reads past it.
const MAX_INSTRUCTION_BYTES: usize = 4;

/// Every install starts from an empty context holding only the code.
#[derive(Debug)]
pub struct SubjectAdapter {
    ctx: SemanticsContext,
    code: Vec<u8>,
    layout: StateLayout,
    code_base: u64,
    loaded: bool,
}

impl SubjectAdapter {
    pub fn new(layout: StateLayout) -> Self {
        Self {
            ctx: SemanticsContext::new(),
            code: Vec::new(),
            layout,
            code_base: CODE_BASE,
            loaded: false,
        }
    }

    fn flag(idx: usize) -> Result<Flag, StateError> {
        u32::try_from(idx)
            .ok()
            .and_then(Flag::from_index)
            .ok_or_else(|| {
                armdiff_state::StateError::UnknownFlag(idx.to_string()).into()
            })
    }

    fn window(name: &str, base: u64, size: usize) -> Result<u32, StateError> {
        if base + size as u64 > ADDRESS_SPACE {
            return Err(StateError::Unmapped {
                name: name.to_string(),
                base,
                size,
            });
        }
        Ok(Arm32::from_u64(base))
    }
}

impl Adapter<Arm32> for SubjectAdapter {
    fn name(&self) -> &str {
        "subject"
    }

    fn load_code(&mut self, code: &[u8]) -> Result<(), LoadError> {
        if self.loaded {
            return Err(LoadError::AlreadyLoaded);
        }
        let capacity = usize::try_from(ADDRESS_SPACE.saturating_sub(self.code_base))
            .unwrap_or(usize::MAX);
        if code.len() > capacity {
            return Err(LoadError::TooLarge {
                len: code.len(),
                capacity,
            });
        }
        self.code = code.to_vec();
        self.ctx
            .set_memory_area(Arm32::from_u64(self.code_base), &self.code);
        self.loaded = true;
        Ok(())
    }

    fn install_state(&mut self, state: &MachineState<Arm32>) -> Result<(), StateError> {
        if !self.loaded {
            return Err(StateError::NotLoaded);
        }
        self.ctx = SemanticsContext::new();
        self.ctx
            .set_memory_area(Arm32::from_u64(self.code_base), &self.code);

        for region in state.regions() {
            let base = Self::window(region.name(), region.base(), region.len())?;
            self.ctx.set_memory_area(base, region.bytes());
        }

        for (idx, &value) in state.registers().iter().enumerate() {
            let value = if idx == Arm32::PC { value | 1 } else { value };
            self.ctx.set_register_value(idx as u8, value)?;
        }

        for (idx, &value) in state.flags().iter().enumerate() {
            self.ctx.set_flag_value(Self::flag(idx)?, value);
        }
        Ok(())
    }

    fn execute_one(&mut self, entry: u32, max_span: usize) -> Result<(), ExecError> {
        let span_exceeded = || ExecError::SpanExceeded {
            addr: u64::from(entry),
            max_span,
        };

        let fetch = max_span.min(MAX_INSTRUCTION_BYTES);
        let opcode = self.ctx.memory_area(entry, fetch);
        let mut inst = Instruction::new(&opcode).with_address(entry);
        match self.ctx.processing(&mut inst) {
            Ok(()) => {}
            Err(SemanticsError::Decode {
                source: DecodeError::Truncated { .. },
                ..
            }) => return Err(span_exceeded()),
            Err(err) => return Err(err.into()),
        }
        if usize::from(inst.size()) > max_span {
            return Err(span_exceeded());
        }
        trace!(disasm = inst.disassembly(), size = inst.size(), "subject step");
        Ok(())
    }

    fn capture_state(&self) -> Result<MachineState<Arm32>, StateError> {
        let mut state = MachineState::<Arm32>::new(&self.layout);

        for (idx, slot) in state.registers_mut().iter_mut().enumerate() {
            *slot = self.ctx.register_value(idx as u8)?;
        }
        let pc = state.pc();
        state.set_pc(pc & !1);

        for (idx, slot) in state.flags_mut().iter_mut().enumerate() {
            *slot = self.ctx.flag_value(Self::flag(idx)?);
        }

        for spec in self.layout.regions() {
            let base = Self::window(&spec.name, spec.base, spec.size)?;
            let bytes = self.ctx.memory_area(base, spec.size);
            state.set_region_bytes(&spec.name, &bytes)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HarnessConfig, default_layout};

    fn installed(code: &[u8], seed: u64) -> SubjectAdapter {
        let mut adapter = SubjectAdapter::new(default_layout().unwrap());
        adapter.load_code(code).unwrap();
        let state = HarnessConfig::new().initial_state(seed).unwrap();
        adapter.install_state(&state).unwrap();
        adapter
    }

    #[test]
    fn test_install_capture_roundtrip() {
        let adapter = installed(b"\x08\x68", 11);
        let expected = HarnessConfig::new().initial_state(11).unwrap();
        assert_eq!(adapter.capture_state().unwrap(), expected);
        assert!(adapter.ctx.is_thumb());
    }

    #[test]
    fn test_ldr_reads_heap_window() {
        // ldr r0, [r1]
        let mut adapter = installed(b"\x08\x68", 11);
        adapter.execute_one(0x10_0000, 6).unwrap();
        let after = adapter.capture_state().unwrap();
        assert_eq!(after.register("r0"), Some(0x2b2a_2928));
        assert_eq!(after.pc(), 0x10_0002);
    }

    #[test]
    fn test_span_too_small() {
        let mut adapter = installed(b"\x51\xf8\x04\x0c", 11);
        assert!(matches!(
            adapter.execute_one(0x10_0000, 2),
            Err(ExecError::SpanExceeded { max_span: 2, .. })
        ));
    }

    #[test]
    fn test_install_discards_stores_outside_windows() {
        // str.w r0, [r1, #0x100]
        let mut adapter = installed(b"\xc1\xf8\x00\x01", 11);
        adapter.execute_one(0x10_0000, 8).unwrap();
        let stray = Arm32::from_u64(crate::config::HEAP_BASE + 0x128);
        assert_eq!(adapter.ctx.memory_area(stray, 4), 0xdead_beef_u32.to_le_bytes());

        let state = HarnessConfig::new().initial_state(11).unwrap();
        adapter.install_state(&state).unwrap();
        assert_eq!(adapter.ctx.memory_area(stray, 4), vec![0; 4]);
        assert_eq!(adapter.ctx.memory_area(0x10_0000, 4), b"\xc1\xf8\x00\x01");
    }

    #[test]
    fn test_huge_span_fetches_one_instruction() {
        let mut adapter = installed(b"\x08\x68", 11);
        adapter.execute_one(0x10_0000, usize::MAX).unwrap();
        assert_eq!(adapter.capture_state().unwrap().pc(), 0x10_0002);
    }

    #[test]
    fn test_window_past_address_space() {
        let layout = StateLayout::new(vec![armdiff_state::RegionSpec::new(
            "high",
            0xffff_ff80,
            0x100,
            armdiff_state::RegionRole::Data,
        )])
        .unwrap();
        let mut adapter = SubjectAdapter::new(layout.clone());
        adapter.load_code(b"\x08\x68").unwrap();
        let state = MachineState::<Arm32>::new(&layout);
        assert!(matches!(
            adapter.install_state(&state),
            Err(StateError::Unmapped { .. })
        ));
    }
}
