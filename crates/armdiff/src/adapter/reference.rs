//! Adapter over the Unicorn CPU emulator.

use std::fmt;

use armdiff_state::{Arch, Arm32, MachineState, StateLayout};
use tracing::trace;
use unicorn_engine::unicorn_const::{Arch as UcArch, Mode, Permission};
use unicorn_engine::{RegisterARM, Unicorn};

use super::{Adapter, ExecError, LoadError, StateError, UcError};
use crate::config::{CODE_BASE, MAP_SIZE};

/// NZCV occupy the top nibble of APSR, N highest.
const NZCV_MASK: u32 = 0xf000_0000;

/// Unicorn register ids in [`Arm32::REGISTERS`] order.
const CORE_REGISTERS: [RegisterARM; 16] = [
    RegisterARM::R0,
    RegisterARM::R1,
    RegisterARM::R2,
    RegisterARM::R3,
    RegisterARM::R4,
    RegisterARM::R5,
    RegisterARM::R6,
    RegisterARM::R7,
    RegisterARM::R8,
    RegisterARM::R9,
    RegisterARM::R10,
    RegisterARM::R11,
    RegisterARM::R12,
    RegisterARM::SP,
    RegisterARM::LR,
    RegisterARM::PC,
];

/// Instructions seen by the code hook since the last reset.
#[derive(Debug, Default)]
struct StepCount {
    retired: usize,
}

type Engine = Unicorn<'static, StepCount>;

/// Every install starts from a new Unicorn instance holding only the code,
/// so stores outside the windows never reach the next entry.
pub struct ReferenceAdapter {
    uc: Option<Engine>,
    code: Vec<u8>,
    layout: StateLayout,
    code_base: u64,
    map_size: usize,
}

impl ReferenceAdapter {
    /// One [`MAP_SIZE`] mapping at [`CODE_BASE`] holds code and windows.
    pub const fn new(layout: StateLayout) -> Self {
        Self {
            uc: None,
            code: Vec::new(),
            layout,
            code_base: CODE_BASE,
            map_size: MAP_SIZE,
        }
    }

    #[must_use]
    pub const fn with_mapping(mut self, base: u64, size: usize) -> Self {
        self.code_base = base;
        self.map_size = size;
        self
    }

    fn fresh_engine(&self) -> Result<Engine, UcError> {
        let mut uc = Unicorn::new_with_data(UcArch::ARM, Mode::THUMB, StepCount::default())
            .map_err(UcError)?;
        uc.mem_map(self.code_base, self.map_size, Permission::ALL)
            .map_err(UcError)?;
        uc.mem_write(self.code_base, &self.code).map_err(UcError)?;
        uc.add_code_hook(1, 0, |uc, _addr, _size| uc.get_data_mut().retired += 1)
            .map_err(UcError)?;
        Ok(uc)
    }

    fn check_window(&self, name: &str, base: u64, size: usize) -> Result<(), StateError> {
        let end = self.code_base + self.map_size as u64;
        if base < self.code_base || base.saturating_add(size as u64) > end {
            return Err(StateError::Unmapped {
                name: name.to_string(),
                base,
                size,
            });
        }
        Ok(())
    }
}

/// Halfwords starting `0b11101`, `0b11110` or `0b11111` open a 32-bit
/// encoding.
const fn thumb_width(first: u16) -> usize {
    if matches!(first >> 11, 0b11101..=0b11111) {
        4
    } else {
        2
    }
}

impl Adapter<Arm32> for ReferenceAdapter {
    fn name(&self) -> &str {
        "reference"
    }

    fn load_code(&mut self, code: &[u8]) -> Result<(), LoadError> {
        if self.uc.is_some() {
            return Err(LoadError::AlreadyLoaded);
        }
        if code.len() > self.map_size {
            return Err(LoadError::TooLarge {
                len: code.len(),
                capacity: self.map_size,
            });
        }
        self.code = code.to_vec();
        self.uc = Some(self.fresh_engine()?);
        Ok(())
    }

    fn install_state(&mut self, state: &MachineState<Arm32>) -> Result<(), StateError> {
        if self.uc.is_none() {
            return Err(StateError::NotLoaded);
        }
        let mut uc = self.fresh_engine()?;

        for region in state.regions() {
            self.check_window(region.name(), region.base(), region.len())?;
            uc.mem_write(region.base(), region.bytes())
                .map_err(UcError)?;
        }

        for (idx, (&reg, &value)) in CORE_REGISTERS.iter().zip(state.registers()).enumerate() {
            let value = if idx == Arm32::PC { value | 1 } else { value };
            uc.reg_write(reg, u64::from(value)).map_err(UcError)?;
        }

        let nzcv = state
            .flags()
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .fold(0u32, |acc, (idx, _)| acc | (1 << (31 - idx)));
        let apsr = Arm32::from_u64(uc.reg_read(RegisterARM::APSR).map_err(UcError)?);
        uc.reg_write(RegisterARM::APSR, u64::from((apsr & !NZCV_MASK) | nzcv))
            .map_err(UcError)?;

        self.uc = Some(uc);
        Ok(())
    }

    fn execute_one(&mut self, entry: u32, max_span: usize) -> Result<(), ExecError> {
        let uc = self.uc.as_mut().ok_or(ExecError::NotLoaded)?;
        let addr = u64::from(entry);

        let mut first = [0u8; 2];
        uc.mem_read(addr, &mut first).map_err(UcError)?;
        if thumb_width(u16::from_le_bytes(first)) > max_span {
            return Err(ExecError::SpanExceeded { addr, max_span });
        }

        uc.get_data_mut().retired = 0;
        let until = addr.saturating_add(max_span as u64);
        uc.emu_start(addr | 1, until, 0, 1).map_err(UcError)?;

        let retired = uc.get_data().retired;
        trace!(entry = %format_args!("{entry:#x}"), retired, "reference step");
        if retired == 1 {
            Ok(())
        } else {
            Err(ExecError::Granularity { retired })
        }
    }

    fn capture_state(&self) -> Result<MachineState<Arm32>, StateError> {
        let uc = self.uc.as_ref().ok_or(StateError::NotLoaded)?;
        let mut state = MachineState::<Arm32>::new(&self.layout);

        for (slot, &reg) in state.registers_mut().iter_mut().zip(&CORE_REGISTERS) {
            *slot = Arm32::from_u64(uc.reg_read(reg).map_err(UcError)?);
        }
        let pc = state.pc();
        state.set_pc(pc & !1);

        let apsr = Arm32::from_u64(uc.reg_read(RegisterARM::APSR).map_err(UcError)?);
        for (idx, flag) in state.flags_mut().iter_mut().enumerate() {
            *flag = (apsr >> (31 - idx)) & 1 != 0;
        }

        for spec in self.layout.regions() {
            self.check_window(&spec.name, spec.base, spec.size)?;
            let mut bytes = vec![0u8; spec.size];
            uc.mem_read(spec.base, &mut bytes).map_err(UcError)?;
            state.set_region_bytes(&spec.name, &bytes)?;
        }
        Ok(state)
    }
}

impl fmt::Debug for ReferenceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceAdapter")
            .field("code_base", &format_args!("{:#x}", self.code_base))
            .field("map_size", &format_args!("{:#x}", self.map_size))
            .field("code_len", &self.code.len())
            .field("loaded", &self.uc.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HEAP_BASE, HarnessConfig, default_layout};

    fn loaded(code: &[u8]) -> ReferenceAdapter {
        let mut adapter = ReferenceAdapter::new(default_layout().unwrap());
        adapter.load_code(code).unwrap();
        adapter
    }

    fn engine(adapter: &ReferenceAdapter) -> &Engine {
        adapter.uc.as_ref().unwrap()
    }

    #[test]
    fn test_install_capture_roundtrip() {
        let mut adapter = loaded(b"\x08\x68");
        let state = HarnessConfig::new().initial_state(3).unwrap();
        adapter.install_state(&state).unwrap();
        assert_eq!(adapter.capture_state().unwrap(), state);
    }

    #[test]
    fn test_flags_land_in_apsr_top_nibble() {
        let mut adapter = loaded(b"\x08\x68");
        let mut state = HarnessConfig::new().initial_state(3).unwrap();
        for (flag, value) in [("n", true), ("z", false), ("c", true), ("v", false)] {
            state.set_flag(flag, value).unwrap();
        }
        adapter.install_state(&state).unwrap();
        let apsr = engine(&adapter).reg_read(RegisterARM::APSR).unwrap();
        assert_eq!(apsr >> 28, 0b1010);
    }

    #[test]
    fn test_pc_carries_thumb_bit_into_engine() {
        let mut adapter = loaded(b"\x08\x68");
        let state = HarnessConfig::new().initial_state(3).unwrap();
        adapter.install_state(&state).unwrap();
        let cpsr = engine(&adapter).reg_read(RegisterARM::CPSR).unwrap();
        assert_ne!(cpsr & 0x20, 0);
        assert_eq!(adapter.capture_state().unwrap().pc() & 1, 0);
    }

    #[test]
    fn test_ldr_retires_one_instruction() {
        let mut adapter = loaded(b"\x08\x68\x08\x68");
        let state = HarnessConfig::new().initial_state(3).unwrap();
        adapter.install_state(&state).unwrap();
        adapter.execute_one(0x10_0000, 6).unwrap();
        let out = adapter.capture_state().unwrap();
        assert_eq!(out.register("r0"), Some(0x2b2a_2928));
        assert_eq!(out.pc(), 0x10_0002);
    }

    #[test]
    fn test_install_discards_stores_outside_windows() {
        // str.w r0, [r1, #0x100]
        let mut adapter = loaded(b"\xc1\xf8\x00\x01");
        let state = HarnessConfig::new().initial_state(3).unwrap();
        adapter.install_state(&state).unwrap();
        adapter.execute_one(0x10_0000, 8).unwrap();

        let stray = HEAP_BASE + 0x128;
        let mut word = [0u8; 4];
        engine(&adapter).mem_read(stray, &mut word).unwrap();
        assert_eq!(word, 0xdead_beef_u32.to_le_bytes());

        adapter.install_state(&state).unwrap();
        engine(&adapter).mem_read(stray, &mut word).unwrap();
        assert_eq!(word, [0; 4]);
        engine(&adapter).mem_read(CODE_BASE, &mut word).unwrap();
        assert_eq!(&word, b"\xc1\xf8\x00\x01");
    }

    #[test]
    fn test_undefined_instruction_faults() {
        // udf #0
        let mut adapter = loaded(b"\x00\xde");
        let state = HarnessConfig::new().initial_state(3).unwrap();
        adapter.install_state(&state).unwrap();
        assert!(matches!(
            adapter.execute_one(0x10_0000, 6),
            Err(ExecError::Unicorn(_))
        ));
    }

    #[test]
    fn test_load_twice_rejected() {
        let mut adapter = loaded(b"\x08\x68");
        assert!(matches!(
            adapter.load_code(b"\x08\x68"),
            Err(LoadError::AlreadyLoaded)
        ));
    }

    #[test]
    fn test_install_before_load() {
        let mut adapter = ReferenceAdapter::new(default_layout().unwrap());
        let state = HarnessConfig::new().initial_state(3).unwrap();
        assert!(matches!(
            adapter.install_state(&state),
            Err(StateError::NotLoaded)
        ));
        assert!(matches!(
            adapter.execute_one(0x10_0000, 6),
            Err(ExecError::NotLoaded)
        ));
    }

    #[test]
    fn test_window_outside_mapping() {
        let mut adapter =
            ReferenceAdapter::new(default_layout().unwrap()).with_mapping(CODE_BASE, 0x1000);
        adapter.load_code(b"\x08\x68").unwrap();
        let state = HarnessConfig::new().initial_state(3).unwrap();
        assert!(matches!(
            adapter.install_state(&state),
            Err(StateError::Unmapped { .. })
        ));
    }

    #[test]
    fn test_span_too_small() {
        // ldr r0, [r1, #-0x4] needs four bytes
        let mut adapter = loaded(b"\x51\xf8\x04\x0c");
        let state = HarnessConfig::new().initial_state(3).unwrap();
        adapter.install_state(&state).unwrap();
        assert!(matches!(
            adapter.execute_one(0x10_0000, 2),
            Err(ExecError::SpanExceeded { max_span: 2, .. })
        ));
        assert_eq!(adapter.capture_state().unwrap(), state);
    }

    #[test]
    fn test_huge_span_saturates() {
        let mut adapter = loaded(b"\x08\x68");
        let state = HarnessConfig::new().initial_state(3).unwrap();
        adapter.install_state(&state).unwrap();
        adapter.execute_one(0x10_0000, usize::MAX).unwrap();
        assert_eq!(adapter.capture_state().unwrap().pc(), 0x10_0002);
    }
}
