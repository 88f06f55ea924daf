//! Harness configuration and the initial machine state.

use armdiff_state::{
    Arch, Arm32, MachineState, RegionRole, RegionSpec, StateError, StateLayout,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::runner::FailureMode;

/// Where the corpus is loaded and the first entry executes.
pub const CODE_BASE: u64 = 0x10_0000;
/// Initial stack pointer and base of the stack window.
pub const STACK_BASE: u64 = 0x20_0000;
/// Base of the heap window.
pub const HEAP_BASE: u64 = 0x30_0000;
/// Size of each sampled memory window.
pub const WINDOW_SIZE: usize = 0x100;
/// Size of the reference engine's single mapping at [`CODE_BASE`].
pub const MAP_SIZE: usize = 5 * 1024 * 1024;
/// Extra bytes past the opcode that a single step may see.
pub const DEFAULT_MARGIN: usize = 4;
/// `r1` starts this far into the heap window.
pub const HEAP_POINTER_OFFSET: u64 = 10 * 4;

pub const HEAP_REGION: &str = "heap";
pub const STACK_REGION: &str = "stack";

/// Registers with a fixed initial value; all others are drawn from the RNG.
const FIXED_REGISTERS: [&str; 4] = ["r0", "r1", "sp", "pc"];

const R0_SENTINEL: u32 = 0xdead_beef;

/// Heap then stack, each [`WINDOW_SIZE`] bytes.
///
/// # Errors
///
/// Never fails for the built-in constants; the `Result` comes from
/// [`StateLayout::new`].
pub fn default_layout() -> Result<StateLayout, StateError> {
    StateLayout::new(vec![
        RegionSpec::new(HEAP_REGION, HEAP_BASE, WINDOW_SIZE, RegionRole::Data),
        RegionSpec::new(STACK_REGION, STACK_BASE, WINDOW_SIZE, RegionRole::Stack),
    ])
}

/// Knobs for one differential run.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    seed: Option<u64>,
    margin: usize,
    failure_mode: FailureMode,
    filter: Option<String>,
    layout: Option<StateLayout>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: None,
            margin: DEFAULT_MARGIN,
            failure_mode: FailureMode::default(),
            filter: None,
            layout: None,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn with_margin(mut self, margin: usize) -> Self {
        self.margin = margin;
        self
    }

    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Only run entries whose mnemonic contains `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: StateLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub const fn margin(&self) -> usize {
        self.margin
    }

    pub const fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// The configured layout, or [`default_layout`].
    ///
    /// # Errors
    ///
    /// Propagates layout validation errors.
    pub fn layout(&self) -> Result<StateLayout, StateError> {
        match &self.layout {
            Some(layout) => Ok(layout.clone()),
            None => default_layout(),
        }
    }

    /// The configured seed, or a fresh one.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Build the run's initial state template from `seed`.
    ///
    /// `r0` holds a sentinel, `r1` points into the first data window, SP is
    /// the stack window base and PC is [`CODE_BASE`]. Every other register
    /// and all flags are random. Stack windows hold `255 - i` at offset `i`,
    /// data windows hold `i`.
    ///
    /// # Errors
    ///
    /// Propagates layout validation errors.
    pub fn initial_state(&self, seed: u64) -> Result<MachineState<Arm32>, StateError> {
        let layout = self.layout()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = MachineState::<Arm32>::new(&layout);

        for name in Arm32::REGISTERS {
            if !FIXED_REGISTERS.contains(name) {
                state.set_register(name, rng.random())?;
            }
        }
        for name in Arm32::FLAGS {
            state.set_flag(name, rng.random())?;
        }

        let heap_base = layout
            .regions()
            .iter()
            .find(|spec| spec.role == RegionRole::Data)
            .map_or(HEAP_BASE, |spec| spec.base);
        let stack_base = layout.stack().map_or(STACK_BASE, |spec| spec.base);

        state.set_register("r0", R0_SENTINEL)?;
        state.set_register("r1", Arm32::from_u64(heap_base + HEAP_POINTER_OFFSET))?;
        state.set_sp(Arm32::from_u64(stack_base));
        state.set_pc(Arm32::from_u64(CODE_BASE));

        for spec in layout.regions() {
            state.set_region_bytes(&spec.name, &sentinel(spec))?;
        }
        Ok(state)
    }
}

fn sentinel(spec: &RegionSpec) -> Vec<u8> {
    (0..spec.size)
        .map(|i| {
            let low = (i % 256) as u8;
            match spec.role {
                RegionRole::Stack => 255 - low,
                RegionRole::Data => low,
            }
        })
        .collect()
}
