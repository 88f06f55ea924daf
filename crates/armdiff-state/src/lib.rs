//! Machine state model for differential instruction testing.
//!
//! A [`MachineState`] is a complete snapshot of the CPU-visible state that the
//! harness is able to compare: every architectural register, the condition
//! flags as discrete named bits, and a small fixed set of sampled memory
//! windows. It is generic over an [`Arch`] marker so that the harness does not
//! depend on any particular instruction set.
//!
//! ```ignore
//! use armdiff_state::{Arm32, MachineState, RegionRole, RegionSpec, StateLayout};
//!
//! let layout = StateLayout::new(vec![
//!     RegionSpec::new("stack", 0x20_0000, 0x100, RegionRole::Stack),
//!     RegionSpec::new("heap", 0x30_0000, 0x100, RegionRole::Data),
//! ])?;
//! let mut state = MachineState::<Arm32>::new(&layout);
//! state.set_register("r0", 0xdead_beef)?;
//! state.set_flag("c", true)?;
//! ```

mod arch;
mod layout;
mod state;

pub use arch::{Arch, Arm32};
pub use layout::{RegionRole, RegionSpec, StateLayout};
pub use state::{MachineState, MemoryRegion, StateError};
