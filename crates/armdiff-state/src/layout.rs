//! Sampled memory window layout.

use crate::state::StateError;

/// How a region is read in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionRole {
    /// Read relative to the stack pointer; byte diffs carry absolute addresses.
    Stack,
    /// Plain data window.
    Data,
}

/// One fixed-size window at a fixed base address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionSpec {
    pub name: String,
    pub base: u64,
    pub size: usize,
    pub role: RegionRole,
}

impl RegionSpec {
    pub fn new(name: impl Into<String>, base: u64, size: usize, role: RegionRole) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            role,
        }
    }

    /// First address past the window.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base + self.size as u64
    }

    const fn overlaps(&self, other: &Self) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

/// Ordered set of windows sampled into every machine state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateLayout {
    regions: Vec<RegionSpec>,
}

impl StateLayout {
    /// Build a layout, rejecting empty, duplicate or overlapping windows.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] naming the offending region.
    pub fn new(regions: Vec<RegionSpec>) -> Result<Self, StateError> {
        for (i, spec) in regions.iter().enumerate() {
            if spec.size == 0 {
                return Err(StateError::EmptyRegion(spec.name.clone()));
            }
            for other in &regions[..i] {
                if other.name == spec.name {
                    return Err(StateError::DuplicateRegion(spec.name.clone()));
                }
                if other.overlaps(spec) {
                    return Err(StateError::OverlappingRegions {
                        first: other.name.clone(),
                        second: spec.name.clone(),
                    });
                }
            }
        }
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[RegionSpec] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&RegionSpec> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// The first region with the stack role, if any.
    pub fn stack(&self) -> Option<&RegionSpec> {
        self.regions.iter().find(|r| r.role == RegionRole::Stack)
    }
}
