//! State comparison and mismatch diagnosis.
//!
//! Equality is decided structurally by [`MachineState`]'s `PartialEq`;
//! [`compare_states`] only produces the field-level breakdown.

use std::fmt;

use armdiff_state::{Arch, MachineState, RegionRole};

/// What kind of field a failure headline is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// A memory window differs.
    Region,
    /// A register differs.
    Register,
    /// A status flag differs.
    Flag,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region => write!(f, "memory mismatch"),
            Self::Register => write!(f, "register mismatch"),
            Self::Flag => write!(f, "flag mismatch"),
        }
    }
}

/// A named scalar field whose values disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff<T> {
    pub name: &'static str,
    pub reference: T,
    pub subject: T,
}

/// A memory window whose bytes disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDiff {
    pub name: String,
    pub role: RegionRole,
}

/// Every disagreeing field between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDiff<W> {
    pub regions: Vec<RegionDiff>,
    pub registers: Vec<FieldDiff<W>>,
    pub flags: Vec<FieldDiff<bool>>,
}

impl<W> StateDiff<W> {
    /// Regions outrank registers, which outrank flags.
    pub fn first_kind(&self) -> Option<DiffKind> {
        if !self.regions.is_empty() {
            Some(DiffKind::Region)
        } else if !self.registers.is_empty() {
            Some(DiffKind::Register)
        } else if !self.flags.is_empty() {
            Some(DiffKind::Flag)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_kind().is_none()
    }

    /// Names of every differing field, regions first.
    pub fn field_names(&self) -> Vec<&str> {
        self.regions
            .iter()
            .map(|r| r.name.as_str())
            .chain(self.registers.iter().map(|r| r.name))
            .chain(self.flags.iter().map(|f| f.name))
            .collect()
    }
}

/// Compare two output states. `None` iff they are structurally equal.
///
/// Both states must come from the same layout; regions are matched by
/// position.
pub fn compare_states<A: Arch>(
    reference: &MachineState<A>,
    subject: &MachineState<A>,
) -> Option<StateDiff<A::Word>> {
    if reference == subject {
        return None;
    }

    let regions = reference
        .regions()
        .iter()
        .zip(subject.regions())
        .filter(|(r, s)| r.bytes() != s.bytes() || r.base() != s.base())
        .map(|(r, _)| RegionDiff {
            name: r.name().to_string(),
            role: r.role(),
        })
        .collect();

    let registers = reference
        .named_registers()
        .zip(subject.named_registers())
        .filter(|((_, r), (_, s))| r != s)
        .map(|((name, r), (_, s))| FieldDiff {
            name,
            reference: r,
            subject: s,
        })
        .collect();

    let flags = reference
        .named_flags()
        .zip(subject.named_flags())
        .filter(|((_, r), (_, s))| r != s)
        .map(|((name, r), (_, s))| FieldDiff {
            name,
            reference: r,
            subject: s,
        })
        .collect();

    Some(StateDiff {
        regions,
        registers,
        flags,
    })
}

/// One byte where an engine changed memory, or the engines disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteDiff {
    pub offset: usize,
    /// Absolute address, when annotation was requested.
    pub address: Option<u64>,
    pub input: u8,
    pub reference: u8,
    pub subject: u8,
}

/// Triples at every offset where either output differs from the input.
///
/// With `annotate = Some(base)` each triple carries `base + offset`; stack
/// windows are annotated from the initial SP.
pub fn byte_diff(
    input: &[u8],
    reference: &[u8],
    subject: &[u8],
    annotate: Option<u64>,
) -> Vec<ByteDiff> {
    input
        .iter()
        .zip(reference)
        .zip(subject)
        .enumerate()
        .filter(|(_, ((i, r), s))| i != r || i != s)
        .map(|(offset, ((&input, &reference), &subject))| ByteDiff {
            offset,
            address: annotate.map(|base| base.wrapping_add(offset as u64)),
            input,
            reference,
            subject,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HEAP_REGION, HarnessConfig};
    use armdiff_state::Arm32;

    fn template() -> MachineState<Arm32> {
        HarnessConfig::new().initial_state(5).unwrap()
    }

    #[test]
    fn test_equal_states() {
        let state = template();
        assert!(compare_states(&state, &state.clone()).is_none());
    }

    #[test]
    fn test_symmetric_verdict() {
        let a = template();
        let mut b = a.clone();
        b.set_register("r7", 1).unwrap();
        b.set_flag("c", !a.flag("c").unwrap()).unwrap();

        let ab = compare_states(&a, &b).unwrap();
        let ba = compare_states(&b, &a).unwrap();
        assert_eq!(ab.field_names(), ba.field_names());
        assert_eq!(ab.registers[0].reference, ba.registers[0].subject);
        assert_eq!(ab.first_kind(), Some(DiffKind::Register));
    }

    #[test]
    fn test_region_outranks_registers() {
        let a = template();
        let mut b = a.clone();
        b.set_register("r0", 0).unwrap();
        b.region_mut(HEAP_REGION).unwrap().bytes_mut()[3] ^= 0xff;

        let diff = compare_states(&a, &b).unwrap();
        assert_eq!(diff.first_kind(), Some(DiffKind::Region));
        assert_eq!(diff.regions[0].name, HEAP_REGION);
        assert_eq!(diff.field_names(), vec!["heap", "r0"]);
    }

    #[test]
    fn test_flag_only() {
        let a = template();
        let mut b = a.clone();
        b.set_flag("v", !a.flag("v").unwrap()).unwrap();
        let diff = compare_states(&a, &b).unwrap();
        assert_eq!(diff.first_kind(), Some(DiffKind::Flag));
        assert_eq!(diff.flags[0].name, "v");
    }

    #[test]
    fn test_byte_diff_annotates() {
        let input = [0xff, 0xfe, 0xfd, 0xfc];
        let reference = [0xff, 0x00, 0xfd, 0xfc];
        let subject = [0xff, 0xfe, 0xfd, 0x11];

        let diffs = byte_diff(&input, &reference, &subject, Some(0x20_0000));
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].offset, 1);
        assert_eq!(diffs[0].address, Some(0x20_0001));
        assert_eq!((diffs[1].input, diffs[1].reference, diffs[1].subject), (0xfc, 0xfc, 0x11));

        assert!(byte_diff(&input, &reference, &subject, None)
            .iter()
            .all(|d| d.address.is_none()));
    }
}
