//! Machine state snapshots.

use std::marker::PhantomData;

use thiserror::Error;

use crate::arch::Arch;
use crate::layout::{RegionRole, StateLayout};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown register: {0}")]
    UnknownRegister(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("unknown memory region: {0}")]
    UnknownRegion(String),

    #[error("region {name}: expected {expected} bytes, got {actual}")]
    RegionSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("region {0} is empty")]
    EmptyRegion(String),

    #[error("region {0} is declared twice")]
    DuplicateRegion(String),

    #[error("regions {first} and {second} overlap")]
    OverlappingRegions { first: String, second: String },
}

/// Bytes of one sampled window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    name: String,
    base: u64,
    role: RegionRole,
    bytes: Vec<u8>,
}

impl MemoryRegion {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn base(&self) -> u64 {
        self.base
    }

    pub const fn role(&self) -> RegionRole {
        self.role
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes at absolute address `addr`, if the range is inside the window.
    pub fn read(&self, addr: u64, len: usize) -> Option<&[u8]> {
        let off = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        self.bytes.get(off..off.checked_add(len)?)
    }

    /// Little-endian 32-bit word at absolute address `addr`.
    pub fn read_u32(&self, addr: u64) -> Option<u32> {
        let bytes = self.read(addr, 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Snapshot of registers, flags and sampled memory.
///
/// Two states are equal exactly when every register, every flag and every
/// byte of every window are equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineState<A: Arch> {
    registers: Vec<A::Word>,
    flags: Vec<bool>,
    regions: Vec<MemoryRegion>,
    _arch: PhantomData<A>,
}

impl<A: Arch> MachineState<A> {
    /// A zeroed state shaped by `layout`.
    pub fn new(layout: &StateLayout) -> Self {
        let regions = layout
            .regions()
            .iter()
            .map(|spec| MemoryRegion {
                name: spec.name.clone(),
                base: spec.base,
                role: spec.role,
                bytes: vec![0; spec.size],
            })
            .collect();
        Self {
            registers: vec![A::Word::default(); A::REGISTERS.len()],
            flags: vec![false; A::FLAGS.len()],
            regions,
            _arch: PhantomData,
        }
    }

    /// A zeroed state with the same layout as this one.
    pub fn blank_like(&self) -> Self {
        let mut blank = self.clone();
        blank.registers.fill(A::Word::default());
        blank.flags.fill(false);
        for region in &mut blank.regions {
            region.bytes.fill(0);
        }
        blank
    }

    pub fn registers(&self) -> &[A::Word] {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut [A::Word] {
        &mut self.registers
    }

    /// `(name, value)` pairs in state order.
    pub fn named_registers(&self) -> impl Iterator<Item = (&'static str, A::Word)> + '_ {
        A::REGISTERS.iter().copied().zip(self.registers.iter().copied())
    }

    pub fn register(&self, name: &str) -> Option<A::Word> {
        A::register_index(name).map(|i| self.registers[i])
    }

    /// # Errors
    ///
    /// Returns [`StateError::UnknownRegister`] for names outside the register file.
    pub fn set_register(&mut self, name: &str, value: A::Word) -> Result<(), StateError> {
        let idx =
            A::register_index(name).ok_or_else(|| StateError::UnknownRegister(name.into()))?;
        self.registers[idx] = value;
        Ok(())
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut [bool] {
        &mut self.flags
    }

    pub fn named_flags(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        A::FLAGS.iter().copied().zip(self.flags.iter().copied())
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        A::flag_index(name).map(|i| self.flags[i])
    }

    /// # Errors
    ///
    /// Returns [`StateError::UnknownFlag`] for names outside the flag set.
    pub fn set_flag(&mut self, name: &str, value: bool) -> Result<(), StateError> {
        let idx = A::flag_index(name).ok_or_else(|| StateError::UnknownFlag(name.into()))?;
        self.flags[idx] = value;
        Ok(())
    }

    #[inline]
    pub fn pc(&self) -> A::Word {
        self.registers[A::PC]
    }

    #[inline]
    pub fn set_pc(&mut self, pc: A::Word) {
        self.registers[A::PC] = pc;
    }

    #[inline]
    pub fn sp(&self) -> A::Word {
        self.registers[A::SP]
    }

    #[inline]
    pub fn set_sp(&mut self, sp: A::Word) {
        self.registers[A::SP] = sp;
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut MemoryRegion> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    /// Replace a window's bytes wholesale.
    ///
    /// # Errors
    ///
    /// Fails if the region is unknown or `bytes` has the wrong length.
    pub fn set_region_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), StateError> {
        let region = self
            .region_mut(name)
            .ok_or_else(|| StateError::UnknownRegion(name.into()))?;
        if region.bytes.len() != bytes.len() {
            return Err(StateError::RegionSize {
                name: name.into(),
                expected: region.bytes.len(),
                actual: bytes.len(),
            });
        }
        region.bytes.copy_from_slice(bytes);
        Ok(())
    }
}
