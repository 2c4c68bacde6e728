//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses used by the page-table
//! snapshot and the translation walker.
//!
//! ## Overview
//!
//! The crate defines a minimal set of zero-cost `u64` newtypes that prevent
//! mixing virtual and physical addresses at compile time:
//!
//! | Type | Meaning |
//! |---|---|
//! | [`MemoryAddress`] | A raw 64-bit address, either physical or virtual. |
//! | [`VirtualAddress`] | An address in the *inspected* process's address space. |
//! | [`PhysicalAddress`] | A machine address decoded from a leaf translation entry. |
//!
//! ## Design Notes
//!
//! - All types are `#[repr(transparent)]` and `Copy`; every operation is a
//!   `const fn` and zero-cost in release builds.
//! - Alignment helpers take the alignment explicitly; the snapshot layout
//!   decides what a "page" is, not this crate.
//! - A [`VirtualAddress`] here always refers to the *foreign* address space
//!   being inspected. Nothing in this workspace ever dereferences one.

#![cfg_attr(not(any(test, doctest)), no_std)]

use core::fmt;
use core::ops::{Add, AddAssign};

/// Principal raw memory address ([virtual](VirtualAddress) or [physical](PhysicalAddress)).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryAddress(u64);

impl MemoryAddress {
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Align down to a power-of-two boundary `align`.
    ///
    /// For non power-of-two `align` the result is meaningless; no runtime
    /// check is performed.
    #[inline]
    #[must_use]
    pub const fn align_down(self, align: u64) -> Self {
        Self(self.0 & !(align - 1))
    }

    /// The offset of this address within its `align`-sized region.
    #[inline]
    #[must_use]
    pub const fn offset_in(self, align: u64) -> u64 {
        self.0 & (align - 1)
    }

    /// `true` if the low bits below `align` are all zero.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, align: u64) -> bool {
        self.offset_in(align) == 0
    }
}

impl fmt::Debug for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryAddress(0x{:016x})", self.0)
    }
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Add<u64> for MemoryAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for MemoryAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl From<u64> for MemoryAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<MemoryAddress> for u64 {
    #[inline]
    fn from(a: MemoryAddress) -> Self {
        a.as_u64()
    }
}

/// Virtual memory address in the inspected process's address space.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **virtual** addresses.
/// It does not validate canonicality at runtime; only the low 48 bits are
/// architecturally significant for the 4-level layout, and the translation
/// layer derives its table indices exclusively from those.
///
/// ### Invariants
/// - No invariant beyond "this is intended to be a virtual address".
/// - Alignment is only guaranteed for values returned from
///   [`align_down`](Self::align_down).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(MemoryAddress);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn as_addr(self) -> MemoryAddress {
        self.0
    }

    /// Align down to a power-of-two boundary `align`.
    #[inline]
    #[must_use]
    pub const fn align_down(self, align: u64) -> Self {
        Self(self.0.align_down(align))
    }

    /// The offset of this address within its `align`-sized region.
    #[inline]
    #[must_use]
    pub const fn offset_in(self, align: u64) -> u64 {
        self.0.offset_in(align)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016x})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

/// Physical memory address decoded from a leaf translation entry.
///
/// Like [`VirtualAddress`], this type carries intent and prevents accidental
/// VA/PA mix-ups. Leaf entries store a **page-aligned** physical base; values
/// produced by the translation layer always have their low offset bits clear.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(MemoryAddress);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn as_addr(self) -> MemoryAddress {
        self.0
    }

    /// `true` if the low bits below `align` are all zero.
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, align: u64) -> bool {
        self.0.is_aligned(align)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016x})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_helpers() {
        let a = MemoryAddress::new(0x12345);
        assert_eq!(a.align_down(4096).as_u64(), 0x12000);
        assert_eq!(a.offset_in(4096), 0x345);
        assert!(!a.is_aligned(4096));
        assert!(a.align_down(4096).is_aligned(4096));
    }

    #[test]
    fn virtual_vs_physical_wrappers() {
        let va = VirtualAddress::new(0x7fff_8000_1234);
        assert_eq!(va.align_down(4096).as_u64(), 0x7fff_8000_1000);
        assert_eq!(va.offset_in(4096), 0x234);

        let pa = PhysicalAddress::new(0x10_2000_0000);
        assert!(pa.is_aligned(4096));
        assert_eq!((pa + 0x42).as_u64(), 0x10_2000_0042);
    }

    #[test]
    fn add_assign_advances() {
        let mut va = VirtualAddress::new(0x1000);
        va += 1 << 12;
        assert_eq!(va.as_u64(), 0x2000);
    }

    #[test]
    fn display_is_unpadded_hex() {
        assert_eq!(VirtualAddress::new(0x1000).to_string(), "0x1000");
        assert_eq!(PhysicalAddress::zero().to_string(), "0x0");
    }
}
