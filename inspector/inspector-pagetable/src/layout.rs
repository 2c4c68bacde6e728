//! # Translation Table Layout
//!
//! The level shifts of the mirrored table tree as one configuration value.
//! Everything the walker knows about the address arithmetic — which bits of a
//! virtual address index which level, and how large a fully-absent region at
//! each level is — derives from a [`TableLayout`], so an alternate layout
//! (e.g. a 5-level tree) only needs a different set of shifts, not different
//! walker logic.

use inspector_addresses::VirtualAddress;

/// Number of slots in every table, at every level.
pub const SLOT_COUNT: usize = 512;

/// Mask selecting one 9-bit index field (`SLOT_COUNT - 1`).
const INDEX_MASK: u64 = SLOT_COUNT as u64 - 1;

/// Index into a 512-slot table (`0..512`).
///
/// Strongly typed to keep raw `usize` arithmetic out of table lookups. Range
/// is checked in debug builds; values produced by [`TableLayout`] index
/// derivation are always in range by construction.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SlotIndex(u16);

impl SlotIndex {
    /// Construct from a raw value.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 512` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < SLOT_COUNT);
        Self(v)
    }

    /// Return the index as `usize` for table access.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// The four per-level bit shifts of a 4-level translation tree.
///
/// For the x86-64 4 KiB layout these are 39/30/21/12: bits `[39,48)` of a
/// virtual address select the directory slot, `[30,39)` the upper-table slot,
/// `[21,30)` the mid-table slot and `[12,21)` the leaf slot, with the low 12
/// bits being the in-page offset.
///
/// ### Invariants
/// - `leaf_shift < mid_shift < upper_shift < top_shift` (debug-asserted).
/// - Index derivation always produces values in `[0, 512)`; the 9-bit field
///   width is fixed by [`SLOT_COUNT`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TableLayout {
    top_shift: u32,
    upper_shift: u32,
    mid_shift: u32,
    leaf_shift: u32,
}

impl TableLayout {
    /// The x86-64 4-level, 48-bit, 4 KiB-page layout.
    pub const X86_64_4LEVEL: Self = Self::new(39, 30, 21, 12);

    /// Construct from explicit shifts (e.g. as reported by the kernel).
    #[inline]
    #[must_use]
    pub const fn new(top_shift: u32, upper_shift: u32, mid_shift: u32, leaf_shift: u32) -> Self {
        debug_assert!(leaf_shift < mid_shift);
        debug_assert!(mid_shift < upper_shift);
        debug_assert!(upper_shift < top_shift);
        debug_assert!(top_shift < u64::BITS);
        Self {
            top_shift,
            upper_shift,
            mid_shift,
            leaf_shift,
        }
    }

    #[inline]
    const fn index(va: VirtualAddress, shift: u32) -> SlotIndex {
        SlotIndex::new(((va.as_u64() >> shift) & INDEX_MASK) as u16)
    }

    /// Directory-level slot index for `va`.
    #[inline]
    #[must_use]
    pub const fn top_index(&self, va: VirtualAddress) -> SlotIndex {
        Self::index(va, self.top_shift)
    }

    /// Upper-table slot index for `va`.
    #[inline]
    #[must_use]
    pub const fn upper_index(&self, va: VirtualAddress) -> SlotIndex {
        Self::index(va, self.upper_shift)
    }

    /// Mid-table slot index for `va`.
    #[inline]
    #[must_use]
    pub const fn mid_index(&self, va: VirtualAddress) -> SlotIndex {
        Self::index(va, self.mid_shift)
    }

    /// Leaf-table slot index for `va`.
    #[inline]
    #[must_use]
    pub const fn leaf_index(&self, va: VirtualAddress) -> SlotIndex {
        Self::index(va, self.leaf_shift)
    }

    /// Bytes covered by one directory slot (2³⁹ for x86-64).
    #[inline]
    #[must_use]
    pub const fn top_span(&self) -> u64 {
        1 << self.top_shift
    }

    /// Bytes covered by one upper-table slot (2³⁰ for x86-64).
    #[inline]
    #[must_use]
    pub const fn upper_span(&self) -> u64 {
        1 << self.upper_shift
    }

    /// Bytes covered by one mid-table slot (2²¹ for x86-64).
    #[inline]
    #[must_use]
    pub const fn mid_span(&self) -> u64 {
        1 << self.mid_shift
    }

    /// Bytes covered by one leaf entry — the page size (2¹² for x86-64).
    #[inline]
    #[must_use]
    pub const fn page_span(&self) -> u64 {
        1 << self.leaf_shift
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::X86_64_4LEVEL
    }
}
