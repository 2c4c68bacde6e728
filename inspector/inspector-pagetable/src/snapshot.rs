//! # Snapshot Arena
//!
//! The in-memory form of a mirrored page table: one directory table plus
//! three arenas of 512-slot tables, one arena per subordinate level. Non-leaf
//! slots hold `Option<Id>` into the next level's arena — "absent" is a
//! discriminated case, not a sentinel zero — and leaf slots hold the raw
//! 64-bit translation entries.
//!
//! A [`Snapshot`] is built once (by [`SnapshotBuilder`] or by ingesting a
//! captured mirror) and is immutable afterwards; every accessor takes `&self`
//! and walking never mutates it.

use alloc::boxed::Box;
use alloc::vec::Vec;

use inspector_addresses::VirtualAddress;

use crate::layout::{SLOT_COUNT, SlotIndex, TableLayout};
use crate::leaf_entry::LeafEntryBits;
use crate::walk::Walk;

/// Index of an upper-level table in its snapshot's arena.
///
/// Ids are only meaningful for the snapshot that produced them; looking up a
/// foreign id panics on out-of-range access.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct UpperTableId(usize);

/// Index of a mid-level table in its snapshot's arena.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MidTableId(usize);

/// Index of a leaf table in its snapshot's arena.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct LeafTableId(usize);

impl UpperTableId {
    #[inline]
    #[must_use]
    pub const fn new(i: usize) -> Self {
        Self(i)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl MidTableId {
    #[inline]
    #[must_use]
    pub const fn new(i: usize) -> Self {
        Self(i)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl LeafTableId {
    #[inline]
    #[must_use]
    pub const fn new(i: usize) -> Self {
        Self(i)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

/// A non-leaf table: 512 slots, each either absent or pointing at a
/// next-level table by id.
pub struct PointerTable<Id> {
    slots: Box<[Option<Id>; SLOT_COUNT]>,
}

impl<Id: Copy> PointerTable<Id> {
    /// A table with every slot absent.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            slots: Box::new([None; SLOT_COUNT]),
        }
    }

    /// Read the slot at `i`. `None` means nothing is mapped below it.
    #[inline]
    #[must_use]
    pub fn get(&self, i: SlotIndex) -> Option<Id> {
        self.slots[i.as_usize()]
    }

    /// Point the slot at `i` to the table `id`.
    #[inline]
    pub fn set(&mut self, i: SlotIndex, id: Id) {
        self.slots[i.as_usize()] = Some(id);
    }

    fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.slots.iter().flatten().copied()
    }
}

impl<Id: Copy> Default for PointerTable<Id> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A leaf table: 512 raw 64-bit translation entries.
///
/// A zero entry has its present bit clear and therefore translates nothing;
/// the walker treats "zero slot" and "present bit unset" identically.
pub struct LeafTable {
    slots: Box<[LeafEntryBits; SLOT_COUNT]>,
}

impl LeafTable {
    /// A table with every entry zero (non-present).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            slots: Box::new([LeafEntryBits::new(); SLOT_COUNT]),
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub fn get(&self, i: SlotIndex) -> LeafEntryBits {
        self.slots[i.as_usize()]
    }

    /// Write the entry at `i`.
    #[inline]
    pub fn set(&mut self, i: SlotIndex, e: LeafEntryBits) {
        self.slots[i.as_usize()] = e;
    }
}

impl Default for LeafTable {
    fn default() -> Self {
        Self::empty()
    }
}

/// A point-in-time mirror of one process's translation tree.
///
/// ### Invariants
/// - Every id stored in a table refers into the next level's arena
///   (debug-asserted at construction).
/// - All tables have exactly [`SLOT_COUNT`] slots, by type.
/// - Read-only: nothing in this crate mutates a built snapshot.
pub struct Snapshot {
    layout: TableLayout,
    directory: PointerTable<UpperTableId>,
    upper: Vec<PointerTable<MidTableId>>,
    mid: Vec<PointerTable<LeafTableId>>,
    leaf: Vec<LeafTable>,
}

impl Snapshot {
    /// Assemble a snapshot from a directory and the three level arenas.
    ///
    /// ### Debug assertions
    /// - Every stored id must index into the next level's arena.
    #[must_use]
    pub fn from_parts(
        layout: TableLayout,
        directory: PointerTable<UpperTableId>,
        upper: Vec<PointerTable<MidTableId>>,
        mid: Vec<PointerTable<LeafTableId>>,
        leaf: Vec<LeafTable>,
    ) -> Self {
        debug_assert!(directory.ids().all(|id| id.as_usize() < upper.len()));
        debug_assert!(
            upper
                .iter()
                .flat_map(PointerTable::ids)
                .all(|id| id.as_usize() < mid.len())
        );
        debug_assert!(
            mid.iter()
                .flat_map(PointerTable::ids)
                .all(|id| id.as_usize() < leaf.len())
        );
        Self {
            layout,
            directory,
            upper,
            mid,
            leaf,
        }
    }

    /// The level shifts this snapshot was captured with.
    #[inline]
    #[must_use]
    pub const fn layout(&self) -> TableLayout {
        self.layout
    }

    /// Directory slot for `va`. Never fails; `None` means the whole
    /// `top_span`-sized region is unmapped.
    #[inline]
    #[must_use]
    pub fn top_slot(&self, va: VirtualAddress) -> Option<UpperTableId> {
        self.directory.get(self.layout.top_index(va))
    }

    /// Upper-table slot for `va` within the table `id`.
    #[inline]
    #[must_use]
    pub fn upper_slot(&self, id: UpperTableId, va: VirtualAddress) -> Option<MidTableId> {
        self.upper[id.as_usize()].get(self.layout.upper_index(va))
    }

    /// Mid-table slot for `va` within the table `id`.
    #[inline]
    #[must_use]
    pub fn mid_slot(&self, id: MidTableId, va: VirtualAddress) -> Option<LeafTableId> {
        self.mid[id.as_usize()].get(self.layout.mid_index(va))
    }

    /// Leaf entry for `va` within the table `id`. Absence at this level is a
    /// non-present entry, not an error.
    #[inline]
    #[must_use]
    pub fn leaf_slot(&self, id: LeafTableId, va: VirtualAddress) -> LeafEntryBits {
        self.leaf[id.as_usize()].get(self.layout.leaf_index(va))
    }

    /// Lazily enumerate per-page translation records over `[begin, end)`.
    ///
    /// Unmapped regions are skipped at the coarsest absent level; with
    /// `include_gaps`, non-present *leaf* entries additionally surface as
    /// sentinel gap records. `begin >= end` yields an empty sequence.
    #[must_use]
    pub fn walk(&self, begin: VirtualAddress, end: VirtualAddress, include_gaps: bool) -> Walk<'_> {
        Walk::new(self, begin, end, include_gaps)
    }
}

/// Builds a [`Snapshot`] by installing leaf entries one virtual address at a
/// time, creating the chain of missing intermediate tables on demand.
pub struct SnapshotBuilder {
    layout: TableLayout,
    directory: PointerTable<UpperTableId>,
    upper: Vec<PointerTable<MidTableId>>,
    mid: Vec<PointerTable<LeafTableId>>,
    leaf: Vec<LeafTable>,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new(layout: TableLayout) -> Self {
        Self {
            layout,
            directory: PointerTable::empty(),
            upper: Vec::new(),
            mid: Vec::new(),
            leaf: Vec::new(),
        }
    }

    /// Install `entry` at the leaf slot for `va`, allocating intermediate
    /// tables along the path as needed. Re-mapping the same page overwrites
    /// the previous entry.
    pub fn map(&mut self, va: VirtualAddress, entry: LeafEntryBits) -> &mut Self {
        let upper_id = match self.directory.get(self.layout.top_index(va)) {
            Some(id) => id,
            None => {
                let id = UpperTableId::new(self.upper.len());
                self.upper.push(PointerTable::empty());
                self.directory.set(self.layout.top_index(va), id);
                id
            }
        };

        let mid_id = match self.upper[upper_id.as_usize()].get(self.layout.upper_index(va)) {
            Some(id) => id,
            None => {
                let id = MidTableId::new(self.mid.len());
                self.mid.push(PointerTable::empty());
                self.upper[upper_id.as_usize()].set(self.layout.upper_index(va), id);
                id
            }
        };

        let leaf_id = match self.mid[mid_id.as_usize()].get(self.layout.mid_index(va)) {
            Some(id) => id,
            None => {
                let id = LeafTableId::new(self.leaf.len());
                self.leaf.push(LeafTable::empty());
                self.mid[mid_id.as_usize()].set(self.layout.mid_index(va), id);
                id
            }
        };

        self.leaf[leaf_id.as_usize()].set(self.layout.leaf_index(va), entry);
        self
    }

    #[must_use]
    pub fn build(self) -> Snapshot {
        Snapshot::from_parts(self.layout, self.directory, self.upper, self.mid, self.leaf)
    }
}
