//! # Mirrored Page-Table Model and Translation Walker
//!
//! Data model and traversal logic for inspecting a *foreign* process's
//! virtual-to-physical translations from a **mirrored** copy of its 4-level
//! page table. The mirror is captured out-of-band by a privileged provider;
//! this crate only ever reads it.
//!
//! ## Virtual Address → Table Indices
//!
//! Each 48-bit virtual address divides into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  top  | upper |  mid  | leaf  | offset |
//! ```
//!
//! The four 9-bit fields index four levels of tables, each holding 512
//! entries of 64 bits:
//!
//! ```text
//!  directory → upper table → mid table → leaf table → translation entry
//! ```
//!
//! A present leaf entry carries the physical frame base (bits `[12,46)`) and
//! the accessed/dirty/writable/user flag bits. An absent slot at *any* level
//! means the whole region below it is unmapped — absence is data here, never
//! an error.
//!
//! ## The arena model
//!
//! The captured mirror encodes "pointer to next table" as a raw base address
//! and "absent" as zero, which conflates a legitimate zero with a hole. The
//! [`Snapshot`] replaces that with arenas of fixed 512-slot tables addressed
//! by typed ids ([`UpperTableId`], [`MidTableId`], [`LeafTableId`]); a
//! non-leaf slot is `Option<Id>`, so absence is explicit.
//!
//! ## Walking
//!
//! [`Snapshot::walk`] returns a lazy [`Walk`] iterator that emits one
//! [`TranslationRecord`] per present page in the requested range and skips
//! unmapped regions at the coarsest level that is absent: an empty directory
//! slot advances the cursor by 2³⁹ bytes in a single step instead of scanning
//! 2²⁷ pages. The snapshot is immutable during a walk; independent walks over
//! the same snapshot may run concurrently without coordination.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod layout;
mod leaf_entry;
mod snapshot;
mod walk;

pub use crate::layout::{SLOT_COUNT, SlotIndex, TableLayout};
pub use crate::leaf_entry::LeafEntryBits;
pub use crate::snapshot::{
    LeafTable, LeafTableId, MidTableId, PointerTable, Snapshot, SnapshotBuilder, UpperTableId,
};
pub use crate::walk::{GAP_SENTINEL, TranslationRecord, Walk, WalkStats};
