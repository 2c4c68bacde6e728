//! # Translation Walker
//!
//! Lazy, read-only enumeration of per-page translation records over a
//! [`Snapshot`]. The walker is a single cursor: each step derives the four
//! level indices from the current virtual address, descends the table chain,
//! and either emits one record or jumps the cursor past the unmapped region
//! at the coarsest level that came up absent.
//!
//! ## Skip policy
//!
//! A coarse skip adds the level's span to the **current** cursor without
//! rounding to the region boundary, so a walk starting at a misaligned
//! address keeps its misalignment across skips. This matches the mirrored
//! inspector this model was built for; alignment-insensitive, but observably
//! different from round-to-boundary for unaligned starts.

use core::fmt;

use inspector_addresses::{PhysicalAddress, VirtualAddress};
use log::trace;

use crate::leaf_entry::LeafEntryBits;
use crate::snapshot::Snapshot;

/// The fixed virtual address reported for gap records.
pub const GAP_SENTINEL: VirtualAddress = VirtualAddress::new(0xdead_0000_0000);

/// One decoded per-page translation result.
///
/// Either a present page — virtual address, decoded physical frame base and
/// the four inspection flags — or a gap record carrying [`GAP_SENTINEL`] and
/// zeros elsewhere.
///
/// `Display` renders the line-oriented report format: lowercase hex, the
/// physical part without a `0x` prefix, flags as `0`/`1` in the order
/// accessed, dirty, writable, user:
///
/// ```text
/// 0x1000 5000 1 0 1 1
/// 0xdead00000000 0x0 0 0 0 0
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TranslationRecord {
    pub virtual_address: VirtualAddress,
    pub physical_address: PhysicalAddress,
    pub accessed: bool,
    pub dirty: bool,
    pub writable: bool,
    pub user_accessible: bool,
}

impl TranslationRecord {
    /// Decode a present leaf entry into a record for the page at `va`.
    #[inline]
    #[must_use]
    pub const fn from_leaf(va: VirtualAddress, entry: LeafEntryBits) -> Self {
        Self {
            virtual_address: va,
            physical_address: entry.physical_address(),
            accessed: entry.accessed(),
            dirty: entry.dirty(),
            writable: entry.writable(),
            user_accessible: entry.user_access(),
        }
    }

    /// The sentinel record for a non-present leaf entry.
    #[inline]
    #[must_use]
    pub const fn gap() -> Self {
        Self {
            virtual_address: GAP_SENTINEL,
            physical_address: PhysicalAddress::zero(),
            accessed: false,
            dirty: false,
            writable: false,
            user_accessible: false,
        }
    }

    /// `true` if this is a gap record rather than a present page.
    #[inline]
    #[must_use]
    pub fn is_gap(&self) -> bool {
        self.virtual_address == GAP_SENTINEL
    }
}

impl fmt::Display for TranslationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_gap() {
            return f.write_str("0xdead00000000 0x0 0 0 0 0");
        }
        write!(
            f,
            "0x{:x} {:x} {} {} {} {}",
            self.virtual_address.as_u64(),
            self.physical_address.as_u64(),
            u8::from(self.accessed),
            u8::from(self.dirty),
            u8::from(self.writable),
            u8::from(self.user_accessible),
        )
    }
}

/// Per-level read counters for one walk.
///
/// The counters make the coarse-skip behavior observable: a fully-empty
/// snapshot walked over the whole 48-bit space costs 512 directory reads and
/// nothing below, not a per-page scan.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WalkStats {
    pub top_reads: u64,
    pub upper_reads: u64,
    pub mid_reads: u64,
    pub leaf_reads: u64,
    pub emitted: u64,
}

/// Lazy iterator over the translation records of a range.
///
/// Produced by [`Snapshot::walk`]. Holds only the cursor and a shared
/// reference to the snapshot; dropping it mid-walk needs no cleanup, and
/// several `Walk`s over one snapshot may run concurrently.
pub struct Walk<'s> {
    snapshot: &'s Snapshot,
    cursor: u64,
    end: u64,
    include_gaps: bool,
    stats: WalkStats,
}

impl<'s> Walk<'s> {
    pub(crate) fn new(
        snapshot: &'s Snapshot,
        begin: VirtualAddress,
        end: VirtualAddress,
        include_gaps: bool,
    ) -> Self {
        Self {
            snapshot,
            cursor: begin.as_u64(),
            end: end.as_u64(),
            include_gaps,
            stats: WalkStats::default(),
        }
    }

    /// Counters accumulated so far.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> WalkStats {
        self.stats
    }
}

impl Iterator for Walk<'_> {
    type Item = TranslationRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let layout = self.snapshot.layout();

        while self.cursor < self.end {
            let va = VirtualAddress::new(self.cursor);

            self.stats.top_reads += 1;
            let Some(upper) = self.snapshot.top_slot(va) else {
                trace!("directory hole at {va}, skipping {:#x} bytes", layout.top_span());
                self.cursor = self.cursor.saturating_add(layout.top_span());
                continue;
            };

            self.stats.upper_reads += 1;
            let Some(mid) = self.snapshot.upper_slot(upper, va) else {
                trace!("upper-level hole at {va}, skipping {:#x} bytes", layout.upper_span());
                self.cursor = self.cursor.saturating_add(layout.upper_span());
                continue;
            };

            self.stats.mid_reads += 1;
            let Some(leaf) = self.snapshot.mid_slot(mid, va) else {
                trace!("mid-level hole at {va}, skipping {:#x} bytes", layout.mid_span());
                self.cursor = self.cursor.saturating_add(layout.mid_span());
                continue;
            };

            self.stats.leaf_reads += 1;
            let entry = self.snapshot.leaf_slot(leaf, va);
            self.cursor = self.cursor.saturating_add(layout.page_span());

            if !entry.present() {
                if self.include_gaps {
                    self.stats.emitted += 1;
                    return Some(TranslationRecord::gap());
                }
                continue;
            }

            self.stats.emitted += 1;
            return Some(TranslationRecord::from_leaf(va, entry));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TableLayout;
    use crate::snapshot::SnapshotBuilder;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    fn entry(raw: u64) -> LeafEntryBits {
        LeafEntryBits::from(raw)
    }

    fn snapshot_with(mappings: &[(u64, u64)]) -> Snapshot {
        let mut b = SnapshotBuilder::new(TableLayout::X86_64_4LEVEL);
        for &(va, raw) in mappings {
            b.map(VirtualAddress::new(va), entry(raw));
        }
        b.build()
    }

    #[test]
    fn empty_range_yields_nothing() {
        let snap = snapshot_with(&[(0x1000, 0x1000 | 0x67)]);
        let begin = VirtualAddress::new(0x1000);
        assert_eq!(snap.walk(begin, begin, true).count(), 0);

        // Inverted range: "do nothing", not an error.
        let end = VirtualAddress::new(0x0);
        assert_eq!(snap.walk(begin, end, true).count(), 0);
    }

    #[test]
    fn one_record_per_present_page() {
        let snap = snapshot_with(&[
            (0x1000, 0x5000 | 0x67),
            (0x2000, 0x6000 | 0x27),
            (0x4000, 0x7000 | 0x07),
        ]);
        let records: Vec<_> = snap
            .walk(VirtualAddress::zero(), VirtualAddress::new(0x5000), false)
            .collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].virtual_address.as_u64(), 0x1000);
        assert_eq!(records[0].physical_address.as_u64(), 0x5000);
        assert!(records[0].dirty);
        assert_eq!(records[1].virtual_address.as_u64(), 0x2000);
        assert!(!records[1].dirty);
        assert_eq!(records[2].virtual_address.as_u64(), 0x4000);
        assert!(!records[2].accessed);
    }

    #[test]
    fn gap_reporting_toggles_sentinel_records() {
        let snap = snapshot_with(&[(0x1000, 0x1000 | 0x67)]);
        let begin = VirtualAddress::zero();
        let end = VirtualAddress::new(0x2000);

        // Disabled: the absent page at 0x0 produces nothing.
        let records: Vec<_> = snap.walk(begin, end, false).collect();
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_gap());

        // Enabled: exactly one sentinel for the absent leaf entry.
        let records: Vec<_> = snap.walk(begin, end, true).collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_gap());
        assert_eq!(records[0].virtual_address, GAP_SENTINEL);
        assert_eq!(records[1].virtual_address.as_u64(), 0x1000);
    }

    #[test]
    fn end_to_end_report_lines() {
        // Path populated only for 0x1000 with entry 0x1000 | 0x67; over
        // [0x0, 0x2000) with gaps this is one sentinel line and one data
        // line. 0x67 sets accessed and dirty (bits 5 and 6), writable and
        // user (bits 1 and 2).
        let snap = snapshot_with(&[(0x1000, 0x1000 | 0x67)]);
        let lines: Vec<_> = snap
            .walk(VirtualAddress::zero(), VirtualAddress::new(0x2000), true)
            .map(|r| r.to_string())
            .collect();

        assert_eq!(lines, ["0xdead00000000 0x0 0 0 0 0", "0x1000 1000 1 1 1 1"]);
    }

    #[test]
    fn empty_snapshot_is_walked_in_directory_strides() {
        let snap = snapshot_with(&[]);
        let mut walk = snap.walk(VirtualAddress::zero(), VirtualAddress::new(1 << 48), true);
        assert!(walk.next().is_none());

        // 2^48 of address space over 2^39-sized directory slots: 512 reads,
        // and nothing below the directory is ever touched.
        let stats = walk.stats();
        assert_eq!(stats.top_reads, 512);
        assert_eq!(stats.upper_reads, 0);
        assert_eq!(stats.mid_reads, 0);
        assert_eq!(stats.leaf_reads, 0);
        // Gap reporting was on, yet coarse-skipped regions emit nothing:
        // only leaf-level absence surfaces as sentinel records.
        assert_eq!(stats.emitted, 0);
    }

    #[test]
    fn holes_skip_at_the_coarsest_absent_level() {
        // One mapped page; the surrounding upper/mid regions are absent.
        let snap = snapshot_with(&[(1 << 30, 0x9000 | 0x67)]);
        let begin = VirtualAddress::zero();
        let end = VirtualAddress::new(2 << 30);

        let mut walk = snap.walk(begin, end, false);
        let first = walk.next().expect("mapped page");
        assert_eq!(first.virtual_address.as_u64(), 1 << 30);
        assert!(walk.next().is_none());

        let stats = walk.stats();
        // [0, 1 GiB): one descent reaching the absent upper slot, then a
        // single upper-level skip. [1 GiB, 1 GiB + 2 MiB): the mapped page's
        // leaf table exists, so its 512 pages are probed one by one. The
        // remaining 511 mid slots of the second gigabyte are absent and
        // skipped in one stride each. The probe that discovers an absent
        // slot counts as a read of that level.
        assert_eq!(stats.top_reads, 1 + 512 + 511);
        assert_eq!(stats.upper_reads, 1 + 512 + 511);
        assert_eq!(stats.mid_reads, 512 + 511);
        assert_eq!(stats.leaf_reads, 512);
        assert_eq!(stats.emitted, 1);
    }

    #[test]
    fn walks_are_idempotent() {
        let snap = snapshot_with(&[(0x1000, 0x5000 | 0x67), (0x40_0000, 0x6000 | 0x27)]);
        let begin = VirtualAddress::zero();
        let end = VirtualAddress::new(0x80_0000);

        let first: Vec<_> = snap.walk(begin, end, true).collect();
        let second: Vec<_> = snap.walk(begin, end, true).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn misaligned_cursor_keeps_offset_across_coarse_skip() {
        let snap = snapshot_with(&[]);
        let begin = VirtualAddress::new(0x800);
        let end = VirtualAddress::new(1 << 41);

        let mut walk = snap.walk(begin, end, false);
        assert!(walk.next().is_none());
        // The skip adds the span to the unaligned cursor, so the stride
        // count is unchanged but every probe stays offset by 0x800.
        assert_eq!(walk.stats().top_reads, 4);
    }

    #[test]
    fn first_step_uses_unaligned_begin() {
        // A walk may start mid-page; the first index derivation uses the
        // address as-is and the first emitted record carries it verbatim.
        let snap = snapshot_with(&[(0x1000, 0x5000 | 0x67)]);
        let records: Vec<_> = snap
            .walk(VirtualAddress::new(0x1234), VirtualAddress::new(0x2000), false)
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].virtual_address.as_u64(), 0x1234);
    }

    #[test]
    fn range_at_address_space_top_terminates() {
        let snap = snapshot_with(&[]);
        let begin = VirtualAddress::new(u64::MAX - (1 << 39));
        let end = VirtualAddress::new(u64::MAX);
        assert_eq!(snap.walk(begin, end, true).count(), 0);
    }

    #[test]
    fn gap_record_shape() {
        let gap = TranslationRecord::gap();
        assert!(gap.is_gap());
        assert_eq!(gap.physical_address.as_u64(), 0);
        assert!(!gap.accessed && !gap.dirty && !gap.writable && !gap.user_accessible);
    }
}
