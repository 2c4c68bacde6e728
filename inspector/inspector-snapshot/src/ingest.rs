//! # Mirror Ingestion
//!
//! Conversion of a captured raw mirror into the arena snapshot model. The
//! capture ABI encodes a next-level link as the userspace *address* of a
//! 512-slot table inside the next level's buffer; ingestion turns every such
//! address into a positional table id and rejects links that do not land
//! table-aligned inside the right buffer, instead of ever dereferencing
//! them.

use inspector_pagetable::{
    LeafEntryBits, LeafTable, LeafTableId, MidTableId, PointerTable, SLOT_COUNT, SlotIndex,
    Snapshot, TableLayout, UpperTableId,
};
use log::debug;

use crate::buffers::MirroredBuffers;

/// Bytes occupied by one 512-slot table inside a mirror buffer.
const TABLE_BYTES: u64 = (SLOT_COUNT * size_of::<u64>()) as u64;

/// A captured mirror that cannot be interpreted as a translation tree.
///
/// These indicate a provider/ABI mismatch or a corrupted capture, not an
/// unmapped address: absence is always modeled as a zero slot, which ingests
/// cleanly.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A nonzero slot points outside the next level's mirror buffer.
    #[error(
        "{level} slot {slot} holds 0x{value:x}, which lies outside the next level's mirror buffer"
    )]
    ForeignLink {
        level: &'static str,
        slot: usize,
        value: u64,
    },

    /// A nonzero slot points into the right buffer but not at a table base.
    #[error("{level} slot {slot} holds 0x{value:x}, which is not aligned to a table boundary")]
    MisalignedLink {
        level: &'static str,
        slot: usize,
        value: u64,
    },
}

/// Resolve a raw link to the positional index of a table within the next
/// level's buffer.
fn table_index(
    value: u64,
    next_base: u64,
    next_slots: usize,
    level: &'static str,
    slot: usize,
) -> Result<usize, IngestError> {
    let next_end = next_base + next_slots as u64 * size_of::<u64>() as u64;
    if value < next_base || value >= next_end {
        return Err(IngestError::ForeignLink { level, slot, value });
    }
    let offset = value - next_base;
    if offset % TABLE_BYTES != 0 {
        return Err(IngestError::MisalignedLink { level, slot, value });
    }
    Ok((offset / TABLE_BYTES) as usize)
}

fn pointer_table<Id: Copy>(
    raw: &[u64],
    next_base: u64,
    next_slots: usize,
    level: &'static str,
    make_id: impl Fn(usize) -> Id,
) -> Result<PointerTable<Id>, IngestError> {
    let mut table = PointerTable::empty();
    for (slot, &value) in raw.iter().enumerate() {
        if value == 0 {
            continue;
        }
        let index = table_index(value, next_base, next_slots, level, slot)?;
        table.set(SlotIndex::new(slot as u16), make_id(index));
    }
    Ok(table)
}

fn leaf_table(raw: &[u64]) -> LeafTable {
    let mut table = LeafTable::empty();
    for (slot, &value) in raw.iter().enumerate() {
        if value != 0 {
            table.set(SlotIndex::new(slot as u16), LeafEntryBits::from(value));
        }
    }
    table
}

/// Interpret a captured mirror as an arena [`Snapshot`].
///
/// Table ids correspond positionally to the table chunks of the raw buffers,
/// so the arena reproduces the captured topology exactly, including tables
/// nothing links to (they are unreachable and harmless).
///
/// # Errors
/// [`IngestError`] if any nonzero non-leaf slot is not the address of a
/// table inside the next level's buffer.
pub fn ingest(buffers: &MirroredBuffers, layout: TableLayout) -> Result<Snapshot, IngestError> {
    let directory = pointer_table(
        buffers.directory(),
        buffers.upper_base(),
        buffers.upper().len(),
        "directory",
        UpperTableId::new,
    )?;

    let upper = buffers
        .upper()
        .chunks_exact(SLOT_COUNT)
        .map(|raw| {
            pointer_table(
                raw,
                buffers.mid_base(),
                buffers.mid().len(),
                "upper",
                MidTableId::new,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mid = buffers
        .mid()
        .chunks_exact(SLOT_COUNT)
        .map(|raw| {
            pointer_table(
                raw,
                buffers.leaf_base(),
                buffers.leaf().len(),
                "mid",
                LeafTableId::new,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let leaf = buffers
        .leaf()
        .chunks_exact(SLOT_COUNT)
        .map(leaf_table)
        .collect::<Vec<_>>();

    debug!(
        "ingested mirror: {} upper, {} mid, {} leaf tables",
        upper.len(),
        mid.len(),
        leaf.len()
    );

    Ok(Snapshot::from_parts(layout, directory, upper, mid, leaf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_addresses::VirtualAddress;

    /// Populates the raw buffers the way the capturing kernel would: links
    /// are real addresses of table chunks inside the sibling buffers.
    struct FakeKernel {
        layout: TableLayout,
        next_upper: usize,
        next_mid: usize,
        next_leaf: usize,
    }

    impl FakeKernel {
        fn new(layout: TableLayout) -> Self {
            Self {
                layout,
                next_upper: 0,
                next_mid: 0,
                next_leaf: 0,
            }
        }

        fn link(buf_base: u64, slot_value: &mut u64, next: &mut usize) -> usize {
            if *slot_value == 0 {
                *slot_value = buf_base + (*next as u64) * TABLE_BYTES;
                *next += 1;
            }
            ((*slot_value - buf_base) / TABLE_BYTES) as usize
        }

        fn map(&mut self, bufs: &mut MirroredBuffers, va: u64, entry: u64) {
            let va = VirtualAddress::new(va);
            let (ti, ui, mi, li) = (
                self.layout.top_index(va).as_usize(),
                self.layout.upper_index(va).as_usize(),
                self.layout.mid_index(va).as_usize(),
                self.layout.leaf_index(va).as_usize(),
            );

            let upper_base = bufs.upper_base();
            let upper_idx =
                Self::link(upper_base, &mut bufs.directory_mut()[ti], &mut self.next_upper);

            let mid_base = bufs.mid_base();
            let upper_slot = upper_idx * SLOT_COUNT + ui;
            let mid_idx = Self::link(mid_base, &mut bufs.upper_mut()[upper_slot], &mut self.next_mid);

            let leaf_base = bufs.leaf_base();
            let mid_slot = mid_idx * SLOT_COUNT + mi;
            let leaf_idx = Self::link(leaf_base, &mut bufs.mid_mut()[mid_slot], &mut self.next_leaf);

            bufs.leaf_mut()[leaf_idx * SLOT_COUNT + li] = entry;
        }
    }

    #[test]
    fn kernel_style_mirror_round_trips() {
        let layout = TableLayout::X86_64_4LEVEL;
        let mut bufs = MirroredBuffers::allocate();
        let mut kernel = FakeKernel::new(layout);
        kernel.map(&mut bufs, 0x1000, 0x5000 | 0x67);
        kernel.map(&mut bufs, 0x2000, 0x6000 | 0x27);
        kernel.map(&mut bufs, (1 << 30) | 0x3000, 0x7000 | 0x67);

        let snap = ingest(&bufs, layout).expect("valid mirror");
        let records: Vec<_> = snap
            .walk(
                VirtualAddress::zero(),
                VirtualAddress::new(2 << 30),
                false,
            )
            .collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].virtual_address.as_u64(), 0x1000);
        assert_eq!(records[0].physical_address.as_u64(), 0x5000);
        assert!(records[0].dirty);
        assert_eq!(records[1].virtual_address.as_u64(), 0x2000);
        assert!(!records[1].dirty);
        assert_eq!(records[2].virtual_address.as_u64(), (1 << 30) | 0x3000);
        assert_eq!(records[2].physical_address.as_u64(), 0x7000);
    }

    #[test]
    fn empty_mirror_ingests_to_empty_snapshot() {
        let bufs = MirroredBuffers::allocate();
        let snap = ingest(&bufs, TableLayout::X86_64_4LEVEL).expect("empty mirror");
        assert!(
            snap.walk(VirtualAddress::zero(), VirtualAddress::new(1 << 48), true)
                .next()
                .is_none()
        );
    }

    #[test]
    fn foreign_link_is_rejected() {
        let mut bufs = MirroredBuffers::allocate();
        bufs.directory_mut()[3] = 0x8; // nowhere near the upper buffer
        let err = ingest(&bufs, TableLayout::X86_64_4LEVEL)
            .err()
            .expect("foreign link");
        assert!(matches!(
            err,
            IngestError::ForeignLink {
                level: "directory",
                slot: 3,
                ..
            }
        ));
    }

    #[test]
    fn misaligned_link_is_rejected() {
        let mut bufs = MirroredBuffers::allocate();
        bufs.directory_mut()[0] = bufs.upper_base() + 8;
        let err = ingest(&bufs, TableLayout::X86_64_4LEVEL)
            .err()
            .expect("misaligned link");
        assert!(matches!(err, IngestError::MisalignedLink { slot: 0, .. }));
    }
}
