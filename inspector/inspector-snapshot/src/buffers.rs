//! # Mirror Buffer Provisioning
//!
//! The capture contract takes four caller-owned, pre-zeroed buffers of 64-bit
//! slots, one per translation level, with fixed sizes: the provider fills
//! them and writes next-level links as addresses *into the sibling buffers*.
//! Provisioning is plain heap allocation; the buffers only need to be big
//! enough for the mirror, not page-table-aligned themselves (each table
//! within them is, because the table size equals the slot-count times eight).

use inspector_pagetable::SLOT_COUNT;

/// Directory-level slots: one table.
pub const DIRECTORY_SLOTS: usize = SLOT_COUNT;
/// Upper-level slots: room for 10 tables.
pub const UPPER_SLOTS: usize = 10 * SLOT_COUNT;
/// Mid-level slots: room for 512 tables.
pub const MID_SLOTS: usize = SLOT_COUNT * SLOT_COUNT;
/// Leaf-level slots: room for 5120 tables.
pub const LEAF_SLOTS: usize = 10 * SLOT_COUNT * SLOT_COUNT;

/// The four raw mirror buffers of one capture.
///
/// A slot value of zero means "nothing mapped here"; any nonzero non-leaf
/// slot is the base address of a 512-slot table inside the next level's
/// buffer. The buffers stay owned by the caller for the lifetime of the
/// capture and the subsequent ingestion.
pub struct MirroredBuffers {
    directory: Vec<u64>,
    upper: Vec<u64>,
    mid: Vec<u64>,
    leaf: Vec<u64>,
}

impl MirroredBuffers {
    /// Allocate all four buffers, zero-filled, at their contract sizes.
    #[must_use]
    pub fn allocate() -> Self {
        Self {
            directory: vec![0; DIRECTORY_SLOTS],
            upper: vec![0; UPPER_SLOTS],
            mid: vec![0; MID_SLOTS],
            leaf: vec![0; LEAF_SLOTS],
        }
    }

    #[must_use]
    pub fn directory(&self) -> &[u64] {
        &self.directory
    }

    #[must_use]
    pub fn upper(&self) -> &[u64] {
        &self.upper
    }

    #[must_use]
    pub fn mid(&self) -> &[u64] {
        &self.mid
    }

    #[must_use]
    pub fn leaf(&self) -> &[u64] {
        &self.leaf
    }

    /// Mutable views for providers that populate the mirror in-process.
    #[must_use]
    pub fn directory_mut(&mut self) -> &mut [u64] {
        &mut self.directory
    }

    #[must_use]
    pub fn upper_mut(&mut self) -> &mut [u64] {
        &mut self.upper
    }

    #[must_use]
    pub fn mid_mut(&mut self) -> &mut [u64] {
        &mut self.mid
    }

    #[must_use]
    pub fn leaf_mut(&mut self) -> &mut [u64] {
        &mut self.leaf
    }

    /// Base address of the directory buffer, as the capture ABI sees it.
    #[must_use]
    pub fn directory_base(&self) -> u64 {
        self.directory.as_ptr() as u64
    }

    /// Base address of the upper-level buffer.
    #[must_use]
    pub fn upper_base(&self) -> u64 {
        self.upper.as_ptr() as u64
    }

    /// Base address of the mid-level buffer.
    #[must_use]
    pub fn mid_base(&self) -> u64 {
        self.mid.as_ptr() as u64
    }

    /// Base address of the leaf-level buffer.
    #[must_use]
    pub fn leaf_base(&self) -> u64 {
        self.leaf.as_ptr() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_sizes() {
        let bufs = MirroredBuffers::allocate();
        assert_eq!(bufs.directory().len(), 512);
        assert_eq!(bufs.upper().len(), 10 * 512);
        assert_eq!(bufs.mid().len(), 512 * 512);
        assert_eq!(bufs.leaf().len(), 10 * 512 * 512);
    }

    #[test]
    fn freshly_allocated_buffers_are_zeroed() {
        let bufs = MirroredBuffers::allocate();
        assert!(bufs.directory().iter().all(|&v| v == 0));
        assert!(bufs.upper().iter().all(|&v| v == 0));
    }
}
