//! # Snapshot Acquisition
//!
//! The boundary between the read-only page-table model and the privileged
//! mechanism that mirrors a foreign process's translation tree into caller
//! memory.
//!
//! ## Flow
//!
//! 1. [`MirroredBuffers::allocate`] provisions the four fixed-size mirror
//!    buffers the capture contract requires.
//! 2. A [`SnapshotProvider`] fills them for a [`TargetPid`] and address
//!    range. On Linux, [`LinuxPagetableSyscalls`] does this through the
//!    instrumented kernel's capture syscalls; a provider failure is fatal and
//!    no walk must follow it.
//! 3. [`ingest`] converts the raw mirror — next-level links are userspace
//!    addresses into the sibling buffers — into an arena
//!    [`Snapshot`](inspector_pagetable::Snapshot), validating every link.
//!
//! The provider writes strictly before any walk begins; nothing here reads
//! and captures concurrently.

mod buffers;
mod ingest;
#[cfg(target_os = "linux")]
mod linux;
mod provider;

pub use crate::buffers::{
    DIRECTORY_SLOTS, LEAF_SLOTS, MID_SLOTS, MirroredBuffers, UPPER_SLOTS,
};
pub use crate::ingest::{IngestError, ingest};
#[cfg(target_os = "linux")]
pub use crate::linux::LinuxPagetableSyscalls;
pub use crate::provider::{AcquireError, SnapshotProvider, TargetPid};
