//! # Snapshot Provider Contract
//!
//! The privileged capture mechanism behind a small trait, so the model and
//! the tool can be exercised against in-process fakes and the Linux syscall
//! path stays confined to one module.

use inspector_addresses::VirtualAddress;
use inspector_pagetable::TableLayout;

use crate::buffers::MirroredBuffers;

/// The process whose page tables are mirrored.
///
/// `-1` is a recognized sentinel meaning "no specific target"; what that
/// resolves to is the provider's business.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TargetPid(i32);

impl TargetPid {
    /// The "no specific target" sentinel.
    pub const UNSPECIFIED: Self = Self(-1);

    #[inline]
    #[must_use]
    pub const fn new(pid: i32) -> Self {
        Self(pid)
    }

    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl From<i32> for TargetPid {
    #[inline]
    fn from(pid: i32) -> Self {
        Self::new(pid)
    }
}

/// Why a capture could not be taken.
///
/// Acquisition is the only fallible stage of a run: a failed capture is
/// terminal, must be reported once, and no walk may follow it. Status codes
/// are whatever the provider's channel returns (negative values from the
/// kernel boundary: unknown pid, permission, unsupported range).
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// The translation-layout query failed.
    #[error("querying the page-table layout failed with status {0}")]
    Layout(i64),

    /// The capture request itself was rejected.
    #[error("capturing the page-table mirror failed with status {0}")]
    Capture(i64),
}

/// A privileged channel that mirrors a target's page tables into caller
/// memory.
///
/// The provider writes the mirror completely before returning; the caller
/// only reads the buffers afterwards. Interleaving capture and reads is
/// unsupported by contract.
pub trait SnapshotProvider {
    /// The level shifts the target kernel translates with.
    ///
    /// Defaults to the x86-64 4-level layout for providers that have no way
    /// to ask.
    ///
    /// # Errors
    /// [`AcquireError::Layout`] if the channel rejects the query.
    fn table_layout(&self) -> Result<TableLayout, AcquireError> {
        Ok(TableLayout::X86_64_4LEVEL)
    }

    /// Mirror the page tables of `pid`, restricted to `[begin, end)`, into
    /// `buffers`.
    ///
    /// # Errors
    /// [`AcquireError::Capture`] if the target does not exist, the caller
    /// lacks privileges, or the range is unsupported. The buffers' contents
    /// are unspecified after a failure and must not be walked.
    fn capture(
        &self,
        pid: TargetPid,
        begin: VirtualAddress,
        end: VirtualAddress,
        buffers: &mut MirroredBuffers,
    ) -> Result<(), AcquireError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_pid_sentinel() {
        assert_eq!(TargetPid::UNSPECIFIED.as_raw(), -1);
        assert_eq!(TargetPid::from(-1), TargetPid::UNSPECIFIED);
        assert_ne!(TargetPid::new(1), TargetPid::UNSPECIFIED);
    }

    #[test]
    fn default_layout_is_x86_64() {
        struct NoopProvider;
        impl SnapshotProvider for NoopProvider {
            fn capture(
                &self,
                _pid: TargetPid,
                _begin: VirtualAddress,
                _end: VirtualAddress,
                _buffers: &mut MirroredBuffers,
            ) -> Result<(), AcquireError> {
                Ok(())
            }
        }

        let layout = NoopProvider.table_layout().expect("default layout");
        assert_eq!(layout, TableLayout::X86_64_4LEVEL);
    }
}
