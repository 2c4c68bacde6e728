//! # Linux Capture Channel
//!
//! Provider backed by the instrumented kernel's two inspection syscalls:
//! one reports the translation layout (the four level shifts), the other
//! mirrors a target's page tables into the caller's pre-allocated buffers.

use inspector_addresses::VirtualAddress;
use inspector_pagetable::TableLayout;
use log::{debug, warn};

use crate::buffers::MirroredBuffers;
use crate::provider::{AcquireError, SnapshotProvider, TargetPid};

const SYS_GET_PAGETABLE_LAYOUT: libc::c_long = 326;
const SYS_EXPOSE_PAGE_TABLE: libc::c_long = 327;

/// Layout report ABI of `get_pagetable_layout`.
#[repr(C)]
#[derive(Default)]
struct PagetableLayoutInfo {
    pgdir_shift: u32,
    pud_shift: u32,
    pmd_shift: u32,
    page_shift: u32,
}

/// Request ABI of `expose_page_table`: four mirror buffer bases plus the
/// virtual-address range to restrict the capture to.
#[repr(C)]
struct ExposePgtblArgs {
    fake_pgd: u64,
    fake_puds: u64,
    fake_pmds: u64,
    page_table_addr: u64,
    begin_vaddr: u64,
    end_vaddr: u64,
}

/// [`SnapshotProvider`] speaking the kernel's capture syscalls.
///
/// Requires a kernel that implements them; on a stock kernel both calls fail
/// with `ENOSYS`, which surfaces as an [`AcquireError`].
pub struct LinuxPagetableSyscalls;

impl SnapshotProvider for LinuxPagetableSyscalls {
    fn table_layout(&self) -> Result<TableLayout, AcquireError> {
        let mut info = PagetableLayoutInfo::default();
        // SAFETY: the kernel writes `size_of::<PagetableLayoutInfo>()` bytes
        // into `info`, which lives for the duration of the call.
        let status = unsafe {
            libc::syscall(
                SYS_GET_PAGETABLE_LAYOUT,
                &raw mut info,
                size_of::<PagetableLayoutInfo>() as u32,
            )
        };
        if status < 0 {
            warn!("page-table layout query failed with status {status}");
            return Err(AcquireError::Layout(status));
        }
        debug!(
            "kernel reports shifts {}/{}/{}/{}",
            info.pgdir_shift, info.pud_shift, info.pmd_shift, info.page_shift
        );
        Ok(TableLayout::new(
            info.pgdir_shift,
            info.pud_shift,
            info.pmd_shift,
            info.page_shift,
        ))
    }

    fn capture(
        &self,
        pid: TargetPid,
        begin: VirtualAddress,
        end: VirtualAddress,
        buffers: &mut MirroredBuffers,
    ) -> Result<(), AcquireError> {
        let args = ExposePgtblArgs {
            fake_pgd: buffers.directory_base(),
            fake_puds: buffers.upper_base(),
            fake_pmds: buffers.mid_base(),
            page_table_addr: buffers.leaf_base(),
            begin_vaddr: begin.as_u64(),
            end_vaddr: end.as_u64(),
        };
        // SAFETY: `args` carries the bases of buffers that `buffers` keeps
        // alive and exclusively borrowed until the kernel has finished
        // writing the mirror into them.
        let status = unsafe { libc::syscall(SYS_EXPOSE_PAGE_TABLE, pid.as_raw(), &raw const args) };
        if status < 0 {
            warn!("capture for pid {} failed with status {status}", pid.as_raw());
            return Err(AcquireError::Capture(status));
        }
        debug!(
            "captured [{begin}, {end}) for pid {}",
            pid.as_raw()
        );
        Ok(())
    }
}
