//! # Memory management
//!
//! Software paging over the single physical memory array:
//! - [`frame_allocator`]: first-fit bitmap allocator for physical frames,
//! - [`page_table`]: per-process single-level tables and their entries,
//! - [`translate`]: virtual to physical translation with permission checks.
//!
//! Every process has a [`PageTable`] in the page-table region, selected by the
//! page-table-base register of the CPU.

mod address;
mod frame_allocator;
mod memory;
mod page_table;

pub use address::{PhysAddr, PhysPageNum, VirtAddr, VirtPageNum};
pub use frame_allocator::{BitmapFrameAllocator, FrameAllocator, FrameBitmap};
pub use memory::PhysicalMemory;
pub use page_table::{MapError, MapPermission, PTEFlags, PageTable, PageTableEntry};

use crate::config::{Word, RESERVED_PAGES};
use crate::trap::Fault;
use log::trace;

/// Kind of memory access being translated
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AccessKind {
    /// Fetch or load
    Read,
    /// Store
    Write,
}

impl AccessKind {
    /// Diagnostic for an access the page does not permit
    pub fn violation(self) -> &'static str {
        match self {
            Self::Read => "cannot read from a write-only page",
            Self::Write => "cannot write to a read-only page",
        }
    }
}

/// Translates `va` through the table selected by `ptbr`.
///
/// Pages below [`RESERVED_PAGES`] fault regardless of their entry, so the
/// code/OS region can never be addressed from a process.
pub fn translate(
    memory: &PhysicalMemory,
    ptbr: Word,
    va: VirtAddr,
    access: AccessKind,
) -> Result<PhysAddr, Fault> {
    let vpn = va.vpn();
    if vpn.0 < RESERVED_PAGES {
        return Err(Fault::ReservedRegion(va.0));
    }
    let pte = PageTable::from_token(ptbr)
        .translate(memory, vpn)
        .ok_or(Fault::UnmappedAccess(va.0))?;
    let permitted = match access {
        AccessKind::Read => pte.is_readable(),
        AccessKind::Write => pte.is_writable(),
    };
    if !permitted {
        return Err(Fault::PermissionViolation(va.0, access));
    }
    let pa = pte.ppn().addr_at(va.page_offset());
    trace!("{va:?} -> {pa:?} ({access:?})");
    Ok(pa)
}
