//! Implementation of physical and virtual address and page number types.

use crate::config::{Word, PAGE_SIZE, PAGE_SIZE_BITS};
use core::fmt::{self, Debug, Formatter};

/// Physical address: an index into physical memory
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct PhysAddr(pub usize);

/// Virtual address as seen by a running process
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct VirtAddr(pub Word);

/// Physical page number, i.e. frame number
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct PhysPageNum(pub usize);

/// Virtual page number
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct VirtPageNum(pub usize);

impl Debug for VirtAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("VA:{:#06x}", self.0))
    }
}

impl Debug for VirtPageNum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("VPN:{}", self.0))
    }
}

impl Debug for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("PA:{:#06x}", self.0))
    }
}

impl Debug for PhysPageNum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("PPN:{}", self.0))
    }
}

impl From<VirtPageNum> for VirtAddr {
    fn from(v: VirtPageNum) -> Self {
        Self((v.0 << PAGE_SIZE_BITS) as Word)
    }
}

impl VirtAddr {
    /// Page containing this address (the high bits)
    pub fn vpn(self) -> VirtPageNum {
        VirtPageNum(usize::from(self.0) >> PAGE_SIZE_BITS)
    }

    /// Offset inside the page (the low bits)
    pub fn page_offset(self) -> usize {
        usize::from(self.0) & (PAGE_SIZE - 1)
    }
}

impl PhysPageNum {
    /// Address of word `offset` inside this frame
    pub fn addr_at(self, offset: usize) -> PhysAddr {
        PhysAddr((self.0 << PAGE_SIZE_BITS) + offset)
    }
}
