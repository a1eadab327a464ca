//! Implementation of [`PageTableEntry`] and [`PageTable`].
//!
//! Every process owns one single-level table of [`PAGE_TABLE_ENTRIES`] words
//! living in the page-table region of physical memory. A [`PageTable`] is only
//! a view on that region: the entries themselves stay in memory so the table
//! base register is all a context switch has to carry.

use super::{FrameAllocator, PhysAddr, PhysPageNum, PhysicalMemory, VirtPageNum};
use crate::config::{Word, PAGE_SIZE_BITS, PAGE_TABLE_ENTRIES, PAGE_TABLE_REGION, PAGE_TABLE_STRIDE};
use bitflags::bitflags;
use log::trace;
use thiserror::Error;

bitflags! {
    /// [`PageTableEntry`] flags
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct PTEFlags: u16 {
        /// Valid
        const V = 1 << 0;
        /// Readable
        const R = 1 << 1;
        /// Writable
        const W = 1 << 2;
    }
}

bitflags! {
    /// Access rights requested for a mapping
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct MapPermission: u16 {
        /// Read access
        const R = 1 << 1;
        /// Write access
        const W = 1 << 2;
    }
}

impl MapPermission {
    /// Permission granting exactly the requested rights
    pub fn from_rw(read: bool, write: bool) -> Self {
        let mut perm = Self::empty();
        perm.set(Self::R, read);
        perm.set(Self::W, write);
        perm
    }
}

/// Frame number sits in the bits above the in-page offset width.
const PPN_SHIFT: usize = PAGE_SIZE_BITS;

/// Page Table Entry: `frame << 11 | W | R | V`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PageTableEntry {
    bits: Word,
}

impl PageTableEntry {
    /// Entry pointing at `ppn`
    pub fn new(ppn: PhysPageNum, flags: PTEFlags) -> Self {
        Self {
            bits: ((ppn.0 << PPN_SHIFT) as Word) | flags.bits(),
        }
    }

    /// An invalid entry
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Entry from its raw word
    pub fn from_bits(bits: Word) -> Self {
        Self { bits }
    }

    /// Raw word as stored in memory
    pub fn bits(self) -> Word {
        self.bits
    }

    /// Referenced frame
    pub fn ppn(self) -> PhysPageNum {
        PhysPageNum(usize::from(self.bits) >> PPN_SHIFT)
    }

    /// Flag bits
    pub fn flags(self) -> PTEFlags {
        PTEFlags::from_bits_truncate(self.bits)
    }

    /// `V` bit
    pub fn is_valid(self) -> bool {
        self.flags().contains(PTEFlags::V)
    }

    /// `R` bit
    pub fn is_readable(self) -> bool {
        self.flags().contains(PTEFlags::R)
    }

    /// `W` bit
    pub fn is_writable(self) -> bool {
        self.flags().contains(PTEFlags::W)
    }
}

/// Outcome of a failed [`PageTable::map`] or [`PageTable::unmap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// The page already has a valid entry
    #[error("page {0} is already mapped")]
    AlreadyMapped(usize),
    /// The page has no valid entry
    #[error("page {0} is not mapped")]
    NotMapped(usize),
    /// The allocator has no frame left
    #[error("no free page frames")]
    OutOfFrames,
}

/// View of one process page table inside physical memory
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PageTable {
    base: PhysAddr,
}

impl PageTable {
    /// Table slot reserved for process `pid`
    pub fn for_pid(pid: usize) -> Self {
        Self {
            base: PhysAddr(PAGE_TABLE_REGION + pid * PAGE_TABLE_STRIDE),
        }
    }

    /// Rebuilds the view from a page-table-base register value.
    pub fn from_token(ptbr: Word) -> Self {
        Self {
            base: PhysAddr(usize::from(ptbr)),
        }
    }

    /// Value to load into the page-table-base register
    pub fn token(self) -> Word {
        self.base.0 as Word
    }

    fn entry_addr(self, vpn: VirtPageNum) -> PhysAddr {
        assert!(vpn.0 < PAGE_TABLE_ENTRIES, "{vpn:?} outside of the page table");
        PhysAddr(self.base.0 + vpn.0)
    }

    /// Entry of `vpn`, valid or not
    pub fn entry(self, memory: &PhysicalMemory, vpn: VirtPageNum) -> PageTableEntry {
        PageTableEntry::from_bits(memory.read(self.entry_addr(vpn)))
    }

    fn set_entry(self, memory: &mut PhysicalMemory, vpn: VirtPageNum, pte: PageTableEntry) {
        memory.write(self.entry_addr(vpn), pte.bits());
    }

    /// Invalidates every entry; used when a fresh table is handed to a new process.
    pub fn clear(self, memory: &mut PhysicalMemory) {
        for vpn in 0..PAGE_TABLE_ENTRIES {
            self.set_entry(memory, VirtPageNum(vpn), PageTableEntry::empty());
        }
    }

    /// Maps `vpn` to a newly allocated, zeroed frame with the requested permission.
    pub fn map(
        self,
        memory: &mut PhysicalMemory,
        frames: &mut impl FrameAllocator,
        vpn: VirtPageNum,
        perm: MapPermission,
    ) -> Result<PhysPageNum, MapError> {
        if self.entry(memory, vpn).is_valid() {
            return Err(MapError::AlreadyMapped(vpn.0));
        }
        let ppn = frames.alloc().ok_or(MapError::OutOfFrames)?;
        memory.frame_mut(ppn).fill(0);
        let flags = PTEFlags::from_bits_truncate(perm.bits()) | PTEFlags::V;
        self.set_entry(memory, vpn, PageTableEntry::new(ppn, flags));
        trace!("{vpn:?} -> {ppn:?} ({flags:?}) in table {:#06x}", self.base.0);
        Ok(ppn)
    }

    /// Removes the mapping of `vpn` and returns its frame to the allocator.
    pub fn unmap(
        self,
        memory: &mut PhysicalMemory,
        frames: &mut impl FrameAllocator,
        vpn: VirtPageNum,
    ) -> Result<PhysPageNum, MapError> {
        let pte = self.entry(memory, vpn);
        if !pte.is_valid() {
            return Err(MapError::NotMapped(vpn.0));
        }
        frames.dealloc(pte.ppn());
        self.set_entry(memory, vpn, PageTableEntry::empty());
        trace!("{vpn:?} unmapped from table {:#06x}", self.base.0);
        Ok(pte.ppn())
    }

    /// The entry of `vpn` if it is valid
    pub fn translate(self, memory: &PhysicalMemory, vpn: VirtPageNum) -> Option<PageTableEntry> {
        Some(self.entry(memory, vpn)).filter(|pte| pte.is_valid())
    }

    /// Every virtual page with a valid entry, ascending
    pub fn mapped_pages(self, memory: &PhysicalMemory) -> Vec<VirtPageNum> {
        (0..PAGE_TABLE_ENTRIES)
            .map(VirtPageNum)
            .filter(|&vpn| self.entry(memory, vpn).is_valid())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mm::BitmapFrameAllocator;

    #[test]
    fn test_pte_encoding() {
        let pte = PageTableEntry::new(PhysPageNum(5), PTEFlags::V | PTEFlags::R);
        assert_eq!(pte.bits(), (5 << 11) | 0b011);
        assert_eq!(pte.ppn(), PhysPageNum(5));
        assert!(pte.is_valid() && pte.is_readable() && !pte.is_writable());
        assert!(!PageTableEntry::empty().is_valid());
    }

    #[test]
    fn test_map_twice_keeps_first_mapping() {
        let mut memory = PhysicalMemory::new();
        let mut frames = BitmapFrameAllocator::new();
        let table = PageTable::for_pid(0);
        let vpn = VirtPageNum(8);

        let ppn = table
            .map(&mut memory, &mut frames, vpn, MapPermission::R)
            .expect("first map");
        let before = table.entry(&memory, vpn);
        let free_before = frames.free_count();

        assert_eq!(
            table.map(&mut memory, &mut frames, vpn, MapPermission::R | MapPermission::W),
            Err(MapError::AlreadyMapped(8))
        );
        assert_eq!(table.entry(&memory, vpn), before);
        assert_eq!(table.entry(&memory, vpn).ppn(), ppn);
        assert!(!table.entry(&memory, vpn).is_writable());
        assert_eq!(frames.free_count(), free_before);
    }

    #[test]
    fn test_unmap_releases_frame() {
        let mut memory = PhysicalMemory::new();
        let mut frames = BitmapFrameAllocator::new();
        let table = PageTable::for_pid(3);
        let vpn = VirtPageNum(10);

        assert_eq!(
            table.unmap(&mut memory, &mut frames, vpn),
            Err(MapError::NotMapped(10))
        );
        let ppn = table
            .map(&mut memory, &mut frames, vpn, MapPermission::W)
            .expect("map");
        assert!(!frames.is_free(ppn));
        assert_eq!(table.mapped_pages(&memory), vec![vpn]);

        assert_eq!(table.unmap(&mut memory, &mut frames, vpn), Ok(ppn));
        assert!(frames.is_free(ppn));
        assert!(table.translate(&memory, vpn).is_none());
        assert!(table.mapped_pages(&memory).is_empty());
    }

    #[test]
    fn test_map_out_of_frames() {
        let mut memory = PhysicalMemory::new();
        let mut frames = BitmapFrameAllocator::new();
        while frames.alloc().is_some() {}
        let table = PageTable::for_pid(0);
        assert_eq!(
            table.map(&mut memory, &mut frames, VirtPageNum(6), MapPermission::R),
            Err(MapError::OutOfFrames)
        );
        assert!(table.translate(&memory, VirtPageNum(6)).is_none());
    }

    #[test]
    fn test_tables_do_not_overlap() {
        let mut memory = PhysicalMemory::new();
        let mut frames = BitmapFrameAllocator::new();
        let a = PageTable::for_pid(0);
        let b = PageTable::for_pid(1);
        assert_eq!(PageTable::from_token(b.token()), b);

        a.map(&mut memory, &mut frames, VirtPageNum(31), MapPermission::R)
            .expect("map");
        assert!(b.mapped_pages(&memory).is_empty());
    }
}
