//! The single physical memory array shared by the OS and every process.

use super::{PhysAddr, PhysPageNum};
use crate::config::{Word, MEMORY_WORDS, PAGE_SIZE};

/// Flat array of [`MEMORY_WORDS`] words
pub struct PhysicalMemory {
    data: Box<[Word]>,
}

impl PhysicalMemory {
    /// Creates a zeroed memory
    pub fn new() -> Self {
        Self {
            data: vec![0; MEMORY_WORDS].into_boxed_slice(),
        }
    }

    /// Reads the word at `pa`.
    #[inline]
    pub fn read(&self, pa: PhysAddr) -> Word {
        self.data[pa.0]
    }

    /// Writes `value` at `pa`.
    #[inline]
    pub fn write(&mut self, pa: PhysAddr, value: Word) {
        self.data[pa.0] = value;
    }

    /// The words of one frame
    pub fn frame(&self, ppn: PhysPageNum) -> &[Word] {
        let start = ppn.addr_at(0).0;
        &self.data[start..start + PAGE_SIZE]
    }

    /// The words of one frame, mutably
    pub fn frame_mut(&mut self, ppn: PhysPageNum) -> &mut [Word] {
        let start = ppn.addr_at(0).0;
        &mut self.data[start..start + PAGE_SIZE]
    }
}

impl Default for PhysicalMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut memory = PhysicalMemory::new();
        assert_eq!(memory.read(PhysAddr(0)), 0);
        assert_eq!(memory.read(PhysAddr(MEMORY_WORDS - 1)), 0);

        memory.write(PhysAddr(PAGE_SIZE * 4 + 1), 0xbeef);
        assert_eq!(memory.frame(PhysPageNum(4))[1], 0xbeef);

        memory.frame_mut(PhysPageNum(5)).fill(7);
        assert_eq!(memory.read(PhysAddr(PAGE_SIZE * 5)), 7);
        assert_eq!(memory.read(PhysAddr(PAGE_SIZE * 6 - 1)), 7);
        assert_eq!(memory.read(PhysAddr(PAGE_SIZE * 6)), 0);
    }
}
