//! Implementation of [`FrameAllocator`] over a free-frame bitmap.

use super::PhysPageNum;
use crate::config::{FRAME_COUNT, RESERVED_FRAMES};
use core::fmt::{self, Debug, Formatter};
use log::trace;

/// One bit per frame, a set bit marks a free frame
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct FrameBitmap(u32);

impl FrameBitmap {
    /// Bitmap with every frame in use
    pub const fn full() -> Self {
        Self(0)
    }

    /// Whether `frame` exists and is free
    pub fn is_free(self, frame: usize) -> bool {
        frame < FRAME_COUNT && self.0 & (1 << frame) != 0
    }

    /// Marks `frame` free
    pub fn set_free(&mut self, frame: usize) {
        self.0 |= 1 << frame;
    }

    /// Marks `frame` used
    pub fn set_used(&mut self, frame: usize) {
        self.0 &= !(1 << frame);
    }

    /// Number of free frames
    pub fn count_free(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Lowest free frame at or above `from`
    pub fn first_free_from(self, from: usize) -> Option<usize> {
        (from..FRAME_COUNT).find(|&frame| self.is_free(frame))
    }
}

impl Debug for FrameBitmap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("FrameBitmap:{:#034b}", self.0))
    }
}

/// Source of physical frames for page mapping
pub trait FrameAllocator {
    /// Takes a free frame, `None` when every frame is in use.
    fn alloc(&mut self) -> Option<PhysPageNum>;
    /// Returns `ppn` to the free set.
    fn dealloc(&mut self, ppn: PhysPageNum);
}

/// First-fit allocator over the assignable frames
pub struct BitmapFrameAllocator {
    bitmap: FrameBitmap,
}

impl BitmapFrameAllocator {
    /// Every frame from [`RESERVED_FRAMES`] upwards starts free
    pub fn new() -> Self {
        let mut bitmap = FrameBitmap::full();
        for frame in RESERVED_FRAMES..FRAME_COUNT {
            bitmap.set_free(frame);
        }
        Self { bitmap }
    }

    /// Whether `ppn` is free
    pub fn is_free(&self, ppn: PhysPageNum) -> bool {
        self.bitmap.is_free(ppn.0)
    }

    /// Number of frames left to hand out
    pub fn free_count(&self) -> usize {
        self.bitmap.count_free()
    }

    /// Snapshot of the free set
    pub fn bitmap(&self) -> FrameBitmap {
        self.bitmap
    }
}

impl Default for BitmapFrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAllocator for BitmapFrameAllocator {
    fn alloc(&mut self) -> Option<PhysPageNum> {
        let frame = self.bitmap.first_free_from(RESERVED_FRAMES)?;
        self.bitmap.set_used(frame);
        trace!("frame {frame} allocated");
        Some(PhysPageNum(frame))
    }

    /// No double-free detection here; page tables guarantee single ownership.
    fn dealloc(&mut self, ppn: PhysPageNum) {
        if (RESERVED_FRAMES..FRAME_COUNT).contains(&ppn.0) {
            self.bitmap.set_free(ppn.0);
            trace!("frame {} freed", ppn.0);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_frame_allocator() {
        let mut allocator = BitmapFrameAllocator::new();
        let start = RESERVED_FRAMES;
        assert_eq!(allocator.free_count(), FRAME_COUNT - RESERVED_FRAMES);

        let f1 = allocator.alloc().expect("No space");
        assert_eq!(f1, PhysPageNum(start), "Wrong frame allocated");

        let f2 = allocator.alloc().expect("No space");
        assert_eq!(f2, PhysPageNum(start + 1), "Wrong frame allocated");
        assert!(!allocator.is_free(f1) && !allocator.is_free(f2));

        allocator.dealloc(f1);
        assert!(allocator.is_free(f1), "Dealloc error");
        let f3 = allocator.alloc().expect("No space");
        assert_eq!(f3, f1, "First fit should hand back the lowest free frame");
    }

    #[test]
    fn test_alloc_free_alloc_returns_same_frame() {
        let mut allocator = BitmapFrameAllocator::new();
        for _ in 0..5 {
            allocator.alloc().expect("No space");
        }
        let f = allocator.alloc().expect("No space");
        allocator.dealloc(f);
        assert_eq!(allocator.alloc(), Some(f));
    }

    #[test]
    fn test_exhaustion() {
        let mut allocator = BitmapFrameAllocator::new();
        let frames: Vec<_> = core::iter::from_fn(|| allocator.alloc()).collect();
        assert_eq!(frames.len(), FRAME_COUNT - RESERVED_FRAMES);
        assert_eq!(frames.first(), Some(&PhysPageNum(RESERVED_FRAMES)));
        assert_eq!(frames.last(), Some(&PhysPageNum(FRAME_COUNT - 1)));
        assert_eq!(allocator.alloc(), None);
        assert_eq!(allocator.free_count(), 0);
    }

    #[test]
    fn test_reserved_frames_stay_reserved() {
        let mut allocator = BitmapFrameAllocator::new();
        for frame in 0..RESERVED_FRAMES {
            allocator.dealloc(PhysPageNum(frame));
            assert!(!allocator.is_free(PhysPageNum(frame)));
        }

        let mut rng = rand::thread_rng();
        let mut held: Vec<PhysPageNum> = Vec::new();
        for _ in 0..2000 {
            if held.is_empty() || rng.gen_bool(0.6) {
                if let Some(ppn) = allocator.alloc() {
                    assert!(ppn.0 >= RESERVED_FRAMES, "reserved frame {ppn:?} handed out");
                    assert!(!held.contains(&ppn), "frame {ppn:?} handed out twice");
                    held.push(ppn);
                }
            } else {
                let ppn = held.swap_remove(rng.gen_range(0..held.len()));
                allocator.dealloc(ppn);
            }
            assert_eq!(allocator.free_count() + held.len(), FRAME_COUNT - RESERVED_FRAMES);
        }
    }
}
