//! Machine geometry and memory layout constants.

/// Storage unit of memory cells, registers and table entries.
pub type Word = u16;

/// Number of words in physical memory.
pub const MEMORY_WORDS: usize = 1 << 16;

/// Width of the in-page offset of an address.
pub const PAGE_SIZE_BITS: usize = 11;
/// Words per page (and per frame).
pub const PAGE_SIZE: usize = 1 << PAGE_SIZE_BITS;

/// Total number of physical frames.
pub const FRAME_COUNT: usize = MEMORY_WORDS / PAGE_SIZE;
/// Frames `0..RESERVED_FRAMES` hold OS bookkeeping and page tables and are never handed out.
pub const RESERVED_FRAMES: usize = 3;

/// Start of the page-table region (reserved frame 2).
pub const PAGE_TABLE_REGION: usize = 2 * PAGE_SIZE;
/// Distance between two consecutive per-process page tables.
pub const PAGE_TABLE_STRIDE: usize = 64;
/// Entries per page table, one per virtual page.
pub const PAGE_TABLE_ENTRIES: usize = MEMORY_WORDS / PAGE_SIZE;

/// Maximum number of processes ever created, bounded by the page-table region.
pub const MAX_PROCESSES: usize = PAGE_SIZE / PAGE_TABLE_STRIDE;

/// Virtual pages below this number always fault.
pub const RESERVED_PAGES: usize = 6;

/// First virtual page of the code segment.
pub const CODE_START_VPN: usize = RESERVED_PAGES;
/// Pages mapped for the code segment at creation.
pub const CODE_PAGES: usize = 2;
/// First virtual page of the heap segment.
pub const HEAP_START_VPN: usize = CODE_START_VPN + CODE_PAGES;
/// Pages mapped for the heap segment at creation.
pub const HEAP_INIT_PAGES: usize = 2;

/// Initial program counter of every process.
pub const PC_START: Word = 0x3000;

/// Trap vector of the first trap routine.
pub const TRAP_VECTOR_BASE: Word = 0x20;
