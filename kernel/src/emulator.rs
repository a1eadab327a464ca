//! The emulator context.
//!
//! Physical memory, the register file, the frame allocator and the process
//! table all belong to one [`Emulator`] value. Every component receives it
//! explicitly, so independent emulators can coexist in one host process.

use crate::{
    config::Word,
    console::{Console, StdConsole},
    cpu::Registers,
    mm::{self, AccessKind, BitmapFrameAllocator, PageTable, PhysicalMemory, VirtAddr},
    task::ProcessTable,
    trap::Fault,
};

/// Single-CPU machine running cooperative processes over paged memory
pub struct Emulator<C: Console = StdConsole> {
    pub(crate) memory: PhysicalMemory,
    pub(crate) regs: Registers,
    pub(crate) frames: BitmapFrameAllocator,
    pub(crate) processes: ProcessTable,
    pub(crate) console: C,
    pub(crate) running: bool,
}

impl<C: Console> Emulator<C> {
    /// A powered-on machine with no process loaded
    pub fn new(console: C) -> Self {
        Self {
            memory: PhysicalMemory::new(),
            regs: Registers::new(),
            frames: BitmapFrameAllocator::new(),
            processes: ProcessTable::new(),
            console,
            running: false,
        }
    }

    /// Whether the fetch-execute loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Physical memory
    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    /// Register file
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Register file, mutably
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Frame allocator state
    pub fn frames(&self) -> &BitmapFrameAllocator {
        &self.frames
    }

    /// PCB table
    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// Attached console
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Attached console, mutably
    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Page table selected by the page-table-base register
    pub fn active_page_table(&self) -> PageTable {
        PageTable::from_token(self.regs.ptbr)
    }

    /// Translates `va` through the active page table.
    pub fn translate(&self, va: VirtAddr, access: AccessKind) -> Result<mm::PhysAddr, Fault> {
        mm::translate(&self.memory, self.regs.ptbr, va, access)
    }

    /// Reads a word of the current process's address space.
    pub fn read_word(&self, va: VirtAddr) -> Result<Word, Fault> {
        let pa = self.translate(va, AccessKind::Read)?;
        Ok(self.memory.read(pa))
    }

    /// Writes a word of the current process's address space.
    pub fn write_word(&mut self, va: VirtAddr, value: Word) -> Result<(), Fault> {
        let pa = self.translate(va, AccessKind::Write)?;
        self.memory.write(pa, value);
        Ok(())
    }
}

impl Default for Emulator<StdConsole> {
    fn default() -> Self {
        Self::new(StdConsole)
    }
}
