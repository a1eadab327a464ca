//! # Process Management
//!
//! Processes are cooperative: the CPU only changes hands when the running
//! process yields or halts. The next process is the first live pid after the
//! current one in ascending, wrap-around order.
//!
//! State machine of a process, see [`ProcessStatus`]:
//! `Ready -> Running -> (Ready <-> Running) -> Terminated`.

mod manager;
mod pcb;

pub use manager::ProcessTable;
pub use pcb::{ProcessControlBlock, ProcessStatus};

use crate::{
    config::{Word, CODE_PAGES, CODE_START_VPN, HEAP_INIT_PAGES, HEAP_START_VPN, PAGE_SIZE},
    console::Console,
    emulator::Emulator,
    mm::{MapError, MapPermission, PageTable, PhysPageNum, VirtPageNum},
};
use core::fmt;
use log::{debug, info, trace, warn};
use thiserror::Error;

/// Segment of a new process
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Segment {
    /// Read-only code pages
    Code,
    /// Read/write heap pages
    Heap,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => f.write_str("code"),
            Self::Heap => f.write_str("heap"),
        }
    }
}

/// Why a process could not be created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreateError {
    /// Every PCB slot is taken
    #[error("the PCB table is full, cannot create a new process")]
    PcbTableFull,
    /// A segment could not get all of its frames
    #[error("no free page frames for the {0} segment")]
    OutOfFrames(Segment),
}

impl<C: Console> Emulator<C> {
    /// Creates a process from a code image and a heap image.
    ///
    /// Either every page of both segments is mapped and loaded, or nothing is:
    /// on failure all frames taken so far are released and the PCB slot stays
    /// free for the next attempt.
    pub fn create_process(&mut self, code: &[Word], heap: &[Word]) -> Result<usize, CreateError> {
        if self.processes.is_full() {
            warn!("Cannot create a new process: the PCB table is full.");
            return Err(CreateError::PcbTableFull);
        }

        let pcb = ProcessControlBlock::new(self.processes.next_pid());
        let table = pcb.page_table();
        table.clear(&mut self.memory);

        let mapped = self
            .map_segment(table, Segment::Code, CODE_START_VPN, CODE_PAGES, MapPermission::R, code)
            .and_then(|()| {
                self.map_segment(
                    table,
                    Segment::Heap,
                    HEAP_START_VPN,
                    HEAP_INIT_PAGES,
                    MapPermission::R | MapPermission::W,
                    heap,
                )
            });
        if let Err(err) = mapped {
            warn!("Cannot create process {}: {err}.", pcb.pid);
            self.release_pages(table);
            return Err(err);
        }

        let pid = pcb.pid;
        self.processes.push(pcb);
        info!("Process {pid} created.");
        Ok(pid)
    }

    /// Maps `pages` consecutive pages from `start_vpn` and copies `image` into
    /// them one page-sized chunk at a time.
    fn map_segment(
        &mut self,
        table: PageTable,
        segment: Segment,
        start_vpn: usize,
        pages: usize,
        perm: MapPermission,
        image: &[Word],
    ) -> Result<(), CreateError> {
        let mut frames = Vec::with_capacity(pages);
        for vpn in start_vpn..start_vpn + pages {
            let ppn = table
                .map(&mut self.memory, &mut self.frames, VirtPageNum(vpn), perm)
                .map_err(|_| CreateError::OutOfFrames(segment))?;
            frames.push(ppn);
        }

        if image.len() > pages * PAGE_SIZE {
            debug!(
                "{segment} image of {} words truncated to {} pages",
                image.len(),
                pages
            );
        }
        for (chunk, &ppn) in image.chunks(PAGE_SIZE).zip(&frames) {
            self.memory.frame_mut(ppn)[..chunk.len()].copy_from_slice(chunk);
        }
        Ok(())
    }

    /// Unmaps every valid page of `table`.
    fn release_pages(&mut self, table: PageTable) {
        for vpn in table.mapped_pages(&self.memory) {
            if let Ok(ppn) = table.unmap(&mut self.memory, &mut self.frames, vpn) {
                trace!("{vpn:?} released {ppn:?}");
            }
        }
    }

    /// Makes `pid` the current process and restores its context into the CPU.
    ///
    /// `pid` must name an existing, non-terminated process.
    pub fn load_process(&mut self, pid: usize) {
        let pcb = self
            .processes
            .get_mut(pid)
            .unwrap_or_else(|| panic!("cannot load unknown process {pid}"));
        assert!(!pcb.is_terminated(), "cannot load terminated process {pid}");
        pcb.status = ProcessStatus::Running;
        self.regs.pc = pcb.pc;
        self.regs.ptbr = pcb.ptbr;
        self.processes.set_current(Some(pid));
        self.running = true;
    }

    /// Saves the current context and hands the CPU to the next live process,
    /// which may be the current one again.
    pub fn suspend_current_and_run_next(&mut self) {
        let Some(current) = self.processes.current() else {
            return;
        };
        if let Some(pcb) = self.processes.get_mut(current) {
            pcb.pc = self.regs.pc;
            pcb.ptbr = self.regs.ptbr;
            pcb.status = ProcessStatus::Ready;
        }

        let next = self.processes.next_live_after(current).unwrap_or(current);
        if next != current {
            info!("We are switching from process {current} to {next}.");
        }
        self.load_process(next);
    }

    /// Releases every page of the current process, terminates it and runs the
    /// next live process. Stops the machine when none is left.
    pub fn exit_current_and_run_next(&mut self) {
        let Some(current) = self.processes.current() else {
            return;
        };
        let Some(pcb) = self.processes.get_mut(current) else {
            return;
        };
        pcb.status = ProcessStatus::Terminated;
        let table = pcb.page_table();
        self.release_pages(table);
        info!("Process {current} halted.");

        if let Some(next) = self.processes.next_live_after(current) {
            info!("We are switching from process {current} to {next}.");
            self.load_process(next);
        } else {
            info!("No process left to run.");
            self.processes.set_current(None);
            self.running = false;
        }
    }

    /// Maps `vpn` into the current address space.
    pub fn grow_heap(&mut self, vpn: VirtPageNum, perm: MapPermission) -> Result<PhysPageNum, MapError> {
        self.active_page_table()
            .map(&mut self.memory, &mut self.frames, vpn, perm)
    }

    /// Unmaps `vpn` from the current address space.
    pub fn shrink_heap(&mut self, vpn: VirtPageNum) -> Result<PhysPageNum, MapError> {
        self.active_page_table()
            .unmap(&mut self.memory, &mut self.frames, vpn)
    }
}
