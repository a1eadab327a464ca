//! Implementation of [`ProcessControlBlock`]

use crate::config::{Word, PC_START};
use crate::mm::PageTable;

/// Scheduling state of a process
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ProcessStatus {
    /// Runnable, waiting to be selected
    Ready,
    /// Owns the CPU
    Running,
    /// Halted; the slot is kept but never scheduled again
    Terminated,
}

/// Identity and saved execution context of one process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessControlBlock {
    /// Slot index in the PCB table
    pub pid: usize,
    /// Program counter saved at the last switch
    pub pc: Word,
    /// Page-table-base saved at the last switch
    pub ptbr: Word,
    /// Scheduling state
    pub status: ProcessStatus,
}

impl ProcessControlBlock {
    /// A ready process that starts at [`PC_START`] with its own page table
    pub fn new(pid: usize) -> Self {
        Self {
            pid,
            pc: PC_START,
            ptbr: PageTable::for_pid(pid).token(),
            status: ProcessStatus::Ready,
        }
    }

    /// Whether the process has halted
    pub fn is_terminated(&self) -> bool {
        self.status == ProcessStatus::Terminated
    }

    /// Page table slot of this process
    pub fn page_table(&self) -> PageTable {
        PageTable::for_pid(self.pid)
    }
}
