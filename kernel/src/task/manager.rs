//! Implementation of [`ProcessTable`]

use super::pcb::{ProcessControlBlock, ProcessStatus};
use crate::config::MAX_PROCESSES;

/// Fixed-capacity PCB table plus the active-process marker.
///
/// Slots are handed out in creation order and never reused, so a pid is
/// simply the slot index.
pub struct ProcessTable {
    pcbs: Vec<ProcessControlBlock>,
    current: Option<usize>,
}

/// A round-robin scheduler over ascending pids
impl ProcessTable {
    /// An empty table
    pub fn new() -> Self {
        Self {
            pcbs: Vec::with_capacity(MAX_PROCESSES),
            current: None,
        }
    }

    /// Number of processes ever created, terminated ones included
    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    /// Whether no process was ever created
    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    /// Whether every slot is taken
    pub fn is_full(&self) -> bool {
        self.pcbs.len() >= MAX_PROCESSES
    }

    /// Pid the next successful creation will receive
    pub fn next_pid(&self) -> usize {
        self.pcbs.len()
    }

    /// Appends `pcb`, whose pid must be [`Self::next_pid`].
    pub fn push(&mut self, pcb: ProcessControlBlock) {
        assert_eq!(pcb.pid, self.next_pid(), "pcb slots are allocated in order");
        self.pcbs.push(pcb);
    }

    /// PCB of `pid`
    pub fn get(&self, pid: usize) -> Option<&ProcessControlBlock> {
        self.pcbs.get(pid)
    }

    /// PCB of `pid`, mutably
    pub fn get_mut(&mut self, pid: usize) -> Option<&mut ProcessControlBlock> {
        self.pcbs.get_mut(pid)
    }

    /// Every PCB in pid order
    pub fn iter(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.pcbs.iter()
    }

    /// Pid of the process owning the CPU
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub(crate) fn set_current(&mut self, pid: Option<usize>) {
        self.current = pid;
    }

    /// Status of `pid`
    pub fn status(&self, pid: usize) -> Option<ProcessStatus> {
        self.get(pid).map(|pcb| pcb.status)
    }

    /// Number of processes that have not terminated
    pub fn live_count(&self) -> usize {
        self.pcbs.iter().filter(|pcb| !pcb.is_terminated()).count()
    }

    /// First non-terminated pid after `pid` in cyclic order, never `pid` itself
    pub fn next_live_after(&self, pid: usize) -> Option<usize> {
        let count = self.pcbs.len();
        (1..count)
            .map(|step| (pid + step) % count)
            .find(|&next| !self.pcbs[next].is_terminated())
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table_with(count: usize) -> ProcessTable {
        let mut table = ProcessTable::new();
        for pid in 0..count {
            table.push(ProcessControlBlock::new(pid));
        }
        table
    }

    fn terminate(table: &mut ProcessTable, pid: usize) {
        table.get_mut(pid).expect("pcb").status = ProcessStatus::Terminated;
    }

    #[test]
    fn test_next_live_wraps_around() {
        let mut table = table_with(4);
        assert_eq!(table.next_live_after(0), Some(1));
        assert_eq!(table.next_live_after(3), Some(0));

        terminate(&mut table, 0);
        terminate(&mut table, 1);
        assert_eq!(table.next_live_after(3), Some(2));
        assert_eq!(table.next_live_after(2), Some(3));
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn test_next_live_excludes_self() {
        let mut table = table_with(3);
        terminate(&mut table, 0);
        terminate(&mut table, 2);
        assert_eq!(table.next_live_after(1), None);
        assert_eq!(table_with(1).next_live_after(0), None);
        assert_eq!(table_with(0).next_live_after(0), None);
    }

    #[test]
    fn test_capacity() {
        let table = table_with(MAX_PROCESSES);
        assert!(table.is_full());
        assert_eq!(table.next_pid(), MAX_PROCESSES);
        assert!(!table_with(MAX_PROCESSES - 1).is_full());
    }
}
