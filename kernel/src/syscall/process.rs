//! Process Management Traps

use crate::{
    config::{Word, RESERVED_PAGES},
    console::Console,
    cpu::R0,
    emulator::Emulator,
    mm::{MapError, MapPermission, VirtAddr, VirtPageNum},
};
use log::{info, trace, warn};

/// Terminates the current process and runs the next live one.
///
/// Stops the machine if the current process was the last one alive.
pub fn sys_halt<C: Console>(emu: &mut Emulator<C>) {
    trace!("halt requested by process {:?}", emu.processes().current());
    emu.exit_current_and_run_next();
}

/// Yields the CPU to the next live process.
pub fn sys_yield<C: Console>(emu: &mut Emulator<C>) {
    emu.suspend_current_and_run_next();
}

/// Heap resize request packed into `R0`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BrkRequest {
    /// Page to map or unmap
    pub vpn: VirtPageNum,
    /// Map when set, unmap otherwise
    pub grow: bool,
    /// Access rights of a grown page
    pub perm: MapPermission,
}

impl BrkRequest {
    /// Decodes `vpn << 11 | W << 2 | R << 1 | grow`.
    pub fn decode(word: Word) -> Self {
        Self {
            vpn: VirtAddr(word).vpn(),
            grow: word & 1 == 1,
            perm: MapPermission::from_rw((word >> 1) & 1 == 1, (word >> 2) & 1 == 1),
        }
    }

    /// Packs the request back into an `R0` value.
    pub fn encode(self) -> Word {
        VirtAddr::from(self.vpn).0
            | Word::from(self.perm.contains(MapPermission::W)) << 2
            | Word::from(self.perm.contains(MapPermission::R)) << 1
            | Word::from(self.grow)
    }
}

/// Grows or shrinks the heap of the current process by one page.
///
/// # Arguments
///
/// - `request`: the raw `R0` value, see [`BrkRequest`].
///
/// Refused requests only print a diagnostic; the process carries on with the
/// next instruction.
pub fn sys_brk<C: Console>(emu: &mut Emulator<C>, request: Word) {
    let BrkRequest { vpn, grow, perm } = BrkRequest::decode(request);
    let pid = emu.processes().current().unwrap_or_default();

    if grow {
        info!("Heap increase requested by process {pid}.");
    } else {
        info!("Heap decrease requested by process {pid}.");
    }
    if vpn.0 < RESERVED_PAGES {
        warn!(
            "Cannot resize page {} of pid {pid} since it is inside the reserved region.",
            vpn.0
        );
        return;
    }

    let result = if grow {
        emu.grow_heap(vpn, perm)
    } else {
        emu.shrink_heap(vpn)
    };
    match result {
        Ok(ppn) => trace!("heap page {} of pid {pid} now uses {ppn:?}", vpn.0),
        Err(MapError::AlreadyMapped(page)) => warn!(
            "Cannot allocate memory for page {page} of pid {pid} since it is already allocated."
        ),
        Err(MapError::OutOfFrames) => {
            warn!("Cannot allocate more space for pid {pid} since there is no free page frames.");
        }
        Err(MapError::NotMapped(page)) => {
            warn!("Cannot free memory of page {page} of pid {pid} since it is not allocated.");
        }
    }
}

/// [`sys_brk`] with the request taken from `R0`
pub(crate) fn sys_brk_from_r0<C: Console>(emu: &mut Emulator<C>) {
    let request = emu.registers().gpr[R0];
    sys_brk(emu, request);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::console::BufferConsole;
    use crate::logging::capture::{capture, warnings};
    use crate::mm::{FrameAllocator, PageTableEntry};
    use log::Level;

    fn running_emulator() -> Emulator<BufferConsole> {
        let mut emu = Emulator::new(BufferConsole::new());
        emu.create_process(&[], &[]).expect("create");
        emu.load_process(0);
        emu
    }

    fn pte(emu: &Emulator<BufferConsole>, vpn: usize) -> PageTableEntry {
        emu.active_page_table().entry(emu.memory(), VirtPageNum(vpn))
    }

    #[test]
    fn test_decode_request() {
        let req = BrkRequest::decode(0x5000 | 0b111);
        assert_eq!(req.vpn, VirtPageNum(10));
        assert!(req.grow);
        assert_eq!(req.perm, MapPermission::R | MapPermission::W);

        let req = BrkRequest::decode(0x5800 | 0b010);
        assert_eq!(req.vpn, VirtPageNum(11));
        assert!(!req.grow);
        assert_eq!(req.perm, MapPermission::R);
        assert_eq!(req.encode(), 0x5800 | 0b010);
    }

    #[test]
    fn test_grow_then_shrink() {
        let mut emu = running_emulator();
        let free = emu.frames().free_count();
        let grow = BrkRequest {
            vpn: VirtPageNum(12),
            grow: true,
            perm: MapPermission::W,
        };

        sys_brk(&mut emu, grow.encode());
        let entry = pte(&emu, 12);
        assert!(entry.is_valid() && entry.is_writable() && !entry.is_readable());
        assert_eq!(emu.frames().free_count(), free - 1);

        sys_brk(&mut emu, BrkRequest { grow: false, ..grow }.encode());
        assert!(!pte(&emu, 12).is_valid());
        assert_eq!(emu.frames().free_count(), free);
    }

    #[test]
    fn test_grow_mapped_page_is_refused() {
        let mut emu = running_emulator();
        let before = pte(&emu, 8);
        let free = emu.frames().free_count();

        // heap page 8 is mapped read/write at creation; ask for read-only
        sys_brk(&mut emu, 0x4000 | 0b011);
        assert_eq!(pte(&emu, 8), before);
        assert!(pte(&emu, 8).is_writable());
        assert_eq!(emu.frames().free_count(), free);
        assert!(emu.is_running());
    }

    #[test]
    fn test_refused_requests_keep_running() {
        let mut emu = running_emulator();
        while emu.frames.alloc().is_some() {}

        // out of frames
        sys_brk(&mut emu, 0xf800 | 0b111);
        assert!(!pte(&emu, 31).is_valid());
        // shrinking an unmapped page
        sys_brk(&mut emu, 0xf800);
        // reserved region
        sys_brk(&mut emu, 0b111);
        assert!(!pte(&emu, 0).is_valid());

        assert!(emu.is_running());
        assert_eq!(emu.processes().current(), Some(0));
    }

    #[test]
    fn test_refused_requests_log_warnings() {
        let mut emu = Emulator::new(BufferConsole::new());
        emu.create_process(&[], &[]).expect("create");
        emu.create_process(&[], &[]).expect("create");
        emu.load_process(1);

        let records = capture(|| sys_brk(&mut emu, 0x4000 | 0b011));
        assert!(records.contains(&(
            Level::Info,
            "Heap increase requested by process 1.".to_string()
        )));
        assert_eq!(
            warnings(&records),
            ["Cannot allocate memory for page 8 of pid 1 since it is already allocated."]
        );

        let records = capture(|| sys_brk(&mut emu, 0xf800));
        assert!(records.contains(&(
            Level::Info,
            "Heap decrease requested by process 1.".to_string()
        )));
        assert_eq!(
            warnings(&records),
            ["Cannot free memory of page 31 of pid 1 since it is not allocated."]
        );

        let records = capture(|| sys_brk(&mut emu, 0x0800 | 0b111));
        assert_eq!(
            warnings(&records),
            ["Cannot resize page 1 of pid 1 since it is inside the reserved region."]
        );

        while emu.frames.alloc().is_some() {}
        let records = capture(|| sys_brk(&mut emu, 0xf800 | 0b111));
        assert_eq!(
            warnings(&records),
            ["Cannot allocate more space for pid 1 since there is no free page frames."]
        );
    }

    #[test]
    fn test_granted_request_logs_no_warning() {
        let mut emu = running_emulator();
        let records = capture(|| sys_brk(&mut emu, 0x5000 | 0b111));
        assert!(warnings(&records).is_empty());
        assert!(pte(&emu, 10).is_valid());
    }
}
