//! Trap Handling Module
//!
//! - The `TRAP` instruction carries an 8-bit vector.
//! - Vectors `0x20..=0x29` are decoded into a [`TrapCode`] and handed to
//!   [`syscall`].
//! - Anything a process cannot recover from is reported as a [`Fault`], which
//!   ends the whole run.

use crate::{
    config::{Word, TRAP_VECTOR_BASE},
    console::Console,
    emulator::Emulator,
    mm::AccessKind,
    syscall::syscall,
};
use log::{debug, error};
use thiserror::Error;

/// Fatal condition raised while executing a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// Address below the first usable page
    #[error("segmentation fault at {0:#06x}: address inside the reserved region")]
    ReservedRegion(Word),
    /// Page without a valid entry
    #[error("segmentation fault inside free space at {0:#06x}")]
    UnmappedAccess(Word),
    /// Page lacks the right for the access
    #[error("{msg} at {0:#06x}", msg = .1.violation())]
    PermissionViolation(Word, AccessKind),
    /// `TRAP` vector without a routine
    #[error("illegal trap vector {0:#04x}")]
    IllegalTrap(u8),
}

/// Trap routines reachable through the `TRAP` instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCode {
    /// Read a character into `R0`
    Getc,
    /// Write the character in `R0`
    Out,
    /// Write the string at `R0`
    Puts,
    /// Read and echo a character
    In,
    /// Write a packed string, unsupported
    Putsp,
    /// Terminate the process
    Halt,
    /// Read a decimal into `R0`
    InU16,
    /// Write `R0` in decimal
    OutU16,
    /// Give the CPU to the next process
    Yield,
    /// Grow or shrink the heap
    Brk,
}

impl TrapCode {
    const TABLE: [TrapCode; 10] = [
        Self::Getc,
        Self::Out,
        Self::Puts,
        Self::In,
        Self::Putsp,
        Self::Halt,
        Self::InU16,
        Self::OutU16,
        Self::Yield,
        Self::Brk,
    ];

    /// Decodes a trap vector, `None` for vectors without a routine.
    pub fn from_vector(vector: u8) -> Option<Self> {
        let index = Word::from(vector).checked_sub(TRAP_VECTOR_BASE)?;
        Self::TABLE.get(usize::from(index)).copied()
    }

    /// Trap vector of this routine
    pub fn vector(self) -> u8 {
        let index = Self::TABLE
            .iter()
            .position(|&code| code == self)
            .unwrap_or_default();
        (TRAP_VECTOR_BASE as usize + index) as u8
    }
}

impl<C: Console> Emulator<C> {
    /// Handles a `TRAP` instruction issued by the current process.
    pub fn trap(&mut self, vector: u8) -> Result<(), Fault> {
        let Some(code) = TrapCode::from_vector(vector) else {
            error!(
                "illegal trap {vector:#04x} in process {:?}, pc = {:#06x}",
                self.processes().current(),
                self.registers().pc
            );
            return Err(Fault::IllegalTrap(vector));
        };
        debug!("trap {code:?} from process {:?}", self.processes().current());
        syscall(self, code)
    }
}
