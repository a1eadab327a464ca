//! Trap routines
//!
//! [`syscall`] dispatches a decoded [`TrapCode`] to its `sys_*` routine.
//! Arguments and results travel in `R0`.

mod console;
mod process;

pub use console::EOF;
pub use process::BrkRequest;

use crate::{console::Console, emulator::Emulator, trap::{Fault, TrapCode}};
use console::{sys_getc, sys_in, sys_inu16, sys_out, sys_outu16, sys_puts, sys_putsp};
use process::{sys_brk_from_r0, sys_halt, sys_yield};

/// Runs the routine of `code` on behalf of the current process.
///
/// Only [`TrapCode::Puts`] can fault, when the string leaves the address
/// space of the process.
pub fn syscall<C: Console>(emu: &mut Emulator<C>, code: TrapCode) -> Result<(), Fault> {
    match code {
        TrapCode::Getc => sys_getc(emu),
        TrapCode::Out => sys_out(emu),
        TrapCode::Puts => sys_puts(emu)?,
        TrapCode::In => sys_in(emu),
        TrapCode::Putsp => sys_putsp(emu),
        TrapCode::Halt => sys_halt(emu),
        TrapCode::InU16 => sys_inu16(emu),
        TrapCode::OutU16 => sys_outu16(emu),
        TrapCode::Yield => sys_yield(emu),
        TrapCode::Brk => sys_brk_from_r0(emu),
    }
    Ok(())
}
