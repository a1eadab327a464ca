//! Console Traps
//!
//! None of these touch the condition flags.

use crate::{
    config::Word,
    console::Console,
    cpu::R0,
    emulator::Emulator,
    mm::VirtAddr,
    trap::Fault,
};
use log::trace;

/// Returned by `GETC` and `IN` once input is exhausted
pub const EOF: Word = 0xffff;

fn r0<C: Console>(emu: &Emulator<C>) -> Word {
    emu.registers().gpr[R0]
}

fn set_r0<C: Console>(emu: &mut Emulator<C>, value: Word) {
    emu.registers_mut().gpr[R0] = value;
}

/// Reads one character into `R0`.
pub fn sys_getc<C: Console>(emu: &mut Emulator<C>) {
    let c = emu.console_mut().getc().map_or(EOF, Word::from);
    set_r0(emu, c);
}

/// Writes the low byte of `R0`.
pub fn sys_out<C: Console>(emu: &mut Emulator<C>) {
    let c = r0(emu) as u8;
    emu.console_mut().putc(c);
}

/// Writes the zero-terminated string starting at virtual address `R0`, one
/// character per word.
///
/// Every word goes through the MMU, so a string running into an unmapped or
/// write-only page faults.
pub fn sys_puts<C: Console>(emu: &mut Emulator<C>) -> Result<(), Fault> {
    let mut va = r0(emu);
    loop {
        let c = emu.read_word(VirtAddr(va))?;
        if c == 0 {
            return Ok(());
        }
        emu.console_mut().putc(c as u8);
        va = va.wrapping_add(1);
    }
}

/// [`sys_getc`] followed by an echo of the character.
pub fn sys_in<C: Console>(emu: &mut Emulator<C>) {
    sys_getc(emu);
    let c = r0(emu);
    if c != EOF {
        emu.console_mut().putc(c as u8);
    }
}

/// Packed strings are not supported.
pub fn sys_putsp<C: Console>(_emu: &mut Emulator<C>) {
    trace!("PUTSP is not implemented");
}

/// Reads an unsigned decimal into `R0`.
///
/// Leading whitespace is skipped and the first byte after the digits is
/// consumed. Values wrap at 16 bits. Without any digit `R0` is left alone.
pub fn sys_inu16<C: Console>(emu: &mut Emulator<C>) {
    if let Some(value) = read_u16(emu.console_mut()) {
        set_r0(emu, value);
    }
}

fn read_u16(console: &mut impl Console) -> Option<Word> {
    let mut c = console.getc()?;
    while c.is_ascii_whitespace() {
        c = console.getc()?;
    }

    let mut value: Option<Word> = None;
    while c.is_ascii_digit() {
        let digit = Word::from(c - b'0');
        value = Some(value.unwrap_or(0).wrapping_mul(10).wrapping_add(digit));
        match console.getc() {
            Some(next) => c = next,
            None => break,
        }
    }
    value
}

/// Writes `R0` in decimal followed by a newline.
pub fn sys_outu16<C: Console>(emu: &mut Emulator<C>) {
    let text = format!("{}\n", r0(emu));
    let console = emu.console_mut();
    for c in text.bytes() {
        console.putc(c);
    }
    console.flush();
}
