//! # CPU
//!
//! Register file and the fetch-execute cycle. Instruction decoding lives in
//! [`inst`]; every fetch, load and store goes through the address translator.

mod inst;

pub use inst::{Instruction, Opcode};

use crate::config::Word;
use bitflags::bitflags;

bitflags! {
    /// Condition flags set by value-producing instructions
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
    pub struct CondFlags: Word {
        /// Positive
        const P = 1 << 0;
        /// Zero
        const Z = 1 << 1;
        /// Negative
        const N = 1 << 2;
    }
}

impl CondFlags {
    /// Flags describing `value` as a signed 16-bit number
    pub fn of(value: Word) -> Self {
        if value == 0 {
            Self::Z
        } else if value >> 15 == 1 {
            Self::N
        } else {
            Self::P
        }
    }
}

/// General purpose register used for trap arguments and results
pub const R0: usize = 0;
/// Link register written by `JSR`
pub const R7: usize = 7;

/// Physical register file shared by all processes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    /// `R0` to `R7`
    pub gpr: [Word; 8],
    /// Program counter
    pub pc: Word,
    /// Condition flags of the last value written
    pub cond: CondFlags,
    /// Page table base of the process being executed
    pub ptbr: Word,
}

impl Registers {
    /// Zeroed register file
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a general purpose register and updates the condition flags.
    pub fn set_with_flags(&mut self, r: usize, value: Word) {
        self.gpr[r] = value;
        self.cond = CondFlags::of(value);
    }
}
