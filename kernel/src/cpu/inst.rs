//! Instruction encoding and the fetch-execute cycle.
//!
//! 16-bit instructions, opcode in bits 15..12:
//! `BR ADD LD ST JSR AND LDR STR RTI NOT LDI STI JMP RES LEA TRAP`.

use super::{CondFlags, R7};
use crate::{config::Word, console::Console, emulator::Emulator, mm::VirtAddr, trap::Fault};
use log::trace;

/// Operation selected by the top four bits of an instruction
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Opcode {
    /// Conditional branch
    Br,
    /// Addition
    Add,
    /// PC-relative load
    Ld,
    /// PC-relative store
    St,
    /// Subroutine call
    Jsr,
    /// Bitwise and
    And,
    /// Base+offset load
    Ldr,
    /// Base+offset store
    Str,
    /// Return from interrupt, unused
    Rti,
    /// Bitwise not
    Not,
    /// Indirect load
    Ldi,
    /// Indirect store
    Sti,
    /// Jump to register
    Jmp,
    /// Reserved
    Res,
    /// Load effective address
    Lea,
    /// Trap routine call
    Trap,
}

impl Opcode {
    const TABLE: [Opcode; 16] = [
        Self::Br,
        Self::Add,
        Self::Ld,
        Self::St,
        Self::Jsr,
        Self::And,
        Self::Ldr,
        Self::Str,
        Self::Rti,
        Self::Not,
        Self::Ldi,
        Self::Sti,
        Self::Jmp,
        Self::Res,
        Self::Lea,
        Self::Trap,
    ];

    fn bits(self) -> Word {
        Self::TABLE.iter().position(|&op| op == self).unwrap_or_default() as Word
    }
}

/// Sign-extends the low `bits` bits of `n`.
fn sext(n: Word, bits: u32) -> Word {
    let n = n & ((1 << bits) - 1);
    if (n >> (bits - 1)) & 1 == 1 {
        n | (0xffff << bits)
    } else {
        n
    }
}

/// Truncates a signed immediate to a `bits`-wide field.
fn field(imm: i16, bits: u32) -> Word {
    (imm as Word) & ((1 << bits) - 1)
}

/// A raw instruction word
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Instruction(pub Word);

impl Instruction {
    /// Opcode in the top four bits
    pub fn opcode(self) -> Opcode {
        Opcode::TABLE[usize::from(self.0 >> 12)]
    }

    fn dr(self) -> usize {
        usize::from((self.0 >> 9) & 0x7)
    }

    fn sr1(self) -> usize {
        usize::from((self.0 >> 6) & 0x7)
    }

    fn sr2(self) -> usize {
        usize::from(self.0 & 0x7)
    }

    fn is_imm(self) -> bool {
        (self.0 >> 5) & 1 == 1
    }

    fn imm5(self) -> Word {
        sext(self.0, 5)
    }

    fn cond(self) -> CondFlags {
        CondFlags::from_bits_truncate((self.0 >> 9) & 0x7)
    }

    fn off6(self) -> Word {
        sext(self.0, 6)
    }

    fn off9(self) -> Word {
        sext(self.0, 9)
    }

    fn off11(self) -> Word {
        sext(self.0, 11)
    }

    fn is_long(self) -> bool {
        (self.0 >> 11) & 1 == 1
    }

    fn trap_vector(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    fn encode(op: Opcode, operands: Word) -> Self {
        Self(op.bits() << 12 | operands)
    }

    fn reg(r: usize) -> Word {
        (r & 0x7) as Word
    }

    /// `BR` on any of `cond`, `pc += off9`
    pub fn br(cond: CondFlags, off9: i16) -> Self {
        Self::encode(Opcode::Br, cond.bits() << 9 | field(off9, 9))
    }

    /// `ADD dr, sr1, sr2`
    pub fn add(dr: usize, sr1: usize, sr2: usize) -> Self {
        Self::encode(Opcode::Add, Self::reg(dr) << 9 | Self::reg(sr1) << 6 | Self::reg(sr2))
    }

    /// `ADD dr, sr1, #imm5`
    pub fn add_imm(dr: usize, sr1: usize, imm5: i16) -> Self {
        Self::encode(
            Opcode::Add,
            Self::reg(dr) << 9 | Self::reg(sr1) << 6 | 1 << 5 | field(imm5, 5),
        )
    }

    /// `AND dr, sr1, sr2`
    pub fn and(dr: usize, sr1: usize, sr2: usize) -> Self {
        Self::encode(Opcode::And, Self::reg(dr) << 9 | Self::reg(sr1) << 6 | Self::reg(sr2))
    }

    /// `AND dr, sr1, #imm5`
    pub fn and_imm(dr: usize, sr1: usize, imm5: i16) -> Self {
        Self::encode(
            Opcode::And,
            Self::reg(dr) << 9 | Self::reg(sr1) << 6 | 1 << 5 | field(imm5, 5),
        )
    }

    /// `NOT dr, sr`
    pub fn not(dr: usize, sr: usize) -> Self {
        Self::encode(Opcode::Not, Self::reg(dr) << 9 | Self::reg(sr) << 6 | 0x3f)
    }

    /// `LD dr, pc + off9`
    pub fn ld(dr: usize, off9: i16) -> Self {
        Self::encode(Opcode::Ld, Self::reg(dr) << 9 | field(off9, 9))
    }

    /// `LDI dr, [pc + off9]`
    pub fn ldi(dr: usize, off9: i16) -> Self {
        Self::encode(Opcode::Ldi, Self::reg(dr) << 9 | field(off9, 9))
    }

    /// `LDR dr, base + off6`
    pub fn ldr(dr: usize, base: usize, off6: i16) -> Self {
        Self::encode(Opcode::Ldr, Self::reg(dr) << 9 | Self::reg(base) << 6 | field(off6, 6))
    }

    /// `LEA dr, pc + off9`
    pub fn lea(dr: usize, off9: i16) -> Self {
        Self::encode(Opcode::Lea, Self::reg(dr) << 9 | field(off9, 9))
    }

    /// `ST sr, pc + off9`
    pub fn st(sr: usize, off9: i16) -> Self {
        Self::encode(Opcode::St, Self::reg(sr) << 9 | field(off9, 9))
    }

    /// `STI sr, [pc + off9]`
    pub fn sti(sr: usize, off9: i16) -> Self {
        Self::encode(Opcode::Sti, Self::reg(sr) << 9 | field(off9, 9))
    }

    /// `STR sr, base + off6`
    pub fn str(sr: usize, base: usize, off6: i16) -> Self {
        Self::encode(Opcode::Str, Self::reg(sr) << 9 | Self::reg(base) << 6 | field(off6, 6))
    }

    /// `JMP base`
    pub fn jmp(base: usize) -> Self {
        Self::encode(Opcode::Jmp, Self::reg(base) << 6)
    }

    /// `JSR pc + off11`
    pub fn jsr(off11: i16) -> Self {
        Self::encode(Opcode::Jsr, 1 << 11 | field(off11, 11))
    }

    /// `JSRR base`
    pub fn jsrr(base: usize) -> Self {
        Self::encode(Opcode::Jsr, Self::reg(base) << 6)
    }

    /// `TRAP vector`
    pub fn trap(vector: u8) -> Self {
        Self::encode(Opcode::Trap, Word::from(vector))
    }
}

impl<C: Console> Emulator<C> {
    /// Fetches and executes one instruction of the current process.
    pub fn step(&mut self) -> Result<(), Fault> {
        let pc = self.regs.pc;
        self.regs.pc = pc.wrapping_add(1);
        let inst = Instruction(self.read_word(VirtAddr(pc))?);
        trace!("{pc:#06x}: {:?} {:#06x}", inst.opcode(), inst.0);
        self.execute(inst)
    }

    /// Runs until no live process remains or a fault occurs.
    pub fn run(&mut self) -> Result<(), Fault> {
        while self.is_running() {
            self.step()?;
        }
        Ok(())
    }

    fn execute(&mut self, inst: Instruction) -> Result<(), Fault> {
        let regs = &mut self.regs;
        match inst.opcode() {
            Opcode::Br => {
                if regs.cond.intersects(inst.cond()) {
                    regs.pc = regs.pc.wrapping_add(inst.off9());
                }
            }
            Opcode::Add | Opcode::And => {
                let lhs = regs.gpr[inst.sr1()];
                let rhs = if inst.is_imm() {
                    inst.imm5()
                } else {
                    regs.gpr[inst.sr2()]
                };
                let value = if inst.opcode() == Opcode::Add {
                    lhs.wrapping_add(rhs)
                } else {
                    lhs & rhs
                };
                regs.set_with_flags(inst.dr(), value);
            }
            Opcode::Not => {
                let value = !regs.gpr[inst.sr1()];
                regs.set_with_flags(inst.dr(), value);
            }
            Opcode::Lea => {
                let value = regs.pc.wrapping_add(inst.off9());
                regs.set_with_flags(inst.dr(), value);
            }
            Opcode::Jmp => regs.pc = regs.gpr[inst.sr1()],
            Opcode::Jsr => {
                regs.gpr[R7] = regs.pc;
                regs.pc = if inst.is_long() {
                    regs.pc.wrapping_add(inst.off11())
                } else {
                    regs.gpr[inst.sr1()]
                };
            }
            Opcode::Ld => {
                let addr = regs.pc.wrapping_add(inst.off9());
                let value = self.read_word(VirtAddr(addr))?;
                self.regs.set_with_flags(inst.dr(), value);
            }
            Opcode::Ldr => {
                let addr = regs.gpr[inst.sr1()].wrapping_add(inst.off6());
                let value = self.read_word(VirtAddr(addr))?;
                self.regs.set_with_flags(inst.dr(), value);
            }
            Opcode::Ldi => {
                let addr = regs.pc.wrapping_add(inst.off9());
                let pointer = self.read_word(VirtAddr(addr))?;
                let value = self.read_word(VirtAddr(pointer))?;
                self.regs.set_with_flags(inst.dr(), value);
            }
            Opcode::St => {
                let addr = regs.pc.wrapping_add(inst.off9());
                let value = regs.gpr[inst.dr()];
                self.write_word(VirtAddr(addr), value)?;
            }
            Opcode::Str => {
                let addr = regs.gpr[inst.sr1()].wrapping_add(inst.off6());
                let value = regs.gpr[inst.dr()];
                self.write_word(VirtAddr(addr), value)?;
            }
            Opcode::Sti => {
                let addr = regs.pc.wrapping_add(inst.off9());
                let value = regs.gpr[inst.dr()];
                let pointer = self.read_word(VirtAddr(addr))?;
                self.write_word(VirtAddr(pointer), value)?;
            }
            Opcode::Trap => self.trap(inst.trap_vector())?,
            // unused
            Opcode::Rti | Opcode::Res => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sext() {
        assert_eq!(sext(0b01111, 5), 15);
        assert_eq!(sext(0b10000, 5), 0xfff0);
        assert_eq!(sext(0x1ff, 9), 0xffff);
        assert_eq!(sext(0x3f, 6), 0xffff);
    }

    #[test]
    fn test_encode_decode() {
        let inst = Instruction::add_imm(1, 2, -3);
        assert_eq!(inst.opcode(), Opcode::Add);
        assert_eq!((inst.dr(), inst.sr1()), (1, 2));
        assert!(inst.is_imm());
        assert_eq!(inst.imm5(), (-3i16) as Word);

        let inst = Instruction::str(3, 4, -1);
        assert_eq!(inst.opcode(), Opcode::Str);
        assert_eq!((inst.dr(), inst.sr1(), inst.off6()), (3, 4, 0xffff));

        let inst = Instruction::br(CondFlags::N | CondFlags::Z, 5);
        assert_eq!(inst.cond(), CondFlags::N | CondFlags::Z);
        assert_eq!(inst.off9(), 5);

        assert_eq!(Instruction::trap(0x25).0, 0xf025);
        assert_eq!(Instruction::jmp(R7).0, 0xc1c0);
        assert!(Instruction::jsr(-2).is_long());
    }
}
