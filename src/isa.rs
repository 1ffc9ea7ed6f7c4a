//! Instruction set: opcodes and the decoded form of an instruction word.

use std::convert::TryFrom;

use crate::bits::{bit, field, offset};
use crate::state::Register;
use crate::vm::VmError;

/// The 4-bit opcode held in bits [15:12].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Opcode {
    Br = 0,
    Add = 1,
    Ld = 2,
    St = 3,
    Jsr = 4,
    And = 5,
    Ldr = 6,
    Str = 7,
    Rti = 8,
    Not = 9,
    Ldi = 10,
    Sti = 11,
    Jmp = 12,
    Res = 13,
    Lea = 14,
    Trap = 15,
}

impl Opcode {
    /// Every 4-bit value names an opcode, so this cannot fail.
    pub fn of(word: u16) -> Opcode {
        match word >> 12 {
            0 => Opcode::Br, 1 => Opcode::Add, 2 => Opcode::Ld, 3 => Opcode::St,
            4 => Opcode::Jsr, 5 => Opcode::And, 6 => Opcode::Ldr, 7 => Opcode::Str,
            8 => Opcode::Rti, 9 => Opcode::Not, 10 => Opcode::Ldi, 11 => Opcode::Sti,
            12 => Opcode::Jmp, 13 => Opcode::Res, 14 => Opcode::Lea,
            _ => Opcode::Trap,
        }
    }
}

/// Second operand of ADD/AND: bit 5 selects between SR2 and imm5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    /// Already sign-extended to 16 bits.
    Immediate(u16),
}

/// Where JSR (bit 11 set) or JSRR (bit 11 clear) transfers control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsrTarget {
    Offset(u16),
    Register(Register),
}

/// A decoded instruction. All offsets are sign-extended at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Br { cond: u16, offset: u16 },
    Add { dr: Register, sr1: Register, operand: Operand },
    Ld { dr: Register, offset: u16 },
    St { sr: Register, offset: u16 },
    Jsr { target: JsrTarget },
    And { dr: Register, sr1: Register, operand: Operand },
    Ldr { dr: Register, base: Register, offset: u16 },
    Str { sr: Register, base: Register, offset: u16 },
    Not { dr: Register, sr: Register },
    Ldi { dr: Register, offset: u16 },
    Sti { sr: Register, offset: u16 },
    Jmp { base: Register },
    Lea { dr: Register, offset: u16 },
    Trap { vector: u8 },
}

// Register fields sit at fixed positions across the whole ISA.
#[inline]
fn reg_11_9(word: u16) -> Register {
    Register::general(field(word, 9, 3))
}

#[inline]
fn reg_8_6(word: u16) -> Register {
    Register::general(field(word, 6, 3))
}

// ADD and AND share this layout.
fn alu_operand(word: u16) -> Operand {
    if bit(word, 5) {
        Operand::Immediate(offset(word, 5))
    } else {
        Operand::Register(Register::general(field(word, 0, 3)))
    }
}

impl Instruction {
    /// Decodes one instruction word. RTI and the reserved opcode are illegal.
    pub fn decode(word: u16) -> Result<Instruction, VmError> {
        let instruction = match Opcode::of(word) {
            Opcode::Br => Instruction::Br { cond: field(word, 9, 3), offset: offset(word, 9) },
            Opcode::Add => Instruction::Add {
                dr: reg_11_9(word),
                sr1: reg_8_6(word),
                operand: alu_operand(word),
            },
            Opcode::Ld => Instruction::Ld { dr: reg_11_9(word), offset: offset(word, 9) },
            Opcode::St => Instruction::St { sr: reg_11_9(word), offset: offset(word, 9) },
            Opcode::Jsr => {
                let target = if bit(word, 11) {
                    JsrTarget::Offset(offset(word, 11))
                } else {
                    JsrTarget::Register(reg_8_6(word))
                };
                Instruction::Jsr { target }
            }
            Opcode::And => Instruction::And {
                dr: reg_11_9(word),
                sr1: reg_8_6(word),
                operand: alu_operand(word),
            },
            Opcode::Ldr => Instruction::Ldr {
                dr: reg_11_9(word),
                base: reg_8_6(word),
                offset: offset(word, 6),
            },
            Opcode::Str => Instruction::Str {
                sr: reg_11_9(word),
                base: reg_8_6(word),
                offset: offset(word, 6),
            },
            Opcode::Not => Instruction::Not { dr: reg_11_9(word), sr: reg_8_6(word) },
            Opcode::Ldi => Instruction::Ldi { dr: reg_11_9(word), offset: offset(word, 9) },
            Opcode::Sti => Instruction::Sti { sr: reg_11_9(word), offset: offset(word, 9) },
            Opcode::Jmp => Instruction::Jmp { base: reg_8_6(word) },
            Opcode::Lea => Instruction::Lea { dr: reg_11_9(word), offset: offset(word, 9) },
            Opcode::Trap => Instruction::Trap { vector: field(word, 0, 8) as u8 },
            Opcode::Rti | Opcode::Res => {
                return Err(VmError::IllegalOpcode { opcode: word >> 12, word });
            }
        };
        Ok(instruction)
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Br { .. } => Opcode::Br,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::St { .. } => Opcode::St,
            Instruction::Jsr { .. } => Opcode::Jsr,
            Instruction::And { .. } => Opcode::And,
            Instruction::Ldr { .. } => Opcode::Ldr,
            Instruction::Str { .. } => Opcode::Str,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Sti { .. } => Opcode::Sti,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Lea { .. } => Opcode::Lea,
            Instruction::Trap { .. } => Opcode::Trap,
        }
    }
}

impl TryFrom<u16> for Instruction {
    type Error = VmError;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        Instruction::decode(word)
    }
}
