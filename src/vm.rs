// src/vm.rs

use std::convert::TryFrom;
use std::io;

use log::{debug, error, info};
use thiserror::Error;

use crate::io::Console;
use crate::isa::{Instruction, JsrTarget, Operand};
use crate::loader::Image;
use crate::mmio::{mem_read, mem_write};
use crate::state::{Memory, Register, Registers};
use crate::trap::{self, TrapVector};

// --- Types and Constants ---

/// Where execution begins: the bottom of user program space.
pub const PC_START: u16 = 0x3000;

// --- Errors ---

/// Everything that can stop the machine other than HALT.
#[derive(Debug, Error)]
pub enum VmError {
    /// RTI or the reserved opcode. Fatal: there is no defined way to continue.
    #[error("illegal opcode {opcode:#x} in instruction {word:#06x}")]
    IllegalOpcode { opcode: u16, word: u16 },
    /// TRAP with a vector outside 0x20..=0x25. Fatal.
    #[error("unknown trap vector {0:#04x}")]
    UnknownTrap(u8),
    #[error("image of {len} words at origin {origin:#06x} does not fit in memory")]
    ImageTooLarge { origin: u16, len: usize },
    #[error("console input closed")]
    InputClosed,
    #[error("interrupted")]
    Interrupted,
    #[error("console i/o error")]
    Io(#[source] io::Error),
}

impl VmError {
    /// Decode errors mean the image is corrupt; nothing else is worth reporting as such.
    pub fn is_fatal_decode(&self) -> bool {
        matches!(self, VmError::IllegalOpcode { .. } | VmError::UnknownTrap(_))
    }
}

impl From<io::Error> for VmError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => VmError::InputClosed,
            io::ErrorKind::Interrupted => VmError::Interrupted,
            _ => VmError::Io(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
}

// --- Virtual Machine ---

/// The LC-3 machine: register file, memory and the console it drives.
pub struct VirtualMachine<C: Console> {
    pub registers: Registers,
    pub memory: Memory,
    console: C,
    state: RunState,
    steps: u64,
}

impl<C: Console> VirtualMachine<C> {
    /// A machine in the power-on state: PC at [`PC_START`], COND = Z, memory cleared.
    pub fn new(console: C) -> Self {
        let mut registers = Registers::new();
        registers.set_pc(PC_START);
        VirtualMachine {
            registers,
            memory: Memory::new(),
            console,
            state: RunState::Running,
            steps: 0,
        }
    }

    /// Places `words` at `origin`.
    pub fn load(&mut self, origin: u16, words: &[u16]) -> Result<(), VmError> {
        self.memory.load(origin, words)?;
        debug!("loaded {} words at {:#06x}", words.len(), origin);
        Ok(())
    }

    pub fn load_image(&mut self, image: &Image) -> Result<(), VmError> {
        self.load(image.origin, &image.words)
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == RunState::Halted
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    // --- Memory access ---

    /// Reads through the memory-mapped device layer.
    pub fn mem_read(&mut self, address: u16) -> Result<u16, VmError> {
        mem_read(&mut self.memory, &mut self.console, address)
    }

    pub fn mem_write(&mut self, address: u16, value: u16) {
        mem_write(&mut self.memory, address, value);
    }

    // --- Execution Loop ---

    /// Runs until HALT or an error. Checks for an external interrupt before
    /// every instruction.
    pub fn run(&mut self) -> Result<(), VmError> {
        while self.state == RunState::Running {
            if self.console.interrupted() {
                return Err(VmError::Interrupted);
            }
            if let Err(err) = self.step() {
                if err.is_fatal_decode() {
                    error!(
                        "{} at {:#06x}; stopping",
                        err,
                        self.registers.pc().wrapping_sub(1)
                    );
                }
                return Err(err);
            }
        }
        info!("halted after {} instructions", self.steps);
        Ok(())
    }

    /// Fetches the word at PC, advances PC past it, then decodes and executes
    /// it. A failing instruction commits nothing beyond the PC advance.
    pub fn step(&mut self) -> Result<(), VmError> {
        let pc = self.registers.pc();
        let word = self.mem_read(pc)?;
        self.registers.set_pc(pc.wrapping_add(1));
        let instruction = Instruction::try_from(word)?;
        self.execute(instruction)?;
        self.steps += 1;
        Ok(())
    }

    /// Executes one decoded instruction. PC already points past it.
    pub fn execute(&mut self, instruction: Instruction) -> Result<(), VmError> {
        let pc = self.registers.pc();
        match instruction {
            // --- Operate ---
            Instruction::Add { dr, sr1, operand } => {
                let value = self.registers.get(sr1).wrapping_add(self.operand(operand));
                self.set_and_flag(dr, value);
            }
            Instruction::And { dr, sr1, operand } => {
                let value = self.registers.get(sr1) & self.operand(operand);
                self.set_and_flag(dr, value);
            }
            Instruction::Not { dr, sr } => {
                let value = !self.registers.get(sr);
                self.set_and_flag(dr, value);
            }

            // --- Control Flow ---
            Instruction::Br { cond, offset } => {
                if cond & self.registers.flags() != 0 {
                    self.registers.set_pc(pc.wrapping_add(offset));
                }
            }
            Instruction::Jmp { base } => {
                let target = self.registers.get(base);
                self.registers.set_pc(target);
            }
            Instruction::Jsr { target } => {
                // R7 is written first, so JSRR R7 lands on the return address.
                self.registers.set(Register::R7, pc);
                let target = match target {
                    JsrTarget::Offset(offset) => pc.wrapping_add(offset),
                    JsrTarget::Register(base) => self.registers.get(base),
                };
                self.registers.set_pc(target);
            }

            // --- Loads ---
            Instruction::Ld { dr, offset } => {
                let value = self.mem_read(pc.wrapping_add(offset))?;
                self.set_and_flag(dr, value);
            }
            Instruction::Ldi { dr, offset } => {
                let pointer = self.mem_read(pc.wrapping_add(offset))?;
                let value = self.mem_read(pointer)?;
                self.set_and_flag(dr, value);
            }
            Instruction::Ldr { dr, base, offset } => {
                let address = self.registers.get(base).wrapping_add(offset);
                let value = self.mem_read(address)?;
                self.set_and_flag(dr, value);
            }
            Instruction::Lea { dr, offset } => {
                self.set_and_flag(dr, pc.wrapping_add(offset));
            }

            // --- Stores ---
            Instruction::St { sr, offset } => {
                let value = self.registers.get(sr);
                self.mem_write(pc.wrapping_add(offset), value);
            }
            Instruction::Sti { sr, offset } => {
                let pointer = self.mem_read(pc.wrapping_add(offset))?;
                let value = self.registers.get(sr);
                self.mem_write(pointer, value);
            }
            Instruction::Str { sr, base, offset } => {
                let address = self.registers.get(base).wrapping_add(offset);
                let value = self.registers.get(sr);
                self.mem_write(address, value);
            }

            // --- Traps ---
            Instruction::Trap { vector } => {
                let vector = TrapVector::try_from(vector)?;
                let outcome =
                    trap::dispatch(vector, &self.registers, &self.memory, &mut self.console)?;
                self.registers.set(Register::R7, pc);
                if let Some(value) = outcome.r0 {
                    self.set_and_flag(Register::R0, value);
                }
                if outcome.halt {
                    self.state = RunState::Halted;
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Register(r) => self.registers.get(r),
            Operand::Immediate(imm) => imm,
        }
    }

    #[inline]
    fn set_and_flag(&mut self, dr: Register, value: u16) {
        self.registers.set(dr, value);
        self.registers.update_flags(dr);
    }
}
