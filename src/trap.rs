//! TRAP service routines.
//!
//! Routines only perform console I/O and report what the machine should
//! commit afterwards; the TRAP handler in [`crate::vm`] applies R7, R0 and the
//! flags once the routine has finished.

use std::convert::TryFrom;

use crate::io::Console;
use crate::state::{Memory, Register, Registers, MEMORY_SIZE};
use crate::vm::VmError;

pub const IN_PROMPT: &str = "Enter a character: \n";
pub const HALT_NOTICE: &str = "HALT\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrapVector {
    /// Read a character without echo into R0.
    Getc = 0x20,
    /// Write the low byte of R0.
    Out = 0x21,
    /// Write the one-character-per-word string at R0.
    Puts = 0x22,
    /// Prompt, read and echo a character into R0.
    In = 0x23,
    /// Write the two-characters-per-word string at R0.
    Putsp = 0x24,
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVector {
    type Error = VmError;

    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        match vector {
            0x20 => Ok(TrapVector::Getc),
            0x21 => Ok(TrapVector::Out),
            0x22 => Ok(TrapVector::Puts),
            0x23 => Ok(TrapVector::In),
            0x24 => Ok(TrapVector::Putsp),
            0x25 => Ok(TrapVector::Halt),
            _ => Err(VmError::UnknownTrap(vector)),
        }
    }
}

/// Register effects a routine asks the TRAP handler to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrapOutcome {
    /// New R0 value; flags are updated from it.
    pub r0: Option<u16>,
    pub halt: bool,
}

pub fn dispatch<C: Console>(
    vector: TrapVector,
    registers: &Registers,
    memory: &Memory,
    console: &mut C,
) -> Result<TrapOutcome, VmError> {
    let r0 = registers.get(Register::R0);
    match vector {
        TrapVector::Getc => {
            let c = console.read_char()?;
            Ok(TrapOutcome { r0: Some(u16::from(c)), halt: false })
        }
        TrapVector::Out => {
            console.write_char(r0 as u8)?;
            console.flush()?;
            Ok(TrapOutcome::default())
        }
        TrapVector::Puts => {
            for word in string_at(memory, r0) {
                console.write_char(word as u8)?;
            }
            console.flush()?;
            Ok(TrapOutcome::default())
        }
        TrapVector::In => {
            console.write_str(IN_PROMPT)?;
            console.flush()?;
            let c = console.read_char()?;
            console.write_char(c)?;
            console.flush()?;
            Ok(TrapOutcome { r0: Some(u16::from(c)), halt: false })
        }
        TrapVector::Putsp => {
            for word in string_at(memory, r0) {
                let [low, high] = word.to_le_bytes();
                console.write_char(low)?;
                if high != 0 {
                    console.write_char(high)?;
                }
            }
            console.flush()?;
            Ok(TrapOutcome::default())
        }
        TrapVector::Halt => {
            console.write_str(HALT_NOTICE)?;
            console.flush()?;
            Ok(TrapOutcome { r0: None, halt: true })
        }
    }
}

/// Words from `start` up to (not including) the first zero word. Addresses
/// wrap, and a string with no terminator stops after one full lap of memory.
fn string_at(memory: &Memory, start: u16) -> impl Iterator<Item = u16> + '_ {
    (0..MEMORY_SIZE)
        .map(move |i| memory.read(start.wrapping_add(i as u16)))
        .take_while(|&word| word != 0)
}
