//! Architectural state: the register file and the 64K-word memory.

use crate::vm::VmError;

pub const MEMORY_SIZE: usize = 1 << 16;
pub const REGISTER_COUNT: usize = 10;

/// Register names. `Pc` and `Cond` live in the same file as R0-R7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    Pc,
    Cond,
}

const GENERAL_PURPOSE: [Register; 8] = [
    Register::R0,
    Register::R1,
    Register::R2,
    Register::R3,
    Register::R4,
    Register::R5,
    Register::R6,
    Register::R7,
];

impl Register {
    /// Maps a 3-bit register field to R0-R7. Only the low three bits are used.
    #[inline]
    pub fn general(bits: u16) -> Register {
        GENERAL_PURPOSE[usize::from(bits & 0x7)]
    }
}

/// Condition codes. Exactly one is latched in COND at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Flag {
    Pos = 1 << 0,
    Zro = 1 << 1,
    Neg = 1 << 2,
}

impl Flag {
    /// Classifies a 16-bit result.
    pub fn of(value: u16) -> Flag {
        if value == 0 {
            Flag::Zro
        } else if value >> 15 == 1 {
            Flag::Neg
        } else {
            Flag::Pos
        }
    }

    #[inline]
    pub fn bits(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    slots: [u16; REGISTER_COUNT],
}

impl Registers {
    /// All registers zero except COND, which starts at `Zro`.
    pub fn new() -> Self {
        let mut slots = [0; REGISTER_COUNT];
        slots[Register::Cond as usize] = Flag::Zro.bits();
        Registers { slots }
    }

    #[inline]
    pub fn get(&self, register: Register) -> u16 {
        self.slots[register as usize]
    }

    #[inline]
    pub fn set(&mut self, register: Register, value: u16) {
        self.slots[register as usize] = value;
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.get(Register::Pc)
    }

    #[inline]
    pub fn set_pc(&mut self, value: u16) {
        self.set(Register::Pc, value);
    }

    /// Raw COND contents (one of the `Flag` bits).
    #[inline]
    pub fn flags(&self) -> u16 {
        self.get(Register::Cond)
    }

    /// Overwrites COND from the current value of `register`.
    pub fn update_flags(&mut self, register: Register) {
        let flag = Flag::of(self.get(register));
        self.set(Register::Cond, flag.bits());
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat word-addressed memory. Every `u16` is a valid address.
pub struct Memory {
    cells: Box<[u16]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            cells: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read(&self, address: u16) -> u16 {
        self.cells[usize::from(address)]
    }

    #[inline]
    pub fn write(&mut self, address: u16, value: u16) {
        self.cells[usize::from(address)] = value;
    }

    /// Copies `words` in starting at `origin`. Nothing is written if the
    /// block would run past the last address.
    pub fn load(&mut self, origin: u16, words: &[u16]) -> Result<(), VmError> {
        let start = usize::from(origin);
        let end = start
            .checked_add(words.len())
            .filter(|&end| end <= MEMORY_SIZE)
            .ok_or(VmError::ImageTooLarge {
                origin,
                len: words.len(),
            })?;
        self.cells[start..end].copy_from_slice(words);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.cells.iter().filter(|&&w| w != 0).count();
        f.debug_struct("Memory").field("nonzero_words", &used).finish()
    }
}
