//! Memory-mapped keyboard registers.
//!
//! Reading KBSR polls the console: with a key waiting, KBSR gets its ready bit
//! and the key is latched into KBDR; otherwise KBSR reads back as zero. Every
//! other address is plain storage.

use crate::io::Console;
use crate::state::Memory;
use crate::vm::VmError;

/// Keyboard status register.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register.
pub const KBDR: u16 = 0xFE02;

const KBSR_READY: u16 = 1 << 15;

pub fn mem_read<C: Console>(
    memory: &mut Memory,
    console: &mut C,
    address: u16,
) -> Result<u16, VmError> {
    if address == KBSR {
        if console.poll_input() {
            let c = console.read_char()?;
            memory.write(KBSR, KBSR_READY);
            memory.write(KBDR, u16::from(c));
        } else {
            memory.write(KBSR, 0);
        }
    }
    Ok(memory.read(address))
}

// No device currently reacts to stores; kept as the single write path so one can.
#[inline]
pub fn mem_write(memory: &mut Memory, address: u16, value: u16) {
    memory.write(address, value);
}
