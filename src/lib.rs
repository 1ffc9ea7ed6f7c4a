//! A virtual machine for the LC-3 instructional architecture.
//!
//! The library holds the instruction engine ([`vm::VirtualMachine`]) and the
//! collaborators it talks to: the image [`loader`], the character [`io`]
//! contract and the Unix [`terminal`] implementation of it.

pub mod bits;
pub mod io;
pub mod isa;
pub mod loader;
pub mod mmio;
pub mod state;
pub mod terminal;
pub mod trap;
pub mod vm;
