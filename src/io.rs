//! Character I/O contract between the machine and its terminal.

use std::collections::VecDeque;
use std::io;

/// What the machine needs from a terminal. Implemented for the real TTY by
/// [`crate::terminal::StdConsole`] and in memory by [`BufferConsole`].
pub trait Console {
    /// Non-blocking: is a character ready to be read?
    fn poll_input(&mut self) -> bool;

    /// Blocks until one character is available.
    fn read_char(&mut self) -> io::Result<u8>;

    fn write_char(&mut self, c: u8) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Set once an external interrupt has asked the machine to stop.
    fn interrupted(&self) -> bool {
        false
    }

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        s.bytes().try_for_each(|c| self.write_char(c))
    }
}

/// Scripted input and captured output. Reading past the script is an
/// `UnexpectedEof` error.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    flushes: usize,
}

impl BufferConsole {
    pub fn new(input: &[u8]) -> Self {
        BufferConsole {
            input: input.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl Console for BufferConsole {
    fn poll_input(&mut self) -> bool {
        !self.input.is_empty()
    }

    fn read_char(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }

    fn write_char(&mut self, c: u8) -> io::Result<()> {
        self.output.push(c);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
