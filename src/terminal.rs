//! The Unix terminal behind the machine's console.
//!
//! [`RawMode`] turns off line buffering and echo on stdin for as long as it
//! lives. [`StdConsole`] talks to stdin/stdout with plain syscalls so that a
//! SIGINT arriving during a blocking read surfaces as `Interrupted` instead of
//! being retried.

extern crate libc;

use std::io::{self, Write};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::io::Console;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Routes SIGINT to a flag checked by [`StdConsole::interrupted`]. The handler
/// is installed without `SA_RESTART`.
pub fn install_interrupt_handler() -> io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

pub fn interrupt_requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Saved terminal settings; restored on drop.
pub struct RawMode {
    original: libc::termios,
}

impl RawMode {
    /// Fails if stdin is not a terminal.
    pub fn enable() -> io::Result<RawMode> {
        let original = unsafe {
            let mut tio: libc::termios = mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &mut tio) != 0 {
                return Err(io::Error::last_os_error());
            }
            tio
        };
        let mut raw = original;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        debug!("terminal switched to raw mode");
        Ok(RawMode { original })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.original);
        }
        debug!("terminal mode restored");
    }
}

/// Console on the process's stdin and stdout.
pub struct StdConsole {
    stdout: io::Stdout,
}

impl StdConsole {
    pub fn new() -> Self {
        StdConsole {
            stdout: io::stdout(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn poll_input(&mut self) -> bool {
        let mut fd = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        unsafe { libc::poll(&mut fd, 1, 0) > 0 }
    }

    fn read_char(&mut self) -> io::Result<u8> {
        // A prompt written without a newline must be visible before we block.
        self.stdout.flush()?;
        let mut byte = 0u8;
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                &mut byte as *mut u8 as *mut libc::c_void,
                1,
            )
        };
        match n {
            1 => Ok(byte),
            0 => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")),
            _ => Err(io::Error::last_os_error()),
        }
    }

    fn write_char(&mut self, c: u8) -> io::Result<()> {
        self.stdout.write_all(&[c])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }

    fn interrupted(&self) -> bool {
        interrupt_requested()
    }
}
