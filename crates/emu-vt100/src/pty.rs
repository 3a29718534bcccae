//! Shell on a host pseudo-terminal.
//!
//! The master side is put in raw, non-blocking mode and polled from the
//! emulation thread. The shell gets the slave as its controlling terminal
//! with the slave's original line settings, `TERM=vt100` and no `LANG`.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};

use intel_8251::SerialLine;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_SHELL, TERM_NAME, user_shell};
use crate::error::PtyError;

static PTSNAME: Mutex<()> = Mutex::new(());

fn last_error() -> io::Error {
    io::Error::last_os_error()
}

fn check(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret < 0 { Err(last_error()) } else { Ok(ret) }
}

/// Open a master, unlock its slave and return both with the slave's name.
fn open_pair() -> Result<(File, File, String), PtyError> {
    // SAFETY: plain syscalls on a descriptor we own.
    let fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
    if fd < 0 {
        return Err(PtyError::Open(last_error()));
    }
    // SAFETY: `fd` is a fresh descriptor owned by nobody else.
    let master = unsafe { File::from_raw_fd(fd) };

    // SAFETY: `fd` is a valid pty master.
    unsafe {
        check(libc::grantpt(fd)).map_err(PtyError::Grant)?;
        check(libc::unlockpt(fd)).map_err(PtyError::Grant)?;
    }

    // ptsname returns static storage shared by every thread.
    let guard = PTSNAME.lock().unwrap_or_else(PoisonError::into_inner);
    // SAFETY: the pointer is null or a C string, copied before the lock is
    // released.
    let name = unsafe {
        let ptr = libc::ptsname(fd);
        if ptr.is_null() {
            return Err(PtyError::Name(last_error()));
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    };
    drop(guard);

    // SAFETY: fcntl on a valid descriptor.
    unsafe {
        let flags = check(libc::fcntl(fd, libc::F_GETFL)).map_err(PtyError::Termios)?;
        check(libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK))
            .map_err(PtyError::Termios)?;
        // Keep the master out of the shell.
        check(libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC)).map_err(PtyError::Termios)?;
    }

    let slave = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&name)
        .map_err(|source| PtyError::OpenDevice {
            path: name.clone(),
            source,
        })?;
    Ok((master, slave, name))
}

fn get_termios(fd: RawFd) -> io::Result<libc::termios> {
    // SAFETY: termios is plain data; tcgetattr fills it in.
    unsafe {
        let mut tios: libc::termios = std::mem::zeroed();
        check(libc::tcgetattr(fd, &raw mut tios))?;
        Ok(tios)
    }
}

/// No echo, no line editing, no signals, 8-bit clean.
fn make_raw(tios: &mut libc::termios) {
    tios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::ICRNL
        | libc::INLCR
        | libc::PARMRK
        | libc::INPCK
        | libc::ISTRIP
        | libc::IXON);
    tios.c_oflag = 0;
    tios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::IEXTEN | libc::ISIG);
    tios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    tios.c_cflag |= libc::CS8;
    tios.c_cc[libc::VMIN] = 1;
    tios.c_cc[libc::VTIME] = 0;
}

fn set_window(fd: RawFd, rows: u16, cols: u16) -> io::Result<()> {
    let ws = libc::winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: TIOCSWINSZ reads a winsize from the pointer.
    check(unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &raw const ws) })?;
    Ok(())
}

fn spawn_shell(shell: &str, slave: &File, tios: libc::termios) -> io::Result<Child> {
    let mut command = Command::new(shell);
    command
        .stdin(Stdio::from(slave.try_clone()?))
        .stdout(Stdio::from(slave.try_clone()?))
        .stderr(Stdio::from(slave.try_clone()?))
        .env_remove("LANG")
        .env("TERM", TERM_NAME);
    // SAFETY: only async-signal-safe calls between fork and exec.
    unsafe {
        command.pre_exec(move || {
            check(libc::setsid())?;
            check(libc::ioctl(0, libc::TIOCSCTTY, 1))?;
            check(libc::tcsetattr(0, libc::TCSANOW, &raw const tios))?;
            Ok(())
        });
    }
    command.spawn()
}

struct Attached {
    master: File,
    child: Child,
    name: String,
}

/// A [`SerialLine`] backed by a pseudo-terminal running a shell.
pub struct PtyLine {
    shell: String,
    attached: Option<Attached>,
    /// Shells hung up on but not yet reaped.
    exited: Vec<Child>,
}

impl PtyLine {
    /// Run `$SHELL`, or `/bin/sh`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shell(user_shell())
    }

    #[must_use]
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            attached: None,
            exited: Vec::new(),
        }
    }

    fn reap(&mut self) {
        self.exited.retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }

    fn start(&self, rows: u16, cols: u16) -> Result<Attached, PtyError> {
        let (master, slave, name) = open_pair()?;
        let fd = master.as_raw_fd();

        let original = get_termios(slave.as_raw_fd()).map_err(PtyError::Termios)?;
        let mut config = get_termios(fd).map_err(PtyError::Termios)?;
        make_raw(&mut config);
        // SAFETY: tcsetattr reads the termios we pass.
        check(unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const config) })
            .map_err(PtyError::Termios)?;
        set_window(fd, rows, cols).map_err(PtyError::Termios)?;

        let child = match spawn_shell(&self.shell, &slave, original) {
            Ok(child) => child,
            Err(e) if self.shell != DEFAULT_SHELL => {
                warn!("cannot run {}: {e}; trying {DEFAULT_SHELL}", self.shell);
                spawn_shell(DEFAULT_SHELL, &slave, original).map_err(|source| {
                    PtyError::Spawn {
                        shell: DEFAULT_SHELL.to_string(),
                        source,
                    }
                })?
            }
            Err(source) => {
                return Err(PtyError::Spawn {
                    shell: self.shell.clone(),
                    source,
                });
            }
        };
        Ok(Attached {
            master,
            child,
            name,
        })
    }
}

impl Default for PtyLine {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLine for PtyLine {
    fn open(&mut self, rows: u16, cols: u16) -> io::Result<()> {
        self.close();
        self.reap();
        let attached = self.start(rows, cols)?;
        info!("shell pid {} on {}", attached.child.id(), attached.name);
        self.attached = Some(attached);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.attached.is_some()
    }

    fn read_nonblocking(&mut self) -> io::Result<Option<u8>> {
        let Some(attached) = self.attached.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };
        let mut byte = [0u8; 1];
        match attached.master.read(&mut byte) {
            Ok(0) => Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, byte: u8) -> io::Result<()> {
        let Some(attached) = self.attached.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };
        match attached.master.write(&[byte]) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!("pty full, dropped {byte:02x}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()> {
        match &self.attached {
            Some(attached) => set_window(attached.master.as_raw_fd(), rows, cols),
            None => Ok(()),
        }
    }

    fn is_child_alive(&mut self) -> bool {
        let Some(attached) = self.attached.as_mut() else {
            return false;
        };
        match attached.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                info!("shell exited: {status}");
                false
            }
            Err(e) => {
                warn!("cannot poll shell: {e}");
                false
            }
        }
    }

    fn close(&mut self) {
        if let Some(attached) = self.attached.take() {
            debug!("closing {}", attached.name);
            // Dropping the master hangs up the shell's terminal.
            drop(attached.master);
            self.exited.push(attached.child);
        }
    }

    fn flush(&mut self) {
        if let Some(attached) = &self.attached {
            // SAFETY: tcflush on a valid descriptor.
            let ret = unsafe { libc::tcflush(attached.master.as_raw_fd(), libc::TCIOFLUSH) };
            if ret < 0 {
                debug!("tcflush: {}", last_error());
            }
        }
    }

    fn interrupt_char(&self) -> Option<u8> {
        let attached = self.attached.as_ref()?;
        let tios = get_termios(attached.master.as_raw_fd()).ok()?;
        Some(tios.c_cc[libc::VINTR])
    }

    fn name(&self) -> Option<String> {
        self.attached.as_ref().map(|a| a.name.clone())
    }
}

impl Drop for PtyLine {
    fn drop(&mut self) {
        self.close();
        self.reap();
    }
}
