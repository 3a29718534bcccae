//! Host side of the serial link.

use std::io;

/// A bidirectional byte channel to a host process, typically a shell on a
/// pseudo-terminal.
///
/// Everything here is polled from the emulation thread, so no call may
/// block.
pub trait SerialLine {
    /// Acquire the channel and start whatever sits at the far end.
    fn open(&mut self, rows: u16, cols: u16) -> io::Result<()>;

    fn is_open(&self) -> bool;

    /// One byte if available. `Ok(None)` means nothing is waiting; end of
    /// file and hard failures are errors.
    fn read_nonblocking(&mut self) -> io::Result<Option<u8>>;

    fn write(&mut self, byte: u8) -> io::Result<()>;

    /// Report a new window size to the far end.
    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()>;

    /// Reap the far-end process without blocking. False once it has exited.
    fn is_child_alive(&mut self) -> bool;

    /// Release the channel. Safe to call when already closed.
    fn close(&mut self);

    /// Discard queued input and output.
    fn flush(&mut self);

    /// The character the far end treats as an interrupt, if any.
    fn interrupt_char(&self) -> Option<u8>;

    /// Device name shown to the operator.
    fn name(&self) -> Option<String>;
}

/// A line with nothing attached. Opening always fails.
#[derive(Debug, Default)]
pub struct NullLine;

impl SerialLine for NullLine {
    fn open(&mut self, _rows: u16, _cols: u16) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "no host line attached"))
    }

    fn is_open(&self) -> bool {
        false
    }

    fn read_nonblocking(&mut self) -> io::Result<Option<u8>> {
        Ok(None)
    }

    fn write(&mut self, _byte: u8) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::NotConnected))
    }

    fn resize(&mut self, _rows: u16, _cols: u16) -> io::Result<()> {
        Ok(())
    }

    fn is_child_alive(&mut self) -> bool {
        false
    }

    fn close(&mut self) {}

    fn flush(&mut self) {}

    fn interrupt_char(&self) -> Option<u8> {
        None
    }

    fn name(&self) -> Option<String> {
        None
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Scripted line for tests.

    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    use super::SerialLine;

    #[derive(Debug, Default)]
    pub struct MockState {
        pub open: bool,
        pub opens: u32,
        pub fail_open: bool,
        pub child_alive: bool,
        pub rx: VecDeque<u8>,
        pub eof: bool,
        pub tx: Vec<u8>,
        pub fail_write: bool,
        pub size: (u16, u16),
        pub resizes: u32,
        pub flushes: u32,
        pub interrupt_char: Option<u8>,
    }

    /// Shares its state with every clone so tests can inspect a line after
    /// handing it to the controller.
    #[derive(Debug, Clone, Default)]
    pub struct MockLine {
        state: Rc<RefCell<MockState>>,
    }

    impl MockLine {
        #[must_use]
        pub fn new() -> Self {
            let line = Self::default();
            line.state.borrow_mut().interrupt_char = Some(0x03);
            line
        }

        pub fn state(&self) -> std::cell::RefMut<'_, MockState> {
            self.state.borrow_mut()
        }

        /// Queue bytes from the far end.
        pub fn feed(&self, bytes: &[u8]) {
            self.state.borrow_mut().rx.extend(bytes);
        }

        /// Bytes sent towards the far end.
        #[must_use]
        pub fn sent(&self) -> Vec<u8> {
            self.state.borrow().tx.clone()
        }

        /// Make the far end exit.
        pub fn hang_up(&self) {
            let mut state = self.state.borrow_mut();
            state.child_alive = false;
            state.eof = true;
        }
    }

    impl SerialLine for MockLine {
        fn open(&mut self, rows: u16, cols: u16) -> io::Result<()> {
            let mut state = self.state.borrow_mut();
            state.opens += 1;
            if state.fail_open {
                return Err(io::Error::other("posix_openpt failed"));
            }
            state.open = true;
            state.child_alive = true;
            state.eof = false;
            state.size = (rows, cols);
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.state.borrow().open
        }

        fn read_nonblocking(&mut self) -> io::Result<Option<u8>> {
            let mut state = self.state.borrow_mut();
            match state.rx.pop_front() {
                Some(b) => Ok(Some(b)),
                None if state.eof => Err(io::ErrorKind::UnexpectedEof.into()),
                None => Ok(None),
            }
        }

        fn write(&mut self, byte: u8) -> io::Result<()> {
            let mut state = self.state.borrow_mut();
            if state.fail_write {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            state.tx.push(byte);
            Ok(())
        }

        fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()> {
            let mut state = self.state.borrow_mut();
            state.size = (rows, cols);
            state.resizes += 1;
            Ok(())
        }

        fn is_child_alive(&mut self) -> bool {
            self.state.borrow().child_alive
        }

        fn close(&mut self) {
            self.state.borrow_mut().open = false;
        }

        fn flush(&mut self) {
            let mut state = self.state.borrow_mut();
            state.flushes += 1;
            state.rx.clear();
        }

        fn interrupt_char(&self) -> Option<u8> {
            self.state.borrow().interrupt_char
        }

        fn name(&self) -> Option<String> {
            self.is_open().then(|| "/dev/pts/mock".to_string())
        }
    }
}
