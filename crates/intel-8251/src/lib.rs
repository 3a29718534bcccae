//! Intel 8251 programmable communication interface.
//!
//! Only the parts the terminal firmware relies on are modelled: the
//! mode/command write protocol, one-byte receive buffering, software flow
//! control and the modem control lines that decide when the host side of the
//! link is brought up or torn down. Character framing is latched but not
//! applied; bytes travel whole.
//!
//! # Command byte
//!
//! | Bit | Meaning          |
//! |-----|------------------|
//! | 0   | Transmit enable  |
//! | 1   | DTR              |
//! | 2   | Receive enable   |
//! | 3   | Send break       |
//! | 4   | Error reset      |
//! | 5   | RTS              |
//! | 6   | Internal reset   |
//! | 7   | Enter hunt mode  |
//!
//! The terminal keeps TE and RTS asserted, raises DTR when online and only
//! drops RE to hang up: `0x27` online, `0x25` offline, `0x2D` hang up,
//! `0x2F` break, `0x40` reset.

mod line;

pub use line::{NullLine, SerialLine};

#[cfg(any(test, feature = "test-utils"))]
pub use line::mock::{MockLine, MockState};

use emu_core::{Observable, Value};
use tracing::{debug, info, warn};

pub const TX_ENABLE: u8 = 0x01;
pub const DTR: u8 = 0x02;
pub const RX_ENABLE: u8 = 0x04;
pub const SEND_BREAK: u8 = 0x08;
pub const ERROR_RESET: u8 = 0x10;
pub const RTS: u8 = 0x20;
pub const INTERNAL_RESET: u8 = 0x40;
pub const HUNT: u8 = 0x80;

/// Command that drops the host connection.
pub const HANG_UP: u8 = 0x2D;

const XON: u8 = 0x11;
const XOFF: u8 = 0x13;

pub const ROWS: u16 = 24;

/// What a receive poll produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialEvent {
    /// A byte is waiting in the receive buffer.
    Received(u8),
    /// The far end went away and the channel was closed.
    Closed,
}

/// Decoded asynchronous mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeByte(pub u8);

impl ModeByte {
    #[must_use]
    pub fn data_bits(self) -> u8 {
        5 + ((self.0 >> 2) & 3)
    }

    #[must_use]
    pub fn parity(self) -> &'static str {
        match self.0 & 0x30 {
            0x10 => "odd",
            0x30 => "even",
            _ => "none",
        }
    }

    #[must_use]
    pub fn stop_bits(self) -> &'static str {
        match self.0 & 0xC0 {
            0x40 => "1",
            0x80 => "1.5",
            0xC0 => "2",
            _ => "invalid",
        }
    }

    /// Baud-rate factor, or `None` for synchronous mode.
    #[must_use]
    pub fn clock_factor(self) -> Option<u8> {
        match self.0 & 3 {
            1 => Some(1),
            2 => Some(16),
            3 => Some(64),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModeByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.clock_factor() {
            Some(x) => write!(
                f,
                "{}{}{} x{x}",
                self.data_bits(),
                &self.parity()[..1].to_uppercase(),
                self.stop_bits()
            ),
            None => write!(f, "sync"),
        }
    }
}

/// PUSART register model bridged to a [`SerialLine`].
pub struct Usart8251 {
    line: Box<dyn SerialLine>,
    mode_select: bool,
    mode: u8,
    command: u8,
    rx_data: u8,
    rx_ready: bool,
    xoff: bool,
    cols132: bool,
    notice: Option<String>,
}

impl Usart8251 {
    #[must_use]
    pub fn new(line: Box<dyn SerialLine>) -> Self {
        Self {
            line,
            mode_select: true,
            mode: 0,
            command: 0,
            rx_data: 0,
            rx_ready: false,
            xoff: false,
            cols132: false,
            notice: None,
        }
    }

    /// Write the control port.
    pub fn write_command(&mut self, value: u8) {
        if self.mode_select {
            self.mode_select = false;
            self.mode = value;
            debug!("8251 mode {value:02x} ({})", ModeByte(value));
            return;
        }

        self.command = value;
        if value & INTERNAL_RESET != 0 {
            self.mode_select = true;
        }
        if value == HANG_UP {
            if self.line.is_open() {
                info!("8251 hang up");
                self.line.close();
            }
            return;
        }
        if value & (TX_ENABLE | RX_ENABLE) == TX_ENABLE | RX_ENABLE && !self.line.is_open() {
            self.bring_up();
        }
    }

    fn bring_up(&mut self) {
        let cols = if self.cols132 { 132 } else { 80 };
        match self.line.open(ROWS, cols) {
            Ok(()) => {
                let name = self.pty_name();
                info!("8251 online via {name}");
            }
            Err(e) => {
                warn!("8251 cannot start shell: {e}");
                self.notice = Some(format!("Cannot start shell: {e}"));
            }
        }
    }

    /// Write the data port.
    pub fn write_data(&mut self, value: u8) {
        if (1..0x20).contains(&value) || value == 0x7F {
            if self.line.interrupt_char() == Some(value) {
                self.line.flush();
                return;
            }
            if value == XON || value == XOFF {
                self.xoff = value == XOFF;
                return;
            }
        }
        if !self.line.is_open() {
            return;
        }
        if let Err(e) = self.line.write(value) {
            warn!("8251 write failed, closing line: {e}");
            self.line.close();
        }
    }

    /// Read the status port.
    #[must_use]
    pub fn read_command(&self) -> u8 {
        0x80 | 0x40 | (u8::from(self.rx_ready) << 1) | 0x01
    }

    /// Read the data port. Clears receiver ready.
    pub fn read_data(&mut self) -> u8 {
        self.rx_ready = false;
        self.rx_data
    }

    /// The transmitter never backs up.
    #[must_use]
    pub fn xmit_ready(&self) -> bool {
        true
    }

    /// Poll the line once. Called on each rising edge of the baud clock.
    pub fn clock(&mut self) -> Option<SerialEvent> {
        if self.rx_ready || self.xoff || !self.line.is_open() {
            return None;
        }
        match self.line.read_nonblocking() {
            Ok(Some(byte)) => {
                self.rx_data = byte;
                self.rx_ready = true;
                return Some(SerialEvent::Received(byte));
            }
            Ok(None) => {}
            Err(e) => debug!("8251 read: {e}"),
        }
        if self.line.is_child_alive() {
            return None;
        }
        info!("8251 shell exited");
        self.line.close();
        self.rx_data = 0;
        Some(SerialEvent::Closed)
    }

    /// Switch the far end between 80 and 132 columns.
    pub fn write_cols(&mut self, cols132: bool) {
        if !self.line.is_open() || cols132 == self.cols132 {
            return;
        }
        self.cols132 = cols132;
        let cols = if cols132 { 132 } else { 80 };
        if let Err(e) = self.line.resize(ROWS, cols) {
            warn!("8251 resize to {cols} columns failed: {e}");
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.line.is_open()
    }

    #[must_use]
    pub fn pty_name(&self) -> String {
        self.line.name().unwrap_or_else(|| "<NONE>".to_string())
    }

    #[must_use]
    pub fn in_mode_select(&self) -> bool {
        self.mode_select
    }

    #[must_use]
    pub fn mode(&self) -> u8 {
        self.mode
    }

    #[must_use]
    pub fn command(&self) -> u8 {
        self.command
    }

    #[must_use]
    pub fn xoff(&self) -> bool {
        self.xoff
    }

    #[must_use]
    pub fn rx_ready(&self) -> bool {
        self.rx_ready
    }

    #[must_use]
    pub fn cols132(&self) -> bool {
        self.cols132
    }

    /// Operator-facing message from the last failed bring-up, cleared on
    /// read.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }
}

impl Observable for Usart8251 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "mode" => Some(Value::U8(self.mode)),
            "mode.format" => Some(Value::String(ModeByte(self.mode).to_string())),
            "command" => Some(Value::U8(self.command)),
            "status" => Some(Value::U8(self.read_command())),
            "mode_select" => Some(Value::Bool(self.mode_select)),
            "rx_ready" => Some(Value::Bool(self.rx_ready)),
            "xoff" => Some(Value::Bool(self.xoff)),
            "pty" => Some(Value::String(self.pty_name())),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "mode",
            "mode.format",
            "command",
            "status",
            "mode_select",
            "rx_ready",
            "xoff",
            "pty",
        ]
    }
}
