//! Keyboard.
//!
//! The VT100 keyboard is a separate unit on a serial link. The terminal
//! writes a status byte (LEDs, click, start-scan) and the keyboard answers a
//! scan request with the codes of every key held down, then an end-of-scan
//! marker. Each received byte interrupts the CPU.
//!
//! # Status byte
//!
//! | Bit | Meaning      |
//! |-----|--------------|
//! | 7   | Bell (click) |
//! | 6   | Start scan   |
//! | 5   | LOCAL LED    |
//! | 4   | KBD LOCKED   |
//! | 3-0 | L1-L4 LEDs   |

use std::collections::VecDeque;

pub const STATUS_BEEP: u8 = 0x80;
pub const STATUS_START_SCAN: u8 = 0x40;
pub const STATUS_LOCAL: u8 = 0x20;
pub const STATUS_LOCKED: u8 = 0x10;

/// End of scan.
pub const END_OF_SCAN: u8 = 0x7F;
pub const KEY_CTRL: u8 = 0x7C;
pub const KEY_SHIFT: u8 = 0x7D;

/// LBA4 rising edges per transmitted byte, either direction.
const BYTE_CLOCKS: u32 = 64;

/// Scans a key stays down after one host key press.
const HOLD_SCANS: u8 = 3;

/// The keyboard as seen from the terminal's ports.
pub trait Keyboard {
    /// Status byte written to port 0x82.
    fn set_status(&mut self, status: u8);

    /// Last status byte written.
    fn status(&self) -> u8;

    /// Last received key code, read from port 0x82.
    fn latch(&self) -> u8;

    /// The keyboard can take another status byte.
    fn tx_buffer_empty(&self) -> bool;

    /// A scan is in progress.
    fn busy_scanning(&self) -> bool;

    /// Advance on an LBA4 edge. True when a byte arrived for the CPU.
    fn clock(&mut self, level: bool) -> bool;

    /// Hold a key down for the next few scans.
    fn keypress(&mut self, code: u8);
}

/// A keyboard that reports keys pressed on the host for a few scans each.
#[derive(Debug, Default)]
pub struct ScanKeyboard {
    status: u8,
    latch: u8,
    held: Vec<(u8, u8)>,
    queue: VecDeque<u8>,
    scanning: bool,
    tx_busy: u32,
    rx_wait: u32,
}

impl ScanKeyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Codes currently held down.
    pub fn held(&self) -> impl Iterator<Item = u8> + '_ {
        self.held.iter().map(|&(code, _)| code)
    }

    fn start_scan(&mut self) {
        self.scanning = true;
        self.rx_wait = BYTE_CLOCKS;
        self.queue.clear();
        for (code, scans) in &mut self.held {
            self.queue.push_back(*code);
            *scans -= 1;
        }
        self.held.retain(|&(_, scans)| scans > 0);
        self.queue.push_back(END_OF_SCAN);
    }
}

impl Keyboard for ScanKeyboard {
    fn set_status(&mut self, status: u8) {
        self.status = status;
        self.tx_busy = BYTE_CLOCKS;
        if status & STATUS_START_SCAN != 0 && !self.scanning {
            self.start_scan();
        }
    }

    fn status(&self) -> u8 {
        self.status
    }

    fn latch(&self) -> u8 {
        self.latch
    }

    fn tx_buffer_empty(&self) -> bool {
        self.tx_busy == 0
    }

    fn busy_scanning(&self) -> bool {
        self.scanning
    }

    fn clock(&mut self, level: bool) -> bool {
        if !level {
            return false;
        }
        self.tx_busy = self.tx_busy.saturating_sub(1);
        if !self.scanning {
            return false;
        }
        self.rx_wait = self.rx_wait.saturating_sub(1);
        if self.rx_wait > 0 {
            return false;
        }
        let Some(code) = self.queue.pop_front() else {
            self.scanning = false;
            return false;
        };
        self.latch = code;
        self.rx_wait = BYTE_CLOCKS;
        if self.queue.is_empty() {
            self.scanning = false;
        }
        true
    }

    fn keypress(&mut self, code: u8) {
        match self.held.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = HOLD_SCANS,
            None => self.held.push((code, HOLD_SCANS)),
        }
    }
}
