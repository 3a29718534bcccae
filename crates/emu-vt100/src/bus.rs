//! VT100 bus: memory, port dispatch and the interrupt latch.
//!
//! Three devices interrupt the 8080 through RST instructions built on the
//! data bus: the PUSART (RST 2), the keyboard (RST 1) and vertical retrace
//! (RST 4). Their request bits are ORed into one vector, so simultaneous
//! requests combine the way the hardware's open-collector lines do.
//!
//! # Flags buffer (port 0x42 read)
//!
//! | Bit | Meaning                      |
//! |-----|------------------------------|
//! | 7   | Keyboard transmit empty      |
//! | 6   | LBA7                         |
//! | 5   | NVR data out                 |
//! | 4   | Even field                   |
//! | 3   | Option present (none fitted) |
//! | 2   | Graphics option absent       |
//! | 1   | AVO absent                   |
//! | 0   | PUSART transmit ready        |

use emu_core::{Bus, Ticks};
use gi_er1400::Er1400;
use intel_8251::{SerialEvent, Usart8251};
use tracing::debug;

use crate::display::{DisplayRegs, ScanChange};
use crate::keyboard::{Keyboard, ScanKeyboard};
use crate::rom::ROM_SIZE;
use crate::timing::Timing;

/// Data bus value with no request: RST 0.
pub const IDLE_VECTOR: u8 = 0xC7;
pub const KEYBOARD_VECTOR: u8 = 0xCF;
pub const SERIAL_VECTOR: u8 = 0xD7;
pub const VERTICAL_VECTOR: u8 = 0xE7;

pub const PORT_DATA: u8 = 0x00;
pub const PORT_COMMAND: u8 = 0x01;
pub const PORT_BAUD: u8 = 0x02;
pub const PORT_FLAGS: u8 = 0x42;
pub const PORT_NVR: u8 = 0x62;
pub const PORT_KEYBOARD: u8 = 0x82;
pub const PORT_DC012: u8 = 0xA2;
pub const PORT_DC011: u8 = 0xC2;

/// What happened while the peripherals were clocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    /// The serial controller interrupted with no host attached.
    pub serial_closed: bool,
    /// Vertical retrace began.
    pub vsync: bool,
}

pub struct Vt100Bus {
    ram: Box<[u8; 0x10000]>,
    touched: Box<[bool]>,
    pub uart: Usart8251,
    pub nvr: Er1400,
    pub kbd: ScanKeyboard,
    pub display: DisplayRegs,
    pub timing: Timing,
    avo: bool,
    int_vector: u8,
    int_pending: bool,
    cycles: Ticks,
}

impl Vt100Bus {
    #[must_use]
    pub fn new(uart: Usart8251, nvr: Er1400, avo: bool) -> Self {
        Self {
            ram: Box::new([0; 0x10000]),
            touched: vec![false; 0x10000].into_boxed_slice(),
            uart,
            nvr,
            kbd: ScanKeyboard::new(),
            display: DisplayRegs::new(),
            timing: Timing::new(),
            avo,
            int_vector: IDLE_VECTOR,
            int_pending: false,
            cycles: Ticks::ZERO,
        }
    }

    /// Copy a firmware image into ROM space.
    pub fn load_rom(&mut self, image: &[u8]) {
        let len = image.len().min(ROM_SIZE);
        self.ram[..len].copy_from_slice(&image[..len]);
    }

    #[must_use]
    pub fn ram(&self) -> &[u8; 0x10000] {
        &self.ram
    }

    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Store without marking the byte as touched.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    /// Written since the last [`Self::snapshot`].
    #[must_use]
    pub fn touched(&self, address: u16) -> bool {
        self.touched[usize::from(address)]
    }

    /// Forget which bytes were written.
    pub fn snapshot(&mut self) {
        self.touched.fill(false);
    }

    #[must_use]
    pub fn avo(&self) -> bool {
        self.avo
    }

    #[must_use]
    pub fn cycles(&self) -> Ticks {
        self.cycles
    }

    #[must_use]
    pub fn interrupt_pending(&self) -> bool {
        self.int_pending
    }

    /// Current data bus vector.
    #[must_use]
    pub fn vector(&self) -> u8 {
        self.int_vector
    }

    fn raise(&mut self, vector: u8) {
        self.int_vector |= vector;
        self.int_pending = true;
    }

    /// With no request outstanding the data bus floats back to RST 0.
    pub fn settle_interrupt(&mut self) {
        if !self.int_pending {
            self.int_vector = IDLE_VECTOR;
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = if self.avo { 0x04 } else { 0x06 };
        if self.timing.lba7.value() {
            flags |= 0x40;
        }
        if self.nvr.data() {
            flags |= 0x20;
        }
        if Timing::even_field(self.cycles.get()) {
            flags |= 0x10;
        }
        if self.uart.xmit_ready() {
            flags |= 0x01;
        }
        if self.kbd.tx_buffer_empty() {
            flags |= 0x80;
        }
        flags
    }

    /// Clock every peripheral by `delta` CPU cycles.
    pub fn advance(&mut self, delta: u32) -> StepEvents {
        let mut events = StepEvents::default();
        self.cycles += Ticks::from(delta);

        if self.timing.uart.advance_rising(delta) {
            if let Some(event) = self.uart.clock() {
                self.raise(SERIAL_VECTOR);
                if event == SerialEvent::Closed || !self.uart.is_open() {
                    events.serial_closed = true;
                }
            }
        }
        if self.timing.lba4.advance(delta) && self.kbd.clock(self.timing.lba4.value()) {
            self.raise(KEYBOARD_VECTOR);
        }
        if self.timing.lba7.advance(delta) {
            self.nvr.clock(self.timing.lba7.value());
        }
        if self.timing.vertical.advance_rising(delta) {
            self.raise(VERTICAL_VECTOR);
            events.vsync = true;
        }
        events
    }
}

impl Bus for Vt100Bus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        let index = usize::from(address);
        if index < ROM_SIZE {
            return;
        }
        self.ram[index] = value;
        self.touched[index] = true;
    }

    fn io_read(&mut self, port: u8) -> u8 {
        match port {
            PORT_DATA => self.uart.read_data(),
            PORT_COMMAND => self.uart.read_command(),
            PORT_FLAGS => self.flags(),
            PORT_KEYBOARD => self.kbd.latch(),
            _ => {
                debug!("IN PORT {port:02x}");
                0
            }
        }
    }

    fn io_write(&mut self, port: u8, value: u8) {
        match port {
            PORT_DATA => self.uart.write_data(value),
            PORT_COMMAND => self.uart.write_command(value),
            PORT_BAUD => {
                self.timing.set_baud(value);
            }
            PORT_FLAGS => self.display.bright = value,
            PORT_NVR => self.nvr.set_latch(value),
            PORT_KEYBOARD => self.kbd.set_status(value),
            PORT_DC012 => self.display.write_dc012(value),
            PORT_DC011 => match self.display.write_dc011(value) {
                ScanChange::Refresh50(on) => self.timing.set_refresh50(on),
                ScanChange::Columns132(on) => self.uart.write_cols(on),
            },
            _ => debug!("OUT PORT {port:02x} <- {value:02x}"),
        }
    }

    fn interrupt_vector(&self) -> Option<u8> {
        self.int_pending.then_some(self.int_vector)
    }

    fn acknowledge_interrupt(&mut self) {
        self.int_pending = false;
    }
}
