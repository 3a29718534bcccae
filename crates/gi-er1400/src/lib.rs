//! General Instrument ER1400 electrically alterable ROM.
//!
//! 100 words of 14 bits arranged as a 10x10 array. The host drives the chip
//! bit-serially: it latches a 3-bit command plus one data bit, then clocks
//! the chip. Addresses are not binary. Twenty address lines each select one
//! row or column, so the address register carries one active (low) bit per
//! decade.
//!
//! # Latch byte
//!
//! | Bits | Meaning       |
//! |------|---------------|
//! | 3-1  | Command code  |
//! | 0    | Data in       |
//!
//! # Commands
//!
//! | Code  | Command     | Effect                                  |
//! |-------|-------------|-----------------------------------------|
//! | `111` | Standby     | none                                    |
//! | `001` | Accept addr | shift data bit into address register    |
//! | `101` | Erase       | selected cell = all ones                |
//! | `000` | Accept data | shift data bit into data register       |
//! | `100` | Write       | selected cell = data register           |
//! | `110` | Read        | data register = selected cell           |
//! | `010` | Shift out   | output = data bit 13, shift left        |
//! | `011` | Unused      | none                                    |

mod persist;

use std::path::{Path, PathBuf};

use emu_core::{Observable, Value};
use tracing::{debug, warn};

pub use persist::{parse, render};

/// Number of cells.
pub const CELLS: usize = 100;

/// Cell width.
pub const CELL_MASK: u16 = 0x3FFF;

const ADDRESS_MASK: u32 = 0xF_FFFF;

/// Only stores into decoded cells at or above this index are written back
/// to the file.
const PERSIST_FROM: usize = 50;

/// Factory configuration, laid out in decoded cell order.
pub const DEFAULT_IMAGE: [u16; CELLS] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x00e0, 0x0000, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x00e0, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0020, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0040, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0030, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0050, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x008e, 0x0080, 0x0080, 0x0080, 0x0080,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0051, 0x0008, 0x0080, 0x0080, 0x0080, 0x0080,
];

#[derive(Debug, thiserror::Error)]
pub enum Er1400Error {
    #[error("cannot access NVR file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("NVR file ends after {found} of 100 cells")]
    Truncated { found: usize },
    #[error("NVR cell {index}: bad hex value {token:?}")]
    BadToken { index: usize, token: String },
}

/// Latched command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Standby,
    AcceptAddress,
    Erase,
    AcceptData,
    Write,
    Read,
    ShiftOut,
    Unused,
}

impl Command {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b111 => Self::Standby,
            0b001 => Self::AcceptAddress,
            0b101 => Self::Erase,
            0b000 => Self::AcceptData,
            0b100 => Self::Write,
            0b110 => Self::Read,
            0b010 => Self::ShiftOut,
            _ => Self::Unused,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Standby => 0b111,
            Self::AcceptAddress => 0b001,
            Self::Erase => 0b101,
            Self::AcceptData => 0b000,
            Self::Write => 0b100,
            Self::Read => 0b110,
            Self::ShiftOut => 0b010,
            Self::Unused => 0b011,
        }
    }

    /// Latch byte carrying this command and a data bit.
    #[must_use]
    pub const fn latch(self, data: bool) -> u8 {
        (self.bits() << 1) | data as u8
    }
}

/// Decode the one-hot-per-decade address register into a cell index.
///
/// The register is active low. The low ten bits select the ones digit and
/// the next ten the tens digit. With several bits active in a decade the
/// highest one wins.
#[must_use]
pub fn decode_address(address_reg: u32) -> usize {
    let active = !address_reg;
    let digit = |bits: u32| -> usize {
        (0..10usize)
            .filter(|&i| bits & (1u32 << i) != 0)
            .last()
            .unwrap_or(0)
    };
    digit((active >> 10) & 0x3FF) * 10 + digit(active & 0x3FF)
}

/// The address register value that selects `cell`.
#[must_use]
pub fn encode_address(cell: usize) -> u32 {
    let (tens, ones) = (cell / 10 % 10, cell % 10);
    !((1u32 << ones) | (1u32 << (10 + tens))) & ADDRESS_MASK
}

/// ER1400 chip state.
pub struct Er1400 {
    address_reg: u32,
    data_reg: u16,
    contents: [u16; CELLS],
    latch: u8,
    out: bool,
    last_written: Option<usize>,
    path: Option<PathBuf>,
    saves: u32,
    save_error: Option<Er1400Error>,
}

impl Er1400 {
    /// A chip holding the factory image with persistence disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_contents(DEFAULT_IMAGE)
    }

    #[must_use]
    pub fn with_contents(contents: [u16; CELLS]) -> Self {
        Self {
            address_reg: 0xFFFF,
            data_reg: 0,
            contents: contents.map(|c| c & CELL_MASK),
            latch: Command::Standby.latch(false),
            out: false,
            last_written: None,
            path: None,
            saves: 0,
            save_error: None,
        }
    }

    /// A chip backed by `path`.
    ///
    /// Contents come from the file when it parses, otherwise from the factory
    /// image. The load error, if any, is returned alongside so the caller can
    /// report it.
    pub fn with_file(path: impl Into<PathBuf>) -> (Self, Option<Er1400Error>) {
        let path = path.into();
        let (contents, error) = match persist::load(&path) {
            Ok(cells) => (cells, None),
            Err(e) => {
                debug!("NVR falling back to factory image: {e}");
                (DEFAULT_IMAGE, Some(e))
            }
        };
        let mut chip = Self::with_contents(contents);
        chip.path = Some(path);
        (chip, error)
    }

    /// Replace the contents from `path`.
    pub fn load(&mut self, path: &Path) -> Result<(), Er1400Error> {
        self.contents = persist::load(path)?;
        Ok(())
    }

    /// Write the contents to `path`.
    pub fn save(&self, path: &Path) -> Result<(), Er1400Error> {
        persist::save(path, &self.contents)
    }

    /// Latch a command and data bit, applied on the next rising clock.
    pub fn set_latch(&mut self, latch: u8) {
        self.latch = latch;
    }

    /// Clock the chip. Only the rising edge acts.
    pub fn clock(&mut self, rising: bool) {
        if !rising {
            return;
        }
        let data_in = self.latch & 1;
        match Command::from_bits(self.latch >> 1) {
            Command::Standby | Command::Unused => {}
            Command::AcceptAddress => {
                self.address_reg = ((self.address_reg << 1) | u32::from(data_in)) & ADDRESS_MASK;
            }
            Command::Erase => {
                self.contents[decode_address(self.address_reg)] = CELL_MASK;
            }
            Command::AcceptData => {
                self.data_reg = ((self.data_reg << 1) | u16::from(data_in)) & CELL_MASK;
            }
            Command::Write => self.write(),
            Command::Read => {
                self.data_reg = self.contents[decode_address(self.address_reg)];
            }
            Command::ShiftOut => {
                self.out = self.data_reg & 0x2000 != 0;
                self.data_reg = (self.data_reg << 1) & CELL_MASK;
            }
        }
    }

    fn write(&mut self) {
        let addr = decode_address(self.address_reg);
        let data = self.data_reg & CELL_MASK;
        if self.last_written != Some(addr) || self.contents[addr] != data {
            self.contents[addr] = data;
            if addr >= PERSIST_FROM {
                self.persist();
            }
        }
        self.last_written = Some(addr);
    }

    fn persist(&mut self) {
        let Some(path) = &self.path else {
            return;
        };
        self.saves += 1;
        if let Err(e) = persist::save(path, &self.contents) {
            warn!("{e}");
            self.save_error = Some(e);
        }
    }

    /// Serial data output line.
    #[must_use]
    pub fn data(&self) -> bool {
        self.out
    }

    #[must_use]
    pub fn contents(&self) -> &[u16; CELLS] {
        &self.contents
    }

    #[must_use]
    pub fn address_reg(&self) -> u32 {
        self.address_reg
    }

    #[must_use]
    pub fn data_reg(&self) -> u16 {
        self.data_reg
    }

    #[must_use]
    pub fn latch(&self) -> u8 {
        self.latch
    }

    /// Backing file, if persistence is enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of times the table was persisted after a write.
    #[must_use]
    pub fn saves(&self) -> u32 {
        self.saves
    }

    /// The most recent persistence failure, cleared on read.
    pub fn take_save_error(&mut self) -> Option<Er1400Error> {
        self.save_error.take()
    }
}

impl Default for Er1400 {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for Er1400 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "address" => Some(Value::U32(self.address_reg)),
            "decoded" => Some(Value::U8(decode_address(self.address_reg) as u8)),
            "data" => Some(Value::U16(self.data_reg)),
            "latch" => Some(Value::U8(self.latch)),
            "out" => Some(Value::Bool(self.out)),
            "saves" => Some(Value::U32(self.saves)),
            _ => {
                let index: usize = path.strip_prefix("cell.")?.parse().ok()?;
                self.contents.get(index).map(|&c| Value::U16(c))
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["address", "decoded", "data", "latch", "out", "saves", "cell.<n>"]
    }
}
