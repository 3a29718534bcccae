//! Debugger helpers: address parsing, traces and memory dumps.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::AddressError;

/// Screen RAM range written by a memory dump.
pub const DUMP_START: u16 = 0x2000;
pub const DUMP_END: u16 = 0x3FFF;

const DUMP_WIDTH: usize = 16;

/// Parse an operator-entered address: one to four hex digits.
pub fn parse_address(text: &str) -> Result<u16, AddressError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AddressError::Empty);
    }
    if text.len() > 4 {
        return Err(AddressError::TooLong(text.to_string()));
    }
    if !text.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::NotHex(text.to_string()));
    }
    u16::from_str_radix(text, 16).map_err(|_| AddressError::NotHex(text.to_string()))
}

/// Messages for a breakpoint hit: a header, then one line per recorded PC.
#[must_use]
pub fn breakpoint_trace(address: u16, history: impl IntoIterator<Item = u16>) -> Vec<String> {
    std::iter::once(format!("Breakpoint trace for {address:04x}:"))
        .chain(history.into_iter().map(|pc| format!("  PC {pc:04x}")))
        .collect()
}

/// Write `ram[DUMP_START..=DUMP_END]` as hex, sixteen bytes per line.
pub fn dump_screen_memory(ram: &[u8; 0x10000], out: &mut impl Write) -> io::Result<()> {
    let region = &ram[usize::from(DUMP_START)..=usize::from(DUMP_END)];
    for chunk in region.chunks(DUMP_WIDTH) {
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()
}

/// [`dump_screen_memory`] into a new file at `path`.
pub fn save_screen_memory(ram: &[u8; 0x10000], path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    dump_screen_memory(ram, &mut out)
}
