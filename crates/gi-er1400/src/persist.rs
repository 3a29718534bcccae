//! Text-file persistence for the cell array.
//!
//! One four-digit lowercase hex value per cell, ten per line separated by
//! single spaces, a newline after every tenth value.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::{CELLS, CELL_MASK, Er1400Error};

/// Parse a persisted table. Any malformed or missing token is an error.
pub fn parse(text: &str) -> Result<[u16; CELLS], Er1400Error> {
    let mut cells = [0u16; CELLS];
    let mut tokens = text.split_ascii_whitespace();
    for (index, cell) in cells.iter_mut().enumerate() {
        let token = tokens.next().ok_or(Er1400Error::Truncated { found: index })?;
        let value = u16::from_str_radix(token, 16).map_err(|_| Er1400Error::BadToken {
            index,
            token: token.to_string(),
        })?;
        *cell = value & CELL_MASK;
    }
    Ok(cells)
}

/// Render the table in the persisted layout.
#[must_use]
pub fn render(cells: &[u16; CELLS]) -> String {
    let mut out = String::with_capacity(CELLS * 5);
    for (i, cell) in cells.iter().enumerate() {
        let _ = write!(out, "{cell:04x}");
        out.push(if i % 10 == 9 { '\n' } else { ' ' });
    }
    out
}

pub fn load(path: &Path) -> Result<[u16; CELLS], Er1400Error> {
    let text = fs::read_to_string(path).map_err(|source| Er1400Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

pub fn save(path: &Path, cells: &[u16; CELLS]) -> Result<(), Er1400Error> {
    fs::write(path, render(cells)).map_err(|source| Er1400Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
