//! Firmware loading and the built-in banner ROM.

use std::fs;

use crate::config::RomSource;
use crate::error::RomError;
use crate::video::{LineAttr, SCREEN_BASE};

/// ROM occupies the first 8 KiB.
pub const ROM_SIZE: usize = 0x2000;

/// Where the banner's screen image sits in ROM.
const BANNER_DATA: u16 = 0x0040;

const BANNER: &[(LineAttr, &str)] = &[
    (LineAttr::Normal, ""),
    (LineAttr::DoubleWidth, "   EMU-VT100"),
    (LineAttr::Normal, ""),
    (LineAttr::Normal, "No firmware image was given, so this is the built-in banner."),
    (LineAttr::Normal, "Start with a VT100 ROM image path to boot the real firmware."),
    (LineAttr::Normal, ""),
    (LineAttr::Normal, "F10 toggles control mode. In control mode: q quits,"),
    (LineAttr::Normal, "space runs or pauses, n steps, b/d add/remove breakpoints."),
];

/// Load the image named by `source`, truncated to [`ROM_SIZE`].
pub fn load(source: &RomSource) -> Result<Vec<u8>, RomError> {
    let mut image = match source {
        RomSource::BuiltIn => return Ok(builtin()),
        RomSource::Bytes(bytes) => bytes.clone(),
        RomSource::File(path) => {
            let bytes = fs::read(path).map_err(|source| RomError::Read {
                path: path.clone(),
                source,
            })?;
            if bytes.is_empty() {
                return Err(RomError::Empty { path: path.clone() });
            }
            bytes
        }
    };
    image.truncate(ROM_SIZE);
    Ok(image)
}

/// Screen RAM contents for the banner: two blank fill lines, then the text
/// lines, the last one pointing at itself.
#[must_use]
pub fn banner_screen() -> Vec<u8> {
    let mut screen = vec![0x7F, 0x70, 0x03, 0x7F, 0x70, 0x06];
    let mut start = screen.len();
    for (i, (_, text)) in BANNER.iter().enumerate() {
        let next_attr = BANNER.get(i + 1).map_or(LineAttr::Normal, |(a, _)| *a);
        let next = if i + 1 == BANNER.len() {
            start
        } else {
            start + text.len() + 3
        };
        screen.extend_from_slice(text.as_bytes());
        screen.push(0x7F);
        screen.extend_from_slice(&descriptor(next, next_attr));
        start = next;
    }
    screen
}

/// Next-line pointer into the 0x2000 bank.
fn descriptor(offset: usize, attr: LineAttr) -> [u8; 2] {
    let offset = offset & 0x0FFF;
    [0x10 | (attr.bits() << 5) | (offset >> 8) as u8, offset as u8]
}

/// A tiny 8080 program that copies the banner into screen RAM, fills the
/// attribute RAM with "no attributes", turns the display on and spins.
#[must_use]
pub fn builtin() -> Vec<u8> {
    let screen = banner_screen();
    let [len_lo, len_hi] = (screen.len() as u16).to_le_bytes();
    let [src_lo, src_hi] = BANNER_DATA.to_le_bytes();
    let [dst_lo, dst_hi] = SCREEN_BASE.to_le_bytes();
    let code = [
        0x31, 0x00, 0x2C, // LXI SP,2C00
        0x21, src_lo, src_hi, // LXI H,banner
        0x11, dst_lo, dst_hi, // LXI D,2000
        0x01, len_lo, len_hi, // LXI B,len
        0x7E, 0x12, 0x23, 0x13, 0x0B, 0x78, 0xB1, 0xC2, 0x0C, 0x00, // copy loop
        0x21, 0x00, 0x30, // LXI H,3000
        0x01, len_lo, len_hi, // LXI B,len
        0x36, 0xFF, 0x23, 0x0B, 0x78, 0xB1, 0xC2, 0x1C, 0x00, // fill loop
        0x3E, 0x08, 0xD3, 0x42, // brightness 75%
        0xC3, 0x29, 0x00, // idle: JMP idle
    ];
    let mut rom = vec![0u8; usize::from(BANNER_DATA)];
    rom[..code.len()].copy_from_slice(&code);
    rom.extend_from_slice(&screen);
    rom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_chains_lines_and_ends_in_self_loop() {
        let screen = banner_screen();
        let mut at = 0usize;
        let mut lines = 0;
        loop {
            let end = at + screen[at..].iter().position(|&b| b == 0x7F).unwrap();
            let a1 = screen[end + 1];
            let a2 = screen[end + 2];
            assert_eq!(a1 & 0x10, 0x10);
            let next = (usize::from(a1 & 0x0F) << 8) | usize::from(a2);
            lines += 1;
            if next == at {
                break;
            }
            at = next;
        }
        assert_eq!(lines, BANNER.len() + 2);
    }

    #[test]
    fn builtin_code_fits_before_banner() {
        let rom = builtin();
        assert_eq!(rom[0x29], 0xC3);
        assert_eq!(rom[0x2B], 0x00);
        assert!(rom.len() <= ROM_SIZE);
        assert_eq!(&rom[0x40..0x43], &[0x7F, 0x70, 0x03]);
    }

    #[test]
    fn file_images_are_truncated() {
        let image = load(&RomSource::Bytes(vec![0xAA; ROM_SIZE + 10])).unwrap();
        assert_eq!(image.len(), ROM_SIZE);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load(&RomSource::File("/nonexistent/vt100.bin".into())).unwrap_err();
        assert!(matches!(err, RomError::Read { .. }));
    }
}
