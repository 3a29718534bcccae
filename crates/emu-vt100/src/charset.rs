//! Glyph tables.
//!
//! Codes 0-31 in screen RAM are the VT100 special graphics set. With the
//! alternate character ROM selected, codes 0x80-0xFF map to the DEC
//! multinational set.

/// Special graphics for codes 0x00-0x1F.
pub const VT100_CHARS: [char; 32] = [
    '\u{0020}', '\u{2666}', '\u{2592}', '\u{2409}', '\u{240c}', '\u{240d}', '\u{240a}', '\u{00b0}',
    '\u{00b1}', '\u{2424}', '\u{240b}', '\u{2518}', '\u{2510}', '\u{250c}', '\u{2514}', '\u{253c}',
    '\u{23ba}', '\u{23bb}', '\u{2500}', '\u{23bc}', '\u{23bd}', '\u{251c}', '\u{2524}', '\u{2534}',
    '\u{252c}', '\u{2502}', '\u{2264}', '\u{2265}', '\u{03c0}', '\u{2260}', '\u{00a3}', '\u{00b7}',
];

/// Placeholder for positions the multinational set leaves undefined.
const RESERVED: char = '\u{2426}';

/// DEC multinational characters for codes 0x80-0xFF.
pub const DEC_MCS: [char; 128] = {
    let mut table = ['\0'; 128];
    let mut i = 0;
    while i < 128 {
        // Identity is valid for every code in 0x80..=0xFF.
        table[i] = match char::from_u32(0x80 + i as u32) {
            Some(c) => c,
            None => RESERVED,
        };
        i += 1;
    }
    let reserved = [
        0xA4, 0xA6, 0xAC, 0xAD, 0xAE, 0xAF, 0xB4, 0xB8, 0xBE, 0xD0, 0xDE, 0xF0, 0xFE,
    ];
    let mut r = 0;
    while r < reserved.len() {
        table[reserved[r] - 0x80] = RESERVED;
        r += 1;
    }
    table[0xA8 - 0x80] = '\u{00a4}';
    table[0xD7 - 0x80] = '\u{0152}';
    table[0xDD - 0x80] = '\u{0178}';
    table[0xF7 - 0x80] = '\u{0153}';
    table[0xFD - 0x80] = '\u{00ff}';
    table[0xFF - 0x80] = '\u{fffd}';
    table
};

/// Full-width form of a printable code, for double-width lines.
#[must_use]
pub fn full_width(code: u8) -> Option<char> {
    match code {
        30 => Some('\u{ffe1}'),
        0x21..=0x7E => char::from_u32(0xFF00 + u32::from(code) - 0x20),
        _ => None,
    }
}

/// Plain ASCII stand-ins for the special graphics set.
fn ascii_graphic(code: u8) -> char {
    match code & 0x1F {
        1 => '*',
        2 => '#',
        7 => 'o',
        8 | 11..=15 | 21..=24 => '+',
        16..=20 => '-',
        25 => '|',
        26 => '<',
        27 => '>',
        28 => 'p',
        29 => '!',
        30 => 'L',
        31 => '.',
        _ => ' ',
    }
}

/// A decoded glyph and whether it already fills two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub wide: bool,
}

/// Choose the glyph for `code` (without its inverse bit).
///
/// `double_width` is set on double-width and double-height lines.
#[must_use]
pub fn glyph(code: u8, altchar: bool, double_width: bool, unicode: bool) -> Glyph {
    let code = code & 0x7F;
    if code == 0 || code == 0x7F {
        return Glyph { ch: ' ', wide: false };
    }
    if double_width && unicode {
        if let Some(ch) = full_width(code) {
            return Glyph { ch, wide: true };
        }
    }
    let ch = if (3..=6).contains(&code) || (code < 32 && unicode) {
        VT100_CHARS[usize::from(code & 0x1F)]
    } else if code < 32 {
        ascii_graphic(code)
    } else if altchar {
        DEC_MCS[usize::from(code)]
    } else {
        char::from(code)
    };
    Glyph { ch, wide: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_passthrough() {
        assert_eq!(glyph(b'A', false, false, true).ch, 'A');
        assert_eq!(glyph(b'A' | 0x80, false, false, false).ch, 'A');
        assert_eq!(glyph(0, false, false, true).ch, ' ');
        assert_eq!(glyph(0x7F, false, false, true).ch, ' ');
    }

    #[test]
    fn special_graphics() {
        assert_eq!(glyph(0x12, false, false, true).ch, '\u{2500}');
        assert_eq!(glyph(0x12, false, false, false).ch, '-');
        assert_eq!(glyph(0x03, false, false, false).ch, '\u{2409}');
        assert_eq!(glyph(0x1E, false, false, true).ch, '\u{00a3}');
    }

    #[test]
    fn double_width_forms() {
        let g = glyph(b'A', false, true, true);
        assert_eq!(g, Glyph { ch: '\u{ff21}', wide: true });
        assert_eq!(glyph(30, false, true, true).ch, '\u{ffe1}');
        assert!(!glyph(b'A', false, true, false).wide);
        assert!(!glyph(b' ', false, true, true).wide);
    }

    #[test]
    fn multinational() {
        assert_eq!(DEC_MCS[0], '\u{80}');
        assert_eq!(DEC_MCS[0xA4 - 0x80], RESERVED);
        assert_eq!(DEC_MCS[0xA8 - 0x80], '\u{a4}');
        assert_eq!(DEC_MCS[0xD7 - 0x80], '\u{152}');
        assert_eq!(DEC_MCS[0xC5 - 0x80], '\u{c5}');
        assert_eq!(glyph(b'E', true, false, true).ch, '\u{c5}');
    }
}
