//! Screen RAM decoder.
//!
//! The video processor follows a linked list of lines through RAM. Each
//! line is a run of character bytes ended by 0x7F and a two-byte pointer to
//! the next line:
//!
//! | Bits (first byte) | Meaning                                   |
//! |-------------------|-------------------------------------------|
//! | 7                 | Next line is inside the scrolling region  |
//! | 6-5               | Next line's attributes, see [`LineAttr`]  |
//! | 4                 | Bank: 1 = 0x2000, 0 = 0x4000              |
//! | 3-0               | Offset bits 11-8 (second byte: bits 7-0)  |
//!
//! A line whose pointer leads back to itself ends the frame. Bit 7 of a
//! character byte selects reverse video; with the Advanced Video Option an
//! attribute byte sits 0x1000 above each character with active-low blink,
//! underline, bold and alternate-character bits.

use crate::charset::{self, Glyph};
use crate::display::DisplayRegs;

pub const SCREEN_BASE: u16 = 0x2000;
const ALT_BANK: u16 = 0x4000;
pub const ATTR_OFFSET: u16 = 0x1000;
const LINE_END: u8 = 0x7F;

/// Bytes scanned per line before the frame is abandoned.
const MAX_LINE: u16 = 133;
/// Lines followed per frame.
const MAX_LINES: usize = 30;
/// Displayed rows.
pub const ROWS: i32 = 24;

/// Setup screen marker at the start of the first visible line.
const SETUP_A: &[u8; 9] = b"SET-UP A\x7f";
const SETUP_B: &[u8; 9] = b"SET-UP B\x7f";

/// Row of the setup help header and first help line.
const SETUP_HEADER_ROW: i32 = 5;
const SETUP_TEXT_ROW: i32 = 7;

const SETUP_HEADER: &str = "Use the arrow keys, return and space to move cursor position.";

const SETUP_A_TEXT: &[&str] = &[
    "The up and down arrows control the brightness.   0 => Reset",
    "(on a real VT100!)                               1 => ",
    "                                                 2 => Toggle TAB",
    "                                                 3 => Clear all TABs",
    "                                                 4 => Online/Local",
    "                                                 5 => Setup B",
    "                                                 6 =>",
    "                                                 7 =>",
    "                                                 8 =>",
    "                                                 9 => Toggle 80/132",
    "",
    "                                                 Shift-S => Save",
    "                                                 Shift-R => Recall",
];

const SETUP_B_TEXT: &[&str] = &[
    "  X     Scroll 1-Smooth                          0 => Reset",
    "  .X    Repeat 1-On                              1 => ",
    "  . X   Screen 1-LightBG                         2 =>",
    "  .  X  Cursor 1-Block                           3 =>",
    "  .  .    X     Margin Bell                      4 => Online/Local",
    "  .  .    .X    Keyclick 1-On                    5 => Setup A",
    "  .  .    . X   1=Ansi/0=VT52                    6 => Toggle this",
    "  .  .    .  X  FlowCtrl 1-On                    7 => Next Xmit Speed",
    "  .  .    .  .    X     UK-Ascii 1-On            8 => Next Rcv Speed",
    "  .  .    .  .    .X    LineWrap 1-On            9 =>",
    "  .  .    .  .    . X   1-Crlf, 0-Cr",
    "  .  .    .  .    .  X  1-Interlace              Shift-S => Save",
    "  .  .    .  .    .  .    X     Parity 1-Even    Shift-R => Recall",
    "  .  .    .  .    .  .    .X    Parity Sense     Shift-A => Answerback",
    "  .  .    .  .    .  .    . X   BPC 1=8Bit",
    "  .  .    .  .    .  .    .  X  Refresh 1=50Hz",
];

/// Line size attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAttr {
    DoubleBottom = 0,
    DoubleTop = 1,
    DoubleWidth = 2,
    Normal = 3,
}

impl LineAttr {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::DoubleBottom,
            1 => Self::DoubleTop,
            2 => Self::DoubleWidth,
            _ => Self::Normal,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_wide(self) -> bool {
        self != Self::Normal
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellAttrs {
    pub inverse: bool,
    pub underline: bool,
    pub blink: bool,
    pub bold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub attrs: CellAttrs,
}

/// One displayed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based screen row.
    pub y: i32,
    pub lattr: LineAttr,
    pub in_scroll: bool,
    /// Row belongs to a region that is smooth-scrolling right now.
    pub scrolling: bool,
    pub cells: Vec<Cell>,
}

impl Row {
    #[must_use]
    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.ch).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPage {
    A,
    B,
}

impl SetupPage {
    /// Help text drawn over the setup screen, as (row, text).
    #[must_use]
    pub fn overlay(self) -> Vec<(i32, &'static str)> {
        let text = match self {
            Self::A => SETUP_A_TEXT,
            Self::B => SETUP_B_TEXT,
        };
        std::iter::once((SETUP_HEADER_ROW, SETUP_HEADER))
            .chain((SETUP_TEXT_ROW..).zip(text.iter().copied()))
            .collect()
    }
}

/// A decoded screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub title: String,
    /// Display is blanked; nothing else is valid.
    pub disabled: bool,
    pub rows: Vec<Row>,
    pub setup: Option<SetupPage>,
    /// 132-column mode.
    pub wide: bool,
}

impl Frame {
    /// Plain text per decoded row with the setup overlay applied.
    #[must_use]
    pub fn text_rows(&self) -> Vec<(i32, String)> {
        let mut rows: Vec<(i32, String)> = self.rows.iter().map(|r| (r.y, r.text())).collect();
        if let Some(page) = self.setup {
            for (y, text) in page.overlay() {
                match rows.iter_mut().find(|(ry, _)| *ry == y) {
                    Some((_, line)) => *line = overlay_text(line, text),
                    None => rows.push((y, text.to_string())),
                }
            }
            rows.sort_by_key(|(y, _)| *y);
        }
        rows
    }
}

/// `top` written over the start of `base`.
fn overlay_text(base: &str, top: &str) -> String {
    let mut out: String = top.to_string();
    out.extend(base.chars().skip(top.chars().count()));
    out
}

fn title(regs: &DisplayRegs) -> String {
    let mut title = format!("Video [bright {}%]", regs.bright_percent());
    if regs.scroll_latch != 0 {
        title.push_str(&format!("[Scroll {}]", regs.scroll_latch));
    }
    title
}

fn byte(ram: &[u8; 0x10000], address: u16) -> u8 {
    ram[usize::from(address)]
}

/// Fill lines the video processor reads before the first displayed row.
#[must_use]
pub const fn hidden_lines(regs: &DisplayRegs) -> i32 {
    if regs.refresh50 { 5 } else { 2 }
}

/// Decode screen RAM into rows, starting at [`SCREEN_BASE`] behind the
/// refresh rate's fill lines.
#[must_use]
pub fn decode(ram: &[u8; 0x10000], regs: &DisplayRegs, avo: bool, unicode: bool) -> Frame {
    decode_lines(ram, regs, avo, unicode, SCREEN_BASE, hidden_lines(regs))
}

/// Decode the line list at `start`, treating the first `hidden` lines as
/// off screen.
#[must_use]
pub fn decode_lines(
    ram: &[u8; 0x10000],
    regs: &DisplayRegs,
    avo: bool,
    unicode: bool,
    start: u16,
    hidden: i32,
) -> Frame {
    if regs.blanked() {
        return Frame {
            title: "Video [disabled]".to_string(),
            disabled: true,
            rows: Vec::new(),
            setup: None,
            wide: regs.cols132,
        };
    }

    let mut rows: Vec<Row> = Vec::new();
    let mut start = start;
    let mut lattr = LineAttr::Normal;
    let mut in_scroll = false;
    let mut y: i32 = -hidden;
    let mut scroll_fix = regs.last_latch != 0;
    let mut setup: Option<SetupPage> = None;
    let scroll_active = regs.scroll_latch != 0 || regs.last_latch != 0;

    for _ in 0..MAX_LINES {
        if y >= ROWS {
            break;
        }
        y += 1;
        let mut p = start;
        let maxp = start.wrapping_add(MAX_LINE);

        if y == 1 && regs.scroll_latch == 0 {
            let head: Vec<u8> = (0..9).map(|i| byte(ram, start.wrapping_add(i))).collect();
            setup = if head == SETUP_A {
                Some(SetupPage::A)
            } else if head == SETUP_B {
                Some(SetupPage::B)
            } else {
                None
            };
        } else if y == 1 {
            setup = None;
        }

        let skip = scroll_fix && in_scroll;
        let mut cells = Vec::new();
        while byte(ram, p) != LINE_END && p != maxp {
            let c = byte(ram, p);
            let attrs = if avo {
                byte(ram, p.wrapping_add(ATTR_OFFSET))
            } else {
                0x0F
            };
            p = p.wrapping_add(1);
            if y <= 0 || skip {
                continue;
            }
            cells.extend(render_char(c, attrs, lattr, regs, avo, unicode));
        }
        let overlong = p == maxp;
        if skip {
            y -= 1;
            scroll_fix = false;
        } else if y > 0 {
            rows.push(Row {
                y,
                lattr,
                in_scroll,
                scrolling: scroll_active && in_scroll,
                cells,
            });
        }
        if overlong {
            break;
        }
        if (4..=22).contains(&y) && p != start {
            setup = None;
        }

        let a1 = byte(ram, p.wrapping_add(1));
        let a2 = byte(ram, p.wrapping_add(2));
        let bank = if a1 & 0x10 != 0 { SCREEN_BASE } else { ALT_BANK };
        let next = bank | (u16::from(a1 & 0x0F) << 8) | u16::from(a2);
        lattr = LineAttr::from_bits(a1 >> 5);
        in_scroll = a1 & 0x80 != 0;
        if next == start {
            break;
        }
        start = next;
    }

    Frame {
        title: title(regs),
        disabled: false,
        rows,
        setup,
        wide: regs.cols132,
    }
}

/// Cells for one character byte: one, or two on double-width lines.
fn render_char(
    c: u8,
    attrs: u8,
    lattr: LineAttr,
    regs: &DisplayRegs,
    avo: bool,
    unicode: bool,
) -> impl Iterator<Item = Cell> {
    let mut inverse = c & 0x80 != 0;
    let mut underline = attrs & 0x02 == 0;
    let blink = attrs & 0x01 == 0;
    let bold = attrs & 0x04 == 0;
    let altchar = attrs & 0x08 == 0;
    if !avo && regs.base_attr {
        underline = inverse;
        inverse = false;
    }
    if regs.screen_rev {
        inverse = !inverse;
    }
    let attrs = CellAttrs {
        inverse,
        underline,
        blink,
        bold,
    };
    let Glyph { ch, wide } = charset::glyph(c, altchar, lattr.is_wide(), unicode);
    let pad = (lattr.is_wide() && !wide).then_some(Cell { ch: ' ', attrs });
    std::iter::once(Cell { ch, attrs }).chain(pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn regs() -> DisplayRegs {
        DisplayRegs {
            bright: 0,
            ..DisplayRegs::new()
        }
    }

    /// RAM with two hidden fill lines followed by `lines`, chained in order.
    fn screen(lines: &[(&[u8], u8)]) -> Box<[u8; 0x10000]> {
        let mut ram = Box::new([0u8; 0x10000]);
        for b in &mut ram[0x3000..0x4000] {
            *b = 0xFF;
        }
        let mut at = 0x2000usize;
        let mut put = |ram: &mut [u8; 0x10000], text: &[u8], flags: u8, last: bool| {
            ram[at..at + text.len()].copy_from_slice(text);
            let end = at + text.len();
            let next = if last { at } else { end + 3 };
            ram[end] = 0x7F;
            ram[end + 1] = flags | 0x10 | ((next >> 8) & 0x0F) as u8;
            ram[end + 2] = next as u8;
            at = next;
        };
        put(&mut *ram, b"", 0x60, false);
        put(&mut *ram, b"", 0x60, false);
        for (i, (text, flags)) in lines.iter().enumerate() {
            put(&mut *ram, text, *flags, i + 1 == lines.len());
        }
        ram
    }

    #[test]
    fn blank_display_reports_disabled() {
        let ram = Box::new([0u8; 0x10000]);
        let frame = decode(&ram, &DisplayRegs::new(), true, false);
        assert!(frame.disabled);
        assert_eq!(frame.title, "Video [disabled]");
        assert!(frame.rows.is_empty());
    }

    #[test]
    fn self_loop_ends_frame() {
        let mut ram = Box::new([0u8; 0x10000]);
        ram[0x2000..0x2005].copy_from_slice(&[b'H', b'I', 0x7F, 0x70, 0x00]);
        let frame = decode_lines(&ram, &regs(), false, false, SCREEN_BASE, 0);
        assert_eq!(frame.text_rows(), vec![(1, "HI".to_string())]);
        assert_eq!(frame.rows[0].lattr, LineAttr::Normal);

        let ram = screen(&[(b"HI", 0x60)]);
        let frame = decode(&ram, &regs(), false, false);
        assert_eq!(frame.text_rows(), vec![(1, "HI".to_string())]);
    }

    #[test]
    fn inverse_and_attributes() {
        let mut ram = screen(&[(&[b'A' | 0x80, b'B'], 0x60)]);
        // B: bold and underline (active low).
        ram[0x3000 + 7] = 0xF9;
        let frame = decode(&ram, &regs(), true, false);
        let cells = &frame.rows[0].cells;
        assert!(cells[0].attrs.inverse);
        assert!(!cells[0].attrs.bold);
        assert!(cells[1].attrs.bold);
        assert!(cells[1].attrs.underline);
        assert!(!cells[1].attrs.inverse);
    }

    #[test]
    fn base_attribute_and_screen_reverse() {
        let ram = screen(&[(&[b'A' | 0x80, b'B'], 0x60)]);
        let mut r = regs();
        r.base_attr = true;
        r.screen_rev = true;
        let frame = decode(&ram, &r, false, false);
        let cells = &frame.rows[0].cells;
        assert!(cells[0].attrs.underline);
        assert!(cells[0].attrs.inverse);
        assert!(!cells[1].attrs.underline);
        assert!(cells[1].attrs.inverse);
    }

    #[test]
    fn double_width_lines_pad() {
        let ram = screen(&[(b"", 0x40), (b"AB", 0x60)]);
        let frame = decode(&ram, &regs(), false, false);
        assert_eq!(frame.rows[1].lattr, LineAttr::DoubleWidth);
        assert_eq!(frame.rows[1].text(), "A B ");
        let frame = decode(&ram, &regs(), false, true);
        assert_eq!(frame.rows[1].text(), "\u{ff21}\u{ff22}");
    }

    #[test]
    fn overlong_line_is_cut_and_ends_frame() {
        let long = [b'x'; 140];
        let ram = screen(&[(b"ok", 0x60), (&long, 0x60), (b"after", 0x60)]);
        let frame = decode(&ram, &regs(), false, false);
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(frame.rows[0].text(), "ok");
        assert_eq!(frame.rows[1].y, 2);
        assert_eq!(frame.rows[1].text(), "x".repeat(usize::from(MAX_LINE)));
    }

    #[test]
    fn frame_stops_at_last_screen_row() {
        let lines: Vec<(&[u8], u8)> = vec![(b"row".as_slice(), 0x60); 30];
        let ram = screen(&lines);
        let frame = decode(&ram, &regs(), false, false);
        let ys: Vec<i32> = frame.rows.iter().map(|r| r.y).collect();
        assert_eq!(ys, (1..=ROWS).collect::<Vec<_>>());
    }

    #[test]
    fn fifty_hertz_hides_five_lines() {
        let lines: Vec<(&[u8], u8)> = vec![
            (b"", 0x60),
            (b"", 0x60),
            (b"", 0x60),
            (b"top", 0x60),
        ];
        let ram = screen(&lines);
        let mut r = regs();
        r.refresh50 = true;
        assert_eq!(hidden_lines(&r), 5);
        let frame = decode(&ram, &r, false, false);
        assert_eq!(frame.text_rows(), vec![(1, "top".to_string())]);
    }

    #[test]
    fn setup_screen_detected() {
        let mut lines: Vec<(&[u8], u8)> = vec![(b"SET-UP A", 0x60)];
        lines.extend(std::iter::repeat((b"".as_slice(), 0x60)).take(22));
        let ram = screen(&lines);
        let frame = decode(&ram, &regs(), false, false);
        assert_eq!(frame.setup, Some(SetupPage::A));
        let text = frame.text_rows();
        assert!(text.iter().any(|(y, t)| *y == 5 && t.starts_with("Use the arrow keys")));
        assert!(text.iter().any(|(y, t)| *y == 16 && t.ends_with("Toggle 80/132")));
    }

    #[test]
    fn setup_needs_empty_body() {
        let mut lines: Vec<(&[u8], u8)> = vec![(b"SET-UP B", 0x60)];
        lines.extend(std::iter::repeat((b"".as_slice(), 0x60)).take(5));
        lines.push((b"text", 0x60));
        let ram = screen(&lines);
        let frame = decode(&ram, &regs(), false, false);
        assert_eq!(frame.setup, None);
    }

    #[test]
    fn title_shows_brightness_and_scroll() {
        let ram = screen(&[(b"x", 0x60)]);
        let mut r = regs();
        r.bright = 8;
        r.scroll_latch = 3;
        let frame = decode(&ram, &r, false, false);
        assert_eq!(frame.title, "Video [bright 75%][Scroll 3]");
        assert!(frame.setup.is_none());
    }

    #[test]
    fn smooth_scroll_skips_first_region_line() {
        let ram = screen(&[(b"top", 0xE0), (b"one", 0xE0), (b"two", 0x60)]);
        let mut r = regs();
        r.last_latch = 5;
        let frame = decode(&ram, &r, false, false);
        let text: Vec<String> = frame.rows.iter().map(Row::text).collect();
        assert_eq!(text, vec!["top", "two"]);
        assert_eq!(frame.rows[1].y, 2);
        assert!(frame.rows[1].scrolling);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn arbitrary_ram_decodes_to_ordered_rows(
            bytes in prop::collection::vec(any::<u8>(), 0x3000),
            avo in any::<bool>()
        ) {
            let mut ram = Box::new([0u8; 0x10000]);
            ram[0x2000..0x5000].copy_from_slice(&bytes);
            let frame = decode(&ram, &regs(), avo, false);
            let mut last = 0;
            for row in &frame.rows {
                prop_assert!(row.y > last && row.y <= ROWS);
                prop_assert!(row.cells.len() <= 2 * usize::from(MAX_LINE));
                last = row.y;
            }
        }
    }
}
