//! Host key to VT100 key code translation.
//!
//! Codes are the keyboard's switch addresses. Bit 7 in the table marks a
//! shifted character; it is sent as SHIFT plus the base code.

use crate::keyboard::{KEY_CTRL, KEY_SHIFT};

/// A key event from the host, independent of the terminal library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKey {
    Char(char),
    /// Character typed with Control held.
    Ctrl(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Insert,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

/// Screen RAM flag the firmware uses for application keypad mode.
pub const KEYPAD_MODE_FLAG: u16 = 0x2178;

const SHIFTED: u8 = 0x80;

fn char_code(c: char) -> Option<u8> {
    let code = match c {
        'p' => 0x05,
        'o' => 0x06,
        'y' => 0x07,
        't' => 0x08,
        'w' => 0x09,
        'q' => 0x0A,
        ']' => 0x14,
        '}' => 0x94,
        '[' => 0x15,
        '{' => 0x95,
        'i' => 0x16,
        'u' => 0x17,
        'r' => 0x18,
        'e' => 0x19,
        '1' => 0x1A,
        '!' => 0x9A,
        '`' => 0x24,
        '~' => 0xA4,
        '-' => 0x25,
        '_' => 0xA5,
        '9' => 0x26,
        '(' => 0xA6,
        '7' => 0x27,
        '&' => 0xA7,
        '4' => 0x28,
        '$' => 0xA8,
        '3' => 0x29,
        '#' => 0xA9,
        '=' => 0x34,
        '+' => 0xB4,
        '0' => 0x35,
        ')' => 0xB5,
        '8' => 0x36,
        '*' => 0xB6,
        '6' => 0x37,
        '^' => 0xB7,
        '5' => 0x38,
        '%' => 0xB8,
        '2' => 0x39,
        '@' => 0xB9,
        '\t' => 0x3A,
        '\n' => 0x44,
        '\\' => 0x45,
        '|' => 0xC5,
        'l' => 0x46,
        'k' => 0x47,
        'g' => 0x48,
        'f' => 0x49,
        'a' => 0x4A,
        '\'' => 0x55,
        '"' => 0xD5,
        ';' => 0x56,
        ':' => 0xD6,
        'j' => 0x57,
        'h' => 0x58,
        'd' => 0x59,
        's' => 0x5A,
        '\r' => 0x64,
        '.' => 0x65,
        '>' => 0xE5,
        ',' => 0x66,
        '<' => 0xE6,
        'n' => 0x67,
        'b' => 0x68,
        'x' => 0x69,
        '/' => 0x75,
        '?' => 0xF5,
        'm' => 0x76,
        ' ' => 0x77,
        'v' => 0x78,
        'c' => 0x79,
        'z' => 0x7A,
        'A'..='Z' => return char_code(c.to_ascii_lowercase()).map(|k| k | SHIFTED),
        _ => return None,
    };
    Some(code)
}

/// Table code for a key, with bit 7 meaning "shifted".
#[must_use]
pub fn keycode(key: HostKey) -> Option<u8> {
    let code = match key {
        HostKey::Char(c) => return char_code(c),
        HostKey::Ctrl(_) => return None,
        HostKey::Enter => 0x64,
        HostKey::Tab => 0x3A,
        HostKey::Delete => 0x03,
        HostKey::Backspace | HostKey::F(12) => 0x33,
        HostKey::Esc | HostKey::F(11) => 0x2A,
        HostKey::Right => 0x10,
        HostKey::Left => 0x20,
        HostKey::Down => 0x22,
        HostKey::Up => 0x30,
        HostKey::Home | HostKey::F(27) => 0x40,
        HostKey::Insert | HostKey::F(20) => 0x43,
        HostKey::End | HostKey::F(21) => 0x53,
        HostKey::PageUp | HostKey::F(29) => 0x70,
        HostKey::PageDown | HostKey::F(23) => 0x71,
        HostKey::F(1) => 0x32,
        HostKey::F(2) => 0x42,
        HostKey::F(3) => 0x31,
        HostKey::F(4) => 0x41,
        HostKey::F(5) => 0x23,
        HostKey::F(6) => 0x6A,
        HostKey::F(9) => 0x7B,
        HostKey::F(13) => 0x44,
        HostKey::F(15) => 0xA3,
        HostKey::F(22) => 0x52,
        HostKey::F(24) => 0x63,
        HostKey::F(25) => 0x62,
        HostKey::F(26) => 0x72,
        HostKey::F(28) => 0x50,
        HostKey::F(30) => 0x73,
        HostKey::F(31) => 0x61,
        HostKey::F(32) => 0x51,
        HostKey::F(33) => 0x60,
        HostKey::F(_) => return None,
    };
    Some(code)
}

/// Base code for a control character typed as `Ctrl-c`.
fn control_code(c: char) -> Option<u8> {
    match c {
        ' ' | '@' | '2' => Some(0x77),
        '`' | '~' | '^' | '6' => Some(0x24),
        '/' | '_' | '?' | '-' => Some(0x75),
        _ => char_code(c.to_ascii_lowercase()).map(|k| k & !SHIFTED),
    }
}

/// The key codes one host key produces, in press order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Strokes {
    pub codes: Vec<u8>,
    /// The key is on the numeric keypad.
    pub keypad: bool,
}

/// Translate a host key into VT100 key presses.
#[must_use]
pub fn translate(key: HostKey) -> Strokes {
    let mut codes = Vec::with_capacity(3);
    let mut code = match key {
        HostKey::Ctrl(c) => match control_code(c) {
            Some(k) => {
                codes.push(KEY_CTRL);
                k
            }
            None => return Strokes::default(),
        },
        // Control-Break sends the answerback message.
        HostKey::F(16) => {
            codes.push(KEY_CTRL);
            0x23
        }
        _ => match keycode(key) {
            Some(k) => k,
            None => return Strokes::default(),
        },
    };
    if code & SHIFTED != 0 {
        codes.push(KEY_SHIFT);
        code &= !SHIFTED;
    }
    codes.push(code);
    Strokes {
        codes,
        keypad: code & 0x0F < 4 && code & 0x70 >= 0x40,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn letters_and_shift() {
        assert_eq!(translate(HostKey::Char('a')).codes, vec![0x4A]);
        assert_eq!(translate(HostKey::Char('A')).codes, vec![KEY_SHIFT, 0x4A]);
        assert_eq!(translate(HostKey::Char('?')).codes, vec![KEY_SHIFT, 0x75]);
    }

    #[test]
    fn control_synthesis() {
        assert_eq!(translate(HostKey::Ctrl('c')).codes, vec![KEY_CTRL, 0x79]);
        assert_eq!(translate(HostKey::Ctrl(' ')).codes, vec![KEY_CTRL, 0x77]);
        assert_eq!(translate(HostKey::Ctrl('^')).codes, vec![KEY_CTRL, 0x24]);
        assert_eq!(translate(HostKey::Ctrl('_')).codes, vec![KEY_CTRL, 0x75]);
        assert_eq!(translate(HostKey::F(16)).codes, vec![KEY_CTRL, 0x23]);
    }

    #[test]
    fn function_keys() {
        assert_eq!(translate(HostKey::F(1)).codes, vec![0x32]);
        assert_eq!(translate(HostKey::F(9)).codes, vec![0x7B]);
        assert_eq!(translate(HostKey::F(15)).codes, vec![KEY_SHIFT, 0x23]);
        assert!(translate(HostKey::F(10)).codes.is_empty());
    }

    #[test]
    fn keypad_detection() {
        assert!(translate(HostKey::Home).keypad);
        assert!(translate(HostKey::PageDown).keypad);
        assert!(!translate(HostKey::Up).keypad);
        assert!(!translate(HostKey::Char('a')).keypad);
    }

    #[test]
    fn unmapped_keys_produce_nothing() {
        assert_eq!(translate(HostKey::Char('é')), Strokes::default());
        assert_eq!(translate(HostKey::Ctrl('é')), Strokes::default());
    }

    proptest! {
        #[test]
        fn printable_ascii_is_one_key_plus_shift(c in 0x20u8..0x7F) {
            let strokes = translate(HostKey::Char(char::from(c)));
            let (last, prefix) = strokes.codes.split_last().expect("every printable key is mapped");
            prop_assert!(*last < 0x80);
            prop_assert!(prefix.is_empty() || prefix == [KEY_SHIFT]);
            prop_assert!(!strokes.keypad);
        }
    }
}
