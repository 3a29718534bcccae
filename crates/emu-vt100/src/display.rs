//! Video processor registers (DC011 and DC012) and the brightness latch.

use tracing::debug;

/// Brightness value that blanks the display.
pub const BLANKED: u8 = 0xF0;

/// What a DC011 write changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanChange {
    /// Non-interlaced; refresh rate selected.
    Refresh50(bool),
    /// Interlaced; column count selected.
    Columns132(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRegs {
    pub bright: u8,
    pub blink: bool,
    pub cols132: bool,
    pub refresh50: bool,
    pub interlaced: bool,
    /// Smooth-scroll offset, 0-15.
    pub scroll_latch: u8,
    /// Scroll latch seen at the previous vertical tick.
    pub last_latch: u8,
    /// Without AVO, inverse characters are shown underlined.
    pub base_attr: bool,
    pub screen_rev: bool,
}

impl DisplayRegs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bright: BLANKED,
            blink: false,
            cols132: false,
            refresh50: false,
            interlaced: false,
            scroll_latch: 0,
            last_latch: 0,
            base_attr: false,
            screen_rev: false,
        }
    }

    #[must_use]
    pub fn blanked(&self) -> bool {
        self.bright == BLANKED
    }

    /// Brightness as a percentage for display.
    #[must_use]
    pub fn bright_percent(&self) -> i32 {
        (32 - i32::from(self.bright)) * 100 / 32
    }

    /// DC012: scroll latch, blink and attribute control.
    pub fn write_dc012(&mut self, value: u8) {
        match value & 0x0F {
            n @ 0..=3 => self.scroll_latch = (self.scroll_latch & 0x0C) | n,
            n @ 4..=7 => self.scroll_latch = (self.scroll_latch & 0x03) | ((n & 3) << 2),
            8 => self.blink = !self.blink,
            // Clear vertical frequency interrupt; the fabric clears its own.
            9 => {}
            10 => self.screen_rev = true,
            11 => self.screen_rev = false,
            12 => {
                self.base_attr = true;
                self.blink = false;
            }
            13 => {
                self.base_attr = false;
                self.blink = false;
            }
            _ => self.blink = false,
        }
    }

    /// DC011: interlace, refresh rate and column mode.
    pub fn write_dc011(&mut self, value: u8) -> ScanChange {
        let bit4 = value & 0x10 != 0;
        if value & 0x20 != 0 {
            self.interlaced = false;
            self.refresh50 = bit4;
            debug!("refresh {} Hz", if bit4 { 50 } else { 60 });
            ScanChange::Refresh50(bit4)
        } else {
            self.interlaced = true;
            self.cols132 = bit4;
            ScanChange::Columns132(bit4)
        }
    }
}

impl Default for DisplayRegs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_latch_nibbles() {
        let mut d = DisplayRegs::new();
        d.write_dc012(0x03);
        assert_eq!(d.scroll_latch, 0x03);
        d.write_dc012(0x06);
        assert_eq!(d.scroll_latch, 0x0B);
        d.write_dc012(0x01);
        assert_eq!(d.scroll_latch, 0x09);
        d.write_dc012(0x04);
        assert_eq!(d.scroll_latch, 0x01);
    }

    #[test]
    fn blink_and_attributes() {
        let mut d = DisplayRegs::new();
        d.write_dc012(0x08);
        assert!(d.blink);
        d.write_dc012(0x0C);
        assert!(d.base_attr);
        assert!(!d.blink);
        d.write_dc012(0x08);
        d.write_dc012(0x0F);
        assert!(!d.blink);
        d.write_dc012(0x0A);
        assert!(d.screen_rev);
        d.write_dc012(0x0B);
        assert!(!d.screen_rev);
        d.write_dc012(0x0D);
        assert!(!d.base_attr);
    }

    #[test]
    fn dc011_modes() {
        let mut d = DisplayRegs::new();
        assert_eq!(d.write_dc011(0x30), ScanChange::Refresh50(true));
        assert!(d.refresh50);
        assert!(!d.interlaced);
        assert_eq!(d.write_dc011(0x10), ScanChange::Columns132(true));
        assert!(d.interlaced);
        assert!(d.cols132);
        assert!(d.refresh50);
    }

    #[test]
    fn brightness() {
        let mut d = DisplayRegs::new();
        assert!(d.blanked());
        d.bright = 0;
        assert_eq!(d.bright_percent(), 100);
        d.bright = 16;
        assert_eq!(d.bright_percent(), 50);
    }
}
