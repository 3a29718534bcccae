//! Clock-derived hardware signals.
//!
//! The 2.7648 MHz CPU clock is the only time base. Video timing lines and
//! the serial baud clock are square waves divided down from it.

use emu_core::{MasterClock, Signal};
use tracing::debug;

pub const CPU_HZ: u64 = 2_764_800;

pub const CLOCK: MasterClock = MasterClock::new(CPU_HZ);

/// Line buffer address bit 4: keyboard scan clock.
pub const LBA4_PERIOD: u32 = 22;

/// Line buffer address bit 7: NVR clock.
pub const LBA7_PERIOD: u32 = 182;

pub const VERTICAL_60HZ: u32 = 46_084;
pub const VERTICAL_50HZ: u32 = 55_296;

/// 9600 baud at power-up.
pub const UART_INITIAL_PERIOD: u32 = 2_880;

/// Baud-rate generator divisors, indexed by the low nibble of port 0x02.
pub const BAUD_DIVISORS: [u32; 16] = [
    3456, 2304, 1571, 1285, 1152, 864, 576, 288, 144, 96, 86, 72, 48, 36, 18, 9,
];

const BAUD_NAMES: [&str; 16] = [
    "50", "75", "110", "134.5", "150", "200", "300", "600", "1200", "1800", "2000", "2400",
    "3600", "4800", "9600", "19200",
];

/// 16x oversampling of a ten-bit frame.
pub const BAUD_SCALE: u32 = 160;

/// The four periodic signals.
#[derive(Debug, Clone)]
pub struct Timing {
    pub lba4: Signal,
    pub lba7: Signal,
    pub vertical: Signal,
    pub uart: Signal,
    last_baud: u8,
}

impl Timing {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lba4: Signal::new(LBA4_PERIOD),
            lba7: Signal::new(LBA7_PERIOD),
            vertical: Signal::new(VERTICAL_60HZ),
            uart: Signal::new(UART_INITIAL_PERIOD),
            last_baud: 0,
        }
    }

    /// Program the baud-rate generator. Only a change of value reprograms.
    pub fn set_baud(&mut self, value: u8) -> bool {
        if value == self.last_baud {
            return false;
        }
        self.last_baud = value;
        let index = usize::from(value & 0x0F);
        self.uart.change_period(BAUD_SCALE * BAUD_DIVISORS[index]);
        debug!("baud rate {} (period {})", BAUD_NAMES[index], self.uart.period_half() * 2);
        true
    }

    pub fn set_refresh50(&mut self, refresh50: bool) {
        let period = if refresh50 { VERTICAL_50HZ } else { VERTICAL_60HZ };
        self.vertical.change_period(period);
    }

    /// Even field: the first half of each interlaced frame pair.
    #[must_use]
    pub fn even_field(cycles: u64) -> bool {
        cycles % (2 * u64::from(VERTICAL_60HZ)) < u64::from(VERTICAL_60HZ)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baud_reprograms_only_on_change() {
        let mut t = Timing::new();
        assert!(!t.set_baud(0x00));
        assert_eq!(t.uart.period_half(), UART_INITIAL_PERIOD / 2);
        assert!(t.set_baud(0xEE));
        assert_eq!(t.uart.period_half(), 18 * 160 / 2);
        assert!(!t.set_baud(0xEE));
        assert!(t.set_baud(0x0F));
        assert_eq!(t.uart.period_half(), 9 * 160 / 2);
    }

    #[test]
    fn refresh_rate_switch() {
        let mut t = Timing::new();
        t.set_refresh50(true);
        assert_eq!(t.vertical.period_half(), VERTICAL_50HZ / 2);
        t.set_refresh50(false);
        assert_eq!(t.vertical.period_half(), VERTICAL_60HZ / 2);
    }

    #[test]
    fn field_parity() {
        assert!(Timing::even_field(0));
        assert!(Timing::even_field(46_083));
        assert!(!Timing::even_field(46_084));
        assert!(Timing::even_field(92_168));
    }
}
