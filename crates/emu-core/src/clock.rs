//! Master clock configuration.

use crate::Ticks;

/// Master clock configuration for a system.
///
/// The CPU clock drives all timing. Peripherals run at divided rates, but
/// everything derives from this frequency.
#[derive(Debug, Clone, Copy)]
pub struct MasterClock {
    /// Crystal-derived CPU frequency in Hz (e.g. `2_764_800` for a VT100).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per slice at the given slice rate (integer division).
    #[must_use]
    pub const fn ticks_per_slice(&self, slices_per_second: u64) -> Ticks {
        Ticks::new(self.frequency_hz / slices_per_second)
    }

    /// Wall-clock microseconds represented by `ticks`.
    #[must_use]
    pub const fn ticks_to_micros(&self, ticks: Ticks) -> u64 {
        ticks.get() * 1_000_000 / self.frequency_hz
    }

    /// Ticks elapsed in `micros` microseconds of wall-clock time.
    #[must_use]
    pub const fn micros_to_ticks(&self, micros: u64) -> Ticks {
        Ticks::new(micros * self.frequency_hz / 1_000_000)
    }
}
