//! Real-time pacing.
//!
//! Emulated time is measured in cycles run with the display lit. Once a
//! slice has accumulated, it is compared with wall time since the last sync;
//! if emulation is ahead by more than the slack the loop sleeps. Running
//! behind is tolerated.

use std::time::{Duration, Instant};

use emu_core::Ticks;

use crate::timing::CLOCK;

/// Cycles between comparisons.
pub const SLICE: u64 = CLOCK.ticks_per_slice(100).get();

/// How far ahead emulation may run before sleeping.
pub const SLACK: Duration = Duration::from_millis(10);

/// Wait while paused.
pub const IDLE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct Pacer {
    last_sync: Instant,
    throttle: bool,
}

impl Pacer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_sync: Instant::now(),
            throttle: true,
        }
    }

    /// Never sleeps. Bookkeeping still runs.
    #[must_use]
    pub fn unthrottled() -> Self {
        Self {
            throttle: false,
            ..Self::new()
        }
    }

    /// Start measuring from now, e.g. after the CPU was frozen.
    pub fn resync(&mut self) {
        self.last_sync = Instant::now();
    }

    /// Sleep if emulation is ahead. `rt_ticks` is reduced by the wall time
    /// accounted for.
    pub fn pace(&mut self, rt_ticks: &mut u64) {
        if *rt_ticks <= SLICE {
            return;
        }
        let now = Instant::now();
        let clock_usec =
            u64::try_from(now.duration_since(self.last_sync).as_micros()).unwrap_or(u64::MAX);
        let cpu_usec = CLOCK.ticks_to_micros(Ticks::new(*rt_ticks));
        let slack = u64::try_from(SLACK.as_micros()).unwrap_or(u64::MAX);
        if cpu_usec > clock_usec.saturating_add(slack) {
            if self.throttle {
                spin_sleep::sleep(Duration::from_micros(cpu_usec - clock_usec));
            }
            self.last_sync = now;
            *rt_ticks = rt_ticks.saturating_sub(CLOCK.micros_to_ticks(clock_usec).get());
        }
    }

    /// Wait one idle period while the CPU is stopped.
    pub fn idle(&mut self, rt_ticks: &mut u64) {
        if self.throttle {
            std::thread::sleep(IDLE);
        }
        self.resync();
        *rt_ticks = 0;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}
