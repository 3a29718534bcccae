//! Square-wave signals derived from the CPU cycle count.

/// A software clock divider producing a square wave.
///
/// Elapsed CPU cycles are accumulated; each time the accumulator reaches half
/// the period the output level flips and the half period is consumed. Only
/// one crossing is honoured per call, mirroring a peripheral that is polled
/// once per instruction: any excess stays in the accumulator and is consumed
/// by later calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    value: bool,
    period_half: u32,
    ticks: u32,
}

impl Signal {
    /// Create a signal with the given full period in cycles, starting low.
    #[must_use]
    pub const fn new(period: u32) -> Self {
        Self {
            value: false,
            period_half: period / 2,
            ticks: 0,
        }
    }

    /// Add elapsed cycles. Returns true if the output level changed.
    pub fn advance(&mut self, delta: u32) -> bool {
        self.ticks = self.ticks.saturating_add(delta);
        if self.ticks >= self.period_half {
            self.ticks -= self.period_half;
            self.value = !self.value;
            true
        } else {
            false
        }
    }

    /// Add elapsed cycles. Returns true only on a low-to-high transition.
    pub fn advance_rising(&mut self, delta: u32) -> bool {
        self.advance(delta) && self.value
    }

    /// Current output level.
    #[must_use]
    pub const fn value(&self) -> bool {
        self.value
    }

    /// Half period in cycles.
    #[must_use]
    pub const fn period_half(&self) -> u32 {
        self.period_half
    }

    /// Reprogram the full period. The accumulator is left untouched.
    pub fn change_period(&mut self, period: u32) {
        self.period_half = period / 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn toggles_once_per_half_period() {
        let mut s = Signal::new(22);
        for _ in 0..10 {
            assert!(!s.advance(1));
        }
        assert!(s.advance(1));
        assert!(s.value());
        assert!(!s.advance(10));
        assert!(s.advance(1));
        assert!(!s.value());
    }

    #[test]
    fn single_crossing_per_call() {
        let mut s = Signal::new(10);
        // Three half periods in one call still only toggles once.
        assert!(s.advance(15));
        assert!(s.value());
        // The excess carries over.
        assert!(s.advance(0));
        assert!(!s.value());
        assert!(s.advance(0));
        assert!(!s.advance(0));
    }

    #[test]
    fn rising_edge_only_on_high() {
        let mut s = Signal::new(4);
        assert!(s.advance_rising(2));
        assert!(!s.advance_rising(2));
        assert!(s.advance_rising(2));
    }

    #[test]
    fn change_period_keeps_accumulator() {
        let mut s = Signal::new(100);
        assert!(!s.advance(40));
        s.change_period(60);
        assert_eq!(s.period_half(), 30);
        assert!(s.advance(0));
        assert!(s.value());
    }

    proptest! {
        #[test]
        fn split_advance_matches_whole(period in 2u32..100_000, split in 0u32..100_000) {
            let half = period / 2;
            let first = split % (half + 1);
            let mut whole = Signal::new(period);
            let mut parts = Signal::new(period);

            let toggled_whole = whole.advance(half);
            let toggled_parts = parts.advance(first) | parts.advance(half - first);

            prop_assert!(toggled_whole);
            prop_assert!(toggled_parts);
            prop_assert_eq!(whole, parts);
        }

        #[test]
        fn period_of_ticks_toggles_twice(period in 2u32..10_000, chunk in 1u32..64) {
            let mut s = Signal::new(period);
            let half = period / 2;
            let mut toggles = 0;
            let mut remaining = half * 2;
            while remaining > 0 {
                let step = chunk.min(remaining).min(half);
                if s.advance(step) {
                    toggles += 1;
                }
                remaining -= step;
            }
            prop_assert_eq!(toggles, 2);
            prop_assert!(!s.value());
        }
    }
}
