//! ==============================================================================
//! conditioner.rs - raw frame smoothing and debounce
//! ==============================================================================
//!
//! purpose:
//!     raw potentiometer readings jitter by a few units at rest; mapping
//!     them straight to an index would flap at zone boundaries. the
//!     conditioner sits between the serial source and the mapper and only
//!     lets materially-changed, stable values through.
//!
//! gate order (a frame must clear all of them):
//!     1. parse as a decimal integer - failures are sensor noise, dropped
//!     2. the smoothing window must be full
//!     3. the change must exceed the magnitude threshold
//!     4. the debounce interval must have elapsed since the last emission
//!
//! note on smoothing:
//!     once the window is full the LATEST sample is taken, not the average.
//!     the window only delays the first emission until enough history
//!     exists; averaging would add input lag on a control that is already
//!     debounced downstream.
//!
//! relationships:
//!     - fed by: runloop.rs with frames from sensor.rs
//!     - feeds: mapper.rs
//!
//! ==============================================================================

use std::collections::VecDeque;
use std::time::Instant;

/// a reading that survived smoothing and both debounce gates
#[derive(Debug, Clone, Copy)]
pub struct ConditionedValue {
    /// smoothed dial value
    pub value: u32,
    /// when it became stable
    pub at: Instant,
}

/// stateful two-stage gate over the raw frame stream
pub struct SignalConditioner {
    window: VecDeque<u32>,
    capacity: usize,
    change_threshold: u32,
    debounce: std::time::Duration,
    last_emitted_value: Option<u32>,
    last_emitted_at: Option<Instant>,
}

impl SignalConditioner {
    pub fn new(capacity: usize, change_threshold: u32, debounce: std::time::Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            change_threshold,
            debounce,
            last_emitted_value: None,
            last_emitted_at: None,
        }
    }

    /// run one raw frame through the gates
    ///
    /// returns None for "nothing worth acting on": parse failure, window
    /// still filling, sub-threshold jitter, or a change inside the
    /// debounce interval.
    pub fn condition(&mut self, raw: &str, now: Instant) -> Option<ConditionedValue> {
        let value: u32 = raw.trim().parse().ok()?;

        self.window.push_back(value);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
        if self.window.len() < self.capacity {
            return None;
        }

        // latest sample once the window is full (see module note)
        let smoothed = *self.window.back()?;

        if let Some(last) = self.last_emitted_value {
            if smoothed.abs_diff(last) <= self.change_threshold {
                return None;
            }
            if let Some(at) = self.last_emitted_at {
                if now.duration_since(at) < self.debounce {
                    return None;
                }
            }
        }

        self.last_emitted_value = Some(smoothed);
        self.last_emitted_at = Some(now);
        Some(ConditionedValue { value: smoothed, at: now })
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn conditioner() -> SignalConditioner {
        SignalConditioner::new(2, 3, Duration::from_millis(50))
    }

    #[test]
    fn parse_failure_emits_nothing() {
        let mut c = conditioner();
        let now = Instant::now();
        assert!(c.condition("garbage", now).is_none());
        assert!(c.condition("", now).is_none());
        assert!(c.condition("12.5", now).is_none());
    }

    #[test]
    fn holds_until_window_full() {
        let mut c = conditioner();
        let now = Instant::now();
        assert!(c.condition("500", now).is_none());
        let emitted = c.condition("500", now).expect("second frame fills the window");
        assert_eq!(emitted.value, 500);
    }

    #[test]
    fn constant_stream_emits_at_most_once() {
        let mut c = conditioner();
        let mut now = Instant::now();
        let mut emissions = 0;
        for _ in 0..50 {
            if c.condition("512", now).is_some() {
                emissions += 1;
            }
            now += Duration::from_millis(100);
        }
        assert_eq!(emissions, 1);
    }

    #[test]
    fn sub_threshold_jitter_is_rejected() {
        let mut c = conditioner();
        let now = Instant::now();
        assert!(c.condition("500", now).is_none());
        assert!(c.condition("500", now).is_some());
        // +/- 3 around the emitted value, well past the debounce window
        let later = now + Duration::from_secs(1);
        assert!(c.condition("503", later).is_none());
        assert!(c.condition("497", later).is_none());
    }

    #[test]
    fn change_inside_debounce_interval_is_rejected() {
        let mut c = conditioner();
        let now = Instant::now();
        assert!(c.condition("100", now).is_none());
        assert!(c.condition("100", now).is_some());
        // large change but only 10ms later
        let soon = now + Duration::from_millis(10);
        assert!(c.condition("900", soon).is_none());
        // same change after the interval passes
        let later = now + Duration::from_millis(60);
        let emitted = c.condition("900", later).expect("debounce elapsed");
        assert_eq!(emitted.value, 900);
    }

    #[test]
    fn near_simultaneous_small_changes_never_both_emit() {
        let mut c = conditioner();
        let now = Instant::now();
        assert!(c.condition("200", now).is_none());
        let first = c.condition("200", now);
        let second = c.condition("202", now + Duration::from_millis(5));
        assert!(!(first.is_some() && second.is_some()));
    }

    #[test]
    fn takes_latest_sample_not_average() {
        let mut c = conditioner();
        let now = Instant::now();
        assert!(c.condition("0", now).is_none());
        let emitted = c.condition("1000", now).expect("window full");
        // 500 would mean the window got averaged
        assert_eq!(emitted.value, 1000);
    }

    #[test]
    fn whitespace_and_crlf_frames_parse() {
        let mut c = conditioner();
        let now = Instant::now();
        assert!(c.condition("42\r", now).is_none());
        assert!(c.condition(" 42 ", now).is_some());
    }
}
