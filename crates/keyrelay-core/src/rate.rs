//! The inbound message rate meter.
//!
//! A single counter incremented once per non-heartbeat ingested message.
//! Every second the server reads the counter, publishes the value as the
//! current "messages per second", and resets it to zero.  This is a plain
//! fixed 1-second window, not a smoothed average: a burst inside one window
//! is fully counted, and the reported value lags real time by up to 1s.
//!
//! # Synchronization
//!
//! The counter has exactly two writers — the ingestion path (increment) and
//! the timer tick (read-and-reset).  Both operations are single atomic
//! instructions (`fetch_add` / `swap`), so no increment can be lost between
//! the tick's read and its reset.

use std::sync::atomic::{AtomicU32, Ordering};

/// Snapshot-and-reset counter published as "messages per second".
#[derive(Debug, Default)]
pub struct RateMeter {
    /// Messages ingested in the current window.
    counter: AtomicU32,
    /// Value published at the last tick.
    current: AtomicU32,
}

impl RateMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one non-heartbeat message.  Called from the ingestion path.
    pub fn record(&self) {
        self.counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Closes the current window: publishes and returns its message count,
    /// resetting the counter to zero.  Called from the 1-second timer.
    pub fn tick(&self) -> u32 {
        let count = self.counter.swap(0, Ordering::Relaxed);
        self.current.store(count, Ordering::Relaxed);
        count
    }

    /// The value published at the most recent tick.
    pub fn current(&self) -> u32 {
        self.current.load(Ordering::Relaxed)
    }

    /// Discards both the open window and the last published value.  Called
    /// when the listener stops, so messages counted just before the stop
    /// never surface as the first window of a later run.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
        self.current.store(0, Ordering::Relaxed);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_publishes_exact_count_for_the_window() {
        // Arrange
        let meter = RateMeter::new();

        // Act — N messages inside one window
        for _ in 0..5 {
            meter.record();
        }

        // Assert — the next tick yields exactly N
        assert_eq!(meter.tick(), 5);
        assert_eq!(meter.current(), 5);
    }

    #[test]
    fn test_tick_resets_counter_to_zero() {
        let meter = RateMeter::new();
        meter.record();
        meter.tick();

        // An idle window publishes 0.
        assert_eq!(meter.tick(), 0);
        assert_eq!(meter.current(), 0);
    }

    #[test]
    fn test_records_after_tick_count_toward_next_window() {
        let meter = RateMeter::new();
        meter.record();
        meter.record();
        assert_eq!(meter.tick(), 2);

        meter.record();
        assert_eq!(meter.tick(), 1);
    }

    #[test]
    fn test_current_is_zero_before_first_tick() {
        let meter = RateMeter::new();
        meter.record();
        // Nothing published until a tick closes the window.
        assert_eq!(meter.current(), 0);
    }

    #[test]
    fn test_reset_clears_open_window_and_published_value() {
        let meter = RateMeter::new();
        meter.record();
        meter.tick();
        meter.record();

        meter.reset();

        assert_eq!(meter.current(), 0);
        assert_eq!(meter.tick(), 0);
    }

    #[test]
    fn test_concurrent_records_are_all_counted() {
        // Arrange
        use std::sync::Arc;
        let meter = Arc::new(RateMeter::new());

        // Act — 4 threads x 250 records
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let meter = Arc::clone(&meter);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        meter.record();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Assert
        assert_eq!(meter.tick(), 1000);
    }
}
