//! Connection Monitor - tracks the sensor stream to detect whether the base is alive
//!
//! The Kobuki streams a feedback frame roughly every 20 ms while powered. A gap
//! longer than the configured timeout means the cable was pulled, the base was
//! switched off, or the port is wedged.
//!
//! Timestamps are microseconds on a monotonic clock anchored at first use, so
//! they fit in an `AtomicU64` and ignore wall-clock adjustments.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static CLOCK_ANCHOR: OnceLock<Instant> = OnceLock::new();

fn monotonic_micros() -> u64 {
    let anchor = CLOCK_ANCHOR.get_or_init(Instant::now);
    anchor.elapsed().as_micros() as u64
}

/// Feedback stream health monitor
///
/// Written by the receiver thread on every valid frame, read by anyone.
pub struct ConnectionMonitor {
    last_frame_us: AtomicU64,
    seen_frame: AtomicBool,
    timeout: Duration,
}

impl ConnectionMonitor {
    /// # Example
    /// ```
    /// # use kobuki_driver::ConnectionMonitor;
    /// # use std::time::Duration;
    /// let monitor = ConnectionMonitor::new(Duration::from_millis(200));
    /// assert!(!monitor.check_connection());
    /// ```
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_frame_us: AtomicU64::new(monotonic_micros()),
            seen_frame: AtomicBool::new(false),
            timeout,
        }
    }

    /// True once at least one frame arrived and the latest one is within the timeout
    pub fn check_connection(&self) -> bool {
        self.seen_frame.load(Ordering::Acquire) && self.time_since_last_frame() < self.timeout
    }

    /// Record a valid frame
    pub fn register_frame(&self) {
        self.last_frame_us.store(monotonic_micros(), Ordering::Relaxed);
        self.seen_frame.store(true, Ordering::Release);
    }

    /// Whether any frame has ever been received
    pub fn has_seen_frame(&self) -> bool {
        self.seen_frame.load(Ordering::Acquire)
    }

    /// Time since the last valid frame (since construction if none yet)
    pub fn time_since_last_frame(&self) -> Duration {
        let last_us = self.last_frame_us.load(Ordering::Relaxed);
        Duration::from_micros(monotonic_micros().saturating_sub(last_us))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_time_increases() {
        let t1 = monotonic_micros();
        thread::sleep(Duration::from_millis(5));
        assert!(monotonic_micros() > t1);
    }

    #[test]
    fn test_not_connected_before_first_frame() {
        let monitor = ConnectionMonitor::new(Duration::from_secs(1));
        assert!(!monitor.has_seen_frame());
        assert!(!monitor.check_connection());
    }

    #[test]
    fn test_frame_marks_connected_then_times_out() {
        let monitor = ConnectionMonitor::new(Duration::from_millis(50));
        monitor.register_frame();
        assert!(monitor.check_connection());

        thread::sleep(Duration::from_millis(100));
        assert!(!monitor.check_connection());
        assert!(monitor.has_seen_frame());
        assert!(monitor.time_since_last_frame() >= Duration::from_millis(50));
    }

    #[test]
    fn test_frame_resets_timer() {
        let monitor = ConnectionMonitor::new(Duration::from_millis(100));
        monitor.register_frame();
        thread::sleep(Duration::from_millis(60));
        monitor.register_frame();
        thread::sleep(Duration::from_millis(60));
        assert!(monitor.check_connection());
    }
}
