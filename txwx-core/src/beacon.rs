//! Beacon timing for the transmit loop.
//!
//! The loop asks "is a beacon due?" once per iteration instead of waiting
//! on a timer, so beacons interleave with weather transmission. Missed
//! intervals collapse into a single firing; the schedule keeps its phase.

use std::time::{Duration, Instant};

/// Default beacon period.
pub const BEACON_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct BeaconSchedule {
    interval: Duration,
    next_due: Instant,
    /// Number of times `poll` has fired.
    pub fired: u64,
}

impl BeaconSchedule {
    /// First beacon is due one interval after `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        BeaconSchedule {
            interval,
            next_due: start + interval,
            fired: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    /// Non-blocking check. Returns true (and reschedules) if a beacon is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.fired += 1;

        if self.interval.is_zero() {
            self.next_due = now;
            return true;
        }

        let behind = now.duration_since(self.next_due);
        let skipped = (behind.as_nanos() / self.interval.as_nanos()).min(u32::MAX as u128) as u32;
        self.next_due += self.interval * skipped.saturating_add(1);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_before_interval() {
        let t0 = Instant::now();
        let mut sched = BeaconSchedule::new(Duration::from_secs(1), t0);
        assert!(!sched.poll(t0));
        assert!(!sched.poll(t0 + Duration::from_millis(999)));
        assert_eq!(sched.fired, 0);
    }

    #[test]
    fn test_fires_once_per_interval() {
        let t0 = Instant::now();
        let mut sched = BeaconSchedule::new(Duration::from_secs(1), t0);
        assert!(sched.poll(t0 + Duration::from_secs(1)));
        assert!(!sched.poll(t0 + Duration::from_millis(1500)));
        assert!(sched.poll(t0 + Duration::from_secs(2)));
        assert_eq!(sched.fired, 2);
    }

    #[test]
    fn test_missed_intervals_do_not_burst() {
        let t0 = Instant::now();
        let mut sched = BeaconSchedule::new(Duration::from_secs(1), t0);
        let late = t0 + Duration::from_millis(5500);
        assert!(sched.poll(late));
        assert!(!sched.poll(late));
        assert_eq!(sched.next_due(), t0 + Duration::from_secs(6));
        assert_eq!(sched.fired, 1);
    }

    #[test]
    fn test_zero_interval_always_due() {
        let t0 = Instant::now();
        let mut sched = BeaconSchedule::new(Duration::ZERO, t0);
        assert!(sched.poll(t0));
        assert!(sched.poll(t0));
    }
}
