//! Station position state shared between the position poller and the
//! weather/transmit tasks.
//!
//! A manual override seeds the position at startup. External fixes with
//! `fix_quality > 0` replace it; reports without a fix never overwrite a
//! usable position.

use std::sync::{PoisonError, RwLock};

use crate::types::StationPosition;

#[derive(Debug, Default)]
struct TrackerState {
    position: StationPosition,
    /// Set by a manual override or the first valid fix.
    located: bool,
    first_fix_seen: bool,
}

/// Latest known station position.
#[derive(Debug, Default)]
pub struct StationTracker {
    state: RwLock<TrackerState>,
}

impl StationTracker {
    /// Empty tracker: zero coordinates, no fix.
    pub fn new() -> Self {
        StationTracker::default()
    }

    /// Tracker seeded with a manually configured position.
    ///
    /// A zero lat/lng pair means "not configured" and leaves it empty.
    pub fn with_manual_override(lat: f64, lng: f64) -> Self {
        let tracker = StationTracker::new();
        if lat != 0.0 || lng != 0.0 {
            let mut state = tracker.state.write().unwrap_or_else(PoisonError::into_inner);
            state.position = StationPosition::new(lat, lng, 0);
            state.located = true;
            log::info!("Using manually configured station position ({lat:.4}, {lng:.4})");
        }
        tracker
    }

    /// Latest held value.
    pub fn current_position(&self) -> StationPosition {
        self.state.read().unwrap_or_else(PoisonError::into_inner).position
    }

    /// Position to query weather around, once one is known.
    pub fn located_point(&self) -> Option<StationPosition> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.located.then_some(state.position)
    }

    /// True once any valid external fix has been applied.
    pub fn has_external_fix(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).first_fix_seen
    }

    /// Apply a report from the position service.
    ///
    /// Returns true the first time a valid fix arrives.
    pub fn update_from_external_fix(&self, fix: StationPosition) -> bool {
        if !fix.has_fix() {
            return false;
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.position = fix;
        state.located = true;
        if state.first_fix_seen {
            return false;
        }
        state.first_fix_seen = true;
        log::info!(
            "First GPS location obtained: ({:.4}, {:.4})",
            fix.lat,
            fix.lng
        );
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
    fn test_empty_tracker() {
        let tracker = StationTracker::new();
        assert_eq!(tracker.current_position(), StationPosition::default());
        assert!(tracker.located_point().is_none());
        assert!(!tracker.has_external_fix());
    }

    #[test]
    fn test_first_fix_reported_once() {
        let tracker = StationTracker::new();
        assert!(tracker.update_from_external_fix(StationPosition::new(35.5, -82.5, 1)));
        assert!(!tracker.update_from_external_fix(StationPosition::new(35.6, -82.4, 2)));
        assert_eq!(tracker.current_position(), StationPosition::new(35.6, -82.4, 2));
        assert!(tracker.has_external_fix());
    }

    #[test]
    fn test_no_fix_report_ignored() {
        let tracker = StationTracker::new();
        assert!(!tracker.update_from_external_fix(StationPosition::new(1.0, 2.0, 0)));
        assert!(tracker.located_point().is_none());
        assert_eq!(tracker.current_position(), StationPosition::default());
    }

    #[test]
    fn test_manual_override_seeds_position() {
        let tracker = StationTracker::with_manual_override(44.25, -81.6);
        let point = tracker.located_point().unwrap();
        assert_eq!(point.lat, 44.25);
        assert_eq!(point.fix_quality, 0);

        // Lost-fix reports keep the override
        tracker.update_from_external_fix(StationPosition::new(0.0, 0.0, 0));
        assert_eq!(tracker.current_position().lat, 44.25);

        // A valid fix replaces it
        tracker.update_from_external_fix(StationPosition::new(45.0, -80.0, 1));
        assert_eq!(tracker.current_position(), StationPosition::new(45.0, -80.0, 1));
    }

    #[test]
    fn test_zero_override_is_unset() {
        let tracker = StationTracker::with_manual_override(0.0, 0.0);
        assert!(tracker.located_point().is_none());
    }
}
