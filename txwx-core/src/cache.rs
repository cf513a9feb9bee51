//! Shared weather snapshot, swapped whole on every refresh.
//!
//! The mutex guards only an `Arc` pointer: writers build the new snapshot
//! outside the lock and swap it in, readers clone the pointer and release.
//! A reader therefore sees one complete snapshot, never a mix.

use std::sync::{Arc, Mutex, PoisonError};

use crate::message::ReportCounts;
use crate::types::{MetarRecord, TafRecord};

/// One complete refresh result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSnapshot {
    pub metars: Vec<MetarRecord>,
    pub tafs: Vec<TafRecord>,
}

impl WeatherSnapshot {
    pub fn new(metars: Vec<MetarRecord>, tafs: Vec<TafRecord>) -> Self {
        WeatherSnapshot { metars, tafs }
    }

    pub fn counts(&self) -> ReportCounts {
        ReportCounts {
            metars: self.metars.len(),
            tafs: self.tafs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metars.is_empty() && self.tafs.is_empty()
    }
}

/// Holder of the current snapshot.
#[derive(Debug, Default)]
pub struct WeatherCache {
    current: Mutex<Arc<WeatherSnapshot>>,
}

impl WeatherCache {
    pub fn new() -> Self {
        WeatherCache::default()
    }

    /// Current snapshot. Holds the lock only for the pointer clone.
    pub fn snapshot(&self) -> Arc<WeatherSnapshot> {
        Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new snapshot; returns the one it replaced.
    pub fn replace(&self, snapshot: WeatherSnapshot) -> Arc<WeatherSnapshot> {
        let next = Arc::new(snapshot);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }

    pub fn counts(&self) -> ReportCounts {
        self.snapshot().counts()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
