//! Weather cache synchronizer.
//!
//! Waits for a station position, then refreshes the shared snapshot every
//! refresh interval. A failed refresh keeps the previous snapshot, clears
//! the weather-updates-ok flag and retries with capped exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use txwx_core::config::Settings;
use txwx_core::message::ReportCounts;
use txwx_core::{StationPosition, StationTracker, WeatherCache, WeatherSnapshot};

use crate::stats::TxCounters;
use crate::weather::WeatherSource;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub fetch_metars: bool,
    pub fetch_tafs: bool,
    pub radius_miles: f64,
    pub refresh_interval: Duration,
    /// Position wait period and first backoff step.
    pub retry_interval: Duration,
}

impl SyncOptions {
    pub fn from_settings(settings: &Settings, fetch_metars: bool, fetch_tafs: bool) -> Self {
        SyncOptions {
            fetch_metars,
            fetch_tafs,
            radius_miles: settings.radius_miles,
            refresh_interval: settings.reports_update_interval(),
            retry_interval: settings.position_retry_interval(),
        }
    }
}

/// Next backoff step: doubled, capped at `cap`.
pub fn next_backoff(current: Duration, cap: Duration) -> Duration {
    current.saturating_mul(2).min(cap)
}

pub struct CacheSynchronizer {
    source: Arc<dyn WeatherSource>,
    tracker: Arc<StationTracker>,
    cache: Arc<WeatherCache>,
    counters: Arc<TxCounters>,
    options: SyncOptions,
}

impl CacheSynchronizer {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        tracker: Arc<StationTracker>,
        cache: Arc<WeatherCache>,
        counters: Arc<TxCounters>,
        options: SyncOptions,
    ) -> Self {
        CacheSynchronizer {
            source,
            tracker,
            cache,
            counters,
            options,
        }
    }

    /// Sleep until the tracker has a usable position.
    pub async fn wait_for_position(&self) -> StationPosition {
        loop {
            if let Some(point) = self.tracker.located_point() {
                return point;
            }
            log::info!("waiting for station position");
            tokio::time::sleep(self.options.retry_interval).await;
        }
    }

    /// Fetch enabled products around `point` and swap them in.
    ///
    /// On error the cache is untouched.
    pub async fn refresh_once(&self, point: &StationPosition) -> Result<ReportCounts> {
        let radius = self.options.radius_miles;
        let metars = if self.options.fetch_metars {
            self.source
                .fetch_metars(radius, point)
                .await
                .context("fetching METARs")?
        } else {
            Vec::new()
        };
        let tafs = if self.options.fetch_tafs {
            self.source
                .fetch_tafs(radius, point)
                .await
                .context("fetching TAFs")?
        } else {
            Vec::new()
        };

        let snapshot = WeatherSnapshot::new(metars, tafs);
        let counts = snapshot.counts();
        self.cache.replace(snapshot);
        Ok(counts)
    }

    /// Refresh forever.
    pub async fn run(self) {
        let first_retry = self.options.retry_interval.min(self.options.refresh_interval);
        let mut backoff = first_retry;
        loop {
            let point = self.wait_for_position().await;
            let delay = match self.refresh_once(&point).await {
                Ok(counts) => {
                    self.counters.set_weather_updates_ok(true);
                    backoff = first_retry;
                    log::info!(
                        "weather updated around ({:.4}, {:.4}): {} METARs, {} TAFs",
                        point.lat,
                        point.lng,
                        counts.metars,
                        counts.tafs
                    );
                    self.options.refresh_interval
                }
                Err(e) => {
                    TxCounters::bump(&self.counters.fetch_failures);
                    self.counters.set_weather_updates_ok(false);
                    log::warn!(
                        "weather update failed, retrying in {}s: {e:#}",
                        backoff.as_secs()
                    );
                    let delay = backoff;
                    backoff = next_backoff(backoff, self.options.refresh_interval);
                    delay
                }
            };
            tokio::time::sleep(delay).await;
        }
    }
}
