//! Station counters and the once-a-minute stats log.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use txwx_core::message::ReportCounts;
use txwx_core::{RxPipeline, StationPosition, StationTracker, WeatherCache};

pub const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Transmit-side counters, shared by the transmit loop, the cache
/// synchronizer and the stats reporter.
#[derive(Debug, Default)]
pub struct TxCounters {
    pub messages_sent: AtomicU64,
    pub messages_too_long: AtomicU64,
    pub transmit_errors: AtomicU64,
    pub fetch_failures: AtomicU64,
    weather_updates_ok: AtomicBool,
}

impl TxCounters {
    pub fn new() -> Self {
        TxCounters::default()
    }

    /// Whether the last weather refresh succeeded. False until the first one.
    pub fn weather_updates_ok(&self) -> bool {
        self.weather_updates_ok.load(Ordering::Relaxed)
    }

    pub fn set_weather_updates_ok(&self, ok: bool) {
        self.weather_updates_ok.store(ok, Ordering::Relaxed);
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// `1d 2h 3m 4s`, leading zero units omitted.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{days}d {hours}h {mins}m {secs}s")
    } else if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

pub fn tx_summary(counters: &TxCounters, counts: ReportCounts) -> String {
    format!(
        "messages sent: {}, too long: {}, transmit errors: {}, fetch failures: {}, tracking {} METARs / {} TAFs",
        TxCounters::get(&counters.messages_sent),
        TxCounters::get(&counters.messages_too_long),
        TxCounters::get(&counters.transmit_errors),
        TxCounters::get(&counters.fetch_failures),
        counts.metars,
        counts.tafs,
    )
}

pub fn rx_summary(pipeline: &RxPipeline, own: &StationPosition) -> String {
    format!(
        "messages received: {}, CRC errors: {}, other rejects: {}, current location: ({:.4}, {:.4})",
        pipeline.messages_received,
        pipeline.crc_errors,
        pipeline.rejected() - pipeline.crc_errors,
        own.lat,
        own.lng,
    )
}

fn stats_ticker() -> tokio::time::Interval {
    let start = tokio::time::Instant::now() + STATS_INTERVAL;
    tokio::time::interval_at(start, STATS_INTERVAL)
}

/// Log transmit stats every minute. Runs forever.
pub async fn report_tx_stats(counters: Arc<TxCounters>, cache: Arc<WeatherCache>) {
    let started = Instant::now();
    let mut ticker = stats_ticker();
    loop {
        ticker.tick().await;
        log::info!(
            "stats [up {}]: {}",
            format_uptime(started.elapsed()),
            tx_summary(&counters, cache.counts())
        );
    }
}

/// Log receive stats every minute. Runs forever.
pub async fn report_rx_stats(pipeline: Arc<Mutex<RxPipeline>>, tracker: Arc<StationTracker>) {
    let started = Instant::now();
    let mut ticker = stats_ticker();
    loop {
        ticker.tick().await;
        let summary = {
            let pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            rx_summary(&pipeline, &tracker.current_position())
        };
        log::info!("stats [up {}]: {summary}", format_uptime(started.elapsed()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0s");
        assert_eq!(format_uptime(Duration::from_secs(59)), "59s");
        assert_eq!(format_uptime(Duration::from_secs(123)), "2m 3s");
        assert_eq!(format_uptime(Duration::from_secs(3723)), "1h 2m 3s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[test]
    fn test_counters() {
        let counters = TxCounters::new();
        assert!(!counters.weather_updates_ok());
        TxCounters::bump(&counters.messages_sent);
        TxCounters::bump(&counters.messages_sent);
        TxCounters::bump(&counters.fetch_failures);
        counters.set_weather_updates_ok(true);
        assert!(counters.weather_updates_ok());
        assert_eq!(
            tx_summary(&counters, ReportCounts { metars: 3, tafs: 1 }),
            "messages sent: 2, too long: 0, transmit errors: 0, fetch failures: 1, tracking 3 METARs / 1 TAFs"
        );
    }

    #[test]
    fn test_rx_summary() {
        let mut pipeline = RxPipeline::new();
        pipeline.process(&[0u8; 3]);
        assert_eq!(
            rx_summary(&pipeline, &StationPosition::new(35.5, -82.5, 1)),
            "messages received: 0, CRC errors: 0, other rejects: 1, current location: (35.5000, -82.5000)"
        );
    }
}
