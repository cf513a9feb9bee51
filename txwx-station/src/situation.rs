//! Station position from the local situation service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::MissedTickBehavior;

use txwx_core::{StationPosition, StationTracker};

/// How often the situation service is polled.
pub const POSITION_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<StationPosition>;
}

/// Subset of the situation document this station reads.
#[derive(Debug, Deserialize)]
struct Situation {
    #[serde(rename = "GPSLatitude", default)]
    gps_latitude: f64,
    #[serde(rename = "GPSLongitude", default)]
    gps_longitude: f64,
    #[serde(rename = "GPSFixQuality", default)]
    gps_fix_quality: u8,
}

fn parse_situation(body: &[u8]) -> Result<StationPosition> {
    let s: Situation = serde_json::from_slice(body).context("parsing situation")?;
    Ok(StationPosition::new(s.gps_latitude, s.gps_longitude, s.gps_fix_quality))
}

/// HTTP client for a `getSituation` endpoint.
#[derive(Clone)]
pub struct SituationClient {
    url: String,
    client: reqwest::Client,
}

impl SituationClient {
    pub fn new(url: &str) -> Self {
        SituationClient {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PositionSource for SituationClient {
    async fn current_position(&self) -> Result<StationPosition> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()?
            .bytes()
            .await
            .with_context(|| format!("reading {}", self.url))?;
        parse_situation(&body)
    }
}

/// Poll `source` every `period` and feed fixes to `tracker`. Runs forever.
pub async fn run_position_poller(
    source: Arc<dyn PositionSource>,
    tracker: Arc<StationTracker>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match source.current_position().await {
            Ok(fix) => {
                tracker.update_from_external_fix(fix);
            }
            Err(e) => log::warn!("position update failed: {e:#}"),
        }
    }
}
