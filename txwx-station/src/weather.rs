//! Weather data source.
//!
//! The aviation weather data API only takes bounding boxes, so the radius
//! query becomes a box query followed by a great-circle filter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::StatusCode;
use serde::Deserialize;

use txwx_core::geo::{haversine_sm, BoundingBox};
use txwx_core::{MetarRecord, StationPosition, TafRecord};

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// METARs within `radius_miles` statute miles of `point`.
    async fn fetch_metars(
        &self,
        radius_miles: f64,
        point: &StationPosition,
    ) -> Result<Vec<MetarRecord>>;

    /// TAFs within `radius_miles` statute miles of `point`.
    async fn fetch_tafs(
        &self,
        radius_miles: f64,
        point: &StationPosition,
    ) -> Result<Vec<TafRecord>>;
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetarJson {
    icao_id: String,
    obs_time: Option<i64>,
    raw_ob: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TafJson {
    icao_id: String,
    bulletin_time: Option<String>,
    #[serde(rename = "rawTAF")]
    raw_taf: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Entries without text or position are dropped.
fn metar_record(j: MetarJson) -> Option<MetarRecord> {
    Some(MetarRecord {
        station_id: j.icao_id,
        raw_text: j.raw_ob.filter(|t| !t.is_empty())?,
        observation_time: j.obs_time.unwrap_or(0),
        lat: j.lat?,
        lng: j.lon?,
    })
}

fn taf_record(j: TafJson) -> Option<TafRecord> {
    Some(TafRecord {
        bulletin_time: j
            .bulletin_time
            .as_deref()
            .and_then(parse_bulletin_time)
            .unwrap_or(0),
        station_id: j.icao_id,
        raw_text: j.raw_taf.filter(|t| !t.is_empty())?,
        lat: j.lat?,
        lng: j.lon?,
    })
}

/// Bulletin time as epoch seconds. Accepts RFC 3339 and
/// `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_bulletin_time(s: &str) -> Option<i64> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.timestamp());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc().timestamp())
}

fn within(point: &StationPosition, radius_miles: f64, lat: f64, lng: f64) -> bool {
    haversine_sm(point.lat, point.lng, lat, lng) <= radius_miles
}

fn parse_metars(
    body: &str,
    point: &StationPosition,
    radius_miles: f64,
) -> Result<Vec<MetarRecord>> {
    let raw: Vec<MetarJson> = serde_json::from_str(body).context("parsing METAR response")?;
    Ok(raw
        .into_iter()
        .filter_map(metar_record)
        .filter(|m| within(point, radius_miles, m.lat, m.lng))
        .collect())
}

fn parse_tafs(body: &str, point: &StationPosition, radius_miles: f64) -> Result<Vec<TafRecord>> {
    let raw: Vec<TafJson> = serde_json::from_str(body).context("parsing TAF response")?;
    Ok(raw
        .into_iter()
        .filter_map(taf_record)
        .filter(|t| within(point, radius_miles, t.lat, t.lng))
        .collect())
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Client for the aviation weather data API (`/metar`, `/taf`).
#[derive(Clone)]
pub struct AviationWeatherClient {
    base_url: String,
    client: reqwest::Client,
}

impl AviationWeatherClient {
    pub fn new(base_url: &str) -> Self {
        AviationWeatherClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch `product` for the box around `point`. An empty body means no data.
    async fn get(
        &self,
        product: &str,
        radius_miles: f64,
        point: &StationPosition,
    ) -> Result<String> {
        let bbox = BoundingBox::around(point.lat, point.lng, radius_miles);
        let url = format!("{}/{product}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("bbox", bbox_param(&bbox)), ("format", "json".to_string())])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;

        if resp.status() == StatusCode::NO_CONTENT {
            return Ok("[]".to_string());
        }
        let body = resp.text().await.with_context(|| format!("reading {url}"))?;
        if body.trim().is_empty() {
            return Ok("[]".to_string());
        }
        Ok(body)
    }
}

fn bbox_param(bbox: &BoundingBox) -> String {
    format!(
        "{:.4},{:.4},{:.4},{:.4}",
        bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon
    )
}

#[async_trait]
impl WeatherSource for AviationWeatherClient {
    async fn fetch_metars(
        &self,
        radius_miles: f64,
        point: &StationPosition,
    ) -> Result<Vec<MetarRecord>> {
        let body = self.get("metar", radius_miles, point).await?;
        parse_metars(&body, point, radius_miles)
    }

    async fn fetch_tafs(
        &self,
        radius_miles: f64,
        point: &StationPosition,
    ) -> Result<Vec<TafRecord>> {
        let body = self.get("taf", radius_miles, point).await?;
        parse_tafs(&body, point, radius_miles)
    }
}
