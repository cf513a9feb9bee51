//! Construction helpers for outbound weather messages.
//!
//! These are the only builders used by the transmit side, so METAR/TAF
//! messages never carry a status record and beacons never carry text.

use crate::types::*;

/// Seconds-since-epoch cutoff below which the transmitter clock is
/// considered unset (2020-01-01T00:00:00Z).
pub const CLOCK_SANE_AFTER: i64 = 1_577_836_800;

/// Counts of reports currently held by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportCounts {
    pub metars: usize,
    pub tafs: usize,
}

/// Frequency-hopping descriptors advertised in every beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioScheme {
    pub band_start: u32,
    pub band_end: u32,
    pub scheme_list: Vec<u32>,
    pub scheme_dwell: Vec<u32>,
    pub current_index: u32,
}

impl Default for RadioScheme {
    /// 902-928 MHz band, fixed on 915 MHz.
    fn default() -> Self {
        RadioScheme {
            band_start: 902,
            band_end: 928,
            scheme_list: vec![(915 - 902) * 65536],
            scheme_dwell: vec![10000],
            current_index: 0,
        }
    }
}

/// Station health flags reported in beacons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationHealth {
    pub time_ok: bool,
    pub weather_updates_ok: bool,
}

impl StationHealth {
    /// Health as seen at `now`. The clock counts as OK once it is past 2020.
    pub fn at(now: i64, weather_updates_ok: bool) -> Self {
        StationHealth {
            time_ok: now >= CLOCK_SANE_AFTER,
            weather_updates_ok,
        }
    }
}

impl ServerStatus {
    pub fn new(counts: ReportCounts, scheme: &RadioScheme, health: StationHealth) -> Self {
        ServerStatus {
            time_ok: health.time_ok,
            weather_updates_ok: health.weather_updates_ok,
            metars_tracked: saturating_u32(counts.metars as i64),
            tafs_tracked: saturating_u32(counts.tafs as i64),
            freq_band_start: scheme.band_start,
            freq_band_end: scheme.band_end,
            freq_scheme_list: scheme.scheme_list.clone(),
            freq_scheme_dwell: scheme.scheme_dwell.clone(),
            freq_scheme_current_index: scheme.current_index,
        }
    }
}

fn saturating_u32(v: i64) -> u32 {
    v.clamp(0, u32::MAX as i64) as u32
}

/// Strip a leading "TAF" literal (and the whitespace after it).
///
/// Text without the prefix passes through unchanged.
pub fn strip_taf_prefix(text: &str) -> &str {
    match text.strip_prefix("TAF") {
        Some(rest) => rest.trim_start(),
        None => text,
    }
}

pub fn new_metar_message(
    record: &MetarRecord,
    position: &StationPosition,
    now: i64,
) -> WeatherMessage {
    WeatherMessage {
        kind: MessageKind::Metar,
        tx_time: saturating_u32(now),
        station_lat: position.lat as f32,
        station_lng: position.lng as f32,
        text_data: record.raw_text.clone(),
        observation_time: saturating_u32(record.observation_time),
        server_status: None,
    }
}

pub fn new_taf_message(record: &TafRecord, position: &StationPosition, now: i64) -> WeatherMessage {
    WeatherMessage {
        kind: MessageKind::Taf,
        tx_time: saturating_u32(now),
        station_lat: position.lat as f32,
        station_lng: position.lng as f32,
        text_data: strip_taf_prefix(&record.raw_text).to_string(),
        observation_time: saturating_u32(record.bulletin_time),
        server_status: None,
    }
}

pub fn new_beacon_message(
    position: &StationPosition,
    status: ServerStatus,
    now: i64,
) -> WeatherMessage {
    WeatherMessage {
        kind: MessageKind::Beacon,
        tx_time: saturating_u32(now),
        station_lat: position.lat as f32,
        station_lng: position.lng as f32,
        text_data: String::new(),
        observation_time: saturating_u32(now),
        server_status: Some(status),
    }
}

impl WeatherMessage {
    /// Bulletin text with its product prefix restored, for re-encoding.
    /// `None` for beacons.
    pub fn report_text(&self) -> Option<String> {
        match self.kind {
            MessageKind::Metar => Some(format!("METAR {}", self.text_data)),
            MessageKind::Taf => Some(format!("TAF {}", self.text_data)),
            MessageKind::Beacon => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
