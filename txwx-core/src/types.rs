//! Shared types, error enum, and the weather message model for txwx-core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors produced by txwx-core.
#[derive(Debug, Error)]
pub enum TxwxError {
    #[error("malformed header: {0} bytes available, header needs 10")]
    MalformedHeader(usize),
    #[error("malformed header: declared payload of {declared} bytes overruns {available}-byte buffer")]
    LengthOverrun { declared: usize, available: usize },
    #[error("checksum mismatch: header {expected:#018x}, computed {computed:#018x}")]
    ChecksumMismatch { expected: u64, computed: u64 },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("message too long: {0} framed bytes")]
    TooLong(usize),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("downstream encode failed: {0}")]
    Downstream(String),
}

impl TxwxError {
    /// True for both header failures: short header and length overrun.
    pub fn is_malformed_header(&self) -> bool {
        matches!(
            self,
            TxwxError::MalformedHeader(_) | TxwxError::LengthOverrun { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TxwxError>;

// ---------------------------------------------------------------------------
// Weather message model
// ---------------------------------------------------------------------------

/// Message kind tag, first field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Metar,
    Taf,
    Beacon,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Metar => write!(f, "METAR"),
            MessageKind::Taf => write!(f, "TAF"),
            MessageKind::Beacon => write!(f, "BEACON"),
        }
    }
}

/// Station health record carried by BEACON messages.
///
/// The radio-scheme descriptors are opaque here and carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub time_ok: bool,
    pub weather_updates_ok: bool,
    pub metars_tracked: u32,
    pub tafs_tracked: u32,
    pub freq_band_start: u32,
    pub freq_band_end: u32,
    pub freq_scheme_list: Vec<u32>,
    pub freq_scheme_dwell: Vec<u32>,
    pub freq_scheme_current_index: u32,
}

impl ServerStatus {
    /// One-line summary used in logs and the receive log.
    pub fn summary(&self) -> String {
        format!(
            "TimeOk={}, WeatherUpdatesOk={}, MetarsTracked={}, TafsTracked={}",
            self.time_ok, self.weather_updates_ok, self.metars_tracked, self.tafs_tracked
        )
    }
}

/// A single message as carried in a packet payload.
///
/// Field order is the wire order. Build outbound messages through the
/// helpers in [`crate::message`] so that `text_data` is empty for beacons
/// and `server_status` is `None` for METAR/TAF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherMessage {
    pub kind: MessageKind,
    /// Transmitter clock, seconds since epoch.
    pub tx_time: u32,
    pub station_lat: f32,
    pub station_lng: f32,
    pub text_data: String,
    /// Source clock, seconds since epoch.
    pub observation_time: u32,
    pub server_status: Option<ServerStatus>,
}

// ---------------------------------------------------------------------------
// Weather source records
// ---------------------------------------------------------------------------

/// METAR as delivered by the weather source.
#[derive(Debug, Clone, PartialEq)]
pub struct MetarRecord {
    pub station_id: String,
    pub raw_text: String,
    pub observation_time: i64,
    pub lat: f64,
    pub lng: f64,
}

/// TAF as delivered by the weather source.
#[derive(Debug, Clone, PartialEq)]
pub struct TafRecord {
    pub station_id: String,
    pub raw_text: String,
    pub bulletin_time: i64,
    pub lat: f64,
    pub lng: f64,
}

// ---------------------------------------------------------------------------
// Station position
// ---------------------------------------------------------------------------

/// Station coordinate plus the fix quality reported by the position service.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StationPosition {
    pub lat: f64,
    pub lng: f64,
    /// `> 0` means a valid external fix.
    pub fix_quality: u8,
}

impl StationPosition {
    pub fn new(lat: f64, lng: f64, fix_quality: u8) -> Self {
        StationPosition {
            lat,
            lng,
            fix_quality,
        }
    }

    pub fn has_fix(&self) -> bool {
        self.fix_quality > 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
