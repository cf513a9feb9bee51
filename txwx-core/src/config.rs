//! Station settings file management.
//!
//! Reads/writes `/boot/txwx.conf` (JSON) with the station mode, radio
//! parameters, manual position, service endpoints, and task intervals.
//! Keys are PascalCase so existing deployed files keep loading; keys added
//! later fall back to their defaults when absent.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::beacon::BEACON_INTERVAL;
use crate::message::RadioScheme;
use crate::types::{Result, TxwxError};

/// Default settings file location.
pub const CONFIG_LOCATION: &str = "/boot/txwx.conf";

/// Default airtime reserved per transmitted frame.
pub const DEFAULT_TX_FRAME_MILLIS: u64 = 25;

/// Whether this station transmits or receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Mode {
    Tx,
    Rx,
}

impl From<u8> for Mode {
    fn from(v: u8) -> Self {
        match v {
            1 => Mode::Rx,
            _ => Mode::Tx,
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Tx => 0,
            Mode::Rx => 1,
        }
    }
}

/// Full settings structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub mode: Mode,
    pub radio_mod_mode: u8,
    /// Carrier frequency, MHz
    pub freq: f64,
    pub manual_lat: f64,
    pub manual_lng: f64,
    /// Local UDP address the modem bridge delivers inbound frames to
    pub radio_bind: String,
    /// UDP address of the modem bridge for outbound frames
    pub radio_peer: String,
    pub situation_url: String,
    pub weather_url: String,
    pub receive_log: String,
    pub reports_update_secs: u64,
    pub position_retry_secs: u64,
    pub beacon_secs: u64,
    /// Airtime per transmitted frame, ms
    pub tx_frame_millis: u64,
    pub radius_miles: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mode: Mode::Tx,
            radio_mod_mode: 1,
            freq: 915.0,
            manual_lat: 0.0,
            manual_lng: 0.0,
            radio_bind: "127.0.0.1:30979".into(),
            radio_peer: "127.0.0.1:30978".into(),
            situation_url: "http://localhost/getSituation".into(),
            weather_url: "https://aviationweather.gov/api/data".into(),
            receive_log: "/var/log/messages_received.log".into(),
            reports_update_secs: 300,
            position_retry_secs: 15,
            beacon_secs: BEACON_INTERVAL.as_secs(),
            tx_frame_millis: DEFAULT_TX_FRAME_MILLIS,
            radius_miles: 500.0,
        }
    }
}

impl Settings {
    /// Reject values that would turn a periodic task into a busy loop.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("ReportsUpdateSecs", self.reports_update_secs),
            ("PositionRetrySecs", self.position_retry_secs),
            ("BeaconSecs", self.beacon_secs),
            ("TxFrameMillis", self.tx_frame_millis),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(TxwxError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.radius_miles.is_nan() || self.radius_miles <= 0.0 {
            return Err(TxwxError::Config(format!(
                "RadiusMiles must be positive, got {}",
                self.radius_miles
            )));
        }
        Ok(())
    }

    // Interval accessors never return zero, even for hand-built settings.

    pub fn reports_update_interval(&self) -> Duration {
        Duration::from_secs(self.reports_update_secs.max(1))
    }

    pub fn position_retry_interval(&self) -> Duration {
        Duration::from_secs(self.position_retry_secs.max(1))
    }

    pub fn beacon_interval(&self) -> Duration {
        Duration::from_secs(self.beacon_secs.max(1))
    }

    pub fn tx_frame_time(&self) -> Duration {
        Duration::from_millis(self.tx_frame_millis.max(1))
    }

    /// Beacon radio descriptors for the configured carrier.
    ///
    /// The scheme list entry is the carrier offset from the band start in
    /// 1/65536 MHz units.
    pub fn radio_scheme(&self) -> RadioScheme {
        let mut scheme = RadioScheme::default();
        let offset = (self.freq - scheme.band_start as f64).max(0.0);
        scheme.scheme_list = vec![(offset * 65536.0).round() as u32];
        scheme
    }
}

/// Load settings from `path`.
///
/// A missing file yields defaults, which are written back (best effort).
/// An unreadable or unparseable file yields defaults and is left alone.
pub fn load_settings(path: &Path) -> Settings {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("can't read settings {}: {e}", path.display());
            let settings = Settings::default();
            if e.kind() == std::io::ErrorKind::NotFound {
                if let Err(e) = save_settings(path, &settings) {
                    log::warn!("can't save settings {}: {e}", path.display());
                }
            }
            return settings;
        }
    };

    match parse_settings(&text) {
        Ok(settings) => {
            log::info!("read in settings from {}", path.display());
            settings
        }
        Err(e) => {
            log::warn!("can't read settings {}: {e}", path.display());
            Settings::default()
        }
    }
}

/// Save settings to `path`.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    let text = serialize_settings(settings)?;
    std::fs::write(path, text)?;
    log::info!("wrote settings to {}", path.display());
    Ok(())
}

fn parse_settings(text: &str) -> Result<Settings> {
    let settings: Settings =
        serde_json::from_str(text).map_err(|e| TxwxError::Config(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

fn serialize_settings(settings: &Settings) -> Result<String> {
    serde_json::to_string_pretty(settings).map_err(|e| TxwxError::Config(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
