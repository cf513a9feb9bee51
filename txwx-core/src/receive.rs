//! Receive-side validation state machine.
//!
//! Pure logic, no I/O. Each inbound buffer walks
//! `ParseHeader → BoundsCheck → ChecksumVerify → Deserialize → Dispatch`
//! and either reaches dispatch or stops at one stage. A rejected buffer
//! only bumps a counter; the next buffer starts from a clean slate.

use crate::packet::{deserialize_message, Packet};
use crate::types::*;

/// Receive-log marker written in place of text for checksum failures.
pub const CRC_BAD_MARKER: &str = "crcbad";

/// Stage at which a buffer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxStage {
    ParseHeader,
    BoundsCheck,
    ChecksumVerify,
    Deserialize,
}

impl std::fmt::Display for RxStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RxStage::ParseHeader => write!(f, "parse header"),
            RxStage::BoundsCheck => write!(f, "bounds check"),
            RxStage::ChecksumVerify => write!(f, "checksum verify"),
            RxStage::Deserialize => write!(f, "deserialize"),
        }
    }
}

/// Outcome of processing one inbound buffer.
#[derive(Debug)]
pub enum RxEvent {
    Rejected { stage: RxStage, error: TxwxError },
    /// METAR or TAF, ready for downstream re-encoding.
    Report(WeatherMessage),
    Beacon {
        message: WeatherMessage,
        status: ServerStatus,
    },
    /// Valid message with nothing to dispatch (beacon without status).
    Ignored(MessageKind),
}

impl RxEvent {
    /// Receive-log line for this event, if it gets one.
    ///
    /// `own` is the receiving station's current position.
    pub fn log_line(&self, own: &StationPosition) -> Option<String> {
        match self {
            RxEvent::Report(msg) => Some(receive_log_line(
                msg.station_lat,
                msg.station_lng,
                own,
                &msg.text_data,
            )),
            RxEvent::Beacon { message, status } => Some(receive_log_line(
                message.station_lat,
                message.station_lng,
                own,
                &status.summary(),
            )),
            RxEvent::Rejected {
                stage: RxStage::ChecksumVerify,
                ..
            } => Some(receive_log_line(0.0, 0.0, own, CRC_BAD_MARKER)),
            _ => None,
        }
    }
}

/// `stationLat,stationLng,ownLat,ownLng,text`, four decimals.
///
/// Control characters in `text` become spaces so one frame is one line.
pub fn receive_log_line(
    station_lat: f32,
    station_lng: f32,
    own: &StationPosition,
    text: &str,
) -> String {
    let text: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!(
        "{:.4},{:.4},{:.4},{:.4},{}",
        station_lat, station_lng, own.lat, own.lng, text
    )
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Validates inbound buffers and keeps per-stage counters.
#[derive(Debug, Default)]
pub struct RxPipeline {
    /// Buffers shorter than the 10-byte header
    pub malformed_headers: u64,
    /// Declared payload length overran the buffer
    pub length_overruns: u64,
    /// Buffers that passed the bounds check
    pub messages_received: u64,
    pub crc_errors: u64,
    pub decode_errors: u64,
    /// Reports and beacons handed to dispatch
    pub dispatched: u64,
}

impl RxPipeline {
    pub fn new() -> Self {
        RxPipeline::default()
    }

    /// Buffers rejected at any stage.
    pub fn rejected(&self) -> u64 {
        self.malformed_headers + self.length_overruns + self.crc_errors + self.decode_errors
    }

    /// Process a single inbound buffer.
    pub fn process(&mut self, raw: &[u8]) -> RxEvent {
        let packet = match Packet::parse(raw) {
            Ok(p) => p,
            Err(error) => {
                let stage = if let TxwxError::MalformedHeader(_) = error {
                    self.malformed_headers += 1;
                    RxStage::ParseHeader
                } else {
                    self.length_overruns += 1;
                    RxStage::BoundsCheck
                };
                return RxEvent::Rejected { stage, error };
            }
        };

        self.messages_received += 1;

        if let Err(error) = packet.verify() {
            self.crc_errors += 1;
            return RxEvent::Rejected {
                stage: RxStage::ChecksumVerify,
                error,
            };
        }

        let mut message = match deserialize_message(&packet.payload) {
            Ok(m) => m,
            Err(error) => {
                self.decode_errors += 1;
                return RxEvent::Rejected {
                    stage: RxStage::Deserialize,
                    error,
                };
            }
        };

        match message.kind {
            MessageKind::Metar | MessageKind::Taf => {
                self.dispatched += 1;
                RxEvent::Report(message)
            }
            MessageKind::Beacon => match message.server_status.take() {
                Some(status) => {
                    self.dispatched += 1;
                    RxEvent::Beacon { message, status }
                }
                None => RxEvent::Ignored(MessageKind::Beacon),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
