//! Re-emit received reports as FIS-B text uplinks for a downstream
//! receiver, one `+<hex>;` line per uplink block.

use std::io::Write;

use anyhow::{Context, Result};

use txwx_core::uplink::{encode_text_uplinks, TextReport};
use txwx_core::{TxwxError, WeatherMessage};

pub trait DownstreamEncoder: Send {
    /// Encode one report into uplink blocks.
    fn encode(&self, report: &TextReport) -> txwx_core::Result<Vec<Vec<u8>>>;
}

/// Textual METAR/TAF product encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FisbTextEncoder;

impl DownstreamEncoder for FisbTextEncoder {
    fn encode(&self, report: &TextReport) -> txwx_core::Result<Vec<Vec<u8>>> {
        if report.text.trim().is_empty() {
            return Err(TxwxError::Downstream("empty report text".into()));
        }
        Ok(encode_text_uplinks(report))
    }
}

/// Report for a received METAR/TAF, positioned at the sending station.
pub fn text_report(msg: &WeatherMessage) -> Option<TextReport> {
    let text = msg.report_text()?;
    Some(TextReport::new(
        text,
        msg.station_lat as f64,
        msg.station_lng as f64,
        msg.observation_time,
    ))
}

pub fn hex_line(block: &[u8]) -> String {
    let mut line = String::with_capacity(block.len() * 2 + 2);
    line.push('+');
    for b in block {
        line.push_str(&format!("{b:02x}"));
    }
    line.push(';');
    line
}

/// Encoder plus the stream the hex lines go to.
pub struct DownstreamWriter<W: Write> {
    encoder: Box<dyn DownstreamEncoder>,
    pub(crate) out: W,
}

impl<W: Write> DownstreamWriter<W> {
    pub fn new(encoder: Box<dyn DownstreamEncoder>, out: W) -> Self {
        DownstreamWriter { encoder, out }
    }

    /// Encode and write `msg`. Returns the number of blocks written;
    /// beacons produce none.
    pub fn emit(&mut self, msg: &WeatherMessage) -> Result<usize> {
        let Some(report) = text_report(msg) else {
            return Ok(0);
        };
        let blocks = self.encoder.encode(&report).with_context(|| {
            format!(
                "encoding {} from ({:.4}, {:.4})",
                msg.kind, report.lat, report.lng
            )
        })?;
        for block in &blocks {
            writeln!(self.out, "{}", hex_line(block))?;
        }
        self.out.flush()?;
        Ok(blocks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txwx_core::uplink::UPLINK_DATA_LEN;
    use txwx_core::MessageKind;

    fn metar() -> WeatherMessage {
        WeatherMessage {
            kind: MessageKind::Metar,
            tx_time: 1_700_000_060,
            station_lat: 44.25,
            station_lng: -81.60,
            text_data: "KXYZ 1200Z 27010KT".into(),
            observation_time: 45_240,
            server_status: None,
        }
    }

    #[test]
    fn test_hex_line() {
        assert_eq!(hex_line(&[0x00, 0xAB, 0x1F]), "+00ab1f;");
    }

    #[test]
    fn test_text_report_fields() {
        let report = text_report(&metar()).unwrap();
        assert_eq!(report.text, "METAR KXYZ 1200Z 27010KT");
        assert_eq!((report.hours, report.minutes), (12, 34));
        assert!((report.lat - 44.25).abs() < 1e-6);
    }

    #[test]
    fn test_emit_writes_hex_blocks() {
        let mut writer = DownstreamWriter::new(Box::new(FisbTextEncoder), Vec::new());
        assert_eq!(writer.emit(&metar()).unwrap(), 1);
        let out = String::from_utf8(writer.out).unwrap();
        let line = out.trim_end();
        assert!(line.starts_with('+') && line.ends_with(';'));
        assert_eq!(line.len(), UPLINK_DATA_LEN * 2 + 2);
    }

    #[test]
    fn test_beacon_not_emitted() {
        let mut msg = metar();
        msg.kind = MessageKind::Beacon;
        let mut writer = DownstreamWriter::new(Box::new(FisbTextEncoder), Vec::new());
        assert_eq!(writer.emit(&msg).unwrap(), 0);
        assert!(writer.out.is_empty());
    }

    #[test]
    fn test_empty_text_rejected() {
        let report = TextReport::new("  ", 0.0, 0.0, 0);
        assert!(matches!(
            FisbTextEncoder.encode(&report),
            Err(TxwxError::Downstream(_))
        ));
    }
}
