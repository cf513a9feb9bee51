//! Receive loop: validate inbound frames, write the receive log and pass
//! reports downstream.
//!
//! Log and downstream writes are plain blocking I/O, so the loop runs on a
//! blocking thread fed by the radio channel.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use txwx_core::config::{Mode, Settings};
use txwx_core::receive::RxStage;
use txwx_core::{RxEvent, RxPipeline, StationTracker};

use crate::downstream::DownstreamWriter;
use crate::radio::RadioMessage;

/// Whether the settings put this station in receive mode.
pub fn rx_enabled(settings: &Settings) -> bool {
    if settings.mode != Mode::Rx {
        log::warn!("Mode is not RX, receiver idle");
        return false;
    }
    true
}

/// Append-only log of every validated or checksum-rejected frame.
pub struct ReceiveLog {
    file: File,
}

impl ReceiveLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening receive log {}", path.display()))?;
        Ok(ReceiveLog { file })
    }

    pub fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.file, "{line}")
    }
}

pub struct Receiver<W: Write> {
    pipeline: Arc<Mutex<RxPipeline>>,
    tracker: Arc<StationTracker>,
    log: ReceiveLog,
    downstream: DownstreamWriter<W>,
}

impl<W: Write> Receiver<W> {
    pub fn new(
        pipeline: Arc<Mutex<RxPipeline>>,
        tracker: Arc<StationTracker>,
        log: ReceiveLog,
        downstream: DownstreamWriter<W>,
    ) -> Self {
        Receiver {
            pipeline,
            tracker,
            log,
            downstream,
        }
    }

    /// Validate and dispatch one frame.
    pub fn handle(&mut self, raw: &[u8]) -> RxEvent {
        let event = self
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .process(raw);
        self.dispatch(&event);
        event
    }

    fn dispatch(&mut self, event: &RxEvent) {
        match event {
            RxEvent::Report(msg) => {
                if let Err(e) = self.downstream.emit(msg) {
                    log::warn!("downstream: {e:#}");
                }
            }
            RxEvent::Beacon { message, status } => log::info!(
                "received beacon from station ({:.4}, {:.4}): {}",
                message.station_lat,
                message.station_lng,
                status.summary()
            ),
            RxEvent::Rejected {
                stage: RxStage::Deserialize,
                error,
            } => log::warn!("undecodable frame: {error}"),
            RxEvent::Rejected { stage, error } => log::debug!("frame dropped at {stage}: {error}"),
            RxEvent::Ignored(kind) => log::debug!("ignoring {kind} message without status"),
        }

        if let Some(line) = event.log_line(&self.tracker.current_position()) {
            if let Err(e) = self.log.write_line(&line) {
                log::warn!("can't write receive log: {e}");
            }
        }
    }

    /// Consume inbound frames until the radio side goes away.
    ///
    /// Blocks the calling thread; run it under `spawn_blocking`.
    pub fn run_blocking(mut self, mut inbound: mpsc::Receiver<RadioMessage>) {
        while let Some(msg) = inbound.blocking_recv() {
            self.handle(&msg.data);
        }
        log::warn!("radio channel closed, receiver stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txwx_core::message::{new_beacon_message, RadioScheme, ReportCounts, StationHealth};
    use txwx_core::packet::{encode_frame, HEADER_LEN};
    use txwx_core::{MessageKind, ServerStatus, StationPosition, WeatherMessage};

    use crate::downstream::FisbTextEncoder;

    fn metar() -> WeatherMessage {
        WeatherMessage {
            kind: MessageKind::Metar,
            tx_time: 1_700_000_060,
            station_lat: 44.25,
            station_lng: -81.60,
            text_data: "KXYZ 1200Z 27010KT".into(),
            observation_time: 1_700_000_000,
            server_status: None,
        }
    }

    fn receiver(dir: &Path) -> Receiver<Vec<u8>> {
        Receiver::new(
            Arc::new(Mutex::new(RxPipeline::new())),
            Arc::new(StationTracker::with_manual_override(43.5, -80.25)),
            ReceiveLog::open(&dir.join("messages_received.log")).unwrap(),
            DownstreamWriter::new(Box::new(FisbTextEncoder), Vec::new()),
        )
    }

    fn log_lines(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("messages_received.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_dispatch_writes_log_and_downstream() {
        let dir = tempfile::tempdir().unwrap();
        let mut rx = receiver(dir.path());

        let good = encode_frame(&metar()).unwrap();
        let mut bad = good.clone();
        bad[HEADER_LEN + 1] ^= 0x01;
        let status = ServerStatus::new(
            ReportCounts { metars: 5, tafs: 2 },
            &RadioScheme::default(),
            StationHealth::at(1_700_000_000, false),
        );
        let beacon = encode_frame(&new_beacon_message(
            &StationPosition::new(35.5, -82.5, 1),
            status,
            1_700_000_000,
        ))
        .unwrap();

        assert!(matches!(rx.handle(&good), RxEvent::Report(_)));
        rx.handle(&bad);
        rx.handle(&[0x05, 0x00]);
        assert!(matches!(rx.handle(&beacon), RxEvent::Beacon { .. }));

        assert_eq!(
            log_lines(dir.path()),
            vec![
                "44.2500,-81.6000,43.5000,-80.2500,KXYZ 1200Z 27010KT",
                "0.0000,0.0000,43.5000,-80.2500,crcbad",
                "35.5000,-82.5000,43.5000,-80.2500,TimeOk=true, WeatherUpdatesOk=false, MetarsTracked=5, TafsTracked=2",
            ]
        );

        let out = String::from_utf8(rx.downstream.out.clone()).unwrap();
        assert_eq!(out.lines().count(), 1);

        let pipeline = rx.pipeline.lock().unwrap();
        assert_eq!(pipeline.messages_received, 3);
        assert_eq!(pipeline.crc_errors, 1);
        assert_eq!(pipeline.malformed_headers, 1);
        assert_eq!(pipeline.dispatched, 2);
    }

    #[test]
    fn test_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages_received.log");
        ReceiveLog::open(&path).unwrap().write_line("first").unwrap();
        ReceiveLog::open(&path).unwrap().write_line("second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_log_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReceiveLog::open(&dir.path().join("nope/messages.log")).is_err());
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let dir = tempfile::tempdir().unwrap();
        let rx = receiver(dir.path());
        let pipeline = rx.pipeline.clone();
        let (tx, inbound) = mpsc::channel(4);

        let handle = tokio::task::spawn_blocking(move || rx.run_blocking(inbound));
        for _ in 0..3 {
            tx.send(RadioMessage {
                data: encode_frame(&metar()).unwrap(),
            })
            .await
            .unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(pipeline.lock().unwrap().dispatched, 3);
        assert_eq!(log_lines(dir.path()).len(), 3);
    }

    #[test]
    fn test_rx_enabled_only_in_rx_mode() {
        let mut settings = Settings::default();
        assert!(!rx_enabled(&settings));
        settings.mode = Mode::Rx;
        assert!(rx_enabled(&settings));
    }
}
