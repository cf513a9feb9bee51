//! Transmit loop.
//!
//! Each iteration reads one consistent cache snapshot, transmits every
//! enabled report, then checks the beacon schedule. A message that cannot
//! be framed or sent is counted and skipped; the rest of the iteration
//! carries on.
//!
//! The bridge accepts datagrams faster than the radio can key them, so
//! every accepted frame is followed by its airtime budget before the next
//! one goes out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use txwx_core::beacon::BeaconSchedule;
use txwx_core::config::DEFAULT_TX_FRAME_MILLIS;
use txwx_core::message::{
    new_beacon_message, new_metar_message, new_taf_message, RadioScheme, ReportCounts,
    StationHealth,
};
use txwx_core::packet::encode_frame;
use txwx_core::{
    ServerStatus, StationPosition, StationTracker, TxwxError, WeatherCache, WeatherMessage,
};

use crate::radio::Radio;
use crate::stats::TxCounters;

/// Which report kinds go out over the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub send_metars: bool,
    pub send_tafs: bool,
}

impl TxOptions {
    /// Beacon mode turns all weather off.
    pub fn new(beacon_mode: bool, metars: bool, tafs: bool) -> Self {
        TxOptions {
            send_metars: metars && !beacon_mode,
            send_tafs: tafs && !beacon_mode,
        }
    }

    pub fn beacon_only(&self) -> bool {
        !self.send_metars && !self.send_tafs
    }
}

pub struct Transmitter {
    radio: Arc<dyn Radio>,
    cache: Arc<WeatherCache>,
    tracker: Arc<StationTracker>,
    counters: Arc<TxCounters>,
    scheme: RadioScheme,
    options: TxOptions,
    schedule: BeaconSchedule,
    /// Airtime reserved after each accepted frame
    frame_time: Duration,
}

impl Transmitter {
    pub fn new(
        radio: Arc<dyn Radio>,
        cache: Arc<WeatherCache>,
        tracker: Arc<StationTracker>,
        counters: Arc<TxCounters>,
        scheme: RadioScheme,
        options: TxOptions,
        beacon_interval: Duration,
    ) -> Self {
        Transmitter {
            radio,
            cache,
            tracker,
            counters,
            scheme,
            options,
            schedule: BeaconSchedule::new(
                beacon_interval,
                tokio::time::Instant::now().into_std(),
            ),
            frame_time: Duration::from_millis(DEFAULT_TX_FRAME_MILLIS),
        }
    }

    /// Airtime per frame. Zero disables pacing.
    pub fn with_frame_time(mut self, frame_time: Duration) -> Self {
        self.frame_time = frame_time;
        self
    }

    /// Restart the beacon schedule from `start`.
    pub fn with_schedule_start(mut self, start: Instant) -> Self {
        self.schedule = BeaconSchedule::new(self.schedule.interval(), start);
        self
    }

    pub fn beacons_fired(&self) -> u64 {
        self.schedule.fired
    }

    /// One pass over the snapshot plus a beacon check.
    ///
    /// Returns the number of frames the radio accepted.
    pub async fn run_once(&mut self, now: Instant) -> usize {
        let snapshot = self.cache.snapshot();
        let position = self.tracker.current_position();
        let wall = Utc::now().timestamp();
        let mut sent = 0;

        if self.options.send_metars {
            for record in &snapshot.metars {
                sent += self.send(&new_metar_message(record, &position, wall)).await as usize;
            }
        }
        if self.options.send_tafs {
            for record in &snapshot.tafs {
                sent += self.send(&new_taf_message(record, &position, wall)).await as usize;
            }
        }

        if self.schedule.poll(now) {
            let beacon = self.beacon(&position, snapshot.counts(), wall);
            sent += self.send(&beacon).await as usize;
        }
        sent
    }

    fn beacon(
        &self,
        position: &StationPosition,
        counts: ReportCounts,
        wall: i64,
    ) -> WeatherMessage {
        let health = StationHealth::at(wall, self.counters.weather_updates_ok());
        let status = ServerStatus::new(counts, &self.scheme, health);
        new_beacon_message(position, status, wall)
    }

    /// Frame and transmit one message. True if the radio took it.
    async fn send(&self, msg: &WeatherMessage) -> bool {
        let frame = match encode_frame(msg) {
            Ok(frame) => frame,
            Err(TxwxError::TooLong(len)) => {
                TxCounters::bump(&self.counters.messages_too_long);
                log::debug!("{} message too long ({len} bytes), skipped", msg.kind);
                return false;
            }
            Err(e) => {
                TxCounters::bump(&self.counters.transmit_errors);
                log::warn!("can't encode {} message: {e}", msg.kind);
                return false;
            }
        };

        match self.radio.transmit(&frame).await {
            Ok(()) => {
                TxCounters::bump(&self.counters.messages_sent);
                if !self.frame_time.is_zero() {
                    tokio::time::sleep(self.frame_time).await;
                }
                true
            }
            Err(e) => {
                TxCounters::bump(&self.counters.transmit_errors);
                log::warn!("radio transmit of {} message failed: {e:#}", msg.kind);
                false
            }
        }
    }

    /// Transmit forever. Idle passes sleep until the next beacon is due.
    pub async fn run(mut self) {
        if self.options.beacon_only() {
            log::info!("beacon-only mode, weather transmission off");
        }
        loop {
            let now = tokio::time::Instant::now().into_std();
            if self.run_once(now).await == 0 {
                let due = tokio::time::Instant::from_std(self.schedule.next_due());
                tokio::time::sleep_until(due).await;
            } else {
                tokio::task::yield_now().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use txwx_core::packet::decode;
    use txwx_core::{MessageKind, MetarRecord, TafRecord, WeatherSnapshot};

    use crate::radio::RadioMessage;

    #[derive(Default)]
    struct MockRadio {
        frames: Mutex<Vec<Vec<u8>>>,
        attempts: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Radio for MockRadio {
        async fn transmit(&self, frame: &[u8]) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("radio not keyed");
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }

        fn subscribe(&self, _sender: mpsc::Sender<RadioMessage>) {}
    }

    impl MockRadio {
        fn kinds(&self) -> Vec<MessageKind> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .map(|f| decode(f).unwrap().kind)
                .collect()
        }
    }

    fn snapshot() -> WeatherSnapshot {
        let metar = |id: &str, text: String| MetarRecord {
            station_id: id.into(),
            raw_text: text,
            observation_time: 1_700_000_000,
            lat: 35.2,
            lng: -80.9,
        };
        WeatherSnapshot::new(
            vec![
                metar("KCLT", "KCLT 141453Z 00000KT 10SM CLR 12/02 A3012".into()),
                metar("KGSP", "KGSP 141453Z 00000KT 10SM CLR 11/01 A3013".into()),
                metar("KBIG", "KBIG RMK ".repeat(30)),
            ],
            vec![TafRecord {
                station_id: "KCLT".into(),
                raw_text: "TAF KCLT 141130Z 1412/1512 VRB03KT P6SM SKC".into(),
                bulletin_time: 1_699_961_400,
                lat: 35.2,
                lng: -80.9,
            }],
        )
    }

    fn transmitter(
        radio: Arc<MockRadio>,
        options: TxOptions,
    ) -> (Transmitter, Arc<TxCounters>, Instant) {
        transmitter_with(radio, options, snapshot())
    }

    fn transmitter_with(
        radio: Arc<MockRadio>,
        options: TxOptions,
        weather: WeatherSnapshot,
    ) -> (Transmitter, Arc<TxCounters>, Instant) {
        let cache = Arc::new(WeatherCache::new());
        cache.replace(weather);
        let counters = Arc::new(TxCounters::new());
        let start = tokio::time::Instant::now().into_std();
        let tx = Transmitter::new(
            radio,
            cache,
            Arc::new(StationTracker::with_manual_override(35.5, -82.5)),
            counters.clone(),
            RadioScheme::default(),
            options,
            Duration::from_secs(1),
        )
        .with_schedule_start(start);
        (tx, counters, start)
    }

    #[test]
    fn test_beacon_mode_forces_weather_off() {
        assert!(TxOptions::new(true, true, true).beacon_only());
        let opts = TxOptions::new(false, true, false);
        assert!(opts.send_metars && !opts.send_tafs);
    }

    #[tokio::test]
    async fn test_beacon_only_sends_only_beacons() {
        let radio = Arc::new(MockRadio::default());
        let (mut tx, counters, start) =
            transmitter(radio.clone(), TxOptions::new(true, true, true));

        for i in 1..=10 {
            assert_eq!(tx.run_once(start + Duration::from_secs(i)).await, 1);
        }
        let kinds = radio.kinds();
        assert_eq!(kinds.len(), 10);
        assert!(kinds.iter().all(|k| *k == MessageKind::Beacon));
        assert_eq!(tx.beacons_fired(), 10);
        assert_eq!(TxCounters::get(&counters.messages_sent), 10);
    }

    #[tokio::test]
    async fn test_weather_pass_skips_oversized() {
        let radio = Arc::new(MockRadio::default());
        let (mut tx, counters, start) =
            transmitter(radio.clone(), TxOptions::new(false, true, true));

        // Before the first beacon is due: weather only
        assert_eq!(tx.run_once(start).await, 3);
        assert_eq!(
            radio.kinds(),
            vec![MessageKind::Metar, MessageKind::Metar, MessageKind::Taf]
        );
        assert_eq!(TxCounters::get(&counters.messages_too_long), 1);

        let frames = radio.frames.lock().unwrap().clone();
        let taf = decode(&frames[2]).unwrap();
        assert_eq!(taf.text_data, "KCLT 141130Z 1412/1512 VRB03KT P6SM SKC");
        assert_eq!(taf.station_lat, 35.5);
    }

    #[tokio::test]
    async fn test_beacon_carries_counts_and_health() {
        let radio = Arc::new(MockRadio::default());
        let (mut tx, counters, start) =
            transmitter(radio.clone(), TxOptions::new(true, true, true));
        counters.set_weather_updates_ok(true);

        tx.run_once(start + Duration::from_secs(1)).await;
        let frames = radio.frames.lock().unwrap().clone();
        let status = decode(&frames[0]).unwrap().server_status.unwrap();
        assert_eq!(status.metars_tracked, 3);
        assert_eq!(status.tafs_tracked, 1);
        assert!(status.time_ok);
        assert!(status.weather_updates_ok);
    }

    #[tokio::test]
    async fn test_radio_errors_counted() {
        let radio = Arc::new(MockRadio {
            fail: true,
            ..MockRadio::default()
        });
        let (mut tx, counters, start) = transmitter(radio, TxOptions::new(false, true, true));

        assert_eq!(tx.run_once(start + Duration::from_secs(1)).await, 0);
        // 2 METARs, 1 TAF and the beacon failed; the oversized METAR never got that far
        assert_eq!(TxCounters::get(&counters.transmit_errors), 4);
        assert_eq!(TxCounters::get(&counters.messages_too_long), 1);
        assert_eq!(TxCounters::get(&counters.messages_sent), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_rate_bounded_by_airtime() {
        let radio = Arc::new(MockRadio::default());
        let one_metar = WeatherSnapshot::new(snapshot().metars[..1].to_vec(), Vec::new());
        let (tx, _, _) =
            transmitter_with(radio.clone(), TxOptions::new(false, true, true), one_metar);
        let tx = tx.with_frame_time(Duration::from_millis(100));

        let _ = tokio::time::timeout(Duration::from_secs(1), tx.run()).await;
        let sent = radio.frames.lock().unwrap().len();
        assert!((9..=12).contains(&sent), "sent {sent} frames in 1 s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_loop_sleeps_until_beacon() {
        let radio = Arc::new(MockRadio {
            fail: true,
            ..MockRadio::default()
        });
        let (tx, counters, _) = transmitter(radio.clone(), TxOptions::new(true, true, true));

        let _ = tokio::time::timeout(Duration::from_millis(10_500), tx.run()).await;
        // One attempt per beacon interval and nothing in between
        assert_eq!(radio.attempts.load(Ordering::SeqCst), 10);
        assert_eq!(TxCounters::get(&counters.transmit_errors), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_beacon_only_run_keeps_cadence() {
        let radio = Arc::new(MockRadio::default());
        let (tx, _, _) = transmitter(radio.clone(), TxOptions::new(true, true, true));

        let _ = tokio::time::timeout(Duration::from_millis(10_500), tx.run()).await;
        let kinds = radio.kinds();
        assert_eq!(kinds.len(), 10);
        assert!(kinds.iter().all(|k| *k == MessageKind::Beacon));
    }
}
