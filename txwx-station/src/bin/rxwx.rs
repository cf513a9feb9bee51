//! rxwx: weather uplink receiver.
//!
//! Validates frames from the radio, appends them to the receive log and
//! prints FIS-B text uplinks on stdout for a downstream receiver.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;

use txwx_core::config::{load_settings, CONFIG_LOCATION};
use txwx_core::{RxPipeline, StationTracker};
use txwx_station::downstream::{DownstreamWriter, FisbTextEncoder};
use txwx_station::logging::init_logging;
use txwx_station::radio::{Radio, UdpRadio, INBOUND_CAPACITY};
use txwx_station::receive::{rx_enabled, ReceiveLog, Receiver};
use txwx_station::situation::{run_position_poller, SituationClient, POSITION_POLL_INTERVAL};
use txwx_station::stats::report_rx_stats;

#[derive(Parser)]
#[command(name = "rxwx", version, about = "Weather uplink receiver")]
struct Cli {
    /// Settings file
    #[arg(long, env = "TXWX_CONFIG", default_value = CONFIG_LOCATION)]
    config: PathBuf,

    /// Station latitude, overrides the settings file
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Station longitude, overrides the settings file
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = load_settings(&cli.config);
    if let (Some(lat), Some(lng)) = (cli.lat, cli.lng) {
        settings.manual_lat = lat;
        settings.manual_lng = lng;
    }

    if !rx_enabled(&settings) {
        std::future::pending::<()>().await;
    }

    let receive_log = ReceiveLog::open(Path::new(&settings.receive_log))?;

    let radio = UdpRadio::open(&settings.radio_bind, &settings.radio_peer)
        .await
        .context("unable to open radio")?;

    let tracker = Arc::new(StationTracker::with_manual_override(
        settings.manual_lat,
        settings.manual_lng,
    ));
    let pipeline = Arc::new(Mutex::new(RxPipeline::new()));

    tokio::spawn(run_position_poller(
        Arc::new(SituationClient::new(&settings.situation_url)),
        tracker.clone(),
        POSITION_POLL_INTERVAL,
    ));
    tokio::spawn(report_rx_stats(pipeline.clone(), tracker.clone()));

    let (sender, inbound) = mpsc::channel(INBOUND_CAPACITY);
    radio.subscribe(sender);

    let downstream = DownstreamWriter::new(Box::new(FisbTextEncoder), std::io::stdout());
    let receiver = Receiver::new(pipeline, tracker, receive_log, downstream);
    tokio::task::spawn_blocking(move || receiver.run_blocking(inbound))
        .await
        .context("receiver thread failed")?;
    Ok(())
}
