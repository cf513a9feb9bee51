//! txwx: weather uplink ground station transmitter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};

use txwx_core::config::{load_settings, CONFIG_LOCATION};
use txwx_core::{StationTracker, WeatherCache};
use txwx_station::logging::init_logging;
use txwx_station::radio::UdpRadio;
use txwx_station::situation::{run_position_poller, SituationClient, POSITION_POLL_INTERVAL};
use txwx_station::stats::{report_tx_stats, TxCounters};
use txwx_station::sync::{CacheSynchronizer, SyncOptions};
use txwx_station::transmit::{Transmitter, TxOptions};
use txwx_station::weather::AviationWeatherClient;

#[derive(Parser)]
#[command(name = "txwx", version, about = "Weather uplink ground station transmitter")]
struct Cli {
    /// Settings file
    #[arg(long, env = "TXWX_CONFIG", default_value = CONFIG_LOCATION)]
    config: PathBuf,

    /// Transmit beacons only
    #[arg(long)]
    beacon_mode: bool,

    /// Transmit METARs (off in beacon mode)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    metars: bool,

    /// Transmit TAFs (off in beacon mode)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    tafs: bool,

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
    let settings = load_settings(&cli.config);

    let radio = UdpRadio::open(&settings.radio_bind, &settings.radio_peer)
        .await
        .context("unable to open radio")?;

    let tracker = Arc::new(StationTracker::with_manual_override(
        settings.manual_lat,
        settings.manual_lng,
    ));
    let cache = Arc::new(WeatherCache::new());
    let counters = Arc::new(TxCounters::new());
    let options = TxOptions::new(cli.beacon_mode, cli.metars, cli.tafs);

    tokio::spawn(run_position_poller(
        Arc::new(SituationClient::new(&settings.situation_url)),
        tracker.clone(),
        POSITION_POLL_INTERVAL,
    ));

    // Fetching follows --metars/--tafs even in beacon mode so beacons
    // still report tracked counts.
    let sync = CacheSynchronizer::new(
        Arc::new(AviationWeatherClient::new(&settings.weather_url)),
        tracker.clone(),
        cache.clone(),
        counters.clone(),
        SyncOptions::from_settings(&settings, cli.metars, cli.tafs),
    );
    tokio::spawn(sync.run());
    tokio::spawn(report_tx_stats(counters.clone(), cache.clone()));

    Transmitter::new(
        Arc::new(radio),
        cache,
        tracker,
        counters,
        settings.radio_scheme(),
        options,
        settings.beacon_interval(),
    )
    .with_frame_time(settings.tx_frame_time())
    .run()
    .await;
    Ok(())
}
