//! fleetwatch — live trip inference for one nextbike city.
//!
//! Polls the public feed, infers rentals and returns, and appends completed
//! trips to `<output_dir>/nextbike_trips.csv` (or `.db` with the SQLite
//! backend).  Runs until Ctrl-C; trips still awaiting confirmation are then
//! written with the return that was detected.
//!
//! ```text
//! fleetwatch --city 362 --output-dir results_trips
//! fleetwatch --config berlin.json -v
//! ```

mod cli;


use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fw_core::{SystemClock, TrackerConfig};
use fw_feed::HttpSnapshotSource;
use fw_geofence::{GeofenceSource, SharedGeofences};
use fw_monitor::MonitorBuilder;
use fw_output::OutputObserver;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let base = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    let config = args.apply(base);
    config.validate()?;

    tracing::info!(
        city = %config.city_uid,
        feed = %config.city_feed_url(),
        output = %config.output_dir.display(),
        interval_secs = config.polling_interval_secs,
        backend = ?config.trip_log_backend,
        "fleetwatch starting"
    );

    // ── Flex zones ───────────────────────────────────────────────────────────
    let geofences = SharedGeofences::default();
    match GeofenceSource::from_config(&config) {
        Some(source) => {
            let http = reqwest::Client::builder()
                .timeout(config.http_timeout())
                .build()
                .context("building geofence HTTP client")?;
            // A failed load is already logged; every position then counts as
            // outside the flex zone.
            let _ = geofences.reload(&source, &http).await;
        }
        None => tracing::warn!("no flex-zone source configured, all positions are outside"),
    }

    // ── Monitor ──────────────────────────────────────────────────────────────
    let source = HttpSnapshotSource::from_config(&config, Arc::new(SystemClock))?;
    let mut monitor = MonitorBuilder::new(&config, source, Arc::new(geofences)).build()?;
    let mut observer = OutputObserver::from_config(&config)
        .with_context(|| format!("opening outputs in {}", config.output_dir.display()))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl-C received, shutting down");
                signal.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });

    let stats = monitor.run(&mut observer, shutdown).await;

    println!(
        "cycles={} rentals={} trips={} lost={} reopened={}  rows written={}",
        stats.cycles,
        stats.rentals,
        stats.trips_completed,
        stats.lost,
        stats.reopened,
        observer.trips_seen(),
    );

    if let Some(e) = observer.take_error() {
        return Err(e).context("writing outputs");
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `-v`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
