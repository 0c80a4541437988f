//! Command-line flags and their overrides on top of the config file.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fw_core::{CityUid, TrackerConfig, TripLogBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Append-only CSV file
    Csv,
    /// SQLite database (needs the `sqlite` feature)
    Sqlite,
}

impl From<Backend> for TripLogBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Csv    => TripLogBackend::Csv,
            Backend::Sqlite => TripLogBackend::Sqlite,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "fleetwatch")]
#[command(about = "Infer rental trips from the nextbike live feed", long_about = None)]
pub struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// City uid to track (Berlin is 362)
    #[arg(long)]
    pub city: Option<u32>,

    /// Live feed endpoint
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Directory for trip log, state dump, and reservation log
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Seconds between polling cycles
    #[arg(long)]
    pub interval: Option<u64>,

    /// Seconds a detected return waits before it is confirmed
    #[arg(long)]
    pub confirmation_delay: Option<u64>,

    /// GeoJSON flex-zone URL
    #[arg(long, conflicts_with = "flexzone_path")]
    pub flexzone_url: Option<String>,

    /// Local GeoJSON flex-zone file
    #[arg(long)]
    pub flexzone_path: Option<PathBuf>,

    /// Trip log storage backend
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Do not track station reservations
    #[arg(long)]
    pub no_reservations: bool,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(long, short)]
    pub verbose: bool,
}

impl Args {
    /// Base configuration (file or defaults) with every given flag applied.
    pub fn apply(&self, mut config: TrackerConfig) -> TrackerConfig {
        if let Some(city) = self.city {
            config.city_uid = CityUid(city);
        }
        if let Some(url) = &self.feed_url {
            config.feed_url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(secs) = self.interval {
            config.polling_interval_secs = secs;
        }
        if let Some(secs) = self.confirmation_delay {
            config.confirmation_delay_secs = secs;
        }
        if let Some(url) = &self.flexzone_url {
            config.flexzone_url = Some(url.clone());
            config.flexzone_path = None;
        }
        if let Some(path) = &self.flexzone_path {
            config.flexzone_path = Some(path.clone());
        }
        if let Some(backend) = self.backend {
            config.trip_log_backend = backend.into();
        }
        if self.no_reservations {
            config.track_reservations = false;
        }
        config
    }
}
