//! Runtime configuration.
//!
//! All heuristic windows of the engine are policy, not protocol: they are
//! exposed here rather than hard-coded.  The configuration is usually read
//! from a JSON file by the binary and then overridden by CLI flags; every
//! field has a default so an empty `{}` file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CityUid, CoreError, CoreResult};

pub const DEFAULT_FEED_URL: &str = "https://api.nextbike.net/maps/nextbike-live.json";
pub const DEFAULT_FLEXZONE_URL: &str =
    "https://api.nextbike.net/reservation/geojson/flexzone_bn.json";

/// Trip log storage backend.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripLogBackend {
    #[default]
    Csv,
    Sqlite,
}

/// Top-level configuration of one tracking process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Live feed endpoint.  The `city` query parameter is appended from
    /// `city_uid` unless the URL already carries one.
    pub feed_url: String,

    /// The single city whose places are tracked.
    pub city_uid: CityUid,

    /// GeoJSON flex-zone source.  Ignored when `flexzone_path` is set.
    pub flexzone_url: Option<String>,

    /// Local GeoJSON flex-zone file.  Takes precedence over `flexzone_url`.
    pub flexzone_path: Option<PathBuf>,

    /// Directory receiving the trip log, state dump, and reservation log.
    pub output_dir: PathBuf,

    /// Seconds between polling cycles.  Default: 5.
    pub polling_interval_secs: u64,

    /// Seconds a detected return waits before its confirmation fetch.
    /// Default: 120.
    pub confirmation_delay_secs: u64,

    /// Seconds an ambiguous station removal may stay unresolved before it is
    /// dropped.  Default: 300.
    pub removal_grace_secs: u64,

    /// Seconds after which an open trip is closed as lost.  Default: 86 400.
    pub lost_trip_timeout_secs: u64,

    /// Upper bound on confirmation fetches in flight at once.  Default: 32.
    pub max_concurrent_confirmations: usize,

    /// HTTP timeout for feed and geofence requests.  Default: 10.
    pub http_timeout_secs: u64,

    pub trip_log_backend: TripLogBackend,

    /// Run the station reservation tracker alongside trip inference.
    pub track_reservations: bool,

    /// Seconds before a vehicle that vanished from a station without a
    /// booking is checked again and, if still gone, reported.  Default: 10.
    pub reservation_recheck_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            feed_url:                     DEFAULT_FEED_URL.to_owned(),
            city_uid:                     CityUid(362),
            flexzone_url:                 Some(DEFAULT_FLEXZONE_URL.to_owned()),
            flexzone_path:                None,
            output_dir:                   PathBuf::from("results_trips"),
            polling_interval_secs:        5,
            confirmation_delay_secs:      120,
            removal_grace_secs:           300,
            lost_trip_timeout_secs:       86_400,
            max_concurrent_confirmations: 32,
            http_timeout_secs:            10,
            trip_log_backend:             TripLogBackend::Csv,
            track_reservations:           true,
            reservation_recheck_secs:     10,
        }
    }
}

impl TrackerConfig {
    /// Read a JSON configuration file.  Missing fields take their defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: TrackerConfig = serde_json::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the polling loop cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.feed_url.trim().is_empty() {
            return Err(CoreError::Config("feed_url must not be empty".into()));
        }
        if self.polling_interval_secs == 0 {
            return Err(CoreError::Config("polling_interval_secs must be > 0".into()));
        }
        if self.max_concurrent_confirmations == 0 {
            return Err(CoreError::Config("max_concurrent_confirmations must be > 0".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(CoreError::Config("http_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Feed URL with the `city` query parameter applied.
    pub fn city_feed_url(&self) -> String {
        if self.feed_url.contains("city=") {
            self.feed_url.clone()
        } else if self.feed_url.contains('?') {
            format!("{}&city={}", self.feed_url, self.city_uid)
        } else {
            format!("{}?city={}", self.feed_url, self.city_uid)
        }
    }

    #[inline]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    #[inline]
    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_secs(self.confirmation_delay_secs)
    }

    #[inline]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
