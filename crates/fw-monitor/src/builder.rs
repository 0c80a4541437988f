//! Fluent builder for constructing a [`Monitor`].

use std::sync::Arc;
use std::time::Duration;

use fw_core::{Clock, SystemClock, TrackerConfig, ZoneLookup};
use fw_feed::SnapshotSource;
use fw_tracker::{ReservationTracker, Tracker, TrackerPolicy};
use parking_lot::Mutex;

use crate::{Monitor, MonitorResult};

/// Fluent builder for [`Monitor<S>`].
///
/// # Required inputs
///
/// - [`TrackerConfig`] — intervals, heuristic windows, concurrency bound
/// - `S: SnapshotSource` — the feed (e.g. [`fw_feed::HttpSnapshotSource`])
/// - `Arc<dyn ZoneLookup>` — the flex zones (e.g. `fw_geofence::SharedGeofences`)
///
/// # Optional inputs (have defaults)
///
/// | Method            | Default                                 |
/// |-------------------|-----------------------------------------|
/// | `.clock(c)`       | [`SystemClock`]                         |
/// | `.tracker(t)`     | `Tracker::new(TrackerPolicy::from(&config))` |
pub struct MonitorBuilder<S: SnapshotSource> {
    config:  TrackerConfig,
    source:  S,
    zones:   Arc<dyn ZoneLookup>,
    clock:   Option<Arc<dyn Clock>>,
    tracker: Option<Tracker>,
}

impl<S: SnapshotSource> MonitorBuilder<S> {
    pub fn new(config: &TrackerConfig, source: S, zones: Arc<dyn ZoneLookup>) -> Self {
        Self { config: config.clone(), source, zones, clock: None, tracker: None }
    }

    /// Clock used to time confirmations against `confirm_at`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Start from an existing tracker instead of an empty one.
    pub fn tracker(mut self, tracker: Tracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Validate the configuration and return a ready-to-run [`Monitor`].
    pub fn build(self) -> MonitorResult<Monitor<S>> {
        self.config.validate()?;

        let tracker = self
            .tracker
            .unwrap_or_else(|| Tracker::new(TrackerPolicy::from(&self.config)));
        let recheck_secs = i64::try_from(self.config.reservation_recheck_secs).unwrap_or(i64::MAX);
        let reservations = self
            .config
            .track_reservations
            .then(|| ReservationTracker::with_recheck_secs(recheck_secs));

        Ok(Monitor {
            source:           Arc::new(self.source),
            tracker:          Arc::new(Mutex::new(tracker)),
            zones:            self.zones,
            clock:            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            reservations,
            polling_interval: Duration::from_secs(self.config.polling_interval_secs),
            max_concurrent:   self.config.max_concurrent_confirmations,
            cycle:            0,
        })
    }
}
