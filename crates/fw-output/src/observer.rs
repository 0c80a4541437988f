//! `OutputObserver` — bridges `MonitorObserver` to the writers.

use std::fs;
use std::path::Path;

use fw_core::{TrackerConfig, TripLogBackend};
use fw_monitor::MonitorObserver;
use fw_tracker::{CompletedTrip, ReservationEvent, TrackerDump, TrackerStats};

use crate::csv::TRIP_LOG_FILE;
use crate::reservation::RESERVATION_LOG_FILE;
use crate::state::STATE_FILE;
use crate::writer::TripSink;
use crate::{
    CsvTripLog, JsonStateStore, OutputError, OutputResult, ReservationLog, RetryingSink, TripRow,
};

/// A [`MonitorObserver`] that writes trips to a [`TripSink`], the tracker
/// dump to a [`JsonStateStore`], and reservation events to a
/// [`ReservationLog`].
///
/// Errors are logged and the first one is stored because observer methods
/// have no return value; check [`take_error`][Self::take_error] after the
/// run.  Trip rows that fail to write stay queued and are retried with the
/// next trip and at shutdown.
pub struct OutputObserver<W: TripSink> {
    trips:         RetryingSink<W>,
    state:         Option<JsonStateStore>,
    reservations:  Option<ReservationLog>,
    trips_seen:    u64,
    last_error:    Option<OutputError>,
}

impl<W: TripSink> OutputObserver<W> {
    pub fn new(trips: W) -> Self {
        Self {
            trips:        RetryingSink::new(trips),
            state:        None,
            reservations: None,
            trips_seen:   0,
            last_error:   None,
        }
    }

    pub fn with_state(mut self, state: JsonStateStore) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_reservations(mut self, log: ReservationLog) -> Self {
        self.reservations = Some(log);
        self
    }

    /// Take the stored write error (if any).
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Trips handed to this observer, written or still queued.
    pub fn trips_seen(&self) -> u64 {
        self.trips_seen
    }

    pub fn backlog_len(&self) -> usize {
        self.trips.backlog_len()
    }

    fn store_err(&mut self, what: &'static str, result: OutputResult<()>) {
        if let Err(e) = result {
            tracing::warn!(output = what, error = %e, "output write failed");
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl OutputObserver<Box<dyn TripSink + Send>> {
    /// Create `config.output_dir` and open every output it asks for.
    pub fn from_config(config: &TrackerConfig) -> OutputResult<Self> {
        let dir = config.output_dir.as_path();
        fs::create_dir_all(dir)?;

        let mut observer = Self::new(open_trip_sink(config.trip_log_backend, dir)?)
            .with_state(JsonStateStore::new(&dir.join(STATE_FILE)));
        if config.track_reservations {
            let log = ReservationLog::open(&dir.join(RESERVATION_LOG_FILE))?;
            observer = observer.with_reservations(log);
        }
        Ok(observer)
    }
}

/// Open the trip log backend selected by `backend` inside `dir`.
pub fn open_trip_sink(backend: TripLogBackend, dir: &Path) -> OutputResult<Box<dyn TripSink + Send>> {
    match backend {
        TripLogBackend::Csv => Ok(Box::new(CsvTripLog::open(&dir.join(TRIP_LOG_FILE))?)),
        #[cfg(feature = "sqlite")]
        TripLogBackend::Sqlite => {
            let path = dir.join(crate::sqlite::TRIP_DB_FILE);
            Ok(Box::new(crate::SqliteTripLog::open(&path)?))
        }
        #[cfg(not(feature = "sqlite"))]
        TripLogBackend::Sqlite => Err(OutputError::Backend(
            "sqlite (rebuild with the `sqlite` feature)".into(),
        )),
    }
}

impl<W: TripSink> MonitorObserver for OutputObserver<W> {
    fn on_trip(&mut self, trip: &CompletedTrip) {
        self.trips_seen += 1;
        tracing::info!(
            vehicle = %trip.vehicle,
            rented = %trip.start.time,
            returned = %trip.end.time,
            movement = %trip.movement.label(),
            minutes = %trip.duration_label(),
            "trip completed"
        );
        let result = self.trips.write([TripRow::from_trip(trip)]);
        self.store_err("trip log", result);
    }

    fn on_reservation(&mut self, event: &ReservationEvent) {
        if let Some(log) = self.reservations.as_mut() {
            let result = log.write(event);
            self.store_err("reservation log", result);
        }
    }

    fn on_state(&mut self, dump: &TrackerDump) {
        if let Some(store) = &self.state {
            let result = store.write(dump);
            self.store_err("state dump", result);
        }
    }

    fn on_shutdown(&mut self, stats: &TrackerStats) {
        let result = self.trips.finish();
        self.store_err("trip log", result);
        if let Some(log) = self.reservations.as_mut() {
            let result = log.flush();
            self.store_err("reservation log", result);
        }
        tracing::info!(
            trips = self.trips_seen,
            unwritten = self.trips.backlog_len(),
            rentals = stats.rentals,
            lost = stats.lost,
            "outputs closed"
        );
    }
}
