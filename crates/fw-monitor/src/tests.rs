//! Integration tests for fw-monitor.

use std::sync::Arc;

use fw_core::{
    GeoPoint, ManualClock, PlaceUid, StationKind, Timestamp, TrackerConfig, Zone, ZoneLookup,
};
use fw_feed::{FeedError, FreeSlot, ScriptedSource, Snapshot, Station};
use fw_tracker::{CompletedTrip, CycleReport, ReservationEvent, ReservationKind, TrackerDump, TrackerStats};
use tokio_util::sync::CancellationToken;

use crate::{Monitor, MonitorBuilder, MonitorError, MonitorObserver};

// ── Helpers ───────────────────────────────────────────────────────────────────

struct WestIsFlex;

impl ZoneLookup for WestIsFlex {
    fn zone_at(&self, point: GeoPoint) -> Zone {
        Zone::from_inside(point.lng < 13.0)
    }
}

const IN_LNG: f64 = 12.9;
const OUT_LNG: f64 = 13.5;

fn at(secs: i64) -> Timestamp {
    Timestamp::parse("2025-06-01 08:00:00").unwrap().offset_secs(secs)
}

fn station(uid: u64, name: &str, vehicles: &[&str]) -> Station {
    Station::new(PlaceUid(uid), name, StationKind::Physical, GeoPoint::new(52.5, 13.4), vehicles)
}

fn slot(uid: u64, vehicle: &str, booked: u32, lng: f64) -> FreeSlot {
    FreeSlot::new(PlaceUid(uid), GeoPoint::new(52.5, lng), vehicle, booked)
}

fn snap(secs: i64, stations: Vec<Station>, slots: Vec<FreeSlot>) -> Snapshot {
    Snapshot::new(at(secs), stations, slots)
}

fn config() -> TrackerConfig {
    TrackerConfig { polling_interval_secs: 5, ..TrackerConfig::default() }
}

fn monitor(config: &TrackerConfig, source: &Arc<ScriptedSource>) -> Monitor<Arc<ScriptedSource>> {
    MonitorBuilder::new(config, Arc::clone(source), Arc::new(WestIsFlex))
        .clock(Arc::new(ManualClock::new(at(0))))
        .build()
        .unwrap()
}

/// Records every callback and cancels the run after `stop_after` cycles.
struct Recorder {
    stop_after:   u64,
    cancel:       CancellationToken,
    cycles:       u64,
    fetch_errors: usize,
    trips:        Vec<CompletedTrip>,
    reservations: Vec<ReservationEvent>,
    states:       Vec<TrackerDump>,
    rentals:      u32,
    shutdown:     Option<TrackerStats>,
}

impl Recorder {
    fn new(stop_after: u64) -> Self {
        Self {
            stop_after,
            cancel: CancellationToken::new(),
            cycles: 0,
            fetch_errors: 0,
            trips: Vec::new(),
            reservations: Vec::new(),
            states: Vec::new(),
            rentals: 0,
            shutdown: None,
        }
    }

    fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn maybe_stop(&self, cycle: u64) {
        if cycle >= self.stop_after {
            self.cancel.cancel();
        }
    }
}

impl MonitorObserver for Recorder {
    fn on_cycle_start(&mut self, cycle: u64) {
        self.cycles = cycle;
    }

    fn on_fetch_error(&mut self, cycle: u64, _error: &FeedError) {
        self.fetch_errors += 1;
        self.maybe_stop(cycle);
    }

    fn on_trip(&mut self, trip: &CompletedTrip) {
        self.trips.push(trip.clone());
    }

    fn on_reservation(&mut self, event: &ReservationEvent) {
        self.reservations.push(event.clone());
    }

    fn on_state(&mut self, dump: &TrackerDump) {
        self.states.push(dump.clone());
    }

    fn on_cycle_end(&mut self, cycle: u64, report: &CycleReport) {
        self.rentals += report.counters.rentals;
        self.maybe_stop(cycle);
    }

    fn on_shutdown(&mut self, stats: &TrackerStats) {
        self.shutdown = Some(*stats);
    }
}

/// Vehicle 7 rented from slot 9 in the flex zone and put down outside.
fn free_floating_trip(source: &ScriptedSource) {
    source.push_snapshot(snap(0, vec![], vec![slot(9, "7", 0, IN_LNG)]));
    source.push_snapshot(snap(5, vec![], vec![slot(9, "7", 1, IN_LNG)]));
    source.push_snapshot(snap(10, vec![], vec![slot(9, "7", 0, OUT_LNG)]));
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn zero_polling_interval_rejected() {
        let bad = TrackerConfig { polling_interval_secs: 0, ..TrackerConfig::default() };
        let result = MonitorBuilder::new(&bad, ScriptedSource::new(), Arc::new(WestIsFlex)).build();
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn reservations_follow_config() {
        let source = Arc::new(ScriptedSource::new());
        assert!(monitor(&config(), &source).reservations.is_some());
        let off = TrackerConfig { track_reservations: false, ..config() };
        assert!(monitor(&off, &source).reservations.is_none());
    }

    #[test]
    fn policy_comes_from_config() {
        let source = Arc::new(ScriptedSource::new());
        let custom = TrackerConfig { removal_grace_secs: 42, ..config() };
        let m = monitor(&custom, &source);
        assert_eq!(m.tracker().lock().policy().removal_grace_secs, 42);
    }
}

// ── Polling loop ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod polling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn relocation_confirmed_after_delay() {
        let source = Arc::new(ScriptedSource::new());
        source.push_snapshot(snap(0, vec![station(1, "A", &["1", "2"])], vec![]));
        source.push_snapshot(snap(5, vec![station(1, "A", &["2"])], vec![]));
        source.push_snapshot(snap(10, vec![station(1, "A", &["2"])], vec![slot(9, "1", 0, OUT_LNG)]));

        let mut m = monitor(&config(), &source);
        let mut rec = Recorder::new(40);
        let token = rec.token();
        let stats = m.run(&mut rec, token).await;

        assert_eq!(rec.trips.len(), 1);
        let trip = &rec.trips[0];
        assert_eq!(trip.movement.label(), "Station:NoFlexzone");
        assert_eq!(trip.start.location, "A");
        assert_eq!(trip.end.time, at(10));
        assert_eq!(stats.trips_completed, 1);
        assert_eq!(rec.shutdown, Some(stats));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_keep_polling() {
        let source = Arc::new(ScriptedSource::new());
        source.push(Err(FeedError::Status(502)));
        free_floating_trip(&source);

        let mut m = monitor(&config(), &source);
        let mut rec = Recorder::new(4);
        let token = rec.token();
        m.run(&mut rec, token).await;

        assert_eq!(rec.fetch_errors, 1);
        assert_eq!(rec.rentals, 1);
        assert_eq!(m.cycles(), 4);
        assert_eq!(rec.cycles, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_pending_returns() {
        let source = Arc::new(ScriptedSource::new());
        free_floating_trip(&source);

        let mut m = monitor(&config(), &source);
        let mut rec = Recorder::new(3);
        let token = rec.token();
        let stats = m.run(&mut rec, token).await;

        assert_eq!(source.fetch_count(), 3, "confirmation never fetched");
        assert_eq!(rec.trips.len(), 1);
        assert_eq!(rec.trips[0].end.zone, Some(Zone::OutsideFlexzone));
        assert_eq!(stats.trips_completed, 1);
        assert_eq!(m.tracker().lock().pending_count(), 0);

        // One dump per cycle plus the final one.
        assert_eq!(rec.states.len(), 4);
        assert!(rec.states.last().unwrap().pending_return.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lost_trip_emitted_without_confirmation() {
        let source = Arc::new(ScriptedSource::new());
        source.push_snapshot(snap(0, vec![], vec![slot(9, "7", 0, IN_LNG)]));
        source.push_snapshot(snap(5, vec![], vec![slot(9, "7", 1, IN_LNG)]));
        source.push_snapshot(snap(70, vec![], vec![slot(9, "7", 1, IN_LNG)]));

        let cfg = TrackerConfig { lost_trip_timeout_secs: 60, ..config() };
        let mut m = monitor(&cfg, &source);
        let mut rec = Recorder::new(3);
        let token = rec.token();
        m.run(&mut rec, token).await;

        assert_eq!(rec.trips.len(), 1);
        assert_eq!(rec.trips[0].end.location, "Unknown");
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reservation_events_forwarded() {
        let source = Arc::new(ScriptedSource::new());
        let booked = |secs: i64, n: u32| {
            let mut s = station(2, "B", &["4", "5"]);
            s.booked = n;
            snap(secs, vec![s], vec![])
        };
        source.push_snapshot(booked(0, 0));
        source.push_snapshot(booked(5, 1));
        source.push_snapshot(booked(10, 0));

        let mut m = monitor(&config(), &source);
        let mut rec = Recorder::new(3);
        let token = rec.token();
        m.run(&mut rec, token).await;

        assert_eq!(rec.reservations.len(), 1);
        assert_eq!(rec.reservations[0].kind, ReservationKind::BookedNotTaken);
        assert!(rec.trips.is_empty(), "no vehicle removal inferred");
    }

    #[tokio::test(start_paused = true)]
    async fn unbooked_removal_forwarded_after_recheck() {
        let source = Arc::new(ScriptedSource::new());
        source.push_snapshot(snap(0, vec![station(2, "B", &["4", "5"])], vec![]));
        source.push_snapshot(snap(5, vec![station(2, "B", &["5"])], vec![]));
        source.push_snapshot(snap(10, vec![station(2, "B", &["5"])], vec![]));
        source.push_snapshot(snap(20, vec![station(2, "B", &["5"])], vec![]));

        let cfg = TrackerConfig { reservation_recheck_secs: 15, ..config() };
        let mut m = monitor(&cfg, &source);
        let mut rec = Recorder::new(4);
        let token = rec.token();
        m.run(&mut rec, token).await;

        assert_eq!(rec.reservations.len(), 1);
        assert_eq!(rec.reservations[0].kind, ReservationKind::NotBookedTaken);
        assert_eq!(rec.reservations[0].timestamp, at(5));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_runs_no_cycle() {
        let source = Arc::new(ScriptedSource::new());
        let mut m = monitor(&config(), &source);
        let mut rec = Recorder::new(1);
        rec.cancel.cancel();
        let token = rec.token();
        let stats = m.run(&mut rec, token).await;

        assert_eq!(m.cycles(), 0);
        assert_eq!(source.fetch_count(), 0);
        assert_eq!(stats.cycles, 0);
        assert!(rec.shutdown.is_some());
    }
}
