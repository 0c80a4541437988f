//! Unit tests for fw-confirm.

use std::sync::Arc;

use fw_core::{
    GeoPoint, ManualClock, Movement, PlaceUid, ReturnKind, StationKind, Timestamp, Zone,
    ZoneLookup,
};
use fw_feed::{FeedError, FreeSlot, Snapshot, Station, VehicleEntry};
use fw_tracker::{PendingReturn, Tracker};

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

fn slot(uid: u64, vehicle: &str, booked: u32, lng: f64) -> FreeSlot {
    FreeSlot::new(PlaceUid(uid), GeoPoint::new(52.5, lng), vehicle, booked)
}

/// A slot whose vehicle the feed flags as not active.
fn inactive_slot(uid: u64, vehicle: &str, booked: u32) -> FreeSlot {
    let mut s = slot(uid, vehicle, booked, IN_LNG);
    s.vehicles = vec![VehicleEntry { active: Some(false), ..VehicleEntry::new(vehicle) }];
    s
}

fn snap(secs: i64, stations: Vec<Station>, slots: Vec<FreeSlot>) -> Snapshot {
    Snapshot::new(at(secs), stations, slots)
}

/// Vehicle 7 rented in the flex zone at t=5 and seen back outside at t=600.
fn tracker_with_pending() -> (Tracker, PendingReturn) {
    let mut tracker = Tracker::default();
    tracker.apply_snapshot(&snap(0, vec![], vec![slot(9, "7", 0, IN_LNG)]), &WestIsFlex);
    tracker.apply_snapshot(&snap(5, vec![], vec![slot(9, "7", 1, IN_LNG)]), &WestIsFlex);
    let mut report =
        tracker.apply_snapshot(&snap(600, vec![], vec![slot(9, "7", 0, OUT_LNG)]), &WestIsFlex);
    let pending = report.to_confirm.pop().unwrap();
    (tracker, pending)
}

// ── Resolution policy ─────────────────────────────────────────────────────────

#[cfg(test)]
mod policy {
    use super::*;
    use crate::resolve;
    use fw_tracker::Resolution;

    #[test]
    fn failed_fetch_keeps_detected_return() {
        let (_, pending) = tracker_with_pending();
        let fetched = Err(FeedError::Status(503));
        assert_eq!(resolve(&pending, &fetched, &WestIsFlex), Resolution::Finalize(pending.end.clone()));
    }

    #[test]
    fn vehicle_not_found_keeps_detected_return() {
        let (_, pending) = tracker_with_pending();
        let fetched = Ok(snap(720, vec![], vec![slot(10, "8", 0, IN_LNG)]));
        assert_eq!(resolve(&pending, &fetched, &WestIsFlex), Resolution::Finalize(pending.end.clone()));
    }

    #[test]
    fn booked_and_inactive_reopens() {
        let (_, pending) = tracker_with_pending();
        let fetched = Ok(snap(720, vec![], vec![inactive_slot(9, "7", 1)]));
        assert_eq!(resolve(&pending, &fetched, &WestIsFlex), Resolution::Reopen);
    }

    #[test]
    fn booked_without_active_flag_is_returned() {
        let (_, pending) = tracker_with_pending();
        let fetched = Ok(snap(720, vec![], vec![slot(9, "7", 1, IN_LNG)]));
        let Resolution::Finalize(end) = resolve(&pending, &fetched, &WestIsFlex) else {
            panic!("expected finalize");
        };
        assert_eq!(end.zone, Some(Zone::Flexzone));
    }

    #[test]
    fn inactive_but_unbooked_is_returned() {
        let (_, pending) = tracker_with_pending();
        let fetched = Ok(snap(720, vec![], vec![inactive_slot(9, "7", 0)]));
        assert!(matches!(resolve(&pending, &fetched, &WestIsFlex), Resolution::Finalize(_)));
    }

    #[test]
    fn station_sighting_refreshes_place_not_time() {
        let (_, pending) = tracker_with_pending();
        let station =
            Station::new(PlaceUid(1), "Hauptbahnhof", StationKind::Virtual, GeoPoint::new(52.52, 13.36), &["7"]);
        let fetched = Ok(snap(720, vec![station], vec![]));
        let Resolution::Finalize(end) = resolve(&pending, &fetched, &WestIsFlex) else {
            panic!("expected finalize");
        };
        assert_eq!(end.kind, ReturnKind::Station(StationKind::Virtual));
        assert_eq!(end.location, "Hauptbahnhof");
        assert_eq!(end.position, Some(GeoPoint::new(52.52, 13.36)));
        assert_eq!(end.time, at(600), "return time stays the detection time");
    }

    #[test]
    fn slot_sighting_uses_current_zone() {
        let (_, pending) = tracker_with_pending();
        let fetched = Ok(snap(720, vec![], vec![slot(11, "7", 0, IN_LNG)]));
        let Resolution::Finalize(end) = resolve(&pending, &fetched, &WestIsFlex) else {
            panic!("expected finalize");
        };
        assert_eq!(end.kind, ReturnKind::FreeFloating);
        assert_eq!(end.location, "Flexzone");
        assert_eq!(end.time, at(600));
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use super::*;
    use crate::ConfirmationScheduler;
    use fw_feed::ScriptedSource;
    use fw_tracker::{Applied, Tracked};
    use parking_lot::Mutex;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        source:    Arc<ScriptedSource>,
        tracker:   Arc<Mutex<Tracker>>,
        scheduler: ConfirmationScheduler<ScriptedSource>,
        outcomes:  mpsc::UnboundedReceiver<crate::ConfirmationOutcome>,
        cancel:    CancellationToken,
        pending:   PendingReturn,
    }

    fn harness(max_concurrent: usize) -> Harness {
        let (tracker, pending) = tracker_with_pending();
        let tracker = Arc::new(Mutex::new(tracker));
        let source = Arc::new(ScriptedSource::new());
        let clock = Arc::new(ManualClock::new(at(600)));
        let cancel = CancellationToken::new();
        let (scheduler, outcomes) = ConfirmationScheduler::new(
            Arc::clone(&source),
            Arc::clone(&tracker),
            Arc::new(WestIsFlex),
            clock,
            max_concurrent,
            &cancel,
        );
        Harness { source, tracker, scheduler, outcomes, cancel, pending }
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_return_completes_trip() {
        let mut h = harness(4);
        h.source.push_snapshot(snap(720, vec![], vec![slot(9, "7", 0, OUT_LNG)]));
        h.scheduler.schedule(h.pending.clone());
        assert_eq!(h.source.fetch_count(), 0, "schedule returns before the fetch");

        let outcome = h.outcomes.recv().await.unwrap();
        assert_eq!(outcome.ticket, h.pending.ticket);
        let Applied::Completed(trip) = outcome.applied else { panic!("expected completion") };
        assert_eq!(trip.movement, Movement::ZoneToZone(Zone::Flexzone, Zone::OutsideFlexzone));
        assert_eq!(trip.movement.label(), "Flexzone:NoFlexzone");
        assert_eq!(h.source.fetch_count(), 1);
        assert!(h.tracker.lock().tracked(&h.pending.vehicle).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_confirmation_delay() {
        let mut h = harness(4);
        h.source.push_snapshot(snap(720, vec![], vec![slot(9, "7", 0, OUT_LNG)]));
        h.scheduler.schedule(h.pending.clone());

        tokio::time::sleep(std::time::Duration::from_secs(119)).await;
        assert_eq!(h.source.fetch_count(), 0);
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        h.outcomes.recv().await.unwrap();
        assert_eq!(h.source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn still_booked_reopens_trip() {
        let mut h = harness(4);
        h.source.push_snapshot(snap(720, vec![], vec![inactive_slot(9, "7", 1)]));
        h.scheduler.schedule(h.pending.clone());

        let outcome = h.outcomes.recv().await.unwrap();
        assert_eq!(outcome.applied, Applied::Reopened);
        match h.tracker.lock().tracked(&h.pending.vehicle) {
            Some(Tracked::InTransit(start)) => assert_eq!(start, &h.pending.start),
            other => panic!("expected in transit, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn booking_flicker_inside_window_reopens_trip() {
        let mut h = harness(4);
        h.scheduler.schedule(h.pending.clone());
        let report = h
            .tracker
            .lock()
            .apply_snapshot(&snap(605, vec![], vec![inactive_slot(9, "7", 1)]), &WestIsFlex);
        assert!(report.completed.is_empty());

        h.source.push_snapshot(snap(720, vec![], vec![inactive_slot(9, "7", 1)]));
        let outcome = h.outcomes.recv().await.unwrap();
        assert_eq!(outcome.applied, Applied::Reopened);
        match h.tracker.lock().tracked(&h.pending.vehicle) {
            Some(Tracked::InTransit(start)) => assert_eq!(start.time, at(5)),
            other => panic!("expected in transit, got {other:?}"),
        }
        assert_eq!(h.tracker.lock().stats().trips_completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_finalizes_as_detected() {
        let mut h = harness(4);
        h.source.push(Err(FeedError::Http("connection reset".into())));
        h.scheduler.schedule(h.pending.clone());

        let outcome = h.outcomes.recv().await.unwrap();
        let Applied::Completed(trip) = outcome.applied else { panic!("expected completion") };
        assert_eq!(trip.end, h.pending.end);
    }

    #[tokio::test(start_paused = true)]
    async fn drained_return_is_stale() {
        let mut h = harness(4);
        h.source.push_snapshot(snap(720, vec![], vec![slot(9, "7", 0, OUT_LNG)]));
        h.scheduler.schedule(h.pending.clone());
        assert_eq!(h.tracker.lock().drain_pending().len(), 1);

        let outcome = h.outcomes.recv().await.unwrap();
        assert_eq!(outcome.applied, Applied::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_sleeping_tasks() {
        let mut h = harness(4);
        h.scheduler.schedule(h.pending.clone());
        assert_eq!(h.scheduler.in_flight(), 1);

        h.scheduler.shutdown().await;
        assert_eq!(h.scheduler.in_flight(), 0);
        assert_eq!(h.source.fetch_count(), 0);
        assert_eq!(h.tracker.lock().pending_count(), 1, "left for drain_pending");
    }

    #[tokio::test(start_paused = true)]
    async fn parent_token_cancels_tasks() {
        let mut h = harness(4);
        h.scheduler.schedule(h.pending.clone());
        h.cancel.cancel();
        h.scheduler.shutdown().await;
        assert_eq!(h.source.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_permit_still_serves_every_task() {
        let mut h = harness(1);
        h.source.push_snapshot(snap(720, vec![], vec![slot(9, "7", 0, OUT_LNG)]));
        h.scheduler.schedule(h.pending.clone());
        // A duplicate with a stale ticket competes for the same permit.
        let mut duplicate = h.pending.clone();
        duplicate.ticket = fw_tracker::Ticket(h.pending.ticket.0 + 1);
        h.scheduler.schedule(duplicate);

        let mut applied = vec![
            h.outcomes.recv().await.unwrap().applied,
            h.outcomes.recv().await.unwrap().applied,
        ];
        applied.sort_by_key(|a| matches!(a, Applied::Stale));
        assert!(matches!(applied[0], Applied::Completed(_)));
        assert_eq!(applied[1], Applied::Stale);
        assert_eq!(h.source.fetch_count(), 2);

        h.scheduler.shutdown().await;
        assert_eq!(h.scheduler.in_flight(), 0);
    }
}
