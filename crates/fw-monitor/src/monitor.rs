//! The `Monitor` struct and its polling loop.

use std::sync::Arc;
use std::time::Duration;

use fw_confirm::{ConfirmationOutcome, ConfirmationScheduler};
use fw_core::{Clock, ZoneLookup};
use fw_feed::SnapshotSource;
use fw_tracker::{Applied, ReservationTracker, Tracker, TrackerStats};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::MonitorObserver;

/// Owns the tracker and drives it from the feed.
///
/// Create via [`MonitorBuilder`][crate::MonitorBuilder].
pub struct Monitor<S: SnapshotSource> {
    pub(crate) source:           Arc<S>,
    pub(crate) tracker:          Arc<Mutex<Tracker>>,
    pub(crate) zones:            Arc<dyn ZoneLookup>,
    pub(crate) clock:            Arc<dyn Clock>,
    pub(crate) reservations:     Option<ReservationTracker>,
    pub(crate) polling_interval: Duration,
    pub(crate) max_concurrent:   usize,
    /// Cycles started so far, including failed fetches.
    pub(crate) cycle:            u64,
}

impl<S: SnapshotSource> Monitor<S> {
    /// Shared handle to the tracker.  Lock it only briefly.
    pub fn tracker(&self) -> Arc<Mutex<Tracker>> {
        Arc::clone(&self.tracker)
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Poll until `shutdown` is cancelled, then drain.
    ///
    /// Returns the tracker's totals after the drain.
    pub async fn run<O: MonitorObserver>(
        &mut self,
        observer: &mut O,
        shutdown: CancellationToken,
    ) -> TrackerStats {
        let (mut scheduler, mut outcomes) = ConfirmationScheduler::new(
            Arc::clone(&self.source),
            Arc::clone(&self.tracker),
            Arc::clone(&self.zones),
            Arc::clone(&self.clock),
            self.max_concurrent,
            &shutdown,
        );

        tracing::info!(
            interval_secs = self.polling_interval.as_secs(),
            reservations = self.reservations.is_some(),
            "monitor started"
        );

        'polling: while !shutdown.is_cancelled() {
            self.cycle += 1;
            let cycle = self.cycle;
            observer.on_cycle_start(cycle);

            let fetched = tokio::select! {
                _ = shutdown.cancelled() => break 'polling,
                fetched = self.source.fetch() => fetched,
            };

            match fetched {
                Ok(snapshot) => {
                    let report = self.tracker.lock().apply_snapshot(&snapshot, self.zones.as_ref());

                    for trip in &report.completed {
                        observer.on_trip(trip);
                    }
                    for pending in &report.to_confirm {
                        scheduler.schedule(pending.clone());
                    }
                    if let Some(reservations) = self.reservations.as_mut() {
                        for event in reservations.observe(&snapshot) {
                            observer.on_reservation(&event);
                        }
                    }

                    let dump = self.tracker.lock().dump();
                    observer.on_state(&dump);
                    observer.on_cycle_end(cycle, &report);
                }
                Err(e) => {
                    tracing::warn!(cycle, error = %e, "feed fetch failed, keeping state");
                    observer.on_fetch_error(cycle, &e);
                }
            }
            scheduler.reap();

            let wait = tokio::time::sleep(self.polling_interval);
            tokio::pin!(wait);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break 'polling,
                    _ = &mut wait => break,
                    Some(outcome) = outcomes.recv() => forward(outcome, observer),
                }
            }
        }

        tracing::info!(in_flight = scheduler.in_flight(), "shutting down, draining pending returns");
        scheduler.shutdown().await;
        drain_outcomes(&mut outcomes, observer);

        let (drained, dump, stats) = {
            let mut tracker = self.tracker.lock();
            let drained = tracker.drain_pending();
            (drained, tracker.dump(), tracker.stats())
        };
        for trip in &drained {
            observer.on_trip(trip);
        }
        observer.on_state(&dump);
        observer.on_shutdown(&stats);

        tracing::info!(
            cycles = self.cycle,
            trips = stats.trips_completed,
            drained = drained.len(),
            "monitor stopped"
        );
        stats
    }
}

fn forward<O: MonitorObserver>(outcome: ConfirmationOutcome, observer: &mut O) {
    if let Applied::Completed(trip) = &outcome.applied {
        observer.on_trip(trip);
    }
}

/// Outcomes sent by tasks that finished between the last wait and shutdown.
fn drain_outcomes<O: MonitorObserver>(
    outcomes: &mut mpsc::UnboundedReceiver<ConfirmationOutcome>,
    observer: &mut O,
) {
    while let Ok(outcome) = outcomes.try_recv() {
        forward(outcome, observer);
    }
}
