//! One task per detected return.
//!
//! # Task lifecycle
//!
//! ```text
//! schedule ─▶ sleep until confirm_at ─▶ permit ─▶ fetch ─▶ lock + apply ─▶ send outcome
//!                 │                       │         │
//!                 └──────── cancelled ────┴─────────┴──▶ exit, pending stays in tracker
//! ```
//!
//! Tasks never hold the tracker lock across an `.await`.  The semaphore
//! bounds only the fetches; sleeping tasks are cheap.  A task cancelled by
//! shutdown leaves its return pending so [`Tracker::drain_pending`] can close
//! it.

use std::sync::Arc;
use std::time::Duration;

use fw_core::{Clock, VehicleNumber, ZoneLookup};
use fw_feed::SnapshotSource;
use fw_tracker::{Applied, PendingReturn, Ticket, Tracker};
use parking_lot::Mutex;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::resolve;

/// What a finished confirmation task did.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfirmationOutcome {
    pub vehicle: VehicleNumber,
    pub ticket:  Ticket,
    pub applied: Applied,
}

pub struct ConfirmationScheduler<S: SnapshotSource> {
    source:   Arc<S>,
    tracker:  Arc<Mutex<Tracker>>,
    zones:    Arc<dyn ZoneLookup>,
    clock:    Arc<dyn Clock>,
    permits:  Arc<Semaphore>,
    cancel:   CancellationToken,
    tasks:    JoinSet<()>,
    outcomes: mpsc::UnboundedSender<ConfirmationOutcome>,
}

impl<S: SnapshotSource> ConfirmationScheduler<S> {
    /// Create a scheduler and the receiving end of its outcome channel.
    ///
    /// `cancel` is the process shutdown token; the scheduler works on a child
    /// of it so [`shutdown`](Self::shutdown) never cancels anything else.
    pub fn new(
        source:         Arc<S>,
        tracker:        Arc<Mutex<Tracker>>,
        zones:          Arc<dyn ZoneLookup>,
        clock:          Arc<dyn Clock>,
        max_concurrent: usize,
        cancel:         &CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<ConfirmationOutcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            source,
            tracker,
            zones,
            clock,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            cancel: cancel.child_token(),
            tasks: JoinSet::new(),
            outcomes,
        };
        (scheduler, rx)
    }

    /// Tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Start the delayed check for `pending` and return immediately.
    pub fn schedule(&mut self, pending: PendingReturn) {
        let wait = (pending.confirm_at - self.clock.now()).max(0);
        let wait = Duration::from_secs(wait.unsigned_abs());

        tracing::debug!(
            vehicle = %pending.vehicle,
            ticket = %pending.ticket,
            wait_secs = wait.as_secs(),
            "confirmation scheduled"
        );

        let source = Arc::clone(&self.source);
        let tracker = Arc::clone(&self.tracker);
        let zones = Arc::clone(&self.zones);
        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.clone();
        let outcomes = self.outcomes.clone();

        self.tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }

            let _permit = tokio::select! {
                _ = cancel.cancelled() => return,
                permit = permits.acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => return,
                },
            };

            let fetched = tokio::select! {
                _ = cancel.cancelled() => return,
                fetched = source.fetch() => fetched,
            };

            let resolution = resolve(&pending, &fetched, zones.as_ref());
            let applied = tracker.lock().apply_resolution(&pending.vehicle, pending.ticket, resolution);

            match &applied {
                Applied::Reopened => {}
                Applied::Completed(trip) => tracing::info!(
                    vehicle = %trip.vehicle,
                    movement = %trip.movement.label(),
                    minutes = %trip.duration_label(),
                    "trip confirmed"
                ),
                Applied::Stale => tracing::debug!(
                    vehicle = %pending.vehicle,
                    ticket = %pending.ticket,
                    "confirmation stale, ignored"
                ),
            }

            // The receiver is gone only during teardown.
            let _ = outcomes.send(ConfirmationOutcome {
                vehicle: pending.vehicle,
                ticket: pending.ticket,
                applied,
            });
        });
    }

    /// Collect finished tasks without waiting.
    pub fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "confirmation task failed");
            }
        }
    }

    /// Cancel every outstanding task and wait for all of them to exit.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        let mut stopped = 0usize;
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(()) => stopped += 1,
                Err(e) => tracing::error!(error = %e, "confirmation task failed"),
            }
        }
        tracing::debug!(tasks = stopped, "confirmation scheduler stopped");
    }
}
