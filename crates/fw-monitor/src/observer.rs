//! Callbacks for everything the polling loop produces.

use fw_feed::FeedError;
use fw_tracker::{CompletedTrip, CycleReport, ReservationEvent, TrackerDump, TrackerStats};

/// Invoked by [`Monitor::run`][crate::Monitor::run] from the loop task only.
///
/// All methods default to no-ops.
///
/// # Example — trip counter
///
/// ```rust,ignore
/// struct Count(usize);
///
/// impl MonitorObserver for Count {
///     fn on_trip(&mut self, _trip: &CompletedTrip) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait MonitorObserver {
    /// Before the cycle's fetch.  `cycle` counts from 1.
    fn on_cycle_start(&mut self, _cycle: u64) {}

    /// The cycle's fetch failed; the tracker was left untouched.
    fn on_fetch_error(&mut self, _cycle: u64, _error: &FeedError) {}

    /// A trip is final: confirmed, superseded, lost, or drained at shutdown.
    fn on_trip(&mut self, _trip: &CompletedTrip) {}

    fn on_reservation(&mut self, _event: &ReservationEvent) {}

    /// The tracker state after a cycle, and once more at shutdown.
    fn on_state(&mut self, _dump: &TrackerDump) {}

    /// After a successful cycle.
    fn on_cycle_end(&mut self, _cycle: u64, _report: &CycleReport) {}

    /// Once, after the last trip has been handed over.
    fn on_shutdown(&mut self, _stats: &TrackerStats) {}
}

/// A [`MonitorObserver`] that does nothing.
pub struct NoopObserver;

impl MonitorObserver for NoopObserver {}
