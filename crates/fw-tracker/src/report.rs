//! What one cycle produced, and running totals.

use fw_core::{Timestamp, VehicleNumber};
use serde::Serialize;

use crate::{CompletedTrip, PendingReturn};

/// Per-cycle counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CycleCounters {
    pub departures: u32,
    pub rentals:    u32,
    pub returns:    u32,
    pub redocked:   u32,
    pub superseded: u32,
    /// In-transit vehicles that left a station; closed as returned there.
    pub closed_at_departure: u32,
    pub lost:       u32,
    pub dropped:    u32,
}

/// Result of [`Tracker::apply_snapshot`](crate::Tracker::apply_snapshot).
#[derive(Clone, Debug, Default)]
pub struct CycleReport {
    pub at:         Option<Timestamp>,
    /// The snapshot only established the baseline.
    pub baseline:   bool,
    /// Returns detected this cycle; each needs a confirmation check.
    pub to_confirm: Vec<PendingReturn>,
    /// Trips to write now without confirmation (lost, superseded, and closed
    /// at a departure).
    pub completed:  Vec<CompletedTrip>,
    /// Ambiguous removals given up after the grace window.
    pub dropped:    Vec<VehicleNumber>,
    pub counters:   CycleCounters,
}

impl CycleReport {
    pub fn new(at: Timestamp) -> Self {
        Self { at: Some(at), ..Self::default() }
    }

    pub fn is_quiet(&self) -> bool {
        self.to_confirm.is_empty() && self.completed.is_empty() && self.dropped.is_empty()
    }
}

/// Running totals since the tracker was created.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub cycles:          u64,
    pub rentals:         u64,
    pub returns:         u64,
    pub trips_completed: u64,
    pub reopened:        u64,
    pub superseded:      u64,
    pub closed_at_departure: u64,
    pub lost:            u64,
    pub dropped:         u64,
    pub redocked:        u64,
}
