//! Serializable picture of the tracker, written after every cycle.
//!
//! Every list is sorted (stations by uid, everything else by vehicle number) so
//! consecutive dumps of an unchanged state are byte-identical.

use fw_core::{GeoPoint, PlaceUid, StationKind, Timestamp, VehicleNumber};
use fw_feed::FleetTotals;
use serde::Serialize;

use crate::{PendingReturn, Removal, Tracked, Tracker, TrackerStats, TripStart};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationEntry {
    pub uid:       PlaceUid,
    pub name:      String,
    pub kind:      StationKind,
    pub position:  Option<GeoPoint>,
    pub vehicles:  Vec<VehicleNumber>,
    pub last_seen: Timestamp,
}

/// A free-floating vehicle and the slot it was last seen on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FreeFloatingEntry {
    pub vehicle:   VehicleNumber,
    pub slot:      PlaceUid,
    pub booked:    u32,
    pub position:  Option<GeoPoint>,
    pub last_seen: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InTransitEntry {
    pub vehicle: VehicleNumber,
    #[serde(flatten)]
    pub start:   TripStart,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RemovalEntry {
    pub vehicle: VehicleNumber,
    #[serde(flatten)]
    pub removal: Removal,
}

/// Sizes of the lists in a [`TrackerDump`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackerCounts {
    pub stations:          usize,
    /// Vehicles docked across all stations.
    pub docked:            usize,
    pub free_floating:     usize,
    pub in_transit:        usize,
    pub pending_return:    usize,
    pub ambiguous_removal: usize,
}

/// Everything the tracker knows at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackerDump {
    pub timestamp:         Option<Timestamp>,
    pub stations:          Vec<StationEntry>,
    pub free_floating:     Vec<FreeFloatingEntry>,
    pub in_transit:        Vec<InTransitEntry>,
    pub pending_return:    Vec<PendingReturn>,
    pub ambiguous_removal: Vec<RemovalEntry>,
    pub counts:            TrackerCounts,
    /// Fleet totals from the latest snapshot.
    pub totals:            FleetTotals,
    pub stats:             TrackerStats,
}

impl Tracker {
    pub fn dump(&self) -> TrackerDump {
        let mut stations: Vec<StationEntry> = self
            .stations
            .iter()
            .map(|(uid, memo)| {
                let mut vehicles: Vec<VehicleNumber> = memo.vehicles.iter().cloned().collect();
                vehicles.sort();
                StationEntry {
                    uid: *uid,
                    name: memo.name.clone(),
                    kind: memo.kind,
                    position: memo.position,
                    vehicles,
                    last_seen: memo.last_seen,
                }
            })
            .collect();
        stations.sort_by_key(|s| s.uid);

        let mut free_floating: Vec<FreeFloatingEntry> = self
            .slots
            .iter()
            .map(|(uid, memo)| FreeFloatingEntry {
                vehicle: memo.occupant.clone(),
                slot: *uid,
                booked: memo.booked,
                position: memo.position,
                last_seen: memo.last_seen,
            })
            .collect();
        free_floating.sort_by(|a, b| a.vehicle.cmp(&b.vehicle).then(a.slot.cmp(&b.slot)));

        let mut tracked: Vec<(&VehicleNumber, &Tracked)> = self.tracked.iter().collect();
        tracked.sort_by(|a, b| a.0.cmp(b.0));

        let mut in_transit = Vec::new();
        let mut pending_return = Vec::new();
        let mut ambiguous_removal = Vec::new();
        for (vehicle, state) in tracked {
            match state {
                Tracked::InTransit(start) => in_transit.push(InTransitEntry {
                    vehicle: vehicle.clone(),
                    start: start.clone(),
                }),
                Tracked::PendingReturn(pending) => pending_return.push(pending.clone()),
                Tracked::AmbiguousRemoval(removal) => ambiguous_removal.push(RemovalEntry {
                    vehicle: vehicle.clone(),
                    removal: removal.clone(),
                }),
            }
        }

        let counts = TrackerCounts {
            stations:          stations.len(),
            docked:            stations.iter().map(|s| s.vehicles.len()).sum(),
            free_floating:     free_floating.len(),
            in_transit:        in_transit.len(),
            pending_return:    pending_return.len(),
            ambiguous_removal: ambiguous_removal.len(),
        };

        TrackerDump {
            timestamp: self.last_snapshot,
            stations,
            free_floating,
            in_transit,
            pending_return,
            ambiguous_removal,
            counts,
            totals: self.totals,
            stats: self.stats,
        }
    }
}
