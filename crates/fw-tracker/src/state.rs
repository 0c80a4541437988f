//! Per-vehicle tracking state.

use fw_core::{GeoPoint, PlaceUid, StationKind, Timestamp};
use serde::Serialize;

use crate::{PendingReturn, TripStart};

/// Provenance of a vehicle that left a station without explanation yet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Removal {
    pub station:  PlaceUid,
    pub name:     String,
    pub kind:     StationKind,
    pub position: Option<GeoPoint>,
    pub at:       Timestamp,
}

impl Removal {
    /// The rental half a resolved removal turns into.
    pub fn trip_start(&self) -> TripStart {
        TripStart::at_station(self.name.clone(), self.kind, self.position, self.at)
    }
}

/// Value of the tracker's `vehicle → Tracked` map.
///
/// A vehicle is in at most one of these states because it has at most one
/// entry in the map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Tracked {
    /// Believed rented; location unknown.
    InTransit(TripStart),
    /// Return detected, confirmation outstanding.
    PendingReturn(PendingReturn),
    /// Left a station; rental or relocation not yet known.
    AmbiguousRemoval(Removal),
}

impl Tracked {
    pub fn name(&self) -> &'static str {
        match self {
            Tracked::InTransit(_)        => "in_transit",
            Tracked::PendingReturn(_)    => "pending_return",
            Tracked::AmbiguousRemoval(_) => "ambiguous_removal",
        }
    }
}

/// Where the tracker currently believes a vehicle to be.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VehicleState {
    AtStation(PlaceUid),
    FreeFloating(PlaceUid),
    InTransit,
    PendingReturn,
    AmbiguousRemoval,
    /// Not seen in any snapshot so far, or forgotten.
    Unknown,
}
