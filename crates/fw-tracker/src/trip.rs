//! Trip records: open, pending, and completed.

use fw_core::{
    GeoPoint, Movement, RentalKind, ReturnKind, StationKind, Timestamp, VehicleNumber, Zone,
    ZoneLookup,
};
use fw_feed::{FreeSlot, Station};
use serde::Serialize;

/// Location label used when a free-floating position has no coordinates.
pub const UNKNOWN_POSITION: &str = "Unknown position";

/// Location label of a trip closed by the lost-trip timeout.
pub const LOST_LOCATION: &str = "Unknown";

fn zone_of(position: Option<GeoPoint>, zones: &dyn ZoneLookup) -> Option<Zone> {
    position.map(|p| zones.zone_at(p))
}

fn zone_label(zone: Option<Zone>) -> String {
    zone.map_or(UNKNOWN_POSITION, Zone::label).to_owned()
}

// ── TripStart ─────────────────────────────────────────────────────────────────

/// The rental half of a trip.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TripStart {
    pub time:     Timestamp,
    pub kind:     RentalKind,
    /// Station name, or the zone label for free-floating rentals.
    pub location: String,
    pub position: Option<GeoPoint>,
    /// Only set for free-floating rentals with a known position.
    pub zone:     Option<Zone>,
}

impl TripStart {
    pub fn at_station(
        name:     impl Into<String>,
        kind:     StationKind,
        position: Option<GeoPoint>,
        time:     Timestamp,
    ) -> Self {
        Self { time, kind: RentalKind::Station(kind), location: name.into(), position, zone: None }
    }

    pub fn free_floating(slot: &FreeSlot, zones: &dyn ZoneLookup, time: Timestamp) -> Self {
        let zone = zone_of(slot.position, zones);
        Self {
            time,
            kind: RentalKind::FreeFloating,
            location: zone_label(zone),
            position: slot.position,
            zone,
        }
    }
}

// ── TripEnd ───────────────────────────────────────────────────────────────────

/// The return half of a trip, tentative until confirmed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TripEnd {
    pub time:     Timestamp,
    pub kind:     ReturnKind,
    pub location: String,
    pub position: Option<GeoPoint>,
    pub zone:     Option<Zone>,
}

impl TripEnd {
    pub fn at_station(station: &Station, time: Timestamp) -> Self {
        Self {
            time,
            kind: ReturnKind::Station(station.kind),
            location: station.name.clone(),
            position: station.position,
            zone: None,
        }
    }

    pub fn free_floating(slot: &FreeSlot, zones: &dyn ZoneLookup, time: Timestamp) -> Self {
        let zone = zone_of(slot.position, zones);
        Self {
            time,
            kind: ReturnKind::FreeFloating,
            location: zone_label(zone),
            position: slot.position,
            zone,
        }
    }

    /// Return of a trip given up by the lost-trip timeout.
    pub fn lost(time: Timestamp) -> Self {
        Self {
            time,
            kind: ReturnKind::Unknown,
            location: LOST_LOCATION.to_owned(),
            position: None,
            zone: None,
        }
    }
}

// ── PendingReturn ─────────────────────────────────────────────────────────────

/// Identifies one particular pending return of a vehicle.  A confirmation
/// result carrying an older ticket is stale.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A detected return waiting for its confirmation fetch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PendingReturn {
    pub vehicle:    VehicleNumber,
    pub start:      TripStart,
    pub end:        TripEnd,
    pub ticket:     Ticket,
    /// When the confirmation fetch is due.
    pub confirm_at: Timestamp,
}

impl PendingReturn {
    /// Close the trip with the tentative return as detected.
    pub fn finalize_tentative(self) -> CompletedTrip {
        CompletedTrip::new(self.vehicle, self.start, self.end)
    }
}

/// Outcome of a confirmation check.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The rental is still running: back to `InTransit`, no trip.
    Reopen,
    /// Close the trip with this return.
    Finalize(TripEnd),
}

// ── CompletedTrip ─────────────────────────────────────────────────────────────

/// An immutable, classified trip ready for the trip log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletedTrip {
    pub vehicle:       VehicleNumber,
    pub start:         TripStart,
    pub end:           TripEnd,
    pub duration_secs: i64,
    pub movement:      Movement,
}

impl CompletedTrip {
    /// Combine both halves.  A return earlier than the rental is clamped to
    /// the rental time, so `duration_secs` is never negative.
    pub fn new(vehicle: VehicleNumber, start: TripStart, mut end: TripEnd) -> Self {
        if end.time < start.time {
            end.time = start.time;
        }
        let duration_secs = end.time - start.time;
        let movement = Movement::classify(start.kind, end.kind, start.zone, end.zone);
        Self { vehicle, start, end, duration_secs, movement }
    }

    /// Duration in minutes, rounded to one decimal with ties away from zero.
    pub fn duration_minutes(&self) -> f64 {
        (self.duration_secs as f64 / 6.0).round() / 10.0
    }

    /// `Duration-Minutes` column text, e.g. `"12.5"`.
    pub fn duration_label(&self) -> String {
        format!("{:.1}", self.duration_minutes())
    }
}
