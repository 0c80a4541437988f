//! Flat, stringly rows as they appear in the logs.

use fw_core::GeoPoint;
use fw_tracker::{CompletedTrip, ReservationEvent};

/// Column names of the trip log, in order.
pub const TRIP_HEADER: [&str; 13] = [
    "Vehicle-Number",
    "Rental-Time",
    "Rental-Type",
    "Rental-Location",
    "Rental-Lat",
    "Rental-Lng",
    "Return-Time",
    "Return-Type",
    "Return-Location",
    "Return-Lat",
    "Return-Lng",
    "Duration-Minutes",
    "Movement-Type",
];

/// Column names of the reservation log, in order.
pub const RESERVATION_HEADER: [&str; 14] = [
    "timestamp",
    "station_name",
    "station_kind",
    "event_type",
    "duration_seconds",
    "booked_bikes_entry",
    "booked_bikes_exit",
    "available_bikes_before",
    "available_bikes_after",
    "bikes_available_to_rent",
    "bike_racks",
    "free_racks",
    "special_racks",
    "vehicle_numbers",
];

/// One line of the trip log.  Absent coordinates are empty strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripRow {
    pub vehicle:          String,
    pub rental_time:      String,
    pub rental_type:      String,
    pub rental_location:  String,
    pub rental_lat:       String,
    pub rental_lng:       String,
    pub return_time:      String,
    pub return_type:      String,
    pub return_location:  String,
    pub return_lat:       String,
    pub return_lng:       String,
    pub duration_minutes: String,
    pub movement:         String,
}

fn coords(position: Option<GeoPoint>) -> (String, String) {
    match position {
        Some(p) => (p.lat.to_string(), p.lng.to_string()),
        None    => (String::new(), String::new()),
    }
}

impl TripRow {
    pub fn from_trip(trip: &CompletedTrip) -> Self {
        let (rental_lat, rental_lng) = coords(trip.start.position);
        let (return_lat, return_lng) = coords(trip.end.position);
        Self {
            vehicle:          trip.vehicle.to_string(),
            rental_time:      trip.start.time.to_string(),
            rental_type:      trip.start.kind.label().to_owned(),
            rental_location:  trip.start.location.clone(),
            rental_lat,
            rental_lng,
            return_time:      trip.end.time.to_string(),
            return_type:      trip.end.kind.label().to_owned(),
            return_location:  trip.end.location.clone(),
            return_lat,
            return_lng,
            duration_minutes: trip.duration_label(),
            movement:         trip.movement.label(),
        }
    }

    /// Fields in [`TRIP_HEADER`] order.
    pub fn fields(&self) -> [&str; 13] {
        [
            &self.vehicle,
            &self.rental_time,
            &self.rental_type,
            &self.rental_location,
            &self.rental_lat,
            &self.rental_lng,
            &self.return_time,
            &self.return_type,
            &self.return_location,
            &self.return_lat,
            &self.return_lng,
            &self.duration_minutes,
            &self.movement,
        ]
    }
}

/// Fields of one reservation event in [`RESERVATION_HEADER`] order.
/// Vehicle numbers are space separated.
pub fn reservation_fields(event: &ReservationEvent) -> [String; 14] {
    let vehicles: Vec<&str> = event.vehicles.iter().map(|v| v.as_str()).collect();
    [
        event.timestamp.to_string(),
        event.station.clone(),
        event.station_kind.as_str().to_owned(),
        event.kind.label().to_owned(),
        event.duration_secs.to_string(),
        event.booked_entry.to_string(),
        event.booked_exit.to_string(),
        event.bikes_before.to_string(),
        event.bikes_after.to_string(),
        event.available_to_rent.to_string(),
        event.bike_racks.to_string(),
        event.free_racks.to_string(),
        event.special_racks.to_string(),
        vehicles.join(" "),
    ]
}
