//! Station booking queues.
//!
//! Runs beside the trip tracker on the same snapshots and turns changes of a
//! station's `booked` counter into reservation events:
//!
//! | event                   | when                                                     |
//! |-------------------------|----------------------------------------------------------|
//! | `booked:bike_taken`     | a booking ends, a vehicle present at its start is gone, and the vehicle count dropped |
//! | `booked:not_taken`      | a booking ends and every vehicle present at its start is still docked |
//! | `not_booked:bike_taken` | no booking open, a vehicle vanished, and the count dropped; still true at the recheck |
//!
//! Bookings end in FIFO order.  Stations are keyed by name; a station
//! reporting zero vehicles is skipped and its queue reset.
//!
//! A `not_booked:bike_taken` candidate is held for the recheck delay and
//! reported from the first snapshot at or after its due time, only if that
//! snapshot still lacks the vehicle at the station and still counts fewer
//! vehicles than before the removal.  A station and vehicle pair has at most
//! one candidate waiting.

use std::collections::VecDeque;

use fw_core::{StationKind, Timestamp, VehicleNumber};
use fw_feed::Snapshot;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ReservationKind {
    BookedTaken,
    BookedNotTaken,
    NotBookedTaken,
}

impl ReservationKind {
    pub fn label(self) -> &'static str {
        match self {
            ReservationKind::BookedTaken    => "booked:bike_taken",
            ReservationKind::BookedNotTaken => "booked:not_taken",
            ReservationKind::NotBookedTaken => "not_booked:bike_taken",
        }
    }
}

impl std::fmt::Display for ReservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the reservation log.  Rack counts are those of the snapshot
/// in which the event was detected.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReservationEvent {
    pub timestamp:         Timestamp,
    pub station:           String,
    pub station_kind:      StationKind,
    pub kind:              ReservationKind,
    pub duration_secs:     i64,
    pub booked_entry:      u32,
    pub booked_exit:       u32,
    pub bikes_before:      u32,
    pub bikes_after:       u32,
    pub available_to_rent: u32,
    pub bike_racks:        u32,
    pub free_racks:        u32,
    pub special_racks:     u32,
    /// Vehicles taken; empty for `booked:not_taken`.
    pub vehicles:          Vec<VehicleNumber>,
}

struct Booking {
    start:        Timestamp,
    vehicles:     FxHashSet<VehicleNumber>,
    booked_entry: u32,
}

#[derive(Default)]
struct StationQueue {
    booked:       u32,
    bikes:        u32,
    vehicles:     FxHashSet<VehicleNumber>,
    bookings:     VecDeque<Booking>,
    /// Vehicles already reported as `booked:bike_taken` since the queue last
    /// drained.
    booked_taken: FxHashSet<VehicleNumber>,
}

/// A vehicle that left without a booking, waiting for its recheck.
struct Candidate {
    due:          Timestamp,
    vehicle:      VehicleNumber,
    bikes_before: u32,
    event:        ReservationEvent,
}

pub const DEFAULT_RECHECK_SECS: i64 = 10;

/// Per-station booking queues keyed by station name.
pub struct ReservationTracker {
    stations:     FxHashMap<String, StationQueue>,
    candidates:   Vec<Candidate>,
    recheck_secs: i64,
}

impl Default for ReservationTracker {
    fn default() -> Self {
        Self::with_recheck_secs(DEFAULT_RECHECK_SECS)
    }
}

impl ReservationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recheck_secs(recheck_secs: i64) -> Self {
        Self { stations: FxHashMap::default(), candidates: Vec::new(), recheck_secs }
    }

    /// Bookings currently open at `station`.
    pub fn open_bookings(&self, station: &str) -> usize {
        self.stations.get(station).map_or(0, |q| q.bookings.len())
    }

    /// Unbooked removals waiting for their recheck.
    pub fn awaiting_recheck(&self) -> usize {
        self.candidates.len()
    }

    /// Feed one snapshot and collect the events it completes.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Vec<ReservationEvent> {
        let now = snapshot.taken_at;
        let mut events = Vec::new();

        for station in &snapshot.stations {
            let bikes = station.racks.bikes;
            if bikes == 0 {
                self.stations.remove(&station.name);
                continue;
            }

            let current: FxHashSet<VehicleNumber> = station.vehicle_numbers().cloned().collect();
            let queue = self.stations.entry(station.name.clone()).or_default();
            let booked = station.booked;
            let bikes_before = queue.bikes;

            let event = |kind:          ReservationKind,
                         duration_secs: i64,
                         booked_entry:  u32,
                         booked_exit:   u32,
                         vehicles:      Vec<VehicleNumber>| ReservationEvent {
                timestamp: now,
                station: station.name.clone(),
                station_kind: station.kind,
                kind,
                duration_secs,
                booked_entry,
                booked_exit,
                bikes_before,
                bikes_after: bikes,
                available_to_rent: station.racks.available_to_rent,
                bike_racks: station.racks.bike_racks,
                free_racks: station.racks.free_racks,
                special_racks: station.racks.special_racks,
                vehicles,
            };

            if booked > queue.booked {
                for _ in 0..booked - queue.booked {
                    queue.bookings.push_back(Booking {
                        start: now,
                        vehicles: current.clone(),
                        booked_entry: booked,
                    });
                }
            }

            if booked < queue.booked {
                for _ in 0..queue.booked - booked {
                    let Some(booking) = queue.bookings.pop_front() else { break };
                    let duration = now - booking.start;
                    let mut taken: Vec<VehicleNumber> =
                        booking.vehicles.difference(&current).cloned().collect();
                    taken.sort();

                    if taken.is_empty() {
                        events.push(event(
                            ReservationKind::BookedNotTaken,
                            duration,
                            booking.booked_entry,
                            booked,
                            Vec::new(),
                        ));
                    } else if bikes < bikes_before {
                        queue.booked_taken.extend(taken.iter().cloned());
                        events.push(event(
                            ReservationKind::BookedTaken,
                            duration,
                            booking.booked_entry,
                            booked,
                            taken,
                        ));
                    }
                }
            }

            if booked == 0 && queue.bookings.is_empty() {
                let mut gone: Vec<VehicleNumber> = queue
                    .vehicles
                    .difference(&current)
                    .filter(|v| !queue.booked_taken.contains(*v))
                    .cloned()
                    .collect();
                gone.sort();
                if bikes < bikes_before {
                    for vehicle in gone {
                        let waiting = self
                            .candidates
                            .iter()
                            .any(|c| c.vehicle == vehicle && c.event.station == station.name);
                        if waiting {
                            continue;
                        }
                        self.candidates.push(Candidate {
                            due: now.offset_secs(self.recheck_secs),
                            vehicle: vehicle.clone(),
                            bikes_before,
                            event: event(ReservationKind::NotBookedTaken, 0, 0, 0, vec![vehicle]),
                        });
                    }
                }
                queue.booked_taken.clear();
            }

            queue.booked = booked;
            queue.bikes = bikes;
            queue.vehicles = current;
        }

        self.recheck(snapshot, &mut events);

        for e in &events {
            tracing::debug!(
                station = %e.station,
                kind = %e.kind,
                duration_secs = e.duration_secs,
                "reservation event"
            );
        }
        events
    }

    /// Report every due candidate whose removal still holds in `snapshot`.
    fn recheck(&mut self, snapshot: &Snapshot, events: &mut Vec<ReservationEvent>) {
        let now = snapshot.taken_at;
        let (due, waiting): (Vec<Candidate>, Vec<Candidate>) =
            std::mem::take(&mut self.candidates).into_iter().partition(|c| c.due <= now);
        self.candidates = waiting;

        for candidate in due {
            let confirmed = snapshot
                .stations
                .iter()
                .find(|s| s.name == candidate.event.station)
                .is_some_and(|s| {
                    s.racks.bikes < candidate.bikes_before
                        && !s.vehicle_numbers().any(|v| v == &candidate.vehicle)
                });
            if confirmed {
                events.push(candidate.event);
            } else {
                tracing::debug!(
                    station = %candidate.event.station,
                    vehicle = %candidate.vehicle,
                    "unbooked removal not confirmed on recheck"
                );
            }
        }
    }
}
