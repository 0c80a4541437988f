//! `fw-tracker` — trip inference from consecutive snapshots.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | [`trip`]        | `TripStart`, `TripEnd`, `PendingReturn`, `CompletedTrip`, `Resolution` |
//! | [`state`]       | `Tracked` (the per-vehicle state map value), `Removal`, `VehicleState` |
//! | [`tracker`]     | `Tracker` — snapshot diff, resolution, sweeps                 |
//! | [`report`]      | `CycleReport`, `CycleCounters`, `TrackerStats`                |
//! | [`dump`]        | `TrackerDump` — serializable picture of the whole state       |
//! | [`reservation`] | `ReservationTracker` — station booking-queue events           |
//!
//! # Vehicle lifecycle
//!
//! ```text
//!            departure                  slot booked = 1
//! AtStation ───────────▶ AmbiguousRemoval ──────────────▶ InTransit
//!                          │    │  slot booked = 0            │ │
//!                 redocked │    └──────────────┐              │ │ return seen
//!                          ▼                   ▼              │ ▼
//!                      AtStation          PendingReturn ◀─────┘
//!                                           │        │ still booked
//!                                  confirmed▼        └──────▶ InTransit
//!                                     CompletedTrip
//! ```
//!
//! `InTransit`, `PendingReturn` and `AmbiguousRemoval` are the three variants
//! of [`Tracked`]; a vehicle has at most one entry in the tracker's map, so it
//! can never be in two of these states at once.
//!
//! The `booked` counter is the only signal separating a rental from a staff
//! relocation when a vehicle leaves a station.  This is a heuristic of the
//! upstream feed, not a guaranteed semantic.

pub mod dump;
pub mod report;
pub mod reservation;
pub mod state;
pub mod tracker;
pub mod trip;


pub use dump::{
    FreeFloatingEntry, InTransitEntry, RemovalEntry, StationEntry, TrackerCounts, TrackerDump,
};
pub use report::{CycleCounters, CycleReport, TrackerStats};
pub use reservation::{ReservationEvent, ReservationKind, ReservationTracker};
pub use state::{Removal, Tracked, VehicleState};
pub use tracker::{Applied, Tracker, TrackerPolicy};
pub use trip::{CompletedTrip, PendingReturn, Resolution, Ticket, TripEnd, TripStart};
