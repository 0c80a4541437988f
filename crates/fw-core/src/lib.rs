//! `fw-core` — foundational types for the `fleetwatch` trip-inference engine.
//!
//! This crate is a dependency of every other `fw-*` crate.  It has no `fw-*`
//! dependencies and only a handful of external ones (`chrono`, `serde`,
//! `thiserror`, `parking_lot`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `VehicleNumber`, `PlaceUid`, `CityUid`                     |
//! | [`geo`]         | `GeoPoint`                                                 |
//! | [`time`]        | `Timestamp`, `Clock`, `SystemClock`, `ManualClock`         |
//! | [`config`]      | `TrackerConfig`, `TripLogBackend`                          |
//! | [`movement`]    | `RentalKind`, `ReturnKind`, `StationKind`, `Movement`      |
//! | [`zone`]        | `Zone`, `ZoneLookup`                                       |
//! | [`error`]       | `CoreError`, `CoreResult`                                  |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod movement;
pub mod time;
pub mod zone;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{TrackerConfig, TripLogBackend};
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{CityUid, PlaceUid, VehicleNumber};
pub use movement::{Movement, RentalKind, ReturnKind, StationKind};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use zone::{Zone, ZoneLookup};
