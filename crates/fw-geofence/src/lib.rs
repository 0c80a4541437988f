//! `fw-geofence` — flex-zone polygons and point-in-zone lookup.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | [`index`]  | `GeofenceIndex` (polygons + R-tree of bounding boxes)        |
//! | [`loader`] | GeoJSON parsing, `GeofenceSource` (URL, file, inline)        |
//! | [`shared`] | `SharedGeofences`: swappable index with last-known-good reload |
//! | [`error`]  | `GeofenceError`, `GeofenceResult<T>`                         |
//!
//! Coordinates follow GeoJSON order: `x = lng`, `y = lat`.

pub mod error;
pub mod index;
pub mod loader;
pub mod shared;


pub use error::{GeofenceError, GeofenceResult};
pub use index::GeofenceIndex;
pub use loader::GeofenceSource;
pub use shared::SharedGeofences;
