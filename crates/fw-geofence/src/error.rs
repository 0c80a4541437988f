//! Geofence error type.

use thiserror::Error;

/// Errors produced while loading a geofence set.
#[derive(Debug, Error)]
pub enum GeofenceError {
    #[error("geofence fetch failed: {0}")]
    Fetch(String),

    #[error("invalid GeoJSON: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GeofenceResult<T> = Result<T, GeofenceError>;
