//! Flex-zone classification of free-floating positions.

use serde::{Deserialize, Serialize};

use crate::GeoPoint;

/// Whether a free-floating position lies inside a flex zone.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Zone {
    Flexzone,
    OutsideFlexzone,
}

impl Zone {
    #[inline]
    pub fn from_inside(inside: bool) -> Self {
        if inside { Zone::Flexzone } else { Zone::OutsideFlexzone }
    }

    /// Location label written to the trip log for free-floating ends.
    pub fn label(self) -> &'static str {
        match self {
            Zone::Flexzone        => "Flexzone",
            Zone::OutsideFlexzone => "outside Flexzone",
        }
    }

    /// Token used inside movement classifications (`Flexzone:Station`, …).
    pub fn movement_token(self) -> &'static str {
        match self {
            Zone::Flexzone        => "Flexzone",
            Zone::OutsideFlexzone => "NoFlexzone",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only point-in-zone lookup.
///
/// Implemented by the geofence index; the tracker and the confirmation
/// scheduler only see this trait.
pub trait ZoneLookup: Send + Sync {
    fn zone_at(&self, point: GeoPoint) -> Zone;
}
