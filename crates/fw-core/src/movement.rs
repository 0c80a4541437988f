//! Rental/return kinds and the movement-classification taxonomy.
//!
//! The classification of a completed trip is a pure function of four inputs:
//! rental kind, return kind, rental zone, and return zone.  Station kinds
//! (physical vs. virtual terminal) are carried for the log but do not affect
//! the classification.
//!
//! | rental        | return        | rental zone | return zone | movement               |
//! |---------------|---------------|-------------|-------------|------------------------|
//! | Station       | Station       | –           | –           | `Station:Station`      |
//! | Station       | Free-floating | –           | in / out    | `Station:(No)Flexzone` |
//! | Free-floating | Station       | in / out    | –           | `(No)Flexzone:Station` |
//! | Free-floating | Free-floating | in / out    | in / out    | 4 combinations         |
//! | anything else |               |             |             | `Unknown`              |

use serde::{Deserialize, Serialize};

use crate::Zone;

// ── StationKind ───────────────────────────────────────────────────────────────

/// Physical dock vs. virtual (painted/geofenced) terminal.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum StationKind {
    #[default]
    Physical,
    Virtual,
}

impl StationKind {
    /// The feed marks virtual terminals with `terminal_type == "free"`.
    pub fn from_terminal_type(terminal_type: &str) -> Self {
        if terminal_type == "free" { StationKind::Virtual } else { StationKind::Physical }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StationKind::Physical => "physical",
            StationKind::Virtual  => "virtual",
        }
    }
}

// ── RentalKind / ReturnKind ───────────────────────────────────────────────────

/// Where a trip started.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RentalKind {
    Station(StationKind),
    FreeFloating,
}

impl RentalKind {
    /// Label written to the `Rental-Type` column.
    pub fn label(self) -> &'static str {
        match self {
            RentalKind::Station(StationKind::Physical) => "Station (physical)",
            RentalKind::Station(StationKind::Virtual)  => "Station (virtual)",
            RentalKind::FreeFloating                   => "Free-floating",
        }
    }
}

impl std::fmt::Display for RentalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a trip ended.  `Unknown` marks trips closed by the lost-trip timeout.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ReturnKind {
    Station(StationKind),
    FreeFloating,
    Unknown,
}

impl ReturnKind {
    /// Label written to the `Return-Type` column.
    pub fn label(self) -> &'static str {
        match self {
            ReturnKind::Station(StationKind::Physical) => "Station (physical)",
            ReturnKind::Station(StationKind::Virtual)  => "Station (virtual)",
            ReturnKind::FreeFloating                   => "Free-floating",
            ReturnKind::Unknown                        => "Unknown (lost)",
        }
    }
}

impl std::fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Movement ──────────────────────────────────────────────────────────────────

/// Movement classification of a completed trip.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Movement {
    StationToStation,
    StationToZone(Zone),
    ZoneToStation(Zone),
    ZoneToZone(Zone, Zone),
    Unknown,
}

impl Movement {
    /// Classify a trip.  Total over all inputs; a free-floating end without a
    /// zone, or an `Unknown` return, classifies as [`Movement::Unknown`].
    pub fn classify(
        rental:      RentalKind,
        ret:         ReturnKind,
        rental_zone: Option<Zone>,
        return_zone: Option<Zone>,
    ) -> Movement {
        match (rental, ret) {
            (RentalKind::Station(_), ReturnKind::Station(_)) => Movement::StationToStation,
            (RentalKind::Station(_), ReturnKind::FreeFloating) => match return_zone {
                Some(z) => Movement::StationToZone(z),
                None    => Movement::Unknown,
            },
            (RentalKind::FreeFloating, ReturnKind::Station(_)) => match rental_zone {
                Some(z) => Movement::ZoneToStation(z),
                None    => Movement::Unknown,
            },
            (RentalKind::FreeFloating, ReturnKind::FreeFloating) => match (rental_zone, return_zone) {
                (Some(from), Some(to)) => Movement::ZoneToZone(from, to),
                _                      => Movement::Unknown,
            },
            (_, ReturnKind::Unknown) => Movement::Unknown,
        }
    }

    /// Label written to the `Movement-Type` column, e.g. `Station:NoFlexzone`.
    pub fn label(self) -> String {
        match self {
            Movement::StationToStation   => "Station:Station".to_owned(),
            Movement::StationToZone(z)   => format!("Station:{}", z.movement_token()),
            Movement::ZoneToStation(z)   => format!("{}:Station", z.movement_token()),
            Movement::ZoneToZone(a, b)   => format!("{}:{}", a.movement_token(), b.movement_token()),
            Movement::Unknown            => "Unknown".to_owned(),
        }
    }
}

impl std::fmt::Display for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
