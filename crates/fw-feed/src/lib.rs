//! `fw-feed` — the live inventory feed and its normalized snapshots.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`raw`]      | Lenient serde model of the feed JSON                            |
//! | [`snapshot`] | `Snapshot`, `Station`, `FreeSlot`, `Sighting` — one city, one instant |
//! | [`source`]   | `SnapshotSource` trait, `HttpSnapshotSource`, `ScriptedSource`  |
//! | [`error`]    | `FeedError`, `FeedResult<T>`                                    |
//!
//! # Leniency
//!
//! The feed is third-party and occasionally sloppy.  Missing or mistyped
//! fields decode to "absent" or zero instead of failing the fetch; only a
//! payload that is not JSON at all is a [`FeedError::Parse`].

pub mod error;
pub mod raw;
pub mod snapshot;
pub mod source;


pub use error::{FeedError, FeedResult};
pub use snapshot::{FleetTotals, FreeSlot, RackCounts, Sighting, Snapshot, Station, VehicleEntry, Whereabouts};
pub use source::{HttpSnapshotSource, ScriptedSource, SnapshotSource};
