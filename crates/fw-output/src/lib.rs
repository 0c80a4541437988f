//! `fw-output` — trip log, state dump, and reservation log.
//!
//! | Feature   | Trip log backend | File created in `output_dir`  |
//! |-----------|------------------|-------------------------------|
//! | *(none)*  | CSV              | `nextbike_trips.csv`          |
//! | `sqlite`  | SQLite           | `nextbike_trips.db`           |
//!
//! Every run also keeps `vehicle_states.json` (overwritten each cycle) and,
//! with reservation tracking on, `station_reservations.csv`.
//!
//! All outputs are driven by [`OutputObserver`], which implements
//! `fw_monitor::MonitorObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut obs = OutputObserver::from_config(&config)?;
//! monitor.run(&mut obs, shutdown).await;
//! if let Some(e) = obs.take_error() { tracing::warn!("output error: {e}"); }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod reservation;
pub mod retry;
pub mod row;
pub mod state;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use crate::csv::CsvTripLog;
pub use error::{OutputError, OutputResult};
pub use observer::{OutputObserver, open_trip_sink};
pub use reservation::ReservationLog;
pub use retry::RetryingSink;
pub use row::{RESERVATION_HEADER, TRIP_HEADER, TripRow};
pub use state::JsonStateStore;
pub use writer::TripSink;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTripLog;
