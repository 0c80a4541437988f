//! SQLite trip log backend (feature `sqlite`).
//!
//! One `trips` table in `nextbike_trips.db`, columns named after the CSV
//! header.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::TripSink;
use crate::{OutputResult, TripRow};

pub const TRIP_DB_FILE: &str = "nextbike_trips.db";

/// Writes completed trips to an SQLite database.
pub struct SqliteTripLog {
    conn:     Connection,
    finished: bool,
}

impl SqliteTripLog {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path) -> OutputResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS trips (
                 id               INTEGER PRIMARY KEY AUTOINCREMENT,
                 vehicle_number   TEXT NOT NULL,
                 rental_time      TEXT NOT NULL,
                 rental_type      TEXT NOT NULL,
                 rental_location  TEXT NOT NULL,
                 rental_lat       REAL,
                 rental_lng       REAL,
                 return_time      TEXT NOT NULL,
                 return_type      TEXT NOT NULL,
                 return_location  TEXT NOT NULL,
                 return_lat       REAL,
                 return_lng       REAL,
                 duration_minutes REAL NOT NULL,
                 movement_type    TEXT NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

/// Empty coordinate text is stored as NULL.
fn real(text: &str) -> Option<f64> {
    text.parse().ok()
}

impl TripSink for SqliteTripLog {
    fn write_trips(&mut self, rows: &[TripRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO trips \
                 (vehicle_number, rental_time, rental_type, rental_location, rental_lat, rental_lng, \
                  return_time, return_type, return_location, return_lat, return_lng, \
                  duration_minutes, movement_type) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.vehicle,
                    row.rental_time,
                    row.rental_type,
                    row.rental_location,
                    real(&row.rental_lat),
                    real(&row.rental_lng),
                    row.return_time,
                    row.return_type,
                    row.return_location,
                    real(&row.return_lat),
                    real(&row.return_lng),
                    real(&row.duration_minutes).unwrap_or(0.0),
                    row.movement,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
