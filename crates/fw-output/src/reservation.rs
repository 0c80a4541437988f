//! Station reservation event log.
//!
//! Events that fail to reach the file stay queued in memory and are written
//! ahead of the next event, or by [`ReservationLog::flush`] at shutdown.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fw_tracker::ReservationEvent;

use crate::csv::{encode_records, ensure_header};
use crate::row::{RESERVATION_HEADER, reservation_fields};
use crate::OutputResult;

pub const RESERVATION_LOG_FILE: &str = "station_reservations.csv";

/// Appends reservation events to a CSV file; header exactly once.
pub struct ReservationLog<F: Write = File> {
    out:     F,
    backlog: VecDeque<[String; 14]>,
}

impl ReservationLog<File> {
    pub fn open(path: &Path) -> OutputResult<Self> {
        ensure_header(path, &RESERVATION_HEADER.join(","))?;
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<F: Write> ReservationLog<F> {
    pub fn from_writer(out: F) -> Self {
        Self { out, backlog: VecDeque::new() }
    }

    pub fn get_ref(&self) -> &F {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut F {
        &mut self.out
    }

    /// Events still waiting for a successful write.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Queue `event` and try to write everything queued.
    pub fn write(&mut self, event: &ReservationEvent) -> OutputResult<()> {
        self.backlog.push_back(reservation_fields(event));
        self.flush()
    }

    /// Try to write the backlog in one piece.
    pub fn flush(&mut self) -> OutputResult<()> {
        if self.backlog.is_empty() {
            return Ok(());
        }
        let bytes = encode_records(self.backlog.iter())?;
        let written = self.out.write_all(&bytes).and_then(|()| self.out.flush());
        match written {
            Ok(()) => {
                self.backlog.clear();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    backlog = self.backlog.len(),
                    error = %e,
                    "reservation log write failed, events kept"
                );
                Err(e.into())
            }
        }
    }
}
