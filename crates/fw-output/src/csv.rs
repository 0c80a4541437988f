//! CSV trip log backend.
//!
//! Appends to a single file, `nextbike_trips.csv` by default.  The header is
//! written exactly once: a new or empty file gets it on open, and an existing
//! file whose first line is not the header is repaired by rewriting it with
//! the header prepended.
//!
//! Each batch is encoded in memory first and reaches the file in a single
//! `write_all`, so a failed write leaves no half-buffered rows behind to be
//! repeated when the batch is offered again.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;

use crate::writer::TripSink;
use crate::{OutputError, OutputResult, TRIP_HEADER, TripRow};

pub const TRIP_LOG_FILE: &str = "nextbike_trips.csv";

/// Writes completed trips to an append-only CSV file.
pub struct CsvTripLog<F: Write = File> {
    path:     PathBuf,
    out:      F,
    finished: bool,
}

impl CsvTripLog<File> {
    /// Open (or create) `path`, making sure the header is in place.
    pub fn open(path: &Path) -> OutputResult<Self> {
        ensure_header(path, &TRIP_HEADER.join(","))?;
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self::from_writer(path, file))
    }
}

impl<F: Write> CsvTripLog<F> {
    /// Log into an already positioned writer; `path` is informational.
    pub fn from_writer(path: &Path, out: F) -> Self {
        Self { path: path.to_owned(), out, finished: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_ref(&self) -> &F {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut F {
        &mut self.out
    }
}

impl<F: Write> TripSink for CsvTripLog<F> {
    fn write_trips(&mut self, rows: &[TripRow]) -> OutputResult<()> {
        let bytes = encode_records(rows.iter().map(TripRow::fields))?;
        self.out.write_all(&bytes)?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.out.flush()?;
        Ok(())
    }
}

/// Encode `records` as header-less CSV lines.
pub(crate) fn encode_records<I, R>(records: I) -> OutputResult<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    writer.into_inner().map_err(|e| OutputError::from(e.into_error()))
}

/// Create `path` with `header`, or prepend `header` to an existing file that
/// lacks it.  The repair goes through a sibling temp file and a rename, so a
/// crash leaves either the old or the repaired file.
pub(crate) fn ensure_header(path: &Path, header: &str) -> OutputResult<()> {
    if !path.exists() {
        fs::write(path, format!("{header}\n"))?;
        return Ok(());
    }

    let first = {
        let mut line = String::new();
        BufReader::new(File::open(path)?).read_line(&mut line)?;
        line
    };
    if first.trim_end_matches(['\r', '\n']) == header {
        return Ok(());
    }

    let existing = fs::read(path)?;
    let tmp = tmp_path(path);
    {
        let mut out = File::create(&tmp)?;
        writeln!(out, "{header}")?;
        out.write_all(&existing)?;
        out.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    if !existing.is_empty() {
        tracing::warn!(path = %path.display(), "log had no header, repaired");
    }
    Ok(())
}

/// `<file>.tmp` next to `path`.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
