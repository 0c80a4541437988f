//! The `TripSink` trait implemented by all trip log backends.

use crate::{OutputResult, TripRow};

/// Append-only destination for completed trips.
///
/// A failed `write_trips` must leave previously written rows intact; the
/// caller keeps the failed rows and retries them (see
/// [`RetryingSink`][crate::RetryingSink]).
pub trait TripSink {
    /// Append `rows` in order.
    fn write_trips(&mut self, rows: &[TripRow]) -> OutputResult<()>;

    /// Flush and release underlying handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}

impl<T: TripSink + ?Sized> TripSink for Box<T> {
    fn write_trips(&mut self, rows: &[TripRow]) -> OutputResult<()> {
        (**self).write_trips(rows)
    }

    fn finish(&mut self) -> OutputResult<()> {
        (**self).finish()
    }
}
