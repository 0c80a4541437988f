//! Keeps rows a sink could not take and offers them again.

use std::collections::VecDeque;

use crate::writer::TripSink;
use crate::{OutputResult, TripRow};

/// Wraps a [`TripSink`] with an in-memory backlog.
///
/// Every write first queues its rows behind any earlier failures, then tries
/// to flush the whole backlog in order.  Rows leave the backlog only after
/// the inner sink accepted them, so a failing sink never loses a trip.
pub struct RetryingSink<W: TripSink> {
    inner:   W,
    backlog: VecDeque<TripRow>,
}

impl<W: TripSink> RetryingSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, backlog: VecDeque::new() }
    }

    /// Rows still waiting for a successful write.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Queue `rows` and try to write everything queued.
    pub fn write(&mut self, rows: impl IntoIterator<Item = TripRow>) -> OutputResult<()> {
        self.backlog.extend(rows);
        self.flush()
    }

    /// Try to write the backlog.
    pub fn flush(&mut self) -> OutputResult<()> {
        if self.backlog.is_empty() {
            return Ok(());
        }
        let pending = self.backlog.make_contiguous();
        match self.inner.write_trips(pending) {
            Ok(()) => {
                let written = self.backlog.len();
                self.backlog.clear();
                tracing::debug!(rows = written, "trip rows written");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    backlog = self.backlog.len(),
                    error = %e,
                    "trip log write failed, rows kept"
                );
                Err(e)
            }
        }
    }

    /// Flush the backlog one last time, then finish the inner sink.
    pub fn finish(&mut self) -> OutputResult<()> {
        let flushed = self.flush();
        self.inner.finish()?;
        flushed
    }
}
