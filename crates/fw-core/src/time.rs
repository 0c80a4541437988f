//! Wall-clock time model.
//!
//! # Design
//!
//! Every observation is stamped with a [`Timestamp`]: local wall-clock time
//! at one-second resolution, matching the `%Y-%m-%d %H:%M:%S` format of the
//! trip log.  All heuristic windows (removal grace, lost-trip timeout) are
//! measured as whole seconds between two timestamps.
//!
//! Time is read through the [`Clock`] trait so the tracker and the
//! confirmation tasks can be driven by a [`ManualClock`] in tests.

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Timelike};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CoreError, CoreResult};

/// Format used in logs, trip records, and the state dump.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// A local wall-clock instant truncated to whole seconds.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Wrap a `NaiveDateTime`, dropping sub-second precision.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Parse a `%Y-%m-%d %H:%M:%S` string.
    pub fn parse(s: &str) -> CoreResult<Self> {
        NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
            .map(Self::from_naive)
            .map_err(|e| CoreError::Parse(format!("invalid timestamp {s:?}: {e}")))
    }

    /// Whole seconds elapsed from `earlier` to `self` (negative if `earlier`
    /// is actually later).
    #[inline]
    pub fn secs_since(self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).num_seconds()
    }

    /// Return the timestamp `secs` seconds after `self`.
    #[inline]
    pub fn offset_secs(self, secs: i64) -> Timestamp {
        Timestamp(self.0 + chrono::Duration::seconds(secs))
    }
}

impl std::ops::Sub for Timestamp {
    type Output = i64;
    #[inline]
    fn sub(self, rhs: Timestamp) -> i64 {
        self.secs_since(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of "now" for the polling loop and the confirmation tasks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The real local clock.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_naive(Local::now().naive_local())
    }
}

/// A clock that only moves when told to.  Clones share the same instant.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock();
        *now = now.offset_secs(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
