//! Where snapshots come from.
//!
//! The [`SnapshotSource`] trait is the only thing the polling loop and the
//! confirmation tasks know about the feed.  [`HttpSnapshotSource`] fetches the
//! live JSON; [`ScriptedSource`] replays a fixed sequence for tests and dry
//! runs.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fw_core::{CityUid, Clock, TrackerConfig};
use parking_lot::Mutex;

use crate::{FeedError, FeedResult, Snapshot};

/// Produces one fresh snapshot per call.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = FeedResult<Snapshot>> + Send;
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

/// Fetches the live feed over HTTP with a reusable `reqwest::Client`.
///
/// The snapshot is stamped with the injected clock when the body has been
/// received, not when the request was sent.
pub struct HttpSnapshotSource {
    http:  reqwest::Client,
    url:   String,
    city:  CityUid,
    clock: Arc<dyn Clock>,
}

impl HttpSnapshotSource {
    pub fn new(
        url:     impl Into<String>,
        city:    CityUid,
        timeout: Duration,
        clock:   Arc<dyn Clock>,
    ) -> FeedResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Http(e.to_string()))?;
        Ok(Self { http, url: url.into(), city, clock })
    }

    pub fn from_config(config: &TrackerConfig, clock: Arc<dyn Clock>) -> FeedResult<Self> {
        Self::new(config.city_feed_url(), config.city_uid, config.http_timeout(), clock)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> FeedResult<Snapshot> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;

        let snapshot = Snapshot::parse_json(&bytes, self.city, self.clock.now())?;

        tracing::debug!(
            city = %self.city,
            stations = snapshot.stations.len(),
            slots = snapshot.slots.len(),
            vehicles = snapshot.vehicle_count(),
            "feed fetched"
        );
        Ok(snapshot)
    }
}

// ── Scripted ──────────────────────────────────────────────────────────────────

/// Replays queued results in order.
///
/// Once the queue is empty the last successful snapshot is served again, so a
/// test can script the interesting cycles and let the rest idle.  Before any
/// snapshot has been served an empty queue yields a `FeedError::Http`.
#[derive(Default)]
pub struct ScriptedSource {
    queue:   Mutex<VecDeque<FeedResult<Snapshot>>>,
    last_ok: Mutex<Option<Snapshot>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: FeedResult<Snapshot>) {
        self.queue.lock().push_back(result);
    }

    pub fn push_snapshot(&self, snapshot: Snapshot) {
        self.push(Ok(snapshot));
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn next(&self) -> FeedResult<Snapshot> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        match self.queue.lock().pop_front() {
            Some(Ok(snapshot)) => {
                *self.last_ok.lock() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last_ok
                .lock()
                .clone()
                .ok_or_else(|| FeedError::Http("scripted source exhausted".into())),
        }
    }
}

impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> FeedResult<Snapshot> {
        self.next()
    }
}

impl<S: SnapshotSource> SnapshotSource for Arc<S> {
    fn fetch(&self) -> impl Future<Output = FeedResult<Snapshot>> + Send {
        (**self).fetch()
    }
}
