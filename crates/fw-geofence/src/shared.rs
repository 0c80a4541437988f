//! Swappable geofence index shared by the tracker and confirmation tasks.

use std::sync::Arc;

use fw_core::{GeoPoint, Zone, ZoneLookup};
use parking_lot::RwLock;

use crate::{GeofenceIndex, GeofenceResult, GeofenceSource};

/// The current [`GeofenceIndex`] behind a read-write lock.
///
/// Readers clone the inner `Arc` and never block a reload for longer than
/// the pointer swap.  A failed reload leaves the previous index in place.
#[derive(Clone, Default)]
pub struct SharedGeofences {
    current: Arc<RwLock<Arc<GeofenceIndex>>>,
}

impl SharedGeofences {
    pub fn new(index: GeofenceIndex) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(index))) }
    }

    pub fn current(&self) -> Arc<GeofenceIndex> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, index: GeofenceIndex) {
        *self.current.write() = Arc::new(index);
    }

    /// Load `source` and swap it in.  On failure the error is logged, the
    /// previous index stays active, and the error is returned.
    pub async fn reload(
        &self,
        source: &GeofenceSource,
        http:   &reqwest::Client,
    ) -> GeofenceResult<usize> {
        match source.load(http).await {
            Ok(index) => {
                let count = index.len();
                self.replace(index);
                tracing::info!(%source, polygons = count, "flex zones loaded");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(
                    %source,
                    error = %e,
                    kept = self.current().len(),
                    "flex zone reload failed, keeping previous zones"
                );
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for SharedGeofences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedGeofences").field(&self.current()).finish()
    }
}

impl ZoneLookup for SharedGeofences {
    fn zone_at(&self, point: GeoPoint) -> Zone {
        self.current.read().zone_at(point)
    }
}
