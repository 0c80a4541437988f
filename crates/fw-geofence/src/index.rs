//! Point-in-polygon index over the flex zones.
//!
//! # Layout
//!
//! Polygons are stored in a flat `Vec`; an R-tree (via `rstar`) holds one
//! bounding box per polygon.  A lookup first collects the boxes containing
//! the point and only runs the exact `geo::Contains` test on those
//! candidates.  The set is immutable once built; reloading builds a new index.

use fw_core::{GeoPoint, Zone, ZoneLookup};
use geo::{BoundingRect, Contains, Point, Polygon};
use rstar::{RTree, RTreeObject, AABB};

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// Bounding box of one polygon, `[lng, lat]` corners, plus its slot in
/// `GeofenceIndex::polygons`.
#[derive(Clone)]
struct ZoneEntry {
    envelope: AABB<[f64; 2]>,
    polygon:  usize,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

// ── GeofenceIndex ─────────────────────────────────────────────────────────────

/// Immutable set of flex-zone polygons.
pub struct GeofenceIndex {
    polygons: Vec<Polygon<f64>>,
    tree:     RTree<ZoneEntry>,
}

impl GeofenceIndex {
    /// An index without polygons: every point is outside.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Build from polygons in `(x = lng, y = lat)` coordinates.  Degenerate
    /// polygons without a bounding box are dropped.
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        let polygons: Vec<Polygon<f64>> =
            polygons.into_iter().filter(|p| p.bounding_rect().is_some()).collect();

        let entries: Vec<ZoneEntry> = polygons
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let rect = p.bounding_rect()?;
                Some(ZoneEntry {
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    polygon: i,
                })
            })
            .collect();

        Self { polygons, tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// `true` iff `(lng, lat)` lies strictly inside some polygon.  Holes are
    /// excluded and boundary points count as outside.
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        if !lng.is_finite() || !lat.is_finite() {
            return false;
        }
        let point = Point::new(lng, lat);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lng, lat]))
            .any(|entry| self.polygons[entry.polygon].contains(&point))
    }
}

impl Default for GeofenceIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for GeofenceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeofenceIndex").field("polygons", &self.polygons.len()).finish()
    }
}

impl ZoneLookup for GeofenceIndex {
    fn zone_at(&self, point: GeoPoint) -> Zone {
        Zone::from_inside(self.contains(point.lng, point.lat))
    }
}
