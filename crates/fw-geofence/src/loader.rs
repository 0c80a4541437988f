//! GeoJSON → [`GeofenceIndex`].
//!
//! Accepts a `FeatureCollection`, a single `Feature`, or a bare geometry.
//! `Polygon` and `MultiPolygon` geometries (also nested inside a
//! `GeometryCollection`) become flex zones; every other geometry type is
//! skipped.  Rings with fewer than three positions are ignored.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fw_core::TrackerConfig;
use geo::{Coord, LineString, Polygon};
use geojson::{GeoJson, Geometry, Value};

use crate::{GeofenceError, GeofenceIndex, GeofenceResult};

/// Where a geofence set is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeofenceSource {
    Url(String),
    Path(PathBuf),
    /// GeoJSON text held in memory.
    Inline(String),
}

impl GeofenceSource {
    /// A local file takes precedence over a URL; `None` when neither is
    /// configured.
    pub fn from_config(config: &TrackerConfig) -> Option<Self> {
        if let Some(path) = &config.flexzone_path {
            return Some(GeofenceSource::Path(path.clone()));
        }
        config.flexzone_url.clone().map(GeofenceSource::Url)
    }

    pub async fn load(&self, http: &reqwest::Client) -> GeofenceResult<GeofenceIndex> {
        match self {
            GeofenceSource::Url(url)    => fetch_url(http, url).await,
            GeofenceSource::Path(path)  => load_path(path),
            GeofenceSource::Inline(raw) => parse_geojson(raw),
        }
    }
}

impl std::fmt::Display for GeofenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeofenceSource::Url(url)   => f.write_str(url),
            GeofenceSource::Path(path) => write!(f, "{}", path.display()),
            GeofenceSource::Inline(_)  => f.write_str("<inline>"),
        }
    }
}

/// Read a GeoJSON file from disk.
pub fn load_path(path: &Path) -> GeofenceResult<GeofenceIndex> {
    let raw = std::fs::read_to_string(path)?;
    parse_geojson(&raw)
}

/// Download and parse a GeoJSON document.
pub async fn fetch_url(http: &reqwest::Client, url: &str) -> GeofenceResult<GeofenceIndex> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| GeofenceError::Fetch(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(GeofenceError::Fetch(format!("{url} answered with HTTP status {status}")));
    }
    let body = response.text().await.map_err(|e| GeofenceError::Fetch(e.to_string()))?;
    parse_geojson(&body)
}

/// Parse GeoJSON text into an index.
pub fn parse_geojson(raw: &str) -> GeofenceResult<GeofenceIndex> {
    let doc = GeoJson::from_str(raw).map_err(|e| GeofenceError::Parse(e.to_string()))?;

    let mut polygons = Vec::new();
    match doc {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features {
                if let Some(geometry) = feature.geometry {
                    collect(&geometry, &mut polygons);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = feature.geometry {
                collect(&geometry, &mut polygons);
            }
        }
        GeoJson::Geometry(geometry) => collect(&geometry, &mut polygons),
    }
    Ok(GeofenceIndex::new(polygons))
}

fn collect(geometry: &Geometry, out: &mut Vec<Polygon<f64>>) {
    match &geometry.value {
        Value::Polygon(rings) => out.extend(polygon(rings)),
        Value::MultiPolygon(parts) => out.extend(parts.iter().filter_map(|rings| polygon(rings))),
        Value::GeometryCollection(children) => {
            for child in children {
                collect(child, out);
            }
        }
        _ => {}
    }
}

/// First ring is the exterior, the rest are holes.
fn polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    let exterior = ring(exterior)?;
    let interiors = holes.iter().filter_map(|h| ring(h)).collect();
    Some(Polygon::new(exterior, interiors))
}

fn ring(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    let coords: Vec<Coord<f64>> = positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect();
    (coords.len() >= 3).then(|| LineString::from(coords))
}
