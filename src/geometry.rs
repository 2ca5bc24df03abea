//! Geometry parsing, envelopes, and spatial predicates.
//!
//! Wraps the `geo`/`geo-types`/`wkt`/`geojson` stack the way the upstream
//! wrapped `osgeo.ogr`/`shapely`: a normalised WKT string in, a
//! `geo_types::Geometry<f64>` and its envelope out.

use crate::error::{LsiError, Result};
use geo::{BoundingRect, Centroid, Contains, Intersects};
use geo_types::{Coord, Geometry, LineString, Point, Polygon};
use std::f64::consts::PI;
use wkt::{ToWkt, TryFromWkt};

/// `(minx, maxx, miny, maxy)`, matching the upstream's `ogr` envelope tuple
/// order (not the more common `(minx, miny, maxx, maxy)`).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub minx: f64,
    pub maxx: f64,
    pub miny: f64,
    pub maxy: f64,
}

/// The world envelope used to unconditionally evict a stale R-tree entry
/// before re-inserting (§4.3 step 2).
pub const WORLD_ENVELOPE: Envelope = Envelope {
    minx: -180.0,
    maxx: 180.0,
    miny: -90.0,
    maxy: 90.0,
};

pub fn parse_wkt(wkt_str: &str) -> Result<Geometry<f64>> {
    Geometry::<f64>::try_from_wkt_str(wkt_str).map_err(|e| LsiError::Geometry(e.to_string()))
}

pub fn to_wkt(geom: &Geometry<f64>) -> String {
    geom.wkt_string()
}

/// Collapse whitespace runs and flatten newlines, per §4.5's `asWKT`
/// normalisation step.
pub fn normalise_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn envelope_of(geom: &Geometry<f64>) -> Result<Envelope> {
    let rect = geom
        .bounding_rect()
        .ok_or_else(|| LsiError::Geometry("geometry has no bounding rectangle".to_string()))?;
    Ok(Envelope {
        minx: rect.min().x,
        maxx: rect.max().x,
        miny: rect.min().y,
        maxy: rect.max().y,
    })
}

pub fn geojson_value_to_geometry(value: &serde_json::Value) -> Result<Geometry<f64>> {
    let value = if value.get("geometry").is_some() {
        value.get("geometry").unwrap().clone()
    } else {
        value.clone()
    };
    let geojson_geom: geojson::Geometry = serde_json::from_value(value)
        .map_err(|e| LsiError::Geometry(format!("invalid GeoJSON geometry: {e}")))?;
    Geometry::<f64>::try_from(geojson_geom).map_err(|e| LsiError::Geometry(e.to_string()))
}

/// Point geometries reduce to themselves; everything else reduces to its
/// centroid (§4.3 `nearest`).
pub fn centroid_or_self(geom: &Geometry<f64>) -> Result<Point<f64>> {
    match geom {
        Geometry::Point(p) => Ok(*p),
        other => other
            .centroid()
            .ok_or_else(|| LsiError::Geometry("geometry has no centroid".to_string())),
    }
}

pub fn intersects(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    a.intersects(b)
}

pub fn contains(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    a.contains(b)
}

/// Approximate a disc of the given radius (in degrees) around a point as a
/// 32-sided polygon. `geo` has no generic Minkowski buffer, so circle/point
/// buffering (§4.4's `circle` operand and the 0.0001° point pad before
/// indexing) is done by hand, matching the upstream's `ogr.Buffer` call in
/// spirit if not in exact vertex count.
pub fn buffer_point(center: &Point<f64>, radius_degrees: f64) -> Geometry<f64> {
    const SEGMENTS: usize = 32;
    let mut coords = Vec::with_capacity(SEGMENTS + 1);
    for i in 0..=SEGMENTS {
        let theta = 2.0 * PI * (i as f64) / (SEGMENTS as f64);
        coords.push(Coord {
            x: center.x() + radius_degrees * theta.cos(),
            y: center.y() + radius_degrees * theta.sin(),
        });
    }
    Geometry::Polygon(Polygon::new(LineString::new(coords), vec![]))
}

/// If `geom` is a point, buffer it by `radius_degrees`; otherwise return it
/// unchanged. Used for both the query-time point pad (§4.4) and to keep
/// zero-area point geometries queryable against `intersects`/`contains`.
pub fn buffer_if_point(geom: Geometry<f64>, radius_degrees: f64) -> Geometry<f64> {
    match &geom {
        Geometry::Point(p) => buffer_point(p, radius_degrees),
        _ => geom,
    }
}
