//! Query spatial operand construction (§4.4).

use crate::error::{LsiError, Result};
use crate::geometry::{self};
use geo_types::{Geometry, Point};
use std::f64::consts::PI;

pub enum SpatialOperand {
    Wkt(String),
    Bbox { min_y: f64, min_x: f64, max_y: f64, max_x: f64 },
    Circle { center_y: f64, center_x: f64, radius_km: f64 },
}

impl SpatialOperand {
    fn into_geometry(self) -> Result<Geometry<f64>> {
        match self {
            SpatialOperand::Wkt(text) => geometry::parse_wkt(&text),
            SpatialOperand::Bbox { min_y, min_x, max_y, max_x } => {
                let wkt = format!(
                    "POLYGON(({min_x} {min_y}, {min_x} {max_y}, {max_x} {max_y}, {max_x} {min_y}, {min_x} {min_y}))"
                );
                geometry::parse_wkt(&wkt)
            }
            SpatialOperand::Circle { center_y, center_x, radius_km } => {
                // Earth radius in km. The upstream passes longitude
                // (`center_x`) to `cos(radians(..))` where latitude would
                // be geometrically correct; preserved verbatim (§9).
                let delta_degrees = (radius_km / (6371.0 * (center_x * PI / 180.0).cos())).to_degrees();
                let center = Point::new(center_x, center_y);
                Ok(geometry::buffer_point(&center, delta_degrees))
            }
        }
    }
}

/// Parse exactly one of `wkt`, `bbox`, or `circle` into a geometry, then pad
/// a point result by `0.0001°` before it's passed to the index (§4.4).
pub fn parse_spatial_operand(
    wkt: Option<&str>,
    bbox: Option<&str>,
    circle: Option<&str>,
) -> Result<Geometry<f64>> {
    let operand = if let Some(wkt) = wkt {
        SpatialOperand::Wkt(wkt.to_string())
    } else if let Some(bbox) = bbox {
        let parts: Vec<&str> = bbox.split(',').map(str::trim).collect();
        let [min_y, min_x, max_y, max_x] = parts_to_floats(&parts)
            .ok_or_else(|| LsiError::BadRequest("invalid bounding box".to_string()))?;
        SpatialOperand::Bbox { min_y, min_x, max_y, max_x }
    } else if let Some(circle) = circle {
        let parts: Vec<&str> = circle.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(LsiError::BadRequest("invalid circle specification".to_string()));
        }
        let values: Option<Vec<f64>> = parts.iter().map(|p| p.parse::<f64>().ok()).collect();
        let Some(values) = values else {
            return Err(LsiError::BadRequest("invalid circle specification".to_string()));
        };
        SpatialOperand::Circle { center_y: values[0], center_x: values[1], radius_km: values[2] }
    } else {
        return Err(LsiError::BadRequest(
            "missing or invalid spatial argument (wkt, bbox, or circle)".to_string(),
        ));
    };

    let geom = operand.into_geometry().map_err(|e| match e {
        LsiError::BadRequest(_) => e,
        other => LsiError::BadRequest(format!("invalid spatial argument: {other}")),
    })?;
    Ok(geometry::buffer_if_point(geom, 0.0001))
}

fn parts_to_floats(parts: &[&str]) -> Option<[f64; 4]> {
    if parts.len() != 4 {
        return None;
    }
    let mut out = [0.0_f64; 4];
    for (i, p) in parts.iter().enumerate() {
        out[i] = p.parse().ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_becomes_counter_clockwise_polygon() {
        let geom = parse_spatial_operand(None, Some("0,0,10,10"), None).unwrap();
        assert!(matches!(geom, Geometry::Polygon(_)));
    }

    #[test]
    fn point_wkt_is_buffered() {
        let geom = parse_spatial_operand(Some("POINT(1 1)"), None, None).unwrap();
        assert!(matches!(geom, Geometry::Polygon(_)));
    }

    #[test]
    fn invalid_bbox_is_bad_request() {
        let err = parse_spatial_operand(None, Some("not,a,bbox"), None).unwrap_err();
        assert!(matches!(err, LsiError::BadRequest(_)));
    }

    #[test]
    fn missing_operand_is_bad_request() {
        let err = parse_spatial_operand(None, None, None).unwrap_err();
        assert!(matches!(err, LsiError::BadRequest(_)));
    }
}
