//! GeoJSON polygon geometry for zonal masking.
//!
//! Accepts `Polygon` and `MultiPolygon` geometries (bare, or wrapped in a
//! `Feature`). Positions are `[x, y]`; the first ring of each polygon is the
//! exterior and any further rings are holes.

use serde_json::Value;

use raster_common::BoundingBox;

use crate::error::{SamplerError, ZonalError};
use crate::reproject::CrsTransformer;

type Ring = Vec<(f64, f64)>;

/// One polygon: an exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    rings: Vec<Ring>,
}

impl Polygon {
    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.rings[0]
    }

    pub fn holes(&self) -> &[Ring] {
        &self.rings[1..]
    }

    /// Even-odd test over every ring, so points inside a hole are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.rings
            .iter()
            .fold(false, |inside, ring| inside ^ ring_crosses(ring, x, y))
    }
}

/// Odd number of edge crossings of a ray cast towards +x.
fn ring_crosses(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A polygon or multipolygon.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonGeometry {
    polygons: Vec<Polygon>,
}

impl PolygonGeometry {
    /// Parse a GeoJSON geometry or feature.
    pub fn from_geojson(value: &Value) -> Result<Self, ZonalError> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid("geometry must be a JSON object"))?;

        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("geometry has no type"))?;

        if kind == "Feature" {
            let geometry = object
                .get("geometry")
                .ok_or_else(|| invalid("feature has no geometry"))?;
            return Self::from_geojson(geometry);
        }

        let coordinates = object
            .get("coordinates")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("coordinates must be an array"))?;

        let polygons = match kind {
            "Polygon" => vec![parse_polygon(coordinates)?],
            "MultiPolygon" => coordinates
                .iter()
                .map(|polygon| {
                    polygon
                        .as_array()
                        .ok_or_else(|| invalid("polygon must be an array of rings"))
                        .and_then(|rings| parse_polygon(rings))
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(invalid(format!("unsupported geometry type {other}"))),
        };

        if polygons.is_empty() {
            return Err(invalid("multipolygon has no polygons"));
        }

        Ok(Self { polygons })
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Extent of all exterior rings.
    pub fn bounds(&self) -> BoundingBox {
        let points = self
            .polygons
            .iter()
            .flat_map(|p| p.exterior().iter().copied());
        // Parsing guarantees at least three vertices
        BoundingBox::from_points(points).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// True if `(x, y)` is inside any member polygon.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(x, y))
    }

    /// Transform every vertex.
    pub fn reproject(&self, transformer: &CrsTransformer) -> Result<Self, SamplerError> {
        let polygons = self
            .polygons
            .iter()
            .map(|polygon| {
                let rings = polygon
                    .rings
                    .iter()
                    .map(|ring| {
                        ring.iter()
                            .map(|&(x, y)| transformer.transform(x, y))
                            .collect::<Result<Ring, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Polygon { rings })
            })
            .collect::<Result<Vec<_>, SamplerError>>()?;

        Ok(Self { polygons })
    }
}

fn invalid(msg: impl Into<String>) -> ZonalError {
    ZonalError::InvalidPolygon(msg.into())
}

fn parse_polygon(rings: &[Value]) -> Result<Polygon, ZonalError> {
    if rings.is_empty() {
        return Err(invalid("polygon has no rings"));
    }
    let rings = rings.iter().map(parse_ring).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon { rings })
}

fn parse_ring(ring: &Value) -> Result<Ring, ZonalError> {
    let positions = ring
        .as_array()
        .ok_or_else(|| invalid("ring must be an array of positions"))?;

    let mut points = positions
        .iter()
        .map(parse_position)
        .collect::<Result<Ring, _>>()?;

    // Closing vertex is optional
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return Err(invalid("ring needs at least three distinct positions"));
    }
    Ok(points)
}

fn parse_position(position: &Value) -> Result<(f64, f64), ZonalError> {
    let coords = position
        .as_array()
        .filter(|c| c.len() >= 2)
        .ok_or_else(|| invalid("position must be an array of at least two numbers"))?;

    match (coords[0].as_f64(), coords[1].as_f64()) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok((x, y)),
        _ => Err(invalid("position coordinates must be finite numbers")),
    }
}
