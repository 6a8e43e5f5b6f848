//! Coordinate reprojection between EPSG-coded CRSs.
//!
//! Pure Rust (proj4rs) transforms using PROJ.4 definitions from the
//! `crs-definitions` database. No raster I/O happens here.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use raster_common::{BoundingBox, Crs, GeoPoint};

use crate::error::{Result, SamplerError};

/// A reusable transform from one CRS to another.
///
/// Building the projection pair parses two PROJ.4 strings, so callers that
/// transform many coordinates (polygon rings, bounds corners) build one
/// transformer and reuse it.
pub struct CrsTransformer {
    /// `None` when source and target are the same CRS.
    projs: Option<(Proj, Proj)>,
    source_is_geographic: bool,
    target_is_geographic: bool,
    source: Crs,
    target: Crs,
}

impl CrsTransformer {
    /// Create a transformer from `source` to `target`.
    pub fn new(source: Crs, target: Crs) -> Result<Self> {
        let projs = if source == target {
            None
        } else {
            Some((build_proj(source)?, build_proj(target)?))
        };

        Ok(Self {
            projs,
            source_is_geographic: source.is_geographic(),
            target_is_geographic: target.is_geographic(),
            source,
            target,
        })
    }

    /// Transformer from WGS84 lon/lat into `target`.
    pub fn from_wgs84(target: Crs) -> Result<Self> {
        Self::new(Crs::WGS84, target)
    }

    /// Transform one `(x, y)` coordinate. Geographic coordinates are
    /// `(lon, lat)` in degrees on both sides.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let Some((source_proj, target_proj)) = &self.projs else {
            return Ok((x, y));
        };

        // proj4rs uses radians for geographic coordinates
        let mut point = if self.source_is_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(source_proj, target_proj, &mut point).map_err(|e| {
            SamplerError::projection(format!(
                "transform from {} to {} failed: {:?}",
                self.source, self.target, e
            ))
        })?;

        let (out_x, out_y) = if self.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(SamplerError::projection(format!(
                "({x}, {y}) has no finite image in {}",
                self.target
            )));
        }

        Ok((out_x, out_y))
    }
}

fn build_proj(crs: Crs) -> Result<Proj> {
    let definition = crs.proj4_definition().ok_or_else(|| {
        SamplerError::projection(format!("{crs} is not in the crs-definitions database"))
    })?;

    Proj::from_proj_string(definition)
        .map_err(|e| SamplerError::projection(format!("invalid projection {crs}: {e:?}")))
}

/// Project a WGS84 point into `target`, returning `(x, y)` in target units.
pub fn reproject_point(point: GeoPoint, target: Crs) -> Result<(f64, f64)> {
    CrsTransformer::from_wgs84(target)?.transform(point.lon, point.lat)
}

/// Bring one `(x, y)` coordinate in `source` back to WGS84 `(lon, lat)`.
pub fn reproject_to_wgs84(x: f64, y: f64, source: Crs) -> Result<(f64, f64)> {
    CrsTransformer::new(source, Crs::WGS84)?.transform(x, y)
}

/// Bring a bounding box expressed in `source` into WGS84 lon/lat.
///
/// The four corners are transformed and enclosed; for conformal projections
/// over the extents of a single raster this is a close approximation of the
/// true footprint.
pub fn bounds_to_wgs84(bounds: &BoundingBox, source: Crs) -> Result<BoundingBox> {
    if source.is_wgs84() {
        return Ok(*bounds);
    }

    let transformer = CrsTransformer::new(source, Crs::WGS84)?;
    let corners = bounds
        .corners()
        .iter()
        .map(|&(x, y)| transformer.transform(x, y))
        .collect::<Result<Vec<_>>>()?;

    BoundingBox::from_points(corners)
        .ok_or_else(|| SamplerError::projection("empty bounds".to_string()))
}
