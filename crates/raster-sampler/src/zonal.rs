//! Zonal statistics over a polygon mask.

use std::io::{BufReader, Write};

use bytes::Bytes;
use rayon::prelude::*;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use raster_common::BoundingBox;

use crate::config::SamplerConfig;
use crate::error::{SamplerError, ZonalError};
use crate::geotiff::{RasterDataset, RasterMetadata, Window};
use crate::polygon::PolygonGeometry;
use crate::reproject::{bounds_to_wgs84, CrsTransformer};
use crate::sampler::RasterSampler;
use crate::transform::GeoTransform;
use crate::types::{population_std, Accumulator, NoDataPolicy, ZonalStatistics};

impl RasterSampler {
    /// Statistics of the valid pixels whose centers fall inside `polygon`.
    ///
    /// `polygon` is a GeoJSON `Polygon` or `MultiPolygon` in WGS84 lon/lat.
    #[instrument(skip(self, polygon))]
    pub async fn aggregate_polygon(
        &self,
        raster_ref: &str,
        polygon: &Value,
    ) -> Result<ZonalStatistics, ZonalError> {
        let geometry = PolygonGeometry::from_geojson(polygon)?;
        let bytes = self.fetch(raster_ref).await?;
        let config = self.config().clone();

        tokio::task::spawn_blocking(move || aggregate(bytes, &geometry, &config))
            .await
            .map_err(SamplerError::from)?
    }
}

fn aggregate(
    bytes: Bytes,
    geometry: &PolygonGeometry,
    config: &SamplerConfig,
) -> Result<ZonalStatistics, ZonalError> {
    // Removed when dropped, on every return path
    let mut scratch = NamedTempFile::new().map_err(SamplerError::from)?;
    scratch.write_all(&bytes).map_err(SamplerError::from)?;
    scratch.flush().map_err(SamplerError::from)?;
    drop(bytes);

    let file = scratch.reopen().map_err(SamplerError::from)?;
    let mut dataset = RasterDataset::open(BufReader::new(file))?;
    let metadata = dataset.metadata().clone();
    let policy = NoDataPolicy::new(config.nodata_sentinel, metadata.nodata);

    let origin_window = Window::origin_clipped(
        config.sample_window,
        config.sample_window,
        metadata.height,
        metadata.width,
    );
    if dataset
        .read_window(origin_window)?
        .iter()
        .all(|v| policy.is_nodata(*v))
    {
        return Err(ZonalError::NoValidData("raster has no valid data".to_string()));
    }

    let raster_bounds = metadata.bounds();
    let geographic_bounds = bounds_to_wgs84(&raster_bounds, metadata.crs)?;
    if !geometry.bounds().intersects(&geographic_bounds) {
        return Err(ZonalError::OutsideBounds);
    }

    let geometry = if metadata.crs.is_geographic() {
        geometry.clone()
    } else {
        geometry.reproject(&CrsTransformer::from_wgs84(metadata.crs)?)?
    };

    let window = candidate_window(&metadata, &geometry.bounds()).ok_or(ZonalError::NoPixelsCovered)?;
    let mask = build_mask(&metadata.transform, &geometry, window);
    let covered = mask.iter().filter(|m| **m).count();
    if covered == 0 {
        return Err(ZonalError::NoPixelsCovered);
    }

    let values: Vec<f64> = dataset
        .read_window(window)?
        .into_iter()
        .zip(&mask)
        .filter(|(v, inside)| **inside && !policy.is_nodata(*v))
        .map(|(v, _)| v)
        .collect();

    debug!(covered, valid = values.len(), "Polygon masked");

    summarize(&values, raster_bounds, metadata.crs.to_string())
        .ok_or_else(|| ZonalError::NoValidData("no valid data in polygon".to_string()))
}

/// Pixel window that can hold every cell center inside `bounds`.
///
/// `bounds` is in the raster CRS. Returns `None` when the window misses the
/// grid entirely.
fn candidate_window(metadata: &RasterMetadata, bounds: &BoundingBox) -> Option<Window> {
    let grid = bounds
        .corners()
        .iter()
        .map(|&(x, y)| metadata.transform.invert(x, y))
        .collect::<Option<Vec<_>>>()?;

    let (mut min_col, mut max_col) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_row, mut max_row) = (f64::INFINITY, f64::NEG_INFINITY);
    for (col, row) in grid {
        min_col = min_col.min(col);
        max_col = max_col.max(col);
        min_row = min_row.min(row);
        max_row = max_row.max(row);
    }

    let clamp = |v: f64, limit: u32| v.clamp(0.0, limit as f64) as u32;
    let col0 = clamp(min_col.floor() - 1.0, metadata.width);
    let col1 = clamp(max_col.ceil() + 1.0, metadata.width);
    let row0 = clamp(min_row.floor() - 1.0, metadata.height);
    let row1 = clamp(max_row.ceil() + 1.0, metadata.height);

    if col0 >= col1 || row0 >= row1 {
        return None;
    }
    Some(Window::new(row0, col0, row1 - row0, col1 - col0))
}

/// Row-major inclusion mask over `window`; rows are tested in parallel.
fn build_mask(transform: &GeoTransform, geometry: &PolygonGeometry, window: Window) -> Vec<bool> {
    (0..window.rows)
        .into_par_iter()
        .map(|r| {
            let row = (window.row_off + r) as usize;
            (0..window.cols)
                .map(|c| {
                    let (x, y) = transform.pixel_center(row, (window.col_off + c) as usize);
                    geometry.contains(x, y)
                })
                .collect::<Vec<bool>>()
        })
        .collect::<Vec<_>>()
        .concat()
}

fn summarize(values: &[f64], bounds: BoundingBox, crs: String) -> Option<ZonalStatistics> {
    let mut acc = Accumulator::default();
    values.iter().for_each(|v| acc.add(*v));
    let (mean, min, max) = acc.finish()?;

    Some(ZonalStatistics {
        mean,
        min,
        max,
        std: population_std(values, mean),
        count: acc.count(),
        bounds,
        crs,
    })
}
