//! Straight-line transects through raster space.

use std::io::{Read, Seek};

use tracing::{debug, instrument, warn};

use raster_common::GeoPoint;

use crate::error::{Result, SamplerError};
use crate::geotiff::RasterDataset;
use crate::reproject::CrsTransformer;
use crate::sampler::RasterSampler;
use crate::transform::{GeoTransform, RasterIndex};
use crate::types::{NoDataPolicy, Sample, Transect};

impl RasterSampler {
    /// Sample pixels on the line from `start` to `end`.
    ///
    /// Nodata and out-of-extent points are dropped from both sequences. If
    /// the raster cannot be opened or the endpoints cannot be projected the
    /// transect is empty.
    #[instrument(skip(self), fields(
        start_lat = start.lat,
        start_lon = start.lon,
        end_lat = end.lat,
        end_lon = end.lon
    ))]
    pub async fn sample_transect(&self, raster_ref: &str, start: GeoPoint, end: GeoPoint) -> Transect {
        match self.try_sample_transect(raster_ref, start, end).await {
            Ok(transect) => transect,
            Err(e) => {
                warn!(error = %e, raster_ref, "Transect sample failed");
                Transect::empty()
            }
        }
    }

    /// Fallible form of [`sample_transect`](Self::sample_transect).
    pub async fn try_sample_transect(
        &self,
        raster_ref: &str,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<Transect> {
        let reader = self.open_ranged(raster_ref).await?;
        let sentinel = self.config().nodata_sentinel;
        let spacing = self.config().transect_spacing;

        tokio::task::spawn_blocking(move || read_transect(reader, start, end, sentinel, spacing))
            .await?
    }
}

fn read_transect<R: Read + Seek>(
    reader: R,
    start: GeoPoint,
    end: GeoPoint,
    sentinel: f64,
    spacing: f64,
) -> Result<Transect> {
    let mut dataset = RasterDataset::open(reader)?;
    let metadata = dataset.metadata().clone();
    let policy = NoDataPolicy::new(sentinel, metadata.nodata);

    let transformer = CrsTransformer::from_wgs84(metadata.crs)?;
    let from = endpoint_index(&metadata.transform, &transformer, start)?;
    let to = endpoint_index(&metadata.transform, &transformer, end)?;

    let indices = line_indices(from, to);
    let distances = linspace(0.0, indices.len() as f64 * spacing, indices.len());

    let mut transect = Transect::empty();
    for (index, distance) in indices.into_iter().zip(distances) {
        if !metadata.contains(index) {
            continue;
        }
        let sample = match dataset.read_pixel(index) {
            Ok(raw) => policy.classify(raw),
            Err(e) => {
                warn!(error = %e, row = index.row, col = index.col, "Transect pixel read failed");
                Sample::Absent
            }
        };
        if let Sample::Value(value) = sample {
            transect.push(value, distance);
        }
    }

    debug!(points = transect.len(), "Transect sampled");
    Ok(transect)
}

fn endpoint_index(
    transform: &GeoTransform,
    transformer: &CrsTransformer,
    point: GeoPoint,
) -> Result<RasterIndex> {
    let (x, y) = transformer.transform(point.lon, point.lat)?;
    transform
        .index(x, y)
        .ok_or_else(|| SamplerError::invalid_metadata("geotransform is not invertible"))
}

/// Grid cells visited going from `from` to `to`, both inclusive.
///
/// The point count is one more than the whole number of cells between the
/// endpoints; interpolated fractional indices are floored.
pub fn line_indices(from: RasterIndex, to: RasterIndex) -> Vec<RasterIndex> {
    let n = from.distance_to(&to).floor() as usize + 1;
    let rows = linspace(from.row as f64, to.row as f64, n);
    let cols = linspace(from.col as f64, to.col as f64, n);

    rows.into_iter()
        .zip(cols)
        .map(|(r, c)| RasterIndex::new(r.floor() as i64, c.floor() as i64))
        .collect()
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
///
/// A single value is `start`; the last value is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}
