//! Single-pixel sampling.

use std::io::{Read, Seek};

use tracing::{debug, instrument, warn};

use raster_common::GeoPoint;

use crate::error::{Result, SamplerError};
use crate::geotiff::RasterDataset;
use crate::reproject::reproject_point;
use crate::sampler::RasterSampler;
use crate::types::{NoDataPolicy, Sample};

impl RasterSampler {
    /// Value of the pixel containing `point`, or absent.
    ///
    /// Fetch, decode and projection failures are logged and reported as
    /// absent, the same as a nodata pixel.
    #[instrument(skip(self), fields(lat = point.lat, lon = point.lon))]
    pub async fn sample_point(&self, raster_ref: &str, point: GeoPoint) -> Sample {
        match self.try_sample_point(raster_ref, point).await {
            Ok(value) => value.into(),
            Err(e) => {
                warn!(error = %e, raster_ref, "Point sample failed");
                Sample::Absent
            }
        }
    }

    /// Like [`sample_point`](Self::sample_point), but keeps failures apart
    /// from nodata: `Ok(None)` is a nodata or out-of-extent pixel.
    pub async fn try_sample_point(&self, raster_ref: &str, point: GeoPoint) -> Result<Option<f64>> {
        let reader = self.open_ranged(raster_ref).await?;
        let sentinel = self.config().nodata_sentinel;

        tokio::task::spawn_blocking(move || read_point(reader, point, sentinel)).await?
    }
}

/// Decodes only the chunk holding the pixel.
fn read_point<R: Read + Seek>(reader: R, point: GeoPoint, sentinel: f64) -> Result<Option<f64>> {
    let mut dataset = RasterDataset::open(reader)?;
    let metadata = dataset.metadata().clone();

    let (x, y) = reproject_point(point, metadata.crs)?;
    let index = metadata
        .transform
        .index(x, y)
        .ok_or_else(|| SamplerError::invalid_metadata("geotransform is not invertible"))?;

    if !metadata.contains(index) {
        debug!(row = index.row, col = index.col, "Point outside raster extent");
        return Ok(None);
    }

    let raw = dataset.read_pixel(index)?;
    let policy = NoDataPolicy::new(sentinel, metadata.nodata);
    Ok(policy.classify(raw).value())
}
