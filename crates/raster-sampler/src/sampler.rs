//! Entry point for sampling operations.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::config::SamplerConfig;
use crate::error::Result;
use crate::range_reader::RangeReader;
use crate::resolver::resolve_raster_url;
use crate::store::RasterStore;

/// Samples single-band rasters fetched through a [`RasterStore`].
///
/// Holds no per-raster state: every operation resolves, fetches and opens
/// its raster, and drops it before returning.
#[derive(Clone)]
pub struct RasterSampler {
    store: Arc<dyn RasterStore>,
    config: SamplerConfig,
}

impl RasterSampler {
    pub fn new(store: Arc<dyn RasterStore>, config: SamplerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn resolve(&self, raster_ref: &str) -> String {
        let url = resolve_raster_url(raster_ref);
        if url != raster_ref {
            debug!(raster_ref, url = %url, "Resolved raster reference");
        }
        url
    }

    /// Resolve a raster reference and fetch the whole object.
    pub(crate) async fn fetch(&self, raster_ref: &str) -> Result<Bytes> {
        let url = self.resolve(raster_ref);
        self.store.fetch(&url).await
    }

    /// Resolve a raster reference and open it for ranged reads.
    pub(crate) async fn open_ranged(&self, raster_ref: &str) -> Result<RangeReader> {
        let url = self.resolve(raster_ref);
        RangeReader::open(Arc::clone(&self.store), &url).await
    }
}
