//! Application state for the raster API.

use std::sync::Arc;

use anyhow::Result;

use raster_sampler::{HttpRasterStore, RasterSampler, RasterStore};

use crate::config::ServiceConfig;
use crate::insitu::InsituTable;
use crate::url_template::RasterUrlTemplate;

/// Shared application state.
pub struct AppState {
    /// Point, transect and polygon sampling over fetched rasters.
    pub sampler: RasterSampler,

    pub config: ServiceConfig,

    /// Maps (date, variable) to the raster used by the time series route.
    pub url_template: RasterUrlTemplate,

    /// In-situ observations; `None` when not configured or failed to load.
    pub insitu: Option<Arc<InsituTable>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RasterStore>,
        config: ServiceConfig,
        insitu: Option<InsituTable>,
    ) -> Self {
        let sampler = RasterSampler::new(store, config.sampler.clone());
        let url_template = RasterUrlTemplate::new(config.url_template.clone());
        Self {
            sampler,
            config,
            url_template,
            insitu: insitu.map(Arc::new),
        }
    }

    /// Build state backed by the HTTP store.
    pub fn from_config(config: ServiceConfig, insitu: Option<InsituTable>) -> Result<Self> {
        let store = HttpRasterStore::new(config.request_timeout())?;
        Ok(Self::new(Arc::new(store), config, insitu))
    }
}
