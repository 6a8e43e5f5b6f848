//! Raster sampling over single-band cloud-optimized GeoTIFFs.
//!
//! Answers three kinds of question about a raster addressed by URL:
//!
//! - **Point**: the pixel value at a WGS84 latitude/longitude
//! - **Transect**: valid values along a straight line, with distances
//! - **Zonal**: mean/min/max/std/count of the pixels inside a GeoJSON polygon
//!
//! # Architecture
//!
//! ```text
//! raster_ref
//!      │
//!      ▼
//! resolve_raster_url ──► RasterStore::fetch ──► RasterDataset::open
//!                                                     │
//!                     reproject (WGS84 → raster CRS) ◄┘
//!                                │
//!                                ▼
//!                     GeoTransform::index ──► read_pixel / read_window
//!                                                     │
//!                                                     ▼
//!                                             NoDataPolicy::classify
//! ```
//!
//! Point and transect queries read through a [`RangeReader`], fetching only
//! the header and the chunks they decode. Polygon aggregation downloads the
//! whole object to a scoped temporary file. Decoding runs on tokio's
//! blocking pool. Nothing is cached across calls.
//!
//! # Example
//!
//! ```ignore
//! use std::{sync::Arc, time::Duration};
//! use raster_sampler::{HttpRasterStore, RasterSampler, SamplerConfig};
//! use raster_common::GeoPoint;
//!
//! let store = HttpRasterStore::new(Duration::from_secs(60))?;
//! let sampler = RasterSampler::new(Arc::new(store), SamplerConfig::default());
//! let sample = sampler
//!     .sample_point("https://storage.googleapis.com/bucket/chl.tif", GeoPoint::new(41.1, -72.9))
//!     .await;
//! ```

pub mod config;
pub mod error;
pub mod geotiff;
pub mod point;
pub mod polygon;
pub mod range_reader;
pub mod reproject;
pub mod resolver;
pub mod sampler;
pub mod store;
pub mod transect;
pub mod transform;
pub mod types;
pub mod zonal;

pub use config::SamplerConfig;
pub use error::{Result, SamplerError, ZonalError};
pub use geotiff::{RasterDataset, RasterMetadata, Window};
pub use polygon::PolygonGeometry;
pub use range_reader::RangeReader;
pub use reproject::{bounds_to_wgs84, reproject_point, reproject_to_wgs84, CrsTransformer};
pub use resolver::resolve_raster_url;
pub use sampler::RasterSampler;
pub use store::{HttpRasterStore, MemoryRasterStore, RasterStore};
pub use transect::{line_indices, linspace};
pub use transform::{GeoTransform, RasterIndex};
pub use types::{NoDataPolicy, Sample, Transect, ZonalStatistics};
