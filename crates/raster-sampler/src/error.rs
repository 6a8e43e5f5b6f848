//! Error types for raster sampling.

use thiserror::Error;

/// Errors raised while fetching, decoding or reading a raster.
///
/// Samplers convert these into an absent sample; only the polygon
/// aggregator surfaces them to its caller.
#[derive(Error, Debug)]
pub enum SamplerError {
    /// Failed to fetch the raster bytes.
    #[error("failed to fetch raster {url}: {message}")]
    FetchFailed { url: String, message: String },

    /// Failed to open the raster as a GeoTIFF.
    #[error("failed to open raster: {0}")]
    OpenFailed(String),

    /// Failed to read data from the raster.
    #[error("failed to read raster data: {0}")]
    ReadFailed(String),

    /// The requested pixel or window lies outside the raster grid.
    #[error("pixel ({row}, {col}) is outside raster extent {width}x{height}")]
    OutOfBounds {
        row: i64,
        col: i64,
        width: u32,
        height: u32,
    },

    /// Georeferencing tags are missing or unusable.
    #[error("invalid raster metadata: {0}")]
    InvalidMetadata(String),

    /// Coordinate transformation failed.
    #[error("projection error: {0}")]
    ProjectionError(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// A blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamplerError {
    /// Create a FetchFailed error.
    pub fn fetch_failed(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create a ProjectionError.
    pub fn projection(msg: impl Into<String>) -> Self {
        Self::ProjectionError(msg.into())
    }
}

impl From<std::io::Error> for SamplerError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<tiff::TiffError> for SamplerError {
    fn from(err: tiff::TiffError) -> Self {
        Self::ReadFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SamplerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type for raster sampling operations.
pub type Result<T> = std::result::Result<T, SamplerError>;

/// Failure conditions of polygon aggregation.
///
/// The first four are client-facing conditions with a readable reason;
/// `Sampler` wraps a fetch or decode failure.
#[derive(Error, Debug)]
pub enum ZonalError {
    /// The polygon geometry is malformed.
    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),

    /// The polygon's bounding box does not intersect the raster.
    #[error("polygon outside raster bounds")]
    OutsideBounds,

    /// The polygon intersects the raster but encloses no pixel centers.
    #[error("polygon covers no raster pixels")]
    NoPixelsCovered,

    /// No non-nodata pixels were available.
    #[error("{0}")]
    NoValidData(String),

    /// The raster could not be fetched or read.
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

impl ZonalError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ZonalError::InvalidPolygon(_)
            | ZonalError::OutsideBounds
            | ZonalError::NoPixelsCovered => 400,
            ZonalError::NoValidData(_) => 404,
            ZonalError::Sampler(_) => 500,
        }
    }
}
