//! Raster byte sources.
//!
//! Every request fetches the raster afresh; nothing is cached between calls.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, instrument};

use crate::error::{Result, SamplerError};

/// Fetches the bytes of a raster by resolved location.
#[async_trait]
pub trait RasterStore: Send + Sync {
    /// Fetch the whole object at `location`.
    async fn fetch(&self, location: &str) -> Result<Bytes>;

    /// Fetch the bytes of `range` within the object.
    ///
    /// A range running past the end is truncated; one starting at or past
    /// the end yields no bytes.
    async fn fetch_range(&self, location: &str, range: Range<u64>) -> Result<Bytes>;
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn local_path(location: &str) -> &str {
    location.strip_prefix("file://").unwrap_or(location)
}

fn clamp_range(len: usize, range: &Range<u64>) -> Range<usize> {
    let start = usize::try_from(range.start).unwrap_or(usize::MAX).min(len);
    let end = usize::try_from(range.end).unwrap_or(usize::MAX).clamp(start, len);
    start..end
}

/// HTTP(S) store with a local filesystem fallback.
///
/// `http://` and `https://` locations are fetched over the network; `file://`
/// URLs and bare paths are read from disk.
#[derive(Clone)]
pub struct HttpRasterStore {
    client: Client,
}

impl HttpRasterStore {
    /// Create a store whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| SamplerError::StorageError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RasterStore for HttpRasterStore {
    #[instrument(skip(self))]
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        if !is_remote(location) {
            let bytes = tokio::fs::read(local_path(location))
                .await
                .map_err(|e| SamplerError::fetch_failed(location, e.to_string()))?;
            debug!(bytes = bytes.len(), "Read raster from disk");
            return Ok(Bytes::from(bytes));
        }

        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| SamplerError::fetch_failed(location, e.to_string()))?
            .error_for_status()
            .map_err(|e| SamplerError::fetch_failed(location, e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SamplerError::fetch_failed(location, e.to_string()))?;

        debug!(bytes = bytes.len(), "Fetched raster");
        Ok(bytes)
    }

    #[instrument(skip(self), fields(start = range.start, end = range.end))]
    async fn fetch_range(&self, location: &str, range: Range<u64>) -> Result<Bytes> {
        let failed = |e: String| SamplerError::fetch_failed(location, e);
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        if !is_remote(location) {
            let mut file = tokio::fs::File::open(local_path(location))
                .await
                .map_err(|e| failed(e.to_string()))?;
            file.seek(SeekFrom::Start(range.start))
                .await
                .map_err(|e| failed(e.to_string()))?;
            let mut buf = Vec::new();
            file.take(range.end - range.start)
                .read_to_end(&mut buf)
                .await
                .map_err(|e| failed(e.to_string()))?;
            return Ok(Bytes::from(buf));
        }

        let response = self
            .client
            .get(location)
            .header(header::RANGE, format!("bytes={}-{}", range.start, range.end - 1))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Bytes::new());
        }
        let response = response.error_for_status().map_err(|e| failed(e.to_string()))?;
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

        // A server that ignores Range answers 200 with the whole object
        let bytes = if status == StatusCode::PARTIAL_CONTENT {
            bytes
        } else {
            bytes.slice(clamp_range(bytes.len(), &range))
        };
        debug!(bytes = bytes.len(), status = status.as_u16(), "Fetched raster range");
        Ok(bytes)
    }
}

/// In-memory store keyed by location, for tests and fixtures.
#[derive(Default)]
pub struct MemoryRasterStore {
    objects: HashMap<String, Bytes>,
    fetches: AtomicUsize,
    range_fetches: AtomicUsize,
    bytes_served: AtomicU64,
}

impl MemoryRasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, replacing any existing one at `location`.
    pub fn insert(&mut self, location: impl Into<String>, bytes: impl Into<Bytes>) {
        self.objects.insert(location.into(), bytes.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_object(mut self, location: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.insert(location, bytes);
        self
    }

    /// Number of whole-object `fetch` calls so far, including misses.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of `fetch_range` calls so far, including misses.
    pub fn range_count(&self) -> usize {
        self.range_fetches.load(Ordering::Relaxed)
    }

    /// Total bytes returned by both kinds of fetch.
    pub fn bytes_served(&self) -> u64 {
        self.bytes_served.load(Ordering::Relaxed)
    }

    fn object(&self, location: &str) -> Result<&Bytes> {
        self.objects
            .get(location)
            .ok_or_else(|| SamplerError::fetch_failed(location, "object not found"))
    }

    fn served(&self, bytes: Bytes) -> Bytes {
        self.bytes_served.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        bytes
    }
}

#[async_trait]
impl RasterStore for MemoryRasterStore {
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let object = self.object(location)?.clone();
        Ok(self.served(object))
    }

    async fn fetch_range(&self, location: &str, range: Range<u64>) -> Result<Bytes> {
        self.range_fetches.fetch_add(1, Ordering::Relaxed);
        let object = self.object(location)?;
        let slice = object.slice(clamp_range(object.len(), &range));
        Ok(self.served(slice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_hit_and_miss() {
        let store = MemoryRasterStore::new().with_object("a.tif", vec![1u8, 2, 3]);

        assert_eq!(store.fetch("a.tif").await.unwrap(), Bytes::from_static(&[1, 2, 3]));
        assert!(matches!(
            store.fetch("b.tif").await,
            Err(SamplerError::FetchFailed { .. })
        ));
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_http_store_reads_local_paths() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"tiff").unwrap();
        let store = HttpRasterStore::new(Duration::from_secs(5)).unwrap();

        let path = file.path().to_string_lossy().to_string();
        assert_eq!(store.fetch(&path).await.unwrap().as_ref(), b"tiff");
        assert_eq!(
            store.fetch(&format!("file://{path}")).await.unwrap().as_ref(),
            b"tiff"
        );
    }

    #[tokio::test]
    async fn test_memory_store_ranges_are_truncated() {
        let store = MemoryRasterStore::new().with_object("a.tif", vec![0u8, 1, 2, 3, 4]);

        assert_eq!(store.fetch_range("a.tif", 1..3).await.unwrap().as_ref(), &[1, 2]);
        assert_eq!(store.fetch_range("a.tif", 3..100).await.unwrap().as_ref(), &[3, 4]);
        assert!(store.fetch_range("a.tif", 9..12).await.unwrap().is_empty());
        assert!(store.fetch_range("b.tif", 0..1).await.is_err());
        assert_eq!(store.range_count(), 4);
        assert_eq!(store.fetch_count(), 0);
        assert_eq!(store.bytes_served(), 4);
    }

    #[tokio::test]
    async fn test_http_store_reads_local_ranges() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"II*\0geotiff").unwrap();
        let store = HttpRasterStore::new(Duration::from_secs(5)).unwrap();
        let path = file.path().to_string_lossy().to_string();

        assert_eq!(store.fetch_range(&path, 4..7).await.unwrap().as_ref(), b"geo");
        assert_eq!(
            store.fetch_range(&format!("file://{path}"), 7..64).await.unwrap().as_ref(),
            b"tiff"
        );
        assert!(store.fetch_range(&path, 64..70).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_store_missing_file() {
        let store = HttpRasterStore::new(Duration::from_secs(5)).unwrap();
        assert!(store.fetch("/nonexistent/raster.tif").await.is_err());
    }
}
