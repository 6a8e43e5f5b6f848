//! Random-access reads over a [`RasterStore`] by byte range.
//!
//! Lets the TIFF decoder seek through a remote object while only the
//! header, the directory and the chunks it actually decodes are fetched.
//! Meant to live on tokio's blocking pool: each cache miss blocks on one
//! `fetch_range` call.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tracing::debug;

use crate::error::{Result, SamplerError};
use crate::store::RasterStore;

/// Bytes fetched up front; covers the header and first IFD of a COG.
pub const HEADER_PREFETCH: u64 = 64 * 1024;

/// Smallest range requested on a cache miss.
pub const MIN_RANGE: u64 = 16 * 1024;

/// Largest readahead when a chunk is read sequentially.
const MAX_READAHEAD: u64 = 4 * 1024 * 1024;

/// A `Read + Seek` view of one stored object.
pub struct RangeReader {
    store: Arc<dyn RasterStore>,
    location: String,
    handle: Handle,
    position: u64,
    /// Fetched spans as (start offset, bytes).
    spans: Vec<(u64, Bytes)>,
    /// Object length, once a short range has revealed it.
    end: Option<u64>,
    /// End of the last fetched range and the readahead that produced it.
    last_fetch: (u64, u64),
    requests: usize,
}

impl RangeReader {
    /// Fetch the header prefix of `location` and return a reader over it.
    ///
    /// Must be called from within a tokio runtime. Fails when the object
    /// cannot be fetched or is empty.
    pub async fn open(store: Arc<dyn RasterStore>, location: &str) -> Result<Self> {
        let head = store.fetch_range(location, 0..HEADER_PREFETCH).await?;
        if head.is_empty() {
            return Err(SamplerError::fetch_failed(location, "object is empty"));
        }

        let end = (head.len() as u64) < HEADER_PREFETCH;
        Ok(Self {
            store,
            location: location.to_string(),
            handle: Handle::current(),
            position: 0,
            end: end.then_some(head.len() as u64),
            last_fetch: (head.len() as u64, 0),
            spans: vec![(0, head)],
            requests: 1,
        })
    }

    /// Range requests issued so far, including the header prefetch.
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Copy from a cached span covering the current position.
    fn copy_cached(&mut self, buf: &mut [u8]) -> Option<usize> {
        let position = self.position;
        let (start, bytes) = self
            .spans
            .iter()
            .rev()
            .find(|(start, bytes)| position >= *start && position < start + bytes.len() as u64)?;

        let offset = (position - start) as usize;
        let n = buf.len().min(bytes.len() - offset);
        buf[..n].copy_from_slice(&bytes[offset..offset + n]);
        self.position += n as u64;
        Some(n)
    }

    fn fetch_at_position(&mut self, want: usize) -> io::Result<Bytes> {
        // Reads continuing where the last fetch ended double the readahead
        let (last_end, last_len) = self.last_fetch;
        let readahead = if self.position == last_end {
            (last_len * 2).clamp(MIN_RANGE, MAX_READAHEAD)
        } else {
            MIN_RANGE
        };
        let len = (want as u64).max(readahead);
        let range = self.position..self.position.saturating_add(len);
        let bytes = self
            .handle
            .block_on(self.store.fetch_range(&self.location, range.clone()))
            .map_err(io::Error::other)?;
        self.requests += 1;
        self.last_fetch = (range.start + bytes.len() as u64, len);

        if (bytes.len() as u64) < len {
            self.end = Some(range.start + bytes.len() as u64);
        }
        debug!(
            location = %self.location,
            start = range.start,
            bytes = bytes.len(),
            "Fetched raster range"
        );
        Ok(bytes)
    }
}

impl Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(n) = self.copy_cached(buf) {
            return Ok(n);
        }
        if self.end.is_some_and(|end| self.position >= end) {
            return Ok(0);
        }

        let bytes = self.fetch_at_position(buf.len())?;
        if bytes.is_empty() {
            return Ok(0);
        }
        self.spans.push((self.position, bytes));
        Ok(self.copy_cached(buf).unwrap_or(0))
    }
}

impl Seek for RangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let end = self.end.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Unsupported, "object length not yet known")
                })?;
                end.checked_add_signed(delta)
            }
        };
        self.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of object")
        })?;
        Ok(self.position)
    }
}
