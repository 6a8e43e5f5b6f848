//! Sampling results.

use serde::{Deserialize, Serialize};

use raster_common::BoundingBox;

/// Outcome of reading one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// A finite data value.
    Value(f64),
    /// No data: sentinel, declared nodata, NaN, or unreadable.
    Absent,
}

impl Sample {
    pub fn value(self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(v),
            Sample::Absent => None,
        }
    }
}

impl From<Option<f64>> for Sample {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Sample::Absent, Sample::Value)
    }
}

/// Decides which raw pixel values count as "no data".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoDataPolicy {
    sentinel: f64,
    declared: Option<f64>,
}

impl NoDataPolicy {
    pub fn new(sentinel: f64, declared: Option<f64>) -> Self {
        Self { sentinel, declared }
    }

    /// True when `value` carries no data.
    pub fn is_nodata(&self, value: f64) -> bool {
        if !value.is_finite() || value == self.sentinel {
            return true;
        }
        matches!(self.declared, Some(nd) if value == nd)
    }

    /// Classify a raw pixel value.
    pub fn classify(&self, value: f64) -> Sample {
        if self.is_nodata(value) {
            Sample::Absent
        } else {
            Sample::Value(value)
        }
    }
}

/// Valid samples along a line, with their distances from the start.
///
/// `values` and `distances` always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transect {
    pub values: Vec<f64>,
    pub distances: Vec<f64>,
}

impl Transect {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64, distance: f64) {
        self.values.push(value);
        self.distances.push(distance);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Summary statistics over the valid pixels inside a polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std: f64,
    pub count: usize,
    /// Raster extent in its native CRS.
    pub bounds: BoundingBox,
    /// Raster CRS as `EPSG:<code>`.
    pub crs: String,
}

/// Running moments for a stream of values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Accumulator {
    pub(crate) fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// (mean, min, max) or `None` when empty.
    pub(crate) fn finish(&self) -> Option<(f64, f64, f64)> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum / self.count as f64, self.min, self.max))
    }
}

/// Population standard deviation about a known mean.
pub(crate) fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
