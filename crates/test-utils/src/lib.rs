//! Shared test utilities for the raster sampling workspace.
//!
//! This crate provides:
//! - A GeoTIFF fixture writer ([`GeoTiffBuilder`]), stripped or tiled
//! - Grid generators with predictable values
//! - Ready-made rasters for the common sampling scenarios
//! - Approximate float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then build a raster in a test:
//!
//! ```ignore
//! use test_utils::{fixtures, assert_approx_eq};
//!
//! let bytes = fixtures::four_pixels().to_bytes();
//! ```

pub mod fixtures;
pub mod generators;
pub mod geotiff;
mod tiled;

pub use generators::*;
pub use geotiff::GeoTiffBuilder;

/// Assert that two numbers differ by at most `epsilon`.
///
/// Operands are widened to `f64`, so `f32` pixel values compare directly.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $epsilon:expr) => {{
        let (actual, expected, epsilon) = ($actual as f64, $expected as f64, $epsilon as f64);
        assert!(
            (actual - expected).abs() <= epsilon,
            "expected {} within {} of {}, got difference {}",
            actual,
            epsilon,
            expected,
            (actual - expected).abs()
        );
    }};
}

/// Assert that two `(x, y)` tuples match component-wise within `epsilon`.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    ($actual:expr, $expected:expr, $epsilon:expr) => {{
        let (ax, ay) = $actual;
        let (ex, ey) = $expected;
        $crate::assert_approx_eq!(ax, ex, $epsilon);
        $crate::assert_approx_eq!(ay, ey, $epsilon);
    }};
}
