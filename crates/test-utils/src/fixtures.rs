//! Ready-made rasters for common sampling scenarios.
//!
//! All fixtures are EPSG:4326 with 1x1 degree pixels and the upper-left
//! corner at `(0, height)`, so pixel `(row, col)` has its center at
//! `lon = col + 0.5`, `lat = height - row - 0.5`.

use crate::geotiff::GeoTiffBuilder;
use crate::generators::{create_constant_grid, create_sequential_grid, with_cells};

/// Sentinel value used by the production rasters.
pub const NODATA_SENTINEL: f32 = -9999.0;

/// WGS84 `(lat, lon)` of the center of pixel `(row, col)` in a fixture of
/// the given height.
pub fn pixel_center(height: u32, row: usize, col: usize) -> (f64, f64) {
    (height as f64 - row as f64 - 0.5, col as f64 + 0.5)
}

/// 10x10 grid of value 5.0 except pixel (0, 0), which is the sentinel.
pub fn sentinel_corner_10x10() -> GeoTiffBuilder {
    let data = with_cells(create_constant_grid(10, 10, 5.0), 10, &[(0, 0)], NODATA_SENTINEL);
    GeoTiffBuilder::new(10, 10).data(data)
}

/// 2x2 grid holding 1, 2, 3, 4.
pub fn four_pixels() -> GeoTiffBuilder {
    GeoTiffBuilder::new(2, 2).data(vec![1.0, 2.0, 3.0, 4.0])
}

/// 10x10 grid where pixel `(row, col)` holds `row * 10 + col`, split into
/// three-row strips.
pub fn sequential_10x10() -> GeoTiffBuilder {
    GeoTiffBuilder::new(10, 10)
        .data(create_sequential_grid(10, 10))
        .rows_per_strip(3)
}

/// 300x300 grid where pixel `(row, col)` holds `row * 300 + col`, stored as
/// 256x256 tiles so the right and bottom tiles are padded.
pub fn sequential_tiled_300x300() -> GeoTiffBuilder {
    GeoTiffBuilder::new(300, 300)
        .data(create_sequential_grid(300, 300))
        .tile_size(256)
}

/// 4x4 grid made entirely of the sentinel.
pub fn all_nodata_4x4() -> GeoTiffBuilder {
    GeoTiffBuilder::new(4, 4).data(create_constant_grid(4, 4, NODATA_SENTINEL))
}
