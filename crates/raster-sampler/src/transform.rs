//! Affine grid transforms and pixel indexing.

use raster_common::BoundingBox;
use serde::{Deserialize, Serialize};

/// Integer grid indices relative to one raster.
///
/// Signed so that coordinates west/north of the raster origin produce
/// negative indices; bounds are checked when the pixel is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RasterIndex {
    pub row: i64,
    pub col: i64,
}

impl RasterIndex {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Euclidean distance to another index, in grid cells.
    pub fn distance_to(&self, other: &RasterIndex) -> f64 {
        ((other.row - self.row) as f64).hypot((other.col - self.col) as f64)
    }
}

/// Affine mapping from grid (col, row) to CRS (x, y), GDAL coefficient order.
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    /// Negative for north-up rasters.
    pub pixel_height: f64,
}

impl GeoTransform {
    /// A north-up transform with no rotation.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    /// Build from GeoTIFF ModelTiepoint + ModelPixelScale tags.
    ///
    /// The tie point maps raster `(i, j)` to model `(x, y)`; the scale's Y
    /// component is positive and counts downward.
    pub fn from_tiepoint_and_scale(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        if tiepoint.len() < 6 || scale.len() < 2 {
            return None;
        }
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);
        if sx == 0.0 || sy == 0.0 {
            return None;
        }

        Some(Self::north_up(x - i * sx, y + j * sy, sx, -sy))
    }

    /// Build from a 4x4 row-major GeoTIFF ModelTransformation matrix.
    pub fn from_model_transformation(matrix: &[f64]) -> Option<Self> {
        if matrix.len() < 8 {
            return None;
        }
        Some(Self {
            origin_x: matrix[3],
            pixel_width: matrix[0],
            row_rotation: matrix[1],
            origin_y: matrix[7],
            col_rotation: matrix[4],
            pixel_height: matrix[5],
        })
    }

    /// Shift the origin by a fraction of a pixel along both grid axes.
    pub fn shifted(&self, d_col: f64, d_row: f64) -> Self {
        let (x, y) = self.apply(d_col, d_row);
        Self {
            origin_x: x,
            origin_y: y,
            ..*self
        }
    }

    /// Forward transform of fractional grid coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// CRS coordinates of a cell center.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// Inverse transform to fractional `(col, row)`.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (self.pixel_width * dy - self.col_rotation * dx) / det;
        Some((col, row))
    }

    /// The grid cell containing `(x, y)`.
    ///
    /// Fractional coordinates are floored so a point maps to the cell whose
    /// origin-aligned bin contains it. No bounds checking is done.
    pub fn index(&self, x: f64, y: f64) -> Option<RasterIndex> {
        let (col, row) = self.invert(x, y)?;
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        Some(RasterIndex::new(row.floor() as i64, col.floor() as i64))
    }

    /// Extent of a `width` x `height` grid in CRS units.
    pub fn bounds(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        // Four corners always yield a box
        BoundingBox::from_points(corners).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }
}
