//! Grid generators for synthetic rasters.
//!
//! Values are predictable so tests can assert exact pixel reads.

/// Creates a grid where each cell is `row * width + col`.
///
/// # Example
///
/// ```
/// use test_utils::create_sequential_grid;
///
/// let grid = create_sequential_grid(4, 3);
/// assert_eq!(grid.len(), 12);
/// assert_eq!(grid[5], 5.0); // row 1, col 1
/// ```
pub fn create_sequential_grid(width: usize, height: usize) -> Vec<f32> {
    (0..width * height).map(|i| i as f32).collect()
}

/// Creates a grid filled with a single value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a gradient grid resembling chlorophyll concentration (mg/m^3),
/// rising from 0.5 at the upper-left to about 20 at the lower-right.
pub fn create_chlorophyll_grid(width: usize, height: usize) -> Vec<f32> {
    let span = (width + height).saturating_sub(2).max(1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(0.5 + 19.5 * (row + col) as f32 / span);
        }
    }
    data
}

/// Overwrite the listed `(row, col)` cells with `value`.
pub fn with_cells(mut grid: Vec<f32>, width: usize, cells: &[(usize, usize)], value: f32) -> Vec<f32> {
    for &(row, col) in cells {
        grid[row * width + col] = value;
    }
    grid
}
