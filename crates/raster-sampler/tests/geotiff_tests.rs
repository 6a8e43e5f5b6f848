//! GeoTIFF decoding tests.

use bytes::Bytes;

use raster_common::{BoundingBox, Crs};
use raster_sampler::{GeoTransform, RasterDataset, RasterIndex, SamplerError, Window};
use test_utils::{create_sequential_grid, fixtures, GeoTiffBuilder};

#[test]
fn test_metadata_from_tags() {
    let bytes = GeoTiffBuilder::new(4, 3)
        .origin(-73.5, 41.5)
        .pixel_size(0.25, 0.5)
        .nodata(-9999.0)
        .to_bytes();
    let dataset = RasterDataset::from_bytes(Bytes::from(bytes)).unwrap();
    let meta = dataset.metadata();

    assert_eq!((meta.width, meta.height), (4, 3));
    assert_eq!(meta.crs, Crs::WGS84);
    assert_eq!(meta.nodata, Some(-9999.0));
    assert_eq!(meta.transform, GeoTransform::north_up(-73.5, 41.5, 0.25, -0.5));
    assert_eq!(meta.bounds(), BoundingBox::new(-73.5, 40.0, -72.5, 41.5));
}

#[test]
fn test_projected_crs_and_no_nodata() {
    let bytes = GeoTiffBuilder::new(2, 2).epsg(32618).to_bytes();
    let dataset = RasterDataset::from_bytes(Bytes::from(bytes)).unwrap();

    assert_eq!(dataset.metadata().crs, Crs::from_epsg(32618));
    assert_eq!(dataset.metadata().nodata, None);
}

#[test]
fn test_read_window_spanning_strips() {
    let bytes = fixtures::sequential_10x10().to_bytes();
    let mut dataset = RasterDataset::from_bytes(Bytes::from(bytes)).unwrap();

    // Rows 2..6 cross the strip boundaries at rows 3 and 6
    let values = dataset.read_window(Window::new(2, 7, 4, 3)).unwrap();
    assert_eq!(
        values,
        vec![27.0, 28.0, 29.0, 37.0, 38.0, 39.0, 47.0, 48.0, 49.0, 57.0, 58.0, 59.0]
    );
}

#[test]
fn test_read_band_matches_source() {
    let bytes = fixtures::sequential_10x10().to_bytes();
    let mut dataset = RasterDataset::from_bytes(Bytes::from(bytes)).unwrap();

    let band = dataset.read_band().unwrap();
    let expected: Vec<f64> = create_sequential_grid(10, 10).into_iter().map(f64::from).collect();
    assert_eq!(band, expected);
}

#[test]
fn test_read_pixel_out_of_bounds() {
    let bytes = fixtures::four_pixels().to_bytes();
    let mut dataset = RasterDataset::from_bytes(Bytes::from(bytes)).unwrap();

    assert_eq!(dataset.read_pixel(RasterIndex::new(1, 0)).unwrap(), 3.0);
    assert!(matches!(
        dataset.read_pixel(RasterIndex::new(2, 0)),
        Err(SamplerError::OutOfBounds { .. })
    ));
    assert!(matches!(
        dataset.read_pixel(RasterIndex::new(0, -1)),
        Err(SamplerError::OutOfBounds { .. })
    ));
    assert!(dataset.read_window(Window::new(1, 1, 2, 1)).is_err());
}

#[test]
fn test_open_path() {
    let file = fixtures::four_pixels().write_temp();
    let mut dataset = RasterDataset::open_path(file.path()).unwrap();

    assert_eq!(dataset.read_band().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_pixel_is_point_shifts_origin() {
    let bytes = GeoTiffBuilder::new(2, 2).origin(10.0, 20.0).pixel_is_point().to_bytes();
    let dataset = RasterDataset::from_bytes(Bytes::from(bytes)).unwrap();

    assert_eq!(
        dataset.metadata().transform,
        GeoTransform::north_up(9.5, 20.5, 1.0, -1.0)
    );
}

// ============================================================================
// Tiled layout
// ============================================================================

fn tiled_dataset() -> RasterDataset<std::io::Cursor<Bytes>> {
    let bytes = fixtures::sequential_tiled_300x300().to_bytes();
    RasterDataset::from_bytes(Bytes::from(bytes)).unwrap()
}

fn sequential(row: u32, col: u32) -> f64 {
    (row * 300 + col) as f64
}

#[test]
fn test_tiled_pixels_on_both_sides_of_tile_edges() {
    let mut dataset = tiled_dataset();

    for (row, col) in [
        (0, 0),
        (0, 255),
        (0, 256),
        (255, 0),
        (256, 0),
        (255, 255),
        (256, 256),
        // Last pixel of the padded corner tile
        (299, 299),
        (299, 0),
        (0, 299),
        (128, 280),
    ] {
        assert_eq!(
            dataset.read_pixel(RasterIndex::new(row, col)).unwrap(),
            sequential(row as u32, col as u32),
            "pixel ({row}, {col})"
        );
    }
    assert!(dataset.read_pixel(RasterIndex::new(300, 0)).is_err());
}

#[test]
fn test_tiled_window_across_four_tiles() {
    let mut dataset = tiled_dataset();

    let values = dataset.read_window(Window::new(254, 253, 4, 5)).unwrap();
    let expected: Vec<f64> = (254..258)
        .flat_map(|row| (253..258).map(move |col| sequential(row, col)))
        .collect();
    assert_eq!(values, expected);
}

#[test]
fn test_tiled_window_inside_edge_tiles() {
    let mut dataset = tiled_dataset();

    // Right column of tiles only
    let right = dataset.read_window(Window::new(10, 290, 2, 10)).unwrap();
    let expected: Vec<f64> = (10..12)
        .flat_map(|row| (290..300).map(move |col| sequential(row, col)))
        .collect();
    assert_eq!(right, expected);

    // Bottom row of tiles only
    let bottom = dataset.read_window(Window::new(298, 100, 2, 3)).unwrap();
    assert_eq!(
        bottom,
        vec![
            sequential(298, 100),
            sequential(298, 101),
            sequential(298, 102),
            sequential(299, 100),
            sequential(299, 101),
            sequential(299, 102),
        ]
    );
}

#[test]
fn test_tiled_read_band_matches_source() {
    let mut dataset = tiled_dataset();
    let meta = dataset.metadata().clone();
    assert_eq!((meta.width, meta.height), (300, 300));
    assert_eq!(meta.crs, Crs::WGS84);

    let band = dataset.read_band().unwrap();
    let expected: Vec<f64> = create_sequential_grid(300, 300).into_iter().map(f64::from).collect();
    assert_eq!(band.len(), 90_000);
    assert_eq!(band, expected);
}
