//! GeoTIFF fixture writer.
//!
//! Produces single-band `f32` GeoTIFFs with pixel scale, tie point, GeoKey
//! directory and optional GDAL nodata tags, so tests can exercise the real
//! decoding path without external data files. Images are stripped by
//! default; [`GeoTiffBuilder::tile_size`] switches to square tiles.

use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use crate::tiled::TiledImage;

/// Georeferencing tag values shared by the stripped and tiled writers.
pub(crate) struct GeoTags {
    pub pixel_scale: [f64; 3],
    pub tiepoint: [f64; 6],
    pub geokeys: Vec<u16>,
    pub nodata: Option<String>,
}

impl GeoTags {
    pub const PIXEL_SCALE: u16 = 33550;
    pub const TIEPOINT: u16 = 33922;
    pub const GEO_KEY_DIRECTORY: u16 = 34735;
    pub const GDAL_NODATA: u16 = 42113;
}

/// Builder for a synthetic single-band GeoTIFF.
///
/// Defaults: all-zero data, upper-left corner at `(0, height)`, 1x1 unit
/// pixels, EPSG:4326, no declared nodata, area-registered.
///
/// # Example
///
/// ```
/// use test_utils::GeoTiffBuilder;
///
/// let bytes = GeoTiffBuilder::new(4, 3)
///     .origin(-73.0, 41.3)
///     .pixel_size(0.01, 0.01)
///     .fill_with(|row, col| (row * 4 + col) as f32)
///     .to_bytes();
/// assert_eq!(&bytes[..2], b"II");
/// ```
#[derive(Debug, Clone)]
pub struct GeoTiffBuilder {
    width: u32,
    height: u32,
    data: Vec<f32>,
    origin: (f64, f64),
    pixel_size: (f64, f64),
    epsg: u16,
    nodata: Option<f64>,
    rows_per_strip: Option<u32>,
    tile_size: Option<u32>,
    pixel_is_point: bool,
}

impl GeoTiffBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
            origin: (0.0, height as f64),
            pixel_size: (1.0, 1.0),
            epsg: 4326,
            nodata: None,
            rows_per_strip: None,
            tile_size: None,
            pixel_is_point: false,
        }
    }

    /// Replace the pixel data (row-major, `width * height` values).
    pub fn data(mut self, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            self.width as usize * self.height as usize,
            "data length must equal width * height"
        );
        self.data = data;
        self
    }

    /// Fill every pixel from its `(row, col)`.
    pub fn fill_with(mut self, f: impl Fn(usize, usize) -> f32) -> Self {
        let width = self.width as usize;
        for (i, value) in self.data.iter_mut().enumerate() {
            *value = f(i / width, i % width);
        }
        self
    }

    /// Set one pixel.
    pub fn pixel(mut self, row: usize, col: usize, value: f32) -> Self {
        self.data[row * self.width as usize + col] = value;
        self
    }

    /// Model coordinates of the upper-left corner of pixel (0, 0).
    pub fn origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    /// Pixel width and (positive, downward) height in CRS units.
    pub fn pixel_size(mut self, width: f64, height: f64) -> Self {
        self.pixel_size = (width, height);
        self
    }

    pub fn epsg(mut self, code: u16) -> Self {
        self.epsg = code;
        self
    }

    /// Declare a GDAL nodata value.
    pub fn nodata(mut self, value: f64) -> Self {
        self.nodata = Some(value);
        self
    }

    /// Split the image into strips of `rows` rows.
    pub fn rows_per_strip(mut self, rows: u32) -> Self {
        self.rows_per_strip = Some(rows);
        self
    }

    /// Store the image as `size x size` tiles instead of strips.
    ///
    /// Edge tiles are padded with zeros. Overrides [`Self::rows_per_strip`].
    pub fn tile_size(mut self, size: u32) -> Self {
        assert!(size > 0 && size % 16 == 0, "tile size must be a multiple of 16");
        self.tile_size = Some(size);
        self
    }

    /// Tie the origin to the center of pixel (0, 0) instead of its corner.
    pub fn pixel_is_point(mut self) -> Self {
        self.pixel_is_point = true;
        self
    }

    fn geokeys(&self) -> Vec<u16> {
        let geographic = (4000..5000).contains(&self.epsg);
        let (model_type, crs_key) = if geographic { (2, 2048) } else { (1, 3072) };
        let raster_type = if self.pixel_is_point { 2 } else { 1 };
        vec![
            1, 1, 0, 3, //
            1024, 0, 1, model_type, //
            1025, 0, 1, raster_type, //
            crs_key, 0, 1, self.epsg,
        ]
    }

    fn geo_tags(&self) -> GeoTags {
        let (x, y) = self.origin;
        let (sx, sy) = self.pixel_size;
        GeoTags {
            pixel_scale: [sx, sy, 0.0],
            tiepoint: [0.0, 0.0, 0.0, x, y, 0.0],
            geokeys: self.geokeys(),
            nodata: self.nodata.map(|value| value.to_string()),
        }
    }

    /// Encode to little-endian TIFF bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let geo = self.geo_tags();
        if let Some(tile_size) = self.tile_size {
            let image = TiledImage {
                width: self.width,
                height: self.height,
                tile_size,
                data: &self.data,
            };
            return image.encode(&geo);
        }

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buffer).expect("create TIFF encoder");
            let mut image = encoder
                .new_image::<colortype::Gray32Float>(self.width, self.height)
                .expect("create TIFF image");

            if let Some(rows) = self.rows_per_strip {
                image.rows_per_strip(rows).expect("set rows per strip");
            }

            let tags = image.encoder();
            tags.write_tag(Tag::from_u16_exhaustive(GeoTags::PIXEL_SCALE), &geo.pixel_scale[..])
                .expect("write pixel scale");
            tags.write_tag(Tag::from_u16_exhaustive(GeoTags::TIEPOINT), &geo.tiepoint[..])
                .expect("write tie point");
            tags.write_tag(
                Tag::from_u16_exhaustive(GeoTags::GEO_KEY_DIRECTORY),
                &geo.geokeys[..],
            )
            .expect("write GeoKey directory");
            if let Some(nodata) = &geo.nodata {
                tags.write_tag(Tag::from_u16_exhaustive(GeoTags::GDAL_NODATA), nodata.as_str())
                    .expect("write nodata");
            }

            image.write_data(&self.data).expect("write pixel data");
        }
        buffer.into_inner()
    }

    /// Write the encoded GeoTIFF to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) {
        std::fs::write(path, self.to_bytes()).expect("write GeoTIFF fixture");
    }

    /// Write to a temporary `.tif` file removed when the handle drops.
    pub fn write_temp(&self) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".tif")
            .tempfile()
            .expect("create temp file");
        file.write_all(&self.to_bytes()).expect("write GeoTIFF fixture");
        file.flush().expect("flush GeoTIFF fixture");
        file
    }
}
