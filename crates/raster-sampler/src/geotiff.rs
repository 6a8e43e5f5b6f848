//! Single-band GeoTIFF access.
//!
//! Reads the georeferencing tags (pixel scale, tie point or model
//! transformation, GeoKey directory, GDAL nodata) and serves windowed reads
//! by decoding only the strips or tiles a window touches.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use bytes::Bytes;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

use raster_common::{BoundingBox, Crs};

use crate::error::{Result, SamplerError};
use crate::transform::{GeoTransform, RasterIndex};

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;
const TAG_PLANAR_CONFIGURATION: u16 = 284;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u32 = 1;
const MODEL_TYPE_GEOGRAPHIC: u32 = 2;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const USER_DEFINED: u32 = 32767;

/// Georeferencing and shape of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMetadata {
    pub width: u32,
    pub height: u32,
    pub transform: GeoTransform,
    pub crs: Crs,
    /// Declared nodata value (GDAL_NODATA tag), if any.
    pub nodata: Option<f64>,
}

impl RasterMetadata {
    /// Raster extent in its own CRS.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Check whether an index lies on the grid.
    pub fn contains(&self, index: RasterIndex) -> bool {
        index.row >= 0
            && index.col >= 0
            && index.row < self.height as i64
            && index.col < self.width as i64
    }
}

/// A rectangular block of pixels, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row_off: u32,
    pub col_off: u32,
    pub rows: u32,
    pub cols: u32,
}

impl Window {
    pub fn new(row_off: u32, col_off: u32, rows: u32, cols: u32) -> Self {
        Self {
            row_off,
            col_off,
            rows,
            cols,
        }
    }

    /// The one-pixel window at `index`, if the index is non-negative.
    pub fn pixel(index: RasterIndex) -> Option<Self> {
        let row = u32::try_from(index.row).ok()?;
        let col = u32::try_from(index.col).ok()?;
        Some(Self::new(row, col, 1, 1))
    }

    /// Clip `rows` x `cols` at the origin to a raster of the given size.
    pub fn origin_clipped(rows: u32, cols: u32, height: u32, width: u32) -> Self {
        Self::new(0, 0, rows.min(height), cols.min(width))
    }

    fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

/// Strip or tile layout of the first band.
#[derive(Debug, Clone, Copy)]
struct ChunkLayout {
    chunk_width: u32,
    chunk_height: u32,
    chunks_across: u32,
    /// Interleaved samples per pixel within a chunk.
    samples: usize,
}

/// An open single-band GeoTIFF.
pub struct RasterDataset<R: Read + Seek> {
    decoder: Decoder<R>,
    metadata: RasterMetadata,
    layout: ChunkLayout,
    /// Most recently decoded chunk of band 1.
    last_chunk: Option<(u32, Vec<f64>)>,
}

impl RasterDataset<Cursor<Bytes>> {
    /// Open a GeoTIFF held in memory.
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        Self::open(Cursor::new(bytes))
    }
}

impl RasterDataset<BufReader<File>> {
    /// Open a GeoTIFF on the local filesystem.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> RasterDataset<R> {
    /// Parse the TIFF header and georeferencing tags.
    pub fn open(reader: R) -> Result<Self> {
        let mut decoder = Decoder::new(reader)
            .map_err(|e| SamplerError::open_failed(format!("not a readable TIFF: {e}")))?
            .with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions()?;
        if width == 0 || height == 0 {
            return Err(SamplerError::invalid_metadata("raster has zero size"));
        }

        let layout = read_layout(&mut decoder, width)?;
        let geokeys = read_geokeys(&mut decoder)?;
        let transform = read_transform(&mut decoder, &geokeys)?;
        let crs = crs_from_geokeys(&geokeys)?;
        let nodata = read_nodata(&mut decoder)?;

        debug!(
            width,
            height,
            crs = %crs,
            nodata = ?nodata,
            chunk_width = layout.chunk_width,
            chunk_height = layout.chunk_height,
            "Opened raster"
        );

        Ok(Self {
            decoder,
            metadata: RasterMetadata {
                width,
                height,
                transform,
                crs,
                nodata,
            },
            layout,
            last_chunk: None,
        })
    }

    pub fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    /// Read one pixel of band 1.
    pub fn read_pixel(&mut self, index: RasterIndex) -> Result<f64> {
        let window = Window::pixel(index)
            .filter(|_| self.metadata.contains(index))
            .ok_or(SamplerError::OutOfBounds {
                row: index.row,
                col: index.col,
                width: self.metadata.width,
                height: self.metadata.height,
            })?;

        let values = self.read_window(window)?;
        values
            .first()
            .copied()
            .ok_or_else(|| SamplerError::read_failed("empty pixel window"))
    }

    /// Read the whole of band 1, row-major.
    pub fn read_band(&mut self) -> Result<Vec<f64>> {
        let window = Window::new(0, 0, self.metadata.height, self.metadata.width);
        self.read_window(window)
    }

    /// Read a window of band 1, row-major.
    ///
    /// Only chunks overlapping the window are decoded.
    pub fn read_window(&mut self, window: Window) -> Result<Vec<f64>> {
        let RasterMetadata { width, height, .. } = self.metadata;
        let row_end = window.row_off as u64 + window.rows as u64;
        let col_end = window.col_off as u64 + window.cols as u64;
        if window.rows == 0 || window.cols == 0 || row_end > height as u64 || col_end > width as u64
        {
            return Err(SamplerError::OutOfBounds {
                row: row_end as i64 - 1,
                col: col_end as i64 - 1,
                width,
                height,
            });
        }
        let (row_end, col_end) = (row_end as u32, col_end as u32);

        let ChunkLayout {
            chunk_width: cw,
            chunk_height: ch,
            chunks_across,
            samples,
        } = self.layout;

        let mut out = vec![f64::NAN; window.len()];

        for chunk_row in window.row_off / ch..=(row_end - 1) / ch {
            for chunk_col in window.col_off / cw..=(col_end - 1) / cw {
                let chunk_index = chunk_row * chunks_across + chunk_col;
                let values = self.chunk(chunk_index)?;

                let row0 = chunk_row * ch;
                let col0 = chunk_col * cw;
                let data_width = cw.min(width - col0) as usize;
                let data_height = ch.min(height - row0) as usize;

                // Edge chunks come back either padded to the full chunk or cropped
                let stride = if values.len() >= cw as usize * ch as usize * samples {
                    cw as usize
                } else {
                    data_width
                };
                if values.len() < ((data_height - 1) * stride + data_width) * samples {
                    return Err(SamplerError::read_failed(format!(
                        "chunk {chunk_index} decoded to {} samples",
                        values.len()
                    )));
                }

                let r_start = window.row_off.max(row0);
                let r_end = row_end.min(row0 + data_height as u32);
                let c_start = window.col_off.max(col0);
                let c_end = col_end.min(col0 + data_width as u32);

                for r in r_start..r_end {
                    let src_row = (r - row0) as usize * stride;
                    let dst_row = (r - window.row_off) as usize * window.cols as usize;
                    for c in c_start..c_end {
                        let src = (src_row + (c - col0) as usize) * samples;
                        out[dst_row + (c - window.col_off) as usize] = values[src];
                    }
                }
            }
        }

        Ok(out)
    }

    fn chunk(&mut self, index: u32) -> Result<&[f64]> {
        let cached = matches!(&self.last_chunk, Some((i, _)) if *i == index);
        if !cached {
            let values = decoding_to_f64(self.decoder.read_chunk(index)?);
            self.last_chunk = Some((index, values));
        }
        Ok(self
            .last_chunk
            .as_ref()
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[]))
    }
}

fn read_layout<R: Read + Seek>(decoder: &mut Decoder<R>, width: u32) -> Result<ChunkLayout> {
    let channels = match decoder.colortype()? {
        ColorType::Gray(_) | ColorType::Palette(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) | ColorType::YCbCr(_) => 3,
        ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
    };

    let planar = optional_u32(decoder, TAG_PLANAR_CONFIGURATION)?.unwrap_or(1);
    // Separate planes store band 1 alone in the first chunks
    let samples = if planar == 2 { 1 } else { channels };

    let (chunk_width, chunk_height) = decoder.chunk_dimensions();
    if chunk_width == 0 || chunk_height == 0 {
        return Err(SamplerError::invalid_metadata("zero-sized chunks"));
    }

    Ok(ChunkLayout {
        chunk_width,
        chunk_height,
        chunks_across: width.div_ceil(chunk_width),
        samples,
    })
}

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn optional_u32<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<u32>> {
    if decoder.find_tag(tag(code))?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_u32(tag(code))?))
}

fn optional_f64_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> Result<Option<Vec<f64>>> {
    if decoder.find_tag(tag(code))?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_f64_vec(tag(code))?))
}

/// Inline-valued GeoKeys (key id -> value).
fn read_geokeys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<HashMap<u16, u32>> {
    if decoder.find_tag(tag(TAG_GEO_KEY_DIRECTORY))?.is_none() {
        return Err(SamplerError::invalid_metadata("missing GeoKeyDirectory tag"));
    }
    let directory = decoder.get_tag_u32_vec(tag(TAG_GEO_KEY_DIRECTORY))?;
    Ok(parse_geokey_directory(&directory))
}

fn parse_geokey_directory(directory: &[u32]) -> HashMap<u16, u32> {
    let mut keys = HashMap::new();
    if directory.len() < 4 {
        return keys;
    }
    let count = directory[3] as usize;
    for entry in directory[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // Location 0 means the value is stored inline
        if location == 0 {
            if let Ok(key) = u16::try_from(key) {
                keys.insert(key, value);
            }
        }
    }
    keys
}

fn crs_from_geokeys(keys: &HashMap<u16, u32>) -> Result<Crs> {
    let projected = keys.get(&KEY_PROJECTED_CS_TYPE).copied();
    let geographic = keys.get(&KEY_GEOGRAPHIC_TYPE).copied();

    let code = match keys.get(&KEY_MODEL_TYPE).copied() {
        Some(MODEL_TYPE_PROJECTED) => projected,
        Some(MODEL_TYPE_GEOGRAPHIC) => geographic,
        _ => projected.or(geographic),
    }
    .ok_or_else(|| SamplerError::invalid_metadata("GeoKeys carry no EPSG code"))?;

    if code == USER_DEFINED {
        return Err(SamplerError::invalid_metadata(
            "user-defined CRS is not supported",
        ));
    }

    u16::try_from(code)
        .map(Crs::from_epsg)
        .map_err(|_| SamplerError::invalid_metadata(format!("invalid EPSG code {code}")))
}

fn read_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    geokeys: &HashMap<u16, u32>,
) -> Result<GeoTransform> {
    let transform = if let Some(matrix) = optional_f64_vec(decoder, TAG_MODEL_TRANSFORMATION)? {
        GeoTransform::from_model_transformation(&matrix)
    } else {
        let tiepoint = optional_f64_vec(decoder, TAG_MODEL_TIEPOINT)?;
        let scale = optional_f64_vec(decoder, TAG_MODEL_PIXEL_SCALE)?;
        match (tiepoint, scale) {
            (Some(tiepoint), Some(scale)) => GeoTransform::from_tiepoint_and_scale(&tiepoint, &scale),
            _ => None,
        }
    }
    .ok_or_else(|| SamplerError::invalid_metadata("missing or degenerate geotransform"))?;

    // Point-registered rasters tie the model coordinate to the pixel center
    if geokeys.get(&KEY_RASTER_TYPE) == Some(&RASTER_PIXEL_IS_POINT) {
        return Ok(transform.shifted(-0.5, -0.5));
    }
    Ok(transform)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    if decoder.find_tag(tag(TAG_GDAL_NODATA))?.is_none() {
        return Ok(None);
    }
    let text = decoder.get_tag_ascii_string(tag(TAG_GDAL_NODATA))?;
    Ok(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
}

fn decoding_to_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geokey_directory() {
        let directory = [
            1, 1, 0, 3, //
            1024, 0, 1, 1, //
            1025, 0, 1, 1, //
            3072, 0, 1, 32633,
        ];
        let keys = parse_geokey_directory(&directory);
        assert_eq!(keys.get(&KEY_MODEL_TYPE), Some(&1));
        assert_eq!(crs_from_geokeys(&keys).unwrap(), Crs::from_epsg(32633));
    }

    #[test]
    fn test_geographic_model_type() {
        let directory = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        let keys = parse_geokey_directory(&directory);
        assert_eq!(crs_from_geokeys(&keys).unwrap(), Crs::WGS84);
    }

    #[test]
    fn test_user_defined_crs_rejected() {
        let directory = [1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32767];
        let keys = parse_geokey_directory(&directory);
        assert!(crs_from_geokeys(&keys).is_err());
    }

    #[test]
    fn test_window_pixel_rejects_negative() {
        assert!(Window::pixel(RasterIndex::new(-1, 0)).is_none());
        assert_eq!(
            Window::pixel(RasterIndex::new(2, 3)),
            Some(Window::new(2, 3, 1, 1))
        );
    }

    #[test]
    fn test_origin_clipped() {
        assert_eq!(Window::origin_clipped(256, 256, 10, 20), Window::new(0, 0, 10, 20));
    }
}
