//! Raw writer for tiled GeoTIFFs.
//!
//! The `tiff` encoder only produces strips, so tiled fixtures lay out the
//! header, the directory and the tiles by hand. Edge tiles are padded to the
//! full tile size, as the format requires.

use crate::geotiff::GeoTags;

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_TILE_WIDTH: u16 = 322;
const TAG_TILE_LENGTH: u16 = 323;
const TAG_TILE_OFFSETS: u16 = 324;
const TAG_TILE_BYTE_COUNTS: u16 = 325;
const TAG_SAMPLE_FORMAT: u16 = 339;

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const DOUBLE: u16 = 12;

/// Header plus IFD offset.
const HEADER_LEN: u32 = 8;

/// One directory entry with its value encoded little-endian.
struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    value: Vec<u8>,
}

impl Entry {
    fn shorts(tag: u16, values: &[u16]) -> Self {
        let value = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self { tag, kind: SHORT, count: values.len() as u32, value }
    }

    fn longs(tag: u16, values: &[u32]) -> Self {
        let value = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self { tag, kind: LONG, count: values.len() as u32, value }
    }

    fn doubles(tag: u16, values: &[f64]) -> Self {
        let value = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self { tag, kind: DOUBLE, count: values.len() as u32, value }
    }

    fn ascii(tag: u16, text: &str) -> Self {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        Self { tag, kind: ASCII, count: value.len() as u32, value }
    }

    /// Bytes stored after the directory; values of four bytes or fewer sit
    /// in the entry itself.
    fn out_of_line_len(&self) -> u32 {
        match self.value.len() {
            0..=4 => 0,
            len => len.next_multiple_of(2) as u32,
        }
    }
}

/// Single-band `f32` image split into square tiles.
pub(crate) struct TiledImage<'a> {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub data: &'a [f32],
}

impl TiledImage<'_> {
    fn tiles_across(&self) -> u32 {
        self.width.div_ceil(self.tile_size)
    }

    fn tiles_down(&self) -> u32 {
        self.height.div_ceil(self.tile_size)
    }

    fn tile_bytes(&self) -> u32 {
        self.tile_size * self.tile_size * 4
    }

    /// Directory entries in ascending tag order.
    fn entries(&self, tile_offsets: &[u32], geo: &GeoTags) -> Vec<Entry> {
        let byte_counts = vec![self.tile_bytes(); tile_offsets.len()];
        let mut entries = vec![
            Entry::longs(TAG_IMAGE_WIDTH, &[self.width]),
            Entry::longs(TAG_IMAGE_LENGTH, &[self.height]),
            Entry::shorts(TAG_BITS_PER_SAMPLE, &[32]),
            Entry::shorts(TAG_COMPRESSION, &[1]),
            Entry::shorts(TAG_PHOTOMETRIC, &[1]),
            Entry::shorts(TAG_SAMPLES_PER_PIXEL, &[1]),
            Entry::longs(TAG_TILE_WIDTH, &[self.tile_size]),
            Entry::longs(TAG_TILE_LENGTH, &[self.tile_size]),
            Entry::longs(TAG_TILE_OFFSETS, tile_offsets),
            Entry::longs(TAG_TILE_BYTE_COUNTS, &byte_counts),
            // IEEE floating point
            Entry::shorts(TAG_SAMPLE_FORMAT, &[3]),
            Entry::doubles(GeoTags::PIXEL_SCALE, &geo.pixel_scale),
            Entry::doubles(GeoTags::TIEPOINT, &geo.tiepoint),
            Entry::shorts(GeoTags::GEO_KEY_DIRECTORY, &geo.geokeys),
        ];
        if let Some(nodata) = &geo.nodata {
            entries.push(Entry::ascii(GeoTags::GDAL_NODATA, nodata));
        }
        entries
    }

    /// Encode as a little-endian TIFF: header, one IFD, its out-of-line
    /// values, then the tiles in row-major order.
    pub fn encode(&self, geo: &GeoTags) -> Vec<u8> {
        let tile_count = (self.tiles_across() * self.tiles_down()) as usize;

        // Entry sizes do not depend on the offsets, so size the directory first
        let sizing = self.entries(&vec![0; tile_count], geo);
        let directory_len = 2 + 12 * sizing.len() as u32 + 4;
        let values_len: u32 = sizing.iter().map(Entry::out_of_line_len).sum();
        let tiles_start = HEADER_LEN + directory_len + values_len;

        let offsets: Vec<u32> = (0..tile_count as u32)
            .map(|i| tiles_start + i * self.tile_bytes())
            .collect();
        let entries = self.entries(&offsets, geo);

        let mut out = Vec::with_capacity(tiles_start as usize + tile_count * self.tile_bytes() as usize);
        out.extend_from_slice(b"II");
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&HEADER_LEN.to_le_bytes());

        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        let mut values = Vec::with_capacity(values_len as usize);
        for entry in &entries {
            out.extend_from_slice(&entry.tag.to_le_bytes());
            out.extend_from_slice(&entry.kind.to_le_bytes());
            out.extend_from_slice(&entry.count.to_le_bytes());
            if entry.out_of_line_len() == 0 {
                let mut inline = [0u8; 4];
                inline[..entry.value.len()].copy_from_slice(&entry.value);
                out.extend_from_slice(&inline);
            } else {
                let offset = HEADER_LEN + directory_len + values.len() as u32;
                out.extend_from_slice(&offset.to_le_bytes());
                values.extend_from_slice(&entry.value);
                values.resize(values.len().next_multiple_of(2), 0);
            }
        }
        // No further IFDs
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&values);
        assert_eq!(out.len(), tiles_start as usize, "directory layout");

        let (width, height, size) = (self.width as usize, self.height as usize, self.tile_size as usize);
        for tile_row in 0..self.tiles_down() as usize {
            for tile_col in 0..self.tiles_across() as usize {
                for r in 0..size {
                    for c in 0..size {
                        let (row, col) = (tile_row * size + r, tile_col * size + c);
                        let value = if row < height && col < width {
                            self.data[row * width + col]
                        } else {
                            0.0
                        };
                        out.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
        }
        out
    }
}
