//! Pixel decoding for single-band grids
//!
//! Reads the strips or tiles of an IFD, decompresses them, reverses the
//! predictor and converts the first band into `f64` cells in row-major order.

use log::{debug, info};
use std::fmt;
use std::io::SeekFrom;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;
use crate::utils::predictor_utils;

/// Largest grid the decoder accepts, in cells
pub const MAX_CELLS: usize = 200_000_000;

/// Numeric type of the stored samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Sample type from BitsPerSample and SampleFormat
    pub fn from_tags(bits: u64, format: u64) -> TiffResult<Self> {
        let format = format as u16;
        match (format, bits) {
            (sample_format::UNSIGNED, 8) => Ok(SampleType::U8),
            (sample_format::UNSIGNED, 16) => Ok(SampleType::U16),
            (sample_format::UNSIGNED, 32) => Ok(SampleType::U32),
            (sample_format::SIGNED, 8) => Ok(SampleType::I8),
            (sample_format::SIGNED, 16) => Ok(SampleType::I16),
            (sample_format::SIGNED, 32) => Ok(SampleType::I32),
            (sample_format::IEEEFP, 32) => Ok(SampleType::F32),
            (sample_format::IEEEFP, 64) => Ok(SampleType::F64),
            _ => Err(TiffError::UnsupportedSampleLayout(format!(
                "{} bits with sample format {}", bits, format
            ))),
        }
    }

    /// Width of one sample in bits
    pub fn bits(&self) -> u32 {
        match self {
            SampleType::U8 | SampleType::I8 => 8,
            SampleType::U16 | SampleType::I16 => 16,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 32,
            SampleType::F64 => 64,
        }
    }

    /// Width of one sample in bytes
    pub fn bytes(&self) -> usize {
        self.bits() as usize / 8
    }

    /// SampleFormat tag value
    pub fn format_code(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => sample_format::UNSIGNED,
            SampleType::I8 | SampleType::I16 | SampleType::I32 => sample_format::SIGNED,
            SampleType::F32 | SampleType::F64 => sample_format::IEEEFP,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Interprets a raw sample word as a cell value
    pub fn to_f64(&self, word: u64) -> f64 {
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => word as f64,
            SampleType::I8 => word as u8 as i8 as f64,
            SampleType::I16 => word as u16 as i16 as f64,
            SampleType::I32 => word as u32 as i32 as f64,
            SampleType::F32 => f32::from_bits(word as u32) as f64,
            SampleType::F64 => f64::from_bits(word),
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::U8 => "uint8",
            SampleType::U16 => "uint16",
            SampleType::U32 => "uint32",
            SampleType::I8 => "int8",
            SampleType::I16 => "int16",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        };
        write!(f, "{}", name)
    }
}

/// Pixel layout of an IFD
#[derive(Debug, Clone)]
pub struct SampleLayout {
    pub width: usize,
    pub height: usize,
    pub sample_type: SampleType,
    pub samples_per_pixel: usize,
    pub planar_configuration: u16,
    pub compression: u64,
    pub predictor: u16,
}

impl SampleLayout {
    /// Reads the layout tags of an IFD
    pub fn from_ifd(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        if width == 0 || height == 0 {
            return Err(TiffError::MissingDimensions);
        }

        let bits = first_value(tiff_reader, reader, ifd, tags::BITS_PER_SAMPLE, 1)?;
        let format = first_value(tiff_reader, reader, ifd, tags::SAMPLE_FORMAT, sample_format::UNSIGNED as u64)?;
        let sample_type = SampleType::from_tags(bits, format)?;

        let layout = SampleLayout {
            width: usize::try_from(width).map_err(|_| too_large(width, height))?,
            height: usize::try_from(height).map_err(|_| too_large(width, height))?,
            sample_type,
            samples_per_pixel: ifd.get_samples_per_pixel().max(1) as usize,
            planar_configuration: ifd.get_tag_value(tags::PLANAR_CONFIGURATION)
                .unwrap_or(planar_config::CHUNKY as u64) as u16,
            compression: ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1),
            predictor: ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16,
        };

        match layout.width.checked_mul(layout.height) {
            Some(cells) if cells <= MAX_CELLS => {},
            _ => return Err(too_large(width, height)),
        }
        layout.chunk_len(layout.width, 1)?;

        Ok(layout)
    }

    /// Decoded size in bytes of a strip or tile of `cols` x `rows` pixels
    ///
    /// Chunks are bounded like whole grids, so a tile size read from a
    /// corrupt header cannot drive an allocation either.
    pub fn chunk_len(&self, cols: usize, rows: usize) -> TiffResult<usize> {
        let pixels = cols.checked_mul(rows)
            .filter(|&p| p <= MAX_CELLS)
            .ok_or_else(|| TiffError::ImageTooLarge(format!("{}x{} chunk", cols, rows)))?;

        pixels.checked_mul(self.chunk_samples_per_pixel())
            .and_then(|samples| samples.checked_mul(self.sample_type.bytes()))
            .ok_or_else(|| TiffError::ImageTooLarge(format!(
                "{}x{} chunk of {} samples per pixel", cols, rows, self.samples_per_pixel
            )))
    }

    /// Samples interleaved per pixel inside one strip or tile
    fn chunk_samples_per_pixel(&self) -> usize {
        if self.planar_configuration == planar_config::CHUNKY {
            self.samples_per_pixel
        } else {
            1
        }
    }
}

fn too_large(width: u64, height: u64) -> TiffError {
    TiffError::ImageTooLarge(format!("{}x{} cells, at most {} supported", width, height, MAX_CELLS))
}

/// First value of a possibly multi-valued tag, or a default when absent
fn first_value(
    tiff_reader: &TiffReader,
    reader: &mut dyn SeekableReader,
    ifd: &IFD,
    tag: u16,
    default: u64,
) -> TiffResult<u64> {
    if !ifd.has_tag(tag) {
        return Ok(default);
    }
    let values = tiff_reader.read_tag_values(reader, ifd, tag)?;
    Ok(values.first().copied().unwrap_or(default))
}

/// The first band of an image as `f64` cells
#[derive(Debug, Clone)]
pub struct DecodedBand {
    pub width: usize,
    pub height: usize,
    pub sample_type: SampleType,
    /// Row-major cell values
    pub values: Vec<f64>,
}

/// Decodes the first band of an IFD
pub struct BandDecoder<'a> {
    tiff_reader: &'a TiffReader,
    ifd: &'a IFD,
}

impl<'a> BandDecoder<'a> {
    pub fn new(tiff_reader: &'a TiffReader, ifd: &'a IFD) -> Self {
        BandDecoder { tiff_reader, ifd }
    }

    /// Decodes every strip or tile of the image
    pub fn decode(&self, reader: &mut dyn SeekableReader) -> TiffResult<DecodedBand> {
        let layout = SampleLayout::from_ifd(self.tiff_reader, reader, self.ifd)?;
        let handler = CompressionFactory::create_handler(layout.compression)?;
        info!("Decoding {}x{} {} band ({} compression, predictor {})",
              layout.width, layout.height, layout.sample_type, handler.name(), layout.predictor);

        if layout.predictor == predictor::HORIZONTAL_DIFFERENCING && layout.sample_type.is_float() {
            return Err(TiffError::UnsupportedSampleLayout(
                "horizontal predictor on floating point samples".to_string(),
            ));
        }
        if layout.predictor == predictor::FLOATING_POINT && !layout.sample_type.is_float() {
            return Err(TiffError::UnsupportedSampleLayout(
                "floating point predictor on integer samples".to_string(),
            ));
        }

        // bounded by from_ifd; the reservation can still fail on a small host
        let cells = layout.width * layout.height;
        let mut values = Vec::new();
        values.try_reserve_exact(cells)
            .map_err(|e| TiffError::ImageTooLarge(format!("{} cells: {}", cells, e)))?;
        values.resize(cells, 0.0);

        let mut band = DecodedBand {
            width: layout.width,
            height: layout.height,
            sample_type: layout.sample_type,
            values,
        };

        if self.ifd.is_tiled() {
            self.decode_tiles(reader, &layout, handler.as_ref(), &mut band)?;
        } else {
            self.decode_strips(reader, &layout, handler.as_ref(), &mut band)?;
        }

        Ok(band)
    }

    fn decode_strips(
        &self,
        reader: &mut dyn SeekableReader,
        layout: &SampleLayout,
        handler: &dyn CompressionHandler,
        band: &mut DecodedBand,
    ) -> TiffResult<()> {
        let rows_per_strip = self.ifd.get_tag_value(tags::ROWS_PER_STRIP)
            .unwrap_or(layout.height as u64)
            .clamp(1, layout.height as u64) as usize;
        let offsets = self.tiff_reader.read_tag_values(reader, self.ifd, tags::STRIP_OFFSETS)?;
        let byte_counts = self.tiff_reader.read_tag_values(reader, self.ifd, tags::STRIP_BYTE_COUNTS)?;

        // separate planes store the first band in the leading strips
        let strips_per_band = layout.height.div_ceil(rows_per_strip);
        if offsets.len() < strips_per_band || byte_counts.len() < strips_per_band {
            return Err(TiffError::GenericError(format!(
                "Expected {} strips, found {} offsets and {} byte counts",
                strips_per_band, offsets.len(), byte_counts.len()
            )));
        }
        debug!("Rows per strip: {}, strips: {}", rows_per_strip, strips_per_band);

        let spp = layout.chunk_samples_per_pixel();
        let row_bytes = layout.chunk_len(layout.width, 1)?;

        for strip in 0..strips_per_band {
            let first_row = strip * rows_per_strip;
            let rows = rows_per_strip.min(layout.height - first_row);
            let data = self.read_chunk(reader, handler, offsets[strip], byte_counts[strip], layout.chunk_len(layout.width, rows)?)?;

            if data.len() < rows * row_bytes {
                return Err(TiffError::GenericError(format!(
                    "Strip {} holds {} bytes, expected {}", strip, data.len(), rows * row_bytes
                )));
            }

            for row in 0..rows {
                let raw = &data[row * row_bytes..(row + 1) * row_bytes];
                let words = self.row_words(raw, layout, spp, layout.width)?;
                let target = (first_row + row) * layout.width;
                for x in 0..layout.width {
                    band.values[target + x] = layout.sample_type.to_f64(words[x * spp]);
                }
            }
        }

        Ok(())
    }

    fn decode_tiles(
        &self,
        reader: &mut dyn SeekableReader,
        layout: &SampleLayout,
        handler: &dyn CompressionHandler,
        band: &mut DecodedBand,
    ) -> TiffResult<()> {
        let tile_width = self.ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(256) as usize;
        let tile_height = self.ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(256) as usize;
        if tile_width == 0 || tile_height == 0 {
            return Err(TiffError::UnsupportedSampleLayout("zero tile size".to_string()));
        }

        let offsets = self.tiff_reader.read_tag_values(reader, self.ifd, tags::TILE_OFFSETS)?;
        let byte_counts = self.tiff_reader.read_tag_values(reader, self.ifd, tags::TILE_BYTE_COUNTS)?;

        let tiles_across = layout.width.div_ceil(tile_width);
        let tiles_down = layout.height.div_ceil(tile_height);
        let tiles_per_band = tiles_across * tiles_down;
        if offsets.len() < tiles_per_band || byte_counts.len() < tiles_per_band {
            return Err(TiffError::GenericError(format!(
                "Expected {} tiles, found {} offsets and {} byte counts",
                tiles_per_band, offsets.len(), byte_counts.len()
            )));
        }
        debug!("Tiles: {}x{} of {}x{}", tiles_across, tiles_down, tile_width, tile_height);

        let spp = layout.chunk_samples_per_pixel();
        let row_bytes = layout.chunk_len(tile_width, 1)?;
        let tile_bytes = layout.chunk_len(tile_width, tile_height)?;

        for tile_row in 0..tiles_down {
            for tile_col in 0..tiles_across {
                let index = tile_row * tiles_across + tile_col;
                let data = self.read_chunk(reader, handler, offsets[index], byte_counts[index], tile_bytes)?;
                if data.len() < tile_bytes {
                    return Err(TiffError::GenericError(format!(
                        "Tile {} holds {} bytes, expected {}", index, data.len(), tile_bytes
                    )));
                }

                let x0 = tile_col * tile_width;
                let y0 = tile_row * tile_height;
                let visible_cols = tile_width.min(layout.width - x0);
                let visible_rows = tile_height.min(layout.height - y0);

                for row in 0..visible_rows {
                    let raw = &data[row * row_bytes..(row + 1) * row_bytes];
                    let words = self.row_words(raw, layout, spp, tile_width)?;
                    let target = (y0 + row) * layout.width + x0;
                    for x in 0..visible_cols {
                        band.values[target + x] = layout.sample_type.to_f64(words[x * spp]);
                    }
                }
            }
        }

        Ok(())
    }

    /// Reads and decompresses one strip or tile
    fn read_chunk(
        &self,
        reader: &mut dyn SeekableReader,
        handler: &dyn CompressionHandler,
        offset: u64,
        byte_count: u64,
        expected_len: usize,
    ) -> TiffResult<Vec<u8>> {
        let file_size = validation::get_file_size(reader)?;
        validation::validate_block(offset, byte_count, file_size)?;

        reader.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; byte_count as usize];
        reader.read_exact(&mut compressed)?;

        handler.decompress(&compressed, expected_len)
    }

    /// Converts one row of raw bytes into sample words, predictor reversed
    fn row_words(&self, raw: &[u8], layout: &SampleLayout, spp: usize, pixels: usize) -> TiffResult<Vec<u64>> {
        let bytes = layout.sample_type.bytes();
        let samples = pixels * spp;

        if layout.predictor == predictor::FLOATING_POINT {
            let mut row = raw.to_vec();
            let ordered = predictor_utils::undo_floating_point_predictor(&mut row, spp, samples, bytes);
            return Ok(ordered.chunks_exact(bytes).map(word_from_be).collect());
        }

        let handler = self.tiff_reader.handler()?;
        let mut words: Vec<u64> = raw.chunks_exact(bytes)
            .take(samples)
            .map(|chunk| decode_word(chunk, handler))
            .collect();

        if layout.predictor == predictor::HORIZONTAL_DIFFERENCING {
            predictor_utils::apply_horizontal_predictor(&mut words, spp, layout.sample_type.bits());
        }

        Ok(words)
    }
}

/// Decodes one sample in file byte order
fn decode_word(chunk: &[u8], handler: &dyn ByteOrderHandler) -> u64 {
    match chunk.len() {
        1 => chunk[0] as u64,
        2 => handler.decode_u16(chunk) as u64,
        4 => handler.decode_u32(chunk) as u64,
        _ => handler.decode_u64(chunk),
    }
}

fn word_from_be(chunk: &[u8]) -> u64 {
    chunk.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
