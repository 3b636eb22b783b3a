//! Single-band GeoTIFF writer
//!
//! Writes a grid of `f64` cells as a little-endian TIFF or BigTIFF with one
//! sample per pixel, stored in strips or tiles, with optional compression,
//! horizontal predictor and GeoTIFF tags. Used for mask artifacts.

use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use crate::compression::{CompressionHandler, UncompressedHandler};
use crate::tiff::constants::{field_types, geo_codes, geo_keys, header, photometric, planar_config, predictor, tags};
use crate::tiff::decoder::SampleType;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::geo_keys::GeoReference;
use crate::utils::{tag_utils, write_utils};

/// A tag waiting to be written: payload is in little-endian order
struct PendingEntry {
    tag: u16,
    field_type: u16,
    count: u64,
    payload: Vec<u8>,
}

impl PendingEntry {
    fn new(tag: u16, field_type: u16, payload: Vec<u8>) -> Self {
        let count = (payload.len() / tag_utils::field_type_size(field_type)) as u64;
        PendingEntry { tag, field_type, count, payload }
    }

    fn short(tag: u16, value: u16) -> Self {
        Self::new(tag, field_types::SHORT, write_utils::shorts_to_bytes(&[value]))
    }

    fn long(tag: u16, value: u32) -> Self {
        Self::new(tag, field_types::LONG, write_utils::longs_to_bytes(&[value]))
    }
}

/// Writer for single-band GeoTIFF grids
pub struct GeoTiffWriter {
    width: usize,
    height: usize,
    sample_type: SampleType,
    compression: Box<dyn CompressionHandler>,
    horizontal_predictor: bool,
    rows_per_strip: usize,
    tile_size: Option<(usize, usize)>,
    big_tiff: bool,
    geo: Option<GeoReference>,
}

impl GeoTiffWriter {
    /// Uncompressed stripped writer for a `width` x `height` grid
    pub fn new(width: usize, height: usize, sample_type: SampleType) -> Self {
        GeoTiffWriter {
            width,
            height,
            sample_type,
            compression: Box::new(UncompressedHandler),
            horizontal_predictor: false,
            rows_per_strip: height.clamp(1, 64),
            tile_size: None,
            big_tiff: false,
            geo: None,
        }
    }

    pub fn with_compression(mut self, handler: Box<dyn CompressionHandler>) -> Self {
        self.compression = handler;
        self
    }

    /// Enables horizontal differencing (integer samples only)
    pub fn with_horizontal_predictor(mut self) -> Self {
        self.horizontal_predictor = true;
        self
    }

    pub fn with_rows_per_strip(mut self, rows: usize) -> Self {
        self.rows_per_strip = rows.max(1);
        self
    }

    /// Switches to a tiled layout; tile sizes must be multiples of 16
    pub fn with_tiles(mut self, tile_width: usize, tile_height: usize) -> Self {
        self.tile_size = Some((tile_width, tile_height));
        self
    }

    pub fn with_big_tiff(mut self, big_tiff: bool) -> Self {
        self.big_tiff = big_tiff;
        self
    }

    pub fn with_geo_reference(mut self, geo: GeoReference) -> Self {
        self.geo = Some(geo);
        self
    }

    /// Writes the grid to a file
    pub fn write(&self, values: &[f64], output_path: impl AsRef<Path>) -> TiffResult<()> {
        let path = output_path.as_ref();
        info!("Writing {}x{} {} GeoTIFF to {}", self.width, self.height, self.sample_type, path.display());

        let bytes = self.encode(values)?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Encodes the grid into an in-memory TIFF file
    ///
    /// Layout: header, pixel blocks, out-of-line tag payloads, then the IFD.
    pub fn encode(&self, values: &[f64]) -> TiffResult<Vec<u8>> {
        if values.len() != self.width * self.height || values.is_empty() {
            return Err(TiffError::GenericError(format!(
                "Expected {} cells for a {}x{} grid, got {}",
                self.width * self.height, self.width, self.height, values.len()
            )));
        }
        if self.horizontal_predictor && self.sample_type.is_float() {
            return Err(TiffError::UnsupportedSampleLayout(
                "horizontal predictor on floating point samples".to_string(),
            ));
        }
        if let Some((tw, th)) = self.tile_size {
            if tw == 0 || th == 0 || tw % 16 != 0 || th % 16 != 0 {
                return Err(TiffError::UnsupportedSampleLayout(format!("tile size {}x{}", tw, th)));
            }
        }

        let mut out = Cursor::new(Vec::new());
        Self::write_header(&mut out, self.big_tiff)?;

        let blocks = match self.tile_size {
            Some((tw, th)) => self.tile_blocks(values, tw, th),
            None => self.strip_blocks(values),
        };

        let mut offsets = Vec::with_capacity(blocks.len());
        let mut byte_counts = Vec::with_capacity(blocks.len());
        for block in blocks {
            let compressed = self.compression.compress(&block)?;
            offsets.push(out.position());
            byte_counts.push(compressed.len() as u64);
            out.write_all(&compressed)?;
            write_utils::write_padding(&mut out, compressed.len())?;
        }
        debug!("Wrote {} pixel blocks", offsets.len());

        let mut entries = self.build_entries(&offsets, &byte_counts);
        entries.sort_by_key(|e| e.tag);

        // out-of-line payloads
        let inline_size = if self.big_tiff { 8 } else { 4 };
        let mut value_offsets = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.payload.len() > inline_size {
                value_offsets.push(Some(out.position()));
                out.write_all(&entry.payload)?;
                write_utils::write_padding(&mut out, entry.payload.len())?;
            } else {
                value_offsets.push(None);
            }
        }

        let ifd_offset = out.position();
        self.write_ifd(&mut out, &entries, &value_offsets)?;
        Self::write_first_ifd_offset(&mut out, ifd_offset, self.big_tiff)?;

        Ok(out.into_inner())
    }

    fn write_header(writer: &mut impl Write, is_big_tiff: bool) -> TiffResult<()> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;
            writer.write_all(&[0u8; 8])?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&[0u8; 4])?;
        }

        Ok(())
    }

    fn write_first_ifd_offset(writer: &mut (impl Write + Seek), offset: u64, is_big_tiff: bool) -> TiffResult<()> {
        let position = if is_big_tiff { 8 } else { 4 };
        writer.seek(SeekFrom::Start(position))?;

        if is_big_tiff {
            writer.write_all(&offset.to_le_bytes())?;
        } else {
            let offset = u32::try_from(offset)
                .map_err(|_| TiffError::GenericError("File too large for classic TIFF".to_string()))?;
            writer.write_all(&offset.to_le_bytes())?;
        }

        writer.seek(SeekFrom::End(0))?;
        Ok(())
    }

    fn write_ifd(
        &self,
        writer: &mut impl Write,
        entries: &[PendingEntry],
        value_offsets: &[Option<u64>],
    ) -> TiffResult<()> {
        if self.big_tiff {
            writer.write_all(&(entries.len() as u64).to_le_bytes())?;
        } else {
            writer.write_all(&(entries.len() as u16).to_le_bytes())?;
        }

        for (entry, offset) in entries.iter().zip(value_offsets) {
            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;

            let slot = if self.big_tiff { 8 } else { 4 };
            let mut value = vec![0u8; slot];
            match offset {
                Some(offset) if self.big_tiff => value.copy_from_slice(&offset.to_le_bytes()),
                Some(offset) => value.copy_from_slice(&(*offset as u32).to_le_bytes()),
                None => value[..entry.payload.len()].copy_from_slice(&entry.payload),
            }

            if self.big_tiff {
                writer.write_all(&entry.count.to_le_bytes())?;
            } else {
                writer.write_all(&(entry.count as u32).to_le_bytes())?;
            }
            writer.write_all(&value)?;
        }

        // no further IFDs
        if self.big_tiff {
            writer.write_all(&0u64.to_le_bytes())?;
        } else {
            writer.write_all(&0u32.to_le_bytes())?;
        }

        Ok(())
    }

    fn build_entries(&self, offsets: &[u64], byte_counts: &[u64]) -> Vec<PendingEntry> {
        let mut entries = vec![
            PendingEntry::long(tags::IMAGE_WIDTH, self.width as u32),
            PendingEntry::long(tags::IMAGE_LENGTH, self.height as u32),
            PendingEntry::short(tags::BITS_PER_SAMPLE, self.sample_type.bits() as u16),
            PendingEntry::short(tags::COMPRESSION, self.compression.code()),
            PendingEntry::short(tags::PHOTOMETRIC_INTERPRETATION, photometric::BLACK_IS_ZERO),
            PendingEntry::short(tags::SAMPLES_PER_PIXEL, 1),
            PendingEntry::short(tags::PLANAR_CONFIGURATION, planar_config::CHUNKY),
            PendingEntry::short(tags::SAMPLE_FORMAT, self.sample_type.format_code()),
        ];

        if self.horizontal_predictor {
            entries.push(PendingEntry::short(tags::PREDICTOR, predictor::HORIZONTAL_DIFFERENCING));
        }

        let (offset_tag, count_tag) = match self.tile_size {
            Some((tw, th)) => {
                entries.push(PendingEntry::long(tags::TILE_WIDTH, tw as u32));
                entries.push(PendingEntry::long(tags::TILE_LENGTH, th as u32));
                (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
            },
            None => {
                entries.push(PendingEntry::long(tags::ROWS_PER_STRIP, self.rows_per_strip as u32));
                (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
            },
        };

        if self.big_tiff {
            entries.push(PendingEntry::new(offset_tag, field_types::LONG8, write_utils::long8s_to_bytes(offsets)));
            entries.push(PendingEntry::new(count_tag, field_types::LONG8, write_utils::long8s_to_bytes(byte_counts)));
        } else {
            let offsets: Vec<u32> = offsets.iter().map(|&o| o as u32).collect();
            let counts: Vec<u32> = byte_counts.iter().map(|&c| c as u32).collect();
            entries.push(PendingEntry::new(offset_tag, field_types::LONG, write_utils::longs_to_bytes(&offsets)));
            entries.push(PendingEntry::new(count_tag, field_types::LONG, write_utils::longs_to_bytes(&counts)));
        }

        if let Some(geo) = &self.geo {
            entries.extend(Self::geo_entries(geo));
        }

        entries
    }

    /// GeoTIFF tags for a georeference
    fn geo_entries(geo: &GeoReference) -> Vec<PendingEntry> {
        let mut entries = Vec::new();

        if let Some(scale) = geo.pixel_scale {
            entries.push(PendingEntry::new(tags::MODEL_PIXEL_SCALE_TAG, field_types::DOUBLE,
                                           write_utils::doubles_to_bytes(&scale)));
        }
        if let Some(tiepoint) = geo.tiepoint {
            entries.push(PendingEntry::new(tags::MODEL_TIEPOINT_TAG, field_types::DOUBLE,
                                           write_utils::doubles_to_bytes(&tiepoint)));
        }
        if let Some(matrix) = geo.transformation {
            entries.push(PendingEntry::new(tags::MODEL_TRANSFORMATION_TAG, field_types::DOUBLE,
                                           write_utils::doubles_to_bytes(&matrix)));
        }

        // short keys first so the well-known ones are never lost
        let mut shorts = geo.short_keys.clone();
        if let Some(v) = geo.model_type { shorts.insert(geo_keys::GT_MODEL_TYPE, v); }
        if let Some(v) = geo.raster_type { shorts.insert(geo_keys::GT_RASTER_TYPE, v); }
        if let Some(v) = geo.projected_cs { shorts.insert(geo_keys::PROJECTED_CS_TYPE, v); }
        if let Some(v) = geo.geographic_cs { shorts.insert(geo_keys::GEOGRAPHIC_TYPE, v); }
        if let Some(v) = geo.coord_transform { shorts.insert(geo_keys::PROJ_COORD_TRANS, v); }
        shorts.entry(geo_keys::GT_RASTER_TYPE).or_insert(geo_codes::RASTER_PIXEL_IS_AREA);

        let mut keys: Vec<[u16; 4]> = shorts.iter().map(|(&id, &v)| [id, 0, 1, v]).collect();

        let mut doubles: Vec<(u16, f64)> = geo.double_keys.iter().map(|(&id, &v)| (id, v)).collect();
        doubles.sort_by_key(|(id, _)| *id);
        for (index, (id, _)) in doubles.iter().enumerate() {
            keys.push([*id, tags::GEO_DOUBLE_PARAMS_TAG, 1, index as u16]);
        }

        let mut ascii_ids: Vec<&u16> = geo.ascii_keys.keys().collect();
        ascii_ids.sort();
        let mut ascii = String::new();
        for id in ascii_ids {
            let text = &geo.ascii_keys[id];
            keys.push([*id, tags::GEO_ASCII_PARAMS_TAG, (text.len() + 1) as u16, ascii.len() as u16]);
            ascii.push_str(text);
            ascii.push('|');
        }

        keys.sort_by_key(|k| k[0]);
        let mut directory = vec![1u16, 1, 0, keys.len() as u16];
        for key in &keys {
            directory.extend_from_slice(key);
        }
        entries.push(PendingEntry::new(tags::GEO_KEY_DIRECTORY_TAG, field_types::SHORT,
                                       write_utils::shorts_to_bytes(&directory)));

        if !doubles.is_empty() {
            let values: Vec<f64> = doubles.iter().map(|(_, v)| *v).collect();
            entries.push(PendingEntry::new(tags::GEO_DOUBLE_PARAMS_TAG, field_types::DOUBLE,
                                           write_utils::doubles_to_bytes(&values)));
        }
        if !ascii.is_empty() {
            entries.push(PendingEntry::new(tags::GEO_ASCII_PARAMS_TAG, field_types::ASCII,
                                           write_utils::ascii_to_bytes(&ascii)));
        }
        if let Some(nodata) = geo.nodata {
            entries.push(PendingEntry::new(tags::GDAL_NODATA, field_types::ASCII,
                                           write_utils::ascii_to_bytes(&format_nodata(nodata))));
        }

        entries
    }

    /// Pixel blocks of a stripped layout, uncompressed
    fn strip_blocks(&self, values: &[f64]) -> Vec<Vec<u8>> {
        values
            .chunks(self.rows_per_strip * self.width)
            .map(|strip| {
                let mut block = Vec::with_capacity(strip.len() * self.sample_type.bytes());
                for row in strip.chunks(self.width) {
                    block.extend(self.encode_row(row));
                }
                block
            })
            .collect()
    }

    /// Pixel blocks of a tiled layout, edge tiles padded with zeros
    fn tile_blocks(&self, values: &[f64], tile_width: usize, tile_height: usize) -> Vec<Vec<u8>> {
        let tiles_across = self.width.div_ceil(tile_width);
        let tiles_down = self.height.div_ceil(tile_height);
        let mut blocks = Vec::with_capacity(tiles_across * tiles_down);

        for tile_row in 0..tiles_down {
            for tile_col in 0..tiles_across {
                let mut block = Vec::with_capacity(tile_width * tile_height * self.sample_type.bytes());
                for y in tile_row * tile_height..(tile_row + 1) * tile_height {
                    let row: Vec<f64> = (tile_col * tile_width..(tile_col + 1) * tile_width)
                        .map(|x| if x < self.width && y < self.height { values[y * self.width + x] } else { 0.0 })
                        .collect();
                    block.extend(self.encode_row(&row));
                }
                blocks.push(block);
            }
        }

        blocks
    }

    /// Encodes one row of cells, differenced when the predictor is on
    fn encode_row(&self, row: &[f64]) -> Vec<u8> {
        let mut words: Vec<u64> = row.iter().map(|&v| to_word(v, self.sample_type)).collect();

        if self.horizontal_predictor {
            let bits = self.sample_type.bits();
            let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
            for i in (1..words.len()).rev() {
                words[i] = words[i].wrapping_sub(words[i - 1]) & mask;
            }
        }

        let bytes = self.sample_type.bytes();
        let mut encoded = Vec::with_capacity(words.len() * bytes);
        for word in words {
            encoded.extend_from_slice(&word.to_le_bytes()[..bytes]);
        }
        encoded
    }
}

/// Raw little-endian word of a cell value, saturating for integer types
fn to_word(value: f64, sample_type: SampleType) -> u64 {
    match sample_type {
        SampleType::U8 => value as u8 as u64,
        SampleType::U16 => value as u16 as u64,
        SampleType::U32 => value as u32 as u64,
        SampleType::I8 => value as i8 as u8 as u64,
        SampleType::I16 => value as i16 as u16 as u64,
        SampleType::I32 => value as i32 as u32 as u64,
        SampleType::F32 => (value as f32).to_bits() as u64,
        SampleType::F64 => value.to_bits(),
    }
}

/// GDAL_NODATA text for a value
fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", value)
    }
}
