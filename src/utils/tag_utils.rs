//! TIFF tag utilities
//!
//! Field type sizes, payload decoding and the names printed by `inspect`.

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::constants::{field_types, tags, compression};

/// Size in bytes of one value of a TIFF field type
pub fn field_type_size(field_type: u16) -> usize {
    match field_type {
        field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => 1,
        field_types::SHORT | field_types::SSHORT => 2,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => 8,
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
        _ => 1,
    }
}

/// Decodes a tag payload into unsigned integers
///
/// Used for offsets, byte counts and SHORT/LONG arrays. Signed types are
/// reinterpreted, floating point types are rejected.
pub fn decode_unsigned_values(
    bytes: &[u8],
    field_type: u16,
    count: usize,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<Vec<u64>> {
    let size = field_type_size(field_type);
    let mut values = Vec::with_capacity(count);

    for chunk in bytes.chunks_exact(size).take(count) {
        let value = match field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => chunk[0] as u64,
            field_types::SHORT | field_types::SSHORT => handler.decode_u16(chunk) as u64,
            field_types::LONG | field_types::SLONG => handler.decode_u32(chunk) as u64,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.decode_u64(chunk),
            _ => return Err(TiffError::UnsupportedFieldType(field_type)),
        };
        values.push(value);
    }

    Ok(values)
}

/// Decodes a tag payload into doubles
///
/// GeoTIFF model tags are DOUBLE arrays; integer and rational payloads are
/// accepted too since some writers use them for pixel scales.
pub fn decode_f64_values(
    bytes: &[u8],
    field_type: u16,
    count: usize,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<Vec<f64>> {
    let size = field_type_size(field_type);
    let mut values = Vec::with_capacity(count);

    for chunk in bytes.chunks_exact(size).take(count) {
        let value = match field_type {
            field_types::DOUBLE => handler.decode_f64(chunk),
            field_types::FLOAT => handler.decode_f32(chunk) as f64,
            field_types::RATIONAL => {
                let num = handler.decode_u32(&chunk[0..4]) as f64;
                let den = handler.decode_u32(&chunk[4..8]) as f64;
                if den == 0.0 { 0.0 } else { num / den }
            },
            field_types::SRATIONAL => {
                let num = handler.decode_u32(&chunk[0..4]) as i32 as f64;
                let den = handler.decode_u32(&chunk[4..8]) as i32 as f64;
                if den == 0.0 { 0.0 } else { num / den }
            },
            field_types::BYTE => chunk[0] as f64,
            field_types::SHORT => handler.decode_u16(chunk) as f64,
            field_types::SSHORT => handler.decode_u16(chunk) as i16 as f64,
            field_types::LONG => handler.decode_u32(chunk) as f64,
            field_types::SLONG => handler.decode_u32(chunk) as i32 as f64,
            _ => return Err(TiffError::UnsupportedFieldType(field_type)),
        };
        values.push(value);
    }

    Ok(values)
}

/// Human-readable name of a TIFF tag
pub fn get_tag_name(tag: u16) -> &'static str {
    match tag {
        tags::NEW_SUBFILE_TYPE => "NewSubfileType",
        tags::IMAGE_WIDTH => "ImageWidth",
        tags::IMAGE_LENGTH => "ImageLength",
        tags::BITS_PER_SAMPLE => "BitsPerSample",
        tags::COMPRESSION => "Compression",
        tags::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tags::STRIP_OFFSETS => "StripOffsets",
        tags::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tags::ROWS_PER_STRIP => "RowsPerStrip",
        tags::STRIP_BYTE_COUNTS => "StripByteCounts",
        tags::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tags::PREDICTOR => "Predictor",
        tags::COLOR_MAP => "ColorMap",
        tags::TILE_WIDTH => "TileWidth",
        tags::TILE_LENGTH => "TileLength",
        tags::TILE_OFFSETS => "TileOffsets",
        tags::TILE_BYTE_COUNTS => "TileByteCounts",
        tags::SAMPLE_FORMAT => "SampleFormat",
        tags::MODEL_PIXEL_SCALE_TAG => "ModelPixelScale",
        tags::MODEL_TIEPOINT_TAG => "ModelTiepoint",
        tags::MODEL_TRANSFORMATION_TAG => "ModelTransformation",
        tags::GEO_KEY_DIRECTORY_TAG => "GeoKeyDirectory",
        tags::GEO_DOUBLE_PARAMS_TAG => "GeoDoubleParams",
        tags::GEO_ASCII_PARAMS_TAG => "GeoAsciiParams",
        tags::GDAL_NODATA => "GDALNoData",
        _ => "Unknown",
    }
}

/// Human-readable name of a TIFF field type
pub fn get_field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}

/// Human-readable name of a compression code
pub fn get_compression_name(compression_code: u64) -> &'static str {
    match compression_code as u16 {
        compression::NONE => "None",
        compression::LZW => "LZW",
        compression::DEFLATE | compression::DEFLATE_LEGACY => "Adobe Deflate",
        compression::ZSTD | compression::ZSTD_GDAL => "Zstandard",
        compression::PACKBITS => "PackBits",
        _ => "Unknown",
    }
}
