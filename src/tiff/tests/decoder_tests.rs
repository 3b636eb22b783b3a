//! Pixel decoding tests, fixtures produced by the crate's own writer

extern crate std;

use std::io::Cursor;

use crate::compression::{AdobeDeflateHandler, LzwHandler, PackBitsHandler, ZstdHandler};
use crate::tiff::decoder::{BandDecoder, DecodedBand, SampleType, MAX_CELLS};
use crate::tiff::errors::TiffError;
use crate::tiff::geo_keys::{GeoKeyParser, GeoReference};
use crate::tiff::reader::TiffReader;
use crate::tiff::writer::GeoTiffWriter;
use super::test_utils;

fn decode(bytes: Vec<u8>) -> (DecodedBand, GeoReference) {
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    let band = BandDecoder::new(&reader, ifd).decode(&mut cursor).unwrap();
    let geo = GeoKeyParser::extract_geo_reference(&reader, &mut cursor, ifd).unwrap();
    (band, geo)
}

fn concentration_grid(width: usize, height: usize) -> Vec<f64> {
    (0..width * height).map(|i| ((i * 7) % 101) as f64).collect()
}

#[test]
fn test_big_endian_uint16() {
    let mut cursor = test_utils::create_big_endian_grid(3, 2, &[0, 15, 100, 14, 16, 255]);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let band = BandDecoder::new(&reader, &tiff.ifds[0]).decode(&mut cursor).unwrap();
    std::assert_eq!(band.sample_type, SampleType::U16);
    std::assert_eq!(band.values, vec![0.0, 15.0, 100.0, 14.0, 16.0, 255.0]);
}

#[test]
fn test_uint8_multiple_strips() {
    let values = concentration_grid(5, 7);
    let bytes = GeoTiffWriter::new(5, 7, SampleType::U8)
        .with_rows_per_strip(3)
        .encode(&values)
        .unwrap();

    let (band, _) = decode(bytes);
    std::assert_eq!((band.width, band.height), (5, 7));
    std::assert_eq!(band.values, values);
}

#[test]
fn test_float32_with_geo_reference() {
    let mut values = concentration_grid(4, 4);
    values[5] = -1.0;

    let mut geo = GeoReference::default();
    geo.model_type = Some(1);
    geo.projected_cs = Some(3412);
    geo.pixel_scale = Some([25000.0, 25000.0, 0.0]);
    geo.tiepoint = Some([0.0, 0.0, 0.0, -3950000.0, 4350000.0, 0.0]);
    geo.nodata = Some(-1.0);

    let bytes = GeoTiffWriter::new(4, 4, SampleType::F32)
        .with_geo_reference(geo)
        .encode(&values)
        .unwrap();

    let (band, parsed) = decode(bytes);
    std::assert_eq!(band.values, values);
    std::assert_eq!(parsed.projected_cs, Some(3412));
    std::assert_eq!(parsed.pixel_scale, Some([25000.0, 25000.0, 0.0]));
    std::assert_eq!(parsed.tiepoint.map(|t| t[3]), Some(-3950000.0));
    std::assert_eq!(parsed.nodata, Some(-1.0));
    std::assert!(!parsed.is_pixel_is_point());
}

#[test]
fn test_tiled_deflate() {
    let values = concentration_grid(20, 18);
    let bytes = GeoTiffWriter::new(20, 18, SampleType::U16)
        .with_tiles(16, 16)
        .with_compression(Box::new(AdobeDeflateHandler))
        .encode(&values)
        .unwrap();

    let (band, _) = decode(bytes);
    std::assert_eq!(band.values, values);
}

#[test]
fn test_lzw_with_predictor() {
    let values: Vec<f64> = (0..64).map(|i| (i as f64 - 32.0) * 3.0).collect();
    let bytes = GeoTiffWriter::new(8, 8, SampleType::I16)
        .with_compression(Box::new(LzwHandler))
        .with_horizontal_predictor()
        .encode(&values)
        .unwrap();

    let (band, _) = decode(bytes);
    std::assert_eq!(band.values, values);
}

#[test]
fn test_packbits_bigtiff() {
    let mut values = vec![0.0; 30 * 10];
    for v in values.iter_mut().skip(40).take(100) {
        *v = 80.0;
    }
    let bytes = GeoTiffWriter::new(30, 10, SampleType::U8)
        .with_compression(Box::new(PackBitsHandler))
        .with_big_tiff(true)
        .encode(&values)
        .unwrap();

    let (band, _) = decode(bytes);
    std::assert_eq!(band.values, values);
}

#[test]
fn test_zstd_float64_user_defined_projection() {
    let values = vec![f64::NAN, 15.0, 14.999, 100.0];

    let mut geo = GeoReference::default();
    geo.projected_cs = Some(32767);
    geo.coord_transform = Some(15);
    geo.double_keys.insert(3078, -70.0);
    geo.double_keys.insert(3095, 0.0);
    geo.pixel_scale = Some([25000.0, 25000.0, 0.0]);
    geo.tiepoint = Some([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let bytes = GeoTiffWriter::new(2, 2, SampleType::F64)
        .with_compression(Box::new(ZstdHandler::new()))
        .with_geo_reference(geo)
        .encode(&values)
        .unwrap();

    let (band, parsed) = decode(bytes);
    std::assert!(band.values[0].is_nan());
    std::assert_eq!(&band.values[1..], &values[1..]);
    std::assert!(parsed.is_user_defined());
    std::assert_eq!(parsed.double_key(3078), Some(-70.0));
}

#[test]
fn test_writer_rejects_wrong_cell_count() {
    let writer = GeoTiffWriter::new(3, 3, SampleType::U8);
    std::assert!(writer.encode(&[1.0, 2.0]).is_err());
}

fn decode_truncated(width: u32, height: u32, tile: Option<(u32, u32)>) -> Result<DecodedBand, TiffError> {
    let mut cursor = test_utils::create_truncated_grid(width, height, tile);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    BandDecoder::new(&reader, &tiff.ifds[0]).decode(&mut cursor)
}

#[test]
fn test_header_dimensions_are_bounded() {
    let result = decode_truncated(u32::MAX, u32::MAX, None);
    std::assert!(matches!(result, Err(TiffError::ImageTooLarge(_))));

    // fits in usize but not under the cell limit
    let side = (MAX_CELLS as f64).sqrt() as u32 + 1;
    std::assert!(matches!(decode_truncated(side, side, None), Err(TiffError::ImageTooLarge(_))));
}

#[test]
fn test_tile_size_is_bounded() {
    let result = decode_truncated(4, 4, Some((u32::MAX, u32::MAX)));
    std::assert!(matches!(result, Err(TiffError::ImageTooLarge(_))));
}

#[test]
fn test_short_strip_is_an_error() {
    let result = decode_truncated(4, 4, None);
    std::assert!(matches!(result, Err(TiffError::GenericError(_))));
}
