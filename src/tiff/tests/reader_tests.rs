//! Tests for the TIFF reader

extern crate std;

use std::io::Cursor;
use byteorder::{LittleEndian, WriteBytesExt};

use crate::tiff::constants::tags;
use crate::tiff::errors::TiffError;
use crate::tiff::reader::TiffReader;
use super::test_utils;

#[test]
fn test_read_classic_tiff() {
    let mut cursor = test_utils::create_test_tiff_buffer();
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();
    std::assert!(!tiff.is_big_tiff);
    std::assert_eq!(tiff.ifd_count(), 1);
    std::assert_eq!(tiff.ifds[0].get_dimensions(), Some((800, 600)));
}

#[test]
fn test_read_bigtiff() {
    let mut cursor = test_utils::create_test_bigtiff_buffer();
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();
    std::assert!(tiff.is_big_tiff);
    std::assert!(reader.is_big_tiff());
    std::assert_eq!(tiff.ifds[0].get_dimensions(), Some((1024, 768)));
}

#[test]
fn test_big_endian_inline_shorts() {
    let mut cursor = test_utils::create_big_endian_grid(3, 2, &[0, 15, 100, 14, 16, 255]);
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = &tiff.ifds[0];
    std::assert_eq!(ifd.get_dimensions(), Some((3, 2)));
    std::assert_eq!(ifd.get_tag_value(tags::BITS_PER_SAMPLE), Some(16));
    std::assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::STRIP_BYTE_COUNTS).unwrap(), vec![12]);
}

#[test]
fn test_unsupported_version() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x4949).unwrap();
    buffer.write_u16::<LittleEndian>(41).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();
    let mut cursor = Cursor::new(buffer);

    let result = TiffReader::new().read(&mut cursor);
    std::assert!(matches!(result, Err(TiffError::UnsupportedVersion(41))));
}

#[test]
fn test_ifd_offset_past_end() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x4949).unwrap();
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(4096).unwrap();
    let mut cursor = Cursor::new(buffer);

    std::assert!(TiffReader::new().read(&mut cursor).is_err());
}

#[test]
fn test_truncated_file() {
    let mut cursor = Cursor::new(vec![0x49, 0x49, 42]);
    std::assert!(TiffReader::new().read(&mut cursor).is_err());
}
