//! Byte order detection and the two handlers

extern crate std;

use std::io::{Cursor, Seek, SeekFrom};
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};

#[test]
fn test_detection_from_header_marker() {
    for (marker, expected) in [(b"II", Some(ByteOrder::LittleEndian)), (b"MM", Some(ByteOrder::BigEndian)), (b"IM", None)] {
        let mut cursor = Cursor::new(marker.to_vec());
        std::assert_eq!(ByteOrder::detect(&mut cursor).ok(), expected);
    }
}

#[test]
fn test_detected_handler_matches_order() {
    let mut cursor = Cursor::new(b"MM".to_vec());
    let handler = ByteOrder::detect(&mut cursor).unwrap().create_handler();
    std::assert_eq!(handler.byte_order(), ByteOrder::BigEndian);
    std::assert_eq!(ByteOrder::BigEndian.name(), "Big Endian (MM)");
}

/// A ModelPixelScaleTag triple followed by the width, height and cell
/// count of a 316x332 southern grid
fn scale_record<O: byteorder::ByteOrder>() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();
    for value in [25_000.0, 25_000.0, 0.0] {
        buffer.write_f64::<O>(value).unwrap();
    }
    buffer.write_u16::<O>(316).unwrap();
    buffer.write_u32::<O>(332).unwrap();
    buffer.write_u64::<O>(316 * 332).unwrap();
    Cursor::new(buffer)
}

fn assert_scale_record(handler: &dyn ByteOrderHandler, cursor: &mut Cursor<Vec<u8>>) {
    cursor.seek(SeekFrom::Start(0)).unwrap();
    std::assert_eq!(handler.read_f64(cursor).unwrap(), 25_000.0);
    std::assert_eq!(handler.read_f64(cursor).unwrap(), 25_000.0);
    std::assert_eq!(handler.read_f64(cursor).unwrap(), 0.0);
    std::assert_eq!(handler.read_u16(cursor).unwrap(), 316);
    std::assert_eq!(handler.read_u32(cursor).unwrap(), 332);
    std::assert_eq!(handler.read_u64(cursor).unwrap(), 316 * 332);
    std::assert!(handler.read_u16(cursor).is_err());
}

#[test]
fn test_streaming_reads() {
    assert_scale_record(&LittleEndianHandler, &mut scale_record::<LittleEndian>());
    assert_scale_record(&BigEndianHandler, &mut scale_record::<BigEndian>());
}

#[test]
fn test_inline_value_decoding() {
    let be = BigEndianHandler;
    let le = LittleEndianHandler;

    // a SHORT in the first two bytes of an inline entry slot
    std::assert_eq!(be.decode_u16(&[0x01, 0x3C, 0x00, 0x00]), 316);
    std::assert_eq!(le.decode_u16(&[0x3C, 0x01, 0x00, 0x00]), 316);
    std::assert_eq!(be.decode_u32(&332u32.to_be_bytes()), 332);
    std::assert_eq!(le.decode_u64(&u64::MAX.to_le_bytes()), u64::MAX);
    std::assert_eq!(be.decode_f32(&15.0f32.to_be_bytes()), 15.0);
    std::assert_eq!(le.decode_f64(&(-1.5f64).to_le_bytes()), -1.5);
}
