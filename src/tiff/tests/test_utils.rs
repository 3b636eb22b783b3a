//! Hand-built TIFF buffers for reader tests

use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

/// Creates a test buffer with TIFF header and sample data
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(42).unwrap();     // TIFF magic number
    buffer.write_u32::<LittleEndian>(8).unwrap();      // IFD offset

    // Sample IFD (at offset 8)
    buffer.write_u16::<LittleEndian>(2).unwrap();      // Entry count (2 entries)

    // Entry 1: ImageWidth (tag 256)
    buffer.write_u16::<LittleEndian>(256).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u32::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u32::<LittleEndian>(800).unwrap();    // Value (width)

    // Entry 2: ImageLength/Height (tag 257)
    buffer.write_u16::<LittleEndian>(257).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u32::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u32::<LittleEndian>(600).unwrap();    // Value (height)

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u32::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// Creates a test buffer with BigTIFF header and sample data
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // BigTIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    // Sample IFD (at offset 16)
    buffer.write_u64::<LittleEndian>(2).unwrap();      // Entry count (2 entries)

    // Entry 1: ImageWidth (tag 256)
    buffer.write_u16::<LittleEndian>(256).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u64::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u64::<LittleEndian>(1024).unwrap();   // Value (width)

    // Entry 2: ImageLength/Height (tag 257)
    buffer.write_u16::<LittleEndian>(257).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u64::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u64::<LittleEndian>(768).unwrap();    // Value (height)

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u64::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

fn write_be_short_entry(buffer: &mut Vec<u8>, tag: u16, value: u16) {
    buffer.write_u16::<BigEndian>(tag).unwrap();
    buffer.write_u16::<BigEndian>(3).unwrap();         // SHORT
    buffer.write_u32::<BigEndian>(1).unwrap();
    buffer.write_u16::<BigEndian>(value).unwrap();     // left-justified in the slot
    buffer.write_u16::<BigEndian>(0).unwrap();
}

fn write_be_long_entry(buffer: &mut Vec<u8>, tag: u16, value: u32) {
    buffer.write_u16::<BigEndian>(tag).unwrap();
    buffer.write_u16::<BigEndian>(4).unwrap();         // LONG
    buffer.write_u32::<BigEndian>(1).unwrap();
    buffer.write_u32::<BigEndian>(value).unwrap();
}

/// Creates a big-endian, single-strip, uncompressed uint16 grid
pub fn create_big_endian_grid(width: u16, height: u16, values: &[u16]) -> Cursor<Vec<u8>> {
    let entry_count = 9u16;
    let data_offset = 8 + 2 + entry_count as u32 * 12 + 4;
    let mut buffer = Vec::new();

    buffer.write_u16::<BigEndian>(0x4D4D).unwrap();    // MM
    buffer.write_u16::<BigEndian>(42).unwrap();
    buffer.write_u32::<BigEndian>(8).unwrap();

    buffer.write_u16::<BigEndian>(entry_count).unwrap();
    write_be_short_entry(&mut buffer, 256, width);
    write_be_short_entry(&mut buffer, 257, height);
    write_be_short_entry(&mut buffer, 258, 16);       // BitsPerSample
    write_be_short_entry(&mut buffer, 259, 1);        // Compression
    write_be_long_entry(&mut buffer, 273, data_offset);
    write_be_short_entry(&mut buffer, 277, 1);        // SamplesPerPixel
    write_be_long_entry(&mut buffer, 278, height as u32);
    write_be_long_entry(&mut buffer, 279, values.len() as u32 * 2);
    write_be_short_entry(&mut buffer, 339, 1);        // SampleFormat
    buffer.write_u32::<BigEndian>(0).unwrap();

    for &v in values {
        buffer.write_u16::<BigEndian>(v).unwrap();
    }

    Cursor::new(buffer)
}

fn write_le_entry(buffer: &mut Vec<u8>, tag: u16, field_type: u16, value: u32) {
    buffer.write_u16::<LittleEndian>(tag).unwrap();
    buffer.write_u16::<LittleEndian>(field_type).unwrap();
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(value).unwrap();
}

/// Creates a little-endian uint8 grid whose header claims `width` x `height`
/// (and optionally a tile size) but which carries a single data byte
pub fn create_truncated_grid(width: u32, height: u32, tile: Option<(u32, u32)>) -> Cursor<Vec<u8>> {
    let entry_count: u16 = if tile.is_some() { 9 } else { 8 };
    let data_offset = 8 + 2 + entry_count as u32 * 12 + 4;
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap();
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();

    buffer.write_u16::<LittleEndian>(entry_count).unwrap();
    write_le_entry(&mut buffer, 256, 4, width);
    write_le_entry(&mut buffer, 257, 4, height);
    write_le_entry(&mut buffer, 258, 3, 8);           // BitsPerSample
    write_le_entry(&mut buffer, 259, 3, 1);           // Compression
    write_le_entry(&mut buffer, 277, 3, 1);           // SamplesPerPixel
    match tile {
        Some((tile_width, tile_length)) => {
            write_le_entry(&mut buffer, 322, 4, tile_width);
            write_le_entry(&mut buffer, 323, 4, tile_length);
            write_le_entry(&mut buffer, 324, 4, data_offset);
            write_le_entry(&mut buffer, 325, 4, 1);
        },
        None => {
            write_le_entry(&mut buffer, 273, 4, data_offset);
            write_le_entry(&mut buffer, 278, 4, height);
            write_le_entry(&mut buffer, 279, 4, 1);
        },
    }
    buffer.write_u32::<LittleEndian>(0).unwrap();
    buffer.push(80);

    Cursor::new(buffer)
}
