//! TIFF writing utilities
//!
//! Word alignment and little-endian encoding of tag payloads.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::tiff::errors::TiffResult;

/// Next 4-byte aligned position at or after `offset`
pub fn align_to_4_bytes(offset: u64) -> u64 {
    let remainder = offset % 4;
    if remainder == 0 {
        offset
    } else {
        offset + (4 - remainder)
    }
}

/// Pads a block of `data_len` bytes to a 4-byte boundary
pub fn write_padding(writer: &mut impl Write, data_len: usize) -> TiffResult<()> {
    let padding = (4 - (data_len % 4)) % 4;
    if padding > 0 {
        writer.write_all(&vec![0u8; padding])?;
    }
    Ok(())
}

/// SHORT array payload
pub fn shorts_to_bytes(values: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 2);
    for &v in values {
        // writes into a Vec cannot fail
        let _ = bytes.write_u16::<LittleEndian>(v);
    }
    bytes
}

/// LONG array payload
pub fn longs_to_bytes(values: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for &v in values {
        let _ = bytes.write_u32::<LittleEndian>(v);
    }
    bytes
}

/// LONG8 array payload
pub fn long8s_to_bytes(values: &[u64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for &v in values {
        let _ = bytes.write_u64::<LittleEndian>(v);
    }
    bytes
}

/// DOUBLE array payload
pub fn doubles_to_bytes(values: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for &v in values {
        let _ = bytes.write_f64::<LittleEndian>(v);
    }
    bytes
}

/// NUL-terminated ASCII payload
pub fn ascii_to_bytes(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
