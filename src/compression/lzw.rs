//! Handler for TIFF LZW compressed data
//!
//! TIFF LZW packs codes MSB-first, starts at 9 bits and widens one code
//! early ("early change"), up to 12 bits.

use std::collections::HashMap;
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{initial_capacity, CompressionHandler};

const CLEAR_CODE: u16 = 256;
const EOI_CODE: u16 = 257;
const FIRST_CODE: u16 = 258;
const MIN_BITS: u32 = 9;
const MAX_BITS: u32 = 12;
const MAX_ENTRIES: usize = 1 << MAX_BITS;

/// LZW compression handler (compression code 5)
pub struct LzwHandler;

/// MSB-first bit reader over a byte slice
struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    buffer: u32,
    bits: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, position: 0, buffer: 0, bits: 0 }
    }

    fn read(&mut self, width: u32) -> Option<u16> {
        while self.bits < width {
            let byte = *self.data.get(self.position)?;
            self.position += 1;
            self.buffer = (self.buffer << 8) | byte as u32;
            self.bits += 8;
        }
        self.bits -= width;
        let code = (self.buffer >> self.bits) & ((1 << width) - 1);
        self.buffer &= (1 << self.bits) - 1;
        Some(code as u16)
    }
}

/// MSB-first bit writer
struct BitWriter {
    output: Vec<u8>,
    buffer: u32,
    bits: u32,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter { output: Vec::new(), buffer: 0, bits: 0 }
    }

    fn write(&mut self, code: u16, width: u32) {
        self.buffer = (self.buffer << width) | code as u32;
        self.bits += width;
        while self.bits >= 8 {
            self.bits -= 8;
            self.output.push((self.buffer >> self.bits) as u8);
        }
        self.buffer &= (1 << self.bits) - 1;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.output.push((self.buffer << (8 - self.bits)) as u8);
        }
        self.output
    }
}

fn initial_table() -> Vec<Vec<u8>> {
    let mut table: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
    // placeholders for the clear and end-of-information codes
    table.push(Vec::new());
    table.push(Vec::new());
    table
}

impl CompressionHandler for LzwHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut reader = BitReader::new(data);
        let mut table = initial_table();
        let mut width = MIN_BITS;
        let mut previous: Option<u16> = None;
        let mut output = Vec::with_capacity(initial_capacity(expected_len));

        while let Some(code) = reader.read(width) {
            if output.len() >= expected_len {
                break;
            }
            if code == CLEAR_CODE {
                table.truncate(FIRST_CODE as usize);
                width = MIN_BITS;
                previous = None;
                continue;
            }
            if code == EOI_CODE {
                break;
            }

            let prev = match previous {
                None => {
                    let entry = table.get(code as usize)
                        .filter(|e| !e.is_empty())
                        .ok_or_else(|| TiffError::GenericError(format!("Invalid LZW code {} after clear", code)))?;
                    output.extend_from_slice(entry);
                    previous = Some(code);
                    continue;
                },
                Some(prev) => prev,
            };

            let entry = if (code as usize) < table.len() {
                table[code as usize].clone()
            } else if code as usize == table.len() {
                let mut entry = table[prev as usize].clone();
                entry.push(entry[0]);
                entry
            } else {
                return Err(TiffError::GenericError(format!(
                    "Invalid LZW code {} (table size {})", code, table.len()
                )));
            };

            output.extend_from_slice(&entry);

            if table.len() < MAX_ENTRIES {
                let mut new_entry = table[prev as usize].clone();
                new_entry.push(entry[0]);
                table.push(new_entry);
            }
            if table.len() + 1 >= (1 << width) && width < MAX_BITS {
                width += 1;
            }
            previous = Some(code);
        }

        output.truncate(expected_len);
        Ok(output)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut writer = BitWriter::new();
        let mut dictionary: HashMap<(u16, u8), u16> = HashMap::new();
        let mut next_code = FIRST_CODE;
        let mut width = MIN_BITS;
        let mut current: Option<u16> = None;

        writer.write(CLEAR_CODE, width);

        for &byte in data {
            let prefix = match current {
                None => {
                    current = Some(byte as u16);
                    continue;
                },
                Some(prefix) => prefix,
            };

            if let Some(&code) = dictionary.get(&(prefix, byte)) {
                current = Some(code);
                continue;
            }

            writer.write(prefix, width);
            dictionary.insert((prefix, byte), next_code);
            next_code += 1;
            current = Some(byte as u16);

            if next_code as usize == MAX_ENTRIES - 2 {
                writer.write(CLEAR_CODE, width);
                dictionary.clear();
                next_code = FIRST_CODE;
                width = MIN_BITS;
            } else if next_code as u32 > (1 << width) - 1 {
                width += 1;
            }
        }

        if let Some(prefix) = current {
            writer.write(prefix, width);
            next_code += 1;
            if next_code as u32 > (1 << width) - 1 && width < MAX_BITS {
                width += 1;
            }
        }
        writer.write(EOI_CODE, width);

        Ok(writer.finish())
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u16 {
        compression::LZW
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lzw_repetitive_row() {
        let handler = LzwHandler;
        let data: Vec<u8> = (0..2000).map(|i| if i % 50 < 30 { 0 } else { 100 }).collect();

        let packed = handler.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(handler.decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_lzw_table_reset() {
        // enough distinct pairs to fill the 12-bit table and force a clear code
        let handler = LzwHandler;
        let data: Vec<u8> = (0..40_000u32).map(|i| ((i * 7919) % 251) as u8 ^ (i / 251) as u8).collect();

        let packed = handler.compress(&data).unwrap();
        assert_eq!(handler.decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_lzw_known_stream() {
        // clear, 'A', 'B', EOI at 9 bits
        let handler = LzwHandler;
        let mut writer = BitWriter::new();
        for code in [CLEAR_CODE, 65, 66, EOI_CODE] {
            writer.write(code, 9);
        }

        assert_eq!(handler.decompress(&writer.finish(), 2).unwrap(), b"AB".to_vec());
    }
}
