//! Handler for PackBits run-length encoded data

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{initial_capacity, CompressionHandler};

/// PackBits compression handler (compression code 32773)
pub struct PackBitsHandler;

const MAX_RUN: usize = 128;

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut output = Vec::with_capacity(initial_capacity(expected_len));
        let mut i = 0;

        while i < data.len() && output.len() < expected_len {
            let header = data[i] as i8;
            i += 1;

            match header {
                0..=127 => {
                    let len = header as usize + 1;
                    let literal = data.get(i..i + len).ok_or_else(|| {
                        TiffError::GenericError("Truncated PackBits literal run".to_string())
                    })?;
                    output.extend_from_slice(literal);
                    i += len;
                },
                -127..=-1 => {
                    let value = *data.get(i).ok_or_else(|| {
                        TiffError::GenericError("Truncated PackBits repeat run".to_string())
                    })?;
                    let len = (1 - header as isize) as usize;
                    output.extend(std::iter::repeat(value).take(len));
                    i += 1;
                },
                // -128 is a no-op
                _ => {},
            }
        }

        output.truncate(expected_len);
        Ok(output)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() + data.len() / MAX_RUN + 1);
        let mut literal_start = 0;
        let mut i = 0;

        while i < data.len() {
            let mut run = 1;
            while i + run < data.len() && run < MAX_RUN && data[i + run] == data[i] {
                run += 1;
            }

            if run >= 3 {
                flush_literals(&mut output, &data[literal_start..i]);
                output.push((1 - run as isize) as i8 as u8);
                output.push(data[i]);
                i += run;
                literal_start = i;
            } else {
                i += run;
            }
        }
        flush_literals(&mut output, &data[literal_start..]);

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u16 {
        compression::PACKBITS
    }
}

fn flush_literals(output: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(MAX_RUN) {
        output.push((chunk.len() - 1) as u8);
        output.extend_from_slice(chunk);
    }
}
