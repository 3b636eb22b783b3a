//! Zlib streams (Adobe Deflate)

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{initial_capacity, CompressionHandler};

/// Compression codes 8 and 32946
///
/// Masks written by this crate use the default level; binary grids of mostly
/// zeros compress well at any level.
pub struct AdobeDeflateHandler;

impl CompressionHandler for AdobeDeflateHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut decoded = Vec::with_capacity(initial_capacity(expected_len));
        let mut decoder = ZlibDecoder::new(data).take(expected_len as u64);

        decoder.read_to_end(&mut decoded)
            .map_err(|e| TiffError::GenericError(format!("Corrupt deflate chunk after {} bytes: {}", decoded.len(), e)))?;
        Ok(decoded)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 4), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "Adobe Deflate"
    }

    fn code(&self) -> u16 {
        compression::DEFLATE
    }
}
