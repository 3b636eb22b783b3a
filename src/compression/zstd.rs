//! Zstandard chunks, as written by GDAL

use std::io::Read;

use log::debug;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{initial_capacity, CompressionHandler};

/// Compression codes 14 and 50000
pub struct ZstdHandler {
    level: i32,
}

impl ZstdHandler {
    /// Level 3, zstd's own default
    pub fn new() -> Self {
        ZstdHandler { level: 3 }
    }

    pub fn with_level(level: i32) -> Self {
        ZstdHandler { level: level.clamp(1, 22) }
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let decoder = zstd::stream::read::Decoder::with_buffer(data)
            .map_err(|e| TiffError::GenericError(format!("Zstandard decoder: {}", e)))?;
        let mut decoded = Vec::with_capacity(initial_capacity(expected_len));
        decoder.take(expected_len as u64).read_to_end(&mut decoded)
            .map_err(|e| TiffError::GenericError(format!("Corrupt Zstandard chunk after {} bytes: {}", decoded.len(), e)))?;
        debug!("Zstandard {} -> {} bytes", data.len(), decoded.len());
        Ok(decoded)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        zstd::bulk::compress(data, self.level)
            .map_err(|e| TiffError::GenericError(format!("Zstandard compression failed: {}", e)))
    }

    fn name(&self) -> &'static str {
        "Zstandard"
    }

    fn code(&self) -> u16 {
        compression::ZSTD_GDAL
    }
}
