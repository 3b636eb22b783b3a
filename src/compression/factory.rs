//! Compression handler lookup by tag value

use log::debug;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::zstd::ZstdHandler;
use super::lzw::LzwHandler;
use super::packbits::PackBitsHandler;

pub struct CompressionFactory;

impl CompressionFactory {
    /// Handler for the Compression tag of a grid
    ///
    /// Concentration archives use none, LZW or deflate; zstd and PackBits turn
    /// up in regridded products.
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        let tag = u16::try_from(code).map_err(|_| TiffError::UnsupportedCompression(code))?;
        let handler: Box<dyn CompressionHandler> = match tag {
            compression::NONE => Box::new(UncompressedHandler),
            compression::LZW => Box::new(LzwHandler),
            compression::DEFLATE | compression::DEFLATE_LEGACY => Box::new(AdobeDeflateHandler),
            compression::ZSTD | compression::ZSTD_GDAL => Box::new(ZstdHandler::new()),
            compression::PACKBITS => Box::new(PackBitsHandler),
            _ => return Err(TiffError::UnsupportedCompression(code)),
        };
        debug!("Compression {} -> {}", code, handler.name());
        Ok(handler)
    }
}
