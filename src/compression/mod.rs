//! Compression handling for TIFF strips and tiles
//!
//! Each supported compression scheme is a `CompressionHandler` strategy;
//! `CompressionFactory` picks one from the Compression tag.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;
mod lzw;
mod packbits;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
pub use lzw::LzwHandler;
pub use packbits::PackBitsHandler;
