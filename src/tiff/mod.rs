//! TIFF file format parsing module
//!
//! Reads TIFF and BigTIFF containers, their GeoTIFF georeferencing and the
//! first band of pixel data; writes single-band GeoTIFF grids.

pub mod errors;
pub mod ifd;
pub mod types;
pub mod reader;
pub mod constants;
pub mod geo_keys;
pub mod decoder;
pub mod writer;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
pub use geo_keys::{GeoKeyEntry, GeoKeyParser, GeoReference};
pub use decoder::{BandDecoder, DecodedBand, SampleLayout, SampleType};
pub use writer::GeoTiffWriter;
