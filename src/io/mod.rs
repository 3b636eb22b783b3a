//! Low-level I/O for the GeoTIFF reader
//!
//! Byte order strategies and the seekable reader trait used by the
//! container parser and the sample decoders.

pub mod seekable;
pub mod byte_order;
