//! Seekable reader trait

use std::io::{Read, Seek};

/// Anything the TIFF reader can read from: files, buffered files and
/// in-memory cursors.
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
