//! TIFF header and offset validation
//!
//! Concentration grids arrive from archives of mixed provenance; these checks
//! turn truncated or mislabelled files into decode errors instead of panics.

use log::{debug, error, warn};
use std::io::SeekFrom;

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Detects the byte order and returns the matching handler
pub fn detect_byte_order(reader: &mut dyn SeekableReader) -> TiffResult<Box<dyn ByteOrderHandler>> {
    let byte_order = ByteOrder::detect(reader)?;
    debug!("Detected byte order: {}", byte_order.name());

    Ok(byte_order.create_handler())
}

/// Reads the version word and tells TIFF (42) from BigTIFF (43)
///
/// # Returns
/// `true` for BigTIFF
pub fn detect_tiff_format(
    reader: &mut dyn SeekableReader,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<bool> {
    let version = handler.read_u16(reader)?;
    debug!("TIFF version: {}", version);

    match version {
        header::BIG_TIFF_VERSION => {
            validate_bigtiff_header(reader, handler)?;
            Ok(true)
        },
        header::TIFF_VERSION => Ok(false),
        _ => Err(TiffError::UnsupportedVersion(version)),
    }
}

/// Checks the BigTIFF offset size and reserved word
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = handler.read_u16(reader)?;
    let zeros = handler.read_u16(reader)?;

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Validates an IFD offset against the file size
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Validates that a data block lies entirely inside the file
pub fn validate_block(offset: u64, byte_count: u64, file_size: u64) -> TiffResult<()> {
    match offset.checked_add(byte_count) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::GenericError(format!(
            "Data block at offset {} with {} bytes exceeds file size {}",
            offset, byte_count, file_size
        ))),
    }
}

/// File size, restoring the current position afterwards
///
/// Returns `u64::MAX` if the size cannot be determined.
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}
