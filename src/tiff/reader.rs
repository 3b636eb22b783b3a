//! TIFF file reader
//!
//! Parses the header and the IFD chain of TIFF and BigTIFF files and gives
//! access to tag payloads. Pixel decoding lives in `tiff::decoder`.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, SeekFrom};
use std::path::{Path, PathBuf};

use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::tiff::constants::field_types;
use crate::utils::tag_utils;

/// Upper bound on the IFD chain length, guards against offset loops
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Byte order handler, set once the header has been read
    pub(crate) byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Path of the file being read, if any
    current_file: Option<PathBuf>,
    /// Whether the file is BigTIFF
    pub(crate) is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            current_file: None,
            is_big_tiff: false,
        }
    }

    /// Opens the current file again for pixel access
    pub fn create_reader(&self) -> TiffResult<BufReader<File>> {
        match &self.current_file {
            Some(path) => {
                let file = File::open(path)?;
                Ok(BufReader::with_capacity(1024 * 1024, file))
            },
            None => Err(TiffError::GenericError("No file path specified".to_string())),
        }
    }

    /// The byte order handler of the parsed file
    pub fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Loads a TIFF file from the given path
    pub fn load(&mut self, filepath: impl AsRef<Path>) -> TiffResult<TIFF> {
        let path = filepath.as_ref();
        info!("Loading TIFF file: {}", path.display());
        self.current_file = Some(path.to_path_buf());

        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(64 * 1024, file);

        self.read(&mut reader)
    }

    /// Reads the header and every IFD from the given reader
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let handler = validation::detect_byte_order(reader)?;
        self.is_big_tiff = validation::detect_tiff_format(reader, handler.as_ref())?;
        self.byte_order_handler = Some(handler);

        let first_ifd_offset = self.read_offset(reader)?;
        debug!("First IFD offset: {}", first_ifd_offset);

        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        if tiff.ifds.is_empty() {
            return Err(TiffError::InvalidHeader);
        }

        debug!("Read {} IFDs", tiff.ifds.len());
        Ok(tiff)
    }

    /// Reads a header or next-IFD offset (4 bytes, 8 for BigTIFF)
    fn read_offset(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u32(reader)? as u64)
        }
    }

    /// Follows the IFD chain
    ///
    /// A broken link after the first IFD ends the chain with a warning; the
    /// main image is all the pipeline needs.
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) if !ifds.is_empty() => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                },
                Err(e) => return Err(e),
            };
            ifds.push(ifd);

            // read_ifd leaves the stream right after the last entry
            let next_ifd_offset = match self.read_offset(reader) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    break;
                }
            };

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD at the given offset
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        debug!("IFD #{} at {}: {} entries", number, offset, entry_count);

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }

        Ok(ifd)
    }

    /// Reads a single IFD entry, decoding inline scalars in file byte order
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let slot = if self.is_big_tiff { 8 } else { 4 };
        let mut inline = [0u8; 8];
        reader.read_exact(&mut inline[..slot])?;

        let payload = tag_utils::field_type_size(field_type) as u64 * count;
        let value_offset = if payload <= slot as u64 && count == 1 {
            match field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => inline[0] as u64,
                field_types::SHORT | field_types::SSHORT => handler.decode_u16(&inline) as u64,
                field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.decode_u64(&inline),
                _ => handler.decode_u32(&inline) as u64,
            }
        } else if self.is_big_tiff {
            handler.decode_u64(&inline)
        } else {
            handler.decode_u32(&inline) as u64
        };

        Ok(IFDEntry::with_inline(tag, field_type, count, value_offset, inline))
    }

    /// Raw payload bytes of a tag, from the entry itself or from its offset
    pub fn read_tag_bytes(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> TiffResult<Vec<u8>> {
        let size = entry.payload_size();
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.inline[..size].to_vec());
        }

        let file_size = validation::get_file_size(reader)?;
        validation::validate_block(entry.value_offset, size as u64, file_size)?;

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut buffer = vec![0u8; size];
        reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads a tag's values as unsigned integers
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let bytes = self.read_tag_bytes(reader, entry)?;
        tag_utils::decode_unsigned_values(&bytes, entry.field_type, entry.count as usize, self.handler()?)
    }

    /// Reads a tag's values as doubles
    pub fn read_tag_f64_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let bytes = self.read_tag_bytes(reader, entry)?;
        tag_utils::decode_f64_values(&bytes, entry.field_type, entry.count as usize, self.handler()?)
    }

    /// Reads an ASCII tag, trailing NULs removed
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let mut bytes = self.read_tag_bytes(reader, entry)?;
        while bytes.last() == Some(&0) {
            bytes.pop();
        }

        String::from_utf8(bytes)
            .map_err(|e| TiffError::GenericError(format!("Invalid UTF-8 string: {}", e)))
    }

    /// Path of the file being read
    pub fn get_file_path(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    /// Whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }
}
