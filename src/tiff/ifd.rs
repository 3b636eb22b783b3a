//! Image File Directory (IFD) structures
//!
//! An IFD is the per-image metadata block of a TIFF file: a list of tag
//! entries describing dimensions, sample layout, compression, where the
//! pixel data lives and, for GeoTIFFs, the georeferencing.

use std::collections::HashMap;
use std::fmt;
use log::trace;

use crate::tiff::constants::tags;
use crate::utils::tag_utils;

/// An Image File Directory
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in file order
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    tag_map: HashMap<u16, IFDEntry>,
}

/// A single tag entry of an IFD
///
/// For single-valued entries whose payload fits in the entry itself,
/// `value_offset` holds the decoded value. Otherwise it is the file offset of
/// the payload. `inline` keeps the raw payload bytes for multi-valued entries
/// that still fit inline (e.g. two BitsPerSample SHORTs).
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
    /// Raw inline payload, in file byte order
    pub inline: [u8; 8],
}

impl IFDEntry {
    /// Creates an entry carrying a scalar or an offset
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline: value_offset.to_le_bytes(),
        }
    }

    /// Creates an entry from the raw bytes read out of an IFD
    pub fn with_inline(tag: u16, field_type: u16, count: u64, value_offset: u64, inline: [u8; 8]) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline,
        }
    }

    /// Size in bytes of one value of this entry's field type
    pub fn field_type_size(&self) -> usize {
        tag_utils::field_type_size(self.field_type)
    }

    /// Total payload size in bytes
    pub fn payload_size(&self) -> usize {
        self.field_type_size() * self.count as usize
    }

    /// Whether the payload is stored inside the entry instead of at an offset
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.payload_size() <= inline_size
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        format!("Tag: {} ({}), Type: {} ({}), Count: {}, Value/Offset: {}",
                self.tag, tag_utils::get_tag_name(self.tag),
                self.field_type, tag_utils::get_field_type_name(self.field_type),
                self.count, self.value_offset)
    }
}

impl IFD {
    /// Creates an empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry, replacing any earlier entry with the same tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("Adding entry to IFD #{}: {}", self.number, entry.description());

        if self.tag_map.insert(entry.tag, entry.clone()).is_some() {
            self.entries.retain(|e| e.tag != entry.tag);
        }
        self.entries.push(entry);
    }

    /// Gets a scalar tag value (value_offset) directly
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.tag_map.get(&tag).map(|entry| entry.value_offset)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag)
    }

    /// Width and height of the image, if both tags are present
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Number of samples per pixel (default 1)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether pixel data is organized in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_LENGTH)
    }

    /// Whether this IFD is a reduced-resolution overview
    pub fn is_overview(&self) -> bool {
        self.get_tag_value(tags::NEW_SUBFILE_TYPE)
            .map(|v| v & 1 == 1)
            .unwrap_or(false)
    }

    /// Gets the number of entries in this IFD
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        writeln!(f, "  Layout: {}", if self.is_tiled() { "tiled" } else { "stripped" })?;

        writeln!(f, "  Tags:")?;
        for entry in &self.entries {
            let value_display = match entry.tag {
                tags::COMPRESSION => format!("{} ({})",
                                             entry.value_offset,
                                             tag_utils::get_compression_name(entry.value_offset)),
                _ => entry.value_offset.to_string(),
            };

            writeln!(f, "    {} ({}): {} [{}]",
                     entry.tag, tag_utils::get_tag_name(entry.tag), value_display,
                     tag_utils::get_field_type_name(entry.field_type))?;
        }

        Ok(())
    }
}
