//! Tests for the TIFF types module

extern crate std;

use crate::tiff::types::TIFF;
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::constants::{field_types, tags};

#[test]
fn test_tiff_creation() {
    let tiff = TIFF::new(false);
    std::assert!(!tiff.is_big_tiff);
    std::assert_eq!(tiff.ifd_count(), 0);
    std::assert!(tiff.main_ifd().is_none());
}

#[test]
fn test_main_ifd_skips_overviews() {
    let mut tiff = TIFF::new(true);

    // an overview listed first, as some writers do
    let mut overview_ifd = IFD::new(0, 16);
    overview_ifd.add_entry(IFDEntry::new(tags::NEW_SUBFILE_TYPE, field_types::LONG, 1, 1));
    overview_ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 158));
    overview_ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, 166));
    tiff.ifds.push(overview_ifd);

    let mut main_ifd = IFD::new(1, 100);
    main_ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 316));
    main_ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, 332));
    tiff.ifds.push(main_ifd);

    std::assert_eq!(tiff.ifd_count(), 2);
    std::assert_eq!(tiff.main_ifd().and_then(|ifd| ifd.get_dimensions()), Some((316, 332)));
    std::assert_eq!(tiff.overviews().len(), 1);
}

#[test]
fn test_duplicate_tag_replaces_entry() {
    let mut ifd = IFD::new(0, 8);
    ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, 1));
    ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, 8));

    std::assert_eq!(ifd.entry_count(), 1);
    std::assert_eq!(ifd.get_tag_value(tags::COMPRESSION), Some(8));
}

#[test]
fn test_inline_payload_size() {
    let two_shorts = IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 2, 0);
    std::assert!(two_shorts.is_value_inline(false));

    let scale = IFDEntry::new(tags::MODEL_PIXEL_SCALE_TAG, field_types::DOUBLE, 3, 1024);
    std::assert!(!scale.is_value_inline(true));
    std::assert_eq!(scale.payload_size(), 24);
}
