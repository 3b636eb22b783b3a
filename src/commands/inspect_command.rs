//! Structure and georeferencing of a GeoTIFF
//!
//! Prints the IFD chain, the sample layout of the main image, its GeoKeys,
//! the resolved CRS and the cell-to-map transform.

use std::path::PathBuf;

use log::warn;

use crate::commands::command_traits::Command;
use crate::coordinate::{CrsRegistry, GeoTransform};
use crate::error::{ExtentError, ExtentResult};
use crate::tiff::{GeoKeyParser, SampleLayout, TiffError, TiffReader};
use crate::utils::tag_utils;

pub struct InspectCommand {
    input: PathBuf,
    verbose: bool,
}

impl InspectCommand {
    pub fn new(input: impl Into<PathBuf>, verbose: bool) -> Self {
        InspectCommand {
            input: input.into(),
            verbose,
        }
    }

    /// Human-readable description of the file
    pub fn describe(&self) -> ExtentResult<String> {
        let decode = |e: TiffError| ExtentError::decode(&self.input, e);

        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.load(&self.input).map_err(decode)?;
        let ifd = tiff.main_ifd()
            .ok_or_else(|| decode(TiffError::GenericError("no image directory".to_string())))?;

        let mut reader = tiff_reader.create_reader().map_err(decode)?;
        let layout = SampleLayout::from_ifd(&tiff_reader, &mut reader, ifd).map_err(decode)?;
        let geo = GeoKeyParser::extract_geo_reference(&tiff_reader, &mut reader, ifd).map_err(decode)?;

        let mut out = String::new();
        out.push_str(&format!("File: {}\n", self.input.display()));
        out.push_str(&format!("Format: {}, {} IFDs ({} overviews)\n",
                              if tiff.is_big_tiff { "BigTIFF" } else { "TIFF" },
                              tiff.ifd_count(), tiff.overviews().len()));
        out.push_str(&format!("Dimensions: {}x{}\n", layout.width, layout.height));
        out.push_str(&format!("Samples: {} x {}\n", layout.samples_per_pixel, layout.sample_type));
        out.push_str(&format!("Layout: {}\n", if ifd.is_tiled() { "tiled" } else { "stripped" }));
        out.push_str(&format!("Compression: {}\n", tag_utils::get_compression_name(layout.compression)));

        match geo.nodata {
            Some(nodata) => out.push_str(&format!("Nodata: {}\n", nodata)),
            None => out.push_str("Nodata: none\n"),
        }

        match CrsRegistry::from_geo_reference(&geo) {
            Ok(crs) => out.push_str(&format!("CRS: {}\n", crs)),
            Err(e) => {
                warn!("{}", e);
                out.push_str(&format!("CRS: {} (not resolved)\n", geo.crs_description()));
            },
        }

        match GeoTransform::from_geo_reference(&geo) {
            Ok(gt) => {
                out.push_str(&format!("Origin: ({}, {})\n", gt.origin_x, gt.origin_y));
                out.push_str(&format!("Cell size: {} x {}\n", gt.pixel_width, -gt.pixel_height));
            },
            Err(_) => out.push_str("Transform: none\n"),
        }

        if self.verbose {
            out.push('\n');
            out.push_str(&tiff.to_string());
            out.push_str(&geo.to_string());
        }

        Ok(out)
    }
}

impl Command for InspectCommand {
    fn execute(&self) -> ExtentResult<i32> {
        print!("{}", self.describe()?);
        Ok(0)
    }
}
