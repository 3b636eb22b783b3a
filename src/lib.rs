//! Sea-ice extent from concentration grids
//!
//! Reads single-band sea-ice concentration GeoTIFFs, thresholds them into an
//! ice mask, vectorizes the mask into polygons in an equal-area projection
//! and records the total area per grid in a results table.

pub mod io;
pub mod tiff;
pub mod compression;
pub mod coordinate;
pub mod raster;
pub mod mask;
pub mod vectorize;
pub mod backend;
pub mod pipeline;
pub mod table;
pub mod batch;
pub mod artifacts;
pub mod source;
pub mod config;
pub mod commands;
pub mod utils;
pub mod error;

pub use backend::{GeoBackend, NativeBackend};
pub use batch::{run_batch, BatchSummary, CancellationToken};
pub use config::ExtentConfig;
pub use coordinate::{Crs, CrsRegistry, GeoTransform};
pub use error::{ExtentError, ExtentResult};
pub use mask::Mask;
pub use pipeline::{extract_area, extract_area_with, AreaReport, ResultRecord};
pub use raster::{load_raster, Raster};
pub use table::{CsvResultTable, ResultTable};
pub use tiff::TiffReader;
pub use vectorize::{vectorize, Connectivity, PolygonSet};
