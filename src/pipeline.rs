//! Area extraction pipeline
//!
//! load → reproject → mask → vectorize → aggregate, for one grid. The result
//! depends only on the grid content, the threshold, the target projection
//! and the connectivity rule.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use log::{debug, info};

use crate::artifacts::ArtifactWriter;
use crate::backend::{GeoBackend, NativeBackend};
use crate::config::ExtentConfig;
use crate::coordinate::Crs;
use crate::error::{ExtentError, ExtentResult};
use crate::raster::{load_raster, reproject, Raster};
use crate::source::{source_identifier, SourceInfo};

/// One row of the results table
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// File name of the grid without extension
    pub source_identifier: String,
    /// Ice area in squared units of the target CRS
    pub total_area: f64,
}

impl ResultRecord {
    pub fn new(source_identifier: impl Into<String>, total_area: f64) -> Self {
        ResultRecord {
            source_identifier: source_identifier.into(),
            total_area,
        }
    }
}

/// Record of one grid plus diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct AreaReport {
    pub record: ResultRecord,
    /// Number of connected ice regions
    pub polygon_count: usize,
    /// Cells at or above the threshold
    pub true_cells: usize,
    /// No cell reached the threshold; the area is then zero
    pub empty_mask: bool,
    /// Whether the grid had to be warped into the target CRS
    pub reprojected: bool,
    pub source_info: Option<SourceInfo>,
}

impl fmt::Display for AreaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source: {}", self.record.source_identifier)?;
        if let Some(info) = &self.source_info {
            writeln!(f, "  Acquired: {}", info)?;
        }
        writeln!(f, "  Ice cells: {}", self.true_cells)?;
        writeln!(f, "  Regions: {}", self.polygon_count)?;
        writeln!(f, "  Reprojected: {}", if self.reprojected { "yes" } else { "no" })?;
        write!(f, "  Area: {} m² ({:.1} km²)", self.record.total_area, self.record.total_area / 1e6)
    }
}

/// Runs the pipeline on one GeoTIFF with the native backend
pub fn extract_area(raster_path: impl AsRef<Path>, config: &ExtentConfig) -> ExtentResult<AreaReport> {
    extract_area_with(&NativeBackend, raster_path, config)
}

/// Runs the pipeline on one GeoTIFF with the given backend
///
/// # Errors
/// `Decode` for unreadable grids, `Projection` when the grid has no usable
/// CRS or the target is unknown or not equal-area.
pub fn extract_area_with(
    backend: &dyn GeoBackend,
    raster_path: impl AsRef<Path>,
    config: &ExtentConfig,
) -> ExtentResult<AreaReport> {
    let path = raster_path.as_ref();
    let target = config.target()?;
    let identifier = source_identifier(path);

    let raster = load_raster(path)?;
    let mut report = area_of_raster(backend, &raster, &identifier, &target, config)?;
    report.source_info = SourceInfo::parse(path);

    Ok(report)
}

/// Pipeline steps after loading, on an in-memory grid
pub fn area_of_raster(
    backend: &dyn GeoBackend,
    raster: &Raster,
    identifier: &str,
    target: &Crs,
    config: &ExtentConfig,
) -> ExtentResult<AreaReport> {
    let crs = raster.crs().ok_or_else(|| {
        ExtentError::Projection(format!("{}: grid has no usable coordinate reference system", identifier))
    })?;

    let (grid, reprojected) = if crs.same_projection(target) {
        (Cow::Borrowed(raster), false)
    } else {
        (Cow::Owned(reproject(raster, target)?), true)
    };

    let mask = backend.mask(&grid, config.threshold);
    let true_cells = mask.true_count();
    debug!("{}: {} of {} cells at or above {}", identifier, true_cells, mask.cells().len(), config.threshold);

    let polygons = backend.vectorize(&mask, grid.transform(), config.connectivity);
    let total_area = backend.area(&polygons);

    if let Some(dir) = config.artifacts_path() {
        ArtifactWriter::new(dir).write_all(identifier, &mask, grid.transform(), grid.crs(), &polygons);
    }

    info!("{}: {} regions, area {} ({} backend)", identifier, polygons.len(), total_area, backend.name());

    Ok(AreaReport {
        record: ResultRecord::new(identifier, total_area),
        polygon_count: polygons.len(),
        true_cells,
        empty_mask: true_cells == 0,
        reprojected,
        source_info: None,
    })
}
