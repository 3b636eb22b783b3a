//! Nearest-neighbour reprojection
//!
//! The target grid covers the transformed extent of the source grid. Cell
//! size is kept for projected sources; geographic sources get the cell size
//! that preserves their cell count. Each target cell takes the value of the
//! source cell under its centre, NaN outside the source.

use log::{debug, info};
use rayon::prelude::*;

use crate::coordinate::{CoordinateTransformer, Crs, GeoTransform, Point};
use crate::error::{ExtentError, ExtentResult};
use super::Raster;

/// Upper bound on target cells, guards against degenerate extents
const MAX_TARGET_CELLS: usize = 200_000_000;

/// Edge samples used to bound the transformed extent
const EXTENT_DENSIFY: usize = 64;

/// Reprojects a raster into `target`
///
/// Rasters already in the target projection are returned as-is, relabelled
/// with the target CRS.
pub fn reproject(raster: &Raster, target: &Crs) -> ExtentResult<Raster> {
    let source = raster.crs().ok_or_else(|| {
        ExtentError::Projection("raster has no known coordinate reference system".to_string())
    })?;

    if source.same_projection(target) {
        debug!("{} already matches {}, no reprojection", source, target);
        return Raster::new(
            raster.width(),
            raster.height(),
            raster.values().to_vec(),
            *raster.transform(),
            Some(target.clone()),
        )
        .map(|r| r.with_nodata(raster.nodata()));
    }

    info!("Reprojecting {}x{} grid from {} to {}", raster.width(), raster.height(), source, target);

    let forward = CoordinateTransformer::new(source.projection, target.projection);
    let backward = CoordinateTransformer::new(target.projection, source.projection);

    let extent = forward
        .transform_bbox(&raster.extent(), EXTENT_DENSIFY)
        .ok_or_else(|| ExtentError::Projection(format!(
            "grid extent cannot be represented in {}", target
        )))?;

    let cell_size = if source.projection.is_geographic() {
        (extent.width() * extent.height() / (raster.width() * raster.height()) as f64).sqrt()
    } else {
        raster.transform().cell_area().sqrt()
    };
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(ExtentError::Projection("invalid target cell size".to_string()));
    }

    let origin_x = (extent.min_x / cell_size).floor() * cell_size;
    let origin_y = (extent.max_y / cell_size).ceil() * cell_size;
    let width = ((extent.max_x - origin_x) / cell_size).ceil().max(1.0) as usize;
    let height = ((origin_y - extent.min_y) / cell_size).ceil().max(1.0) as usize;

    if width.saturating_mul(height) > MAX_TARGET_CELLS {
        return Err(ExtentError::Projection(format!(
            "reprojected grid of {}x{} cells is too large", width, height
        )));
    }

    let target_transform = GeoTransform::north_up(origin_x, origin_y, cell_size, cell_size);
    let source_transform = *raster.transform();
    debug!("Target grid {}x{} at ({}, {}), cell {}", width, height, origin_x, origin_y, cell_size);

    let mut values = vec![f64::NAN; width * height];
    values
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out)| {
            for (col, cell) in out.iter_mut().enumerate() {
                let centre = target_transform.cell_center(col, row);
                if let Some(value) = sample_nearest(raster, &source_transform, &backward, &centre) {
                    *cell = value;
                }
            }
        });

    Ok(Raster::new(width, height, values, target_transform, Some(target.clone()))?
        .with_nodata(raster.nodata()))
}

fn sample_nearest(
    raster: &Raster,
    transform: &GeoTransform,
    backward: &CoordinateTransformer,
    target_point: &Point,
) -> Option<f64> {
    let source_point = backward.transform_point(target_point)?;
    let (col, row) = transform.map_to_cell(&source_point);
    if !(col >= 0.0 && row >= 0.0) {
        return None;
    }

    let (col, row) = (col.floor() as usize, row.floor() as usize);
    if col < raster.width() && row < raster.height() {
        Some(raster.get(col, row))
    } else {
        None
    }
}
