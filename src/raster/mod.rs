//! Concentration rasters
//!
//! A `Raster` is an immutable grid of `f64` cells with its cell-to-map
//! transform, coordinate reference system and nodata sentinel.

mod loader;
pub mod warp;

pub use loader::load_raster;
pub use warp::reproject;

use crate::coordinate::{BoundingBox, Crs, GeoTransform, Point};
use crate::error::{ExtentError, ExtentResult};

#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    values: Vec<f64>,
    nodata: Option<f64>,
    transform: GeoTransform,
    crs: Option<Crs>,
}

impl Raster {
    /// Builds a raster from row-major cell values
    pub fn new(
        width: usize,
        height: usize,
        values: Vec<f64>,
        transform: GeoTransform,
        crs: Option<Crs>,
    ) -> ExtentResult<Self> {
        if width == 0 || height == 0 || values.len() != width * height {
            return Err(ExtentError::Config(format!(
                "raster of {}x{} cells needs {} values, got {}",
                width, height, width * height, values.len()
            )));
        }

        Ok(Raster {
            width,
            height,
            values,
            nodata: None,
            transform,
            crs,
        })
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Value of cell (col, row)
    pub fn get(&self, col: usize, row: usize) -> f64 {
        self.values[row * self.width + col]
    }

    /// Whether a value is the nodata sentinel or NaN
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.map(|nd| nd == value).unwrap_or(false)
    }

    /// Number of cells holding data
    pub fn valid_cell_count(&self) -> usize {
        self.values.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    /// Map extent of the grid
    pub fn extent(&self) -> BoundingBox {
        let (w, h) = (self.width as f64, self.height as f64);
        let corners = [
            self.transform.cell_to_map(0.0, 0.0),
            self.transform.cell_to_map(w, 0.0),
            self.transform.cell_to_map(0.0, h),
            self.transform.cell_to_map(w, h),
        ];
        BoundingBox::from_points(corners.iter())
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Centre of cell (col, row) in map coordinates
    pub fn cell_center(&self, col: usize, row: usize) -> Point {
        self.transform.cell_center(col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_value_count() {
        let gt = GeoTransform::north_up(0.0, 0.0, 1.0, 1.0);
        assert!(Raster::new(2, 2, vec![0.0; 3], gt, None).is_err());
        assert!(Raster::new(0, 2, vec![], gt, None).is_err());
    }

    #[test]
    fn test_nodata_and_extent() {
        let gt = GeoTransform::north_up(-50.0, 50.0, 25.0, 25.0);
        let raster = Raster::new(4, 4, vec![0.0, 255.0, f64::NAN, 20.0].repeat(4), gt, None)
            .unwrap()
            .with_nodata(Some(255.0));

        assert!(raster.is_nodata(255.0));
        assert!(raster.is_nodata(f64::NAN));
        assert!(!raster.is_nodata(0.0));
        assert_eq!(raster.valid_cell_count(), 8);
        assert_eq!(raster.extent(), BoundingBox::new(-50.0, -50.0, 50.0, 50.0));
        assert_eq!(raster.get(3, 2), 20.0);
    }
}
