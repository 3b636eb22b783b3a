//! Binary ice mask
//!
//! Pointwise threshold of a concentration raster. A cell is ice when its
//! value is at or above the threshold; nodata and NaN cells never are.

use std::fmt;

use crate::raster::Raster;

/// Default concentration threshold, in percent
pub const DEFAULT_THRESHOLD: f64 = 15.0;

/// Same-shape boolean grid derived from a raster
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Mask {
    /// Builds a mask from row-major cells
    ///
    /// # Returns
    /// `None` if `cells` does not hold `width * height` values
    pub fn new(width: usize, height: usize, cells: Vec<bool>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Mask { width, height, cells })
    }

    /// Thresholds a raster
    ///
    /// # Arguments
    /// * `raster` - Concentration grid
    /// * `threshold` - Minimum concentration counted as ice
    pub fn from_raster(raster: &Raster, threshold: f64) -> Self {
        let cells = raster
            .values()
            .iter()
            .map(|&v| !raster.is_nodata(v) && v >= threshold)
            .collect();

        Mask {
            width: raster.width(),
            height: raster.height(),
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Cell value; out-of-grid positions are false
    pub fn get(&self, col: isize, row: isize) -> bool {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return false;
        }
        self.cells[row as usize * self.width + col as usize]
    }

    pub fn true_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|c| *c)
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)) {
            let line: String = row.iter().map(|&c| if c { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::GeoTransform;

    fn raster(values: Vec<f64>, nodata: Option<f64>) -> Raster {
        let gt = GeoTransform::north_up(0.0, 0.0, 1.0, 1.0);
        let w = values.len();
        Raster::new(w, 1, values, gt, None).unwrap().with_nodata(nodata)
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let r = raster(vec![14.0, 15.0, 16.0, 14.999], None);
        let mask = Mask::from_raster(&r, DEFAULT_THRESHOLD);
        assert_eq!(mask.cells(), &[false, true, true, false]);
        assert_eq!(mask.true_count(), 2);
    }

    #[test]
    fn test_nodata_and_nan_are_false() {
        let r = raster(vec![255.0, f64::NAN, 100.0, 0.0], Some(255.0));
        let mask = Mask::from_raster(&r, 15.0);
        assert_eq!(mask.cells(), &[false, false, true, false]);
    }

    #[test]
    fn test_threshold_zero_keeps_valid_cells() {
        let r = raster(vec![0.0, 255.0, 3.0], Some(255.0));
        let mask = Mask::from_raster(&r, 0.0);
        assert_eq!(mask.true_count(), 2);
    }

    #[test]
    fn test_empty_and_bounds() {
        let mask = Mask::new(2, 2, vec![false; 4]).unwrap();
        assert!(mask.is_empty());
        assert!(!mask.get(-1, 0));
        assert!(!mask.get(2, 1));
        assert!(Mask::new(2, 2, vec![true; 3]).is_none());
    }

    #[test]
    fn test_display() {
        let mask = Mask::new(3, 2, vec![true, false, true, false, true, false]).unwrap();
        assert_eq!(mask.to_string(), "#.#\n.#.\n");
    }
}
