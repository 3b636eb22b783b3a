//! Geoprocessing backends
//!
//! The pipeline talks to a `GeoBackend` for the three raster/vector steps so
//! an alternative implementation can be swapped in without touching it.

use crate::coordinate::GeoTransform;
use crate::mask::Mask;
use crate::raster::Raster;
use crate::vectorize::{self, Connectivity, PolygonSet};

/// Strategy trait for thresholding, vectorizing and measuring
pub trait GeoBackend: Send + Sync {
    /// Binary mask of cells at or above `threshold`
    fn mask(&self, raster: &Raster, threshold: f64) -> Mask;

    /// One polygon per connected region of the mask
    fn vectorize(&self, mask: &Mask, transform: &GeoTransform, connectivity: Connectivity) -> PolygonSet;

    /// Total planar area of a polygon set
    fn area(&self, polygons: &PolygonSet) -> f64;

    /// Name of this backend
    fn name(&self) -> &'static str;
}

/// Backend built on this crate's mask and tracer and `geo` areas
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl GeoBackend for NativeBackend {
    fn mask(&self, raster: &Raster, threshold: f64) -> Mask {
        Mask::from_raster(raster, threshold)
    }

    fn vectorize(&self, mask: &Mask, transform: &GeoTransform, connectivity: Connectivity) -> PolygonSet {
        vectorize::vectorize(mask, transform, connectivity)
    }

    fn area(&self, polygons: &PolygonSet) -> f64 {
        polygons.total_area()
    }

    fn name(&self) -> &'static str {
        "native"
    }
}
