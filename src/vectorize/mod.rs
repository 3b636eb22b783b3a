//! Mask vectorization
//!
//! Turns every maximal connected region of a `Mask` into a `geo::Polygon`
//! whose boundary follows cell edges, with holes for enclosed background.
//! Polygons come out in row-major order of each region's first cell.

mod label;
mod trace;

pub use label::{label_regions, RegionLabels};

use std::fmt;
use std::str::FromStr;

use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, Coord, LineString, Polygon};
use log::debug;
use rayon::prelude::*;

use crate::coordinate::GeoTransform;
use crate::mask::Mask;
use trace::{signed_area2, trace_region, Ring};

/// Which cells count as touching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Edge neighbours only
    #[default]
    Four,
    /// Edge and corner neighbours
    Eight,
}

impl FromStr for Connectivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4" | "four" => Ok(Connectivity::Four),
            "8" | "eight" => Ok(Connectivity::Eight),
            other => Err(format!("connectivity must be 4 or 8, got '{}'", other)),
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Four => write!(f, "4"),
            Connectivity::Eight => write!(f, "8"),
        }
    }
}

/// Polygons of a vectorized mask, in map coordinates
#[derive(Debug, Clone, Default)]
pub struct PolygonSet {
    polygons: Vec<Polygon<f64>>,
}

impl PolygonSet {
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        PolygonSet { polygons }
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Planar area of each polygon, holes subtracted
    pub fn areas(&self) -> Vec<f64> {
        self.polygons.iter().map(|p| p.unsigned_area()).collect()
    }

    /// Sum of polygon areas, in squared map units
    pub fn total_area(&self) -> f64 {
        self.polygons.iter().map(|p| p.unsigned_area()).sum()
    }
}

/// Vectorizes a mask
///
/// # Arguments
/// * `mask` - Binary mask
/// * `transform` - Cell-to-map transform of the mask's grid
/// * `connectivity` - Neighbourhood used to group true cells
pub fn vectorize(mask: &Mask, transform: &GeoTransform, connectivity: Connectivity) -> PolygonSet {
    let labels = label_regions(mask, connectivity);
    debug!("Labelled {} regions ({}-connected)", labels.count, connectivity);

    let polygons: Vec<Polygon<f64>> = labels
        .regions()
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, cells)| {
            let rings = trace_region(cells, &labels, i as u32 + 1, connectivity);
            assemble(rings, transform)
        })
        .collect();

    PolygonSet::new(polygons)
}

/// Builds polygons from the rings of one region
///
/// A region has a single exterior ring; should tracing ever return more,
/// each hole goes to the smallest exterior whose bounds contain it.
fn assemble(rings: Vec<Ring>, transform: &GeoTransform) -> Vec<Polygon<f64>> {
    let (exteriors, holes): (Vec<Ring>, Vec<Ring>) =
        rings.into_iter().partition(|r| signed_area2(r) > 0);

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); exteriors.len()];
    for hole in holes {
        let bounds = ring_bounds(&hole);
        let owner = exteriors
            .iter()
            .enumerate()
            .filter(|(_, ext)| bounds_contain(&ring_bounds(ext), &bounds))
            .min_by_key(|(_, ext)| signed_area2(ext))
            .map(|(i, _)| i);

        match owner {
            Some(i) => interiors[i].push(to_line_string(&hole, transform)),
            None => debug!("Dropping hole ring without an enclosing exterior"),
        }
    }

    exteriors
        .iter()
        .zip(interiors)
        .map(|(ext, holes)| Polygon::new(to_line_string(ext, transform), holes).orient(Direction::Default))
        .collect()
}

type Bounds = (i64, i64, i64, i64);

fn ring_bounds(ring: &[(i64, i64)]) -> Bounds {
    ring.iter().fold((i64::MAX, i64::MAX, i64::MIN, i64::MIN), |b, v| {
        (b.0.min(v.0), b.1.min(v.1), b.2.max(v.0), b.3.max(v.1))
    })
}

fn bounds_contain(outer: &Bounds, inner: &Bounds) -> bool {
    outer.0 <= inner.0 && outer.1 <= inner.1 && outer.2 >= inner.2 && outer.3 >= inner.3
}

fn to_line_string(ring: &[(i64, i64)], transform: &GeoTransform) -> LineString<f64> {
    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(c, r)| transform.cell_to_map(c as f64, r as f64).into())
        .collect();
    LineString::new(coords)
}
