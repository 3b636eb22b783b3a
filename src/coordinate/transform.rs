//! Point transformation between two projections

use super::bbox::BoundingBox;
use super::point::Point;
use super::projection::Projection;

/// Transforms map coordinates of one projection into another
/// through longitude/latitude
pub struct CoordinateTransformer {
    source: Projection,
    target: Projection,
    identity: bool,
}

impl CoordinateTransformer {
    pub fn new(source: Projection, target: Projection) -> Self {
        CoordinateTransformer {
            source,
            target,
            identity: source == target,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transforms a point; `None` when either projection cannot represent it
    pub fn transform_point(&self, point: &Point) -> Option<Point> {
        if self.identity {
            return Some(*point);
        }

        let lonlat = self.source.inverse(point.x, point.y)?;
        self.target.forward(lonlat.x, lonlat.y)
    }

    /// Bounding box of a transformed box
    ///
    /// Each edge is sampled `densify` times since the image of a straight
    /// edge is curved. Returns `None` when no sample can be transformed.
    pub fn transform_bbox(&self, bbox: &BoundingBox, densify: usize) -> Option<BoundingBox> {
        if self.identity {
            return Some(*bbox);
        }

        let steps = densify.max(1);
        let mut samples = Vec::with_capacity(4 * (steps + 1));
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = bbox.min_x + t * bbox.width();
            let y = bbox.min_y + t * bbox.height();
            samples.push(Point::new(x, bbox.min_y));
            samples.push(Point::new(x, bbox.max_y));
            samples.push(Point::new(bbox.min_x, y));
            samples.push(Point::new(bbox.max_x, y));
        }

        let transformed: Vec<Point> = samples.iter().filter_map(|p| self.transform_point(p)).collect();
        BoundingBox::from_points(transformed.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::crs::CrsRegistry;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity() {
        let laea = CrsRegistry::lookup("EPSG:6932").unwrap().projection;
        let esri = CrsRegistry::lookup("ESRI:102020").unwrap().projection;
        let transformer = CoordinateTransformer::new(laea, esri);
        assert!(transformer.is_identity());
        assert_eq!(transformer.transform_point(&Point::new(1.0, 2.0)), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn test_stereographic_to_laea_and_back() {
        let stere = CrsRegistry::from_epsg(3412).unwrap().projection;
        let laea = CrsRegistry::from_epsg(6932).unwrap().projection;
        let forward = CoordinateTransformer::new(stere, laea);
        let backward = CoordinateTransformer::new(laea, stere);

        let p = Point::new(-1_200_000.0, 850_000.0);
        let there = forward.transform_point(&p).unwrap();
        let back = backward.transform_point(&there).unwrap();
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-3);
    }

    #[test]
    fn test_bbox_contains_transformed_corners() {
        let stere = CrsRegistry::from_epsg(3412).unwrap().projection;
        let laea = CrsRegistry::from_epsg(6932).unwrap().projection;
        let transformer = CoordinateTransformer::new(stere, laea);

        let bbox = BoundingBox::new(-3_950_000.0, -3_950_000.0, 3_950_000.0, 4_350_000.0);
        let out = transformer.transform_bbox(&bbox, 16).unwrap();
        let corner = transformer.transform_point(&Point::new(bbox.max_x, bbox.max_y)).unwrap();
        assert!(out.contains(&corner));
    }
}
