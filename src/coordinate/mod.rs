//! Coordinate handling for polar grids
//!
//! Affine cell transforms, projection math, the CRS registry and point
//! transformation between projections.

mod bbox;
mod point;
mod transform;
pub mod crs;
pub mod geotransform;
pub mod projection;

pub use self::bbox::BoundingBox;
pub use self::point::Point;
pub use self::transform::CoordinateTransformer;
pub use self::crs::{Crs, CrsRegistry};
pub use self::geotransform::GeoTransform;
pub use self::projection::{Ellipsoid, Pole, Projection};
