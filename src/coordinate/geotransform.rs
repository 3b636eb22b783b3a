//! Affine cell-to-map transform
//!
//! Same six coefficients as a GDAL geotransform: map position of the top-left
//! corner of cell (col, row) is
//! `x = origin_x + col * pixel_width + row * row_rotation`,
//! `y = origin_y + col * col_rotation + row * pixel_height`.

use crate::error::{ExtentError, ExtentResult};
use crate::tiff::geo_keys::GeoReference;
use super::point::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    /// Negative for north-up grids
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform from the top-left corner and a square-or-not cell size
    pub fn north_up(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        GeoTransform {
            origin_x,
            pixel_width: cell_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -cell_height,
        }
    }

    /// Transform from GeoTIFF model tags
    ///
    /// ModelTransformation wins over scale + tiepoint. PixelIsPoint rasters
    /// are shifted half a cell so the transform always addresses corners.
    pub fn from_geo_reference(geo: &GeoReference) -> ExtentResult<Self> {
        let mut transform = if let Some(m) = geo.transformation {
            GeoTransform {
                origin_x: m[3],
                pixel_width: m[0],
                row_rotation: m[1],
                origin_y: m[7],
                col_rotation: m[4],
                pixel_height: m[5],
            }
        } else if let (Some(scale), Some(tie)) = (geo.pixel_scale, geo.tiepoint) {
            GeoTransform {
                origin_x: tie[3] - tie[0] * scale[0],
                pixel_width: scale[0],
                row_rotation: 0.0,
                origin_y: tie[4] + tie[1] * scale[1],
                col_rotation: 0.0,
                pixel_height: -scale[1],
            }
        } else {
            return Err(ExtentError::Projection(
                "raster has no ModelTransformation or ModelPixelScale/ModelTiepoint tags".to_string(),
            ));
        };

        if geo.is_pixel_is_point() {
            transform.origin_x -= 0.5 * (transform.pixel_width + transform.row_rotation);
            transform.origin_y -= 0.5 * (transform.col_rotation + transform.pixel_height);
        }

        if transform.determinant() == 0.0 || !transform.determinant().is_finite() {
            return Err(ExtentError::Projection("degenerate cell-to-map transform".to_string()));
        }

        Ok(transform)
    }

    /// Map position of a fractional cell coordinate
    pub fn cell_to_map(&self, col: f64, row: f64) -> Point {
        Point::new(
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Centre of cell (col, row)
    pub fn cell_center(&self, col: usize, row: usize) -> Point {
        self.cell_to_map(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional cell coordinate of a map position
    pub fn map_to_cell(&self, p: &Point) -> (f64, f64) {
        let det = self.determinant();
        let dx = p.x - self.origin_x;
        let dy = p.y - self.origin_y;
        let col = (dx * self.pixel_height - dy * self.row_rotation) / det;
        let row = (dy * self.pixel_width - dx * self.col_rotation) / det;
        (col, row)
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// Planar area of one cell
    pub fn cell_area(&self) -> f64 {
        self.determinant().abs()
    }

    /// Whether the grid is axis aligned
    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// The GeoTIFF tags reproducing this transform
    pub fn to_geo_reference(&self, mut geo: GeoReference) -> GeoReference {
        geo.raster_type = Some(crate::tiff::constants::geo_codes::RASTER_PIXEL_IS_AREA);
        if self.is_north_up() && self.pixel_height < 0.0 {
            geo.pixel_scale = Some([self.pixel_width, -self.pixel_height, 0.0]);
            geo.tiepoint = Some([0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]);
            geo.transformation = None;
        } else {
            geo.pixel_scale = None;
            geo.tiepoint = None;
            geo.transformation = Some([
                self.pixel_width, self.row_rotation, 0.0, self.origin_x,
                self.col_rotation, self.pixel_height, 0.0, self.origin_y,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ]);
        }
        geo
    }
}
