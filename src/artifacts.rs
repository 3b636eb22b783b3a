//! Debug artifacts of an extraction
//!
//! Optional by-products written next to nothing else: the mask as a GeoTIFF
//! (`<stem>_mask.tif`, ice = 1, background nodata), a greyscale quicklook
//! (`<stem>_mask.png`) and the polygon layer as GeoJSON
//! (`<stem>_mask_poly.geojson`). None of them feed back into the record.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use geo::{Area, LineString, Polygon};
use image::{ImageBuffer, Luma};
use log::{info, warn};
use serde_json::{json, Value};

use crate::compression::AdobeDeflateHandler;
use crate::coordinate::{Crs, GeoTransform};
use crate::error::{ExtentError, ExtentResult};
use crate::mask::Mask;
use crate::tiff::{GeoTiffWriter, SampleType};
use crate::vectorize::PolygonSet;

/// Writes the artifacts of one source into a directory
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArtifactWriter { dir: dir.into() }
    }

    pub fn mask_tiff_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}_mask.tif", stem))
    }

    pub fn mask_png_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}_mask.png", stem))
    }

    pub fn polygons_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}_mask_poly.geojson", stem))
    }

    /// Writes every artifact; failures are logged and do not propagate
    pub fn write_all(&self, stem: &str, mask: &Mask, transform: &GeoTransform, crs: Option<&Crs>, polygons: &PolygonSet) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!("Cannot create artifacts directory {}: {}", self.dir.display(), e);
            return;
        }

        if let Err(e) = self.write_mask_tiff(stem, mask, transform, crs) {
            warn!("Mask GeoTIFF for {} not written: {}", stem, e);
        }
        if let Err(e) = self.write_mask_png(stem, mask) {
            warn!("Mask quicklook for {} not written: {}", stem, e);
        }
        if let Err(e) = self.write_polygons(stem, polygons, crs) {
            warn!("Polygon layer for {} not written: {}", stem, e);
        }
    }

    /// Mask as a deflate-compressed single-band u8 GeoTIFF
    pub fn write_mask_tiff(&self, stem: &str, mask: &Mask, transform: &GeoTransform, crs: Option<&Crs>) -> ExtentResult<PathBuf> {
        let path = self.mask_tiff_path(stem);

        let mut geo = crs.map(|c| c.to_geo_reference()).unwrap_or_default();
        geo.nodata = Some(0.0);
        let geo = transform.to_geo_reference(geo);

        let values: Vec<f64> = mask.cells().iter().map(|&c| if c { 1.0 } else { 0.0 }).collect();
        GeoTiffWriter::new(mask.width(), mask.height(), SampleType::U8)
            .with_compression(Box::new(AdobeDeflateHandler))
            .with_geo_reference(geo)
            .write(&values, &path)
            .map_err(|e| ExtentError::storage(&path, io::Error::other(e.to_string())))?;

        info!("Wrote mask GeoTIFF {}", path.display());
        Ok(path)
    }

    /// Mask as a black and white PNG
    pub fn write_mask_png(&self, stem: &str, mask: &Mask) -> ExtentResult<PathBuf> {
        let path = self.mask_png_path(stem);
        let pixels: Vec<u8> = mask.cells().iter().map(|&c| if c { 255 } else { 0 }).collect();

        let image: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(mask.width() as u32, mask.height() as u32, pixels)
                .ok_or_else(|| ExtentError::Config(format!("mask of {}x{} cells does not fit an image", mask.width(), mask.height())))?;
        image
            .save(&path)
            .map_err(|e| ExtentError::storage(&path, io::Error::other(e.to_string())))?;

        info!("Wrote mask quicklook {}", path.display());
        Ok(path)
    }

    /// Polygons as a GeoJSON feature collection with an area property
    pub fn write_polygons(&self, stem: &str, polygons: &PolygonSet, crs: Option<&Crs>) -> ExtentResult<PathBuf> {
        let path = self.polygons_path(stem);
        let document = feature_collection(stem, polygons, crs);

        let file = File::create(&path).map_err(|e| ExtentError::storage(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &document)
            .map_err(|e| ExtentError::storage(&path, e.into()))?;
        writer.flush().map_err(|e| ExtentError::storage(&path, e))?;

        info!("Wrote {} polygons to {}", polygons.len(), path.display());
        Ok(path)
    }
}

fn ring_coordinates(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

fn polygon_feature(id: usize, polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_coordinates(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_coordinates));

    json!({
        "type": "Feature",
        "id": id,
        "properties": { "area": polygon.unsigned_area() },
        "geometry": { "type": "Polygon", "coordinates": rings },
    })
}

/// GeoJSON document of a polygon set
///
/// Coordinates stay in the projected CRS, named in a `crs` member.
pub fn feature_collection(name: &str, polygons: &PolygonSet, crs: Option<&Crs>) -> Value {
    let features: Vec<Value> = polygons
        .polygons()
        .iter()
        .enumerate()
        .map(|(i, p)| polygon_feature(i + 1, p))
        .collect();

    let mut document = json!({
        "type": "FeatureCollection",
        "name": name,
        "features": features,
    });
    if let Some(crs) = crs {
        document["crs"] = json!({ "type": "name", "properties": { "name": crs.code } });
    }
    document
}

/// Removes the artifacts of one source, if present
pub fn remove_artifacts(dir: &Path, stem: &str) {
    let writer = ArtifactWriter::new(dir);
    for path in [writer.mask_tiff_path(stem), writer.mask_png_path(stem), writer.polygons_path(stem)] {
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Cannot remove {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CrsRegistry;
    use crate::raster::load_raster;
    use crate::vectorize::{vectorize, Connectivity};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seaice_artifacts_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample() -> (Mask, GeoTransform, Crs) {
        let mask = Mask::new(3, 3, vec![true, true, false, true, false, false, false, false, true]).unwrap();
        let transform = GeoTransform::north_up(-75_000.0, 75_000.0, 25_000.0, 25_000.0);
        (mask, transform, CrsRegistry::lookup("EPSG:6932").unwrap())
    }

    #[test]
    fn test_mask_tiff_reloads() {
        let dir = scratch_dir("tiff");
        let (mask, transform, crs) = sample();
        let writer = ArtifactWriter::new(&dir);
        fs::create_dir_all(&dir).unwrap();

        let path = writer.write_mask_tiff("grid", &mask, &transform, Some(&crs)).unwrap();
        let raster = load_raster(&path).unwrap();
        assert_eq!(raster.width(), 3);
        assert_eq!(raster.nodata(), Some(0.0));
        assert_eq!(raster.transform(), &transform);
        assert_eq!(raster.crs(), Some(&crs));
        assert_eq!(raster.valid_cell_count(), 4);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_all_and_remove() {
        let dir = scratch_dir("all");
        let (mask, transform, crs) = sample();
        let polygons = vectorize(&mask, &transform, Connectivity::Four);
        let writer = ArtifactWriter::new(&dir);

        writer.write_all("grid", &mask, &transform, Some(&crs), &polygons);
        assert!(writer.mask_tiff_path("grid").exists());
        assert!(writer.mask_png_path("grid").exists());

        let text = fs::read_to_string(writer.polygons_path("grid")).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["features"].as_array().unwrap().len(), 2);
        assert_eq!(doc["features"][0]["properties"]["area"], json!(1.875e9));
        assert_eq!(doc["crs"]["properties"]["name"], json!("EPSG:6932"));

        remove_artifacts(&dir, "grid");
        assert!(!writer.polygons_path("grid").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
