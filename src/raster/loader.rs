//! Loading rasters from GeoTIFF files

use log::{debug, warn};
use std::path::Path;

use crate::coordinate::{CrsRegistry, GeoTransform};
use crate::error::{ExtentError, ExtentResult};
use crate::tiff::{BandDecoder, GeoKeyParser, TiffError, TiffReader};
use super::Raster;

/// Decodes the first band of a GeoTIFF into a `Raster`
///
/// Container and pixel failures are `Decode` errors. A missing cell-to-map
/// transform is a `Projection` error. An unknown CRS leaves `crs` empty; the
/// caller decides whether that matters.
pub fn load_raster(path: impl AsRef<Path>) -> ExtentResult<Raster> {
    let path = path.as_ref();
    let mut tiff_reader = TiffReader::new();
    let tiff = tiff_reader.load(path).map_err(|e| ExtentError::decode(path, e))?;

    let ifd = tiff.main_ifd()
        .ok_or_else(|| ExtentError::decode(path, TiffError::InvalidHeader))?;
    if ifd.get_samples_per_pixel() > 1 {
        warn!("{} has {} bands, using the first", path.display(), ifd.get_samples_per_pixel());
    }

    let mut reader = tiff_reader.create_reader().map_err(|e| ExtentError::decode(path, e))?;
    let band = BandDecoder::new(&tiff_reader, ifd)
        .decode(&mut reader)
        .map_err(|e| ExtentError::decode(path, e))?;
    let geo = GeoKeyParser::extract_geo_reference(&tiff_reader, &mut reader, ifd)
        .map_err(|e| ExtentError::decode(path, e))?;

    let transform = GeoTransform::from_geo_reference(&geo).map_err(|e| match e {
        ExtentError::Projection(msg) => ExtentError::Projection(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;

    let crs = match CrsRegistry::from_geo_reference(&geo) {
        Ok(crs) => Some(crs),
        Err(e) => {
            warn!("{}: {}", path.display(), e);
            None
        }
    };

    debug!("Loaded {}: {}x{} {}, crs={}, nodata={:?}",
           path.display(), band.width, band.height, band.sample_type,
           crs.as_ref().map(|c| c.code.as_str()).unwrap_or("unknown"), geo.nodata);

    Ok(Raster::new(band.width, band.height, band.values, transform, crs)?
        .with_nodata(geo.nodata))
}
