//! GeoTIFF georeferencing: GeoKey directory and model tags
//!
//! Reads the GeoKeyDirectory (34735) together with its double and ASCII
//! parameter tags, the ModelPixelScale / ModelTiepoint / ModelTransformation
//! tags and the GDAL_NODATA tag into a `GeoReference`.

use std::collections::HashMap;
use std::fmt;
use log::{debug, warn};

use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{geo_codes, geo_keys, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One entry of the GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoKeyEntry {
    /// GeoKey identifier
    pub key_id: u16,
    /// Tag holding the value (0 = value stored in `value_offset`)
    pub tiff_tag_location: u16,
    /// Number of values
    pub count: u16,
    /// Value, or index into the referenced tag
    pub value_offset: u16,
}

impl GeoKeyEntry {
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry {
            key_id,
            tiff_tag_location,
            count,
            value_offset,
        }
    }
}

/// Georeferencing of a GeoTIFF image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoReference {
    /// GTModelTypeGeoKey (1 projected, 2 geographic)
    pub model_type: Option<u16>,
    /// GTRasterTypeGeoKey (1 PixelIsArea, 2 PixelIsPoint)
    pub raster_type: Option<u16>,
    /// ProjectedCSTypeGeoKey, usually an EPSG code
    pub projected_cs: Option<u16>,
    /// GeographicTypeGeoKey
    pub geographic_cs: Option<u16>,
    /// ProjCoordTransGeoKey of a user-defined projection
    pub coord_transform: Option<u16>,
    /// Short-valued keys by id
    pub short_keys: HashMap<u16, u16>,
    /// Double-valued keys by id (projection parameters, ellipsoid)
    pub double_keys: HashMap<u16, f64>,
    /// ASCII keys by id (citations)
    pub ascii_keys: HashMap<u16, String>,
    /// ModelPixelScale (sx, sy, sz)
    pub pixel_scale: Option<[f64; 3]>,
    /// First ModelTiepoint (i, j, k, x, y, z)
    pub tiepoint: Option<[f64; 6]>,
    /// ModelTransformation, row-major 4x4
    pub transformation: Option<[f64; 16]>,
    /// GDAL_NODATA value
    pub nodata: Option<f64>,
}

impl GeoReference {
    /// Whether the image carries any cell-to-map mapping
    pub fn has_model_mapping(&self) -> bool {
        self.transformation.is_some() || (self.pixel_scale.is_some() && self.tiepoint.is_some())
    }

    /// Whether cell values refer to the cell centre
    pub fn is_pixel_is_point(&self) -> bool {
        self.raster_type == Some(geo_codes::RASTER_PIXEL_IS_POINT)
    }

    /// Whether the projection is defined by parameters rather than a code
    pub fn is_user_defined(&self) -> bool {
        match self.projected_cs {
            Some(code) => code == geo_codes::USER_DEFINED,
            None => self.coord_transform.is_some(),
        }
    }

    /// A double-valued GeoKey
    pub fn double_key(&self, key_id: u16) -> Option<f64> {
        self.double_keys.get(&key_id).copied()
    }

    /// Short description of the coordinate system
    pub fn crs_description(&self) -> String {
        match (self.projected_cs, self.coord_transform) {
            (Some(code), _) if code != geo_codes::USER_DEFINED => format!("EPSG:{}", code),
            (_, Some(geo_codes::CT_POLAR_STEREOGRAPHIC)) => "user-defined polar stereographic".to_string(),
            (_, Some(geo_codes::CT_LAMBERT_AZIM_EQUAL_AREA)) => "user-defined Lambert azimuthal equal area".to_string(),
            (_, Some(ct)) => format!("user-defined (coordinate transform {})", ct),
            _ => match (self.model_type, self.geographic_cs) {
                (Some(geo_codes::MODEL_TYPE_GEOGRAPHIC), Some(code)) => format!("geographic EPSG:{}", code),
                _ => "unknown".to_string(),
            },
        }
    }
}

impl fmt::Display for GeoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Georeferencing:")?;
        writeln!(f, "  CRS: {}", self.crs_description())?;
        writeln!(f, "  Raster type: {}", if self.is_pixel_is_point() { "PixelIsPoint" } else { "PixelIsArea" })?;
        if let Some(scale) = self.pixel_scale {
            writeln!(f, "  Pixel scale: {} x {}", scale[0], scale[1])?;
        }
        if let Some(tp) = self.tiepoint {
            writeln!(f, "  Tiepoint: ({}, {}) -> ({}, {})", tp[0], tp[1], tp[3], tp[4])?;
        }
        if self.transformation.is_some() {
            writeln!(f, "  Model transformation: present")?;
        }
        match self.nodata {
            Some(nodata) => writeln!(f, "  NoData: {}", nodata)?,
            None => writeln!(f, "  NoData: none")?,
        }
        Ok(())
    }
}

/// Parser for GeoTIFF georeferencing
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Parses the GeoKey directory of an IFD
    ///
    /// # Returns
    /// The key entries, empty when the IFD has no GeoKeyDirectory tag
    pub fn parse_geo_key_directory(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<GeoKeyEntry>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(Vec::new());
        }

        let values = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
        if values.len() < 4 {
            return Err(TiffError::GenericError("Invalid GeoKey directory header".to_string()));
        }

        let num_keys = values[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}",
               values[0], values[1], values[2], num_keys);

        if values.len() < 4 + num_keys * 4 {
            return Err(TiffError::GenericError(format!(
                "GeoKey directory declares {} keys but holds {} values",
                num_keys, values.len()
            )));
        }

        let entries = values[4..4 + num_keys * 4]
            .chunks_exact(4)
            .map(|k| GeoKeyEntry::new(k[0] as u16, k[1] as u16, k[2] as u16, k[3] as u16))
            .collect();

        Ok(entries)
    }

    /// Reads the full georeferencing of an IFD
    ///
    /// Missing model tags leave the corresponding fields empty; a malformed
    /// GeoKey directory is an error.
    pub fn extract_geo_reference(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<GeoReference> {
        let mut geo = GeoReference::default();

        let entries = Self::parse_geo_key_directory(tiff_reader, reader, ifd)?;
        let double_params = if ifd.has_tag(tags::GEO_DOUBLE_PARAMS_TAG) {
            tiff_reader.read_tag_f64_values(reader, ifd, tags::GEO_DOUBLE_PARAMS_TAG)?
        } else {
            Vec::new()
        };
        let ascii_params = if ifd.has_tag(tags::GEO_ASCII_PARAMS_TAG) {
            tiff_reader.read_tag_ascii(reader, ifd, tags::GEO_ASCII_PARAMS_TAG)?
        } else {
            String::new()
        };

        for key in &entries {
            match key.tiff_tag_location {
                0 => {
                    geo.short_keys.insert(key.key_id, key.value_offset);
                },
                tags::GEO_DOUBLE_PARAMS_TAG => {
                    match double_params.get(key.value_offset as usize) {
                        Some(&value) => {
                            geo.double_keys.insert(key.key_id, value);
                        },
                        None => warn!("GeoKey {} points past GeoDoubleParams", key.key_id),
                    }
                },
                tags::GEO_ASCII_PARAMS_TAG => {
                    let start = key.value_offset as usize;
                    let end = (start + key.count as usize).min(ascii_params.len());
                    if let Some(text) = ascii_params.get(start..end) {
                        let text = text.trim_end_matches(|c: char| c == '|' || c == '\0');
                        geo.ascii_keys.insert(key.key_id, text.to_string());
                    }
                },
                other => warn!("GeoKey {} stored in unsupported tag {}", key.key_id, other),
            }
        }

        geo.model_type = geo.short_keys.get(&geo_keys::GT_MODEL_TYPE).copied();
        geo.raster_type = geo.short_keys.get(&geo_keys::GT_RASTER_TYPE).copied();
        geo.projected_cs = geo.short_keys.get(&geo_keys::PROJECTED_CS_TYPE).copied();
        geo.geographic_cs = geo.short_keys.get(&geo_keys::GEOGRAPHIC_TYPE).copied();
        geo.coord_transform = geo.short_keys.get(&geo_keys::PROJ_COORD_TRANS).copied();

        if ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) {
            let scale = tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
            if scale.len() >= 2 {
                geo.pixel_scale = Some([scale[0], scale[1], scale.get(2).copied().unwrap_or(0.0)]);
            }
        }

        if ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            let tie = tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
            if tie.len() >= 6 {
                geo.tiepoint = Some([tie[0], tie[1], tie[2], tie[3], tie[4], tie[5]]);
            }
        }

        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let matrix = tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            if matrix.len() >= 16 {
                let mut m = [0.0; 16];
                m.copy_from_slice(&matrix[..16]);
                geo.transformation = Some(m);
            }
        }

        if ifd.has_tag(tags::GDAL_NODATA) {
            let text = tiff_reader.read_tag_ascii(reader, ifd, tags::GDAL_NODATA)?;
            geo.nodata = parse_nodata(&text);
            if geo.nodata.is_none() {
                warn!("Ignoring unparseable GDAL_NODATA value '{}'", text);
            }
        }

        debug!("GeoReference: crs={}, mapping={}, nodata={:?}",
               geo.crs_description(), geo.has_model_mapping(), geo.nodata);
        Ok(geo)
    }
}

/// Parses a GDAL_NODATA string ("-9999", "nan", "255 ")
pub fn parse_nodata(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    trimmed.parse::<f64>().ok()
}
