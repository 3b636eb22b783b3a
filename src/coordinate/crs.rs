//! Coordinate reference system registry
//!
//! Built-in definitions for the polar grids sea-ice products are distributed
//! on, looked up by `AUTHORITY:CODE` or by name, and resolution of the CRS
//! declared in a GeoTIFF's GeoKeys.

use std::collections::HashMap;
use std::fmt;
use lazy_static::lazy_static;
use log::debug;

use crate::error::{ExtentError, ExtentResult};
use crate::tiff::constants::{geo_codes, geo_keys};
use crate::tiff::geo_keys::GeoReference;
use super::projection::{Ellipsoid, Pole, Projection};

/// A named coordinate reference system
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    /// `AUTHORITY:CODE`, or "user-defined"
    pub code: String,
    pub name: String,
    pub projection: Projection,
}

impl Crs {
    pub fn new(code: impl Into<String>, name: impl Into<String>, projection: Projection) -> Self {
        Crs {
            code: code.into(),
            name: name.into(),
            projection,
        }
    }

    /// Whether two systems describe the same projection, whatever their codes
    pub fn same_projection(&self, other: &Crs) -> bool {
        self.projection == other.projection
    }

    pub fn is_equal_area(&self) -> bool {
        self.projection.is_equal_area()
    }

    /// EPSG code, when the system has one
    pub fn epsg_code(&self) -> Option<u16> {
        self.code.strip_prefix("EPSG:").and_then(|c| c.parse().ok())
    }

    /// GeoKeys declaring this system
    ///
    /// EPSG systems are written by code, anything else as a user-defined
    /// projection with its parameters.
    pub fn to_geo_reference(&self) -> GeoReference {
        let mut geo = GeoReference::default();
        geo.ascii_keys.insert(geo_keys::GT_CITATION, self.name.clone());

        if let Projection::Geographic { .. } = self.projection {
            geo.model_type = Some(geo_codes::MODEL_TYPE_GEOGRAPHIC);
            geo.geographic_cs = Some(self.epsg_code().unwrap_or(geo_codes::USER_DEFINED));
            if geo.geographic_cs == Some(geo_codes::USER_DEFINED) {
                insert_ellipsoid(&mut geo, self.projection.ellipsoid());
            }
            return geo;
        }

        geo.model_type = Some(geo_codes::MODEL_TYPE_PROJECTED);
        if let Some(code) = self.epsg_code() {
            geo.projected_cs = Some(code);
            return geo;
        }

        geo.projected_cs = Some(geo_codes::USER_DEFINED);
        geo.geographic_cs = Some(geo_codes::USER_DEFINED);
        geo.short_keys.insert(geo_keys::PROJ_LINEAR_UNITS, geo_codes::LINEAR_METER);
        insert_ellipsoid(&mut geo, self.projection.ellipsoid());

        match self.projection {
            Projection::PolarStereographic { pole, latitude_of_true_scale, central_meridian, false_easting, false_northing, .. } => {
                let origin = match pole {
                    Pole::North => 90.0,
                    Pole::South => -90.0,
                };
                geo.coord_transform = Some(geo_codes::CT_POLAR_STEREOGRAPHIC);
                geo.double_keys.insert(geo_keys::PROJ_NAT_ORIGIN_LAT, origin);
                geo.double_keys.insert(geo_keys::PROJ_STD_PARALLEL_1, latitude_of_true_scale);
                geo.double_keys.insert(geo_keys::PROJ_STRAIGHT_VERT_POLE_LONG, central_meridian);
                geo.double_keys.insert(geo_keys::PROJ_FALSE_EASTING, false_easting);
                geo.double_keys.insert(geo_keys::PROJ_FALSE_NORTHING, false_northing);
            },
            Projection::PolarLambertAzimuthal { pole, central_meridian, false_easting, false_northing, .. } => {
                let center = match pole {
                    Pole::North => 90.0,
                    Pole::South => -90.0,
                };
                geo.coord_transform = Some(geo_codes::CT_LAMBERT_AZIM_EQUAL_AREA);
                geo.double_keys.insert(geo_keys::PROJ_CENTER_LAT, center);
                geo.double_keys.insert(geo_keys::PROJ_CENTER_LONG, central_meridian);
                geo.double_keys.insert(geo_keys::PROJ_FALSE_EASTING, false_easting);
                geo.double_keys.insert(geo_keys::PROJ_FALSE_NORTHING, false_northing);
            },
            Projection::Geographic { .. } => {},
        }

        geo
    }
}

fn insert_ellipsoid(geo: &mut GeoReference, ellipsoid: Ellipsoid) {
    geo.double_keys.insert(geo_keys::GEOG_SEMI_MAJOR_AXIS, ellipsoid.semi_major);
    geo.double_keys.insert(geo_keys::GEOG_INV_FLATTENING, ellipsoid.inverse_flattening);
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

fn stereographic(ellipsoid: Ellipsoid, true_scale: f64, meridian: f64) -> Projection {
    Projection::PolarStereographic {
        ellipsoid,
        pole: Pole::of_latitude(true_scale),
        latitude_of_true_scale: true_scale,
        central_meridian: meridian,
        false_easting: 0.0,
        false_northing: 0.0,
    }
}

fn lambert_azimuthal(ellipsoid: Ellipsoid, pole: Pole) -> Projection {
    Projection::PolarLambertAzimuthal {
        ellipsoid,
        pole,
        central_meridian: 0.0,
        false_easting: 0.0,
        false_northing: 0.0,
    }
}

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, (&'static str, Projection)> = {
        let mut m = HashMap::new();
        m.insert("EPSG:4326", ("WGS 84", Projection::Geographic { ellipsoid: Ellipsoid::WGS84 }));
        m.insert("EPSG:3411", ("NSIDC Sea Ice Polar Stereographic North", stereographic(Ellipsoid::HUGHES_1980, 70.0, -45.0)));
        m.insert("EPSG:3412", ("NSIDC Sea Ice Polar Stereographic South", stereographic(Ellipsoid::HUGHES_1980, -70.0, 0.0)));
        m.insert("EPSG:3413", ("WGS 84 / NSIDC Sea Ice Polar Stereographic North", stereographic(Ellipsoid::WGS84, 70.0, -45.0)));
        m.insert("EPSG:3976", ("WGS 84 / NSIDC Sea Ice Polar Stereographic South", stereographic(Ellipsoid::WGS84, -70.0, 0.0)));
        m.insert("EPSG:3031", ("WGS 84 / Antarctic Polar Stereographic", stereographic(Ellipsoid::WGS84, -71.0, 0.0)));
        m.insert("EPSG:3995", ("WGS 84 / Arctic Polar Stereographic", stereographic(Ellipsoid::WGS84, 71.0, 0.0)));
        m.insert("EPSG:3408", ("NSIDC EASE-Grid North", lambert_azimuthal(Ellipsoid::EASE_SPHERE, Pole::North)));
        m.insert("EPSG:3409", ("NSIDC EASE-Grid South", lambert_azimuthal(Ellipsoid::EASE_SPHERE, Pole::South)));
        m.insert("EPSG:6931", ("WGS 84 / NSIDC EASE-Grid 2.0 North", lambert_azimuthal(Ellipsoid::WGS84, Pole::North)));
        m.insert("EPSG:6932", ("WGS 84 / NSIDC EASE-Grid 2.0 South", lambert_azimuthal(Ellipsoid::WGS84, Pole::South)));
        m.insert("ESRI:102017", ("North Pole Lambert Azimuthal Equal Area", lambert_azimuthal(Ellipsoid::WGS84, Pole::North)));
        m.insert("ESRI:102020", ("South Pole Lambert Azimuthal Equal Area", lambert_azimuthal(Ellipsoid::WGS84, Pole::South)));
        m
    };
}

/// Lookup of built-in coordinate reference systems
pub struct CrsRegistry;

impl CrsRegistry {
    /// Looks up `EPSG:6932`, `esri:102020`, a bare EPSG number, or a
    /// registered name such as "South Pole Lambert Azimuthal Equal Area"
    pub fn lookup(identifier: &str) -> ExtentResult<Crs> {
        let trimmed = identifier.trim();
        let upper = trimmed.to_uppercase();

        let key = if upper.parse::<u32>().is_ok() {
            format!("EPSG:{}", upper)
        } else {
            upper.replace(' ', "")
        };

        if let Some((code, (name, projection))) = REGISTRY.get_key_value(key.as_str()) {
            return Ok(Crs::new(*code, *name, *projection));
        }

        let wanted = normalize_name(trimmed);
        REGISTRY
            .iter()
            .find(|(_, (name, _))| normalize_name(name) == wanted)
            .map(|(code, (name, projection))| Crs::new(*code, *name, *projection))
            .ok_or_else(|| ExtentError::Projection(format!("unknown coordinate reference system '{}'", identifier)))
    }

    pub fn from_epsg(code: u16) -> ExtentResult<Crs> {
        Self::lookup(&format!("EPSG:{}", code))
    }

    /// Registered codes, sorted
    pub fn known_codes() -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = REGISTRY.keys().copied().collect();
        codes.sort();
        codes
    }

    /// CRS declared by a GeoTIFF
    ///
    /// Registered EPSG codes resolve through the registry; user-defined polar
    /// stereographic and polar Lambert azimuthal projections are rebuilt from
    /// their GeoKey parameters.
    pub fn from_geo_reference(geo: &GeoReference) -> ExtentResult<Crs> {
        if let Some(code) = geo.projected_cs.filter(|&c| c != geo_codes::USER_DEFINED) {
            return Self::from_epsg(code);
        }

        if let Some(transform) = geo.coord_transform {
            return Self::user_defined(geo, transform);
        }

        if geo.model_type == Some(geo_codes::MODEL_TYPE_GEOGRAPHIC) {
            return Ok(Crs::new("EPSG:4326", "WGS 84", Projection::Geographic { ellipsoid: ellipsoid_of(geo) }));
        }

        Err(ExtentError::Projection("raster declares no coordinate reference system".to_string()))
    }

    fn user_defined(geo: &GeoReference, transform: u16) -> ExtentResult<Crs> {
        let ellipsoid = ellipsoid_of(geo);
        let false_easting = geo.double_key(geo_keys::PROJ_FALSE_EASTING).unwrap_or(0.0);
        let false_northing = geo.double_key(geo_keys::PROJ_FALSE_NORTHING).unwrap_or(0.0);

        let projection = match transform {
            geo_codes::CT_POLAR_STEREOGRAPHIC => {
                let origin_lat = geo.double_key(geo_keys::PROJ_NAT_ORIGIN_LAT);
                let true_scale = geo.double_key(geo_keys::PROJ_STD_PARALLEL_1)
                    .or(origin_lat)
                    .ok_or_else(|| ExtentError::Projection(
                        "polar stereographic GeoKeys lack a latitude of true scale".to_string()
                    ))?;
                let meridian = geo.double_key(geo_keys::PROJ_STRAIGHT_VERT_POLE_LONG)
                    .or_else(|| geo.double_key(geo_keys::PROJ_NAT_ORIGIN_LONG))
                    .unwrap_or(0.0);

                Projection::PolarStereographic {
                    ellipsoid,
                    pole: Pole::of_latitude(origin_lat.unwrap_or(true_scale)),
                    latitude_of_true_scale: true_scale,
                    central_meridian: meridian,
                    false_easting,
                    false_northing,
                }
            },
            geo_codes::CT_LAMBERT_AZIM_EQUAL_AREA => {
                let center_lat = geo.double_key(geo_keys::PROJ_CENTER_LAT)
                    .or_else(|| geo.double_key(geo_keys::PROJ_NAT_ORIGIN_LAT))
                    .unwrap_or(0.0);
                if (center_lat.abs() - 90.0).abs() > 1e-9 {
                    return Err(ExtentError::Projection(format!(
                        "Lambert azimuthal equal-area centred at latitude {} is not supported, only polar aspects",
                        center_lat
                    )));
                }
                let meridian = geo.double_key(geo_keys::PROJ_CENTER_LONG)
                    .or_else(|| geo.double_key(geo_keys::PROJ_NAT_ORIGIN_LONG))
                    .unwrap_or(0.0);

                Projection::PolarLambertAzimuthal {
                    ellipsoid,
                    pole: Pole::of_latitude(center_lat),
                    central_meridian: meridian,
                    false_easting,
                    false_northing,
                }
            },
            other => {
                return Err(ExtentError::Projection(format!(
                    "unsupported GeoTIFF coordinate transformation {}", other
                )));
            },
        };

        debug!("User-defined projection: {}", projection);
        Ok(Crs::new("user-defined", projection.to_string(), projection))
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Ellipsoid from GeoKeys, WGS 84 when none is given
fn ellipsoid_of(geo: &GeoReference) -> Ellipsoid {
    let semi_major = match geo.double_key(geo_keys::GEOG_SEMI_MAJOR_AXIS) {
        Some(a) => a,
        None => return Ellipsoid::WGS84,
    };

    if let Some(b) = geo.double_key(geo_keys::GEOG_SEMI_MINOR_AXIS) {
        Ellipsoid::from_axes(semi_major, b)
    } else if let Some(inv_f) = geo.double_key(geo_keys::GEOG_INV_FLATTENING) {
        Ellipsoid { semi_major, inverse_flattening: inv_f }
    } else {
        Ellipsoid::sphere(semi_major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_forms() {
        let by_code = CrsRegistry::lookup("EPSG:6932").unwrap();
        assert_eq!(CrsRegistry::lookup("6932").unwrap(), by_code);
        assert_eq!(CrsRegistry::lookup(" epsg:6932 ").unwrap(), by_code);
        assert!(by_code.is_equal_area());
        assert_eq!(by_code.epsg_code(), Some(6932));
    }

    #[test]
    fn test_geo_reference_round_trip() {
        let epsg = CrsRegistry::lookup("EPSG:3412").unwrap();
        let geo = epsg.to_geo_reference();
        assert_eq!(geo.projected_cs, Some(3412));
        assert_eq!(CrsRegistry::from_geo_reference(&geo).unwrap(), epsg);

        let esri = CrsRegistry::lookup("ESRI:102020").unwrap();
        let geo = esri.to_geo_reference();
        assert!(geo.is_user_defined());
        let rebuilt = CrsRegistry::from_geo_reference(&geo).unwrap();
        assert!(rebuilt.same_projection(&esri));
    }

    #[test]
    fn test_esri_alias_shares_projection() {
        let esri = CrsRegistry::lookup("ESRI:102020").unwrap();
        let by_name = CrsRegistry::lookup("South Pole Lambert Azimuthal Equal Area").unwrap();
        assert_eq!(esri, by_name);
        assert!(esri.same_projection(&CrsRegistry::lookup("EPSG:6932").unwrap()));
        assert_eq!(esri.epsg_code(), None);
    }

    #[test]
    fn test_unknown_code() {
        assert!(matches!(CrsRegistry::lookup("EPSG:9999"), Err(ExtentError::Projection(_))));
    }

    #[test]
    fn test_from_geo_reference_epsg() {
        let geo = GeoReference { projected_cs: Some(3412), ..GeoReference::default() };
        let crs = CrsRegistry::from_geo_reference(&geo).unwrap();
        assert_eq!(crs.code, "EPSG:3412");
        assert!(!crs.is_equal_area());
    }

    #[test]
    fn test_user_defined_stereographic_matches_registry() {
        let mut geo = GeoReference {
            projected_cs: Some(geo_codes::USER_DEFINED),
            coord_transform: Some(geo_codes::CT_POLAR_STEREOGRAPHIC),
            ..GeoReference::default()
        };
        geo.double_keys.insert(geo_keys::GEOG_SEMI_MAJOR_AXIS, 6_378_273.0);
        geo.double_keys.insert(geo_keys::GEOG_INV_FLATTENING, 298.279_411_123_064);
        geo.double_keys.insert(geo_keys::PROJ_NAT_ORIGIN_LAT, -90.0);
        geo.double_keys.insert(geo_keys::PROJ_STD_PARALLEL_1, -70.0);
        geo.double_keys.insert(geo_keys::PROJ_STRAIGHT_VERT_POLE_LONG, 0.0);

        let crs = CrsRegistry::from_geo_reference(&geo).unwrap();
        assert!(crs.same_projection(&CrsRegistry::from_epsg(3412).unwrap()));
    }

    #[test]
    fn test_oblique_laea_rejected() {
        let mut geo = GeoReference {
            coord_transform: Some(geo_codes::CT_LAMBERT_AZIM_EQUAL_AREA),
            ..GeoReference::default()
        };
        geo.double_keys.insert(geo_keys::PROJ_CENTER_LAT, 52.0);
        assert!(CrsRegistry::from_geo_reference(&geo).is_err());
    }

    #[test]
    fn test_no_crs() {
        assert!(CrsRegistry::from_geo_reference(&GeoReference::default()).is_err());
    }
}
