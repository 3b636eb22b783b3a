//! Map projections of polar sea-ice grids
//!
//! Ellipsoidal polar stereographic and polar Lambert azimuthal equal-area,
//! both hemispheres, plus plain longitude/latitude. Formulas follow Snyder,
//! "Map Projections: A Working Manual" (USGS PP 1395).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;

use super::point::Point;

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres
    pub semi_major: f64,
    /// Inverse flattening, 0 for a sphere
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major: 6_378_137.0,
        inverse_flattening: 298.257_223_563,
    };

    /// Hughes 1980, used by the original NSIDC polar stereographic grids
    pub const HUGHES_1980: Ellipsoid = Ellipsoid {
        semi_major: 6_378_273.0,
        inverse_flattening: 298.279_411_123_064,
    };

    /// Authalic sphere of the original EASE-Grid
    pub const EASE_SPHERE: Ellipsoid = Ellipsoid {
        semi_major: 6_371_228.0,
        inverse_flattening: 0.0,
    };

    pub fn sphere(radius: f64) -> Self {
        Ellipsoid { semi_major: radius, inverse_flattening: 0.0 }
    }

    /// Ellipsoid from its two axes
    pub fn from_axes(semi_major: f64, semi_minor: f64) -> Self {
        let inverse_flattening = if semi_major == semi_minor {
            0.0
        } else {
            semi_major / (semi_major - semi_minor)
        };
        Ellipsoid { semi_major, inverse_flattening }
    }

    /// First eccentricity
    pub fn eccentricity(&self) -> f64 {
        if self.inverse_flattening == 0.0 {
            return 0.0;
        }
        let f = 1.0 / self.inverse_flattening;
        (f * (2.0 - f)).sqrt()
    }
}

/// Hemisphere of a polar aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pole {
    North,
    South,
}

impl Pole {
    fn sign(&self) -> f64 {
        match self {
            Pole::North => 1.0,
            Pole::South => -1.0,
        }
    }

    /// Pole on the side of the given latitude
    pub fn of_latitude(latitude: f64) -> Self {
        if latitude < 0.0 { Pole::South } else { Pole::North }
    }
}

/// A projection between longitude/latitude degrees and map metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Plain longitude/latitude in degrees
    Geographic { ellipsoid: Ellipsoid },
    /// Polar stereographic, variant B (latitude of true scale)
    PolarStereographic {
        ellipsoid: Ellipsoid,
        pole: Pole,
        latitude_of_true_scale: f64,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
    },
    /// Lambert azimuthal equal-area centred on a pole
    PolarLambertAzimuthal {
        ellipsoid: Ellipsoid,
        pole: Pole,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
    },
}

impl Projection {
    /// Whether planar areas equal ellipsoid surface areas
    pub fn is_equal_area(&self) -> bool {
        matches!(self, Projection::PolarLambertAzimuthal { .. })
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Projection::Geographic { .. })
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        match self {
            Projection::Geographic { ellipsoid }
            | Projection::PolarStereographic { ellipsoid, .. }
            | Projection::PolarLambertAzimuthal { ellipsoid, .. } => *ellipsoid,
        }
    }

    /// Projects longitude/latitude degrees to map coordinates
    ///
    /// Returns `None` for points the projection cannot represent (the
    /// opposite pole, non-finite input).
    pub fn forward(&self, lon: f64, lat: f64) -> Option<Point> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }

        match *self {
            Projection::Geographic { .. } => Some(Point::new(lon, lat)),
            Projection::PolarStereographic {
                ellipsoid, pole, latitude_of_true_scale, central_meridian, false_easting, false_northing,
            } => {
                let s = pole.sign();
                let phi = (s * lat).to_radians();
                let dlam = (s * (lon - central_meridian)).to_radians();
                let e = ellipsoid.eccentricity();

                if phi <= -FRAC_PI_2 + 1e-12 {
                    return None;
                }

                let rho = stereographic_rho(ellipsoid, e, phi, (s * latitude_of_true_scale).to_radians());
                let x = rho * dlam.sin();
                let y = -rho * dlam.cos();
                Some(Point::new(s * x + false_easting, s * y + false_northing))
            },
            Projection::PolarLambertAzimuthal {
                ellipsoid, pole, central_meridian, false_easting, false_northing,
            } => {
                let a = ellipsoid.semi_major;
                let e = ellipsoid.eccentricity();
                let phi = lat.to_radians();
                let dlam = (lon - central_meridian).to_radians();
                let qp = authalic_q(e, FRAC_PI_2);
                let q = authalic_q(e, phi);

                let rho_sq = match pole {
                    Pole::North => qp - q,
                    Pole::South => qp + q,
                };
                if rho_sq < 0.0 {
                    return None;
                }
                let rho = a * rho_sq.sqrt();
                // the antipodal pole maps to a circle, not a point
                let antipode = match pole {
                    Pole::North => lat <= -90.0 + 1e-12,
                    Pole::South => lat >= 90.0 - 1e-12,
                };
                if antipode {
                    return None;
                }

                let x = rho * dlam.sin();
                let y = match pole {
                    Pole::North => -rho * dlam.cos(),
                    Pole::South => rho * dlam.cos(),
                };
                Some(Point::new(x + false_easting, y + false_northing))
            },
        }
    }

    /// Map coordinates back to longitude/latitude degrees
    pub fn inverse(&self, x: f64, y: f64) -> Option<Point> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        match *self {
            Projection::Geographic { .. } => Some(Point::new(x, y)),
            Projection::PolarStereographic {
                ellipsoid, pole, latitude_of_true_scale, central_meridian, false_easting, false_northing,
            } => {
                let s = pole.sign();
                let x = s * (x - false_easting);
                let y = s * (y - false_northing);
                let e = ellipsoid.eccentricity();
                let rho = x.hypot(y);

                let t = stereographic_t_from_rho(ellipsoid, e, rho, (s * latitude_of_true_scale).to_radians());
                let mut phi = FRAC_PI_2 - 2.0 * t.atan();
                for _ in 0..15 {
                    let es = e * phi.sin();
                    let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
                    if (next - phi).abs() < 1e-14 {
                        phi = next;
                        break;
                    }
                    phi = next;
                }

                let lam = if rho == 0.0 { 0.0 } else { x.atan2(-y) };
                Some(Point::new(
                    normalize_longitude(s * lam.to_degrees() + central_meridian),
                    s * phi.to_degrees(),
                ))
            },
            Projection::PolarLambertAzimuthal {
                ellipsoid, pole, central_meridian, false_easting, false_northing,
            } => {
                let a = ellipsoid.semi_major;
                let e = ellipsoid.eccentricity();
                let x = x - false_easting;
                let y = y - false_northing;
                let rho = x.hypot(y);
                let qp = authalic_q(e, FRAC_PI_2);

                let q = match pole {
                    Pole::North => qp - (rho / a).powi(2),
                    Pole::South => (rho / a).powi(2) - qp,
                };
                if q.abs() > qp + 1e-12 {
                    return None;
                }

                let beta = (q / qp).clamp(-1.0, 1.0).asin();
                let phi = authalic_to_geodetic(beta, e);
                let lam = match pole {
                    Pole::North => x.atan2(-y),
                    Pole::South => x.atan2(y),
                };
                let lam = if rho == 0.0 { 0.0 } else { lam };
                Some(Point::new(
                    normalize_longitude(lam.to_degrees() + central_meridian),
                    phi.to_degrees(),
                ))
            },
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Geographic { .. } => write!(f, "geographic longitude/latitude"),
            Projection::PolarStereographic { pole, latitude_of_true_scale, central_meridian, .. } => write!(
                f, "{:?} polar stereographic (true scale {}°, meridian {}°)",
                pole, latitude_of_true_scale, central_meridian
            ),
            Projection::PolarLambertAzimuthal { pole, central_meridian, .. } => write!(
                f, "{:?} polar Lambert azimuthal equal-area (meridian {}°)", pole, central_meridian
            ),
        }
    }
}

/// Snyder's t for the pole-centred aspect
fn stereographic_t(e: f64, phi: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

fn conformal_m(e: f64, phi: f64) -> f64 {
    phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
}

/// Scale factor k0 at the pole when the true-scale latitude is the pole itself
fn pole_scale_denominator(e: f64) -> f64 {
    ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt()
}

fn stereographic_rho(ellipsoid: Ellipsoid, e: f64, phi: f64, phi_c: f64) -> f64 {
    let a = ellipsoid.semi_major;
    let t = stereographic_t(e, phi);
    if (phi_c - FRAC_PI_2).abs() < 1e-10 {
        2.0 * a * t / pole_scale_denominator(e)
    } else {
        a * conformal_m(e, phi_c) * t / stereographic_t(e, phi_c)
    }
}

fn stereographic_t_from_rho(ellipsoid: Ellipsoid, e: f64, rho: f64, phi_c: f64) -> f64 {
    let a = ellipsoid.semi_major;
    if (phi_c - FRAC_PI_2).abs() < 1e-10 {
        rho * pole_scale_denominator(e) / (2.0 * a)
    } else {
        rho * stereographic_t(e, phi_c) / (a * conformal_m(e, phi_c))
    }
}

/// Snyder's q, `2 sin(phi)` on the sphere
fn authalic_q(e: f64, phi: f64) -> f64 {
    let sin_phi = phi.sin();
    if e < 1e-12 {
        return 2.0 * sin_phi;
    }
    let es = e * sin_phi;
    (1.0 - e * e) * (sin_phi / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

/// Geodetic latitude from authalic latitude (series, Snyder 3-18)
fn authalic_to_geodetic(beta: f64, e: f64) -> f64 {
    let e2 = e * e;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    beta
        + (e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
        + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
        + (761.0 * e6 / 45360.0) * (6.0 * beta).sin()
}

fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if lon == -180.0 {
        lon = 180.0;
    }
    lon
}
