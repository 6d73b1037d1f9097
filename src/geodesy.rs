//! WGS84 <-> UTM conversion (Snyder 1987, USGS Prof. Paper 1395).
//!
//! Pure-Rust transverse Mercator on the WGS84 ellipsoid, no libproj. UTM is
//! used as the intermediate frame for the footprint math because small
//! Cartesian offsets (tens to hundreds of meters) are cheap and accurate to
//! add in a locally-flat projected frame before reprojecting.

use crate::error::Error;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// WGS84 ellipsoid constants.
const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Hemisphere {
    North,
    South,
}

/// A point in the UTM projected frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UtmPoint {
    pub easting: f64,
    pub northing: f64,
    pub zone: u32,
    pub hemisphere: Hemisphere,
}

impl UtmPoint {
    /// Translate the point by a local east/north offset in meters.
    ///
    /// This is a flat-earth approximation, valid at the scale of a single
    /// image footprint.
    pub fn offset(&self, east: f64, north: f64) -> Self {
        Self {
            easting: self.easting + east,
            northing: self.northing + north,
            ..*self
        }
    }
}

/// The UTM zone containing a geographic point.
///
/// Standard 6-degree zones, with the two conventional grid exceptions:
/// southwest Norway is widened into zone 32, and the Svalbard zones 32X,
/// 34X, and 36X are skipped.
pub fn utm_zone(latitude: f64, longitude: f64) -> u32 {
    if (56.0..64.0).contains(&latitude) && (3.0..12.0).contains(&longitude) {
        return 32;
    }

    if (72.0..=84.0).contains(&latitude) && (0.0..42.0).contains(&longitude) {
        return match longitude {
            l if l < 9.0 => 31,
            l if l < 21.0 => 33,
            l if l < 33.0 => 35,
            _ => 37,
        };
    }

    (((longitude + 180.0) / 6.0).floor() as i64).clamp(0, 59) as u32 + 1
}

pub fn hemisphere(latitude: f64) -> Hemisphere {
    if latitude >= 0.0 {
        Hemisphere::North
    } else {
        Hemisphere::South
    }
}

/// Central meridian of a UTM zone, radians.
fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// Meridional arc from the equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

/// Project a WGS84 point into a UTM zone (Snyder eq. 8-9, 8-10).
///
/// The transverse Mercator series is undefined at the poles; latitudes
/// outside the UTM domain of [-80, 84] are rejected.
pub fn to_utm(
    latitude: f64,
    longitude: f64,
    zone: u32,
    hemisphere: Hemisphere,
) -> Result<UtmPoint, Error> {
    if !(-80.0..=84.0).contains(&latitude) {
        return Err(Error::LatitudeOutOfRange { latitude });
    }

    let lat = latitude.to_radians();
    let lon = longitude.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = match hemisphere {
        Hemisphere::North => northing,
        Hemisphere::South => northing + FALSE_NORTHING_SOUTH,
    };

    Ok(UtmPoint {
        easting,
        northing,
        zone,
        hemisphere,
    })
}

/// Project a UTM point back to WGS84 `(latitude, longitude)` in degrees
/// (Snyder eq. 8-17 through 8-25 with the footpoint latitude of eq. 3-26).
pub fn to_wgs84(point: &UtmPoint) -> (f64, f64) {
    let x = point.easting - FALSE_EASTING;
    let y = match point.hemisphere {
        Hemisphere::North => point.northing,
        Hemisphere::South => point.northing - FALSE_NORTHING_SOUTH,
    };

    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * E2 * E2 / 64.0 - 5.0 * E2 * E2 * E2 / 256.0));

    let e1 = (1.0 - (1.0 - E2).sqrt()) / (1.0 + (1.0 - E2).sqrt());
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude.
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = A / (1.0 - E2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = A * (1.0 - E2) / (1.0 - E2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(point.zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    (lat.to_degrees(), lon.to_degrees())
}

/// The geodetic reference footprint corners are expressed in.
///
/// WGS84 geographic (EPSG:4326) plus the UTM grids (EPSG:326xx north,
/// EPSG:327xx south). Anything else is rejected when the processing context
/// is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Crs {
    Wgs84,
    Utm { zone: u32, hemisphere: Hemisphere },
}

impl Crs {
    pub fn from_epsg(epsg: u32) -> Result<Self, Error> {
        match epsg {
            4326 => Ok(Crs::Wgs84),
            32601..=32660 => Ok(Crs::Utm {
                zone: epsg - 32600,
                hemisphere: Hemisphere::North,
            }),
            32701..=32760 => Ok(Crs::Utm {
                zone: epsg - 32700,
                hemisphere: Hemisphere::South,
            }),
            _ => Err(Error::UnsupportedEpsg { epsg }),
        }
    }

    /// Express a WGS84 `(lon, lat)` pair in this reference.
    ///
    /// For a projected target the returned pair is `(easting, northing)`.
    pub fn express(&self, lon: f64, lat: f64) -> Result<(f64, f64), Error> {
        match *self {
            Crs::Wgs84 => Ok((lon, lat)),
            Crs::Utm { zone, hemisphere } => {
                let utm = to_utm(lat, lon, zone, hemisphere)?;
                Ok((utm.easting, utm.northing))
            }
        }
    }
}
