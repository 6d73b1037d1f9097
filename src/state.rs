#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Euler angles of a body with respect to the local ENU frame.
///
/// All angles are in degrees. Two attitudes exist per image: the gimbal
/// attitude and the flight (airframe) attitude. The gimbal attitude is
/// authoritative for ray rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Attitude {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    /// An attitude with all angles zero.
    pub fn level() -> Self {
        Self {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    /// The gimbal attitude of a camera pointed straight down.
    pub fn nadir() -> Self {
        Self {
            roll: 0.0,
            pitch: -90.0,
            yaw: 0.0,
        }
    }
}

impl From<(f64, f64, f64)> for Attitude {
    fn from(tuple: (f64, f64, f64)) -> Self {
        let (roll, pitch, yaw) = tuple;
        Self { roll, pitch, yaw }
    }
}

impl From<Attitude> for (f64, f64, f64) {
    fn from(att: Attitude) -> Self {
        (att.roll, att.pitch, att.yaw)
    }
}

/// The drone's position at capture.
///
/// Latitude and longitude are decimal degrees. The relative altitude is the
/// height above the takeoff point; the absolute altitude is above mean sea
/// level. Both are meters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub relative_altitude: f64,
    pub absolute_altitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64, relative_altitude: f64, absolute_altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            relative_altitude,
            absolute_altitude,
        }
    }
}
