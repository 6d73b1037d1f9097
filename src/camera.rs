use crate::error::Error;
use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical parameters of the camera that captured an image.
///
/// Sensor dimensions and focal length are millimeters. The FOV scale factors
/// are dimensionless multipliers that absorb lens effects the pinhole model
/// misses; they default to 1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    sensor_width: f64,
    sensor_height: f64,
    focal_length: f64,
    fov_scale_w: f64,
    fov_scale_h: f64,
}

impl CameraIntrinsics {
    /// Create intrinsics with unit FOV scale factors.
    ///
    /// Returns [`Error::InvalidIntrinsics`] if the focal length or either
    /// sensor dimension is not strictly positive, since the field of view is
    /// undefined in that case.
    pub fn new(sensor_width: f64, sensor_height: f64, focal_length: f64) -> Result<Self, Error> {
        Self::with_fov_scale(sensor_width, sensor_height, focal_length, 1.0, 1.0)
    }

    /// Create intrinsics with explicit FOV scale factors.
    pub fn with_fov_scale(
        sensor_width: f64,
        sensor_height: f64,
        focal_length: f64,
        fov_scale_w: f64,
        fov_scale_h: f64,
    ) -> Result<Self, Error> {
        if focal_length <= 0.0 {
            return Err(Error::InvalidIntrinsics {
                reason: format!("focal length must be positive, got {focal_length}"),
            });
        }

        if sensor_width <= 0.0 || sensor_height <= 0.0 {
            return Err(Error::InvalidIntrinsics {
                reason: format!(
                    "sensor dimensions must be positive, got {sensor_width}x{sensor_height}"
                ),
            });
        }

        Ok(Self {
            sensor_width,
            sensor_height,
            focal_length,
            fov_scale_w,
            fov_scale_h,
        })
    }

    pub fn sensor_width(&self) -> f64 {
        self.sensor_width
    }

    pub fn sensor_height(&self) -> f64 {
        self.sensor_height
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Horizontal and vertical field of view in radians.
    ///
    /// Computed from the pinhole model, `2 atan(d / 2f)`, then scaled by the
    /// corresponding lens correction factor.
    pub fn fov(&self) -> (f64, f64) {
        let fov_w = 2.0 * (self.sensor_width / (2.0 * self.focal_length)).atan() * self.fov_scale_w;
        let fov_h =
            2.0 * (self.sensor_height / (2.0 * self.focal_length)).atan() * self.fov_scale_h;
        (fov_w, fov_h)
    }

    /// The four corner rays of the field of view in the camera frame.
    ///
    /// The camera frame has +z along the optical axis, +y towards the right
    /// edge of the image, and +x towards the bottom edge. Rays are unit
    /// length and returned in a fixed order that downstream ring construction
    /// relies on:
    ///
    /// ```text
    /// index 0: top-right     (-tan(fov_v/2), +tan(fov_h/2), 1)
    /// index 1: top-left      (-tan(fov_v/2), -tan(fov_h/2), 1)
    /// index 2: bottom-left   (+tan(fov_v/2), -tan(fov_h/2), 1)
    /// index 3: bottom-right  (+tan(fov_v/2), +tan(fov_h/2), 1)
    /// ```
    pub fn corner_rays(&self) -> [Vector3<f64>; 4] {
        let (fov_w, fov_h) = self.fov();
        let th = (fov_w / 2.0).tan();
        let tv = (fov_h / 2.0).tan();

        [
            Vector3::new(-tv, th, 1.0).normalize(),
            Vector3::new(-tv, -th, 1.0).normalize(),
            Vector3::new(tv, -th, 1.0).normalize(),
            Vector3::new(tv, th, 1.0).normalize(),
        ]
    }
}
