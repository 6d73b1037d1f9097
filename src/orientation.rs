use crate::state::Attitude;
use nalgebra::{UnitQuaternion, Vector3};
use std::f64::consts::{FRAC_PI_2, TAU};

/// Resolve the gimbal attitude and magnetic declination into a single
/// rotation from the camera frame to the local ENU frame.
///
/// The gimbal reports yaw as a compass heading (clockwise from magnetic
/// north) and pitch as an elevation angle (zero at the horizon, -90 at
/// nadir). Those conventions are remapped before building the rotation:
/// yaw becomes a counter-clockwise deviation from true east, with the
/// declination added to move from magnetic to true heading, and pitch
/// becomes a deviation from straight up. Pass a zero declination when
/// correction is disabled.
///
/// The rotation is applied in yaw, pitch, roll order. The result is a unit
/// quaternion for any real-valued input.
pub fn camera_rotation(gimbal: Attitude, declination: f64) -> UnitQuaternion<f64> {
    let yaw_rad = (FRAC_PI_2 - (gimbal.yaw + declination).to_radians()).rem_euclid(TAU);
    let pitch_rad = FRAC_PI_2 - gimbal.pitch.to_radians();
    let roll_rad = gimbal.roll.to_radians();

    UnitQuaternion::from_euler_angles(roll_rad, pitch_rad, yaw_rad)
}

/// Rotate the camera-frame corner rays into the ENU frame.
///
/// Uses the quaternion sandwich product; the corner order of the input is
/// preserved.
pub fn rotate_rays(
    rotation: &UnitQuaternion<f64>,
    rays: &[Vector3<f64>; 4],
) -> [Vector3<f64>; 4] {
    rays.map(|ray| rotation * ray)
}
