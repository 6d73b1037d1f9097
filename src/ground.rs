use crate::error::Error;
use nalgebra::Vector3;

/// Intersect the four ENU corner rays with the local ground plane.
///
/// Rays are cast from the drone's local origin at `(0, 0, height)` where
/// `height` is the elevation-corrected height above ground. Each ray meets
/// the plane at `t = -height / ray.z`; the returned points have `z` forced
/// to exactly zero and keep the corner order of the input.
///
/// A ray with `ray.z == 0` runs parallel to the ground and never intersects
/// it. That implies the camera is pointed at the horizon, which is a data
/// error for footprint work, so the whole image fails with
/// [`Error::HorizontalRay`].
pub fn intersect_ground(
    rays: &[Vector3<f64>; 4],
    height: f64,
) -> Result<[Vector3<f64>; 4], Error> {
    let mut points = [Vector3::zeros(); 4];

    for (index, ray) in rays.iter().enumerate() {
        if ray.z == 0.0 {
            return Err(Error::HorizontalRay { index });
        }

        let t = -height / ray.z;
        let hit = Vector3::new(0.0, 0.0, height) + t * ray;
        points[index] = Vector3::new(hit.x, hit.y, 0.0);
    }

    Ok(points)
}
