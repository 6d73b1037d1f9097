use crate::camera::CameraIntrinsics;
use crate::context::ProcessingContext;
use crate::elevation::{self, HeightSource};
use crate::error::Error;
use crate::geodesy::{self, UtmPoint};
use crate::orientation::{camera_rotation, rotate_rays};
use crate::state::{Attitude, GeoPosition};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use nalgebra::Vector3;
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything the engine needs to know about one captured image.
///
/// Metadata extraction resolves tag-name ambiguity upstream; by the time a
/// capture reaches the engine the attitude and intrinsics are single,
/// settled values.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageCapture {
    pub position: GeoPosition,
    /// Camera mount attitude, authoritative for ray rotation.
    pub gimbal: Attitude,
    /// Airframe attitude; defaults to the gimbal attitude when the metadata
    /// carries none.
    pub flight: Option<Attitude>,
    pub intrinsics: CameraIntrinsics,
    /// Pixel dimensions of the image, informational only.
    pub image_dimensions: (u32, u32),
    pub captured_at: DateTime<Utc>,
}

impl ImageCapture {
    pub fn flight_attitude(&self) -> Attitude {
        self.flight.unwrap_or(self.gimbal)
    }
}

/// The ground quadrilateral visible in one image.
///
/// Corners are `(lon, lat)` pairs (or `(easting, northing)` for a projected
/// target) in the camera-corner order documented on
/// [`CameraIntrinsics::corner_rays`]: top-right, top-left, bottom-left,
/// bottom-right. The ring is neither closed nor winding-corrected; that is
/// the downstream ring builder's job.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footprint {
    pub wgs84: [(f64, f64); 4],
    pub target: [(f64, f64); 4],
}

/// Compute the ground footprint of a single image.
///
/// Pure in its inputs aside from the shared read-only context; calling it
/// twice with the same capture and unchanged services yields the same
/// footprint.
pub fn compute_footprint(
    ctx: &ProcessingContext,
    capture: &ImageCapture,
) -> Result<Footprint, Error> {
    let config = ctx.config();

    let declination = match (config.correct_declination, ctx.declination()) {
        (true, Some(service)) => service.declination_at(&capture.position, capture.captured_at),
        _ => 0.0,
    };

    let rotation = camera_rotation(capture.gimbal, declination);
    let rays = rotate_rays(&rotation, &capture.intrinsics.corner_rays());

    let (height, height_source) = elevation::resolve_height(
        ctx.raster(),
        ctx.elevation_source(),
        &capture.position,
        config.max_height_deviation,
        config.refraction_factor,
    );
    debug!(
        "image at ({:.6}, {:.6}): declination {declination:.2} deg, height {height:.1} m ({height_source:?})",
        capture.position.latitude, capture.position.longitude
    );

    let corners = ground_corners(&capture.position, &rays, height)?;
    let ratio = side_ratio(&corners);

    let corners = if ratio > config.max_side_ratio {
        if height_source == HeightSource::RelativeAltitude {
            // No elevation refinement to back out of.
            return Err(Error::DegenerateFootprint { ratio });
        }

        warn!(
            "footprint side ratio {ratio:.1} exceeds {:.1}, recomputing with relative altitude",
            config.max_side_ratio
        );
        let fallback_height =
            capture.position.relative_altitude * (1.0 + config.refraction_factor);
        let corners = ground_corners(&capture.position, &rays, fallback_height)?;

        let ratio = side_ratio(&corners);
        if ratio > config.max_side_ratio {
            return Err(Error::DegenerateFootprint { ratio });
        }
        corners
    } else {
        corners
    };

    let mut wgs84 = [(0.0, 0.0); 4];
    let mut target = [(0.0, 0.0); 4];
    for (index, corner) in corners.iter().enumerate() {
        let (lat, lon) = geodesy::to_wgs84(corner);
        wgs84[index] = (lon, lat);
        target[index] = ctx.target().express(lon, lat)?;
    }

    Ok(Footprint { wgs84, target })
}

/// Compute footprints for a batch of images on the rayon worker pool.
///
/// Images are independent; results come back in input order, one per
/// capture. A failed image is logged and reported in place, never fatal to
/// the batch.
pub fn compute_footprints(
    ctx: &ProcessingContext,
    captures: &[ImageCapture],
) -> Vec<Result<Footprint, Error>> {
    captures
        .par_iter()
        .map(|capture| {
            compute_footprint(ctx, capture).inspect_err(|err| {
                warn!(
                    "skipping image at ({:.6}, {:.6}): {err}",
                    capture.position.latitude, capture.position.longitude
                )
            })
        })
        .collect()
}

/// Intersect the rays with the ground and anchor the local offsets at the
/// drone's UTM position.
fn ground_corners(
    position: &GeoPosition,
    rays: &[Vector3<f64>; 4],
    height: f64,
) -> Result<[UtmPoint; 4], Error> {
    let zone = geodesy::utm_zone(position.latitude, position.longitude);
    let hemisphere = geodesy::hemisphere(position.latitude);
    let anchor = geodesy::to_utm(position.latitude, position.longitude, zone, hemisphere)?;

    let local = crate::ground::intersect_ground(rays, height)?;
    Ok(local.map(|point| anchor.offset(point.x, point.y)))
}

/// Ratio of the longest to the shortest side of the quadrilateral in the
/// projected frame. A large ratio marks a degenerate footprint, typically
/// caused by a bad elevation sample.
fn side_ratio(corners: &[UtmPoint; 4]) -> f64 {
    let mut longest = f64::MIN;
    let mut shortest = f64::MAX;

    for index in 0..4 {
        let a = &corners[index];
        let b = &corners[(index + 1) % 4];
        let side = (a.easting - b.easting).hypot(a.northing - b.northing);

        longest = longest.max(side);
        shortest = shortest.min(side);
    }

    longest / shortest
}
