use approx::assert_relative_eq;
use chrono::{DateTime, Utc};
use groundtrace::camera::CameraIntrinsics;
use groundtrace::elevation::{ElevationSource, TerrainRaster};
use groundtrace::error::Error;
use groundtrace::geodesy::{self, Hemisphere};
use groundtrace::state::{Attitude, GeoPosition};
use groundtrace::{EngineConfig, ImageCapture, ProcessingContext, compute_footprint, compute_footprints};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

fn capture_time() -> DateTime<Utc> {
    "2024-06-15T12:00:00+00:00".parse().unwrap()
}

/// Nadir capture over the equator: 50 m up, 10 mm focal length, 13.2x8.8 mm
/// sensor.
fn equator_nadir_capture() -> ImageCapture {
    ImageCapture {
        position: GeoPosition::new(0.0, 0.0, 50.0, 50.0),
        gimbal: Attitude::nadir(),
        flight: None,
        intrinsics: CameraIntrinsics::new(13.2, 8.8, 10.0).unwrap(),
        image_dimensions: (5472, 3648),
        captured_at: capture_time(),
    }
}

fn kingston_capture() -> ImageCapture {
    ImageCapture {
        position: GeoPosition::new(44.2187, -76.4747, 100.0, 500.0),
        gimbal: Attitude::nadir(),
        flight: None,
        intrinsics: CameraIntrinsics::new(13.2, 8.8, 10.0).unwrap(),
        image_dimensions: (5472, 3648),
        captured_at: capture_time(),
    }
}

struct CountingElevation {
    calls: Arc<AtomicU32>,
    elevation: f64,
}

impl ElevationSource for CountingElevation {
    fn elevation(&self, _latitude: f64, _longitude: f64) -> Result<f64, Error> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.elevation)
    }
}

struct FailingElevation {
    calls: Arc<AtomicU32>,
}

impl ElevationSource for FailingElevation {
    fn elevation(&self, _latitude: f64, _longitude: f64) -> Result<f64, Error> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(Error::ElevationService("gateway timeout".into()))
    }
}

#[test]
fn nadir_footprint_is_an_axis_aligned_rectangle() {
    let ctx = ProcessingContext::new(EngineConfig::default()).unwrap();
    let footprint = compute_footprint(&ctx, &equator_nadir_capture()).unwrap();

    // Height after the refraction correction, and the half extents of the
    // rectangle: h * tan(atan(6.6 / 10)) east-west, h * tan(atan(4.4 / 10))
    // north-south.
    let h = 50.0 * (1.0 + 1e-4);
    let half_width = h * 0.66;
    let half_height = h * 0.44;

    // Recover the local meter offsets by projecting the corners back into
    // the drone's UTM zone (31N at the equator prime meridian).
    let anchor = geodesy::to_utm(0.0, 0.0, 31, Hemisphere::North).unwrap();
    let expected = [
        (-half_width, half_height),  // top-right ray lands northwest
        (half_width, half_height),   // top-left ray lands northeast
        (half_width, -half_height),  // bottom-left ray lands southeast
        (-half_width, -half_height), // bottom-right ray lands southwest
    ];

    for ((lon, lat), (east, north)) in footprint.wgs84.iter().zip(expected) {
        let utm = geodesy::to_utm(*lat, *lon, 31, Hemisphere::North).unwrap();
        assert_relative_eq!(utm.easting - anchor.easting, east, epsilon = 1e-3);
        assert_relative_eq!(utm.northing - anchor.northing, north, epsilon = 1e-3);
    }

    // And in geographic terms: the known meters-per-degree at the equator.
    let deg_lon = half_width / 111_319.49;
    let deg_lat = half_height / 110_574.28;
    for ((lon, lat), (east, north)) in footprint.wgs84.iter().zip(expected) {
        assert_relative_eq!(*lon, east.signum() * deg_lon, epsilon = 1e-6);
        assert_relative_eq!(*lat, north.signum() * deg_lat, epsilon = 1e-6);
    }

    // Default target is WGS84, so both corner sets agree.
    assert_eq!(footprint.wgs84, footprint.target);
}

#[test]
fn engine_is_idempotent() {
    let ctx = ProcessingContext::new(EngineConfig::default()).unwrap();
    let capture = kingston_capture();

    let first = compute_footprint(&ctx, &capture).unwrap();
    let second = compute_footprint(&ctx, &capture).unwrap();

    assert_eq!(first, second);
}

#[test]
fn projected_target_reference_is_supported() {
    let config = EngineConfig {
        target_epsg: 32618,
        ..Default::default()
    };
    let ctx = ProcessingContext::new(config).unwrap();
    let footprint = compute_footprint(&ctx, &kingston_capture()).unwrap();

    // Target corners are UTM 18N meters; re-projecting the WGS84 corners
    // must reproduce them.
    for ((lon, lat), (east, north)) in footprint.wgs84.iter().zip(footprint.target) {
        let utm = geodesy::to_utm(*lat, *lon, 18, Hemisphere::North).unwrap();
        assert_relative_eq!(utm.easting, east, epsilon = 1e-6);
        assert_relative_eq!(utm.northing, north, epsilon = 1e-6);
    }
}

#[test]
fn implausible_raster_height_falls_back_to_relative_altitude() {
    // Terrain raster claims the ground is at 320 m, putting the drone 180 m
    // up. The log says 100 m: more than 20 m apart, so the raster value must
    // be discarded and the footprint must match a raster-less run.
    let capture = kingston_capture();
    let anchor = geodesy::to_utm(
        capture.position.latitude,
        capture.position.longitude,
        18,
        Hemisphere::North,
    )
    .unwrap();
    let raster = TerrainRaster::from_grid(
        vec![320.0; 4],
        2,
        2,
        (anchor.easting - 10.0, anchor.northing + 10.0),
        (10.0, 10.0),
        18,
        Hemisphere::North,
        None,
    )
    .unwrap();

    let with_raster = ProcessingContext::new(EngineConfig::default())
        .unwrap()
        .with_terrain_raster(raster);
    let without_raster = ProcessingContext::new(EngineConfig::default()).unwrap();

    assert_eq!(
        compute_footprint(&with_raster, &capture).unwrap(),
        compute_footprint(&without_raster, &capture).unwrap()
    );
}

#[test]
fn degenerate_footprint_recomputes_once_then_fails() {
    // A camera pitched 24 degrees below the horizon puts the top corner rays
    // a fraction of a degree under it: the far side of the quadrilateral is
    // hundreds of times longer than the near side. The first pass uses the
    // remote elevation; the mandatory recomputation bypasses it, and since
    // the shape does not depend on the height the image ultimately fails.
    let calls = Arc::new(AtomicU32::new(0));
    let source = CountingElevation {
        calls: Arc::clone(&calls),
        elevation: 400.0,
    };
    let ctx = ProcessingContext::new(EngineConfig::default())
        .unwrap()
        .with_elevation_source(Box::new(source));

    let capture = ImageCapture {
        gimbal: Attitude::new(0.0, -24.0, 0.0),
        ..kingston_capture()
    };

    match compute_footprint(&ctx, &capture) {
        Err(Error::DegenerateFootprint { ratio }) => assert!(ratio > 5.0),
        other => panic!("expected DegenerateFootprint, got {other:?}"),
    }

    // The elevation service was consulted exactly once: the fallback pass
    // must use the relative altitude directly.
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn elevation_outage_disables_the_service_batch_wide() {
    let calls = Arc::new(AtomicU32::new(0));
    let source = FailingElevation {
        calls: Arc::clone(&calls),
    };
    let ctx = ProcessingContext::new(EngineConfig::default())
        .unwrap()
        .with_elevation_source(Box::new(source));
    let baseline = ProcessingContext::new(EngineConfig::default()).unwrap();

    let capture = kingston_capture();
    for _ in 0..5 {
        // Every image still succeeds on the relative-altitude fallback.
        let footprint = compute_footprint(&ctx, &capture).unwrap();
        assert_eq!(footprint, compute_footprint(&baseline, &capture).unwrap());
    }

    // Three consecutive failures open the breaker; the last two images
    // never reach the service.
    assert_eq!(calls.load(Ordering::Relaxed), 3);
}

#[test]
fn batch_results_keep_input_order() {
    let ctx = ProcessingContext::new(EngineConfig::default()).unwrap();
    let captures: Vec<ImageCapture> = (0..8)
        .map(|i| ImageCapture {
            position: GeoPosition::new(44.2187 + i as f64 * 0.001, -76.4747, 100.0, 500.0),
            ..kingston_capture()
        })
        .collect();

    let batch = compute_footprints(&ctx, &captures);
    assert_eq!(batch.len(), captures.len());

    for (capture, result) in captures.iter().zip(&batch) {
        let individual = compute_footprint(&ctx, capture).unwrap();
        assert_eq!(*result.as_ref().unwrap(), individual);
    }
}

#[test]
fn declination_rotates_the_footprint() {
    struct FixedDeclination;

    impl groundtrace::declination::MagneticModel for FixedDeclination {
        fn declination(
            &self,
            _latitude: f64,
            _longitude: f64,
            _epoch: groundtrace::declination::ModelEpoch,
            _year: f64,
        ) -> Result<f64, Error> {
            Ok(90.0)
        }
    }

    let config = EngineConfig {
        correct_declination: true,
        ..Default::default()
    };
    let corrected = ProcessingContext::new(config)
        .unwrap()
        .with_magnetic_model(Box::new(FixedDeclination));
    let uncorrected = ProcessingContext::new(EngineConfig::default()).unwrap();

    let capture = equator_nadir_capture();
    let rotated = compute_footprint(&corrected, &capture).unwrap();
    let straight = compute_footprint(&uncorrected, &capture).unwrap();

    // A +90 degree declination swings the true heading a quarter turn
    // clockwise, so each corner's local offset maps (east, north) to
    // (north, -east). Compare metric offsets recovered in UTM 31N.
    let anchor = geodesy::to_utm(0.0, 0.0, 31, Hemisphere::North).unwrap();
    let offset = |lon: f64, lat: f64| {
        let utm = geodesy::to_utm(lat, lon, 31, Hemisphere::North).unwrap();
        (utm.easting - anchor.easting, utm.northing - anchor.northing)
    };

    for index in 0..4 {
        let (east_r, north_r) = offset(rotated.wgs84[index].0, rotated.wgs84[index].1);
        let (east_s, north_s) = offset(straight.wgs84[index].0, straight.wgs84[index].1);

        assert_relative_eq!(east_r, north_s, epsilon = 1e-3);
        assert_relative_eq!(north_r, -east_s, epsilon = 1e-3);
    }
}
