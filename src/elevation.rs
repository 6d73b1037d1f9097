//! Terrain height resolution for the ray/ground intersection.
//!
//! The terrain under the footprint, not under the takeoff point, determines
//! the true intersection height, but any single source of terrain data may
//! be unavailable, out of extent, or wrong. Sources are tried as an explicit
//! ordered chain, each returning a tagged result, and the chain always ends
//! at the image's own relative altitude so a usable (if less accurate)
//! footprint survives.

use crate::error::Error;
use crate::geodesy::{self, Hemisphere};
use crate::state::GeoPosition;
use log::warn;
use std::sync::atomic::{AtomicU32, Ordering};

/// A remote elevation lookup, queried by geographic position.
///
/// Implementations wrap whatever transport the deployment uses (an HTTP DEM
/// service, a local database); the engine only sees elevations above mean
/// sea level in meters, or a transport error.
pub trait ElevationSource: Send + Sync {
    fn elevation(&self, latitude: f64, longitude: f64) -> Result<f64, Error>;
}

/// Disables a remote service batch-wide after repeated consecutive failures.
///
/// Shared by every worker through the processing context; converting a
/// persistent outage into a one-time fallback instead of per-image latency.
#[derive(Debug)]
pub struct CircuitBreaker {
    failures: AtomicU32,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: AtomicU32::new(0),
            threshold,
        }
    }

    pub fn is_open(&self) -> bool {
        self.failures.load(Ordering::Relaxed) >= self.threshold
    }

    /// Count a consecutive failure. Returns true once the breaker is open.
    pub fn record_failure(&self) -> bool {
        self.failures.fetch_add(1, Ordering::Relaxed) + 1 >= self.threshold
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
    }
}

/// An in-memory terrain raster, sampled in its own UTM frame.
///
/// Row-major grid of elevations above mean sea level, anchored at the
/// top-left corner of the extent. Loading a raster from disk is a concern of
/// the caller; this is the already-loaded handle shared read-only by every
/// worker.
#[derive(Clone, Debug)]
pub struct TerrainRaster {
    grid: Vec<f32>,
    rows: usize,
    cols: usize,
    /// Easting of the west edge, northing of the north edge.
    origin: (f64, f64),
    /// Pixel size in meters, both components positive.
    pixel_size: (f64, f64),
    zone: u32,
    hemisphere: Hemisphere,
    nodata: Option<f32>,
}

impl TerrainRaster {
    #[allow(clippy::too_many_arguments)]
    pub fn from_grid(
        grid: Vec<f32>,
        rows: usize,
        cols: usize,
        origin: (f64, f64),
        pixel_size: (f64, f64),
        zone: u32,
        hemisphere: Hemisphere,
        nodata: Option<f32>,
    ) -> Result<Self, Error> {
        if grid.len() != rows * cols {
            return Err(Error::ElevationService(format!(
                "raster grid holds {} samples, expected {}x{}",
                grid.len(),
                rows,
                cols
            )));
        }

        if pixel_size.0 <= 0.0 || pixel_size.1 <= 0.0 {
            return Err(Error::ElevationService(format!(
                "raster pixel size must be positive, got {:?}",
                pixel_size
            )));
        }

        Ok(Self {
            grid,
            rows,
            cols,
            origin,
            pixel_size,
            zone,
            hemisphere,
            nodata,
        })
    }

    pub fn zone(&self) -> u32 {
        self.zone
    }

    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// Sample the elevation at a UTM location in the raster's own zone.
    ///
    /// Returns None when the location falls outside the extent or the cell
    /// holds the nodata marker.
    pub fn sample(&self, easting: f64, northing: f64) -> Option<f64> {
        let col = (easting - self.origin.0) / self.pixel_size.0;
        let row = (self.origin.1 - northing) / self.pixel_size.1;

        if col < 0.0 || row < 0.0 {
            return None;
        }

        let (col, row) = (col.floor() as usize, row.floor() as usize);
        if col >= self.cols || row >= self.rows {
            return None;
        }

        let value = self.grid[row * self.cols + col];
        match self.nodata {
            Some(nodata) if value == nodata => None,
            _ => Some(value as f64),
        }
    }
}

/// Where the resolved height came from. Useful for diagnostics and for
/// asserting fallback behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeightSource {
    TerrainRaster,
    RemoteService,
    RelativeAltitude,
}

/// Resolve the height above ground used for the ray/ground intersection.
///
/// Priority chain, evaluated once per image:
/// (a) sample the terrain raster at the drone's UTM-projected location;
/// (b) query the remote elevation source, unless its breaker has opened;
/// (c) fall back to the image's own relative altitude.
///
/// Whatever the chain yields is sanity-checked against the relative altitude
/// (a resolved height more than `max_deviation` meters away is discarded)
/// and finally corrected for atmospheric refraction: `h * (1 + k)`.
pub fn resolve_height(
    raster: Option<&TerrainRaster>,
    remote: Option<(&dyn ElevationSource, &CircuitBreaker)>,
    position: &GeoPosition,
    max_deviation: f64,
    refraction: f64,
) -> (f64, HeightSource) {
    let (mut height, mut source) = (position.relative_altitude, HeightSource::RelativeAltitude);

    if let Some((h, s)) = raster
        .and_then(|r| raster_height(r, position))
        .map(|h| (h, HeightSource::TerrainRaster))
        .or_else(|| remote.and_then(|(src, brk)| remote_height(src, brk, position)))
    {
        height = h;
        source = s;
    }

    if (height - position.relative_altitude).abs() > max_deviation {
        warn!(
            "resolved height {height:.1} m deviates more than {max_deviation:.0} m from the \
             relative altitude {:.1} m, discarding it",
            position.relative_altitude
        );
        height = position.relative_altitude;
        source = HeightSource::RelativeAltitude;
    }

    (height * (1.0 + refraction), source)
}

fn raster_height(raster: &TerrainRaster, position: &GeoPosition) -> Option<f64> {
    let utm = match geodesy::to_utm(
        position.latitude,
        position.longitude,
        raster.zone(),
        raster.hemisphere(),
    ) {
        Ok(utm) => utm,
        Err(err) => {
            warn!("terrain raster lookup skipped: {err}");
            return None;
        }
    };

    match raster.sample(utm.easting, utm.northing) {
        Some(ground) => Some(position.absolute_altitude - ground),
        None => {
            warn!(
                "drone position ({:.6}, {:.6}) is outside the terrain raster extent",
                position.latitude, position.longitude
            );
            None
        }
    }
}

fn remote_height(
    source: &dyn ElevationSource,
    breaker: &CircuitBreaker,
    position: &GeoPosition,
) -> Option<(f64, HeightSource)> {
    if breaker.is_open() {
        return None;
    }

    match source.elevation(position.latitude, position.longitude) {
        Ok(ground) => {
            breaker.record_success();
            Some((
                position.absolute_altitude - ground,
                HeightSource::RemoteService,
            ))
        }
        Err(err) => {
            if breaker.record_failure() {
                warn!("elevation service disabled for the rest of the batch: {err}");
            } else {
                warn!("elevation service failed: {err}");
            }
            None
        }
    }
}
