use crate::declination::{DeclinationService, MagneticModel};
use crate::elevation::{CircuitBreaker, ElevationSource, TerrainRaster};
use crate::error::Error;
use crate::geodesy::Crs;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engine configuration shared by every image in a batch.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Target reference for footprint corners. WGS84 by default.
    pub target_epsg: u32,
    /// Correct gimbal yaw from magnetic to true north.
    pub correct_declination: bool,
    /// Resolved heights further than this from the relative altitude are
    /// discarded (meters).
    pub max_height_deviation: f64,
    /// Atmospheric refraction correction factor applied as `h * (1 + k)`.
    pub refraction_factor: f64,
    /// A footprint side longer than this multiple of another side marks the
    /// quadrilateral degenerate.
    pub max_side_ratio: f64,
    /// Consecutive remote-service failures tolerated before the service is
    /// disabled for the rest of the batch.
    pub service_failure_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_epsg: 4326,
            correct_declination: false,
            max_height_deviation: 20.0,
            refraction_factor: 1e-4,
            max_side_ratio: 5.0,
            service_failure_limit: 3,
        }
    }
}

/// Shared read-only state for a batch of footprint computations.
///
/// Built once at startup and never mutated afterwards; per-image work
/// borrows it. The only interior mutability is the consecutive-failure
/// counters behind the service breakers, which are atomic.
pub struct ProcessingContext {
    config: EngineConfig,
    target: Crs,
    raster: Option<TerrainRaster>,
    elevation_source: Option<Box<dyn ElevationSource>>,
    elevation_breaker: CircuitBreaker,
    declination: Option<DeclinationService>,
}

impl ProcessingContext {
    /// Build a context from a configuration.
    ///
    /// Fails with [`Error::UnsupportedEpsg`] if the target EPSG code is
    /// neither 4326 nor a UTM grid code.
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        let target = Crs::from_epsg(config.target_epsg)?;
        let elevation_breaker = CircuitBreaker::new(config.service_failure_limit);

        Ok(Self {
            config,
            target,
            raster: None,
            elevation_source: None,
            elevation_breaker,
            declination: None,
        })
    }

    /// Attach a loaded terrain raster, the preferred elevation source.
    pub fn with_terrain_raster(mut self, raster: TerrainRaster) -> Self {
        self.raster = Some(raster);
        self
    }

    /// Attach a remote elevation source, tried when the raster misses.
    pub fn with_elevation_source(mut self, source: Box<dyn ElevationSource>) -> Self {
        self.elevation_source = Some(source);
        self
    }

    /// Attach a magnetic model for declination correction.
    ///
    /// The model is only consulted when `correct_declination` is set.
    pub fn with_magnetic_model(mut self, model: Box<dyn MagneticModel>) -> Self {
        self.declination = Some(DeclinationService::new(
            model,
            self.config.service_failure_limit,
        ));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    pub(crate) fn raster(&self) -> Option<&TerrainRaster> {
        self.raster.as_ref()
    }

    pub(crate) fn elevation_source(&self) -> Option<(&dyn ElevationSource, &CircuitBreaker)> {
        self.elevation_source
            .as_deref()
            .map(|source| (source, &self.elevation_breaker))
    }

    pub(crate) fn declination(&self) -> Option<&DeclinationService> {
        self.declination.as_ref()
    }
}
