//! Magnetic declination lookup for yaw correction.
//!
//! Gimbal yaw is reported against magnetic north; footprints are computed
//! against true north. The difference is the declination at the capture
//! position and date, supplied by an external magnetic-field model behind
//! the [`MagneticModel`] trait.

use crate::elevation::CircuitBreaker;
use crate::error::Error;
use crate::state::GeoPosition;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::warn;

/// The five-year World Magnetic Model release covering a capture date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelEpoch {
    Wmm2015,
    Wmm2020,
    Wmm2025,
}

impl ModelEpoch {
    /// Select the release whose validity window contains `time`.
    ///
    /// Dates before 2015 fall back to the earliest release, dates past 2030
    /// to the latest; the models extrapolate poorly there but a stale
    /// declination still beats none.
    pub fn for_time(time: DateTime<Utc>) -> Self {
        match time.year() {
            ..=2019 => ModelEpoch::Wmm2015,
            2020..=2024 => ModelEpoch::Wmm2020,
            _ => ModelEpoch::Wmm2025,
        }
    }
}

/// Decimal year of a UTC timepoint, e.g. 2020-07-02 is roughly 2020.5.
///
/// Magnetic models take their time argument in this form.
pub fn fractional_year(time: DateTime<Utc>) -> f64 {
    let year = time.year();
    let days_in_year = NaiveDate::from_ymd_opt(year, 12, 31)
        .map(|d| d.ordinal() as f64)
        .unwrap_or(365.0);

    year as f64 + (time.ordinal0() as f64) / days_in_year
}

/// An external magnetic-field model.
///
/// Implementations evaluate whatever coefficient set or remote endpoint the
/// deployment uses; the engine asks only for the declination in degrees
/// (positive east) at a position and decimal year, under a specific model
/// release.
pub trait MagneticModel: Send + Sync {
    fn declination(
        &self,
        latitude: f64,
        longitude: f64,
        epoch: ModelEpoch,
        year: f64,
    ) -> Result<f64, Error>;
}

/// Adapter in front of a [`MagneticModel`].
///
/// Selects the model epoch from the capture time, computes the fractional
/// year, and degrades to a zero declination when the model keeps failing
/// (breaker shared across the batch).
pub struct DeclinationService {
    model: Box<dyn MagneticModel>,
    breaker: CircuitBreaker,
}

impl DeclinationService {
    pub fn new(model: Box<dyn MagneticModel>, failure_threshold: u32) -> Self {
        Self {
            model,
            breaker: CircuitBreaker::new(failure_threshold),
        }
    }

    /// Declination in degrees at `position` and `time`, zero if the model
    /// is unavailable.
    pub fn declination_at(&self, position: &GeoPosition, time: DateTime<Utc>) -> f64 {
        if self.breaker.is_open() {
            return 0.0;
        }

        let epoch = ModelEpoch::for_time(time);
        let year = fractional_year(time);

        match self
            .model
            .declination(position.latitude, position.longitude, epoch, year)
        {
            Ok(declination) => {
                self.breaker.record_success();
                declination
            }
            Err(err) => {
                if self.breaker.record_failure() {
                    warn!("magnetic model disabled for the rest of the batch: {err}");
                } else {
                    warn!("magnetic model failed, yaw left uncorrected: {err}");
                }
                0.0
            }
        }
    }
}
