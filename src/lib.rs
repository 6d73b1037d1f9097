//! Ground footprint projection for gimbal-stabilized drone imagery.
//!
//! Converts per-image camera state (position, altitude, intrinsics,
//! gimbal/flight attitude, capture time) into the four ground points visible
//! at the image corners, corrected for magnetic declination and terrain
//! elevation, and expressed in a target geodetic reference. Consumers use
//! the footprint to geo-rectify the source image and to build a vector layer
//! of coverage.
//!
//! Per-image computation is stateless aside from the shared read-only
//! [`ProcessingContext`]; batches run on the rayon worker pool via
//! [`compute_footprints`].

pub mod camera;
pub mod context;
pub mod declination;
pub mod elevation;
pub mod error;
pub mod footprint;
pub mod geodesy;
pub mod ground;
pub mod orientation;
pub mod state;

pub use context::{EngineConfig, ProcessingContext};
pub use error::Error;
pub use footprint::{Footprint, ImageCapture, compute_footprint, compute_footprints};
