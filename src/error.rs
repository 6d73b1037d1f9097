use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid camera intrinsics: {reason}")]
    InvalidIntrinsics { reason: String },

    #[error("corner ray {index} is parallel to the ground plane")]
    HorizontalRay { index: usize },

    #[error("footprint is degenerate after altitude fallback (side ratio {ratio:.1})")]
    DegenerateFootprint { ratio: f64 },

    #[error("unsupported target CRS: EPSG:{epsg}")]
    UnsupportedEpsg { epsg: u32 },

    #[error("latitude {latitude} is outside the UTM domain")]
    LatitudeOutOfRange { latitude: f64 },

    #[error("elevation service: {0}")]
    ElevationService(String),

    #[error("magnetic model: {0}")]
    MagneticModel(String),
}
