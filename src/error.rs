//! Error types for the calibration pass

use crate::geometry::Axis;

/// Errors that abort a calibration pass.
///
/// Trace misses are not represented here: a sample that never reaches the dome
/// is a regular outcome recorded in the trace result.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("grid resolution must be at least 2x2 (got {sample_x}x{sample_y})")]
    InvalidGridResolution { sample_x: usize, sample_y: usize },

    #[error("radial grid needs at least one ring and one point per ring (got {rings} rings, {points_per_ring} points)")]
    InvalidRadialGrid { rings: usize, points_per_ring: usize },

    #[error("dome parameterization needs at least 2 rings and 1 segment (got {num_rings} rings, {num_segments} segments)")]
    InvalidDomeParameters { num_rings: usize, num_segments: usize },

    #[error("maximum trace distance must be positive and finite (got {0})")]
    InvalidTraceDistance(f64),

    #[error("invalid projector optics: {0}")]
    InvalidProjector(String),

    #[error("invalid scene geometry: {0}")]
    InvalidScene(String),

    #[error("normalization axes must differ (both are {0:?})")]
    InvalidAxes(Axis),

    #[error("ray direction must be finite and non-zero")]
    DegenerateRay,

    #[error("cannot normalize: {axis:?} axis has no extent (min = max = {value})")]
    DegenerateRange { axis: Axis, value: f64 },

    #[error("cannot normalize an empty point list")]
    EmptyInput,

    #[error("no sample reached the dome, nothing to match against")]
    NoDomeHits,
}
