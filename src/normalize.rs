//! Min/max rescaling of point lists into fixed output ranges

use nalgebra::Vector3;

use crate::error::CalibrationError;
use crate::geometry::{map_to_range, max_axis_value, min_axis_value, Axis};

/// Output range for screen points
pub const SCREEN_RANGE: (f64, f64) = (-1.0, 1.0);

/// Output range for texture coordinates
pub const TEXTURE_RANGE: (f64, f64) = (0.0, 1.0);

/// Minimum and maximum of `axis` over `points`
pub fn axis_extent(points: &[Vector3<f64>], axis: Axis) -> Result<(f64, f64), CalibrationError> {
    let min = min_axis_value(points, axis).ok_or(CalibrationError::EmptyInput)?;
    let max = max_axis_value(points, axis).ok_or(CalibrationError::EmptyInput)?;
    // Also rejects NaN extents
    if !(max > min) || !(max - min).is_finite() {
        return Err(CalibrationError::DegenerateRange { axis, value: min });
    }
    Ok((min, max))
}

/// Rescale `axis_a` and `axis_b` of every point into `[out_min, out_max]`,
/// each axis using its own extent over the whole list. The remaining axis is zeroed.
pub fn normalize(
    points: &[Vector3<f64>],
    axis_a: Axis,
    axis_b: Axis,
    out_min: f64,
    out_max: f64,
) -> Result<Vec<Vector3<f64>>, CalibrationError> {
    if axis_a == axis_b {
        return Err(CalibrationError::InvalidAxes(axis_a));
    }

    let (min_a, max_a) = axis_extent(points, axis_a)?;
    let (min_b, max_b) = axis_extent(points, axis_b)?;

    Ok(points
        .iter()
        .map(|p| {
            let mut out = Vector3::zeros();
            out[axis_a.index()] = map_to_range(axis_a.component(p), min_a, max_a, out_min, out_max);
            out[axis_b.index()] = map_to_range(axis_b.component(p), min_b, max_b, out_min, out_max);
            out
        })
        .collect())
}

/// Screen points: (x, y) into [-1, 1]
pub fn normalize_screen_points(
    points: &[Vector3<f64>],
) -> Result<Vec<Vector3<f64>>, CalibrationError> {
    normalize(points, Axis::X, Axis::Y, SCREEN_RANGE.0, SCREEN_RANGE.1)
}

/// Dome texture coordinates: (x, z) into [0, 1]
pub fn normalize_texture_coords(
    points: &[Vector3<f64>],
) -> Result<Vec<Vector3<f64>>, CalibrationError> {
    normalize(points, Axis::X, Axis::Z, TEXTURE_RANGE.0, TEXTURE_RANGE.1)
}
