//! Canonical dome parameterization

use nalgebra::{UnitQuaternion, Vector3};

use crate::error::CalibrationError;

/// Unit vertices over the upper hemisphere.
///
/// The pole `(0, 1, 0)` comes first, then `num_rings` rings from the pole down
/// to the equator, each with `num_segments` points. Ring `i` is the pole tilted
/// by `i * 90 / (num_rings - 1)` degrees about X; segment `j` turns that by
/// `j * 360 / num_segments` degrees about Y. Ring 0 therefore repeats the pole.
///
/// Downstream files keep this order as the row correspondence key.
pub fn generate_dome_vertices(
    num_rings: usize,
    num_segments: usize,
) -> Result<Vec<Vector3<f64>>, CalibrationError> {
    if num_rings < 2 || num_segments < 1 {
        return Err(CalibrationError::InvalidDomeParameters {
            num_rings,
            num_segments,
        });
    }

    let pole = Vector3::y();
    let delta_phi = 90f64.to_radians() / (num_rings - 1) as f64;
    let delta_theta = 360f64.to_radians() / num_segments as f64;

    let mut vertices = Vec::with_capacity(1 + num_rings * num_segments);
    vertices.push(pole);

    for ring in 0..num_rings {
        let tilt = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), delta_phi * ring as f64);
        let tilted = tilt * pole;
        for segment in 0..num_segments {
            let turn =
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), delta_theta * segment as f64);
            vertices.push(turn * tilted);
        }
    }

    Ok(vertices)
}

/// Scale unit vertices by the dome radius and move them to its centre
pub fn place_on_dome(
    vertices: &[Vector3<f64>],
    center: &Vector3<f64>,
    radius: f64,
) -> Vec<Vector3<f64>> {
    vertices.iter().map(|v| center + v * radius).collect()
}
