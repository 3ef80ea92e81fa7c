//! Sample grids across the projector frustum
//!
//! Two layouts are supported: a rectangular row/column grid spread bilinearly
//! between the frustum borders, and a radial grid of concentric rings around
//! the frustum centre. Both return world-space points in a fixed generation
//! order which the rest of the pass keeps as its correspondence key.

use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::geometry::Line3D;
use crate::projector::FrustumCorners;

/// Bookkeeping indices of a sample. Never used to match samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridIndex {
    Rect { column: usize, row: usize },
    /// The centre of a radial grid is ring 0, segment 0
    Radial { ring: usize, segment: usize },
}

/// A generated sample on the frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: Vector3<f64>,
    pub index: GridIndex,
}

/// Frustum edge the radial rings start from and are scaled by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RadialAxis {
    /// Top edge
    Horizontal,
    /// Left edge
    #[default]
    Vertical,
}

/// Rectangular `sample_x` x `sample_y` grid, row-major from the top-left corner.
///
/// `corners` are relative to `origin`; every generated point is translated by it.
pub fn sample_rect(
    corners: &FrustumCorners,
    origin: &Vector3<f64>,
    sample_x: usize,
    sample_y: usize,
) -> Result<Vec<SamplePoint>, CalibrationError> {
    if sample_x < 2 || sample_y < 2 {
        return Err(CalibrationError::InvalidGridResolution { sample_x, sample_y });
    }

    let left = Line3D::new(corners[1], corners[0]);
    let right = Line3D::new(corners[2], corners[3]);

    let mut points = Vec::with_capacity(sample_x * sample_y);
    for row in 0..sample_y {
        let v = row as f64 / (sample_y - 1) as f64;
        let horizontal = Line3D::new(left.point_at_fraction(v), right.point_at_fraction(v));

        for column in 0..sample_x {
            let u = column as f64 / (sample_x - 1) as f64;
            points.push(SamplePoint {
                position: horizontal.point_at_fraction(u) + origin,
                index: GridIndex::Rect { column, row },
            });
        }
    }

    Ok(points)
}

/// Radial grid: the frustum centre, then `rings` rings of `points_per_ring` points.
///
/// Ring `i` has radius `i * step` where `step` is half the chosen edge length
/// divided by the ring count. The first point of every ring lies along the
/// chosen edge's direction; the rest follow at equal angles about the view axis.
pub fn sample_radial(
    corners: &FrustumCorners,
    origin: &Vector3<f64>,
    rings: usize,
    points_per_ring: usize,
    axis: RadialAxis,
) -> Result<Vec<SamplePoint>, CalibrationError> {
    if rings < 1 || points_per_ring < 1 {
        return Err(CalibrationError::InvalidRadialGrid { rings, points_per_ring });
    }

    let center = corners.iter().sum::<Vector3<f64>>() / 4.0;
    let view_axis = Unit::try_new(center, f64::EPSILON).ok_or(CalibrationError::DegenerateRay)?;

    let edge = match axis {
        RadialAxis::Horizontal => Line3D::new(corners[1], corners[2]),
        RadialAxis::Vertical => Line3D::new(corners[1], corners[0]),
    };
    let start = Unit::try_new(edge.to() - edge.from(), f64::EPSILON)
        .ok_or(CalibrationError::DegenerateRay)?;
    let step = edge.length() / 2.0 / rings as f64;
    let angle_step = std::f64::consts::TAU / points_per_ring as f64;

    let mut points = Vec::with_capacity(1 + rings * points_per_ring);
    points.push(SamplePoint {
        position: center + origin,
        index: GridIndex::Radial { ring: 0, segment: 0 },
    });

    for ring in 1..=rings {
        let offset = start.into_inner() * (ring as f64 * step);
        for segment in 0..points_per_ring {
            let rotation = UnitQuaternion::from_axis_angle(&view_axis, angle_step * segment as f64);
            points.push(SamplePoint {
                position: center + rotation * offset + origin,
                index: GridIndex::Radial { ring, segment },
            });
        }
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::{rotation_from_euler_deg, ClipPlane, Projector};
    use approx::assert_relative_eq;

    fn test_corners() -> FrustumCorners {
        [
            Vector3::new(-2.0, -1.0, 1.0),
            Vector3::new(-2.0, 1.0, 1.0),
            Vector3::new(2.0, 1.0, 1.0),
            Vector3::new(2.0, -1.0, 1.0),
        ]
    }

    #[test]
    fn test_rect_count_and_corners() {
        let origin = Vector3::new(10.0, -3.0, 0.5);
        let corners = test_corners();
        let points = sample_rect(&corners, &origin, 5, 4).unwrap();
        assert_eq!(points.len(), 20);

        // Row-major from top-left
        assert_relative_eq!(points[0].position, corners[1] + origin, epsilon = 1e-12);
        assert_relative_eq!(points[4].position, corners[2] + origin, epsilon = 1e-12);
        assert_relative_eq!(points[15].position, corners[0] + origin, epsilon = 1e-12);
        assert_relative_eq!(points[19].position, corners[3] + origin, epsilon = 1e-12);

        assert_eq!(points[6].index, GridIndex::Rect { column: 1, row: 1 });
    }

    #[test]
    fn test_rect_corners_on_rotated_projector() {
        let q = rotation_from_euler_deg(&Vector3::new(20.0, -35.0, 10.0));
        let projector = Projector::new(Vector3::new(0.3, 1.2, -4.0), q, 50.0, 1.6, 0.1, 3.0);
        let corners = projector.frustum_corners(ClipPlane::Far);
        let origin = projector.position();
        let points = sample_rect(&corners, &origin, 7, 3).unwrap();
        assert_eq!(points.len(), 21);
        assert_relative_eq!(points[0].position, corners[1] + origin, epsilon = 1e-9);
        assert_relative_eq!(points[6].position, corners[2] + origin, epsilon = 1e-9);
        assert_relative_eq!(points[14].position, corners[0] + origin, epsilon = 1e-9);
        assert_relative_eq!(points[20].position, corners[3] + origin, epsilon = 1e-9);
    }

    #[test]
    fn test_rect_evenly_spaced() {
        let points = sample_rect(&test_corners(), &Vector3::zeros(), 5, 3).unwrap();
        let middle_row: Vec<_> = points[5..10].iter().map(|p| p.position.x).collect();
        for (i, x) in middle_row.iter().enumerate() {
            assert_relative_eq!(*x, -2.0 + i as f64, epsilon = 1e-12);
        }
        assert_relative_eq!(points[7].position, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rect_rejects_degenerate_resolution() {
        let err = sample_rect(&test_corners(), &Vector3::zeros(), 1, 4).unwrap_err();
        assert_eq!(err, CalibrationError::InvalidGridResolution { sample_x: 1, sample_y: 4 });
        assert!(sample_rect(&test_corners(), &Vector3::zeros(), 3, 0).is_err());
    }

    #[test]
    fn test_radial_layout() {
        let origin = Vector3::new(0.0, 0.0, -1.0);
        let points = sample_radial(&test_corners(), &origin, 2, 4, RadialAxis::Vertical).unwrap();
        assert_eq!(points.len(), 1 + 2 * 4);

        // Centre first
        assert_relative_eq!(points[0].position, Vector3::new(0.0, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(points[0].index, GridIndex::Radial { ring: 0, segment: 0 });

        // Left edge has length 2, so step = 0.5; first point points down the edge
        assert_relative_eq!(points[1].position, Vector3::new(0.0, -0.5, 0.0), epsilon = 1e-12);
        // Outer ring reaches the mid-point of the bottom border
        assert_relative_eq!(points[5].position, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);

        // Every ring point sits at its ring's radius in the frustum plane
        for p in &points[1..] {
            let GridIndex::Radial { ring, .. } = p.index else {
                panic!("unexpected index {:?}", p.index);
            };
            let local = p.position - origin - Vector3::new(0.0, 0.0, 1.0);
            assert_relative_eq!(local.z, 0.0, epsilon = 1e-12);
            assert_relative_eq!(local.norm(), ring as f64 * 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_radial_horizontal_axis() {
        let points = sample_radial(&test_corners(), &Vector3::zeros(), 1, 2, RadialAxis::Horizontal)
            .unwrap();
        // Top edge has length 4, one ring => radius 2
        assert_relative_eq!(points[1].position, Vector3::new(2.0, 0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(points[2].position, Vector3::new(-2.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_radial_rejects_empty_rings() {
        assert!(matches!(
            sample_radial(&test_corners(), &Vector3::zeros(), 0, 8, RadialAxis::Vertical),
            Err(CalibrationError::InvalidRadialGrid { rings: 0, .. })
        ));
    }
}
