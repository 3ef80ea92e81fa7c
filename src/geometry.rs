//! Vector and line helpers shared by the sampler, tracer and normalizer

use nalgebra::Vector3;

/// Coordinate axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Read this axis' component from a vector
    #[inline]
    pub fn component(self, v: &Vector3<f64>) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    /// Index into a vector's storage
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A directed segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line3D {
    from: Vector3<f64>,
    to: Vector3<f64>,
    length: f64,
}

impl Line3D {
    pub fn new(from: Vector3<f64>, to: Vector3<f64>) -> Self {
        Self {
            from,
            to,
            length: (to - from).norm(),
        }
    }

    pub fn from(&self) -> Vector3<f64> {
        self.from
    }

    pub fn to(&self) -> Vector3<f64> {
        self.to
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Point at `distance` world units from `from`, walking toward `to`.
    ///
    /// A zero-length line has no direction, so every distance maps to `from`.
    pub fn point_on_line(&self, distance: f64) -> Vector3<f64> {
        if self.length <= f64::EPSILON {
            return self.from;
        }
        self.from + (self.to - self.from) * (distance / self.length)
    }

    /// Point at fraction `t` of the length (0 = `from`, 1 = `to`)
    pub fn point_at_fraction(&self, t: f64) -> Vector3<f64> {
        self.point_on_line(self.length * t)
    }
}

/// Mirror `direction` about the plane with unit normal `normal`.
///
/// Returns `None` when the result is not a usable direction.
pub fn reflect(direction: &Vector3<f64>, normal: &Vector3<f64>) -> Option<Vector3<f64>> {
    let reflected = direction - normal * (2.0 * direction.dot(normal));
    let len = reflected.norm();
    if !len.is_finite() || len <= f64::EPSILON {
        return None;
    }
    Some(reflected)
}

/// Linearly remap `value` from `[in_min, in_max]` to `[out_min, out_max]`
#[inline]
pub fn map_to_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Smallest component along `axis`, `None` for an empty list
pub fn min_axis_value(points: &[Vector3<f64>], axis: Axis) -> Option<f64> {
    points
        .iter()
        .map(|p| axis.component(p))
        .fold(None, |acc, v| match acc {
            Some(m) if m <= v => Some(m),
            _ => Some(v),
        })
}

/// Largest component along `axis`, `None` for an empty list
pub fn max_axis_value(points: &[Vector3<f64>], axis: Axis) -> Option<f64> {
    points
        .iter()
        .map(|p| axis.component(p))
        .fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}
