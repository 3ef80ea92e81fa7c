//! Projector pose and view frustum
//!
//! The projector is modelled as a pinhole camera looking down its local +Z axis
//! with +Y up and +X to the right. Frustum corners are returned relative to the
//! projector position (rotated into world space but not translated), matching
//! what the sampler expects.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::{cm_to_world, ProjectorConfig};

/// Which clip plane to spread the frustum corners on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipPlane {
    Near,
    #[default]
    Far,
}

/// Frustum corners ordered bottom-left, top-left, top-right, bottom-right
pub type FrustumCorners = [Vector3<f64>; 4];

/// Build a rotation from Euler angles in degrees.
///
/// Applied roll (Z) first, then pitch (X), then yaw (Y).
pub fn rotation_from_euler_deg(angles: &Vector3<f64>) -> UnitQuaternion<f64> {
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angles.y.to_radians());
    let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angles.x.to_radians());
    let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angles.z.to_radians());
    yaw * pitch * roll
}

/// World-space pose and optics of the projector
#[derive(Debug, Clone)]
pub struct Projector {
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    /// Vertical field of view in radians
    fov: f64,
    aspect: f64,
    near: f64,
    far: f64,
}

impl Projector {
    pub fn new(
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
        fov_deg: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        Self {
            position,
            orientation,
            fov: fov_deg.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Create a projector from configuration (positions in centimetres)
    pub fn from_config(config: &ProjectorConfig) -> Self {
        Self::new(
            cm_to_world(&config.position_cm),
            rotation_from_euler_deg(&config.angles_deg),
            config.fov_deg,
            config.aspect,
            config.near,
            config.far,
        )
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Rotate a projector-local vector into world space (no translation)
    #[inline]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.orientation * v
    }

    /// Map a world-space point into projector-local coordinates
    #[inline]
    pub fn inverse_transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.orientation.inverse_transform_vector(&(p - self.position))
    }

    fn plane_distance(&self, plane: ClipPlane) -> f64 {
        match plane {
            ClipPlane::Near => self.near,
            ClipPlane::Far => self.far,
        }
    }

    /// Frustum corners on the given clip plane, relative to the projector position
    pub fn frustum_corners(&self, plane: ClipPlane) -> FrustumCorners {
        let depth = self.plane_distance(plane);
        let half_h = depth * (self.fov / 2.0).tan();
        let half_w = half_h * self.aspect;

        let local = [
            Vector3::new(-half_w, -half_h, depth), // Bottom-left
            Vector3::new(-half_w, half_h, depth),  // Top-left
            Vector3::new(half_w, half_h, depth),   // Top-right
            Vector3::new(half_w, -half_h, depth),  // Bottom-right
        ];

        local.map(|c| self.transform_vector(&c))
    }
}
