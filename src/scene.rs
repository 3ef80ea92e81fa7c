//! Ray queries against the mirror and dome
//!
//! The tracer only needs one capability from the scene: "what is the nearest
//! surface along this ray, within this distance". That capability is the
//! [`Scene`] trait. The analytic primitives here cover the calibration rig (a
//! flat circular mirror and a spherical dome shell); any other backend that can
//! answer the same query can be plugged in instead.

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::{cm_to_world, Config, CM_PER_UNIT};
use crate::error::CalibrationError;
use crate::projector::rotation_from_euler_deg;

/// Hits closer than this to the ray origin are ignored, so a ray leaving a
/// surface does not immediately hit that same surface again
const SELF_HIT_EPSILON: f64 = 1e-6;

/// A half-line from `origin` along `direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Vector3<f64>,
    unit: Vector3<f64>,
}

impl Ray {
    /// The direction does not need to be unit length, but it must be finite and non-zero
    pub fn new(origin: Vector3<f64>, direction: Vector3<f64>) -> Result<Self, CalibrationError> {
        let len = direction.norm();
        if !len.is_finite() || len <= f64::EPSILON || !origin.iter().all(|c| c.is_finite()) {
            return Err(CalibrationError::DegenerateRay);
        }
        Ok(Self {
            origin,
            unit: direction / len,
        })
    }

    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn unit_direction(&self) -> Vector3<f64> {
        self.unit
    }

    /// Point `t` world units along the ray
    #[inline]
    pub fn at(&self, t: f64) -> Vector3<f64> {
        self.origin + self.unit * t
    }
}

/// Result of a successful scene query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: Vector3<f64>,
    /// Unit surface normal, facing the incoming ray
    pub normal: Vector3<f64>,
    /// Distance from the ray origin in world units
    pub t: f64,
}

impl Hit {
    fn new(ray: &Ray, t: f64, outward_normal: Vector3<f64>) -> Self {
        let normal = if outward_normal.dot(&ray.unit_direction()) > 0.0 {
            -outward_normal
        } else {
            outward_normal
        };
        Self {
            position: ray.at(t),
            normal,
            t,
        }
    }
}

/// Nearest-surface ray query
pub trait Scene {
    /// Nearest hit within `(0, max_distance]` along `ray`, or `None` for a miss
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Option<Hit>;
}

impl<S: Scene + ?Sized> Scene for Box<S> {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Option<Hit> {
        (**self).intersect(ray, max_distance)
    }
}

/// A flat, two-sided circular mirror
#[derive(Debug, Clone)]
pub struct DiscMirror {
    center: Vector3<f64>,
    normal: Vector3<f64>,
    radius: f64,
}

impl DiscMirror {
    pub fn new(center: Vector3<f64>, normal: Vector3<f64>, radius: f64) -> Self {
        Self {
            center,
            normal: normal.normalize(),
            radius,
        }
    }

    /// A disc whose resting normal is +Y, rotated by `orientation`
    pub fn oriented(center: Vector3<f64>, orientation: UnitQuaternion<f64>, radius: f64) -> Self {
        Self::new(center, orientation * Vector3::y(), radius)
    }
}

impl Scene for DiscMirror {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Option<Hit> {
        let denom = self.normal.dot(&ray.unit_direction());
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = (self.center - ray.origin()).dot(&self.normal) / denom;
        if t <= SELF_HIT_EPSILON || t > max_distance {
            return None;
        }
        let p = ray.at(t);
        if (p - self.center).norm_squared() > self.radius * self.radius {
            return None;
        }
        Some(Hit::new(ray, t, self.normal))
    }
}

/// A spherical shell, optionally cut down to its upper half (y >= center.y)
#[derive(Debug, Clone)]
pub struct DomeShell {
    center: Vector3<f64>,
    radius: f64,
    hemisphere: bool,
}

impl DomeShell {
    pub fn new(center: Vector3<f64>, radius: f64, hemisphere: bool) -> Self {
        Self {
            center,
            radius,
            hemisphere,
        }
    }

    fn accepts(&self, p: &Vector3<f64>) -> bool {
        !self.hemisphere || p.y >= self.center.y
    }
}

impl Scene for DomeShell {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Option<Hit> {
        // |o + t d - c|^2 = r^2 with unit d
        let oc = ray.origin() - self.center;
        let b = oc.dot(&ray.unit_direction());
        let c = oc.norm_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();

        [-b - sqrt_disc, -b + sqrt_disc]
            .into_iter()
            .filter(|t| *t > SELF_HIT_EPSILON && *t <= max_distance)
            .find(|t| self.accepts(&ray.at(*t)))
            .map(|t| {
                let outward = (ray.at(t) - self.center) / self.radius;
                Hit::new(ray, t, outward)
            })
    }
}

/// A collection of surfaces; queries return the nearest hit among them
#[derive(Default)]
pub struct SceneObjects {
    objects: Vec<Box<dyn Scene>>,
}

impl SceneObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Scene + 'static>(&mut self, object: S) {
        self.objects.push(Box::new(object));
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Build the calibration rig described by the configuration
    pub fn from_config(config: &Config) -> Self {
        let mut scene = Self::new();

        if config.mirror.enabled {
            scene.push(DiscMirror::oriented(
                cm_to_world(&config.mirror.position_cm),
                rotation_from_euler_deg(&config.mirror.angles_deg),
                config.mirror.diameter_cm / 2.0 / CM_PER_UNIT,
            ));
        }

        scene.push(DomeShell::new(
            config.dome.center(),
            config.dome.radius(),
            config.dome.hemisphere,
        ));

        tracing::debug!("Scene built with {} objects", scene.len());
        scene
    }
}

impl Scene for SceneObjects {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Option<Hit> {
        let mut nearest: Option<Hit> = None;
        for object in &self.objects {
            let limit = nearest.map_or(max_distance, |h| h.t);
            if let Some(hit) = object.intersect(ray, limit) {
                if nearest.map_or(true, |h| hit.t < h.t) {
                    nearest = Some(hit);
                }
            }
        }
        nearest
    }
}
