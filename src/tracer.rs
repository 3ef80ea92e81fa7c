//! Two-bounce ray tracing from the projector via the mirror onto the dome

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::error::CalibrationError;
use crate::geometry::reflect;
use crate::projector::Projector;
use crate::sampler::{GridIndex, SamplePoint};
use crate::scene::{Hit, Ray, Scene};

/// Value written in place of a dome coordinate for samples that never reached the dome
pub const MISS_SENTINEL: f64 = 1000.0;

pub fn miss_sentinel() -> Vector3<f64> {
    Vector3::repeat(MISS_SENTINEL)
}

/// One sample after tracing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracedSample {
    pub index: GridIndex,
    /// Projector-local (x right, y up) coordinate of the sample, z = 0
    pub screen: Vector3<f64>,
    /// Second-bounce hit on the dome
    pub dome: Option<Vector3<f64>>,
}

impl TracedSample {
    pub fn is_hit(&self) -> bool {
        self.dome.is_some()
    }

    /// 1 for a dome hit, 0 for a miss
    pub fn flag(&self) -> u8 {
        u8::from(self.is_hit())
    }

    pub fn dome_or_sentinel(&self) -> Vector3<f64> {
        self.dome.unwrap_or_else(miss_sentinel)
    }
}

/// All traced samples of one pass, in generation order
#[derive(Debug, Clone, Default)]
pub struct TraceResult {
    samples: Vec<TracedSample>,
    hits: usize,
}

impl TraceResult {
    pub fn from_samples(samples: Vec<TracedSample>) -> Self {
        let hits = samples.iter().filter(|s| s.is_hit()).count();
        Self { samples, hits }
    }

    pub fn samples(&self) -> &[TracedSample] {
        &self.samples
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn total(&self) -> usize {
        self.samples.len()
    }

    /// Whole-number hit percentage (rounded down)
    pub fn hit_percentage(&self) -> usize {
        if self.samples.is_empty() {
            return 0;
        }
        self.hits * 100 / self.samples.len()
    }

    pub fn hit_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.hits as f64 / self.samples.len() as f64
    }
}

/// Traces projector rays off the mirror onto the dome
pub struct RayTracer<S> {
    scene: S,
    max_distance: f64,
}

impl<S: Scene> RayTracer<S> {
    pub fn new(scene: S, max_distance: f64) -> Result<Self, CalibrationError> {
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return Err(CalibrationError::InvalidTraceDistance(max_distance));
        }
        Ok(Self { scene, max_distance })
    }

    /// Follow the ray from `origin` through `sample` into the mirror and on to the dome.
    ///
    /// `Ok(None)` is a miss at either bounce. Only a sample that coincides with
    /// the origin is an error.
    pub fn trace(
        &self,
        origin: &Vector3<f64>,
        sample: &Vector3<f64>,
    ) -> Result<Option<Hit>, CalibrationError> {
        let direction = sample - origin;
        let primary = Ray::new(*origin, direction)?;

        let Some(mirror) = self.scene.intersect(&primary, self.max_distance) else {
            return Ok(None);
        };

        let Some(reflected) = reflect(&direction, &mirror.normal) else {
            debug!("Degenerate reflection at {:?}, counting as a miss", mirror.position);
            return Ok(None);
        };

        let secondary = Ray::new(mirror.position, reflected)?;
        Ok(self.scene.intersect(&secondary, self.max_distance))
    }

    /// Trace every sample from the projector, keeping generation order
    pub fn trace_samples(
        &self,
        projector: &Projector,
        samples: &[SamplePoint],
    ) -> Result<TraceResult, CalibrationError> {
        let origin = projector.position();
        let mut traced = Vec::with_capacity(samples.len());

        for sample in samples {
            let dome = self.trace(&origin, &sample.position)?.map(|h| h.position);
            let local = projector.inverse_transform_point(&sample.position);
            traced.push(TracedSample {
                index: sample.index,
                screen: Vector3::new(local.x, local.y, 0.0),
                dome,
            });
        }

        let result = TraceResult::from_samples(traced);
        info!(
            "Traced {} samples: {} dome hits ({}%)",
            result.total(),
            result.hits(),
            result.hit_percentage()
        );
        Ok(result)
    }
}
