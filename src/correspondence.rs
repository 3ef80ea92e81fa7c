//! Pairing canonical dome vertices with traced samples
//!
//! For every canonical vertex the traced sample whose dome hit lies closest
//! is chosen. The scan is a plain linear pass; on an exact distance tie the
//! sample seen first wins, which keeps output files reproducible run to run.

use nalgebra::Vector3;
use tracing::debug;

use crate::error::CalibrationError;
use crate::tracer::TraceResult;

/// A traced sample that reached the dome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracedPair {
    pub screen: Vector3<f64>,
    pub dome: Vector3<f64>,
    /// Position of the sample in the trace result
    pub sample: usize,
}

/// Parallel lists, one entry per canonical vertex, in canonical order
#[derive(Debug, Clone, Default)]
pub struct Correspondence {
    /// The canonical dome vertices
    pub texture_coords: Vec<Vector3<f64>>,
    /// Screen coordinate of the sample matched to each vertex
    pub screen_points: Vec<Vector3<f64>>,
    /// Trace-result position of the matched sample
    pub matched_samples: Vec<usize>,
    /// Distance between each vertex and its matched dome hit
    pub distances: Vec<f64>,
}

impl Correspondence {
    pub fn len(&self) -> usize {
        self.texture_coords.len()
    }

    pub fn max_distance(&self) -> f64 {
        self.distances.iter().copied().fold(0.0, f64::max)
    }
}

/// Samples that hit the dome, in generation order
pub fn hit_pairs(trace: &TraceResult) -> Vec<TracedPair> {
    trace
        .samples()
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            s.dome.map(|dome| TracedPair {
                screen: s.screen,
                dome,
                sample: i,
            })
        })
        .collect()
}

/// Index of the pair whose dome hit is nearest to `target`, first one on ties
pub fn nearest_pair(target: &Vector3<f64>, pairs: &[TracedPair]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, pair) in pairs.iter().enumerate() {
        let d2 = (pair.dome - target).norm_squared();
        match best {
            Some((_, best_d2)) if d2 >= best_d2 => {}
            _ => best = Some((i, d2)),
        }
    }
    best.map(|(i, d2)| (i, d2.sqrt()))
}

/// Match every canonical vertex to its nearest traced dome hit
pub fn build_correspondence(
    canonical: &[Vector3<f64>],
    pairs: &[TracedPair],
) -> Result<Correspondence, CalibrationError> {
    if pairs.is_empty() {
        return Err(CalibrationError::NoDomeHits);
    }

    let mut out = Correspondence {
        texture_coords: Vec::with_capacity(canonical.len()),
        screen_points: Vec::with_capacity(canonical.len()),
        matched_samples: Vec::with_capacity(canonical.len()),
        distances: Vec::with_capacity(canonical.len()),
    };

    for vertex in canonical {
        let (i, distance) = nearest_pair(vertex, pairs).ok_or(CalibrationError::NoDomeHits)?;
        let pair = &pairs[i];
        out.texture_coords.push(*vertex);
        out.screen_points.push(pair.screen);
        out.matched_samples.push(pair.sample);
        out.distances.push(distance);
    }

    debug!(
        "Matched {} dome vertices against {} hits (worst match {:.4})",
        out.len(),
        pairs.len(),
        out.max_distance()
    );
    Ok(out)
}
