//! One calibration pass: sample, trace, match, normalize, write
//!
//! The trace always completes and its diagnostic dumps are always written.
//! The warp mesh needs at least one dome hit; without one it is skipped.

use anyhow::{Context, Result};
use nalgebra::Vector3;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{Config, SamplingMode};
use crate::correspondence::{build_correspondence, hit_pairs, Correspondence};
use crate::dome::{generate_dome_vertices, place_on_dome};
use crate::error::CalibrationError;
use crate::normalize::{normalize_screen_points, normalize_texture_coords};
use crate::output::{self, MeshMetadata, REPORT_FILE};
use crate::projector::Projector;
use crate::sampler::{sample_radial, sample_rect, SamplePoint};
use crate::scene::{Scene, SceneObjects};
use crate::tracer::{RayTracer, TraceResult};

/// The matched and normalized correspondence of a pass
#[derive(Debug, Clone)]
pub struct WarpMesh {
    pub correspondence: Correspondence,
    /// Normalized dome coordinates, (x, z) in [0, 1]
    pub texture_coords: Vec<Vector3<f64>>,
    /// Normalized screen coordinates, (x, y) in [-1, 1]
    pub screen_points: Vec<Vector3<f64>>,
    pub metadata: MeshMetadata,
}

/// Summary of a finished pass
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    pub mode: SamplingMode,
    pub total_samples: usize,
    pub hits: usize,
    pub hit_percentage: usize,
    pub hit_rate: f64,
    /// `None` when no sample reached the dome and no mesh was written
    pub metadata: Option<MeshMetadata>,
    /// Largest distance between a dome vertex and its matched hit, in world units
    pub worst_match: Option<f64>,
    pub files: Vec<PathBuf>,
}

impl CalibrationReport {
    fn new(mode: SamplingMode, trace: &TraceResult) -> Self {
        Self {
            mode,
            total_samples: trace.total(),
            hits: trace.hits(),
            hit_percentage: trace.hit_percentage(),
            hit_rate: trace.hit_rate(),
            metadata: None,
            worst_match: None,
            files: Vec::new(),
        }
    }

    fn record_mesh(&mut self, mesh: &WarpMesh) {
        self.metadata = Some(mesh.metadata);
        self.worst_match = Some(mesh.correspondence.max_distance());
    }
}

/// Generate the sample grid selected in the configuration
pub fn generate_samples(
    config: &Config,
    projector: &Projector,
) -> Result<Vec<SamplePoint>, CalibrationError> {
    let corners = projector.frustum_corners(config.projector.clip_plane);
    let origin = projector.position();
    let s = &config.sampling;
    match s.mode {
        SamplingMode::Rect => sample_rect(&corners, &origin, s.sample_x, s.sample_y),
        SamplingMode::Radial => {
            sample_radial(&corners, &origin, s.rings, s.points_per_ring, s.radial_axis)
        }
    }
}

/// Validate the configuration, sample the frustum and trace every sample
pub fn trace_pass<S: Scene>(
    config: &Config,
    projector: &Projector,
    scene: S,
) -> Result<TraceResult, CalibrationError> {
    config.validate()?;

    let samples = generate_samples(config, projector)?;
    let tracer = RayTracer::new(scene, config.trace.max_distance)?;
    let trace = tracer.trace_samples(projector, &samples)?;
    if trace.hits() < trace.total() {
        warn!(
            "{} of {} samples missed the dome",
            trace.total() - trace.hits(),
            trace.total()
        );
    }
    Ok(trace)
}

/// Match the canonical dome mesh against the dome hits and normalize both sides
pub fn build_warp_mesh(config: &Config, trace: &TraceResult) -> Result<WarpMesh, CalibrationError> {
    let canonical = generate_dome_vertices(config.mesh.num_rings, config.mesh.num_segments)?;
    let targets = place_on_dome(&canonical, &config.dome.center(), config.dome.radius());
    let correspondence = build_correspondence(&targets, &hit_pairs(trace))?;

    let texture_coords = normalize_texture_coords(&correspondence.texture_coords)?;
    let screen_points = normalize_screen_points(&correspondence.screen_points)?;

    let metadata = MeshMetadata {
        num_rings: config.mesh.num_rings,
        num_segments: config.mesh.num_segments,
        count: texture_coords.len(),
    };

    Ok(WarpMesh {
        correspondence,
        texture_coords,
        screen_points,
        metadata,
    })
}

/// Run a full pass against `scene` and write its results
pub fn calibrate<S: Scene>(
    config: &Config,
    projector: &Projector,
    scene: S,
) -> Result<CalibrationReport> {
    let trace = trace_pass(config, projector, scene).context("Calibration pass failed")?;
    let dir = &config.output.directory;
    let mut report = CalibrationReport::new(config.sampling.mode, &trace);

    if config.output.legacy {
        report.files.extend(output::write_legacy(dir, &trace)?);
    }

    if trace.hits() == 0 {
        warn!("No sample reached the dome, skipping the warp mesh");
    } else {
        let mesh = build_warp_mesh(config, &trace).context("Failed to build the warp mesh")?;
        report.files.extend(output::write_warp_mesh(
            dir,
            &mesh.texture_coords,
            &mesh.screen_points,
            &mesh.metadata,
        )?);
        report.record_mesh(&mesh);
    }

    if config.output.report {
        let path = dir.join(REPORT_FILE);
        report.files.push(path.clone());
        output::write_json(&path, &report)?;
    }

    Ok(report)
}

/// Full pass with the scene described by the configuration
pub fn run(config: &Config) -> Result<CalibrationReport> {
    let projector = Projector::from_config(&config.projector);
    let scene = SceneObjects::from_config(config);

    info!(
        "Calibrating with {:?} sampling, dome mesh {} rings x {} segments",
        config.sampling.mode, config.mesh.num_rings, config.mesh.num_segments
    );

    let report = calibrate(config, &projector, scene)?;

    info!(
        "Total samples: {}, dome hits: {}, hit percentage: {}%",
        report.total_samples, report.hits, report.hit_percentage
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CM_PER_UNIT;
    use crate::output::{parse_point_list, MASK_FILE, MESH_FILE, SCREEN_TO_DOME_FILE, TEXTURE_COORDS_FILE};
    use approx::assert_relative_eq;
    use std::fs;

    /// Projector below the dome rim, aimed at a 45 degree mirror that folds
    /// the beam straight up into the dome
    fn rig_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.projector.position_cm = Vector3::new(0.0, -5.0, -4.0) * CM_PER_UNIT;
        config.projector.angles_deg = Vector3::zeros();
        config.projector.fov_deg = 20.0;
        config.projector.aspect = 1.0;
        config.mirror.enabled = true;
        config.mirror.position_cm = Vector3::new(0.0, -5.0, 0.0) * CM_PER_UNIT;
        config.mirror.angles_deg = Vector3::new(-45.0, 0.0, 0.0);
        config.mirror.diameter_cm = 400.0;
        config.dome.position_cm = Vector3::zeros();
        config.dome.diameter_cm = 2000.0;
        config.dome.hemisphere = true;
        config.sampling.mode = SamplingMode::Rect;
        config.sampling.sample_x = 3;
        config.sampling.sample_y = 3;
        config.mesh.num_rings = 2;
        config.mesh.num_segments = 4;
        config.output.directory = dir.to_path_buf();
        config.output.legacy = true;
        config.output.report = true;
        config
    }

    fn row_count(path: &std::path::Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_mirror_rig_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = rig_config(dir.path());

        let report = run(&config).unwrap();
        assert_eq!(report.total_samples, 9);
        assert_eq!(report.hits, 9);
        assert_eq!(report.hit_percentage, 100);

        let texture_path = dir.path().join(TEXTURE_COORDS_FILE);
        let mesh_path = dir.path().join(MESH_FILE);
        assert_eq!(row_count(&texture_path), 9 + 1);
        assert_eq!(row_count(&mesh_path), 9 + 1);
        assert_eq!(row_count(&dir.path().join(MASK_FILE)), 9);
        assert_eq!(row_count(&dir.path().join(SCREEN_TO_DOME_FILE)), 9);
        assert!(dir.path().join(REPORT_FILE).exists());

        let (texture, meta) = parse_point_list(&fs::read_to_string(&texture_path).unwrap()).unwrap();
        assert_eq!(meta, MeshMetadata { num_rings: 2, num_segments: 4, count: 9 });
        for p in &texture {
            assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.z));
            assert_eq!(p.y, 0.0);
        }
        // Pole vertex sits in the middle of the texture
        assert_relative_eq!(texture[0].x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(texture[0].z, 0.5, epsilon = 1e-9);

        let (mesh, mesh_meta) = parse_point_list(&fs::read_to_string(&mesh_path).unwrap()).unwrap();
        assert_eq!(mesh_meta, meta);
        for p in &mesh {
            assert!((-1.0..=1.0).contains(&p.x) && (-1.0..=1.0).contains(&p.y));
            assert_eq!(p.z, 0.0);
        }
        // The pole is reached by the central sample
        assert_relative_eq!(mesh[0].x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(mesh[0].y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pole_matches_central_sample() {
        let dir = tempfile::tempdir().unwrap();
        let config = rig_config(dir.path());
        let projector = Projector::from_config(&config.projector);

        let trace = trace_pass(&config, &projector, SceneObjects::from_config(&config)).unwrap();
        let mesh = build_warp_mesh(&config, &trace).unwrap();
        assert_eq!(mesh.correspondence.len(), 9);
        // Sample 4 is the centre of a 3x3 grid
        assert_eq!(mesh.correspondence.matched_samples[0], 4);
        assert_relative_eq!(mesh.correspondence.distances[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_without_mirror_nothing_reaches_the_dome() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = rig_config(dir.path());
        config.mirror.enabled = false;
        let projector = Projector::from_config(&config.projector);

        let samples = generate_samples(&config, &projector).unwrap();
        let tracer = RayTracer::new(SceneObjects::from_config(&config), 100.0).unwrap();
        let trace = tracer.trace_samples(&projector, &samples).unwrap();
        assert_eq!(trace.hits(), 0);
        assert!(trace.samples().iter().all(|s| s.flag() == 0));
        assert!(trace
            .samples()
            .iter()
            .all(|s| s.dome_or_sentinel() == Vector3::new(1000.0, 1000.0, 1000.0)));

        let dump = output::render_screen_to_dome(&trace);
        assert_eq!(dump.lines().count(), 9);
        assert!(dump.lines().all(|l| l.ends_with(" 0 | 1000 1000 1000")));

        // Nothing to match against
        assert_eq!(
            build_warp_mesh(&config, &trace).unwrap_err(),
            CalibrationError::NoDomeHits
        );
    }

    #[test]
    fn test_zero_hit_run_writes_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = rig_config(dir.path());
        config.mirror.enabled = false;

        let report = run(&config).unwrap();
        assert_eq!(report.total_samples, 9);
        assert_eq!(report.hits, 0);
        assert_eq!(report.hit_percentage, 0);
        assert_eq!(report.metadata, None);
        assert_eq!(report.worst_match, None);

        let mask = fs::read_to_string(dir.path().join(MASK_FILE)).unwrap();
        assert_eq!(mask.lines().count(), 9);
        assert!(mask.lines().all(|l| l.ends_with(" 0")));

        let dump = fs::read_to_string(dir.path().join(SCREEN_TO_DOME_FILE)).unwrap();
        assert_eq!(dump.lines().count(), 9);
        assert!(dump.lines().all(|l| l.ends_with("| 1000 1000 1000")));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap())
                .unwrap();
        assert_eq!(json["hits"], 0);
        assert_eq!(json["hit_percentage"], 0);
        assert!(json["metadata"].is_null());

        // No warp mesh without dome hits
        assert!(!dir.path().join(TEXTURE_COORDS_FILE).exists());
        assert!(!dir.path().join(MESH_FILE).exists());
        assert_eq!(report.files.len(), 3);
    }

    #[test]
    fn test_radial_sampling_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = rig_config(dir.path());
        config.sampling.mode = SamplingMode::Radial;
        config.sampling.rings = 3;
        config.sampling.points_per_ring = 8;
        config.mesh.num_rings = 4;
        config.mesh.num_segments = 12;

        let report = run(&config).unwrap();
        assert_eq!(report.total_samples, 1 + 3 * 8);
        assert_eq!(report.hits, report.total_samples);
        assert_eq!(report.metadata.map(|m| m.count), Some(1 + 4 * 12));
        assert_eq!(row_count(&dir.path().join(MESH_FILE)), 1 + 4 * 12 + 1);
    }

    #[test]
    fn test_invalid_config_fails_before_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = rig_config(dir.path());
        config.sampling.sample_y = 1;
        let projector = Projector::from_config(&config.projector);
        let err = trace_pass(&config, &projector, SceneObjects::from_config(&config)).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::InvalidGridResolution { sample_x: 3, sample_y: 1 }
        );
    }

    #[test]
    fn test_repeated_runs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = rig_config(dir.path());
        run(&config).unwrap();

        config.mesh.num_rings = 3;
        config.mesh.num_segments = 6;
        config.sampling.sample_x = 5;
        config.sampling.sample_y = 5;
        let report = run(&config).unwrap();
        assert_eq!(report.total_samples, 25);
        assert_eq!(row_count(&dir.path().join(TEXTURE_COORDS_FILE)), 1 + 3 * 6 + 1);
        assert_eq!(row_count(&dir.path().join(MASK_FILE)), 25);
    }
}
