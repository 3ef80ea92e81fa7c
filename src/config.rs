//! Configuration management for domewarp

use anyhow::{Context, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CalibrationError;
use crate::projector::ClipPlane;
use crate::sampler::RadialAxis;

/// Scene placement is authored in centimetres, the scene itself works in metres
pub const CM_PER_UNIT: f64 = 100.0;

/// Convert a centimetre position into world units
pub fn cm_to_world(v: &Vector3<f64>) -> Vector3<f64> {
    v / CM_PER_UNIT
}

/// Projector placement and optics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Position in centimetres
    pub position_cm: Vector3<f64>,
    /// Euler angles in degrees (x = pitch, y = yaw, z = roll)
    pub angles_deg: Vector3<f64>,
    /// Vertical field of view in degrees
    pub fov_deg: f64,
    /// Width / height
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    /// Which clip plane the sample grid is spread over
    #[serde(default)]
    pub clip_plane: ClipPlane,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            position_cm: Vector3::new(0.0, -500.0, -400.0),
            angles_deg: Vector3::zeros(),
            fov_deg: 20.0,
            aspect: 16.0 / 9.0,
            near: 0.3,
            far: 1.0,
            clip_plane: ClipPlane::Far,
        }
    }
}

/// Flat circular mirror between projector and dome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Leaving the mirror out is useful to check that nothing reaches the dome directly
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub position_cm: Vector3<f64>,
    /// Rotation applied to the disc's resting normal (+Y), in degrees
    pub angles_deg: Vector3<f64>,
    pub diameter_cm: f64,
}

fn default_enabled() -> bool {
    true
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            position_cm: Vector3::new(0.0, -500.0, 0.0),
            angles_deg: Vector3::new(-45.0, 0.0, 0.0),
            diameter_cm: 400.0,
        }
    }
}

/// Dome display surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomeConfig {
    pub position_cm: Vector3<f64>,
    pub diameter_cm: f64,
    /// Only the upper half of the sphere is solid
    #[serde(default = "default_enabled")]
    pub hemisphere: bool,
}

impl Default for DomeConfig {
    fn default() -> Self {
        Self {
            position_cm: Vector3::zeros(),
            diameter_cm: 2000.0,
            hemisphere: true,
        }
    }
}

impl DomeConfig {
    pub fn center(&self) -> Vector3<f64> {
        cm_to_world(&self.position_cm)
    }

    pub fn radius(&self) -> f64 {
        self.diameter_cm / 2.0 / CM_PER_UNIT
    }
}

/// Sampling pattern across the projector frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Row/column grid
    #[default]
    Rect,
    /// Centre point plus concentric rings
    Radial,
}

impl std::str::FromStr for SamplingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rect" => Ok(SamplingMode::Rect),
            "radial" => Ok(SamplingMode::Radial),
            other => Err(format!("unknown sampling mode '{}' (expected rect or radial)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default)]
    pub mode: SamplingMode,
    pub sample_x: usize,
    pub sample_y: usize,
    pub rings: usize,
    pub points_per_ring: usize,
    #[serde(default)]
    pub radial_axis: RadialAxis,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Rect,
            sample_x: 32,
            sample_y: 18,
            rings: 12,
            points_per_ring: 36,
            radial_axis: RadialAxis::Vertical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Longest distance a single bounce may travel, in world units
    pub max_distance: f64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { max_distance: 100.0 }
    }
}

/// Canonical dome parameterization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub num_rings: usize,
    pub num_segments: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            num_rings: 8,
            num_segments: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Also write mask.txt and screen_to_dome.txt
    #[serde(default)]
    pub legacy: bool,
    /// Also write report.json
    #[serde(default)]
    pub report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            legacy: true,
            report: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub projector: ProjectorConfig,

    #[serde(default)]
    pub mirror: MirrorConfig,

    #[serde(default)]
    pub dome: DomeConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub trace: TraceConfig,

    #[serde(default)]
    pub mesh: MeshConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject settings that would break the pass before any sampling starts
    pub fn validate(&self) -> std::result::Result<(), CalibrationError> {
        let s = &self.sampling;
        match s.mode {
            SamplingMode::Rect => {
                if s.sample_x < 2 || s.sample_y < 2 {
                    return Err(CalibrationError::InvalidGridResolution {
                        sample_x: s.sample_x,
                        sample_y: s.sample_y,
                    });
                }
            }
            SamplingMode::Radial => {
                if s.rings < 1 || s.points_per_ring < 1 {
                    return Err(CalibrationError::InvalidRadialGrid {
                        rings: s.rings,
                        points_per_ring: s.points_per_ring,
                    });
                }
            }
        }

        if self.mesh.num_rings < 2 || self.mesh.num_segments < 1 {
            return Err(CalibrationError::InvalidDomeParameters {
                num_rings: self.mesh.num_rings,
                num_segments: self.mesh.num_segments,
            });
        }

        let max = self.trace.max_distance;
        if !max.is_finite() || max <= 0.0 {
            return Err(CalibrationError::InvalidTraceDistance(max));
        }

        let p = &self.projector;
        if !(p.fov_deg > 0.0 && p.fov_deg < 180.0) {
            return Err(CalibrationError::InvalidProjector(format!(
                "field of view must be in (0, 180) degrees, got {}",
                p.fov_deg
            )));
        }
        if !(p.aspect > 0.0 && p.aspect.is_finite()) {
            return Err(CalibrationError::InvalidProjector(format!(
                "aspect ratio must be positive, got {}",
                p.aspect
            )));
        }
        if !(p.near > 0.0 && p.far > p.near) {
            return Err(CalibrationError::InvalidProjector(format!(
                "clip planes must satisfy 0 < near < far, got near={} far={}",
                p.near, p.far
            )));
        }

        if !(self.dome.diameter_cm > 0.0) {
            return Err(CalibrationError::InvalidScene(format!(
                "dome diameter must be positive, got {}",
                self.dome.diameter_cm
            )));
        }
        if self.mirror.enabled && !(self.mirror.diameter_cm > 0.0) {
            return Err(CalibrationError::InvalidScene(format!(
                "mirror diameter must be positive, got {}",
                self.mirror.diameter_cm
            )));
        }

        Ok(())
    }
}
