//! Writing calibration results to disk
//!
//! Every file is a flat list of `x y z` rows. The warp mesh pair
//! (`texture_coords.txt`, `mesh.txt`) ends with a metadata row holding
//! `num_rings num_segments count`, so a reader can recover the generation
//! parameters without a header; it must drop that last row before use.
//!
//! Files are rendered in memory, written to a temporary sibling and renamed
//! into place, so an interrupted run leaves the previous file untouched.

use anyhow::{bail, Context, Result};
use nalgebra::Vector3;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::geometry::map_to_range;
use crate::sampler::GridIndex;
use crate::tracer::{TraceResult, TracedSample};

pub const TEXTURE_COORDS_FILE: &str = "texture_coords.txt";
pub const MESH_FILE: &str = "mesh.txt";
pub const MASK_FILE: &str = "mask.txt";
pub const SCREEN_TO_DOME_FILE: &str = "screen_to_dome.txt";
pub const REPORT_FILE: &str = "report.json";

/// Trailing row of the warp mesh files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeshMetadata {
    pub num_rings: usize,
    pub num_segments: usize,
    /// Number of data rows before the metadata row
    pub count: usize,
}

impl MeshMetadata {
    pub fn as_point(&self) -> Vector3<f64> {
        Vector3::new(
            self.num_rings as f64,
            self.num_segments as f64,
            self.count as f64,
        )
    }
}

/// `x y z` using the shortest representation that reads back to the same f64
pub fn format_point(p: &Vector3<f64>) -> String {
    format!("{} {} {}", p.x, p.y, p.z)
}

/// Render a point list, one row per point, optionally followed by the metadata row
pub fn render_point_list(points: &[Vector3<f64>], metadata: Option<&MeshMetadata>) -> String {
    let mut out = String::with_capacity(points.len() * 32);
    for p in points.iter().copied().chain(metadata.map(MeshMetadata::as_point)) {
        out.push_str(&format_point(&p));
        out.push('\n');
    }
    out
}

/// A metadata value must be a whole, non-negative number
#[cfg(test)]
fn metadata_count(value: f64, name: &str) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        bail!("Metadata {} must be a non-negative integer, found {}", name, value);
    }
    Ok(value as usize)
}

/// Parse a warp mesh file back into its points and trailing metadata row
#[cfg(test)]
pub fn parse_point_list(contents: &str) -> Result<(Vec<Vector3<f64>>, MeshMetadata)> {
    let mut rows = Vec::new();
    for (n, line) in contents.lines().enumerate() {
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid number on line {}", n + 1))?;
        if values.len() != 3 {
            bail!("Expected 3 values on line {}, found {}", n + 1, values.len());
        }
        rows.push(Vector3::new(values[0], values[1], values[2]));
    }

    let Some(last) = rows.pop() else {
        bail!("Point list is empty, metadata row missing");
    };
    let metadata = MeshMetadata {
        num_rings: metadata_count(last.x, "num_rings")?,
        num_segments: metadata_count(last.y, "num_segments")?,
        count: metadata_count(last.z, "count")?,
    };
    if metadata.count != rows.len() {
        bail!(
            "Metadata row announces {} points but file holds {}",
            metadata.count,
            rows.len()
        );
    }
    Ok((rows, metadata))
}

/// Replace `path` with `contents` via a temporary file in the same directory
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Output path {:?} has no file name", path))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents).with_context(|| format!("Failed to write {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {:?} into place", path))?;

    debug!("Wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))
}

/// Write one point list (with optional metadata row) to `path`
pub fn write_point_list(
    path: &Path,
    points: &[Vector3<f64>],
    metadata: Option<&MeshMetadata>,
) -> Result<()> {
    write_atomic(path, &render_point_list(points, metadata))
}

/// Write the normalized warp mesh pair into `dir`
pub fn write_warp_mesh(
    dir: &Path,
    texture_coords: &[Vector3<f64>],
    screen_points: &[Vector3<f64>],
    metadata: &MeshMetadata,
) -> Result<Vec<PathBuf>> {
    if texture_coords.len() != screen_points.len() {
        bail!(
            "Texture coordinates ({}) and screen points ({}) must have the same length",
            texture_coords.len(),
            screen_points.len()
        );
    }
    ensure_dir(dir)?;

    let texture_path = dir.join(TEXTURE_COORDS_FILE);
    let mesh_path = dir.join(MESH_FILE);
    write_point_list(&texture_path, texture_coords, Some(metadata))?;
    write_point_list(&mesh_path, screen_points, Some(metadata))?;

    info!(
        "Wrote warp mesh ({} points) to {:?} and {:?}",
        metadata.count, texture_path, mesh_path
    );
    Ok(vec![texture_path, mesh_path])
}

/// Grid position of every sample mapped into [0, 1] per index axis.
///
/// Rectangular samples give `(row, column)`, radial ones `(ring, segment)`.
fn grid_coordinates(samples: &[TracedSample]) -> Vec<(f64, f64)> {
    let split = |index: &GridIndex| match *index {
        GridIndex::Rect { column, row } => (row, column),
        GridIndex::Radial { ring, segment } => (ring, segment),
    };
    let (max_a, max_b) = samples
        .iter()
        .map(|s| split(&s.index))
        .fold((0, 0), |(ma, mb), (a, b)| (ma.max(a), mb.max(b)));

    let unit = |v: usize, max: usize| {
        if max == 0 {
            0.0
        } else {
            map_to_range(v as f64, 0.0, max as f64, 0.0, 1.0)
        }
    };

    samples
        .iter()
        .map(|s| {
            let (a, b) = split(&s.index);
            (unit(a, max_a), unit(b, max_b))
        })
        .collect()
}

/// `u v flag` per sample, in generation order; `u` is the row for rectangular grids
pub fn render_mask(trace: &TraceResult) -> String {
    let mut out = String::new();
    for ((u, v), s) in grid_coordinates(trace.samples()).into_iter().zip(trace.samples()) {
        let _ = writeln!(out, "{} {} {}", u, v, s.flag());
    }
    out
}

/// Human-readable `u v flag | dx dy dz` dump, misses carry the sentinel
pub fn render_screen_to_dome(trace: &TraceResult) -> String {
    let mut out = String::new();
    for ((u, v), s) in grid_coordinates(trace.samples()).into_iter().zip(trace.samples()) {
        let dome = s.dome_or_sentinel();
        let _ = writeln!(
            out,
            "{} {} {} | {}",
            u,
            v,
            s.flag(),
            format_point(&dome)
        );
    }
    out
}

/// Diagnostic dumps of the raw trace
pub fn write_legacy(dir: &Path, trace: &TraceResult) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let mask_path = dir.join(MASK_FILE);
    let dump_path = dir.join(SCREEN_TO_DOME_FILE);
    write_atomic(&mask_path, &render_mask(trace))?;
    write_atomic(&dump_path, &render_screen_to_dome(trace))?;
    info!("Wrote diagnostic dumps to {:?} and {:?}", mask_path, dump_path);
    Ok(vec![mask_path, dump_path])
}

/// Pretty-printed JSON document
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    write_atomic(path, &content)
}
