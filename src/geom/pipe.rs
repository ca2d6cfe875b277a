//! Tube mesh swept along a wire path.
//!
//! Rings are placed on rotation-minimizing frames so the tube does not twist,
//! and the ring radius may vary per rail point.

use super::curve::parallel_transport_frames;
use super::diagnostics::GeomMeshDiagnostics;
use super::mesh::{GeomMesh, finalize_mesh};
use super::{FrenetFrame, Point3, Tolerance};

/// Tangent dot product below which two consecutive segments fold back on themselves.
const CUSP_DOT: f64 = -0.999;

/// Fraction of the local bend radius a tube ring may use before it folds inward.
const BEND_RADIUS_FRACTION: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct PipeCaps {
    pub start: bool,
    pub end: bool,
}

impl PipeCaps {
    pub const NONE: Self = Self { start: false, end: false };
    pub const BOTH: Self = Self { start: true, end: true };
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct PipeOptions {
    /// Number of segments around the circular cross-section.
    pub radial_segments: usize,
    pub caps: PipeCaps,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self {
            radial_segments: 12,
            caps: PipeCaps::BOTH,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("rail requires at least 2 distinct points")]
    RailTooShort,
    #[error("rail points must be finite")]
    NonFiniteRail,
    #[error("radius must be finite and > 0")]
    InvalidRadius,
    #[error("expected 1 or {expected} radii, got {actual}")]
    RadiusCountMismatch { expected: usize, actual: usize },
    #[error("pipe requires at least 3 radial segments")]
    NotEnoughRadialSegments,
    #[error("rail has a near-180° cusp at point {index}")]
    CuspNotSupported { index: usize },
}

/// Sweeps a circular tube along `rail`.
///
/// `radii` holds either one radius for the whole rail or one per rail point.
pub fn wire_tube_mesh(
    rail: &[Point3],
    radii: &[f64],
    options: PipeOptions,
    tol: Tolerance,
) -> Result<(GeomMesh, GeomMeshDiagnostics), PipeError> {
    if options.radial_segments < 3 {
        return Err(PipeError::NotEnoughRadialSegments);
    }
    if rail.iter().any(|p| !p.is_finite()) {
        return Err(PipeError::NonFiniteRail);
    }
    if radii.len() != 1 && radii.len() != rail.len() {
        return Err(PipeError::RadiusCountMismatch {
            expected: rail.len(),
            actual: radii.len(),
        });
    }
    if radii.iter().any(|r| !r.is_finite() || *r <= tol.eps) {
        return Err(PipeError::InvalidRadius);
    }

    let (points, mut ring_radii) = clean_rail(rail, radii, tol);
    if points.len() < 2 {
        return Err(PipeError::RailTooShort);
    }

    let mut warnings = apply_radius_guards(&mut ring_radii, &points)?;

    let (frames, degenerate) = parallel_transport_frames(&points, tol);
    if degenerate > 0 {
        warnings.push(format!("{degenerate} degenerate rail tangents reused"));
    }

    let segments = options.radial_segments;
    let ring_count = points.len();
    let total_length = super::curve::polyline_length(&points).max(tol.eps);
    let arc = super::curve::cumulative_arc_lengths(&points);

    let mut vertices = Vec::with_capacity(ring_count * segments + 2 * (segments + 1));
    let mut uvs = Vec::with_capacity(vertices.capacity());
    for ((origin, frame), (radius, s)) in points.iter().zip(&frames).zip(ring_radii.iter().zip(&arc)) {
        for seg in 0..segments {
            let v = seg as f64 / segments as f64;
            vertices.push(ring_point(*origin, frame, *radius, v));
            uvs.push([s / total_length, v]);
        }
    }

    let mut indices = Vec::with_capacity((ring_count - 1) * segments * 6);
    for r in 0..ring_count - 1 {
        for seg in 0..segments {
            let next = (seg + 1) % segments;
            let i0 = (r * segments + seg) as u32;
            let i1 = (r * segments + next) as u32;
            let i2 = ((r + 1) * segments + next) as u32;
            let i3 = ((r + 1) * segments + seg) as u32;
            indices.extend_from_slice(&[i0, i1, i2, i0, i2, i3]);
        }
    }

    let last = ring_count - 1;
    if options.caps.start {
        add_cap(&mut vertices, &mut uvs, &mut indices, points[0], &frames[0], ring_radii[0], true, segments);
    }
    if options.caps.end {
        add_cap(&mut vertices, &mut uvs, &mut indices, points[last], &frames[last], ring_radii[last], false, segments);
    }

    let (mesh, mut diagnostics) = finalize_mesh(vertices, Some(uvs), indices, tol);
    diagnostics.warnings.extend(warnings);
    Ok((mesh, diagnostics))
}

fn ring_point(origin: Point3, frame: &FrenetFrame, radius: f64, v: f64) -> Point3 {
    let (sin, cos) = (std::f64::consts::TAU * v).sin_cos();
    origin
        .add_vec(frame.normal.mul_scalar(radius * cos))
        .add_vec(frame.binormal.mul_scalar(radius * sin))
}

/// Drops consecutive duplicates, keeping the radius of the first occurrence.
fn clean_rail(rail: &[Point3], radii: &[f64], tol: Tolerance) -> (Vec<Point3>, Vec<f64>) {
    let radius_at = |i: usize| if radii.len() == 1 { radii[0] } else { radii[i] };
    let mut points: Vec<Point3> = Vec::with_capacity(rail.len());
    let mut out_radii = Vec::with_capacity(rail.len());
    for (i, p) in rail.iter().enumerate() {
        if points.last().is_some_and(|prev| tol.approx_eq_point3(*prev, *p)) {
            continue;
        }
        points.push(*p);
        out_radii.push(radius_at(i));
    }
    (points, out_radii)
}

fn apply_radius_guards(radii: &mut [f64], rail: &[Point3]) -> Result<Vec<String>, PipeError> {
    let mut clamped = 0usize;
    for i in 1..rail.len().saturating_sub(1) {
        let a = rail[i].sub_point(rail[i - 1]);
        let b = rail[i + 1].sub_point(rail[i]);
        let (Some(da), Some(db)) = (a.normalized(), b.normalized()) else {
            continue;
        };
        if da.dot(db) < CUSP_DOT {
            return Err(PipeError::CuspNotSupported { index: i });
        }

        let c = rail[i + 1].sub_point(rail[i - 1]);
        let area2 = a.cross(b).length();
        if area2 <= f64::EPSILON {
            continue;
        }
        // Circumradius of the three rail points.
        let bend_radius = a.length() * b.length() * c.length() / (2.0 * area2);
        let limit = BEND_RADIUS_FRACTION * bend_radius;
        if radii[i] > limit {
            radii[i] = limit;
            clamped += 1;
        }
    }

    Ok(if clamped > 0 {
        vec![format!("tube radius clamped at {clamped} tight bends")]
    } else {
        Vec::new()
    })
}

#[allow(clippy::too_many_arguments)]
fn add_cap(
    vertices: &mut Vec<Point3>,
    uvs: &mut Vec<[f64; 2]>,
    indices: &mut Vec<u32>,
    origin: Point3,
    frame: &FrenetFrame,
    radius: f64,
    is_start: bool,
    segments: usize,
) {
    let center = vertices.len() as u32;
    vertices.push(origin);
    uvs.push([0.5, 0.5]);

    for seg in 0..segments {
        let v = seg as f64 / segments as f64;
        let (sin, cos) = (std::f64::consts::TAU * v).sin_cos();
        vertices.push(ring_point(origin, frame, radius, v));
        uvs.push([0.5 + 0.5 * cos, 0.5 + 0.5 * sin]);
    }

    let ring = center + 1;
    for seg in 0..segments as u32 {
        let a = ring + seg;
        let b = ring + (seg + 1) % segments as u32;
        if is_start {
            indices.extend_from_slice(&[center, b, a]);
        } else {
            indices.extend_from_slice(&[center, a, b]);
        }
    }
}
