//! Ray queries against the static dental surface mesh.
//!
//! [`SurfaceProjector`] builds a BVH over the mesh triangles once; every query
//! after that only walks the tree. [`SharedProjector`] lets several design
//! sessions read the same projector while a mesh replacement swaps it out
//! under a write lock.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};

use super::anchor::ArchKind;
use super::error::WireError;
use crate::geom::{BBox, Bvh, FrenetFrame, Point3, Ray, Tolerance, Vec3, rotate_vector};

/// Indexed triangle mesh with optional per-vertex normals.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMesh {
    vertices: Vec<Point3>,
    faces: Vec<[u32; 3]>,
    normals: Option<Vec<Vec3>>,
}

impl SurfaceMesh {
    pub fn new(
        vertices: Vec<Point3>,
        faces: Vec<[u32; 3]>,
        normals: Option<Vec<Vec3>>,
    ) -> Result<Self, WireError> {
        if faces.is_empty() {
            return Err(WireError::EmptySurfaceMesh);
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(WireError::InvalidSurfaceMesh("non-finite vertex".to_string()));
        }
        let count = vertices.len();
        if let Some(face) = faces.iter().position(|f| f.iter().any(|&i| i as usize >= count)) {
            return Err(WireError::InvalidSurfaceMesh(format!(
                "face {face} references a vertex out of range (vertex count {count})"
            )));
        }
        if let Some(ref n) = normals {
            if n.len() != count {
                return Err(WireError::InvalidSurfaceMesh(format!(
                    "{} normals for {count} vertices",
                    n.len()
                )));
            }
            if n.iter().any(|v| !v.is_finite()) {
                return Err(WireError::InvalidSurfaceMesh("non-finite normal".to_string()));
            }
        }
        Ok(Self {
            vertices,
            faces,
            normals,
        })
    }

    /// Builds a mesh from packed `[x, y, z, ...]` buffers as handed over by JS.
    pub fn from_flat(positions: &[f64], indices: &[u32], normals: Option<&[f64]>) -> Result<Self, WireError> {
        if positions.len() % 3 != 0 {
            return Err(WireError::InvalidSurfaceMesh("position buffer length is not a multiple of 3".to_string()));
        }
        if indices.len() % 3 != 0 {
            return Err(WireError::InvalidSurfaceMesh("index buffer length is not a multiple of 3".to_string()));
        }
        let vertices = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        let normals = match normals {
            Some(buf) if buf.len() % 3 != 0 => {
                return Err(WireError::InvalidSurfaceMesh("normal buffer length is not a multiple of 3".to_string()));
            }
            Some(buf) if !buf.is_empty() => {
                Some(buf.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2])).collect())
            }
            _ => None,
        };
        Self::new(vertices, faces, normals)
    }

    /// Closed UV sphere with radial vertex normals.
    pub fn uv_sphere(center: Point3, radius: f64, stacks: usize, slices: usize) -> Result<Self, WireError> {
        if !(radius.is_finite() && radius > 0.0) || stacks < 2 || slices < 3 {
            return Err(WireError::InvalidSurfaceMesh(format!(
                "sphere needs radius > 0, stacks >= 2 and slices >= 3 (got {radius}, {stacks}, {slices})"
            )));
        }

        let mut normals = vec![Vec3::Z];
        for i in 1..stacks {
            let phi = std::f64::consts::PI * i as f64 / stacks as f64;
            for j in 0..slices {
                let theta = TAU * j as f64 / slices as f64;
                normals.push(Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos()));
            }
        }
        normals.push(-Vec3::Z);
        let vertices = normals.iter().map(|n| center + *n * radius).collect();

        let ring = |i: usize, j: usize| (1 + (i - 1) * slices + j % slices) as u32;
        let bottom = (normals.len() - 1) as u32;
        let mut faces = Vec::with_capacity(2 * slices * (stacks - 1));
        for j in 0..slices {
            faces.push([0, ring(1, j), ring(1, j + 1)]);
        }
        for i in 1..stacks - 1 {
            for j in 0..slices {
                faces.push([ring(i, j), ring(i + 1, j), ring(i + 1, j + 1)]);
                faces.push([ring(i, j), ring(i + 1, j + 1), ring(i, j + 1)]);
            }
        }
        for j in 0..slices {
            faces.push([bottom, ring(stacks - 1, j + 1), ring(stacks - 1, j)]);
        }

        Self::new(vertices, faces, Some(normals))
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    #[must_use]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    #[must_use]
    pub fn triangle(&self, face: usize) -> [Point3; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Vertex-normal interpolation at barycentric `(u, v)`, else the face normal.
    fn normal_at(&self, face: usize, u: f64, v: f64) -> Vec3 {
        let [a, b, c] = self.triangle(face);
        let face_normal = b.sub_point(a).cross(c.sub_point(a)).normalized_or_zero();
        let Some(ref normals) = self.normals else {
            return face_normal;
        };
        let [i0, i1, i2] = self.faces[face];
        let blended = normals[i0 as usize] * (1.0 - u - v)
            + normals[i1 as usize] * u
            + normals[i2 as usize] * v;
        blended.normalized().unwrap_or(face_normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorOptions {
    /// Half-length of the projection segment around the query point (mm).
    pub search_radius: f64,
    /// Extra directions tried after a miss.
    pub fan_rays: usize,
    /// Angle between the fan directions and the original direction.
    pub fan_angle_degrees: f64,
    /// Start of the inward snapping ray, outside the surface (mm).
    pub snap_outside: f64,
    /// Start of the outward snapping ray, inside the surface (mm).
    pub snap_inside: f64,
}

impl Default for ProjectorOptions {
    fn default() -> Self {
        Self {
            search_radius: 5.0,
            fan_rays: 4,
            fan_angle_degrees: 20.0,
            snap_outside: 15.0,
            snap_inside: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceHit {
    pub point: Point3,
    pub normal: Vec3,
    pub triangle: usize,
    /// Distance from the query point to the hit.
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionOutcome {
    Hit(SurfaceHit),
    Miss,
}

impl ProjectionOutcome {
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// Hit point, or `fallback` on a miss.
    #[must_use]
    pub fn point_or(&self, fallback: Point3) -> Point3 {
        match self {
            Self::Hit(hit) => hit.point,
            Self::Miss => fallback,
        }
    }

    #[must_use]
    pub fn hit(&self) -> Option<&SurfaceHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            Self::Miss => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RayHit {
    triangle: usize,
    t: f64,
    u: f64,
    v: f64,
}

/// Surface mesh plus its BVH.
#[derive(Debug, Clone)]
pub struct SurfaceProjector {
    mesh: SurfaceMesh,
    bvh: Bvh,
    options: ProjectorOptions,
    tol: Tolerance,
}

impl SurfaceProjector {
    pub fn build(mesh: SurfaceMesh, options: ProjectorOptions) -> Result<Self, WireError> {
        let tol = Tolerance::default_geom();
        let bboxes: Vec<BBox> = (0..mesh.triangle_count())
            .map(|face| {
                let [a, b, c] = mesh.triangle(face);
                BBox::new(a, a).expand_point(b).expand_point(c).expand_by(tol.eps)
            })
            .collect();
        let bvh = Bvh::build(&bboxes).ok_or(WireError::EmptySurfaceMesh)?;
        log::debug!(
            "surface projector built: {} triangles, {} bvh nodes",
            mesh.triangle_count(),
            bvh.node_count()
        );
        Ok(Self {
            mesh,
            bvh,
            options,
            tol,
        })
    }

    #[must_use]
    pub fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    #[must_use]
    pub fn options(&self) -> &ProjectorOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ProjectorOptions) {
        self.options = options;
    }

    fn closest_hit(&self, origin: Point3, dir: Vec3, t_max: f64) -> Option<RayHit> {
        let ray = Ray::new(origin, dir);
        let mut best: Option<RayHit> = None;
        self.bvh.query_ray(&ray, 0.0, t_max, |face, bound| {
            let Some((t, u, v)) = intersect_triangle(&ray, self.mesh.triangle(face), self.tol) else {
                return bound;
            };
            if t > bound || best.is_some_and(|b| b.t <= t) {
                return bound;
            }
            best = Some(RayHit { triangle: face, t, u, v });
            t
        });
        best
    }

    /// First surface hit along `dir` from `origin` within `t_max`.
    #[must_use]
    pub fn cast(&self, origin: Point3, dir: Vec3, t_max: f64) -> ProjectionOutcome {
        let Some(dir) = dir.normalized() else {
            return ProjectionOutcome::Miss;
        };
        match self.closest_hit(origin, dir, t_max) {
            Some(hit) => ProjectionOutcome::Hit(self.surface_hit(hit, hit.t)),
            None => ProjectionOutcome::Miss,
        }
    }

    /// Surface point on the line through `point` along `dir`, within
    /// `search_radius` on either side, closest to `point`.
    ///
    /// After a miss, `fan_rays` directions tilted by `fan_angle_degrees` are
    /// tried and the closest of their hits wins.
    #[must_use]
    pub fn project(&self, point: Point3, dir: Vec3, search_radius: f64) -> ProjectionOutcome {
        if !point.is_finite() || !(search_radius.is_finite() && search_radius > 0.0) {
            return ProjectionOutcome::Miss;
        }
        let Some(dir) = dir.normalized() else {
            return ProjectionOutcome::Miss;
        };

        if let Some(hit) = self.project_along(point, dir, search_radius) {
            return ProjectionOutcome::Hit(hit);
        }

        let Some(frame) = FrenetFrame::from_tangent(dir) else {
            return ProjectionOutcome::Miss;
        };
        let tilt = self.options.fan_angle_degrees.to_radians();
        let fans = self.options.fan_rays;
        (0..fans)
            .filter_map(|k| {
                let phase = TAU * k as f64 / fans as f64;
                let axis = frame.normal * phase.cos() + frame.binormal * phase.sin();
                self.project_along(point, rotate_vector(dir, axis, tilt), search_radius)
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .map_or(ProjectionOutcome::Miss, ProjectionOutcome::Hit)
    }

    fn project_along(&self, point: Point3, dir: Vec3, search_radius: f64) -> Option<SurfaceHit> {
        let forward = self.closest_hit(point, dir, search_radius);
        let backward = self.closest_hit(point, -dir, search_radius);
        match (forward, backward) {
            (Some(f), Some(b)) if b.t < f.t => Some(self.surface_hit(b, b.t)),
            (Some(f), _) => Some(self.surface_hit(f, f.t)),
            (None, Some(b)) => Some(self.surface_hit(b, b.t)),
            (None, None) => None,
        }
    }

    /// Dual-ray snap of `target` onto the surface along `normal`.
    ///
    /// One ray starts `snap_outside` mm out along the normal and points in, the
    /// other starts `snap_inside` mm in and points out. For an upper arch the
    /// higher hit wins, for a lower arch the lower one.
    #[must_use]
    pub fn snap_along_normal(&self, target: Point3, normal: Vec3, arch: ArchKind) -> ProjectionOutcome {
        let Some(n) = normal.normalized() else {
            return ProjectionOutcome::Miss;
        };
        let span = self.options.snap_outside + self.options.snap_inside;
        let outside = target + n * self.options.snap_outside;
        let inside = target - n * self.options.snap_inside;

        let hits = [
            self.closest_hit(outside, -n, span)
                .map(|hit| self.surface_hit(hit, (hit.t - self.options.snap_outside).abs())),
            self.closest_hit(inside, n, span)
                .map(|hit| self.surface_hit(hit, (hit.t - self.options.snap_inside).abs())),
        ];
        let candidates = hits.into_iter().flatten();
        let chosen = match arch {
            ArchKind::Upper => candidates.max_by(|a, b| a.point.z.total_cmp(&b.point.z)),
            ArchKind::Lower => candidates.min_by(|a, b| a.point.z.total_cmp(&b.point.z)),
        };
        chosen.map_or(ProjectionOutcome::Miss, ProjectionOutcome::Hit)
    }

    fn surface_hit(&self, hit: RayHit, distance: f64) -> SurfaceHit {
        let [a, b, c] = self.mesh.triangle(hit.triangle);
        let w = 1.0 - hit.u - hit.v;
        let point = Point3::new(
            w * a.x + hit.u * b.x + hit.v * c.x,
            w * a.y + hit.u * b.y + hit.v * c.y,
            w * a.z + hit.u * b.z + hit.v * c.z,
        );
        SurfaceHit {
            point,
            normal: self.mesh.normal_at(hit.triangle, hit.u, hit.v),
            triangle: hit.triangle,
            distance,
        }
    }
}

/// Möller–Trumbore; returns `(t, u, v)` for hits with `t >= 0`.
fn intersect_triangle(ray: &Ray, [a, b, c]: [Point3; 3], tol: Tolerance) -> Option<(f64, f64, f64)> {
    let edge1 = b.sub_point(a);
    let edge2 = c.sub_point(a);
    let h = ray.dir.cross(edge2);
    let det = edge1.dot(h);
    let det_eps = tol.eps * edge1.length() * h.length();
    if !det.is_finite() || det.abs() <= det_eps {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin.sub_point(a);
    let u = inv_det * s.dot(h);
    if u < -tol.eps || u > 1.0 + tol.eps {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * ray.dir.dot(q);
    if v < -tol.eps || u + v > 1.0 + tol.eps {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    if !t.is_finite() || t < -tol.eps {
        return None;
    }
    Some((t.max(0.0), u, v))
}

/// Projector shared between design sessions.
///
/// Queries take a read lock; [`rebuild`](Self::rebuild) prepares the new BVH
/// without holding the lock and only swaps it in under the write lock, so a
/// rebuild never races with queries.
#[derive(Debug, Clone)]
pub struct SharedProjector {
    inner: Arc<RwLock<SurfaceProjector>>,
    generation: Arc<AtomicU64>,
}

impl SharedProjector {
    #[must_use]
    pub fn new(projector: SurfaceProjector) -> Self {
        Self {
            inner: Arc::new(RwLock::new(projector)),
            generation: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn build(mesh: SurfaceMesh, options: ProjectorOptions) -> Result<Self, WireError> {
        SurfaceProjector::build(mesh, options).map(Self::new)
    }

    /// Replaces the mesh; returns the new generation.
    pub fn rebuild(&self, mesh: SurfaceMesh) -> Result<u64, WireError> {
        let options = *self.read().options();
        let rebuilt = SurfaceProjector::build(mesh, options)?;
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = rebuilt;
        Ok(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Increments every time the mesh is replaced.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SurfaceProjector> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_options(&self, options: ProjectorOptions) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_options(options);
    }
}
