use std::collections::HashMap;

use super::diagnostics::GeomMeshDiagnostics;
use super::{Point3, Tolerance, Vec3};

/// Indexed triangle mesh handed to renderers and exporters.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub uvs: Option<Vec<[f64; 2]>>,
    pub normals: Option<Vec<[f64; 3]>>,
}

impl GeomMesh {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.positions.iter().flatten().any(|v| !v.is_finite()) {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        let n = self.positions.len() as u32;
        if self.indices.iter().any(|&i| i >= n) {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        let n = self.positions.len();
        if self.uvs.as_ref().is_some_and(|uvs| uvs.len() != n)
            || self.normals.as_ref().is_some_and(|normals| normals.len() != n)
        {
            return Err("mesh attribute buffers do not match vertex count".to_string());
        }
        Ok(())
    }

    /// Packed `[x0, y0, z0, x1, ...]` buffer for JS adapters.
    #[must_use]
    pub fn positions_flat(&self) -> Vec<f64> {
        self.positions.iter().flatten().copied().collect()
    }

    /// Packed normal buffer, empty when normals were not computed.
    #[must_use]
    pub fn normals_flat(&self) -> Vec<f64> {
        self.normals
            .as_deref()
            .map(|normals| normals.iter().flatten().copied().collect())
            .unwrap_or_default()
    }
}

/// Repairs raw generated geometry and reports what was changed.
///
/// Steps: weld coincident vertices, drop degenerate triangles, make winding
/// consistent, orient closed meshes outward, and compute smooth normals.
pub(crate) fn finalize_mesh(
    points: Vec<Point3>,
    uvs: Option<Vec<[f64; 2]>>,
    indices: Vec<u32>,
    tol: Tolerance,
) -> (GeomMesh, GeomMeshDiagnostics) {
    let (points, uvs, indices, welded_vertex_count) =
        weld_mesh_vertices(points, uvs.as_deref(), indices, tol);
    let (mut indices, degenerate_triangle_count) = cull_degenerate_triangles(&points, &indices, tol);

    let flipped_triangle_count = fix_triangle_winding_consistency(&mut indices);
    let (open_edge_count, non_manifold_edge_count) = count_edge_topology(&indices);

    let mut warnings = Vec::new();
    if open_edge_count == 0 && non_manifold_edge_count == 0 {
        let volume = signed_volume(&points, &indices);
        if volume.is_finite() && volume < 0.0 {
            for tri in indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
            warnings.push("mesh orientation flipped (outward)".to_string());
        }
    }
    if open_edge_count > 0 {
        warnings.push("mesh has open edges".to_string());
    }
    if non_manifold_edge_count > 0 {
        warnings.push("mesh has non-manifold edges".to_string());
    }

    let normals = compute_smooth_normals(&points, &indices);
    let mesh = GeomMesh {
        positions: points.into_iter().map(Point3::to_array).collect(),
        indices,
        uvs,
        normals: Some(normals),
    };

    let diagnostics = GeomMeshDiagnostics {
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.triangle_count(),
        welded_vertex_count,
        flipped_triangle_count,
        degenerate_triangle_count,
        open_edge_count,
        non_manifold_edge_count,
        timing: None,
        warnings,
    };

    (mesh, diagnostics)
}

fn weld_mesh_vertices(
    points: Vec<Point3>,
    uvs: Option<&[[f64; 2]]>,
    indices: Vec<u32>,
    tol: Tolerance,
) -> (Vec<Point3>, Option<Vec<[f64; 2]>>, Vec<u32>, usize) {
    if !tol.eps.is_finite() || tol.eps <= 0.0 {
        return (points, uvs.map(<[_]>::to_vec), indices, 0);
    }

    let inv = 1.0 / tol.eps;
    let cell = |p: Point3| -> Option<(i64, i64, i64)> {
        p.is_finite().then(|| {
            (
                (p.x * inv).floor() as i64,
                (p.y * inv).floor() as i64,
                (p.z * inv).floor() as i64,
            )
        })
    };

    let mut buckets: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    let mut remap = Vec::with_capacity(points.len());
    let mut out_points: Vec<Point3> = Vec::with_capacity(points.len());
    let mut out_uvs = uvs.map(|_| Vec::with_capacity(points.len()));

    for (i, p) in points.iter().copied().enumerate() {
        let key = cell(p);
        let found = key.and_then(|(kx, ky, kz)| {
            let neighbours = (-1..=1).flat_map(|dx| {
                (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (kx + dx, ky + dy, kz + dz)))
            });
            neighbours
                .filter_map(|k| buckets.get(&k))
                .flatten()
                .copied()
                .find(|&cand| tol.approx_eq_point3(out_points[cand as usize], p))
        });

        let index = found.unwrap_or_else(|| {
            let new_idx = out_points.len() as u32;
            out_points.push(p);
            if let (Some(src), Some(dst)) = (uvs, out_uvs.as_mut()) {
                dst.push(src.get(i).copied().unwrap_or([0.0, 0.0]));
            }
            if let Some(key) = key {
                buckets.entry(key).or_default().push(new_idx);
            }
            new_idx
        });
        remap.push(index);
    }

    let out_indices = indices
        .into_iter()
        .map(|idx| remap.get(idx as usize).copied().unwrap_or(idx))
        .collect();
    let welded = points.len().saturating_sub(out_points.len());
    (out_points, out_uvs, out_indices, welded)
}

fn cull_degenerate_triangles(points: &[Point3], indices: &[u32], tol: Tolerance) -> (Vec<u32>, usize) {
    let mut out = Vec::with_capacity(indices.len());
    let mut removed = 0usize;

    for tri in indices.chunks_exact(3) {
        let corners = (
            points.get(tri[0] as usize),
            points.get(tri[1] as usize),
            points.get(tri[2] as usize),
        );
        let keep = match corners {
            (Some(a), Some(b), Some(c)) if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] => {
                let area2 = b.sub_point(*a).cross(c.sub_point(*a)).length_squared();
                area2.is_finite() && area2 > tol.eps_squared() * tol.eps_squared()
            }
            _ => false,
        };

        if keep {
            out.extend_from_slice(tri);
        } else {
            removed += 1;
        }
    }

    (out, removed)
}

fn edge_key(a: u32, b: u32) -> ((u32, u32), bool) {
    if a <= b { ((a, b), true) } else { ((b, a), false) }
}

fn fix_triangle_winding_consistency(indices: &mut [u32]) -> usize {
    let tri_count = indices.len() / 3;
    let mut edges: HashMap<(u32, u32), Vec<(usize, bool)>> = HashMap::with_capacity(tri_count * 3);
    for (t, tri) in indices.chunks_exact(3).enumerate() {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let (key, dir) = edge_key(a, b);
            edges.entry(key).or_default().push((t, dir));
        }
    }

    let mut visited = vec![false; tri_count];
    let mut flipped = vec![false; tri_count];

    for seed in 0..tri_count {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut stack = vec![seed];

        while let Some(t) = stack.pop() {
            let tri = [indices[t * 3], indices[t * 3 + 1], indices[t * 3 + 2]];
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let (key, dir_t) = edge_key(a, b);
                let Some(adj) = edges.get(&key).filter(|adj| adj.len() == 2) else {
                    continue;
                };
                let Some(&(other, dir_other)) = adj.iter().find(|(idx, _)| *idx != t) else {
                    continue;
                };
                if !visited[other] {
                    visited[other] = true;
                    // Neighbours sharing an edge must traverse it in opposite directions.
                    flipped[other] = flipped[t] ^ (dir_t == dir_other);
                    stack.push(other);
                }
            }
        }
    }

    let mut count = 0usize;
    for (t, flip) in flipped.iter().enumerate() {
        if *flip {
            indices.swap(t * 3 + 1, t * 3 + 2);
            count += 1;
        }
    }
    count
}

fn count_edge_topology(indices: &[u32]) -> (usize, usize) {
    let mut edge_counts: HashMap<(u32, u32), u32> = HashMap::new();
    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            *edge_counts.entry(edge_key(a, b).0).or_insert(0) += 1;
        }
    }

    edge_counts.values().fold((0, 0), |(open, non_manifold), &count| match count {
        1 => (open + 1, non_manifold),
        c if c > 2 => (open, non_manifold + 1),
        _ => (open, non_manifold),
    })
}

fn signed_volume(points: &[Point3], indices: &[u32]) -> f64 {
    indices
        .chunks_exact(3)
        .filter_map(|tri| {
            let a = points.get(tri[0] as usize)?.to_vec3();
            let b = points.get(tri[1] as usize)?.to_vec3();
            let c = points.get(tri[2] as usize)?.to_vec3();
            Some(a.dot(b.cross(c)))
        })
        .sum::<f64>()
        / 6.0
}

fn compute_smooth_normals(points: &[Point3], indices: &[u32]) -> Vec<[f64; 3]> {
    let mut acc = vec![Vec3::ZERO; points.len()];
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (Some(a), Some(b), Some(c)) = (points.get(i0), points.get(i1), points.get(i2)) else {
            continue;
        };
        // Area-weighted: the unnormalized cross product.
        let n = b.sub_point(*a).cross(c.sub_point(*a));
        acc[i0] = acc[i0] + n;
        acc[i1] = acc[i1] + n;
        acc[i2] = acc[i2] + n;
    }

    acc.into_iter()
        .map(|n| n.normalized().unwrap_or(Vec3::Z).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron(flip: bool) -> (Vec<Point3>, Vec<u32>) {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let mut indices = vec![0, 2, 1, 0, 1, 3, 1, 2, 3, 2, 0, 3];
        if flip {
            for tri in indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
        (points, indices)
    }

    #[test]
    fn test_finalize_orients_closed_mesh_outward() {
        let (points, indices) = tetrahedron(true);
        let (mesh, diag) = finalize_mesh(points.clone(), None, indices, Tolerance::default_geom());
        assert!(diag.is_watertight());
        assert!(signed_volume(&points, &mesh.indices) > 0.0);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_finalize_welds_and_culls() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        // Second triangle collapses onto an edge once vertex 3 welds onto 1.
        let indices = vec![0, 1, 2, 0, 3, 1];
        let (mesh, diag) = finalize_mesh(points, None, indices, Tolerance::default_geom());
        assert_eq!(diag.welded_vertex_count, 1);
        assert_eq!(diag.degenerate_triangle_count, 1);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(diag.open_edge_count, 3);
    }
}
