mod test_strategies;

use crate::geom::{Point3, Vec3};
use crate::wire::AnchorPosition;

/// Anchors on a half ellipse opening toward -y, with outward normals.
fn arch_anchors(count: usize) -> Vec<AnchorPosition> {
    (0..count)
        .map(|i| {
            let a = std::f64::consts::PI * (i as f64 + 0.5) / count as f64;
            let position = Point3::new(25.0 * a.cos(), 20.0 * a.sin(), 0.0);
            let normal = Vec3::new(a.cos() / 25.0, a.sin() / 20.0, 0.0);
            AnchorPosition::new(position).with_normal(normal.normalized_or_zero())
        })
        .collect()
}
