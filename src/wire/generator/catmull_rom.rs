use super::{GeneratedPath, PathGenerator, PathStrategy, check_inputs, push_last};
use crate::geom::Point3;
use crate::wire::control::ControlPoint;
use crate::wire::error::WireError;
use crate::wire::sampler::SamplePlan;

/// Uniform Catmull-Rom spline through every control point.
///
/// Boundary segments use a phantom neighbour reflected through the end point,
/// so a two-point input degenerates to a straight line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatmullRomGenerator;

impl PathGenerator for CatmullRomGenerator {
    fn strategy(&self) -> PathStrategy {
        PathStrategy::CatmullRom
    }

    fn generate_planned(
        &self,
        control_points: &[ControlPoint],
        plan: &SamplePlan,
    ) -> Result<GeneratedPath, WireError> {
        check_inputs(control_points, plan)?;
        let p: Vec<Point3> = control_points.iter().map(|cp| cp.position).collect();
        let n = p.len();

        let first_phantom = p[0] + (p[0] - p[1]);
        let last_phantom = p[n - 1] + (p[n - 1] - p[n - 2]);
        let at = |i: isize| -> Point3 {
            if i < 0 {
                first_phantom
            } else if i as usize >= n {
                last_phantom
            } else {
                p[i as usize]
            }
        };

        let mut points = Vec::with_capacity(plan.total_points());
        for (seg, &count) in plan.per_segment.iter().enumerate() {
            let i = seg as isize;
            let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
            points.push(p1);
            for j in 1..count {
                let t = j as f64 / count as f64;
                points.push(catmull_rom_point(p0, p1, p2, p3, t));
            }
        }
        push_last(&mut points, control_points);
        Ok(GeneratedPath::new(points))
    }
}

/// `0.5·[2P1 + (−P0+P2)t + (2P0−5P1+4P2−P3)t² + (−P0+3P1−3P2+P3)t³]`
#[must_use]
pub fn catmull_rom_point(p0: Point3, p1: Point3, p2: Point3, p3: Point3, t: f64) -> Point3 {
    let (p0, p1, p2, p3) = (p0.to_vec3(), p1.to_vec3(), p2.to_vec3(), p3.to_vec3());
    let t2 = t * t;
    let t3 = t2 * t;
    let v = (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
        * 0.5;
    Point3::new(v.x, v.y, v.z)
}
