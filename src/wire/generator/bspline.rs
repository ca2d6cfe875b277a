use serde::{Deserialize, Serialize};

use super::{GeneratedPath, PathGenerator, PathStrategy, check_inputs};
use crate::geom::{Curve3, NurbsCurve3, Point3};
use crate::wire::control::ControlPoint;
use crate::wire::error::WireError;
use crate::wire::sampler::SamplePlan;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BSplineOptions {
    /// Lowered automatically when there are too few control points.
    pub degree: usize,
}

impl Default for BSplineOptions {
    fn default() -> Self {
        Self { degree: 3 }
    }
}

/// Clamped rational B-spline using the control points as its control polygon.
///
/// Only the end points are interpolated. Segment `i` of the plan covers the
/// parameter range `[i/(m−1), (i+1)/(m−1)]` for `m` control points.
#[derive(Debug, Clone, Copy, Default)]
pub struct BSplineGenerator {
    options: BSplineOptions,
}

impl BSplineGenerator {
    #[must_use]
    pub fn new(options: BSplineOptions) -> Self {
        Self { options }
    }
}

impl PathGenerator for BSplineGenerator {
    fn strategy(&self) -> PathStrategy {
        PathStrategy::BSpline
    }

    fn generate_planned(
        &self,
        control_points: &[ControlPoint],
        plan: &SamplePlan,
    ) -> Result<GeneratedPath, WireError> {
        check_inputs(control_points, plan)?;
        let positions: Vec<Point3> = control_points.iter().map(|cp| cp.position).collect();
        let weights: Vec<f64> = control_points
            .iter()
            .map(|cp| if cp.weight.is_finite() && cp.weight > 0.0 { cp.weight } else { 1.0 })
            .collect();

        let curve = NurbsCurve3::clamped_uniform(positions, self.options.degree, Some(weights))
            .map_err(|err| WireError::DegenerateGeometry(err.to_string()))?;

        let spans = plan.segments() as f64;
        let mut points = Vec::with_capacity(plan.total_points());
        for (seg, &count) in plan.per_segment.iter().enumerate() {
            for j in 0..count {
                let u = (seg as f64 + j as f64 / count as f64) / spans;
                points.push(curve.point_at(u));
            }
        }
        points.push(curve.point_at(1.0));
        Ok(GeneratedPath::new(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::control::ControlPointId;

    fn zigzag() -> Vec<ControlPoint> {
        (0..6)
            .map(|i| {
                let y = if i % 2 == 0 { 0.0 } else { 4.0 };
                ControlPoint::interpolated(ControlPointId(i), Point3::new(i as f64 * 3.0, y, 0.0))
            })
            .collect()
    }

    #[test]
    fn clamps_to_end_points_but_approximates_interior() {
        let cps = zigzag();
        let plan = SamplePlan {
            per_segment: vec![6; cps.len() - 1],
        };
        let path = BSplineGenerator::default().generate_planned(&cps, &plan).expect("path");

        assert_eq!(path.points.len(), plan.total_points());
        assert!(path.points[0].distance_to(cps[0].position) < 1e-9);
        assert!(path.points.last().is_some_and(|p| p.distance_to(cps[5].position) < 1e-9));

        // Interior corners are cut off; only the clamped ends are interpolated.
        for cp in &cps[1..cps.len() - 1] {
            let nearest = path
                .points
                .iter()
                .map(|p| p.distance_to(cp.position))
                .fold(f64::INFINITY, f64::min);
            assert!(nearest > 0.1, "control point {} touched ({nearest})", cp.id);
        }
    }

    #[test]
    fn degree_drops_for_short_input() {
        let cps = zigzag()[..2].to_vec();
        let plan = SamplePlan { per_segment: vec![4] };
        let generator = BSplineGenerator::new(BSplineOptions { degree: 5 });
        let path = generator.generate_planned(&cps, &plan).expect("path");
        assert!((path.points[2].x - 1.5).abs() < 1e-9);
        assert!((path.points[2].y - 2.0).abs() < 1e-9);
    }
}
