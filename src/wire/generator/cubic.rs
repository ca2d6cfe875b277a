//! Weighted natural smoothing spline (Reinsch) fitted per coordinate over
//! chord-length parameters.
//!
//! For knots `t_0 < … < t_{n-1}` with spacing `h_i` the fitted values `g` and
//! interior second derivatives `γ` satisfy
//!
//! ```text
//! (R + λ·Qᵀ W⁻¹ Q) γ = Qᵀ y
//! g = y − λ·W⁻¹ Q γ
//! ```
//!
//! where `Q` is the `n × (n−2)` second-difference matrix, `R` the tridiagonal
//! `(n−2) × (n−2)` spline matrix and `W` the diagonal of point weights. With
//! `λ = 0` the curve interpolates every control point.

use serde::{Deserialize, Serialize};

use super::{GeneratedPath, PathGenerator, PathStrategy, check_inputs, push_last};
use crate::geom::{Point3, cumulative_arc_lengths, solve_linear_system};
use crate::wire::control::ControlPoint;
use crate::wire::error::WireError;
use crate::wire::sampler::SamplePlan;

const MIN_KNOT_SPACING: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubicOptions {
    /// Smoothing parameter λ; 0 interpolates.
    pub smoothing: f64,
}

impl Default for CubicOptions {
    fn default() -> Self {
        Self { smoothing: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CubicSplineGenerator {
    options: CubicOptions,
}

impl CubicSplineGenerator {
    #[must_use]
    pub fn new(options: CubicOptions) -> Self {
        Self { options }
    }
}

impl PathGenerator for CubicSplineGenerator {
    fn strategy(&self) -> PathStrategy {
        PathStrategy::CubicSpline
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
        let knots = cumulative_arc_lengths(&positions);
        if let Some(i) = knots.windows(2).position(|w| w[1] - w[0] <= MIN_KNOT_SPACING) {
            return Err(WireError::DegenerateGeometry(format!(
                "control points {i} and {} coincide",
                i + 1
            )));
        }

        let lambda = self.options.smoothing.max(0.0);
        let channels = [
            positions.iter().map(|p| p.x).collect::<Vec<_>>(),
            positions.iter().map(|p| p.y).collect::<Vec<_>>(),
            positions.iter().map(|p| p.z).collect::<Vec<_>>(),
        ];
        let mut splines = Vec::with_capacity(3);
        for values in &channels {
            splines.push(SmoothingSpline::fit(&knots, values, &weights, lambda)?);
        }

        let mut points = Vec::with_capacity(plan.total_points());
        for (seg, &count) in plan.per_segment.iter().enumerate() {
            let h = knots[seg + 1] - knots[seg];
            for j in 0..count {
                let t = knots[seg] + h * j as f64 / count as f64;
                points.push(Point3::new(
                    splines[0].eval(seg, t),
                    splines[1].eval(seg, t),
                    splines[2].eval(seg, t),
                ));
            }
        }

        let end = splines.iter().map(|s| s.values[s.values.len() - 1]).collect::<Vec<_>>();
        if lambda == 0.0 {
            push_last(&mut points, control_points);
        } else {
            points.push(Point3::new(end[0], end[1], end[2]));
        }
        Ok(GeneratedPath::new(points))
    }
}

/// One coordinate channel: fitted values and second derivatives at the knots.
#[derive(Debug, Clone)]
struct SmoothingSpline<'a> {
    knots: &'a [f64],
    values: Vec<f64>,
    /// Natural boundary: zero at both ends.
    second: Vec<f64>,
}

impl<'a> SmoothingSpline<'a> {
    fn fit(knots: &'a [f64], y: &[f64], weights: &[f64], lambda: f64) -> Result<Self, WireError> {
        let n = knots.len();
        if n < 3 {
            return Ok(Self {
                knots,
                values: y.to_vec(),
                second: vec![0.0; n],
            });
        }

        let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        let m = n - 2;

        // Q column j (interior knot j+1) has entries at rows j, j+1, j+2.
        let q = |row: usize, col: usize| -> f64 {
            if row == col {
                1.0 / h[col]
            } else if row == col + 1 {
                -1.0 / h[col] - 1.0 / h[col + 1]
            } else if row == col + 2 {
                1.0 / h[col + 1]
            } else {
                0.0
            }
        };

        let mut matrix = vec![vec![0.0; m]; m];
        for j in 0..m {
            matrix[j][j] = (h[j] + h[j + 1]) / 3.0;
            if j + 1 < m {
                matrix[j][j + 1] = h[j + 1] / 6.0;
                matrix[j + 1][j] = h[j + 1] / 6.0;
            }
        }
        if lambda > 0.0 {
            for a in 0..m {
                for b in a.saturating_sub(2)..(a + 3).min(m) {
                    let rows = a.max(b)..=(a + 2).min(b + 2);
                    let sum: f64 = rows.map(|r| q(r, a) * q(r, b) / weights[r]).sum();
                    matrix[a][b] += lambda * sum;
                }
            }
        }

        let rhs: Vec<f64> = (0..m).map(|j| (j..j + 3).map(|r| q(r, j) * y[r]).sum()).collect();
        let gamma = solve_linear_system(&matrix, &rhs)
            .map_err(|err| WireError::DegenerateGeometry(err.to_string()))?;

        let values: Vec<f64> = (0..n)
            .map(|r| {
                let q_gamma: f64 = (r.saturating_sub(2)..=r.min(m - 1)).map(|j| q(r, j) * gamma[j]).sum();
                y[r] - lambda * q_gamma / weights[r]
            })
            .collect();

        let mut second = vec![0.0; n];
        second[1..=m].copy_from_slice(&gamma);
        Ok(Self {
            knots,
            values,
            second,
        })
    }

    /// Green–Silverman evaluation on the interval starting at knot `i`.
    fn eval(&self, i: usize, t: f64) -> f64 {
        let (t0, t1) = (self.knots[i], self.knots[i + 1]);
        let h = t1 - t0;
        let (a, b) = (t - t0, t1 - t);
        let (g0, g1) = (self.values[i], self.values[i + 1]);
        let (c0, c1) = (self.second[i], self.second[i + 1]);
        (a * g1 + b * g0) / h - a * b / 6.0 * ((1.0 + a / h) * c1 + (1.0 + b / h) * c0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::control::ControlPointId;

    fn arch_control_points() -> Vec<ControlPoint> {
        [(10.0, 0.0), (8.0, 5.0), (4.0, 8.0), (0.0, 9.0), (-4.0, 8.0), (-8.0, 5.0), (-10.0, 0.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| ControlPoint::interpolated(ControlPointId(i), Point3::new(x, y, 5.0)))
            .collect()
    }

    fn plan_for(cps: &[ControlPoint], per_segment: usize) -> SamplePlan {
        SamplePlan {
            per_segment: vec![per_segment; cps.len() - 1],
        }
    }

    #[test]
    fn zero_smoothing_interpolates() {
        let cps = arch_control_points();
        let plan = plan_for(&cps, 10);
        let generator = CubicSplineGenerator::new(CubicOptions { smoothing: 0.0 });
        let path = generator.generate_planned(&cps, &plan).expect("path");

        assert_eq!(path.points.len(), plan.total_points());
        for (offset, cp) in plan.offsets().iter().zip(&cps) {
            assert!(path.points[*offset].distance_to(cp.position) < 1e-9);
        }
        assert_eq!(path.points.last().copied(), cps.last().map(|cp| cp.position));
    }

    #[test]
    fn smoothing_pulls_away_from_outlier() {
        let mut cps = arch_control_points();
        cps[3].position = Point3::new(0.0, 12.0, 5.0);
        let plan = plan_for(&cps, 10);
        let offset = plan.offsets()[3];

        let exact = CubicSplineGenerator::new(CubicOptions { smoothing: 0.0 })
            .generate_planned(&cps, &plan)
            .expect("path");
        let smooth = CubicSplineGenerator::new(CubicOptions { smoothing: 5.0 })
            .generate_planned(&cps, &plan)
            .expect("path");

        assert!(smooth.points[offset].y < exact.points[offset].y);
    }

    #[test]
    fn straight_control_points_stay_straight() {
        let cps: Vec<ControlPoint> = (0..5)
            .map(|i| ControlPoint::interpolated(ControlPointId(i), Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        let plan = plan_for(&cps, 4);
        let path = CubicSplineGenerator::default().generate_planned(&cps, &plan).expect("path");
        for p in &path.points {
            assert!(p.y.abs() < 1e-9 && p.z.abs() < 1e-9);
        }
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let cps = vec![
            ControlPoint::interpolated(ControlPointId(0), Point3::new(0.0, 0.0, 0.0)),
            ControlPoint::interpolated(ControlPointId(1), Point3::new(0.0, 0.0, 0.0)),
            ControlPoint::interpolated(ControlPointId(2), Point3::new(1.0, 0.0, 0.0)),
        ];
        let plan = plan_for(&cps, 4);
        assert!(matches!(
            CubicSplineGenerator::default().generate_planned(&cps, &plan),
            Err(WireError::DegenerateGeometry(_))
        ));
    }
}
