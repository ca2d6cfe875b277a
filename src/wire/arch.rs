//! Ideal arch form fitted to the anchors.

use super::anchor::AnchorPosition;
use super::error::WireError;
use crate::geom::{Point3, solve_linear_system};

const POLY_DEGREE: usize = 4;

/// Least-squares quartic `y(x)` through the anchors with `z` interpolated
/// linearly over `x`, sampled at `num_points` evenly spaced `x` values from the
/// first to the last anchor.
///
/// With fewer than five anchors the fit is underdetermined and the anchor
/// positions are returned unchanged.
pub fn ideal_arch_curve(anchors: &[AnchorPosition], num_points: usize) -> Result<Vec<Point3>, WireError> {
    if anchors.len() < 2 {
        return Err(WireError::InsufficientAnchors { visible: anchors.len() });
    }
    if anchors.iter().any(|a| !a.position.is_finite()) {
        return Err(WireError::NonFiniteInput("anchors"));
    }
    if anchors.len() <= POLY_DEGREE {
        return Ok(anchors.iter().map(|a| a.position).collect());
    }
    if num_points < 2 {
        return Err(WireError::InvalidConfig(format!(
            "ideal arch needs at least 2 samples, got {num_points}"
        )));
    }

    let xs: Vec<f64> = anchors.iter().map(|a| a.position.x).collect();
    let ys: Vec<f64> = anchors.iter().map(|a| a.position.y).collect();
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let scale = xs.iter().map(|x| (x - mean).abs()).fold(0.0, f64::max);
    if scale <= f64::EPSILON {
        return Err(WireError::DegenerateGeometry("anchors share one x coordinate".to_string()));
    }
    let norm = |x: f64| (x - mean) / scale;

    let coeffs = fit_polynomial(&xs.iter().map(|x| norm(*x)).collect::<Vec<_>>(), &ys, POLY_DEGREE)
        .map_err(|err| WireError::DegenerateGeometry(err.to_string()))?;

    let mut by_x: Vec<(f64, f64)> = anchors.iter().map(|a| (a.position.x, a.position.z)).collect();
    by_x.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (start, end) = (xs[0], xs[xs.len() - 1]);
    Ok((0..num_points)
        .map(|i| {
            let x = start + (end - start) * i as f64 / (num_points - 1) as f64;
            Point3::new(x, eval_polynomial(&coeffs, norm(x)), interpolate(&by_x, x))
        })
        .collect())
}

/// Normal-equation fit; coefficients in ascending powers.
fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>, crate::geom::CurveError> {
    let terms = degree + 1;
    let mut matrix = vec![vec![0.0; terms]; terms];
    let mut rhs = vec![0.0; terms];
    for (&x, &y) in xs.iter().zip(ys) {
        let powers: Vec<f64> = (0..2 * terms).scan(1.0, |acc, _| {
            let p = *acc;
            *acc *= x;
            Some(p)
        }).collect();
        for r in 0..terms {
            for c in 0..terms {
                matrix[r][c] += powers[r + c];
            }
            rhs[r] += powers[r] * y;
        }
    }
    solve_linear_system(&matrix, &rhs)
}

fn eval_polynomial(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Piecewise-linear interpolation over points sorted by x, clamped at the ends.
fn interpolate(sorted: &[(f64, f64)], x: f64) -> f64 {
    let (first, last) = (sorted[0], sorted[sorted.len() - 1]);
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    let i = sorted.partition_point(|p| p.0 <= x).clamp(1, sorted.len() - 1);
    let (a, b) = (sorted[i - 1], sorted[i]);
    if b.0 - a.0 <= f64::EPSILON {
        return a.1;
    }
    a.1 + (b.1 - a.1) * (x - a.0) / (b.0 - a.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors_on(f: impl Fn(f64) -> f64, xs: &[f64]) -> Vec<AnchorPosition> {
        xs.iter()
            .map(|&x| AnchorPosition::new(Point3::new(x, f(x), 5.0 + 0.1 * x)))
            .collect()
    }

    #[test]
    fn quartic_anchors_are_reproduced() {
        let f = |x: f64| 20.0 - 0.2 * x * x + 0.001 * x.powi(4);
        let xs = [25.0, 18.0, 10.0, 3.0, -3.0, -10.0, -18.0, -25.0];
        let curve = ideal_arch_curve(&anchors_on(f, &xs), 51).expect("curve");

        assert_eq!(curve.len(), 51);
        assert!((curve[0].x - 25.0).abs() < 1e-12);
        assert!((curve[50].x + 25.0).abs() < 1e-12);
        for p in &curve {
            assert!((p.y - f(p.x)).abs() < 1e-6, "{p:?}");
            assert!((p.z - (5.0 + 0.1 * p.x)).abs() < 1e-9);
        }
    }

    #[test]
    fn few_anchors_are_returned_verbatim() {
        let anchors = anchors_on(|x| x, &[1.0, 2.0, 3.0]);
        let curve = ideal_arch_curve(&anchors, 100).expect("curve");
        assert_eq!(curve, anchors.iter().map(|a| a.position).collect::<Vec<_>>());
    }

    #[test]
    fn too_few_samples_is_rejected() {
        let anchors = anchors_on(|x| x, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(matches!(ideal_arch_curve(&anchors, 1), Err(WireError::InvalidConfig(_))));
        assert!(matches!(
            ideal_arch_curve(&anchors[..1], 10),
            Err(WireError::InsufficientAnchors { visible: 1 })
        ));
    }
}
