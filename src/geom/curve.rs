use super::core::{Point3, Tolerance, Vec3};

/// Pivot magnitude below which a linear system is treated as singular.
const SINGULAR_PIVOT: f64 = 1e-14;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("b-spline requires at least 2 control points")]
    TooFewControlPoints,
    #[error("b-spline degree must be in 1..{max}, got {degree}")]
    InvalidDegree { degree: usize, max: usize },
    #[error("b-spline knot vector must have {expected} entries, got {actual}")]
    KnotCount { expected: usize, actual: usize },
    #[error("b-spline knots must be non-decreasing")]
    KnotsNotSorted,
    #[error("b-spline weights must be finite, positive and one per control point")]
    InvalidWeights,
    #[error("linear system is singular")]
    SingularSystem,
    #[error("linear system dimensions do not match")]
    DimensionMismatch,
}

pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Central-difference tangent, clamped to the domain.
    #[must_use]
    fn derivative_at(&self, t: f64) -> Vec3 {
        let (a, b) = self.domain();
        let h = 1e-6 * (b - a).abs();
        if !h.is_finite() || h == 0.0 {
            return Vec3::ZERO;
        }
        let t0 = (t - h).max(a);
        let t1 = (t + h).min(b);
        if t1 <= t0 {
            return Vec3::ZERO;
        }
        self.point_at(t1)
            .sub_point(self.point_at(t0))
            .mul_scalar(1.0 / (t1 - t0))
    }
}

/// Rational B-spline curve evaluated with de Boor's algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsCurve3 {
    pub degree: usize,
    pub control_points: Vec<Point3>,
    pub knots: Vec<f64>,
    pub weights: Option<Vec<f64>>,
}

impl NurbsCurve3 {
    pub fn new(
        degree: usize,
        control_points: Vec<Point3>,
        knots: Vec<f64>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, CurveError> {
        if control_points.len() < 2 {
            return Err(CurveError::TooFewControlPoints);
        }
        if degree == 0 || degree >= control_points.len() {
            return Err(CurveError::InvalidDegree {
                degree,
                max: control_points.len(),
            });
        }
        let expected = control_points.len() + degree + 1;
        if knots.len() != expected {
            return Err(CurveError::KnotCount {
                expected,
                actual: knots.len(),
            });
        }
        if !knots.windows(2).all(|w| w[0] <= w[1]) {
            return Err(CurveError::KnotsNotSorted);
        }
        if let Some(ref w) = weights {
            if w.len() != control_points.len() || w.iter().any(|w| !w.is_finite() || *w <= 0.0) {
                return Err(CurveError::InvalidWeights);
            }
        }

        Ok(Self {
            degree,
            control_points,
            knots,
            weights,
        })
    }

    /// Clamped curve over `[0, 1]` with uniformly spaced interior knots.
    ///
    /// The degree is lowered to `control_points.len() - 1` when there are too few
    /// points, so the curve always starts and ends on the first and last point.
    pub fn clamped_uniform(
        control_points: Vec<Point3>,
        degree: usize,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, CurveError> {
        if control_points.len() < 2 {
            return Err(CurveError::TooFewControlPoints);
        }
        let p = degree.clamp(1, control_points.len() - 1);
        let spans = control_points.len() - p;

        let mut knots = vec![0.0; p + 1];
        knots.extend((1..spans).map(|j| j as f64 / spans as f64));
        knots.extend(std::iter::repeat_n(1.0, p + 1));

        Self::new(p, control_points, knots, weights)
    }
}

impl Curve3 for NurbsCurve3 {
    fn point_at(&self, t: f64) -> Point3 {
        let p = self.degree;
        let (a, b) = self.domain();
        let u = t.clamp(a, b);

        let n = self.control_points.len() - 1;
        let span = find_span(n, p, u, &self.knots);

        let mut d: Vec<HPoint4> = (0..=p)
            .map(|j| {
                let index = span - p + j;
                let w = self.weights.as_ref().map_or(1.0, |w| w[index]);
                HPoint4::weighted(self.control_points[index], w)
            })
            .collect();

        for r in 1..=p {
            for j in (r..=p).rev() {
                let i = span - p + j;
                let denom = self.knots[i + p + 1 - r] - self.knots[i];
                let alpha = if denom == 0.0 { 0.0 } else { (u - self.knots[i]) / denom };
                d[j] = d[j - 1].lerp(d[j], alpha);
            }
        }

        d[p].project().unwrap_or(self.control_points[span])
    }

    fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.control_points.len()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HPoint4 {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl HPoint4 {
    fn weighted(p: Point3, w: f64) -> Self {
        Self {
            x: p.x * w,
            y: p.y * w,
            z: p.z * w,
            w,
        }
    }

    fn lerp(self, rhs: Self, t: f64) -> Self {
        let s = 1.0 - t;
        Self {
            x: self.x * s + rhs.x * t,
            y: self.y * s + rhs.y * t,
            z: self.z * s + rhs.z * t,
            w: self.w * s + rhs.w * t,
        }
    }

    fn project(self) -> Option<Point3> {
        (self.w.is_finite() && self.w != 0.0)
            .then(|| Point3::new(self.x / self.w, self.y / self.w, self.z / self.w))
    }
}

fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Cumulative chord lengths, starting at 0. Not normalized.
#[must_use]
pub fn cumulative_arc_lengths(points: &[Point3]) -> Vec<f64> {
    let mut total = 0.0;
    let mut out = Vec::with_capacity(points.len());
    if points.is_empty() {
        return out;
    }
    out.push(0.0);
    for w in points.windows(2) {
        let seg = w[1].distance_to(w[0]);
        if seg.is_finite() {
            total += seg;
        }
        out.push(total);
    }
    out
}

#[must_use]
pub fn polyline_length(points: &[Point3]) -> f64 {
    cumulative_arc_lengths(points).last().copied().unwrap_or(0.0)
}

/// Solves a dense `Ax = b` with Gaussian elimination and partial pivoting.
pub fn solve_linear_system(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>, CurveError> {
    let n = matrix.len();
    if n == 0 || rhs.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(CurveError::DimensionMismatch);
    }

    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .zip(rhs)
        .map(|(row, &b)| {
            let mut r = row.clone();
            r.push(b);
            r
        })
        .collect();

    for k in 0..n {
        let (pivot_row, pivot_abs) = (k..n)
            .map(|i| (i, aug[i][k].abs()))
            .fold((k, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if !pivot_abs.is_finite() || pivot_abs < SINGULAR_PIVOT {
            return Err(CurveError::SingularSystem);
        }
        aug.swap(k, pivot_row);

        let pivot = aug[k][k];
        for i in (k + 1)..n {
            let factor = aug[i][k] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in k..=n {
                aug[i][j] -= factor * aug[k][j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|j| aug[i][j] * x[j]).sum();
        x[i] = (aug[i][n] - tail) / aug[i][i];
    }
    Ok(x)
}

/// Orthonormal frame attached to a point on a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrenetFrame {
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

impl FrenetFrame {
    /// Frame with an arbitrary but deterministic normal.
    ///
    /// The reference axis is X unless the tangent is nearly parallel to it.
    #[must_use]
    pub fn from_tangent(tangent: Vec3) -> Option<Self> {
        let tangent = tangent.normalized()?;
        let reference = if tangent.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
        let normal = tangent.cross(reference).normalized()?;
        let binormal = tangent.cross(normal);
        Some(Self {
            tangent,
            normal,
            binormal,
        })
    }

    /// Carries the frame onto `tangent` by the minimal rotation.
    #[must_use]
    pub fn transported(&self, tangent: Vec3, tol: Tolerance) -> Self {
        let axis = self.tangent.cross(tangent);
        if axis.length_squared() < tol.eps_squared() {
            let flip = if self.tangent.dot(tangent) < 0.0 { -1.0 } else { 1.0 };
            return Self {
                tangent,
                normal: self.normal.mul_scalar(flip),
                binormal: self.binormal.mul_scalar(flip),
            };
        }

        let axis = axis.normalized_or_zero();
        let angle = self.tangent.dot(tangent).clamp(-1.0, 1.0).acos();
        let normal = rotate_vector(self.normal, axis, angle)
            .reject_from(tangent)
            .normalized()
            .unwrap_or(self.normal);
        let binormal = tangent.cross(normal).normalized().unwrap_or(self.binormal);
        Self {
            tangent,
            normal,
            binormal,
        }
    }
}

/// Rodrigues rotation of `v` about the unit `axis`.
#[must_use]
pub fn rotate_vector(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    v.mul_scalar(cos)
        .add(axis.cross(v).mul_scalar(sin))
        .add(axis.mul_scalar(axis.dot(v) * (1.0 - cos)))
}

/// Rotation-minimizing frames along an open polyline.
///
/// Returns the frames plus the number of vertices where the tangent had to be
/// reused because a segment was degenerate.
#[must_use]
pub fn parallel_transport_frames(rail: &[Point3], tol: Tolerance) -> (Vec<FrenetFrame>, usize) {
    let fallback = FrenetFrame {
        tangent: Vec3::Z,
        normal: Vec3::X,
        binormal: Vec3::Y,
    };
    if rail.len() < 2 {
        return (vec![fallback; rail.len()], 0);
    }

    let mut degenerate = 0usize;
    let first = FrenetFrame::from_tangent(rail[1].sub_point(rail[0])).unwrap_or_else(|| {
        degenerate += 1;
        fallback
    });

    let mut frames = Vec::with_capacity(rail.len());
    frames.push(first);

    for i in 1..rail.len() {
        let prev = frames[i - 1];
        let raw = if i + 1 < rail.len() {
            rail[i + 1].sub_point(rail[i]).normalized_or_zero()
                + rail[i].sub_point(rail[i - 1]).normalized_or_zero()
        } else {
            rail[i].sub_point(rail[i - 1])
        };
        let tangent = raw.normalized().unwrap_or_else(|| {
            degenerate += 1;
            prev.tangent
        });
        frames.push(prev.transported(tangent, tol));
    }

    (frames, degenerate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_linear_system_small() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear_system(&a, &[3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_solve_linear_system_singular() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(
            solve_linear_system(&a, &[1.0, 2.0]),
            Err(CurveError::SingularSystem)
        );
    }

    #[test]
    fn test_rotate_vector_quarter_turn() {
        let r = rotate_vector(Vec3::X, Vec3::Z, std::f64::consts::FRAC_PI_2);
        assert!((r.x).abs() < 1e-12);
        assert!((r.y - 1.0).abs() < 1e-12);
    }
}
