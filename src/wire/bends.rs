//! Bend detection, validation against the material, and optional
//! minimum-radius enforcement.

use serde::{Deserialize, Serialize};

use super::material::WireMaterial;
use super::sampler::turning_angle;
use crate::geom::{Point3, Vec3, cumulative_arc_lengths};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSide {
    Left,
    Right,
}

/// One detected bend. Regenerated on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BendInfo {
    /// Index of the bend vertex in the path.
    pub index: usize,
    pub position: Point3,
    pub angle_degrees: f64,
    /// Circumradius of the three points around the bend; infinite when collinear.
    pub radius: f64,
    /// Unit direction the wire turns toward.
    pub direction: Vec3,
    pub side: TurnSide,
    /// Arc length from the start of the path to the bend vertex.
    pub arc_length: f64,
    pub is_valid: bool,
    pub stress_factor: f64,
    pub stress_concentration: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BendStatistics {
    pub count: usize,
    pub valid: usize,
    pub invalid: usize,
    pub max_stress_factor: f64,
    pub max_stress_concentration: f64,
    /// `None` when no bends were found.
    pub min_radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BendReport {
    pub bends: Vec<BendInfo>,
    pub statistics: BendStatistics,
}

impl BendReport {
    pub fn invalid_bends(&self) -> impl Iterator<Item = &BendInfo> {
        self.bends.iter().filter(|b| !b.is_valid)
    }
}

/// Read-only bend detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BendAnalyzer {
    pub threshold_degrees: f64,
}

impl Default for BendAnalyzer {
    fn default() -> Self {
        Self { threshold_degrees: 5.0 }
    }
}

impl BendAnalyzer {
    #[must_use]
    pub fn new(threshold_degrees: f64) -> Self {
        Self { threshold_degrees }
    }

    #[must_use]
    pub fn analyze(&self, points: &[Point3], material: &WireMaterial) -> BendReport {
        if points.len() < 3 {
            return BendReport::default();
        }
        let arc = cumulative_arc_lengths(points);
        let min_radius = material.min_bend_radius();

        let bends: Vec<BendInfo> = (1..points.len() - 1)
            .filter_map(|i| {
                let (prev, current, next) = (points[i - 1], points[i], points[i + 1]);
                let angle_degrees = turning_angle(prev, current, next).to_degrees();
                if angle_degrees <= self.threshold_degrees {
                    return None;
                }
                let incoming = current.sub_point(prev).normalized()?;
                let outgoing = next.sub_point(current).normalized()?;
                let radius = circumradius(prev, current, next);
                let side = if incoming.cross(outgoing).z >= 0.0 {
                    TurnSide::Left
                } else {
                    TurnSide::Right
                };
                Some(BendInfo {
                    index: i,
                    position: current,
                    angle_degrees,
                    radius,
                    direction: (outgoing - incoming).normalized_or_zero(),
                    side,
                    arc_length: arc[i],
                    is_valid: radius >= min_radius,
                    stress_factor: material.stress_factor(radius),
                    stress_concentration: material.stress_concentration(radius, angle_degrees),
                })
            })
            .collect();

        let statistics = summarize(&bends);
        BendReport { bends, statistics }
    }
}

fn summarize(bends: &[BendInfo]) -> BendStatistics {
    let valid = bends.iter().filter(|b| b.is_valid).count();
    BendStatistics {
        count: bends.len(),
        valid,
        invalid: bends.len() - valid,
        max_stress_factor: bends.iter().map(|b| b.stress_factor).fold(0.0, f64::max),
        max_stress_concentration: bends.iter().map(|b| b.stress_concentration).fold(0.0, f64::max),
        min_radius: bends.iter().map(|b| b.radius).reduce(f64::min),
    }
}

/// Radius of the circle through three points (Menger curvature inverse).
#[must_use]
pub fn circumradius(a: Point3, b: Point3, c: Point3) -> f64 {
    let ab = b.sub_point(a);
    let bc = c.sub_point(b);
    let ca = a.sub_point(c);
    let twice_area = ab.cross(bc).length();
    if twice_area <= f64::EPSILON * ab.length() * bc.length() {
        return f64::INFINITY;
    }
    ab.length() * bc.length() * ca.length() / (2.0 * twice_area)
}

/// Relaxes vertices whose local radius is below `min_radius` toward their
/// chord midpoint. Each pass moves a point by `1 − r/min_radius` of its offset
/// from the midpoint; end points never move. Returns the number of points
/// still below the limit after the final pass.
pub fn enforce_min_bend_radius(points: &mut [Point3], min_radius: f64, passes: usize) -> usize {
    if points.len() < 3 || min_radius.is_nan() || min_radius <= 0.0 {
        return 0;
    }
    for _ in 0..passes {
        let mut moved = false;
        for i in 1..points.len() - 1 {
            let radius = circumradius(points[i - 1], points[i], points[i + 1]);
            if radius >= min_radius {
                continue;
            }
            let keep = (radius / min_radius).clamp(0.0, 1.0);
            let mid = points[i - 1].midpoint(points[i + 1]);
            points[i] = mid + (points[i] - mid) * keep;
            moved = true;
        }
        if !moved {
            break;
        }
    }
    (1..points.len() - 1)
        .filter(|&i| circumradius(points[i - 1], points[i], points[i + 1]) < min_radius)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_angle() -> Vec<Point3> {
        vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)]
    }

    #[test]
    fn circumradius_of_known_triangles() {
        let pts = right_angle();
        assert!((circumradius(pts[0], pts[1], pts[2]) - std::f64::consts::SQRT_2 / 2.0).abs() < 1e-12);
        let line = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
        assert!(circumradius(line[0], line[1], line[2]).is_infinite());
    }

    #[test]
    fn right_angle_is_a_left_turn_and_invalid() {
        let report = BendAnalyzer::default().analyze(&right_angle(), &WireMaterial::niti());

        assert_eq!(report.bends.len(), 1);
        let bend = &report.bends[0];
        assert_eq!(bend.index, 1);
        assert!((bend.angle_degrees - 90.0).abs() < 1e-9);
        assert_eq!(bend.side, TurnSide::Left);
        assert!((bend.arc_length - 1.0).abs() < 1e-12);
        assert!(!bend.is_valid);
        assert!(bend.stress_factor > 1.0);
        let expected_dir = Vec3::new(-1.0, 1.0, 0.0).normalized_or_zero();
        assert!((bend.direction - expected_dir).length() < 1e-12);

        assert_eq!(report.statistics.count, 1);
        assert_eq!(report.statistics.invalid, 1);
        assert_eq!(report.invalid_bends().count(), 1);
    }

    #[test]
    fn gentle_turns_below_threshold_are_ignored() {
        let pts = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0), Point3::new(20.0, 0.5, 0.0)];
        let report = BendAnalyzer::new(5.0).analyze(&pts, &WireMaterial::niti());
        assert!(report.bends.is_empty());
        assert_eq!(report.statistics.min_radius, None);
    }

    #[test]
    fn right_turn_side() {
        let pts = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, -1.0, 0.0)];
        let report = BendAnalyzer::default().analyze(&pts, &WireMaterial::niti());
        assert_eq!(report.bends[0].side, TurnSide::Right);
    }

    #[test]
    fn validity_is_monotone_in_min_radius() {
        let pts: Vec<Point3> = (0..30)
            .map(|i| {
                let a = i as f64 * 0.2;
                Point3::new(3.0 * a.cos(), 3.0 * a.sin() + 0.1 * (i % 3) as f64, 0.0)
            })
            .collect();
        let analyzer = BendAnalyzer::new(1.0);
        let radii = [0.5, 1.0, 2.0, 3.0, 5.0, 8.0];
        let mut previous_invalid = 0;
        for r in radii {
            let report = analyzer.analyze(&pts, &WireMaterial::niti().with_min_bend_radius(r));
            assert!(report.statistics.invalid >= previous_invalid);
            previous_invalid = report.statistics.invalid;
        }
    }

    #[test]
    fn enforcement_opens_tight_corner() {
        let mut pts: Vec<Point3> = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 2.0, 0.0),
            Point3::new(4.0, 4.0, 0.0),
        ];
        let before = circumradius(pts[1], pts[2], pts[3]);
        let _ = enforce_min_bend_radius(&mut pts, 2.0, 5);

        assert_eq!(pts[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[4], Point3::new(4.0, 4.0, 0.0));
        assert!(circumradius(pts[1], pts[2], pts[3]) > before);
    }
}
