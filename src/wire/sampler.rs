//! Per-segment sample allocation.
//!
//! A [`SamplePlan`] tells a generator how many samples to take on each segment
//! between consecutive control points. Segment `i` contributes
//! `per_segment[i]` samples starting at its first control point; the final
//! control point is appended once at the end.

use serde::{Deserialize, Serialize};

use crate::geom::Point3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Upper bound on the curvature-driven budget multiplier.
const MAX_BUDGET_BOOST: f64 = 2.0;
/// Scale from mean curvature (rad/mm) to budget multiplier.
const BUDGET_CURVATURE_GAIN: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePlan {
    pub per_segment: Vec<usize>,
}

impl SamplePlan {
    /// Distributes `budget` points over the segments of `points` by chord length.
    #[must_use]
    pub fn by_length(points: &[Point3], budget: usize, min_per_segment: usize) -> Self {
        let weights: Vec<f64> = points.windows(2).map(|w| w[0].distance_to(w[1])).collect();
        Self::allocate(&weights, budget, min_per_segment)
    }

    /// Equal share per segment.
    #[must_use]
    pub fn uniform(segments: usize, budget: usize) -> Self {
        Self::allocate(&vec![1.0; segments], budget, 1)
    }

    /// Largest-remainder allocation of `budget - 1` samples proportional to
    /// `weights`, never giving a segment fewer than `min_per_segment`.
    #[must_use]
    pub fn allocate(weights: &[f64], budget: usize, min_per_segment: usize) -> Self {
        let segments = weights.len();
        if segments == 0 {
            return Self { per_segment: Vec::new() };
        }

        let floor = min_per_segment.max(1);
        let total = budget.saturating_sub(1).max(floor * segments);
        let spare = total - floor * segments;

        let clean: Vec<f64> = weights
            .iter()
            .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
            .collect();
        let sum: f64 = clean.iter().sum();
        let shares: Vec<f64> = if sum > 0.0 {
            clean.iter().map(|w| w / sum * spare as f64).collect()
        } else {
            vec![spare as f64 / segments as f64; segments]
        };

        let mut per_segment: Vec<usize> = shares.iter().map(|s| floor + s.floor() as usize).collect();
        let assigned: usize = per_segment.iter().sum();
        let mut leftover = total.saturating_sub(assigned);

        let mut order: Vec<usize> = (0..segments).collect();
        order.sort_by(|&a, &b| {
            let ra = shares[a] - shares[a].floor();
            let rb = shares[b] - shares[b].floor();
            rb.total_cmp(&ra).then(a.cmp(&b))
        });
        for idx in order.into_iter().cycle() {
            if leftover == 0 {
                break;
            }
            per_segment[idx] += 1;
            leftover -= 1;
        }

        Self { per_segment }
    }

    #[must_use]
    pub fn segments(&self) -> usize {
        self.per_segment.len()
    }

    /// Number of points a generator emits for this plan.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.per_segment.iter().sum::<usize>() + 1
    }

    /// Index of the first sample of each segment in the output.
    #[must_use]
    pub fn offsets(&self) -> Vec<usize> {
        self.per_segment
            .iter()
            .scan(0usize, |acc, n| {
                let start = *acc;
                *acc += n;
                Some(start)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveSampler {
    pub min_per_segment: usize,
    /// How strongly turning angle (radians) inflates a segment's share.
    pub curvature_gain: f64,
}

impl Default for AdaptiveSampler {
    fn default() -> Self {
        Self {
            min_per_segment: 2,
            curvature_gain: 1.0,
        }
    }
}

impl AdaptiveSampler {
    /// Plan that favours segments whose endpoints turn sharply.
    #[must_use]
    pub fn plan(&self, points: &[Point3], budget: usize) -> SamplePlan {
        if points.len() < 2 {
            return SamplePlan { per_segment: Vec::new() };
        }
        let angles = turning_angles(points);
        let weights: Vec<f64> = points
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let bend = 0.5 * (angles[i] + angles[i + 1]);
                w[0].distance_to(w[1]) * (1.0 + self.curvature_gain * bend)
            })
            .collect();
        SamplePlan::allocate(&weights, budget, self.min_per_segment)
    }

    /// Total budget scaled up for curvy control polygons.
    #[must_use]
    pub fn adaptive_budget(resolution: usize, points: &[Point3]) -> usize {
        let boost = (BUDGET_CURVATURE_GAIN * mean_curvature(points)).min(MAX_BUDGET_BOOST);
        (resolution as f64 * (1.0 + boost)).round() as usize
    }
}

/// Angle in radians between incoming and outgoing chords; zero at the ends.
#[must_use]
pub fn turning_angles(points: &[Point3]) -> Vec<f64> {
    let n = points.len();
    if n < 3 {
        return vec![0.0; n];
    }
    let mut angles = vec![0.0; n];
    angles[1..n - 1].copy_from_slice(&interior_angles(points));
    angles
}

#[cfg(feature = "parallel")]
fn interior_angles(points: &[Point3]) -> Vec<f64> {
    points.par_windows(3).map(|w| turning_angle(w[0], w[1], w[2])).collect()
}

#[cfg(not(feature = "parallel"))]
fn interior_angles(points: &[Point3]) -> Vec<f64> {
    points.windows(3).map(|w| turning_angle(w[0], w[1], w[2])).collect()
}

pub(crate) fn turning_angle(prev: Point3, current: Point3, next: Point3) -> f64 {
    let incoming = current.sub_point(prev).normalized();
    let outgoing = next.sub_point(current).normalized();
    match (incoming, outgoing) {
        (Some(a), Some(b)) => a.dot(b).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}

/// Mean of turning angle over mean adjacent chord length at interior points.
#[must_use]
pub fn mean_curvature(points: &[Point3]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let values: Vec<f64> = points
        .windows(3)
        .filter_map(|w| {
            let chord = 0.5 * (w[0].distance_to(w[1]) + w[1].distance_to(w[2]));
            (chord > f64::EPSILON).then(|| turning_angle(w[0], w[1], w[2]) / chord)
        })
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
