//! Post-processing of raw generated paths: tension relaxation, Gaussian
//! smoothing and cleanup.

use crate::geom::Point3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pulls every interior point toward the midpoint of its neighbours.
///
/// `tension = 1` leaves the path unchanged, `tension = 0` moves each point
/// onto its neighbours' chord. Single Jacobi pass: all midpoints come from the
/// input path.
#[must_use]
pub fn apply_tension(points: &[Point3], tension: f64) -> Vec<Point3> {
    let tension = if tension.is_finite() { tension.clamp(0.0, 1.0) } else { 1.0 };
    if points.len() < 3 || tension == 1.0 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    out.extend(points.windows(3).map(|w| {
        let mid = w[0].midpoint(w[2]);
        mid + (w[1] - mid) * tension
    }));
    out.push(points[points.len() - 1]);
    out
}

/// Normalised Gaussian kernel with radius `floor(4σ + 0.5)`.
#[must_use]
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (4.0 * sigma + 0.5).floor() as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Convolves each coordinate with a Gaussian of `sigma` samples.
///
/// Near the ends the window shrinks symmetrically to what fits inside the
/// path, so the end points stay pinned and nothing bleeds past them.
#[must_use]
pub fn gaussian_smooth(points: &[Point3], sigma: f64) -> Vec<Point3> {
    let kernel = gaussian_kernel(sigma);
    if points.len() < 3 || kernel.len() == 1 {
        return points.to_vec();
    }
    convolve(points, &kernel)
}

fn smooth_at(points: &[Point3], kernel: &[f64], i: usize) -> Point3 {
    let radius = kernel.len() / 2;
    let reach = radius.min(i).min(points.len() - 1 - i);
    if reach == 0 {
        return points[i];
    }
    let (mut x, mut y, mut z, mut total) = (0.0, 0.0, 0.0, 0.0);
    for k in 0..=2 * reach {
        let w = kernel[radius - reach + k];
        let p = points[i - reach + k];
        x += w * p.x;
        y += w * p.y;
        z += w * p.z;
        total += w;
    }
    Point3::new(x / total, y / total, z / total)
}

#[cfg(feature = "parallel")]
fn convolve(points: &[Point3], kernel: &[f64]) -> Vec<Point3> {
    (0..points.len())
        .into_par_iter()
        .map(|i| smooth_at(points, kernel, i))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn convolve(points: &[Point3], kernel: &[f64]) -> Vec<Point3> {
    (0..points.len()).map(|i| smooth_at(points, kernel, i)).collect()
}

/// Drops non-finite points and points closer than `min_segment_length` to the
/// last kept point. The final point always survives, replacing the last kept
/// point when the two are too close.
#[must_use]
pub fn clean_path(points: &[Point3], min_segment_length: f64) -> Vec<Point3> {
    let finite: Vec<Point3> = points.iter().copied().filter(|p| p.is_finite()).collect();
    let Some((&last, body)) = finite.split_last() else {
        return Vec::new();
    };

    let min = min_segment_length.max(0.0);
    let mut out: Vec<Point3> = Vec::with_capacity(finite.len());
    for &p in body {
        if out.last().is_none_or(|prev| prev.distance_to(p) >= min) {
            out.push(p);
        }
    }
    if out.len() > 1 && out.last().is_some_and(|prev| prev.distance_to(last) < min) {
        out.pop();
    }
    if out.last() != Some(&last) {
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag(n: usize) -> Vec<Point3> {
        (0..n)
            .map(|i| Point3::new(i as f64, if i % 2 == 0 { 0.0 } else { 1.0 }, 0.0))
            .collect()
    }

    #[test]
    fn tension_one_is_identity_and_zero_straightens() {
        let path = zigzag(5);
        assert_eq!(apply_tension(&path, 1.0), path);

        let straight = apply_tension(&path, 0.0);
        assert_eq!(straight[0], path[0]);
        assert_eq!(straight[4], path[4]);
        // Interior points land on their neighbours' chord.
        assert!((straight[1].y - 0.0).abs() < 1e-12);
        assert!((straight[2].y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tension_is_partial() {
        let path = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
        let relaxed = apply_tension(&path, 0.25);
        assert!((relaxed[1].y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn kernel_is_normalised() {
        let kernel = gaussian_kernel(2.0);
        assert_eq!(kernel.len(), 17);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(kernel[8] > kernel[7]);
        assert_eq!(gaussian_kernel(0.0), vec![1.0]);
    }

    #[test]
    fn smoothing_pins_ends_and_reduces_noise() {
        let path = zigzag(40);
        let smooth = gaussian_smooth(&path, 2.0);

        assert_eq!(smooth.len(), path.len());
        assert_eq!(smooth[0], path[0]);
        assert_eq!(smooth[39], path[39]);
        for p in &smooth[8..32] {
            assert!((p.y - 0.5).abs() < 0.05, "{p:?}");
        }
    }

    #[test]
    fn smoothing_keeps_straight_lines() {
        let line: Vec<Point3> = (0..20).map(|i| Point3::new(i as f64 * 0.5, 2.0, -1.0)).collect();
        let smooth = gaussian_smooth(&line, 3.0);
        for (a, b) in line.iter().zip(&smooth) {
            assert!(a.distance_to(*b) < 1e-9);
        }
    }

    #[test]
    fn clean_path_drops_short_segments_and_keeps_last() {
        let path = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.01, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(f64::NAN, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.02, 0.0, 0.0),
        ];
        let cleaned = clean_path(&path, 0.05);
        assert_eq!(
            cleaned,
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(2.02, 0.0, 0.0)]
        );
        assert!(clean_path(&[], 0.05).is_empty());
    }
}
