//! Mass-spring wire relaxed by energy minimisation.
//!
//! Nodes start on the Catmull-Rom path through the control points. With
//! rest lengths `L` taken from that start, mean rest length `ℓ`, and control
//! point sample indices `o_j` the energy is
//!
//! ```text
//! E = ks/2 · Σ (|x_{i+1} − x_i| − L_i)²
//!   + kb/(2ℓ³) · Σ |x_{i−1} − 2x_i + x_{i+1}|²
//!   + ka/2 · Σ w_j |x_{o_j} − c_j|²
//! ```
//!
//! with both end nodes fixed. `kb` is scaled by the material modulus relative
//! to NiTi. The minimiser is Polak-Ribière nonlinear conjugate gradient with
//! Armijo backtracking; it stops once the relative energy change drops below
//! `tolerance`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::catmull_rom::CatmullRomGenerator;
use super::{GeneratedPath, PathGenerator, PathStrategy, check_inputs};
use crate::geom::{Point3, Vec3};
use crate::wire::control::ControlPoint;
use crate::wire::error::{DesignWarning, WireError};
use crate::wire::sampler::SamplePlan;

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;
/// Gradient norm treated as stationary.
const GRADIENT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsOptions {
    pub spring_stiffness: f64,
    pub bending_stiffness: f64,
    /// Pull of intermediate control points on their sample.
    pub anchor_stiffness: f64,
    pub max_iterations: usize,
    /// Relative energy change that counts as converged.
    pub tolerance: f64,
    /// Amplitude in mm of the seeded perturbation applied to the start; 0 disables it.
    pub jitter: f64,
    pub seed: u64,
}

impl Default for PhysicsOptions {
    fn default() -> Self {
        Self {
            spring_stiffness: 1.0,
            bending_stiffness: 1.0,
            anchor_stiffness: 10.0,
            max_iterations: 500,
            tolerance: 1e-8,
            jitter: 0.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PhysicsGenerator {
    options: PhysicsOptions,
    modulus_scale: f64,
}

impl PhysicsGenerator {
    #[must_use]
    pub fn new(options: PhysicsOptions, modulus_scale: f64) -> Self {
        let modulus_scale = if modulus_scale.is_finite() && modulus_scale > 0.0 {
            modulus_scale
        } else {
            1.0
        };
        Self {
            options,
            modulus_scale,
        }
    }
}

impl PathGenerator for PhysicsGenerator {
    fn strategy(&self) -> PathStrategy {
        PathStrategy::PhysicsBased
    }

    fn generate_planned(
        &self,
        control_points: &[ControlPoint],
        plan: &SamplePlan,
    ) -> Result<GeneratedPath, WireError> {
        check_inputs(control_points, plan)?;
        let start = CatmullRomGenerator.generate_planned(control_points, plan)?;
        if start.points.len() < 3 {
            return Ok(start);
        }

        let targets: Vec<(usize, Vec3, f64)> = plan
            .offsets()
            .into_iter()
            .zip(control_points)
            .skip(1)
            .map(|(offset, cp)| (offset, cp.position.to_vec3(), cp.weight.max(0.0)))
            .collect();

        let mut nodes: Vec<Vec3> = start.points.iter().map(|p| p.to_vec3()).collect();
        let model = SpringModel::new(&nodes, targets, &self.options, self.modulus_scale);

        if self.options.jitter > 0.0 {
            let mut rng = StdRng::seed_from_u64(self.options.seed);
            let amp = self.options.jitter;
            let last = nodes.len() - 1;
            for node in &mut nodes[1..last] {
                *node = *node
                    + Vec3::new(
                        rng.random_range(-amp..=amp),
                        rng.random_range(-amp..=amp),
                        rng.random_range(-amp..=amp),
                    );
            }
        }

        let outcome = minimize(&model, &mut nodes, &self.options);
        log::debug!(
            "physics solver: {} iterations, energy {:.6e}, converged {}",
            outcome.iterations,
            outcome.energy,
            outcome.converged
        );

        let mut path = GeneratedPath::new(nodes.into_iter().map(|v| Point3::new(v.x, v.y, v.z)).collect());
        if !outcome.converged {
            path.warnings.push(DesignWarning::NonConvergence {
                iterations: outcome.iterations,
                relative_change: outcome.relative_change,
            });
        }
        Ok(path)
    }
}

struct SpringModel {
    rest: Vec<f64>,
    bend: f64,
    spring: f64,
    anchor: f64,
    targets: Vec<(usize, Vec3, f64)>,
}

impl SpringModel {
    fn new(nodes: &[Vec3], targets: Vec<(usize, Vec3, f64)>, options: &PhysicsOptions, modulus_scale: f64) -> Self {
        let rest: Vec<f64> = nodes.windows(2).map(|w| (w[1] - w[0]).length()).collect();
        let mean = (rest.iter().sum::<f64>() / rest.len() as f64).max(1e-6);
        let last = nodes.len() - 1;
        Self {
            rest,
            bend: options.bending_stiffness * modulus_scale / mean.powi(3),
            spring: options.spring_stiffness,
            anchor: options.anchor_stiffness,
            targets: targets.into_iter().filter(|(i, _, _)| *i > 0 && *i < last).collect(),
        }
    }

    /// Rough Lipschitz bound of the gradient, used for the first step length.
    fn stiffness_bound(&self) -> f64 {
        let max_weight = self.targets.iter().map(|t| t.2).fold(0.0, f64::max);
        (4.0 * self.spring + 16.0 * self.bend + self.anchor * max_weight).max(1e-9)
    }

    fn energy(&self, x: &[Vec3]) -> f64 {
        let stretch: f64 = x
            .windows(2)
            .zip(&self.rest)
            .map(|(w, rest)| {
                let diff = (w[1] - w[0]).length() - rest;
                diff * diff
            })
            .sum();
        let bend: f64 = x
            .windows(3)
            .map(|w| (w[0] - w[1] * 2.0 + w[2]).length_squared())
            .sum();
        let anchor: f64 = self
            .targets
            .iter()
            .map(|(i, c, w)| w * (x[*i] - *c).length_squared())
            .sum();
        0.5 * (self.spring * stretch + self.bend * bend + self.anchor * anchor)
    }

    /// Gradient with the two end nodes held fixed.
    fn gradient(&self, x: &[Vec3], grad: &mut [Vec3]) {
        grad.fill(Vec3::ZERO);
        for (i, rest) in self.rest.iter().enumerate() {
            let d = x[i + 1] - x[i];
            let len = d.length();
            if len > f64::EPSILON {
                let g = d * (self.spring * (len - rest) / len);
                grad[i + 1] = grad[i + 1] + g;
                grad[i] = grad[i] - g;
            }
        }
        for i in 1..x.len() - 1 {
            let b = (x[i - 1] - x[i] * 2.0 + x[i + 1]) * self.bend;
            grad[i - 1] = grad[i - 1] + b;
            grad[i] = grad[i] - b * 2.0;
            grad[i + 1] = grad[i + 1] + b;
        }
        for (i, c, w) in &self.targets {
            grad[*i] = grad[*i] + (x[*i] - *c) * (self.anchor * w);
        }
        let last = grad.len() - 1;
        grad[0] = Vec3::ZERO;
        grad[last] = Vec3::ZERO;
    }
}

struct MinimizeOutcome {
    iterations: usize,
    energy: f64,
    relative_change: f64,
    converged: bool,
}

fn dot(a: &[Vec3], b: &[Vec3]) -> f64 {
    a.iter().zip(b).map(|(u, v)| u.dot(*v)).sum()
}

fn minimize(model: &SpringModel, x: &mut [Vec3], options: &PhysicsOptions) -> MinimizeOutcome {
    let n = x.len();
    let mut grad = vec![Vec3::ZERO; n];
    let mut next_grad = vec![Vec3::ZERO; n];
    let mut trial = vec![Vec3::ZERO; n];

    model.gradient(x, &mut grad);
    let mut direction: Vec<Vec3> = grad.iter().map(|g| -*g).collect();
    let mut energy = model.energy(x);
    let mut step = 1.0 / model.stiffness_bound();
    let mut relative_change = f64::INFINITY;

    for iteration in 0..options.max_iterations {
        let grad_sq = dot(&grad, &grad);
        if grad_sq.sqrt() <= GRADIENT_EPS {
            return MinimizeOutcome {
                iterations: iteration,
                energy,
                relative_change: 0.0,
                converged: true,
            };
        }

        let mut slope = dot(&grad, &direction);
        if slope >= 0.0 {
            for (d, g) in direction.iter_mut().zip(&grad) {
                *d = -*g;
            }
            slope = -grad_sq;
        }

        let mut alpha = step * 2.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            for ((t, xi), d) in trial.iter_mut().zip(x.iter()).zip(&direction) {
                *t = *xi + *d * alpha;
            }
            let candidate = model.energy(&trial);
            if candidate <= energy + ARMIJO_C1 * alpha * slope {
                accepted = Some(candidate);
                break;
            }
            alpha *= 0.5;
        }

        let Some(new_energy) = accepted else {
            // No descent along any tried step: treat as stationary.
            return MinimizeOutcome {
                iterations: iteration,
                energy,
                relative_change: 0.0,
                converged: true,
            };
        };

        x.copy_from_slice(&trial);
        step = alpha;
        relative_change = (energy - new_energy).abs() / energy.abs().max(1.0);
        energy = new_energy;
        if relative_change <= options.tolerance {
            return MinimizeOutcome {
                iterations: iteration + 1,
                energy,
                relative_change,
                converged: true,
            };
        }

        model.gradient(x, &mut next_grad);
        let diff_dot: f64 = next_grad.iter().zip(&grad).map(|(gn, g)| gn.dot(*gn - *g)).sum();
        let beta = (diff_dot / grad_sq).max(0.0);
        for (d, g) in direction.iter_mut().zip(&next_grad) {
            *d = -*g + *d * beta;
        }
        std::mem::swap(&mut grad, &mut next_grad);
    }

    MinimizeOutcome {
        iterations: options.max_iterations,
        energy,
        relative_change,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::control::ControlPointId;

    fn arch() -> Vec<ControlPoint> {
        [(10.0, 0.0), (7.5, 4.0), (5.0, 8.0), (0.0, 7.0), (-5.0, 8.0), (-7.5, 4.0), (-10.0, 0.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| {
                let mut cp = ControlPoint::interpolated(ControlPointId(i), Point3::new(x, y, 5.0));
                cp.weight = if i % 2 == 0 { 1.0 } else { 0.5 };
                cp
            })
            .collect()
    }

    fn plan(cps: &[ControlPoint]) -> SamplePlan {
        SamplePlan {
            per_segment: vec![8; cps.len() - 1],
        }
    }

    fn bending_energy(points: &[Point3]) -> f64 {
        points
            .windows(3)
            .map(|w| (w[0].to_vec3() - w[1].to_vec3() * 2.0 + w[2].to_vec3()).length_squared())
            .sum()
    }

    #[test]
    fn relaxation_keeps_ends_and_reduces_bending() {
        let cps = arch();
        let plan = plan(&cps);
        let start = CatmullRomGenerator.generate_planned(&cps, &plan).expect("start");
        let relaxed = PhysicsGenerator::new(PhysicsOptions::default(), 1.0)
            .generate_planned(&cps, &plan)
            .expect("relaxed");

        assert_eq!(relaxed.points.len(), start.points.len());
        assert_eq!(relaxed.points[0], cps[0].position);
        assert_eq!(relaxed.points.last().copied(), cps.last().map(|cp| cp.position));
        assert!(bending_energy(&relaxed.points) <= bending_energy(&start.points) + 1e-12);
        assert!(relaxed.points.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn same_seed_gives_same_path() {
        let cps = arch();
        let plan = plan(&cps);
        let options = PhysicsOptions {
            jitter: 0.2,
            seed: 7,
            ..PhysicsOptions::default()
        };
        let a = PhysicsGenerator::new(options, 1.0).generate_planned(&cps, &plan).expect("a");
        let b = PhysicsGenerator::new(options, 1.0).generate_planned(&cps, &plan).expect("b");
        assert_eq!(a.points, b.points);
    }

    #[test]
    fn tiny_iteration_budget_reports_non_convergence() {
        let cps = arch();
        let plan = plan(&cps);
        let options = PhysicsOptions {
            max_iterations: 1,
            tolerance: 0.0,
            ..PhysicsOptions::default()
        };
        let path = PhysicsGenerator::new(options, 1.0).generate_planned(&cps, &plan).expect("path");

        assert_eq!(path.points.len(), plan.total_points());
        assert!(matches!(
            path.warnings.as_slice(),
            [DesignWarning::NonConvergence { iterations: 1, .. }]
        ));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let cps = arch();
        let plan = plan(&cps);
        let start = CatmullRomGenerator.generate_planned(&cps, &plan).expect("start");
        let mut x: Vec<Vec3> = start.points.iter().map(|p| p.to_vec3()).collect();
        let targets = plan
            .offsets()
            .into_iter()
            .zip(&cps)
            .map(|(o, cp)| (o, cp.position.to_vec3() + Vec3::new(0.3, -0.2, 0.1), cp.weight))
            .collect();
        let model = SpringModel::new(&x, targets, &PhysicsOptions::default(), 1.0);
        x[5] = x[5] + Vec3::new(0.05, 0.02, -0.03);

        let mut grad = vec![Vec3::ZERO; x.len()];
        model.gradient(&x, &mut grad);

        let h = 1e-6;
        let mut plus = x.clone();
        plus[5].y += h;
        let mut minus = x.clone();
        minus[5].y -= h;
        let numeric = (model.energy(&plus) - model.energy(&minus)) / (2.0 * h);
        assert!((numeric - grad[5].y).abs() < 1e-5 * numeric.abs().max(1.0));
    }
}
