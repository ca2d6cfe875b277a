//! Path generation strategies.
//!
//! Every strategy turns an ordered run of control points into a dense path
//! following a [`SamplePlan`]. Strategies are stateless apart from their
//! options, so the same generator can be reused across recomputes.

mod bspline;
mod catmull_rom;
mod cubic;
mod physics;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use bspline::{BSplineGenerator, BSplineOptions};
pub use catmull_rom::{CatmullRomGenerator, catmull_rom_point};
pub use cubic::{CubicOptions, CubicSplineGenerator};
pub use physics::{PhysicsGenerator, PhysicsOptions};

use super::control::ControlPoint;
use super::error::{DesignWarning, WireError};
use super::sampler::SamplePlan;
use crate::geom::{Point3, Tolerance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStrategy {
    CubicSpline,
    #[default]
    CatmullRom,
    BSpline,
    PhysicsBased,
    /// Straight segments; used as the degenerate-geometry fallback.
    Linear,
}

impl PathStrategy {
    pub const ALL: [Self; 5] = [
        Self::CubicSpline,
        Self::CatmullRom,
        Self::BSpline,
        Self::PhysicsBased,
        Self::Linear,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CubicSpline => "cubic_spline",
            Self::CatmullRom => "catmull_rom",
            Self::BSpline => "b_spline",
            Self::PhysicsBased => "physics_based",
            Self::Linear => "linear",
        }
    }

    /// Accepts the snake_case name or a few common spellings.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "cubicspline" | "cubic" => Some(Self::CubicSpline),
            "catmullrom" => Some(Self::CatmullRom),
            "bspline" => Some(Self::BSpline),
            "physicsbased" | "physics" => Some(Self::PhysicsBased),
            "linear" => Some(Self::Linear),
            _ => None,
        }
    }
}

impl fmt::Display for PathStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for every strategy; only the selected one is read.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOptions {
    pub cubic: CubicOptions,
    pub b_spline: BSplineOptions,
    pub physics: PhysicsOptions,
}

/// Output of one generator run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratedPath {
    pub points: Vec<Point3>,
    pub warnings: Vec<DesignWarning>,
}

impl GeneratedPath {
    #[must_use]
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            points,
            warnings: Vec::new(),
        }
    }
}

pub trait PathGenerator: Send + Sync {
    fn strategy(&self) -> PathStrategy;

    /// Samples the path following `plan`, which must have one entry per
    /// segment between consecutive control points.
    fn generate_planned(
        &self,
        control_points: &[ControlPoint],
        plan: &SamplePlan,
    ) -> Result<GeneratedPath, WireError>;

    /// Samples roughly `resolution` points spread by chord length.
    fn generate(
        &self,
        control_points: &[ControlPoint],
        resolution: usize,
    ) -> Result<GeneratedPath, WireError> {
        let positions: Vec<Point3> = control_points.iter().map(|cp| cp.position).collect();
        let plan = SamplePlan::by_length(&positions, resolution, 1);
        self.generate_planned(control_points, &plan)
    }
}

/// Builds the generator for `strategy`.
///
/// `modulus_scale` is the material's elastic modulus relative to NiTi and only
/// affects the physics strategy's bending stiffness.
#[must_use]
pub fn build_generator(
    strategy: PathStrategy,
    options: &StrategyOptions,
    modulus_scale: f64,
) -> Box<dyn PathGenerator> {
    match strategy {
        PathStrategy::CubicSpline => Box::new(CubicSplineGenerator::new(options.cubic)),
        PathStrategy::CatmullRom => Box::new(CatmullRomGenerator),
        PathStrategy::BSpline => Box::new(BSplineGenerator::new(options.b_spline)),
        PathStrategy::PhysicsBased => Box::new(PhysicsGenerator::new(options.physics, modulus_scale)),
        PathStrategy::Linear => Box::new(LinearGenerator),
    }
}

/// Straight segments between control points.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearGenerator;

impl PathGenerator for LinearGenerator {
    fn strategy(&self) -> PathStrategy {
        PathStrategy::Linear
    }

    fn generate_planned(
        &self,
        control_points: &[ControlPoint],
        plan: &SamplePlan,
    ) -> Result<GeneratedPath, WireError> {
        check_inputs(control_points, plan)?;
        let mut points = Vec::with_capacity(plan.total_points());
        for (pair, &count) in control_points.windows(2).zip(&plan.per_segment) {
            for j in 0..count {
                let t = j as f64 / count as f64;
                points.push(pair[0].position.lerp(pair[1].position, t));
            }
        }
        push_last(&mut points, control_points);
        Ok(GeneratedPath::new(points))
    }
}

/// Reason the control polygon cannot support curvature estimation, if any.
#[must_use]
pub fn detect_degeneracy(positions: &[Point3], tol: Tolerance) -> Option<String> {
    if let Some(i) = positions
        .windows(2)
        .position(|w| w[0].distance_to(w[1]) <= tol.eps)
    {
        return Some(format!("control points {i} and {} coincide", i + 1));
    }

    let first = *positions.first()?;
    let far = positions
        .iter()
        .copied()
        .max_by(|a, b| first.distance_squared_to(*a).total_cmp(&first.distance_squared_to(*b)))?;
    let axis = far.sub_point(first).normalized()?;
    let collinear = positions.iter().all(|p| {
        let offset = p.sub_point(first);
        offset.reject_from(axis).length() <= tol.eps
    });
    (positions.len() > 2 && collinear).then(|| "control points are collinear".to_string())
}

pub(crate) fn check_inputs(control_points: &[ControlPoint], plan: &SamplePlan) -> Result<(), WireError> {
    if control_points.len() < 2 {
        return Err(WireError::InsufficientPathPoints {
            count: control_points.len(),
        });
    }
    if plan.segments() != control_points.len() - 1 {
        return Err(WireError::InvalidConfig(format!(
            "sample plan has {} segments for {} control points",
            plan.segments(),
            control_points.len()
        )));
    }
    if control_points.iter().any(|cp| !cp.position.is_finite()) {
        return Err(WireError::NonFiniteInput("control points"));
    }
    Ok(())
}

pub(crate) fn push_last(points: &mut Vec<Point3>, control_points: &[ControlPoint]) {
    if let Some(last) = control_points.last() {
        points.push(last.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::control::ControlPointId;

    fn control_points(positions: &[(f64, f64, f64)]) -> Vec<ControlPoint> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| ControlPoint::interpolated(ControlPointId(i), Point3::new(x, y, z)))
            .collect()
    }

    #[test]
    fn linear_generator_follows_plan() {
        let cps = control_points(&[(0.0, 0.0, 0.0), (4.0, 0.0, 0.0), (4.0, 2.0, 0.0)]);
        let plan = SamplePlan { per_segment: vec![4, 2] };
        let path = LinearGenerator.generate_planned(&cps, &plan).expect("path");

        assert_eq!(path.points.len(), 7);
        assert_eq!(path.points[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(path.points[4], Point3::new(4.0, 0.0, 0.0));
        assert_eq!(path.points[6], Point3::new(4.0, 2.0, 0.0));
    }

    #[test]
    fn generators_reject_mismatched_plan() {
        let cps = control_points(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]);
        let plan = SamplePlan { per_segment: vec![2, 2] };
        assert!(matches!(
            LinearGenerator.generate_planned(&cps, &plan),
            Err(WireError::InvalidConfig(_))
        ));
        assert!(matches!(
            LinearGenerator.generate(&cps[..1], 10),
            Err(WireError::InsufficientPathPoints { count: 1 })
        ));
    }

    #[test]
    fn degeneracy_detection() {
        let tol = Tolerance::LOOSE;
        let coincident = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(detect_degeneracy(&coincident, tol).is_some_and(|r| r.contains("coincide")));

        let collinear = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0), Point3::new(3.0, 3.0, 0.0)];
        assert!(detect_degeneracy(&collinear, tol).is_some_and(|r| r.contains("collinear")));

        let arch = [Point3::new(10.0, 0.0, 5.0), Point3::new(5.0, 8.0, 5.0), Point3::new(-5.0, 8.0, 5.0)];
        assert!(detect_degeneracy(&arch, tol).is_none());
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in PathStrategy::ALL {
            assert_eq!(PathStrategy::from_name(strategy.name()), Some(strategy));
        }
        assert_eq!(PathStrategy::from_name("Catmull-Rom"), Some(PathStrategy::CatmullRom));
        assert_eq!(PathStrategy::from_name("spiral"), None);
    }
}
