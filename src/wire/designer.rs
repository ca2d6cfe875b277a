//! The design session: a staged pipeline from anchors to a validated path.
//!
//! ```text
//! Idle → AnchorsLoaded → ControlPointsBuilt → PathGenerated → Smoothed
//!      → BendsValidated → Finalized
//! ```
//!
//! Steps only move forward, except that edits on a finalized design
//! (control point drags, height and offset changes) re-enter at
//! `ControlPointsBuilt`. A failing step leaves the stage at the last step that
//! succeeded and keeps the previous [`WireDesign`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::anchor::{AnchorPosition, anchor_centroid, sort_along_arch};
use super::arch::ideal_arch_curve;
use super::bends::{BendAnalyzer, BendInfo, BendReport, BendStatistics, enforce_min_bend_radius};
use super::config::DesignConfig;
use super::control::{ControlPoint, ControlPointArena, ControlPointId, HeightController};
use super::error::{DesignWarning, WireError};
use super::generator::{GeneratedPath, LinearGenerator, PathGenerator, PathStrategy, build_generator, detect_degeneracy};
use super::material::{WireMaterial, WireSize};
use super::projector::{ProjectionOutcome, SharedProjector};
use super::sampler::{AdaptiveSampler, SamplePlan};
use super::smoothing::{apply_tension, clean_path, gaussian_smooth};
use crate::geom::{
    GeomMesh, GeomMeshDiagnostics, PipeError, PipeOptions, PipelineMetrics, PipelineTimingReport,
    Point3, TimingBucket, Tolerance, Vec3, polyline_length, wire_tube_mesh,
};

/// Modulus the physics bending stiffness is normalised to (NiTi, GPa).
const REFERENCE_MODULUS: f64 = 83.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignStage {
    #[default]
    Idle,
    AnchorsLoaded,
    ControlPointsBuilt,
    PathGenerated,
    Smoothed,
    BendsValidated,
    Finalized,
}

impl fmt::Display for DesignStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::AnchorsLoaded => "anchors_loaded",
            Self::ControlPointsBuilt => "control_points_built",
            Self::PathGenerated => "path_generated",
            Self::Smoothed => "smoothed",
            Self::BendsValidated => "bends_validated",
            Self::Finalized => "finalized",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStatistics {
    pub length: f64,
    pub point_count: usize,
    pub control_point_count: usize,
    pub bend_count: usize,
    pub valid_bends: usize,
    pub invalid_bends: usize,
    pub max_stress_factor: f64,
    pub max_stress_concentration: f64,
    pub min_bend_radius: Option<f64>,
    pub strategy: PathStrategy,
    pub material: String,
}

/// Finished design handed to mesh builders, reports and exporters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireDesign {
    pub points: Vec<Point3>,
    /// Tube radius per path point (mm).
    pub radii: Vec<f64>,
    pub material: WireMaterial,
    pub wire_size: WireSize,
    /// Strategy that produced the path; `linear` after a degenerate fallback.
    pub strategy: PathStrategy,
    pub bends: Vec<BendInfo>,
    pub bend_statistics: BendStatistics,
    pub statistics: PathStatistics,
    pub control_points: Vec<ControlPoint>,
    pub warnings: Vec<DesignWarning>,
    #[serde(skip)]
    pub timing: Option<PipelineTimingReport>,
}

impl WireDesign {
    /// Sweeps the wire cross-section along the path.
    pub fn tube_mesh(&self, options: PipeOptions) -> Result<(GeomMesh, GeomMeshDiagnostics), PipeError> {
        wire_tube_mesh(&self.points, &self.radii, options, Tolerance::default_geom())
    }

    #[must_use]
    pub fn arc_lengths(&self) -> Vec<f64> {
        crate::geom::cumulative_arc_lengths(&self.points)
    }
}

/// One design session for one arch.
#[derive(Debug)]
pub struct WireDesigner {
    config: DesignConfig,
    material: Arc<WireMaterial>,
    projector: Option<SharedProjector>,
    stage: DesignStage,

    base_anchors: Vec<AnchorPosition>,
    anchors: Vec<AnchorPosition>,
    arch_center: Point3,
    anchor_offset: Vec3,
    anchor_warnings: Vec<DesignWarning>,

    control_points: ControlPointArena,
    control_warnings: Vec<DesignWarning>,
    height: HeightController,

    path: Vec<Point3>,
    path_strategy: PathStrategy,
    path_warnings: Vec<DesignWarning>,
    bend_report: BendReport,

    design: Option<WireDesign>,
    metrics: PipelineMetrics,
}

impl Default for WireDesigner {
    fn default() -> Self {
        let config = DesignConfig::default();
        let height = HeightController::new(config.height_step);
        Self {
            path_strategy: config.strategy,
            config,
            material: Arc::new(WireMaterial::default()),
            projector: None,
            stage: DesignStage::Idle,
            base_anchors: Vec::new(),
            anchors: Vec::new(),
            arch_center: Point3::ORIGIN,
            anchor_offset: Vec3::ZERO,
            anchor_warnings: Vec::new(),
            control_points: ControlPointArena::new(),
            control_warnings: Vec::new(),
            height,
            path: Vec::new(),
            path_warnings: Vec::new(),
            bend_report: BendReport::default(),
            design: None,
            metrics: PipelineMetrics::default(),
        }
    }
}

impl WireDesigner {
    pub fn new(config: DesignConfig, material: Arc<WireMaterial>) -> Result<Self, WireError> {
        config.validate()?;
        material.validate().map_err(WireError::InvalidConfig)?;
        let height = HeightController::new(config.height_step);
        Ok(Self {
            path_strategy: config.strategy,
            config,
            material,
            height,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_projector(mut self, projector: SharedProjector) -> Self {
        self.projector = Some(projector);
        self
    }

    pub fn set_projector(&mut self, projector: Option<SharedProjector>) {
        self.projector = projector;
    }

    #[must_use]
    pub fn projector(&self) -> Option<&SharedProjector> {
        self.projector.as_ref()
    }

    /// Takes effect on the next recompute.
    pub fn set_config(&mut self, config: DesignConfig) -> Result<(), WireError> {
        config.validate()?;
        self.height.set_step(config.height_step);
        self.config = config;
        Ok(())
    }

    /// Takes effect on the next recompute.
    pub fn set_material(&mut self, material: Arc<WireMaterial>) -> Result<(), WireError> {
        material.validate().map_err(WireError::InvalidConfig)?;
        self.material = material;
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &DesignConfig {
        &self.config
    }

    #[must_use]
    pub fn material(&self) -> &Arc<WireMaterial> {
        &self.material
    }

    #[must_use]
    pub fn stage(&self) -> DesignStage {
        self.stage
    }

    /// Visible anchors in arch order, including offset adjustments.
    #[must_use]
    pub fn anchors(&self) -> &[AnchorPosition] {
        &self.anchors
    }

    #[must_use]
    pub fn arch_center(&self) -> Point3 {
        self.arch_center
    }

    #[must_use]
    pub fn control_points(&self) -> &[ControlPoint] {
        self.control_points.as_slice()
    }

    #[must_use]
    pub fn height(&self) -> &HeightController {
        &self.height
    }

    /// Last finalized design; survives failed recomputes.
    #[must_use]
    pub fn design(&self) -> Option<&WireDesign> {
        self.design.as_ref()
    }

    /// Working path of the current run (raw after generation, smoothed later).
    #[must_use]
    pub fn working_path(&self) -> &[Point3] {
        &self.path
    }

    fn require(&self, allowed: &[DesignStage]) -> Result<(), WireError> {
        if allowed.contains(&self.stage) {
            return Ok(());
        }
        Err(WireError::InvalidStage {
            expected: allowed.first().copied().unwrap_or_default(),
            actual: self.stage,
        })
    }

    fn enter(&mut self, stage: DesignStage) {
        log::debug!("wire designer: {} -> {stage}", self.stage);
        self.stage = stage;
    }

    /// Full pipeline from raw anchors. `arch_center` defaults to the anchor centroid.
    pub fn design_from(
        &mut self,
        anchors: &[AnchorPosition],
        arch_center: Option<Point3>,
    ) -> Result<&WireDesign, WireError> {
        self.load_anchors(anchors, arch_center)?;
        self.build_control_points()?;
        self.recompute()
    }

    /// Starts a new session. Hidden anchors are skipped; fewer than two visible
    /// anchors fail without touching the current state.
    pub fn load_anchors(&mut self, anchors: &[AnchorPosition], arch_center: Option<Point3>) -> Result<(), WireError> {
        let visible: Vec<AnchorPosition> = anchors.iter().copied().filter(|a| a.visible).collect();
        if visible.iter().any(|a| !a.is_finite()) {
            return Err(WireError::NonFiniteInput("anchors"));
        }
        if arch_center.is_some_and(|c| !c.is_finite()) {
            return Err(WireError::NonFiniteInput("arch center"));
        }
        if visible.len() < 2 {
            return Err(WireError::InsufficientAnchors { visible: visible.len() });
        }

        let center = arch_center
            .or_else(|| anchor_centroid(&visible))
            .unwrap_or(Point3::ORIGIN);
        let sorted = sort_along_arch(&visible, center);

        self.arch_center = center;
        self.anchors.clone_from(&sorted);
        self.base_anchors = sorted;
        self.anchor_offset = Vec3::ZERO;
        self.anchor_warnings.clear();
        self.control_points = ControlPointArena::new();
        self.path.clear();
        self.enter(DesignStage::AnchorsLoaded);
        Ok(())
    }

    /// Anchors plus inset intermediates, optionally projected onto the
    /// surface, then shifted by the height offset.
    pub fn build_control_points(&mut self) -> Result<(), WireError> {
        self.require(&[DesignStage::AnchorsLoaded, DesignStage::Finalized])?;
        let projector = self.surface_projector()?;
        let (arena, warnings) = control_points_for(
            &self.anchors,
            self.arch_center,
            self.config.intermediate_inset,
            projector.as_ref(),
            self.height.offset(),
            &mut self.metrics,
        );
        self.commit_control_points(arena, warnings);
        Ok(())
    }

    /// The projector when surface-constrained design is on.
    fn surface_projector(&self) -> Result<Option<SharedProjector>, WireError> {
        if self.config.surface_constrained {
            self.projector.clone().map(Some).ok_or(WireError::SurfaceMeshUnavailable)
        } else {
            Ok(None)
        }
    }

    fn commit_control_points(&mut self, arena: ControlPointArena, warnings: Vec<DesignWarning>) {
        for warning in &warnings {
            log::warn!("{warning}");
        }
        self.control_points = arena;
        self.control_warnings = warnings;
        self.enter(DesignStage::ControlPointsBuilt);
    }

    pub fn generate_path(&mut self) -> Result<(), WireError> {
        self.require(&[DesignStage::ControlPointsBuilt])?;
        let cps = self.control_points.as_slice();
        let positions = self.control_points.positions();
        let tol = Tolerance::LOOSE;

        let plan = self.metrics.time(TimingBucket::Sampling, || {
            if self.config.adaptive_sampling {
                let budget = AdaptiveSampler::adaptive_budget(self.config.resolution, &positions);
                self.config.sampler.plan(&positions, budget)
            } else {
                SamplePlan::by_length(&positions, self.config.resolution, self.config.sampler.min_per_segment)
            }
        });

        let mut warnings = Vec::new();
        let generated: Result<(GeneratedPath, PathStrategy), WireError> =
            self.metrics.time(TimingBucket::Generation, || {
                if let Some(reason) = detect_degeneracy(&positions, tol) {
                    warnings.push(DesignWarning::DegenerateGeometry { reason });
                    return LinearGenerator.generate_planned(cps, &plan).map(|p| (p, PathStrategy::Linear));
                }
                let modulus_scale = self.material.elastic_modulus / REFERENCE_MODULUS;
                let generator = build_generator(self.config.strategy, &self.config.strategy_options, modulus_scale);
                match generator.generate_planned(cps, &plan) {
                    Ok(path) => Ok((path, generator.strategy())),
                    Err(WireError::DegenerateGeometry(reason)) => {
                        warnings.push(DesignWarning::DegenerateGeometry { reason });
                        LinearGenerator.generate_planned(cps, &plan).map(|p| (p, PathStrategy::Linear))
                    }
                    Err(err) => Err(err),
                }
            });
        let (generated, strategy) = generated?;

        if generated.points.len() < 2 {
            return Err(WireError::InsufficientPathPoints {
                count: generated.points.len(),
            });
        }
        warnings.extend(generated.warnings);
        for warning in &warnings {
            log::warn!("{warning}");
        }
        log::debug!(
            "generated {} points with {strategy} over {} segments",
            generated.points.len(),
            plan.segments()
        );

        self.path = generated.points;
        self.path_strategy = strategy;
        self.path_warnings = warnings;
        self.enter(DesignStage::PathGenerated);
        Ok(())
    }

    /// Tension relaxation, Gaussian smoothing, then cleanup of short segments.
    pub fn smooth_path(&mut self) -> Result<(), WireError> {
        self.require(&[DesignStage::PathGenerated])?;
        let (tension, sigma, min_len) = (
            self.config.tension,
            self.config.smoothing_sigma,
            self.config.min_segment_length,
        );
        let smoothed = self.metrics.time(TimingBucket::Smoothing, || {
            let tensioned = apply_tension(&self.path, tension);
            clean_path(&gaussian_smooth(&tensioned, sigma), min_len)
        });
        if smoothed.len() < 2 {
            return Err(WireError::InsufficientPathPoints { count: smoothed.len() });
        }
        self.path = smoothed;
        self.enter(DesignStage::Smoothed);
        Ok(())
    }

    /// Optional radius enforcement followed by read-only bend analysis.
    pub fn validate_bends(&mut self) -> Result<(), WireError> {
        self.require(&[DesignStage::Smoothed])?;
        let min_radius = self.material.min_bend_radius();
        let enforce = self.config.enforce_min_bend_radius.then_some(self.config.enforcement_passes);
        let analyzer = BendAnalyzer::new(self.config.bend_threshold_degrees);
        let material = Arc::clone(&self.material);

        let mut path = std::mem::take(&mut self.path);
        let report = self.metrics.time(TimingBucket::BendAnalysis, || {
            if let Some(passes) = enforce {
                let remaining = enforce_min_bend_radius(&mut path, min_radius, passes);
                if remaining > 0 {
                    log::debug!("{remaining} points still below the minimum bend radius after enforcement");
                }
            }
            analyzer.analyze(&path, &material)
        });
        self.path = path;

        for bend in report.invalid_bends() {
            log::warn!(
                "bend at point {} has radius {:.3} mm (minimum {:.3} mm)",
                bend.index,
                bend.radius,
                min_radius
            );
        }
        self.bend_report = report;
        self.enter(DesignStage::BendsValidated);
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<&WireDesign, WireError> {
        self.require(&[DesignStage::BendsValidated])?;
        let material = self.material.as_ref().clone();
        let radius = self.config.wire_size.tube_radius();
        let stats = &self.bend_report.statistics;

        let mut warnings: Vec<DesignWarning> = self
            .anchor_warnings
            .iter()
            .chain(&self.control_warnings)
            .chain(&self.path_warnings)
            .cloned()
            .collect();
        warnings.extend(self.bend_report.invalid_bends().map(|bend| DesignWarning::ConstraintViolation {
            index: bend.index,
            radius: bend.radius,
            min_radius: material.min_bend_radius,
        }));

        let statistics = PathStatistics {
            length: polyline_length(&self.path),
            point_count: self.path.len(),
            control_point_count: self.control_points.len(),
            bend_count: stats.count,
            valid_bends: stats.valid,
            invalid_bends: stats.invalid,
            max_stress_factor: stats.max_stress_factor,
            max_stress_concentration: stats.max_stress_concentration,
            min_bend_radius: stats.min_radius,
            strategy: self.path_strategy,
            material: material.name.clone(),
        };

        log::info!(
            "wire design finalized: {} points, {:.2} mm, {} bends ({} invalid), strategy {}",
            statistics.point_count,
            statistics.length,
            statistics.bend_count,
            statistics.invalid_bends,
            statistics.strategy
        );

        let design = WireDesign {
            radii: vec![radius; self.path.len()],
            points: self.path.clone(),
            material,
            wire_size: self.config.wire_size,
            strategy: self.path_strategy,
            bends: self.bend_report.bends.clone(),
            bend_statistics: self.bend_report.statistics.clone(),
            statistics,
            control_points: self.control_points.as_slice().to_vec(),
            warnings,
            timing: self.metrics.end(),
        };
        self.enter(DesignStage::Finalized);
        Ok(&*self.design.insert(design))
    }

    /// Runs generation through finalization on the current control points.
    pub fn recompute(&mut self) -> Result<&WireDesign, WireError> {
        self.require(&[DesignStage::ControlPointsBuilt, DesignStage::Finalized])?;
        if self.stage == DesignStage::Finalized {
            self.enter(DesignStage::ControlPointsBuilt);
        }
        self.metrics.begin();
        self.generate_path()?;
        self.smooth_path()?;
        self.validate_bends()?;
        self.finalize()
    }

    /// Drags one control point and recomputes.
    ///
    /// With surface-constrained design the target is snapped onto the surface
    /// along the point's surface normal; a miss keeps the unsnapped target.
    pub fn move_control_point(&mut self, id: ControlPointId, target: Point3) -> Result<&WireDesign, WireError> {
        self.require(&[DesignStage::ControlPointsBuilt, DesignStage::Finalized])?;
        if !target.is_finite() {
            return Err(WireError::NonFiniteInput("control point target"));
        }
        let current = self
            .control_points
            .get(id)
            .cloned()
            .ok_or(WireError::UnknownControlPoint(id))?;
        if current.locked {
            return Err(WireError::ControlPointLocked(id));
        }

        let mut next = current;
        next.position = target;
        self.control_warnings.retain(|w| *w != DesignWarning::ProjectionMiss { control_point: id.0 });
        if self.config.surface_constrained {
            let projector = self.projector.clone().ok_or(WireError::SurfaceMeshUnavailable)?;
            let dir = projection_direction(&next, self.arch_center);
            let outcome = self.metrics.time(TimingBucket::Projection, || {
                let guard = projector.read();
                guard.project(target, dir, guard.options().search_radius)
            });
            match outcome {
                ProjectionOutcome::Hit(hit) => {
                    next.position = hit.point;
                    next.surface_normal = Some(hit.normal);
                    next.surface_constrained = true;
                }
                ProjectionOutcome::Miss => {
                    let warning = DesignWarning::ProjectionMiss { control_point: id.0 };
                    log::warn!("{warning}");
                    self.control_warnings.push(warning);
                }
            }
        }

        self.control_points.replace(next);
        if self.stage == DesignStage::Finalized {
            self.enter(DesignStage::ControlPointsBuilt);
        }
        self.recompute()
    }

    pub fn set_control_point_locked(&mut self, id: ControlPointId, locked: bool) -> Result<(), WireError> {
        let mut cp = self
            .control_points
            .get(id)
            .cloned()
            .ok_or(WireError::UnknownControlPoint(id))?;
        cp.locked = locked;
        self.control_points.replace(cp);
        Ok(())
    }

    /// Moves the wire `steps` height increments and recomputes.
    pub fn adjust_height(&mut self, steps: i32) -> Result<&WireDesign, WireError> {
        self.require(&[DesignStage::ControlPointsBuilt, DesignStage::Finalized])?;
        let delta = self.height.adjust(steps);
        self.apply_height_delta(delta)
    }

    pub fn set_height(&mut self, offset: f64) -> Result<&WireDesign, WireError> {
        self.require(&[DesignStage::ControlPointsBuilt, DesignStage::Finalized])?;
        if !offset.is_finite() {
            return Err(WireError::NonFiniteInput("height offset"));
        }
        let delta = self.height.set(offset);
        self.apply_height_delta(delta)
    }

    pub fn reset_height(&mut self) -> Result<&WireDesign, WireError> {
        self.require(&[DesignStage::ControlPointsBuilt, DesignStage::Finalized])?;
        let delta = self.height.reset();
        self.apply_height_delta(delta)
    }

    pub fn undo_height(&mut self) -> Result<&WireDesign, WireError> {
        self.require(&[DesignStage::ControlPointsBuilt, DesignStage::Finalized])?;
        let delta = self.height.undo().unwrap_or(0.0);
        self.apply_height_delta(delta)
    }

    fn apply_height_delta(&mut self, delta: f64) -> Result<&WireDesign, WireError> {
        if delta == 0.0 && self.stage == DesignStage::Finalized && self.design.is_some() {
            return self.design.as_ref().ok_or(WireError::InvalidStage {
                expected: DesignStage::Finalized,
                actual: self.stage,
            });
        }
        self.control_points.shift_z(delta);
        self.recompute()
    }

    /// Shifts every anchor by the accumulated `(0, dy, dz)` offset within its
    /// tangent plane, snaps it back onto the surface when a mesh is loaded,
    /// then rebuilds the control points and recomputes.
    ///
    /// Rebuilding discards individual control point edits. When the control
    /// points cannot be rebuilt, anchors, offset and stage stay as they were.
    pub fn adjust_anchor_offsets(&mut self, dy: f64, dz: f64) -> Result<&WireDesign, WireError> {
        self.require(&[
            DesignStage::AnchorsLoaded,
            DesignStage::ControlPointsBuilt,
            DesignStage::Finalized,
        ])?;
        if !dy.is_finite() || !dz.is_finite() {
            return Err(WireError::NonFiniteInput("anchor offset"));
        }
        let build_projector = self.surface_projector()?;

        let offset = self.anchor_offset + Vec3::new(0.0, dy, dz);
        let arch = self.config.arch;
        let projector = self.projector.clone();
        let mut warnings = Vec::new();

        let moved: Vec<AnchorPosition> = self.metrics.time(TimingBucket::Projection, || {
            let guard = projector.as_ref().map(SharedProjector::read);
            self.base_anchors
                .iter()
                .enumerate()
                .map(|(i, base)| {
                    let normal = base.normal.normalized().unwrap_or(Vec3::Y);
                    let target = base.position + offset.reject_from(normal);
                    let mut anchor = *base;
                    anchor.position = target;
                    if let Some(ref projector) = guard {
                        match projector.snap_along_normal(target, normal, arch) {
                            ProjectionOutcome::Hit(hit) => {
                                anchor.position = hit.point;
                                anchor.normal = hit.normal;
                            }
                            ProjectionOutcome::Miss => {
                                warnings.push(DesignWarning::ProjectionMiss { control_point: 2 * i });
                            }
                        }
                    }
                    anchor
                })
                .collect()
        });

        let (arena, control_warnings) = control_points_for(
            &moved,
            self.arch_center,
            self.config.intermediate_inset,
            build_projector.as_ref(),
            self.height.offset(),
            &mut self.metrics,
        );

        for warning in &warnings {
            log::warn!("{warning}");
        }
        self.anchor_offset = offset;
        self.anchors = moved;
        self.anchor_warnings = warnings;
        self.commit_control_points(arena, control_warnings);
        self.recompute()
    }

    /// Idealised arch form through the current anchors.
    pub fn ideal_arch(&self, num_points: usize) -> Result<Vec<Point3>, WireError> {
        if self.stage == DesignStage::Idle {
            return Err(WireError::InvalidStage {
                expected: DesignStage::AnchorsLoaded,
                actual: self.stage,
            });
        }
        ideal_arch_curve(&self.anchors, num_points)
    }
}

/// Builds the control point arena for `anchors`, projecting each point onto
/// the surface when a projector is given. Misses keep the unprojected point.
fn control_points_for(
    anchors: &[AnchorPosition],
    center: Point3,
    inset: f64,
    projector: Option<&SharedProjector>,
    height: f64,
    metrics: &mut PipelineMetrics,
) -> (ControlPointArena, Vec<DesignWarning>) {
    let mut arena = ControlPointArena::from_sorted_anchors(anchors, center, inset);
    let mut warnings = Vec::new();

    if let Some(projector) = projector {
        let snapped: Vec<ControlPoint> = metrics.time(TimingBucket::Projection, || {
            let guard = projector.read();
            let radius = guard.options().search_radius;
            arena
                .iter()
                .map(|cp| {
                    let dir = projection_direction(cp, center);
                    let mut next = cp.clone();
                    match guard.project(cp.position, dir, radius) {
                        ProjectionOutcome::Hit(hit) => {
                            next.position = hit.point;
                            next.original_position = hit.point;
                            next.surface_normal = Some(hit.normal);
                            next.surface_constrained = true;
                        }
                        ProjectionOutcome::Miss => {
                            warnings.push(DesignWarning::ProjectionMiss { control_point: cp.id.0 });
                        }
                    }
                    next
                })
                .collect()
        });
        for cp in snapped {
            arena.replace(cp);
        }
    }

    arena.shift_z(height);
    (arena, warnings)
}

/// Anchor normal for anchors, horizontal direction away from the arch center
/// for intermediates.
fn projection_direction(cp: &ControlPoint, center: Point3) -> Vec3 {
    if let Some(normal) = cp.surface_normal.and_then(Vec3::normalized) {
        return normal;
    }
    Vec3::new(cp.position.x - center.x, cp.position.y - center.y, 0.0)
        .normalized()
        .unwrap_or(Vec3::Z)
}
