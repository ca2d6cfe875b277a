//! Archwire design: anchors in, a smooth bend-checked wire path out.
//!
//! [`WireDesigner`] drives the staged pipeline. The remaining modules are the
//! individual steps and can be used on their own.

mod anchor;
mod arch;
mod bends;
mod config;
mod control;
mod designer;
mod error;
mod generator;
mod material;
mod projector;
mod sampler;
mod smoothing;

pub use anchor::{AnchorPosition, ArchKind, ToothClass, anchor_centroid, sort_along_arch};
pub use arch::ideal_arch_curve;
pub use bends::{BendAnalyzer, BendInfo, BendReport, BendStatistics, TurnSide, circumradius, enforce_min_bend_radius};
pub use config::DesignConfig;
pub use control::{
    ControlPoint, ControlPointArena, ControlPointId, ControlRole, HeightController, INTERMEDIATE_WEIGHT,
};
pub use designer::{DesignStage, PathStatistics, WireDesign, WireDesigner};
pub use error::{DesignWarning, WireError};
pub use generator::{
    BSplineGenerator, BSplineOptions, CatmullRomGenerator, CubicOptions, CubicSplineGenerator, GeneratedPath,
    LinearGenerator, PathGenerator, PathStrategy, PhysicsGenerator, PhysicsOptions, StrategyOptions,
    build_generator, catmull_rom_point, detect_degeneracy,
};
pub use material::{WireMaterial, WireSize};
pub use projector::{ProjectionOutcome, ProjectorOptions, SharedProjector, SurfaceHit, SurfaceMesh, SurfaceProjector};
pub use sampler::{AdaptiveSampler, SamplePlan, mean_curvature, turning_angles};
pub use smoothing::{apply_tension, clean_path, gaussian_kernel, gaussian_smooth};

#[cfg(test)]
mod tests;
