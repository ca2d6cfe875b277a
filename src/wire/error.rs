//! Hard failures and non-fatal design warnings.

use std::fmt;

use serde::Serialize;

use super::control::ControlPointId;
use super::designer::DesignStage;

/// Failures that abort a single design step.
///
/// A failed step leaves the designer at its last completed stage and keeps the
/// previous design.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("at least 2 visible anchors are required, got {visible}")]
    InsufficientAnchors { visible: usize },
    #[error("surface mesh has no triangles")]
    EmptySurfaceMesh,
    #[error("surface mesh is invalid: {0}")]
    InvalidSurfaceMesh(String),
    #[error("surface constrained design requested but no surface mesh is loaded")]
    SurfaceMeshUnavailable,
    #[error("operation requires stage {expected}, designer is at {actual}")]
    InvalidStage {
        expected: DesignStage,
        actual: DesignStage,
    },
    #[error("unknown control point {0}")]
    UnknownControlPoint(ControlPointId),
    #[error("control point {0} is locked")]
    ControlPointLocked(ControlPointId),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0} contains non-finite coordinates")]
    NonFiniteInput(&'static str),
    #[error("path requires at least 2 points, got {count}")]
    InsufficientPathPoints { count: usize },
    /// Raised by generators; the designer recovers with straight segments.
    #[error("control points are degenerate: {0}")]
    DegenerateGeometry(String),
}

/// Recoverable conditions reported next to a finished design.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesignWarning {
    /// Control points were coincident or collinear; straight segments were used.
    DegenerateGeometry { reason: String },
    /// A surface query missed; the point kept its unprojected position.
    ProjectionMiss { control_point: usize },
    /// The physics solver stopped on its iteration budget.
    NonConvergence { iterations: usize, relative_change: f64 },
    /// A bend is tighter than the material allows.
    ConstraintViolation {
        index: usize,
        radius: f64,
        min_radius: f64,
    },
}

impl fmt::Display for DesignWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateGeometry { reason } => {
                write!(f, "degenerate geometry, using straight segments: {reason}")
            }
            Self::ProjectionMiss { control_point } => {
                write!(f, "no surface hit for control point {control_point}, kept original position")
            }
            Self::NonConvergence {
                iterations,
                relative_change,
            } => write!(
                f,
                "physics solver did not converge after {iterations} iterations (last change {relative_change:.2e})"
            ),
            Self::ConstraintViolation {
                index,
                radius,
                min_radius,
            } => write!(
                f,
                "bend at point {index} has radius {radius:.3} mm, below minimum {min_radius:.3} mm"
            ),
        }
    }
}
