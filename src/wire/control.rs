//! Control points, their arena, and the global height controller.

use std::fmt;

use serde::Serialize;

use super::anchor::AnchorPosition;
use crate::geom::{Point3, Vec3};

/// Weight of control points inserted between anchors.
pub const INTERMEDIATE_WEIGHT: f64 = 0.5;

/// Stable identifier of a control point within one arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd, Serialize)]
pub struct ControlPointId(pub usize);

impl ControlPointId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl From<usize> for ControlPointId {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ControlPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ControlRole {
    Anchor { anchor_index: usize },
    Interpolated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlPoint {
    pub id: ControlPointId,
    pub position: Point3,
    /// Position before height offsets and user edits.
    pub original_position: Point3,
    pub weight: f64,
    #[serde(flatten)]
    pub role: ControlRole,
    pub surface_constrained: bool,
    pub locked: bool,
    pub surface_normal: Option<Vec3>,
}

impl ControlPoint {
    #[must_use]
    pub fn anchor(id: ControlPointId, anchor_index: usize, anchor: &AnchorPosition) -> Self {
        Self {
            id,
            position: anchor.position,
            original_position: anchor.position,
            weight: 1.0,
            role: ControlRole::Anchor { anchor_index },
            surface_constrained: false,
            locked: false,
            surface_normal: Some(anchor.normal),
        }
    }

    #[must_use]
    pub fn interpolated(id: ControlPointId, position: Point3) -> Self {
        Self {
            id,
            position,
            original_position: position,
            weight: INTERMEDIATE_WEIGHT,
            role: ControlRole::Interpolated,
            surface_constrained: false,
            locked: false,
            surface_normal: None,
        }
    }

    #[must_use]
    pub fn is_anchor(&self) -> bool {
        matches!(self.role, ControlRole::Anchor { .. })
    }

    #[must_use]
    pub fn anchor_index(&self) -> Option<usize> {
        match self.role {
            ControlRole::Anchor { anchor_index } => Some(anchor_index),
            ControlRole::Interpolated => None,
        }
    }
}

/// Control points in traversal order, addressed by stable ids.
///
/// Edits replace the stored value instead of handing out mutable references,
/// so a snapshot taken before an edit stays valid.
#[derive(Debug, Clone, Default)]
pub struct ControlPointArena {
    points: Vec<ControlPoint>,
}

impl ControlPointArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors interleaved with one inset midpoint per anchor pair.
    ///
    /// The midpoint is pulled `inset` mm toward `center` in the XY plane, which
    /// keeps the wire hugging the arch instead of cutting across tooth gaps.
    #[must_use]
    pub fn from_sorted_anchors(anchors: &[AnchorPosition], center: Point3, inset: f64) -> Self {
        let mut arena = Self::new();
        for (i, anchor) in anchors.iter().enumerate() {
            if i > 0 {
                let mid = anchors[i - 1].position.midpoint(anchor.position);
                arena.push_with(|id| ControlPoint::interpolated(id, inset_toward(mid, center, inset)));
            }
            arena.push_with(|id| ControlPoint::anchor(id, i, anchor));
        }
        arena
    }

    fn push_with(&mut self, make: impl FnOnce(ControlPointId) -> ControlPoint) {
        let id = ControlPointId::new(self.points.len());
        self.points.push(make(id));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ControlPointId) -> Option<&ControlPoint> {
        self.points.get(id.0)
    }

    /// Stores `point` at its id, returning the previous value.
    pub fn replace(&mut self, point: ControlPoint) -> Option<ControlPoint> {
        let slot = self.points.get_mut(point.id.0)?;
        Some(std::mem::replace(slot, point))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlPoint> {
        self.points.iter()
    }

    #[must_use]
    pub fn positions(&self) -> Vec<Point3> {
        self.points.iter().map(|cp| cp.position).collect()
    }

    /// Shifts every control point vertically by `dz`.
    pub fn shift_z(&mut self, dz: f64) {
        if dz == 0.0 {
            return;
        }
        let offset = Vec3::new(0.0, 0.0, dz);
        for cp in &mut self.points {
            cp.position = cp.position + offset;
        }
    }
}

fn inset_toward(point: Point3, center: Point3, inset: f64) -> Point3 {
    let toward = Vec3::new(center.x - point.x, center.y - point.y, 0.0);
    match toward.normalized() {
        Some(dir) if inset != 0.0 => point + dir * inset,
        _ => point,
    }
}

/// Global vertical offset of the wire with undo history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightController {
    offset: f64,
    step: f64,
    #[serde(skip)]
    history: Vec<f64>,
}

impl HeightController {
    pub const MIN_STEP: f64 = 0.1;
    pub const MAX_STEP: f64 = 5.0;
    const MAX_HISTORY: usize = 64;

    #[must_use]
    pub fn new(step: f64) -> Self {
        Self {
            offset: 0.0,
            step: clamp_step(step),
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn set_step(&mut self, step: f64) {
        self.step = clamp_step(step);
    }

    /// Moves `steps` increments (negative moves down); returns the z delta.
    pub fn adjust(&mut self, steps: i32) -> f64 {
        self.set(self.offset + f64::from(steps) * self.step)
    }

    /// Sets an absolute offset; returns the z delta.
    pub fn set(&mut self, offset: f64) -> f64 {
        if !offset.is_finite() || offset == self.offset {
            return 0.0;
        }
        if self.history.len() == Self::MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(self.offset);
        let delta = offset - self.offset;
        self.offset = offset;
        delta
    }

    /// Returns to zero offset; returns the z delta.
    pub fn reset(&mut self) -> f64 {
        self.set(0.0)
    }

    /// Restores the previous offset; `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<f64> {
        let previous = self.history.pop()?;
        let delta = previous - self.offset;
        self.offset = previous;
        Some(delta)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }
}

impl Default for HeightController {
    fn default() -> Self {
        Self::new(0.5)
    }
}

fn clamp_step(step: f64) -> f64 {
    if step.is_finite() {
        step.clamp(HeightController::MIN_STEP, HeightController::MAX_STEP)
    } else {
        HeightController::MIN_STEP
    }
}
