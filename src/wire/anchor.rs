//! Anchor points supplied by the landmark detector and their arch ordering.

use std::f64::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geom::{Point3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToothClass {
    Incisor,
    Canine,
    Premolar,
    Molar,
    /// Facial-axis landmark without a tooth classification.
    #[default]
    #[serde(rename = "fa")]
    FacialAxis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchKind {
    #[default]
    Upper,
    Lower,
}

impl fmt::Display for ArchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
        })
    }
}

/// Bracket position or facial-axis point. Read-only input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPosition {
    pub position: Point3,
    #[serde(default = "default_normal")]
    pub normal: Vec3,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub class: ToothClass,
}

fn default_normal() -> Vec3 {
    Vec3::Y
}

fn default_visible() -> bool {
    true
}

impl AnchorPosition {
    /// Visible facial-axis anchor with a +Y normal.
    #[must_use]
    pub fn new(position: Point3) -> Self {
        Self {
            position,
            normal: default_normal(),
            visible: true,
            class: ToothClass::FacialAxis,
        }
    }

    #[must_use]
    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = normal;
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: ToothClass) -> Self {
        self.class = class;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.normal.is_finite()
    }
}

/// Orders anchors into one traversal around the arch.
///
/// Anchors are sorted by polar angle around `center` in the XY plane. The
/// branch cut sits in the widest angular gap, which is the opening of the arch,
/// so the traversal runs from one end of the arch to the other without crossing
/// itself. Anchors at the same angle are ordered by distance to the center.
#[must_use]
pub fn sort_along_arch(anchors: &[AnchorPosition], center: Point3) -> Vec<AnchorPosition> {
    if anchors.len() < 2 {
        return anchors.to_vec();
    }

    let mut keyed: Vec<(f64, f64, AnchorPosition)> = anchors
        .iter()
        .map(|anchor| {
            let dx = anchor.position.x - center.x;
            let dy = anchor.position.y - center.y;
            (dy.atan2(dx), dx.hypot(dy), *anchor)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let n = keyed.len();
    let mut start = 0usize;
    let mut widest = keyed[0].0 + TAU - keyed[n - 1].0;
    for i in 1..n {
        let gap = keyed[i].0 - keyed[i - 1].0;
        if gap > widest {
            widest = gap;
            start = i;
        }
    }

    keyed.rotate_left(start);
    keyed.into_iter().map(|(_, _, anchor)| anchor).collect()
}

/// Centroid of the anchor positions, used when no arch center is supplied.
#[must_use]
pub fn anchor_centroid(anchors: &[AnchorPosition]) -> Option<Point3> {
    if anchors.is_empty() {
        return None;
    }
    let sum = anchors
        .iter()
        .fold(Vec3::ZERO, |acc, anchor| acc + anchor.position.to_vec3());
    let c = sum / anchors.len() as f64;
    Some(Point3::new(c.x, c.y, c.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(x: f64, y: f64) -> AnchorPosition {
        AnchorPosition::new(Point3::new(x, y, 5.0))
    }

    #[test]
    fn sort_starts_after_arch_opening() {
        let shuffled = [anchor(-5.0, 8.0), anchor(10.0, 0.0), anchor(-10.0, 0.0), anchor(5.0, 8.0)];
        let sorted = sort_along_arch(&shuffled, Point3::new(0.0, 4.0, 0.0));
        let xs: Vec<f64> = sorted.iter().map(|a| a.position.x).collect();
        assert_eq!(xs, vec![10.0, 5.0, -5.0, -10.0]);
    }

    #[test]
    fn sort_handles_arch_opening_across_negative_x_axis() {
        // Arch opens towards -X, so the polar angles straddle ±π.
        let shuffled = [anchor(0.0, 10.0), anchor(8.0, 0.0), anchor(0.0, -10.0), anchor(6.0, 6.0), anchor(6.0, -6.0)];
        let sorted = sort_along_arch(&shuffled, Point3::new(0.0, 0.0, 0.0));
        let ys: Vec<f64> = sorted.iter().map(|a| a.position.y).collect();
        assert_eq!(ys, vec![-10.0, -6.0, 0.0, 6.0, 10.0]);
    }

    #[test]
    fn centroid_of_anchors() {
        let c = anchor_centroid(&[anchor(0.0, 0.0), anchor(2.0, 4.0)]).expect("centroid");
        assert_eq!(c, Point3::new(1.0, 2.0, 5.0));
        assert!(anchor_centroid(&[]).is_none());
    }
}
