//! Mesh diagnostics returned next to every generated mesh.
//!
//! The wire tube mesher reports what the repair passes changed (welded
//! vertices, culled degenerates, winding fixes) and the resulting topology so
//! exporters can refuse meshes that are not watertight.

use std::fmt;

use serde::Serialize;

/// Topology, repair and timing information for one generated mesh.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct GeomMeshDiagnostics {
    pub vertex_count: usize,
    pub triangle_count: usize,

    /// Vertices merged during tolerance-based welding.
    pub welded_vertex_count: usize,

    /// Triangles whose winding order was corrected for consistency.
    pub flipped_triangle_count: usize,

    /// Zero-area or collapsed triangles removed.
    pub degenerate_triangle_count: usize,

    /// Edges with exactly one adjacent triangle. Zero for a watertight mesh.
    pub open_edge_count: usize,

    /// Edges shared by more than two triangles.
    pub non_manifold_edge_count: usize,

    /// Only populated with the `design_metrics` feature on native targets.
    #[serde(skip)]
    pub timing: Option<super::metrics::PipelineTimingReport>,

    /// Human-readable notes about clamping and repairs.
    pub warnings: Vec<String>,
}

impl GeomMeshDiagnostics {
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    #[must_use]
    pub fn is_valid_solid(&self) -> bool {
        self.is_watertight() && self.is_manifold()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Short `"V:{vertices} T:{triangles} [issues...]"` line for logging.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("V:{} T:{}", self.vertex_count, self.triangle_count)];
        let counters = [
            ("welded", self.welded_vertex_count),
            ("flipped", self.flipped_triangle_count),
            ("degenerate", self.degenerate_triangle_count),
            ("open", self.open_edge_count),
            ("non-manifold", self.non_manifold_edge_count),
        ];
        parts.extend(
            counters
                .iter()
                .filter(|(_, count)| *count > 0)
                .map(|(label, count)| format!("{label}:{count}")),
        );
        parts.join(" ")
    }
}

impl fmt::Display for GeomMeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mesh Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        if self.open_edge_count > 0 {
            writeln!(f, "  Open edges: {}", self.open_edge_count)?;
        }
        if self.non_manifold_edge_count > 0 {
            writeln!(f, "  Non-manifold edges: {}", self.non_manifold_edge_count)?;
        }
        for warning in &self.warnings {
            writeln!(f, "  Warning: {warning}")?;
        }
        if let Some(ref timing) = self.timing {
            writeln!(f, "  Timing: {} ms total", timing.total_ms())?;
        }
        let status = if self.is_valid_solid() { "SOLID" } else { "OPEN" };
        writeln!(f, "  Status: {status}")
    }
}
