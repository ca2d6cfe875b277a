//! Geometry kernel used by the wire designer: vectors and tolerances, ray
//! acceleration, curve evaluation, mesh repair and the tube sweep.

mod bvh;
mod core;
mod curve;
mod diagnostics;
mod mesh;
mod metrics;
mod pipe;

pub(crate) use bvh::{Bvh, Ray};
pub use core::{BBox, DegenerateVectorError, Point3, Tolerance, Vec3};
pub use curve::{
    Curve3, CurveError, FrenetFrame, NurbsCurve3, cumulative_arc_lengths,
    parallel_transport_frames, polyline_length, rotate_vector, solve_linear_system,
};
pub use diagnostics::GeomMeshDiagnostics;
pub use mesh::GeomMesh;
pub use metrics::{PipelineMetrics, PipelineTimingReport, TimingBucket};
pub use pipe::{PipeCaps, PipeError, PipeOptions, wire_tube_mesh};

#[cfg(test)]
mod tests;
