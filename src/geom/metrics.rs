//! Opt-in timing hooks for the design pipeline.
//!
//! Timing is only collected when the `design_metrics` feature is enabled and
//! the target is not `wasm32` (`std::time::Instant` is unavailable there).
//! Otherwise every call compiles down to invoking the closure.
//!
//! ```ignore
//! let mut metrics = PipelineMetrics::default();
//! metrics.begin();
//! let path = metrics.time(TimingBucket::Generation, || generator.generate(&cps, &plan));
//! if let Some(report) = metrics.end() {
//!     println!("generation: {} ns", report.generation_ns);
//! }
//! ```

use serde::Serialize;

/// Pipeline phases that accumulate time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Anchor sorting, intermediate points and control point projection.
    ControlPoints,
    /// Curvature estimation and per-segment budget allocation.
    Sampling,
    /// Path strategy evaluation (including the physics solver).
    Generation,
    /// Tension relaxation, Gaussian smoothing and path cleaning.
    Smoothing,
    /// Bend radius enforcement and bend analysis.
    BendAnalysis,
    /// Surface ray queries.
    Projection,
    /// Tube mesh sweep and repair.
    TubeMesh,
}

/// Cumulative nanoseconds per bucket.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineTimingReport {
    pub control_points_ns: u64,
    pub sampling_ns: u64,
    pub generation_ns: u64,
    pub smoothing_ns: u64,
    pub bend_analysis_ns: u64,
    pub projection_ns: u64,
    pub tube_mesh_ns: u64,
}

impl PipelineTimingReport {
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        [
            self.control_points_ns,
            self.sampling_ns,
            self.generation_ns,
            self.smoothing_ns,
            self.bend_analysis_ns,
            self.projection_ns,
            self.tube_mesh_ns,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    #[cfg_attr(not(all(feature = "design_metrics", not(target_arch = "wasm32"))), allow(dead_code))]
    fn bucket_mut(&mut self, bucket: TimingBucket) -> &mut u64 {
        match bucket {
            TimingBucket::ControlPoints => &mut self.control_points_ns,
            TimingBucket::Sampling => &mut self.sampling_ns,
            TimingBucket::Generation => &mut self.generation_ns,
            TimingBucket::Smoothing => &mut self.smoothing_ns,
            TimingBucket::BendAnalysis => &mut self.bend_analysis_ns,
            TimingBucket::Projection => &mut self.projection_ns,
            TimingBucket::TubeMesh => &mut self.tube_mesh_ns,
        }
    }
}

/// Accumulator; call [`begin`](Self::begin), wrap work in [`time`](Self::time),
/// then read the report with [`end`](Self::end).
#[derive(Debug, Default, Clone)]
pub struct PipelineMetrics {
    #[cfg(all(feature = "design_metrics", not(target_arch = "wasm32")))]
    report: PipelineTimingReport,
}

impl PipelineMetrics {
    pub fn begin(&mut self) {
        #[cfg(all(feature = "design_metrics", not(target_arch = "wasm32")))]
        {
            self.report = PipelineTimingReport::default();
        }
    }

    /// `None` when metrics are compiled out.
    #[must_use]
    pub fn end(&self) -> Option<PipelineTimingReport> {
        #[cfg(all(feature = "design_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "design_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "design_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            let slot = self.report.bucket_mut(bucket);
            *slot = slot.saturating_add(nanos);
            result
        }

        #[cfg(not(all(feature = "design_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_report_total() {
        let report = PipelineTimingReport {
            generation_ns: 1000,
            smoothing_ns: 2000,
            projection_ns: 3000,
            ..Default::default()
        };
        assert_eq!(report.total_ns(), 6000);
        assert!((report.total_ms() - 0.006).abs() < 1e-9);
    }

    #[test]
    fn test_time_returns_closure_result() {
        let mut metrics = PipelineMetrics::default();
        metrics.begin();
        let result = metrics.time(TimingBucket::Generation, || 42);
        assert_eq!(result, 42);
        #[cfg(not(all(feature = "design_metrics", not(target_arch = "wasm32"))))]
        assert!(metrics.end().is_none());
    }

    #[test]
    fn test_bucket_routing() {
        let mut report = PipelineTimingReport::default();
        *report.bucket_mut(TimingBucket::TubeMesh) += 5;
        *report.bucket_mut(TimingBucket::Sampling) += 7;
        assert_eq!(report.tube_mesh_ns, 5);
        assert_eq!(report.sampling_ns, 7);
    }
}
