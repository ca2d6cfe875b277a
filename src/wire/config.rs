//! User configuration of a design session.

use serde::{Deserialize, Serialize};

use super::anchor::ArchKind;
use super::error::WireError;
use super::generator::{PathStrategy, StrategyOptions};
use super::material::WireSize;
use super::projector::ProjectorOptions;
use super::sampler::AdaptiveSampler;

/// Every knob of the design pipeline. Missing fields deserialize to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    pub strategy: PathStrategy,
    pub strategy_options: StrategyOptions,
    /// Target number of path samples.
    pub resolution: usize,
    pub adaptive_sampling: bool,
    pub sampler: AdaptiveSampler,
    /// Tension factor in `[0, 1]`; 1 leaves the path unchanged.
    pub tension: f64,
    /// Gaussian sigma in samples; 0 disables smoothing.
    pub smoothing_sigma: f64,
    pub min_segment_length: f64,
    pub bend_threshold_degrees: f64,
    pub enforce_min_bend_radius: bool,
    pub enforcement_passes: usize,
    /// Inset of intermediate control points toward the arch center (mm).
    pub intermediate_inset: f64,
    pub height_step: f64,
    pub surface_constrained: bool,
    /// Options handed to a projector built from this config. Queries always
    /// use the options stored in the projector itself.
    pub projector: ProjectorOptions,
    pub wire_size: WireSize,
    pub arch: ArchKind,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            strategy: PathStrategy::CatmullRom,
            strategy_options: StrategyOptions::default(),
            resolution: 100,
            adaptive_sampling: true,
            sampler: AdaptiveSampler::default(),
            tension: 1.0,
            smoothing_sigma: 2.0,
            min_segment_length: 0.05,
            bend_threshold_degrees: 5.0,
            enforce_min_bend_radius: true,
            enforcement_passes: 5,
            intermediate_inset: 1.0,
            height_step: 0.5,
            surface_constrained: false,
            projector: ProjectorOptions::default(),
            wire_size: WireSize::default(),
            arch: ArchKind::default(),
        }
    }
}

impl DesignConfig {
    pub const MAX_RESOLUTION: usize = 100_000;

    /// Rejects values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), WireError> {
        let invalid = |msg: String| Err(WireError::InvalidConfig(msg));

        if self.resolution < 2 || self.resolution > Self::MAX_RESOLUTION {
            return invalid(format!(
                "resolution must be in 2..={}, got {}",
                Self::MAX_RESOLUTION,
                self.resolution
            ));
        }
        if !(0.0..=1.0).contains(&self.tension) {
            return invalid(format!("tension must be in [0, 1], got {}", self.tension));
        }

        let non_negative = [
            ("smoothing_sigma", self.smoothing_sigma),
            ("min_segment_length", self.min_segment_length),
            ("bend_threshold_degrees", self.bend_threshold_degrees),
            ("intermediate_inset", self.intermediate_inset),
            ("sampler.curvature_gain", self.sampler.curvature_gain),
            ("strategy_options.cubic.smoothing", self.strategy_options.cubic.smoothing),
            ("strategy_options.physics.jitter", self.strategy_options.physics.jitter),
            ("strategy_options.physics.tolerance", self.strategy_options.physics.tolerance),
            ("projector.fan_angle_degrees", self.projector.fan_angle_degrees),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{field} must be finite and >= 0, got {value}"));
            }
        }

        let positive = [
            ("height_step", self.height_step),
            ("projector.search_radius", self.projector.search_radius),
            ("projector.snap_outside", self.projector.snap_outside),
            ("projector.snap_inside", self.projector.snap_inside),
            ("strategy_options.physics.spring_stiffness", self.strategy_options.physics.spring_stiffness),
            ("strategy_options.physics.bending_stiffness", self.strategy_options.physics.bending_stiffness),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return invalid(format!("{field} must be finite and > 0, got {value}"));
            }
        }

        if self.bend_threshold_degrees >= 180.0 {
            return invalid(format!(
                "bend_threshold_degrees must be below 180, got {}",
                self.bend_threshold_degrees
            ));
        }
        if self.strategy_options.b_spline.degree == 0 {
            return invalid("strategy_options.b_spline.degree must be >= 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(DesignConfig::default().validate(), Ok(()));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let cases = [
            DesignConfig {
                resolution: 1,
                ..DesignConfig::default()
            },
            DesignConfig {
                tension: 1.5,
                ..DesignConfig::default()
            },
            DesignConfig {
                smoothing_sigma: f64::NAN,
                ..DesignConfig::default()
            },
            DesignConfig {
                height_step: 0.0,
                ..DesignConfig::default()
            },
            DesignConfig {
                bend_threshold_degrees: 200.0,
                ..DesignConfig::default()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(WireError::InvalidConfig(_))), "{config:?}");
        }
    }
}
