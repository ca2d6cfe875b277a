//! Wire materials and cross-section sizes.

use serde::{Deserialize, Serialize};

/// Radius below which a bend is treated as a kink when computing stress.
const MIN_RADIUS_EPS: f64 = 1e-6;

const MM_PER_INCH: f64 = 25.4;

/// Immutable material description shared between design sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMaterial {
    pub name: String,
    /// Young's modulus in GPa.
    pub elastic_modulus: f64,
    /// Yield strength in MPa.
    pub yield_strength: f64,
    /// Density in g/cm³.
    pub density: f64,
    /// Minimum bend radius in mm, always > 0.
    pub min_bend_radius: f64,
    pub superelastic: bool,
}

impl WireMaterial {
    /// Nickel-titanium, the default archwire material.
    #[must_use]
    pub fn niti() -> Self {
        Self {
            name: "NiTi".to_string(),
            elastic_modulus: 83.0,
            yield_strength: 1400.0,
            density: 6.45,
            min_bend_radius: 2.0,
            superelastic: true,
        }
    }

    #[must_use]
    pub fn stainless_steel() -> Self {
        Self {
            name: "Stainless Steel".to_string(),
            elastic_modulus: 200.0,
            yield_strength: 800.0,
            density: 7.9,
            min_bend_radius: 3.0,
            superelastic: false,
        }
    }

    /// Beta-titanium (TMA).
    #[must_use]
    pub fn beta_titanium() -> Self {
        Self {
            name: "Beta-Titanium".to_string(),
            elastic_modulus: 69.0,
            yield_strength: 1100.0,
            density: 4.9,
            min_bend_radius: 2.5,
            superelastic: false,
        }
    }

    /// Looks up a preset by a loose name (`"niti"`, `"ss"`, `"tma"`, ...).
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "niti" | "nickeltitanium" => Some(Self::niti()),
            "ss" | "steel" | "stainlesssteel" => Some(Self::stainless_steel()),
            "tma" | "betati" | "betatitanium" => Some(Self::beta_titanium()),
            _ => None,
        }
    }

    #[must_use]
    pub fn min_bend_radius(&self) -> f64 {
        self.min_bend_radius
    }

    #[must_use]
    pub fn is_superelastic(&self) -> bool {
        self.superelastic
    }

    /// Returns a copy with a different minimum bend radius.
    #[must_use]
    pub fn with_min_bend_radius(mut self, radius: f64) -> Self {
        self.min_bend_radius = radius;
        self
    }

    /// Bend stress relative to the validity threshold.
    ///
    /// Stress grows with `modulus / radius`; dividing by the stress at
    /// `min_bend_radius` cancels the modulus, so a radius equal to the minimum
    /// yields exactly 1.0 and anything above 1.0 is an invalid bend.
    #[must_use]
    pub fn stress_factor(&self, bend_radius: f64) -> f64 {
        let stress = self.elastic_modulus / bend_radius.max(MIN_RADIUS_EPS);
        let threshold = self.elastic_modulus / self.min_bend_radius.max(MIN_RADIUS_EPS);
        stress / threshold
    }

    /// Peterson-style concentration factor for a bend of `angle_degrees` at
    /// `bend_radius`.
    #[must_use]
    pub fn stress_concentration(&self, bend_radius: f64, angle_degrees: f64) -> f64 {
        let ratio = self.min_bend_radius / bend_radius.max(MIN_RADIUS_EPS);
        (1.0 + 2.0 * ratio.sqrt()) * (1.0 + angle_degrees.abs() / 180.0)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let positive = [
            ("elastic_modulus", self.elastic_modulus),
            ("yield_strength", self.yield_strength),
            ("density", self.density),
            ("min_bend_radius", self.min_bend_radius),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("material {field} must be finite and > 0, got {value}"));
            }
        }
        Ok(())
    }
}

impl Default for WireMaterial {
    fn default() -> Self {
        Self::niti()
    }
}

/// Standard archwire cross-sections, named by their inch dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WireSize {
    #[serde(rename = "0.012")]
    Round012,
    #[serde(rename = "0.014")]
    Round014,
    #[serde(rename = "0.016")]
    Round016,
    #[default]
    #[serde(rename = "0.018")]
    Round018,
    #[serde(rename = "0.020")]
    Round020,
    #[serde(rename = "0.016x0.022")]
    Rect016x022,
    #[serde(rename = "0.018x0.025")]
    Rect018x025,
    #[serde(rename = "0.019x0.025")]
    Rect019x025,
    #[serde(rename = "0.021x0.025")]
    Rect021x025,
}

impl WireSize {
    pub const ALL: [Self; 9] = [
        Self::Round012,
        Self::Round014,
        Self::Round016,
        Self::Round018,
        Self::Round020,
        Self::Rect016x022,
        Self::Rect018x025,
        Self::Rect019x025,
        Self::Rect021x025,
    ];

    /// Cross-section in inches: `(width, height)`, equal for round wire.
    #[must_use]
    pub fn inches(self) -> (f64, f64) {
        match self {
            Self::Round012 => (0.012, 0.012),
            Self::Round014 => (0.014, 0.014),
            Self::Round016 => (0.016, 0.016),
            Self::Round018 => (0.018, 0.018),
            Self::Round020 => (0.020, 0.020),
            Self::Rect016x022 => (0.016, 0.022),
            Self::Rect018x025 => (0.018, 0.025),
            Self::Rect019x025 => (0.019, 0.025),
            Self::Rect021x025 => (0.021, 0.025),
        }
    }

    #[must_use]
    pub fn millimetres(self) -> (f64, f64) {
        let (w, h) = self.inches();
        (w * MM_PER_INCH, h * MM_PER_INCH)
    }

    #[must_use]
    pub fn is_rectangular(self) -> bool {
        let (w, h) = self.inches();
        w != h
    }

    /// Radius of the round tube used to render this wire.
    #[must_use]
    pub fn tube_radius(self) -> f64 {
        let (w, h) = self.millimetres();
        w.max(h) / 2.0
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Round012 => "0.012",
            Self::Round014 => "0.014",
            Self::Round016 => "0.016",
            Self::Round018 => "0.018",
            Self::Round020 => "0.020",
            Self::Rect016x022 => "0.016x0.022",
            Self::Rect018x025 => "0.018x0.025",
            Self::Rect019x025 => "0.019x0.025",
            Self::Rect021x025 => "0.021x0.025",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.label() == label.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_factor_is_one_at_min_radius() {
        for material in [
            WireMaterial::niti(),
            WireMaterial::stainless_steel(),
            WireMaterial::beta_titanium(),
        ] {
            let at_min = material.stress_factor(material.min_bend_radius());
            assert!((at_min - 1.0).abs() < 1e-12, "{}", material.name);
            assert!(material.stress_factor(material.min_bend_radius() / 2.0) > 1.0);
            assert!(material.stress_factor(material.min_bend_radius() * 2.0) < 1.0);
        }
    }

    #[test]
    fn stress_factor_survives_zero_radius() {
        let factor = WireMaterial::niti().stress_factor(0.0);
        assert!(factor.is_finite());
        assert!(factor > 1.0);
    }

    #[test]
    fn stress_concentration_grows_with_angle_and_tightness() {
        let material = WireMaterial::niti();
        let base = material.stress_concentration(2.0, 0.0);
        assert!((base - 3.0).abs() < 1e-12);
        assert!(material.stress_concentration(2.0, 90.0) > base);
        assert!(material.stress_concentration(1.0, 0.0) > base);
    }

    #[test]
    fn presets_resolve_loose_names() {
        assert_eq!(WireMaterial::preset("NiTi"), Some(WireMaterial::niti()));
        assert_eq!(WireMaterial::preset("stainless_steel"), Some(WireMaterial::stainless_steel()));
        assert_eq!(WireMaterial::preset("TMA"), Some(WireMaterial::beta_titanium()));
        assert_eq!(WireMaterial::preset("gold"), None);
        assert!(WireMaterial::niti().is_superelastic());
        assert!(!WireMaterial::stainless_steel().is_superelastic());
    }

    #[test]
    fn material_validation_rejects_non_positive_radius() {
        let material = WireMaterial::niti().with_min_bend_radius(0.0);
        assert!(material.validate().is_err());
        assert!(WireMaterial::niti().validate().is_ok());
    }

    #[test]
    fn wire_size_radius_uses_largest_dimension() {
        assert!((WireSize::Round018.tube_radius() - 0.018 * 25.4 / 2.0).abs() < 1e-12);
        assert!((WireSize::Rect016x022.tube_radius() - 0.022 * 25.4 / 2.0).abs() < 1e-12);
        assert!(WireSize::Rect019x025.is_rectangular());
        assert!(!WireSize::Round014.is_rectangular());
        assert_eq!(WireSize::from_label("0.019x0.025"), Some(WireSize::Rect019x025));
        assert_eq!(WireSize::default(), WireSize::Round018);
    }
}
