//! Unit conversion at the session boundary.
//!
//! The placement engine only ever sees canonical units: centimetres for
//! lengths and kilograms for weights. Everything user-facing is converted
//! here, once on the way in and once on the way out.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Linear units accepted from callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Mm,
    #[default]
    Cm,
    M,
    In,
    Ft,
}

impl LengthUnit {
    pub const ALL: [LengthUnit; 5] = [
        LengthUnit::Mm,
        LengthUnit::Cm,
        LengthUnit::M,
        LengthUnit::In,
        LengthUnit::Ft,
    ];

    /// Centimetres per one unit.
    pub const fn to_cm_factor(self) -> f64 {
        match self {
            LengthUnit::Mm => 0.1,
            LengthUnit::Cm => 1.0,
            LengthUnit::M => 100.0,
            LengthUnit::In => 2.54,
            LengthUnit::Ft => 30.48,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Mm => "mm",
            LengthUnit::Cm => "cm",
            LengthUnit::M => "m",
            LengthUnit::In => "in",
            LengthUnit::Ft => "ft",
        }
    }
}

/// Weight units accepted from callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    G,
    Lb,
    Oz,
}

impl WeightUnit {
    pub const ALL: [WeightUnit; 4] = [WeightUnit::Kg, WeightUnit::G, WeightUnit::Lb, WeightUnit::Oz];

    /// Kilograms per one unit.
    pub const fn to_kg_factor(self) -> f64 {
        match self {
            WeightUnit::Kg => 1.0,
            WeightUnit::G => 0.001,
            WeightUnit::Lb => 0.453_592_37,
            WeightUnit::Oz => 0.028_349_523_125,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::G => "g",
            WeightUnit::Lb => "lb",
            WeightUnit::Oz => "oz",
        }
    }
}

/// The pair of units a caller works in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnitSystem {
    #[serde(default)]
    pub length: LengthUnit,
    #[serde(default)]
    pub weight: WeightUnit,
}

impl UnitSystem {
    pub const CANONICAL: UnitSystem = UnitSystem {
        length: LengthUnit::Cm,
        weight: WeightUnit::Kg,
    };

    pub const fn new(length: LengthUnit, weight: WeightUnit) -> Self {
        Self { length, weight }
    }

    /// Converts a length in this system to centimetres.
    pub fn length_to_canonical(&self, value: f64) -> f64 {
        length_to_canonical(value, self.length)
    }

    /// Converts a length in centimetres to this system.
    pub fn length_from_canonical(&self, value: f64) -> f64 {
        length_from_canonical(value, self.length)
    }

    pub fn weight_to_canonical(&self, value: f64) -> f64 {
        weight_to_canonical(value, self.weight)
    }

    pub fn weight_from_canonical(&self, value: f64) -> f64 {
        weight_from_canonical(value, self.weight)
    }
}

/// Converts `value` in `unit` to centimetres.
///
/// # Examples
/// ```
/// use freight_fit::units::{LengthUnit, length_to_canonical};
///
/// assert_eq!(length_to_canonical(10.0, LengthUnit::In), 25.4);
/// ```
pub fn length_to_canonical(value: f64, unit: LengthUnit) -> f64 {
    value * unit.to_cm_factor()
}

pub fn length_from_canonical(value: f64, unit: LengthUnit) -> f64 {
    value / unit.to_cm_factor()
}

/// Converts `value` in `unit` to kilograms.
pub fn weight_to_canonical(value: f64, unit: WeightUnit) -> f64 {
    value * unit.to_kg_factor()
}

pub fn weight_from_canonical(value: f64, unit: WeightUnit) -> f64 {
    value / unit.to_kg_factor()
}

/// Cubic centimetres to cubic metres (CBM).
pub fn cubic_cm_to_cbm(value: f64) -> f64 {
    value / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_conversions_match_reference_factors() {
        assert!((length_to_canonical(1.0, LengthUnit::Ft) - 30.48).abs() < 1e-9);
        assert!((length_to_canonical(250.0, LengthUnit::Mm) - 25.0).abs() < 1e-9);
        assert!((length_to_canonical(2.5, LengthUnit::M) - 250.0).abs() < 1e-9);
        assert!((length_from_canonical(254.0, LengthUnit::In) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn conversions_round_trip_for_every_unit() {
        for unit in LengthUnit::ALL {
            let cm = length_to_canonical(123.4, unit);
            assert!((length_from_canonical(cm, unit) - 123.4).abs() < 1e-9, "{}", unit.symbol());
        }
        for unit in WeightUnit::ALL {
            let kg = weight_to_canonical(56.7, unit);
            assert!((weight_from_canonical(kg, unit) - 56.7).abs() < 1e-9, "{}", unit.symbol());
        }
    }

    #[test]
    fn pounds_to_kilograms() {
        assert!((weight_to_canonical(100.0, WeightUnit::Lb) - 45.359237).abs() < 1e-9);
        assert!((weight_to_canonical(16.0, WeightUnit::Oz) - 0.45359237).abs() < 1e-9);
    }

    #[test]
    fn unit_system_deserializes_with_defaults() {
        let units: UnitSystem = serde_json::from_str(r#"{"length": "in"}"#).unwrap();
        assert_eq!(units, UnitSystem::new(LengthUnit::In, WeightUnit::Kg));
        let units: UnitSystem = serde_json::from_str("{}").unwrap();
        assert_eq!(units, UnitSystem::CANONICAL);
        assert!(serde_json::from_str::<UnitSystem>(r#"{"length": "yard"}"#).is_err());
    }

    #[test]
    fn cbm_conversion() {
        assert!((cubic_cm_to_cbm(124.0 * 96.0 * 96.0) - 1.142784).abs() < 1e-9);
    }
}
