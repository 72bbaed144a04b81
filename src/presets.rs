//! Reference catalog of common container envelopes (inner dimensions).

use serde::Serialize;

use crate::model::{Container, ValidationError};
use crate::units::{LengthUnit, length_to_canonical};

/// A named container envelope in its native unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ContainerPreset {
    pub key: &'static str,
    pub name: &'static str,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub unit: LengthUnit,
}

impl ContainerPreset {
    /// The envelope in canonical units.
    pub fn to_container(&self) -> Container {
        Container::new(
            length_to_canonical(self.length, self.unit),
            length_to_canonical(self.width, self.unit),
            length_to_canonical(self.height, self.unit),
        )
    }
}

const fn preset(
    key: &'static str,
    name: &'static str,
    length: f64,
    width: f64,
    height: f64,
) -> ContainerPreset {
    ContainerPreset {
        key,
        name,
        length,
        width,
        height,
        unit: LengthUnit::In,
    }
}

pub const PRESETS: [ContainerPreset; 7] = [
    preset("53-truck", "53' Truck Trailer", 636.0, 102.0, 110.0),
    preset("48-truck", "48' Truck Trailer", 576.0, 102.0, 110.0),
    preset("sprinter", "Mercedes Sprinter Van", 142.0, 67.0, 71.0),
    preset("20ft-dv", "20ft Dry Van Container", 233.0, 92.0, 94.0),
    preset("40ft-dv", "40ft Dry Van Container", 472.0, 92.0, 94.0),
    preset("40ft-hc", "40ft High Cube Container", 473.0, 93.0, 106.0),
    preset("45ft-hq", "45ft High Cube Container", 534.0, 92.0, 106.0),
];

pub fn all() -> &'static [ContainerPreset] {
    &PRESETS
}

/// Looks a preset up by key, ignoring case.
pub fn find(key: &str) -> Result<&'static ContainerPreset, ValidationError> {
    PRESETS
        .iter()
        .find(|p| p.key.eq_ignore_ascii_case(key.trim()))
        .ok_or_else(|| ValidationError::UnknownPreset(key.to_string()))
}
