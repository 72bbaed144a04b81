//! Data models for the cargo placement engine.
//!
//! This module defines the fundamental data structures:
//! - `Container`: The transport envelope (truck, ocean container, air pallet)
//! - `Item`: A cuboid cargo item with stacking and rotation restrictions
//! - `PlacedItem`: An item together with its resolved position and fitted flag
//!
//! All lengths are in one canonical linear unit and all weights in one canonical
//! weight unit; conversion happens in [`crate::units`] before anything here is built.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BoundingBox, Dimensional, Positioned, Vec3};

/// Validation error for container and item data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Duplicate item id: {0}")]
    DuplicateId(String),
    #[error("Unknown container preset: {0}")]
    UnknownPreset(String),
}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Checks a weight value. Zero is accepted: weight is optional for placement.
pub(crate) fn validate_weight(value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "Weight must not be negative, got: {}",
            value
        )));
    }
    Ok(())
}

/// The rectangular transport envelope.
///
/// Immutable for the duration of one packing run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Container {
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Returns `Err` if any dimension is non-positive or not finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimension(self.length, "Container length")?;
        validate_dimension(self.width, "Container width")?;
        validate_dimension(self.height, "Container height")?;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Total volume; zero for an invalid envelope.
    pub fn total_volume(&self) -> f64 {
        if self.is_valid() {
            self.dimensions().volume()
        } else {
            0.0
        }
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }
}

/// A cuboid cargo item as supplied by the caller.
///
/// # Fields
/// * `id` - Unique among the items of one run
/// * `length`, `width`, `height` - Dimensions in canonical units
/// * `weight` - Weight in canonical units
/// * `non_stackable` - Never carries another item and never leaves the floor
/// * `non_rotatable` - Keeps its given (length, width) orientation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub non_stackable: bool,
    #[serde(default)]
    pub non_rotatable: bool,
}

impl Item {
    /// Creates a stackable, rotatable item.
    ///
    /// Construction never fails: items with degenerate geometry are accepted
    /// here and reported unfitted by the engine.
    ///
    /// # Examples
    /// ```
    /// use freight_fit::model::Item;
    ///
    /// let pallet = Item::new("p1", 120.0, 80.0, 100.0, 350.0).non_stackable(true);
    /// assert!(pallet.non_stackable);
    /// assert!(!pallet.non_rotatable);
    /// ```
    pub fn new(id: impl Into<String>, length: f64, width: f64, height: f64, weight: f64) -> Self {
        Self {
            id: id.into(),
            length,
            width,
            height,
            weight,
            non_stackable: false,
            non_rotatable: false,
        }
    }

    pub fn non_stackable(mut self, value: bool) -> Self {
        self.non_stackable = value;
        self
    }

    pub fn non_rotatable(mut self, value: bool) -> Self {
        self.non_rotatable = value;
        self
    }

    /// Checks that all three dimensions are positive and finite.
    pub fn validate_geometry(&self) -> Result<(), ValidationError> {
        validate_dimension(self.length, "Item length")?;
        validate_dimension(self.width, "Item width")?;
        validate_dimension(self.height, "Item height")?;
        Ok(())
    }

    /// Footprint area (length × width).
    pub fn footprint(&self) -> f64 {
        self.length * self.width
    }

    /// Returns a copy turned 90° about the vertical axis.
    pub fn yawed(&self) -> Self {
        Self {
            length: self.width,
            width: self.length,
            ..self.clone()
        }
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }
}

/// An item with its placement decision.
///
/// When `fitted` is true, `item` carries the final orientation and `x`, `y`, `z`
/// locate its back-left-bottom corner. When false, the position is `(0, 0, 0)` and
/// the dimensions are exactly the ones supplied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedItem {
    #[serde(flatten)]
    pub item: Item,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub fitted: bool,
}

impl PlacedItem {
    /// A fitted placement of `item` (already in its final orientation).
    pub fn fitted(item: Item, position: Vec3) -> Self {
        Self {
            item,
            x: position.x,
            y: position.y,
            z: position.z,
            fitted: true,
        }
    }

    /// An unfitted record carrying the item unchanged.
    pub fn unfitted(item: Item) -> Self {
        Self {
            item,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            fitted: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }

    /// Top Z coordinate of the placed item.
    pub fn top_z(&self) -> f64 {
        self.z + self.item.height
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::of(self)
    }
}

impl Positioned for PlacedItem {
    fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl Dimensional for PlacedItem {
    fn dimensions(&self) -> Vec3 {
        self.item.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_validation_rejects_non_positive_dimensions() {
        assert!(Container::new(124.0, 96.0, 96.0).is_valid());
        assert!(!Container::new(0.0, 96.0, 96.0).is_valid());
        assert!(!Container::new(124.0, -1.0, 96.0).is_valid());
        assert!(!Container::new(124.0, 96.0, f64::NAN).is_valid());
        assert_eq!(Container::new(0.0, 10.0, 10.0).total_volume(), 0.0);
    }

    #[test]
    fn item_geometry_validation() {
        assert!(Item::new("a", 1.0, 2.0, 3.0, 0.0).validate_geometry().is_ok());
        let err = Item::new("b", 1.0, 0.0, 3.0, 1.0)
            .validate_geometry()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDimension(_)));
    }

    #[test]
    fn weight_validation_accepts_zero() {
        assert!(validate_weight(0.0).is_ok());
        assert!(validate_weight(12.5).is_ok());
        assert!(validate_weight(-0.1).is_err());
        assert!(validate_weight(f64::INFINITY).is_err());
    }

    #[test]
    fn yawed_item_swaps_footprint_only() {
        let item = Item::new("a", 48.0, 40.0, 56.0, 10.0).non_rotatable(true);
        let turned = item.yawed();
        assert_eq!((turned.length, turned.width, turned.height), (40.0, 48.0, 56.0));
        assert_eq!(turned.id, "a");
        assert!(turned.non_rotatable);
    }

    #[test]
    fn placed_item_serializes_flat() {
        let placed = PlacedItem::fitted(Item::new("a", 1.0, 2.0, 3.0, 4.0), Vec3::new(5.0, 6.0, 7.0));
        let value = serde_json::to_value(&placed).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["x"], 5.0);
        assert_eq!(value["fitted"], true);
        assert!((placed.top_z() - 10.0).abs() < 1e-9);
    }
}
