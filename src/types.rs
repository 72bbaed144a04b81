//! Common types and traits for 3D geometry.
//!
//! Every comparison in the placement engine goes through [`EPSILON`]; there is
//! no other tolerance in the crate.

use std::ops::Add;

/// Numerical tolerance for all geometric comparisons, in canonical units.
///
/// Shared faces of neighbouring items may differ by rounding noise; anything
/// closer than this is treated as touching, not overlapping.
pub const EPSILON: f64 = 0.01;

/// A point or an extent in container coordinates.
///
/// `x` runs along the container length, `y` along its width and `z` is the
/// height above the floor.
///
/// # Examples
/// ```
/// use freight_fit::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let extent = Vec3::new(10.0, 20.0, 30.0);
/// assert_eq!(position + extent, Vec3::new(11.0, 22.0, 33.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The container origin (back-left-bottom corner).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Whether this extent fits inside `outer` on every axis, within [`EPSILON`].
    #[inline]
    pub fn fits_within(&self, outer: &Self) -> bool {
        self.x <= outer.x + EPSILON && self.y <= outer.y + EPSILON && self.z <= outer.z + EPSILON
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Anything with a length × width × height extent.
pub trait Dimensional {
    fn dimensions(&self) -> Vec3;

    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Anything anchored at a back-left-bottom corner.
pub trait Positioned {
    fn position(&self) -> Vec3;
}

/// Axis-aligned box spanned by `min` and `max` corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Builds the box of anything that has both a position and dimensions.
    #[inline]
    pub fn of<T: Positioned + Dimensional>(value: &T) -> Self {
        Self::from_position_and_dims(value.position(), value.dimensions())
    }
}
