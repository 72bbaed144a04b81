//! Geometry kernel for 3D collision detection and support calculation.
//!
//! Pure functions shared by both packing strategies. All comparisons use
//! [`EPSILON`] so that items sharing a face never count as overlapping.

use crate::model::{Container, PlacedItem};
use crate::types::{BoundingBox, EPSILON};

/// Checks whether two boxes overlap in space.
///
/// Two boxes do NOT overlap when they are separated along at least one axis,
/// where a gap (or interpenetration) smaller than [`EPSILON`] still counts as
/// separated. The test is symmetric in `a` and `b`.
///
/// # Examples
/// ```
/// use freight_fit::geometry::overlaps;
/// use freight_fit::types::{BoundingBox, Vec3};
///
/// let a = BoundingBox::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
/// let b = BoundingBox::from_position_and_dims(Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
/// assert!(!overlaps(&a, &b));
/// ```
pub fn overlaps(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(separated(a.min.x, a.max.x, b.min.x, b.max.x)
        || separated(a.min.y, a.max.y, b.min.y, b.max.y)
        || separated(a.min.z, a.max.z, b.min.z, b.max.z))
}

#[inline]
fn separated(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> bool {
    a_max <= b_min + EPSILON || b_max <= a_min + EPSILON
}

/// Calculates the overlap of two intervals in one dimension, at least 0.0.
///
/// # Examples
/// ```
/// use freight_fit::geometry::overlap_1d;
///
/// assert_eq!(overlap_1d(0.0, 5.0, 3.0, 8.0), 2.0);
/// assert_eq!(overlap_1d(0.0, 2.0, 3.0, 8.0), 0.0);
/// ```
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Calculates the overlap area of two boxes projected onto the floor plane.
pub fn overlap_area_xy(a: &BoundingBox, b: &BoundingBox) -> f64 {
    overlap_1d(a.min.x, a.max.x, b.min.x, b.max.x) * overlap_1d(a.min.y, a.max.y, b.min.y, b.max.y)
}

/// Checks that `candidate` lies entirely within the container extents.
pub fn in_bounds(candidate: &BoundingBox, container: &Container) -> bool {
    candidate.min.x >= -EPSILON
        && candidate.min.y >= -EPSILON
        && candidate.min.z >= -EPSILON
        && candidate.max.x <= container.length + EPSILON
        && candidate.max.y <= container.width + EPSILON
        && candidate.max.z <= container.height + EPSILON
}

/// Sums the footprint area of `candidate` that rests on already placed items.
///
/// Only fitted, stackable items whose top face coincides with the candidate's
/// bottom face contribute. Returns 0.0 when nothing qualifies.
pub fn support_area(candidate: &BoundingBox, placed: &[PlacedItem]) -> f64 {
    placed
        .iter()
        .filter(|p| p.fitted && !p.item.non_stackable)
        .filter(|p| (p.top_z() - candidate.min.z).abs() <= EPSILON)
        .map(|p| overlap_area_xy(candidate, &p.bounding_box()))
        .sum()
}

/// Whether any part of `candidate`'s bottom face lies on a non-stackable top.
pub fn rests_on_non_stackable(candidate: &BoundingBox, placed: &[PlacedItem]) -> bool {
    placed
        .iter()
        .filter(|p| p.fitted && p.item.non_stackable)
        .filter(|p| (p.top_z() - candidate.min.z).abs() <= EPSILON)
        .any(|p| overlap_area_xy(candidate, &p.bounding_box()) > EPSILON)
}

/// Counts placed items sharing a face with `candidate`.
///
/// A face is shared when the boxes touch along one axis and their extents
/// overlap with positive length along the other two.
pub fn touching_faces(candidate: &BoundingBox, placed: &[PlacedItem]) -> usize {
    placed
        .iter()
        .filter(|p| p.fitted)
        .filter(|p| shares_face(candidate, &p.bounding_box()))
        .count()
}

fn shares_face(a: &BoundingBox, b: &BoundingBox) -> bool {
    let touch_x = touches(a.min.x, a.max.x, b.min.x, b.max.x);
    let touch_y = touches(a.min.y, a.max.y, b.min.y, b.max.y);
    let touch_z = touches(a.min.z, a.max.z, b.min.z, b.max.z);

    let along_x = overlap_1d(a.min.x, a.max.x, b.min.x, b.max.x) > EPSILON;
    let along_y = overlap_1d(a.min.y, a.max.y, b.min.y, b.max.y) > EPSILON;
    let along_z = overlap_1d(a.min.z, a.max.z, b.min.z, b.max.z) > EPSILON;

    (touch_x && along_y && along_z) || (touch_y && along_x && along_z) || (touch_z && along_x && along_y)
}

/// Checks a finished layout against the placement rules.
///
/// Every fitted record must lie inside the container and overlap no other
/// fitted record. Elevated records must be stackable, have at least
/// `support_ratio` of their footprint on stackable tops and rest on no
/// non-stackable top. The error names the first offending record.
pub fn validate_layout(container: &Container, layout: &[PlacedItem], support_ratio: f64) -> Result<(), String> {
    let fitted: Vec<&PlacedItem> = layout.iter().filter(|p| p.fitted).collect();

    for (i, record) in fitted.iter().enumerate() {
        let bbox = record.bounding_box();
        if !in_bounds(&bbox, container) {
            return Err(format!("'{}' lies outside the container", record.id()));
        }
        if let Some(other) = fitted[i + 1..]
            .iter()
            .find(|other| overlaps(&bbox, &other.bounding_box()))
        {
            return Err(format!("'{}' overlaps '{}'", record.id(), other.id()));
        }
        if bbox.min.z <= EPSILON {
            continue;
        }
        if record.item.non_stackable {
            return Err(format!("non-stackable '{}' is not on the floor", record.id()));
        }
        if support_area(&bbox, layout) + EPSILON < support_ratio * record.item.footprint() {
            return Err(format!("'{}' is not sufficiently supported", record.id()));
        }
        if rests_on_non_stackable(&bbox, layout) {
            return Err(format!("'{}' rests on a non-stackable item", record.id()));
        }
    }
    Ok(())
}

#[inline]
fn touches(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> bool {
    (a_max - b_min).abs() <= EPSILON || (b_max - a_min).abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;
    use crate::types::Vec3;

    fn bbox(pos: (f64, f64, f64), dims: (f64, f64, f64)) -> BoundingBox {
        BoundingBox::from_position_and_dims(
            Vec3::new(pos.0, pos.1, pos.2),
            Vec3::new(dims.0, dims.1, dims.2),
        )
    }

    fn placed(id: &str, pos: (f64, f64, f64), dims: (f64, f64, f64)) -> PlacedItem {
        PlacedItem::fitted(
            Item::new(id, dims.0, dims.1, dims.2, 1.0),
            Vec3::new(pos.0, pos.1, pos.2),
        )
    }

    #[test]
    fn overlapping_boxes_are_detected_symmetrically() {
        let a = bbox((0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let b = bbox((5.0, 5.0, 5.0), (10.0, 10.0, 10.0));
        let c = bbox((20.0, 20.0, 20.0), (10.0, 10.0, 10.0));

        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
        assert!(!overlaps(&a, &c));
        assert!(!overlaps(&c, &a));
    }

    #[test]
    fn shared_faces_and_rounding_noise_are_not_overlaps() {
        let a = bbox((0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let flush = bbox((10.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let noisy = bbox((9.995, 0.0, 0.0), (10.0, 10.0, 10.0));
        let deep = bbox((9.5, 0.0, 0.0), (10.0, 10.0, 10.0));

        assert!(!overlaps(&a, &flush));
        assert!(!overlaps(&a, &noisy));
        assert!(overlaps(&a, &deep));
    }

    #[test]
    fn in_bounds_checks_every_axis() {
        let container = Container::new(100.0, 50.0, 40.0);
        assert!(in_bounds(&bbox((0.0, 0.0, 0.0), (100.0, 50.0, 40.0)), &container));
        assert!(!in_bounds(&bbox((1.0, 0.0, 0.0), (100.0, 50.0, 40.0)), &container));
        assert!(!in_bounds(&bbox((0.0, 0.0, 1.0), (10.0, 10.0, 40.0)), &container));
        assert!(!in_bounds(&bbox((-1.0, 0.0, 0.0), (10.0, 10.0, 10.0)), &container));
    }

    #[test]
    fn support_area_sums_matching_top_faces_only() {
        let below = vec![
            placed("a", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0)),
            placed("b", (10.0, 0.0, 0.0), (10.0, 10.0, 10.0)),
            placed("tall", (20.0, 0.0, 0.0), (10.0, 10.0, 15.0)),
        ];
        let candidate = bbox((5.0, 0.0, 10.0), (20.0, 10.0, 5.0));

        // 5×10 on a, 10×10 on b; the tall neighbour's top is at 15
        assert!((support_area(&candidate, &below) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn non_stackable_items_give_no_support() {
        let mut base = placed("a", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        base.item.non_stackable = true;
        let candidate = bbox((0.0, 0.0, 10.0), (10.0, 10.0, 5.0));

        assert_eq!(support_area(&candidate, &[base]), 0.0);
    }

    #[test]
    fn partial_rest_on_a_non_stackable_top_is_detected() {
        let mut fragile = placed("fragile", (70.0, 0.0, 0.0), (30.0, 50.0, 50.0));
        fragile.item.non_stackable = true;
        let below = vec![placed("a", (0.0, 0.0, 0.0), (70.0, 50.0, 50.0)), fragile];

        let lid = bbox((0.0, 0.0, 50.0), (100.0, 50.0, 10.0));
        let beside = bbox((0.0, 0.0, 50.0), (70.0, 50.0, 10.0));
        let floor = bbox((0.0, 60.0, 0.0), (100.0, 50.0, 10.0));

        assert!(rests_on_non_stackable(&lid, &below));
        // Edge contact with the fragile top is not resting on it
        assert!(!rests_on_non_stackable(&beside, &below));
        assert!(!rests_on_non_stackable(&floor, &below));
    }

    #[test]
    fn validate_layout_names_the_first_broken_rule() {
        let container = Container::new(100.0, 50.0, 100.0);
        let base = placed("a", (0.0, 0.0, 0.0), (70.0, 50.0, 50.0));

        let stacked = vec![base.clone(), placed("b", (0.0, 0.0, 50.0), (60.0, 50.0, 10.0))];
        assert_eq!(validate_layout(&container, &stacked, 0.7), Ok(()));

        let outside = vec![placed("c", (80.0, 0.0, 0.0), (40.0, 20.0, 10.0))];
        let err = validate_layout(&container, &outside, 0.7).unwrap_err();
        assert!(err.contains("outside"), "{err}");

        let clash = vec![base.clone(), placed("d", (60.0, 0.0, 0.0), (30.0, 50.0, 10.0))];
        let err = validate_layout(&container, &clash, 0.7).unwrap_err();
        assert!(err.contains("overlaps"), "{err}");

        let overhang = vec![base.clone(), placed("e", (40.0, 0.0, 50.0), (60.0, 50.0, 10.0))];
        let err = validate_layout(&container, &overhang, 0.7).unwrap_err();
        assert!(err.contains("supported"), "{err}");

        let mut fragile = placed("fragile", (70.0, 0.0, 0.0), (30.0, 50.0, 50.0));
        fragile.item.non_stackable = true;
        let lid = placed("lid", (0.0, 0.0, 50.0), (100.0, 50.0, 10.0));
        let err = validate_layout(&container, &[base, fragile, lid], 0.7).unwrap_err();
        assert!(err.contains("non-stackable"), "{err}");

        // Unfitted records are not part of the layout
        let ghost = PlacedItem::unfitted(Item::new("ghost", 500.0, 500.0, 500.0, 1.0));
        assert_eq!(validate_layout(&container, &[ghost], 0.7), Ok(()));
    }

    #[test]
    fn touching_faces_requires_real_contact() {
        let placed_items = vec![
            placed("left", (0.0, 0.0, 0.0), (10.0, 10.0, 10.0)),
            placed("below", (10.0, 0.0, 0.0), (10.0, 10.0, 5.0)),
            placed("corner", (20.0, 10.0, 0.0), (10.0, 10.0, 10.0)),
        ];
        let candidate = bbox((10.0, 0.0, 5.0), (10.0, 10.0, 5.0));

        // Shares a face with "left" (x) and "below" (z); "corner" only touches an edge
        assert_eq!(touching_faces(&candidate, &placed_items), 2);
    }
}
