//! Greedy adjacency packing.
//!
//! Items are placed one at a time in descending volume order. For each item the
//! candidate positions are the faces of already placed items (right, front and
//! top) and their edge alignments; only when none of those is valid does the
//! packer scan a coarse grid. Candidates are ranked by the number of faces they
//! share with placed items, then by lowest `z`, `y` and `x`.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::geometry::{in_bounds, overlaps, rests_on_non_stackable, support_area, touching_faces};
use crate::model::{Container, Item, PlacedItem};
use crate::packer::{Ledger, PackEvent, Packer, PackingConfig, RejectReason, orientations};
use crate::types::{BoundingBox, Dimensional, EPSILON, Vec3};

/// General-purpose strategy for heterogeneous loads.
#[derive(Clone, Copy, Debug)]
pub struct GreedyAdjacency {
    support_ratio: f64,
    min_fallback_step: f64,
    max_fallback_positions: usize,
}

impl GreedyAdjacency {
    pub fn new(config: &PackingConfig) -> Self {
        Self {
            support_ratio: config.adjacency_support_ratio,
            min_fallback_step: config.min_fallback_step.max(EPSILON),
            max_fallback_positions: config.max_fallback_positions.max(1),
        }
    }
}

impl Default for GreedyAdjacency {
    fn default() -> Self {
        Self::new(&PackingConfig::default())
    }
}

/// Ranking of a valid position. Lower is better.
#[derive(Clone, Copy, Debug)]
struct PlacementScore {
    touching: usize,
    z: f64,
    y: f64,
    x: f64,
}

impl Packer for GreedyAdjacency {
    fn name(&self) -> &'static str {
        "greedy_adjacency"
    }

    fn pack_with_progress(
        &self,
        container: &Container,
        items: &[Item],
        on_event: &mut dyn FnMut(&PackEvent),
    ) -> Vec<PlacedItem> {
        let mut ledger = Ledger::new(items, on_event);
        let mut order = ledger.screen(container);

        // Largest volume first; the sort is stable so equal volumes keep input order
        order.sort_by(|&a, &b| {
            items[b]
                .volume()
                .partial_cmp(&items[a].volume())
                .unwrap_or(Ordering::Equal)
        });

        'items: for index in order {
            let candidates: Vec<Item> = orientations(&items[index])
                .into_iter()
                .filter(|o| o.dimensions().fits_within(&container.dimensions()))
                .collect();

            if candidates.is_empty() {
                ledger.reject(index, RejectReason::ExceedsContainer);
                continue;
            }

            for oriented in candidates {
                if let Some(position) = self.find_position(&oriented, container, ledger.placed()) {
                    ledger.place(index, oriented, position);
                    continue 'items;
                }
            }

            ledger.reject(index, RejectReason::NoValidPosition);
        }

        ledger.finish()
    }
}

impl GreedyAdjacency {
    /// Finds the best position for `item` in its current orientation.
    fn find_position(&self, item: &Item, container: &Container, placed: &[PlacedItem]) -> Option<Vec3> {
        let mut best: Option<(Vec3, PlacementScore)> = None;
        for position in adjacency_positions(item, placed) {
            if let Some(score) = self.evaluate(item, position, container, placed) {
                update_best(&mut best, position, score);
            }
        }

        if best.is_none() {
            debug!(id = %item.id, "no adjacent position, scanning fallback grid");
            for position in self.fallback_positions(item, container, placed) {
                if let Some(score) = self.evaluate(item, position, container, placed) {
                    update_best(&mut best, position, score);
                }
            }
        }

        best.map(|(position, _)| position)
    }

    /// Validates a candidate and scores it; `None` if the position is not allowed.
    fn evaluate(
        &self,
        item: &Item,
        position: Vec3,
        container: &Container,
        placed: &[PlacedItem],
    ) -> Option<PlacementScore> {
        let candidate = BoundingBox::from_position_and_dims(position, item.dimensions());

        if !in_bounds(&candidate, container) {
            return None;
        }
        if placed
            .iter()
            .any(|p| p.fitted && overlaps(&candidate, &p.bounding_box()))
        {
            return None;
        }
        if position.z > EPSILON {
            if item.non_stackable {
                return None;
            }
            let required = self.support_ratio * item.footprint();
            if support_area(&candidate, placed) + EPSILON < required {
                return None;
            }
            if rests_on_non_stackable(&candidate, placed) {
                return None;
            }
        }

        Some(PlacementScore {
            touching: touching_faces(&candidate, placed),
            z: position.z,
            y: position.y,
            x: position.x,
        })
    }

    /// Grid positions for the fallback scan.
    ///
    /// Horizontal positions step by a quarter of the item's smallest dimension,
    /// never below the configured minimum and coarsened until the position count
    /// stays under the cap. Vertical positions are the floor plus the top faces
    /// of placed stackable items, the only heights at which support can exist.
    fn fallback_positions(&self, item: &Item, container: &Container, placed: &[PlacedItem]) -> Vec<Vec3> {
        let mut z_levels = vec![0.0];
        if !item.non_stackable {
            z_levels.extend(
                placed
                    .iter()
                    .filter(|p| p.fitted && !p.item.non_stackable)
                    .map(PlacedItem::top_z)
                    .filter(|top| top + item.height <= container.height + EPSILON),
            );
        }
        z_levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        z_levels.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);

        let levels = z_levels.len();
        let smallest = item.length.min(item.width).min(item.height);
        let mut step = (smallest / 4.0).max(self.min_fallback_step);

        // Jump straight to the first doubling that can meet the cap
        let free_area = (container.length - item.length).max(0.0) * (container.width - item.width).max(0.0);
        let min_step_for_cap = (free_area * levels as f64 / self.max_fallback_positions as f64).sqrt();
        if min_step_for_cap > step {
            step *= 2f64.powi((min_step_for_cap / step).log2().ceil() as i32);
        }
        step = step.min(container.length.max(container.width));

        let mut xs = axis_count(container.length, item.length, step);
        let mut ys = axis_count(container.width, item.width, step);
        while xs.saturating_mul(ys).saturating_mul(levels) > self.max_fallback_positions
            && (xs > 2 || ys > 2)
        {
            step *= 2.0;
            xs = axis_count(container.length, item.length, step);
            ys = axis_count(container.width, item.width, step);
        }

        let xs = axis_positions(container.length, item.length, step);
        let ys = axis_positions(container.width, item.width, step);
        let mut positions = Vec::with_capacity(xs.len() * ys.len() * z_levels.len());
        for &z in &z_levels {
            for &y in &ys {
                for &x in &xs {
                    positions.push(Vec3::new(x, y, z));
                }
            }
        }
        positions
    }
}

/// Face-adjacent candidate positions, deduplicated in generation order.
///
/// With nothing placed the only candidate is the origin. Otherwise, for every
/// placed item: flush against its right face, its front face and (if both may
/// stack) its top face, plus its `y`/`z` combined with every other item's right
/// edge and its `x`/`z` combined with every other item's front edge.
fn adjacency_positions(item: &Item, placed: &[PlacedItem]) -> Vec<Vec3> {
    let fitted: Vec<&PlacedItem> = placed.iter().filter(|p| p.fitted).collect();
    if fitted.is_empty() {
        return vec![Vec3::zero()];
    }

    let mut seen = HashSet::new();
    let mut positions = Vec::new();
    let mut push = |position: Vec3| {
        if seen.insert(grid_key(position)) {
            positions.push(position);
        }
    };

    for (ei, existing) in fitted.iter().enumerate() {
        push(Vec3::new(existing.x + existing.item.length, existing.y, existing.z));
        push(Vec3::new(existing.x, existing.y + existing.item.width, existing.z));
        if !existing.item.non_stackable && !item.non_stackable {
            push(Vec3::new(existing.x, existing.y, existing.top_z()));
        }

        for (oi, other) in fitted.iter().enumerate() {
            if oi == ei {
                continue;
            }
            push(Vec3::new(other.x + other.item.length, existing.y, existing.z));
            push(Vec3::new(existing.x, other.y + other.item.width, existing.z));
        }
    }

    positions
}

/// Quantises a position to the tolerance grid for deduplication.
fn grid_key(position: Vec3) -> (i64, i64, i64) {
    (
        (position.x / EPSILON).round() as i64,
        (position.y / EPSILON).round() as i64,
        (position.z / EPSILON).round() as i64,
    )
}

/// Number of positions [`axis_positions`] yields, without building them.
fn axis_count(container_len: f64, object_len: f64, step: f64) -> usize {
    let max_pos = container_len - object_len;
    if max_pos < -EPSILON {
        return 0;
    }
    let max_pos = max_pos.max(0.0);
    if max_pos <= EPSILON {
        return 1;
    }

    let count = (max_pos / step).floor();
    let flush_end = (count * step - max_pos).abs() > EPSILON;
    (count as usize).saturating_add(1 + usize::from(flush_end))
}

/// Generates positions along one axis: `0, step, 2·step, …` plus the flush end.
fn axis_positions(container_len: f64, object_len: f64, step: f64) -> Vec<f64> {
    let max_pos = container_len - object_len;
    if max_pos < -EPSILON {
        return Vec::new();
    }
    let max_pos = max_pos.max(0.0);
    if max_pos <= EPSILON {
        return vec![0.0];
    }

    let count = (max_pos / step).floor() as usize;
    let mut positions: Vec<f64> = (0..=count).map(|i| i as f64 * step).collect();
    if let Some(&last) = positions.last() {
        if (last - max_pos).abs() > EPSILON {
            positions.push(max_pos);
        }
    }
    positions
}

fn update_best(best: &mut Option<(Vec3, PlacementScore)>, position: Vec3, score: PlacementScore) {
    match best {
        None => *best = Some((position, score)),
        Some((_, current)) => {
            if is_better_score(score, *current) {
                *best = Some((position, score));
            }
        }
    }
}

/// Priority: more touching faces > lower z > lower y > lower x.
fn is_better_score(new: PlacementScore, current: PlacementScore) -> bool {
    match new.touching.cmp(&current.touching) {
        Ordering::Greater => return true,
        Ordering::Less => return false,
        Ordering::Equal => {}
    }

    for (a, b) in [(new.z, current.z), (new.y, current.y), (new.x, current.x)] {
        match compare_with_epsilon(a, b) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
    }
    false
}

fn compare_with_epsilon(a: f64, b: f64) -> Ordering {
    if (a - b).abs() <= EPSILON {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}
