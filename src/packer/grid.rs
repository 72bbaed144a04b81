//! Grid floor-pass packing.
//!
//! The floor is tiled with uniform cells sized from the footprint of the
//! tallest items. Pass 1 puts the tallest items on the floor, one per cell;
//! pass 2 stacks everything else into the cells, tallest first. Every item in
//! a cell shares the cell's back-left corner, so a stack is supported by the
//! item directly below it.

use std::cmp::Ordering;

use tracing::debug;

use crate::geometry::{in_bounds, rests_on_non_stackable, support_area};
use crate::model::{Container, Item, PlacedItem};
use crate::packer::{
    Ledger, PackEvent, Packer, PackingConfig, RejectReason, fits_container, orientations,
};
use crate::types::{BoundingBox, Dimensional, EPSILON, Vec3};

/// Fast, predictable strategy for largely uniform loads.
#[derive(Clone, Copy, Debug)]
pub struct GridFloorPass {
    support_ratio: f64,
}

impl GridFloorPass {
    pub fn new(config: &PackingConfig) -> Self {
        Self {
            support_ratio: config.grid_support_ratio,
        }
    }
}

impl Default for GridFloorPass {
    fn default() -> Self {
        Self::new(&PackingConfig::default())
    }
}

/// One floor cell with its running stack height.
#[derive(Clone, Debug)]
struct Cell {
    x: f64,
    y: f64,
    length: f64,
    width: f64,
    used_height: f64,
    stacked: usize,
}

impl Cell {
    fn is_empty(&self) -> bool {
        self.stacked == 0
    }

    /// Returns the orientation of `item` that can go on top of this cell, if any.
    fn accepts(
        &self,
        item: &Item,
        container: &Container,
        placed: &[PlacedItem],
        support_ratio: f64,
    ) -> Option<Item> {
        let corner = Vec3::new(self.x, self.y, self.used_height);

        orientations(item).into_iter().find(|oriented| {
            if oriented.length > self.length + EPSILON || oriented.width > self.width + EPSILON {
                return false;
            }
            let candidate = BoundingBox::from_position_and_dims(corner, oriented.dimensions());
            if !in_bounds(&candidate, container) {
                return false;
            }
            if self.is_empty() {
                return true;
            }
            !oriented.non_stackable
                && !rests_on_non_stackable(&candidate, placed)
                && support_area(&candidate, placed) + EPSILON >= support_ratio * oriented.footprint()
        })
    }

    fn stack(&mut self, oriented: &Item) -> Vec3 {
        let position = Vec3::new(self.x, self.y, self.used_height);
        self.used_height += oriented.height;
        self.stacked += 1;
        position
    }
}

/// Chooses the yaw of the base footprint that tiles the most whole cells.
///
/// Ties keep the as-given orientation. A grid larger than `max_cells` (or one
/// whose size overflows) is cut to its first `max_cells` cells in scan order;
/// with one item per empty cell at most that many are ever used.
fn build_cells(base: &Item, container: &Container, max_cells: usize) -> Vec<Cell> {
    let mut best: Option<(usize, usize, Item)> = None;

    for footprint in orientations(base) {
        let n_length = ((container.length + EPSILON) / footprint.length).floor() as usize;
        let n_width = ((container.width + EPSILON) / footprint.width).floor() as usize;
        let capacity = n_length.checked_mul(n_width).unwrap_or(usize::MAX);
        if best.as_ref().is_none_or(|(cap, _, _)| capacity > *cap) {
            best = Some((capacity, n_length, footprint));
        }
    }

    let Some((capacity, n_length, footprint)) = best else {
        return Vec::new();
    };
    debug!(
        capacity,
        cell_length = footprint.length,
        cell_width = footprint.width,
        "floor grid chosen"
    );

    (0..capacity.min(max_cells))
        .map(|k| Cell {
            x: (k % n_length) as f64 * footprint.length,
            y: (k / n_length) as f64 * footprint.width,
            length: footprint.length,
            width: footprint.width,
            used_height: 0.0,
            stacked: 0,
        })
        .collect()
}

fn by_footprint_desc(a: &Item, b: &Item) -> Ordering {
    b.footprint()
        .partial_cmp(&a.footprint())
        .unwrap_or(Ordering::Equal)
}

impl Packer for GridFloorPass {
    fn name(&self) -> &'static str {
        "grid_floor_pass"
    }

    fn pack_with_progress(
        &self,
        container: &Container,
        items: &[Item],
        on_event: &mut dyn FnMut(&PackEvent),
    ) -> Vec<PlacedItem> {
        let mut ledger = Ledger::new(items, on_event);
        let usable = ledger.screen(container);

        let tallest = usable
            .iter()
            .map(|&i| items[i].height)
            .fold(f64::NEG_INFINITY, f64::max);
        let tall_set: Vec<usize> = usable
            .iter()
            .copied()
            .filter(|&i| (items[i].height - tallest).abs() <= EPSILON)
            .collect();

        let mut cells = match tall_set.first() {
            Some(&base) => build_cells(&items[base], container, usable.len()),
            None => Vec::new(),
        };

        // Pass 1: tallest items on the floor, one per cell
        let mut floor_order = tall_set;
        floor_order.sort_by(|&a, &b| by_footprint_desc(&items[a], &items[b]));
        for index in floor_order {
            let slot = cells.iter().enumerate().find_map(|(ci, cell)| {
                if !cell.is_empty() {
                    return None;
                }
                cell.accepts(&items[index], container, ledger.placed(), self.support_ratio)
                    .map(|oriented| (ci, oriented))
            });
            match slot {
                Some((ci, oriented)) => {
                    let position = cells[ci].stack(&oriented);
                    ledger.place(index, oriented, position);
                }
                None if cells.iter().all(|c| !c.is_empty()) => break,
                None => {}
            }
        }

        // Pass 2: stack the rest, tallest then largest footprint first
        let mut remaining: Vec<usize> = usable
            .iter()
            .copied()
            .filter(|&i| !ledger.is_fitted(i))
            .collect();
        remaining.sort_by(|&a, &b| {
            items[b]
                .height
                .partial_cmp(&items[a].height)
                .unwrap_or(Ordering::Equal)
                .then_with(|| by_footprint_desc(&items[a], &items[b]))
        });

        for index in remaining {
            let slot = cells.iter().enumerate().find_map(|(ci, cell)| {
                cell.accepts(&items[index], container, ledger.placed(), self.support_ratio)
                    .map(|oriented| (ci, oriented))
            });
            match slot {
                Some((ci, oriented)) => {
                    let position = cells[ci].stack(&oriented);
                    ledger.place(index, oriented, position);
                }
                None if !fits_container(&items[index], container) => {
                    ledger.reject(index, RejectReason::ExceedsContainer)
                }
                None => ledger.reject(index, RejectReason::NoValidPosition),
            }
        }

        ledger.finish()
    }
}
