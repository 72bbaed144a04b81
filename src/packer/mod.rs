//! Packing strategies for placing cuboid cargo in a single container.
//!
//! Two deterministic heuristics share the geometry kernel behind one [`Packer`]
//! capability:
//! - [`GridFloorPass`]: tiles the floor with uniform cells sized from the tallest
//!   items, then stacks the rest into those cells. Fast and predictable for
//!   uniform loads such as identical pallets.
//! - [`GreedyAdjacency`]: places items one by one, largest volume first, at the
//!   best face-adjacent position, falling back to a bounded grid scan.
//!
//! Neither strategy fails: items that cannot be placed come back unfitted.

pub mod greedy;
pub mod grid;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{Container, Item, PlacedItem};
use crate::types::{Dimensional, EPSILON, Vec3};

pub use greedy::GreedyAdjacency;
pub use grid::GridFloorPass;

/// Tunables for the packing strategies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Minimum supported fraction of an item's footprint when stacked in a grid cell
    pub grid_support_ratio: f64,
    /// Minimum supported fraction for elevated placements of the greedy strategy
    pub adjacency_support_ratio: f64,
    /// Smallest step of the greedy fallback grid scan
    pub min_fallback_step: f64,
    /// Upper bound of fallback positions examined per orientation
    pub max_fallback_positions: usize,
}

impl PackingConfig {
    pub const DEFAULT_GRID_SUPPORT_RATIO: f64 = 0.6;
    pub const DEFAULT_ADJACENCY_SUPPORT_RATIO: f64 = 0.7;
    pub const DEFAULT_MIN_FALLBACK_STEP: f64 = 1.0;
    pub const DEFAULT_MAX_FALLBACK_POSITIONS: usize = 200_000;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            grid_support_ratio: Self::DEFAULT_GRID_SUPPORT_RATIO,
            adjacency_support_ratio: Self::DEFAULT_ADJACENCY_SUPPORT_RATIO,
            min_fallback_step: Self::DEFAULT_MIN_FALLBACK_STEP,
            max_fallback_positions: Self::DEFAULT_MAX_FALLBACK_POSITIONS,
        }
    }
}

/// Builder for [`PackingConfig`].
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    pub fn grid_support_ratio(mut self, ratio: f64) -> Self {
        self.config.grid_support_ratio = ratio;
        self
    }

    pub fn adjacency_support_ratio(mut self, ratio: f64) -> Self {
        self.config.adjacency_support_ratio = ratio;
        self
    }

    pub fn min_fallback_step(mut self, step: f64) -> Self {
        self.config.min_fallback_step = step;
        self
    }

    pub fn max_fallback_positions(mut self, positions: usize) -> Self {
        self.config.max_fallback_positions = positions;
        self
    }

    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Selects one of the packing strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    GridFloorPass,
    #[default]
    GreedyAdjacency,
}

impl Strategy {
    pub fn code(&self) -> &'static str {
        match self {
            Strategy::GridFloorPass => "grid_floor_pass",
            Strategy::GreedyAdjacency => "greedy_adjacency",
        }
    }

    /// Instantiates the strategy with the given tunables.
    pub fn packer(self, config: &PackingConfig) -> Box<dyn Packer + Send + Sync> {
        match self {
            Strategy::GridFloorPass => Box::new(GridFloorPass::new(config)),
            Strategy::GreedyAdjacency => Box::new(GreedyAdjacency::new(config)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "grid" | "grid_floor_pass" => Ok(Strategy::GridFloorPass),
            "greedy" | "greedy_adjacency" => Ok(Strategy::GreedyAdjacency),
            other => Err(format!("unknown packing strategy '{}'", other)),
        }
    }
}

/// Why an item ended up unfitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    InvalidContainer,
    InvalidGeometry,
    ExceedsContainer,
    NoValidPosition,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::InvalidContainer => "invalid_container",
            RejectReason::InvalidGeometry => "invalid_geometry",
            RejectReason::ExceedsContainer => "exceeds_container",
            RejectReason::NoValidPosition => "no_valid_position",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidContainer => {
                write!(f, "Container has a non-positive dimension")
            }
            RejectReason::InvalidGeometry => write!(f, "Item has a non-positive dimension"),
            RejectReason::ExceedsContainer => write!(
                f,
                "Item does not fit the container in any allowed orientation"
            ),
            RejectReason::NoValidPosition => write!(
                f,
                "No free, supported position left inside the container"
            ),
        }
    }
}

/// Events emitted while packing, so callers can visualise progress live.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// An item was placed; dimensions are in the final orientation.
    ItemPlaced {
        id: String,
        x: f64,
        y: f64,
        z: f64,
        length: f64,
        width: f64,
        height: f64,
        rotated: bool,
    },
    /// An item could not be placed.
    ItemRejected {
        id: String,
        reason_code: String,
        reason_text: String,
    },
    /// Packing finished.
    Finished { fitted: usize, unfitted: usize },
}

/// A packing strategy.
///
/// Implementations never mutate the input items and return exactly one record
/// per input item, in input order.
pub trait Packer {
    /// Stable strategy code, see [`Strategy::code`].
    fn name(&self) -> &'static str;

    /// Packs `items` into `container`, reporting every decision to `on_event`.
    fn pack_with_progress(
        &self,
        container: &Container,
        items: &[Item],
        on_event: &mut dyn FnMut(&PackEvent),
    ) -> Vec<PlacedItem>;

    fn pack(&self, container: &Container, items: &[Item]) -> Vec<PlacedItem> {
        self.pack_with_progress(container, items, &mut |_: &PackEvent| {})
    }
}

/// Bookkeeping shared by both strategies: one record per input item plus the
/// list of fitted items in placement order.
pub(crate) struct Ledger<'a> {
    records: Vec<PlacedItem>,
    placed: Vec<PlacedItem>,
    on_event: &'a mut dyn FnMut(&PackEvent),
}

impl<'a> Ledger<'a> {
    pub(crate) fn new(items: &[Item], on_event: &'a mut dyn FnMut(&PackEvent)) -> Self {
        Self {
            records: items.iter().cloned().map(PlacedItem::unfitted).collect(),
            placed: Vec::with_capacity(items.len()),
            on_event,
        }
    }

    /// Rejects everything up front for an invalid container and returns the
    /// indices of items with usable geometry otherwise.
    pub(crate) fn screen(&mut self, container: &Container) -> Vec<usize> {
        if !container.is_valid() {
            for index in 0..self.records.len() {
                self.reject(index, RejectReason::InvalidContainer);
            }
            return Vec::new();
        }

        let mut usable = Vec::with_capacity(self.records.len());
        for index in 0..self.records.len() {
            if self.records[index].item.validate_geometry().is_ok() {
                usable.push(index);
            } else {
                self.reject(index, RejectReason::InvalidGeometry);
            }
        }
        usable
    }

    pub(crate) fn placed(&self) -> &[PlacedItem] {
        &self.placed
    }

    pub(crate) fn is_fitted(&self, index: usize) -> bool {
        self.records[index].fitted
    }

    /// Records `oriented` (the item in its final orientation) at `position`.
    pub(crate) fn place(&mut self, index: usize, oriented: Item, position: Vec3) {
        let rotated = (self.records[index].item.length - oriented.length).abs() > EPSILON;
        let record = PlacedItem::fitted(oriented, position);
        (self.on_event)(&PackEvent::ItemPlaced {
            id: record.item.id.clone(),
            x: record.x,
            y: record.y,
            z: record.z,
            length: record.item.length,
            width: record.item.width,
            height: record.item.height,
            rotated,
        });
        self.placed.push(record.clone());
        self.records[index] = record;
    }

    pub(crate) fn reject(&mut self, index: usize, reason: RejectReason) {
        (self.on_event)(&PackEvent::ItemRejected {
            id: self.records[index].item.id.clone(),
            reason_code: reason.code().to_string(),
            reason_text: reason.to_string(),
        });
    }

    pub(crate) fn finish(self) -> Vec<PlacedItem> {
        let fitted = self.placed.len();
        (self.on_event)(&PackEvent::Finished {
            fitted,
            unfitted: self.records.len() - fitted,
        });
        self.records
    }
}

/// Orientations an item may take, as-given first. Square footprints and
/// non-rotatable items yield a single orientation.
pub(crate) fn orientations(item: &Item) -> Vec<Item> {
    let mut result = vec![item.clone()];
    if !item.non_rotatable && (item.length - item.width).abs() > EPSILON {
        result.push(item.yawed());
    }
    result
}

/// Whether any allowed orientation of `item` fits the empty container.
pub(crate) fn fits_container(item: &Item, container: &Container) -> bool {
    orientations(item)
        .iter()
        .any(|o| o.dimensions().fits_within(&container.dimensions()))
}

/// Checks a strategy's output against its input and the placement rules.
#[cfg(test)]
pub(crate) fn assert_valid_layout(
    container: &Container,
    items: &[Item],
    result: &[PlacedItem],
    support_ratio: f64,
) {
    assert_eq!(result.len(), items.len(), "one record per input item");
    for (input, output) in items.iter().zip(result) {
        assert_eq!(input.id, output.item.id, "records follow input order");
        assert_eq!(input.height, output.item.height, "{} was tipped over", input.id);
        let given = (input.length, input.width);
        let taken = (output.item.length, output.item.width);
        if !output.fitted || input.non_rotatable {
            assert_eq!(given, taken, "{} changed its footprint", input.id);
        } else {
            assert!(
                given == taken || given == (taken.1, taken.0),
                "{} was resized",
                input.id
            );
        }
    }
    if let Err(err) = crate::geometry::validate_layout(container, result, support_ratio) {
        panic!("invalid layout: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_codes_and_aliases() {
        assert_eq!("grid".parse::<Strategy>(), Ok(Strategy::GridFloorPass));
        assert_eq!(
            "Grid-Floor-Pass".parse::<Strategy>(),
            Ok(Strategy::GridFloorPass)
        );
        assert_eq!(
            " greedy_adjacency ".parse::<Strategy>(),
            Ok(Strategy::GreedyAdjacency)
        );
        assert!("best".parse::<Strategy>().is_err());
        assert_eq!(Strategy::default(), Strategy::GreedyAdjacency);
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&Strategy::GridFloorPass).unwrap();
        assert_eq!(json, "\"grid_floor_pass\"");
        let parsed: Strategy = serde_json::from_str("\"greedy_adjacency\"").unwrap();
        assert_eq!(parsed, Strategy::GreedyAdjacency);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = PackingConfig::builder()
            .adjacency_support_ratio(0.8)
            .max_fallback_positions(10)
            .build();
        assert_eq!(config.adjacency_support_ratio, 0.8);
        assert_eq!(config.max_fallback_positions, 10);
        assert_eq!(
            config.grid_support_ratio,
            PackingConfig::DEFAULT_GRID_SUPPORT_RATIO
        );
    }

    #[test]
    fn orientations_respect_rotation_flag_and_squares() {
        let item = Item::new("a", 48.0, 40.0, 56.0, 1.0);
        assert_eq!(orientations(&item).len(), 2);
        assert_eq!(orientations(&item.clone().non_rotatable(true)).len(), 1);
        assert_eq!(orientations(&Item::new("sq", 40.0, 40.0, 10.0, 1.0)).len(), 1);
    }

    #[test]
    fn packers_report_their_strategy_code() {
        let config = PackingConfig::default();
        for strategy in [Strategy::GridFloorPass, Strategy::GreedyAdjacency] {
            assert_eq!(strategy.packer(&config).name(), strategy.code());
        }
    }

    #[test]
    fn ledger_emits_events_in_order() {
        let items = vec![
            Item::new("a", 10.0, 10.0, 10.0, 1.0),
            Item::new("bad", 0.0, 10.0, 10.0, 1.0),
        ];
        let mut events = Vec::new();
        let mut sink = |evt: &PackEvent| events.push(evt.clone());
        let mut ledger = Ledger::new(&items, &mut sink);
        let usable = ledger.screen(&Container::new(20.0, 20.0, 20.0));
        assert_eq!(usable, vec![0]);
        ledger.place(0, items[0].clone(), Vec3::zero());
        let records = ledger.finish();

        assert!(records[0].fitted);
        assert!(!records[1].fitted);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], PackEvent::ItemRejected { id, .. } if id == "bad"));
        assert!(matches!(&events[1], PackEvent::ItemPlaced { id, rotated: false, .. } if id == "a"));
        assert_eq!(
            events[2],
            PackEvent::Finished {
                fitted: 1,
                unfitted: 1
            }
        );
    }
}
