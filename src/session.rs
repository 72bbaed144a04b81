//! Placement session and result assembly.
//!
//! A [`PackingSession`] is a caller-owned value holding the container, the item
//! list and the last computed placement. Inputs are converted to canonical
//! units when they enter the session; the engine never sees anything else and
//! never mutates the session's items, it returns new records.

use std::collections::HashSet;

use tracing::info;

use crate::model::{Container, Item, PlacedItem, ValidationError, validate_weight};
use crate::packer::{PackEvent, PackingConfig, Strategy};
use crate::presets;
use crate::types::Dimensional;
use crate::units::{UnitSystem, cubic_cm_to_cbm};

/// Summary statistics of one packing run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, utoipa::ToSchema)]
pub struct LoadingStats {
    pub total_items: usize,
    pub fitted: usize,
    pub unfitted: usize,
    /// Fitted volume as a whole percentage of the container volume
    pub efficiency: u32,
    /// Kilograms, rounded to 2 decimals
    pub total_weight: f64,
    /// Kilograms, rounded to 2 decimals
    pub fitted_weight: f64,
    /// Cubic metres, rounded to 3 decimals
    pub used_volume_cbm: f64,
}

impl LoadingStats {
    /// Derives the statistics from canonical placements.
    pub fn compute(container: &Container, placements: &[PlacedItem]) -> Self {
        let fitted: Vec<&PlacedItem> = placements.iter().filter(|p| p.fitted).collect();
        let used_volume: f64 = fitted.iter().map(|p| p.volume()).sum();
        let container_volume = container.total_volume();
        let efficiency = if container_volume > 0.0 {
            (used_volume / container_volume * 100.0).round() as u32
        } else {
            0
        };

        Self {
            total_items: placements.len(),
            fitted: fitted.len(),
            unfitted: placements.len() - fitted.len(),
            efficiency,
            total_weight: round_to(placements.iter().map(|p| p.item.weight).sum(), 2),
            fitted_weight: round_to(fitted.iter().map(|p| p.item.weight).sum(), 2),
            used_volume_cbm: round_to(cubic_cm_to_cbm(used_volume), 3),
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Placements of one run plus their statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct PackingResult {
    pub strategy: Strategy,
    pub placements: Vec<PlacedItem>,
    pub stats: LoadingStats,
}

impl PackingResult {
    /// Builds a result from placements computed elsewhere.
    pub fn assemble(strategy: Strategy, container: &Container, placements: Vec<PlacedItem>) -> Self {
        let stats = LoadingStats::compute(container, &placements);
        Self {
            strategy,
            placements,
            stats,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stats.unfitted == 0
    }

    pub fn fitted(&self) -> impl Iterator<Item = &PlacedItem> {
        self.placements.iter().filter(|p| p.fitted)
    }

    pub fn unfitted(&self) -> impl Iterator<Item = &PlacedItem> {
        self.placements.iter().filter(|p| !p.fitted)
    }

    pub fn get(&self, id: &str) -> Option<&PlacedItem> {
        self.placements.iter().find(|p| p.id() == id)
    }
}

/// Packs `items` into `container` with the chosen strategy.
///
/// Inputs must already be in canonical units. Degenerate input never fails:
/// an invalid container yields all items unfitted and an empty list yields an
/// empty result.
///
/// # Examples
/// ```
/// use freight_fit::model::{Container, Item};
/// use freight_fit::packer::{PackingConfig, Strategy};
/// use freight_fit::session::pack;
///
/// let container = Container::new(120.0, 80.0, 60.0);
/// let items: Vec<Item> = (0..4)
///     .map(|i| Item::new(format!("p{i}"), 60.0, 40.0, 60.0, 20.0))
///     .collect();
///
/// let result = pack(&container, &items, Strategy::GridFloorPass, &PackingConfig::default());
/// assert_eq!(result.stats.fitted, 4);
/// assert_eq!(result.stats.efficiency, 100);
/// ```
pub fn pack(
    container: &Container,
    items: &[Item],
    strategy: Strategy,
    config: &PackingConfig,
) -> PackingResult {
    pack_with_progress(container, items, strategy, config, &mut |_: &PackEvent| {})
}

/// Like [`pack`], reporting each placement decision to `on_event`.
pub fn pack_with_progress(
    container: &Container,
    items: &[Item],
    strategy: Strategy,
    config: &PackingConfig,
    on_event: &mut dyn FnMut(&PackEvent),
) -> PackingResult {
    let placements = strategy
        .packer(config)
        .pack_with_progress(container, items, on_event);
    let result = PackingResult::assemble(strategy, container, placements);
    info!(
        strategy = %strategy,
        fitted = result.stats.fitted,
        unfitted = result.stats.unfitted,
        efficiency = result.stats.efficiency,
        "packing finished"
    );
    result
}

/// One item line as entered by a user, in the session's units.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub quantity: u32,
    pub non_stackable: bool,
    pub non_rotatable: bool,
}

impl ItemInput {
    pub fn new(length: f64, width: f64, height: f64, weight: f64) -> Self {
        Self {
            id: None,
            name: None,
            length,
            width,
            height,
            weight,
            quantity: 1,
            non_stackable: false,
            non_rotatable: false,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn non_stackable(mut self, value: bool) -> Self {
        self.non_stackable = value;
        self
    }

    pub fn non_rotatable(mut self, value: bool) -> Self {
        self.non_rotatable = value;
        self
    }
}

#[derive(Clone, Debug)]
struct SessionEntry {
    item: Item,
    name: String,
}

/// Caller-owned packing state: container, items and the last result.
#[derive(Clone, Debug)]
pub struct PackingSession {
    units: UnitSystem,
    container: Container,
    entries: Vec<SessionEntry>,
    strategy: Strategy,
    config: PackingConfig,
    next_seq: usize,
    last: Option<PackingResult>,
}

impl PackingSession {
    /// Creates a session for a container given in `units`.
    pub fn new(units: UnitSystem, length: f64, width: f64, height: f64) -> Self {
        Self {
            units,
            container: Self::convert_container(units, length, width, height),
            entries: Vec::new(),
            strategy: Strategy::default(),
            config: PackingConfig::default(),
            next_seq: 1,
            last: None,
        }
    }

    /// Creates a session for a catalog container.
    pub fn from_preset(units: UnitSystem, key: &str) -> Result<Self, ValidationError> {
        let preset = presets::find(key)?;
        let mut session = Self::new(units, 0.0, 0.0, 0.0);
        session.container = preset.to_container();
        Ok(session)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self.last = None;
        self
    }

    pub fn with_config(mut self, config: PackingConfig) -> Self {
        self.config = config;
        self.last = None;
        self
    }

    fn convert_container(units: UnitSystem, length: f64, width: f64, height: f64) -> Container {
        Container::new(
            units.length_to_canonical(length),
            units.length_to_canonical(width),
            units.length_to_canonical(height),
        )
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The container in canonical units.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// The items in canonical units, in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.entries.iter().map(|e| &e.item)
    }

    pub fn item_count(&self) -> usize {
        self.entries.len()
    }

    /// Items paired with their display names, in insertion order.
    pub fn named_items(&self) -> impl Iterator<Item = (&Item, &str)> {
        self.entries.iter().map(|e| (&e.item, e.name.as_str()))
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.item.id == id)
            .map(|e| e.name.as_str())
    }

    /// Replaces the container (given in the session's units).
    pub fn set_container(&mut self, length: f64, width: f64, height: f64) {
        self.container = Self::convert_container(self.units, length, width, height);
        self.last = None;
    }

    /// Adds one input line, expanding its quantity into individual items.
    ///
    /// Returns the ids of the new items. With a quantity above one the ids are
    /// `"{id}#{n}"` and the names `"{name} #{n}"`, counting from 1. Dimensions are
    /// not checked here: degenerate items are reported unfitted by the engine.
    pub fn add_items(&mut self, input: ItemInput) -> Result<Vec<String>, ValidationError> {
        if input.quantity == 0 {
            return Err(ValidationError::InvalidQuantity(
                "Quantity must be at least 1".to_string(),
            ));
        }
        validate_weight(input.weight)?;

        let base_id = match input.id {
            Some(ref id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => format!("item-{}", self.next_seq),
        };
        let base_name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Item")
            .to_string();

        let expanded: Vec<(String, String)> = if input.quantity == 1 {
            vec![(base_id, base_name)]
        } else {
            (1..=input.quantity)
                .map(|n| (format!("{base_id}#{n}"), format!("{base_name} #{n}")))
                .collect()
        };

        let mut taken: HashSet<&str> = self.entries.iter().map(|e| e.item.id.as_str()).collect();
        for (id, _) in &expanded {
            if !taken.insert(id.as_str()) {
                return Err(ValidationError::DuplicateId(id.clone()));
            }
        }

        let units = self.units;
        let new_entries: Vec<SessionEntry> = expanded
            .into_iter()
            .map(|(id, name)| SessionEntry {
                item: Item {
                    id,
                    length: units.length_to_canonical(input.length),
                    width: units.length_to_canonical(input.width),
                    height: units.length_to_canonical(input.height),
                    weight: units.weight_to_canonical(input.weight),
                    non_stackable: input.non_stackable,
                    non_rotatable: input.non_rotatable,
                },
                name,
            })
            .collect();
        let ids = new_entries.iter().map(|e| e.item.id.clone()).collect();

        self.entries.extend(new_entries);
        self.next_seq += 1;
        self.last = None;
        Ok(ids)
    }

    /// Removes an item by id; returns whether it existed.
    pub fn remove_item(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.item.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.last = None;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last = None;
    }

    /// Runs the configured strategy over the current items and caches the result.
    ///
    /// Every call is a full re-pack; adding items can move previously fitted ones.
    pub fn repack(&mut self) -> &PackingResult {
        self.repack_with_progress(&mut |_: &PackEvent| {})
    }

    pub fn repack_with_progress(&mut self, on_event: &mut dyn FnMut(&PackEvent)) -> &PackingResult {
        let items: Vec<Item> = self.items().cloned().collect();
        let result = pack_with_progress(&self.container, &items, self.strategy, &self.config, on_event);
        self.last.insert(result)
    }

    /// Stores placements produced outside the local engine (e.g. a remote service).
    pub fn adopt(&mut self, placements: Vec<PlacedItem>) -> &PackingResult {
        let result = PackingResult::assemble(self.strategy, &self.container, placements);
        self.last.insert(result)
    }

    pub fn last_result(&self) -> Option<&PackingResult> {
        self.last.as_ref()
    }
}
