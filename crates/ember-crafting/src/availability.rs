//! Availability evaluation.
//!
//! The view produced here is always in catalog order, so a position in the
//! view is the catalog index of the recipe shown there.

use ember_common::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{CatalogIndex, Recipe, RecipeCatalog, StationType};
use crate::holder::ResourceHolder;

/// An ingredient the holder is short of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deficiency {
    /// Resource that is short
    pub kind: ResourceKind,
    /// Total quantity the recipe needs
    pub required: u32,
    /// Quantity the holder has
    pub available: u32,
}

impl Deficiency {
    /// How many more are needed.
    #[must_use]
    pub const fn missing(&self) -> u32 {
        self.required.saturating_sub(self.available)
    }
}

/// Every aggregated requirement of `recipe` that `holder` cannot cover.
#[must_use]
pub fn deficiencies<H: ResourceHolder + ?Sized>(recipe: &Recipe, holder: &H) -> Vec<Deficiency> {
    recipe
        .requirements()
        .into_iter()
        .filter_map(|req| {
            let available = holder.quantity_of(req.kind);
            (available < req.quantity).then_some(Deficiency {
                kind: req.kind,
                required: req.quantity,
                available,
            })
        })
        .collect()
}

/// Stations currently within reach of the holder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachableStations {
    stations: HashSet<StationType>,
}

impl ReachableStations {
    /// No stations in reach (hand crafting only).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a station as reachable.
    pub fn insert(&mut self, station: StationType) -> bool {
        station != StationType::None && self.stations.insert(station)
    }

    /// Marks a station as out of reach.
    pub fn remove(&mut self, station: StationType) -> bool {
        self.stations.remove(&station)
    }

    /// Whether `requirement` is met. Hand crafting is always met.
    #[must_use]
    pub fn satisfies(&self, requirement: StationType) -> bool {
        requirement == StationType::None || self.stations.contains(&requirement)
    }

    /// Iterates reachable stations.
    pub fn iter(&self) -> impl Iterator<Item = StationType> + '_ {
        self.stations.iter().copied()
    }
}

impl FromIterator<StationType> for ReachableStations {
    fn from_iter<T: IntoIterator<Item = StationType>>(iter: T) -> Self {
        let mut stations = Self::new();
        for station in iter {
            stations.insert(station);
        }
        stations
    }
}

/// One row of an [`AvailableRecipeView`].
#[derive(Debug, Clone)]
pub struct AvailableRecipe {
    /// Catalog identity of the recipe
    pub index: CatalogIndex,
    /// The recipe itself
    pub recipe: Arc<Recipe>,
    /// Station in reach and every ingredient covered
    pub is_available: bool,
    /// Whether the required station is in reach
    pub station_reachable: bool,
    /// Ingredients the holder is short of
    pub deficiencies: Vec<Deficiency>,
}

/// Catalog and holder state a view was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewStamp {
    /// Catalog length at computation time
    pub catalog_len: usize,
    /// Holder revision at computation time
    pub holder_revision: u64,
}

/// Catalog-ordered snapshot of which recipes are craftable right now.
#[derive(Debug, Clone)]
pub struct AvailableRecipeView {
    entries: Vec<AvailableRecipe>,
    stamp: ViewStamp,
}

impl AvailableRecipeView {
    /// Rows in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[AvailableRecipe] {
        &self.entries
    }

    /// Row at a view position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&AvailableRecipe> {
        self.entries.get(position)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the view has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows that can be crafted now.
    pub fn iter_available(&self) -> impl Iterator<Item = &AvailableRecipe> {
        self.entries.iter().filter(|e| e.is_available)
    }

    /// Number of craftable rows.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.iter_available().count()
    }

    /// State this view was computed from.
    #[must_use]
    pub const fn stamp(&self) -> ViewStamp {
        self.stamp
    }

    /// True if the catalog or holder changed since this view was computed.
    #[must_use]
    pub fn is_stale<H: ResourceHolder + ?Sized>(&self, catalog: &RecipeCatalog, holder: &H) -> bool {
        self.stamp
            != ViewStamp {
                catalog_len: catalog.len(),
                holder_revision: holder.revision(),
            }
    }
}

/// Evaluates every catalog recipe against `holder` and `stations`.
pub fn compute_available<H: ResourceHolder + ?Sized>(
    catalog: &RecipeCatalog,
    holder: &H,
    stations: &ReachableStations,
) -> AvailableRecipeView {
    let entries: Vec<_> = catalog
        .iter()
        .map(|(index, recipe)| {
            let station_reachable = stations.satisfies(recipe.station);
            let deficiencies = deficiencies(recipe, holder);
            AvailableRecipe {
                index,
                recipe: Arc::clone(recipe),
                is_available: station_reachable && deficiencies.is_empty(),
                station_reachable,
                deficiencies,
            }
        })
        .collect();

    let view = AvailableRecipeView {
        entries,
        stamp: ViewStamp {
            catalog_len: catalog.len(),
            holder_revision: holder.revision(),
        },
    };
    debug!(
        "Computed availability: {}/{} recipes craftable",
        view.available_count(),
        view.len()
    );
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::Inventory;

    const WOOD: ResourceKind = ResourceKind::new(1);
    const COAL: ResourceKind = ResourceKind::new(2);
    const IRON_ORE: ResourceKind = ResourceKind::new(3);
    const TORCH: ResourceKind = ResourceKind::new(10);
    const IRON_BAR: ResourceKind = ResourceKind::new(11);

    fn test_catalog() -> RecipeCatalog {
        let mut catalog = RecipeCatalog::new();
        catalog
            .register(
                Recipe::builder("Torch")
                    .ingredient(WOOD, 1)
                    .ingredient(COAL, 1)
                    .result(TORCH, 16)
                    .build()
                    .expect("valid"),
            )
            .expect("register");
        catalog
            .register(
                Recipe::builder("Iron Bar")
                    .ingredient(IRON_ORE, 3)
                    .result(IRON_BAR, 1)
                    .station(StationType::Furnace)
                    .build()
                    .expect("valid"),
            )
            .expect("register");
        catalog
    }

    #[test]
    fn test_view_follows_catalog_order() {
        let catalog = test_catalog();
        let view = compute_available(&catalog, &Inventory::new(8), &ReachableStations::new());

        assert_eq!(view.len(), 2);
        for (position, entry) in view.entries().iter().enumerate() {
            assert_eq!(entry.index.get(), position);
        }
        assert_eq!(view.available_count(), 0);
    }

    #[test]
    fn test_available_when_ingredients_present() {
        let catalog = test_catalog();
        let mut inv = Inventory::new(8);
        assert!(inv.add(WOOD, 1));
        assert!(inv.add(COAL, 1));

        let view = compute_available(&catalog, &inv, &ReachableStations::new());
        let torch = view.get(0).expect("row");
        assert!(torch.is_available);
        assert!(torch.deficiencies.is_empty());
    }

    #[test]
    fn test_station_gates_availability() {
        let catalog = test_catalog();
        let mut inv = Inventory::new(8);
        assert!(inv.add(IRON_ORE, 3));

        let view = compute_available(&catalog, &inv, &ReachableStations::new());
        let bar = view.get(1).expect("row");
        assert!(!bar.is_available);
        assert!(!bar.station_reachable);
        assert!(bar.deficiencies.is_empty());

        let stations: ReachableStations = [StationType::Furnace].into_iter().collect();
        let view = compute_available(&catalog, &inv, &stations);
        assert!(view.get(1).expect("row").is_available);
    }

    #[test]
    fn test_deficiencies_list_every_shortfall() {
        let catalog = test_catalog();
        let view = compute_available(&catalog, &Inventory::new(8), &ReachableStations::new());

        let torch = view.get(0).expect("row");
        assert_eq!(
            torch.deficiencies,
            vec![
                Deficiency {
                    kind: WOOD,
                    required: 1,
                    available: 0
                },
                Deficiency {
                    kind: COAL,
                    required: 1,
                    available: 0
                },
            ]
        );
        assert_eq!(torch.deficiencies[0].missing(), 1);
    }

    #[test]
    fn test_none_station_always_reachable() {
        let mut stations = ReachableStations::new();
        assert!(stations.satisfies(StationType::None));
        assert!(!stations.insert(StationType::None));
        assert!(!stations.satisfies(StationType::Anvil));
        assert!(stations.insert(StationType::Anvil));
        assert!(stations.satisfies(StationType::Anvil));
        assert!(stations.remove(StationType::Anvil));
        assert!(!stations.satisfies(StationType::Anvil));
    }

    #[test]
    fn test_stale_after_holder_or_catalog_change() {
        let mut catalog = test_catalog();
        let mut inv = Inventory::new(8);
        let view = compute_available(&catalog, &inv, &ReachableStations::new());
        assert!(!view.is_stale(&catalog, &inv));

        assert!(inv.add(WOOD, 1));
        assert!(view.is_stale(&catalog, &inv));

        let view = compute_available(&catalog, &inv, &ReachableStations::new());
        catalog
            .register(
                Recipe::builder("Campfire")
                    .ingredient(WOOD, 10)
                    .result(ResourceKind::new(12), 1)
                    .build()
                    .expect("valid"),
            )
            .expect("register");
        assert!(view.is_stale(&catalog, &inv));
    }
}
