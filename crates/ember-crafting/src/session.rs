//! Crafting session: the selection state the presentation layer drives.

use ahash::AHashMap;
use ember_common::EntityId;
use tracing::{debug, warn};

use crate::availability::{compute_available, AvailableRecipeView, ReachableStations};
use crate::catalog::{CatalogIndex, RecipeCatalog};
use crate::executor::{execute, CraftFailure, CraftOutcome};
use crate::holder::ResourceHolder;
use crate::replication::ReplicationPublisher;
use crate::resolver::{resolve, Selection};

/// Statistics tracked for crafting.
#[derive(Debug, Clone, Default)]
pub struct CraftingStats {
    /// Total result units produced.
    pub items_crafted: u64,
    /// Total crafts completed.
    pub crafts_completed: u64,
    /// Total crafts rejected.
    pub crafts_failed: u64,
    /// Crafts per catalog index.
    pub crafts_by_recipe: AHashMap<CatalogIndex, u32>,
}

impl CraftingStats {
    /// Records a completed craft.
    pub fn record_craft(&mut self, index: CatalogIndex, quantity: u32) {
        self.items_crafted += u64::from(quantity);
        self.crafts_completed += 1;
        *self.crafts_by_recipe.entry(index).or_insert(0) += 1;
    }

    /// Records a rejected craft.
    pub fn record_failure(&mut self) {
        self.crafts_failed += 1;
    }

    /// Returns the most crafted recipe and its count.
    #[must_use]
    pub fn most_crafted_recipe(&self) -> Option<(CatalogIndex, u32)> {
        self.crafts_by_recipe
            .iter()
            .max_by_key(|(index, count)| (**count, std::cmp::Reverse(**index)))
            .map(|(index, count)| (*index, *count))
    }
}

/// Selection and view state for one holder's crafting UI.
///
/// Every craft attempt, successful or not, clears the selection and drops
/// the view; the caller must [`refresh`](Self::refresh) before selecting again.
#[derive(Debug)]
pub struct CraftingSession {
    owner: EntityId,
    selection: Selection,
    view: Option<AvailableRecipeView>,
    replication: Option<ReplicationPublisher>,
    stats: CraftingStats,
}

impl CraftingSession {
    /// Creates a session for the holder owned by `owner`.
    #[must_use]
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            selection: Selection::None,
            view: None,
            replication: None,
            stats: CraftingStats::default(),
        }
    }

    /// Publishes holder snapshots after each successful craft.
    #[must_use]
    pub fn with_replication(mut self, publisher: ReplicationPublisher) -> Self {
        self.replication = Some(publisher);
        self
    }

    /// Owner of the holder this session crafts for.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Recomputes the view the presentation layer indexes into.
    ///
    /// Clears the selection: it referred to the previous view.
    pub fn refresh<H: ResourceHolder + ?Sized>(
        &mut self,
        catalog: &RecipeCatalog,
        holder: &H,
        stations: &ReachableStations,
    ) -> &AvailableRecipeView {
        self.selection = Selection::None;
        self.view.insert(compute_available(catalog, holder, stations))
    }

    /// Most recent view, if one is current.
    #[must_use]
    pub fn view(&self) -> Option<&AvailableRecipeView> {
        self.view.as_ref()
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Selects a view position; out-of-bounds or no view selects nothing.
    pub fn select(&mut self, position: usize) -> Selection {
        self.selection = match &self.view {
            Some(view) if position < view.len() => Selection::Position(position),
            _ => Selection::None,
        };
        debug!("Session {} selection -> {:?}", self.owner, self.selection);
        self.selection
    }

    /// Drops the selection and view after an outside change (inventory
    /// edited, catalog extended).
    pub fn invalidate(&mut self) {
        self.selection = Selection::None;
        self.view = None;
    }

    /// Crafts the selected recipe.
    ///
    /// A selection made against a view that no longer matches the catalog or
    /// holder is treated as no selection.
    pub fn craft_selected<H: ResourceHolder + ?Sized>(
        &mut self,
        catalog: &RecipeCatalog,
        holder: &mut H,
        stations: &ReachableStations,
    ) -> CraftOutcome {
        let selection = match &self.view {
            Some(view) if !view.is_stale(catalog, &*holder) => self.selection,
            Some(_) => {
                debug!("Session {} view went stale, dropping selection", self.owner);
                Selection::None
            },
            None => Selection::None,
        };

        let fresh = compute_available(catalog, &*holder, stations);
        let outcome = match resolve(&fresh, selection) {
            Ok(index) => match fresh.get(index.get()) {
                Some(entry) if !entry.station_reachable => {
                    Err(CraftFailure::MissingStation(entry.recipe.station))
                },
                _ => execute(catalog, index, holder).map(|result| (index, result)),
            },
            Err(e) => {
                debug!("Session {}: {}", self.owner, e);
                let position = selection.position().unwrap_or(usize::MAX);
                Err(CraftFailure::InvalidIndex(CatalogIndex::new(position)))
            },
        };

        self.invalidate();

        match outcome {
            Ok((index, result)) => {
                self.stats.record_craft(index, result.quantity);
                if let Some(publisher) = &self.replication {
                    publisher.publish(self.owner, &*holder);
                }
                Ok(result)
            },
            Err(failure) => {
                self.stats.record_failure();
                warn!("Session {} craft rejected: {}", self.owner, failure);
                Err(failure)
            },
        }
    }

    /// Crafting statistics for this session.
    #[must_use]
    pub const fn stats(&self) -> &CraftingStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::Deficiency;
    use crate::catalog::{Recipe, RecipeResult, StationType};
    use crate::holder::Inventory;
    use crate::replication::replication_channel;
    use ember_common::ResourceKind;
    use std::time::{Duration, Instant};

    const WOOD: ResourceKind = ResourceKind::new(1);
    const COAL: ResourceKind = ResourceKind::new(2);
    const GEL: ResourceKind = ResourceKind::new(3);
    const IRON_ORE: ResourceKind = ResourceKind::new(4);
    const TORCH: ResourceKind = ResourceKind::new(10);
    const IRON_BAR: ResourceKind = ResourceKind::new(11);

    fn torch_catalog() -> RecipeCatalog {
        let mut catalog = RecipeCatalog::new();
        catalog
            .register(
                Recipe::builder("Torch")
                    .ingredient(WOOD, 1)
                    .result(TORCH, 4)
                    .build()
                    .expect("valid"),
            )
            .expect("register");
        catalog
    }

    fn session() -> CraftingSession {
        CraftingSession::new(EntityId::from_raw(1))
    }

    #[test]
    fn test_craft_selected_success() {
        let catalog = torch_catalog();
        let stations = ReachableStations::new();
        let mut inv = Inventory::new(4);
        assert!(inv.add(WOOD, 1));
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        assert_eq!(session.select(0), Selection::Position(0));

        let outcome = session.craft_selected(&catalog, &mut inv, &stations);
        assert_eq!(outcome, Ok(RecipeResult::new(TORCH, 4)));
        assert_eq!(inv.quantity_of(WOOD), 0);
        assert_eq!(inv.quantity_of(TORCH), 4);
        assert_eq!(session.stats().crafts_completed, 1);
    }

    #[test]
    fn test_craft_selected_missing_ingredients() {
        let catalog = torch_catalog();
        let stations = ReachableStations::new();
        let mut inv = Inventory::new(4);
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        session.select(0);
        let outcome = session.craft_selected(&catalog, &mut inv, &stations);

        assert_eq!(
            outcome,
            Err(CraftFailure::MissingIngredients(vec![Deficiency {
                kind: WOOD,
                required: 1,
                available: 0
            }]))
        );
        assert!(inv.snapshot().is_empty());
    }

    #[test]
    fn test_selection_cleared_after_every_attempt() {
        let catalog = torch_catalog();
        let stations = ReachableStations::new();
        let mut inv = Inventory::new(4);
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        session.select(0);
        let _ = session.craft_selected(&catalog, &mut inv, &stations);
        assert_eq!(session.selection(), Selection::None);
        assert!(session.view().is_none());

        // Re-invoking without re-selecting never re-crafts.
        assert!(inv.add(WOOD, 1));
        let outcome = session.craft_selected(&catalog, &mut inv, &stations);
        assert!(matches!(outcome, Err(CraftFailure::InvalidIndex(_))));
        assert_eq!(inv.quantity_of(WOOD), 1);
    }

    #[test]
    fn test_select_out_of_bounds_or_without_view() {
        let catalog = torch_catalog();
        let mut session = session();
        assert_eq!(session.select(0), Selection::None);

        session.refresh(&catalog, &Inventory::new(4), &ReachableStations::new());
        assert_eq!(session.select(1), Selection::None);
    }

    #[test]
    fn test_twin_recipes_resolve_to_selected_index() {
        let mut catalog = RecipeCatalog::new();
        for second in [COAL, GEL] {
            catalog
                .register(
                    Recipe::builder("Torch")
                        .ingredient(WOOD, 1)
                        .ingredient(second, 1)
                        .result(TORCH, 16)
                        .build()
                        .expect("valid"),
                )
                .expect("register");
        }
        let stations = ReachableStations::new();
        let mut inv = Inventory::new(8);
        assert!(inv.add(WOOD, 2));
        assert!(inv.add(COAL, 1));
        assert!(inv.add(GEL, 1));
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        session.select(1);
        session
            .craft_selected(&catalog, &mut inv, &stations)
            .expect("craft");

        assert_eq!(inv.quantity_of(COAL), 1);
        assert_eq!(inv.quantity_of(GEL), 0);
        assert_eq!(
            session.stats().most_crafted_recipe(),
            Some((CatalogIndex::new(1), 1))
        );
    }

    #[test]
    fn test_stale_view_drops_selection() {
        let catalog = torch_catalog();
        let stations = ReachableStations::new();
        let mut inv = Inventory::new(4);
        assert!(inv.add(WOOD, 1));
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        session.select(0);
        // Inventory edited behind the session's back.
        assert!(inv.add(WOOD, 1));

        let outcome = session.craft_selected(&catalog, &mut inv, &stations);
        assert!(matches!(outcome, Err(CraftFailure::InvalidIndex(_))));
        assert_eq!(inv.quantity_of(WOOD), 2);
    }

    #[test]
    fn test_catalog_growth_drops_selection() {
        let mut catalog = torch_catalog();
        let stations = ReachableStations::new();
        let mut inv = Inventory::new(4);
        assert!(inv.add(WOOD, 1));
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        assert_eq!(session.select(0), Selection::Position(0));
        catalog
            .register(
                Recipe::builder("Big Torch")
                    .ingredient(WOOD, 1)
                    .result(TORCH, 8)
                    .build()
                    .expect("valid"),
            )
            .expect("register");

        let outcome = session.craft_selected(&catalog, &mut inv, &stations);
        assert_eq!(
            outcome,
            Err(CraftFailure::InvalidIndex(CatalogIndex::new(usize::MAX)))
        );
        assert_eq!(inv.quantity_of(WOOD), 1);
        assert_eq!(inv.quantity_of(TORCH), 0);
        assert_eq!(session.selection(), Selection::None);
    }

    #[test]
    fn test_unreachable_station_rejected() {
        let mut catalog = RecipeCatalog::new();
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
        let stations = ReachableStations::new();
        let mut inv = Inventory::new(4);
        assert!(inv.add(IRON_ORE, 3));
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        session.select(0);
        let outcome = session.craft_selected(&catalog, &mut inv, &stations);
        assert_eq!(outcome, Err(CraftFailure::MissingStation(StationType::Furnace)));
        assert_eq!(inv.quantity_of(IRON_ORE), 3);
    }

    #[test]
    fn test_holder_full_leaves_inventory_unchanged() {
        let catalog = torch_catalog();
        let stations = ReachableStations::new();
        let mut inv = Inventory::with_stack_limit(2, 99);
        assert!(inv.add(WOOD, 3));
        assert!(inv.add(COAL, 1));
        let before = inv.clone();
        let mut session = session();

        session.refresh(&catalog, &inv, &stations);
        session.select(0);
        let outcome = session.craft_selected(&catalog, &mut inv, &stations);
        assert_eq!(outcome, Err(CraftFailure::HolderFull));
        assert_eq!(inv, before);
        assert_eq!(session.stats().crafts_failed, 1);
    }

    #[test]
    fn test_success_publishes_snapshot() {
        let catalog = torch_catalog();
        let stations = ReachableStations::new();
        let (publisher, mut outbox) = replication_channel(8, Duration::ZERO);
        let mut inv = Inventory::new(4);
        assert!(inv.add(WOOD, 1));
        let mut session = session().with_replication(publisher);

        session.refresh(&catalog, &inv, &stations);
        session.select(0);
        session
            .craft_selected(&catalog, &mut inv, &stations)
            .expect("craft");

        let released = outbox.poll(Instant::now());
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].holder, session.owner());
        assert!(!released[0].full);
        assert_eq!(released[0].resources, inv.snapshot());
    }

    #[test]
    fn test_failure_publishes_nothing() {
        let catalog = torch_catalog();
        let stations = ReachableStations::new();
        let (publisher, mut outbox) = replication_channel(8, Duration::ZERO);
        let mut inv = Inventory::new(4);
        let mut session = session().with_replication(publisher);

        session.refresh(&catalog, &inv, &stations);
        session.select(0);
        assert!(session.craft_selected(&catalog, &mut inv, &stations).is_err());
        assert!(outbox.poll(Instant::now()).is_empty());
    }
}
