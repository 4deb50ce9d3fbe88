//! Recipe catalog: the single source of truth for recipe identity.
//!
//! A recipe is identified only by its [`CatalogIndex`]. Two recipes may share
//! a result and ingredient list (alternate torch recipes, for example) and
//! must stay distinguishable, so [`Recipe`] intentionally has no equality.

use ahash::AHashMap;
use ember_common::ResourceKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised when a recipe definition is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Recipe lists no ingredients
    #[error("Recipe '{0}' has no ingredients")]
    NoIngredients(String),
    /// An ingredient asks for zero of a resource
    #[error("Recipe '{recipe}' ingredient {kind} has zero quantity")]
    ZeroIngredient {
        /// Recipe name
        recipe: String,
        /// Offending resource
        kind: ResourceKind,
    },
    /// Recipe produces nothing
    #[error("Recipe '{0}' has zero result quantity")]
    ZeroResult(String),
    /// Builder finished without a result
    #[error("Recipe '{0}' has no result")]
    MissingResult(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Stable position of a recipe in the [`RecipeCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogIndex(usize);

impl CatalogIndex {
    /// Creates a catalog index from a raw position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for CatalogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Crafting station a recipe needs nearby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StationType {
    /// No station required (hand crafting).
    #[default]
    None,
    /// Basic work bench.
    Workbench,
    /// Furnace for smelting.
    Furnace,
    /// Anvil for smithing.
    Anvil,
    /// Sawmill for wood processing.
    Sawmill,
    /// Loom for cloth.
    Loom,
    /// Cooking station.
    CookingPot,
    /// Alchemy table for potions.
    AlchemyTable,
}

impl StationType {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "Hand Crafting",
            Self::Workbench => "Workbench",
            Self::Furnace => "Furnace",
            Self::Anvil => "Anvil",
            Self::Sawmill => "Sawmill",
            Self::Loom => "Loom",
            Self::CookingPot => "Cooking Pot",
            Self::AlchemyTable => "Alchemy Table",
        }
    }

    /// Stable lowercase key used in recipe files and configuration.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Workbench => "workbench",
            Self::Furnace => "furnace",
            Self::Anvil => "anvil",
            Self::Sawmill => "sawmill",
            Self::Loom => "loom",
            Self::CookingPot => "cooking_pot",
            Self::AlchemyTable => "alchemy_table",
        }
    }

    /// Parses a station key (case-insensitive).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::all().iter().copied().find(|s| s.key() == key)
    }

    /// All station types, sentinel first.
    #[must_use]
    pub fn all() -> &'static [StationType] {
        &[
            Self::None,
            Self::Workbench,
            Self::Furnace,
            Self::Anvil,
            Self::Sawmill,
            Self::Loom,
            Self::CookingPot,
            Self::AlchemyTable,
        ]
    }
}

/// A resource and how much of it a recipe consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRequirement {
    /// Resource consumed.
    pub kind: ResourceKind,
    /// Quantity consumed (at least 1).
    pub quantity: u32,
}

impl IngredientRequirement {
    /// Creates a new ingredient requirement.
    #[must_use]
    pub const fn new(kind: ResourceKind, quantity: u32) -> Self {
        Self { kind, quantity }
    }
}

/// What a recipe produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeResult {
    /// Resource produced.
    pub kind: ResourceKind,
    /// Quantity produced (at least 1).
    pub quantity: u32,
}

impl RecipeResult {
    /// Creates a new recipe result.
    #[must_use]
    pub const fn new(kind: ResourceKind, quantity: u32) -> Self {
        Self { kind, quantity }
    }
}

/// An immutable crafting recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Display name (never used as identity).
    pub name: String,
    /// Output resource and quantity.
    pub result: RecipeResult,
    /// Consumed ingredients, in definition order.
    pub ingredients: Vec<IngredientRequirement>,
    /// Station that must be reachable.
    pub station: StationType,
}

impl Recipe {
    /// Creates a new recipe builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RecipeBuilder {
        RecipeBuilder::new(name)
    }

    /// Ingredient totals per resource, in first-appearance order.
    ///
    /// A recipe that lists the same resource twice needs the sum of both.
    #[must_use]
    pub fn requirements(&self) -> Vec<IngredientRequirement> {
        let mut totals: Vec<IngredientRequirement> = Vec::with_capacity(self.ingredients.len());
        for ingredient in &self.ingredients {
            match totals.iter_mut().find(|t| t.kind == ingredient.kind) {
                Some(total) => total.quantity = total.quantity.saturating_add(ingredient.quantity),
                None => totals.push(*ingredient),
            }
        }
        totals
    }

    /// Checks the catalog invariants for this recipe.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.ingredients.is_empty() {
            return Err(CatalogError::NoIngredients(self.name.clone()));
        }
        if let Some(zero) = self.ingredients.iter().find(|i| i.quantity == 0) {
            return Err(CatalogError::ZeroIngredient {
                recipe: self.name.clone(),
                kind: zero.kind,
            });
        }
        if self.result.quantity == 0 {
            return Err(CatalogError::ZeroResult(self.name.clone()));
        }
        Ok(())
    }
}

/// Builder for creating recipes.
#[derive(Debug)]
pub struct RecipeBuilder {
    name: String,
    ingredients: Vec<IngredientRequirement>,
    result: Option<RecipeResult>,
    station: StationType,
}

impl RecipeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingredients: Vec::new(),
            result: None,
            station: StationType::None,
        }
    }

    /// Adds an ingredient requirement.
    #[must_use]
    pub fn ingredient(mut self, kind: ResourceKind, quantity: u32) -> Self {
        self.ingredients
            .push(IngredientRequirement::new(kind, quantity));
        self
    }

    /// Sets the result resource and quantity.
    #[must_use]
    pub fn result(mut self, kind: ResourceKind, quantity: u32) -> Self {
        self.result = Some(RecipeResult::new(kind, quantity));
        self
    }

    /// Sets the required station.
    #[must_use]
    pub const fn station(mut self, station: StationType) -> Self {
        self.station = station;
        self
    }

    /// Builds and validates the recipe.
    pub fn build(self) -> CatalogResult<Recipe> {
        let result = self
            .result
            .ok_or_else(|| CatalogError::MissingResult(self.name.clone()))?;
        let recipe = Recipe {
            name: self.name,
            result,
            ingredients: self.ingredients,
            station: self.station,
        };
        recipe.validate()?;
        Ok(recipe)
    }
}

/// Append-only, ordered list of recipes.
///
/// There is no removal: once registered, a recipe keeps its index forever.
#[derive(Debug, Default)]
pub struct RecipeCatalog {
    recipes: Vec<Arc<Recipe>>,
    by_result: AHashMap<ResourceKind, Vec<CatalogIndex>>,
    by_station: AHashMap<StationType, Vec<CatalogIndex>>,
}

impl RecipeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a recipe and returns its permanent index.
    pub fn register(&mut self, recipe: Recipe) -> CatalogResult<CatalogIndex> {
        recipe.validate()?;

        let index = CatalogIndex::new(self.recipes.len());
        self.by_result
            .entry(recipe.result.kind)
            .or_default()
            .push(index);
        self.by_station.entry(recipe.station).or_default().push(index);
        self.recipes.push(Arc::new(recipe));

        Ok(index)
    }

    /// Gets a recipe by catalog index.
    #[must_use]
    pub fn get(&self, index: CatalogIndex) -> Option<&Arc<Recipe>> {
        self.recipes.get(index.get())
    }

    /// All recipes in catalog order.
    #[must_use]
    pub fn all(&self) -> &[Arc<Recipe>] {
        &self.recipes
    }

    /// Iterates `(index, recipe)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (CatalogIndex, &Arc<Recipe>)> {
        self.recipes
            .iter()
            .enumerate()
            .map(|(i, r)| (CatalogIndex::new(i), r))
    }

    /// Indices of recipes producing `kind`, in catalog order.
    #[must_use]
    pub fn by_result(&self, kind: ResourceKind) -> &[CatalogIndex] {
        self.by_result
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Indices of recipes crafted at `station`, in catalog order.
    #[must_use]
    pub fn by_station(&self, station: StationType) -> &[CatalogIndex] {
        self.by_station
            .get(&station)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of registered recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Returns true if no recipe is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WOOD: ResourceKind = ResourceKind::new(1);
    const COAL: ResourceKind = ResourceKind::new(2);
    const GEL: ResourceKind = ResourceKind::new(3);
    const TORCH: ResourceKind = ResourceKind::new(10);

    fn torch_from(second: ResourceKind) -> Recipe {
        Recipe::builder("Torch")
            .ingredient(WOOD, 1)
            .ingredient(second, 1)
            .result(TORCH, 16)
            .build()
            .expect("valid recipe")
    }

    #[test]
    fn test_register_assigns_sequential_indices() {
        let mut catalog = RecipeCatalog::new();
        let a = catalog.register(torch_from(COAL)).expect("register");
        let b = catalog.register(torch_from(GEL)).expect("register");

        assert_eq!(a, CatalogIndex::new(0));
        assert_eq!(b, CatalogIndex::new(1));
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get(b).expect("recipe").ingredients[1].kind,
            GEL
        );
    }

    #[test]
    fn test_identical_recipes_stay_distinct() {
        let mut catalog = RecipeCatalog::new();
        let a = catalog.register(torch_from(COAL)).expect("register");
        let b = catalog.register(torch_from(COAL)).expect("register");
        assert_ne!(a, b);
        assert_eq!(catalog.by_result(TORCH), &[a, b]);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let catalog = RecipeCatalog::new();
        assert!(catalog.get(CatalogIndex::new(0)).is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid() {
        let empty = Recipe::builder("Nothing").result(TORCH, 1).build();
        assert!(matches!(empty, Err(CatalogError::NoIngredients(_))));

        let zero = Recipe::builder("Free")
            .ingredient(WOOD, 0)
            .result(TORCH, 1)
            .build();
        assert!(matches!(zero, Err(CatalogError::ZeroIngredient { kind, .. }) if kind == WOOD));

        let no_result = Recipe::builder("Void").ingredient(WOOD, 1).build();
        assert!(matches!(no_result, Err(CatalogError::MissingResult(_))));

        let zero_result = Recipe::builder("Void").ingredient(WOOD, 1).result(TORCH, 0).build();
        assert!(matches!(zero_result, Err(CatalogError::ZeroResult(_))));
    }

    #[test]
    fn test_register_rejects_hand_built_invalid_recipe() {
        let mut catalog = RecipeCatalog::new();
        let recipe = Recipe {
            name: "Broken".to_string(),
            result: RecipeResult::new(TORCH, 1),
            ingredients: Vec::new(),
            station: StationType::None,
        };
        assert!(catalog.register(recipe).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_requirements_aggregate_duplicates() {
        let recipe = Recipe::builder("Double Wood")
            .ingredient(WOOD, 1)
            .ingredient(COAL, 2)
            .ingredient(WOOD, 3)
            .result(TORCH, 1)
            .build()
            .expect("valid");

        let totals = recipe.requirements();
        assert_eq!(
            totals,
            vec![
                IngredientRequirement::new(WOOD, 4),
                IngredientRequirement::new(COAL, 2)
            ]
        );
    }

    #[test]
    fn test_by_station_index() {
        let mut catalog = RecipeCatalog::new();
        catalog.register(torch_from(COAL)).expect("register");
        let bar = catalog
            .register(
                Recipe::builder("Iron Bar")
                    .ingredient(ResourceKind::new(20), 3)
                    .result(ResourceKind::new(21), 1)
                    .station(StationType::Furnace)
                    .build()
                    .expect("valid"),
            )
            .expect("register");

        assert_eq!(catalog.by_station(StationType::Furnace), &[bar]);
        assert_eq!(catalog.by_station(StationType::None).len(), 1);
        assert!(catalog.by_station(StationType::Loom).is_empty());
    }

    #[test]
    fn test_station_keys_round_trip() {
        for station in StationType::all() {
            assert_eq!(StationType::from_key(station.key()), Some(*station));
        }
        assert_eq!(StationType::from_key(" Furnace "), Some(StationType::Furnace));
        assert_eq!(StationType::from_key("forge"), None);
    }
}
