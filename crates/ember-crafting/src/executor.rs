//! Transactional crafting.
//!
//! A craft either removes every ingredient and adds the result, or leaves the
//! holder exactly as it was.

use ember_common::ResourceKind;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::availability::{deficiencies, Deficiency};
use crate::catalog::{CatalogIndex, RecipeCatalog, RecipeResult, StationType};
use crate::holder::ResourceHolder;

/// Why a craft was rejected. The holder is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftFailure {
    /// Index does not name a catalog recipe
    #[error("Invalid recipe index {0}")]
    InvalidIndex(CatalogIndex),
    /// One or more ingredients are short
    #[error("Missing {} ingredient(s)", .0.len())]
    MissingIngredients(Vec<Deficiency>),
    /// Required station is not in reach
    #[error("Requires {}", .0.display_name())]
    MissingStation(StationType),
    /// No room for the result
    #[error("Inventory is full")]
    HolderFull,
}

/// Result of a craft attempt.
pub type CraftOutcome = Result<RecipeResult, CraftFailure>;

/// Crafts the recipe at `index` out of `holder`.
///
/// Ingredient sufficiency is re-checked against the holder here; whatever view
/// the caller looked at may be stale. If the result cannot be added, the
/// removed ingredients are put back before returning [`CraftFailure::HolderFull`].
pub fn execute<H: ResourceHolder + ?Sized>(
    catalog: &RecipeCatalog,
    index: CatalogIndex,
    holder: &mut H,
) -> CraftOutcome {
    let recipe = catalog
        .get(index)
        .ok_or(CraftFailure::InvalidIndex(index))?;

    let missing = deficiencies(recipe, holder);
    if !missing.is_empty() {
        debug!("Recipe {} '{}' short of {:?}", index, recipe.name, missing);
        return Err(CraftFailure::MissingIngredients(missing));
    }

    let mut removed: Vec<(ResourceKind, u32)> = Vec::with_capacity(recipe.ingredients.len());
    for req in recipe.requirements() {
        if let Err(e) = holder.remove(req.kind, req.quantity) {
            warn!("Holder refused removal during craft {}: {}", index, e);
            compensate(holder, &removed);
            return Err(CraftFailure::MissingIngredients(deficiencies(recipe, holder)));
        }
        removed.push((req.kind, req.quantity));
    }

    if !holder.add(recipe.result.kind, recipe.result.quantity) {
        debug!("No room for '{}' result, restoring ingredients", recipe.name);
        compensate(holder, &removed);
        return Err(CraftFailure::HolderFull);
    }

    info!(
        "Crafted {} x{} via recipe {} '{}'",
        recipe.result.kind, recipe.result.quantity, index, recipe.name
    );
    Ok(recipe.result)
}

/// Re-adds removed quantities, newest first.
fn compensate<H: ResourceHolder + ?Sized>(holder: &mut H, removed: &[(ResourceKind, u32)]) {
    for &(kind, quantity) in removed.iter().rev() {
        if !holder.add(kind, quantity) {
            error!(
                "Holder refused to restore {} x{}; holder contract violated",
                kind, quantity
            );
        }
    }
}
