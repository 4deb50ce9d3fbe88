//! Maps a selection in a view back to catalog identity.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::availability::AvailableRecipeView;
use crate::catalog::CatalogIndex;

/// A position picked in the most recent view, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    None,
    /// Position in the view.
    Position(usize),
}

impl Selection {
    /// Returns the selected position, if any.
    #[must_use]
    pub const fn position(self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Position(p) => Some(p),
        }
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Resolution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Selection is empty or outside the view
    #[error("No recipe at selection {0:?}")]
    NotFound(Selection),
}

/// Resolves `selection` against `view`.
///
/// Views are catalog-ordered, so the position is the catalog index; the only
/// work is the bounds check. Recipes are never matched by their contents.
pub fn resolve(view: &AvailableRecipeView, selection: Selection) -> Result<CatalogIndex, ResolveError> {
    let entry = selection
        .position()
        .and_then(|position| view.get(position))
        .ok_or(ResolveError::NotFound(selection))?;

    debug_assert_eq!(selection.position(), Some(entry.index.get()));
    debug!("Resolved {:?} to recipe {}", selection, entry.index);
    Ok(entry.index)
}
