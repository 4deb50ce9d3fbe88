//! Recipe asset loading.
//!
//! This module provides:
//! - Loading recipes from assets/recipes/*.toml and *.ron
//! - Recipe validation on load
//! - Interning of resource names into resource kinds
//! - Registration into the crafting catalog in a deterministic order

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ember_common::{ResourceKind, SchemaVersion};
use ember_crafting::{CatalogError, Recipe, RecipeCatalog, StationType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default asset path for recipes.
pub const DEFAULT_RECIPE_PATH: &str = "assets/recipes";

/// Errors that can occur during recipe loading.
#[derive(Debug, Error)]
pub enum RecipeLoadError {
    /// Failed to read file.
    #[error("Failed to read recipe file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse recipe TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse RON.
    #[error("Failed to parse recipe RON: {0}")]
    RonError(#[from] ron::error::SpannedError),

    /// Unsupported file extension.
    #[error("Unsupported recipe file: {0}")]
    Unsupported(PathBuf),

    /// Validation error.
    #[error("Recipe validation error: {0}")]
    ValidationError(String),

    /// Catalog rejected the recipe.
    #[error("Catalog rejected recipe: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result type for recipe loading operations.
pub type RecipeLoadResult<T> = Result<T, RecipeLoadError>;

/// Interned resource names.
///
/// The first name seen gets kind 1, the next kind 2, and so on.
#[derive(Debug, Default, Clone)]
pub struct ResourceNames {
    by_name: HashMap<String, ResourceKind>,
    names: Vec<String>,
}

impl ResourceNames {
    /// Creates an empty name table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Returns the kind for `name`, assigning a new one if unseen.
    pub fn intern(&mut self, name: &str) -> ResourceKind {
        let key = Self::normalize(name);
        if let Some(kind) = self.by_name.get(&key) {
            return *kind;
        }
        self.names.push(key.clone());
        let kind = ResourceKind::new(self.names.len() as u32);
        self.by_name.insert(key, kind);
        kind
    }

    /// Looks up a name without interning it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ResourceKind> {
        self.by_name.get(&Self::normalize(name)).copied()
    }

    /// Name of a kind, if it was interned here.
    #[must_use]
    pub fn name_of(&self, kind: ResourceKind) -> Option<&str> {
        let index = (kind.raw() as usize).checked_sub(1)?;
        self.names.get(index).map(String::as_str)
    }

    /// Name of a kind, falling back to its raw id.
    #[must_use]
    pub fn display(&self, kind: ResourceKind) -> String {
        self.name_of(kind)
            .map_or_else(|| kind.to_string(), str::to_string)
    }

    /// Number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// A resource and quantity as written in a recipe file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAmount {
    /// Resource name.
    pub resource: String,
    /// Quantity.
    pub quantity: u32,
}

/// A recipe definition loaded from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDefinition {
    /// Display name.
    pub name: String,
    /// Station key ("none" = hand crafting).
    #[serde(default = "default_station")]
    pub station: String,
    /// Consumed ingredients.
    #[serde(default)]
    pub ingredients: Vec<ResourceAmount>,
    /// Produced resource.
    pub result: ResourceAmount,
}

fn default_station() -> String {
    StationType::None.key().to_string()
}

impl RecipeDefinition {
    /// Validates the definition and returns its station.
    pub fn validate(&self) -> RecipeLoadResult<StationType> {
        if self.name.trim().is_empty() {
            return Err(RecipeLoadError::ValidationError(
                "Recipe has empty name".to_string(),
            ));
        }

        let station = StationType::from_key(&self.station).ok_or_else(|| {
            RecipeLoadError::ValidationError(format!(
                "Recipe '{}' has unknown station '{}'",
                self.name, self.station
            ))
        })?;

        let blank = self
            .ingredients
            .iter()
            .chain(std::iter::once(&self.result))
            .any(|amount| amount.resource.trim().is_empty());
        if blank {
            return Err(RecipeLoadError::ValidationError(format!(
                "Recipe '{}' names an empty resource",
                self.name
            )));
        }

        Ok(station)
    }

    /// Converts to a catalog recipe, interning resource names.
    pub fn to_recipe(&self, names: &mut ResourceNames) -> RecipeLoadResult<Recipe> {
        let station = self.validate()?;

        let mut builder = Recipe::builder(self.name.trim()).station(station);
        for ingredient in &self.ingredients {
            builder = builder.ingredient(names.intern(&ingredient.resource), ingredient.quantity);
        }
        builder = builder.result(names.intern(&self.result.resource), self.result.quantity);

        Ok(builder.build()?)
    }
}

/// A collection of recipes from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Recipes in this file.
    pub recipes: Vec<RecipeDefinition>,
}

fn default_version() -> String {
    SchemaVersion::RECIPE_FILE.to_string()
}

impl RecipeFile {
    /// Parses a recipe file, choosing the format by extension.
    pub fn parse(path: &Path, content: &str) -> RecipeLoadResult<Self> {
        let file: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(content)?,
            Some("ron") => ron::from_str(content)?,
            _ => return Err(RecipeLoadError::Unsupported(path.to_path_buf())),
        };
        file.check_version()?;
        Ok(file)
    }

    fn check_version(&self) -> RecipeLoadResult<()> {
        let major = self
            .version
            .split('.')
            .next()
            .and_then(|m| m.trim().parse::<u16>().ok());
        match major {
            Some(major) if major == SchemaVersion::RECIPE_FILE.major => Ok(()),
            _ => Err(RecipeLoadError::ValidationError(format!(
                "Unsupported recipe file version '{}' (expected {})",
                self.version,
                SchemaVersion::RECIPE_FILE
            ))),
        }
    }
}

/// Statistics for the recipe loader.
#[derive(Debug, Default, Clone)]
pub struct RecipeLoaderStats {
    /// Number of files loaded.
    pub files_loaded: u32,
    /// Number of recipes registered.
    pub recipes_loaded: u32,
    /// Number of rejected recipes or files.
    pub validation_errors: u32,
}

/// Loads recipe files into a catalog.
pub struct RecipeLoader {
    /// Base path for recipe files.
    base_path: PathBuf,
    /// Statistics.
    stats: RecipeLoaderStats,
}

impl RecipeLoader {
    /// Creates a new recipe loader.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        info!("Initializing recipe loader at: {:?}", base_path);

        Self {
            base_path,
            stats: RecipeLoaderStats::default(),
        }
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns loader statistics.
    #[must_use]
    pub fn stats(&self) -> &RecipeLoaderStats {
        &self.stats
    }

    /// Loads every recipe file under the base path, in file-name order.
    ///
    /// Catalog indices follow that order, so it must not depend on the
    /// platform's directory listing.
    pub fn load_all(
        &mut self,
        catalog: &mut RecipeCatalog,
        names: &mut ResourceNames,
    ) -> RecipeLoadResult<()> {
        if !self.base_path.exists() {
            info!(
                "Recipe directory does not exist, creating: {:?}",
                self.base_path
            );
            fs::create_dir_all(&self.base_path)?;
            return Ok(());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.base_path)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext == "toml" || ext == "ron")
            })
            .collect();
        paths.sort();

        for path in paths {
            if let Err(e) = self.load_file(&path, catalog, names) {
                warn!("Failed to load recipe file {:?}: {}", path, e);
                self.stats.validation_errors += 1;
            }
        }

        info!(
            "Loaded {} recipes from {} files",
            self.stats.recipes_loaded, self.stats.files_loaded
        );

        Ok(())
    }

    /// Loads recipes from a single file, skipping invalid definitions.
    pub fn load_file(
        &mut self,
        path: &Path,
        catalog: &mut RecipeCatalog,
        names: &mut ResourceNames,
    ) -> RecipeLoadResult<()> {
        debug!("Loading recipe file: {:?}", path);

        let content = fs::read_to_string(path)?;
        let recipe_file = RecipeFile::parse(path, &content)?;

        let mut loaded_count = 0;
        for definition in &recipe_file.recipes {
            let registered = definition
                .to_recipe(names)
                .and_then(|recipe| catalog.register(recipe).map_err(RecipeLoadError::from));
            match registered {
                Ok(index) => {
                    debug!("Registered '{}' at {}", definition.name, index);
                    loaded_count += 1;
                },
                Err(e) => {
                    warn!("Invalid recipe in {:?}: {}", path, e);
                    self.stats.validation_errors += 1;
                },
            }
        }

        self.stats.files_loaded += 1;
        self.stats.recipes_loaded += loaded_count;
        debug!("Loaded {} recipes from {:?}", loaded_count, path);

        Ok(())
    }
}
