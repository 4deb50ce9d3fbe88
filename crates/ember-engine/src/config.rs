//! Engine configuration.
//!
//! Provides inventory, station, recipe and replication settings.
//! Configuration can be loaded from and saved to a TOML file.

use ember_crafting::{ReachableStations, StationType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "ember.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Catalog ===
    /// Directory scanned for recipe files
    pub recipe_dir: PathBuf,

    // === Inventory ===
    /// Distinct resource kinds the player can hold
    pub inventory_slots: u32,
    /// Maximum quantity per resource kind
    pub stack_limit: u32,

    // === World ===
    /// Station keys treated as reachable at startup
    pub reachable_stations: Vec<String>,

    // === Replication ===
    /// Minimum time between snapshots of the same holder, in milliseconds
    pub replication_interval_ms: u64,
    /// Snapshots buffered before new ones are dropped
    pub replication_capacity: usize,

    /// Resources granted at startup, by name
    pub starting_inventory: BTreeMap<String, u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recipe_dir: PathBuf::from(crate::recipe_loader::DEFAULT_RECIPE_PATH),
            inventory_slots: 40,
            stack_limit: 999,
            reachable_stations: Vec::new(),
            replication_interval_ms: 250,
            replication_capacity: 64,
            starting_inventory: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamps values to usable ranges.
    pub fn validate(&mut self) {
        self.inventory_slots = self.inventory_slots.clamp(1, 400);
        self.stack_limit = self.stack_limit.max(1);
        self.replication_capacity = self.replication_capacity.clamp(1, 4096);
        self.replication_interval_ms = self.replication_interval_ms.min(60_000);
    }

    /// Minimum interval between snapshots of one holder.
    #[must_use]
    pub fn replication_interval(&self) -> Duration {
        Duration::from_millis(self.replication_interval_ms)
    }

    /// Reachable stations parsed from their keys. Unknown keys are skipped.
    #[must_use]
    pub fn stations(&self) -> ReachableStations {
        self.reachable_stations
            .iter()
            .filter_map(|key| {
                let station = StationType::from_key(key);
                if station.is_none() {
                    warn!("Unknown station '{key}' in config, ignoring");
                }
                station
            })
            .collect()
    }
}
