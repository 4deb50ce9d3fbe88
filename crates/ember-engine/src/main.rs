//! # Ember Engine
//!
//! Interactive host for the Ember crafting core.
//!
//! This binary ties together:
//! - Config: `ember.toml` with inventory, stations and replication settings
//! - Recipe loading: TOML/RON recipe files into an append-only catalog
//! - Console: a line-oriented crafting session over stdin
//! - Replication: coalesced holder snapshots flushed after each command

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod console;
mod recipe_loader;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use ember_common::EntityId;
use ember_crafting::{
    replication_channel, Inventory, RecipeCatalog, ReplicationOutbox, ResourceHolder,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};
use crate::console::Console;
use crate::recipe_loader::{RecipeLoader, ResourceNames};

/// Main entry point.
fn main() -> Result<()> {
    // Console output owns stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("ember=info".parse()?))
        .init();

    info!("Ember starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = EngineConfig::load_from(&config_path);
    if !config_path.exists() {
        if let Err(e) = config.save_to(&config_path) {
            warn!("Failed to write default config: {e}");
        }
    }

    let mut catalog = RecipeCatalog::new();
    let mut names = ResourceNames::new();
    let mut loader = RecipeLoader::new(&config.recipe_dir);
    loader.load_all(&mut catalog, &mut names)?;
    if loader.stats().validation_errors > 0 {
        warn!(
            "{} recipe definitions or files were rejected",
            loader.stats().validation_errors
        );
    }
    if catalog.is_empty() {
        warn!("No recipes found under {:?}", loader.base_path());
    } else {
        info!(
            "Catalog holds {} recipes over {} resources",
            catalog.len(),
            names.len()
        );
    }

    let mut inventory = Inventory::with_stack_limit(config.inventory_slots, config.stack_limit);
    for (name, quantity) in &config.starting_inventory {
        if !inventory.add(names.intern(name), *quantity) {
            warn!("Starting inventory has no room for {} {}", quantity, name);
        }
    }

    let (publisher, mut outbox) =
        replication_channel(config.replication_capacity, config.replication_interval());
    let owner = EntityId::new();
    publisher.publish_full(owner, &inventory);

    let mut console = Console::new(
        catalog,
        names,
        inventory,
        config.stations(),
        owner,
        publisher,
    );
    info!("Crafting session ready for {} (type 'help')", owner);

    let mut stdout = io::stdout().lock();
    for line in io::stdin().lock().lines() {
        let response = console.execute(&line?);
        for output in &response.lines {
            writeln!(stdout, "{output}")?;
        }
        stdout.flush()?;

        flush_replication(&mut outbox, Instant::now());
        if response.quit {
            break;
        }
    }

    // Release anything still held back by the rate limit
    flush_replication(&mut outbox, Instant::now() + config.replication_interval());

    let stats = console.session().stats();
    info!(
        "Session crafted {} items ({} crafts, {} failed)",
        stats.items_crafted, stats.crafts_completed, stats.crafts_failed
    );
    info!("Ember shutdown complete");
    Ok(())
}

/// Drains released snapshots and hands their frames to the transport.
fn flush_replication(outbox: &mut ReplicationOutbox, now: Instant) {
    for snapshot in outbox.poll(now) {
        match snapshot.to_bytes() {
            Ok(frame) => info!(
                holder = %snapshot.holder,
                sequence = snapshot.sequence,
                full = snapshot.full,
                bytes = frame.len(),
                "Replicated holder snapshot"
            ),
            Err(e) => warn!("Failed to encode snapshot for {}: {}", snapshot.holder, e),
        }
    }
}
