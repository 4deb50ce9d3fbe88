//! Line-oriented crafting console.
//!
//! This module provides:
//! - Command parsing for the crafting session
//! - Rendering of the availability view and inventory
//! - Inventory and station edits that invalidate the session

use ember_common::EntityId;
use ember_crafting::{
    CraftFailure, CraftingSession, Inventory, ReachableStations, RecipeCatalog,
    ReplicationPublisher, ResourceHolder, StationType,
};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::recipe_loader::ResourceNames;

/// Output message level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLevel {
    /// Normal output
    #[default]
    Info,
    /// Success/confirmation message
    Success,
    /// Warning message
    Warning,
    /// Error message
    Error,
}

/// A line of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// The text content
    pub text: String,
    /// Output level
    pub level: OutputLevel,
}

impl OutputLine {
    /// Creates a new output line.
    #[must_use]
    pub fn new(text: impl Into<String>, level: OutputLevel) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }

    /// Creates an info line.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, OutputLevel::Info)
    }

    /// Creates a success line.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, OutputLevel::Success)
    }

    /// Creates a warning line.
    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, OutputLevel::Warning)
    }

    /// Creates an error line.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, OutputLevel::Error)
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            OutputLevel::Error => write!(f, "error: {}", self.text),
            OutputLevel::Warning => write!(f, "warning: {}", self.text),
            OutputLevel::Info | OutputLevel::Success => f.write_str(&self.text),
        }
    }
}

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List commands
    Help,
    /// Show the availability view
    Recipes,
    /// Select a view position
    Select(usize),
    /// Craft the selection
    Craft,
    /// Show inventory
    Inventory,
    /// Print inventory as JSON
    Dump,
    /// Add resources
    Give(String, u32),
    /// Remove resources
    Take(String, u32),
    /// Mark a station reachable
    StationAdd(StationType),
    /// Mark a station unreachable
    StationRemove(StationType),
    /// List reachable stations
    Stations,
    /// Push a full snapshot to replication
    Sync,
    /// Leave the console
    Quit,
}

const HELP: &[&str] = &[
    "recipes              show recipes and availability",
    "select <n>           select recipe n from the last listing",
    "craft                craft the selected recipe",
    "inv | dump           show inventory (dump prints JSON)",
    "give <res> <n>       add resources",
    "take <res> <n>       remove resources",
    "station add|remove <s>, stations",
    "sync                 push a full inventory snapshot",
    "quit",
];

impl Command {
    /// Parses one input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or_else(|| "empty command".to_string())?;
        let args: Vec<&str> = words.collect();

        let quantity = |s: &str| {
            s.parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("invalid quantity '{s}'"))
        };
        let station = |s: &str| StationType::from_key(s).ok_or_else(|| format!("unknown station '{s}'"));

        match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("help" | "?", []) => Ok(Self::Help),
            ("recipes" | "list", []) => Ok(Self::Recipes),
            ("select", [n]) => n
                .parse()
                .map(Self::Select)
                .map_err(|_| format!("invalid position '{n}'")),
            ("craft", []) => Ok(Self::Craft),
            ("inv" | "inventory", []) => Ok(Self::Inventory),
            ("dump", []) => Ok(Self::Dump),
            ("give", [res, n]) => Ok(Self::Give((*res).to_string(), quantity(n)?)),
            ("take", [res, n]) => Ok(Self::Take((*res).to_string(), quantity(n)?)),
            ("station", ["add", s]) => Ok(Self::StationAdd(station(s)?)),
            ("station", ["remove", s]) => Ok(Self::StationRemove(station(s)?)),
            ("stations", []) => Ok(Self::Stations),
            ("sync", []) => Ok(Self::Sync),
            ("quit" | "exit", []) => Ok(Self::Quit),
            (other, _) => Err(format!("unknown command or arguments: '{other}' (try 'help')")),
        }
    }
}

/// Output of one console command.
#[derive(Debug, Default)]
pub struct ConsoleResponse {
    /// Lines to print
    pub lines: Vec<OutputLine>,
    /// The user asked to leave
    pub quit: bool,
}

/// Crafting console over one player's inventory.
pub struct Console {
    catalog: RecipeCatalog,
    names: ResourceNames,
    inventory: Inventory,
    stations: ReachableStations,
    session: CraftingSession,
    publisher: ReplicationPublisher,
}

impl Console {
    /// Creates a console; the session crafts for `owner`.
    #[must_use]
    pub fn new(
        catalog: RecipeCatalog,
        names: ResourceNames,
        inventory: Inventory,
        stations: ReachableStations,
        owner: EntityId,
        publisher: ReplicationPublisher,
    ) -> Self {
        Self {
            catalog,
            names,
            inventory,
            stations,
            session: CraftingSession::new(owner).with_replication(publisher.clone()),
            publisher,
        }
    }

    /// Crafting session.
    #[must_use]
    pub fn session(&self) -> &CraftingSession {
        &self.session
    }

    /// Runs one input line.
    pub fn execute(&mut self, line: &str) -> ConsoleResponse {
        let mut response = ConsoleResponse::default();
        if line.trim().is_empty() {
            return response;
        }

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                response.lines.push(OutputLine::error(e));
                return response;
            },
        };
        debug!("Console command: {:?}", command);

        match command {
            Command::Help => response
                .lines
                .extend(HELP.iter().map(|l| OutputLine::info(*l))),
            Command::Recipes => self.list_recipes(&mut response.lines),
            Command::Select(position) => {
                let line = match self.session.select(position).position() {
                    Some(p) => {
                        let name = self
                            .session
                            .view()
                            .and_then(|v| v.get(p))
                            .map_or("?", |e| e.recipe.name.as_str());
                        OutputLine::info(format!("Selected [{p}] {name}"))
                    },
                    None => OutputLine::warning(format!(
                        "Nothing at {position}; run 'recipes' first"
                    )),
                };
                response.lines.push(line);
            },
            Command::Craft => self.craft(&mut response.lines),
            Command::Inventory => self.list_inventory(&mut response.lines),
            Command::Dump => {
                let line = match serde_json::to_string(&self.named_inventory()) {
                    Ok(json) => OutputLine::info(json),
                    Err(e) => OutputLine::error(format!("dump failed: {e}")),
                };
                response.lines.push(line);
            },
            Command::Give(name, quantity) => {
                let kind = self.names.intern(&name);
                if self.inventory.add(kind, quantity) {
                    self.session.invalidate();
                    response
                        .lines
                        .push(OutputLine::success(format!("+{quantity} {name}")));
                } else {
                    response.lines.push(OutputLine::error("Inventory is full!"));
                }
            },
            Command::Take(name, quantity) => {
                let result = self
                    .names
                    .get(&name)
                    .ok_or_else(|| format!("unknown resource '{name}'"))
                    .and_then(|kind| {
                        self.inventory
                            .remove(kind, quantity)
                            .map_err(|e| e.to_string())
                    });
                match result {
                    Ok(()) => {
                        self.session.invalidate();
                        response
                            .lines
                            .push(OutputLine::success(format!("-{quantity} {name}")));
                    },
                    Err(e) => response.lines.push(OutputLine::error(e)),
                }
            },
            Command::StationAdd(station) => {
                self.stations.insert(station);
                self.session.invalidate();
                response.lines.push(OutputLine::info(format!(
                    "{} in reach",
                    station.display_name()
                )));
            },
            Command::StationRemove(station) => {
                self.stations.remove(station);
                self.session.invalidate();
                response.lines.push(OutputLine::info(format!(
                    "{} out of reach",
                    station.display_name()
                )));
            },
            Command::Stations => {
                let mut stations: Vec<_> = self.stations.iter().map(StationType::display_name).collect();
                stations.sort_unstable();
                let text = if stations.is_empty() {
                    "No stations in reach".to_string()
                } else {
                    stations.join(", ")
                };
                response.lines.push(OutputLine::info(text));
            },
            Command::Sync => {
                let line = if self.publisher.publish_full(self.session.owner(), &self.inventory) {
                    OutputLine::info("Full snapshot queued")
                } else {
                    OutputLine::warning("Replication busy, snapshot dropped")
                };
                response.lines.push(line);
            },
            Command::Quit => response.quit = true,
        }

        response
    }

    fn list_recipes(&mut self, out: &mut Vec<OutputLine>) {
        let view = self
            .session
            .refresh(&self.catalog, &self.inventory, &self.stations);
        if view.is_empty() {
            out.push(OutputLine::warning("No recipes loaded"));
            return;
        }

        for (position, entry) in view.entries().iter().enumerate() {
            let recipe = &entry.recipe;
            let ingredients: Vec<String> = recipe
                .ingredients
                .iter()
                .map(|i| format!("{} {}", i.quantity, self.names.display(i.kind)))
                .collect();
            let status = if entry.is_available {
                "ready".to_string()
            } else if !entry.station_reachable {
                format!("needs {}", recipe.station.display_name())
            } else {
                let missing: Vec<String> = entry
                    .deficiencies
                    .iter()
                    .map(|d| format!("{} {}", d.missing(), self.names.display(d.kind)))
                    .collect();
                format!("missing {}", missing.join(", "))
            };
            let text = format!(
                "[{position}] {}: {} -> {} {} ({}) {status}",
                recipe.name,
                ingredients.join(" + "),
                recipe.result.quantity,
                self.names.display(recipe.result.kind),
                recipe.station.display_name(),
            );
            out.push(if entry.is_available {
                OutputLine::success(text)
            } else {
                OutputLine::info(text)
            });
        }
    }

    fn craft(&mut self, out: &mut Vec<OutputLine>) {
        let outcome = self
            .session
            .craft_selected(&self.catalog, &mut self.inventory, &self.stations);
        match outcome {
            Ok(result) => out.push(OutputLine::success(format!(
                "Crafted {} {}",
                result.quantity,
                self.names.display(result.kind)
            ))),
            Err(CraftFailure::MissingIngredients(missing)) => {
                for d in missing {
                    out.push(OutputLine::error(format!(
                        "Missing {}: need {}, have {}",
                        self.names.display(d.kind),
                        d.required,
                        d.available
                    )));
                }
            },
            Err(CraftFailure::InvalidIndex(_)) => out.push(OutputLine::error(
                "No recipe selected; run 'recipes' then 'select <n>'",
            )),
            Err(failure) => out.push(OutputLine::error(failure.to_string())),
        }
    }

    fn named_inventory(&self) -> BTreeMap<String, u32> {
        self.inventory
            .snapshot()
            .into_iter()
            .map(|s| (self.names.display(s.kind), s.quantity))
            .collect()
    }

    fn list_inventory(&self, out: &mut Vec<OutputLine>) {
        let items = self.named_inventory();
        if items.is_empty() {
            out.push(OutputLine::info("Inventory is empty"));
            return;
        }
        for (name, quantity) in items {
            out.push(OutputLine::info(format!("{quantity:>5} {name}")));
        }
        out.push(OutputLine::info(format!(
            "{}/{} slots used",
            self.inventory.slot_count(),
            self.inventory.slots()
        )));
    }
}
