//! Resource holders and the reference inventory.

use ahash::RandomState;
use ember_common::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Holder error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HolderError {
    /// Not enough of a resource
    #[error("Not enough {kind}: need {needed}, have {have}")]
    NotEnough {
        /// Resource requested
        kind: ResourceKind,
        /// Amount needed
        needed: u32,
        /// Amount available
        have: u32,
    },
}

/// Result type for holder operations.
pub type HolderResult<T> = Result<T, HolderError>;

/// A resource and its quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceStack {
    /// Resource type
    pub kind: ResourceKind,
    /// Quantity held
    pub quantity: u32,
}

impl ResourceStack {
    /// Creates a new stack.
    #[must_use]
    pub const fn new(kind: ResourceKind, quantity: u32) -> Self {
        Self { kind, quantity }
    }
}

/// Anything whose resources crafting can query and mutate.
///
/// Holders are owned by the caller; crafting only uses this contract.
/// A removal that was just performed must always be re-addable, since the
/// executor relies on it to undo a failed craft.
pub trait ResourceHolder {
    /// Quantity of `kind` currently held.
    fn quantity_of(&self, kind: ResourceKind) -> u32;

    /// Removes `quantity` of `kind`, failing without mutation if short.
    fn remove(&mut self, kind: ResourceKind, quantity: u32) -> HolderResult<()>;

    /// Adds `quantity` of `kind`. Returns false (and changes nothing) when
    /// capacity is exhausted.
    fn add(&mut self, kind: ResourceKind, quantity: u32) -> bool;

    /// Counter bumped on every mutation.
    fn revision(&self) -> u64;

    /// All non-empty stacks, sorted by resource kind.
    fn snapshot(&self) -> Vec<ResourceStack>;
}

/// Slot-bounded inventory.
///
/// Each distinct resource occupies one slot; a slot holds up to
/// `stack_limit` of its resource.
///
/// Equality compares contents and limits. The revision counter is
/// bookkeeping for staleness checks and does not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// Resources and their quantities
    items: HashMap<ResourceKind, u32, RandomState>,
    /// Maximum distinct resource kinds
    slots: u32,
    /// Maximum quantity per resource kind
    stack_limit: u32,
    /// Mutation counter
    revision: u64,
}

impl Inventory {
    /// Default per-slot stack limit.
    pub const DEFAULT_STACK_LIMIT: u32 = 999;

    /// Creates a new inventory with the given slot count.
    #[must_use]
    pub fn new(slots: u32) -> Self {
        Self::with_stack_limit(slots, Self::DEFAULT_STACK_LIMIT)
    }

    /// Creates a new inventory with explicit slot count and stack limit.
    #[must_use]
    pub fn with_stack_limit(slots: u32, stack_limit: u32) -> Self {
        Self {
            items: HashMap::default(),
            slots,
            stack_limit,
            revision: 0,
        }
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        self.items.len() as u32
    }

    /// Returns the slot capacity.
    #[must_use]
    pub const fn slots(&self) -> u32 {
        self.slots
    }

    /// Returns the per-slot stack limit.
    #[must_use]
    pub const fn stack_limit(&self) -> u32 {
        self.stack_limit
    }

    /// Returns true if every slot is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slot_count() >= self.slots
    }

    /// Checks whether `amount` of `kind` would fit.
    #[must_use]
    pub fn can_add(&self, kind: ResourceKind, amount: u32) -> bool {
        let current = self.quantity_of(kind);
        if current == 0 && amount > 0 && self.is_full() {
            return false;
        }
        current
            .checked_add(amount)
            .is_some_and(|total| total <= self.stack_limit)
    }

    /// Returns an iterator over all stacks.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.items.iter().map(|(&kind, &count)| (kind, count))
    }
}

impl PartialEq for Inventory {
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
            && self.stack_limit == other.stack_limit
            && self.items == other.items
    }
}

impl Eq for Inventory {}

impl ResourceHolder for Inventory {
    fn quantity_of(&self, kind: ResourceKind) -> u32 {
        self.items.get(&kind).copied().unwrap_or(0)
    }

    fn remove(&mut self, kind: ResourceKind, quantity: u32) -> HolderResult<()> {
        let current = self.quantity_of(kind);
        if current < quantity {
            return Err(HolderError::NotEnough {
                kind,
                needed: quantity,
                have: current,
            });
        }
        if current == quantity {
            self.items.remove(&kind);
        } else {
            self.items.insert(kind, current - quantity);
        }
        self.revision += 1;
        Ok(())
    }

    fn add(&mut self, kind: ResourceKind, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }
        if !self.can_add(kind, quantity) {
            return false;
        }
        *self.items.entry(kind).or_insert(0) += quantity;
        self.revision += 1;
        true
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn snapshot(&self) -> Vec<ResourceStack> {
        let mut stacks: Vec<_> = self
            .iter()
            .map(|(kind, quantity)| ResourceStack::new(kind, quantity))
            .collect();
        stacks.sort_by_key(|s| s.kind);
        stacks
    }
}
