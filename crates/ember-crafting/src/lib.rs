//! # Ember Crafting
//!
//! The crafting core for Ember.
//!
//! This crate provides:
//! - Recipe catalog (append-only, identity by catalog index)
//! - Availability evaluation against a holder and reachable stations
//! - Selection resolution back to catalog identity
//! - Transactional craft execution with compensation
//! - Crafting session state for the presentation layer
//! - Snapshot hand-off to multiplayer replication

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod availability;
pub mod catalog;
pub mod executor;
pub mod holder;
pub mod replication;
pub mod resolver;
pub mod session;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::availability::*;
    pub use crate::catalog::*;
    pub use crate::executor::*;
    pub use crate::holder::*;
    pub use crate::replication::*;
    pub use crate::resolver::*;
    pub use crate::session::*;
}

pub use prelude::*;
