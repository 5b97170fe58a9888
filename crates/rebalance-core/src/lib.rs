//! # Rebalance Core
//!
//! Live balance override engine for a running multiplayer session.
//!
//! An operator supplies per-unit multipliers and absolutes (cost, build time,
//! health, damage, range, movement, tier gating, ...). The engine resolves
//! them against the host's unit definitions, writes each affected field
//! through a synchronized, revertible override store (or mutates it directly
//! when the store cannot take it), and sends the resulting override set to
//! connected participants one target at a time.
//!
//! ## Architecture
//!
//! - **Host** ([`host`]): the simulation model the engine runs against
//! - **Catalog** ([`catalog`]): entities indexed by display name
//! - **Config** ([`config`]): the balance document and its resolved overlay
//! - **Resolver** ([`resolver`]): slot-specific, shared, identity precedence
//! - **Dedup** ([`dedup`]): shared assets scaled once per apply-cycle
//! - **Engine** ([`engine`]): ordered apply passes over the dual-path write
//! - **Store** ([`store`]): the synchronized override store seam
//! - **Chunker** ([`chunker`]): per-target broadcasts under a size limit
//! - **Lifecycle** ([`lifecycle`]): apply on start, hot reload, revert on end
//! - **Tier gate** ([`tier_gate`]): one-time dispenser unlocks on tier-up
//! - **Commands** ([`commands`]): operator chat commands and the audit log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rebalance_core::{LifecycleController, LoopbackTransport, MemoryStore, FileConfigSource};
//!
//! let store = MemoryStore::from_world(&session.world);
//! let mut controller = LifecycleController::new(
//!     FileConfigSource::new("balance.json"),
//!     store,
//!     LoopbackTransport::default(),
//! );
//! controller.on_session_start(&mut session)?;
//! // every frame
//! controller.update(dt, &session);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod chunker;
pub mod commands;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod tier_gate;

pub use catalog::{Catalog, CatalogEntry};
pub use chunker::{ChunkReport, LoopbackTransport, SyncChunker, Transport};
pub use commands::{AuditLog, OperatorCommand};
pub use config::{BalanceConfig, ConfigDocument, ConfigSource, FileConfigSource, MemoryConfigSource};
pub use engine::{ApplyOutcome, ApplyReport, Engine, SkipReason};
pub use error::{CommandError, ConfigError, LifecycleError, StoreError, TransportError};
pub use host::{Session, World};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use store::{MemoryStore, SyncStore, TargetKey};

#[cfg(test)]
mod tests;
