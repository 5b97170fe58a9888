//! Test module for end-to-end and property tests.
//!
//! This module exercises the engine through its public seams:
//! - **Integration tests**: config in, store and world out, broadcasts paced
//! - **Property tests**: precedence, clamps, idempotence and chunking
//! - **Helper functions**: fixture world, session and controllers
//!
//! # Test Structure
//!
//! - `integration.rs`: Lifecycle, apply passes, broadcasts and operator commands
//! - `properties.rs`: proptest invariants over random multipliers
//! - `helpers.rs`: Test setup utilities and factory functions

mod helpers;
mod integration;

// Re-export for convenience
pub use helpers::*;
