//! Shared domain types for Mnemo.
//!
//! This crate contains the core domain types used across the Mnemo memory
//! engine: memory records, indexed units, query contexts, filter expressions,
//! generation types, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod filter;
pub mod generation;
pub mod memory;
