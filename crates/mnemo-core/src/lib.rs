//! Business logic and port definitions for Mnemo.
//!
//! This crate defines the "ports" (embedder, search backend, generation
//! provider traits) that the infrastructure layer implements, plus the
//! orchestration built on top: text chunking, the memory index, relevance
//! thresholding, generation coalescing, and the query-to-answer-stream
//! pipeline. It depends only on `mnemo-types` -- never on `mnemo-infra` or
//! any database/HTTP crate.

pub mod chunk;
pub mod embed;
pub mod index;
pub mod recall;

#[cfg(test)]
pub(crate) mod testkit;
