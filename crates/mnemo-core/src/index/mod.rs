//! Memory indexing and retrieval.
//!
//! `MemoryIndex` writes multi-granularity units (one canonical full unit
//! plus optional chunk units per memory) to a pluggable [`SearchBackend`]
//! and resolves search hits back to canonical memories.

pub mod backend;
pub mod cache;
pub mod repository;

pub use backend::{BackendQuery, ScoredUnit, ScrollPage, SearchBackend};
pub use cache::RecordCache;
pub use repository::{MemoryIndex, MemoryPage};
