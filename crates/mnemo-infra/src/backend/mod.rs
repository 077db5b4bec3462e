//! Search backend implementations.
//!
//! Two interchangeable [`mnemo_core::index::SearchBackend`] adapters:
//! `LanceBackend` (embedded LanceDB, dense ANN over embeddings) and
//! `LexicalBackend` (in-process BM25 over raw text, fully deterministic).

pub mod eval;
pub mod lance;
pub mod lexical;
pub mod schema;
pub mod translate;

pub use lance::LanceBackend;
pub use lexical::LexicalBackend;
