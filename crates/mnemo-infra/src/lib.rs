//! Infrastructure implementations for Mnemo.
//!
//! Concrete adapters for the ports defined in `mnemo-core`: a LanceDB
//! dense-vector search backend, an in-process BM25 lexical backend, a
//! fastembed local embedder, and an OpenAI-compatible streaming generation
//! provider.

pub mod backend;
pub mod embedder;
pub mod generation;

pub use backend::{LanceBackend, LexicalBackend};
pub use embedder::FastEmbedder;
pub use generation::OpenAiCompatProvider;
