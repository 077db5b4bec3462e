//! Search backend trait definition.
//!
//! Any storage/search system implementing these six primitives is
//! pluggable: an embedded dense-ANN store, a lexical/BM25 index, or a
//! remote vector database. Implementations live in mnemo-infra.

use mnemo_types::error::IndexError;
use mnemo_types::filter::FilterExpression;
use mnemo_types::memory::IndexedUnit;
use uuid::Uuid;

/// A search query handed to a backend.
///
/// Dense backends use `embedding`; lexical backends score against `text`.
/// Both are always populated so either backend kind can serve the query.
#[derive(Debug, Clone)]
pub struct BackendQuery {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A backend hit: a unit plus its backend-native score.
///
/// Scores are whatever the backend ranks by (cosine similarity, BM25);
/// higher ranks first. The engine never re-ranks.
#[derive(Debug, Clone)]
pub struct ScoredUnit {
    pub unit: IndexedUnit,
    pub score: f32,
}

/// One page of a scroll, with an opaque continuation cursor.
///
/// `next_cursor` of `None` signals end-of-list. Ordering is backend-native,
/// not guaranteed chronological.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    pub units: Vec<IndexedUnit>,
    pub next_cursor: Option<String>,
}

/// Trait for pluggable unit storage and similarity search.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// `upsert` must be keyed by unit id and idempotent, so a failed indexing
/// operation can simply be re-invoked. Filter translation is the backend's
/// responsibility: an operator the backend cannot express is treated as no
/// constraint (permissive) and logged, never a hard failure.
pub trait SearchBackend: Send + Sync {
    /// Write units as one logical batch, replacing any with the same id.
    fn upsert(
        &self,
        units: &[IndexedUnit],
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Fetch a single unit by id. Absent units are `Ok(None)`.
    fn get_unit(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<IndexedUnit>, IndexError>> + Send;

    /// Delete a single unit by id. Deleting an absent unit succeeds.
    fn delete_unit(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Delete every chunk unit whose `parent_id` matches.
    fn delete_chunks_of(
        &self,
        parent_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Nearest-neighbor (or lexical) query, constrained by the filter.
    fn query(
        &self,
        query: &BackendQuery,
        limit: usize,
        filter: Option<&FilterExpression>,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredUnit>, IndexError>> + Send;

    /// Paginated listing in backend-native order.
    fn scroll(
        &self,
        limit: usize,
        cursor: Option<&str>,
        filter: Option<&FilterExpression>,
    ) -> impl std::future::Future<Output = Result<ScrollPage, IndexError>> + Send;
}
