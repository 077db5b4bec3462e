//! The memory index: write, lookup, search, delete, list.
//!
//! `MemoryIndex` sits between callers and a [`SearchBackend`]: it chunks and
//! embeds incoming records into multi-granularity units, writes them as one
//! batch, and resolves chunk-level search hits back to their canonical
//! memories.

use tracing::{debug, warn};
use uuid::Uuid;

use mnemo_types::error::{BatchIndexError, IndexError};
use mnemo_types::filter::FilterExpression;
use mnemo_types::memory::{IndexedUnit, MemoryContext, MemoryRecord};

use crate::chunk::TextChunker;
use crate::embed::Embedder;
use crate::index::backend::{BackendQuery, SearchBackend};
use crate::index::cache::RecordCache;

/// One page of canonical memories from [`MemoryIndex::list`].
#[derive(Debug, Clone)]
pub struct MemoryPage {
    pub memories: Vec<MemoryRecord>,
    /// Pass back to `list` to continue; `None` means end-of-list.
    pub next_cursor: Option<String>,
}

/// Indexes memory records and resolves retrieval back to canonical records.
///
/// All operations take `&self`; concurrent indexing of distinct memories is
/// safe because units are keyed by deterministic ids and upserts are
/// idempotent. Shared via `Arc` by callers that need to fan out.
pub struct MemoryIndex<B, E, C> {
    backend: B,
    embedder: E,
    chunker: C,
    cache: RecordCache,
}

impl<B, E, C> MemoryIndex<B, E, C>
where
    B: SearchBackend,
    E: Embedder,
    C: TextChunker,
{
    pub fn new(backend: B, embedder: E, chunker: C) -> Self {
        Self {
            backend,
            embedder,
            chunker,
            cache: RecordCache::default(),
        }
    }

    pub fn with_cache_capacity(backend: B, embedder: E, chunker: C, capacity: usize) -> Self {
        Self {
            backend,
            embedder,
            chunker,
            cache: RecordCache::new(capacity),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Chunk and embed a record into its full unit plus chunk units.
    ///
    /// Chunk units are only produced when chunking yields more than one
    /// piece; a single piece would duplicate the full unit.
    async fn build_units(&self, record: &MemoryRecord) -> Result<Vec<IndexedUnit>, IndexError> {
        let joined = record.joined_text();
        if joined.trim().is_empty() {
            return Err(IndexError::Validation(
                "cannot index a memory with no text".to_string(),
            ));
        }

        let full_embedding = self.embedder.embed_text(&joined).await?;
        let mut units = vec![IndexedUnit::full(record, full_embedding)];

        let pieces = self.chunker.chunk_text(&joined);
        if pieces.len() > 1 {
            for (i, piece) in pieces.into_iter().enumerate() {
                let embedding = self.embedder.embed_text(&piece).await?;
                units.push(IndexedUnit::chunk(record, i as u32, piece, embedding));
            }
        }
        Ok(units)
    }

    /// Index one memory record: embed, chunk, and upsert all units as a
    /// single batch. Re-invoking after a failure converges on the same rows.
    pub async fn index(&self, record: &MemoryRecord) -> Result<(), IndexError> {
        let units = self.build_units(record).await?;
        let unit_count = units.len();
        self.backend.upsert(&units).await?;
        self.cache.insert(record.clone());
        debug!(memory_id = %record.id, unit_count, "indexed memory");
        Ok(())
    }

    /// Index many records, flushing to the backend every `batch_size`
    /// memories. Returns the number of memories durably committed.
    ///
    /// On failure, units buffered so far are flushed best-effort before the
    /// error propagates, so earlier memories in the batch are not lost. The
    /// error carries the committed count so a caller can resume from there.
    pub async fn index_batch(
        &self,
        records: &[MemoryRecord],
        batch_size: usize,
    ) -> Result<usize, BatchIndexError> {
        let batch_size = batch_size.max(1);
        let mut pending_units: Vec<IndexedUnit> = Vec::new();
        let mut pending_records: Vec<&MemoryRecord> = Vec::new();
        let mut committed = 0usize;

        for record in records {
            match self.build_units(record).await {
                Ok(units) => {
                    pending_units.extend(units);
                    pending_records.push(record);
                }
                Err(e) => {
                    if !pending_units.is_empty() {
                        match self.backend.upsert(&pending_units).await {
                            Ok(()) => {
                                committed += pending_records.len();
                                for r in pending_records.drain(..) {
                                    self.cache.insert(r.clone());
                                }
                            }
                            Err(flush_err) => {
                                warn!(error = %flush_err, "flush of buffered units failed");
                            }
                        }
                    }
                    warn!(memory_id = %record.id, committed, error = %e, "batch indexing aborted");
                    return Err(BatchIndexError { committed, source: e });
                }
            }

            if pending_records.len() >= batch_size {
                if let Err(e) = self.backend.upsert(&pending_units).await {
                    return Err(BatchIndexError { committed, source: e });
                }
                committed += pending_records.len();
                for r in pending_records.drain(..) {
                    self.cache.insert(r.clone());
                }
                pending_units.clear();
            }
        }

        if !pending_units.is_empty() {
            if let Err(e) = self.backend.upsert(&pending_units).await {
                return Err(BatchIndexError { committed, source: e });
            }
            committed += pending_records.len();
            for r in pending_records.drain(..) {
                self.cache.insert(r.clone());
            }
        }

        debug!(committed, total = records.len(), "batch indexing complete");
        Ok(committed)
    }

    /// Fetch a memory by id, following a chunk id to its parent.
    ///
    /// A missing memory is `Ok(None)`, not an error.
    pub async fn get(&self, id: &Uuid) -> Result<Option<MemoryRecord>, IndexError> {
        if let Some(record) = self.cache.get(id) {
            return Ok(Some(record));
        }

        let unit = match self.backend.get_unit(id).await? {
            Some(unit) => unit,
            None => return Ok(None),
        };

        let canonical = match unit.parent_id {
            Some(parent_id) => match self.backend.get_unit(&parent_id).await? {
                Some(parent) => parent,
                None => {
                    warn!(unit_id = %id, %parent_id, "chunk unit has no parent in backend");
                    return Ok(None);
                }
            },
            None => unit,
        };

        match canonical.to_record() {
            Some(record) => {
                self.cache.insert(record.clone());
                Ok(Some(record))
            }
            None => {
                warn!(unit_id = %canonical.id, "resolved unit is not canonical");
                Ok(None)
            }
        }
    }

    /// Search the index and return a [`MemoryContext`] of canonical
    /// memories keyed by memory id.
    ///
    /// Chunk hits resolve to their parent record but keep the chunk's text
    /// as the matched span. With `search_chunks` false, only full units are
    /// scored. Hits whose parent cannot be resolved are dropped, never a
    /// hard failure.
    pub async fn search(
        &self,
        query_text: &str,
        limit: usize,
        filters: Option<&FilterExpression>,
        search_chunks: bool,
    ) -> Result<MemoryContext, IndexError> {
        let embedding = self.embedder.embed_text(query_text).await?;
        let query = BackendQuery {
            text: query_text.to_string(),
            embedding,
        };

        let combined;
        let effective_filter = if search_chunks {
            filters
        } else {
            let full_only = FilterExpression::eq("is_chunk", false);
            combined = Some(match filters {
                Some(f) => FilterExpression::and(vec![f.clone(), full_only]),
                None => full_only,
            });
            combined.as_ref()
        };

        let hits = self.backend.query(&query, limit, effective_filter).await?;
        debug!(hit_count = hits.len(), limit, "backend query returned");

        let mut context = MemoryContext::new();
        for hit in hits {
            let matched_text = hit.unit.source_text.clone();
            let record = match hit.unit.parent_id {
                Some(parent_id) => match self.resolve_parent(&parent_id).await {
                    Some(record) => record,
                    None => {
                        warn!(unit_id = %hit.unit.id, %parent_id, "dropping hit with unresolvable parent");
                        continue;
                    }
                },
                None => match hit.unit.to_record() {
                    Some(record) => record,
                    None => continue,
                },
            };
            // Keyed by memory id: when both a chunk and its parent match,
            // the later hit overwrites the earlier one.
            context.insert(record, hit.score, matched_text);
        }
        Ok(context)
    }

    /// Best-effort parent lookup for chunk-hit resolution.
    async fn resolve_parent(&self, parent_id: &Uuid) -> Option<MemoryRecord> {
        if let Some(record) = self.cache.get(parent_id) {
            return Some(record);
        }
        match self.backend.get_unit(parent_id).await {
            Ok(Some(unit)) => {
                let record = unit.to_record()?;
                self.cache.insert(record.clone());
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%parent_id, error = %e, "parent lookup failed");
                None
            }
        }
    }

    /// Delete a memory and its chunk units.
    ///
    /// Chunk removal is best-effort; the full unit delete is what makes the
    /// memory unreachable, so its error is the one that propagates.
    pub async fn delete(&self, id: &Uuid) -> Result<(), IndexError> {
        self.cache.evict(id);
        if let Err(e) = self.backend.delete_chunks_of(id).await {
            warn!(memory_id = %id, error = %e, "chunk removal failed; deleting full unit anyway");
        }
        self.backend.delete_unit(id).await?;
        debug!(memory_id = %id, "deleted memory");
        Ok(())
    }

    /// Page through canonical memories in backend-native order.
    ///
    /// Chunk units never appear here regardless of caller filters.
    pub async fn list(
        &self,
        limit: usize,
        cursor: Option<&str>,
        filters: Option<&FilterExpression>,
    ) -> Result<MemoryPage, IndexError> {
        let full_only = FilterExpression::eq("is_chunk", false);
        let filter = match filters {
            Some(f) => FilterExpression::and(vec![f.clone(), full_only]),
            None => full_only,
        };

        let page = self.backend.scroll(limit, cursor, Some(&filter)).await?;
        let memories = page.units.iter().filter_map(IndexedUnit::to_record).collect();
        Ok(MemoryPage {
            memories,
            next_cursor: page.next_cursor,
        })
    }
}
