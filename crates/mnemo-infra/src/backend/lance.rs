//! LanceDB-backed search backend.
//!
//! Implements `SearchBackend` from `mnemo-core` over an embedded LanceDB
//! database: one `memory_units` table holding full and chunk units, cosine
//! vector search, and SQL predicate filtering via `only_if`.
//!
//! Upserts are delete-by-id followed by add. Unit ids are deterministic, so
//! re-indexing a memory replaces its rows instead of duplicating them.

use std::path::PathBuf;
use std::sync::Arc;

use arrow_array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, Int32Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::debug;
use uuid::Uuid;

use mnemo_core::index::{BackendQuery, ScoredUnit, ScrollPage, SearchBackend};
use mnemo_types::error::IndexError;
use mnemo_types::filter::FilterExpression;
use mnemo_types::memory::{IndexedUnit, MemoryKind};

use super::schema::{memory_units_schema, MEMORY_UNITS_TABLE};
use super::translate;

/// LanceDB adapter for unit storage and dense similarity search.
pub struct LanceBackend {
    db: lancedb::Connection,
    dimension: i32,
}

impl LanceBackend {
    /// Open (or create) a LanceDB database at the given path.
    ///
    /// `dimension` must match the embedder feeding this backend; vectors of
    /// any other length are rejected at upsert time.
    pub async fn open(base_path: impl Into<PathBuf>, dimension: usize) -> Result<Self, IndexError> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)
            .map_err(|e| IndexError::Backend(format!("failed to create database dir: {e}")))?;

        let uri = base_path.to_str().ok_or_else(|| {
            IndexError::Backend(format!(
                "database path contains invalid UTF-8: {}",
                base_path.display()
            ))
        })?;

        let db = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| IndexError::Backend(format!("failed to open database: {e}")))?;

        Ok(Self {
            db,
            dimension: dimension as i32,
        })
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(memory_units_schema(self.dimension))
    }

    /// Open the units table, creating it empty on first use.
    async fn table(&self) -> Result<lancedb::Table, IndexError> {
        match self.db.open_table(MEMORY_UNITS_TABLE).execute().await {
            Ok(table) => Ok(table),
            Err(lancedb::Error::TableNotFound { .. }) => self
                .db
                .create_empty_table(MEMORY_UNITS_TABLE, self.schema())
                .execute()
                .await
                .map_err(|e| IndexError::Backend(format!("failed to create units table: {e}"))),
            Err(e) => Err(IndexError::Backend(format!(
                "failed to open units table: {e}"
            ))),
        }
    }

    /// Build one multi-row RecordBatch from a unit slice.
    fn build_batch(&self, units: &[IndexedUnit]) -> Result<RecordBatch, IndexError> {
        let mut vector_values = Vec::with_capacity(units.len() * self.dimension as usize);
        for unit in units {
            if unit.embedding.len() != self.dimension as usize {
                return Err(IndexError::Validation(format!(
                    "unit {} has embedding of length {}, table expects {}",
                    unit.id,
                    unit.embedding.len(),
                    self.dimension
                )));
            }
            vector_values.extend_from_slice(&unit.embedding);
        }

        let mut text_parts = Vec::with_capacity(units.len());
        for unit in units {
            let encoded = serde_json::to_string(&unit.text_parts)
                .map_err(|e| IndexError::Backend(format!("failed to encode text parts: {e}")))?;
            text_parts.push(encoded);
        }

        let id = StringArray::from(units.iter().map(|u| u.id.to_string()).collect::<Vec<_>>());
        let parent_id = StringArray::from(
            units
                .iter()
                .map(|u| u.parent_id.map(|p| p.to_string()))
                .collect::<Vec<_>>(),
        );
        let chunk_index =
            Int32Array::from(units.iter().map(|u| u.chunk_index as i32).collect::<Vec<_>>());
        let is_chunk = BooleanArray::from(units.iter().map(|u| u.is_chunk()).collect::<Vec<_>>());
        let kind = StringArray::from(units.iter().map(|u| u.kind.to_string()).collect::<Vec<_>>());
        let source_text =
            StringArray::from(units.iter().map(|u| u.source_text.clone()).collect::<Vec<_>>());
        let text_parts = StringArray::from(text_parts);
        let created_at = StringArray::from(
            units
                .iter()
                .map(|u| u.created_at.to_rfc3339())
                .collect::<Vec<_>>(),
        );

        let item_field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector = FixedSizeListArray::new(
            item_field,
            self.dimension,
            Arc::new(Float32Array::from(vector_values)),
            None,
        );

        RecordBatch::try_new(
            self.schema(),
            vec![
                Arc::new(id),
                Arc::new(parent_id),
                Arc::new(chunk_index),
                Arc::new(is_chunk),
                Arc::new(kind),
                Arc::new(source_text),
                Arc::new(text_parts),
                Arc::new(created_at),
                Arc::new(vector),
            ],
        )
        .map_err(|e| IndexError::Backend(format!("failed to build record batch: {e}")))
    }

    /// Parse the rows of a RecordBatch back into units.
    fn batch_to_units(batch: &RecordBatch) -> Result<Vec<IndexedUnit>, IndexError> {
        let id = string_column(batch, "id")?;
        let parent_id = string_column(batch, "parent_id")?;
        let chunk_index = column_as::<Int32Array>(batch, "chunk_index")?;
        let kind = string_column(batch, "kind")?;
        let source_text = string_column(batch, "source_text")?;
        let text_parts = string_column(batch, "text_parts")?;
        let created_at = string_column(batch, "created_at")?;
        let vector = column_as::<FixedSizeListArray>(batch, "vector")?;

        let mut units = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let row_id = Uuid::parse_str(id.value(i))
                .map_err(|e| IndexError::Backend(format!("corrupt unit id: {e}")))?;
            let row_parent = if parent_id.is_null(i) {
                None
            } else {
                Some(
                    Uuid::parse_str(parent_id.value(i))
                        .map_err(|e| IndexError::Backend(format!("corrupt parent id: {e}")))?,
                )
            };
            let row_kind: MemoryKind = kind
                .value(i)
                .parse()
                .map_err(|e| IndexError::Backend(format!("corrupt unit kind: {e}")))?;
            let row_parts: Vec<String> = serde_json::from_str(text_parts.value(i))
                .map_err(|e| IndexError::Backend(format!("corrupt text parts: {e}")))?;
            let row_created = DateTime::parse_from_rfc3339(created_at.value(i))
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| IndexError::Backend(format!("corrupt timestamp: {e}")))?;

            let row_vector = vector.value(i);
            let row_vector = row_vector
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| IndexError::Backend("vector column has wrong item type".to_string()))?
                .values()
                .to_vec();

            units.push(IndexedUnit {
                id: row_id,
                parent_id: row_parent,
                chunk_index: chunk_index.value(i) as u32,
                source_text: source_text.value(i).to_string(),
                text_parts: row_parts,
                kind: row_kind,
                created_at: row_created,
                embedding: row_vector,
            });
        }
        Ok(units)
    }

    async fn collect_units<S, E>(results: S) -> Result<Vec<IndexedUnit>, IndexError>
    where
        S: futures_util::Stream<Item = Result<RecordBatch, E>>,
        E: std::fmt::Display,
    {
        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| IndexError::Backend(format!("failed to collect query results: {e}")))?;
        let mut units = Vec::new();
        for batch in &batches {
            units.extend(Self::batch_to_units(batch)?);
        }
        Ok(units)
    }
}

fn column_as<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, IndexError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| IndexError::Backend(format!("missing or mistyped column: {name}")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, IndexError> {
    column_as::<StringArray>(batch, name)
}

impl SearchBackend for LanceBackend {
    async fn upsert(&self, units: &[IndexedUnit]) -> Result<(), IndexError> {
        if units.is_empty() {
            return Ok(());
        }
        let table = self.table().await?;

        let id_list = units
            .iter()
            .map(|u| format!("'{}'", u.id))
            .collect::<Vec<_>>()
            .join(", ");
        table
            .delete(&format!("id IN ({id_list})"))
            .await
            .map_err(|e| IndexError::Backend(format!("failed to clear stale units: {e}")))?;

        let batch = self.build_batch(units)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| IndexError::Backend(format!("failed to add units: {e}")))?;

        debug!(unit_count = units.len(), "upserted units");
        Ok(())
    }

    async fn get_unit(&self, id: &Uuid) -> Result<Option<IndexedUnit>, IndexError> {
        let table = self.table().await?;
        let results = table
            .query()
            .only_if(format!("id = '{id}'"))
            .limit(1)
            .execute()
            .await
            .map_err(|e| IndexError::Backend(format!("failed to query unit: {e}")))?;

        let mut units = Self::collect_units(results).await?;
        Ok(units.pop())
    }

    async fn delete_unit(&self, id: &Uuid) -> Result<(), IndexError> {
        let table = self.table().await?;
        table
            .delete(&format!("id = '{id}'"))
            .await
            .map_err(|e| IndexError::Backend(format!("failed to delete unit: {e}")))?;
        Ok(())
    }

    async fn delete_chunks_of(&self, parent_id: &Uuid) -> Result<(), IndexError> {
        let table = self.table().await?;
        table
            .delete(&format!("parent_id = '{parent_id}'"))
            .await
            .map_err(|e| IndexError::Backend(format!("failed to delete chunks: {e}")))?;
        Ok(())
    }

    async fn query(
        &self,
        query: &BackendQuery,
        limit: usize,
        filter: Option<&FilterExpression>,
    ) -> Result<Vec<ScoredUnit>, IndexError> {
        let table = self.table().await?;

        let mut vector_query = table
            .vector_search(query.embedding.as_slice())
            .map_err(|e| IndexError::Backend(format!("vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(limit);
        if let Some(predicate) = filter.and_then(translate::to_sql) {
            vector_query = vector_query.only_if(predicate);
        }

        let results = vector_query
            .execute()
            .await
            .map_err(|e| IndexError::Backend(format!("vector search failed: {e}")))?;
        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| IndexError::Backend(format!("failed to collect search results: {e}")))?;

        let mut hits = Vec::new();
        for batch in &batches {
            // Cosine distance column added by the vector search.
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            let units = Self::batch_to_units(batch)?;
            for (i, unit) in units.into_iter().enumerate() {
                let distance = distances.map_or(0.0, |d| d.value(i));
                hits.push(ScoredUnit {
                    unit,
                    score: 1.0 - distance,
                });
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll(
        &self,
        limit: usize,
        cursor: Option<&str>,
        filter: Option<&FilterExpression>,
    ) -> Result<ScrollPage, IndexError> {
        let offset: usize = cursor
            .map(|c| {
                c.parse()
                    .map_err(|_| IndexError::Validation(format!("invalid scroll cursor: {c}")))
            })
            .transpose()?
            .unwrap_or(0);

        let table = self.table().await?;
        // Fetch one row past the requested page to learn whether more remain.
        let mut query = table.query().limit(offset + limit + 1);
        if let Some(predicate) = filter.and_then(translate::to_sql) {
            query = query.only_if(predicate);
        }
        let results = query
            .execute()
            .await
            .map_err(|e| IndexError::Backend(format!("scroll query failed: {e}")))?;

        let all = Self::collect_units(results).await?;
        let has_more = all.len() > offset + limit;
        let units: Vec<IndexedUnit> = all.into_iter().skip(offset).take(limit).collect();
        let next_cursor = has_more.then(|| (offset + units.len()).to_string());
        Ok(ScrollPage { units, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_types::memory::MemoryRecord;

    const DIM: usize = 4;

    async fn open_backend() -> (LanceBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let backend = LanceBackend::open(dir.path().to_path_buf(), DIM)
            .await
            .expect("failed to open backend");
        (backend, dir)
    }

    fn full_unit(text: &str, embedding: Vec<f32>) -> IndexedUnit {
        let record = MemoryRecord::new(
            MemoryKind::Memory,
            vec![text.to_string(), "second utterance".to_string()],
        );
        IndexedUnit::full(&record, embedding)
    }

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[i] = 1.0;
        v
    }

    #[tokio::test]
    async fn test_upsert_and_get_roundtrip() {
        let (backend, _dir) = open_backend().await;
        let unit = full_unit("eiffel tower", axis(0));
        backend.upsert(std::slice::from_ref(&unit)).await.unwrap();

        let fetched = backend.get_unit(&unit.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, unit.id);
        assert_eq!(fetched.kind, MemoryKind::Memory);
        assert_eq!(fetched.text_parts, unit.text_parts);
        assert_eq!(fetched.source_text, unit.source_text);
        assert_eq!(fetched.embedding, unit.embedding);
        assert!(fetched.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_unit_is_none() {
        let (backend, _dir) = open_backend().await;
        assert!(backend.get_unit(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_rows() {
        let (backend, _dir) = open_backend().await;
        let mut unit = full_unit("original", axis(0));
        backend.upsert(std::slice::from_ref(&unit)).await.unwrap();

        unit.source_text = "rewritten".to_string();
        backend.upsert(std::slice::from_ref(&unit)).await.unwrap();

        let page = backend.scroll(10, None, None).await.unwrap();
        assert_eq!(page.units.len(), 1);
        assert_eq!(page.units[0].source_text, "rewritten");
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_rejected() {
        let (backend, _dir) = open_backend().await;
        let unit = full_unit("short vector", vec![1.0, 0.0]);
        let err = backend.upsert(&[unit]).await.unwrap_err();
        assert!(matches!(err, IndexError::Validation(_)));
    }

    #[tokio::test]
    async fn test_vector_query_ranks_by_cosine() {
        let (backend, _dir) = open_backend().await;
        let near = full_unit("near", vec![1.0, 0.1, 0.0, 0.0]);
        let far = full_unit("far", axis(1));
        backend.upsert(&[near.clone(), far.clone()]).await.unwrap();

        let hits = backend
            .query(
                &BackendQuery {
                    text: "near".to_string(),
                    embedding: axis(0),
                },
                2,
                None,
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].unit.id, near.id);
        assert!(hits[0].score > hits[1].score);
        assert!(hits[0].score > 0.9);
    }

    #[tokio::test]
    async fn test_query_filter_excludes_chunks() {
        let (backend, _dir) = open_backend().await;
        let record = MemoryRecord::new(MemoryKind::Memory, vec!["chunked memory".to_string()]);
        let full = IndexedUnit::full(&record, axis(0));
        let chunk = IndexedUnit::chunk(&record, 0, "chunked".to_string(), axis(0));
        backend.upsert(&[full, chunk]).await.unwrap();

        let filter = FilterExpression::eq("is_chunk", false);
        let hits = backend
            .query(
                &BackendQuery {
                    text: String::new(),
                    embedding: axis(0),
                },
                10,
                Some(&filter),
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert!(!hits[0].unit.is_chunk());
    }

    #[tokio::test]
    async fn test_delete_chunks_of_leaves_full_unit() {
        let (backend, _dir) = open_backend().await;
        let record = MemoryRecord::new(MemoryKind::Memory, vec!["chunked memory".to_string()]);
        backend
            .upsert(&[
                IndexedUnit::full(&record, axis(0)),
                IndexedUnit::chunk(&record, 0, "chunked".to_string(), axis(1)),
                IndexedUnit::chunk(&record, 1, "memory".to_string(), axis(2)),
            ])
            .await
            .unwrap();

        backend.delete_chunks_of(&record.id).await.unwrap();
        let page = backend.scroll(10, None, None).await.unwrap();
        assert_eq!(page.units.len(), 1);
        assert_eq!(page.units[0].id, record.id);
    }

    #[tokio::test]
    async fn test_delete_unit_is_idempotent() {
        let (backend, _dir) = open_backend().await;
        let unit = full_unit("to delete", axis(0));
        backend.upsert(std::slice::from_ref(&unit)).await.unwrap();

        backend.delete_unit(&unit.id).await.unwrap();
        backend.delete_unit(&unit.id).await.unwrap();
        assert!(backend.get_unit(&unit.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scroll_pages_to_completion() {
        let (backend, _dir) = open_backend().await;
        let units: Vec<IndexedUnit> = (0..5)
            .map(|i| full_unit(&format!("memory {i}"), axis(i % DIM)))
            .collect();
        backend.upsert(&units).await.unwrap();

        let mut seen = 0;
        let mut cursor: Option<String> = None;
        loop {
            let page = backend.scroll(2, cursor.as_deref(), None).await.unwrap();
            assert!(page.units.len() <= 2);
            seen += page.units.len();
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, 5);
    }
}
