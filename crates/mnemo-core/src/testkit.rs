//! In-memory test doubles for the core ports.
//!
//! Deterministic stand-ins for the search backend, the embedder, and the
//! generation provider, used by unit tests across this crate.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::Stream;
use uuid::Uuid;

use mnemo_types::error::{GenerationError, IndexError};
use mnemo_types::filter::{Combinator, FilterExpression, FilterOperator};
use mnemo_types::generation::{GenerationDelta, GenerationRequest};
use mnemo_types::memory::IndexedUnit;

use crate::embed::Embedder;
use crate::index::backend::{BackendQuery, ScoredUnit, ScrollPage, SearchBackend};
use crate::recall::provider::{DeltaStream, GenerationProvider};

/// Cosine-similarity backend over a plain `HashMap`, with fault injection.
#[derive(Default)]
pub struct StubBackend {
    units: Mutex<HashMap<Uuid, IndexedUnit>>,
    /// Number of upcoming upsert calls that should fail.
    pub fail_upserts: AtomicUsize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit_count(&self) -> usize {
        self.units.lock().unwrap().len()
    }

    /// Write a unit directly, bypassing the repository (e.g., an orphan).
    pub fn put_raw(&self, unit: IndexedUnit) {
        self.units.lock().unwrap().insert(unit.id, unit);
    }

    fn matches(unit: &IndexedUnit, filter: &FilterExpression) -> bool {
        match filter {
            FilterExpression::Group { combinator, children } => match combinator {
                Combinator::And => children.iter().all(|c| Self::matches(unit, c)),
                Combinator::Or => children.iter().any(|c| Self::matches(unit, c)),
            },
            FilterExpression::Condition { field, operator, value } => {
                let actual = match field.as_str() {
                    "id" => Some(serde_json::json!(unit.id.to_string())),
                    "parent_id" => unit
                        .parent_id
                        .map(|p| serde_json::json!(p.to_string())),
                    "chunk_index" => Some(serde_json::json!(unit.chunk_index)),
                    "kind" => Some(serde_json::json!(unit.kind.to_string())),
                    "is_chunk" => Some(serde_json::json!(unit.is_chunk())),
                    _ => None,
                };
                match operator {
                    FilterOperator::Eq => actual.as_ref() == Some(value),
                    FilterOperator::Neq => actual.as_ref() != Some(value),
                    FilterOperator::Exists => actual.is_some(),
                    FilterOperator::NotExists => actual.is_none(),
                    // The stub only needs equality and existence; anything
                    // else is permissive, like a real backend would be for
                    // operators it cannot express.
                    _ => true,
                }
            }
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

impl SearchBackend for StubBackend {
    async fn upsert(&self, units: &[IndexedUnit]) -> Result<(), IndexError> {
        if self.fail_upserts.load(Ordering::SeqCst) > 0 {
            self.fail_upserts.fetch_sub(1, Ordering::SeqCst);
            return Err(IndexError::Backend("injected upsert failure".to_string()));
        }
        let mut map = self.units.lock().unwrap();
        for unit in units {
            map.insert(unit.id, unit.clone());
        }
        Ok(())
    }

    async fn get_unit(&self, id: &Uuid) -> Result<Option<IndexedUnit>, IndexError> {
        Ok(self.units.lock().unwrap().get(id).cloned())
    }

    async fn delete_unit(&self, id: &Uuid) -> Result<(), IndexError> {
        self.units.lock().unwrap().remove(id);
        Ok(())
    }

    async fn delete_chunks_of(&self, parent_id: &Uuid) -> Result<(), IndexError> {
        self.units
            .lock()
            .unwrap()
            .retain(|_, unit| unit.parent_id != Some(*parent_id));
        Ok(())
    }

    async fn query(
        &self,
        query: &BackendQuery,
        limit: usize,
        filter: Option<&FilterExpression>,
    ) -> Result<Vec<ScoredUnit>, IndexError> {
        let map = self.units.lock().unwrap();
        let mut hits: Vec<ScoredUnit> = map
            .values()
            .filter(|unit| filter.is_none_or(|f| Self::matches(unit, f)))
            .map(|unit| ScoredUnit {
                score: cosine(&query.embedding, &unit.embedding),
                unit: unit.clone(),
            })
            .collect();
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
            .map(|c| c.parse().map_err(|_| IndexError::Validation(format!("bad cursor: {c}"))))
            .transpose()?
            .unwrap_or(0);

        let map = self.units.lock().unwrap();
        let mut all: Vec<&IndexedUnit> = map
            .values()
            .filter(|unit| filter.is_none_or(|f| Self::matches(unit, f)))
            .collect();
        all.sort_by_key(|unit| unit.id);

        let units: Vec<IndexedUnit> = all.iter().skip(offset).take(limit).map(|u| (*u).clone()).collect();
        let next = offset + units.len();
        let next_cursor = (next < all.len()).then(|| next.to_string());
        Ok(ScrollPage { units, next_cursor })
    }
}

/// Bag-of-words hashing embedder: shared tokens give positive cosine.
pub struct StubEmbedder {
    dimension: usize,
    /// Texts containing this marker fail to embed (fault injection).
    pub poison: Option<String>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: 32,
            poison: None,
        }
    }

    pub fn with_poison(marker: &str) -> Self {
        Self {
            dimension: 32,
            poison: Some(marker.to_string()),
        }
    }

    fn bucket(token: &str, dimension: usize) -> usize {
        // FNV-1a, stable across runs.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (hash % dimension as u64) as usize
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for StubEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        if let Some(marker) = &self.poison {
            if text.contains(marker.as_str()) {
                return Err(IndexError::Embedding("injected embed failure".to_string()));
            }
        }
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[Self::bucket(&token.to_lowercase(), self.dimension)] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "stub-bow"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Replays a scripted delta sequence and records incoming requests.
pub struct ScriptedProvider {
    script: Mutex<Option<Vec<Result<GenerationDelta, GenerationError>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<GenerationDelta, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(GenerationDelta::text(*t))).collect())
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<GenerationRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, request: GenerationRequest) -> DeltaStream {
        self.requests.lock().unwrap().push(request);
        let script = self
            .script
            .lock()
            .unwrap()
            .take()
            .expect("scripted provider already consumed");
        Box::pin(futures_util::stream::iter(script))
    }
}

/// An endless provider stream that counts how many deltas were pulled.
///
/// Used to verify that cancelling the consumer stops the producer.
pub fn counting_stream(
    pulled: Arc<AtomicUsize>,
) -> Pin<Box<dyn Stream<Item = Result<GenerationDelta, GenerationError>> + Send + 'static>> {
    Box::pin(async_stream::stream! {
        loop {
            pulled.fetch_add(1, Ordering::SeqCst);
            yield Ok(GenerationDelta::text("tok "));
        }
    })
}
