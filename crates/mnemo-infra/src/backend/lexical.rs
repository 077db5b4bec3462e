//! In-process BM25 lexical search backend.
//!
//! Stores units in a `DashMap` and scores queries with BM25 over the raw
//! `source_text`, ignoring embeddings entirely. Fully deterministic with no
//! model downloads or disk state, which makes it the backend of choice for
//! tests and for small corpora where lexical recall beats approximate ANN.

use std::collections::HashMap;

use dashmap::DashMap;
use uuid::Uuid;

use mnemo_core::index::{BackendQuery, ScoredUnit, ScrollPage, SearchBackend};
use mnemo_types::error::IndexError;
use mnemo_types::filter::FilterExpression;
use mnemo_types::memory::IndexedUnit;

use super::eval;

/// BM25 term-frequency saturation.
const K1: f32 = 1.2;
/// BM25 length normalization.
const B: f32 = 0.75;

/// In-memory BM25 backend over indexed units.
#[derive(Default)]
pub struct LexicalBackend {
    units: DashMap<Uuid, IndexedUnit>,
}

impl LexicalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Score candidates with BM25, dropping documents with no term overlap.
///
/// Document frequencies are computed over the candidate set (post-filter),
/// so a filter narrows the corpus the way a separate index would.
fn bm25_scores(query_tokens: &[String], candidates: &[IndexedUnit]) -> Vec<(usize, f32)> {
    let doc_tokens: Vec<Vec<String>> = candidates
        .iter()
        .map(|u| tokenize(&u.source_text))
        .collect();

    let corpus_size = candidates.len() as f32;
    let avg_len = if candidates.is_empty() {
        0.0
    } else {
        doc_tokens.iter().map(Vec::len).sum::<usize>() as f32 / corpus_size
    };

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for tokens in &doc_tokens {
        let mut seen: Vec<&str> = tokens.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        for term in seen {
            *doc_freq.entry(term).or_default() += 1;
        }
    }

    let mut scored = Vec::new();
    for (i, tokens) in doc_tokens.iter().enumerate() {
        let doc_len = tokens.len() as f32;
        let mut term_freq: HashMap<&str, f32> = HashMap::new();
        for token in tokens {
            *term_freq.entry(token.as_str()).or_default() += 1.0;
        }

        let mut score = 0.0f32;
        for term in query_tokens {
            let Some(tf) = term_freq.get(term.as_str()) else {
                continue;
            };
            let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f32;
            let idf = (1.0 + (corpus_size - df + 0.5) / (df + 0.5)).ln();
            let norm = K1 * (1.0 - B + B * doc_len / avg_len.max(1.0));
            score += idf * (tf * (K1 + 1.0)) / (tf + norm);
        }
        if score > 0.0 {
            scored.push((i, score));
        }
    }
    scored
}

impl SearchBackend for LexicalBackend {
    async fn upsert(&self, units: &[IndexedUnit]) -> Result<(), IndexError> {
        for unit in units {
            self.units.insert(unit.id, unit.clone());
        }
        Ok(())
    }

    async fn get_unit(&self, id: &Uuid) -> Result<Option<IndexedUnit>, IndexError> {
        Ok(self.units.get(id).map(|entry| entry.clone()))
    }

    async fn delete_unit(&self, id: &Uuid) -> Result<(), IndexError> {
        self.units.remove(id);
        Ok(())
    }

    async fn delete_chunks_of(&self, parent_id: &Uuid) -> Result<(), IndexError> {
        self.units
            .retain(|_, unit| unit.parent_id != Some(*parent_id));
        Ok(())
    }

    async fn query(
        &self,
        query: &BackendQuery,
        limit: usize,
        filter: Option<&FilterExpression>,
    ) -> Result<Vec<ScoredUnit>, IndexError> {
        let query_tokens = tokenize(&query.text);
        let candidates: Vec<IndexedUnit> = self
            .units
            .iter()
            .filter(|entry| filter.is_none_or(|f| eval::matches(entry.value(), f)))
            .map(|entry| entry.clone())
            .collect();

        let mut scored = bm25_scores(&query_tokens, &candidates);
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredUnit {
                unit: candidates[i].clone(),
                score,
            })
            .collect())
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

        let mut all: Vec<IndexedUnit> = self
            .units
            .iter()
            .filter(|entry| filter.is_none_or(|f| eval::matches(entry.value(), f)))
            .map(|entry| entry.clone())
            .collect();
        all.sort_by_key(|unit| unit.id);

        let units: Vec<IndexedUnit> = all.iter().skip(offset).take(limit).cloned().collect();
        let consumed = offset + units.len();
        let next_cursor = (consumed < all.len()).then(|| consumed.to_string());
        Ok(ScrollPage { units, next_cursor })
    }
}
