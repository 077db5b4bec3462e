//! Memory types for Mnemo.
//!
//! These types model recorded memories and the units the index writes to a
//! search backend: one canonical "full" unit per memory plus optional chunk
//! units for sub-span retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Kind of a memory record.
///
/// Questions and answers flow through the same pipeline as memories so that
/// past conversations are themselves recallable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Memory,
    Question,
    Answer,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Memory => write!(f, "memory"),
            MemoryKind::Question => write!(f, "question"),
            MemoryKind::Answer => write!(f, "answer"),
        }
    }
}

impl FromStr for MemoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(MemoryKind::Memory),
            "question" => Ok(MemoryKind::Question),
            "answer" => Ok(MemoryKind::Answer),
            other => Err(format!("invalid memory kind: '{other}'")),
        }
    }
}

/// Opaque audio payload attached to a memory.
///
/// The engine never examines the bytes; they travel with the record for
/// collaborators that persist or replay audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPayload {
    /// MIME type of the payload (e.g., "audio/wav").
    pub media_type: String,
    pub data: Vec<u8>,
}

/// A recorded unit of content subject to indexing and retrieval.
///
/// The `id` is assigned once at creation and immutable thereafter.
/// `text` preserves multi-utterance structure: one element per utterance,
/// in spoken order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub kind: MemoryKind,
    pub text: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioPayload>,
}

impl MemoryRecord {
    /// Create a new record with a fresh time-sortable id.
    pub fn new(kind: MemoryKind, text: Vec<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            kind,
            text,
            audio: None,
        }
    }

    /// Join the utterances into a single searchable string.
    pub fn joined_text(&self) -> String {
        self.text.join(" ")
    }
}

/// A unit written to the search backend.
///
/// Exactly one full unit per indexed memory (`parent_id` None, `id` equal to
/// the memory id), plus zero or more chunk units when chunking yields more
/// than one piece. `parent_id` is a weak back-reference used for relation and
/// lookup only -- never ownership; parent/chunk consistency is guaranteed at
/// write time, not enforced afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedUnit {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub chunk_index: u32,
    /// The exact text span this unit was embedded from.
    pub source_text: String,
    /// Original utterance list; empty for chunk units.
    pub text_parts: Vec<String>,
    /// Denormalized from the parent record at write time.
    pub kind: MemoryKind,
    pub created_at: DateTime<Utc>,
    pub embedding: Vec<f32>,
}

impl IndexedUnit {
    /// Whether this is a chunk unit rather than a canonical full unit.
    pub fn is_chunk(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Deterministic id for a chunk unit, derived from the parent id and
    /// chunk index so that re-indexing upserts the same rows.
    pub fn chunk_id(parent_id: &Uuid, chunk_index: u32) -> Uuid {
        Uuid::new_v5(parent_id, format!("chunk-{chunk_index}").as_bytes())
    }

    /// The canonical full unit for a memory record.
    pub fn full(record: &MemoryRecord, embedding: Vec<f32>) -> Self {
        Self {
            id: record.id,
            parent_id: None,
            chunk_index: 0,
            source_text: record.joined_text(),
            text_parts: record.text.clone(),
            kind: record.kind,
            created_at: record.created_at,
            embedding,
        }
    }

    /// A chunk unit for one piece of a memory's chunked text.
    pub fn chunk(record: &MemoryRecord, chunk_index: u32, piece: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Self::chunk_id(&record.id, chunk_index),
            parent_id: Some(record.id),
            chunk_index,
            source_text: piece,
            text_parts: Vec::new(),
            kind: record.kind,
            created_at: record.created_at,
            embedding,
        }
    }

    /// Rebuild the canonical memory record from a full unit.
    ///
    /// Returns `None` for chunk units: only full units carry the utterance
    /// structure needed to reconstruct a record.
    pub fn to_record(&self) -> Option<MemoryRecord> {
        if self.is_chunk() {
            return None;
        }
        Some(MemoryRecord {
            id: self.id,
            created_at: self.created_at,
            kind: self.kind,
            text: self.text_parts.clone(),
            audio: None,
        })
    }
}

/// Query-scoped aggregate of retrieved memories, scores, and matched spans.
///
/// The three maps are parallel and keyed by memory id; `insert` is the only
/// mutation path, so the key sets are identical by construction. Scores are
/// backend-native (cosine similarity or BM25) -- higher ranks first.
/// Created empty per query, consumed once downstream, never persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
    memories: HashMap<Uuid, MemoryRecord>,
    scores: HashMap<Uuid, f32>,
    matched_texts: HashMap<Uuid, String>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a retrieved memory with its score and the span that matched.
    ///
    /// A repeated id overwrites all three entries (last-seen-wins).
    pub fn insert(&mut self, record: MemoryRecord, score: f32, matched_text: String) {
        let id = record.id;
        self.memories.insert(id, record);
        self.scores.insert(id, score);
        self.matched_texts.insert(id, matched_text);
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.memories.contains_key(id)
    }

    pub fn memories(&self) -> &HashMap<Uuid, MemoryRecord> {
        &self.memories
    }

    pub fn scores(&self) -> &HashMap<Uuid, f32> {
        &self.scores
    }

    pub fn matched_texts(&self) -> &HashMap<Uuid, String> {
        &self.matched_texts
    }

    pub fn score_of(&self, id: &Uuid) -> Option<f32> {
        self.scores.get(id).copied()
    }

    /// Entries ordered by descending score.
    pub fn ranked(&self) -> Vec<(&MemoryRecord, f32, &str)> {
        let mut entries: Vec<_> = self
            .memories
            .iter()
            .map(|(id, record)| {
                let score = self.scores.get(id).copied().unwrap_or(0.0);
                let matched = self.matched_texts.get(id).map(String::as_str).unwrap_or("");
                (record, score, matched)
            })
            .collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries
    }
}
