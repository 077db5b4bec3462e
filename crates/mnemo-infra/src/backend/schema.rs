//! Arrow schema for the LanceDB memory units table.
//!
//! A single `memory_units` table holds both canonical full units and chunk
//! units, discriminated by the `is_chunk` column so filters can exclude
//! chunks with a plain SQL predicate.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for
//! lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// BGESmallENV15 embedding dimension, the default for [`memory_units_schema`].
pub const EMBEDDING_DIMENSION: i32 = 384;

/// Name of the single LanceDB table holding all indexed units.
pub const MEMORY_UNITS_TABLE: &str = "memory_units";

/// Schema for the memory units table.
///
/// `text_parts` is the JSON-encoded utterance list (empty array for chunk
/// units); timestamps are RFC 3339 strings, the portable choice for Lance
/// string columns.
pub fn memory_units_schema(dimension: i32) -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("parent_id", DataType::Utf8, true),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("is_chunk", DataType::Boolean, false),
        Field::new("kind", DataType::Utf8, false),
        Field::new("source_text", DataType::Utf8, false),
        Field::new("text_parts", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension,
            ),
            false,
        ),
    ])
}
