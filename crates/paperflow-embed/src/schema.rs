//! Arrow layout of the chunk table

use std::sync::Arc;

use arrow::array::{ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;

use crate::chunk::Chunk;

pub const VECTOR_COLUMN: &str = "vector";

fn vector_type(dim: i32) -> DataType {
    DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim)
}

/// Chunk table schema for `dim`-dimensional embeddings
pub fn chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("paper_id", DataType::Utf8, false),
        Field::new("paper_title", DataType::Utf8, false),
        Field::new("section", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new(VECTOR_COLUMN, vector_type(dim), false),
    ]))
}

/// Build one record batch from chunks and their embeddings (same order).
pub fn chunks_to_batch(chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<RecordBatch, ArrowError> {
    if chunks.len() != vectors.len() {
        return Err(ArrowError::InvalidArgumentError(format!(
            "{} chunks but {} vectors",
            chunks.len(),
            vectors.len()
        )));
    }
    let dim = vectors.first().map_or(0, Vec::len);
    if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
        return Err(ArrowError::InvalidArgumentError(
            "embeddings must share one non-zero dimension".to_string(),
        ));
    }
    let dim = i32::try_from(dim)
        .map_err(|_| ArrowError::InvalidArgumentError(format!("dimension {dim} too large")))?;

    let column = |f: fn(&Chunk) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(chunks.iter().map(f)))
    };
    let values = Float32Array::from(vectors.concat());
    let vector = FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        dim,
        Arc::new(values),
        None,
    )?;

    RecordBatch::try_new(
        chunk_schema(dim),
        vec![
            column(|c| c.id.as_str()),
            column(|c| c.paper_id.as_str()),
            column(|c| c.paper_title.as_str()),
            column(|c| c.section.as_str()),
            column(|c| c.text.as_str()),
            Arc::new(vector),
        ],
    )
}
