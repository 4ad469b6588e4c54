// LanceDB vector database module
// Arrow layout of stored documents plus the table operations in `vector_store`


pub mod vector_store;

use arrow::array::{Array, FixedSizeListArray, Float32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::document::{Document, Meta};
use crate::{Result, VaultError};

pub const ID_COLUMN: &str = "id";
pub const VECTOR_COLUMN: &str = "vector";
pub const CONTENT_COLUMN: &str = "content";
pub const META_COLUMN: &str = "meta";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Table schema for documents with `dimension`-wide vectors
#[inline]
pub fn document_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            false,
        ),
        Field::new(CONTENT_COLUMN, DataType::Utf8, false),
        Field::new(META_COLUMN, DataType::Utf8, false),
        Field::new(CREATED_AT_COLUMN, DataType::Utf8, false),
    ]))
}

/// Vector width of a table schema, if it has a fixed-size vector column
#[inline]
pub fn schema_dimension(schema: &Schema) -> Option<usize> {
    schema
        .fields()
        .iter()
        .find(|field| field.name() == VECTOR_COLUMN)
        .and_then(|field| match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
}

/// Build a record batch from embedded documents.
///
/// Every document must carry an embedding of exactly `dimension` values.
#[inline]
pub fn documents_to_batch(
    documents: &[Document],
    dimension: usize,
    created_at: &str,
) -> Result<RecordBatch> {
    let len = documents.len();
    let mut ids = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut metas = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * dimension);

    for document in documents {
        let embedding = document.embedding.as_deref().ok_or_else(|| {
            VaultError::Database(format!("Document {} has no embedding", document.id))
        })?;
        if embedding.len() != dimension {
            return Err(VaultError::Database(format!(
                "Document {} has a {}-dimensional embedding, table expects {}",
                document.id,
                embedding.len(),
                dimension
            )));
        }

        ids.push(document.id.as_str());
        contents.push(document.content.as_str());
        metas.push(
            serde_json::to_string(&document.meta)
                .map_err(|e| VaultError::Database(format!("Failed to encode meta: {}", e)))?,
        );
        flat_values.extend_from_slice(embedding);
    }

    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        field,
        dimension as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| VaultError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(metas)),
        Arc::new(StringArray::from(vec![created_at; len])),
    ];

    RecordBatch::try_new(document_schema(dimension), arrays)
        .map_err(|e| VaultError::Database(format!("Failed to create record batch: {}", e)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| VaultError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| VaultError::Database(format!("Invalid {} column type", name)))
}

/// Read documents back out of a query result batch.
///
/// `_distance` becomes the score through `score_of`. Vectors are only attached
/// when `with_embedding` is set and the column was selected.
#[inline]
pub fn batch_to_documents<F>(
    batch: &RecordBatch,
    with_embedding: bool,
    score_of: F,
) -> Result<Vec<Document>>
where
    F: Fn(f32) -> f32,
{
    let ids = string_column(batch, ID_COLUMN)?;
    let contents = string_column(batch, CONTENT_COLUMN)?;
    let metas = string_column(batch, META_COLUMN)?;

    let vectors = if with_embedding {
        batch
            .column_by_name(VECTOR_COLUMN)
            .and_then(|col| col.as_any().downcast_ref::<FixedSizeListArray>())
    } else {
        None
    };

    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut documents = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let meta: Meta = serde_json::from_str(metas.value(row))
            .map_err(|e| VaultError::Database(format!("Failed to decode meta: {}", e)))?;

        let embedding = vectors.and_then(|list| {
            let values = list.value(row);
            values
                .as_any()
                .downcast_ref::<Float32Array>()
                .map(|floats| floats.values().to_vec())
        });

        let score = distances
            .filter(|d| !d.is_null(row))
            .map(|d| score_of(d.value(row)));

        documents.push(Document {
            id: ids.value(row).to_string(),
            content: contents.value(row).to_string(),
            meta,
            embedding,
            score,
        });
    }

    Ok(documents)
}
