
use super::{
    ID_COLUMN, VECTOR_COLUMN, batch_to_documents, document_schema, documents_to_batch,
    schema_dimension,
};
use crate::config::Config;
use crate::database::writer::DuplicatePolicy;
use crate::document::Document;
use crate::{Result, VaultError};
use arrow::array::{RecordBatchIterator, RecordBatchReader, StringArray};
use futures::TryStreamExt;
use itertools::Itertools;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase, Select},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Metric used to rank stored vectors against a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    #[default]
    Cosine,
    DotProduct,
}

impl Similarity {
    fn distance_type(self) -> DistanceType {
        match self {
            Self::Cosine => DistanceType::Cosine,
            Self::DotProduct => DistanceType::Dot,
        }
    }

    /// Convert a LanceDB distance into a similarity score (higher is better)
    #[inline]
    pub fn score(self, distance: f32) -> f32 {
        match self {
            Self::Cosine | Self::DotProduct => 1.0 - distance,
        }
    }
}

/// Document table in an on-disk LanceDB database
#[derive(Clone)]
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
    similarity: Similarity,
}

impl VectorStore {
    /// Connect to `<base_dir>/vectors` and prepare the document table.
    ///
    /// With `recreate_index` set the table is dropped and created empty,
    /// otherwise an existing table is reused after its dimension is checked.
    #[inline]
    pub async fn open(config: &Config) -> Result<Self> {
        let store = Self::connect(config).await?;
        if config.vector_store.recreate_index {
            store.recreate().await?;
        } else {
            store.ensure_table().await?;
        }
        Ok(store)
    }

    /// Connect without ever dropping data, for querying an existing index
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            VaultError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            table_name: config.vector_store.table_name.clone(),
            dimension: config.embedding_dimension(),
            similarity: config.vector_store.similarity,
        };
        store.ensure_table().await?;
        Ok(store)
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn similarity(&self) -> Similarity {
        self.similarity
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to list tables: {}", e)))?;
        Ok(table_names.contains(&self.table_name))
    }

    /// Create the table if it is missing, or check the stored vector width
    async fn ensure_table(&self) -> Result<()> {
        if !self.table_exists().await? {
            return self.create_table().await;
        }

        let schema = self
            .open_table()
            .await?
            .schema()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to get table schema: {}", e)))?;

        match schema_dimension(&schema) {
            Some(dimension) if dimension == self.dimension => {
                debug!(
                    "Using existing table {} ({} dimensions)",
                    self.table_name, dimension
                );
                Ok(())
            }
            Some(dimension) => Err(VaultError::Database(format!(
                "Table {} stores {}-dimensional vectors but {} are configured; rebuild the index",
                self.table_name, dimension, self.dimension
            ))),
            None => Err(VaultError::Database(format!(
                "Table {} has no fixed-size vector column",
                self.table_name
            ))),
        }
    }

    async fn create_table(&self) -> Result<()> {
        self.connection
            .create_empty_table(&self.table_name, document_schema(self.dimension))
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to create table: {}", e)))?;

        info!(
            "Created table {} with {} dimensions",
            self.table_name, self.dimension
        );
        Ok(())
    }

    /// Drop every stored document and start from an empty table
    #[inline]
    pub async fn recreate(&self) -> Result<()> {
        if self.table_exists().await? {
            info!("Dropping existing table {}", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| VaultError::Database(format!("Failed to drop table: {}", e)))?;
        }
        self.create_table().await
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to open table: {}", e)))
    }

    /// Write embedded documents keyed by id.
    ///
    /// Later copies of an id within `documents` replace earlier ones. Returns
    /// the number of records inserted or replaced.
    #[inline]
    pub async fn upsert_documents(
        &self,
        documents: Vec<Document>,
        policy: DuplicatePolicy,
    ) -> Result<usize> {
        let documents = dedupe_keep_last(documents);
        if documents.is_empty() {
            debug!("No documents to write");
            return Ok(0);
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let batch = documents_to_batch(&documents, self.dimension, &created_at)?;
        let table = self.open_table().await?;
        let before = self.count_rows(&table).await?;

        let schema = batch.schema();
        let reader: Box<dyn RecordBatchReader + Send> = Box::new(RecordBatchIterator::new(
            std::iter::once(Ok(batch)),
            schema,
        ));

        match policy {
            DuplicatePolicy::Overwrite => {
                let mut merge = table.merge_insert(&[ID_COLUMN]);
                merge
                    .when_matched_update_all(None)
                    .when_not_matched_insert_all();
                merge.execute(reader).await.map_err(|e| {
                    VaultError::Database(format!("Failed to upsert documents: {}", e))
                })?;
            }
            DuplicatePolicy::Skip => {
                let mut merge = table.merge_insert(&[ID_COLUMN]);
                merge.when_not_matched_insert_all();
                merge.execute(reader).await.map_err(|e| {
                    VaultError::Database(format!("Failed to insert documents: {}", e))
                })?;
            }
            DuplicatePolicy::Fail => {
                let existing = self.existing_ids(&table, &documents).await?;
                if !existing.is_empty() {
                    return Err(VaultError::Database(format!(
                        "{} document id(s) already stored, first: {}",
                        existing.len(),
                        existing[0]
                    )));
                }
                table.add(reader).execute().await.map_err(|e| {
                    VaultError::Database(format!("Failed to insert documents: {}", e))
                })?;
            }
        }

        let written = match policy {
            DuplicatePolicy::Skip => self.count_rows(&table).await?.saturating_sub(before),
            DuplicatePolicy::Overwrite | DuplicatePolicy::Fail => documents.len(),
        };

        info!("Wrote {} documents to {}", written, self.table_name);
        Ok(written)
    }

    async fn existing_ids(&self, table: &Table, documents: &[Document]) -> Result<Vec<String>> {
        let id_list = documents
            .iter()
            .map(|d| format!("'{}'", d.id.replace('\'', "''")))
            .join(", ");

        let mut stream = table
            .query()
            .only_if(format!("{} IN ({})", ID_COLUMN, id_list))
            .select(Select::columns(&[ID_COLUMN]))
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to query ids: {}", e)))?;

        let mut ids = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to read id stream: {}", e)))?
        {
            let column = batch
                .column_by_name(ID_COLUMN)
                .and_then(|col| col.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| VaultError::Database("Missing id column".to_string()))?;
            ids.extend(column.iter().flatten().map(str::to_string));
        }
        Ok(ids)
    }

    async fn count_rows(&self, table: &Table) -> Result<usize> {
        table
            .count_rows(None)
            .await
            .map_err(|e| VaultError::Database(format!("Failed to count rows: {}", e)))
    }

    /// Number of stored documents
    #[inline]
    pub async fn count_documents(&self) -> Result<usize> {
        let table = self.open_table().await?;
        self.count_rows(&table).await
    }

    /// Nearest stored documents to `query`, best first.
    ///
    /// Equal scores are ordered by id. The candidate window starts at twice
    /// `top_k` and doubles while the scores tied at the cut-off may continue
    /// past it, so the same documents come back on every run.
    #[inline]
    pub async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        with_embedding: bool,
    ) -> Result<Vec<Document>> {
        if query.len() != self.dimension {
            return Err(VaultError::Database(format!(
                "Query vector has {} dimensions, table expects {}",
                query.len(),
                self.dimension
            )));
        }

        let table = self.open_table().await?;
        let total = self.count_rows(&table).await?;
        if top_k == 0 || total == 0 {
            debug!("Nothing to search in {}", self.table_name);
            return Ok(Vec::new());
        }

        let mut limit = top_k.saturating_mul(2).min(total);
        let mut documents = loop {
            let mut candidates = self
                .fetch_candidates(&table, query, limit, with_embedding)
                .await?;
            rank_documents(&mut candidates);

            if candidates.len() < limit || limit >= total || !tie_reaches_end(&candidates, top_k)
            {
                break candidates;
            }

            let widened = limit.saturating_mul(2).min(total);
            debug!(
                "Scores tied at the cut-off, widening search window from {} to {}",
                limit, widened
            );
            limit = widened;
        };
        documents.truncate(top_k);

        debug!("Search returned {} documents", documents.len());
        Ok(documents)
    }

    async fn fetch_candidates(
        &self,
        table: &Table,
        query: &[f32],
        limit: usize,
        with_embedding: bool,
    ) -> Result<Vec<Document>> {
        let mut stream = table
            .vector_search(query)
            .map_err(|e| VaultError::Database(format!("Failed to create vector search: {}", e)))?
            .column(VECTOR_COLUMN)
            .distance_type(self.similarity.distance_type())
            .limit(limit)
            .execute()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to execute search: {}", e)))?;

        let similarity = self.similarity;
        let mut documents = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| VaultError::Database(format!("Failed to read result stream: {}", e)))?
        {
            documents.extend(batch_to_documents(&batch, with_embedding, |d| {
                similarity.score(d)
            })?);
        }
        Ok(documents)
    }
}

/// Descending score, then ascending id. Missing and non-finite scores rank last.
#[inline]
pub fn rank_documents(documents: &mut [Document]) {
    documents.sort_by(|a, b| {
        rank_score(b)
            .total_cmp(&rank_score(a))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn rank_score(document: &Document) -> f32 {
    document
        .score
        .filter(|score| score.is_finite())
        .unwrap_or(f32::NEG_INFINITY)
}

/// Whether the score at position `top_k` is still shared by the last ranked
/// candidate, meaning rows left out of the window could tie with the cut-off.
fn tie_reaches_end(ranked: &[Document], top_k: usize) -> bool {
    match (ranked.get(top_k.saturating_sub(1)), ranked.last()) {
        (Some(kth), Some(last)) if ranked.len() > top_k => {
            let cutoff = rank_score(kth);
            cutoff.is_finite() && rank_score(last).total_cmp(&cutoff).is_eq()
        }
        _ => false,
    }
}

/// Drop earlier copies of repeated ids, keeping each id at its last position
fn dedupe_keep_last(documents: Vec<Document>) -> Vec<Document> {
    let mut last_index: HashMap<String, usize> = HashMap::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        last_index.insert(document.id.clone(), index);
    }

    documents
        .into_iter()
        .enumerate()
        .filter(|(index, document)| last_index.get(&document.id) == Some(index))
        .map(|(_, document)| document)
        .collect()
}
