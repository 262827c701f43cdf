//! SQLite-backed vector index for chunk embeddings.
//!
//! Chunk rows are keyed `{document_id}:{chunk_index}` and carry the chunk
//! text, a sha256 text hash for staleness detection, the embedding BLOB,
//! and a metadata JSON object tagged with `document_id` and `chunk_index`.
//! Upserting a document replaces all of its rows in one transaction, so
//! re-processing the same document id never duplicates chunks. Queries are
//! scoped to a single document id by the SQL filter, which makes
//! cross-document leakage into an answer context impossible.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::RetrievedChunk;

/// Vector index over a [`SqlitePool`].
#[derive(Clone)]
pub struct VectorIndex {
    pool: SqlitePool,
    model: String,
    dims: usize,
}

impl VectorIndex {
    pub fn new(pool: SqlitePool, model: impl Into<String>, dims: usize) -> Self {
        Self {
            pool,
            model: model.into(),
            dims,
        }
    }

    /// Store or replace all chunks for a document.
    ///
    /// Deletes existing rows for the document id and inserts the new set in
    /// a single transaction, so a re-run overwrites rather than appends and
    /// readers never observe a half-replaced document.
    pub async fn upsert(
        &self,
        document_id: &str,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.len() != embeddings.len() {
            bail!(
                "Chunk/embedding count mismatch for document {}: {} chunks, {} embeddings",
                document_id,
                chunks.len(),
                embeddings.len()
            );
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for (index, (text, embedding)) in chunks.iter().zip(embeddings.iter()).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            let hash = format!("{:x}", hasher.finalize());

            let metadata = serde_json::json!({
                "document_id": document_id,
                "chunk_index": index,
            });

            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, chunk_index, text, hash, model, dims, embedding, metadata_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(format!("{}:{}", document_id, index))
            .bind(document_id)
            .bind(index as i64)
            .bind(text)
            .bind(&hash)
            .bind(&self.model)
            .bind(self.dims as i64)
            .bind(vec_to_blob(embedding))
            .bind(metadata.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Return up to `top_k` of the document's chunks ranked by cosine
    /// similarity to the query vector, highest first.
    ///
    /// Returns fewer than `top_k` if the document has fewer chunks, and an
    /// empty vec if it has none indexed.
    pub async fn query(
        &self,
        document_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let rows = sqlx::query("SELECT text, embedding, metadata_json FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;

        let mut results: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                let metadata_json: String = row.get("metadata_json");
                let metadata: serde_json::Value =
                    serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({}));
                RetrievedChunk {
                    text: row.get("text"),
                    metadata,
                    score: cosine_similarity(query_embedding, &vec),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    /// Number of chunks indexed for a document.
    pub async fn count(&self, document_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Remove all chunks for a document.
    pub async fn delete(&self, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
