//! Persistence for document records and their status lifecycle.
//!
//! [`DocumentStore`] is the trait seam the pipeline works against, with
//! [`SqliteDocumentStore`] as the production implementation. Status writes
//! go through [`DocumentStore::transition`], which loads the current row
//! and applies [`DocumentStatus::advance`], so an illegal transition is
//! rejected before anything touches the database.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::{Document, DocumentStatus, Insights, StatusEvent};

/// Storage for document records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document by id, `None` if it does not exist.
    async fn load(&self, id: &str) -> Result<Option<Document>>;

    /// Insert a new document record.
    async fn create(&self, document: &Document) -> Result<()>;

    /// Apply a lifecycle event to a document and persist the new status.
    ///
    /// Fails if the document does not exist or the event is illegal for
    /// its current status.
    async fn transition(&self, id: &str, event: StatusEvent) -> Result<DocumentStatus>;

    /// Write the derived insight fields and mark the document `completed`,
    /// in a single update.
    async fn complete(&self, id: &str, insights: &Insights) -> Result<()>;
}

/// SQLite-backed [`DocumentStore`] over the `documents` table.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn load(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, content_type, storage_path, size_bytes, status,
                   created_at, updated_at, summary, key_points_json, sentiment,
                   category, insights_json
            FROM documents WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(document_from_row).transpose()
    }

    async fn create(&self, document: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, content_type, storage_path, size_bytes,
                                   status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.filename)
        .bind(&document.content_type)
        .bind(&document.storage_path)
        .bind(document.size_bytes)
        .bind(document.status.as_str())
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn transition(&self, id: &str, event: StatusEvent) -> Result<DocumentStatus> {
        let current = self
            .load(id)
            .await?
            .ok_or_else(|| anyhow!("Document not found: {}", id))?;
        let next = current.status.advance(event)?;

        sqlx::query("UPDATE documents SET status = ?, updated_at = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(next)
    }

    async fn complete(&self, id: &str, insights: &Insights) -> Result<()> {
        let next = self.transition_target(id, StatusEvent::Complete).await?;

        sqlx::query(
            r#"
            UPDATE documents
            SET status = ?, updated_at = ?, summary = ?, key_points_json = ?,
                sentiment = ?, category = ?, insights_json = ?
            WHERE id = ?
            "#,
        )
        .bind(next.as_str())
        .bind(chrono::Utc::now().timestamp())
        .bind(&insights.summary)
        .bind(serde_json::to_string(&insights.key_points)?)
        .bind(&insights.sentiment)
        .bind(&insights.category)
        .bind(serde_json::to_string(insights)?)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl SqliteDocumentStore {
    /// Validate a transition against the current row without writing it.
    async fn transition_target(&self, id: &str, event: StatusEvent) -> Result<DocumentStatus> {
        let current = self
            .load(id)
            .await?
            .ok_or_else(|| anyhow!("Document not found: {}", id))?;
        current.status.advance(event)
    }
}

fn document_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Document> {
    let status: String = row.get("status");
    let key_points_json: Option<String> = row.get("key_points_json");
    let insights_json: Option<String> = row.get("insights_json");

    Ok(Document {
        id: row.get("id"),
        filename: row.get("filename"),
        content_type: row.get("content_type"),
        storage_path: row.get("storage_path"),
        size_bytes: row.get("size_bytes"),
        status: DocumentStatus::parse(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        summary: row.get("summary"),
        key_points: key_points_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        sentiment: row.get("sentiment"),
        category: row.get("category"),
        insights: insights_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
    })
}
