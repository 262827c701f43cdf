//! Core data models: documents, the status lifecycle, insights, and
//! retrieval results.
//!
//! Every status write in the system goes through [`DocumentStatus::advance`]
//! so the state machine is enforced in one place rather than scattered
//! across call sites.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a document.
///
/// ```text
/// received ──▶ processing ──▶ completed
///                  │
///                  └────────▶ failed
/// ```
///
/// `Start` is legal from any state: a manual retry after `failed` (or a
/// re-delivered job after `completed`) re-enters `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Received,
    Processing,
    Completed,
    Failed,
}

/// Event applied to a document's status via [`DocumentStatus::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// A processing run begins.
    Start,
    /// The pipeline finished and derived fields are being written.
    Complete,
    /// The pipeline aborted.
    Fail,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Received => "received",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "received" => Ok(DocumentStatus::Received),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => bail!("Unknown document status: {}", other),
        }
    }

    /// Apply a lifecycle event, returning the next status.
    ///
    /// `Complete` and `Fail` are only legal while `processing`; `Start` is
    /// legal from any state so re-running a document is always possible.
    pub fn advance(self, event: StatusEvent) -> Result<Self> {
        match event {
            StatusEvent::Start => Ok(DocumentStatus::Processing),
            StatusEvent::Complete => match self {
                DocumentStatus::Processing => Ok(DocumentStatus::Completed),
                other => bail!("Cannot complete a document in status '{}'", other.as_str()),
            },
            StatusEvent::Fail => match self {
                DocumentStatus::Processing => Ok(DocumentStatus::Failed),
                other => bail!("Cannot fail a document in status '{}'", other.as_str()),
            },
        }
    }
}

/// A document record as seen by the pipeline.
///
/// The extracted full text is transient and never stored here; derived
/// fields stay `None` until the document reaches `completed`. On `failed`
/// they retain whatever partial state existed before the failure.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub status: DocumentStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub sentiment: Option<String>,
    pub category: Option<String>,
    pub insights: Option<Insights>,
}

impl Document {
    /// Create a new `received` document with no derived fields.
    pub fn received(
        id: String,
        filename: String,
        content_type: String,
        storage_path: String,
        size_bytes: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            filename,
            content_type,
            storage_path,
            size_bytes,
            status: DocumentStatus::Received,
            created_at: now,
            updated_at: now,
            summary: None,
            key_points: None,
            sentiment: None,
            category: None,
            insights: None,
        }
    }
}

/// A table detected in extracted text: first row of a run is headers,
/// the rest are data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Aggregate derived-analysis bundle written when processing completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insights {
    pub summary: String,
    pub key_points: Vec<String>,
    pub sentiment: String,
    pub category: String,
    /// First 8 key points, kept as a flat keyword list.
    pub keywords: Vec<String>,
    pub tables: Vec<Table>,
}

/// A chunk returned from a vector index query, ranked by similarity.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: serde_json::Value,
    pub score: f32,
}

/// The result of a retrieval-augmented answer call.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
}
