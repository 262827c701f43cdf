//! The document processing pipeline: extract, chunk, embed, index, derive
//! insights, and drive the status lifecycle around all of it.
//!
//! [`Processor::process`] is the unit of work a background job runs. The
//! `processing` status is committed before any heavy stage begins, so an
//! observer polling the document sees the transition immediately rather
//! than after extraction finishes.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::Embedder;
use crate::index::VectorIndex;
use crate::insights::InsightExtractor;
use crate::models::StatusEvent;
use crate::store::DocumentStore;

/// Runs the full pipeline for one document.
pub struct Processor {
    store: Arc<dyn DocumentStore>,
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    insights: InsightExtractor,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl Processor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        insights: InsightExtractor,
        chunking: ChunkingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            insights,
            chunking,
            batch_size,
        }
    }

    /// Process one document end to end.
    ///
    /// A missing document record is logged and treated as a no-op rather
    /// than an error, so a stale job for a deleted document cannot crash
    /// the worker. Any stage failure marks the document `failed` (best
    /// effort) and propagates the original error.
    pub async fn process(&self, document_id: &str, file_path: &Path) -> Result<()> {
        if self.store.load(document_id).await?.is_none() {
            error!(document_id, "document not found, skipping processing");
            return Ok(());
        }

        self.store
            .transition(document_id, StatusEvent::Start)
            .await?;
        info!(document_id, path = %file_path.display(), "processing started");

        match self.run_stages(document_id, file_path).await {
            Ok(()) => {
                info!(document_id, "processing completed");
                Ok(())
            }
            Err(err) => {
                warn!(document_id, error = %err, "processing failed");
                if let Err(transition_err) = self
                    .store
                    .transition(document_id, StatusEvent::Fail)
                    .await
                {
                    // Do not mask the original failure with the bookkeeping one.
                    error!(document_id, error = %transition_err, "could not mark document failed");
                }
                Err(err)
            }
        }
    }

    async fn run_stages(&self, document_id: &str, file_path: &Path) -> Result<()> {
        let extraction = crate::extract::extract_text(file_path)
            .with_context(|| format!("Failed to extract text from {}", file_path.display()))?;

        let chunks = chunk_text(
            &extraction.text,
            self.chunking.chunk_size,
            self.chunking.overlap,
        );
        info!(document_id, chunks = chunks.len(), "text chunked");

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let mut batch_embeddings = self.embedder.embed(batch).await?;
            embeddings.append(&mut batch_embeddings);
        }

        self.index
            .upsert(document_id, &chunks, &embeddings)
            .await?;
        info!(document_id, "chunks indexed");

        let insights = self.insights.extract(&extraction.text).await?;
        self.store.complete(document_id, &insights).await?;

        Ok(())
    }
}
