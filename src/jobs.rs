//! Background job submission for document processing.
//!
//! A [`JobQueue`] accepts [`ProcessingJob`]s and returns a [`JobHandle`]
//! the caller can await. [`TokioJobQueue`] runs each job on a spawned
//! tokio task; failures are logged at the queue boundary in addition to
//! being surfaced through the handle, so a caller that never joins still
//! leaves a trace.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

use crate::pipeline::Processor;

/// One unit of processing work: a document record and the file to process.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub document_id: String,
    pub file_path: PathBuf,
}

/// Handle to a submitted job.
pub struct JobHandle {
    inner: JoinHandle<Result<()>>,
}

impl JobHandle {
    /// Wait for the job to finish, surfacing its pipeline error if it
    /// failed or a panic as an error.
    pub async fn join(self) -> Result<()> {
        self.inner.await?
    }
}

/// Accepts processing jobs for asynchronous execution.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn submit(&self, job: ProcessingJob) -> Result<JobHandle>;
}

/// In-process queue that runs each job on its own tokio task.
pub struct TokioJobQueue {
    processor: Arc<Processor>,
}

impl TokioJobQueue {
    pub fn new(processor: Arc<Processor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl JobQueue for TokioJobQueue {
    async fn submit(&self, job: ProcessingJob) -> Result<JobHandle> {
        let processor = Arc::clone(&self.processor);
        let inner = tokio::spawn(async move {
            let result = processor.process(&job.document_id, &job.file_path).await;
            if let Err(ref err) = result {
                error!(document_id = %job.document_id, error = %err, "processing job failed");
            }
            result
        });
        Ok(JobHandle { inner })
    }
}
