//! End-to-end pipeline tests over a temporary SQLite database, with a
//! deterministic in-process embedder and canned generator standing in for
//! the remote providers.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use docinsights::chunk::chunk_text;
use docinsights::embedding::{l2_normalize, Embedder};
use docinsights::index::VectorIndex;
use docinsights::insights::InsightExtractor;
use docinsights::llm::Generator;
use docinsights::models::{Document, DocumentStatus};
use docinsights::pipeline::Processor;
use docinsights::rag::{Answerer, NO_ANSWER};
use docinsights::store::{DocumentStore, SqliteDocumentStore};
use docinsights::{db, migrate};

const DIMS: usize = 16;

/// Deterministic bag-of-words embedder: each word hashes into one of the
/// dimensions, the result is L2-normalized. Similar texts share words and
/// therefore score higher, which is enough signal for retrieval tests.
struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-bow"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vec = vec![0.0f32; DIMS];
                for word in text.split_whitespace() {
                    let mut hasher = DefaultHasher::new();
                    word.to_lowercase().hash(&mut hasher);
                    vec[(hasher.finish() as usize) % DIMS] += 1.0;
                }
                l2_normalize(&mut vec);
                vec
            })
            .collect())
    }
}

/// Generator with canned per-prompt replies, counting invocations.
struct CannedGenerator {
    calls: AtomicUsize,
}

impl CannedGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, system_prompt: &str, _: &str, _: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if system_prompt.starts_with("Summarize") {
            Ok("The document describes quarterly financial performance.".to_string())
        } else if system_prompt.starts_with("List the") {
            Ok("- Revenue grew\n- Costs fell\n- Margins improved".to_string())
        } else if system_prompt.contains("sentiment") {
            Ok("Positive".to_string())
        } else if system_prompt.contains("category") {
            Ok("Finance".to_string())
        } else {
            // The answer path: echo something grounded.
            Ok("Revenue grew according to the report.".to_string())
        }
    }
}

/// Generator that always fails, standing in for an unreachable backend.
struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _: &str, _: &str, _: u32) -> Result<String> {
        anyhow::bail!("backend unreachable")
    }
}

struct TestEnv {
    _dir: TempDir,
    store: Arc<SqliteDocumentStore>,
    index: VectorIndex,
    file_path: PathBuf,
}

async fn setup(text: &str, generator: Arc<dyn Generator>) -> (TestEnv, Processor) {
    let dir = TempDir::new().unwrap();
    let pool = db::connect(&dir.path().join("data/test.sqlite"))
        .await
        .unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let file_path = dir.path().join("document.txt");
    std::fs::write(&file_path, text).unwrap();

    let store = Arc::new(SqliteDocumentStore::new(pool.clone()));
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder);
    let index = VectorIndex::new(pool, embedder.model_name(), embedder.dims());
    let processor = Processor::new(
        store.clone(),
        index.clone(),
        embedder,
        InsightExtractor::new(generator),
        docinsights::config::ChunkingConfig {
            chunk_size: 1000,
            overlap: 200,
        },
        32,
    );

    (
        TestEnv {
            _dir: dir,
            store,
            index,
            file_path,
        },
        processor,
    )
}

async fn register(env: &TestEnv, id: &str) {
    let document = Document::received(
        id.to_string(),
        "document.txt".to_string(),
        "text/plain".to_string(),
        env.file_path.display().to_string(),
        0,
    );
    env.store.create(&document).await.unwrap();
}

fn long_text() -> String {
    // 3000 chars of repeating finance prose, enough for several chunks.
    let sentence = "Quarterly revenue grew while operating costs fell across all regions. ";
    sentence.repeat(3000 / sentence.len() + 1)[..3000].to_string()
}

#[tokio::test]
async fn pipeline_completes_and_derives_insights() {
    let text = long_text();
    let (env, processor) = setup(&text, CannedGenerator::new()).await;
    register(&env, "doc-1").await;

    processor.process("doc-1", &env.file_path).await.unwrap();

    let document = env.store.load("doc-1").await.unwrap().unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);
    assert_eq!(
        document.summary.as_deref(),
        Some("The document describes quarterly financial performance.")
    );
    let key_points = document.key_points.unwrap();
    assert!(!key_points.is_empty() && key_points.len() <= 5);
    assert_eq!(document.sentiment.as_deref(), Some("positive"));
    assert_eq!(document.category.as_deref(), Some("Finance"));

    // Chunk count matches the chunker applied to the same text.
    let expected = chunk_text(&text, 1000, 200).len();
    assert_eq!(env.index.count("doc-1").await.unwrap(), expected as i64);
}

#[tokio::test]
async fn reprocessing_is_idempotent() {
    let text = long_text();
    let (env, processor) = setup(&text, CannedGenerator::new()).await;
    register(&env, "doc-1").await;

    processor.process("doc-1", &env.file_path).await.unwrap();
    let first_count = env.index.count("doc-1").await.unwrap();

    processor.process("doc-1", &env.file_path).await.unwrap();

    let document = env.store.load("doc-1").await.unwrap().unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);
    assert_eq!(env.index.count("doc-1").await.unwrap(), first_count);
}

#[tokio::test]
async fn generator_failure_marks_document_failed() {
    let (env, processor) = setup(&long_text(), Arc::new(FailingGenerator)).await;
    register(&env, "doc-1").await;

    let result = processor.process("doc-1", &env.file_path).await;
    assert!(result.is_err());

    let document = env.store.load("doc-1").await.unwrap().unwrap();
    assert_eq!(document.status, DocumentStatus::Failed);
    assert!(document.summary.is_none());
}

#[tokio::test]
async fn missing_document_is_a_logged_noop() {
    let (env, processor) = setup("some text", CannedGenerator::new()).await;
    // No register call: the document record does not exist.
    processor.process("ghost", &env.file_path).await.unwrap();
    assert!(env.store.load("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn ask_answers_from_the_documents_chunks() {
    let text = long_text();
    let generator = CannedGenerator::new();
    let (env, processor) = setup(&text, generator.clone()).await;
    register(&env, "doc-1").await;
    processor.process("doc-1", &env.file_path).await.unwrap();

    let answerer = Answerer::new(
        Arc::new(FakeEmbedder),
        env.index.clone(),
        generator.clone(),
        4,
    );
    let answer = answerer
        .answer("doc-1", "Did revenue grow this quarter?")
        .await
        .unwrap();

    assert_eq!(answer.answer, "Revenue grew according to the report.");
    assert!(!answer.sources.is_empty() && answer.sources.len() <= 4);
    for source in &answer.sources {
        assert_eq!(source.metadata["document_id"], "doc-1");
    }
}

#[tokio::test]
async fn ask_on_unindexed_document_short_circuits() {
    let (env, _processor) = setup("unused", CannedGenerator::new()).await;

    let generator = CannedGenerator::new();
    let answerer = Answerer::new(
        Arc::new(FakeEmbedder),
        env.index.clone(),
        generator.clone(),
        4,
    );
    let answer = answerer.answer("doc-none", "Anything?").await.unwrap();

    assert_eq!(answer.answer, NO_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}
