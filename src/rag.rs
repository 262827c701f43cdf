//! Retrieval-augmented answering over one document's indexed chunks.
//!
//! A question is embedded with the same model used at ingestion, the top-k
//! most similar chunks of the target document are retrieved, and an answer
//! is generated strictly from that context. The answer can never draw on
//! chunks outside the target document because retrieval is scoped by
//! document id.

use anyhow::Result;
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::index::VectorIndex;
use crate::llm::Generator;
use crate::models::Answer;

/// Fixed reply when retrieval returns nothing or the context does not
/// support an answer.
pub const NO_ANSWER: &str = "I don't know";

/// Default number of chunks retrieved as answer context.
pub const DEFAULT_TOP_K: usize = 4;

/// Answers natural-language questions about a single document.
pub struct Answerer {
    embedder: Arc<dyn Embedder>,
    index: VectorIndex,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl Answerer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: VectorIndex,
        generator: Arc<dyn Generator>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            top_k,
        }
    }

    /// Answer a question about one document.
    ///
    /// When the document has no indexed chunks this short-circuits to
    /// [`NO_ANSWER`] with empty sources — the generator is never invoked on
    /// empty context. Otherwise the retrieved chunk texts, in ranking
    /// order, become the grounding context and are returned as sources for
    /// traceability.
    pub async fn answer(&self, document_id: &str, question: &str) -> Result<Answer> {
        let question_embedding = self.embedder.embed_one(question).await?;
        let sources = self
            .index
            .query(document_id, &question_embedding, self.top_k)
            .await?;

        if sources.is_empty() {
            return Ok(Answer {
                answer: NO_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = sources
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let system_prompt = format!(
            "You are an assistant answering questions based strictly on the provided context. \
             If the answer is not in the context, respond with \"{}\".\n\nContext:\n{}",
            NO_ANSWER, context
        );
        let answer = self.generator.complete(&system_prompt, question, 400).await?;

        Ok(Answer { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        fn model_name(&self) -> &str {
            "unit"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// Counts invocations so tests can assert the generator was never called.
    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for CountingGenerator {
        fn model_name(&self) -> &str {
            "counting"
        }
        async fn complete(&self, _: &str, _: &str, _: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("Grounded answer.".to_string())
        }
    }

    #[tokio::test]
    async fn empty_retrieval_short_circuits_without_generation() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = db::connect(&dir.path().join("rag.sqlite")).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();

        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
        });
        let answerer = Answerer::new(
            Arc::new(UnitEmbedder),
            VectorIndex::new(pool, "unit", 2),
            generator.clone(),
            DEFAULT_TOP_K,
        );

        let result = answerer.answer("no-such-doc", "What is this?").await.unwrap();
        assert_eq!(result.answer, NO_ANSWER);
        assert!(result.sources.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn indexed_document_produces_grounded_answer_with_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = db::connect(&dir.path().join("rag.sqlite")).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let index = VectorIndex::new(pool, "unit", 2);

        let chunks = vec!["The report covers quarterly revenue.".to_string()];
        let embeddings = vec![vec![1.0, 0.0]];
        index.upsert("doc-1", &chunks, &embeddings).await.unwrap();

        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
        });
        let answerer = Answerer::new(Arc::new(UnitEmbedder), index, generator.clone(), 4);

        let result = answerer.answer("doc-1", "What does the report cover?").await.unwrap();
        assert_eq!(result.answer, "Grounded answer.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].metadata["document_id"], "doc-1");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }
}
