//! DocInsights: a document analysis pipeline with retrieval-augmented
//! question answering.
//!
//! Ingested files flow through extraction, chunking, embedding, and
//! vector indexing, then an insight pass derives a summary, key points,
//! sentiment, and a category. Questions about a document are answered
//! strictly from its own indexed chunks.
//!
//! ```text
//! file ─▶ extract ─▶ chunk ─▶ embed ─▶ index ─┐
//!                      │                      │
//!                      └─▶ insights ──────────┴─▶ documents table
//!
//! question ─▶ embed ─▶ query(index) ─▶ generate ─▶ answer + sources
//! ```
//!
//! Module map:
//! - [`config`]: TOML configuration with validation
//! - [`models`]: documents, the status state machine, insights, answers
//! - [`db`] / [`migrate`]: SQLite pool and schema
//! - [`extract`]: PDF/DOCX/image/plain-text extraction with fallback
//! - [`chunk`]: fixed-size overlapping chunking
//! - [`embedding`]: the [`embedding::Embedder`] seam and its providers
//! - [`index`]: per-document vector index over SQLite
//! - [`llm`]: the [`llm::Generator`] seam and its providers
//! - [`insights`]: summary, key points, sentiment, category, tables
//! - [`rag`]: retrieval-augmented answering
//! - [`store`]: document persistence and lifecycle transitions
//! - [`pipeline`] / [`jobs`]: the processing run and its background queue

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod insights;
pub mod jobs;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod rag;
pub mod store;
