//! # DocInsights CLI (`doci`)
//!
//! The `doci` binary drives the document analysis pipeline from the command
//! line: database initialization, file ingestion, status polling, insight
//! display, and question answering.
//!
//! ## Usage
//!
//! ```bash
//! doci --config ./config/doci.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `doci init` | Create the SQLite database and run schema migrations |
//! | `doci ingest <file>` | Register a file and process it through the pipeline |
//! | `doci status <id>` | Show a document's lifecycle status |
//! | `doci insights <id>` | Show a completed document's derived insights |
//! | `doci ask <id> "<question>"` | Answer a question from the document's chunks |

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use docinsights::config;
use docinsights::embedding::create_embedder;
use docinsights::index::VectorIndex;
use docinsights::insights::InsightExtractor;
use docinsights::jobs::{JobQueue, ProcessingJob, TokioJobQueue};
use docinsights::llm::create_generator;
use docinsights::models::Document;
use docinsights::pipeline::Processor;
use docinsights::rag::Answerer;
use docinsights::store::{DocumentStore, SqliteDocumentStore};
use docinsights::{db, extract, migrate};

/// DocInsights — a document analysis pipeline with retrieval-grounded
/// question answering.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/doci.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "doci",
    about = "DocInsights — document extraction, insights, and retrieval-grounded Q&A",
    version,
    long_about = "DocInsights ingests documents (PDF, DOCX, images, plain text), extracts and \
    chunks their text, embeds the chunks into a per-document vector index, derives insights \
    (summary, key points, sentiment, category), and answers questions strictly from a \
    document's own content."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/doci.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks). This command is idempotent.
    Init,

    /// Ingest a file and process it.
    ///
    /// Registers the file as a `received` document, then runs the full
    /// pipeline (extract, chunk, embed, index, insights) as a background
    /// job and waits for it to finish.
    Ingest {
        /// Path to the file to ingest.
        file: PathBuf,
    },

    /// Show a document's lifecycle status.
    Status {
        /// Document id.
        id: String,
    },

    /// Show a completed document's derived insights.
    Insights {
        /// Document id.
        id: String,
    },

    /// Answer a question about a document.
    ///
    /// Retrieves the document's most relevant chunks and answers strictly
    /// from them. Replies "I don't know" when the document has no indexed
    /// content or the answer is not in it.
    Ask {
        /// Document id.
        id: String,

        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve as context.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docinsights=info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let pool = db::connect(&cfg.db.path).await?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file } => {
            let metadata = std::fs::metadata(&file)
                .map_err(|e| anyhow!("Cannot read {}: {}", file.display(), e))?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unnamed")
                .to_string();
            let format = extract::DocumentFormat::from_path(&file);

            let store = Arc::new(SqliteDocumentStore::new(pool.clone()));
            let embedder = create_embedder(&cfg.embedding)?;
            let generator = create_generator(&cfg.llm)?;
            let index = VectorIndex::new(pool.clone(), embedder.model_name(), embedder.dims());
            let processor = Processor::new(
                store.clone(),
                index,
                embedder,
                InsightExtractor::new(generator),
                cfg.chunking.clone(),
                cfg.embedding.batch_size,
            );
            let queue = TokioJobQueue::new(Arc::new(processor));

            let document = Document::received(
                uuid::Uuid::new_v4().to_string(),
                filename,
                format.mime_type().to_string(),
                file.display().to_string(),
                metadata.len() as i64,
            );
            store.create(&document).await?;
            println!("Document registered: {}", document.id);

            let handle = queue
                .submit(ProcessingJob {
                    document_id: document.id.clone(),
                    file_path: file,
                })
                .await?;

            match handle.join().await {
                Ok(()) => println!("Processing completed: {}", document.id),
                Err(err) => {
                    println!("Processing failed: {}", err);
                    std::process::exit(1);
                }
            }
        }
        Commands::Status { id } => {
            let store = SqliteDocumentStore::new(pool);
            let document = store
                .load(&id)
                .await?
                .ok_or_else(|| anyhow!("Document not found: {}", id))?;
            println!("Document: {}", document.id);
            println!("  Filename:     {}", document.filename);
            println!("  Content type: {}", document.content_type);
            println!("  Size:         {} bytes", document.size_bytes);
            println!("  Status:       {}", document.status.as_str());
        }
        Commands::Insights { id } => {
            let store = SqliteDocumentStore::new(pool);
            let document = store
                .load(&id)
                .await?
                .ok_or_else(|| anyhow!("Document not found: {}", id))?;
            let insights = document.insights.ok_or_else(|| {
                anyhow!(
                    "No insights for document {} (status: {})",
                    id,
                    document.status.as_str()
                )
            })?;

            println!("Summary:");
            println!("  {}", insights.summary);
            println!("\nKey points:");
            for point in &insights.key_points {
                println!("  - {}", point);
            }
            println!("\nSentiment: {}", insights.sentiment);
            println!("Category:  {}", insights.category);
            if !insights.keywords.is_empty() {
                println!("Keywords:  {}", insights.keywords.join(", "));
            }
            if !insights.tables.is_empty() {
                println!("\nTables detected: {}", insights.tables.len());
                for (i, table) in insights.tables.iter().enumerate() {
                    println!(
                        "  [{}] {} columns, {} rows",
                        i,
                        table.headers.len(),
                        table.rows.len()
                    );
                }
            }
        }
        Commands::Ask { id, question, top_k } => {
            let embedder = create_embedder(&cfg.embedding)?;
            let generator = create_generator(&cfg.llm)?;
            let index = VectorIndex::new(pool, embedder.model_name(), embedder.dims());
            let answerer = Answerer::new(
                embedder,
                index,
                generator,
                top_k.unwrap_or(cfg.retrieval.top_k),
            );

            let answer = answerer.answer(&id, &question).await?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for source in &answer.sources {
                    let chunk_index = source.metadata["chunk_index"].as_u64().unwrap_or(0);
                    println!("  [chunk {}] score {:.3}", chunk_index, source.score);
                }
            }
        }
    }

    Ok(())
}
