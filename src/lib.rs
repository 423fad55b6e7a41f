//! Kontext - Document retrieval and question answering
//!
//! A local-first engine for grounding language-model answers in your own documents.
//!
//! # Overview
//!
//! Kontext allows you to:
//! - Split documents into overlapping, sentence-aligned chunks
//! - Embed and store chunks in a single SQLite file with a full-text index
//! - Search semantically (exact cosine scan) or by keyword (FTS5)
//! - Ask questions and get answers with page-level citations
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `document` - Source formats and text extraction
//! - `chunking` - Sentence-aligned text chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Chunk storage, vector codec and search
//! - `indexer` - Ingestion pipeline
//! - `rag` - Retrieval, context assembly and answer generation
//! - `orchestrator` - Component wiring and lifecycle
//!
//! # Example
//!
//! ```rust,no_run
//! use kontext::config::Settings;
//! use kontext::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     orchestrator.initialize().await?;
//!
//!     let report = orchestrator
//!         .indexer()
//!         .index_directory(std::path::Path::new("./docs"))
//!         .await?;
//!     println!("Indexed {} documents", report.indexed);
//!
//!     let retrieval = orchestrator.retriever().retrieve("vacation policy").await?;
//!     println!("{}", retrieval.context_text);
//!
//!     orchestrator.close().await?;
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

pub use error::{KontextError, Result};
