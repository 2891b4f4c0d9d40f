//! Pugg - Study Assistant with RAG
//!
//! A local-first CLI study assistant. The name "Pugg" comes from the
//! Norwegian word for "cramming."
//!
//! # Overview
//!
//! Pugg allows you to:
//! - Ingest PDF and text study material into a searchable vector store
//! - Ask questions answered by an intent-routing agent with six fixed tools
//!   (explain, summarize, quiz, solve, evaluate, retrieve)
//! - Hold an interactive study session with short-term memory and
//!   proactive suggestions
//! - Search through your material semantically
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `ingest` - Document text extraction
//! - `chunking` - Text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `retrieval` - Chunk retrieval over the store
//! - `llm` - LLM completion client
//! - `memory` - Session memory and statistics
//! - `agent` - Planner, dispatcher, and the tool registry
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use pugg::config::Settings;
//! use pugg::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     // Index study material
//!     let result = orchestrator
//!         .ingest_document(std::path::Path::new("notes.pdf"), false)
//!         .await?;
//!     println!("Indexed {} chunks", result.chunks_indexed);
//!
//!     // Ask a question through the agent
//!     let planner = orchestrator.planner();
//!     let dispatcher = orchestrator.dispatcher();
//!     let mut session = orchestrator.session();
//!
//!     let plan = planner.plan("Quiz me on chapter 1", &session.memory, true);
//!     let outcome = dispatcher.run(&plan, "Quiz me on chapter 1", &mut session).await?;
//!     println!("{}", outcome.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod vector_store;

pub use error::{PuggError, Result};
