//! CLI module for Pugg.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pugg - Study Assistant with RAG
///
/// A local-first CLI study assistant. Ingest your study material, then ask
/// questions, request summaries, and generate quizzes from it.
/// The name "Pugg" comes from the Norwegian word for "cramming."
#[derive(Parser, Debug)]
#[command(name = "pugg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Pugg and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Ingest study material (PDF, txt, md) into the knowledge base
    Ingest {
        /// Path to the document
        path: String,

        /// Force re-processing even if already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a single question through the agent
    Ask {
        /// The question or request
        question: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Show the agent's plan before the answer
        #[arg(short, long)]
        thinking: bool,
    },

    /// Start an interactive study session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Show the agent's plan before each answer
        #[arg(short, long)]
        thinking: bool,
    },

    /// Search indexed material for relevant chunks
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long, default_value = "0.3")]
        min_score: f32,
    },

    /// List indexed documents
    List,

    /// Show study session history
    Stats,

    /// Rechunk an ingested document without re-extracting
    Rechunk {
        /// Document ID to rechunk (use 'all' to rechunk everything)
        document_id: String,
    },

    /// Remove a document from the knowledge base
    Forget {
        /// Document ID to remove
        document_id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
