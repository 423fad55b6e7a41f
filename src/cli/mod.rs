//! CLI module for Kontext.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kontext - Document retrieval and question answering
///
/// Index documents into a local vector store, search them, and ask questions
/// answered from their content with page-level citations.
#[derive(Parser, Debug)]
#[command(name = "kontext")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "KONTEXT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index every supported document in a directory
    Index {
        /// Directory to scan (defaults to general.documents_dir)
        dir: Option<String>,

        /// Delete all indexed chunks first
        #[arg(long)]
        reset: bool,
    },

    /// Index a single document, replacing any earlier version
    Add {
        /// Path to a .txt, .md or .html file
        file: String,
    },

    /// Search indexed documents
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum score (-1.0 to 1.0)
        #[arg(short, long)]
        min_score: Option<f32>,

        /// Use keyword search instead of semantic search
        #[arg(short, long)]
        keyword: bool,
    },

    /// Ask a question and get an answer with sources
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show vector store statistics
    Stats,

    /// List indexed documents
    List,

    /// Delete a document's chunks
    Delete {
        /// Document name as shown by `kontext list`
        document: String,
    },

    /// Delete all indexed chunks
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration and model endpoints
    Doctor,

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

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}
