//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docctx",
    version,
    author = "neur0map",
    about = "Document and web context retrieval for conversational models",
    long_about = "docctx ingests a PDF or text file, retrieves the passages most relevant to a question \
                  (similarity search, optional cross-encoder reranking, MMR diversification) and composes \
                  the system prompt handed to a chat model, optionally with live web search results."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/docctx/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrieve context for a question and print the composed system prompt
    Ask {
        /// Question to answer
        query: String,

        /// Document to ingest before retrieving (.pdf or .txt)
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Add live web search results
        #[arg(short, long)]
        web: bool,

        /// Number of passages to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Number of candidates fetched before reranking and MMR
        #[arg(long)]
        fetch_k: Option<usize>,

        /// MMR relevance/diversity trade-off (0.0-1.0)
        #[arg(short, long)]
        lambda: Option<f32>,

        /// Disable MMR diversification
        #[arg(long)]
        no_mmr: bool,

        /// Enable cross-encoder reranking
        #[arg(long)]
        rerank: bool,

        /// Print JSON with context, passages and sources
        #[arg(long)]
        json: bool,
    },

    /// Extract and chunk a document without indexing it
    Chunk {
        /// Document to chunk (.pdf or .txt)
        file: PathBuf,

        /// Print chunks as JSON
        #[arg(long)]
        json: bool,
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
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
