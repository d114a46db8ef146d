//! # bookrag CLI
//!
//! The `bookrag` binary starts the HTTP server or runs one-shot queries
//! against a set of files loaded into a fresh in-memory service.
//!
//! ## Usage
//!
//! ```bash
//! bookrag --config ./config/bookrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bookrag serve` | Start the HTTP server |
//! | `bookrag ask "<question>" --file <path>...` | Answer a question from the given books |
//! | `bookrag which-book "<topic>" --file <path>...` | Rank the given books by topic mentions |
//! | `bookrag chunk <path>` | Show how a file is split into chunks |
//!
//! Logs go to stderr; filter with `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use bookrag::config::{build_service, load_or_default, Config};
use bookrag::core::chunk::{split_words, word_count};
use bookrag::core::RetrievalService;
use bookrag::extract::{extract_text, resolve_content_type};
use bookrag::server::run_server;

/// bookrag: upload books, ask questions, find which book covers a topic.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "bookrag",
    about = "In-memory book retrieval: ask questions across PDFs and find which book covers a topic",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bookrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Load the given files and answer a question from them.
    Ask {
        /// The question to answer.
        question: String,

        /// Book to load (PDF, .txt or .md). Repeatable.
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },

    /// Load the given files and count topic mentions per book.
    WhichBook {
        /// The topic to look for.
        topic: String,

        /// Book to load (PDF, .txt or .md). Repeatable.
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the chunk count and per-chunk word counts for a file.
    Chunk {
        /// File to split (PDF, .txt or .md).
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            run_server(&config).await?;
        }
        Commands::Ask { question, files } => {
            let answer = tokio::task::spawn_blocking(move || {
                let service = load_books(&config, &files)?;
                Ok::<_, anyhow::Error>(service.ask(&question)?)
            })
            .await??;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::WhichBook { topic, files } => {
            let report = tokio::task::spawn_blocking(move || {
                let service = load_books(&config, &files)?;
                Ok::<_, anyhow::Error>(service.which_books(&topic)?)
            })
            .await??;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Chunk { path } => {
            let text = read_text(&path)?;
            let chunks = split_words(&text, config.chunking.words);
            println!("{}: {} chunks", display_name(&path), chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                println!("  chunk {}: {} words", i, word_count(chunk));
            }
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and extract the text of a book file.
fn read_text(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = resolve_content_type(None, &display_name(path));
    extract_text(&bytes, &content_type).with_context(|| path.display().to_string())
}

/// Build a fresh service from `config` and upload every file into it.
fn load_books(config: &Config, files: &[PathBuf]) -> Result<RetrievalService> {
    let service = build_service(config)?;
    for path in files {
        let text = read_text(path)?;
        service
            .upload(&display_name(path), &text)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }
    Ok(service)
}
