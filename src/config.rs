//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or [`Config::minimal`])
//! yields a working lexical server on `0.0.0.0:5000`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use bookrag_core::chunk::DEFAULT_CHUNK_WORDS;
use bookrag_core::{
    DenseScorer, DocumentIndex, LexicalScorer, RetrievalService, Scorer, ServiceOptions,
};

use crate::embedding::create_provider;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_words")]
    pub words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            words: default_words(),
        }
    }
}

fn default_words() -> usize {
    DEFAULT_CHUNK_WORDS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_ask_k")]
    pub ask_k: usize,
    #[serde(default = "default_topic_k")]
    pub topic_k: usize,
    /// Dense only: neighbours further than this are not counted as mentions.
    #[serde(default)]
    pub max_distance: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            ask_k: default_ask_k(),
            topic_k: default_topic_k(),
            max_distance: None,
        }
    }
}

fn default_strategy() -> String {
    "lexical".to_string()
}
fn default_ask_k() -> usize {
    5
}
fn default_topic_k() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}
fn default_max_upload_mb() -> usize {
    64
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.words == 0 {
            bail!("chunking.words must be > 0");
        }

        if self.retrieval.ask_k < 1 {
            bail!("retrieval.ask_k must be >= 1");
        }
        if self.retrieval.topic_k < 1 {
            bail!("retrieval.topic_k must be >= 1");
        }
        if let Some(max) = self.retrieval.max_distance {
            if max.is_nan() || max < 0.0 {
                bail!("retrieval.max_distance must be >= 0");
            }
        }

        match self.embedding.provider.as_str() {
            "disabled" | "local" => {}
            "openai" | "ollama" => {
                if self.embedding.model.is_none() {
                    bail!(
                        "embedding.model must be specified when provider is '{}'",
                        self.embedding.provider
                    );
                }
                if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                    bail!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        self.embedding.provider
                    );
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }

        match self.retrieval.strategy.as_str() {
            "lexical" => {}
            "dense" => {
                if !self.embedding.is_enabled() {
                    bail!("retrieval.strategy 'dense' requires an embedding provider");
                }
            }
            other => bail!(
                "Unknown retrieval strategy: '{}'. Must be lexical or dense.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

/// Build the scorer selected by `[retrieval].strategy`.
pub fn build_scorer(config: &Config) -> Result<Box<dyn Scorer>> {
    match config.retrieval.strategy.as_str() {
        "lexical" => Ok(Box::new(LexicalScorer::new())),
        "dense" => {
            let embedder = create_provider(&config.embedding)?;
            Ok(Box::new(
                DenseScorer::new(Arc::from(embedder))
                    .with_max_distance(config.retrieval.max_distance),
            ))
        }
        other => bail!("Unknown retrieval strategy: {}", other),
    }
}

/// Build an empty retrieval service from configuration.
pub fn build_service(config: &Config) -> Result<RetrievalService> {
    let scorer = build_scorer(config)?;
    let index = DocumentIndex::with_chunk_words(scorer, config.chunking.words);
    Ok(RetrievalService::new(
        index,
        ServiceOptions {
            ask_k: config.retrieval.ask_k,
            topic_k: config.retrieval.topic_k,
        },
    ))
}
