//! # bookrag
//!
//! An in-memory book retrieval server. Upload PDFs or text files, ask
//! questions answered from the best-matching excerpts, and find which books
//! cover a topic.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────────────────────┐
//! │  upload  │──▶│ extract  │──▶│ RetrievalService            │
//! │ (HTTP)   │   │ PDF/text │   │  DocumentIndex + Scorer     │
//! └──────────┘   └──────────┘   │  (lexical | dense+Embedder) │
//!                               └──────────────┬──────────────┘
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!                 ┌──────────┐           ┌──────────┐
//!                 │   CLI    │           │   HTTP   │
//!                 │(bookrag) │           │  (axum)  │
//!                 └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bookrag serve                                    # listen on 0.0.0.0:5000
//! bookrag ask "who is Ahab?" --file moby-dick.pdf  # one-shot question
//! bookrag which-book "whaling" --file a.pdf --file b.txt
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and service construction |
//! | [`embedding`] | Embedding providers (OpenAI, Ollama, fastembed) |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`server`] | HTTP server |
//!
//! The retrieval logic itself lives in the [`core`] crate.

pub mod config;
pub mod embedding;
pub mod extract;
pub mod server;

pub use bookrag_core as core;
