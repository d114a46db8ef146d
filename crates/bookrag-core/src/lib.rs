//! # bookrag core
//!
//! The retrieval subsystem behind the `bookrag` server: word-window
//! chunking, two interchangeable similarity scorers, the in-memory document
//! index, and the retrieval service that answers questions over it.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O. Text extraction
//! and embedding backends live in the `bookrag` app crate and plug in
//! through the [`embedding::Embedder`] trait.
//!
//! ```text
//! upload ──▶ chunk ──▶ DocumentIndex::insert ──▶ Scorer::rebuild
//!                                │
//! ask / which-book ──▶ Scorer::rank(query, all_chunks, k) ──▶ Answer / TopicReport
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod search;
pub mod service;

pub use error::{ErrorKind, RetrievalError};
pub use index::DocumentIndex;
pub use search::{DenseScorer, LexicalScorer, Scorer};
pub use service::{RetrievalService, ServiceOptions};
