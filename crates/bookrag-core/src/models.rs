//! Core data models used throughout bookrag.
//!
//! Index-side types ([`Document`], [`Chunk`], [`DocumentSummary`]) and the
//! response shapes produced by the retrieval service. Response types derive
//! `Serialize` so the HTTP layer can return them as JSON directly.

use serde::Serialize;

/// A loaded document (a "book").
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    /// Positions of this document's chunks in the flat corpus, in order.
    pub chunk_positions: Vec<usize>,
    /// Size of the extracted text in characters.
    pub size: usize,
}

/// A chunk of a document's text at a stable position in the flat corpus.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub position: usize,
    pub text: String,
}

/// Per-document metadata returned by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub name: String,
    pub chunk_count: usize,
    pub size: usize,
}

/// Result of a successful [`DocumentIndex::insert`](crate::index::DocumentIndex::insert).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    pub document: DocumentSummary,
    pub total_documents: usize,
    pub total_chunks: usize,
}

/// A ranked corpus position with its strategy-specific score.
///
/// Higher is always better: overlap fraction for the lexical scorer,
/// negative L2 distance for the dense scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub position: usize,
    pub score: f64,
}

/// Response to an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub book_name: String,
    pub chunks: usize,
    pub total_books: usize,
    pub total_chunks: usize,
}

/// One retrieved excerpt with its source book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    /// Chunk text, truncated for display.
    pub text: String,
    pub book: String,
    pub score: f64,
}

/// Response to a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub passages: Vec<Passage>,
    /// Distinct books, in order of first appearance in the ranking.
    pub books_used: Vec<String>,
}

/// How many of the top-ranked chunks for a topic came from one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookMentions {
    pub book: String,
    pub mentions: usize,
}

/// Response to a which-book query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicReport {
    pub topic: String,
    pub results: Vec<BookMentions>,
}

/// A row of the book listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookEntry {
    pub name: String,
    pub chunks: usize,
    /// Human readable size, e.g. `"12 KB"`.
    pub size: String,
    pub size_kb: usize,
}

/// Response to a book listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Library {
    pub books: Vec<BookEntry>,
    pub total_books: usize,
    pub total_chunks: usize,
}

/// Service status for the root endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub status: String,
    pub message: String,
    pub books_loaded: usize,
    pub total_chunks: usize,
    pub strategy: String,
}
