//! Retrieval service: the single entry point the HTTP and CLI layers use.
//!
//! [`RetrievalService`] owns the [`DocumentIndex`] behind one process-wide
//! `RwLock`. Uploads and clears take the write lock (including the scorer
//! rebuild), queries and listings take the read lock, so a reader never
//! sees the chunk and owner lists at different lengths or a half-built
//! search structure.
//!
//! # Answer assembly
//!
//! Answers are assembled from the ranked excerpts, not generated:
//!
//! 1. Each passage is the chunk text cut to [`PASSAGE_CHARS`] characters,
//!    with `"..."` appended when it was longer.
//! 2. The full texts of the ranked chunks are joined with spaces and capped
//!    at [`SUMMARY_WORDS`] words.
//! 3. The answer is a fixed lead-in naming the number of books used, then
//!    the first [`SUMMARY_CHARS`] characters of that text and `"..."`.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, RetrievalError};
use crate::index::DocumentIndex;
use crate::models::{
    Answer, BookEntry, BookMentions, Library, Passage, Status, TopicReport, UploadReceipt,
};
use crate::search::LexicalScorer;

/// Display length of a passage, in characters.
pub const PASSAGE_CHARS: usize = 300;
/// Word cap on the text an answer is assembled from.
pub const SUMMARY_WORDS: usize = 1000;
/// Characters of assembled text shown in an answer.
pub const SUMMARY_CHARS: usize = 500;
/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Retrieval breadth for each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Neighbours fetched for a question.
    pub ask_k: usize,
    /// Neighbours fetched for a which-book query.
    pub topic_k: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            ask_k: 5,
            topic_k: 10,
        }
    }
}

pub struct RetrievalService {
    index: RwLock<DocumentIndex>,
    options: ServiceOptions,
}

impl RetrievalService {
    pub fn new(index: DocumentIndex, options: ServiceOptions) -> Self {
        Self {
            index: RwLock::new(index),
            options,
        }
    }

    /// A service using the lexical scorer and default settings.
    pub fn lexical() -> Self {
        Self::new(
            DocumentIndex::new(Box::new(LexicalScorer)),
            ServiceOptions::default(),
        )
    }

    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    fn read(&self) -> RwLockReadGuard<'_, DocumentIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DocumentIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a book from its extracted text.
    pub fn upload(&self, name: &str, text: &str) -> Result<UploadReceipt> {
        if name.trim().is_empty() {
            return Err(RetrievalError::MissingFileName);
        }
        if text.trim().is_empty() {
            return Err(RetrievalError::EmptyDocument {
                name: name.to_string(),
            });
        }

        let outcome = self.write().insert(name, text)?;

        tracing::info!(
            book = %outcome.document.name,
            chunks = outcome.document.chunk_count,
            total_books = outcome.total_documents,
            "added book"
        );

        Ok(UploadReceipt {
            book_name: outcome.document.name,
            chunks: outcome.document.chunk_count,
            total_books: outcome.total_documents,
            total_chunks: outcome.total_chunks,
        })
    }

    /// Answer a question with the best-matching excerpts.
    pub fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        let index = self.read();
        let corpus_size = index.chunk_count();
        if corpus_size == 0 {
            return Err(RetrievalError::NoCorpus);
        }

        let ranked = index.rank(question, self.options.ask_k.min(corpus_size))?;
        tracing::debug!(question, hits = ranked.len(), "ranked passages");

        let mut passages = Vec::with_capacity(ranked.len());
        let mut books_used: Vec<String> = Vec::new();
        let mut full_texts: Vec<&str> = Vec::with_capacity(ranked.len());

        for hit in &ranked {
            let (Some(chunk), Some(book)) =
                (index.chunk(hit.position), index.owner_of(hit.position))
            else {
                continue;
            };
            if !books_used.iter().any(|b| b == book) {
                books_used.push(book.to_string());
            }
            passages.push(Passage {
                text: truncate_passage(&chunk.text),
                book: book.to_string(),
                score: hit.score,
            });
            full_texts.push(&chunk.text);
        }

        let answer = compose_answer(&full_texts, books_used.len());

        Ok(Answer {
            question: question.to_string(),
            answer,
            passages,
            books_used,
        })
    }

    /// Count, per book, how many of the top chunks for `topic` it owns.
    pub fn which_books(&self, topic: &str) -> Result<TopicReport> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(RetrievalError::EmptyTopic);
        }

        let index = self.read();
        let corpus_size = index.chunk_count();
        if corpus_size == 0 {
            return Err(RetrievalError::NoCorpus);
        }

        let ranked = index.rank(topic, self.options.topic_k.min(corpus_size))?;
        let scorer = index.scorer();

        let mut results: Vec<BookMentions> = Vec::new();
        for hit in ranked.iter().filter(|h| scorer.counts_as_mention(h.score)) {
            let Some(book) = index.owner_of(hit.position) else {
                continue;
            };
            match results.iter_mut().find(|r| r.book == book) {
                Some(entry) => entry.mentions += 1,
                None => results.push(BookMentions {
                    book: book.to_string(),
                    mentions: 1,
                }),
            }
        }
        results.sort_by(|a, b| b.mentions.cmp(&a.mentions));

        Ok(TopicReport {
            topic: topic.to_string(),
            results,
        })
    }

    pub fn list_books(&self) -> Library {
        let index = self.read();
        let books = index
            .list_documents()
            .into_iter()
            .map(|doc| {
                let size_kb = doc.size / 1024;
                BookEntry {
                    name: doc.name,
                    chunks: doc.chunk_count,
                    size: format!("{} KB", size_kb),
                    size_kb,
                }
            })
            .collect();

        Library {
            books,
            total_books: index.document_count(),
            total_chunks: index.chunk_count(),
        }
    }

    pub fn status(&self) -> Status {
        let index = self.read();
        Status {
            status: "running".to_string(),
            message: "Book AI backend is running".to_string(),
            books_loaded: index.document_count(),
            total_chunks: index.chunk_count(),
            strategy: index.scorer().name().to_string(),
        }
    }

    /// Remove every book. Safe to call on an empty service.
    pub fn clear(&self) {
        self.write().clear();
        tracing::info!("all books cleared");
    }
}

/// Cut `text` to [`PASSAGE_CHARS`] characters, marking the cut.
pub fn truncate_passage(text: &str) -> String {
    if text.chars().count() > PASSAGE_CHARS {
        let mut cut: String = text.chars().take(PASSAGE_CHARS).collect();
        cut.push_str(ELLIPSIS);
        cut
    } else {
        text.to_string()
    }
}

/// Build the templated answer from the full texts of the ranked chunks.
pub fn compose_answer(texts: &[&str], books_used: usize) -> String {
    let mut combined = texts.join(" ");
    if combined.split_whitespace().count() > SUMMARY_WORDS {
        combined = combined
            .split_whitespace()
            .take(SUMMARY_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
    }
    let excerpt: String = combined.chars().take(SUMMARY_CHARS).collect();

    format!(
        "Based on {} book(s), here's what I found:\n\nThe relevant information suggests: {}{}",
        books_used, excerpt, ELLIPSIS
    )
}
