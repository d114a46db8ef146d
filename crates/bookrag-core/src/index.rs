//! In-memory document index.
//!
//! Holds every loaded document, the flat chunk corpus (upload order, then
//! in-document order), a parallel owner list mapping each corpus position
//! to its document, and the active [`Scorer`] with whatever derived
//! structure it keeps.
//!
//! # Invariants
//!
//! - `chunks.len() == owners.len() == Σ document.chunk_positions.len()`.
//! - A chunk's position never changes until [`DocumentIndex::clear`].
//! - The scorer has been rebuilt over exactly the current corpus.
//!
//! [`DocumentIndex::insert`] is transactional: the scorer is rebuilt over
//! the enlarged corpus first, and the new document is committed only when
//! that succeeds.

use std::collections::HashMap;

use crate::chunk::{split_words, DEFAULT_CHUNK_WORDS};
use crate::error::{Result, RetrievalError};
use crate::models::{Chunk, Document, DocumentSummary, InsertOutcome, Ranked};
use crate::search::Scorer;

pub struct DocumentIndex {
    documents: Vec<Document>,
    by_name: HashMap<String, usize>,
    chunks: Vec<Chunk>,
    owners: Vec<usize>,
    scorer: Box<dyn Scorer>,
    chunk_words: usize,
}

impl DocumentIndex {
    pub fn new(scorer: Box<dyn Scorer>) -> Self {
        Self::with_chunk_words(scorer, DEFAULT_CHUNK_WORDS)
    }

    pub fn with_chunk_words(scorer: Box<dyn Scorer>, chunk_words: usize) -> Self {
        Self {
            documents: Vec::new(),
            by_name: HashMap::new(),
            chunks: Vec::new(),
            owners: Vec::new(),
            scorer,
            chunk_words: chunk_words.max(1),
        }
    }

    /// Chunk `text` and add it as a new document named `name`.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::EmptyDocument`] if `text` has no words.
    /// - [`RetrievalError::DuplicateDocument`] if `name` is already loaded.
    /// - Any scorer rebuild error. The index is unchanged on every error.
    pub fn insert(&mut self, name: &str, text: &str) -> Result<InsertOutcome> {
        let pieces = split_words(text, self.chunk_words);
        if pieces.is_empty() {
            return Err(RetrievalError::EmptyDocument {
                name: name.to_string(),
            });
        }
        if self.by_name.contains_key(name) {
            return Err(RetrievalError::DuplicateDocument {
                name: name.to_string(),
            });
        }

        {
            let corpus: Vec<&str> = self
                .chunks
                .iter()
                .map(|c| c.text.as_str())
                .chain(pieces.iter().map(String::as_str))
                .collect();
            self.scorer.rebuild(&corpus)?;
        }

        let slot = self.documents.len();
        let first = self.chunks.len();
        let chunk_positions: Vec<usize> = (first..first + pieces.len()).collect();

        for (position, piece) in chunk_positions.iter().zip(pieces) {
            self.chunks.push(Chunk {
                position: *position,
                text: piece,
            });
            self.owners.push(slot);
        }

        self.documents.push(Document {
            name: name.to_string(),
            chunk_positions,
            size: text.chars().count(),
        });
        self.by_name.insert(name.to_string(), slot);

        Ok(InsertOutcome {
            document: summarize(&self.documents[slot]),
            total_documents: self.documents.len(),
            total_chunks: self.chunks.len(),
        })
    }

    /// The flat corpus as `(position, text)` pairs.
    pub fn all_chunks(&self) -> Vec<(usize, &str)> {
        self.chunks
            .iter()
            .map(|c| (c.position, c.text.as_str()))
            .collect()
    }

    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    /// Name of the document owning `position`.
    pub fn owner_of(&self, position: usize) -> Option<&str> {
        self.owners
            .get(position)
            .map(|slot| self.documents[*slot].name.as_str())
    }

    /// Summaries of all documents, in insertion order.
    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        self.documents.iter().map(summarize).collect()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    /// Rank the whole corpus against `query` with the active scorer.
    pub fn rank(&self, query: &str, k: usize) -> Result<Vec<Ranked>> {
        self.scorer.rank(query, &self.all_chunks(), k)
    }

    /// Drop every document, chunk and derived structure.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.by_name.clear();
        self.chunks.clear();
        self.owners.clear();
        self.scorer.reset();
    }
}

fn summarize(doc: &Document) -> DocumentSummary {
    DocumentSummary {
        name: doc.name.clone(),
        chunk_count: doc.chunk_positions.len(),
        size: doc.size,
    }
}
