//! Typed errors for the retrieval core.
//!
//! Every fallible core operation returns [`RetrievalError`]. Callers decide
//! how to surface a failure from its [`ErrorKind`]: input and empty-corpus
//! errors are the caller's fault and carry a readable message, unexpected
//! errors are logged and reported generically.

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Coarse classification of a [`RetrievalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or empty input (file, name, question, topic).
    Input,
    /// The operation needs at least one chunk and there are none.
    EmptyCorpus,
    /// Collaborator failure or broken internal state.
    Unexpected,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("No question provided")]
    EmptyQuery,

    #[error("No topic provided")]
    EmptyTopic,

    #[error("No file selected")]
    MissingFileName,

    #[error("No text found in '{name}'")]
    EmptyDocument { name: String },

    #[error("A book named '{name}' is already loaded")]
    DuplicateDocument { name: String },

    #[error("No books loaded yet")]
    NoCorpus,

    #[error("embedding provider failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    Dimension { expected: usize, found: usize },

    #[error("search structure covers {indexed} chunks but the corpus has {corpus}")]
    StaleIndex { indexed: usize, corpus: usize },
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::EmptyQuery
            | RetrievalError::EmptyTopic
            | RetrievalError::MissingFileName
            | RetrievalError::EmptyDocument { .. }
            | RetrievalError::DuplicateDocument { .. } => ErrorKind::Input,
            RetrievalError::NoCorpus => ErrorKind::EmptyCorpus,
            RetrievalError::Embedding(_)
            | RetrievalError::Dimension { .. }
            | RetrievalError::StaleIndex { .. } => ErrorKind::Unexpected,
        }
    }
}
