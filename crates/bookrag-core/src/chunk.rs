//! Word-window text chunker.
//!
//! Splits extracted document text into fixed-size windows of
//! whitespace-delimited words. Windows never overlap and never cross a
//! word; only the final window may be shorter than the budget.
//!
//! # Algorithm
//!
//! 1. Split the text on Unicode whitespace (runs collapse, edges trimmed).
//! 2. Walk the word list in steps of `chunk_size_words`.
//! 3. Join each window with single spaces.
//! 4. Drop windows that are empty after joining.
//!
//! # Example
//!
//! ```rust
//! use bookrag_core::chunk::split_words;
//!
//! let chunks = split_words("one two three four five", 2);
//! assert_eq!(chunks, vec!["one two", "three four", "five"]);
//! ```

/// Default word budget per chunk.
pub const DEFAULT_CHUNK_WORDS: usize = 500;

/// Split `text` into windows of at most `chunk_size_words` words.
///
/// Empty or whitespace-only input yields an empty vector; callers that
/// need at least one chunk (uploads) must reject that case themselves.
/// A budget of `0` is treated as `1`.
pub fn split_words(text: &str, chunk_size_words: usize) -> Vec<String> {
    let size = chunk_size_words.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .chunks(size)
        .map(|window| window.join(" "))
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
