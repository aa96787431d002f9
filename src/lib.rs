//! Inverted index implementation using hash maps.
//!
//! `hashedindex` maps terms (any hashable values) to the documents they
//! occur in, with occurrence counts, and derives dense feature matrices
//! (term-frequency, document-frequency, existence, tf-idf) for downstream
//! vectorized consumption. A companion tokenizer turns raw text into a lazy
//! sequence of n-gram windows with optional stopword, minimum-length and
//! numeric filtering.
//!
//! The index is a plain single-threaded in-memory structure: callers that
//! need concurrent writers must serialize access externally. Feature-matrix
//! generation is read-only over the index.
//!
//! # Example
//! ```
//! use hashedindex::{word_tokenize, FeatureWeighting, HashedIndex};
//!
//! let mut index = HashedIndex::new();
//! for ngram in word_tokenize("the quick brown fox") {
//!     index.add_term_occurrence(ngram, "doc1.txt");
//! }
//!
//! let matrix = index.generate_feature_matrix::<f64>(FeatureWeighting::TfIdf);
//! assert_eq!(matrix.shape(), (1, 4));
//! ```

pub mod error;
pub mod index;
pub mod matrix;
pub mod tokenizer;

/// Inverted index over hashable terms and documents.
/// The top-level structure of this crate: it accumulates term occurrences
/// per document, answers frequency queries in both directions, and is the
/// source the feature-matrix builder derives from.
pub use index::HashedIndex;

/// Occurrence-count-summing merge of several indexes.
pub use index::merge;

/// Dense `(documents x terms)` snapshot of an index under a selected
/// weighting, with the row and column orderings carried along for hand-off
/// to external numeric tooling.
pub use matrix::FeatureMatrix;

/// Cell weighting schemes for feature matrices and document vectors.
/// Parses from the classic mode strings (`tf`, `df`, `existence`, `ntf`,
/// `tfidf`); defaults to tf-idf.
pub use matrix::FeatureWeighting;

/// Configurable n-gram word tokenizer and its lazy output sequence.
pub use tokenizer::{word_tokenize, Ngrams, WordTokenizer};

/// Purely-numeric token check used by the tokenizer's numeric filter.
pub use tokenizer::is_numeric;

/// Error kinds shared across the crate. All errors are recoverable and
/// local to the failing call.
pub use error::{Error, Result};
