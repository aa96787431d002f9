use std::hash::Hash;
use std::str::FromStr;

use num::{Num, NumCast};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::index::HashedIndex;

/// Weighting scheme applied to every cell of a feature matrix or document
/// vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureWeighting {
    /// Raw occurrence count of the term in the document.
    TermFrequency,
    /// Document frequency of the term, broadcast down the whole column.
    /// A denominator input rather than a ranking signal by itself.
    DocumentFrequency,
    /// 1 where the term occurs in the document, 0 otherwise.
    Existence,
    /// Occurrence count divided by the document length.
    NormalizedTermFrequency,
    /// `tf * ln(total_documents / document_frequency)`.
    #[default]
    TfIdf,
}

impl FromStr for FeatureWeighting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tf" => Ok(FeatureWeighting::TermFrequency),
            "df" => Ok(FeatureWeighting::DocumentFrequency),
            "existence" => Ok(FeatureWeighting::Existence),
            "ntf" => Ok(FeatureWeighting::NormalizedTermFrequency),
            "tfidf" => Ok(FeatureWeighting::TfIdf),
            other => Err(Error::InvalidArgument(format!(
                "unknown feature weighting: {other}"
            ))),
        }
    }
}

/// Immutable snapshot of an index as a dense row-major matrix of shape
/// `(total_documents, total_terms)`. Row i corresponds to `documents()[i]`
/// and column j to `terms()[j]` at the moment the matrix was built; both
/// orderings are carried along for hand-off to external numeric tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix<T, D, N = f64> {
    terms: Vec<T>,
    documents: Vec<D>,
    /// row-major cell values
    data: Vec<N>,
}

impl<T, D, N> FeatureMatrix<T, D, N> {
    /// `(rows, columns)` = `(documents, terms)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.documents.len(), self.terms.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Column labels, one per term.
    pub fn terms(&self) -> &[T] {
        &self.terms
    }

    /// Row labels, one per document.
    pub fn documents(&self) -> &[D] {
        &self.documents
    }

    /// Row-major cell values.
    pub fn data(&self) -> &[N] {
        &self.data
    }

    /// Cell value at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<N>
    where
        N: Copy,
    {
        if row >= self.documents.len() || col >= self.terms.len() {
            return None;
        }
        Some(self.data[row * self.terms.len() + col])
    }

    /// The document vector stored in row `index`.
    pub fn row(&self, index: usize) -> Option<&[N]> {
        if index >= self.documents.len() {
            return None;
        }
        let width = self.terms.len();
        Some(&self.data[index * width..(index + 1) * width])
    }

    /// Rows in `documents()` order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[N]> + '_ {
        let width = self.terms.len();
        (0..self.documents.len()).map(move |i| &self.data[i * width..(i + 1) * width])
    }
}

/// tf-idf queries
impl<T, D> HashedIndex<T, D>
where
    T: Hash + Eq,
    D: Hash + Eq,
{
    /// Term-Frequency Inverse-Document-Frequency value for the given term
    /// in the specified document: `tf * ln(total_documents / df)`.
    /// Returns 0.0 whenever the pair has no recorded occurrence, so unseen
    /// terms and documents never fail here.
    pub fn get_tfidf(&self, term: &T, document: &D) -> f64 {
        let tf = self.get_term_frequency(term, document);
        if tf == 0 {
            return 0.0;
        }
        tf as f64 * self.idf(term)
    }

    /// Sum of the term's tf-idf values over every document in the index.
    pub fn get_total_tfidf(&self, term: &T) -> f64 {
        self.documents()
            .map(|document| self.get_tfidf(term, document))
            .sum()
    }

    /// Guards both degenerate denominators: a term with no postings (only
    /// possible for a pre-seeded vocabulary) and an index with no documents
    /// weigh in at zero instead of dividing by zero.
    fn idf(&self, term: &T) -> f64 {
        let total = self.total_documents();
        let df = self.get_document_frequency(term).unwrap_or(0);
        if total == 0 || df == 0 {
            return 0.0;
        }
        (total as f64 / df as f64).ln()
    }
}

/// Feature-matrix derivation
impl<T, D> HashedIndex<T, D>
where
    T: Hash + Eq + Clone + Sync,
    D: Hash + Eq + Clone + Sync,
{
    /// Materializes the whole index as a feature matrix under the given
    /// weighting. Row and column order equal `documents()` and `terms()` at
    /// the moment of the call. An index without documents yields a matrix
    /// with zero rows rather than an error.
    ///
    /// `N` is the cell type: a float for the real-valued weightings, or an
    /// integer for `Existence`.
    pub fn generate_feature_matrix<N>(&self, weighting: FeatureWeighting) -> FeatureMatrix<T, D, N>
    where
        N: Num + NumCast + Copy + Send,
    {
        let stats = self.column_stats(weighting);
        let documents: Vec<D> = self.documents().cloned().collect();
        let data: Vec<N> = documents
            .par_iter()
            .flat_map_iter(|document| self.document_row::<N>(document, weighting, &stats))
            .collect();

        debug!(
            documents = documents.len(),
            terms = self.total_terms(),
            weighting = ?weighting,
            "generated feature matrix"
        );
        FeatureMatrix {
            terms: self.terms().cloned().collect(),
            documents,
            data,
        }
    }

    /// One row of the feature matrix: the document's vector over `terms()`
    /// under the given weighting.
    ///
    /// # Errors
    /// `UnknownDocument` if the document was never added.
    pub fn generate_document_vector<N>(
        &self,
        document: &D,
        weighting: FeatureWeighting,
    ) -> Result<Vec<N>>
    where
        N: Num + NumCast + Copy,
    {
        if !self.contains_document(document) {
            return Err(Error::UnknownDocument);
        }
        let stats = self.column_stats(weighting);
        Ok(self.document_row(document, weighting, &stats))
    }

    /// Document vector under a caller-supplied weighting function, invoked
    /// once per `(term, document)` cell in `terms()` order.
    ///
    /// # Errors
    /// `UnknownDocument` if the document was never added.
    pub fn generate_document_vector_with<F>(&self, document: &D, weight: F) -> Result<Vec<f64>>
    where
        F: Fn(&Self, &T, &D) -> f64,
    {
        if !self.contains_document(document) {
            return Err(Error::UnknownDocument);
        }
        Ok(self
            .terms()
            .map(|term| weight(self, term, document))
            .collect())
    }

    /// Per-column values that do not depend on the document: idf for TfIdf,
    /// df for DocumentFrequency. Empty for the other weightings.
    fn column_stats(&self, weighting: FeatureWeighting) -> Vec<f64> {
        match weighting {
            FeatureWeighting::TfIdf => self.terms().map(|term| self.idf(term)).collect(),
            FeatureWeighting::DocumentFrequency => self
                .terms()
                .map(|term| self.get_document_frequency(term).unwrap_or(0) as f64)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn document_row<N>(&self, document: &D, weighting: FeatureWeighting, stats: &[f64]) -> Vec<N>
    where
        N: Num + NumCast + Copy,
    {
        let counts = self.term_counts(document);
        let length: u64 = counts.map(|c| c.values().sum()).unwrap_or(0);

        self.terms()
            .enumerate()
            .map(|(col, term)| {
                let tf = counts.and_then(|c| c.get(term)).copied().unwrap_or(0);
                let value = match weighting {
                    FeatureWeighting::TermFrequency => tf as f64,
                    FeatureWeighting::DocumentFrequency => stats[col],
                    FeatureWeighting::Existence => {
                        if tf > 0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    FeatureWeighting::NormalizedTermFrequency => {
                        if length == 0 {
                            0.0
                        } else {
                            tf as f64 / length as f64
                        }
                    }
                    FeatureWeighting::TfIdf => {
                        if tf == 0 {
                            0.0
                        } else {
                            tf as f64 * stats[col]
                        }
                    }
                };
                // cells that do not fit the requested type collapse to zero
                NumCast::from(value).unwrap_or_else(N::zero)
            })
            .collect()
    }
}
