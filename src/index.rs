use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// InvertedIndex structure in the form of a hash list implementation.
///
/// Maps every term to the documents it occurs in, with occurrence counts,
/// and keeps the inverse document-to-term view in lockstep so that both
/// directions can be queried in O(1). Terms and documents may be any
/// hashable values; identity is by equality, not by insertion order,
/// although insertion order of first occurrence is what `terms()` and
/// `documents()` enumerate in.
///
/// # Examples
/// ```
/// use hashedindex::HashedIndex;
///
/// let mut index = HashedIndex::new();
/// index.add_term_occurrence("word", "document1.txt");
/// index.add_term_occurrence("word", "document1.txt");
///
/// assert_eq!(index.get_term_frequency(&"word", &"document1.txt"), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, D: Serialize",
    deserialize = "T: Deserialize<'de> + Hash + Eq, D: Deserialize<'de> + Hash + Eq"
))]
pub struct HashedIndex<T, D>
where
    T: Hash + Eq,
    D: Hash + Eq,
{
    /// term -> (document -> occurrence count)
    #[serde(with = "indexmap::map::serde_seq")]
    terms: IndexMap<T, IndexMap<D, u64>>,
    /// document -> (term -> occurrence count), the inverse of `terms`
    #[serde(with = "indexmap::map::serde_seq")]
    documents: IndexMap<D, IndexMap<T, u64>>,
    /// transient; a frozen index ignores occurrences of never-seen terms
    #[serde(skip)]
    frozen: bool,
}

impl<T, D> HashedIndex<T, D>
where
    T: Hash + Eq,
    D: Hash + Eq,
{
    /// Create a new, empty index.
    pub fn new() -> Self {
        HashedIndex {
            terms: IndexMap::new(),
            documents: IndexMap::new(),
            frozen: false,
        }
    }

    /// Create an index pre-seeded with a vocabulary. The terms start with
    /// empty posting lists and no documents are registered.
    pub fn with_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut index = Self::new();
        for term in terms {
            index.terms.entry(term).or_default();
        }
        index
    }
}

impl<T, D> Default for HashedIndex<T, D>
where
    T: Hash + Eq,
    D: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Equality compares the recorded occurrence data only; the frozen flag is
/// transient state and does not participate.
impl<T, D> PartialEq for HashedIndex<T, D>
where
    T: Hash + Eq,
    D: Hash + Eq,
{
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms && self.documents == other.documents
    }
}

/// Mutation
impl<T, D> HashedIndex<T, D>
where
    T: Hash + Eq + Clone,
    D: Hash + Eq + Clone,
{
    /// Adds a single occurrence of the term in the specified document,
    /// creating the term and/or document entry on first sight.
    #[inline]
    pub fn add_term_occurrence(&mut self, term: T, document: D) {
        self.record(term, document, 1);
    }

    /// Adds `occurrences` occurrences of the term in the specified document.
    ///
    /// # Errors
    /// `InvalidArgument` if `occurrences` is zero; the index is left
    /// untouched in that case.
    pub fn add_term_occurrences(&mut self, term: T, document: D, occurrences: u64) -> Result<()> {
        if occurrences == 0 {
            return Err(Error::InvalidArgument(
                "occurrence count must be positive".into(),
            ));
        }
        self.record(term, document, occurrences);
        Ok(())
    }

    /// Both views update together; callers never observe a half-applied
    /// occurrence. `occurrences` must be positive.
    fn record(&mut self, term: T, document: D, occurrences: u64) {
        self.documents.entry(document.clone()).or_default();

        if self.frozen && !self.terms.contains_key(&term) {
            return;
        }

        *self
            .terms
            .entry(term.clone())
            .or_default()
            .entry(document.clone())
            .or_insert(0) += occurrences;
        *self
            .documents
            .entry(document)
            .or_default()
            .entry(term)
            .or_insert(0) += occurrences;
    }
}

/// Queries
impl<T, D> HashedIndex<T, D>
where
    T: Hash + Eq,
    D: Hash + Eq,
{
    /// Returns the occurrence count of the term in the document, treating
    /// absence as zero. Never fails: an unseen term or document simply has
    /// no recorded occurrences.
    #[inline]
    pub fn get_term_frequency(&self, term: &T, document: &D) -> u64 {
        self.terms
            .get(term)
            .and_then(|postings| postings.get(document))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of the term's occurrences across all documents.
    ///
    /// # Errors
    /// `UnknownTerm` if the term was never added.
    pub fn get_total_term_frequency(&self, term: &T) -> Result<u64> {
        let postings = self.terms.get(term).ok_or(Error::UnknownTerm)?;
        Ok(postings.values().sum())
    }

    /// Number of distinct documents the term appears in.
    ///
    /// # Errors
    /// `UnknownTerm` if the term was never added.
    pub fn get_document_frequency(&self, term: &T) -> Result<usize> {
        Ok(self.terms.get(term).ok_or(Error::UnknownTerm)?.len())
    }

    /// Total occurrences recorded in the document, over all terms.
    ///
    /// # Errors
    /// `UnknownDocument` if the document was never added.
    pub fn get_document_length(&self, document: &D) -> Result<u64> {
        let counts = self.documents.get(document).ok_or(Error::UnknownDocument)?;
        Ok(counts.values().sum())
    }

    /// Copy of the term's posting list (document -> occurrence count).
    ///
    /// # Errors
    /// `UnknownTerm` if the term was never added.
    pub fn get_documents(&self, term: &T) -> Result<IndexMap<D, u64>>
    where
        D: Clone,
    {
        self.terms.get(term).cloned().ok_or(Error::UnknownTerm)
    }

    /// Copy of the document's inverse posting list (term -> occurrence
    /// count).
    ///
    /// # Errors
    /// `UnknownDocument` if the document was never added.
    pub fn get_terms(&self, document: &D) -> Result<IndexMap<T, u64>>
    where
        T: Clone,
    {
        self.documents
            .get(document)
            .cloned()
            .ok_or(Error::UnknownDocument)
    }

    #[inline]
    pub fn contains_term(&self, term: &T) -> bool {
        self.terms.contains_key(term)
    }

    #[inline]
    pub fn contains_document(&self, document: &D) -> bool {
        self.documents.contains_key(document)
    }

    /// All known terms, in first-insertion order.
    pub fn terms(&self) -> impl Iterator<Item = &T> + '_ {
        self.terms.keys()
    }

    /// All known documents, in first-insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &D> + '_ {
        self.documents.keys()
    }

    /// `(term, posting list)` pairs in `terms()` order.
    pub fn items(&self) -> impl Iterator<Item = (&T, &IndexMap<D, u64>)> + '_ {
        self.terms.iter()
    }

    #[inline]
    pub fn total_terms(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn total_documents(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.documents.is_empty()
    }

    pub(crate) fn term_counts(&self, document: &D) -> Option<&IndexMap<T, u64>> {
        self.documents.get(document)
    }
}

/// Maintenance
impl<T, D> HashedIndex<T, D>
where
    T: Hash + Eq,
    D: Hash + Eq,
{
    /// Resets the index to a clean state without any terms or documents.
    pub fn clear(&mut self) {
        self.terms.clear();
        self.documents.clear();
    }

    /// Freezes the index: occurrences of terms it has never seen are
    /// dropped (their documents are still registered), while known terms
    /// keep accumulating.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Thaws a frozen index so new terms are accepted again.
    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Removes terms whose document frequency falls below `min_df` or above
    /// `max_df`. With `use_percentile` the bounds are interpreted as a
    /// fraction of `total_documents()` instead of an absolute count.
    /// Documents stay registered even if every one of their terms is pruned.
    ///
    /// Returns the number of terms removed.
    pub fn prune(
        &mut self,
        min_df: Option<f64>,
        max_df: Option<f64>,
        use_percentile: bool,
    ) -> usize
    where
        T: Clone,
    {
        let total = self.documents.len() as f64;
        let doomed: Vec<T> = self
            .terms
            .iter()
            .filter_map(|(term, postings)| {
                let mut df = postings.len() as f64;
                if use_percentile {
                    df /= total;
                }
                let outside = min_df.is_some_and(|min| df < min)
                    || max_df.is_some_and(|max| df > max);
                outside.then(|| term.clone())
            })
            .collect();

        for term in &doomed {
            if let Some(postings) = self.terms.shift_remove(term) {
                for document in postings.keys() {
                    if let Some(counts) = self.documents.get_mut(document) {
                        counts.shift_remove(term);
                    }
                }
            }
        }

        debug!(
            removed = doomed.len(),
            remaining = self.terms.len(),
            "pruned terms outside document-frequency bounds"
        );
        doomed.len()
    }
}

/// Merges several indexes into a new one, summing occurrence counts for
/// term/document pairs present in more than one source.
pub fn merge<T, D>(indexes: &[HashedIndex<T, D>]) -> HashedIndex<T, D>
where
    T: Hash + Eq + Clone,
    D: Hash + Eq + Clone,
{
    let mut result = HashedIndex::new();
    for index in indexes {
        for (term, postings) in index.items() {
            for (document, &count) in postings {
                // counts stored in a source index are always positive
                result.record(term.clone(), document.clone(), count);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// word appears in document1 (x3) and document2 (x2), malta only in
    /// document1 (x5), phone only in document2 (x4).
    fn sample_index() -> HashedIndex<&'static str, &'static str> {
        let mut index = HashedIndex::new();
        for _ in 0..3 {
            index.add_term_occurrence("word", "document1.txt");
        }
        for _ in 0..5 {
            index.add_term_occurrence("malta", "document1.txt");
        }
        for _ in 0..4 {
            index.add_term_occurrence("phone", "document2.txt");
        }
        for _ in 0..2 {
            index.add_term_occurrence("word", "document2.txt");
        }
        index
    }

    #[test]
    fn get_documents_returns_posting_copies() {
        let index = sample_index();

        let word = index.get_documents(&"word").unwrap();
        assert_eq!(word.len(), 2);
        assert_eq!(word[&"document1.txt"], 3);
        assert_eq!(word[&"document2.txt"], 2);

        let malta = index.get_documents(&"malta").unwrap();
        assert_eq!(malta.len(), 1);
        assert_eq!(malta[&"document1.txt"], 5);

        assert_eq!(index.get_documents(&"missing"), Err(Error::UnknownTerm));
    }

    #[test]
    fn documents_enumerate_in_first_insertion_order() {
        let mut index = sample_index();
        assert_eq!(
            index.documents().copied().collect::<Vec<_>>(),
            vec!["document1.txt", "document2.txt"]
        );

        index.add_term_occurrence("test", "document3.txt");
        assert_eq!(
            index.documents().copied().collect::<Vec<_>>(),
            vec!["document1.txt", "document2.txt", "document3.txt"]
        );
    }

    #[test]
    fn terms_enumerate_in_first_insertion_order() {
        let mut index = sample_index();
        assert_eq!(
            index.terms().copied().collect::<Vec<_>>(),
            vec!["word", "malta", "phone"]
        );

        index.add_term_occurrence("test", "document3.txt");
        assert_eq!(
            index.terms().copied().collect::<Vec<_>>(),
            vec!["word", "malta", "phone", "test"]
        );
    }

    #[test]
    fn constructor_with_terms() {
        let base = sample_index();
        let mut index2: HashedIndex<&str, &str> = HashedIndex::with_terms(base.terms().copied());

        assert_eq!(index2.total_terms(), base.total_terms());
        assert_eq!(index2.total_documents(), 0);
        for term in index2.terms() {
            assert_eq!(index2.get_document_frequency(term), Ok(0));
        }

        index2.add_term_occurrence("phone", "mydoc.doc");
        assert_eq!(index2.get_term_frequency(&"phone", &"mydoc.doc"), 1);
    }

    #[test]
    fn documents_are_case_sensitive() {
        let mut index = sample_index();
        index.add_term_occurrence("word", "Document2.txt");

        assert_eq!(index.get_term_frequency(&"word", &"document2.txt"), 2);
        assert_eq!(index.get_term_frequency(&"word", &"Document2.txt"), 1);
        assert_eq!(index.total_documents(), 3);
    }

    #[test]
    fn contains_is_case_sensitive() {
        let index = sample_index();

        assert!(index.contains_term(&"word"));
        assert!(index.contains_term(&"malta"));
        assert!(!index.contains_term(&"WoRd"));
        assert!(!index.contains_term(&"doesnotexist"));
        assert!(index.contains_document(&"document1.txt"));
        assert!(!index.contains_document(&"doesnotexist.txt"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut index = sample_index();
        index.clear();

        assert_eq!(index.total_terms(), 0);
        assert_eq!(index.total_documents(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn freeze_blocks_new_terms_only() {
        let mut index = sample_index();
        index.freeze();

        index.add_term_occurrence("myword", "document2.txt");
        assert!(!index.contains_term(&"myword"));

        // known terms keep accumulating
        index.add_term_occurrence("word", "document1.txt");
        assert_eq!(index.get_term_frequency(&"word", &"document1.txt"), 4);

        // documents are still registered even when their term is dropped
        index.add_term_occurrence("idonotexist", "document20.txt");
        assert!(index.contains_document(&"document20.txt"));

        index.add_term_occurrence("phone", "document9.txt");
        assert_eq!(index.get_term_frequency(&"phone", &"document9.txt"), 1);

        index.unfreeze();
        index.add_term_occurrence("myword", "document2.txt");
        assert!(index.contains_term(&"myword"));
    }

    #[test]
    fn total_term_frequency_sums_over_documents() {
        let index = sample_index();

        assert_eq!(index.get_total_term_frequency(&"word"), Ok(5));
        assert_eq!(index.get_total_term_frequency(&"malta"), Ok(5));
        assert_eq!(index.get_total_term_frequency(&"phone"), Ok(4));
        assert_eq!(
            index.get_total_term_frequency(&"doesnotexist"),
            Err(Error::UnknownTerm)
        );
        // terms are matched case-sensitively
        assert_eq!(
            index.get_total_term_frequency(&"Malta"),
            Err(Error::UnknownTerm)
        );
    }

    #[test]
    fn term_frequency_treats_absence_as_zero() {
        let index = sample_index();

        assert_eq!(index.get_term_frequency(&"word", &"document1.txt"), 3);
        assert_eq!(index.get_term_frequency(&"malta", &"document1.txt"), 5);
        assert_eq!(index.get_term_frequency(&"phone", &"document2.txt"), 4);
        assert_eq!(index.get_term_frequency(&"word", &"document2.txt"), 2);

        // pairs with no recorded occurrence
        assert_eq!(index.get_term_frequency(&"malta", &"document2.txt"), 0);
        assert_eq!(index.get_term_frequency(&"phone", &"document1.txt"), 0);

        // never-seen keys behave the same way
        assert_eq!(index.get_term_frequency(&"missing", &"document1.txt"), 0);
        assert_eq!(index.get_term_frequency(&"word", &"missing.txt"), 0);
    }

    #[test]
    fn reads_are_idempotent() {
        let index = sample_index();
        let first = index.get_term_frequency(&"word", &"document1.txt");
        assert_eq!(first, index.get_term_frequency(&"word", &"document1.txt"));
    }

    #[test]
    fn document_frequency_counts_distinct_documents() {
        let index = sample_index();

        assert_eq!(index.get_document_frequency(&"word"), Ok(2));
        assert_eq!(index.get_document_frequency(&"malta"), Ok(1));
        assert_eq!(index.get_document_frequency(&"phone"), Ok(1));
        assert_eq!(
            index.get_document_frequency(&"doesnotexist"),
            Err(Error::UnknownTerm)
        );
    }

    #[test]
    fn document_frequency_never_exceeds_total_documents() {
        let index = sample_index();
        for term in index.terms() {
            let df = index.get_document_frequency(term).unwrap();
            assert!(df <= index.total_documents());
            // every contributing document holds at least one occurrence
            assert!(index.get_total_term_frequency(term).unwrap() >= df as u64);
        }
    }

    #[test]
    fn document_length_sums_all_occurrences() {
        let index = sample_index();

        assert_eq!(index.get_document_length(&"document1.txt"), Ok(8));
        assert_eq!(index.get_document_length(&"document2.txt"), Ok(6));
        assert_eq!(
            index.get_document_length(&"doesnotexist.txt"),
            Err(Error::UnknownDocument)
        );
    }

    #[test]
    fn items_follow_terms_order() {
        let index = sample_index();
        let items: Vec<_> = index.items().collect();

        assert_eq!(items.len(), 3);
        assert_eq!(*items[0].0, "word");
        assert_eq!(items[0].1[&"document1.txt"], 3);
        assert_eq!(*items[1].0, "malta");
        assert_eq!(*items[2].0, "phone");
    }

    #[test]
    fn occurrences_accumulate_across_calls() {
        let mut index = HashedIndex::new();
        index.add_term_occurrences("word", "doc", 3).unwrap();
        index.add_term_occurrences("word", "doc", 4).unwrap();
        index.add_term_occurrence("word", "doc");

        assert_eq!(index.get_term_frequency(&"word", &"doc"), 8);
        assert_eq!(index.get_total_term_frequency(&"word"), Ok(8));
    }

    #[test]
    fn zero_occurrences_are_rejected_without_mutation() {
        let mut index: HashedIndex<&str, &str> = HashedIndex::new();
        let err = index.add_term_occurrences("word", "doc", 0).unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(index.is_empty());
        assert!(!index.contains_document(&"doc"));
    }

    #[test]
    fn both_views_stay_symmetric() {
        let index = sample_index();

        for (term, postings) in index.items() {
            for (document, &count) in postings {
                let reverse = index.get_terms(document).unwrap();
                assert_eq!(reverse[term], count);
            }
        }
        for document in index.documents() {
            for (term, &count) in &index.get_terms(document).unwrap() {
                assert_eq!(index.get_term_frequency(term, document), count);
            }
        }
    }

    /// word in 100 documents, text in 20, lonely in 1.
    fn prune_index() -> HashedIndex<&'static str, String> {
        let mut index = HashedIndex::new();
        for i in 0..100 {
            index.add_term_occurrence("word", format!("document{i}.txt"));
        }
        for i in 0..20 {
            index.add_term_occurrence("text", format!("document{i}.txt"));
        }
        index.add_term_occurrence("lonely", "document2.txt".to_string());
        index
    }

    #[test]
    fn prune_by_minimum_document_frequency() {
        let mut index = prune_index();

        assert_eq!(index.prune(Some(2.0), None, false), 1);
        assert_eq!(
            index.terms().copied().collect::<Vec<_>>(),
            vec!["word", "text"]
        );

        assert_eq!(index.prune(Some(25.0), None, false), 1);
        assert_eq!(index.terms().copied().collect::<Vec<_>>(), vec!["word"]);
    }

    #[test]
    fn prune_by_maximum_document_frequency() {
        let mut index = prune_index();

        index.prune(None, Some(20.0), false);
        assert_eq!(
            index.terms().copied().collect::<Vec<_>>(),
            vec!["text", "lonely"]
        );
    }

    #[test]
    fn prune_by_percentile() {
        let mut index = prune_index();
        index.prune(Some(0.25), None, true);
        assert_eq!(index.terms().copied().collect::<Vec<_>>(), vec!["word"]);

        let mut index = prune_index();
        index.prune(None, Some(0.20), true);
        assert_eq!(
            index.terms().copied().collect::<Vec<_>>(),
            vec!["text", "lonely"]
        );
    }

    #[test]
    fn prune_keeps_both_views_consistent() {
        let mut index = prune_index();
        index.prune(Some(2.0), None, false);

        // the dropped term is gone from every document's inverse view too
        for document in index.documents() {
            assert!(!index.get_terms(document).unwrap().contains_key(&"lonely"));
        }
        // documents stay registered even if all their terms were pruned
        assert_eq!(index.total_documents(), 100);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let merged: HashedIndex<&str, &str> = merge(&[]);
        assert_eq!(merged, HashedIndex::new());
    }

    #[test]
    fn merge_of_one_index_is_identity() {
        let mut first = HashedIndex::new();
        first.add_term_occurrence("foo", "document2.txt");
        first.add_term_occurrence("foo", "document1.txt");

        assert_eq!(merge(std::slice::from_ref(&first)), first);
    }

    #[test]
    fn merge_sums_shared_pairs() {
        let mut first = HashedIndex::new();
        first.add_term_occurrence("foo", "document2.txt");
        first.add_term_occurrence("foo", "document1.txt");

        let mut second = HashedIndex::new();
        second.add_term_occurrence("foo", "document1.txt");
        second.add_term_occurrence("bar", "document9.txt");

        let merged = merge(&[first, second]);

        assert_eq!(merged.total_terms(), 2);
        assert_eq!(merged.total_documents(), 3);
        assert_eq!(merged.get_term_frequency(&"foo", &"document1.txt"), 2);
        assert_eq!(merged.get_term_frequency(&"foo", &"document2.txt"), 1);
        assert_eq!(merged.get_term_frequency(&"bar", &"document9.txt"), 1);
        assert_eq!(merged.get_document_length(&"document1.txt"), Ok(2));
    }

    #[test]
    fn json_round_trip() {
        let index = sample_index();
        let encoded = serde_json::to_string(&index).unwrap();
        let decoded: HashedIndex<&str, &str> = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, index);
        assert_eq!(decoded.get_term_frequency(&"word", &"document1.txt"), 3);
        assert_eq!(
            decoded.terms().copied().collect::<Vec<_>>(),
            vec!["word", "malta", "phone"]
        );
    }

    #[test]
    fn cbor_round_trip() {
        let index = sample_index();
        let encoded = serde_cbor::to_vec(&index).unwrap();
        let decoded: HashedIndex<String, String> = serde_cbor::from_slice(&encoded).unwrap();

        assert_eq!(
            decoded.get_term_frequency(&"malta".to_string(), &"document1.txt".to_string()),
            5
        );
        assert_eq!(decoded.total_documents(), 2);
    }

    #[test]
    fn frozen_flag_is_not_serialized() {
        let mut index = sample_index();
        index.freeze();

        let encoded = serde_json::to_string(&index).unwrap();
        let decoded: HashedIndex<&str, &str> = serde_json::from_str(&encoded).unwrap();
        assert!(!decoded.is_frozen());
    }
}
