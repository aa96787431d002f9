use std::collections::{HashSet, VecDeque};

use crate::error::{Error, Result};

/// Configurable whitespace/word-boundary tokenizer producing overlapping
/// n-gram windows of lowercased word tokens.
///
/// Filters are applied to each word before windowing, in order: minimum
/// length, numeric exclusion, stopword removal. A dropped word never shows
/// up inside an n-gram and leaves no gap; windows are formed from
/// consecutive surviving words only.
///
/// # Examples
/// ```
/// use hashedindex::WordTokenizer;
///
/// let tokenizer = WordTokenizer::new().ngrams(2);
/// let bigrams: Vec<Vec<String>> = tokenizer.tokenize("foo bar baz").unwrap().collect();
///
/// assert_eq!(bigrams, vec![vec!["foo", "bar"], vec!["bar", "baz"]]);
/// ```
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    ngrams: usize,
    stopwords: HashSet<String>,
    min_length: usize,
    ignore_numeric: bool,
}

impl Default for WordTokenizer {
    fn default() -> Self {
        WordTokenizer {
            ngrams: 1,
            stopwords: HashSet::new(),
            min_length: 0,
            ignore_numeric: false,
        }
    }
}

impl WordTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Window size; 1 (the default) yields unigrams.
    pub fn ngrams(mut self, size: usize) -> Self {
        self.ngrams = size;
        self
    }

    /// Words to drop after lowercasing, matched case-insensitively.
    pub fn stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords = words
            .into_iter()
            .map(|word| word.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Minimum surviving word length in characters.
    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = length;
        self
    }

    /// Drop words that parse as numbers.
    pub fn ignore_numeric(mut self, ignore: bool) -> Self {
        self.ignore_numeric = ignore;
        self
    }

    /// Lazily tokenizes `text` under this configuration.
    ///
    /// # Errors
    /// `InvalidArgument` if the configured n-gram size is zero.
    pub fn tokenize<'a>(&self, text: &'a str) -> Result<Ngrams<'a>> {
        if self.ngrams == 0 {
            return Err(Error::InvalidArgument(
                "n-gram size must be positive".into(),
            ));
        }
        Ok(Ngrams::new(
            text,
            self.ngrams,
            self.stopwords.clone(),
            self.min_length,
            self.ignore_numeric,
        ))
    }
}

/// Tokenizes `text` with the default configuration: lowercased unigrams, no
/// stopwords, no length or numeric filtering.
///
/// # Examples
/// ```
/// use hashedindex::word_tokenize;
///
/// let tokens: Vec<Vec<String>> = word_tokenize("hello cruel world").collect();
/// assert_eq!(tokens, vec![vec!["hello"], vec!["cruel"], vec!["world"]]);
/// ```
pub fn word_tokenize(text: &str) -> Ngrams<'_> {
    Ngrams::new(text, 1, HashSet::new(), 0, false)
}

/// Returns true if the text is purely numeric and false otherwise.
/// Integers, decimal fractions and scientific notation all count.
#[inline]
pub fn is_numeric(text: &str) -> bool {
    text.parse::<f64>().is_ok()
}

fn not_word(c: char) -> bool {
    !c.is_alphanumeric()
}

/// Lazy, forward-only, single-pass n-gram sequence over a borrowed text.
/// Each item is one window of consecutive surviving tokens; when fewer
/// tokens survive than the window size, the sequence is empty. Re-running
/// requires tokenizing the original text again.
#[derive(Debug)]
pub struct Ngrams<'a> {
    words: std::str::Split<'a, fn(char) -> bool>,
    window: VecDeque<String>,
    ngrams: usize,
    stopwords: HashSet<String>,
    min_length: usize,
    ignore_numeric: bool,
}

impl<'a> Ngrams<'a> {
    fn new(
        text: &'a str,
        ngrams: usize,
        stopwords: HashSet<String>,
        min_length: usize,
        ignore_numeric: bool,
    ) -> Self {
        Ngrams {
            words: text.split(not_word as fn(char) -> bool),
            window: VecDeque::with_capacity(ngrams),
            ngrams,
            stopwords,
            min_length,
            ignore_numeric,
        }
    }

    fn survives(&self, token: &str) -> bool {
        if token.chars().count() < self.min_length {
            return false;
        }
        if self.ignore_numeric && is_numeric(token) {
            return false;
        }
        !self.stopwords.contains(token)
    }
}

impl<'a> Iterator for Ngrams<'a> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.window.len() == self.ngrams {
            self.window.pop_front();
        }
        while self.window.len() < self.ngrams {
            let word = self.words.next()?;
            if word.is_empty() {
                continue;
            }
            let token = word.to_lowercase();
            if self.survives(&token) {
                self.window.push_back(token);
            }
        }
        Some(self.window.iter().cloned().collect())
    }
}
