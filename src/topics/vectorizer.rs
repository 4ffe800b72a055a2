//! Bag-of-n-grams vectorizer.
//!
//! Tokens are runs of two or more word characters, lowercased, with English
//! stop words removed before n-grams are formed. Terms that occur in fewer
//! than `min_df` documents are dropped from the vocabulary.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use stop_words::{LANGUAGE, get};

/// Sparse row: `(term index, value)` pairs sorted by term index.
pub type SparseVec = Vec<(usize, f64)>;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("static regex"));
static STOP_WORDS: Lazy<HashSet<String>> = Lazy::new(|| get(LANGUAGE::English).into_iter().collect());

/// Vectorizer parameters.
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    pub min_df: usize,
    pub ngram_range: (usize, usize),
}

impl Default for CountVectorizer {
    fn default() -> Self {
        Self {
            min_df: 2,
            ngram_range: (1, 2),
        }
    }
}

/// A vocabulary learned from a corpus.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, idx: usize) -> &str {
        &self.terms[idx]
    }
}

impl CountVectorizer {
    /// Lowercased, stop-word-free n-grams of `doc`.
    pub fn analyze(&self, doc: &str) -> Vec<String> {
        let lower = doc.to_lowercase();
        let tokens: Vec<&str> = TOKEN
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| !STOP_WORDS.contains(*t))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut grams = Vec::new();
        for n in min_n.max(1)..=max_n {
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }

    /// Learn the vocabulary of `docs` and return it with the count matrix.
    ///
    /// Terms are indexed in alphabetical order. When `min_df` would discard
    /// every term (tiny corpora), it is relaxed to 1.
    pub fn fit_transform(&self, docs: &[&str]) -> (Vocabulary, Vec<SparseVec>) {
        let analyzed: Vec<Vec<String>> = docs.iter().map(|d| self.analyze(d)).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for grams in &analyzed {
            let unique: HashSet<&str> = grams.iter().map(String::as_str).collect();
            for g in unique {
                *doc_freq.entry(g).or_insert(0) += 1;
            }
        }

        let mut min_df = self.min_df.max(1);
        if !doc_freq.values().any(|&df| df >= min_df) {
            min_df = 1;
        }

        let terms: Vec<String> = doc_freq
            .iter()
            .filter(|(_, df)| **df >= min_df)
            .map(|(t, _)| t.to_string())
            .collect();
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        let vocab = Vocabulary { terms, index };

        let rows = analyzed.iter().map(|grams| count_row(&vocab, grams)).collect();
        (vocab, rows)
    }

    /// Count the known n-grams of `doc` against a fitted vocabulary.
    pub fn transform(&self, vocab: &Vocabulary, doc: &str) -> SparseVec {
        count_row(vocab, &self.analyze(doc))
    }
}

fn count_row(vocab: &Vocabulary, grams: &[String]) -> SparseVec {
    let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
    for g in grams {
        if let Some(&idx) = vocab.index.get(g) {
            *counts.entry(idx).or_insert(0.0) += 1.0;
        }
    }
    counts.into_iter().collect()
}

/// Dot product of two sorted sparse rows.
pub fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j, mut acc) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                acc += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    acc
}

/// Scale a sparse row to unit Euclidean length (zero rows stay zero).
pub fn l2_normalize(row: &mut SparseVec) {
    let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        row.iter_mut().for_each(|(_, v)| *v /= norm);
    }
}

/// Cosine similarity of two sparse rows; 0 when either is empty.
pub fn sparse_cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let na = a.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
    let nb = b.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    sparse_dot(a, b) / (na * nb)
}

/// Smoothed inverse document frequency per term:
/// `ln((1 + n) / (1 + df)) + 1`.
pub fn inverse_document_frequency(rows: &[SparseVec], n_terms: usize) -> Vec<f64> {
    let mut df = vec![0usize; n_terms];
    for row in rows {
        for (idx, _) in row {
            df[*idx] += 1;
        }
    }
    let n = rows.len() as f64;
    df.into_iter()
        .map(|d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
        .collect()
}

/// L2-normalized TF-IDF rows from raw counts.
pub fn tfidf(rows: &[SparseVec], idf: &[f64]) -> Vec<SparseVec> {
    rows.iter()
        .map(|row| {
            let mut weighted: SparseVec = row.iter().map(|(i, c)| (*i, c * idf[*i])).collect();
            l2_normalize(&mut weighted);
            weighted
        })
        .collect()
}
