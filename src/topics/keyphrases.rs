//! Per-document keyphrases.
//!
//! Each document's keyphrases are its own highest-weighted unigrams under a
//! TF-IDF fitted on the whole corpus, so words shared by every document rank
//! below the words that set a document apart.

use super::ctfidf::top_terms;
use super::vectorizer::{CountVectorizer, inverse_document_frequency, tfidf};

/// Keyphrases kept per document.
pub const DEFAULT_TOP_N: usize = 5;

/// Top `top_n` keyphrases of every document, in input order.
///
/// Documents without a usable token get an empty list.
pub fn extract_keyphrases(docs: &[&str], top_n: usize) -> Vec<Vec<String>> {
    let vectorizer = CountVectorizer {
        min_df: 1,
        ngram_range: (1, 1),
    };
    let (vocab, counts) = vectorizer.fit_transform(docs);
    let idf = inverse_document_frequency(&counts, vocab.len());
    tfidf(&counts, &idf)
        .iter()
        .map(|row| {
            top_terms(row, &vocab, top_n)
                .into_iter()
                .map(|(term, _)| term)
                .collect()
        })
        .collect()
}

/// Keyphrases as one `"; "`-separated cell.
pub fn join_keyphrases(phrases: &[String]) -> String {
    phrases.join("; ")
}
