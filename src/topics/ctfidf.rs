//! Class-based TF-IDF topic representation.
//!
//! All documents of a topic are merged into one class document. A term's
//! weight in a class is its L1-normalized frequency in that class scaled
//! by `ln(1 + A / f(t))`, where `A` is the average word count per class and
//! `f(t)` the term's frequency over all classes.

use super::vectorizer::{SparseVec, Vocabulary};
use std::collections::BTreeMap;

/// Fitted c-TF-IDF matrix, one row per topic (ascending topic id).
#[derive(Debug, Clone, Default)]
pub struct ClassTfidf {
    topics: Vec<i32>,
    rows: Vec<SparseVec>,
    idf: Vec<f64>,
}

fn l1_scaled(counts: &[(usize, f64)], idf: &[f64]) -> SparseVec {
    let total: f64 = counts.iter().map(|(_, c)| c).sum();
    if total == 0.0 {
        return Vec::new();
    }
    counts
        .iter()
        .map(|(i, c)| (*i, c / total * idf[*i]))
        .collect()
}

/// Sum sparse count rows into one row.
pub fn sum_rows<'a, I>(rows: I) -> SparseVec
where
    I: IntoIterator<Item = &'a SparseVec>,
{
    let mut acc: BTreeMap<usize, f64> = BTreeMap::new();
    for row in rows {
        for (i, v) in row {
            *acc.entry(*i).or_insert(0.0) += v;
        }
    }
    acc.into_iter().collect()
}

impl ClassTfidf {
    /// Fit on per-document `counts` grouped by `labels`.
    pub fn fit(labels: &[i32], counts: &[SparseVec], n_terms: usize) -> Self {
        let mut grouped: BTreeMap<i32, Vec<&SparseVec>> = BTreeMap::new();
        for (label, row) in labels.iter().zip(counts) {
            grouped.entry(*label).or_default().push(row);
        }

        let topics: Vec<i32> = grouped.keys().copied().collect();
        let class_counts: Vec<SparseVec> = grouped.into_values().map(sum_rows).collect();

        let mut term_totals = vec![0.0; n_terms];
        let mut grand_total = 0.0;
        for row in &class_counts {
            for (i, c) in row {
                term_totals[*i] += c;
                grand_total += c;
            }
        }
        let avg_words = if class_counts.is_empty() {
            0.0
        } else {
            (grand_total / class_counts.len() as f64).trunc()
        };
        let idf: Vec<f64> = term_totals
            .iter()
            .map(|f| if *f > 0.0 { (1.0 + avg_words / f).ln() } else { 0.0 })
            .collect();

        let rows = class_counts.iter().map(|row| l1_scaled(row, &idf)).collect();
        Self { topics, rows, idf }
    }

    /// Topic ids with a row, ascending.
    pub fn topics(&self) -> &[i32] {
        &self.topics
    }

    /// The c-TF-IDF row of `topic`.
    pub fn row(&self, topic: i32) -> Option<&SparseVec> {
        self.topics
            .binary_search(&topic)
            .ok()
            .map(|pos| &self.rows[pos])
    }

    /// Weight arbitrary counts (a query, a time slice) with the fitted idf.
    pub fn weigh(&self, counts: &[(usize, f64)]) -> SparseVec {
        l1_scaled(counts, &self.idf)
    }
}

/// The `n` highest-weighted terms of `row`; zero weights are skipped and
/// ties go to the alphabetically first term.
pub fn top_terms(row: &[(usize, f64)], vocab: &Vocabulary, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<&(usize, f64)> = row.iter().filter(|(_, w)| *w > 0.0).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(i, w)| (vocab.term(*i).to_string(), *w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::vectorizer::CountVectorizer;

    fn fitted() -> (Vocabulary, ClassTfidf) {
        let v = CountVectorizer {
            min_df: 1,
            ngram_range: (1, 1),
        };
        let docs = [
            "salmonella eggs salmonella",
            "salmonella poultry",
            "aflatoxin maize",
            "aflatoxin peanuts",
        ];
        let (vocab, counts) = v.fit_transform(&docs);
        let ctfidf = ClassTfidf::fit(&[0, 0, 1, 1], &counts, vocab.len());
        (vocab, ctfidf)
    }

    #[test]
    fn test_rows_per_topic_in_id_order() {
        let (_, ctfidf) = fitted();
        assert_eq!(ctfidf.topics(), &[0, 1]);
        assert!(ctfidf.row(0).is_some());
        assert!(ctfidf.row(-1).is_none());
    }

    #[test]
    fn test_top_terms_prefer_distinctive_words() {
        let (vocab, ctfidf) = fitted();
        let words = top_terms(ctfidf.row(0).unwrap(), &vocab, 10);
        assert_eq!(words[0].0, "salmonella");
        assert!(words.iter().all(|(w, _)| w != "aflatoxin"));
        let words = top_terms(ctfidf.row(1).unwrap(), &vocab, 1);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].0, "aflatoxin");
    }

    #[test]
    fn test_weigh_uses_fitted_idf() {
        let (vocab, ctfidf) = fitted();
        let counts = CountVectorizer {
            min_df: 1,
            ngram_range: (1, 1),
        }
        .transform(&vocab, "maize");
        let w = ctfidf.weigh(&counts);
        assert_eq!(w.len(), 1);
        assert!(w[0].1 > 0.0);
        assert!(ctfidf.weigh(&[]).is_empty());
    }

    #[test]
    fn test_sum_rows_merges_indices() {
        let a = vec![(0, 1.0), (2, 1.0)];
        let b = vec![(2, 2.0)];
        assert_eq!(sum_rows([&a, &b]), vec![(0, 1.0), (2, 3.0)]);
    }
}
