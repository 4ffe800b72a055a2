//! The fitted topic model.
//!
//! Fitting runs vectorize → TF-IDF → PCA → HDBSCAN → c-TF-IDF. Topic ids
//! are renumbered so that topic 0 is the largest cluster; `-1` holds the
//! outliers.

use super::ctfidf::{ClassTfidf, sum_rows, top_terms};
use super::reduce::pca_project;
use super::vectorizer::{
    CountVectorizer, SparseVec, Vocabulary, inverse_document_frequency, l2_normalize,
    sparse_cosine, tfidf,
};
use crate::utils::format_timestamp;
use chrono::NaiveDateTime;
use hdbscan::{Hdbscan, HdbscanHyperParams};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use tracing::{info, instrument, warn};

pub const OUTLIER: i32 = -1;

/// Fitting parameters.
#[derive(Debug, Clone)]
pub struct TopicModelParams {
    pub vectorizer: CountVectorizer,
    pub n_components: usize,
    pub min_cluster_size: usize,
    pub top_n_words: usize,
    pub seed: u64,
}

impl Default for TopicModelParams {
    fn default() -> Self {
        Self {
            vectorizer: CountVectorizer::default(),
            n_components: 5,
            min_cluster_size: 3,
            top_n_words: 10,
            seed: 42,
        }
    }
}

/// One row of [`TopicModel::topic_info`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopicInfo {
    pub topic: i32,
    pub count: usize,
    pub name: String,
    pub representation: Vec<String>,
}

/// One `(topic, time bin)` cell of [`TopicModel::topics_over_time`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopicTimeRow {
    pub topic: i32,
    pub words: String,
    pub frequency: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct TopicModel {
    params: TopicModelParams,
    vocab: Vocabulary,
    doc_counts: Vec<SparseVec>,
    topics: Vec<i32>,
    probabilities: Vec<f64>,
    sizes: BTreeMap<i32, usize>,
    ctfidf: ClassTfidf,
    words: BTreeMap<i32, Vec<(String, f64)>>,
}

/// Run HDBSCAN over reduced coordinates. Corpora smaller than one cluster
/// are all outliers.
fn cluster(coords: &[Vec<f64>], min_cluster_size: usize) -> Vec<i32> {
    if coords.len() < min_cluster_size.max(2) {
        return vec![OUTLIER; coords.len()];
    }
    let data: Vec<Vec<f32>> = coords
        .iter()
        .map(|row| row.iter().map(|v| *v as f32).collect())
        .collect();
    let params = HdbscanHyperParams::builder()
        .min_cluster_size(min_cluster_size)
        .build();
    match Hdbscan::new(&data, params).cluster() {
        Ok(labels) => labels,
        Err(e) => {
            warn!(error = %e, "Clustering failed; treating every document as an outlier");
            vec![OUTLIER; coords.len()]
        }
    }
}

/// Renumber cluster labels by descending size (ties: lower label first).
pub fn relabel_by_size(labels: &[i32]) -> Vec<i32> {
    let mut sizes: BTreeMap<i32, usize> = BTreeMap::new();
    for l in labels.iter().filter(|l| **l != OUTLIER) {
        *sizes.entry(*l).or_insert(0) += 1;
    }
    let mut ranked: Vec<(i32, usize)> = sizes.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let mapping: HashMap<i32, i32> = ranked
        .iter()
        .enumerate()
        .map(|(new, (old, _))| (*old, new as i32))
        .collect();
    labels
        .iter()
        .map(|l| mapping.get(l).copied().unwrap_or(OUTLIER))
        .collect()
}

/// Cosine of each document to the centroid of its topic; 0 for outliers.
fn centroid_similarity(rows: &[SparseVec], topics: &[i32]) -> Vec<f64> {
    let mut members: BTreeMap<i32, Vec<&SparseVec>> = BTreeMap::new();
    for (row, t) in rows.iter().zip(topics) {
        if *t != OUTLIER {
            members.entry(*t).or_default().push(row);
        }
    }
    let centroids: BTreeMap<i32, SparseVec> = members
        .into_iter()
        .map(|(t, rs)| {
            let mut c = sum_rows(rs);
            l2_normalize(&mut c);
            (t, c)
        })
        .collect();

    rows.iter()
        .zip(topics)
        .map(|(row, t)| match centroids.get(t) {
            Some(c) => sparse_cosine(row, c).clamp(0.0, 1.0),
            None => 0.0,
        })
        .collect()
}

impl TopicModel {
    /// Fit the model on `docs`.
    #[instrument(level = "info", skip_all, fields(docs = docs.len()))]
    pub fn fit(docs: &[&str], params: TopicModelParams) -> Result<Self, Box<dyn Error>> {
        if docs.is_empty() {
            return Err("no documents to fit".into());
        }

        let (vocab, doc_counts) = params.vectorizer.fit_transform(docs);
        info!(terms = vocab.len(), "Vectorized corpus");

        let idf = inverse_document_frequency(&doc_counts, vocab.len());
        let rows = tfidf(&doc_counts, &idf);

        let k = params.n_components.min(docs.len().saturating_sub(1)).max(1);
        let coords = pca_project(&rows, k, params.seed);
        let topics = relabel_by_size(&cluster(&coords, params.min_cluster_size));

        let mut sizes: BTreeMap<i32, usize> = BTreeMap::new();
        for t in &topics {
            *sizes.entry(*t).or_insert(0) += 1;
        }
        info!(
            topics = sizes.keys().filter(|t| **t != OUTLIER).count(),
            outliers = sizes.get(&OUTLIER).copied().unwrap_or(0),
            "Clustered documents"
        );

        let probabilities = centroid_similarity(&rows, &topics);
        let ctfidf = ClassTfidf::fit(&topics, &doc_counts, vocab.len());
        let words = ctfidf
            .topics()
            .iter()
            .map(|t| {
                let row = ctfidf.row(*t).map(Vec::as_slice).unwrap_or_default();
                (*t, top_terms(row, &vocab, params.top_n_words))
            })
            .collect();

        Ok(Self {
            params,
            vocab,
            doc_counts,
            topics,
            probabilities,
            sizes,
            ctfidf,
            words,
        })
    }

    /// Topic of each fitted document.
    pub fn topics(&self) -> &[i32] {
        &self.topics
    }

    /// Topic probability of each fitted document.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// All topic ids, outliers first when present.
    pub fn topic_ids(&self) -> Vec<i32> {
        self.sizes.keys().copied().collect()
    }

    /// Number of documents in `topic`.
    pub fn topic_size(&self, topic: i32) -> usize {
        self.sizes.get(&topic).copied().unwrap_or(0)
    }

    /// Top words with their c-TF-IDF weights.
    pub fn topic_words(&self, topic: i32) -> &[(String, f64)] {
        self.words.get(&topic).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first `top_n` words of a topic; empty for outliers.
    pub fn topic_keywords(&self, topic: i32, top_n: usize) -> Vec<String> {
        if topic == OUTLIER {
            return Vec::new();
        }
        self.topic_words(topic)
            .iter()
            .take(top_n)
            .map(|(w, _)| w.clone())
            .collect()
    }

    /// Id, size, name and representation of every topic, by id.
    pub fn topic_info(&self) -> Vec<TopicInfo> {
        self.sizes
            .iter()
            .map(|(topic, count)| {
                let representation: Vec<String> =
                    self.topic_words(*topic).iter().map(|(w, _)| w.clone()).collect();
                let name = if *topic == OUTLIER {
                    "-1_outliers".to_string()
                } else {
                    std::iter::once(topic.to_string())
                        .chain(representation.iter().take(4).cloned())
                        .collect::<Vec<_>>()
                        .join("_")
                };
                TopicInfo {
                    topic: *topic,
                    count: *count,
                    name,
                    representation,
                }
            })
            .collect()
    }

    /// Non-outlier topics ordered by size (largest first), at most `n`.
    pub fn largest_topics(&self, n: usize) -> Vec<i32> {
        let mut ids: Vec<i32> = self.sizes.keys().copied().filter(|t| *t != OUTLIER).collect();
        ids.sort_by(|a, b| self.topic_size(*b).cmp(&self.topic_size(*a)).then(a.cmp(b)));
        ids.truncate(n);
        ids
    }

    /// c-TF-IDF row of a topic.
    pub fn topic_vector(&self, topic: i32) -> &[(usize, f64)] {
        self.ctfidf.row(topic).map(Vec::as_slice).unwrap_or_default()
    }

    /// Pairwise cosine similarity of topic c-TF-IDF rows.
    pub fn similarity_matrix(&self, topics: &[i32]) -> Vec<Vec<f64>> {
        topics
            .iter()
            .map(|a| {
                topics
                    .iter()
                    .map(|b| sparse_cosine(self.topic_vector(*a), self.topic_vector(*b)))
                    .collect()
            })
            .collect()
    }

    /// Topics most similar to `query`, best first.
    ///
    /// A query sharing no terms with the vocabulary matches nothing.
    pub fn find_topics(&self, query: &str, top_n: usize) -> Vec<(i32, f64)> {
        let counts = self.params.vectorizer.transform(&self.vocab, query);
        let weighted = self.ctfidf.weigh(&counts);
        if weighted.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(i32, f64)> = self
            .ctfidf
            .topics()
            .iter()
            .filter(|t| **t != OUTLIER)
            .map(|t| (*t, sparse_cosine(&weighted, self.topic_vector(*t))))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_n);
        scored
    }

    /// Topic frequency and representation per time bin.
    ///
    /// `timestamps` runs parallel to the fitted documents; documents without
    /// a timestamp are left out. The range of timestamps is cut into
    /// `nr_bins` equal-width bins, each labelled by its start time.
    pub fn topics_over_time(
        &self,
        timestamps: &[Option<NaiveDateTime>],
        nr_bins: usize,
    ) -> Result<Vec<TopicTimeRow>, Box<dyn Error>> {
        if timestamps.len() != self.topics.len() {
            return Err(format!(
                "expected {} timestamps, got {}",
                self.topics.len(),
                timestamps.len()
            )
            .into());
        }
        let dated: Vec<(usize, i64)> = timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| ts.map(|t| (i, t.and_utc().timestamp())))
            .collect();
        let (Some(min), Some(max)) = (
            dated.iter().map(|(_, t)| *t).min(),
            dated.iter().map(|(_, t)| *t).max(),
        ) else {
            return Ok(Vec::new());
        };

        let nr_bins = nr_bins.max(1);
        let width = (max - min) as f64 / nr_bins as f64;
        let bin_of = |t: i64| -> usize {
            if width == 0.0 {
                0
            } else {
                (((t - min) as f64 / width).floor() as usize).min(nr_bins - 1)
            }
        };

        let mut cells: BTreeMap<(usize, i32), Vec<&SparseVec>> = BTreeMap::new();
        for (i, t) in &dated {
            cells
                .entry((bin_of(*t), self.topics[*i]))
                .or_default()
                .push(&self.doc_counts[*i]);
        }

        Ok(cells
            .into_iter()
            .map(|((bin, topic), rows)| {
                let frequency = rows.len();
                let weighted = self.ctfidf.weigh(&sum_rows(rows));
                let words = top_terms(&weighted, &self.vocab, 5)
                    .into_iter()
                    .map(|(w, _)| w)
                    .collect::<Vec<_>>()
                    .join(", ");
                let start = min + (bin as f64 * width).round() as i64;
                TopicTimeRow {
                    topic,
                    words,
                    frequency,
                    timestamp: format_timestamp(start),
                }
            })
            .collect())
    }
}
