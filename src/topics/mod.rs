//! Topic modeling over summarized articles.
//!
//! The `topics` job loads summarized records (JSON from `summarize`, or a
//! `url,date,content` CSV), fits a [`model::TopicModel`] on the non-empty
//! texts and writes every input record back out with its topic, topic
//! probability, topic keywords and its own keyphrases. A CSV corpus also
//! gets a `Document,Topic_ID,Keyphrases,url,Date` CSV next to the JSON.
//! Static HTML charts of the fitted model are written alongside (see
//! [`crate::outputs::charts`]).
//!
//! | Module | Stage |
//! |--------|-------|
//! | [`vectorizer`] | n-gram counts and TF-IDF |
//! | [`reduce`] | PCA of document vectors |
//! | [`model`] | clustering, topic words, queries |
//! | [`ctfidf`] | class-based TF-IDF |
//! | [`hierarchy`] | topic dendrogram |
//! | [`keyphrases`] | per-document keyphrases |

pub mod ctfidf;
pub mod hierarchy;
pub mod keyphrases;
pub mod model;
pub mod reduce;
pub mod vectorizer;

use crate::models::{CsvCorpusRow, SummarizedArticle, TopicAssignedArticle};
use crate::outputs::charts;
use crate::outputs::csv::save_topic_assignments_to_csv;
use crate::outputs::json::{read_records, write_pretty};
use crate::utils::parse_loose_datetime;
use model::{OUTLIER, TopicModel, TopicModelParams};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

const MAX_REPRESENTATIVE_DOCS: usize = 50;

/// Settings for one `topics` run.
#[derive(Debug, Clone)]
pub struct TopicsOptions {
    pub input: String,
    pub output: String,
    pub charts_dir: String,
    pub min_cluster_size: usize,
    pub nr_bins: usize,
    pub search: Option<String>,
}

/// What a `topics` run produced.
#[derive(Debug, Clone)]
pub struct TopicsReport {
    pub records: usize,
    pub fitted: usize,
    pub topics: usize,
    pub output_path: PathBuf,
    /// Topic CSV, written only for CSV corpora.
    pub csv_path: Option<PathBuf>,
    pub charts: Vec<PathBuf>,
}

/// A document shown for a topic in the pie chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepresentativeDoc {
    #[serde(rename = "Document")]
    pub document: String,
    #[serde(rename = "URL")]
    pub url: String,
}

pub type RepresentativeDocs = BTreeMap<i32, Vec<RepresentativeDoc>>;

fn is_csv(path: &str) -> bool {
    Path::new(path).extension().is_some_and(|ext| ext == "csv")
}

/// Load the corpus: CSV when the path ends in `.csv`, JSON otherwise.
///
/// CSV rows use `content` as the text to model.
pub async fn load_corpus(path: &str) -> Result<Vec<SummarizedArticle>, Box<dyn Error>> {
    if is_csv(path) {
        let data = fs::read(path).await?;
        let mut reader = csv::Reader::from_reader(data.as_slice());
        let mut records: Vec<SummarizedArticle> = Vec::new();
        for row in reader.deserialize::<CsvCorpusRow>() {
            records.push(row?.into());
        }
        Ok(records)
    } else {
        read_records(path).await
    }
}

/// `"Outlier"` or `"Topic {n}: w1, w2, w3"`.
pub fn topic_label(model: &TopicModel, topic: i32) -> String {
    if topic == OUTLIER {
        return "Outlier".to_string();
    }
    format!("Topic {topic}: {}", model.topic_keywords(topic, 3).join(", "))
}

/// Distinct `(document, URL)` pairs per non-outlier topic, in input order,
/// at most 50 per topic.
pub fn representative_docs(records: &[TopicAssignedArticle]) -> RepresentativeDocs {
    let mut seen: HashSet<(i32, &str, &str)> = HashSet::new();
    let mut docs = RepresentativeDocs::new();
    for rec in records.iter().filter(|r| r.assigned_topic != OUTLIER) {
        let topic = rec.assigned_topic;
        let document = rec.summarized.summary.as_str();
        let url = rec.summarized.article.url.as_str();
        if !seen.insert((topic, document, url)) {
            continue;
        }
        let entry = docs.entry(topic).or_default();
        if entry.len() < MAX_REPRESENTATIVE_DOCS {
            entry.push(RepresentativeDoc {
                document: document.to_string(),
                url: url.to_string(),
            });
        }
    }
    docs
}

/// `"{first 50 chars} ({URL})"` per document joined by `"; "`, or `"None"`.
pub fn rep_docs_to_string(docs: &RepresentativeDocs, topic: i32) -> String {
    match docs.get(&topic) {
        Some(list) => list
            .iter()
            .map(|d| {
                let snippet: String = d.document.chars().take(50).collect();
                format!("{} ({})", snippet.replace('\n', " "), d.url)
            })
            .collect::<Vec<_>>()
            .join("; "),
        None => "None".to_string(),
    }
}

/// Attach topic results to every record. Records outside `fitted` (empty
/// text) become outliers without keyphrases.
///
/// `keyphrases` is aligned with `fitted`.
pub fn assign_topics(
    records: Vec<SummarizedArticle>,
    fitted: &[usize],
    model: Option<&TopicModel>,
    keyphrases: &[Vec<String>],
) -> Vec<TopicAssignedArticle> {
    let mut results: BTreeMap<usize, (i32, f64)> = BTreeMap::new();
    if let Some(model) = model {
        for (pos, idx) in fitted.iter().enumerate() {
            results.insert(*idx, (model.topics()[pos], model.probabilities()[pos]));
        }
    }
    let mut phrases: BTreeMap<usize, &Vec<String>> = fitted.iter().copied().zip(keyphrases).collect();

    records
        .into_iter()
        .enumerate()
        .map(|(idx, summarized)| {
            let (topic, probability) = results.get(&idx).copied().unwrap_or((OUTLIER, 0.0));
            let keywords = model
                .map(|m| m.topic_keywords(topic, 5))
                .unwrap_or_default();
            TopicAssignedArticle {
                summarized,
                assigned_topic: topic,
                topic_probability: probability,
                topic_keywords: keywords,
                keyphrases: phrases.remove(&idx).cloned().unwrap_or_default(),
            }
        })
        .collect()
}

/// Run the whole `topics` job.
#[instrument(level = "info", skip_all, fields(input = %opts.input))]
pub async fn run(opts: &TopicsOptions) -> Result<TopicsReport, Box<dyn Error>> {
    let records = load_corpus(&opts.input).await?;
    info!(count = records.len(), "Loaded records");

    let fitted: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.summary.trim().is_empty())
        .map(|(i, _)| i)
        .collect();
    let docs: Vec<&str> = fitted.iter().map(|i| records[*i].summary.as_str()).collect();
    let timestamps: Vec<_> = fitted
        .iter()
        .map(|i| parse_loose_datetime(&records[*i].article.scrape_date))
        .collect();

    let params = TopicModelParams {
        min_cluster_size: opts.min_cluster_size,
        ..TopicModelParams::default()
    };
    let model = if docs.is_empty() {
        warn!("No non-empty documents to model; every record is an outlier");
        None
    } else {
        Some(TopicModel::fit(&docs, params)?)
    };

    let n_fitted = docs.len();
    let doc_keyphrases = keyphrases::extract_keyphrases(&docs, keyphrases::DEFAULT_TOP_N);
    let assigned = assign_topics(records, &fitted, model.as_ref(), &doc_keyphrases);
    let output_path = PathBuf::from(&opts.output);
    write_pretty(&output_path, &assigned).await?;
    info!(path = %output_path.display(), records = assigned.len(), "Saved topic assignments");

    let csv_path = if is_csv(&opts.input) {
        let path = output_path.with_extension("csv");
        save_topic_assignments_to_csv(&assigned, &path)?;
        Some(path)
    } else {
        None
    };

    let Some(model) = model else {
        return Ok(TopicsReport {
            records: assigned.len(),
            fitted: 0,
            topics: 0,
            output_path,
            csv_path,
            charts: Vec::new(),
        });
    };

    for row in model.topic_info() {
        info!(
            topic = row.topic,
            count = row.count,
            name = %row.name,
            label = %topic_label(&model, row.topic),
            "Topic"
        );
    }

    if let Some(query) = &opts.search {
        let matches = model.find_topics(query, 5);
        if matches.is_empty() {
            info!(query = %query, "No topics match the query");
        }
        for (topic, similarity) in matches {
            info!(query = %query, topic, similarity, label = %topic_label(&model, topic), "Similar topic");
        }
    }

    let over_time = model.topics_over_time(&timestamps, opts.nr_bins)?;
    let rep_docs = representative_docs(&assigned);
    let charts = charts::write_all(&opts.charts_dir, &model, &rep_docs, &over_time).await?;

    Ok(TopicsReport {
        records: assigned.len(),
        fitted: n_fitted,
        topics: model.topic_ids().iter().filter(|t| **t != OUTLIER).count(),
        output_path,
        csv_path,
        charts,
    })
}
