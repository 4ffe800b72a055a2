//! Static HTML visualizations of a fitted topic model.
//!
//! Every page is a standalone HTML file that loads plotly.js from its CDN
//! and draws one figure from inline JSON:
//!
//! ```text
//! charts_dir/
//! ├── intertopic_distance.html
//! ├── topic_barchart.html
//! ├── topic_distribution_pie.html
//! ├── total_topic_distribution_bar.html
//! ├── topics_over_time.html
//! ├── topic_hierarchy.html
//! └── topic_heatmap.html
//! ```

use crate::topics::hierarchy::{average_linkage, dendrogram};
use crate::topics::model::{OUTLIER, TopicModel, TopicTimeRow};
use crate::topics::reduce::pca_project;
use crate::topics::{RepresentativeDocs, topic_label};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const PALETTE: [&str; 10] = [
    "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A", "#19d3f3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

const BARCHART_TOPICS: usize = 20;
const OVER_TIME_TOPICS: usize = 15;
const HIERARCHY_TOPICS: usize = 20;

/// JSON safe to inline inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn color(i: usize) -> &'static str {
    PALETTE[i % PALETTE.len()]
}

/// A complete page drawing `data` with `layout`, followed by `extra_script`.
pub fn render_page(title: &str, data: &Value, layout: &Value, extra_script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body>
<div id="chart" class="plotly-graph-div" style="height:100vh; width:100%;"></div>
<script>
Plotly.newPlot('chart', {data}, {layout}, {{"responsive": true}});
</script>
{extra_script}
</body>
</html>
"#,
        title = html_escape(title),
        data = script_json(data),
        layout = script_json(layout),
    )
}

fn base_layout(title: &str) -> Value {
    json!({
        "title": {"text": title},
        "template": "plotly_white",
        "hoverlabel": {"bgcolor": "white"},
    })
}

/// 2-D map of topics: PCA of their c-TF-IDF rows, bubble area = topic size.
pub fn intertopic_distance(model: &TopicModel) -> String {
    let topics: Vec<i32> = model.topic_ids().into_iter().filter(|t| *t != OUTLIER).collect();
    let rows: Vec<_> = topics.iter().map(|t| model.topic_vector(*t).to_vec()).collect();
    let coords = pca_project(&rows, 2, 42);

    let max_size = topics.iter().map(|t| model.topic_size(*t)).max().unwrap_or(1).max(1);
    let data = json!([{
        "type": "scatter",
        "mode": "markers",
        "x": coords.iter().map(|c| c[0]).collect::<Vec<_>>(),
        "y": coords.iter().map(|c| c[1]).collect::<Vec<_>>(),
        "text": topics.iter().map(|t| format!(
            "Topic {t}<br>{}<br>Size: {}",
            model.topic_keywords(*t, 5).join(" | "),
            model.topic_size(*t)
        )).collect::<Vec<_>>(),
        "hoverinfo": "text",
        "marker": {
            "size": topics.iter().map(|t| model.topic_size(*t)).collect::<Vec<_>>(),
            "sizemode": "area",
            "sizeref": 2.0 * max_size as f64 / (40.0 * 40.0),
            "color": "#B0BEC5",
            "line": {"width": 2, "color": "DarkSlateGrey"},
        },
    }]);
    let mut layout = base_layout("Intertopic Distance Map");
    layout["xaxis"] = json!({"title": {"text": "D1"}, "zeroline": true});
    layout["yaxis"] = json!({"title": {"text": "D2"}, "zeroline": true});
    render_page("Intertopic Distance Map", &data, &layout, "")
}

/// Top-5 word scores of the largest topics, one small bar chart each.
pub fn topic_barchart(model: &TopicModel) -> String {
    let topics = model.largest_topics(BARCHART_TOPICS);
    let columns = 4.min(topics.len()).max(1);
    let rows = topics.len().div_ceil(columns).max(1);

    let mut data = Vec::new();
    let mut annotations = Vec::new();
    for (i, t) in topics.iter().enumerate() {
        let axis = if i == 0 { String::new() } else { (i + 1).to_string() };
        let mut words: Vec<(String, f64)> = model.topic_words(*t).iter().take(5).cloned().collect();
        words.reverse();
        data.push(json!({
            "type": "bar",
            "orientation": "h",
            "x": words.iter().map(|(_, w)| w).collect::<Vec<_>>(),
            "y": words.iter().map(|(w, _)| format!("{w}  ")).collect::<Vec<_>>(),
            "marker": {"color": color(i)},
            "xaxis": format!("x{axis}"),
            "yaxis": format!("y{axis}"),
            "showlegend": false,
        }));
        annotations.push(json!({
            "text": format!("Topic {t}"),
            "xref": format!("x{axis} domain"),
            "yref": format!("y{axis} domain"),
            "x": 0.5,
            "y": 1.15,
            "showarrow": false,
        }));
    }

    let mut layout = base_layout("Topic Word Scores");
    layout["grid"] = json!({"rows": rows, "columns": columns, "pattern": "independent"});
    layout["annotations"] = Value::Array(annotations);
    layout["height"] = json!(250 * rows);
    render_page("Topic Word Scores", &Value::Array(data), &layout, "")
}

/// Click handler listing up to five randomly chosen documents of a topic.
fn pie_click_script(candidates: &Value) -> String {
    format!(
        r#"<script>
  var candidateDocs = {candidates};
  var myPlot = document.getElementsByClassName('plotly-graph-div')[0];

  function getRandomSamples(arr, n) {{
    var result = [];
    var taken = [];
    n = Math.min(n, arr.length);
    while (result.length < n) {{
      var index = Math.floor(Math.random() * arr.length);
      if (!taken.includes(index)) {{
        taken.push(index);
        result.push(arr[index]);
      }}
    }}
    return result;
  }}

  myPlot.on('plotly_click', function(data) {{
    var topicId = data.points[0].customdata;
    if (Array.isArray(topicId)) {{
      topicId = topicId[0];
    }}
    var docs = candidateDocs[topicId] || [];
    var maxToShow = 5;
    var sampledDocs = docs.length <= maxToShow ? docs : getRandomSamples(docs, maxToShow);

    var displayDiv = document.getElementById('docDisplay');
    if (!displayDiv) {{
      displayDiv = document.createElement('div');
      displayDiv.id = 'docDisplay';
      displayDiv.style.marginTop = '20px';
      displayDiv.style.border = '1px solid black';
      displayDiv.style.padding = '10px';
      document.body.appendChild(displayDiv);
    }}

    var list = document.createElement('ul');
    sampledDocs.forEach(function(doc) {{
      var item = document.createElement('li');
      item.appendChild(document.createTextNode(doc.Document.substring(0, 50).replace(/\n/g, ' ') + ' ('));
      var link = document.createElement('a');
      link.href = doc.URL;
      link.target = '_blank';
      link.textContent = 'Link';
      item.appendChild(link);
      item.appendChild(document.createTextNode(')'));
      list.appendChild(item);
    }});
    displayDiv.innerHTML = '<h3>Representative Documents for Topic ' + topicId + '</h3>';
    displayDiv.appendChild(list);
  }});
</script>"#,
        candidates = script_json(candidates),
    )
}

/// Pie of non-outlier topic sizes; clicking a slice lists sample documents.
pub fn topic_distribution_pie(model: &TopicModel, rep_docs: &RepresentativeDocs) -> String {
    let info: Vec<_> = model
        .topic_info()
        .into_iter()
        .filter(|i| i.topic != OUTLIER)
        .collect();
    let data = json!([{
        "type": "pie",
        "labels": info.iter().map(|i| topic_label(model, i.topic)).collect::<Vec<_>>(),
        "values": info.iter().map(|i| i.count).collect::<Vec<_>>(),
        "customdata": info.iter().map(|i| i.topic).collect::<Vec<_>>(),
        "hovertemplate": "%{label}<br>Count: %{value}<extra></extra>",
    }]);
    let layout = base_layout("Topic Distribution (Pie Chart)");

    let candidates: BTreeMap<String, _> = rep_docs
        .iter()
        .map(|(t, docs)| (t.to_string(), docs))
        .collect();
    let script = pie_click_script(&json!(candidates));
    render_page("Topic Distribution (Pie Chart)", &data, &layout, &script)
}

/// Bar chart of every topic's size, outliers included.
pub fn total_topic_distribution(model: &TopicModel) -> String {
    let info = model.topic_info();
    let data = json!([{
        "type": "bar",
        "x": info.iter().map(|i| i.topic).collect::<Vec<_>>(),
        "y": info.iter().map(|i| i.count).collect::<Vec<_>>(),
        "hovertext": info.iter().map(|i| i.name.clone()).collect::<Vec<_>>(),
        "marker": {"color": color(0)},
    }]);
    let mut layout = base_layout("Total Topic Distribution");
    layout["xaxis"] = json!({"title": {"text": "Topic"}, "type": "category"});
    layout["yaxis"] = json!({"title": {"text": "Count"}});
    render_page("Total Topic Distribution", &data, &layout, "")
}

/// Frequency of the largest topics per time bin.
pub fn topics_over_time(model: &TopicModel, rows: &[TopicTimeRow]) -> String {
    let topics = model.largest_topics(OVER_TIME_TOPICS);
    let data: Vec<Value> = topics
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let series: Vec<&TopicTimeRow> = rows.iter().filter(|r| r.topic == *t).collect();
            json!({
                "type": "scatter",
                "mode": "lines",
                "name": topic_label(model, *t),
                "x": series.iter().map(|r| r.timestamp.clone()).collect::<Vec<_>>(),
                "y": series.iter().map(|r| r.frequency).collect::<Vec<_>>(),
                "text": series.iter().map(|r| format!("<b>Topic {t}</b><br>Words: {}", r.words)).collect::<Vec<_>>(),
                "hoverinfo": "text",
                "line": {"color": color(i)},
            })
        })
        .collect();
    let mut layout = base_layout("Topics over Time");
    layout["xaxis"] = json!({"title": {"text": "Time"}});
    layout["yaxis"] = json!({"title": {"text": "Frequency"}});
    render_page("Topics over Time", &Value::Array(data), &layout, "")
}

/// Average-linkage dendrogram of the largest topics (cosine distance).
pub fn topic_hierarchy(model: &TopicModel) -> String {
    let topics = model.largest_topics(HIERARCHY_TOPICS);
    let distances: Vec<Vec<f64>> = model
        .similarity_matrix(&topics)
        .into_iter()
        .map(|row| row.into_iter().map(|s| (1.0 - s).max(0.0)).collect())
        .collect();
    let merges = average_linkage(&distances);
    let tree = dendrogram(&merges, topics.len());

    let data: Vec<Value> = tree
        .links
        .iter()
        .map(|link| {
            json!({
                "type": "scatter",
                "mode": "lines",
                "x": link.iter().map(|(x, _)| x).collect::<Vec<_>>(),
                "y": link.iter().map(|(_, y)| y).collect::<Vec<_>>(),
                "line": {"color": color(0)},
                "hoverinfo": "none",
                "showlegend": false,
            })
        })
        .collect();

    let labels: Vec<String> = tree
        .leaf_order
        .iter()
        .map(|leaf| topic_label(model, topics[*leaf]))
        .collect();
    let mut layout = base_layout("Hierarchical Clustering");
    layout["xaxis"] = json!({
        "tickmode": "array",
        "tickvals": tree.leaf_positions,
        "ticktext": labels,
        "tickangle": -45,
    });
    layout["yaxis"] = json!({"title": {"text": "Cosine distance"}});
    render_page("Hierarchical Clustering", &Value::Array(data), &layout, "")
}

/// Pairwise cosine similarity of all non-outlier topics.
pub fn topic_heatmap(model: &TopicModel) -> String {
    let topics: Vec<i32> = model.topic_ids().into_iter().filter(|t| *t != OUTLIER).collect();
    let labels: Vec<String> = topics.iter().map(|t| topic_label(model, *t)).collect();
    let data = json!([{
        "type": "heatmap",
        "z": model.similarity_matrix(&topics),
        "x": labels,
        "y": labels,
        "colorscale": "GnBu",
        "zmin": 0.0,
        "zmax": 1.0,
    }]);
    let mut layout = base_layout("Similarity Matrix");
    layout["yaxis"] = json!({"autorange": "reversed"});
    render_page("Similarity Matrix", &data, &layout, "")
}

/// Write every chart into `dir`, returning the written paths.
#[instrument(level = "info", skip_all, fields(dir = dir))]
pub async fn write_all(
    dir: &str,
    model: &TopicModel,
    rep_docs: &RepresentativeDocs,
    over_time: &[TopicTimeRow],
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    fs::create_dir_all(dir).await?;
    let pages = [
        ("intertopic_distance.html", intertopic_distance(model)),
        ("topic_barchart.html", topic_barchart(model)),
        ("topic_distribution_pie.html", topic_distribution_pie(model, rep_docs)),
        ("total_topic_distribution_bar.html", total_topic_distribution(model)),
        ("topics_over_time.html", topics_over_time(model, over_time)),
        ("topic_hierarchy.html", topic_hierarchy(model)),
        ("topic_heatmap.html", topic_heatmap(model)),
    ];

    let mut written = Vec::with_capacity(pages.len());
    for (name, html) in pages {
        let path = Path::new(dir).join(name);
        fs::write(&path, html).await?;
        info!(path = %path.display(), "Saved chart");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::RepresentativeDoc;
    use crate::topics::model::TopicModelParams;
    use crate::topics::vectorizer::CountVectorizer;

    fn model() -> TopicModel {
        let docs = [
            "salmonella outbreak eggs recall",
            "salmonella eggs contamination recall",
            "salmonella outbreak poultry eggs",
            "aflatoxin maize harvest drought",
            "aflatoxin maize contamination drought",
            "aflatoxin peanuts maize drought",
        ];
        let params = TopicModelParams {
            vectorizer: CountVectorizer {
                min_df: 1,
                ngram_range: (1, 1),
            },
            ..TopicModelParams::default()
        };
        TopicModel::fit(&docs, params).unwrap()
    }

    #[test]
    fn test_script_json_escapes_closing_tags() {
        let v = json!({"doc": "</script><b>"});
        assert_eq!(script_json(&v), r#"{"doc":"<\/script><b>"}"#);
    }

    #[test]
    fn test_render_page_loads_plotly_from_cdn() {
        let html = render_page("A <b> title", &json!([]), &json!({}), "");
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("<title>A &lt;b&gt; title</title>"));
        assert!(html.contains("Plotly.newPlot('chart', [], {}"));
    }

    #[test]
    fn test_pie_embeds_candidate_docs() {
        let model = model();
        let mut rep = RepresentativeDocs::new();
        rep.insert(
            0,
            vec![RepresentativeDoc {
                document: "Eggs recalled".to_string(),
                url: "https://a".to_string(),
            }],
        );
        let html = topic_distribution_pie(&model, &rep);
        assert!(html.contains(r#"var candidateDocs = {"0":[{"Document":"Eggs recalled","URL":"https://a"}]};"#));
        assert!(html.contains("plotly_click"));
    }

    #[test]
    fn test_every_chart_renders() {
        let model = model();
        let over_time = model.topics_over_time(&vec![None; 6], 40).unwrap();
        for html in [
            intertopic_distance(&model),
            topic_barchart(&model),
            total_topic_distribution(&model),
            topics_over_time(&model, &over_time),
            topic_hierarchy(&model),
            topic_heatmap(&model),
        ] {
            assert!(html.starts_with("<!DOCTYPE html>"));
            assert!(html.trim_end().ends_with("</html>"));
        }
    }

    #[tokio::test]
    async fn test_write_all_creates_seven_pages() {
        let dir = std::env::temp_dir().join("emerging_risk_news_charts");
        let _ = std::fs::remove_dir_all(&dir);
        let model = model();
        let written = write_all(&dir.to_string_lossy(), &model, &RepresentativeDocs::new(), &[])
            .await
            .unwrap();
        assert_eq!(written.len(), 7);
        assert!(dir.join("topic_distribution_pie.html").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
