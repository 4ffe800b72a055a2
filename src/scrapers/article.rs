//! Article body scraper.
//!
//! Turns a list of article URLs into cleaned body text. Page chrome
//! (`script`, `style`, `header`, `footer`, `nav`, `aside`, `form`,
//! `noscript`) is dropped, `<main>` is preferred when the page has one, and
//! whitespace is collapsed to single spaces.
//!
//! Two input flavours are supported:
//! - JSON link lists from the `links` job (`[{URL, Scrape Date}]`)
//! - CSV files with `url` and `date` columns (such as the `feeds` output)
//!
//! A failed URL is written to the error log and never stops the batch.

use crate::models::{
    ArticleRecord, CsvArticleRow, CsvErrorRow, CsvLinkRow, LinkRecord, RawLinkRecord,
    ScrapeFailure,
};
use crate::outputs::json::write_pretty;
use crate::utils::{collapse_whitespace, dedup_by_key, file_stem, today_stamp};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("main").expect("static selector"));

/// Elements whose text never belongs to the article body.
const STRIPPED_TAGS: [&str; 8] = [
    "script", "style", "header", "footer", "nav", "aside", "form", "noscript",
];

/// Outcome of processing one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeReport {
    pub output_path: PathBuf,
    pub error_path: PathBuf,
    pub scraped: usize,
    pub failed: usize,
}

fn is_stripped(element: &ElementRef<'_>) -> bool {
    STRIPPED_TAGS.contains(&element.value().name())
}

/// Extract readable text from an HTML page.
///
/// A `<main>` nested inside stripped chrome does not count.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document
        .select(&MAIN)
        .find(|main| !main.ancestors().filter_map(ElementRef::wrap).any(|a| is_stripped(&a)))
        .unwrap_or_else(|| document.root_element());

    let mut pieces = Vec::new();
    collect_text(root, &mut pieces);
    collapse_whitespace(&pieces.join(" "))
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !is_stripped(&child_el) {
                collect_text(child_el, out);
            }
        }
    }
}

/// Fetch one URL and return its cleaned text.
///
/// # Errors
///
/// - transport failures and non-2xx statuses
/// - a `Content-Type` that is not `text/html` (`"Non-HTML content: ..."`)
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn scrape_url(client: &Client, url: &str) -> Result<String, Box<dyn Error>> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("text/html") {
        debug!(%content_type, "Non-HTML response");
        return Err(format!("Non-HTML content: {content_type}").into());
    }

    let body = resp.text().await?;
    let text = extract_text(&body);
    debug!(bytes = text.len(), "Parsed article");
    Ok(text)
}

/// Scrape every link, splitting successes from failures.
async fn scrape_links(
    client: &Client,
    links: Vec<LinkRecord>,
) -> (Vec<ArticleRecord>, Vec<ScrapeFailure>) {
    let total = links.len();
    let outcomes: Vec<Result<ArticleRecord, ScrapeFailure>> = stream::iter(links.into_iter().enumerate())
        .then(|(idx, link)| async move {
            debug!(idx, total, url = %link.url, "Processing URL");
            match scrape_url(client, &link.url).await {
                Ok(content) => Ok(ArticleRecord {
                    url: link.url,
                    scrape_date: link.scrape_date,
                    content,
                }),
                Err(e) => {
                    warn!(url = %link.url, error = %e, "Scrape failed");
                    Err(ScrapeFailure {
                        url: link.url,
                        scrape_date: link.scrape_date,
                        error: e.to_string(),
                    })
                }
            }
        })
        .collect()
        .await;

    let mut results = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(rec) => results.push(rec),
            Err(fail) => errors.push(fail),
        }
    }
    (results, errors)
}

/// Drop records without a URL and keep the first record per URL.
pub fn unique_links(raw: Vec<RawLinkRecord>) -> Vec<LinkRecord> {
    let links = raw
        .into_iter()
        .filter_map(|r| {
            let url = r.url.filter(|u| !u.trim().is_empty())?;
            Some(LinkRecord {
                url,
                scrape_date: r.scrape_date.unwrap_or_default(),
            })
        })
        .collect();
    dedup_by_key(links, |l: &LinkRecord| l.url.clone())
}

/// Scrape a JSON link list into `{stem}_{YYYYMMDD}_output.json` and
/// `{stem}_{YYYYMMDD}_error_log.json` under `output_dir`.
#[instrument(level = "info", skip(client))]
pub async fn process_json_file(
    client: &Client,
    json_path: &str,
    output_dir: &str,
) -> Result<ScrapeReport, Box<dyn Error>> {
    let raw = fs::read_to_string(json_path).await?;
    let records: Vec<RawLinkRecord> = serde_json::from_str(&raw)?;
    let unique = unique_links(records);
    info!(count = unique.len(), "Unique URLs after deduplication");

    let stem = file_stem(json_path);
    let today = today_stamp();
    let output_path = Path::new(output_dir).join(format!("{stem}_{today}_output.json"));
    let error_path = Path::new(output_dir).join(format!("{stem}_{today}_error_log.json"));
    info!(output = %output_path.display(), errors = %error_path.display(), "Output files");

    let (results, errors) = scrape_links(client, unique).await;

    write_pretty(&output_path, &results).await?;
    write_pretty(&error_path, &errors).await?;
    info!(scraped = results.len(), failed = errors.len(), "Finished JSON scrape");

    Ok(ScrapeReport {
        output_path,
        error_path,
        scraped: results.len(),
        failed: errors.len(),
    })
}

/// Read `url,date` rows from CSV text. Header names match case-insensitively,
/// so the `URL,Date` files written by the feed job load as-is.
///
/// # Errors
///
/// Fails when the header lacks a `url` or `date` column.
pub fn read_link_rows(data: &[u8]) -> Result<Vec<CsvLinkRow>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let (Some(url_idx), Some(date_idx)) = (column("url"), column("date")) else {
        return Err("CSV file must contain both 'url' and 'date' columns".into());
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(CsvLinkRow {
            url: record.get(url_idx).unwrap_or_default().to_string(),
            date: record.get(date_idx).unwrap_or_default().to_string(),
        });
    }
    Ok(rows)
}

/// Scrape a CSV link list into `{stem}_output.csv` and `{stem}_error_log.csv`.
///
/// Rows are written as they complete so a crash leaves a usable partial file.
#[instrument(level = "info", skip(client))]
pub async fn process_csv_file(
    client: &Client,
    csv_path: &str,
    output_dir: &str,
) -> Result<ScrapeReport, Box<dyn Error>> {
    let data = fs::read(csv_path).await?;
    let rows = read_link_rows(&data)?;

    let stem = file_stem(csv_path);
    let output_path = Path::new(output_dir).join(format!("{stem}_output.csv"));
    let error_path = Path::new(output_dir).join(format!("{stem}_error_log.csv"));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&output_path)?;
    let mut error_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&error_path)?;
    writer.write_record(["url", "date", "content"])?;
    error_writer.write_record(["url", "date", "error"])?;

    let mut scraped = 0;
    let mut failed = 0;
    for row in &rows {
        info!(url = %row.url, "Processing URL");
        match scrape_url(client, &row.url).await {
            Ok(content) => {
                writer.serialize(CsvArticleRow {
                    url: &row.url,
                    date: &row.date,
                    content: &content,
                })?;
                writer.flush()?;
                scraped += 1;
            }
            Err(e) => {
                let error = e.to_string();
                error_writer.serialize(CsvErrorRow {
                    url: &row.url,
                    date: &row.date,
                    error: &error,
                })?;
                error_writer.flush()?;
                warn!(url = %row.url, %error, "Logged error for URL");
                failed += 1;
            }
        }
    }

    Ok(ScrapeReport {
        output_path,
        error_path,
        scraped,
        failed,
    })
}

/// Process every `*.csv` in `dir`, writing into `{dir}/scraped_output/`.
///
/// A file that cannot be processed is logged and skipped.
#[instrument(level = "info", skip(client))]
pub async fn process_csv_directory(
    client: &Client,
    dir: &str,
) -> Result<Vec<ScrapeReport>, Box<dyn Error>> {
    let output_dir = Path::new(dir).join("scraped_output");
    fs::create_dir_all(&output_dir).await?;
    let output_dir = output_dir.to_string_lossy().into_owned();

    let mut csv_files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            csv_files.push(path);
        }
    }
    csv_files.sort();

    if csv_files.is_empty() {
        info!("No CSV files found in the directory");
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for path in csv_files {
        let path = path.to_string_lossy().into_owned();
        info!(%path, "Found CSV file");
        match process_csv_file(client, &path, &output_dir).await {
            Ok(report) => reports.push(report),
            Err(e) => error!(%path, error = %e, "Error processing file"),
        }
    }
    info!(files = reports.len(), "Completed processing all files");
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_prefers_main() {
        let html = r#"<html><head><title>T</title></head><body>
            <nav>Home | About</nav>
            <main><h1>Aflatoxin  found</h1>
              <p>Batches of
                 peanuts were recalled.</p>
              <script>var x = 1;</script>
            </main>
            <footer>Copyright</footer>
        </body></html>"#;
        assert_eq!(extract_text(html), "Aflatoxin found Batches of peanuts were recalled.");
    }

    #[test]
    fn test_extract_text_without_main_strips_chrome() {
        let html = r#"<html><body>
            <header>Site header</header>
            <div><p>Norovirus outbreak</p><aside>Ads</aside></div>
            <form><input value="x">Subscribe</form>
            <noscript>Enable JS</noscript>
            <style>p { color: red }</style>
            <p>linked to oysters.</p>
        </body></html>"#;
        assert_eq!(extract_text(html), "Norovirus outbreak linked to oysters.");
    }

    #[test]
    fn test_extract_text_ignores_main_inside_chrome() {
        let html = "<html><body><form><main><p>Body text</p></main></form></body></html>";
        assert_eq!(extract_text(html), "");

        let html = r#"<html><body>
            <header><main>Menu</main></header>
            <main><p>Cadmium in rice</p></main>
        </body></html>"#;
        assert_eq!(extract_text(html), "Cadmium in rice");
    }

    #[test]
    fn test_unique_links_drops_missing_and_duplicate_urls() {
        let raw: Vec<RawLinkRecord> = serde_json::from_str(
            r#"[
                {"URL": "https://a", "Scrape Date": "d1"},
                {"Scrape Date": "d2"},
                {"URL": "", "Scrape Date": "d3"},
                {"URL": "https://a", "Scrape Date": "d4"},
                {"URL": "https://b"}
            ]"#,
        )
        .unwrap();
        let links = unique_links(raw);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].scrape_date, "d1");
        assert_eq!(links[1].url, "https://b");
        assert_eq!(links[1].scrape_date, "");
    }

    #[test]
    fn test_read_link_rows() {
        let data = b"url,date,extra\nhttps://a,2024-01-01,x\nhttps://b,2024-01-02,y\n";
        let rows = read_link_rows(data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].date, "2024-01-02");
    }

    #[test]
    fn test_read_link_rows_requires_columns() {
        assert!(read_link_rows(b"link,when\nhttps://a,2024-01-01\n").is_err());
    }

    #[test]
    fn test_read_link_rows_accepts_feed_headers() {
        let rows = read_link_rows(b"URL,Date\nhttps://a,No date available\n").unwrap();
        assert_eq!(rows[0].url, "https://a");
        assert_eq!(rows[0].date, "No date available");
    }

    const ARTICLE_HTML: &str = "<html><body><nav>Menu</nav><main><p>Listeria in  cheese</p></main></body></html>";

    async fn article_server() -> (mockito::ServerGuard, Vec<mockito::Mock>) {
        let mut server = mockito::Server::new_async().await;
        let mocks = vec![
            server
                .mock("GET", "/ok")
                .with_status(200)
                .with_header("content-type", "text/html; charset=utf-8")
                .with_body(ARTICLE_HTML)
                .create_async()
                .await,
            server
                .mock("GET", "/pdf")
                .with_status(200)
                .with_header("content-type", "application/pdf")
                .with_body("%PDF-1.4")
                .create_async()
                .await,
            server
                .mock("GET", "/gone")
                .with_status(404)
                .with_header("content-type", "text/html")
                .with_body("<p>Not found</p>")
                .create_async()
                .await,
        ];
        (server, mocks)
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_scrape_url_returns_clean_text() {
        let (server, _mocks) = article_server().await;
        let text = scrape_url(&Client::new(), &format!("{}/ok", server.url()))
            .await
            .unwrap();
        assert_eq!(text, "Listeria in cheese");
    }

    #[tokio::test]
    async fn test_scrape_url_rejects_non_html() {
        let (server, _mocks) = article_server().await;
        let err = scrape_url(&Client::new(), &format!("{}/pdf", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Non-HTML content: application/pdf");
    }

    #[tokio::test]
    async fn test_scrape_url_fails_on_error_status() {
        let (server, _mocks) = article_server().await;
        let err = scrape_url(&Client::new(), &format!("{}/gone", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_process_json_file_writes_output_and_error_log() {
        let (server, _mocks) = article_server().await;
        let dir = temp_dir("emerging_risk_news_articles_json");
        let input = dir.join("links.json");
        let links = serde_json::json!([
            {"URL": format!("{}/ok", server.url()), "Scrape Date": "2025-06-09 10:00:00"},
            {"URL": format!("{}/gone", server.url()), "Scrape Date": "2025-06-09 10:00:00"},
            {"URL": format!("{}/ok", server.url()), "Scrape Date": "2025-06-10 10:00:00"},
        ]);
        std::fs::write(&input, links.to_string()).unwrap();

        let out_dir = dir.to_string_lossy().into_owned();
        let report = process_json_file(&Client::new(), &input.to_string_lossy(), &out_dir)
            .await
            .unwrap();
        assert_eq!(report.scraped, 1);
        assert_eq!(report.failed, 1);

        let today = today_stamp();
        assert_eq!(report.output_path, dir.join(format!("links_{today}_output.json")));
        assert_eq!(report.error_path, dir.join(format!("links_{today}_error_log.json")));

        let articles: Vec<ArticleRecord> =
            serde_json::from_str(&std::fs::read_to_string(&report.output_path).unwrap()).unwrap();
        assert_eq!(articles[0].content, "Listeria in cheese");
        assert_eq!(articles[0].scrape_date, "2025-06-09 10:00:00");

        let failures: Vec<ScrapeFailure> =
            serde_json::from_str(&std::fs::read_to_string(&report.error_path).unwrap()).unwrap();
        assert!(failures[0].url.ends_with("/gone"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_process_csv_file_writes_output_and_error_csvs() {
        let (server, _mocks) = article_server().await;
        let dir = temp_dir("emerging_risk_news_articles_csv");
        let input = dir.join("feed.csv");
        let ok = format!("{}/ok", server.url());
        let pdf = format!("{}/pdf", server.url());
        std::fs::write(&input, format!("URL,Date\n{ok},2025-06-09\n{pdf},2025-06-10\n")).unwrap();

        let out_dir = dir.to_string_lossy().into_owned();
        let report = process_csv_file(&Client::new(), &input.to_string_lossy(), &out_dir)
            .await
            .unwrap();
        assert_eq!((report.scraped, report.failed), (1, 1));
        assert_eq!(report.output_path, dir.join("feed_output.csv"));

        let output = std::fs::read_to_string(&report.output_path).unwrap();
        assert_eq!(output, format!("url,date,content\n{ok},2025-06-09,Listeria in cheese\n"));
        let errors = std::fs::read_to_string(&report.error_path).unwrap();
        assert!(errors.starts_with("url,date,error\n"));
        assert!(errors.contains(&format!("{pdf},2025-06-10,Non-HTML content: application/pdf")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_process_csv_directory_without_csv_files() {
        let dir = std::env::temp_dir().join("emerging_risk_news_no_csv");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("notes.txt"), "hello").unwrap();

        let client = Client::new();
        let reports = process_csv_directory(&client, &dir.to_string_lossy())
            .await
            .unwrap();
        assert!(reports.is_empty());
        assert!(dir.join("scraped_output").is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
