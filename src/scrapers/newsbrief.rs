//! NewsBrief category listing scraper.
//!
//! The aggregator's dynamic listing (`/NewsBrief/dynamic`) pages through the
//! latest articles of a category. Each article sits in a
//! `div.articlebox_big` container whose first anchor links to the original
//! publisher.
//!
//! Pages are walked from 1 until one of these happens:
//! - a non-200 status
//! - a page with no article containers
//! - a page whose containers yield no links
//! - the configured page limit

use crate::models::LinkRecord;
use crate::settings::Settings;
use crate::utils::{scrape_timestamp, truncate_for_log};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

static ARTICLE_BOX: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.articlebox_big").expect("static selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// What one listing page produced.
#[derive(Debug, PartialEq)]
pub enum PageLinks {
    /// The page had no article containers at all.
    NoContainers,
    /// Containers were found; carries the extracted links (may be empty).
    Links(Vec<LinkRecord>),
}

/// Listing URL for page `page` (1-based).
pub fn page_url(settings: &Settings, page: u32) -> String {
    format!(
        "{}/NewsBrief/dynamic?language={}&edition=categoryarticles&option={}&page={}",
        settings.newsbrief_base_url.trim_end_matches('/'),
        urlencoding::encode(&settings.language),
        urlencoding::encode(&settings.category),
        page
    )
}

/// Absolute form of `href`; relative links resolve against the listing page.
fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    match Url::parse(href) {
        Ok(_) => Some(href.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(href).ok().map(String::from),
        Err(_) => None,
    }
}

/// Extract article links from one listing page fetched from `base`.
///
/// Containers without a usable anchor are logged and skipped.
pub fn extract_links(html: &str, base: &Url, scrape_date: &str) -> PageLinks {
    let document = Html::parse_document(html);
    let containers: Vec<_> = document.select(&ARTICLE_BOX).collect();
    if containers.is_empty() {
        return PageLinks::NoContainers;
    }

    let mut links = Vec::new();
    for container in containers {
        match container
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_href(base, href))
        {
            Some(url) => links.push(LinkRecord {
                url,
                scrape_date: scrape_date.to_string(),
            }),
            None => warn!("No <a> tag found in one of the article containers"),
        }
    }
    PageLinks::Links(links)
}

/// Walk the category listing until it runs dry, collecting every link.
#[instrument(level = "info", skip_all, fields(category = %settings.category))]
pub async fn scrape_all_pages_until_empty(
    client: &Client,
    settings: &Settings,
) -> Result<Vec<LinkRecord>, Box<dyn Error>> {
    let mut all_links = Vec::new();

    for page in 1..=settings.max_pages {
        let url = page_url(settings, page);
        info!(page, %url, "Scraping listing page");

        let resp = client.get(&url).send().await?;
        if resp.status() != StatusCode::OK {
            info!(page, status = %resp.status(), "Stopped at non-200 page");
            break;
        }
        let base = Url::parse(&url)?;
        let html = resp.text().await?;
        debug!(page, snippet = %truncate_for_log(&html, 500), "Listing page snippet");

        match extract_links(&html, &base, &scrape_timestamp()) {
            PageLinks::NoContainers => {
                info!(page, "No article containers found, stopping");
                break;
            }
            PageLinks::Links(links) if links.is_empty() => {
                info!(page, "No links extracted, stopping");
                break;
            }
            PageLinks::Links(links) => {
                info!(page, count = links.len(), "Extracted links");
                all_links.extend(links);
            }
        }
    }

    info!(count = all_links.len(), "Listing scrape finished");
    Ok(all_links)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="articlebox_big">
            <a href="https://news.example.com/salmonella-outbreak">Salmonella outbreak</a>
            <a href="https://news.example.com/other">Other</a>
          </div>
          <div class="articlebox_big"><span>no link here</span></div>
          <div class="articlebox_big">
            <p><a href=" https://news.example.com/recall ">Recall</a></p>
          </div>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://emm.newsbrief.eu/NewsBrief/dynamic?page=1").unwrap()
    }

    fn listing_page(href: &str) -> String {
        format!(r#"<html><body><div class="articlebox_big"><a href="{href}">x</a></div></body></html>"#)
    }

    fn page_mock(server: &mut mockito::ServerGuard, page: u32, status: usize, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/NewsBrief/dynamic")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), page.to_string()))
            .with_status(status)
            .with_header("content-type", "text/html")
            .with_body(body)
    }

    fn mock_settings(server: &mockito::ServerGuard) -> Settings {
        Settings {
            newsbrief_base_url: server.url(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_scrape_stops_at_error_page() {
        let mut server = mockito::Server::new_async().await;
        let _page1 = page_mock(&mut server, 1, 200, &listing_page("https://news.example.com/a")).create_async().await;
        let _page2 = page_mock(&mut server, 2, 500, "oops").create_async().await;
        let page3 = page_mock(&mut server, 3, 200, &listing_page("https://news.example.com/c"))
            .expect(0)
            .create_async()
            .await;

        let links = scrape_all_pages_until_empty(&Client::new(), &mock_settings(&server))
            .await
            .unwrap();
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://news.example.com/a"]);
        page3.assert_async().await;
    }

    #[tokio::test]
    async fn test_scrape_stops_at_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let _page1 = page_mock(&mut server, 1, 200, &listing_page("https://news.example.com/a")).create_async().await;
        let _page2 = page_mock(&mut server, 2, 200, &listing_page("/NewsBrief/item/2.html")).create_async().await;
        let _page3 = page_mock(&mut server, 3, 200, "<html><body>No more articles</body></html>").create_async().await;
        let page4 = page_mock(&mut server, 4, 200, &listing_page("https://news.example.com/d"))
            .expect(0)
            .create_async()
            .await;

        let settings = mock_settings(&server);
        let links = scrape_all_pages_until_empty(&Client::new(), &settings).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].url, format!("{}/NewsBrief/item/2.html", server.url()));
        page4.assert_async().await;
    }

    #[tokio::test]
    async fn test_scrape_respects_page_limit() {
        let mut server = mockito::Server::new_async().await;
        let page1 = page_mock(&mut server, 1, 200, &listing_page("https://news.example.com/a")).create_async().await;
        let page2 = page_mock(&mut server, 2, 200, &listing_page("https://news.example.com/b"))
            .expect(0)
            .create_async()
            .await;

        let settings = Settings {
            max_pages: 1,
            ..mock_settings(&server)
        };
        let links = scrape_all_pages_until_empty(&Client::new(), &settings).await.unwrap();
        assert_eq!(links.len(), 1);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[test]
    fn test_page_url() {
        let url = page_url(&Settings::default(), 3);
        assert_eq!(
            url,
            "https://emm.newsbrief.eu/NewsBrief/dynamic?language=en&edition=categoryarticles&option=FoodSafety&page=3"
        );
    }

    #[test]
    fn test_extract_links_takes_first_anchor_per_container() {
        let PageLinks::Links(links) = extract_links(PAGE, &base(), "2025-06-09 10:00:00") else {
            panic!("expected links");
        };
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://news.example.com/salmonella-outbreak",
                "https://news.example.com/recall"
            ]
        );
        assert!(links.iter().all(|l| l.scrape_date == "2025-06-09 10:00:00"));
    }

    #[test]
    fn test_extract_links_without_containers() {
        assert_eq!(
            extract_links("<html><body><a href='x'>x</a></body></html>", &base(), "d"),
            PageLinks::NoContainers
        );
    }

    #[test]
    fn test_extract_links_containers_without_anchors() {
        let html = r#"<div class="articlebox_big">empty</div>"#;
        assert_eq!(extract_links(html, &base(), "d"), PageLinks::Links(vec![]));
    }

    #[test]
    fn test_extract_links_resolves_relative_hrefs() {
        let html = r#"<div class="articlebox_big"><a href="/NewsBrief/clusteredition/en/123.html">x</a></div>"#;
        let PageLinks::Links(links) = extract_links(html, &base(), "d") else {
            panic!("expected links");
        };
        assert_eq!(links[0].url, "https://emm.newsbrief.eu/NewsBrief/clusteredition/en/123.html");
    }
}
