use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER, USER_AGENT},
    Client, StatusCode,
};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ExtractorConfig,
    domain::{HeadingLevel, ImageAlt, LoadSpeedIndicator, PageSummary},
};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="description"]"#));
static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static IMAGE: Lazy<Selector> = Lazy::new(|| selector("img"));
static SCRIPT: Lazy<Selector> = Lazy::new(|| selector("script"));
static STYLESHEET: Lazy<Selector> = Lazy::new(|| selector(r#"link[rel="stylesheet"]"#));
static CONTENT_ROOTS: Lazy<[Selector; 3]> =
    Lazy::new(|| [selector("main"), selector("article"), selector("body")]);
static HEADINGS: Lazy<[(HeadingLevel, Selector); 6]> =
    Lazy::new(|| HeadingLevel::ALL.map(|level| (level, selector(level.tag()))));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

pub struct PageExtractor {
    client: Client,
    config: ExtractorConfig,
}

impl PageExtractor {
    pub fn new(client: Client, config: ExtractorConfig) -> Self {
        Self { client, config }
    }

    /// Fetches `raw_url` once and summarizes it. Every failure resolves to a
    /// sentinel summary with `is_simulated` set.
    pub async fn extract(&self, raw_url: &str) -> PageSummary {
        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(err) => {
                warn!(target: "extractor", error = %err, url = raw_url, "unparsable url; using restricted fallback");
                return PageSummary::restricted(raw_url);
            }
        };

        let response = match self
            .client
            .get(url.clone())
            .headers(browser_headers())
            .timeout(self.config.fetch_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(target: "extractor", error = %err, url = %url, "fetch failed; using restricted fallback");
                return PageSummary::restricted(raw_url);
            }
        };

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!(target: "extractor", status = status.as_u16(), url = %url, "scraper blocked; using restricted fallback");
            return PageSummary::restricted(raw_url);
        }
        if !status.is_success() {
            warn!(target: "extractor", status = status.as_u16(), url = %url, "unexpected status; using connection-limited fallback");
            return PageSummary::connection_limited(raw_url, status.as_u16());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "extractor", error = %err, url = %url, "failed to read body; using restricted fallback");
                return PageSummary::restricted(raw_url);
            }
        };

        let summary = summarize_html(raw_url, &url, &body, &self.config);
        debug!(
            target: "extractor",
            url = %url,
            internal = summary.internal_link_count,
            external = summary.external_link_count,
            images = summary.image_alt_tags.len(),
            content_chars = summary.content.chars().count(),
            "page summarized"
        );
        summary
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

/// Builds the summary for a successfully fetched document.
pub fn summarize_html(
    raw_url: &str,
    base: &Url,
    html: &str,
    config: &ExtractorConfig,
) -> PageSummary {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE)
        .map(|el| element_text(&el))
        .collect::<String>();
    let description = doc
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .to_string();

    let headings = HEADINGS
        .iter()
        .map(|(level, sel)| {
            let texts = doc
                .select(sel)
                .map(|el| element_text(&el).trim().to_string())
                .take(config.max_headings_per_level)
                .collect::<Vec<_>>();
            (*level, texts)
        })
        .collect::<BTreeMap<_, _>>();

    let (internal_link_count, external_link_count) = count_links(&doc, base);

    let image_alt_tags = doc
        .select(&IMAGE)
        .map(|el| ImageAlt {
            src: el.value().attr("src").unwrap_or_default().to_string(),
            alt: el.value().attr("alt").unwrap_or_default().to_string(),
        })
        .collect::<Vec<_>>();

    let content = CONTENT_ROOTS
        .iter()
        .map(|sel| doc.select(sel).map(|el| element_text(&el)).collect::<Vec<_>>())
        .find(|texts| !texts.is_empty())
        .map(|texts| collapse_content(&texts.concat(), config.content_max_length))
        .unwrap_or_default();

    let load_speed_indicator = LoadSpeedIndicator {
        image_count: doc.select(&IMAGE).count(),
        script_count: doc.select(&SCRIPT).count(),
        css_count: doc.select(&STYLESHEET).count(),
    };

    PageSummary {
        url: raw_url.to_string(),
        title,
        description,
        headings,
        internal_link_count,
        external_link_count,
        image_alt_tags,
        content,
        load_speed_indicator,
        is_simulated: false,
    }
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect()
}

/// Hostname equality only: subdomains are external, hrefs that fail to
/// resolve or carry no host are not counted.
fn count_links(doc: &Html, base: &Url) -> (usize, usize) {
    let base_host = base.host_str().unwrap_or_default();
    let mut internal = 0;
    let mut external = 0;

    for href in doc.select(&ANCHOR).filter_map(|el| el.value().attr("href")) {
        if href.is_empty() {
            continue;
        }
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        match resolved.host_str() {
            Some(host) if host == base_host => internal += 1,
            Some(host) if !host.is_empty() => external += 1,
            _ => {}
        }
    }
    (internal, external)
}

fn collapse_content(raw: &str, max_chars: usize) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}
