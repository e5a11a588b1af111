use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Readable text of a fetched article page
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleContent {
    pub text: String,
    pub published_date: Option<DateTime<Utc>>,
}

pub struct ContentExtractor {
    client: Client,
    semaphore: Arc<Semaphore>,
}

impl ContentExtractor {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; PodcastGenerator/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        let semaphore = Arc::new(Semaphore::new(10));

        Ok(Self { client, semaphore })
    }

    pub async fn fetch_article_content(&self, url: &str) -> Result<Option<ArticleContent>> {
        let _permit = self.semaphore.acquire().await?;

        for attempt in 0..3 {
            match self.try_fetch_article(url).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if attempt == 2 {
                        tracing::warn!(url, error = %e, "failed to fetch article");
                        return Ok(None);
                    }
                    let backoff = std::time::Duration::from_millis(500 * (2_u64.pow(attempt)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Ok(None)
    }

    async fn try_fetch_article(&self, url: &str) -> Result<Option<ArticleContent>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if status == 401 || status == 403 || status == 404 {
            return Ok(None);
        }

        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let html = response.text().await.context("Failed to read response body")?;

        Ok(extract_content(&html))
    }

    pub async fn fetch_articles_parallel(
        &self,
        urls: Vec<String>,
    ) -> Vec<(String, Option<ArticleContent>)> {
        stream::iter(urls)
            .map(|url| async move {
                let content = self.fetch_article_content(&url).await.ok().flatten();
                (url, content)
            })
            .buffer_unordered(10)
            .collect()
            .await
    }
}

/// Plain text plus publish date, or None when the page has too little text to use
pub fn extract_content(html: &str) -> Option<ArticleContent> {
    let text = html2text::from_read(html.as_bytes(), 100);

    if text.trim().is_empty() || text.len() < 100 {
        return None;
    }

    Some(ArticleContent {
        text,
        published_date: parse_published_date(html),
    })
}

/// Publish date from the usual article meta tags or the first `<time datetime>`
pub fn parse_published_date(html: &str) -> Option<DateTime<Utc>> {
    let document = Html::parse_document(html);

    let candidates = [
        ("meta[property=\"article:published_time\"]", "content"),
        ("meta[name=\"pubdate\"]", "content"),
        ("meta[name=\"date\"]", "content"),
        ("meta[itemprop=\"datePublished\"]", "content"),
        ("time[datetime]", "datetime"),
    ];

    candidates.iter().find_map(|(css, attr)| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(parse_date)
    })
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
