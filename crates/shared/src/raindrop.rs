use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use url::Url;

use crate::collaborators::ArticleCollector;
use crate::extractor::{ArticleContent, ContentExtractor};
use crate::models::Article;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    pub link: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: String,
}

#[derive(Debug, Deserialize)]
struct RaindropResponse {
    items: Vec<Bookmark>,
}

/// Collects articles from Raindrop.io bookmarks matching the search terms
pub struct RaindropCollector {
    client: Client,
    api_token: String,
    tag: Option<String>,
    extractor: ContentExtractor,
}

impl RaindropCollector {
    pub fn new(api_token: String, tag: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_token,
            tag,
            extractor: ContentExtractor::new()?,
        })
    }

    pub async fn fetch_bookmarks(&self, term: &str, since: DateTime<Utc>) -> Result<Vec<Bookmark>> {
        let mut all_bookmarks = Vec::new();
        let mut page = 0;
        let per_page = 50;

        let search_query = format!("{} created:>{}", term, since.format("%Y-%m-%d"));

        loop {
            let url = format!(
                "https://api.raindrop.io/rest/v1/raindrops/0?perpage={}&page={}&search={}",
                per_page,
                page,
                urlencoding::encode(&search_query)
            );

            let response = self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.api_token))
                .send()
                .await
                .context("Failed to fetch bookmarks from Raindrop.io")?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("unknown error"));
                anyhow::bail!("Raindrop API returned error: {} - {}", status, error_text);
            }

            let raindrop_response = response
                .json::<RaindropResponse>()
                .await
                .context("Failed to parse Raindrop API response")?;

            if raindrop_response.items.is_empty() {
                break;
            }

            all_bookmarks.extend(raindrop_response.items);
            page += 1;

            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        }

        Ok(all_bookmarks)
    }
}

#[async_trait]
impl ArticleCollector for RaindropCollector {
    async fn collect(&self, search_terms: &[String], max_age_days: i64) -> Result<Vec<Article>> {
        let since = Utc::now() - Duration::days(max_age_days);

        let mut seen = HashSet::new();
        let mut bookmarks = Vec::new();
        for term in search_terms {
            let found = self
                .fetch_bookmarks(term, since)
                .await
                .with_context(|| format!("Search for '{}' failed", term))?;
            tracing::debug!(term = %term, found = found.len(), "raindrop search");
            bookmarks.extend(found.into_iter().filter(|b| seen.insert(b.link.clone())));
        }

        // Filter by tag (case-insensitive)
        if let Some(tag) = &self.tag {
            let tag_lower = tag.to_lowercase();
            bookmarks.retain(|bookmark| bookmark.tags.iter().any(|t| t.to_lowercase() == tag_lower));
        }

        tracing::info!(bookmarks = bookmarks.len(), "fetching article content");
        let urls = bookmarks.iter().map(|b| b.link.clone()).collect();
        let content_map: HashMap<String, ArticleContent> = self
            .extractor
            .fetch_articles_parallel(urls)
            .await
            .into_iter()
            .filter_map(|(url, content)| content.map(|c| (url, c)))
            .collect();

        Ok(bookmarks
            .into_iter()
            .map(|bookmark| {
                let content = content_map.get(&bookmark.link);
                bookmark_to_article(bookmark, content)
            })
            .collect())
    }
}

/// Extracted text wins over the bookmark excerpt, and the page's own publish
/// date over the bookmark's creation time.
pub fn bookmark_to_article(bookmark: Bookmark, content: Option<&ArticleContent>) -> Article {
    let source = bookmark
        .domain
        .clone()
        .filter(|d| !d.is_empty())
        .or_else(|| {
            Url::parse(&bookmark.link)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        })
        .unwrap_or_default();

    let body_text = content
        .map(|c| c.text.clone())
        .or(bookmark.excerpt)
        .unwrap_or_default();

    let published_at = content.and_then(|c| c.published_date).or_else(|| {
        DateTime::parse_from_rfc3339(&bookmark.created)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    });

    let mut article = Article::new(bookmark.title, source, body_text).with_url(bookmark.link);
    article.published_at = published_at;
    article
}
