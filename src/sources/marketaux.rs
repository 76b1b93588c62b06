//! Live news adapter over the MarketAux API.
//!
//! Serves only the news domain; everything else reports
//! [`FetchError::Unsupported`] so the fallback chain moves on without
//! ceremony. Construction requires the API token to be present in the
//! environment — a missing token should keep this adapter out of the
//! chain entirely rather than fail every refresh.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use anyhow::{Context, Result};

use super::{get_with_retry, MarketSource};
use crate::config::{AppConfig, MarketAuxConfig};
use crate::types::{DataDomain, DomainPayload, FetchError, NewsCategory, NewsItem, SourceKind};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Window of headlines pulled on each refresh.
const NEWS_LOOKBACK_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    data: Vec<NewsEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct NewsEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    published_at: String,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct MarketAuxSource {
    http: Client,
    base_url: String,
    api_token: String,
    limit: u32,
}

impl MarketAuxSource {
    /// Build the adapter, resolving the API token from the environment
    /// variable named in the config.
    pub fn from_config(cfg: &MarketAuxConfig) -> Result<Self> {
        let api_token = AppConfig::resolve_env(&cfg.api_token_env)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent("MANDI/0.1.0")
            .build()
            .context("Failed to build MarketAux HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_token,
            limit: cfg.limit,
        })
    }

    async fn fetch_news(&self) -> Result<DomainPayload, FetchError> {
        let published_after = (Utc::now() - ChronoDuration::days(NEWS_LOOKBACK_DAYS))
            .format("%Y-%m-%dT%H:%M")
            .to_string();
        let url = format!(
            "{}/news/all?api_token={}&countries=in&filter_entities=true&limit={}&published_after={}",
            self.base_url, self.api_token, self.limit, published_after
        );
        let resp = get_with_retry(&self.http, &url).await?;
        let body: NewsResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(DomainPayload::News(to_news_items(&body.data, Utc::now())))
    }
}

#[async_trait]
impl MarketSource for MarketAuxSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn name(&self) -> &str {
        "marketaux"
    }

    async fn fetch(&self, domain: DataDomain) -> Result<DomainPayload, FetchError> {
        match domain {
            DataDomain::News => self.fetch_news().await,
            other => Err(FetchError::Unsupported(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload mapping
// ---------------------------------------------------------------------------

/// Map wire entries to news items. Untitled entries are dropped;
/// unparseable timestamps fall back to `fallback` rather than losing
/// the headline.
fn to_news_items(entries: &[NewsEntry], fallback: DateTime<Utc>) -> Vec<NewsItem> {
    entries
        .iter()
        .filter(|e| !e.title.is_empty())
        .map(|e| {
            let published_at = DateTime::parse_from_rfc3339(&e.published_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(fallback);
            let category = NewsCategory::classify(&format!("{} {}", e.title, e.description));
            NewsItem {
                description: e.description.clone(),
                source: e.source.clone(),
                url: e.url.clone(),
                published_at,
                category,
                headline: e.title.clone(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
