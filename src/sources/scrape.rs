//! Middle-tier scraping adapter.
//!
//! Pulls public Moneycontrol pages and extracts figures with anchored
//! text heuristics: strip the markup, locate a known name, read the
//! numbers that follow it. This is deliberately best-effort — a page
//! redesign degrades it to fewer rows, and an all-miss page maps to
//! [`FetchError::Empty`] so the chain falls through to synthetic data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};

use super::synthetic::{FNO_SYMBOLS, INDEX_BASES, SECTOR_BASES};
use super::{get_with_retry, MarketSource, BROWSER_USER_AGENT, MARKET_CAP_SCALE};
use crate::config::ScrapeConfig;
use crate::market;
use crate::types::{
    DataDomain, DomainPayload, FetchError, FlowSnapshot, HeatmapCell, IndexQuote, MoverRow,
    Movers, NewsCategory, NewsItem, SectorRow, SourceKind,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const SITE_ROOT: &str = "https://www.moneycontrol.com";
const INDICES_URL: &str = "https://www.moneycontrol.com/markets/indian-indices/";
const GAINERS_URL: &str = "https://www.moneycontrol.com/stocks/marketstats/nsegainer/index.php";
const LOSERS_URL: &str = "https://www.moneycontrol.com/stocks/marketstats/nseloser/index.php";
const MOST_ACTIVE_URL: &str =
    "https://www.moneycontrol.com/stocks/marketstats/nsemact1/index.php";
const FLOWS_URL: &str =
    "https://www.moneycontrol.com/stocks/marketstats/fii_dii_activity/index.php";
const NEWS_URL: &str = "https://www.moneycontrol.com/news/business/markets/";

/// Characters of stripped text inspected after an anchor match.
const ANCHOR_WINDOW: usize = 160;

/// Rows kept on each side of the movers split.
const TOP_N: usize = 10;

/// Link texts shorter than this are navigation, not headlines.
const MIN_HEADLINE_LEN: usize = 40;

const MAX_NEWS_ITEMS: usize = 12;

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct ScrapeSource {
    http: Client,
}

impl ScrapeSource {
    pub fn from_config(cfg: &ScrapeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .context("Failed to build scrape HTTP client")?;
        Ok(Self { http })
    }

    async fn page(&self, url: &str) -> Result<String, FetchError> {
        let resp = get_with_retry(&self.http, url).await?;
        resp.text().await.map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MarketSource for ScrapeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Scraped
    }

    fn name(&self) -> &str {
        "scrape"
    }

    async fn fetch(&self, domain: DataDomain) -> Result<DomainPayload, FetchError> {
        match domain {
            DataDomain::SectorPerformance => {
                let text = strip_tags(&self.page(INDICES_URL).await?);
                let rows = parse_sector_rows(&text);
                if rows.is_empty() {
                    return Err(FetchError::Empty);
                }
                Ok(DomainPayload::Sectors(rows))
            }
            DataDomain::IndexLevels => {
                let text = strip_tags(&self.page(INDICES_URL).await?);
                let quotes = parse_index_quotes(&text);
                if quotes.is_empty() {
                    return Err(FetchError::Empty);
                }
                Ok(DomainPayload::Indices(quotes))
            }
            DataDomain::GainersLosers => {
                let gainers = strip_tags(&self.page(GAINERS_URL).await?);
                let losers = strip_tags(&self.page(LOSERS_URL).await?);
                let movers = parse_movers(&gainers, &losers);
                if movers.is_empty() {
                    return Err(FetchError::Empty);
                }
                Ok(DomainPayload::Movers(movers))
            }
            DataDomain::MarketHeatmap => {
                let text = strip_tags(&self.page(MOST_ACTIVE_URL).await?);
                let cells = parse_heatmap(&text);
                if cells.is_empty() {
                    return Err(FetchError::Empty);
                }
                Ok(DomainPayload::Heatmap(cells))
            }
            DataDomain::FiiDiiFlow => {
                let text = strip_tags(&self.page(FLOWS_URL).await?);
                let date = market::now_ist().format("%d-%b-%Y").to_string();
                let snapshot = parse_flow_snapshot(&text, date);
                if snapshot.is_zero() {
                    return Err(FetchError::Empty);
                }
                Ok(DomainPayload::Flows(snapshot))
            }
            DataDomain::News => {
                let html = self.page(NEWS_URL).await?;
                let items = to_scraped_news(&extract_links(&html), Utc::now());
                if items.is_empty() {
                    return Err(FetchError::Empty);
                }
                Ok(DomainPayload::News(items))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// HTML text extraction
// ---------------------------------------------------------------------------

/// Case-insensitive substring search over ASCII needles. Returns a
/// byte offset that is always a char boundary because the matched
/// bytes are ASCII.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() || from > h.len() - n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Drop everything between `open` and `close`, inclusive. Unterminated
/// blocks lose the tail of the document.
fn strip_block(html: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = find_ci(html, open, pos) {
        out.push_str(&html[pos..start]);
        match find_ci(html, close, start) {
            Some(end) => pos = end + close.len(),
            None => return out,
        }
    }
    out.push_str(&html[pos..]);
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Reduce a document to its visible text: script and style bodies go
/// first, then every tag becomes a space, then entities decode.
fn strip_tags(html: &str) -> String {
    let html = strip_block(html, "<script", "</script>");
    let html = strip_block(&html, "<style", "</style>");

    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    decode_entities(&out)
}

/// Parse one whitespace token as a figure: comma grouping and a
/// trailing percent sign are tolerated, anything else numeric-looking
/// is not (so dates like `22-Aug-2025` never slip through).
fn parse_number(token: &str) -> Option<f64> {
    let cleaned = token.trim_end_matches('%').replace(',', "");
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let shape_ok = cleaned
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+')));
    if !shape_ok {
        return None;
    }
    cleaned.parse().ok()
}

fn extract_numbers(text: &str) -> Vec<f64> {
    text.split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter_map(parse_number)
        .collect()
}

/// Find `anchor` as a whole word and return the first `count` numbers
/// in the window after it. Word boundaries matter: `NIFTY 50` must not
/// match inside `NIFTY 500`, nor `LT` inside `RESULT`.
fn numbers_near(text: &str, anchor: &str, count: usize) -> Option<Vec<f64>> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = find_ci(text, anchor, from) {
        let end = pos + anchor.len();
        let before_ok = pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric();
        let after_ok = bytes.get(end).map_or(true, |b| !b.is_ascii_alphanumeric());
        if before_ok && after_ok {
            let window: String = text[end..].chars().take(ANCHOR_WINDOW).collect();
            let numbers = extract_numbers(&window);
            if numbers.len() >= count {
                return Some(numbers.into_iter().take(count).collect());
            }
            return None;
        }
        from = pos + 1;
    }
    None
}

/// Collect `(href, text)` pairs for every `<a>` element, markup inside
/// the element stripped and whitespace collapsed.
fn extract_links(html: &str) -> Vec<(String, String)> {
    let mut links = Vec::new();
    let mut from = 0;
    while let Some(open) = find_ci(html, "<a", from) {
        // Require `<a>` itself, not `<abbr>` or `<article>`.
        let follows = html.as_bytes().get(open + 2);
        if !matches!(follows, Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')) {
            from = open + 2;
            continue;
        }
        let Some(tag_end) = find_ci(html, ">", open) else { break };
        let Some(close) = find_ci(html, "</a>", tag_end) else { break };
        let tag = &html[open..tag_end];
        let inner = &html[tag_end + 1..close];
        let text = strip_tags(inner)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let href = attr_value(tag, "href").unwrap_or_default();
        links.push((href, text));
        from = close + 4;
    }
    links
}

fn attr_value(tag: &str, name: &str) -> Option<String> {
    let pos = find_ci(tag, name, 0)?;
    let rest = tag[pos + name.len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

// ---------------------------------------------------------------------------
// Payload extraction
// ---------------------------------------------------------------------------

/// Anchored rows read `[last, change, pct]`. Open is reconstructed
/// from the change; listing pages do not publish OHLC or turnover.
fn parse_sector_rows(text: &str) -> Vec<SectorRow> {
    SECTOR_BASES
        .iter()
        .filter_map(|&(name, _)| {
            let nums = numbers_near(text, name, 3)?;
            let (close, change, pct) = (nums[0], nums[1], nums[2]);
            let open = close - change;
            Some(SectorRow {
                name: name.to_string(),
                open,
                close,
                high: close.max(open),
                low: close.min(open),
                change,
                pct_change: pct,
                volume: 0,
            })
        })
        .collect()
}

fn parse_index_quotes(text: &str) -> Vec<IndexQuote> {
    INDEX_BASES
        .iter()
        .filter_map(|&(name, _)| {
            let nums = numbers_near(text, name, 3)?;
            let (last, change, pct) = (nums[0], nums[1], nums[2]);
            let open = last - change;
            Some(IndexQuote {
                name: name.to_string(),
                last,
                change,
                pct_change: pct,
                open,
                high: last.max(open),
                low: last.min(open),
                volume: 0,
            })
        })
        .collect()
}

fn parse_mover_rows(text: &str) -> Vec<MoverRow> {
    FNO_SYMBOLS
        .iter()
        .filter_map(|&(symbol, _)| {
            let nums = numbers_near(text, symbol, 3)?;
            Some(MoverRow {
                symbol: symbol.to_string(),
                last_price: nums[0],
                change: nums[1],
                pct_change: nums[2],
            })
        })
        .collect()
}

fn parse_movers(gainers_text: &str, losers_text: &str) -> Movers {
    let mut gainers = parse_mover_rows(gainers_text);
    gainers.sort_by(|a, b| {
        b.pct_change
            .partial_cmp(&a.pct_change)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    gainers.truncate(TOP_N);

    let mut losers = parse_mover_rows(losers_text);
    losers.sort_by(|a, b| {
        a.pct_change
            .partial_cmp(&b.pct_change)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    losers.truncate(TOP_N);

    Movers { gainers, losers }
}

fn parse_heatmap(text: &str) -> Vec<HeatmapCell> {
    FNO_SYMBOLS
        .iter()
        .filter_map(|&(symbol, _)| {
            let nums = numbers_near(text, symbol, 3)?;
            Some(HeatmapCell {
                symbol: symbol.to_string(),
                price: nums[0],
                pct_change: nums[2],
                volume: 0,
                market_cap: nums[0] * MARKET_CAP_SCALE,
            })
        })
        .collect()
}

fn parse_flow_snapshot(text: &str, date: String) -> FlowSnapshot {
    let mut snapshot = FlowSnapshot {
        date,
        ..FlowSnapshot::default()
    };
    if let Some(nums) = numbers_near(text, "FII", 2) {
        snapshot.fii_inflow = nums[0];
        snapshot.fii_outflow = nums[1];
    }
    if let Some(nums) = numbers_near(text, "DII", 2) {
        snapshot.dii_inflow = nums[0];
        snapshot.dii_outflow = nums[1];
    }
    snapshot
}

/// Turn harvested links into headlines: long texts only, first
/// occurrence wins, relative links join the site root.
fn to_scraped_news(links: &[(String, String)], published_at: DateTime<Utc>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for (href, text) in links {
        if text.len() < MIN_HEADLINE_LEN || !seen.insert(text.clone()) {
            continue;
        }
        let url = if href.starts_with("http") {
            href.clone()
        } else if href.starts_with('/') {
            format!("{SITE_ROOT}{href}")
        } else {
            NEWS_URL.to_string()
        };
        items.push(NewsItem {
            description: String::new(),
            source: "moneycontrol".to_string(),
            url,
            published_at,
            category: NewsCategory::classify(text),
            headline: text.clone(),
        });
        if items.len() >= MAX_NEWS_ITEMS {
            break;
        }
    }
    items
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
