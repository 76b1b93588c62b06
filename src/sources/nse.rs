//! Live NSE India adapter.
//!
//! Talks to the public JSON endpoints behind nseindia.com. The
//! endpoints are unauthenticated but fussy: they expect browser-ish
//! headers and will throttle rapid-fire calls, so the per-index quote
//! loop spaces its requests out. Payload mapping is kept in pure
//! functions so it can be tested against canned responses.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use anyhow::{Context, Result};

use super::{get_with_retry, MarketSource, BROWSER_USER_AGENT, MARKET_CAP_SCALE};
use crate::config::NseConfig;
use crate::types::{
    DataDomain, DomainPayload, FetchError, FlowSnapshot, HeatmapCell, IndexQuote, MoverRow,
    Movers, SectorRow, SourceKind,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Grouped listing of all sectoral indices.
const SECTORAL_INDICES: &str = "SECTORAL INDICES";

/// Derivatives universe; the ranking pool for movers and the heatmap.
const FNO_SECURITIES: &str = "SECURITIES IN F&O";

/// Benchmark indices quoted one by one.
pub const TRACKED_INDICES: &[&str] = &[
    "NIFTY 50",
    "NIFTY BANK",
    "NIFTY IT",
    "NIFTY PHARMA",
    "NIFTY FMCG",
    "NIFTY AUTO",
    "NIFTY METAL",
    "NIFTY ENERGY",
];

/// Pause between consecutive per-index quote calls.
const INTER_CALL_DELAY: Duration = Duration::from_millis(500);

/// How many F&O rows feed the movers ranking.
const MOVERS_POOL: usize = 50;

/// How many F&O rows feed the heatmap.
const HEATMAP_POOL: usize = 30;

/// Rows kept on each side of the movers split.
const TOP_N: usize = 10;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StockIndicesResponse {
    #[serde(default)]
    data: Vec<IndexEntry>,
}

/// One row of an equity-stockIndices response. Every field defaults so
/// partial rows deserialize instead of sinking the whole payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    open: f64,
    #[serde(default)]
    day_high: f64,
    #[serde(default)]
    day_low: f64,
    #[serde(default)]
    last_price: f64,
    #[serde(default)]
    change: f64,
    #[serde(default)]
    p_change: f64,
    #[serde(default)]
    total_traded_volume: u64,
}

/// One row of the fiidiiTradeReact response. The buy/sell figures
/// arrive as either numbers or comma-grouped strings depending on the
/// day, hence the loose typing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowEntry {
    #[serde(default)]
    category: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    buy_value: serde_json::Value,
    #[serde(default)]
    sell_value: serde_json::Value,
}

fn value_as_f64(v: &serde_json::Value) -> f64 {
    match v {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.replace(',', "").trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Live adapter over the NSE India public API. Covers every domain
/// except news, which has no NSE endpoint.
pub struct NseSource {
    http: Client,
    base_url: String,
}

impl NseSource {
    pub fn from_config(cfg: &NseConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nseindia.com/"));

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build NSE HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn index_url(&self, index: &str) -> String {
        format!(
            "{}/equity-stockIndices?index={}",
            self.base_url,
            urlencoding::encode(index)
        )
    }

    async fn fetch_stock_indices(&self, index: &str) -> Result<Vec<IndexEntry>, FetchError> {
        let url = self.index_url(index);
        let resp = get_with_retry(&self.http, &url).await?;
        let body: StockIndicesResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(body.data)
    }

    async fn fetch_sectors(&self) -> Result<DomainPayload, FetchError> {
        let entries = self.fetch_stock_indices(SECTORAL_INDICES).await?;
        Ok(DomainPayload::Sectors(to_sector_rows(&entries)))
    }

    /// Quote each tracked index with one call apiece. Individual
    /// failures are logged and skipped; an all-miss day surfaces as an
    /// empty payload, which the fallback chain treats as a failure.
    async fn fetch_indices(&self) -> Result<DomainPayload, FetchError> {
        let mut quotes = Vec::with_capacity(TRACKED_INDICES.len());
        for (i, name) in TRACKED_INDICES.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_CALL_DELAY).await;
            }
            match self.fetch_stock_indices(name).await {
                Ok(entries) => match entries.first() {
                    Some(entry) => quotes.push(to_index_quote(entry, name)),
                    None => warn!(index = name, "Index quote response had no rows"),
                },
                Err(e) => warn!(index = name, error = %e, "Index quote fetch failed"),
            }
        }
        Ok(DomainPayload::Indices(quotes))
    }

    async fn fetch_flows(&self) -> Result<DomainPayload, FetchError> {
        let url = format!("{}/fiidiiTradeReact", self.base_url);
        let resp = get_with_retry(&self.http, &url).await?;
        let entries: Vec<FlowEntry> = resp
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(DomainPayload::Flows(to_flow_snapshot(&entries)))
    }
}

#[async_trait]
impl MarketSource for NseSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn name(&self) -> &str {
        "nse"
    }

    async fn fetch(&self, domain: DataDomain) -> Result<DomainPayload, FetchError> {
        match domain {
            DataDomain::SectorPerformance => self.fetch_sectors().await,
            DataDomain::IndexLevels => self.fetch_indices().await,
            DataDomain::GainersLosers => {
                let entries = self.fetch_stock_indices(FNO_SECURITIES).await?;
                Ok(DomainPayload::Movers(to_movers(&entries)))
            }
            DataDomain::MarketHeatmap => {
                let entries = self.fetch_stock_indices(FNO_SECURITIES).await?;
                Ok(DomainPayload::Heatmap(to_heatmap(&entries)))
            }
            DataDomain::FiiDiiFlow => self.fetch_flows().await,
            DataDomain::News => Err(FetchError::Unsupported(domain)),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload mapping
// ---------------------------------------------------------------------------

/// Constituent rows carry plain ticker symbols; aggregate rows echo
/// the index name, which always contains a space.
fn constituents(entries: &[IndexEntry]) -> impl Iterator<Item = &IndexEntry> {
    entries
        .iter()
        .filter(|e| !e.symbol.is_empty() && !e.symbol.contains(' '))
}

fn to_sector_rows(entries: &[IndexEntry]) -> Vec<SectorRow> {
    entries
        .iter()
        .filter(|e| !e.symbol.is_empty())
        .map(|e| SectorRow {
            name: e.symbol.clone(),
            open: e.open,
            close: e.last_price,
            high: e.day_high,
            low: e.day_low,
            change: e.change,
            pct_change: e.p_change,
            volume: e.total_traded_volume,
        })
        .collect()
}

fn to_index_quote(entry: &IndexEntry, name: &str) -> IndexQuote {
    IndexQuote {
        name: name.to_string(),
        last: entry.last_price,
        change: entry.change,
        pct_change: entry.p_change,
        open: entry.open,
        high: entry.day_high,
        low: entry.day_low,
        volume: entry.total_traded_volume,
    }
}

fn to_mover_row(entry: &IndexEntry) -> MoverRow {
    MoverRow {
        symbol: entry.symbol.clone(),
        last_price: entry.last_price,
        change: entry.change,
        pct_change: entry.p_change,
    }
}

/// Rank the F&O pool by percentage change and split it disjointly:
/// best rows as gainers, worst rows as losers (worst first), at most
/// `TOP_N` apiece. A thin pool shrinks both sides rather than listing
/// one symbol on both.
fn to_movers(entries: &[IndexEntry]) -> Movers {
    let mut pool: Vec<&IndexEntry> = constituents(entries).take(MOVERS_POOL).collect();
    pool.sort_by(|a, b| {
        b.p_change
            .partial_cmp(&a.p_change)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let side = TOP_N.min(pool.len() / 2);
    let gainers = pool.iter().take(side).map(|e| to_mover_row(e)).collect();
    let losers = pool
        .iter()
        .rev()
        .take(side)
        .map(|e| to_mover_row(e))
        .collect();
    Movers { gainers, losers }
}

fn to_heatmap(entries: &[IndexEntry]) -> Vec<HeatmapCell> {
    constituents(entries)
        .take(HEATMAP_POOL)
        .map(|e| HeatmapCell {
            symbol: e.symbol.clone(),
            price: e.last_price,
            pct_change: e.p_change,
            volume: e.total_traded_volume,
            market_cap: e.last_price * MARKET_CAP_SCALE,
        })
        .collect()
}

/// Pick the FII and DII rows out of the daily trade report. Missing
/// rows leave zeroes, which downstream freshness checks read as an
/// empty snapshot.
fn to_flow_snapshot(entries: &[FlowEntry]) -> FlowSnapshot {
    let mut snapshot = FlowSnapshot::default();
    for entry in entries {
        let category = entry.category.to_uppercase();
        if snapshot.date.is_empty() && !entry.date.is_empty() {
            snapshot.date = entry.date.clone();
        }
        if category.contains("FII") || category.contains("FPI") {
            snapshot.fii_inflow = value_as_f64(&entry.buy_value);
            snapshot.fii_outflow = value_as_f64(&entry.sell_value);
        } else if category.contains("DII") {
            snapshot.dii_inflow = value_as_f64(&entry.buy_value);
            snapshot.dii_outflow = value_as_f64(&entry.sell_value);
        }
    }
    snapshot
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
