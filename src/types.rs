//! Shared types for the MANDI service.
//!
//! These types form the data model used across all modules: the data
//! domains, their payload shapes, cache entries, fetch outcomes, and
//! refresh-run reports. Source, engine, and dashboard modules depend
//! on them without circular references.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Data domains
// ---------------------------------------------------------------------------

/// One independently-tracked category of market/news data.
///
/// Each domain maps to exactly one cache entry and is refreshed in the
/// fixed order given by [`DataDomain::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    SectorPerformance,
    IndexLevels,
    GainersLosers,
    MarketHeatmap,
    FiiDiiFlow,
    News,
}

impl DataDomain {
    /// All domains, in refresh order.
    pub const ALL: &'static [DataDomain] = &[
        DataDomain::SectorPerformance,
        DataDomain::IndexLevels,
        DataDomain::GainersLosers,
        DataDomain::MarketHeatmap,
        DataDomain::FiiDiiFlow,
        DataDomain::News,
    ];

    /// Stable identifier used in config, URLs, and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataDomain::SectorPerformance => "sector_performance",
            DataDomain::IndexLevels => "index_levels",
            DataDomain::GainersLosers => "gainers_losers",
            DataDomain::MarketHeatmap => "market_heatmap",
            DataDomain::FiiDiiFlow => "fii_dii_flow",
            DataDomain::News => "news",
        }
    }

    /// Human-readable label for display surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            DataDomain::SectorPerformance => "Sector Performance",
            DataDomain::IndexLevels => "Index Levels",
            DataDomain::GainersLosers => "Gainers & Losers",
            DataDomain::MarketHeatmap => "Market Heatmap",
            DataDomain::FiiDiiFlow => "FII/DII Flow",
            DataDomain::News => "News",
        }
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DataDomain {
    type Err = MandiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sector_performance" | "sectors" | "sector" => Ok(DataDomain::SectorPerformance),
            "index_levels" | "indices" | "index" => Ok(DataDomain::IndexLevels),
            "gainers_losers" | "movers" => Ok(DataDomain::GainersLosers),
            "market_heatmap" | "heatmap" => Ok(DataDomain::MarketHeatmap),
            "fii_dii_flow" | "fii_dii" | "flows" => Ok(DataDomain::FiiDiiFlow),
            "news" => Ok(DataDomain::News),
            _ => Err(MandiError::UnknownDomain(s.to_string())),
        }
    }
}

/// Which adapter tier satisfied a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Live,
    Scraped,
    Synthetic,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Live => "live",
            SourceKind::Scraped => "scraped",
            SourceKind::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a source kind from config chain entries (case-insensitive).
impl std::str::FromStr for SourceKind {
    type Err = MandiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" | "api" => Ok(SourceKind::Live),
            "scrape" | "scraped" => Ok(SourceKind::Scraped),
            "synthetic" | "fallback" => Ok(SourceKind::Synthetic),
            _ => Err(MandiError::UnknownSource(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain payloads
// ---------------------------------------------------------------------------

/// Direction of a day move, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    /// Classify a percent change into a trend.
    pub fn from_pct_change(pct: f64) -> Self {
        if pct > 0.0 {
            Trend::Up
        } else if pct < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    pub fn arrow(&self) -> char {
        match self {
            Trend::Up => '↑',
            Trend::Down => '↓',
            Trend::Flat => '→',
        }
    }
}

/// One sector index row (e.g., NIFTY Bank) with its day aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorRow {
    pub name: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub change: f64,
    pub pct_change: f64,
    pub volume: u64,
}

impl SectorRow {
    pub fn trend(&self) -> Trend {
        Trend::from_pct_change(self.pct_change)
    }
}

/// Quote for one tracked benchmark index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuote {
    pub name: String,
    pub last: f64,
    pub change: f64,
    pub pct_change: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
}

/// One row of the top-gainers or top-losers table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoverRow {
    pub symbol: String,
    pub last_price: f64,
    pub change: f64,
    pub pct_change: f64,
}

/// Top/bottom movers of the F&O universe sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Movers {
    pub gainers: Vec<MoverRow>,
    pub losers: Vec<MoverRow>,
}

impl Movers {
    pub fn len(&self) -> usize {
        self.gainers.len() + self.losers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gainers.is_empty() && self.losers.is_empty()
    }
}

/// One heatmap cell: a large-cap symbol and its day stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub symbol: String,
    pub price: f64,
    pub pct_change: f64,
    pub volume: u64,
    /// Price-derived sizing proxy; upstream feeds do not expose real
    /// free-float capitalisation.
    pub market_cap: f64,
}

/// Institutional flow snapshot for one trading day, values in ₹ crore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub date: String,
    pub fii_inflow: f64,
    pub fii_outflow: f64,
    pub dii_inflow: f64,
    pub dii_outflow: f64,
}

impl FlowSnapshot {
    pub fn fii_net(&self) -> f64 {
        self.fii_inflow - self.fii_outflow
    }

    pub fn dii_net(&self) -> f64 {
        self.dii_inflow - self.dii_outflow
    }

    /// An all-zero snapshot carries no information — upstreams emit it
    /// as a placeholder when the day's figures are not yet published.
    pub fn is_zero(&self) -> bool {
        self.fii_inflow == 0.0
            && self.fii_outflow == 0.0
            && self.dii_inflow == 0.0
            && self.dii_outflow == 0.0
    }
}

// -- News -------------------------------------------------------------------

const EARNINGS_KEYWORDS: &[&str] = &[
    "earnings", "results", "profit", "revenue", "quarter", "margin", "ebitda",
];

const IPO_KEYWORDS: &[&str] = &[
    "ipo", "listing", "public issue", "drhp", "subscription", "debut",
];

const ECONOMY_KEYWORDS: &[&str] = &[
    "rbi", "inflation", "gdp", "repo", "monetary policy", "budget", "fiscal",
    "cpi", "iip",
];

const GLOBAL_KEYWORDS: &[&str] = &[
    "fed", "federal reserve", "wall street", "global", "asia", "europe",
    "dow", "nasdaq", "crude",
];

const MARKET_KEYWORDS: &[&str] = &[
    "nifty", "sensex", "stocks", "market", "rally", "selloff", "correction",
    "f&o", "derivatives",
];

/// Coarse bucket assigned to each news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Earnings,
    Ipo,
    Economy,
    Global,
    Markets,
    Corporate,
}

impl NewsCategory {
    /// First-match keyword classification over headline + description.
    ///
    /// Global is checked before Markets so that "global markets selloff"
    /// style headlines land in Global rather than the broader bucket.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |kws: &[&str]| kws.iter().any(|kw| lower.contains(kw));

        if has(EARNINGS_KEYWORDS) {
            NewsCategory::Earnings
        } else if has(IPO_KEYWORDS) {
            NewsCategory::Ipo
        } else if has(ECONOMY_KEYWORDS) {
            NewsCategory::Economy
        } else if has(GLOBAL_KEYWORDS) {
            NewsCategory::Global
        } else if has(MARKET_KEYWORDS) {
            NewsCategory::Markets
        } else {
            NewsCategory::Corporate
        }
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsCategory::Earnings => write!(f, "Company Earnings"),
            NewsCategory::Ipo => write!(f, "IPO Analysis"),
            NewsCategory::Economy => write!(f, "Economy & Policy"),
            NewsCategory::Global => write!(f, "Global Markets"),
            NewsCategory::Markets => write!(f, "Markets"),
            NewsCategory::Corporate => write!(f, "Company News"),
        }
    }
}

/// One categorized financial news item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub description: String,
    pub category: NewsCategory,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
}

// -- Payload union ----------------------------------------------------------

/// Structured value held in the cache for one domain.
///
/// The variant always matches the domain it was fetched for; the
/// pairing is enforced by [`DomainPayload::domain`] checks at the
/// store boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DomainPayload {
    Sectors(Vec<SectorRow>),
    Indices(Vec<IndexQuote>),
    Movers(Movers),
    Heatmap(Vec<HeatmapCell>),
    Flows(FlowSnapshot),
    News(Vec<NewsItem>),
}

impl DomainPayload {
    /// The domain this payload belongs to.
    pub fn domain(&self) -> DataDomain {
        match self {
            DomainPayload::Sectors(_) => DataDomain::SectorPerformance,
            DomainPayload::Indices(_) => DataDomain::IndexLevels,
            DomainPayload::Movers(_) => DataDomain::GainersLosers,
            DomainPayload::Heatmap(_) => DataDomain::MarketHeatmap,
            DomainPayload::Flows(_) => DataDomain::FiiDiiFlow,
            DomainPayload::News(_) => DataDomain::News,
        }
    }

    /// Number of usable records carried.
    ///
    /// A flow snapshot counts as one record unless it is the all-zero
    /// placeholder, which counts as none.
    pub fn record_count(&self) -> usize {
        match self {
            DomainPayload::Sectors(rows) => rows.len(),
            DomainPayload::Indices(quotes) => quotes.len(),
            DomainPayload::Movers(m) => m.len(),
            DomainPayload::Heatmap(cells) => cells.len(),
            DomainPayload::Flows(snap) => {
                if snap.is_zero() {
                    0
                } else {
                    1
                }
            }
            DomainPayload::News(items) => items.len(),
        }
    }

    /// True when the payload carries no usable records. The resolver
    /// treats an empty success the same as a failure.
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Cache entries
// ---------------------------------------------------------------------------

/// One committed snapshot for a domain.
///
/// Entries are replaced wholesale on refresh — a reader never sees a
/// payload from one run paired with a timestamp from another. Absence
/// of an entry means "never fetched"; the payload itself is never null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub domain: DataDomain,
    pub payload: DomainPayload,
    pub fetched_at: DateTime<Utc>,
    pub source_used: SourceKind,
}

impl CacheEntry {
    /// True once the entry is older than `max_age_secs`, judged against
    /// the real clock.
    pub fn is_stale(&self, max_age_secs: u64) -> bool {
        self.is_stale_at(max_age_secs, Utc::now())
    }

    /// True once the entry is older than `max_age_secs` at the given
    /// instant. An entry aged exactly `max_age_secs` is still fresh.
    pub fn is_stale_at(&self, max_age_secs: u64, now: DateTime<Utc>) -> bool {
        now - self.fetched_at > Duration::seconds(max_age_secs as i64)
    }

    pub fn age_secs_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.fetched_at).num_seconds()
    }
}

// ---------------------------------------------------------------------------
// Fetch outcomes
// ---------------------------------------------------------------------------

/// Failure at the source-adapter boundary.
///
/// Every transport, status, and shape problem normalizes to one of
/// these variants; adapters never let raw client errors escape.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("no usable records")]
    Empty,

    #[error("domain {0} not served by this adapter")]
    Unsupported(DataDomain),
}

/// Record of one adapter attempt within a resolution pass. Transient —
/// kept only for the run report and logs.
#[derive(Debug, Clone, Serialize)]
pub struct FetchAttempt {
    pub domain: DataDomain,
    pub adapter: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { records: usize },
    Failure { reason: String },
}

/// Final result of resolving one domain through its fallback chain.
/// Construction guarantees a payload — resolution is total.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub domain: DataDomain,
    pub payload: DomainPayload,
    pub source_used: SourceKind,
    pub attempts: Vec<FetchAttempt>,
}

// ---------------------------------------------------------------------------
// Refresh runs
// ---------------------------------------------------------------------------

/// What initiated a refresh run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Scheduled,
    Manual,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTrigger::Scheduled => write!(f, "scheduled"),
            RefreshTrigger::Manual => write!(f, "manual"),
        }
    }
}

/// Per-domain outcome within one refresh run.
#[derive(Debug, Clone, Serialize)]
pub struct DomainOutcome {
    pub domain: DataDomain,
    pub source_used: SourceKind,
    pub records: usize,
    pub committed_at: DateTime<Utc>,
}

/// Report of one end-to-end refresh pass over all domains.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRun {
    pub id: Uuid,
    pub triggered_by: RefreshTrigger,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outcomes: Vec<DomainOutcome>,
}

impl RefreshRun {
    /// Which source served a given domain in this run.
    pub fn source_for(&self, domain: DataDomain) -> Option<SourceKind> {
        self.outcomes
            .iter()
            .find(|o| o.domain == domain)
            .map(|o| o.source_used)
    }

    /// How many domains fell back to synthetic data.
    pub fn synthetic_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.source_used == SourceKind::Synthetic)
            .count()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Service-level errors outside the adapter fetch boundary.
#[derive(Debug, Error)]
pub enum MandiError {
    #[error("unknown data domain: {0}")]
    UnknownDomain(String),

    #[error("unknown source kind: {0}")]
    UnknownSource(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
