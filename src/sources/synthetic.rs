//! Deterministic synthetic data generator — the terminal fallback.
//!
//! Every payload is derived from a PRNG seeded by (domain, IST
//! calendar date), so repeated calls within one day reproduce
//! identical values: no flickering fake numbers between refreshes, and
//! tests can pin exact outputs. The generator is pure apart from
//! reading the current date; [`SyntheticSource::generate_for_date`]
//! takes the date explicitly.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{MarketSource, MARKET_CAP_SCALE};
use crate::market;
use crate::types::{
    DataDomain, DomainPayload, FetchError, FlowSnapshot, HeatmapCell, IndexQuote, MoverRow,
    Movers, NewsCategory, NewsItem, SectorRow, SourceKind,
};

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Sector indices with plausible base levels to perturb.
pub const SECTOR_BASES: &[(&str, f64)] = &[
    ("NIFTY Bank", 51_400.0),
    ("NIFTY IT", 43_900.0),
    ("NIFTY Pharma", 21_800.0),
    ("NIFTY FMCG", 62_300.0),
    ("NIFTY Auto", 25_600.0),
    ("NIFTY Metal", 9_400.0),
    ("NIFTY Energy", 42_100.0),
    ("NIFTY Realty", 1_080.0),
    ("NIFTY PSU Bank", 7_300.0),
    ("NIFTY Media", 2_150.0),
];

/// Tracked benchmark indices with base levels.
pub const INDEX_BASES: &[(&str, f64)] = &[
    ("NIFTY 50", 24_800.0),
    ("NIFTY BANK", 51_400.0),
    ("NIFTY IT", 43_900.0),
    ("NIFTY PHARMA", 21_800.0),
    ("NIFTY FMCG", 62_300.0),
    ("NIFTY AUTO", 25_600.0),
    ("NIFTY METAL", 9_400.0),
    ("NIFTY ENERGY", 42_100.0),
];

/// Large-cap F&O names with base prices. Thirty entries — the heatmap
/// uses them all, movers rank them.
pub const FNO_SYMBOLS: &[(&str, f64)] = &[
    ("RELIANCE", 2_960.0),
    ("TCS", 4_150.0),
    ("HDFCBANK", 1_680.0),
    ("ICICIBANK", 1_190.0),
    ("INFY", 1_850.0),
    ("SBIN", 820.0),
    ("BHARTIARTL", 1_540.0),
    ("ITC", 465.0),
    ("LT", 3_720.0),
    ("KOTAKBANK", 1_790.0),
    ("AXISBANK", 1_180.0),
    ("HCLTECH", 1_620.0),
    ("MARUTI", 12_400.0),
    ("ASIANPAINT", 2_950.0),
    ("WIPRO", 520.0),
    ("SUNPHARMA", 1_720.0),
    ("TITAN", 3_480.0),
    ("TATAMOTORS", 1_050.0),
    ("TATASTEEL", 165.0),
    ("NTPC", 395.0),
    ("POWERGRID", 335.0),
    ("ULTRACEMCO", 11_200.0),
    ("BAJFINANCE", 6_900.0),
    ("M&M", 2_850.0),
    ("ONGC", 290.0),
    ("COALINDIA", 505.0),
    ("ADANIENT", 3_150.0),
    ("JSWSTEEL", 940.0),
    ("HINDALCO", 680.0),
    ("GRASIM", 2_680.0),
];

/// Headline templates; `{sym}` is replaced with a random F&O symbol.
/// Worded so the keyword classifier spreads them across categories.
const HEADLINE_TEMPLATES: &[&str] = &[
    "{sym} quarterly results beat street estimates",
    "{sym} posts steady revenue growth",
    "Subscription opens for {sym} unit public issue",
    "Street eyes listing pop for {sym} spinoff",
    "RBI commentary keeps rate-sensitive names in focus",
    "Cooler inflation print lifts sentiment on the desks",
    "Wall Street strength sets up a firm start",
    "Crude slips as supply worries ease",
    "Nifty ends higher amid broad-based buying",
    "Midcap stocks extend their winning streak",
    "{sym} board approves capacity expansion",
    "{sym} announces leadership change",
];

const NEWS_ITEMS_PER_DAY: usize = 10;
const MOVERS_EACH_SIDE: usize = 10;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// The always-available synthetic adapter. Stateless; every call
/// reseeds from the domain and date.
#[derive(Debug, Default)]
pub struct SyntheticSource;

impl SyntheticSource {
    pub fn new() -> Self {
        SyntheticSource
    }

    /// Derive the day seed for a domain. Explicit so tests (and anyone
    /// reading a payload) can reproduce the exact stream.
    pub fn seed_for(domain: DataDomain, date: NaiveDate) -> u64 {
        let mut hasher = DefaultHasher::new();
        domain.as_str().hash(&mut hasher);
        date.format("%Y-%m-%d").to_string().hash(&mut hasher);
        hasher.finish()
    }

    /// Generate the payload for a domain using today's IST date.
    pub fn generate(&self, domain: DataDomain) -> DomainPayload {
        self.generate_for_date(domain, market::now_ist().date_naive())
    }

    /// Generate the payload for a domain on an explicit date.
    pub fn generate_for_date(&self, domain: DataDomain, date: NaiveDate) -> DomainPayload {
        let mut rng = StdRng::seed_from_u64(Self::seed_for(domain, date));
        match domain {
            DataDomain::SectorPerformance => DomainPayload::Sectors(gen_sectors(&mut rng)),
            DataDomain::IndexLevels => DomainPayload::Indices(gen_indices(&mut rng)),
            DataDomain::GainersLosers => DomainPayload::Movers(gen_movers(&mut rng)),
            DataDomain::MarketHeatmap => DomainPayload::Heatmap(gen_heatmap(&mut rng)),
            DataDomain::FiiDiiFlow => DomainPayload::Flows(gen_flows(&mut rng, date)),
            DataDomain::News => DomainPayload::News(gen_news(&mut rng, date)),
        }
    }
}

#[async_trait]
impl MarketSource for SyntheticSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, domain: DataDomain) -> Result<DomainPayload, FetchError> {
        Ok(self.generate(domain))
    }
}

// ---------------------------------------------------------------------------
// Per-domain generation
// ---------------------------------------------------------------------------

/// Perturb a base level into (open, close, high, low, change, pct).
fn day_move(rng: &mut StdRng, base: f64) -> (f64, f64, f64, f64, f64, f64) {
    let pct = rng.gen_range(-2.5..2.5);
    let close = base * (1.0 + pct / 100.0);
    let open = base * (1.0 + rng.gen_range(-0.6..0.6) / 100.0);
    let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.45) / 100.0);
    let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.45) / 100.0);
    let change = close - base;
    (
        round2(open),
        round2(close),
        round2(high),
        round2(low),
        round2(change),
        round2(pct),
    )
}

fn gen_sectors(rng: &mut StdRng) -> Vec<SectorRow> {
    SECTOR_BASES
        .iter()
        .map(|&(name, base)| {
            let (open, close, high, low, change, pct_change) = day_move(rng, base);
            SectorRow {
                name: name.to_string(),
                open,
                close,
                high,
                low,
                change,
                pct_change,
                volume: rng.gen_range(40_000_000..420_000_000),
            }
        })
        .collect()
}

fn gen_indices(rng: &mut StdRng) -> Vec<IndexQuote> {
    INDEX_BASES
        .iter()
        .map(|&(name, base)| {
            let (open, close, high, low, change, pct_change) = day_move(rng, base);
            IndexQuote {
                name: name.to_string(),
                last: close,
                change,
                pct_change,
                open,
                high,
                low,
                volume: rng.gen_range(80_000_000..600_000_000),
            }
        })
        .collect()
}

fn gen_movers(rng: &mut StdRng) -> Movers {
    let mut rows: Vec<MoverRow> = FNO_SYMBOLS
        .iter()
        .map(|&(symbol, base)| {
            let pct = rng.gen_range(-4.0..4.0);
            let last_price = round2(base * (1.0 + pct / 100.0));
            MoverRow {
                symbol: symbol.to_string(),
                last_price,
                change: round2(base * pct / 100.0),
                pct_change: round2(pct),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.pct_change
            .partial_cmp(&a.pct_change)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let gainers = rows.iter().take(MOVERS_EACH_SIDE).cloned().collect();
    let losers = rows
        .iter()
        .rev()
        .take(MOVERS_EACH_SIDE)
        .cloned()
        .collect();
    Movers { gainers, losers }
}

fn gen_heatmap(rng: &mut StdRng) -> Vec<HeatmapCell> {
    FNO_SYMBOLS
        .iter()
        .map(|&(symbol, base)| {
            let pct = rng.gen_range(-3.5..3.5);
            let price = round2(base * (1.0 + pct / 100.0));
            HeatmapCell {
                symbol: symbol.to_string(),
                price,
                pct_change: round2(pct),
                volume: rng.gen_range(500_000..60_000_000),
                market_cap: round2(price * MARKET_CAP_SCALE),
            }
        })
        .collect()
}

fn gen_flows(rng: &mut StdRng, date: NaiveDate) -> FlowSnapshot {
    FlowSnapshot {
        date: date.format("%d-%b-%Y").to_string(),
        fii_inflow: round2(rng.gen_range(6_000.0..22_000.0)),
        fii_outflow: round2(rng.gen_range(6_000.0..22_000.0)),
        dii_inflow: round2(rng.gen_range(5_000.0..18_000.0)),
        dii_outflow: round2(rng.gen_range(5_000.0..18_000.0)),
    }
}

fn gen_news(rng: &mut StdRng, date: NaiveDate) -> Vec<NewsItem> {
    (0..NEWS_ITEMS_PER_DAY)
        .map(|i| {
            let template = HEADLINE_TEMPLATES[rng.gen_range(0..HEADLINE_TEMPLATES.len())];
            let (symbol, _) = FNO_SYMBOLS[rng.gen_range(0..FNO_SYMBOLS.len())];
            let headline = template.replace("{sym}", symbol);
            let category = NewsCategory::classify(&headline);
            NewsItem {
                description: format!("Synthetic briefing: {headline}."),
                source: "Synthetic Wire".to_string(),
                url: format!("synthetic://news/{date}/{i}"),
                published_at: published_at_for(rng, date),
                category,
                headline,
            }
        })
        .collect()
}

/// A deterministic intraday IST timestamp on the given date.
fn published_at_for(rng: &mut StdRng, date: NaiveDate) -> DateTime<Utc> {
    let hour = rng.gen_range(7..21);
    let minute = rng.gen_range(0..60);
    date.and_hms_opt(hour, minute, 0)
        .and_then(|naive| Kolkata.from_local_datetime(&naive).single())
        .map(|ist| ist.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
