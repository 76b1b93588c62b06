//! Mock market source for integration testing.
//!
//! Provides a deterministic `MarketSource` implementation whose
//! per-domain behaviour is scripted from test code — known record
//! counts, empty payloads, forced failures — all in-memory with no
//! external dependencies. Every fetch is logged so tests can assert
//! which tiers were consulted and in what order.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use mandi::sources::MarketSource;
use mandi::types::{
    DataDomain, DomainPayload, FetchError, FlowSnapshot, HeatmapCell, IndexQuote, MoverRow,
    Movers, NewsCategory, NewsItem, SectorRow, SourceKind,
};

/// Records served per domain when no behaviour is scripted.
pub const DEFAULT_RECORDS: usize = 3;

/// What a [`MockSource`] does when asked for one domain.
#[derive(Clone)]
pub enum Behaviour {
    /// Succeed with a payload of this many records.
    Serve(usize),
    /// Succeed with a payload carrying no records.
    Empty,
    /// Fail with a network error carrying this message.
    Fail(String),
}

/// A scripted market source for deterministic testing.
///
/// Behaviour is per-domain and mutable from test code. Domains with
/// no script serve a small fixed payload.
pub struct MockSource {
    name: String,
    kind: SourceKind,
    behaviours: Mutex<HashMap<DataDomain, Behaviour>>,
    calls: Mutex<Vec<DataDomain>>,
    /// If set, all fetches fail with this message regardless of scripts.
    force_error: Mutex<Option<String>>,
}

impl MockSource {
    /// Create a mock that serves [`DEFAULT_RECORDS`] for every domain.
    pub fn new(name: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            behaviours: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            force_error: Mutex::new(None),
        }
    }

    /// Create a mock with per-domain behaviour overrides.
    pub fn with_behaviours(
        name: &str,
        kind: SourceKind,
        overrides: &[(DataDomain, Behaviour)],
    ) -> Self {
        let mock = Self::new(name, kind);
        mock.behaviours
            .lock()
            .unwrap()
            .extend(overrides.iter().cloned());
        mock
    }

    /// Script one domain after construction.
    pub fn script(&self, domain: DataDomain, behaviour: Behaviour) {
        self.behaviours.lock().unwrap().insert(domain, behaviour);
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Every domain fetched so far, in call order.
    pub fn calls(&self) -> Vec<DataDomain> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times one domain was fetched.
    pub fn call_count(&self, domain: DataDomain) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|d| **d == domain)
            .count()
    }
}

/// Build a payload for one domain carrying `n` records. The flow
/// domain holds a single snapshot, so any non-zero `n` yields one
/// record there.
fn payload_for(domain: DataDomain, n: usize) -> DomainPayload {
    match domain {
        DataDomain::SectorPerformance => DomainPayload::Sectors(
            (0..n)
                .map(|i| SectorRow {
                    name: format!("MOCK SECTOR {i}"),
                    open: 1_000.0,
                    close: 1_010.0,
                    high: 1_015.0,
                    low: 995.0,
                    change: 10.0,
                    pct_change: 1.0,
                    volume: 1_000_000,
                })
                .collect(),
        ),
        DataDomain::IndexLevels => DomainPayload::Indices(
            (0..n)
                .map(|i| IndexQuote {
                    name: format!("MOCK INDEX {i}"),
                    last: 24_000.0 + i as f64,
                    change: 120.0,
                    pct_change: 0.5,
                    open: 23_900.0,
                    high: 24_050.0,
                    low: 23_850.0,
                    volume: 250_000_000,
                })
                .collect(),
        ),
        DataDomain::GainersLosers => {
            let gainers = (0..n - n / 2)
                .map(|i| MoverRow {
                    symbol: format!("UP{i}"),
                    last_price: 500.0,
                    change: 20.0,
                    pct_change: 4.0,
                })
                .collect();
            let losers = (0..n / 2)
                .map(|i| MoverRow {
                    symbol: format!("DOWN{i}"),
                    last_price: 300.0,
                    change: -15.0,
                    pct_change: -4.8,
                })
                .collect();
            DomainPayload::Movers(Movers { gainers, losers })
        }
        DataDomain::MarketHeatmap => DomainPayload::Heatmap(
            (0..n)
                .map(|i| HeatmapCell {
                    symbol: format!("MOCK{i}"),
                    price: 750.0,
                    pct_change: -0.8,
                    volume: 4_000_000,
                    market_cap: 750.0e6,
                })
                .collect(),
        ),
        DataDomain::FiiDiiFlow => {
            if n == 0 {
                DomainPayload::Flows(FlowSnapshot::default())
            } else {
                DomainPayload::Flows(FlowSnapshot {
                    date: Utc::now().format("%d-%b-%Y").to_string(),
                    fii_inflow: 11_200.0,
                    fii_outflow: 9_800.0,
                    dii_inflow: 8_400.0,
                    dii_outflow: 7_100.0,
                })
            }
        }
        DataDomain::News => DomainPayload::News(
            (0..n)
                .map(|i| NewsItem {
                    headline: format!("Mock headline {i}: markets steady ahead of RBI review"),
                    description: "Scripted item for testing".to_string(),
                    category: NewsCategory::Markets,
                    source: "Mock Wire".to_string(),
                    url: format!("https://mock.example.com/news/{i}"),
                    published_at: Utc::now() - Duration::hours(i as i64),
                })
                .collect(),
        ),
    }
}

#[async_trait]
impl MarketSource for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, domain: DataDomain) -> Result<DomainPayload, FetchError> {
        self.calls.lock().unwrap().push(domain);

        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(FetchError::Network(err.clone()));
        }

        let behaviour = self
            .behaviours
            .lock()
            .unwrap()
            .get(&domain)
            .cloned()
            .unwrap_or(Behaviour::Serve(DEFAULT_RECORDS));

        match behaviour {
            Behaviour::Serve(n) => Ok(payload_for(domain, n)),
            Behaviour::Empty => Ok(payload_for(domain, 0)),
            Behaviour::Fail(msg) => Err(FetchError::Network(msg)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_every_domain_by_default() {
        let mock = MockSource::new("mock-live", SourceKind::Live);
        for &domain in DataDomain::ALL {
            let payload = mock.fetch(domain).await.unwrap();
            assert_eq!(payload.domain(), domain);
            assert!(!payload.is_empty());
        }
        assert_eq!(mock.calls().len(), DataDomain::ALL.len());
        assert_eq!(mock.name(), "mock-live");
        assert_eq!(mock.kind(), SourceKind::Live);
    }

    #[tokio::test]
    async fn test_mock_scripted_record_counts() {
        let mock = MockSource::with_behaviours(
            "mock-live",
            SourceKind::Live,
            &[
                (DataDomain::SectorPerformance, Behaviour::Serve(7)),
                (DataDomain::GainersLosers, Behaviour::Serve(5)),
            ],
        );

        let sectors = mock.fetch(DataDomain::SectorPerformance).await.unwrap();
        assert_eq!(sectors.record_count(), 7);

        // Five movers split three gainers / two losers.
        let movers = mock.fetch(DataDomain::GainersLosers).await.unwrap();
        assert_eq!(movers.record_count(), 5);

        // Unscripted domains keep the default.
        let quotes = mock.fetch(DataDomain::IndexLevels).await.unwrap();
        assert_eq!(quotes.record_count(), DEFAULT_RECORDS);
    }

    #[tokio::test]
    async fn test_mock_empty_behaviour_yields_zero_records() {
        let mock = MockSource::with_behaviours(
            "mock-scrape",
            SourceKind::Scraped,
            &[
                (DataDomain::FiiDiiFlow, Behaviour::Empty),
                (DataDomain::News, Behaviour::Empty),
            ],
        );

        let flows = mock.fetch(DataDomain::FiiDiiFlow).await.unwrap();
        assert!(flows.is_empty());

        let news = mock.fetch(DataDomain::News).await.unwrap();
        assert!(news.is_empty());
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let mock = MockSource::with_behaviours(
            "mock-live",
            SourceKind::Live,
            &[(DataDomain::News, Behaviour::Fail("upstream 503".to_string()))],
        );

        let err = mock.fetch(DataDomain::News).await.unwrap_err();
        assert!(err.to_string().contains("upstream 503"));

        // Other domains still serve.
        assert!(mock.fetch(DataDomain::IndexLevels).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_forced_error_overrides_scripts() {
        let mock = MockSource::new("mock-live", SourceKind::Live);
        mock.set_error("simulated outage");

        for &domain in DataDomain::ALL {
            assert!(mock.fetch(domain).await.is_err());
        }

        mock.clear_error();
        assert!(mock.fetch(DataDomain::SectorPerformance).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_records_calls_in_order() {
        let mock = MockSource::new("mock-live", SourceKind::Live);
        mock.fetch(DataDomain::News).await.unwrap();
        mock.fetch(DataDomain::SectorPerformance).await.unwrap();
        mock.fetch(DataDomain::News).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                DataDomain::News,
                DataDomain::SectorPerformance,
                DataDomain::News
            ]
        );
        assert_eq!(mock.call_count(DataDomain::News), 2);
        assert_eq!(mock.call_count(DataDomain::MarketHeatmap), 0);
    }

    #[tokio::test]
    async fn test_mock_rescripting_takes_effect() {
        let mock = MockSource::new("mock-live", SourceKind::Live);
        assert!(mock.fetch(DataDomain::MarketHeatmap).await.is_ok());

        mock.script(
            DataDomain::MarketHeatmap,
            Behaviour::Fail("session expired".to_string()),
        );
        assert!(mock.fetch(DataDomain::MarketHeatmap).await.is_err());
    }
}
