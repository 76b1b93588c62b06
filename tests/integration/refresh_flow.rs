//! End-to-end refresh cycle tests.
//!
//! Drives the full trigger → resolve → commit pipeline with scripted
//! sources behind real chains, asserting fallback order, cache
//! commits, staleness transitions, and the scheduler's fire-once
//! discipline.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;

use mandi::cache::MarketCache;
use mandi::engine::coordinator::RefreshCoordinator;
use mandi::engine::resolver::FallbackResolver;
use mandi::engine::scheduler::DailyTrigger;
use mandi::sources::synthetic::SyntheticSource;
use mandi::sources::MarketSource;
use mandi::types::{DataDomain, RefreshTrigger, SourceKind};

use crate::mock_source::{Behaviour, MockSource, DEFAULT_RECORDS};

/// Build a coordinator whose every domain runs `live` then `scrape`,
/// with the synthetic generator as the terminal tier.
fn coordinator_with(
    live: &Arc<MockSource>,
    scrape: &Arc<MockSource>,
) -> (RefreshCoordinator, Arc<MarketCache>) {
    let mut chains: HashMap<DataDomain, Vec<Arc<dyn MarketSource>>> = HashMap::new();
    for &domain in DataDomain::ALL {
        chains.insert(
            domain,
            vec![
                live.clone() as Arc<dyn MarketSource>,
                scrape.clone() as Arc<dyn MarketSource>,
            ],
        );
    }
    let resolver = FallbackResolver::with_chains(chains, Arc::new(SyntheticSource::new()));
    let cache = Arc::new(MarketCache::new());
    let coordinator = RefreshCoordinator::new(resolver, cache.clone());
    (coordinator, cache)
}

fn mock_pair() -> (Arc<MockSource>, Arc<MockSource>) {
    (
        Arc::new(MockSource::new("mock-live", SourceKind::Live)),
        Arc::new(MockSource::new("mock-scrape", SourceKind::Scraped)),
    )
}

fn ist(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
    Kolkata.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_refresh_commits_all_domains_in_order() {
        let (live, scrape) = mock_pair();
        let (coordinator, cache) = coordinator_with(&live, &scrape);

        let run = coordinator.run_refresh(RefreshTrigger::Manual).await;

        assert_eq!(run.triggered_by, RefreshTrigger::Manual);
        assert_eq!(run.outcomes.len(), DataDomain::ALL.len());
        assert_eq!(run.synthetic_count(), 0);

        let domains: Vec<DataDomain> = run.outcomes.iter().map(|o| o.domain).collect();
        assert_eq!(domains, DataDomain::ALL.to_vec());

        for outcome in &run.outcomes {
            assert_eq!(outcome.source_used, SourceKind::Live);
            // The flow domain carries one snapshot; everything else the
            // mock's default record count.
            let expected = match outcome.domain {
                DataDomain::FiiDiiFlow => 1,
                _ => DEFAULT_RECORDS,
            };
            assert_eq!(outcome.records, expected, "records for {}", outcome.domain);
        }

        // Commit instants never go backwards across the pass.
        for pair in run.outcomes.windows(2) {
            assert!(pair[0].committed_at <= pair[1].committed_at);
        }

        assert_eq!(cache.domain_count().await, DataDomain::ALL.len());
        assert_eq!(scrape.calls().len(), 0, "scrape tier must not be touched");
    }

    #[tokio::test]
    async fn test_live_outage_falls_back_to_scrape() {
        let (live, scrape) = mock_pair();
        let (coordinator, cache) = coordinator_with(&live, &scrape);
        live.set_error("connection reset by peer");

        let run = coordinator.run_refresh(RefreshTrigger::Manual).await;

        for outcome in &run.outcomes {
            assert_eq!(outcome.source_used, SourceKind::Scraped);
        }
        assert_eq!(run.synthetic_count(), 0);

        // The live tier was consulted first for every domain.
        assert_eq!(live.calls(), DataDomain::ALL.to_vec());
        assert_eq!(scrape.calls(), DataDomain::ALL.to_vec());

        let entry = cache.get(DataDomain::News).await.unwrap();
        assert_eq!(entry.source_used, SourceKind::Scraped);
    }

    #[tokio::test]
    async fn test_empty_live_payload_advances_to_next_tier() {
        let (live, scrape) = mock_pair();
        live.script(DataDomain::SectorPerformance, Behaviour::Empty);
        let (coordinator, _cache) = coordinator_with(&live, &scrape);

        let run = coordinator.run_refresh(RefreshTrigger::Manual).await;

        assert_eq!(
            run.source_for(DataDomain::SectorPerformance),
            Some(SourceKind::Scraped)
        );
        for &domain in DataDomain::ALL {
            if domain != DataDomain::SectorPerformance {
                assert_eq!(run.source_for(domain), Some(SourceKind::Live));
            }
        }

        // Scraping was consulted for the empty domain and nothing else.
        assert_eq!(scrape.calls(), vec![DataDomain::SectorPerformance]);
    }

    #[tokio::test]
    async fn test_total_outage_still_commits_every_domain() {
        let (live, scrape) = mock_pair();
        live.set_error("DNS failure");
        scrape.set_error("page moved");
        let (coordinator, cache) = coordinator_with(&live, &scrape);

        let run = coordinator.run_refresh(RefreshTrigger::Manual).await;

        assert_eq!(run.synthetic_count(), DataDomain::ALL.len());
        for outcome in &run.outcomes {
            assert_eq!(outcome.source_used, SourceKind::Synthetic);
            assert!(outcome.records > 0, "{} committed empty", outcome.domain);
        }

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), DataDomain::ALL.len());
        for entry in &snapshot {
            assert!(!entry.payload.is_empty());
        }
    }

    #[tokio::test]
    async fn test_partial_outage_mixes_tiers() {
        let (live, scrape) = mock_pair();
        live.script(
            DataDomain::IndexLevels,
            Behaviour::Fail("cookie rejected".to_string()),
        );
        live.script(DataDomain::MarketHeatmap, Behaviour::Empty);
        scrape.script(
            DataDomain::MarketHeatmap,
            Behaviour::Fail("markup changed".to_string()),
        );
        let (coordinator, cache) = coordinator_with(&live, &scrape);

        let run = coordinator.run_refresh(RefreshTrigger::Manual).await;

        assert_eq!(
            run.source_for(DataDomain::IndexLevels),
            Some(SourceKind::Scraped)
        );
        assert_eq!(
            run.source_for(DataDomain::MarketHeatmap),
            Some(SourceKind::Synthetic)
        );
        assert_eq!(
            run.source_for(DataDomain::SectorPerformance),
            Some(SourceKind::Live)
        );
        assert_eq!(run.synthetic_count(), 1);

        // The cache records the tier that actually served each domain.
        let heatmap = cache.get(DataDomain::MarketHeatmap).await.unwrap();
        assert_eq!(heatmap.source_used, SourceKind::Synthetic);
        let indices = cache.get(DataDomain::IndexLevels).await.unwrap();
        assert_eq!(indices.source_used, SourceKind::Scraped);
    }

    #[tokio::test]
    async fn test_second_run_replaces_cache_and_run_history() {
        let (live, scrape) = mock_pair();
        let (coordinator, cache) = coordinator_with(&live, &scrape);

        let first = coordinator.run_refresh(RefreshTrigger::Scheduled).await;
        let before = cache.get(DataDomain::News).await.unwrap();
        assert_eq!(before.source_used, SourceKind::Live);

        // The live tier dies between runs.
        live.set_error("gateway timeout");
        let second = coordinator.run_refresh(RefreshTrigger::Manual).await;

        let after = cache.get(DataDomain::News).await.unwrap();
        assert_eq!(after.source_used, SourceKind::Scraped);
        assert!(after.fetched_at >= before.fetched_at);

        assert_ne!(first.id, second.id);
        let last = cache.last_run().await.unwrap();
        assert_eq!(last.id, second.id);
        assert_eq!(last.triggered_by, RefreshTrigger::Manual);
    }

    #[tokio::test]
    async fn test_staleness_lifecycle() {
        let (live, scrape) = mock_pair();
        let (coordinator, cache) = coordinator_with(&live, &scrape);

        // Nothing committed yet: every domain counts as stale.
        for &domain in DataDomain::ALL {
            assert!(cache.is_stale(domain, 300).await);
        }

        coordinator.run_refresh(RefreshTrigger::Manual).await;

        let entry = cache.get(DataDomain::SectorPerformance).await.unwrap();
        let exactly_at = entry.fetched_at + Duration::seconds(300);
        let just_past = entry.fetched_at + Duration::seconds(301);

        assert!(
            !cache
                .is_stale_at(DataDomain::SectorPerformance, 300, exactly_at)
                .await
        );
        assert!(
            cache
                .is_stale_at(DataDomain::SectorPerformance, 300, just_past)
                .await
        );
    }

    #[tokio::test]
    async fn test_synthetic_payloads_stable_within_a_day() {
        let (live_a, scrape_a) = mock_pair();
        live_a.set_error("down");
        scrape_a.set_error("down");
        let (coordinator_a, cache_a) = coordinator_with(&live_a, &scrape_a);

        let (live_b, scrape_b) = mock_pair();
        live_b.set_error("down");
        scrape_b.set_error("down");
        let (coordinator_b, cache_b) = coordinator_with(&live_b, &scrape_b);

        coordinator_a.run_refresh(RefreshTrigger::Manual).await;
        coordinator_b.run_refresh(RefreshTrigger::Manual).await;

        // Two independent processes fall back on the same day: the
        // generated payloads agree, so restarts do not thrash the view.
        for &domain in DataDomain::ALL {
            let a = cache_a.get(domain).await.unwrap();
            let b = cache_b.get(domain).await.unwrap();
            assert_eq!(a.payload, b.payload, "payloads diverge for {domain}");
        }
    }

    #[tokio::test]
    async fn test_scheduled_fire_drives_one_refresh_per_day() {
        let (live, scrape) = mock_pair();
        let (coordinator, cache) = coordinator_with(&live, &scrape);

        let mut trigger = DailyTrigger::with_now(16, 0, ist(2025, 8, 20, 9, 0));

        let mut runs = 0;
        for (hour, minute) in [(15, 59), (16, 0), (16, 20), (23, 30)] {
            if trigger.poll_at(ist(2025, 8, 20, hour, minute)) {
                coordinator.run_refresh(RefreshTrigger::Scheduled).await;
                runs += 1;
            }
        }
        assert_eq!(runs, 1);

        let run = cache.last_run().await.unwrap();
        assert_eq!(run.triggered_by, RefreshTrigger::Scheduled);
        assert_eq!(run.outcomes.len(), DataDomain::ALL.len());

        // The next day fires exactly once more.
        assert!(trigger.poll_at(ist(2025, 8, 21, 16, 0)));
        assert!(!trigger.poll_at(ist(2025, 8, 21, 16, 1)));
    }
}
