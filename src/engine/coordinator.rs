//! Refresh run orchestration.
//!
//! A run walks every domain in canonical order, resolves it through
//! its fallback chain, and commits the result to the cache the moment
//! it lands — a slow domain never delays the visibility of an earlier
//! one. Runs are serialized: a manual trigger landing mid-run waits
//! for the current pass to finish instead of racing it.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::cache::MarketCache;
use crate::engine::resolver::FallbackResolver;
use crate::types::{
    AttemptOutcome, CacheEntry, DataDomain, DomainOutcome, RefreshRun, RefreshTrigger,
};

pub struct RefreshCoordinator {
    resolver: FallbackResolver,
    cache: Arc<MarketCache>,
    run_lock: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(resolver: FallbackResolver, cache: Arc<MarketCache>) -> Self {
        Self {
            resolver,
            cache,
            run_lock: Mutex::new(()),
        }
    }

    /// Execute one full refresh pass. Never fails: every domain
    /// resolves to some payload, and the report records which tier
    /// served it.
    pub async fn run_refresh(&self, trigger: RefreshTrigger) -> RefreshRun {
        let _guard = self.run_lock.lock().await;

        let id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run_id = %id, %trigger, "Refresh run started");

        let mut outcomes = Vec::with_capacity(DataDomain::ALL.len());
        for &domain in DataDomain::ALL {
            let resolution = self.resolver.resolve(domain).await;
            let records = resolution.payload.record_count();
            let failed_tiers = resolution
                .attempts
                .iter()
                .filter(|a| matches!(a.outcome, AttemptOutcome::Failure { .. }))
                .count();

            let committed_at = Utc::now();
            self.cache
                .put(CacheEntry {
                    domain,
                    payload: resolution.payload,
                    fetched_at: committed_at,
                    source_used: resolution.source_used,
                })
                .await;

            info!(
                %domain,
                source = %resolution.source_used,
                records,
                failed_tiers,
                "Domain committed"
            );
            outcomes.push(DomainOutcome {
                domain,
                source_used: resolution.source_used,
                records,
                committed_at,
            });
        }

        let run = RefreshRun {
            id,
            triggered_by: trigger,
            started_at,
            completed_at: Utc::now(),
            outcomes,
        };
        self.cache.publish_run(run.clone()).await;

        info!(
            run_id = %run.id,
            %trigger,
            duration_ms = run.duration_ms(),
            synthetic_domains = run.synthetic_count(),
            "Refresh run complete"
        );
        run
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
