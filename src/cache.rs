//! In-memory store of the latest committed payload per domain.
//!
//! One entry per domain, replaced wholesale under a write lock — a
//! reader always sees a payload, timestamp, and source label that were
//! committed together. Locks guard map operations only and are never
//! held across upstream I/O.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::types::{CacheEntry, DataDomain, RefreshRun};

#[derive(Default)]
pub struct MarketCache {
    entries: RwLock<HashMap<DataDomain, CacheEntry>>,
    last_run: RwLock<Option<RefreshRun>>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a domain entry, replacing any previous one.
    pub async fn put(&self, entry: CacheEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(entry.domain, entry);
    }

    pub async fn get(&self, domain: DataDomain) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        entries.get(&domain).cloned()
    }

    /// All committed entries, in canonical refresh order. Domains that
    /// have never been committed are simply absent.
    pub async fn snapshot(&self) -> Vec<CacheEntry> {
        let entries = self.entries.read().await;
        DataDomain::ALL
            .iter()
            .filter_map(|d| entries.get(d).cloned())
            .collect()
    }

    /// Staleness against the real clock. A domain with no entry at all
    /// counts as stale.
    pub async fn is_stale(&self, domain: DataDomain, max_age_secs: u64) -> bool {
        self.is_stale_at(domain, max_age_secs, Utc::now()).await
    }

    /// Staleness at an explicit instant, for callers reasoning about
    /// simulated time.
    pub async fn is_stale_at(
        &self,
        domain: DataDomain,
        max_age_secs: u64,
        now: DateTime<Utc>,
    ) -> bool {
        let entries = self.entries.read().await;
        match entries.get(&domain) {
            Some(entry) => entry.is_stale_at(max_age_secs, now),
            None => true,
        }
    }

    /// Most recent commit instant across all domains.
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().await;
        entries.values().map(|e| e.fetched_at).max()
    }

    pub async fn domain_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    /// Drop every entry. Run history is kept — it describes what
    /// happened, not what is currently served.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    pub async fn publish_run(&self, run: RefreshRun) {
        let mut last = self.last_run.write().await;
        *last = Some(run);
    }

    pub async fn last_run(&self) -> Option<RefreshRun> {
        let last = self.last_run.read().await;
        last.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
