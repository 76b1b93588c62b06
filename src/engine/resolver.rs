//! Fallback chain resolution.
//!
//! Each domain owns an ordered chain of adapters: live first, scraping
//! second, synthetic last. The resolver walks the chain until one
//! adapter yields a non-empty payload; a success with zero records is
//! treated exactly like a failure, because committing an empty table
//! over good cached data helps nobody. Resolution is total by
//! construction — the synthetic generator stands behind every chain
//! and cannot fail.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::sources::marketaux::MarketAuxSource;
use crate::sources::nse::NseSource;
use crate::sources::scrape::ScrapeSource;
use crate::sources::synthetic::SyntheticSource;
use crate::sources::MarketSource;
use crate::types::{AttemptOutcome, DataDomain, FetchAttempt, Resolution, SourceKind};

/// The adapters actually available this process. Live and scrape
/// tiers are optional — disabled in config, or missing credentials —
/// and chains simply skip tiers with no adapter behind them.
pub struct SourceSet {
    pub nse: Option<Arc<NseSource>>,
    pub marketaux: Option<Arc<MarketAuxSource>>,
    pub scrape: Option<Arc<ScrapeSource>>,
    pub synthetic: Arc<SyntheticSource>,
}

impl SourceSet {
    /// Route a chain tier to its concrete adapter. The live tier is
    /// domain-dependent: news lives on MarketAux, everything else on
    /// the NSE API.
    fn adapter_for(&self, kind: SourceKind, domain: DataDomain) -> Option<Arc<dyn MarketSource>> {
        match kind {
            SourceKind::Live => match domain {
                DataDomain::News => self
                    .marketaux
                    .clone()
                    .map(|s| s as Arc<dyn MarketSource>),
                _ => self.nse.clone().map(|s| s as Arc<dyn MarketSource>),
            },
            SourceKind::Scraped => self.scrape.clone().map(|s| s as Arc<dyn MarketSource>),
            SourceKind::Synthetic => Some(self.synthetic.clone() as Arc<dyn MarketSource>),
        }
    }
}

/// Walks per-domain adapter chains and always comes back with data.
pub struct FallbackResolver {
    chains: HashMap<DataDomain, Vec<Arc<dyn MarketSource>>>,
    synthetic: Arc<SyntheticSource>,
}

impl FallbackResolver {
    /// Materialize the configured chains against the available
    /// adapters. Tiers without a live adapter are dropped from the
    /// chain with a note rather than failing startup.
    pub fn from_config(config: &AppConfig, sources: SourceSet) -> Result<Self> {
        let mut chains = HashMap::new();
        for &domain in DataDomain::ALL {
            let kinds = config.chains.chain_for(domain)?;
            let mut chain: Vec<Arc<dyn MarketSource>> = Vec::with_capacity(kinds.len());
            for kind in kinds {
                match sources.adapter_for(kind, domain) {
                    Some(adapter) => chain.push(adapter),
                    None => debug!(%domain, %kind, "No adapter behind tier, skipping"),
                }
            }
            chains.insert(domain, chain);
        }
        Ok(Self {
            chains,
            synthetic: sources.synthetic,
        })
    }

    /// Assemble a resolver from pre-built chains, bypassing config
    /// routing. Domains absent from the map resolve straight to the
    /// synthetic tier.
    pub fn with_chains(
        chains: HashMap<DataDomain, Vec<Arc<dyn MarketSource>>>,
        synthetic: Arc<SyntheticSource>,
    ) -> Self {
        Self { chains, synthetic }
    }

    /// Resolve one domain through its chain. Infallible: if every
    /// configured adapter misses, the synthetic generator serves.
    pub async fn resolve(&self, domain: DataDomain) -> Resolution {
        let mut attempts = Vec::new();

        if let Some(chain) = self.chains.get(&domain) {
            for adapter in chain {
                match adapter.fetch(domain).await {
                    Ok(payload) if payload.is_empty() => {
                        warn!(
                            %domain,
                            adapter = adapter.name(),
                            "Adapter returned no records, trying next tier"
                        );
                        attempts.push(FetchAttempt {
                            domain,
                            adapter: adapter.name().to_string(),
                            outcome: AttemptOutcome::Failure {
                                reason: "empty payload".to_string(),
                            },
                        });
                    }
                    Ok(payload) => {
                        debug!(
                            %domain,
                            adapter = adapter.name(),
                            records = payload.record_count(),
                            "Adapter produced payload"
                        );
                        attempts.push(FetchAttempt {
                            domain,
                            adapter: adapter.name().to_string(),
                            outcome: AttemptOutcome::Success {
                                records: payload.record_count(),
                            },
                        });
                        return Resolution {
                            domain,
                            payload,
                            source_used: adapter.kind(),
                            attempts,
                        };
                    }
                    Err(e) => {
                        warn!(
                            %domain,
                            adapter = adapter.name(),
                            error = %e,
                            "Adapter failed, trying next tier"
                        );
                        attempts.push(FetchAttempt {
                            domain,
                            adapter: adapter.name().to_string(),
                            outcome: AttemptOutcome::Failure {
                                reason: e.to_string(),
                            },
                        });
                    }
                }
            }
        }

        // Terminal tier. Reached only when the configured chain is
        // exhausted or empty — generated data always serves.
        warn!(
            %domain,
            tiers_failed = attempts.len(),
            "All configured tiers failed, serving synthetic data"
        );
        let payload = self.synthetic.generate(domain);
        attempts.push(FetchAttempt {
            domain,
            adapter: self.synthetic.name().to_string(),
            outcome: AttemptOutcome::Success {
                records: payload.record_count(),
            },
        });
        Resolution {
            domain,
            payload,
            source_used: SourceKind::Synthetic,
            attempts,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
