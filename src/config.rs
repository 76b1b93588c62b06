//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API tokens) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`. Per-domain fallback
//! chains are configuration too — a domain missing from `[chains]`
//! gets the default live → scrape → synthetic sequence.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::types::{DataDomain, SourceKind};

/// Default fallback chain applied to any domain without an explicit
/// `[chains]` entry.
pub const DEFAULT_CHAIN: &[SourceKind] = &[
    SourceKind::Live,
    SourceKind::Scraped,
    SourceKind::Synthetic,
];

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub chains: ChainsConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
    /// Hour of day (IST) for the daily scheduled refresh.
    pub refresh_hour: u32,
    /// Minute of the refresh hour.
    pub refresh_minute: u32,
    /// Staleness threshold applied by freshness checks.
    pub max_age_secs: u64,
    /// How often the scheduler loop wakes to check the trigger.
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub nse: NseConfig,
    pub marketaux: MarketAuxConfig,
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NseConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketAuxConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Name of the env var holding the API token. A missing token
    /// disables the live news tier with a warning, not an error.
    pub api_token_env: String,
    pub limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
}

/// Optional per-domain adapter chains, as lowercase kind names.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChainsConfig {
    #[serde(default)]
    pub sector_performance: Option<Vec<String>>,
    #[serde(default)]
    pub index_levels: Option<Vec<String>>,
    #[serde(default)]
    pub gainers_losers: Option<Vec<String>>,
    #[serde(default)]
    pub market_heatmap: Option<Vec<String>>,
    #[serde(default)]
    pub fii_dii_flow: Option<Vec<String>>,
    #[serde(default)]
    pub news: Option<Vec<String>>,
}

impl ChainsConfig {
    fn raw_for(&self, domain: DataDomain) -> Option<&Vec<String>> {
        match domain {
            DataDomain::SectorPerformance => self.sector_performance.as_ref(),
            DataDomain::IndexLevels => self.index_levels.as_ref(),
            DataDomain::GainersLosers => self.gainers_losers.as_ref(),
            DataDomain::MarketHeatmap => self.market_heatmap.as_ref(),
            DataDomain::FiiDiiFlow => self.fii_dii_flow.as_ref(),
            DataDomain::News => self.news.as_ref(),
        }
    }

    /// Parsed adapter chain for a domain, falling back to
    /// [`DEFAULT_CHAIN`] when the config omits it.
    pub fn chain_for(&self, domain: DataDomain) -> Result<Vec<SourceKind>> {
        match self.raw_for(domain) {
            None => Ok(DEFAULT_CHAIN.to_vec()),
            Some(names) => names
                .iter()
                .map(|name| {
                    name.parse::<SourceKind>().with_context(|| {
                        format!("Invalid adapter kind {name:?} in chain for {domain}")
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
