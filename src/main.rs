//! MANDI — Market Aggregation & News Data Intelligence
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the source adapters into per-domain fallback chains, runs an
//! initial refresh so the cache is never empty, then polls the daily
//! trigger with graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use mandi::cache::MarketCache;
use mandi::config;
use mandi::dashboard;
use mandi::dashboard::routes::ServiceState;
use mandi::engine::coordinator::RefreshCoordinator;
use mandi::engine::resolver::{FallbackResolver, SourceSet};
use mandi::engine::scheduler::DailyTrigger;
use mandi::market;
use mandi::sources::marketaux::MarketAuxSource;
use mandi::sources::nse::NseSource;
use mandi::sources::scrape::ScrapeSource;
use mandi::sources::synthetic::SyntheticSource;
use mandi::types::{RefreshRun, RefreshTrigger};

const BANNER: &str = r#"
 __  __    _    _   _ ____ ___
|  \/  |  / \  | \ | |  _ \_ _|
| |\/| | / _ \ |  \| | | | | |
| |  | |/ ___ \| |\  | |_| | |
|_|  |_/_/   \_\_| \_|____/___|

  Market Aggregation & News Data Intelligence
  v0.1.0 — Refresh & Caching Service
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let config_path =
        std::env::var("MANDI_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        service = %cfg.service.name,
        refresh_hour = cfg.service.refresh_hour,
        refresh_minute = cfg.service.refresh_minute,
        max_age_secs = cfg.service.max_age_secs,
        market_status = %market::current_market_status(),
        "MANDI starting up"
    );

    // -- Source adapters --------------------------------------------------

    let nse = if cfg.sources.nse.enabled {
        Some(Arc::new(NseSource::from_config(&cfg.sources.nse)?))
    } else {
        info!("NSE live adapter disabled in config");
        None
    };

    let marketaux = if cfg.sources.marketaux.enabled {
        match MarketAuxSource::from_config(&cfg.sources.marketaux) {
            Ok(src) => Some(Arc::new(src)),
            Err(e) => {
                warn!(
                    error = %e,
                    "MarketAux adapter unavailable — news will fall back to scraping/synthetic"
                );
                None
            }
        }
    } else {
        info!("MarketAux adapter disabled in config");
        None
    };

    let scrape = if cfg.sources.scrape.enabled {
        Some(Arc::new(ScrapeSource::from_config(&cfg.sources.scrape)?))
    } else {
        info!("Scrape adapter disabled in config");
        None
    };

    let sources = SourceSet {
        nse,
        marketaux,
        scrape,
        synthetic: Arc::new(SyntheticSource::new()),
    };

    // -- Engine wiring ----------------------------------------------------

    let resolver = FallbackResolver::from_config(&cfg, sources)?;
    let cache = Arc::new(MarketCache::new());
    let coordinator = Arc::new(RefreshCoordinator::new(resolver, cache.clone()));

    // -- Dashboard --------------------------------------------------------

    if cfg.dashboard.enabled {
        let state = Arc::new(ServiceState::new(
            cache.clone(),
            coordinator.clone(),
            cfg.service.name.clone(),
            cfg.service.max_age_secs,
        ));
        dashboard::spawn_dashboard(state, cfg.dashboard.port)?;
    }

    // -- Initial refresh --------------------------------------------------

    // Populate every domain up front so consumers never see an empty
    // store, even on a fresh start with all upstreams down.
    let run = coordinator.run_refresh(RefreshTrigger::Scheduled).await;
    log_run(&run);

    // -- Scheduler loop ---------------------------------------------------

    let mut trigger = DailyTrigger::new(cfg.service.refresh_hour, cfg.service.refresh_minute);
    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.service.poll_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        schedule = %trigger.schedule_label(),
        poll_interval_secs = cfg.service.poll_interval_secs,
        "Entering scheduler loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if trigger.poll() {
                    // Run on its own task so a panicking refresh is
                    // contained instead of taking the scheduler down.
                    let coordinator = coordinator.clone();
                    let handle = tokio::spawn(async move {
                        coordinator.run_refresh(RefreshTrigger::Scheduled).await
                    });
                    match handle.await {
                        Ok(run) => log_run(&run),
                        Err(e) => {
                            error!(error = %e, "Scheduled refresh aborted — scheduler continues");
                        }
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(
        domains_cached = cache.domain_count().await,
        "MANDI shut down cleanly."
    );

    Ok(())
}

/// Log a one-line summary of a completed refresh run.
fn log_run(run: &RefreshRun) {
    let sources: Vec<String> = run
        .outcomes
        .iter()
        .map(|o| format!("{}:{}", o.domain.as_str(), o.source_used.as_str()))
        .collect();
    info!(
        run_id = %run.id,
        trigger = %run.triggered_by,
        duration_ms = run.duration_ms(),
        synthetic_domains = run.synthetic_count(),
        sources = ?sources,
        "Refresh run finished"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mandi=info"));

    let json_logging = std::env::var("MANDI_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
