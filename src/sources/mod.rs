//! Source adapters — one per upstream data origin.
//!
//! Every adapter implements [`MarketSource`]: a uniform "fetch domain
//! X" contract returning a payload or a normalized [`FetchError`].
//! Transport and shape problems never escape an adapter raw — the
//! fallback chain upstream only ever sees `Failure(reason)` values.

pub mod marketaux;
pub mod nse;
pub mod scrape;
pub mod synthetic;

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use crate::types::{DataDomain, DomainPayload, FetchError, SourceKind};

/// Bounded retry budget shared by the network-backed adapters.
pub(crate) const FETCH_ATTEMPTS: u32 = 3;

/// Fixed pause between retry attempts.
pub(crate) const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Browser identity for upstreams that reject plain HTTP clients.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Market-value proxy multiplier for heatmap sizing. None of the
/// upstreams expose free-float capitalisation on their quote surfaces.
pub(crate) const MARKET_CAP_SCALE: f64 = 1.0e6;

/// Abstraction over one upstream data origin.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Which fallback tier this adapter belongs to.
    fn kind(&self) -> SourceKind;

    /// Adapter identity for logs and run reports.
    fn name(&self) -> &str;

    /// Fetch the payload for one domain.
    async fn fetch(&self, domain: DataDomain) -> Result<DomainPayload, FetchError>;
}

/// Drop the query string before a URL reaches the log stream. Query
/// parameters can carry credentials (the news API token rides as
/// `api_token=`), and log output must never receive them.
pub(crate) fn loggable_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// GET a URL under the shared retry discipline: up to
/// [`FETCH_ATTEMPTS`] tries with a fixed [`RETRY_DELAY`] between them.
/// Non-2xx statuses and transport errors are normalized; the last
/// failure wins when the budget is exhausted.
pub(crate) async fn get_with_retry(http: &Client, url: &str) -> Result<Response, FetchError> {
    let mut last = FetchError::Network("no attempt made".to_string());

    for attempt in 1..=FETCH_ATTEMPTS {
        match http.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => {
                last = FetchError::Status(resp.status().as_u16());
            }
            Err(e) if e.is_timeout() => {
                last = FetchError::Timeout;
            }
            Err(e) => {
                last = FetchError::Network(e.to_string());
            }
        }
        if attempt < FETCH_ATTEMPTS {
            debug!(
                url = loggable_url(url),
                attempt,
                error = %last,
                "Fetch attempt failed, retrying"
            );
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }

    Err(last)
}
