//! Remote data sources
//!
//! Every source implements [`ForecastSource`]. Fetching is request, parse,
//! normalize; the parse step is a pure function over the response body so
//! each one can be tested against a fixed response.

pub mod kp;
pub mod nws;
pub mod rdps;

use crate::ForecastError;
use crate::cache::PersistentCache;
use crate::config::SourcesConfig;
use crate::models::{DataSource, Location, TimeSeries, TimeWindow};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub use kp::KpSource;
pub use nws::NwsSource;
pub use rdps::{RdpsAstroSource, RdpsMetSource};

/// Responses slower than this are logged
const SLOW_RESPONSE: Duration = Duration::from_secs(5);

/// Series produced by one source for one window
#[derive(Debug, Clone)]
pub struct SourceData {
    pub source: DataSource,
    pub series: Vec<TimeSeries>,
}

impl SourceData {
    #[must_use]
    pub fn new(source: DataSource, series: Vec<TimeSeries>) -> Self {
        Self { source, series }
    }
}

/// A remote data source
#[async_trait]
pub trait ForecastSource: Send + Sync {
    fn source(&self) -> DataSource;

    /// Whether the data depends on the location; global products never report it unsupported
    fn location_dependent(&self) -> bool {
        true
    }

    async fn fetch(&self, location: &Location, window: &TimeWindow) -> Result<SourceData, ForecastError>;
}

/// HTTP client shared by all sources: timeout, user agent, transient-failure retries
pub fn build_client(settings: &SourcesConfig) -> Result<ClientWithMiddleware, ForecastError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(u64::from(settings.timeout_seconds)))
        .user_agent(settings.user_agent.clone())
        .build()?;
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(settings.max_retries);
    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// GET `url`, logging the request and slow responses; non-2xx is left to the caller
pub(crate) async fn send(client: &ClientWithMiddleware, url: &str) -> Result<reqwest::Response, ForecastError> {
    debug!(url, "Requesting");
    let started = Instant::now();
    let response = client.get(url).send().await?;
    let elapsed = started.elapsed();
    if elapsed > SLOW_RESPONSE {
        warn!(url, elapsed_ms = elapsed.as_millis() as u64, "Slow response");
    }
    Ok(response)
}

fn status_error(url: &str, status: reqwest::StatusCode) -> ForecastError {
    ForecastError::api(format!("{url} returned HTTP {status}"))
}

/// GET `url` and return the body as text
pub(crate) async fn get_text(client: &ClientWithMiddleware, url: &str) -> Result<String, ForecastError> {
    let response = send(client, url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(url, status));
    }
    Ok(response.text().await?)
}

/// GET `url` and return the raw body
pub(crate) async fn get_bytes(client: &ClientWithMiddleware, url: &str) -> Result<Vec<u8>, ForecastError> {
    let response = send(client, url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(url, status));
    }
    Ok(response.bytes().await?.to_vec())
}

/// Serve `key` from the cache when fresh, otherwise fetch and store it.
/// Cache failures are logged and never fail the fetch.
pub(crate) async fn cached<T, F, Fut>(
    cache: Option<&PersistentCache>,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<T, ForecastError>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ForecastError>>,
{
    if let Some(cache) = cache {
        match cache.get::<T>(key).await {
            Ok(Some(value)) => {
                debug!(key, "Served from cache");
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "Cache read failed"),
        }
    }

    let value = fetch().await?;

    if let Some(cache) = cache {
        if let Err(e) = cache.put(key, value.clone(), ttl).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }
    Ok(value)
}
