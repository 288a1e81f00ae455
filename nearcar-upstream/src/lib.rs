//! Failover HTTP client for the vehicle position and ETA prediction cluster.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Error as JsonError;
use tracing::{debug, error, warn};

use nearcar_core::{
    model::{Coordinate, PredictionSet, VehicleSet},
    ports::{DirectoryError, EtaPort, PortError, ResultCache, UpstreamDirectory},
    rotation::RequestCounter,
};

const CARS_PATH: &str = "cars";
const PREDICT_PATH: &str = "predict";

/// Upper bound for a single attempt against one upstream address.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

// Longest slice of an error body kept for logs.
const MAX_LOGGED_BODY: usize = 512;

#[derive(thiserror::Error, Debug)]
/// Why one attempt against one upstream address failed. Triggers failover.
pub enum AttemptError {
    /// The configured base address is not a usable URL.
    #[error("Invalid upstream url {url}: {reason}")]
    InvalidUrl {
        /// Offending base address.
        url: String,
        /// Parser complaint.
        reason: String,
    },
    /// Connecting, sending, or reading failed, including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The upstream answered with something other than 200 OK.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// Returned status code.
        status: StatusCode,
        /// Start of the response body.
        body: String,
    },
    /// The body was not the JSON shape we expected.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
}

#[derive(Debug, Clone)]
/// Tunables for [`UpstreamClient`].
pub struct ClientConfig {
    /// Per-attempt timeout covering the request and the whole response body.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Query string of `GET /cars`.
#[derive(Debug, Serialize)]
struct CarsQuery {
    lat: f64,
    lng: f64,
    limit: usize,
}

/// Body of `POST /predict`.
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    target: &'a Coordinate,
    sources: &'a [Coordinate],
}

/// Upstream client with cache-aside reads and round-robin failover.
///
/// Each fetch asks the directory for the current addresses, starts at a
/// rotating offset, and tries every address at most once.
pub struct UpstreamClient {
    http: Client,
    directory: Arc<dyn UpstreamDirectory>,
    cache: Arc<dyn ResultCache>,
    counter: RequestCounter,
    config: ClientConfig,
}

impl UpstreamClient {
    /// Create a new client bound to the given HTTP client and collaborators.
    #[must_use]
    pub fn new(
        http: Client,
        directory: Arc<dyn UpstreamDirectory>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            http,
            directory,
            cache,
            counter: RequestCounter::new(),
            config: ClientConfig::default(),
        }
    }

    /// Replace the default tunables.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Walk all upstream addresses once, returning the first decoded answer.
    async fn failover<T, F>(&self, path: &'static str, build: F) -> Result<T, PortError>
    where
        T: DeserializeOwned + Send,
        F: Fn(Url) -> RequestBuilder + Send + Sync,
    {
        let urls = self.directory.urls().await?;
        if urls.is_empty() {
            return Err(DirectoryError("directory returned no upstream addresses".into()).into());
        }

        let rotation = self.counter.rotation(urls.len());
        let attempts = rotation.len();

        for (attempt, index) in rotation.enumerate() {
            let Some(base) = urls.get(index) else {
                continue;
            };

            let outcome = match endpoint(base, path) {
                Ok(url) => fetch_json::<T>(build(url).timeout(self.config.timeout)).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) => warn!(
                    url = %base,
                    path,
                    attempt = attempt + 1,
                    of = attempts,
                    error = %err,
                    "upstream attempt failed"
                ),
            }
        }

        error!(path, attempts, "all upstream addresses failed");
        Err(PortError::AllUpstreamsFailed { attempts })
    }
}

#[async_trait]
impl EtaPort for UpstreamClient {
    async fn fetch_vehicles(
        &self,
        target: &Coordinate,
        limit: usize,
    ) -> Result<VehicleSet, PortError> {
        match self.cache.lookup_vehicles(target, limit).await {
            Ok(Some(vehicles)) => {
                debug!(%target, limit, "vehicles served from cache");
                return Ok(vehicles);
            }
            Ok(None) => {}
            Err(err) => warn!(%target, limit, error = %err, "failed to get vehicles from cache"),
        }

        let query = CarsQuery {
            lat: target.latitude,
            lng: target.longitude,
            limit,
        };
        let mut vehicles: VehicleSet = self
            .failover(CARS_PATH, |url| self.http.get(url).query(&query))
            .await?;
        vehicles.truncate(limit);

        if let Err(err) = self.cache.store_vehicles(target, limit, &vehicles).await {
            warn!(%target, limit, error = %err, "failed to store vehicles in cache");
        }

        Ok(vehicles)
    }

    async fn fetch_predictions(
        &self,
        target: &Coordinate,
        sources: &[Coordinate],
    ) -> Result<PredictionSet, PortError> {
        match self.cache.lookup_predictions(target, sources).await {
            Ok(Some(minutes)) => {
                debug!(%target, sources = sources.len(), "predictions served from cache");
                return Ok(minutes);
            }
            Ok(None) => {}
            Err(err) => warn!(
                %target,
                sources = sources.len(),
                error = %err,
                "failed to get predictions from cache"
            ),
        }

        let body = PredictRequest { target, sources };
        let minutes: PredictionSet = self
            .failover(PREDICT_PATH, |url| self.http.post(url).json(&body))
            .await?;

        // A set that does not line up with the sources is a transient upstream fault.
        if minutes.len() != sources.len() {
            debug!(
                %target,
                sources = sources.len(),
                minutes = minutes.len(),
                "not caching mismatched predictions"
            );
        } else if let Err(err) = self.cache.store_predictions(target, sources, &minutes).await {
            warn!(%target, error = %err, "failed to store predictions in cache");
        }

        Ok(minutes)
    }
}

/// Append `path` to the base address, keeping any base path prefix.
fn endpoint(base: &str, path: &str) -> Result<Url, AttemptError> {
    let invalid = |reason: String| AttemptError::InvalidUrl {
        url: base.to_owned(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|err| invalid(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("cannot be a base".to_owned()))?
        .pop_if_empty()
        .push(path);
    Ok(url)
}

// Send the request, insist on 200 OK, and decode the JSON body.
// Error bodies are read only as far as the log snippet needs.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, AttemptError> {
    let mut resp = req.send().await?;
    let status = resp.status();

    if status != StatusCode::OK {
        let mut head = Vec::new();
        while head.len() < MAX_LOGGED_BODY {
            match resp.chunk().await {
                Ok(Some(chunk)) => head.extend_from_slice(&chunk),
                Ok(None) | Err(_) => break,
            }
        }
        head.truncate(MAX_LOGGED_BODY);
        return Err(AttemptError::Status {
            status,
            body: String::from_utf8_lossy(&head).into_owned(),
        });
    }

    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
