use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::domain::{CarouselImage, Project};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use url::Url;

pub mod admin;
pub mod cache;
pub mod slideshow;

pub use admin::AdminClient;
pub use cache::{CachedFeedClient, ResponseCache, DEFAULT_CACHE_TTL};
pub use slideshow::SlideshowController;

/// Resource labels; also used as cache keys by the cached client.
pub const PORTFOLIO_RESOURCE: &str = "portfolio";
pub const CAROUSEL_RESOURCE: &str = "carousel";

const HTTP_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a resource fetch failed. Transport covers the read call itself,
/// validation covers a payload that does not match the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to fetch {resource}: {message}")]
    Transport {
        resource: &'static str,
        message: String,
    },
    #[error("{resource} validation failed: {message}")]
    Validation {
        resource: &'static str,
        message: String,
    },
}

/// Per-resource observable fetch state.
///
/// `loading == true` implies `error == None`; a failed cycle empties `data`
/// rather than keeping the previous payload.
#[derive(Debug, Clone)]
pub struct ResourceState<T> {
    pub data: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

impl<T> ResourceState<T> {
    pub(crate) fn begin_fetch(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn resolve(&mut self, result: Result<Vec<T>, FetchError>) {
        match result {
            Ok(data) => {
                self.data = data;
                self.loading = false;
                self.error = None;
            }
            Err(err) => {
                self.data = Vec::new();
                self.loading = false;
                self.error = Some(err.to_string());
            }
        }
    }
}

/// Read side of the portfolio backend. Implementations return raw records;
/// validation happens in the feed clients at the trust boundary.
#[async_trait]
pub trait PortfolioDataSource: Send + Sync {
    async fn fetch_projects(&self) -> Result<Vec<Value>>;
    async fn fetch_carousel_images(&self) -> Result<Vec<Value>>;
}

pub struct MissingDataSource;

#[async_trait]
impl PortfolioDataSource for MissingDataSource {
    async fn fetch_projects(&self) -> Result<Vec<Value>> {
        Err(anyhow!("portfolio data source is unavailable"))
    }

    async fn fetch_carousel_images(&self) -> Result<Vec<Value>> {
        Err(anyhow!("portfolio data source is unavailable"))
    }
}

/// Fetches raw records from the folio server over HTTP. The client carries a
/// request timeout so a hung server cannot keep a fetch cycle loading
/// forever.
pub struct HttpDataSource {
    http: Client,
    base_url: Url,
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid server url '{base_url}'"))?;
        let http = Client::builder()
            .timeout(HTTP_FETCH_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    async fn fetch_records(&self, path: &str) -> Result<Vec<Value>> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid request path '{path}'"))?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()?;
        let records = response
            .json()
            .await
            .with_context(|| format!("response from {url} is not a json array"))?;
        Ok(records)
    }
}

#[async_trait]
impl PortfolioDataSource for HttpDataSource {
    async fn fetch_projects(&self) -> Result<Vec<Value>> {
        self.fetch_records("projects").await
    }

    async fn fetch_carousel_images(&self) -> Result<Vec<Value>> {
        self.fetch_records("carousel").await
    }
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    ProjectsUpdated(Vec<Project>),
    CarouselUpdated(Vec<CarouselImage>),
    ResourceFailed {
        resource: &'static str,
        message: String,
    },
}

fn validate_records<T: DeserializeOwned>(
    resource: &'static str,
    raw: Vec<Value>,
) -> Result<Vec<T>, FetchError> {
    let mut validated = Vec::with_capacity(raw.len());
    for (index, record) in raw.into_iter().enumerate() {
        let parsed = serde_json::from_value(record).map_err(|err| FetchError::Validation {
            resource,
            message: format!("record {index}: {err}"),
        })?;
        validated.push(parsed);
    }
    Ok(validated)
}

pub(crate) async fn load_projects(
    source: &dyn PortfolioDataSource,
) -> Result<Vec<Project>, FetchError> {
    let raw = source
        .fetch_projects()
        .await
        .map_err(|err| FetchError::Transport {
            resource: PORTFOLIO_RESOURCE,
            message: err.to_string(),
        })?;
    validate_records(PORTFOLIO_RESOURCE, raw)
}

pub(crate) async fn load_carousel(
    source: &dyn PortfolioDataSource,
) -> Result<Vec<CarouselImage>, FetchError> {
    let raw = source
        .fetch_carousel_images()
        .await
        .map_err(|err| FetchError::Transport {
            resource: CAROUSEL_RESOURCE,
            message: err.to_string(),
        })?;
    validate_records(CAROUSEL_RESOURCE, raw)
}

/// Fetches the project and carousel lists concurrently and folds each
/// outcome into its own [`ResourceState`]. One resource failing never
/// cancels or touches the other; a cycle as a whole cannot fail.
pub struct FeedClient {
    source: Arc<dyn PortfolioDataSource>,
    projects: RwLock<ResourceState<Project>>,
    carousel: RwLock<ResourceState<CarouselImage>>,
    initial_loading: AtomicBool,
    events: broadcast::Sender<FeedEvent>,
}

impl FeedClient {
    pub fn new(source: Arc<dyn PortfolioDataSource>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            source,
            projects: RwLock::new(ResourceState::default()),
            carousel: RwLock::new(ResourceState::default()),
            initial_loading: AtomicBool::new(true),
            events,
        })
    }

    /// Fire-and-forget fetch cycle; state updates land asynchronously.
    pub fn fetch_all(self: &Arc<Self>) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            client.refetch().await;
        });
    }

    /// Runs one full fetch cycle. Callable repeatedly; the usual wiring is a
    /// retry action in the presentation layer.
    pub async fn refetch(&self) {
        debug!("feed fetch cycle starting");
        self.projects.write().await.begin_fetch();
        self.carousel.write().await.begin_fetch();

        // Both fetches are started before either is awaited and each one
        // settles on its own; errors are values here, so the join is
        // all-settled rather than fail-fast.
        let (projects, carousel) = futures::join!(
            load_projects(self.source.as_ref()),
            load_carousel(self.source.as_ref()),
        );

        self.apply_projects(projects).await;
        self.apply_carousel(carousel).await;
        self.initial_loading.store(false, Ordering::SeqCst);
    }

    async fn apply_projects(&self, result: Result<Vec<Project>, FetchError>) {
        match &result {
            Ok(data) => {
                let _ = self.events.send(FeedEvent::ProjectsUpdated(data.clone()));
            }
            Err(err) => {
                warn!(resource = PORTFOLIO_RESOURCE, error = %err, "feed fetch failed");
                let _ = self.events.send(FeedEvent::ResourceFailed {
                    resource: PORTFOLIO_RESOURCE,
                    message: err.to_string(),
                });
            }
        }
        self.projects.write().await.resolve(result);
    }

    async fn apply_carousel(&self, result: Result<Vec<CarouselImage>, FetchError>) {
        match &result {
            Ok(data) => {
                let _ = self.events.send(FeedEvent::CarouselUpdated(data.clone()));
            }
            Err(err) => {
                warn!(resource = CAROUSEL_RESOURCE, error = %err, "feed fetch failed");
                let _ = self.events.send(FeedEvent::ResourceFailed {
                    resource: CAROUSEL_RESOURCE,
                    message: err.to_string(),
                });
            }
        }
        self.carousel.write().await.resolve(result);
    }

    pub async fn projects(&self) -> ResourceState<Project> {
        self.projects.read().await.clone()
    }

    pub async fn carousel(&self) -> ResourceState<CarouselImage> {
        self.carousel.read().await.clone()
    }

    /// True until the very first fetch cycle settles, then false for the
    /// lifetime of the client.
    pub fn is_initial_loading(&self) -> bool {
        self.initial_loading.load(Ordering::SeqCst)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
