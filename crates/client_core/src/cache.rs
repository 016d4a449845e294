use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use shared::domain::{CarouselImage, Project};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    load_carousel, load_projects, FetchError, PortfolioDataSource, ResourceState,
    CAROUSEL_RESOURCE, PORTFOLIO_RESOURCE,
};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Cached feed payloads, one variant per resource key.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Projects(Vec<Project>),
    CarouselImages(Vec<CarouselImage>),
}

/// Values the cache can hold. Keys and payload variants correspond one to
/// one, so a lookup under the wrong type simply misses.
pub trait CacheValue: Clone {
    fn into_payload(self) -> CachedPayload;
    fn from_payload(payload: &CachedPayload) -> Option<&Self>;
}

impl CacheValue for Vec<Project> {
    fn into_payload(self) -> CachedPayload {
        CachedPayload::Projects(self)
    }

    fn from_payload(payload: &CachedPayload) -> Option<&Self> {
        match payload {
            CachedPayload::Projects(values) => Some(values),
            _ => None,
        }
    }
}

impl CacheValue for Vec<CarouselImage> {
    fn into_payload(self) -> CachedPayload {
        CachedPayload::CarouselImages(self)
    }

    fn from_payload(payload: &CachedPayload) -> Option<&Self> {
        match payload {
            CachedPayload::CarouselImages(values) => Some(values),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedPayload,
    stored_at: Instant,
    ttl: Duration,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    // Bumped by every explicit clear; a fetch that began before the bump
    // must not store its result afterwards.
    epoch: u64,
}

/// TTL cache over feed responses, keyed by resource name. Entries are
/// replaced wholesale on refresh and only removed by expiry or an explicit
/// clear. Constructed by the owner and passed to whoever needs it.
#[derive(Default)]
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` when it is still fresh; otherwise
    /// runs `fetcher`, stores a successful result with the given `ttl` and
    /// returns it. Failed fetches are never cached.
    pub async fn fetch_with_cache<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> Result<T, FetchError>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let epoch_at_check = {
            let mut inner = self.inner.lock().await;
            let fresh = inner
                .entries
                .get(key)
                .filter(|entry| entry.stored_at.elapsed() <= entry.ttl)
                .and_then(|entry| T::from_payload(&entry.value).cloned());
            if let Some(value) = fresh {
                debug!(key, "cache hit");
                return Ok(value);
            }
            inner.entries.remove(key);
            inner.epoch
        };

        debug!(key, "cache miss");
        let value = fetcher().await?;

        let mut inner = self.inner.lock().await;
        if inner.epoch == epoch_at_check {
            inner.entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone().into_payload(),
                    stored_at: Instant::now(),
                    ttl,
                },
            );
        }
        Ok(value)
    }

    pub async fn clear_cache(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.epoch += 1;
    }

    pub async fn clear_cache_entry(&self, key: &str) {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(key);
        inner.epoch += 1;
    }
}

/// [`FeedClient`](crate::FeedClient) variant that reads through a
/// [`ResponseCache`]. `refetch` clears the whole cache first so an explicit
/// user retry always reaches the backend.
pub struct CachedFeedClient {
    source: Arc<dyn PortfolioDataSource>,
    cache: Arc<ResponseCache>,
    ttl: Duration,
    projects: RwLock<ResourceState<Project>>,
    carousel: RwLock<ResourceState<CarouselImage>>,
    initial_loading: AtomicBool,
}

impl CachedFeedClient {
    pub fn new(source: Arc<dyn PortfolioDataSource>, cache: Arc<ResponseCache>) -> Arc<Self> {
        Self::with_ttl(source, cache, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(
        source: Arc<dyn PortfolioDataSource>,
        cache: Arc<ResponseCache>,
        ttl: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            cache,
            ttl,
            projects: RwLock::new(ResourceState::default()),
            carousel: RwLock::new(ResourceState::default()),
            initial_loading: AtomicBool::new(true),
        })
    }

    /// Fire-and-forget cycle through the cache.
    pub fn fetch_all(self: &Arc<Self>) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            client.load().await;
        });
    }

    /// One fetch cycle; fresh cache entries short-circuit the backend read.
    pub async fn load(&self) {
        self.projects.write().await.begin_fetch();
        self.carousel.write().await.begin_fetch();

        let (projects, carousel) = futures::join!(self.cached_projects(), self.cached_carousel());

        if let Err(err) = &projects {
            warn!(resource = PORTFOLIO_RESOURCE, error = %err, "cached feed fetch failed");
        }
        if let Err(err) = &carousel {
            warn!(resource = CAROUSEL_RESOURCE, error = %err, "cached feed fetch failed");
        }

        self.projects.write().await.resolve(projects);
        self.carousel.write().await.resolve(carousel);
        self.initial_loading.store(false, Ordering::SeqCst);
    }

    /// Explicit refresh: drops every cache entry, then runs a full cycle.
    pub async fn refetch(&self) {
        self.cache.clear_cache().await;
        self.load().await;
    }

    async fn cached_projects(&self) -> Result<Vec<Project>, FetchError> {
        self.cache
            .fetch_with_cache(PORTFOLIO_RESOURCE, self.ttl, || async {
                load_projects(self.source.as_ref()).await
            })
            .await
    }

    async fn cached_carousel(&self) -> Result<Vec<CarouselImage>, FetchError> {
        self.cache
            .fetch_with_cache(CAROUSEL_RESOURCE, self.ttl, || async {
                load_carousel(self.source.as_ref()).await
            })
            .await
    }

    pub async fn projects(&self) -> ResourceState<Project> {
        self.projects.read().await.clone()
    }

    pub async fn carousel(&self) -> ResourceState<CarouselImage> {
        self.carousel.read().await.clone()
    }

    pub fn is_initial_loading(&self) -> bool {
        self.initial_loading.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}
