//! Rendered page cache with stale-while-revalidate semantics.
//!
//! - **Fresh** entries (younger than their revalidation interval) are served
//!   as is.
//! - **Stale** entries are served immediately while one background task per
//!   slug rebuilds the page. A failed rebuild keeps the stale copy. A rebuild
//!   that finds no article evicts the entry.
//! - **Misses** build the page before responding. Concurrent misses for one
//!   slug wait on a single build. Only found pages are cached.

mod lock;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use metrics::counter;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::application::content::ContentError;
use crate::application::generator::{BuildError, RenderedPage, StaticPageGenerator};
use crate::domain::entities::Article;

const METRIC_CACHE_REQUESTS: &str = "lectern_page_cache_requests_total";
const METRIC_CACHE_REGENERATIONS: &str = "lectern_page_cache_regenerations_total";

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub html: Arc<str>,
    pub article: Arc<Article>,
    pub generated_at: Instant,
    pub revalidate: Duration,
}

impl CachedPage {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.generated_at) < self.revalidate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Stale,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Stale => "stale",
            Self::Miss => "miss",
        }
    }
}

#[derive(Debug, Clone)]
pub enum PageLookup {
    Page {
        page: CachedPage,
        status: CacheStatus,
    },
    NotFound,
}

/// Result of rebuilding one cached slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regeneration {
    Replaced,
    Evicted,
    KeptStale,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrerenderReport {
    pub cached: usize,
    pub not_found: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct PageCache {
    inner: Arc<Inner>,
}

struct Inner {
    generator: StaticPageGenerator,
    entries: RwLock<HashMap<String, CachedPage>>,
    in_flight: Mutex<HashSet<String>>,
    miss_gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PageCache {
    pub fn new(generator: StaticPageGenerator) -> Self {
        Self {
            inner: Arc::new(Inner {
                generator,
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashSet::new()),
                miss_gates: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn generator(&self) -> &StaticPageGenerator {
        &self.inner.generator
    }

    pub fn cached(&self, slug: &str) -> Option<CachedPage> {
        lock::read(&self.inner.entries, "cached").get(slug).cloned()
    }

    pub fn is_regenerating(&self, slug: &str) -> bool {
        lock::lock(&self.inner.in_flight, "is_regenerating").contains(slug)
    }

    pub async fn get(&self, slug: &str) -> Result<PageLookup, BuildError> {
        if let Some(page) = self.cached(slug) {
            let status = if page.is_fresh(Instant::now()) {
                CacheStatus::Hit
            } else {
                self.spawn_regeneration(slug);
                CacheStatus::Stale
            };
            record(status);
            return Ok(PageLookup::Page { page, status });
        }

        record(CacheStatus::Miss);
        match self.inner.build_on_miss(slug).await? {
            Some(page) => Ok(PageLookup::Page {
                page,
                status: CacheStatus::Miss,
            }),
            None => Ok(PageLookup::NotFound),
        }
    }

    /// Rebuild `slug` now unless a rebuild is already running.
    pub async fn regenerate(&self, slug: &str) -> Regeneration {
        self.inner.regenerate(slug).await
    }

    /// Build and cache every enumerated slug. Individual failures are logged
    /// and counted.
    pub async fn prerender(&self) -> Result<PrerenderReport, ContentError> {
        let targets = self.inner.generator.enumerate().await?;
        let mut report = PrerenderReport::default();
        for target in targets {
            match self.inner.build(&target.slug).await {
                Ok(Some(_)) => report.cached += 1,
                Ok(None) => report.not_found += 1,
                Err(err) => {
                    warn!(
                        target = "lectern::cache",
                        slug = %target.slug,
                        error = %err,
                        "prerender failed for page"
                    );
                    report.failed += 1;
                }
            }
        }
        info!(
            target = "lectern::cache",
            cached = report.cached,
            not_found = report.not_found,
            failed = report.failed,
            "page cache prerendered"
        );
        Ok(report)
    }

    fn spawn_regeneration(&self, slug: &str) {
        if self.is_regenerating(slug) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let slug = slug.to_string();
        tokio::spawn(async move {
            inner.regenerate(&slug).await;
        });
    }
}

impl Inner {
    async fn build(&self, slug: &str) -> Result<Option<CachedPage>, BuildError> {
        match self.generator.render(slug).await? {
            RenderedPage::Article {
                article,
                html,
                revalidate,
            } => {
                let page = CachedPage {
                    html: Arc::from(html),
                    article,
                    generated_at: Instant::now(),
                    revalidate,
                };
                lock::write(&self.entries, "insert").insert(slug.to_string(), page.clone());
                Ok(Some(page))
            }
            RenderedPage::NotFound => Ok(None),
        }
    }

    /// Build `slug` once for every request that missed it at the same time.
    async fn build_on_miss(&self, slug: &str) -> Result<Option<CachedPage>, BuildError> {
        let _turn = MissTurn::wait(&self.miss_gates, slug).await;
        if let Some(page) = lock::read(&self.entries, "miss_recheck").get(slug).cloned() {
            debug!(target = "lectern::cache", slug, "miss served by concurrent build");
            return Ok(Some(page));
        }
        self.build(slug).await
    }

    async fn regenerate(&self, slug: &str) -> Regeneration {
        let Some(_guard) = InFlight::claim(&self.in_flight, slug) else {
            return Regeneration::AlreadyRunning;
        };

        let outcome = match self.build(slug).await {
            Ok(Some(_)) => Regeneration::Replaced,
            Ok(None) => {
                lock::write(&self.entries, "evict").remove(slug);
                Regeneration::Evicted
            }
            Err(err) => {
                warn!(
                    target = "lectern::cache",
                    slug,
                    error = %err,
                    "regeneration failed; serving stale page"
                );
                Regeneration::KeptStale
            }
        };

        counter!(METRIC_CACHE_REGENERATIONS, "outcome" => outcome.as_str()).increment(1);
        debug!(target = "lectern::cache", slug, outcome = outcome.as_str(), "page regenerated");
        outcome
    }
}

impl Regeneration {
    fn as_str(self) -> &'static str {
        match self {
            Self::Replaced => "replaced",
            Self::Evicted => "evicted",
            Self::KeptStale => "kept_stale",
            Self::AlreadyRunning => "already_running",
        }
    }
}

/// Membership in the in-flight set, released on drop.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    slug: String,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<String>>, slug: &str) -> Option<Self> {
        let inserted = lock::lock(set, "claim").insert(slug.to_string());
        inserted.then(|| Self {
            set,
            slug: slug.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock::lock(self.set, "release").remove(&self.slug);
    }
}

/// Exclusive turn at building a missed slug. The gate entry is removed by the
/// last holder so the map only tracks slugs with waiters.
struct MissTurn<'a> {
    _turn: OwnedMutexGuard<()>,
    gates: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    slug: String,
}

impl<'a> MissTurn<'a> {
    async fn wait(gates: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>, slug: &str) -> Self {
        let gate = Arc::clone(
            lock::lock(gates, "miss_gate")
                .entry(slug.to_string())
                .or_default(),
        );
        Self {
            _turn: gate.lock_owned().await,
            gates,
            slug: slug.to_string(),
        }
    }
}

impl Drop for MissTurn<'_> {
    fn drop(&mut self) {
        let mut gates = lock::lock(self.gates, "miss_gate_release");
        // One reference in the map and one held by this turn.
        if gates
            .get(&self.slug)
            .is_some_and(|gate| Arc::strong_count(gate) <= 2)
        {
            gates.remove(&self.slug);
        }
    }
}

fn record(status: CacheStatus) {
    counter!(METRIC_CACHE_REQUESTS, "result" => status.as_str()).increment(1);
}
