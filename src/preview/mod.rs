//! Product page previews
//!
//! Fetches a page, classifies its platform from the final hostname and runs
//! the per-field selector cascades. Results are cached per request URL.

pub mod cache;
pub mod extract;
pub mod fetch;
mod platform;
pub mod rules;

pub use cache::{Clock, PreviewCache, SystemClock};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use platform::Platform;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::Config;
use crate::{Error, Result};

/// Extracted preview card fields
///
/// Every field is independently optional. The all-`None` value is the
/// response for missing input and for any failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    /// Absolute image URL
    pub image: Option<String>,
    /// Page title, whitespace-collapsed
    pub title: Option<String>,
    /// Raw price text, whitespace-collapsed
    pub price: Option<String>,
    /// Detected platform; `None` only in the empty result
    pub platform: Option<Platform>,
}

impl PreviewResult {
    /// The null-filled result
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// What the leader of a flight saw, kept for the requests waiting on it
type Outcome = std::result::Result<PreviewResult, String>;

/// Per-URL gate; holds the outcome once the leader has one
type Gate = Arc<AsyncMutex<Option<Outcome>>>;

/// Cache-fronted preview pipeline
///
/// Concurrent requests for the same uncached URL are coalesced: one caller
/// fetches while the others wait on a per-URL gate, then take the leader's
/// outcome (success or failure) instead of fetching again.
pub struct PreviewService {
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<PreviewCache>,
    in_flight: Mutex<HashMap<String, Gate>>,
}

impl PreviewService {
    /// Create a service from an explicit fetcher and cache
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, cache: Arc<PreviewCache>) -> Self {
        Self {
            fetcher,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Create a service with an HTTP fetcher and a system-clock cache
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        let cache = PreviewCache::new(config.cache.ttl, config.cache.max_entries);
        Ok(Self::new(Arc::new(fetcher), Arc::new(cache)))
    }

    /// The backing cache
    #[must_use]
    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// Preview `url`, never failing
    ///
    /// Missing or blank input and every error collapse to [`PreviewResult::empty`].
    pub async fn preview_or_empty(&self, url: Option<&str>) -> PreviewResult {
        let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
            return PreviewResult::empty();
        };

        match self.preview(url).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(url, error = %e, "preview failed");
                PreviewResult::empty()
            }
        }
    }

    /// Preview `url`, serving from cache when fresh
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be fetched
    pub async fn preview(&self, url: &str) -> Result<PreviewResult> {
        if let Some(hit) = self.cache.lookup(url) {
            tracing::debug!(url, "preview cache hit");
            return Ok(hit);
        }

        let flight = self.join_flight(url);
        let mut slot = flight.gate.lock().await;

        if let Some(outcome) = slot.as_ref() {
            tracing::debug!(url, ok = outcome.is_ok(), "preview shared with concurrent request");
            return outcome.clone().map_err(Error::Fetch);
        }

        // A cancelled leader leaves the slot empty and the next waiter fetches
        let outcome = self.fetch_and_extract(url).await;
        if let Ok(result) = &outcome {
            self.cache.store(url, result.clone());
        }
        *slot = Some(match &outcome {
            Ok(result) => Ok(result.clone()),
            Err(e) => Err(e.to_string()),
        });
        outcome
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<PreviewResult> {
        let page = self.fetcher.fetch(url).await?;
        let platform = Platform::from_url(&page.url);
        let result = extract::extract_html(&page.body, &page.url, platform);

        tracing::debug!(
            url,
            final_url = %page.url,
            %platform,
            title = ?result.title,
            price = ?result.price,
            image = ?result.image,
            "extracted preview"
        );

        Ok(result)
    }

    fn join_flight<'a>(&'a self, url: &'a str) -> Flight<'a> {
        let gate = self
            .lock_in_flight()
            .entry(url.to_string())
            .or_default()
            .clone();
        Flight {
            service: self,
            key: url,
            gate,
        }
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<String, Gate>> {
        self.in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PreviewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Membership in the per-URL gate; the last member out removes it
struct Flight<'a> {
    service: &'a PreviewService,
    key: &'a str,
    gate: Gate,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.service.lock_in_flight();
        // One reference in the map, one here
        if Arc::strong_count(&self.gate) == 2 {
            in_flight.remove(self.key);
        }
    }
}
