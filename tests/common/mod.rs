//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use product_preview::{
    ApiServerBuilder, Clock, Error, FetchedPage, PageFetcher, PreviewCache, PreviewService, Result,
};
use tower::ServiceExt;
use url::Url;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock(Mutex<Instant>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Mutex::new(Instant::now()))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock().unwrap()
    }
}

/// Fetcher that serves one canned page and counts calls
pub struct CountingFetcher {
    final_url: String,
    body: String,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(final_url: &str, body: &str) -> Self {
        Self {
            final_url: final_url.to_string(),
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for CountingFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedPage {
            url: Url::parse(&self.final_url).unwrap(),
            body: self.body.clone(),
        })
    }
}

/// Fetcher that always fails like an unreachable host
pub struct FailingFetcher;

#[async_trait]
impl PageFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        Err(Error::Fetch(format!("Request failed: could not connect to {url}")))
    }
}

/// Fetcher that panics mid-request
pub struct PanickingFetcher;

#[async_trait]
impl PageFetcher for PanickingFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedPage> {
        panic!("selector engine blew up");
    }
}

/// Build the full API router around a fetcher and clock
pub fn build_router(
    fetcher: Arc<dyn PageFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
) -> axum::Router {
    let cache = PreviewCache::with_clock(ttl, 64, clock);
    let service = Arc::new(PreviewService::new(fetcher, Arc::new(cache)));
    ApiServerBuilder::new(service)
        .cors_origins(vec!["http://localhost:5173".to_string()])
        .build()
        .router()
}

/// Issue a GET and return status plus raw body bytes
pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}
