//! Product Preview - link-preview cards for product pages
//!
//! Given a URL, fetches the page and extracts a title, price, preview image
//! and the e-commerce platform it belongs to:
//! - Open Graph / Twitter Card meta tags first
//! - per-platform selector cascades (Amazon, Flipkart, Meesho)
//! - a generic scan over `<img>` tags as the last resort
//!
//! # Architecture
//!
//! ```text
//! GET /api/preview?url=...
//!          │
//! ┌────────▼─────────┐   hit   ┌──────────────┐
//! │  PreviewService  ├────────►│ PreviewCache │
//! └────────┬─────────┘         └──────────────┘
//!          │ miss (one fetch per URL at a time)
//! ┌────────▼─────────┐   ┌──────────┐   ┌───────────┐
//! │   HttpFetcher    ├──►│ Platform ├──►│ extractor │
//! └──────────────────┘   └──────────┘   └───────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod preview;

pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use config::Config;
pub use error::{Error, Result};
pub use preview::{
    Clock, FetchedPage, HttpFetcher, PageFetcher, Platform, PreviewCache, PreviewResult,
    PreviewService, SystemClock,
};
