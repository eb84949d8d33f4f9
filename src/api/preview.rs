//! Link preview endpoint
//!
//! `GET /preview?url=...` always answers 200 with the full
//! `{image, title, price, platform}` shape; failures become nulls.

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::Response,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;

use super::ApiState;
use crate::preview::PreviewResult;

/// Query parameters for a preview request
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub url: Option<String>,
}

/// Build the preview router (mounted under `/api`)
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/preview", get(get_preview))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
}

async fn get_preview(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<PreviewQuery>, QueryRejection>,
) -> Json<PreviewResult> {
    let url = match query {
        Ok(Query(q)) => q.url,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable preview query");
            None
        }
    };

    Json(state.service.preview_or_empty(url.as_deref()).await)
}

/// A panic in the preview path still yields the empty payload with 200
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = message, "preview handler panicked");

    Json(PreviewResult::empty()).into_response()
}
