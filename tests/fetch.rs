//! HTTP fetcher tests against a local server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use product_preview::{
    Error, HttpFetcher, PageFetcher, Platform, PreviewCache, PreviewService, config::FetchConfig,
};
use tokio::net::TcpListener;

const PRODUCT_PAGE: &str = r#"<html><head>
<title> Local   Product </title>
</head><body><img src="static/a.jpg" width="400" height="400"></body></html>"#;

async fn spawn_site() -> SocketAddr {
    let app = Router::new()
        .route("/start", get(|| async { Redirect::temporary("/shop/product") }))
        .route("/loop", get(|| async { Redirect::temporary("/loop") }))
        .route("/shop/product", get(|| async { Html(PRODUCT_PAGE) }))
        .route(
            "/image",
            get(|| async {
                let png = vec![0x89_u8, b'P', b'N', b'G'];
                ([(header::CONTENT_TYPE, "image/png")], png)
            }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND.into_response() }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Html("<title>late</title>")
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn local_fetcher() -> HttpFetcher {
    HttpFetcher::new(&FetchConfig {
        timeout: Duration::from_secs(1),
        max_redirects: 5,
        block_private_hosts: false,
        ..FetchConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_follows_redirects_and_reports_final_url() {
    let addr = spawn_site().await;
    let page = local_fetcher()
        .fetch(&format!("http://{addr}/start"))
        .await
        .unwrap();

    assert_eq!(page.url.path(), "/shop/product");
    assert!(page.body.contains("Local   Product"));
}

#[tokio::test]
async fn test_redirect_loop_fails() {
    let addr = spawn_site().await;
    let result = local_fetcher().fetch(&format!("http://{addr}/loop")).await;
    assert!(matches!(result, Err(Error::Fetch(_))));
}

#[tokio::test]
async fn test_error_status_fails() {
    let addr = spawn_site().await;
    let err = local_fetcher()
        .fetch(&format!("http://{addr}/missing"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"), "{err}");
}

#[tokio::test]
async fn test_non_text_body_fails() {
    let addr = spawn_site().await;
    let err = local_fetcher()
        .fetch(&format!("http://{addr}/image"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("image/png"), "{err}");
}

#[tokio::test]
async fn test_timeout_fails() {
    let addr = spawn_site().await;
    let result = local_fetcher().fetch(&format!("http://{addr}/slow")).await;
    assert!(matches!(result, Err(Error::Fetch(_))));
}

#[tokio::test]
async fn test_private_host_guard_blocks_loopback() {
    let addr = spawn_site().await;
    let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
    let err = fetcher
        .fetch(&format!("http://{addr}/shop/product"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Blocked"), "{err}");
}

#[tokio::test]
async fn test_end_to_end_preview_resolves_against_final_url() {
    let addr = spawn_site().await;
    let cache = PreviewCache::new(Duration::from_secs(60), 8);
    let service = PreviewService::new(Arc::new(local_fetcher()), Arc::new(cache));

    let result = service.preview(&format!("http://{addr}/start")).await.unwrap();

    assert_eq!(result.platform, Some(Platform::Unknown));
    assert_eq!(result.title.as_deref(), Some("Local Product"));
    assert_eq!(result.price, None);
    assert_eq!(
        result.image.as_deref(),
        Some(format!("http://{addr}/shop/static/a.jpg").as_str())
    );
}
