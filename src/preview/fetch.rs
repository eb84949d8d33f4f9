//! Page fetching with browser-like headers and a private-host guard

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::{Action, Attempt, Policy};
use reqwest::Client;
use url::{Host, Url};

use crate::config::FetchConfig;
use crate::{Error, Result};

/// A fetched page after redirects
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after any redirects
    pub url: Url,
    /// Response body as text
    pub body: String,
}

/// Something that can turn a URL into page text
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, following redirects
    ///
    /// # Errors
    ///
    /// Any transport failure, timeout, non-success status or non-text body
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    block_private_hosts: bool,
}

impl HttpFetcher {
    /// Build a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let max_redirects = config.max_redirects;
        let block_private_hosts = config.block_private_hosts;
        let redirect = Policy::custom(move |attempt| {
            follow_redirect(attempt, max_redirects, block_private_hosts)
        });

        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            timeout: config.timeout,
            block_private_hosts,
        })
    }

    /// Validate the scheme and, if enabled, that the host is publicly routable
    async fn check_target(&self, url: &Url) -> Result<()> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Error::Fetch(format!(
                "Invalid scheme: {scheme}. Only http and https are allowed"
            )));
        }

        if !self.block_private_hosts {
            return Ok(());
        }

        let host = url
            .host()
            .ok_or_else(|| Error::Fetch("URL has no host".to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let addrs: Vec<IpAddr> = match &host {
            Host::Ipv4(ip) => vec![IpAddr::V4(*ip)],
            Host::Ipv6(ip) => vec![IpAddr::V6(*ip)],
            Host::Domain(domain) => tokio::net::lookup_host((*domain, port))
                .await
                .map_err(|e| Error::Fetch(format!("Failed to resolve hostname: {e}")))?
                .map(|addr| addr.ip())
                .collect(),
        };

        if let Some(ip) = addrs.into_iter().find(|ip| is_blocked_ip(*ip)) {
            return Err(Error::Fetch(format!(
                "Blocked: {host} resolves to private/internal IP {ip}"
            )));
        }

        Ok(())
    }

    /// Guard, request and body read, without the overall deadline
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let parsed = Url::parse(url)?;
        self.check_target(&parsed).await?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!("HTTP error: {}", response.status())));
        }

        if let Some(content_type) = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_textual(content_type) {
                return Err(Error::Fetch(format!(
                    "Unsupported content type: {content_type}"
                )));
            }
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read response body: {e}")))?;

        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        // Host resolution for the guard runs outside reqwest's own deadline
        within(self.timeout, self.fetch_page(url)).await
    }
}

/// Abandon `work` once `limit` has elapsed
async fn within<T>(limit: Duration, work: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, work)
        .await
        .map_err(|_| Error::Fetch(format!("Request timed out after {limit:?}")))?
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .field("block_private_hosts", &self.block_private_hosts)
            .finish_non_exhaustive()
    }
}

/// Redirect policy: bounded hops, http(s) only, no literal private addresses
fn follow_redirect(
    attempt: Attempt<'_>,
    max_redirects: usize,
    block_private_hosts: bool,
) -> Action {
    let too_many = attempt.previous().len() >= max_redirects;
    let url = attempt.url();
    let web_scheme = matches!(url.scheme(), "http" | "https");
    let private = block_private_hosts
        && match url.host() {
            Some(Host::Ipv4(ip)) => is_blocked_ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => is_blocked_ip(IpAddr::V6(ip)),
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            None => true,
        };

    if too_many {
        attempt.error("too many redirects")
    } else if !web_scheme {
        attempt.error("redirect to non-http scheme")
    } else if private {
        attempt.error("redirect to private host")
    } else {
        attempt.follow()
    }
}

/// Whether a `Content-Type` value is something we can parse as a page
fn is_textual(content_type: &str) -> bool {
    let mime = content_type.to_ascii_lowercase();
    mime.starts_with("text/") || mime.contains("html") || mime.contains("xml")
}

/// Check if an IP address is private or otherwise blocked
///
/// Blocks loopback, private, link-local, unspecified and `0.0.0.0/8` IPv4
/// addresses; loopback, unique-local, link-local and unspecified IPv6
/// addresses; and IPv4-mapped IPv6 forms of blocked IPv4 addresses.
#[must_use]
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_blocked_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_blocked_ipv6(ipv6),
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    ip.octets()[0] == 0 || ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_blocked_ipv4(mapped);
    }
    ip.is_loopback() || ip.is_unspecified() || ip.is_unique_local() || ip.is_unicast_link_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked(ip: &str) -> bool {
        is_blocked_ip(ip.parse().unwrap())
    }

    #[test]
    fn test_blocked_ipv4() {
        assert!(blocked("127.0.0.1"));
        assert!(blocked("10.1.2.3"));
        assert!(blocked("172.16.0.1"));
        assert!(blocked("172.31.255.255"));
        assert!(blocked("192.168.1.1"));
        assert!(blocked("169.254.0.1"));
        assert!(blocked("0.0.0.0"));
        assert!(blocked("0.255.255.255"));
    }

    #[test]
    fn test_allowed_ipv4() {
        assert!(!blocked("8.8.8.8"));
        assert!(!blocked("172.15.0.1"));
        assert!(!blocked("172.32.0.1"));
        assert!(!blocked("192.169.0.1"));
    }

    #[test]
    fn test_blocked_ipv6() {
        assert!(blocked("::1"));
        assert!(blocked("::"));
        assert!(blocked("fc00::1"));
        assert!(blocked("fd12:3456::1"));
        assert!(blocked("fe80::1"));
        assert!(blocked("::ffff:127.0.0.1"));
    }

    #[test]
    fn test_allowed_ipv6() {
        assert!(!blocked("2001:4860:4860::8888"));
        assert!(!blocked("2606:4700:4700::1111"));
    }

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("application/xhtml+xml"));
        assert!(is_textual("TEXT/PLAIN"));
        assert!(!is_textual("image/png"));
        assert!(!is_textual("application/pdf"));
    }

    #[tokio::test]
    async fn test_deadline_covers_work_before_the_request() {
        let started = std::time::Instant::now();
        let result: Result<()> =
            within(Duration::from_millis(50), std::future::pending()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_deadline_passes_through_results() {
        let ok: Result<u8> = within(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u8> = within(Duration::from_secs(1), async {
            Err(Error::Fetch("refused".into()))
        })
        .await;
        assert_eq!(err.unwrap_err().to_string(), Error::Fetch("refused".into()).to_string());
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_rejects_loopback_literal() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(err.to_string().contains("Blocked"), "{err}");
    }

    #[tokio::test]
    async fn test_rejects_unparsable_url() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
