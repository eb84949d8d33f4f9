//! E-commerce platform detection from a hostname

use std::fmt;

use serde::{Deserialize, Serialize};

/// Known e-commerce platform driving which selector cascade applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Flipkart,
    Meesho,
    Unknown,
}

/// Hostname fragments checked in order; first containment match wins
const HOST_MARKERS: &[(&str, Platform)] = &[
    ("amazon", Platform::Amazon),
    ("flipkart", Platform::Flipkart),
    ("meesho", Platform::Meesho),
];

impl Platform {
    /// Classify a hostname by substring containment
    ///
    /// Matching is case-insensitive. Any host containing a marker matches,
    /// so `notamazon.example` is classified as Amazon.
    #[must_use]
    pub fn from_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        HOST_MARKERS
            .iter()
            .find(|(marker, _)| host.contains(marker))
            .map_or(Self::Unknown, |(_, platform)| *platform)
    }

    /// Classify a full URL by its hostname
    #[must_use]
    pub fn from_url(url: &url::Url) -> Self {
        url.host_str().map_or(Self::Unknown, Self::from_host)
    }

    /// Lowercase tag used on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Flipkart => "flipkart",
            Self::Meesho => "meesho",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hosts() {
        assert_eq!(Platform::from_host("www.amazon.in"), Platform::Amazon);
        assert_eq!(Platform::from_host("flipkart.com"), Platform::Flipkart);
        assert_eq!(Platform::from_host("meesho.com"), Platform::Meesho);
        assert_eq!(Platform::from_host("example.com"), Platform::Unknown);
    }

    #[test]
    fn test_case_folded() {
        assert_eq!(Platform::from_host("WWW.Amazon.COM"), Platform::Amazon);
    }

    #[test]
    fn test_substring_match_is_loose() {
        assert_eq!(Platform::from_host("amazonaws.com"), Platform::Amazon);
        assert_eq!(Platform::from_host("notflipkart.example"), Platform::Flipkart);
    }

    #[test]
    fn test_from_url() {
        let url = url::Url::parse("https://dl.flipkart.com/dl/item?pid=1").unwrap();
        assert_eq!(Platform::from_url(&url), Platform::Flipkart);

        let url = url::Url::parse("data:text/plain,hello").unwrap();
        assert_eq!(Platform::from_url(&url), Platform::Unknown);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Platform::Meesho).unwrap(), "\"meesho\"");
        assert_eq!(Platform::Unknown.to_string(), "unknown");
    }
}
