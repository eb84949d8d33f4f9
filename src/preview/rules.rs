//! Selector cascades per field and platform
//!
//! Each table is tried top to bottom and the first non-empty value wins.
//! Adding a platform means adding rows here, not new branches in the extractor.

use super::Platform;

/// Where to read a value from once a selector matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Named attribute of the first matching element
    Attr(&'static str),
    /// Collected text of the first matching element
    Text,
}

/// One step in a cascade
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub selector: &'static str,
    pub source: Source,
}

const fn attr(selector: &'static str, name: &'static str) -> Rule {
    Rule {
        selector,
        source: Source::Attr(name),
    }
}

const fn text(selector: &'static str) -> Rule {
    Rule {
        selector,
        source: Source::Text,
    }
}

/// Title candidates, shared by every platform
pub const TITLE: &[Rule] = &[
    attr(r#"meta[property="og:title"]"#, "content"),
    attr(r#"meta[name="twitter:title"]"#, "content"),
    text("title"),
];

/// Image candidates tried before any platform-specific lookup
pub const META_IMAGE: &[Rule] = &[
    attr(r#"meta[property="og:image"]"#, "content"),
    attr(r#"meta[name="twitter:image"]"#, "content"),
    attr(r#"meta[property="og:image:secure_url"]"#, "content"),
    attr(r#"link[rel="image_src"]"#, "href"),
];

const AMAZON_PRICE: &[Rule] = &[
    text("#priceblock_ourprice"),
    text("#priceblock_dealprice"),
    text("#priceblock_saleprice"),
    text(".a-price .a-offscreen"),
    text("span.a-price-whole"),
];

const FLIPKART_PRICE: &[Rule] = &[text("div._30jeq3"), text("div._16Jk6d")];

const MEESHO_PRICE: &[Rule] = &[text("div.sc-eDvSVe"), text(r#"div[data-testid="price"]"#)];

// Lazy-loaded galleries keep the real URL in a data attribute, so those
// come before plain `src`.
const AMAZON_IMAGE: &[Rule] = &[
    attr("#landingImage", "data-old-hires"),
    attr("#landingImage", "src"),
    attr("#imgBlkFront", "src"),
    attr(r#"img[data-image-index="0"]"#, "src"),
    attr("img.a-dynamic-image", "src"),
    attr("div.imgTagWrapper img", "src"),
    attr(r#"img[alt*="product"]"#, "src"),
];

const FLIPKART_IMAGE: &[Rule] = &[
    attr("img._396cs4", "src"),
    attr("img[data-src]", "data-src"),
    attr(r#"img[alt*="product"]"#, "src"),
    attr("div._312yBx img", "src"),
];

const MEESHO_IMAGE: &[Rule] = &[
    attr("img[data-src]", "data-src"),
    attr(r#"img[alt*="product"]"#, "src"),
    attr(r#"div[data-testid="image"] img"#, "src"),
];

/// Price cascade for a platform (empty for `Unknown`)
#[must_use]
pub const fn price_rules(platform: Platform) -> &'static [Rule] {
    match platform {
        Platform::Amazon => AMAZON_PRICE,
        Platform::Flipkart => FLIPKART_PRICE,
        Platform::Meesho => MEESHO_PRICE,
        Platform::Unknown => &[],
    }
}

/// Platform image cascade, consulted when no meta image is present
#[must_use]
pub const fn image_rules(platform: Platform) -> &'static [Rule] {
    match platform {
        Platform::Amazon => AMAZON_IMAGE,
        Platform::Flipkart => FLIPKART_IMAGE,
        Platform::Meesho => MEESHO_IMAGE,
        Platform::Unknown => &[],
    }
}

/// Every table, shared and per-platform
pub fn all_tables() -> impl Iterator<Item = &'static [Rule]> {
    [TITLE, META_IMAGE].into_iter().chain(
        [Platform::Amazon, Platform::Flipkart, Platform::Meesho]
            .into_iter()
            .flat_map(|p| [price_rules(p), image_rules(p)]),
    )
}
