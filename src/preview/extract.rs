//! Field extraction over a parsed product page

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::rules::{self, Rule, Source};
use super::{Platform, PreviewResult};

/// Images declaring a width or height at or below this are skipped by the fallback scan
const MIN_FALLBACK_DIMENSION: i64 = 200;

/// Amazon size/crop segment in image file names, e.g. `._AC_SX300_SY300_`
static AMAZON_SIZE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\._AC_[^.]*").expect("valid regex"));

/// Every rule selector, parsed once
static SELECTORS: LazyLock<HashMap<&'static str, Selector>> = LazyLock::new(|| {
    rules::all_tables()
        .flatten()
        .filter_map(|rule| match Selector::parse(rule.selector) {
            Ok(selector) => Some((rule.selector, selector)),
            Err(e) => {
                tracing::warn!(selector = rule.selector, error = %e, "skipping bad selector");
                None
            }
        })
        .collect()
});

static IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));

/// Parse an HTML page and extract the preview fields
#[must_use]
pub fn extract_html(html: &str, base: &Url, platform: Platform) -> PreviewResult {
    let document = Html::parse_document(html);
    extract(&document, base, platform)
}

/// Extract title, price and image from a parsed document
#[must_use]
pub fn extract(document: &Html, base: &Url, platform: Platform) -> PreviewResult {
    let title = first_match(document, rules::TITLE, normalize_whitespace);
    let price = first_match(document, rules::price_rules(platform), normalize_whitespace);

    let image = first_match(document, rules::META_IMAGE, non_empty)
        .or_else(|| {
            first_match(document, rules::image_rules(platform), non_empty)
                .map(|src| upscale_platform_image(platform, &src))
        })
        .or_else(|| fallback_image(document))
        .and_then(|src| absolutize(&src, base));

    PreviewResult {
        image,
        title,
        price,
        platform: Some(platform),
    }
}

/// Walk a cascade and return the first value that survives `clean`
fn first_match(
    document: &Html,
    cascade: &[Rule],
    clean: fn(&str) -> Option<String>,
) -> Option<String> {
    cascade.iter().find_map(|rule| {
        let element = document.select(SELECTORS.get(rule.selector)?).next()?;
        match rule.source {
            Source::Attr(name) => element.value().attr(name).and_then(clean),
            Source::Text => clean(&element.text().collect::<String>()),
        }
    })
}

/// Trim and collapse internal whitespace runs to a single space
#[must_use]
pub fn normalize_whitespace(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Ask Amazon's image CDN for the 1500px rendition
fn upscale_platform_image(platform: Platform, src: &str) -> String {
    if platform == Platform::Amazon && src.contains("._AC_") {
        AMAZON_SIZE_SEGMENT.replace(src, "._AC_SL1500_").into_owned()
    } else {
        src.to_string()
    }
}

/// First `<img>` with a `src` whose declared size (if any) is large enough
fn fallback_image(document: &Html) -> Option<String> {
    document
        .select(&IMG)
        .filter(|img| {
            is_large_enough(declared_dimension(img, "width"))
                && is_large_enough(declared_dimension(img, "height"))
        })
        .find_map(|img| img.value().attr("src").and_then(non_empty))
}

/// Dimension from the attribute, falling back to the inline style
fn declared_dimension<'a>(img: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    let element = img.value();
    element
        .attr(name)
        .filter(|v| !v.is_empty())
        .or_else(|| element.attr("style").and_then(|style| style_property(style, name)))
}

fn style_property<'a>(style: &'a str, name: &str) -> Option<&'a str> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}

/// Undeclared passes; declared must start with a number above the minimum
fn is_large_enough(dimension: Option<&str>) -> bool {
    dimension.is_none_or(|value| leading_integer(value).is_some_and(|n| n > MIN_FALLBACK_DIMENSION))
}

/// Integer prefix of a CSS/HTML length such as `300px` or ` 250`
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let digits_start = usize::from(value.starts_with(['-', '+']));
    let digits_len = value[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    value[..digits_start + digits_len].parse().ok()
}

/// Turn an extracted image reference into an absolute URL
///
/// Protocol-relative references get `https:`; anything else not already
/// absolute is joined onto the page URL.
#[must_use]
pub fn absolutize(src: &str, base: &Url) -> Option<String> {
    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_string());
    }
    if src.starts_with("//") {
        return Some(format!("https:{src}"));
    }
    base.join(src).ok().map(String::from)
}
