//! HTML link extraction.
//!
//! The tag/attribute matrix is the union of the whatwg link-bearing
//! attributes. It is iterated in a fixed order so that extraction is
//! deterministic: matrix order outer, document order inner.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::{css, ElementRef, Extraction, Link};
use crate::urlref::UrlRef;

/// Link-bearing attributes per tag.
const TAG_ATTRS: &[(&str, &[&str])] = &[
    ("*", &["itemtype"]),
    ("a", &["href", "ping"]),
    ("applet", &["archive", "code", "codebase", "object", "src"]),
    ("area", &["href", "ping"]),
    ("audio", &["src"]),
    ("blockquote", &["cite"]),
    ("body", &["background"]),
    ("button", &["formaction"]),
    ("del", &["cite"]),
    ("embed", &["src"]),
    ("form", &["action"]),
    ("frame", &["longdesc", "src"]),
    ("head", &["profile"]),
    ("html", &["manifest"]),
    ("iframe", &["longdesc", "src"]),
    ("img", &["longdesc", "src", "srcset"]),
    ("input", &["formaction", "src"]),
    ("ins", &["cite"]),
    ("link", &["href"]),
    ("menuitem", &["icon"]),
    ("meta", &["content"]),
    ("object", &["codebase", "data"]),
    ("q", &["cite"]),
    ("script", &["src"]),
    ("source", &["src", "srcset"]),
    ("table", &["background"]),
    ("tbody", &["background"]),
    ("td", &["background"]),
    ("tfoot", &["background"]),
    ("th", &["background"]),
    ("thead", &["background"]),
    ("tr", &["background"]),
    ("track", &["src"]),
    ("video", &["poster", "src"]),
];

static MATRIX: Lazy<Vec<(&'static str, &'static str, Selector)>> = Lazy::new(|| {
    TAG_ATTRS
        .iter()
        .flat_map(|(tag, attrs)| attrs.iter().map(move |attr| (*tag, *attr)))
        .map(|(tag, attr)| {
            let selector = Selector::parse(&format!("{tag}[{attr}]"))
                .expect("SAFETY: selectors built from the hardcoded tag/attr matrix are valid");
            (tag, attr, selector)
        })
        .collect()
});

static BASE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("base[href]").expect("SAFETY: hardcoded selector is valid")
});

static STYLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("style").expect("SAFETY: hardcoded selector is valid"));

// https://html.spec.whatwg.org/multipage/semantics.html#attr-meta-http-equiv-refresh
static META_REFRESH_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[0-9.]*\s*[;,]?\s*(?:[Uu][Rr][Ll]\s*=\s*)?")
        .expect("SAFETY: hardcoded regex is statically valid")
});

/// Pull every link out of a parsed HTML document.
///
/// The base for resolution starts as the page URL and switches to the first
/// `<base href>` (itself resolved against the page URL) for the rest of the
/// document. Inline `<style>` blocks go through the CSS extractor; their
/// parse complaints land in `Extraction::errors`.
#[must_use]
pub fn extract(page_url: &UrlRef, doc: &Html) -> Extraction {
    let mut out = Extraction::default();

    let base_url = doc
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map_or_else(|| page_url.clone(), |href| page_url.parse(href));

    for (_, attr, selector) in MATRIX.iter() {
        for element in doc.select(selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            for url_str in attr_urls(attr, value, &element) {
                out.links.push(Link::new(
                    base_url.parse(&url_str),
                    page_url.clone(),
                    Some(element_ref(&element, attr)),
                ));
            }
        }
    }

    for element in doc.select(&STYLE_SELECTOR) {
        let text: String = element.text().collect();
        let (urls, errors) = css::stylesheet_urls(&text);
        for url_str in urls {
            out.links.push(Link::new(
                base_url.parse(&url_str),
                page_url.clone(),
                Some(element_ref(&element, "")),
            ));
        }
        out.errors.extend(errors);
    }

    out
}

/// The URL strings carried by one attribute value.
fn attr_urls(attr: &str, value: &str, element: &scraper::ElementRef<'_>) -> Vec<String> {
    match attr {
        "content" => {
            let http_equiv = element.value().attr("http-equiv").unwrap_or_default();
            if http_equiv.eq_ignore_ascii_case("refresh") {
                meta_refresh_url(value).into_iter().collect()
            } else {
                Vec::new()
            }
        }
        // https://html.spec.whatwg.org/multipage/links.html#ping
        "ping" => value.split_whitespace().map(str::to_string).collect(),
        // https://html.spec.whatwg.org/multipage/images.html#srcset-attributes
        "srcset" => value
            .split(',')
            .filter_map(|desc| desc.split_whitespace().next())
            .map(str::to_string)
            .collect(),
        _ => vec![value.to_string()],
    }
}

/// The URL of a `<meta http-equiv=refresh content=…>` directive, per the
/// whatwg parsing algorithm: optional seconds, optional `;`/`,`, optional
/// `url=`, then an optionally quoted URL.
#[must_use]
pub fn meta_refresh_url(content: &str) -> Option<String> {
    let stripped = META_REFRESH_PREFIX.replace(content, "");
    if stripped == content {
        return None;
    }
    let url = if let Some(rest) = stripped.strip_prefix('"') {
        rest.split('"').next().unwrap_or(rest)
    } else if let Some(rest) = stripped.strip_prefix('\'') {
        rest.split('\'').next().unwrap_or(rest)
    } else {
        stripped.as_ref()
    };
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

fn element_ref(element: &scraper::ElementRef<'_>, attr: &str) -> ElementRef {
    ElementRef {
        tag: element.value().name().to_string(),
        attr: if attr.is_empty() {
            None
        } else {
            Some(attr.to_string())
        },
        rel: element
            .value()
            .attr("rel")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        text: element.text().collect(),
    }
}
