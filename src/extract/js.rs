//! Link extraction from JavaScript comment conventions.
//!
//! Bundlers leave two references worth checking in emitted scripts: the
//! license banner (`/*! For license information please see app.js.LICENSE.txt */`)
//! and the trailing source-map pointer (`//# sourceMappingURL=app.js.map`,
//! legacy `//@` form included).

use once_cell::sync::Lazy;
use regex::Regex;

static LICENSE_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*! For license information please see (\S+) \*/")
        .expect("SAFETY: hardcoded regex is statically valid")
});

static SOURCE_MAPPING_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^//[#@]\s*sourceMappingURL=(\S+)\s*$")
        .expect("SAFETY: hardcoded regex is statically valid")
});

/// The URL references embedded in a script body, license banner first, then
/// the last source-map pointer.
#[must_use]
pub fn javascript_urls(body: &str) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(cap) = LICENSE_COMMENT.captures(body) {
        urls.push(cap[1].to_string());
    }
    if let Some(cap) = SOURCE_MAPPING_URL.captures_iter(body).last() {
        urls.push(cap[1].to_string());
    }
    urls
}
