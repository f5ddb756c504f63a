//! The pluggable decision surface the checker consults.
//!
//! The engine owns crawling, caching, and reporting; a [`Policy`] decides
//! what gets skipped, what counts as "ugly", which domains are "ours", and
//! may inspect whole documents after extraction. Every method has a no-op
//! default, so a unit struct is a valid policy.

pub mod docs;

use std::collections::HashMap;

use scraper::Html;

use crate::extract::Link;
use crate::urlref::UrlRef;

pub use docs::DocsPolicy;

/// A link that loads fine but violates a site rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ugly {
    pub reason: String,
    pub suggestion: Option<String>,
}

impl Ugly {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            suggestion: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            suggestion: Some(suggestion.into()),
        }
    }
}

pub trait Policy {
    /// Drop a discovered link before it is queued for verification.
    fn should_skip_link(&self, _link: &Link) -> bool {
        false
    }

    /// Suppress a broken-link report, e.g. for hosts known to answer
    /// crawlers with junk status codes.
    fn should_skip_link_result(&self, _link: &Link, _reason: &str) -> bool {
        false
    }

    /// Semantic complaints about a link that did load.
    fn ugly_checks(&self, _link: &Link) -> Vec<Ugly> {
        Vec::new()
    }

    /// Whether `netloc` belongs to the site being checked (beyond the exact
    /// target domain, e.g. sibling subdomains).
    fn is_internal_domain(&self, _netloc: &str) -> bool {
        false
    }

    /// Page-level complaints, run against the parsed document after link
    /// extraction. Each returned string is reported as `Page <url> <msg>`.
    fn check_document(&self, _page_url: &UrlRef, _doc: &Html) -> Vec<String> {
        Vec::new()
    }

    /// Per-host User-Agent overrides handed to the HTTP layer at startup.
    fn user_agent_overrides(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// The do-nothing policy: report everything, skip nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicPolicy;

impl Policy for BasicPolicy {}
