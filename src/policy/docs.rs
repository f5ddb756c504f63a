//! Policy for versioned documentation sites.
//!
//! Encodes the house rules of a docs site fronted by deploy previews:
//! canonicals must point at the production domain, internal links must stay
//! relative so previews keep working, and links must not silently jump
//! between documentation versions. Also suppresses broken-link noise from
//! hosts that answer crawlers with junk status codes.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{Policy, Ugly};
use crate::extract::Link;
use crate::urlref::{netloc, urlpath, UrlRef};

static HTTP_5XX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^HTTP_5[0-9]{2}$").expect("SAFETY: hardcoded regex is statically valid")
});

static CANONICAL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"link[rel~="canonical"]"#).expect("SAFETY: hardcoded selector is valid")
});

pub struct DocsPolicy {
    domain: String,
    internal_suffixes: Vec<String>,
    skip_refs: Vec<String>,
    user_agents: HashMap<String, String>,
}

impl DocsPolicy {
    /// `domain` is the authority being checked (`host` or `host:port`);
    /// canonicals are expected to point at it.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            internal_suffixes: Vec::new(),
            skip_refs: Vec::new(),
            user_agents: HashMap::new(),
        }
    }

    /// Domain suffixes (e.g. `.example.com`) that count as internal beyond
    /// the exact target domain.
    #[must_use]
    pub fn with_internal_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.internal_suffixes = suffixes;
        self
    }

    /// Exact `ref` strings to drop before verification.
    #[must_use]
    pub fn with_skip_refs(mut self, refs: Vec<String>) -> Self {
        self.skip_refs = refs;
        self
    }

    /// Per-host User-Agent override.
    #[must_use]
    pub fn with_user_agent(mut self, host: impl Into<String>, agent: impl Into<String>) -> Self {
        self.user_agents.insert(host.into(), agent.into());
        self
    }

    /// `resolved` rewritten onto the production domain over https.
    fn on_production(&self, resolved: &str) -> String {
        match Url::parse(resolved) {
            Ok(u) => {
                let mut s = format!("https://{}{}", self.domain, u.path());
                if let Some(query) = u.query() {
                    s.push('?');
                    s.push_str(query);
                }
                if let Some(frag) = u.fragment() {
                    s.push('#');
                    s.push_str(frag);
                }
                s
            }
            Err(_) => resolved.to_string(),
        }
    }
}

/// `resolved` with scheme and authority stripped.
fn strip_origin(resolved: &str) -> String {
    match Url::parse(resolved) {
        Ok(u) => {
            let mut s = u.path().to_string();
            if let Some(query) = u.query() {
                s.push('?');
                s.push_str(query);
            }
            if let Some(frag) = u.fragment() {
                s.push('#');
                s.push_str(frag);
            }
            s
        }
        Err(_) => resolved.to_string(),
    }
}

/// The docs version a URL lives under: `/docs/2.0/…` → `2.0`, bare `/docs`
/// → `latest`, anything else → not a docs URL.
fn docs_version(url: &UrlRef) -> Option<String> {
    let resolved = url.resolved().ok()?;
    let path = Url::parse(&resolved).ok()?.path().to_string();
    if !(path.starts_with("/docs/") || path == "/docs") {
        return None;
    }
    let parts: Vec<&str> = path.splitn(4, '/').collect();
    if parts.len() >= 3 {
        Some(parts[2].to_string())
    } else {
        Some("latest".to_string())
    }
}

impl Policy for DocsPolicy {
    fn should_skip_link(&self, link: &Link) -> bool {
        self.skip_refs.iter().any(|r| r == link.linkurl.raw())
    }

    fn should_skip_link_result(&self, link: &Link, reason: &str) -> bool {
        if HTTP_5XX.is_match(reason) {
            return true;
        }
        let resolved = link.linkurl.resolved_or_raw();
        if reason == "HTTP_204"
            && (resolved.starts_with("https://www.youtube.com/")
                || resolved.starts_with("https://youtu.be/"))
        {
            return true;
        }
        if reason == "HTTP_999" && resolved.starts_with("https://www.linkedin.com/") {
            return true;
        }
        // a canonical that points at the page itself will 404 on previews;
        // that is the production URL doing its job, not a broken link
        if let Some(el) = &link.html {
            if el.tag == "link"
                && el.attr.as_deref() == Some("href")
                && el.rel_contains("canonical")
                && urlpath(&resolved) == urlpath(&link.pageurl.resolved_or_raw())
            {
                return true;
            }
        }
        false
    }

    fn ugly_checks(&self, link: &Link) -> Vec<Ugly> {
        let mut out = Vec::new();
        let ref_netloc = netloc(link.linkurl.raw());
        let resolved = link.linkurl.resolved_or_raw();
        let is_canonical = link
            .html
            .as_ref()
            .is_some_and(|el| el.tag == "link" && el.rel_contains("canonical"));

        if is_canonical {
            // Canonicals must name production so deploy previews don't
            // devalue the real site. They are allowed to be cross-version.
            if ref_netloc != self.domain {
                out.push(Ugly::with_suggestion(
                    format!("is a canonical but does not point at {}", self.domain),
                    self.on_production(&resolved),
                ));
            }
        } else if self.is_internal_domain(&ref_netloc) {
            // Internal links must not mention the scheme or domain, so they
            // keep working in previews.
            out.push(Ugly::with_suggestion(
                "is an internal link but has a domain",
                strip_origin(&resolved),
            ));
        } else if ref_netloc.is_empty() {
            if let (Some(src), Some(dst)) = (docs_version(&link.pageurl), docs_version(&link.linkurl))
            {
                // an empty version segment (bare `/docs/`) never counts as
                // a version crossing
                if !src.is_empty() && !dst.is_empty() && src != dst {
                    out.push(Ugly::new(format!(
                        "is a link from docs version={src} to docs version={dst}"
                    )));
                }
            }
        }
        out
    }

    fn is_internal_domain(&self, netloc: &str) -> bool {
        netloc == self.domain
            || self
                .internal_suffixes
                .iter()
                .any(|suffix| netloc.ends_with(suffix))
    }

    fn check_document(&self, page_url: &UrlRef, doc: &Html) -> Vec<String> {
        if docs_version(page_url).is_none() {
            return Vec::new();
        }
        if doc.select(&CANONICAL_SELECTOR).next().is_none() {
            return vec!["does not have a canonical".to_string()];
        }
        Vec::new()
    }

    fn user_agent_overrides(&self) -> HashMap<String, String> {
        self.user_agents.clone()
    }
}
