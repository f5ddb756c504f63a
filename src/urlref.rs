//! Lazy URL references.
//!
//! A `UrlRef` keeps the reference text exactly as it appeared in a document,
//! together with the reference it was found relative to. Resolution to an
//! absolute URL happens on demand, so a malformed `href` on a page is only an
//! error for the link that carries it, never for the page walk itself.

use std::sync::Arc;

use thiserror::Error;
use url::Url;

/// Failure to turn a reference into an absolute URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("could not resolve URL reference: {0}: is relative, and have no base for it to be relative to")]
    NoBase(String),
    #[error("could not resolve URL reference: {0}")]
    NotAbsolute(String),
}

/// An immutable URL reference with an optional base and an optional
/// pre-resolved form.
///
/// `parse()` builds a child whose base is `self`, so a chain of references
/// (page → `<base href>` → attribute value) stays intact and resolvable.
/// All mutation-shaped methods return a new `UrlRef`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlRef {
    raw: String,
    base: Option<Arc<UrlRef>>,
    resolved: Option<String>,
}

impl UrlRef {
    /// A root reference with no base, e.g. a seed URL.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            base: None,
            resolved: None,
        }
    }

    /// The reference text exactly as found.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn base(&self) -> Option<&UrlRef> {
        self.base.as_deref()
    }

    /// A child reference relative to `self`.
    #[must_use]
    pub fn parse(&self, raw: &str) -> UrlRef {
        UrlRef {
            raw: raw.to_string(),
            base: Some(Arc::new(self.clone())),
            resolved: None,
        }
    }

    /// A copy whose resolved form is pinned, used after following redirects.
    #[must_use]
    pub fn with_resolved(&self, resolved: impl Into<String>) -> UrlRef {
        UrlRef {
            raw: self.raw.clone(),
            base: self.base.clone(),
            resolved: Some(resolved.into()),
        }
    }

    /// The absolute form of this reference.
    ///
    /// Returns the pinned form if one was set; otherwise the raw text when it
    /// is already absolute; otherwise the raw text joined onto the resolved
    /// base.
    pub fn resolved(&self) -> Result<String, ResolveError> {
        if let Some(resolved) = &self.resolved {
            return Ok(resolved.clone());
        }
        if Url::parse(&self.raw).is_ok() {
            return Ok(self.raw.clone());
        }
        let base = self
            .base
            .as_ref()
            .ok_or_else(|| ResolveError::NoBase(self.raw.clone()))?;
        let base_resolved = base.resolved()?;
        let joined = Url::parse(&base_resolved)
            .and_then(|b| b.join(&self.raw))
            .map_err(|_| ResolveError::NotAbsolute(format!("{base_resolved} + {}", self.raw)))?;
        Ok(joined.to_string())
    }

    /// `resolved()`, falling back to the raw text for display purposes.
    #[must_use]
    pub fn resolved_or_raw(&self) -> String {
        self.resolved().unwrap_or_else(|_| self.raw.clone())
    }
}

/// Strip the `#fragment` suffix. The defragmented form is the canonical key
/// for caching, dedup, and done-tracking.
#[must_use]
pub fn defragment(url: &str) -> &str {
    match url.split_once('#') {
        Some((head, _)) => head,
        None => url,
    }
}

/// The non-empty fragment of a URL, if any.
#[must_use]
pub fn fragment(url: &str) -> Option<&str> {
    match url.split_once('#') {
        Some((_, frag)) if !frag.is_empty() => Some(frag),
        _ => None,
    }
}

/// The authority (`host` or `host:port`) of an absolute or protocol-relative
/// URL, or `""` when the input has none. Mirrors how reporting and policy
/// code compare "which site does this point at".
#[must_use]
pub fn netloc(url: &str) -> String {
    let parsed = if url.starts_with("//") {
        Url::parse(&format!("http:{url}"))
    } else {
        Url::parse(url)
    };
    match parsed {
        Ok(u) => match (u.host_str(), u.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        },
        Err(_) => String::new(),
    }
}

/// The path component of an absolute URL, or `""` when unparseable.
#[must_use]
pub fn urlpath(url: &str) -> String {
    Url::parse(url).map_or_else(|_| String::new(), |u| u.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_ref_resolves_to_itself() {
        let u = UrlRef::new("https://example.com/a");
        assert_eq!(u.resolved().unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_relative_ref_without_base_fails() {
        let u = UrlRef::new("/a");
        assert!(matches!(u.resolved(), Err(ResolveError::NoBase(_))));
    }

    #[test]
    fn test_parse_chain_joins_against_base() {
        let page = UrlRef::new("https://example.com/dir/page.html");
        let link = page.parse("../other");
        assert_eq!(link.resolved().unwrap(), "https://example.com/other");
    }

    #[test]
    fn test_chained_parse_matches_direct_join() {
        let root = UrlRef::new("https://example.com/docs/2.0/index.html");
        let via_chain = root.parse("guide/").parse("intro").resolved().unwrap();
        let direct = Url::parse("https://example.com/docs/2.0/guide/")
            .unwrap()
            .join("intro")
            .unwrap();
        assert_eq!(via_chain, direct.to_string());
    }

    #[test]
    fn test_resolved_override_wins() {
        let u = UrlRef::new("https://example.com/a").with_resolved("https://example.com/b");
        assert_eq!(u.resolved().unwrap(), "https://example.com/b");
        assert_eq!(u.raw(), "https://example.com/a");
    }

    #[test]
    fn test_defragment_and_fragment() {
        assert_eq!(defragment("https://e.com/p#x"), "https://e.com/p");
        assert_eq!(defragment("https://e.com/p"), "https://e.com/p");
        assert_eq!(fragment("https://e.com/p#x"), Some("x"));
        assert_eq!(fragment("https://e.com/p#"), None);
        assert_eq!(fragment("https://e.com/p"), None);
    }

    #[test]
    fn test_netloc() {
        assert_eq!(netloc("http://localhost:9000/x"), "localhost:9000");
        assert_eq!(netloc("https://example.com/x"), "example.com");
        assert_eq!(netloc("//cdn.example.com/x"), "cdn.example.com");
        assert_eq!(netloc("/relative/path"), "");
    }
}
