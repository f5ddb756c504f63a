//! HTTP fetching with a content-addressed response cache.
//!
//! The cache wraps a redirect-disabled `reqwest` client so that it owns the
//! whole redirect walk: every hop is cached (and served) individually, keyed
//! by `GET <defragmented-url>`, which is what makes the "at most one network
//! GET per URL per run" guarantee hold across pages, links, and fragment
//! checks. Throttling (429 + numeric `Retry-After`) and redirect loops are
//! surfaced as a [`RetryAfter`] signal for the scheduler instead of an error;
//! the client never sleeps.

pub mod data_uri;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context as _;
use log::debug;
use reqwest::redirect;
use thiserror::Error;
use url::Url;

use crate::urlref::defragment;

/// User-Agent sent when the `USER_AGENT` environment variable is unset and no
/// per-host override applies.
pub const DEFAULT_USER_AGENT: &str = "github.com/datawire/getambassador.io-blc2";

/// Per-request timeout applied to every network hit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 10;

/// Scheduling signal carried out of the transport: the host serving `url`
/// asked us to come back in `secs` seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAfter {
    pub url: String,
    pub secs: u64,
}

/// Failure modes of a fetch.
///
/// `RetryAfter` is not a fetch failure: the scheduler defers the whole task
/// and retries it later, and it never becomes a broken-link reason.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("backoff: {}: retry after {} seconds", .0.url, .0.secs)]
    RetryAfter(RetryAfter),
    #[error("HTTP_TIMEOUT")]
    Timeout,
    #[error("{0}")]
    Transport(String),
}

/// Observer of cache-missing requests; invoked exactly once per network hit.
pub trait RequestObserver {
    fn request_starting(&mut self, url: &str);
}

/// A fetched resource: final status, body text, the response headers the
/// checker cares about, and the redirect hops that led here.
#[derive(Debug, Clone)]
pub struct Response {
    /// The URL this response answers (rewritten on cache hits).
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Redirect hop URLs, oldest first; empty unless `get()` followed hops.
    pub redirects: Vec<String>,
    pub link_header: Option<String>,
    pub sourcemap_header: Option<String>,
    pub retry_after: Option<String>,
    pub location: Option<String>,
}

impl Response {
    /// A locally synthesized 200, used by non-network transports.
    #[must_use]
    pub fn synthetic(url: &str, content_type: String, body: String) -> Self {
        Self {
            url: url.to_string(),
            status: 200,
            content_type: Some(content_type),
            body,
            redirects: Vec::new(),
            link_header: None,
            sourcemap_header: None,
            retry_after: None,
            location: None,
        }
    }

    /// The lowercased mime essence of the Content-Type header, defaulting to
    /// `text/plain` when the header is missing.
    #[must_use]
    pub fn content_type_essence(&self) -> String {
        self.content_type
            .as_deref()
            .unwrap_or("text/plain")
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308) && self.location.is_some()
    }

    fn redirect_target(&self) -> Option<String> {
        if self.is_redirect() {
            self.location.clone()
        } else {
            None
        }
    }
}

/// A non-HTTP scheme handler, e.g. for `data:` URLs.
pub trait Transport {
    fn fetch(&self, url: &str) -> Result<Response, FetchError>;
}

/// GET-deduplicating HTTP session.
///
/// Cached responses are owned values: a hit returns a clone with `url`
/// rewritten to the current request, so callers may freely mutate what they
/// get back without disturbing the cache.
pub struct HttpCache {
    client: reqwest::Client,
    cache: HashMap<String, Response>,
    transports: HashMap<String, Box<dyn Transport>>,
    default_agent: String,
    host_agents: HashMap<String, String>,
    timeout: Duration,
}

impl HttpCache {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .context("failed to build HTTP client")?;
        let mut transports: HashMap<String, Box<dyn Transport>> = HashMap::new();
        transports.insert("data".to_string(), Box::new(data_uri::DataUriTransport));
        let default_agent =
            std::env::var("USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        Ok(Self {
            client,
            cache: HashMap::new(),
            transports,
            default_agent,
            host_agents: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Replace the per-host User-Agent overrides.
    pub fn set_host_agents(&mut self, agents: HashMap<String, String>) {
        self.host_agents = agents;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// GET `url`, following redirects hop by hop; returns the final response
    /// with the hop URLs in `redirects`.
    pub async fn get(
        &mut self,
        url: &str,
        observer: &mut dyn RequestObserver,
    ) -> Result<Response, FetchError> {
        let mut current = url.to_string();
        let mut chain: Vec<String> = Vec::new();
        loop {
            let mut resp = self.send_one(&current, observer).await?;
            let Some(location) = resp.redirect_target() else {
                resp.redirects = chain;
                return Ok(resp);
            };
            let next = resolve_location(&current, &location)?;
            let current_normalized = Url::parse(&current)
                .map_or_else(|_| current.clone(), |u| u.to_string());
            if next == current_normalized {
                // A Location pointing back at the request URL would loop
                // forever; treat it like throttling and come back later.
                return Err(FetchError::RetryAfter(RetryAfter {
                    url: current,
                    secs: 60,
                }));
            }
            chain.push(current);
            if chain.len() > MAX_REDIRECTS {
                return Err(FetchError::Transport(format!(
                    "too many redirects (> {MAX_REDIRECTS}) for {url}"
                )));
            }
            current = next;
        }
    }

    async fn send_one(
        &mut self,
        url: &str,
        observer: &mut dyn RequestObserver,
    ) -> Result<Response, FetchError> {
        let key = format!("GET {}", defragment(url));
        if let Some(hit) = self.cache.get(&key) {
            debug!(target: "sitecheck::http", "cache hit: {key}");
            let mut resp = hit.clone();
            resp.url = url.to_string();
            resp.redirects.clear();
            return Ok(resp);
        }

        observer.request_starting(url);

        if let Some((scheme, _)) = url.split_once(':') {
            if let Some(transport) = self.transports.get(scheme) {
                let resp = transport.fetch(url)?;
                self.cache.insert(key, resp.clone());
                return Ok(resp);
            }
        }

        let parsed = Url::parse(url)
            .map_err(|e| FetchError::Transport(format!("invalid URL {url}: {e}")))?;
        let agent = parsed
            .host_str()
            .and_then(|host| self.host_agents.get(host))
            .unwrap_or(&self.default_agent)
            .clone();
        let sent = self
            .client
            .get(parsed.clone())
            .header(reqwest::header::USER_AGENT, agent)
            .timeout(self.timeout)
            .send()
            .await;
        let upstream = match sent {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(FetchError::Timeout),
            Err(e) => return Err(FetchError::Transport(e.to_string())),
        };

        let status = upstream.status().as_u16();
        let headers = upstream.headers();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let retry_after = header("retry-after");
        if status == 429 {
            if let Some(secs) = retry_after
                .as_deref()
                .and_then(|s| s.trim().parse::<u64>().ok())
            {
                // Not cached: the next attempt should hit the network.
                return Err(FetchError::RetryAfter(RetryAfter {
                    url: url.to_string(),
                    secs,
                }));
            }
        }
        let content_type = header("content-type");
        let link_header = header("link");
        let sourcemap_header = header("sourcemap");
        let location = header("location");

        let body = match upstream.text().await {
            Ok(b) => b,
            Err(e) if e.is_timeout() => return Err(FetchError::Timeout),
            Err(e) => return Err(FetchError::Transport(e.to_string())),
        };

        let resp = Response {
            url: url.to_string(),
            status,
            content_type,
            body,
            redirects: Vec::new(),
            link_header,
            sourcemap_header,
            retry_after,
            location,
        };
        // Redirects from parameterized URLs are not cached, so redirectors
        // keyed on the query string get a fresh hop every time. Anything on
        // localhost is ours and stable.
        if !resp.is_redirect() || url.contains("//localhost") || parsed.query().is_none() {
            self.cache.insert(key, resp.clone());
        }
        Ok(resp)
    }
}

fn resolve_location(current: &str, location: &str) -> Result<String, FetchError> {
    Url::parse(current)
        .and_then(|u| u.join(location))
        .map(|u| u.to_string())
        .map_err(|e| {
            FetchError::Transport(format!("unresolvable Location {location} from {current}: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_essence() {
        let mut resp = Response::synthetic("x:", "text/html; charset=utf-8".to_string(), String::new());
        assert_eq!(resp.content_type_essence(), "text/html");
        resp.content_type = None;
        assert_eq!(resp.content_type_essence(), "text/plain");
    }

    #[test]
    fn test_is_redirect_needs_location() {
        let mut resp = Response::synthetic("x:", "text/html".to_string(), String::new());
        resp.status = 302;
        assert!(!resp.is_redirect());
        resp.location = Some("/b".to_string());
        assert!(resp.is_redirect());
    }

    #[test]
    fn test_resolve_location_relative() {
        assert_eq!(
            resolve_location("http://e.com/a/b", "../c").unwrap(),
            "http://e.com/c"
        );
    }
}
