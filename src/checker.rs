//! Crawl orchestration.
//!
//! One logical worker drains the task queue: page tasks are fetched,
//! extracted, and fan out into link tasks; link tasks are fetched and
//! verified (fragment included), then reported through the policy. Links
//! whose resolved authority is the target domain are re-queued as page tasks,
//! which is what makes the crawl transitive.
//!
//! The worker is cooperative and single-threaded: the only suspension points
//! are the HTTP fetch and the explicit backoff sleep, so all checker state is
//! plain owned data.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use scraper::Html;

use crate::extract::{css, headers, html, js, Link};
use crate::fragment;
use crate::http::{HttpCache, Response, RetryAfter};
use crate::policy::Policy;
use crate::report::{Reporter, RunStats};
use crate::scheduler::{Scheduler, Task};
use crate::urlref::{self, defragment, netloc, UrlRef};

/// Content types that legitimately carry no checkable references.
const OPAQUE_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/manifest+json",
    "image/svg+xml",
    "application/pdf",
    "application/x-yaml",
    "image/jpeg",
    "image/png",
];

/// A fetched-and-parsed page body, cached per defragmented URL so fragment
/// checks never re-parse (or re-fetch) a page the crawl already has.
enum Body {
    Doc(Html),
    Err(String),
}

pub struct Checker<P: Policy> {
    policy: P,
    domain: String,
    http: HttpCache,
    sched: Scheduler,
    bodies: HashMap<String, Body>,
    reporter: Reporter,
}

impl<P: Policy> Checker<P> {
    /// `domain` is the authority (`host` or `host:port`) whose pages are
    /// crawled transitively; everything else is link-checked only.
    pub fn new(domain: impl Into<String>, policy: P) -> anyhow::Result<Self> {
        let mut http = HttpCache::new()?;
        http.set_host_agents(policy.user_agent_overrides());
        Ok(Self {
            policy,
            domain: domain.into(),
            http,
            sched: Scheduler::new(),
            bodies: HashMap::new(),
            reporter: Reporter::new(),
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.http.set_timeout(timeout);
    }

    /// Queue a page to crawl before `run()`.
    pub fn add_seed(&mut self, url: &str) {
        self.sched.enqueue_page(UrlRef::new(url));
    }

    #[must_use]
    pub fn stats(&self) -> &RunStats {
        self.reporter.stats()
    }

    pub fn print_summary(&self) {
        self.reporter.summary();
    }

    /// Drain the queue. Tasks whose host is cooling down are pushed to the
    /// tail while other work is ready; the worker sleeps only when every
    /// queued task is waiting on a deadline.
    pub async fn run(&mut self) {
        while let Some(task) = self.sched.pop() {
            let now = Instant::now();
            if let Some(host) = task.host() {
                if !self.sched.host_ready(&host, now) {
                    if self.sched.any_ready(now) {
                        self.sched.push_back(task);
                        continue;
                    }
                    if let Some(sleep) = self.sched.next_sleep(now) {
                        self.reporter.sleeping(sleep.as_secs_f64().ceil() as u64);
                        tokio::time::sleep(sleep).await;
                    }
                    self.sched.push_back(task);
                    continue;
                }
            }
            let outcome = match &task {
                Task::Page(page) => self.check_page(page.clone()).await,
                Task::Link(link) => self.check_link(link.clone()).await,
            };
            if let Err(retry) = outcome {
                self.reporter.backoff(&retry);
                let host = netloc(&retry.url);
                if !host.is_empty() {
                    self.sched
                        .defer_host(host, Instant::now() + Duration::from_secs(retry.secs));
                }
                self.sched.push_back(task);
            }
        }
    }

    /// Fetch `url`, mapping every failure mode except `RetryAfter` to a
    /// broken-link reason string. 429s without a usable deadline and 5xx also
    /// count as page errors, matching how operators triage runs.
    async fn get_resp(&mut self, url: &str) -> Result<Result<Response, String>, RetryAfter> {
        match self.http.get(url, &mut self.reporter).await {
            Ok(resp) if resp.status == 200 => Ok(Ok(resp)),
            Ok(resp) => {
                let reason = format!("HTTP_{}", resp.status);
                if resp.status == 429 || resp.status / 100 == 5 {
                    self.reporter.page_error(url, &reason);
                }
                Ok(Err(reason))
            }
            Err(crate::http::FetchError::RetryAfter(retry)) => Err(retry),
            Err(crate::http::FetchError::Timeout) => {
                self.reporter.timeout(url, "HTTP_TIMEOUT");
                Ok(Err("HTTP_TIMEOUT".to_string()))
            }
            Err(crate::http::FetchError::Transport(msg)) => {
                self.reporter.page_error(url, &msg);
                Ok(Err(msg))
            }
        }
    }

    /// Fetch-and-parse into the body cache, keyed by defragmented URL.
    async fn ensure_body(&mut self, url: &str) -> Result<(), RetryAfter> {
        let key = defragment(url).to_string();
        if self.bodies.contains_key(&key) {
            return Ok(());
        }
        let entry = match self.get_resp(url).await? {
            Ok(resp) => {
                if resp.content_type_essence() == "text/html" {
                    Body::Doc(Html::parse_document(&resp.body))
                } else {
                    Body::Err(format!(
                        "unknown Content-Type: {}",
                        resp.content_type_essence()
                    ))
                }
            }
            Err(reason) => Body::Err(reason),
        };
        self.bodies.insert(key, entry);
        Ok(())
    }

    async fn check_page(&mut self, page_url: UrlRef) -> Result<(), RetryAfter> {
        let url = match page_url.resolved() {
            Ok(url) => url,
            Err(e) => {
                self.reporter.page_error(page_url.raw(), &e.to_string());
                return Ok(());
            }
        };
        let resp = match self.get_resp(&url).await? {
            Ok(resp) => resp,
            Err(reason) => {
                let clean = defragment(&url).to_string();
                self.sched.mark_done(clean.clone());
                self.reporter.page_starting(&clean);
                self.reporter.page_error(&clean, &reason);
                return Ok(());
            }
        };

        let page_url = page_url.with_resolved(resp.url.clone());
        let clean = defragment(&resp.url).to_string();
        if self.sched.is_done(&clean) {
            return Ok(());
        }
        // The whole redirect chain becomes done in one step, so a hop URL
        // later discovered as a link is not re-walked.
        for hop in &resp.redirects {
            self.sched.mark_done(defragment(hop).to_string());
        }
        self.sched.mark_done(clean.clone());

        self.reporter.page_starting(&clean);

        // References can arrive in headers as well as bodies.
        let mut header_links: Vec<Link> = Vec::new();
        if let Some(value) = &resp.link_header {
            for href in headers::link_header_urls(value) {
                header_links.push(Link::new(page_url.parse(&href), page_url.clone(), None));
            }
        }
        if let Some(sourcemap) = &resp.sourcemap_header {
            header_links.push(Link::new(page_url.parse(sourcemap), page_url.clone(), None));
        }
        for link in header_links {
            self.handle_link(link);
        }

        match resp.content_type_essence().as_str() {
            "text/html" => {
                self.ensure_body(&clean).await?;
                let (extraction, complaints) = match self.bodies.get(&clean) {
                    Some(Body::Doc(doc)) => (
                        html::extract(&page_url, doc),
                        self.policy.check_document(&page_url, doc),
                    ),
                    Some(Body::Err(err)) => {
                        let err = err.clone();
                        self.reporter.page_error(&clean, &err);
                        return Ok(());
                    }
                    None => return Ok(()),
                };
                if let Some(err) = extraction.errors.first() {
                    self.reporter.page_error(&clean, err);
                }
                for complaint in complaints {
                    self.reporter.page_complaint(&clean, &complaint);
                }
                for link in extraction.links {
                    self.handle_link(link);
                }
            }
            "text/css" => {
                let (urls, errors) = css::stylesheet_urls(&resp.body);
                if let Some(err) = errors.first() {
                    self.reporter.page_error(&clean, err);
                }
                for url_str in urls {
                    self.handle_link(Link::new(page_url.parse(&url_str), page_url.clone(), None));
                }
            }
            "application/javascript" => {
                for url_str in js::javascript_urls(&resp.body) {
                    self.handle_link(Link::new(page_url.parse(&url_str), page_url.clone(), None));
                }
            }
            essence if OPAQUE_CONTENT_TYPES.contains(&essence) => {}
            essence => {
                self.reporter
                    .page_error(&clean, &format!("unknown Content-Type: {essence}"));
            }
        }
        Ok(())
    }

    fn handle_link(&mut self, link: Link) {
        if self.policy.should_skip_link(&link) {
            debug!(target: "sitecheck::checker", "skipping link {}", link.linkurl.raw());
            return;
        }
        self.sched.enqueue_link(link);
    }

    async fn check_link(&mut self, mut link: Link) -> Result<(), RetryAfter> {
        let broken = self.link_broken_reason(&mut link).await?;
        self.reporter.link_checked();
        match broken {
            Some(reason) => {
                if !self.policy.should_skip_link_result(&link, &reason) {
                    self.reporter.broken(&link, &reason);
                }
            }
            None => {
                for ugly in self.policy.ugly_checks(&link) {
                    self.reporter
                        .ugly(&link, &ugly.reason, ugly.suggestion.as_deref());
                }
                if netloc(&link.linkurl.resolved_or_raw()) == self.domain {
                    self.sched.enqueue_page(link.linkurl.clone());
                }
            }
        }
        Ok(())
    }

    async fn link_broken_reason(&mut self, link: &mut Link) -> Result<Option<String>, RetryAfter> {
        let url = match link.linkurl.resolved() {
            Ok(url) => url,
            Err(e) => {
                // A reference that cannot be made absolute is a defect of
                // the page that carries it.
                let msg = e.to_string();
                self.reporter
                    .page_error(&link.pageurl.resolved_or_raw(), &msg);
                return Ok(Some(msg));
            }
        };
        let resp = match self.get_resp(&url).await? {
            Ok(resp) => resp,
            Err(reason) => return Ok(Some(reason)),
        };
        link.linkurl = link.linkurl.with_resolved(resp.url.clone());

        if let Some(frag) = urlref::fragment(&resp.url).map(str::to_string) {
            self.ensure_body(&resp.url).await?;
            match self.bodies.get(defragment(&resp.url)) {
                Some(Body::Doc(doc)) => {
                    if !fragment::exists(doc, &frag) {
                        return Ok(Some(fragment::missing_reason(&frag)));
                    }
                }
                Some(Body::Err(err)) => return Ok(Some(format!("fragment: {err}"))),
                None => {}
            }
        }
        Ok(None)
    }
}
