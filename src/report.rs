//! Run reporting and counters.
//!
//! Report lines are product output and go to stdout; diagnostics go through
//! `log`. The counters feed the final `Summary:` block and the process exit
//! code.

use log::info;

use crate::extract::Link;
use crate::http::{RequestObserver, RetryAfter};
use crate::urlref::defragment;

/// Counters accumulated over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub requests: u64,
    pub pages: u64,
    pub errors: u64,
    pub links_total: u64,
    pub links_bad: u64,
    pub sleep_secs: u64,
}

impl RunStats {
    /// Whether the run should exit nonzero.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.errors + self.links_bad > 0
    }
}

/// Writes the fixed report-line formats and keeps the counters.
#[derive(Debug, Default)]
pub struct Reporter {
    stats: RunStats,
}

impl RequestObserver for Reporter {
    fn request_starting(&mut self, url: &str) {
        if !url.starts_with("data:") {
            println!("GET {}", defragment(url));
            self.stats.requests += 1;
        }
    }
}

impl Reporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn page_starting(&mut self, url: &str) {
        self.stats.pages += 1;
        info!(target: "sitecheck::checker", "Processing {url}");
    }

    pub fn page_error(&mut self, url: &str, err: &str) {
        self.stats.errors += 1;
        println!("error: {url}: {err}");
    }

    pub fn timeout(&mut self, url: &str, err: &str) {
        self.stats.errors += 1;
        println!("error: {url}: {err}");
    }

    pub fn broken(&mut self, link: &Link, reason: &str) {
        self.stats.links_bad += 1;
        println!(
            "Page {} has a broken link: \"{}\" ({reason})",
            link.pageurl.resolved_or_raw(),
            link.linkurl.raw()
        );
    }

    pub fn ugly(&mut self, link: &Link, reason: &str, suggestion: Option<&str>) {
        self.stats.links_bad += 1;
        let mut msg = format!(
            "Page {} has an ugly link: \"{}\" {reason}",
            link.pageurl.resolved_or_raw(),
            link.linkurl.raw()
        );
        if let Some(suggestion) = suggestion {
            msg.push_str(&format!(" (did you mean \"{suggestion}\"?)"));
        }
        println!("{msg}");
    }

    /// A page-level policy complaint, e.g. a docs page without a canonical.
    pub fn page_complaint(&mut self, url: &str, complaint: &str) {
        self.stats.links_bad += 1;
        println!("Page {url} {complaint}");
    }

    pub fn link_checked(&mut self) {
        self.stats.links_total += 1;
    }

    pub fn backoff(&mut self, retry: &RetryAfter) {
        println!(
            "backoff: {}: retrying after {} seconds",
            retry.url, retry.secs
        );
    }

    pub fn sleeping(&mut self, secs: u64) {
        self.stats.sleep_secs += secs;
        println!("backoff: sleeping for {secs} seconds");
    }

    pub fn summary(&self) {
        println!("Summary:");
        println!(
            "  Actions: Sent {} HTTP requests and slept for {} seconds in order to check {} links on {} pages",
            self.stats.requests, self.stats.sleep_secs, self.stats.links_total, self.stats.pages
        );
        println!(
            "  Results: Encountered {} errors and {} bad links",
            self.stats.errors, self.stats.links_bad
        );
    }
}
