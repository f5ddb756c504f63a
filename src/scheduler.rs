//! Task scheduling.
//!
//! One FIFO queue holds both task kinds: walk a page for links, or verify a
//! single link. Page tasks are deduplicated on their defragmented URL against
//! both the queued set and the done set; link tasks are never deduplicated,
//! because each reference is verified in the context of the page that carries
//! it.
//!
//! Per-host `not_before` deadlines implement 429 backoff: a cooling-down
//! task is pushed to the tail when other work is ready, and the worker only
//! actually sleeps when every queued task is waiting on a deadline.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use log::warn;

use crate::extract::Link;
use crate::urlref::{defragment, netloc, UrlRef};

/// A unit of work: crawl a page, or verify one link reference.
#[derive(Debug, Clone)]
pub enum Task {
    Page(UrlRef),
    Link(Link),
}

impl Task {
    /// The authority this task will talk to, used for backoff bookkeeping.
    /// `None` when the URL cannot be resolved (the executor will surface
    /// that as the task's failure).
    #[must_use]
    pub fn host(&self) -> Option<String> {
        let resolved = match self {
            Task::Page(url) => url.resolved().ok()?,
            Task::Link(link) => link.linkurl.resolved().ok()?,
        };
        let host = netloc(&resolved);
        if host.is_empty() { None } else { Some(host) }
    }
}

pub struct Scheduler {
    queue: VecDeque<Task>,
    queued_pages: HashSet<String>,
    done_pages: HashSet<String>,
    not_before: HashMap<String, Instant>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            queued_pages: HashSet::new(),
            done_pages: HashSet::new(),
            not_before: HashMap::new(),
        }
    }

    /// Queue a page walk. No-op if the defragmented URL is already queued or
    /// done.
    pub fn enqueue_page(&mut self, page: UrlRef) {
        let resolved = match page.resolved() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(target: "sitecheck::scheduler", "dropping unresolvable page task: {e}");
                return;
            }
        };
        let clean = defragment(&resolved).to_string();
        if self.done_pages.contains(&clean) || self.queued_pages.contains(&clean) {
            return;
        }
        self.queued_pages.insert(clean);
        self.queue.push_back(Task::Page(page));
    }

    /// Queue a link verification. Links are never deduplicated.
    pub fn enqueue_link(&mut self, link: Link) {
        self.queue.push_back(Task::Link(link));
    }

    /// Re-queue a task at the tail without dedup, used after a 429 deferral
    /// or a cooldown reshuffle.
    pub fn push_back(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_done(&self, clean_url: &str) -> bool {
        self.done_pages.contains(clean_url)
    }

    pub fn mark_done(&mut self, clean_url: impl Into<String>) {
        self.done_pages.insert(clean_url.into());
    }

    /// Whether `host` may be contacted at `now`.
    #[must_use]
    pub fn host_ready(&self, host: &str, now: Instant) -> bool {
        self.not_before.get(host).is_none_or(|deadline| now >= *deadline)
    }

    /// Record a backoff deadline for `host`.
    pub fn defer_host(&mut self, host: impl Into<String>, until: Instant) {
        self.not_before.insert(host.into(), until);
    }

    /// Whether any queued task could run right now.
    #[must_use]
    pub fn any_ready(&self, now: Instant) -> bool {
        self.queue.iter().any(|task| {
            task.host()
                .is_none_or(|host| self.host_ready(&host, now))
        })
    }

    /// Time until the earliest pending deadline, when every host is cooling
    /// down. `None` when nothing is deferred into the future.
    #[must_use]
    pub fn next_sleep(&self, now: Instant) -> Option<Duration> {
        self.not_before
            .values()
            .filter(|deadline| **deadline > now)
            .min()
            .map(|deadline| *deadline - now)
    }
}
