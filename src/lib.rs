pub mod checker;
pub mod extract;
pub mod fragment;
pub mod http;
pub mod policy;
pub mod report;
pub mod scheduler;
pub mod seeds;
pub mod server;
pub mod urlref;

pub use checker::Checker;
pub use extract::{ElementRef, Extraction, Link};
pub use http::{FetchError, HttpCache, RequestObserver, Response, RetryAfter};
pub use policy::{BasicPolicy, DocsPolicy, Policy, Ugly};
pub use report::{Reporter, RunStats};
pub use scheduler::{Scheduler, Task};
pub use server::StaticServer;
pub use urlref::{defragment, netloc, UrlRef};
