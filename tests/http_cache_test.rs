//! Tests for the caching HTTP layer: GET dedup, redirect chains, the
//! redirect-caching predicate, and Retry-After translation.

use sitecheck::http::{FetchError, HttpCache, RequestObserver};

/// Records every network hit the cache reports.
#[derive(Default)]
struct Recorder {
    urls: Vec<String>,
}

impl RequestObserver for Recorder {
    fn request_starting(&mut self, url: &str) {
        self.urls.push(url.to_string());
    }
}

#[tokio::test]
async fn test_get_is_cached_per_defragmented_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/page")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("hello")
        .expect(1)
        .create_async()
        .await;

    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();

    let url_a = format!("{}/page#a", server.url());
    let url_b = format!("{}/page#b", server.url());
    let first = cache.get(&url_a, &mut rec).await.unwrap();
    let second = cache.get(&url_b, &mut rec).await.unwrap();

    assert_eq!(first.body, "hello");
    assert_eq!(second.body, "hello");
    // The cached copy answers for the *current* request URL.
    assert_eq!(first.url, url_a);
    assert_eq!(second.url, url_b);
    assert_eq!(rec.urls.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_redirect_chain_is_followed_and_recorded() {
    let mut server = mockito::Server::new_async().await;
    let hop = server
        .mock("GET", "/a")
        .with_status(302)
        .with_header("location", "/b")
        .expect(1)
        .create_async()
        .await;
    let target = server
        .mock("GET", "/b")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("end")
        .expect(1)
        .create_async()
        .await;

    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();
    let resp = cache
        .get(&format!("{}/a", server.url()), &mut rec)
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.url, format!("{}/b", server.url()));
    assert_eq!(resp.redirects, vec![format!("{}/a", server.url())]);

    // Both hops are cached: replaying the chain costs no network.
    let again = cache
        .get(&format!("{}/a", server.url()), &mut rec)
        .await
        .unwrap();
    assert_eq!(again.status, 200);
    assert_eq!(rec.urls.len(), 2);
    hop.assert_async().await;
    target.assert_async().await;
}

#[tokio::test]
async fn test_redirect_with_query_is_not_cached() {
    let mut server = mockito::Server::new_async().await;
    let hop = server
        .mock("GET", "/r?x=1")
        .with_status(302)
        .with_header("location", "/t")
        .expect(2)
        .create_async()
        .await;
    let target = server
        .mock("GET", "/t")
        .with_status(200)
        .with_body("t")
        .expect(1)
        .create_async()
        .await;

    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();
    let url = format!("{}/r?x=1", server.url());
    cache.get(&url, &mut rec).await.unwrap();
    cache.get(&url, &mut rec).await.unwrap();

    // the parameterized redirect hop hits the network both times; the
    // target is served from cache the second time
    hop.assert_async().await;
    target.assert_async().await;
}

#[tokio::test]
async fn test_redirect_without_query_is_cached() {
    let mut server = mockito::Server::new_async().await;
    let hop = server
        .mock("GET", "/r2")
        .with_status(301)
        .with_header("location", "/t2")
        .expect(1)
        .create_async()
        .await;
    let target = server
        .mock("GET", "/t2")
        .with_status(200)
        .with_body("t2")
        .expect(1)
        .create_async()
        .await;

    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();
    let url = format!("{}/r2", server.url());
    cache.get(&url, &mut rec).await.unwrap();
    cache.get(&url, &mut rec).await.unwrap();

    hop.assert_async().await;
    target.assert_async().await;
}

#[tokio::test]
async fn test_429_with_numeric_retry_after_is_a_signal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/throttled")
        .with_status(429)
        .with_header("retry-after", "7")
        .create_async()
        .await;

    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();
    let url = format!("{}/throttled", server.url());
    match cache.get(&url, &mut rec).await {
        Err(FetchError::RetryAfter(retry)) => {
            assert_eq!(retry.url, url);
            assert_eq!(retry.secs, 7);
        }
        other => panic!("expected RetryAfter, got {other:?}"),
    }
}

#[tokio::test]
async fn test_429_without_numeric_retry_after_is_a_plain_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/throttled")
        .with_status(429)
        .with_header("retry-after", "Wed, 21 Oct 2026 07:28:00 GMT")
        .create_async()
        .await;

    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();
    let resp = cache
        .get(&format!("{}/throttled", server.url()), &mut rec)
        .await
        .unwrap();
    assert_eq!(resp.status, 429);
}

#[tokio::test]
async fn test_redirect_loop_becomes_retry_after() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/loop")
        .with_status(302)
        .with_header("location", "/loop")
        .create_async()
        .await;

    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();
    match cache.get(&format!("{}/loop", server.url()), &mut rec).await {
        Err(FetchError::RetryAfter(retry)) => assert_eq!(retry.secs, 60),
        other => panic!("expected RetryAfter, got {other:?}"),
    }
}

#[tokio::test]
async fn test_data_urls_are_served_locally() {
    let mut cache = HttpCache::new().unwrap();
    let mut rec = Recorder::default();
    let resp = cache
        .get("data:text/html;base64,PGg+aDwvaD4=", &mut rec)
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "<h>h</h>");
    assert_eq!(resp.content_type.as_deref(), Some("text/html"));
    // still a GET, still observed, still cached
    assert_eq!(rec.urls.len(), 1);
    cache
        .get("data:text/html;base64,PGg+aDwvaD4=", &mut rec)
        .await
        .unwrap();
    assert_eq!(rec.urls.len(), 1);
}
