//! Scripted HTTP server for response sequencing.
//!
//! `mockito` covers static routes, but backoff and timeout scenarios need a
//! server that answers the same path differently per hit (429 then 200) or
//! stalls on purpose. This one serves canned responses per path, in order,
//! repeating the last, and counts hits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One canned HTTP response.
#[derive(Clone)]
pub struct Canned {
    pub status: u16,
    pub reason: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Duration,
}

impl Canned {
    pub fn ok_html(body: &str) -> Self {
        Self {
            status: 200,
            reason: "OK",
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            headers: Vec::new(),
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn render(&self) -> String {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str(&format!(
            "content-length: {}\r\nconnection: close\r\n\r\n{}",
            self.body.len(),
            self.body
        ));
        out
    }
}

pub struct ScriptedServer {
    base: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedServer {
    /// Bind an ephemeral port and serve `routes` (keyed by request-target,
    /// query string included) until dropped.
    pub async fn start(routes: HashMap<String, Vec<Canned>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("test server addr");
        let routes = Arc::new(routes);
        let hits: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
        let hits_for_loop = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let hits = hits_for_loop.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut req = Vec::new();
                    loop {
                        match sock.read(&mut buf).await {
                            Ok(0) => break,
                            Ok(n) => {
                                req.extend_from_slice(&buf[..n]);
                                if req.windows(4).any(|w| w == b"\r\n\r\n") {
                                    break;
                                }
                            }
                            Err(_) => return,
                        }
                    }
                    let request = String::from_utf8_lossy(&req);
                    let path = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_string();
                    let hit = {
                        let mut map = hits.lock().expect("hits lock");
                        let count = map.entry(path.clone()).or_insert(0);
                        *count += 1;
                        *count - 1
                    };
                    let canned = routes
                        .get(&path)
                        .map(|seq| seq[hit.min(seq.len() - 1)].clone())
                        .unwrap_or_else(|| Canned::status(404, "Not Found"));
                    if !canned.delay.is_zero() {
                        tokio::time::sleep(canned.delay).await;
                    }
                    let _ = sock.write_all(canned.render().as_bytes()).await;
                    let _ = sock.shutdown().await;
                });
            }
        });

        Self {
            base: format!("http://{addr}"),
            hits,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn hits(&self, path: &str) -> usize {
        *self.hits.lock().expect("hits lock").get(path).unwrap_or(&0)
    }
}
