//! In-process HTTP stub standing in for the GitHub contents API and raw
//! downloads.
//!
//! Routes are exact request paths. Anything else answers 404. A route can
//! delay its answer to exercise client timeouts. The stub tracks how many
//! requests are waiting for an answer at once.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub struct StubServer {
    pub base: String,
    requests: Arc<AtomicUsize>,
    load: Arc<Load>,
}

/// Requests received but not yet answered, and the highest value seen.
#[derive(Default)]
struct Load {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Load {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StubServer {
    /// Bind an ephemeral port and serve the routes `build` returns. `build`
    /// receives the base URL so listings can point back at the stub.
    pub async fn start(build: impl FnOnce(&str) -> HashMap<String, Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes = Arc::new(build(&base));
        let requests = Arc::new(AtomicUsize::new(0));
        let load = Arc::new(Load::default());

        let counter = Arc::clone(&requests);
        let shared_load = Arc::clone(&load);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let counter = Arc::clone(&counter);
                let load = Arc::clone(&shared_load);
                tokio::spawn(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let _ = handle(stream, &routes, &load).await;
                });
            }
        });

        Self {
            base,
            requests,
            load,
        }
    }

    /// Contents API root to put in the config.
    pub fn api_base(&self) -> String {
        format!("{}/contents", self.base)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Most requests that were ever waiting for an answer at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.load.peak.load(Ordering::SeqCst)
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    load: &Load,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let route = routes.get(&path).cloned().unwrap_or_else(|| Route::status(404));
    // Leave before answering: the client cannot start its next request
    // until this one is answered.
    load.enter();
    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }
    load.leave();

    let header = format!(
        "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        route.status,
        route.body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&route.body).await?;
    stream.shutdown().await
}

/// A contents-API listing for `folder` whose download URLs point at
/// `<base>/raw/<folder>/<name>`.
pub fn listing(base: &str, folder: &str, names: &[&str]) -> String {
    let entries: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "name": name,
                "type": "file",
                "download_url": raw_url(base, folder, name),
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

pub fn raw_path(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        format!("/raw/{}", name)
    } else {
        format!("/raw/{}/{}", folder, name)
    }
}

pub fn raw_url(base: &str, folder: &str, name: &str) -> String {
    format!("{}{}", base, raw_path(folder, name))
}

/// Routes for a small book: chapters at the root, plus `code/` and `images/`.
pub struct Book<'a> {
    pub root: Vec<(&'a str, &'a str)>,
    pub code: Vec<(&'a str, &'a str)>,
    pub images: Vec<(&'a str, &'a [u8])>,
}

impl Book<'_> {
    pub fn routes(&self, base: &str) -> HashMap<String, Route> {
        let mut routes = HashMap::new();

        let root_names: Vec<&str> = self.root.iter().map(|(n, _)| *n).collect();
        routes.insert("/contents".to_string(), Route::ok(listing(base, "", &root_names)));
        for (name, text) in &self.root {
            routes.insert(raw_path("", name), Route::ok(text.as_bytes()));
        }

        let code_names: Vec<&str> = self.code.iter().map(|(n, _)| *n).collect();
        routes.insert("/contents/code".to_string(), Route::ok(listing(base, "code", &code_names)));
        for (name, text) in &self.code {
            routes.insert(raw_path("code", name), Route::ok(text.as_bytes()));
        }

        let image_names: Vec<&str> = self.images.iter().map(|(n, _)| *n).collect();
        routes.insert(
            "/contents/images".to_string(),
            Route::ok(listing(base, "images", &image_names)),
        );
        for (name, bytes) in &self.images {
            routes.insert(raw_path("images", name), Route::ok(bytes.to_vec()));
        }

        routes
    }
}
