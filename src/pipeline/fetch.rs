//! Asset fetcher: download one URL as text or bytes, or a batch of them.
//!
//! Every request shares one `reqwest::Client` built from the config: a fixed
//! per-request timeout, a `User-Agent`, the GitHub JSON `Accept` header, an
//! optional bearer token, and (by default) a local IPv4 bind address so the
//! connection never goes out over IPv6.
//!
//! There is no retry. A failure is logged where it happens and returned.

use crate::config::BuildConfig;
use crate::error::BookError;
use crate::output::AssetKind;
use crate::pipeline::listing::RemoteFile;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error};

/// How a response body should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Text,
    Bytes,
}

/// A downloaded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Bytes(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text content; bytes are decoded lossily.
    pub fn into_text(self) -> String {
        match self {
            Payload::Text(s) => s,
            Payload::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        }
    }
}

/// Build the shared HTTP client.
pub fn build_client(config: &BuildConfig) -> Result<Client, BookError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json, */*"),
    );
    if let Some(ref token) = config.auth_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| BookError::InvalidConfig(format!("Invalid auth token: {}", e)))?;
        headers.insert(AUTHORIZATION, value);
    }

    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(config.user_agent.clone())
        .default_headers(headers);

    if config.force_ipv4 {
        builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    builder
        .build()
        .map_err(|e| BookError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Download `url` and read the body as `kind`.
pub async fn fetch(
    client: &Client,
    url: &str,
    kind: ResponseKind,
    timeout_secs: u64,
) -> Result<Payload, BookError> {
    let result = fetch_inner(client, url, kind, timeout_secs).await;
    if let Err(ref e) = result {
        error!("Download failed: {}", e);
    }
    result
}

async fn fetch_inner(
    client: &Client,
    url: &str,
    kind: ResponseKind,
    timeout_secs: u64,
) -> Result<Payload, BookError> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| request_error(url, e, timeout_secs))?;

    if !response.status().is_success() {
        return Err(BookError::RemoteFetch {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let payload = match kind {
        ResponseKind::Text => Payload::Text(
            response
                .text()
                .await
                .map_err(|e| request_error(url, e, timeout_secs))?,
        ),
        ResponseKind::Bytes => Payload::Bytes(
            response
                .bytes()
                .await
                .map_err(|e| request_error(url, e, timeout_secs))?
                .to_vec(),
        ),
    };

    debug!("Fetched {} bytes from {}", payload.len(), url);
    Ok(payload)
}

/// Download every file of a batch through a pool of `config.concurrency`
/// in-flight requests.
///
/// Requests complete in any order; results come back in input order. The
/// first failure aborts the batch and drops the requests still in flight.
pub async fn fetch_all(
    client: &Client,
    files: &[RemoteFile],
    kind: AssetKind,
    config: &BuildConfig,
) -> Result<Vec<Payload>, BookError> {
    let total = files.len();
    let done = AtomicUsize::new(0);
    let response_kind = kind.response_kind();
    let done = &done;

    let mut indexed: Vec<(usize, Payload)> = stream::iter(files.iter().enumerate().map(
        |(idx, file)| async move {
            match fetch(client, &file.download_url, response_kind, config.fetch_timeout_secs).await {
                Ok(payload) => {
                    let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_file_fetched(kind, &file.name, n, total);
                    }
                    Ok((idx, payload))
                }
                Err(e) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_file_error(kind, &file.name, &e.to_string());
                    }
                    Err(e)
                }
            }
        },
    ))
    .buffer_unordered(config.concurrency)
    .try_collect()
    .await?;

    indexed.sort_unstable_by_key(|(idx, _)| *idx);
    Ok(indexed.into_iter().map(|(_, payload)| payload).collect())
}

fn request_error(url: &str, e: reqwest::Error, timeout_secs: u64) -> BookError {
    if e.is_timeout() {
        BookError::FetchTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        BookError::RemoteFetch {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_text_and_bytes() {
        let t = Payload::Text("= Title".into());
        assert_eq!(t.as_bytes(), b"= Title");
        assert_eq!(t.len(), 7);

        let b = Payload::Bytes(vec![0x89, b'P', b'N', b'G']);
        assert_eq!(b.len(), 4);
        assert!(!b.is_empty());
        assert_eq!(Payload::Bytes(b"abc".to_vec()).into_text(), "abc");
    }

    #[test]
    fn client_builds_with_token() {
        let config = BuildConfig::builder().auth_token("abc123").build().unwrap();
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn client_rejects_token_with_newline() {
        let config = BuildConfig::builder().auth_token("abc\n123").build().unwrap();
        let err = build_client(&config).unwrap_err();
        assert!(matches!(err, BookError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_remote_error() {
        let config = BuildConfig::builder().fetch_timeout_secs(2).build().unwrap();
        let client = build_client(&config).unwrap();
        // Port 1 on loopback has no listener.
        let err = fetch(&client, "http://127.0.0.1:1/ch01.adoc", ResponseKind::Text, 2)
            .await
            .unwrap_err();
        assert!(err.is_remote(), "got: {err:?}");
    }

    #[tokio::test]
    async fn empty_batch_returns_nothing() {
        let config = BuildConfig::default();
        let client = build_client(&config).unwrap();
        let out = fetch_all(&client, &[], AssetKind::Image, &config).await.unwrap();
        assert!(out.is_empty());
    }
}
