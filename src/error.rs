//! Error types for the adocbook library.
//!
//! A build is a single linear pipeline, so there is one fatal error type,
//! [`BookError`]. Every stage returns it; the first failure aborts the run
//! and nothing already written (staged assets, the scratch directory) is
//! rolled back.
//!
//! The two readiness gates in the export stage are the exception: their
//! outcome is a [`crate::output::Readiness`] value, not an error, and only
//! becomes [`BookError::NotReady`] when the caller asked for
//! [`crate::config::ReadinessPolicy::Strict`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the adocbook library.
#[derive(Debug, Error)]
pub enum BookError {
    // ── Remote errors ─────────────────────────────────────────────────────
    /// Listing or download failed: connection error or non-success status.
    #[error("Failed to fetch '{url}': {reason}")]
    RemoteFetch { url: String, reason: String },

    /// Listing or download exceeded the configured timeout.
    #[error("Request timed out after {secs}s for '{url}'\nIncrease --timeout.")]
    FetchTimeout { url: String, secs: u64 },

    /// The listing response could not be used (not JSON, unsafe file name…).
    #[error("Invalid listing from '{url}': {detail}")]
    InvalidListing { url: String, detail: String },

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// Could not create a directory or write a staged file.
    #[error("Filesystem error at '{path}': {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the output PDF (or merged document).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The markup renderer executable could not be started.
    #[error(
        "Markup renderer '{program}' not found.\n\
Install Asciidoctor (`gem install asciidoctor`) or pass --asciidoctor <PATH>."
    )]
    RendererNotFound { program: String },

    /// The markup renderer ran but reported failure.
    #[error("Markup rendering failed: {detail}")]
    RenderFailed { detail: String },

    // ── Browser errors ────────────────────────────────────────────────────
    /// Chromium could not be configured or launched.
    #[error(
        "Failed to launch headless browser: {detail}\n\
Install Chromium/Chrome or pass --chrome <PATH>."
    )]
    BrowserLaunch { detail: String },

    /// A DevTools call failed while loading the page or printing the PDF.
    #[error("Browser error during {action}: {detail}")]
    Browser { action: String, detail: String },

    /// A PDF could not be parsed back.
    #[error("PDF '{path}' could not be read: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A readiness gate did not complete and the policy is strict.
    #[error("{gate} readiness gate did not complete: {detail}")]
    NotReady { gate: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookError {
    /// `true` for listing/download failures.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            BookError::RemoteFetch { .. }
                | BookError::FetchTimeout { .. }
                | BookError::InvalidListing { .. }
        )
    }

    /// `true` for directory creation and file write failures.
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            BookError::Filesystem { .. } | BookError::OutputWriteFailed { .. }
        )
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BookError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn browser(action: &str, err: impl std::fmt::Display) -> Self {
        BookError::Browser {
            action: action.to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_timeout_display() {
        let e = BookError::FetchTimeout {
            url: "https://example.com/ch01.adoc".into(),
            secs: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("10s"), "got: {msg}");
        assert!(msg.contains("ch01.adoc"));
    }

    #[test]
    fn remote_classification() {
        let e = BookError::RemoteFetch {
            url: "u".into(),
            reason: "HTTP 404 Not Found".into(),
        };
        assert!(e.is_remote());
        assert!(!e.is_filesystem());

        let e = BookError::fs(
            "temp_adoc_files/code",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(e.is_filesystem());
        assert!(!e.is_remote());
        assert!(e.to_string().contains("temp_adoc_files/code"));
    }

    #[test]
    fn not_ready_display() {
        let e = BookError::NotReady {
            gate: "math".into(),
            detail: "timed out after 30000ms".into(),
        };
        assert!(e.to_string().starts_with("math readiness gate"));
    }

    #[test]
    fn browser_helper_keeps_action() {
        let e = BookError::browser("print", "target closed");
        assert_eq!(e.to_string(), "Browser error during print: target closed");
    }
}
