//! Progress-callback trait for build events.
//!
//! Inject an [`Arc<dyn BuildProgressCallback>`] via
//! [`crate::config::BuildConfigBuilder::progress_callback`] to receive events
//! as the pipeline moves through its stages and downloads each file.
//!
//! # Example
//!
//! ```rust
//! use adocbook::{AssetKind, BuildConfig, BuildProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     fetched: AtomicUsize,
//! }
//!
//! impl BuildProgressCallback for CountingCallback {
//!     fn on_file_fetched(&self, kind: AssetKind, name: &str, done: usize, total: usize) {
//!         self.fetched.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{kind} {name} ({done}/{total})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { fetched: AtomicUsize::new(0) });
//!
//! let config = BuildConfig::builder()
//!     .progress_callback(counter as Arc<dyn BuildProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::AssetKind;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pipeline stages, in the order a successful build passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    StagingCode,
    StagingImages,
    ListingChapters,
    Merging,
    RenderingHtml,
    LoadingPage,
    TypesettingMath,
    LoadingImages,
    WritingPdf,
    CleaningUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::StagingCode => "staging code",
            Stage::StagingImages => "staging images",
            Stage::ListingChapters => "listing chapters",
            Stage::Merging => "merging chapters",
            Stage::RenderingHtml => "rendering HTML",
            Stage::LoadingPage => "loading page",
            Stage::TypesettingMath => "typesetting math",
            Stage::LoadingImages => "loading images",
            Stage::WritingPdf => "writing PDF",
            Stage::CleaningUp => "cleaning up",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it runs.
///
/// Implementations must be `Send + Sync`: downloads of one category complete
/// concurrently and the three fetch stages run at the same time, so
/// `on_file_fetched` may be called from several tasks at once. All methods
/// default to no-ops.
pub trait BuildProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes without error.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after each successful download.
    ///
    /// # Arguments
    /// * `done`: downloads of this batch finished so far
    /// * `total`: size of the batch
    fn on_file_fetched(&self, kind: AssetKind, name: &str, done: usize, total: usize) {
        let _ = (kind, name, done, total);
    }

    /// Called when a download fails. The batch aborts right after.
    fn on_file_error(&self, kind: AssetKind, name: &str, error: &str) {
        let _ = (kind, name, error);
    }

    /// Called once the PDF is written and cleanup has run.
    fn on_build_complete(&self, output: &Path, page_count: usize) {
        let _ = (output, page_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BuildProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BuildConfig`].
pub type ProgressCallback = Arc<dyn BuildProgressCallback>;
