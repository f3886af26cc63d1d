//! Result types produced by a build.

use crate::pipeline::fetch::ResponseKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Category of a remote asset. Decides the response kind and the staging folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Chapter,
    Code,
    Image,
}

impl AssetKind {
    /// Chapters and code are text; images are raw bytes.
    pub fn response_kind(self) -> ResponseKind {
        match self {
            AssetKind::Chapter | AssetKind::Code => ResponseKind::Text,
            AssetKind::Image => ResponseKind::Bytes,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetKind::Chapter => "chapter",
            AssetKind::Code => "code",
            AssetKind::Image => "image",
        };
        f.write_str(s)
    }
}

/// A remote file written under the scratch directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedAsset {
    pub name: String,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Outcome of a readiness gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Readiness {
    /// The awaited condition completed.
    Ready,
    /// The bounded wait elapsed first.
    TimedOut { after_ms: u64 },
    /// The condition could not be awaited (script error, missing global…).
    Failed { reason: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => f.write_str("ready"),
            Readiness::TimedOut { after_ms } => write!(f, "timed out after {}ms", after_ms),
            Readiness::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Image elements seen by the image readiness gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLoadReport {
    pub total: usize,
    /// `src` of every image that fired `error` (or decoded to zero width).
    pub failed: Vec<String>,
}

/// Facts read back from a PDF file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInfo {
    pub path: PathBuf,
    pub page_count: usize,
    pub pdf_version: String,
    pub file_size: u64,
}

/// Counters and timings for one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    pub chapters: usize,
    pub code_files: usize,
    pub image_files: usize,
    pub merged_bytes: usize,
    pub html_bytes: usize,
    pub pdf_bytes: usize,
    pub page_count: usize,
    pub math: Readiness,
    pub images: Readiness,
    pub image_report: ImageLoadReport,
    pub fetch_duration_ms: u64,
    pub render_duration_ms: u64,
    pub export_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a successful build returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutput {
    pub pdf_path: PathBuf,
    /// Chapter file names in merge order.
    pub chapters: Vec<String>,
    pub staged: Vec<StagedAsset>,
    pub stats: BuildStats,
}
