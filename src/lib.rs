//! # adocbook
//!
//! Build a PDF from an AsciiDoc book hosted on GitHub.
//!
//! ## Why this crate?
//!
//! Books such as *Mastering Bitcoin* live as one AsciiDoc file per chapter,
//! with code listings and figures in sibling folders. There is no single file
//! to feed a converter, math is written as TeX, and images are referenced
//! relative to the repository root. This crate mirrors the repository into a
//! scratch directory, merges the chapters, renders them with Asciidoctor,
//! typesets the math with MathJax inside headless Chromium and prints the
//! result to one paginated PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! GitHub contents API
//!  │
//!  ├─ 1. List    code/, images/ and the chapter folder
//!  ├─ 2. Stage   download code and images into the scratch tree (concurrent)
//!  ├─ 3. Merge   download chapters, strip `images/` from image macros, join
//!  ├─ 4. Render  asciidoctor → body HTML (spawn_blocking)
//!  ├─ 5. Print   Chromium: load page, wait for math and images, print A4
//!  └─ 6. Clean   close browser and remove the scratch tree (concurrent)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adocbook::{build_book, BuildConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BuildConfig::builder()
//!         .repository("bitcoinbook", "bitcoinbook")
//!         .output_path("mastering-bitcoin.pdf")
//!         .build()?;
//!     let output = build_book(&config).await?;
//!     eprintln!("{} pages, math {}", output.stats.page_count, output.stats.math);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `adoc2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External tools
//!
//! A full build runs the `asciidoctor` executable and a Chromium binary. The
//! MathJax script is loaded from a CDN by the browser. [`fetch_merged`] and
//! [`inspect`] need none of these.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod build;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use build::{build_book, build_book_sync, fetch_merged, fetch_merged_to_file, inspect};
pub use config::{BuildConfig, BuildConfigBuilder, ChapterOrder, PageLayout, PaperSize, ReadinessPolicy};
pub use error::BookError;
pub use output::{AssetKind, BuildOutput, BuildStats, ImageLoadReport, PdfInfo, Readiness, StagedAsset};
pub use pipeline::html::{Asciidoctor, MarkupRenderer, RenderOptions};
pub use pipeline::listing::RemoteFile;
pub use progress::{BuildProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
