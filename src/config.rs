//! Configuration types for building a book PDF.
//!
//! Every stage of the pipeline receives a [`BuildConfig`] by reference. There
//! are no process-wide constants: the remote location, the scratch directory,
//! the output path and every timeout live here, are built once at startup
//! with [`BuildConfigBuilder`], and are validated by
//! [`BuildConfigBuilder::build`].

use crate::error::BookError;
use crate::pipeline::html::MarkupRenderer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// GitHub contents API root for the default book.
pub const DEFAULT_API_BASE: &str = "https://api.github.com/repos/bitcoinbook/bitcoinbook/contents";

/// MathJax 3 with SVG output.
pub const DEFAULT_MATH_SCRIPT_URL: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-svg.js";

/// Configuration for a book build.
///
/// Built via [`BuildConfig::builder()`] or using [`BuildConfig::default()`].
///
/// # Example
/// ```rust
/// use adocbook::BuildConfig;
///
/// let config = BuildConfig::builder()
///     .repository("bitcoinbook", "bitcoinbook")
///     .concurrency(4)
///     .output_path("book.pdf")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct BuildConfig {
    /// Contents API URL of the repository root. Folder listings are fetched
    /// from `<api_base>/<folder>`.
    pub api_base: String,

    /// Folder holding chapter documents. Empty string is the repository root.
    pub chapter_folder: String,

    /// Folder holding code listings, staged to `<work_dir>/code`.
    pub code_folder: String,

    /// Folder holding images, staged to `<work_dir>/images`.
    pub images_folder: String,

    /// Chapter file names start with this. Default: `ch`.
    pub chapter_prefix: String,

    /// Chapter file names end with this. Default: `.adoc`.
    pub chapter_extension: String,

    /// How selected chapters are ordered before merging. Default: numeric.
    pub chapter_order: ChapterOrder,

    /// Scratch directory for staged assets and the merged document.
    /// Default: `temp_adoc_files`.
    pub work_dir: PathBuf,

    /// Leave the scratch directory in place after a successful build.
    pub keep_work_dir: bool,

    /// Where the PDF is written. Default: `mastering-bitcoin.pdf`.
    pub output_path: PathBuf,

    /// Maximum in-flight downloads (and writes) per batch. Default: 8.
    pub concurrency: usize,

    /// Per-request timeout in seconds for listings and downloads. Default: 10.
    pub fetch_timeout_secs: u64,

    /// Bind outgoing connections to an IPv4 address. Default: true.
    pub force_ipv4: bool,

    /// `User-Agent` sent with every request. GitHub rejects requests without one.
    pub user_agent: String,

    /// Optional bearer token for the contents API.
    pub auth_token: Option<String>,

    /// Pre-constructed markup renderer. Takes precedence over `asciidoctor_bin`.
    pub renderer: Option<Arc<dyn MarkupRenderer>>,

    /// Asciidoctor executable used when `renderer` is `None`.
    pub asciidoctor_bin: String,

    /// Caption label for code listings. Default: `Listing`.
    pub listing_caption: String,

    /// `<title>` of the generated HTML page.
    pub title: String,

    /// Math-typesetting script loaded by the page shell.
    pub math_script_url: String,

    /// Chromium/Chrome executable. Auto-detected when `None`.
    pub chrome_executable: Option<PathBuf>,

    /// Browser viewport width in CSS pixels. Default: 1200.
    pub viewport_width: u32,

    /// Browser viewport height in CSS pixels. Default: 800.
    pub viewport_height: u32,

    /// Paper size and margins of the PDF.
    pub page_layout: PageLayout,

    /// Upper bound for each readiness gate, in seconds. Default: 30.
    pub readiness_timeout_secs: u64,

    /// What to do when a readiness gate does not complete. Default: best effort.
    pub readiness_policy: ReadinessPolicy,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            chapter_folder: String::new(),
            code_folder: "code".to_string(),
            images_folder: "images".to_string(),
            chapter_prefix: "ch".to_string(),
            chapter_extension: ".adoc".to_string(),
            chapter_order: ChapterOrder::default(),
            work_dir: PathBuf::from("temp_adoc_files"),
            keep_work_dir: false,
            output_path: PathBuf::from("mastering-bitcoin.pdf"),
            concurrency: 8,
            fetch_timeout_secs: 10,
            force_ipv4: true,
            user_agent: concat!("adocbook/", env!("CARGO_PKG_VERSION")).to_string(),
            auth_token: None,
            renderer: None,
            asciidoctor_bin: "asciidoctor".to_string(),
            listing_caption: "Listing".to_string(),
            title: "Mastering Bitcoin".to_string(),
            math_script_url: DEFAULT_MATH_SCRIPT_URL.to_string(),
            chrome_executable: None,
            viewport_width: 1200,
            viewport_height: 800,
            page_layout: PageLayout::default(),
            readiness_timeout_secs: 30,
            readiness_policy: ReadinessPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("api_base", &self.api_base)
            .field("chapter_folder", &self.chapter_folder)
            .field("code_folder", &self.code_folder)
            .field("images_folder", &self.images_folder)
            .field("chapter_prefix", &self.chapter_prefix)
            .field("chapter_extension", &self.chapter_extension)
            .field("chapter_order", &self.chapter_order)
            .field("work_dir", &self.work_dir)
            .field("output_path", &self.output_path)
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("force_ipv4", &self.force_ipv4)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn MarkupRenderer>"))
            .field("asciidoctor_bin", &self.asciidoctor_bin)
            .field("page_layout", &self.page_layout)
            .field("readiness_timeout_secs", &self.readiness_timeout_secs)
            .field("readiness_policy", &self.readiness_policy)
            .finish()
    }
}

impl BuildConfig {
    /// Create a new builder for `BuildConfig`.
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder {
            config: Self::default(),
        }
    }

    /// Listing URL for a folder; the empty folder is the repository root.
    pub fn folder_url(&self, folder: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, folder)
        }
    }
}

/// Builder for [`BuildConfig`].
#[derive(Debug)]
pub struct BuildConfigBuilder {
    config: BuildConfig,
}

impl BuildConfigBuilder {
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.api_base = url.into();
        self
    }

    /// Point `api_base` at the GitHub contents API of `owner/repo`.
    pub fn repository(mut self, owner: &str, repo: &str) -> Self {
        self.config.api_base = format!("https://api.github.com/repos/{}/{}/contents", owner, repo);
        self
    }

    pub fn chapter_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.chapter_folder = folder.into();
        self
    }

    pub fn code_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.code_folder = folder.into();
        self
    }

    pub fn images_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.images_folder = folder.into();
        self
    }

    pub fn chapter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.chapter_prefix = prefix.into();
        self
    }

    pub fn chapter_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.chapter_extension = ext.into();
        self
    }

    pub fn chapter_order(mut self, order: ChapterOrder) -> Self {
        self.config.chapter_order = order;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn keep_work_dir(mut self, v: bool) -> Self {
        self.config.keep_work_dir = v;
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn force_ipv4(mut self, v: bool) -> Self {
        self.config.force_ipv4 = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_token = Some(token.into());
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn asciidoctor_bin(mut self, program: impl Into<String>) -> Self {
        self.config.asciidoctor_bin = program.into();
        self
    }

    pub fn listing_caption(mut self, caption: impl Into<String>) -> Self {
        self.config.listing_caption = caption.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn math_script_url(mut self, url: impl Into<String>) -> Self {
        self.config.math_script_url = url.into();
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width.max(1);
        self.config.viewport_height = height.max(1);
        self
    }

    pub fn page_layout(mut self, layout: PageLayout) -> Self {
        self.config.page_layout = layout;
        self
    }

    pub fn readiness_timeout_secs(mut self, secs: u64) -> Self {
        self.config.readiness_timeout_secs = secs;
        self
    }

    pub fn readiness_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.config.readiness_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BuildConfig, BookError> {
        let c = &self.config;
        if c.api_base.trim().is_empty() {
            return Err(BookError::InvalidConfig("API base URL must not be empty".into()));
        }
        if c.chapter_extension.is_empty() {
            return Err(BookError::InvalidConfig(
                "Chapter extension must not be empty".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(BookError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(BookError::InvalidConfig("Fetch timeout must be ≥ 1s".into()));
        }
        if c.readiness_timeout_secs == 0 {
            return Err(BookError::InvalidConfig(
                "Readiness timeout must be ≥ 1s".into(),
            ));
        }
        if c.page_layout.printable_width_mm() <= 0.0 || c.page_layout.printable_height_mm() <= 0.0 {
            return Err(BookError::InvalidConfig(format!(
                "Margins of {}mm leave no printable area on {:?}",
                c.page_layout.margin_mm, c.page_layout.paper
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Ordering applied to selected chapters before they are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChapterOrder {
    /// Sort by the number after the chapter prefix, then by name. (default)
    #[default]
    Numeric,
    /// Keep the order reported by the remote listing.
    Listing,
}

/// Policy applied when a readiness gate reports anything but `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadinessPolicy {
    /// Log and capture the PDF anyway. (default)
    #[default]
    BestEffort,
    /// Abort the build with [`BookError::NotReady`].
    Strict,
}

/// Paper sizes supported by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// 210 × 297 mm. (default)
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PaperSize {
    /// `(width, height)` in millimetres.
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Letter => (215.9, 279.4),
        }
    }
}

/// Paper size plus a uniform margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub paper: PaperSize,
    /// Margin applied to all four sides, in millimetres. Default: 20.
    pub margin_mm: f64,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            margin_mm: 20.0,
        }
    }
}

impl PageLayout {
    pub fn printable_width_mm(&self) -> f64 {
        self.paper.dimensions_mm().0 - 2.0 * self.margin_mm
    }

    pub fn printable_height_mm(&self) -> f64 {
        self.paper.dimensions_mm().1 - 2.0 * self.margin_mm
    }
}

/// Millimetres to inches, the unit of the DevTools print parameters.
pub fn mm_to_inches(mm: f64) -> f64 {
    mm / 25.4
}
