//! CLI binary for adocbook.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BuildConfig` and prints results.

use adocbook::{
    build_book, fetch_merged_to_file, inspect, AssetKind, BuildConfig, BuildProgressCallback,
    ChapterOrder, ProgressCallback, Readiness, ReadinessPolicy, Stage,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner whose prefix follows the current
/// stage and whose message counts downloads. Downloads of the three fetch
/// stages interleave, so the message names the category.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl BuildProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(capitalise(&stage.to_string()));
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar.println(format!("  {} {}", green("✓"), stage));
    }

    fn on_file_fetched(&self, kind: AssetKind, name: &str, done: usize, total: usize) {
        self.bar
            .set_message(format!("{kind} {done}/{total}  {}", dim(name)));
    }

    fn on_file_error(&self, kind: AssetKind, name: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {} {}  {}", red("✗"), kind, name, red(&msg)));
    }

    fn on_build_complete(&self, output: &Path, page_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages written to {}",
            green("✔"),
            bold(&page_count.to_string()),
            bold(&output.display().to_string())
        );
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build Mastering Bitcoin into ./mastering-bitcoin.pdf
  adoc2pdf

  # Another book, custom output
  adoc2pdf --repo someone/some-book -o book.pdf

  # Merge chapters only (no asciidoctor or browser needed)
  adoc2pdf --merged-only -o merged.adoc

  # Inspect a PDF produced earlier
  adoc2pdf --inspect-only -o mastering-bitcoin.pdf

  # Fail instead of printing when math or images are not ready
  adoc2pdf --strict-readiness --readiness-timeout 60

  # Keep the scratch directory and print the build summary as JSON
  adoc2pdf --keep-work-dir --json > build.json

REQUIREMENTS:
  asciidoctor             Ruby gem, on PATH or given with --asciidoctor
  Chromium / Chrome       Found automatically or given with --chrome
  Network access          GitHub API, raw downloads and the MathJax CDN

ENVIRONMENT VARIABLES:
  GITHUB_TOKEN            Token for the GitHub API (raises the rate limit)
  ADOC2PDF_*              Every flag, e.g. ADOC2PDF_OUTPUT, ADOC2PDF_CONCURRENCY
  RUST_LOG                Overrides the log filter chosen by -v / -q
"#;

/// Build a PDF from an AsciiDoc book hosted on GitHub.
#[derive(Parser, Debug)]
#[command(
    name = "adoc2pdf",
    version,
    about = "Build a PDF from an AsciiDoc book hosted on GitHub",
    long_about = "Download the chapters, code listings and images of an AsciiDoc book from \
GitHub, merge the chapters, render them with Asciidoctor and print an A4 PDF with typeset \
math through headless Chromium.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// GitHub repository as OWNER/NAME.
    #[arg(long, env = "ADOC2PDF_REPO", conflicts_with = "api_base")]
    repo: Option<String>,

    /// Contents API root, for mirrors or other hosts.
    #[arg(long, env = "ADOC2PDF_API_BASE")]
    api_base: Option<String>,

    /// Output file (PDF, or AsciiDoc with --merged-only).
    #[arg(short, long, env = "ADOC2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Scratch directory, removed after a successful build.
    #[arg(long, env = "ADOC2PDF_WORK_DIR", default_value = "temp_adoc_files")]
    work_dir: PathBuf,

    /// Maximum concurrent downloads and writes.
    #[arg(short, long, env = "ADOC2PDF_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Per-download timeout in seconds.
    #[arg(long, env = "ADOC2PDF_TIMEOUT", default_value_t = 10)]
    timeout: u64,

    /// Do not force IPv4 for downloads.
    #[arg(long, env = "ADOC2PDF_ALLOW_IPV6")]
    allow_ipv6: bool,

    /// GitHub API token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Asciidoctor executable.
    #[arg(long, env = "ADOC2PDF_ASCIIDOCTOR", default_value = "asciidoctor")]
    asciidoctor: String,

    /// Chromium or Chrome executable (auto-detected if omitted).
    #[arg(long, env = "ADOC2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Chapter order: numeric or listing.
    #[arg(long, env = "ADOC2PDF_CHAPTER_ORDER", value_enum, default_value = "numeric")]
    chapter_order: ChapterOrderArg,

    /// Seconds to wait for math typesetting and for images.
    #[arg(long, env = "ADOC2PDF_READINESS_TIMEOUT", default_value_t = 30)]
    readiness_timeout: u64,

    /// Abort instead of printing when a readiness gate is not met.
    #[arg(long, env = "ADOC2PDF_STRICT_READINESS")]
    strict_readiness: bool,

    /// Keep the scratch directory after the build.
    #[arg(long, env = "ADOC2PDF_KEEP_WORK_DIR")]
    keep_work_dir: bool,

    /// Write the merged AsciiDoc only; no rendering or printing.
    #[arg(long, env = "ADOC2PDF_MERGED_ONLY", conflicts_with = "inspect_only")]
    merged_only: bool,

    /// Print page count and version of the output PDF, no build.
    #[arg(long)]
    inspect_only: bool,

    /// Print the build summary (BuildOutput) as JSON on stdout.
    #[arg(long, env = "ADOC2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ADOC2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ADOC2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ADOC2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ChapterOrderArg {
    Numeric,
    Listing,
}

impl From<ChapterOrderArg> for ChapterOrder {
    fn from(v: ChapterOrderArg) -> Self {
        match v {
            ChapterOrderArg::Numeric => ChapterOrder::Numeric,
            ChapterOrderArg::Listing => ChapterOrder::Listing,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let output = cli.output.clone().unwrap_or_else(|| {
        PathBuf::from(if cli.merged_only {
            "merged.adoc"
        } else {
            "mastering-bitcoin.pdf"
        })
    });

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&output).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize PDF info")?
            );
        } else {
            println!("File:         {}", info.path.display());
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
            println!("Size:         {} bytes", info.file_size);
        }
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BuildProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, output, progress_cb)?;

    // ── Merged-only mode ─────────────────────────────────────────────────
    if cli.merged_only {
        let bytes = fetch_merged_to_file(&config)
            .await
            .context("Merging chapters failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} bytes  →  {}",
                green("✔"),
                bytes,
                bold(&config.output_path.display().to_string())
            );
        }
        return Ok(());
    }

    // ── Full build ───────────────────────────────────────────────────────
    let result = build_book(&config).await.context("Build failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &result.stats;
        if !show_progress {
            eprintln!(
                "Built {} pages from {} chapters in {}ms  →  {}",
                stats.page_count,
                stats.chapters,
                stats.total_duration_ms,
                result.pdf_path.display()
            );
        }
        eprintln!(
            "   {} code  /  {} images  /  {} bytes of PDF  /  {}ms total",
            dim(&stats.code_files.to_string()),
            dim(&stats.image_files.to_string()),
            dim(&stats.pdf_bytes.to_string()),
            stats.total_duration_ms,
        );
        report_gate("math", &stats.math);
        report_gate("images", &stats.images);
        for src in &stats.image_report.failed {
            eprintln!("   {} image failed to load: {}", cyan("⚠"), dim(src));
        }
    }

    Ok(())
}

fn report_gate(name: &str, readiness: &Readiness) {
    if !readiness.is_ready() {
        eprintln!("   {} {} not confirmed: {}", cyan("⚠"), name, readiness);
    }
}

/// Map CLI args to `BuildConfig`.
fn build_config(cli: &Cli, output: PathBuf, progress: Option<ProgressCallback>) -> Result<BuildConfig> {
    let mut builder = BuildConfig::builder()
        .output_path(output)
        .work_dir(cli.work_dir.clone())
        .keep_work_dir(cli.keep_work_dir)
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.timeout)
        .force_ipv4(!cli.allow_ipv6)
        .asciidoctor_bin(cli.asciidoctor.clone())
        .chapter_order(cli.chapter_order.clone().into())
        .readiness_timeout_secs(cli.readiness_timeout)
        .readiness_policy(if cli.strict_readiness {
            ReadinessPolicy::Strict
        } else {
            ReadinessPolicy::BestEffort
        });

    if let Some(ref repo) = cli.repo {
        let (owner, name) = parse_repo(repo)?;
        builder = builder.repository(owner, name);
    }
    if let Some(ref api_base) = cli.api_base {
        builder = builder.api_base(api_base.clone());
    }
    if let Some(ref token) = cli.github_token {
        builder = builder.auth_token(token.clone());
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--repo OWNER/NAME`.
fn parse_repo(s: &str) -> Result<(&str, &str)> {
    match s.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => anyhow::bail!("Invalid repository '{}': expected OWNER/NAME", s),
    }
}
