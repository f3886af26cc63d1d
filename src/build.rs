//! Build entry points.
//!
//! [`build_book`] runs the whole pipeline and returns once the PDF is on disk
//! and the scratch directory is gone. [`fetch_merged`] stops after merging and
//! needs neither a renderer nor a browser.

use crate::config::BuildConfig;
use crate::error::BookError;
use crate::output::{AssetKind, BuildOutput, BuildStats, PdfInfo};
use crate::pipeline::export::{self, PdfExporter};
use crate::pipeline::workdir::WorkDir;
use crate::pipeline::{fetch, html, inspect, listing, merge, stage};
use crate::progress::Stage;
use crate::templates;
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build the book PDF described by `config`.
///
/// # Returns
/// `Ok(BuildOutput)` once the PDF is written to `config.output_path` and the
/// scratch directory has been removed (unless `keep_work_dir` is set).
///
/// # Errors
/// The first failing stage aborts the build. Nothing is rolled back: staged
/// files and the scratch directory stay where they are, and no PDF is
/// written. Under [`crate::ReadinessPolicy::BestEffort`] the readiness gates
/// never fail the build; check `stats.math` and `stats.images` instead.
pub async fn build_book(config: &BuildConfig) -> Result<BuildOutput, BookError> {
    let total_start = Instant::now();
    info!("Building {} from {}", config.output_path.display(), config.api_base);

    // ── Step 1: Client and scratch directory ─────────────────────────────
    let client = fetch::build_client(config)?;
    let workdir = WorkDir::create(&config.work_dir, &config.code_folder, &config.images_folder).await?;
    let code_dir = workdir.code_dir();
    let images_dir = workdir.images_dir();

    // ── Step 2: Stage code and images, list chapters ─────────────────────
    let fetch_start = Instant::now();
    let (code, images, chapters) = tokio::try_join!(
        in_stage(
            config,
            Stage::StagingCode,
            stage::stage_folder(&client, config, &config.code_folder, AssetKind::Code, &code_dir),
        ),
        in_stage(
            config,
            Stage::StagingImages,
            stage::stage_folder(&client, config, &config.images_folder, AssetKind::Image, &images_dir),
        ),
        in_stage(
            config,
            Stage::ListingChapters,
            listing::list_chapters(&client, config),
        ),
    )?;

    // ── Step 3: Merge chapters ───────────────────────────────────────────
    let merged = in_stage(
        config,
        Stage::Merging,
        merge::merge_chapters(&client, &chapters, config),
    )
    .await?;
    workdir.write_merged(&merged).await?;
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

    // ── Step 4: Render HTML ──────────────────────────────────────────────
    let render_start = Instant::now();
    let body = in_stage(config, Stage::RenderingHtml, html::render_html(&workdir, config)).await?;
    let page = templates::wrap_page(&body, &config.title, &config.math_script_url);
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 5: Print PDF ────────────────────────────────────────────────
    let export_start = Instant::now();
    let exporter = PdfExporter::launch(config).await?;
    let report = match exporter.export(&page, config).await {
        Ok(report) => report,
        Err(e) => {
            if let Err(close_err) = exporter.close().await {
                debug!("Closing browser after failed export: {}", close_err);
            }
            return Err(e);
        }
    };
    let export_duration_ms = export_start.elapsed().as_millis() as u64;

    // ── Step 6: Close browser and remove scratch directory ───────────────
    notify_start(config, Stage::CleaningUp);
    let remove_workdir = async {
        if config.keep_work_dir {
            info!("Keeping scratch directory {}", workdir.root().display());
            Ok(())
        } else {
            workdir.remove().await
        }
    };
    let (closed, removed) = tokio::join!(exporter.close(), remove_workdir);
    if let Err(e) = closed {
        warn!("Browser did not close cleanly: {}", e);
    }
    removed?;
    notify_complete(config, Stage::CleaningUp);

    // ── Step 7: Read back and report ─────────────────────────────────────
    let pdf = inspect::read_pdf_info(&config.output_path).await?;

    let stats = BuildStats {
        chapters: chapters.len(),
        code_files: code.len(),
        image_files: images.len(),
        merged_bytes: merged.len(),
        html_bytes: page.len(),
        pdf_bytes: report.pdf_bytes,
        page_count: pdf.page_count,
        math: report.math,
        images: report.images,
        image_report: report.image_report,
        fetch_duration_ms,
        render_duration_ms,
        export_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Build complete: {} chapter(s), {} page(s), {}ms total",
        stats.chapters, stats.page_count, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_build_complete(&config.output_path, stats.page_count);
    }

    Ok(BuildOutput {
        pdf_path: config.output_path.clone(),
        chapters: chapters.into_iter().map(|c| c.name).collect(),
        staged: code.into_iter().chain(images).collect(),
        stats,
    })
}

/// Synchronous wrapper around [`build_book`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_book_sync(config: &BuildConfig) -> Result<BuildOutput, BookError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BookError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_book(config))
}

/// List and merge the chapters without staging assets, rendering or printing.
pub async fn fetch_merged(config: &BuildConfig) -> Result<String, BookError> {
    let client = fetch::build_client(config)?;
    let chapters = in_stage(
        config,
        Stage::ListingChapters,
        listing::list_chapters(&client, config),
    )
    .await?;
    in_stage(
        config,
        Stage::Merging,
        merge::merge_chapters(&client, &chapters, config),
    )
    .await
}

/// [`fetch_merged`], written atomically to `config.output_path`.
///
/// Returns the number of bytes written.
pub async fn fetch_merged_to_file(config: &BuildConfig) -> Result<usize, BookError> {
    let merged = fetch_merged(config).await?;
    export::write_output(&config.output_path, merged.as_bytes()).await?;
    info!(
        "Wrote merged document ({} bytes) to {}",
        merged.len(),
        config.output_path.display()
    );
    Ok(merged.len())
}

/// Read page count, version and size of an existing PDF.
///
/// Needs no network, renderer or browser.
pub async fn inspect(path: impl AsRef<Path>) -> Result<PdfInfo, BookError> {
    inspect::read_pdf_info(path.as_ref()).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run `fut` between `on_stage_start` and `on_stage_complete`.
async fn in_stage<T>(
    config: &BuildConfig,
    stage: Stage,
    fut: impl Future<Output = Result<T, BookError>>,
) -> Result<T, BookError> {
    notify_start(config, stage);
    let value = fut.await?;
    notify_complete(config, stage);
    Ok(value)
}

fn notify_start(config: &BuildConfig, stage: Stage) {
    debug!("Stage start: {}", stage);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn notify_complete(config: &BuildConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage);
    }
}
