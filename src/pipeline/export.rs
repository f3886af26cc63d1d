//! PDF export: load the page shell in headless Chromium and print it.
//!
//! ## Readiness gates
//!
//! MathJax loads asynchronously and typesets after the page is in the DOM;
//! data-URI images still need decoding. Printing before either finishes
//! yields raw TeX or blank boxes. Each gate is a bounded wait that yields a
//! [`Readiness`] instead of an error. What happens next is decided by
//! [`ReadinessPolicy`]: best effort logs and prints anyway, strict aborts.

use crate::config::{mm_to_inches, BuildConfig, PageLayout, ReadinessPolicy};
use crate::error::BookError;
use crate::output::{ImageLoadReport, Readiness};
use crate::progress::Stage;
use crate::templates;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Upper bound for a single DevTools call. Printing a whole book is one call
/// and can take minutes.
const DEVTOOLS_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// The in-page math deadline fires this much before the outer bound so the
/// script can report `false` instead of being cut off.
const IN_PAGE_DEADLINE_SLACK_MS: u64 = 1_000;

/// What the export stage observed.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub pdf_bytes: usize,
    pub math: Readiness,
    pub images: Readiness,
    pub image_report: ImageLoadReport,
}

/// A running headless browser plus the task driving its DevTools connection.
pub struct PdfExporter {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl PdfExporter {
    /// Launch Chromium without sandbox.
    pub async fn launch(config: &BuildConfig) -> Result<Self, BookError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(DEVTOOLS_REQUEST_TIMEOUT);
        if let Some(ref chrome) = config.chrome_executable {
            builder = builder.chrome_executable(chrome);
        }
        let browser_config = builder
            .build()
            .map_err(|detail| BookError::BrowserLaunch { detail })?;

        let (browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| BookError::BrowserLaunch {
                    detail: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler: {}", e);
                }
            }
        });

        info!("Headless browser launched");
        Ok(Self { browser, handler })
    }

    /// Load `html`, wait for the gates, print to `config.output_path`.
    pub async fn export(&self, html: &str, config: &BuildConfig) -> Result<ExportReport, BookError> {
        let notify_start = |stage| {
            if let Some(ref cb) = config.progress_callback {
                cb.on_stage_start(stage);
            }
        };
        let gate_bound = Duration::from_secs(config.readiness_timeout_secs);

        notify_start(Stage::LoadingPage);
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BookError::browser("open page", e))?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(config.viewport_width),
            i64::from(config.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| BookError::browser("set viewport", e))?;
        page.set_content(html)
            .await
            .map_err(|e| BookError::browser("load content", e))?;
        debug!("Page content loaded ({} bytes)", html.len());

        notify_start(Stage::TypesettingMath);
        let math = wait_for_math(&page, gate_bound).await;
        enforce(config.readiness_policy, "math", &math)?;

        notify_start(Stage::LoadingImages);
        let (images, image_report) = wait_for_images(&page, gate_bound).await;
        enforce(config.readiness_policy, "image", &images)?;

        notify_start(Stage::WritingPdf);
        let pdf = page
            .pdf(print_params(&config.page_layout))
            .await
            .map_err(|e| BookError::browser("print", e))?;
        write_output(&config.output_path, &pdf).await?;
        info!(
            "Wrote {} bytes of PDF to {}",
            pdf.len(),
            config.output_path.display()
        );

        if let Err(e) = page.close().await {
            debug!("Closing page failed: {}", e);
        }

        Ok(ExportReport {
            pdf_bytes: pdf.len(),
            math,
            images,
            image_report,
        })
    }

    /// Close the browser and wait for its process and handler to finish.
    pub async fn close(mut self) -> Result<(), BookError> {
        self.browser
            .close()
            .await
            .map_err(|e| BookError::browser("close", e))?;
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler
            .await
            .map_err(|e| BookError::Internal(format!("DevTools handler panicked: {}", e)))?;
        debug!("Headless browser closed");
        Ok(())
    }
}

/// A4 (or Letter), uniform margins, backgrounds, empty header, page-number footer.
pub fn print_params(layout: &PageLayout) -> PrintToPdfParams {
    let (width_mm, height_mm) = layout.paper.dimensions_mm();
    let margin = mm_to_inches(layout.margin_mm);
    PrintToPdfParams {
        landscape: Some(false),
        display_header_footer: Some(true),
        print_background: Some(true),
        paper_width: Some(mm_to_inches(width_mm)),
        paper_height: Some(mm_to_inches(height_mm)),
        margin_top: Some(margin),
        margin_bottom: Some(margin),
        margin_left: Some(margin),
        margin_right: Some(margin),
        header_template: Some(templates::HEADER_TEMPLATE.to_string()),
        footer_template: Some(templates::FOOTER_TEMPLATE.to_string()),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

async fn wait_for_math(page: &Page, bound: Duration) -> Readiness {
    let deadline_ms = (bound.as_millis() as u64).saturating_sub(IN_PAGE_DEADLINE_SLACK_MS);
    let readiness = match evaluate_bounded::<bool>(page, &templates::math_ready_script(deadline_ms), bound).await {
        Ok(true) => Readiness::Ready,
        Ok(false) => Readiness::Failed {
            reason: "math script did not load".to_string(),
        },
        Err(r) => r,
    };
    match readiness {
        Readiness::Ready => debug!("Math typeset complete"),
        ref other => warn!("Math typesetting not confirmed: {}", other),
    }
    readiness
}

async fn wait_for_images(page: &Page, bound: Duration) -> (Readiness, ImageLoadReport) {
    match evaluate_bounded::<ImageLoadReport>(page, templates::IMAGES_READY_SCRIPT, bound).await {
        Ok(report) => {
            for src in &report.failed {
                warn!("Image failed to load: {}", truncate(src, 120));
            }
            debug!(
                "{} image(s) settled, {} failed",
                report.total,
                report.failed.len()
            );
            (Readiness::Ready, report)
        }
        Err(r) => {
            warn!("Image loading not confirmed: {}", r);
            (r, ImageLoadReport::default())
        }
    }
}

/// Evaluate a promise-returning script, bounded by `bound`.
async fn evaluate_bounded<T: DeserializeOwned>(
    page: &Page,
    script: &str,
    bound: Duration,
) -> Result<T, Readiness> {
    let params = EvaluateParams::builder()
        .expression(script)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|reason| Readiness::Failed { reason })?;

    match tokio::time::timeout(bound, page.evaluate_expression(params)).await {
        Err(_) => Err(Readiness::TimedOut {
            after_ms: bound.as_millis() as u64,
        }),
        Ok(Err(e)) => Err(Readiness::Failed {
            reason: e.to_string(),
        }),
        Ok(Ok(result)) => result.into_value::<T>().map_err(|e| Readiness::Failed {
            reason: format!("unexpected gate result: {}", e),
        }),
    }
}

fn enforce(policy: ReadinessPolicy, gate: &str, readiness: &Readiness) -> Result<(), BookError> {
    match (policy, readiness) {
        (_, Readiness::Ready) | (ReadinessPolicy::BestEffort, _) => Ok(()),
        (ReadinessPolicy::Strict, other) => Err(BookError::NotReady {
            gate: gate.to_string(),
            detail: other.to_string(),
        }),
    }
}

/// Atomic write: temp file next to the target, then rename.
pub(crate) async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), BookError> {
    let write_err = |source| BookError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}\u{2026}", head)
    }
}
