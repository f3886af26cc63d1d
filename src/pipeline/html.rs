//! Markup rendering: merged AsciiDoc → body HTML.
//!
//! ## Why spawn_blocking?
//!
//! The default renderer runs the `asciidoctor` executable and waits for it.
//! `tokio::task::spawn_blocking` keeps that wait off the async worker threads.
//! The [`MarkupRenderer`] trait is synchronous for the same reason: an
//! implementation is free to block.

use crate::config::BuildConfig;
use crate::error::BookError;
use crate::pipeline::workdir::WorkDir;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Asciidoctor safe-mode levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeMode {
    Unsafe,
    Safe,
    Server,
    Secure,
}

impl SafeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SafeMode::Unsafe => "unsafe",
            SafeMode::Safe => "safe",
            SafeMode::Server => "server",
            SafeMode::Secure => "secure",
        }
    }
}

/// Everything a renderer needs besides the source file.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub safe_mode: SafeMode,
    /// Root that relative paths (and the safe-mode jail) resolve against.
    pub base_dir: PathBuf,
    /// Attributes as `(name, value)`; `None` sets a flag attribute.
    pub attributes: Vec<(String, Option<String>)>,
}

impl RenderOptions {
    /// Options for the book: data-URI images from the staged folder, SVG
    /// math, highlighted source, font icons, section links and the listing
    /// caption.
    pub fn for_book(config: &BuildConfig, base_dir: &Path, images_dir: &Path) -> Self {
        let attr = |name: &str, value: &str| (name.to_string(), Some(value.to_string()));
        let flag = |name: &str| (name.to_string(), None);

        Self {
            safe_mode: SafeMode::Safe,
            base_dir: base_dir.to_path_buf(),
            attributes: vec![
                attr("imagesdir", &images_dir.to_string_lossy()),
                flag("data-uri"),
                attr("stem", "latexmath"),
                attr("mathematical-format", "svg"),
                flag("mathematical-inline"),
                attr("source-highlighter", "rouge"),
                attr("icons", "font"),
                flag("sectlinks"),
                attr("listing-caption", &config.listing_caption),
            ],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }
}

/// Converts a markup file to embeddable HTML (no `<html>`/`<head>`).
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, source: &Path, options: &RenderOptions) -> Result<String, BookError>;
}

/// Runs the Asciidoctor CLI.
#[derive(Debug, Clone)]
pub struct Asciidoctor {
    program: String,
}

impl Asciidoctor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one invocation. Output goes to stdout (`-o -`).
    pub fn command_args(&self, source: &Path, options: &RenderOptions) -> Vec<String> {
        let mut args = vec![
            "--safe-mode".to_string(),
            options.safe_mode.as_str().to_string(),
            "--embedded".to_string(),
            "--base-dir".to_string(),
            options.base_dir.to_string_lossy().into_owned(),
            "--out-file".to_string(),
            "-".to_string(),
        ];
        for (name, value) in &options.attributes {
            args.push("--attribute".to_string());
            args.push(match value {
                Some(v) => format!("{}={}", name, v),
                None => name.clone(),
            });
        }
        args.push(source.to_string_lossy().into_owned());
        args
    }
}

impl MarkupRenderer for Asciidoctor {
    fn render(&self, source: &Path, options: &RenderOptions) -> Result<String, BookError> {
        let args = self.command_args(source, options);
        debug!("{} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => BookError::RendererNotFound {
                    program: self.program.clone(),
                },
                _ => BookError::RenderFailed {
                    detail: format!("could not run '{}': {}", self.program, e),
                },
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BookError::RenderFailed {
                detail: format!("'{}' exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!("asciidoctor: {}", line);
        }

        String::from_utf8(output.stdout).map_err(|e| BookError::RenderFailed {
            detail: format!("output is not UTF-8: {}", e),
        })
    }
}

/// Render the merged document in `workdir` to body HTML.
pub async fn render_html(workdir: &WorkDir, config: &BuildConfig) -> Result<String, BookError> {
    let renderer: Arc<dyn MarkupRenderer> = match config.renderer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(Asciidoctor::new(config.asciidoctor_bin.clone())),
    };

    let base_dir = absolute(workdir.root())?;
    let images_dir = absolute(&workdir.images_dir())?;
    let options = RenderOptions::for_book(config, &base_dir, &images_dir);
    let source = workdir.merged_path();

    let html = tokio::task::spawn_blocking(move || renderer.render(&source, &options))
        .await
        .map_err(|e| BookError::Internal(format!("Render task panicked: {}", e)))??;

    info!("Rendered {} bytes of HTML", html.len());
    Ok(html)
}

fn absolute(path: &Path) -> Result<PathBuf, BookError> {
    std::path::absolute(path).map_err(|e| BookError::fs(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RenderOptions {
        let config = BuildConfig::default();
        RenderOptions::for_book(&config, Path::new("/tmp/book"), Path::new("/tmp/book/images"))
    }

    #[test]
    fn book_options_carry_required_attributes() {
        let o = options();
        assert_eq!(o.safe_mode, SafeMode::Safe);
        assert_eq!(o.attribute("imagesdir"), Some(Some("/tmp/book/images")));
        assert_eq!(o.attribute("data-uri"), Some(None));
        assert_eq!(o.attribute("stem"), Some(Some("latexmath")));
        assert_eq!(o.attribute("mathematical-format"), Some(Some("svg")));
        assert_eq!(o.attribute("icons"), Some(Some("font")));
        assert_eq!(o.attribute("sectlinks"), Some(None));
        assert_eq!(o.attribute("listing-caption"), Some(Some("Listing")));
        assert!(o.attribute("source-highlighter").is_some());
        assert_eq!(o.attribute("toc"), None);
    }

    #[test]
    fn asciidoctor_args() {
        let args = Asciidoctor::new("asciidoctor").command_args(Path::new("/tmp/book/merged.adoc"), &options());
        assert_eq!(&args[..2], &["--safe-mode", "safe"]);
        assert!(args.contains(&"--embedded".to_string()));
        assert!(args.windows(2).any(|w| w == ["--out-file", "-"]));
        assert!(args.windows(2).any(|w| w == ["--attribute", "data-uri"]));
        assert!(args.windows(2).any(|w| w == ["--attribute", "listing-caption=Listing"]));
        assert_eq!(args.last().unwrap(), "/tmp/book/merged.adoc");
    }

    #[test]
    fn missing_program_is_renderer_not_found() {
        let r = Asciidoctor::new("adocbook-no-such-asciidoctor");
        let err = r.render(Path::new("merged.adoc"), &options()).unwrap_err();
        assert!(matches!(err, BookError::RendererNotFound { .. }), "got: {err:?}");
    }

    struct Echo;

    impl MarkupRenderer for Echo {
        fn render(&self, source: &Path, _options: &RenderOptions) -> Result<String, BookError> {
            let text = std::fs::read_to_string(source).map_err(|e| BookError::fs(source, e))?;
            Ok(format!("<pre>{}</pre>", text))
        }
    }

    #[tokio::test]
    async fn injected_renderer_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::create(tmp.path().join("w"), "code", "images").await.unwrap();
        wd.write_merged("= Book").await.unwrap();

        let config = BuildConfig::builder().renderer(Arc::new(Echo)).build().unwrap();
        let html = render_html(&wd, &config).await.unwrap();
        assert_eq!(html, "<pre>= Book</pre>");
    }
}
