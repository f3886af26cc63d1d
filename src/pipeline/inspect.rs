//! Read facts back from a written PDF.
//!
//! `lopdf` parses synchronously, so the load runs in `spawn_blocking`.

use crate::error::BookError;
use crate::output::PdfInfo;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Page count, version and size of the PDF at `path`.
pub async fn read_pdf_info(path: &Path) -> Result<PdfInfo, BookError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_pdf_info_blocking(path))
        .await
        .map_err(|e| BookError::Internal(format!("Inspect task panicked: {}", e)))?
}

fn read_pdf_info_blocking(path: PathBuf) -> Result<PdfInfo, BookError> {
    let bytes = std::fs::read(&path).map_err(|e| BookError::fs(&path, e))?;
    let document = lopdf::Document::load_mem(&bytes).map_err(|e| BookError::CorruptPdf {
        path: path.clone(),
        detail: e.to_string(),
    })?;

    let info = PdfInfo {
        page_count: document.get_pages().len(),
        pdf_version: document.version.clone(),
        file_size: bytes.len() as u64,
        path,
    };
    debug!(
        "{}: {} page(s), PDF {}",
        info.path.display(),
        info.page_count,
        info.pdf_version
    );
    Ok(info)
}
