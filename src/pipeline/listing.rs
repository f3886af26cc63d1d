//! Content lister and chapter selector.
//!
//! The lister asks the contents API for one folder and keeps the entries that
//! can be downloaded. Selection and ordering are pure functions over the
//! result so they can be tested without a network.

use crate::config::{BuildConfig, ChapterOrder};
use crate::error::BookError;
use crate::pipeline::fetch::{self, ResponseKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// One downloadable entry of a remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub download_url: String,
}

/// Shape of a contents-API entry. Only the fields we read are declared.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// List the downloadable files of `folder` (empty string = repository root).
pub async fn list_folder(
    client: &Client,
    config: &BuildConfig,
    folder: &str,
) -> Result<Vec<RemoteFile>, BookError> {
    let url = config.folder_url(folder);
    let body = fetch::fetch(client, &url, ResponseKind::Text, config.fetch_timeout_secs)
        .await?
        .into_text();

    let files = parse_listing(&url, &body).inspect_err(|e| error!("Listing failed: {}", e))?;
    info!("Listed {} file(s) in '{}'", files.len(), url);
    Ok(files)
}

/// Decode a listing body. Entries without a download URL (sub-folders,
/// submodules) are skipped.
pub fn parse_listing(url: &str, body: &str) -> Result<Vec<RemoteFile>, BookError> {
    let entries: Vec<ListingEntry> =
        serde_json::from_str(body).map_err(|e| BookError::InvalidListing {
            url: url.to_string(),
            detail: format!("expected a JSON array of entries: {}", e),
        })?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry.download_url {
            Some(download_url) => Some(RemoteFile {
                name: entry.name,
                download_url,
            }),
            None => {
                debug!(
                    "Skipping '{}' ({}): no download URL",
                    entry.name,
                    entry.kind.as_deref().unwrap_or("unknown")
                );
                None
            }
        })
        .collect())
}

/// Keep chapter documents and put them in merge order.
pub fn select_chapters(
    entries: Vec<RemoteFile>,
    prefix: &str,
    extension: &str,
    order: ChapterOrder,
) -> Vec<RemoteFile> {
    let mut chapters: Vec<RemoteFile> = entries
        .into_iter()
        .filter(|f| is_chapter(&f.name, prefix, extension))
        .collect();

    if order == ChapterOrder::Numeric {
        chapters.sort_by(|a, b| {
            chapter_sort_key(&a.name, prefix).cmp(&chapter_sort_key(&b.name, prefix))
        });
    }
    chapters
}

pub fn is_chapter(name: &str, prefix: &str, extension: &str) -> bool {
    name.starts_with(prefix) && name.ends_with(extension) && name.len() >= prefix.len() + extension.len()
}

/// The number right after the prefix: `ch07_keys.adoc` → 7.
pub fn chapter_number(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Numbered chapters first, by number; ties and unnumbered names by name.
fn chapter_sort_key<'a>(name: &'a str, prefix: &str) -> (u32, &'a str) {
    (chapter_number(name, prefix).unwrap_or(u32::MAX), name)
}

/// List the chapter folder and select chapters from it.
pub async fn list_chapters(client: &Client, config: &BuildConfig) -> Result<Vec<RemoteFile>, BookError> {
    let entries = list_folder(client, config, &config.chapter_folder).await?;
    let chapters = select_chapters(
        entries,
        &config.chapter_prefix,
        &config.chapter_extension,
        config.chapter_order,
    );
    info!("Selected {} chapter(s)", chapters.len());
    Ok(chapters)
}
