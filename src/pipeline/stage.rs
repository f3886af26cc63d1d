//! Stager: mirror one remote folder into the scratch directory.
//!
//! All downloads of the batch go first (bounded pool, results in input
//! order), then the target folder is created, then all writes run through the
//! same bounded pool. A failed download aborts before anything is written; a
//! failed write leaves the files that were already written.

use crate::config::BuildConfig;
use crate::error::BookError;
use crate::output::{AssetKind, StagedAsset};
use crate::pipeline::fetch::{self, Payload};
use crate::pipeline::listing::{self, RemoteFile};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use std::path::Path;
use tracing::{error, info};

/// Download `files` and write them into `dir`.
pub async fn stage_files(
    client: &Client,
    files: &[RemoteFile],
    kind: AssetKind,
    dir: &Path,
    config: &BuildConfig,
) -> Result<Vec<StagedAsset>, BookError> {
    for file in files {
        validate_name(file)?;
    }

    let payloads = fetch::fetch_all(client, files, kind, config).await?;

    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        let e = BookError::fs(dir, e);
        error!("{}", e);
        e
    })?;

    let staged: Vec<StagedAsset> = stream::iter(files.iter().zip(payloads).map(
        |(file, payload)| async move { write_asset(dir, file, payload).await },
    ))
    .buffer_unordered(config.concurrency)
    .try_collect()
    .await?;

    info!("Staged {} {} file(s) into {}", staged.len(), kind, dir.display());
    Ok(staged)
}

/// List `folder` remotely and stage every entry into `dir`.
pub async fn stage_folder(
    client: &Client,
    config: &BuildConfig,
    folder: &str,
    kind: AssetKind,
    dir: &Path,
) -> Result<Vec<StagedAsset>, BookError> {
    let files = listing::list_folder(client, config, folder).await?;
    stage_files(client, &files, kind, dir, config).await
}

async fn write_asset(dir: &Path, file: &RemoteFile, payload: Payload) -> Result<StagedAsset, BookError> {
    let path = dir.join(&file.name);
    tokio::fs::write(&path, payload.as_bytes()).await.map_err(|e| {
        let e = BookError::fs(&path, e);
        error!("{}", e);
        e
    })?;
    Ok(StagedAsset {
        name: file.name.clone(),
        path,
        bytes: payload.len(),
    })
}

/// Staged names become paths; keep them inside the target folder.
fn validate_name(file: &RemoteFile) -> Result<(), BookError> {
    let name = file.name.as_str();
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(BookError::InvalidListing {
            url: file.download_url.clone(),
            detail: format!("unsafe file name '{}'", name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            download_url: "http://127.0.0.1:1/x".to_string(),
        }
    }

    #[test]
    fn traversal_names_are_rejected() {
        assert!(validate_name(&remote("mbc3_0101.png")).is_ok());
        assert!(validate_name(&remote("../etc/passwd")).is_err());
        assert!(validate_name(&remote("..")).is_err());
        assert!(validate_name(&remote("a\\b")).is_err());
        assert!(validate_name(&remote("")).is_err());
    }

    #[tokio::test]
    async fn unsafe_name_fails_before_any_download() {
        let tmp = tempfile::tempdir().unwrap();
        let config = BuildConfig::default();
        let client = fetch::build_client(&config).unwrap();
        let err = stage_files(
            &client,
            &[remote("../escape.py")],
            AssetKind::Code,
            &tmp.path().join("code"),
            &config,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BookError::InvalidListing { .. }));
        assert!(!tmp.path().join("code").exists());
    }

    #[tokio::test]
    async fn write_asset_reports_size() {
        let tmp = tempfile::tempdir().unwrap();
        let asset = write_asset(
            tmp.path(),
            &remote("key.py"),
            Payload::Text("print(1)\n".into()),
        )
        .await
        .unwrap();
        assert_eq!(asset.bytes, 9);
        assert_eq!(std::fs::read_to_string(asset.path).unwrap(), "print(1)\n");
    }
}
