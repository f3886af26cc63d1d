//! The scratch directory that lives for exactly one build.
//!
//! Layout:
//!
//! ```text
//! <root>/
//! ├── code/         staged code listings
//! ├── images/       staged images (the renderer's imagesdir)
//! └── merged.adoc   the merged document handed to the renderer
//! ```
//!
//! It is created before staging and removed after the PDF is written. A
//! failing stage leaves it behind; the next run reuses the same path.

use crate::error::BookError;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const MERGED_FILE_NAME: &str = "merged.adoc";

#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
    code_folder: String,
    images_folder: String,
}

impl WorkDir {
    /// Create `root` (and parents). The category folders are created by the
    /// stager once their downloads are in.
    pub async fn create(
        root: impl Into<PathBuf>,
        code_folder: &str,
        images_folder: &str,
    ) -> Result<Self, BookError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            let e = BookError::fs(&root, e);
            error!("{}", e);
            e
        })?;
        debug!("Scratch directory ready: {}", root.display());
        Ok(Self {
            root,
            code_folder: leaf_name(code_folder, "code"),
            images_folder: leaf_name(images_folder, "images"),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn code_dir(&self) -> PathBuf {
        self.root.join(&self.code_folder)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(&self.images_folder)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.root.join(MERGED_FILE_NAME)
    }

    pub async fn write_merged(&self, merged: &str) -> Result<PathBuf, BookError> {
        let path = self.merged_path();
        tokio::fs::write(&path, merged).await.map_err(|e| {
            let e = BookError::fs(&path, e);
            error!("{}", e);
            e
        })?;
        debug!("Wrote merged document ({} bytes) to {}", merged.len(), path.display());
        Ok(path)
    }

    /// Delete the whole tree. A tree that is already gone is not an error.
    pub async fn remove(&self) -> Result<(), BookError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                info!("Removed scratch directory {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                let e = BookError::fs(&self.root, e);
                error!("{}", e);
                Err(e)
            }
        }
    }
}

/// Remote folders may be nested (`assets/images`); staging mirrors the last
/// segment only.
fn leaf_name(folder: &str, fallback: &str) -> String {
    folder
        .trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_name_mirrors_last_segment() {
        assert_eq!(leaf_name("images", "x"), "images");
        assert_eq!(leaf_name("assets/images/", "x"), "images");
        assert_eq!(leaf_name("", "code"), "code");
    }

    #[tokio::test]
    async fn create_write_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("temp_adoc_files");

        let wd = WorkDir::create(&root, "code", "images").await.unwrap();
        assert!(root.is_dir());
        assert_eq!(wd.images_dir(), root.join("images"));

        let merged = wd.write_merged("= Book\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(merged).unwrap(), "= Book\n");

        wd.remove().await.unwrap();
        assert!(!root.exists());
        // Second removal is a no-op.
        wd.remove().await.unwrap();
    }

    #[tokio::test]
    async fn create_under_a_file_is_a_filesystem_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = WorkDir::create(blocker.join("scratch"), "code", "images")
            .await
            .unwrap_err();
        assert!(err.is_filesystem(), "got: {err:?}");
    }

    #[tokio::test]
    async fn write_merged_after_removal_is_a_filesystem_error() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::create(tmp.path().join("scratch"), "code", "images")
            .await
            .unwrap();
        wd.remove().await.unwrap();

        let err = wd.write_merged("= Book\n").await.unwrap_err();
        assert!(err.is_filesystem(), "got: {err:?}");
        assert!(!wd.merged_path().exists());
    }
}
