//! Merger: download chapters, normalise image paths, join into one document.
//!
//! Chapters reference images as `image::images/<file>[<alt>]` relative to the
//! repository root. The renderer is pointed at the staged images folder
//! through `imagesdir`, so the `images/` prefix has to go.

use crate::config::BuildConfig;
use crate::error::BookError;
use crate::output::AssetKind;
use crate::pipeline::fetch;
use crate::pipeline::listing::RemoteFile;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info};

/// Separator placed between two chapters.
pub const CHAPTER_SEPARATOR: &str = "\n\n";

static RE_IMAGE_MACRO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"image::images/([^\[\n]+?)\[([^\]]*)\]").unwrap());

/// Strip the leading `images/` from every block image macro. Alt text and
/// attributes inside the brackets are kept verbatim.
pub fn rewrite_image_paths(source: &str) -> String {
    RE_IMAGE_MACRO
        .replace_all(source, "image::${1}[${2}]")
        .into_owned()
}

/// Join documents in order with one blank line between each pair.
pub fn merge_documents<S: AsRef<str>>(documents: &[S]) -> String {
    documents
        .iter()
        .map(|d| d.as_ref())
        .collect::<Vec<&str>>()
        .join(CHAPTER_SEPARATOR)
}

/// Download `chapters`, rewrite their image paths and merge them.
///
/// An empty chapter list yields an empty document. One failed download fails
/// the whole merge.
pub async fn merge_chapters(
    client: &Client,
    chapters: &[RemoteFile],
    config: &BuildConfig,
) -> Result<String, BookError> {
    let payloads = fetch::fetch_all(client, chapters, AssetKind::Chapter, config).await?;

    let documents: Vec<String> = payloads
        .into_iter()
        .zip(chapters)
        .map(|(payload, chapter)| {
            let text = payload.into_text();
            let rewritten = rewrite_image_paths(&text);
            debug!("{}: {} → {} bytes", chapter.name, text.len(), rewritten.len());
            rewritten
        })
        .collect();

    let merged = merge_documents(&documents);
    info!(
        "Merged {} chapter(s) into {} bytes",
        documents.len(),
        merged.len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_images_prefix_and_keeps_alt() {
        let src = "Intro\n\nimage::images/foo.png[Alt text]\n";
        let out = rewrite_image_paths(src);
        assert_eq!(out, "Intro\n\nimage::foo.png[Alt text]\n");
        assert!(!out.contains("images/"));
    }

    #[test]
    fn keeps_quoted_alt_and_attributes() {
        let src = r#"image::images/mbc3_0101.png["Bitcoin transaction",width=500]"#;
        assert_eq!(
            rewrite_image_paths(src),
            r#"image::mbc3_0101.png["Bitcoin transaction",width=500]"#
        );
    }

    #[test]
    fn rewrites_every_occurrence() {
        let src = "image::images/a.png[]\ntext\nimage::images/sub/b.svg[B]";
        assert_eq!(rewrite_image_paths(src), "image::a.png[]\ntext\nimage::sub/b.svg[B]");
    }

    #[test]
    fn target_with_spaces_is_rewritten() {
        let src = "image::images/bitcoin logo.png[Logo]\nimage::images/a b/c d.svg[]";
        assert_eq!(
            rewrite_image_paths(src),
            "image::bitcoin logo.png[Logo]\nimage::a b/c d.svg[]"
        );
    }

    #[test]
    fn target_does_not_span_lines() {
        let src = "image::images/broken\n[not an alt]";
        assert_eq!(rewrite_image_paths(src), src);
    }

    #[test]
    fn leaves_other_paths_alone() {
        let src = "image::diagrams/a.png[A]\nimage:images/inline.png[inline]\nsee images/ folder";
        assert_eq!(rewrite_image_paths(src), src);
    }

    #[test]
    fn merge_joins_with_blank_line() {
        let docs = vec!["= One".to_string(), "= Two".to_string(), "= Three".to_string()];
        let merged = merge_documents(&docs);
        assert_eq!(merged, "= One\n\n= Two\n\n= Three");
        assert_eq!(merged.split(CHAPTER_SEPARATOR).count(), docs.len());
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let docs: Vec<String> = Vec::new();
        assert_eq!(merge_documents(&docs), "");
    }

    #[tokio::test]
    async fn merge_chapters_without_chapters_is_empty() {
        let config = BuildConfig::default();
        let client = fetch::build_client(&config).unwrap();
        let merged = merge_chapters(&client, &[], &config).await.unwrap();
        assert!(merged.is_empty());
    }
}
