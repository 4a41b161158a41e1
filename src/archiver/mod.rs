//! Archiving of missing posts through an external page extractor.
//!
//! Rendering a post happens in a browser session this crate does not own; it
//! only drives the extractor over the work list and stores what comes back.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

/// Produces the rendered HTML of a post.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Render `post_id` and return the page HTML.
    ///
    /// # Errors
    ///
    /// Returns an error if the page could not be rendered or extracted.
    async fn extract(&self, post_id: &str) -> Result<String>;
}

/// Tally of one archiving run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub saved: Vec<String>,
    pub failed: Vec<String>,
}

impl ArchiveSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.saved.len() + self.failed.len()
    }
}

/// Path of the archive entry for `post_id`.
#[must_use]
pub fn entry_path(archive_dir: &Path, post_id: &str) -> PathBuf {
    archive_dir.join(format!("{post_id}.html"))
}

/// Extract and store each post in `ids`, in order.
///
/// A failed post is logged and counted; it never stops the run.
///
/// # Errors
///
/// Returns an error only if the archive directory cannot be created.
pub async fn archive_missing<P: PostSource + ?Sized>(
    ids: &[String],
    source: &P,
    archive_dir: &Path,
) -> Result<ArchiveSummary> {
    tokio::fs::create_dir_all(archive_dir)
        .await
        .with_context(|| format!("Failed to create archive directory: {}", archive_dir.display()))?;

    let mut summary = ArchiveSummary::default();
    let total = ids.len();

    for (i, post_id) in ids.iter().enumerate() {
        info!(post_id = %post_id, "[{}/{total}] Processing", i + 1);
        match save_post(post_id, source, archive_dir).await {
            Ok(bytes) => {
                info!(post_id = %post_id, bytes, "Saved archived post");
                summary.saved.push(post_id.clone());
            }
            Err(e) => {
                warn!(post_id = %post_id, error = %format!("{e:#}"), "Failed to archive post");
                summary.failed.push(post_id.clone());
            }
        }
    }

    info!(
        saved = summary.saved.len(),
        failed = summary.failed.len(),
        total,
        "Archive run complete"
    );
    Ok(summary)
}

async fn save_post<P: PostSource + ?Sized>(
    post_id: &str,
    source: &P,
    archive_dir: &Path,
) -> Result<usize> {
    let html = source.extract(post_id).await?;
    if html.is_empty() {
        anyhow::bail!("extractor returned an empty page");
    }
    let path = entry_path(archive_dir, post_id);
    tokio::fs::write(&path, &html)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(html.len())
}
