use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use super::{FallbackFetcher, FetchOutcome, ImageSource};
use crate::comments::Post;
use crate::fs_utils::is_nonempty_file;
use crate::registry::{emote_image_url, EmoteRegistry};

/// Placeholder the site serves for attachments without an image.
pub const NO_THUMBNAIL_URL: &str = "https://i.ytimg.com/img/no_thumbnail.jpg";

/// Directory of downloaded images keyed by URL-derived file names.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Percent-encoded last path segment of `url`, query removed.
    #[must_use]
    pub fn file_name(url: &str) -> String {
        let base = url.split('?').next().unwrap_or(url);
        let segment = base.rsplit('/').next().unwrap_or(base);
        urlencoding::encode(segment).into_owned()
    }

    #[must_use]
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(Self::file_name(url))
    }

    /// Whether `url` is already stored. Zero-byte files do not count.
    pub async fn contains(&self, url: &str) -> bool {
        is_nonempty_file(&self.path_for(url)).await
    }
}

/// Tally of one download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub degraded: usize,
    pub skipped: usize,
    /// URL and final status of every download that exhausted all tiers.
    pub failed: Vec<(String, i32)>,
}

impl DownloadSummary {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, url: &str, result: Result<FetchOutcome>) {
        match result {
            Ok(FetchOutcome::Success { .. }) => self.succeeded += 1,
            Ok(FetchOutcome::Degraded { tier, url: used, .. }) => {
                info!(url = %url, used = %used, tier = ?tier, "Downloaded degraded image");
                self.degraded += 1;
            }
            Ok(FetchOutcome::Failure { status }) => {
                warn!(url = %url, status, "Image download failed");
                self.failed.push((url.to_string(), status));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to store image");
                self.failed.push((url.to_string(), 1));
            }
        }
    }
}

/// Attachment images still to download.
///
/// Query strings are dropped, duplicates collapse to their first occurrence,
/// and the no-thumbnail placeholder is never downloaded.
pub async fn plan_attachment_downloads(posts: &[Post], store: &ImageStore) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut planned = Vec::new();

    let urls = posts
        .iter()
        .filter_map(|p| p.content_attachment.as_ref())
        .flat_map(|a| a.images.iter())
        .map(|url| url.split('?').next().unwrap_or(url.as_str()));

    for url in urls {
        if url == NO_THUMBNAIL_URL || !seen.insert(url) {
            continue;
        }
        if store.contains(url).await {
            continue;
        }
        planned.push(url.to_string());
    }

    info!(count = planned.len(), "Attachment images to download");
    planned
}

/// Download each URL into the store, one at a time.
pub async fn download_all<S: ImageSource>(
    urls: &[String],
    fetcher: &FallbackFetcher<S>,
    store: &ImageStore,
) -> DownloadSummary {
    let mut summary = DownloadSummary::default();
    let total = urls.len();

    for (i, url) in urls.iter().enumerate() {
        info!("Downloading {url} ({}/{total})", i + 1);
        let result = fetcher.fetch_to(url, &store.path_for(url)).await;
        summary.record(url, result);
    }

    summary
}

/// Download the image of every registry emote to `<dir>/<name>.png`.
///
/// Emotes that already have a non-empty file are skipped.
pub async fn download_emotes<S: ImageSource>(
    registry: &EmoteRegistry,
    fetcher: &FallbackFetcher<S>,
    dir: &Path,
    base: &str,
    size_suffix: &str,
) -> DownloadSummary {
    let mut summary = DownloadSummary::default();

    for (code, name) in registry.entries() {
        let dest = dir.join(format!("{}.png", urlencoding::encode(name)));
        if is_nonempty_file(&dest).await {
            summary.skipped += 1;
            continue;
        }
        let url = emote_image_url(code, base, size_suffix);
        let result = fetcher.fetch_to(&url, &dest).await;
        summary.record(&url, result);
    }

    summary
}
