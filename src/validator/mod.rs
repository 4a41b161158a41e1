//! Signature-based completeness checks for archived post pages.
//!
//! Pages are never parsed into a DOM. Each check looks for fixed substrings of
//! the one page template the archive was captured from, which is fast and
//! tolerant of malformed markup.

mod report;
mod signatures;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::fs_utils::{file_stem, list_files};

pub use report::{write_reports, INVALID_IDS_FILE, INVALID_REPORT_FILE};
pub use signatures::{FailureTag, Signatures};

static DEFAULT_SIGNATURES: LazyLock<Signatures> = LazyLock::new(Signatures::default);

/// Check a page against the default signatures.
#[must_use]
pub fn check(html: &str) -> Vec<FailureTag> {
    check_with(html, &DEFAULT_SIGNATURES)
}

/// Run every check against `html` and return all failures, in check order.
#[must_use]
pub fn check_with(html: &str, sig: &Signatures) -> Vec<FailureTag> {
    let mut tags = Vec::new();

    // The disabled-comments link replaces the comment section, so it must be
    // present exactly when the comment UI labels are absent.
    let comments_disabled = html.contains(&sig.comments_disabled_link);
    if comments_disabled != !html.contains(&sig.sort_comments) {
        tags.push(FailureTag::SortLabel);
    }
    if comments_disabled != !html.contains(&sig.add_comment) {
        tags.push(FailureTag::AddLabel);
    }

    if !html.contains(&sig.like) {
        tags.push(FailureTag::LikeLabel);
    }
    if !html.contains(&sig.dislike) {
        tags.push(FailureTag::DislikeLabel);
    }

    if html.contains(&sig.more_replies) {
        tags.push(FailureTag::MoreReplies);
    }

    if !poll_is_complete(html, sig) {
        tags.push(FailureTag::PollAttachment);
    }

    tags
}

/// A visible poll needs a visible selected-option icon somewhere in the page.
fn poll_is_complete(html: &str, sig: &Signatures) -> bool {
    let has_visible_poll = html
        .lines()
        .any(|line| line.contains(&sig.poll_marker) && !line.contains(&sig.hidden_marker));
    if !has_visible_poll {
        return true;
    }

    html.lines().any(|line| {
        line.split('<').any(|chunk| {
            chunk.contains(&sig.selected_option_marker) && !chunk.contains(&sig.hidden_marker)
        })
    })
}

/// Per-post validation results for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    results: BTreeMap<String, Vec<FailureTag>>,
}

impl ValidationReport {
    pub fn record(&mut self, post_id: String, tags: Vec<FailureTag>) {
        self.results.insert(post_id, tags);
    }

    /// Tags for a post; empty means valid.
    #[must_use]
    pub fn tags(&self, post_id: &str) -> Option<&[FailureTag]> {
        self.results.get(post_id).map(Vec::as_slice)
    }

    /// Posts with at least one failure tag.
    pub fn invalid(&self) -> impl Iterator<Item = (&String, &Vec<FailureTag>)> {
        self.results.iter().filter(|(_, tags)| !tags.is_empty())
    }

    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.invalid().count()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.invalid_count() == 0
    }
}

/// Validate every archived page in `dir`.
///
/// Unreadable files are logged and skipped; invalid bytes are replaced rather
/// than rejected, so a single bad file never stops the run.
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be listed.
pub async fn validate_archive(dir: &Path, sig: &Signatures) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    for path in list_files(dir).await? {
        let Some(post_id) = file_stem(&path) else {
            warn!(path = %path.display(), "Archive file name is not UTF-8, skipping");
            continue;
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(post_id = %post_id, error = %e, "Failed to read archived page, skipping");
                continue;
            }
        };
        let html = String::from_utf8_lossy(&bytes);

        let tags = check_with(&html, sig);
        if tags.is_empty() {
            debug!(post_id = %post_id, "Archived page is valid");
        } else {
            warn!(post_id = %post_id, tags = ?tags, "Archived page is not valid");
        }
        report.record(post_id, tags);
    }

    let total = report.total();
    let invalid = report.invalid_count();
    let percent = if total == 0 {
        0.0
    } else {
        100.0 * invalid as f64 / total as f64
    };
    info!(invalid, total, "{invalid}/{total} invalid ({percent:.2}%)");

    Ok(report)
}
