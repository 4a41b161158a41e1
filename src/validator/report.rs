use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::{FailureTag, ValidationReport};
use crate::fs_utils::write_json_pretty;
use crate::ids::IdentifierSet;

/// Post id → failure tags, for every invalid post.
pub const INVALID_REPORT_FILE: &str = "invalid.json";
/// Invalid post ids in authoritative order.
pub const INVALID_IDS_FILE: &str = "invalid_ids.json";

/// Write both side-channel reports into `dir`.
///
/// # Errors
///
/// Returns an error if a report cannot be written.
pub async fn write_reports(
    report: &ValidationReport,
    authoritative: &IdentifierSet,
    dir: &Path,
) -> Result<()> {
    let invalid: BTreeMap<&String, &Vec<FailureTag>> = report.invalid().collect();
    let ordered = authoritative.order(invalid.keys().copied());

    write_json_pretty(&dir.join(INVALID_REPORT_FILE), &invalid).await?;
    write_json_pretty(&dir.join(INVALID_IDS_FILE), &ordered).await?;

    info!(dir = %dir.display(), invalid = ordered.len(), "Validation reports written");
    Ok(())
}
