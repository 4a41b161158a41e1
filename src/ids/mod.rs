//! Reconciliation of the authoritative post list against the archive.
//!
//! The authoritative list is order-significant: every subset derived from it
//! (missing posts, invalid posts) is reported in the list's own order so that
//! reprocessing is deterministic.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::fs_utils::{file_stem, list_files, read_json};

/// Work list derived from the authoritative list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Post ids to process, in authoritative (or caller-supplied) order.
    pub ids: Vec<String>,
    /// Explicitly requested ids that are not in the authoritative list.
    pub rejected: Vec<String>,
}

/// Result of comparing the authoritative list with the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierDiff {
    /// Authoritative ids with no archive entry, in authoritative order.
    pub missing: Vec<String>,
    /// Archived ids that the authoritative list does not know about.
    pub extra: BTreeSet<String>,
}

impl IdentifierDiff {
    /// True when the archive matches the authoritative list exactly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// The authoritative ordered list of post ids.
#[derive(Debug, Clone, Default)]
pub struct IdentifierSet {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl IdentifierSet {
    /// Build from an ordered list. Duplicates keep their first position.
    #[must_use]
    pub fn new(ids: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            positions.entry(id.clone()).or_insert(i);
        }
        Self { ids, positions }
    }

    /// Load the authoritative list from a JSON array of strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a string array.
    pub async fn load(path: &Path) -> Result<Self> {
        let ids: Vec<String> = read_json(path).await?;
        info!(path = %path.display(), count = ids.len(), "Loaded authoritative post ids");
        Ok(Self::new(ids))
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Position of `id` in the authoritative list.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Select the posts that still need processing.
    ///
    /// With non-empty `explicit` ids, only those that are authoritative are
    /// returned, in the caller's order; unknown ones are logged and listed in
    /// [`Selection::rejected`]. Otherwise the result is every authoritative id
    /// not in `archived`, in authoritative order, truncated to `limit`. An
    /// empty explicit list counts as no list.
    #[must_use]
    pub fn diff(
        &self,
        archived: &HashSet<String>,
        limit: Option<usize>,
        explicit: Option<&[String]>,
    ) -> Selection {
        if let Some(explicit) = explicit.filter(|e| !e.is_empty()) {
            let (ids, rejected): (Vec<String>, Vec<String>) =
                explicit.iter().cloned().partition(|id| self.contains(id));
            if !rejected.is_empty() {
                warn!(
                    count = rejected.len(),
                    ids = ?rejected,
                    "Requested post ids not found in the authoritative list"
                );
            }
            return Selection { ids, rejected };
        }

        let missing: HashSet<&String> = self
            .positions
            .keys()
            .filter(|id| !archived.contains(*id))
            .collect();
        let mut ids: Vec<String> = missing.into_iter().cloned().collect();
        ids.sort_by_key(|id| self.positions[id]);

        if let Some(limit) = limit {
            ids.truncate(limit);
        }

        Selection {
            ids,
            rejected: Vec::new(),
        }
    }

    /// Archived ids that are absent from the authoritative list.
    #[must_use]
    pub fn extra(&self, archived: &HashSet<String>) -> BTreeSet<String> {
        archived
            .iter()
            .filter(|id| !self.contains(id))
            .cloned()
            .collect()
    }

    /// Full drift report: everything missing plus everything extra.
    #[must_use]
    pub fn reconcile(&self, archived: &HashSet<String>) -> IdentifierDiff {
        IdentifierDiff {
            missing: self.diff(archived, None, None).ids,
            extra: self.extra(archived),
        }
    }

    /// Sort `ids` by authoritative position.
    ///
    /// Ids unknown to the list sort after every known id, lexically.
    #[must_use]
    pub fn order<'a, I>(&self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut sorted: Vec<String> = ids.into_iter().cloned().collect();
        sorted.sort_by(|a, b| {
            let pa = self.position(a).unwrap_or(usize::MAX);
            let pb = self.position(b).unwrap_or(usize::MAX);
            pa.cmp(&pb).then_with(|| a.cmp(b))
        });
        sorted
    }
}

/// Ids currently present in the archive directory.
///
/// Only the stem of each regular file counts; subdirectories are ignored.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or read.
pub async fn scan_archive(dir: &Path) -> Result<HashSet<String>> {
    let files = list_files(dir).await?;
    let archived: HashSet<String> = files.iter().filter_map(|p| file_stem(p)).collect();
    info!(dir = %dir.display(), count = archived.len(), "Scanned archive");
    Ok(archived)
}
