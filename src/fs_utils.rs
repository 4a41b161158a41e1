use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// Regular files directly inside `dir`, sorted by path.
///
/// Subdirectories are skipped, not descended into. The directory is created
/// when it does not exist yet so a fresh checkout scans as empty. An entry that
/// cannot be inspected is logged and skipped.
pub async fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                // The stream cannot be resumed after a read error
                warn!(dir = %dir.display(), error = %e, "Directory listing cut short");
                break;
            }
        };

        let path = entry.path();
        // Follows symlinks, so a linked file counts and a dangling link is skipped
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => debug!(path = %path.display(), "Skipping non-file entry"),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
        }
    }
    files.sort();

    Ok(files)
}

/// The file stem as UTF-8, if it has one.
#[must_use]
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(ToString::to_string)
}

/// True when `path` is an existing file with at least one byte.
pub async fn is_nonempty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Write `value` as pretty JSON, creating parent directories as needed.
pub async fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value).context("Failed to serialize JSON")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Read and parse a JSON file.
pub async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_files_skips_directories() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("b.html"), "x").await.unwrap();
        tokio::fs::write(temp.path().join("a.html"), "x").await.unwrap();
        tokio::fs::create_dir(temp.path().join("nested")).await.unwrap();

        let files = list_files(temp.path()).await.unwrap();
        let stems: Vec<_> = files.iter().filter_map(|p| file_stem(p)).collect();
        assert_eq!(stems, vec!["a", "b"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_files_skips_unreadable_entries() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("real.html"), "x").await.unwrap();
        tokio::fs::write(temp.path().join("target.html"), "x").await.unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone.html"), temp.path().join("dangling.html"))
            .unwrap();
        std::os::unix::fs::symlink(temp.path().join("target.html"), temp.path().join("linked.html"))
            .unwrap();

        let files = list_files(temp.path()).await.unwrap();
        let stems: Vec<_> = files.iter().filter_map(|p| file_stem(p)).collect();
        assert_eq!(stems, vec!["linked", "real", "target"]);
    }

    #[tokio::test]
    async fn test_list_files_creates_missing_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("archive");
        assert!(list_files(&dir).await.unwrap().is_empty());
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_zero_byte_file_is_not_present() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty.jpg");
        let full = temp.path().join("full.jpg");
        tokio::fs::write(&empty, b"").await.unwrap();
        tokio::fs::write(&full, b"jpeg").await.unwrap();

        assert!(!is_nonempty_file(&empty).await);
        assert!(is_nonempty_file(&full).await);
        assert!(!is_nonempty_file(&temp.path().join("missing.jpg")).await);
    }
}
