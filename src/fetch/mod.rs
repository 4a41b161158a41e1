//! Image retrieval with a degrading URL fallback.
//!
//! Image URLs on the source site carry a size qualifier (`=s240`, `=s48-c-k`)
//! that can stop being served. When the exact URL fails the fetcher retries
//! with the qualifier cut back, then with it removed entirely.

mod http;
mod store;

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use http::HttpImageSource;
pub use store::{
    download_all, download_emotes, plan_attachment_downloads, DownloadSummary, ImageStore,
    NO_THUMBNAIL_URL,
};

static SIZE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+)=s\d+").expect("valid size suffix pattern"));

/// Failure of a single download attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("server returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Non-zero status reported upward when every tier fails.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Status(code) => i32::from(*code),
            Self::Transport(_) => 1,
        }
    }
}

/// Something that can turn a URL into bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download `url` once.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails for any reason.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl<T: ImageSource + ?Sized> ImageSource for std::sync::Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url).await
    }
}

/// Which URL form produced the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// The URL exactly as given.
    Exact,
    /// The URL cut back to end at its `=sNNN` qualifier.
    SizeSuffix,
    /// The URL with the `=sNNN` qualifier removed.
    Stripped,
}

/// Final result of fetching one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { bytes: usize },
    Degraded { bytes: usize, tier: Tier, url: String },
    Failure { status: i32 },
}

/// An image together with the URL form that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    pub tier: Tier,
    pub url: String,
    pub bytes: Vec<u8>,
}

impl Retrieved {
    #[must_use]
    pub fn outcome(&self) -> FetchOutcome {
        match self.tier {
            Tier::Exact => FetchOutcome::Success {
                bytes: self.bytes.len(),
            },
            tier => FetchOutcome::Degraded {
                bytes: self.bytes.len(),
                tier,
                url: self.url.clone(),
            },
        }
    }
}

/// Every tier failed; `status` is the last attempt's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("all fetch tiers failed (last status {status})")]
pub struct FetchFailure {
    pub status: i32,
}

/// Runs the three fetch tiers strictly in order.
#[derive(Debug, Clone)]
pub struct FallbackFetcher<S> {
    source: S,
}

impl<S: ImageSource> FallbackFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch `url`, degrading the URL shape on failure.
    ///
    /// # Errors
    ///
    /// Returns [`FetchFailure`] when the exact URL fails and either the URL has
    /// no size qualifier or both degraded forms fail too.
    pub async fn fetch(&self, url: &str) -> Result<Retrieved, FetchFailure> {
        let err = match self.source.fetch(url).await {
            Ok(bytes) => return Ok(retrieved(Tier::Exact, url, bytes)),
            Err(e) => e,
        };
        warn!(url = %url, tier = ?Tier::Exact, error = %err, "Image fetch failed");

        let Some(caps) = SIZE_SUFFIX.captures(url) else {
            debug!(url = %url, "No size qualifier to degrade");
            return Err(FetchFailure {
                status: err.status_code(),
            });
        };
        let sized = &caps[0];
        let stripped = &caps[1];

        match self.source.fetch(sized).await {
            Ok(bytes) => return Ok(retrieved(Tier::SizeSuffix, sized, bytes)),
            Err(e) => {
                warn!(url = %sized, tier = ?Tier::SizeSuffix, error = %e, "Image fetch failed");
            }
        }

        match self.source.fetch(stripped).await {
            Ok(bytes) => {
                info!(url = %stripped, "Image fetched without size qualifier");
                Ok(retrieved(Tier::Stripped, stripped, bytes))
            }
            Err(e) => {
                warn!(url = %stripped, tier = ?Tier::Stripped, error = %e, "Image fetch failed");
                Err(FetchFailure {
                    status: e.status_code(),
                })
            }
        }
    }

    /// Fetch `url` and write the image to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the image was fetched but could not be written;
    /// fetch failures are reported as [`FetchOutcome::Failure`].
    pub async fn fetch_to(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        let retrieved = match self.fetch(url).await {
            Ok(r) => r,
            Err(failure) => {
                return Ok(FetchOutcome::Failure {
                    status: failure.status,
                })
            }
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        tokio::fs::write(dest, &retrieved.bytes)
            .await
            .with_context(|| format!("Failed to write image: {}", dest.display()))?;

        Ok(retrieved.outcome())
    }
}

fn retrieved(tier: Tier, url: &str, bytes: Vec<u8>) -> Retrieved {
    Retrieved {
        tier,
        url: url.to_string(),
        bytes,
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::ScriptedSource;
    use super::*;

    #[tokio::test]
    async fn test_exact_url_success() {
        let source = Arc::new(ScriptedSource::with(&[(
            "https://host/img=s240",
            Ok(b"abc".to_vec()),
        )]));
        let fetcher = FallbackFetcher::new(Arc::clone(&source));

        let got = fetcher.fetch("https://host/img=s240").await.unwrap();
        assert_eq!(got.outcome(), FetchOutcome::Success { bytes: 3 });
        assert_eq!(source.calls(), vec!["https://host/img=s240"]);
    }

    #[tokio::test]
    async fn test_stripped_url_is_degraded() {
        let source = Arc::new(ScriptedSource::with(&[(
            "https://host/img",
            Ok(b"png!".to_vec()),
        )]));
        let fetcher = FallbackFetcher::new(Arc::clone(&source));

        let got = fetcher.fetch("https://host/img=s240").await.unwrap();
        assert_eq!(
            got.outcome(),
            FetchOutcome::Degraded {
                bytes: 4,
                tier: Tier::Stripped,
                url: "https://host/img".to_string(),
            }
        );
        assert_eq!(
            source.calls(),
            vec!["https://host/img=s240", "https://host/img=s240", "https://host/img"]
        );
    }

    #[tokio::test]
    async fn test_size_suffix_tier_drops_trailing_options() {
        let source = Arc::new(ScriptedSource::with(&[(
            "https://host/code=s240",
            Ok(b"x".to_vec()),
        )]));
        let fetcher = FallbackFetcher::new(Arc::clone(&source));

        let got = fetcher.fetch("https://host/code=s240-c-k-nd").await.unwrap();
        assert_eq!(got.tier, Tier::SizeSuffix);
        assert_eq!(got.url, "https://host/code=s240");
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_url_without_qualifier_fails_after_one_attempt() {
        let source = Arc::new(ScriptedSource::with(&[(
            "https://host/plain.jpg",
            Err(FetchError::Status(410)),
        )]));
        let fetcher = FallbackFetcher::new(Arc::clone(&source));

        let err = fetcher.fetch("https://host/plain.jpg").await.unwrap_err();
        assert_eq!(err.status, 410);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_all_tiers_fail_reports_last_status() {
        let source = Arc::new(ScriptedSource::with(&[
            ("https://host/img=s96", Err(FetchError::Status(404))),
            ("https://host/img", Err(FetchError::Transport("reset".into()))),
        ]));
        let fetcher = FallbackFetcher::new(Arc::clone(&source));

        let err = fetcher.fetch("https://host/img=s96").await.unwrap_err();
        assert_eq!(err.status, 1);
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_to_writes_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("sub/out.png");
        let fetcher = FallbackFetcher::new(ScriptedSource::with(&[(
            "https://h/a=s1",
            Ok(b"data".to_vec()),
        )]));

        let outcome = fetcher.fetch_to("https://h/a=s1", &dest).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Success { bytes: 4 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");

        let missing = temp.path().join("never.png");
        let outcome = fetcher.fetch_to("https://h/none", &missing).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Failure { status: 404 });
        assert!(!missing.exists());
    }
}
