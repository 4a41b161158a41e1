//! Emote and image-code registry.
//!
//! Maps the short code embedded in a custom emote image URL to the emote's
//! human name. The mapping is assembled from several JSON layers where later
//! layers override earlier ones.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry layer {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("registry layer {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fold mappings left to right; a later mapping wins on key conflicts.
#[must_use]
pub fn merge_layers<I>(layers: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = HashMap<String, String>>,
{
    layers.into_iter().fold(HashMap::new(), |mut merged, layer| {
        merged.extend(layer);
        merged
    })
}

/// Registry lookup key for an image URL.
///
/// The last path segment up to its first `=`, with the `=` put back:
/// `https://yt3.ggpht.com/AbC-x=s48-c-k` becomes `AbC-x=`.
#[must_use]
pub fn image_code(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or(url);
    let stem = segment.split('=').next().unwrap_or(segment);
    format!("{stem}=")
}

/// Download URL for a registry code at the given size qualifier.
#[must_use]
pub fn emote_image_url(code: &str, base: &str, size_suffix: &str) -> String {
    format!("{base}{code}{size_suffix}")
}

/// Merged code → name mapping with a reverse index.
#[derive(Debug, Clone, Default)]
pub struct EmoteRegistry {
    by_code: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl EmoteRegistry {
    #[must_use]
    pub fn with_mapping(mapping: HashMap<String, String>) -> Self {
        // Deterministic reverse index: the lexically smallest code wins a shared name.
        let mut pairs: Vec<(&String, &String)> = mapping.iter().collect();
        pairs.sort();
        let mut by_name = HashMap::with_capacity(pairs.len());
        for (code, name) in pairs {
            by_name.entry(name.clone()).or_insert_with(|| code.clone());
        }

        Self {
            by_code: mapping,
            by_name,
        }
    }

    /// Load and merge the registry layers in order.
    ///
    /// A missing layer file only produces a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a present layer cannot be read or parsed.
    pub async fn load(paths: &[PathBuf]) -> Result<Self, RegistryError> {
        let mut layers = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(layer) = load_layer(path).await? {
                layers.push(layer);
            }
        }
        let registry = Self::with_mapping(merge_layers(layers));
        info!(codes = registry.len(), "Emote registry loaded");
        Ok(registry)
    }

    /// Name for a code, if known.
    #[must_use]
    pub fn resolve(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(String::as_str)
    }

    /// Code for a name, if known.
    #[must_use]
    pub fn reverse(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Name for the code derived from an image URL.
    #[must_use]
    pub fn resolve_image(&self, url: &str) -> Option<&str> {
        self.resolve(&image_code(url))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// `(code, name)` pairs sorted by name.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .by_code
            .iter()
            .map(|(c, n)| (c.as_str(), n.as_str()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Render an emoji `<img>` as text.
    ///
    /// Unicode emoji (`emoji_u` file names) become the character itself, taken
    /// from `alt` or decoded from the underscore separated code points. Custom
    /// emotes become `:_name:` from `alt` or from the registry.
    #[must_use]
    pub fn render_emoji(&self, src: &str, alt: Option<&str>) -> Option<String> {
        let alt = alt.filter(|a| !a.trim().is_empty());

        if src.contains("emoji_u") {
            if let Some(c) = alt {
                return Some(c.to_string());
            }
            return decode_unicode_emoji(src);
        }

        if let Some(c) = alt {
            return Some(format!(":_{c}:"));
        }

        self.resolve_image(src).map(|name| format!(":_{name}:"))
    }
}

fn decode_unicode_emoji(src: &str) -> Option<String> {
    let file = src.rsplit('/').next()?;
    let stem = file.split('.').next()?;
    let codes = stem.split("emoji_u").nth(1)?;
    codes
        .split('_')
        .map(|c| u32::from_str_radix(c, 16).ok().and_then(char::from_u32))
        .collect()
}

async fn load_layer(path: &Path) -> Result<Option<HashMap<String, String>>, RegistryError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Registry layer not found, skipping");
            return Ok(None);
        }
        Err(source) => {
            return Err(RegistryError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let layer: HashMap<String, String> =
        serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), codes = layer.len(), "Registry layer read");
    Ok(Some(layer))
}
