use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use super::{flatten_and_extract, CommentNode, Post};
use crate::fs_utils::write_json_pretty;
use crate::ids::IdentifierSet;
use crate::registry::{image_code, EmoteRegistry};

/// Posts with blank comment images, in authoritative order.
pub const BLANK_IMAGE_IDS_FILE: &str = "blank_image_ids.json";

/// Image markup with no source, left behind when an image failed to render.
const BLANK_IMAGE_MARKERS: &[&str] = &[r#"<img src="">"#, "![]()"];

/// Codes found in comments that the registry cannot name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReferenceReport {
    pub posts_scanned: usize,
    /// Distinct image URLs found across all comments.
    pub unique_images: usize,
    /// Unknown image code → image URLs carrying it.
    pub unknown_images: BTreeMap<String, BTreeSet<String>>,
    /// Unknown emote name → provenance URLs where it appeared.
    pub unknown_emotes: BTreeMap<String, Vec<String>>,
    /// Posts whose top-level comments contain a blank image, in input order.
    pub blank_images: Vec<String>,
}

impl CrossReferenceReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unknown_images.is_empty()
            && self.unknown_emotes.is_empty()
            && self.blank_images.is_empty()
    }
}

/// Check every comment reference against the registry.
///
/// All posts are processed before anything is reported; unknown codes are
/// accumulated with provenance for manual curation.
#[must_use]
pub fn cross_reference(posts: &[Post], registry: &EmoteRegistry) -> CrossReferenceReport {
    let mut report = CrossReferenceReport::default();
    let mut images = BTreeSet::new();

    for post in posts {
        let Some(comments) = &post.comments else {
            continue;
        };
        report.posts_scanned += 1;

        let blank = count_blank_images(comments);
        if blank > 0 {
            warn!(post_id = %post.id, count = blank, "Found blank images in comments");
            report.blank_images.push(post.id.clone());
        }

        let extraction = flatten_and_extract(comments);
        images.extend(extraction.images);

        for (name, provenance) in extraction.emotes {
            if registry.reverse(&name).is_none() {
                report
                    .unknown_emotes
                    .entry(name)
                    .or_default()
                    .extend(provenance);
            }
        }
    }

    for url in &images {
        let code = image_code(url);
        if registry.resolve(&code).is_none() {
            report
                .unknown_images
                .entry(code)
                .or_default()
                .insert(url.clone());
        }
    }
    report.unique_images = images.len();

    info!(
        posts = report.posts_scanned,
        images = report.unique_images,
        "Found {} unique images",
        report.unique_images
    );
    for (code, urls) in &report.unknown_images {
        warn!(code = %code, urls = ?urls, "Unknown emote image");
    }
    for (name, provenance) in &report.unknown_emotes {
        warn!(name = %name, provenance = ?provenance, "Unknown emote name");
    }

    report
}

/// Write the posts with blank comment images into `dir`.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub async fn write_blank_image_report(
    report: &CrossReferenceReport,
    authoritative: &IdentifierSet,
    dir: &Path,
) -> Result<()> {
    let ordered = authoritative.order(&report.blank_images);
    write_json_pretty(&dir.join(BLANK_IMAGE_IDS_FILE), &ordered).await
}

/// Top-level comments with a blank image, counted once per comment.
fn count_blank_images(comments: &[CommentNode]) -> usize {
    comments
        .iter()
        .filter(|c| BLANK_IMAGE_MARKERS.iter().any(|m| c.content.contains(m)))
        .count()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::comments::CommentNode;

    fn registry() -> EmoteRegistry {
        EmoteRegistry::with_mapping(HashMap::from([
            ("known=".to_string(), "wave".to_string()),
            ("heart=".to_string(), "heart".to_string()),
        ]))
    }

    fn post(id: &str, comments: Option<Vec<CommentNode>>) -> Post {
        Post {
            id: id.to_string(),
            comments,
            content_attachment: None,
        }
    }

    #[test]
    fn test_known_references_are_clean() {
        let posts = vec![post(
            "p1",
            Some(vec![CommentNode::new(
                "u1",
                r#":_wave: <img src="https://yt3.ggpht.com/known=s48-c">"#,
            )]),
        )];
        let report = cross_reference(&posts, &registry());
        assert!(report.is_clean());
        assert_eq!(report.unique_images, 1);
        assert_eq!(report.posts_scanned, 1);
    }

    #[test]
    fn test_unknown_codes_collected_across_posts() {
        let posts = vec![
            post(
                "p1",
                Some(vec![CommentNode::new(
                    "u1",
                    r#":_mystery: <img src="https://yt3.ggpht.com/abc=s16">"#,
                )]),
            ),
            post("p2", None),
            post(
                "p3",
                Some(vec![CommentNode::new("u3", ":_mystery: :_heart:")
                    .with_replies(vec![CommentNode::new(
                        "u3r",
                        r#"<img src="https://lh3.googleusercontent.com/abc=s24">"#,
                    )])]),
            ),
        ];

        let report = cross_reference(&posts, &registry());
        assert!(!report.is_clean());
        assert_eq!(report.posts_scanned, 2);
        assert_eq!(report.unknown_emotes["mystery"], vec!["u1", "u3"]);
        assert!(!report.unknown_emotes.contains_key("heart"));
        assert_eq!(report.unknown_images["abc="].len(), 2);
        assert!(report.blank_images.is_empty());
    }

    #[test]
    fn test_blank_images_flag_their_post() {
        let posts = vec![
            post(
                "p1",
                Some(vec![
                    CommentNode::new("u1", r#"look <img src="">"#),
                    CommentNode::new("u2", "old format ![]()"),
                ]),
            ),
            post("p2", Some(vec![CommentNode::new("u3", ":_wave:")])),
            post("p3", Some(vec![CommentNode::new("u4", "![]()")])),
        ];

        let report = cross_reference(&posts, &registry());
        assert_eq!(report.blank_images, vec!["p1", "p3"]);
        assert!(report.unknown_emotes.is_empty());
        assert!(!report.is_clean());
    }
}
