//! Parsed post data and the comment-forest passes that run over it.

mod crossref;
mod walker;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fs_utils::read_json;

pub use crossref::{
    cross_reference, write_blank_image_report, CrossReferenceReport, BLANK_IMAGE_IDS_FILE,
};
pub use walker::{flatten_and_extract, Extraction};

/// One comment and its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    /// Where the comment lives, kept as provenance for manual review.
    #[serde(default)]
    pub url: String,
    /// Rendered comment text; may embed `<img src="...">` and `:_name:` markup.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub replies: Option<Vec<CommentNode>>,
}

impl CommentNode {
    #[must_use]
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            replies: None,
        }
    }

    #[must_use]
    pub fn with_replies(mut self, replies: Vec<CommentNode>) -> Self {
        self.replies = Some(replies);
        self
    }
}

/// Attachment block of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAttachment {
    #[serde(default)]
    pub images: Vec<String>,
}

/// The parts of a parsed post these passes care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub comments: Option<Vec<CommentNode>>,
    #[serde(default)]
    pub content_attachment: Option<ContentAttachment>,
}

/// Load the parsed posts file (a JSON array of posts).
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_posts(path: &Path) -> Result<Vec<Post>> {
    let posts: Vec<Post> = read_json(path).await?;
    info!(path = %path.display(), count = posts.len(), "Loaded parsed posts");
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_ignores_unknown_fields() {
        let json = r#"[{
            "id": "Ugk1",
            "author": "someone",
            "like": 3,
            "comments": [{"url": "u1", "content": "hi", "author": "x",
                          "replies": [{"url": "u2", "content": "yo"}]}],
            "content_attachment": {"images": ["https://i.ytimg.com/a.jpg"], "videos": []}
        }, {"id": "Ugk2", "comments": null, "content_attachment": null}]"#;

        let posts: Vec<Post> = serde_json::from_str(json).unwrap();
        assert_eq!(posts.len(), 2);
        let comments = posts[0].comments.as_ref().unwrap();
        assert_eq!(comments[0].replies.as_ref().unwrap()[0].url, "u2");
        assert_eq!(
            posts[0].content_attachment.as_ref().unwrap().images,
            vec!["https://i.ytimg.com/a.jpg"]
        );
        assert!(posts[1].comments.is_none());
    }
}
