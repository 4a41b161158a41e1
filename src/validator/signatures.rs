use serde::Serialize;

/// Textual markers the page template is expected to contain.
///
/// Defaults target the Thai-locale pages the archive was captured in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatures {
    /// Help link rendered in place of the comment section when comments are off.
    pub comments_disabled_link: String,
    /// "Sort comments" label.
    pub sort_comments: String,
    /// "Add a comment" placeholder.
    pub add_comment: String,
    /// "Like" reaction label.
    pub like: String,
    /// "Dislike" reaction label.
    pub dislike: String,
    /// "Show more replies" button text.
    pub more_replies: String,
    /// Poll widget marker.
    pub poll_marker: String,
    /// Icon marker of the poll's selected option.
    pub selected_option_marker: String,
    /// Attribute marking an element as not rendered.
    pub hidden_marker: String,
}

impl Default for Signatures {
    fn default() -> Self {
        Self {
            comments_disabled_link: "support.google.com/youtube/answer/9706180".to_string(),
            sort_comments: "จัดเรียงความคิดเห็น".to_string(),
            add_comment: "เพิ่มความคิดเห็น".to_string(),
            like: "ชอบ".to_string(),
            dislike: "ไม่ชอบ".to_string(),
            more_replies: "แสดงการตอบกลับเพิ่มเติม".to_string(),
            poll_marker: "poll-attachment".to_string(),
            selected_option_marker: r#"icon="check-circle""#.to_string(),
            hidden_marker: "hidden".to_string(),
        }
    }
}

/// Reason an archived page is considered incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FailureTag {
    #[serde(rename = "sort_label")]
    SortLabel,
    #[serde(rename = "add_label")]
    AddLabel,
    #[serde(rename = "like_label")]
    LikeLabel,
    #[serde(rename = "dislike_label")]
    DislikeLabel,
    #[serde(rename = "more_replies")]
    MoreReplies,
    #[serde(rename = "poll-attachment")]
    PollAttachment,
}

impl FailureTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SortLabel => "sort_label",
            Self::AddLabel => "add_label",
            Self::LikeLabel => "like_label",
            Self::DislikeLabel => "dislike_label",
            Self::MoreReplies => "more_replies",
            Self::PollAttachment => "poll-attachment",
        }
    }
}

impl std::fmt::Display for FailureTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
