use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::CommentNode;

static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img src="([^"]+)">"#).expect("valid image pattern"));

static EMOTE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":_([^:\s]+?)_?:").expect("valid emote pattern"));

/// References collected from a comment forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Every `<img src>` value seen.
    pub images: BTreeSet<String>,
    /// Emote name → provenance URL of each occurrence, in visit order.
    pub emotes: BTreeMap<String, Vec<String>>,
    /// Provenance URL of each scanned node, in visit order.
    pub visited: Vec<String>,
}

/// Flatten a comment forest and collect its image and emote references.
///
/// Nodes are taken off a worklist seeded with `roots`; replies of a taken node
/// are pushed back on. The walk stops when the worklist is empty, or when,
/// after at least one removal, the only entry left is a root that was never
/// taken: that root and its replies are not scanned. Removal order is an
/// implementation detail; only the collected sets are meaningful to callers.
#[must_use]
pub fn flatten_and_extract(roots: &[CommentNode]) -> Extraction {
    let mut out = Extraction::default();
    let mut worklist: Vec<(&CommentNode, bool)> = roots.iter().map(|n| (n, true)).collect();
    let mut removed = 0usize;

    loop {
        if removed > 0 && matches!(worklist.as_slice(), [(_, true)]) {
            trace!(url = %worklist[0].0.url, "Leaving last root unexpanded");
            break;
        }
        let Some((node, _)) = worklist.pop() else {
            break;
        };
        removed += 1;

        if let Some(replies) = &node.replies {
            worklist.extend(replies.iter().map(|r| (r, false)));
        }
        scan(node, &mut out);
    }

    out
}

fn scan(node: &CommentNode, out: &mut Extraction) {
    out.visited.push(node.url.clone());

    for cap in IMG_SRC.captures_iter(&node.content) {
        out.images.insert(cap[1].to_string());
    }
    for cap in EMOTE_REF.captures_iter(&node.content) {
        out.emotes
            .entry(cap[1].to_string())
            .or_default()
            .push(node.url.clone());
    }
}
