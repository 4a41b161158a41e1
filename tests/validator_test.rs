//! Integration tests for validating an archive directory.

use community_archive::ids::IdentifierSet;
use community_archive::validator::{
    validate_archive, write_reports, FailureTag, Signatures, INVALID_IDS_FILE,
    INVALID_REPORT_FILE,
};
use tempfile::TempDir;

const REACTIONS: &str = "<span>ชอบ</span><span>ไม่ชอบ</span>";
const SORT: &str = "จัดเรียงความคิดเห็น";
const ADD: &str = "เพิ่มความคิดเห็น";

async fn write_page(dir: &std::path::Path, post_id: &str, lines: &[&str]) {
    tokio::fs::write(dir.join(format!("{post_id}.html")), lines.join("\n"))
        .await
        .expect("Failed to write page");
}

#[tokio::test]
async fn test_validate_archive_flags_incomplete_pages() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let archive = temp_dir.path().join("archive");
    tokio::fs::create_dir_all(&archive).await.unwrap();

    write_page(&archive, "good", &[REACTIONS, SORT, ADD]).await;
    write_page(&archive, "truncated", &[REACTIONS, SORT, ADD, "แสดงการตอบกลับเพิ่มเติม"]).await;
    write_page(&archive, "no_reactions", &[SORT, ADD]).await;
    write_page(
        &archive,
        "poll",
        &[
            REACTIONS,
            SORT,
            ADD,
            r#"<div id="poll-attachment">"#,
            r#"<yt-icon icon="check-circle" hidden></yt-icon>"#,
        ],
    )
    .await;

    let report = validate_archive(&archive, &Signatures::default())
        .await
        .unwrap();

    assert_eq!(report.total(), 4);
    assert_eq!(report.invalid_count(), 3);
    assert_eq!(report.tags("good"), Some(&[][..]));
    assert_eq!(report.tags("truncated"), Some(&[FailureTag::MoreReplies][..]));
    assert_eq!(
        report.tags("no_reactions"),
        Some(&[FailureTag::LikeLabel, FailureTag::DislikeLabel][..])
    );
    assert_eq!(report.tags("poll"), Some(&[FailureTag::PollAttachment][..]));
}

#[tokio::test]
async fn test_non_utf8_page_is_still_checked() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let archive = temp_dir.path().join("archive");
    tokio::fs::create_dir_all(&archive).await.unwrap();

    let mut bytes = [REACTIONS, SORT, ADD].join("\n").into_bytes();
    bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
    tokio::fs::write(archive.join("mixed.html"), bytes).await.unwrap();

    let report = validate_archive(&archive, &Signatures::default())
        .await
        .unwrap();
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_reports_written_for_invalid_posts() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let archive = temp_dir.path().join("archive");
    let report_dir = temp_dir.path().join("scripts").join("err");
    tokio::fs::create_dir_all(&archive).await.unwrap();

    write_page(&archive, "p1", &[SORT, ADD]).await;
    write_page(&archive, "p2", &[REACTIONS, SORT, ADD]).await;
    write_page(&archive, "p3", &[REACTIONS, ADD]).await;

    let ids = IdentifierSet::new(vec!["p3".into(), "p2".into(), "p1".into()]);
    let report = validate_archive(&archive, &Signatures::default())
        .await
        .unwrap();
    write_reports(&report, &ids, &report_dir).await.unwrap();

    let ordered: Vec<String> = serde_json::from_str(
        &std::fs::read_to_string(report_dir.join(INVALID_IDS_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(ordered, vec!["p3", "p1"]);

    let invalid: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(report_dir.join(INVALID_REPORT_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(invalid["p3"], serde_json::json!(["sort_label"]));
    assert_eq!(invalid["p1"], serde_json::json!(["like_label", "dislike_label"]));
    assert!(invalid.get("p2").is_none());
}

#[tokio::test]
async fn test_custom_signatures() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let archive = temp_dir.path().join("archive");
    tokio::fs::create_dir_all(&archive).await.unwrap();

    let sig = Signatures {
        sort_comments: "Sort by".to_string(),
        add_comment: "Add a comment".to_string(),
        like: "Like".to_string(),
        dislike: "Dislike".to_string(),
        more_replies: "Show more replies".to_string(),
        ..Signatures::default()
    };
    write_page(&archive, "en", &["Like", "Dislike", "Sort by", "Add a comment"]).await;

    let report = validate_archive(&archive, &sig).await.unwrap();
    assert!(report.is_clean());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_entry_does_not_stop_validation() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let archive = temp_dir.path().join("archive");
    tokio::fs::create_dir_all(&archive).await.unwrap();

    write_page(&archive, "good", &[REACTIONS, SORT, ADD]).await;
    write_page(&archive, "bad", &[SORT, ADD]).await;
    std::os::unix::fs::symlink(archive.join("deleted.html"), archive.join("broken.html")).unwrap();

    let report = validate_archive(&archive, &Signatures::default())
        .await
        .unwrap();
    assert_eq!(report.total(), 2);
    assert_eq!(report.invalid_count(), 1);
    assert!(report.tags("broken").is_none());
}
