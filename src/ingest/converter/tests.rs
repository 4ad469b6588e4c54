use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn renders_plain_text() {
    let markdown = "# Business\n\nStrategy requires **focus** and *patience*.\n\n- one\n- two\n";
    let rendered = markdown_to_text(markdown);

    assert_eq!(
        rendered.text,
        "Business\n\nStrategy requires focus and patience.\n\n- one\n- two"
    );
    assert_eq!(rendered.title.as_deref(), Some("Business"));
}

#[test]
fn prefers_h1_for_title() {
    let rendered = markdown_to_text("## Intro\n\ntext\n\n# Real Title\n");
    assert_eq!(rendered.title.as_deref(), Some("Real Title"));

    let rendered = markdown_to_text("### Only H3\n\ntext");
    assert_eq!(rendered.title.as_deref(), Some("Only H3"));

    let rendered = markdown_to_text("no headings at all");
    assert_eq!(rendered.title, None);
}

#[test]
fn keeps_code_and_drops_front_matter() {
    let markdown = "---\ntags: [work]\n---\n\nSome `inline` code.\n\n```rust\nfn main() {}\n```\n";
    let rendered = markdown_to_text(markdown);

    assert!(!rendered.text.contains("tags"));
    assert!(rendered.text.contains("Some inline code."));
    assert!(rendered.text.contains("fn main() {}"));
}

#[test]
fn renders_task_lists() {
    let rendered = markdown_to_text("- [x] done\n- [ ] open\n");
    assert!(rendered.text.contains("- [x] done"));
    assert!(rendered.text.contains("- [ ] open"));
}

#[test]
fn empty_markdown() {
    let rendered = markdown_to_text("");
    assert_eq!(rendered.text, "");
    assert_eq!(rendered.title, None);
}

#[test]
fn converts_files_and_skips_unreadable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let good = temp_dir.path().join("notes.md");
    let binary = temp_dir.path().join("broken.md");
    let missing = temp_dir.path().join("missing.md");
    fs::write(&good, "Business strategy requires focus and patience.").expect("should write");
    fs::write(&binary, [0xff_u8, 0xfe, 0x00, 0x81]).expect("should write");

    let output = MarkdownToDocument.run(&[good.clone(), binary.clone(), missing.clone()]);

    assert_eq!(output.documents.len(), 1);
    assert_eq!(output.skipped.len(), 2);
    assert_eq!(output.skipped[0].path, binary);
    assert_eq!(output.skipped[1].path, missing);

    let doc = &output.documents[0];
    assert_eq!(doc.content, "Business strategy requires focus and patience.");
    assert_eq!(doc.file_path(), Some(good.display().to_string().as_str()));
}

#[test]
fn empty_file_still_yields_a_document() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let empty = temp_dir.path().join("empty.md");
    fs::write(&empty, "").expect("should write");

    let output = MarkdownToDocument.run(&[empty]);
    assert_eq!(output.documents.len(), 1);
    assert_eq!(output.documents[0].content, "");
}
