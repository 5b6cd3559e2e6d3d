//! End-to-end tests driving the `bookc` binary.
//!
//! Each test builds its own source directory in a temp dir (or copies
//! `fixtures/book`) and inspects what the binary writes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn bookc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bookc"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run bookc")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn fixture_book() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/book")
}

fn write_chapters(dir: &Path, chapters: &[(&str, &str)]) {
    for (name, content) in chapters {
        fs::write(dir.join(name), content).unwrap();
    }
}

/// The `<section>` for one chapter, up to its closing tag.
fn section<'a>(html: &'a str, id: &str) -> &'a str {
    let start = html
        .find(&format!(r#"<section class="chapter" id="{id}""#))
        .unwrap_or_else(|| panic!("section {id} missing"));
    let end = start + html[start..].find("</section>").unwrap();
    &html[start..end]
}

fn toc_entries(html: &str) -> usize {
    let start = html.find(r#"<nav class="toc""#).unwrap();
    let end = start + html[start..].find("</nav>").unwrap();
    html[start..end].matches("<li").count()
}

#[test]
fn two_chapter_book() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_chapters(
        src.path(),
        &[
            ("01_Intro.md", "# Heading\n\nOne paragraph of text.\n"),
            ("02_Next.md", "```python\nprint(\"hi\")\n```\n"),
        ],
    );

    let result = bookc(&[
        "compile",
        path_str(src.path()),
        path_str(out.path()),
        "--no-timestamp",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let html = fs::read_to_string(out.path().join("book.html")).unwrap();
    assert_eq!(toc_entries(&html), 2);

    let first = section(&html, "chapter-01");
    assert!(first.contains(r##"href="#chapter-02" rel="next""##));
    assert!(!first.contains(r#"rel="prev""#));

    let second = section(&html, "chapter-02");
    assert!(second.contains(r#"class="language-python" data-lang="python""#));
    assert!(second.contains(r##"href="#chapter-01" rel="prev""##));
}

#[test]
fn no_chapters_fails_and_writes_nothing() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_chapters(src.path(), &[("README.md", "# Not a chapter")]);
    let output_dir = out.path().join("dist");

    let result = bookc(&["compile", path_str(src.path()), path_str(&output_dir)]);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("no chapter files"), "{stderr}");
    assert!(!output_dir.exists());
}

#[test]
fn ordering_conflict_fails() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_chapters(src.path(), &[("01_A.md", "# A"), ("1_B.md", "# B")]);
    let output_dir = out.path().join("dist");

    let result = bookc(&["compile", path_str(src.path()), path_str(&output_dir)]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("ordinal 1"));
    assert!(!output_dir.exists());
}

#[test]
fn fixture_book_compiles_strict() {
    let out = TempDir::new().unwrap();
    let result = bookc(&[
        "compile",
        path_str(&fixture_book()),
        path_str(out.path()),
        "--strict",
        "--no-timestamp",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let html = fs::read_to_string(out.path().join("book.html")).unwrap();
    assert!(html.contains("<title>Production RAG</title>"));
    assert!(html.contains(r#"<pre class="mermaid">"#));
    assert!(html.contains(r#"class="callout callout-key-takeaways""#));
    assert!(html.contains(r##"href="#chunking""##));
    assert!(html.contains(r#"id="summary-1""#));
    assert!(out.path().join("assets/schema.sql").exists());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Compiled 3 chapters"), "{stdout}");
}

#[test]
fn warnings_reported_with_file_and_line() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_chapters(
        src.path(),
        &[("01_Data.md", "# Data\n\n| a | b | c |\n|---|---|---|\n| 1 | 2 |\n")],
    );

    let result = bookc(&["compile", path_str(src.path()), path_str(out.path())]);
    assert!(result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("warning: 01_Data.md:3: table row 2 has 2 cells, header has 3; padded"),
        "{stderr}"
    );
}

#[test]
fn strict_turns_warnings_into_failure() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_chapters(src.path(), &[("01_Intro.md", "# Intro\n\n```rust\nfn main() {}\n")]);
    let output_dir = out.path().join("dist");

    let result = bookc(&[
        "compile",
        path_str(src.path()),
        path_str(&output_dir),
        "--strict",
    ]);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("warning: 01_Intro.md:3: unterminated code fence"), "{stderr}");
    assert!(stderr.contains("--strict"), "{stderr}");
    assert!(!output_dir.exists());
}

#[test]
fn rebuilds_are_byte_identical_without_timestamp() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    for out in [&first, &second] {
        let result = bookc(&[
            "compile",
            path_str(&fixture_book()),
            path_str(out.path()),
            "--no-timestamp",
            "--jobs",
            "2",
        ]);
        assert!(result.status.success());
    }
    let a = fs::read(first.path().join("book.html")).unwrap();
    let b = fs::read(second.path().join("book.html")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn timestamp_present_by_default() {
    let out = TempDir::new().unwrap();
    let result = bookc(&["compile", path_str(&fixture_book()), path_str(out.path())]);
    assert!(result.status.success());
    let html = fs::read_to_string(out.path().join("book.html")).unwrap();
    assert!(html.contains(r#"<meta name="build-time""#));
}

#[test]
fn check_writes_nothing() {
    let src = TempDir::new().unwrap();
    fs::create_dir(src.path().join("assets")).unwrap();
    write_chapters(src.path(), &[("01_Intro.md", "# Intro\n\nHello.")]);
    let before: Vec<_> = fs::read_dir(src.path()).unwrap().collect();

    let result = bookc(&["check", path_str(src.path())]);
    assert!(result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("Book is valid"));
    let after: Vec<_> = fs::read_dir(src.path()).unwrap().collect();
    assert_eq!(before.len(), after.len());
}

#[test]
fn parse_prints_block_manifest() {
    let src = TempDir::new().unwrap();
    write_chapters(
        src.path(),
        &[("01_Intro.md", "# Intro\n\n> **Note**\n> Careful.\n\n```mermaid\ngraph TD\n```\n")],
    );
    let result = bookc(&["parse", path_str(src.path())]);
    assert!(result.status.success());
    let chapters: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    let blocks = chapters[0]["blocks"].as_array().unwrap();
    let types: Vec<&str> = blocks.iter().map(|b| b["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["heading", "callout", "diagram_directive"]);
    assert_eq!(blocks[0]["anchor_id"], "intro");
    assert_eq!(blocks[1]["kind"], "note");
    assert_eq!(blocks[2]["line"], 6);
}

#[test]
fn gen_config_output_is_valid_config() {
    let result = bookc(&["gen-config"]);
    assert!(result.status.success());
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(src.path().join("book.toml"), &result.stdout).unwrap();
    write_chapters(src.path(), &[("01_Intro.md", "# Intro")]);
    let compiled = bookc(&["compile", path_str(src.path()), path_str(out.path())]);
    assert!(compiled.status.success(), "{}", String::from_utf8_lossy(&compiled.stderr));
}

#[test]
fn invalid_config_fails() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(src.path().join("book.toml"), "[book]\ntitel = \"typo\"\n").unwrap();
    write_chapters(src.path(), &[("01_Intro.md", "# Intro")]);
    let result = bookc(&["compile", path_str(src.path()), path_str(out.path())]);
    assert!(!result.status.success());
}
