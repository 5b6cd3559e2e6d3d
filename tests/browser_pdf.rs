//! PDF export integration tests against a real headless Chrome.
//!
//! These need a Chrome/Chromium binary on the machine, and the fixture book
//! loads Mermaid and highlight.js from a CDN, so they are ignored by default.
//!
//! Run with: `cargo test --test browser_pdf -- --ignored`

use bookc::config::ExportConfig;
use bookc::export::{self, ExportOptions};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

fn fixture_book() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/book")
}

fn compile_fixture(out: &TempDir, extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_bookc"))
        .arg("compile")
        .arg(fixture_book())
        .arg(out.path())
        .args(extra)
        .output()
        .expect("failed to run bookc")
}

#[test]
#[ignore]
fn compile_with_pdf_writes_pdf() {
    let out = TempDir::new().unwrap();
    let result = compile_fixture(&out, &["--pdf", "--no-timestamp"]);
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let pdf = fs::read(out.path().join("book.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert!(!out.path().join(".book.pdf.partial").exists());
    assert!(out.path().join("book.html").exists());
}

#[test]
#[ignore]
fn export_pdf_of_written_document() {
    let out = TempDir::new().unwrap();
    let result = compile_fixture(&out, &["--no-timestamp"]);
    assert!(result.status.success());

    let mut options = ExportOptions::from_config(&ExportConfig {
        sandbox: false,
        ..Default::default()
    });
    options.timeout = Duration::from_secs(60);

    let bytes = export::export_pdf(&out.path().join("book.html"), &options).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert!(bytes.len() > 1000);
}

#[test]
#[ignore]
fn export_pdf_times_out() {
    let out = TempDir::new().unwrap();
    let result = compile_fixture(&out, &["--no-timestamp"]);
    assert!(result.status.success());

    let mut options = ExportOptions::from_config(&ExportConfig {
        sandbox: false,
        ..Default::default()
    });
    options.timeout = Duration::from_millis(1);

    let err = export::export_pdf(&out.path().join("book.html"), &options).unwrap_err();
    assert!(err.to_string().contains("timed out"), "{err}");
}
