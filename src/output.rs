//! CLI output formatting for the build.
//!
//! # Information-First Display
//!
//! Chapters are listed by ordinal and title, with the source file as an
//! indented `Source:` line, so the output reads as a table of contents
//! while still pointing back at the Markdown that produced it.
//!
//! # Output Format
//!
//! ## Compile
//!
//! ```text
//! Chapters
//! 01 Introduction (12 blocks)
//!     Source: 01_Intro.md
//! 02 Retrieval Basics (30 blocks)
//!     Source: 02_Retrieval_Basics.md
//!
//! Output
//!     book.html
//!     book.pdf
//!     assets/ (3 files)
//!
//! Compiled 2 chapters, 4 TOC entries, 1 warning
//! ```
//!
//! ## Warnings
//!
//! Printed to stderr, one per line, in book order:
//!
//! ```text
//! warning: 02_Retrieval_Basics.md:41: table row 3 has 2 cells, header has 3; padded
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to the terminal. Format
//! functions are pure: no I/O, no side effects.

use crate::compile::{Build, BuildReport, ChapterSummary};
use crate::diagnostics::Diagnostic;
use crate::types::TocEntry;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 thing` / `2 things`.
fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Display a path relative to `base` when possible.
fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Chapters and TOC
// ============================================================================

/// Format the chapter inventory.
///
/// ```text
/// 01 Introduction (12 blocks)
///     Source: 01_Intro.md
/// ```
pub fn format_chapters(chapters: &[ChapterSummary]) -> Vec<String> {
    let mut lines = vec!["Chapters".to_string()];
    for chapter in chapters {
        lines.push(format!(
            "{:02} {} ({})",
            chapter.ordinal,
            chapter.title,
            plural(chapter.blocks, "block")
        ));
        lines.push(format!("{}Source: {}", indent(1), chapter.file_name));
    }
    lines
}

/// Format the table of contents, one entry per line with its anchor.
pub fn format_toc(toc: &[TocEntry]) -> Vec<String> {
    let mut lines = vec!["Contents".to_string()];
    for entry in toc {
        lines.push(format!(
            "{}{} → #{}",
            indent(1),
            entry.title,
            entry.anchor_id
        ));
    }
    lines
}

// ============================================================================
// Warnings
// ============================================================================

/// Format warnings as `warning: <file>:<line>: <message>`.
pub fn format_warnings(warnings: &[Diagnostic]) -> Vec<String> {
    warnings.iter().map(|w| format!("warning: {w}")).collect()
}

/// Print warnings to stderr.
pub fn print_warnings(warnings: &[Diagnostic]) {
    for line in format_warnings(warnings) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Build summaries
// ============================================================================

fn summary_line(verb: &str, chapters: usize, toc: usize, warnings: usize) -> String {
    let entries = if toc == 1 { "entry" } else { "entries" };
    format!(
        "{verb} {}, {toc} TOC {entries}, {}",
        plural(chapters, "chapter"),
        plural(warnings, "warning")
    )
}

/// Format the result of `bookc compile`.
pub fn format_build_report(report: &BuildReport, output_dir: &Path) -> Vec<String> {
    let mut lines = format_chapters(&report.chapters);
    lines.push(String::new());
    lines.push("Output".to_string());
    lines.push(format!(
        "{}{}",
        indent(1),
        display_relative(&report.html_path, output_dir)
    ));
    if let Some(pdf) = &report.pdf_path {
        lines.push(format!("{}{}", indent(1), display_relative(pdf, output_dir)));
    }
    if report.assets_copied > 0 {
        lines.push(format!(
            "{}assets/ ({})",
            indent(1),
            plural(report.assets_copied, "file")
        ));
    }
    lines.push(String::new());
    lines.push(summary_line(
        "Compiled",
        report.chapters.len(),
        report.toc.len(),
        report.warnings.len(),
    ));
    lines
}

/// Print the compile report to stdout.
pub fn print_build_report(report: &BuildReport, output_dir: &Path) {
    for line in format_build_report(report, output_dir) {
        println!("{}", line);
    }
}

/// Format the result of `bookc check`.
pub fn format_check_report(build: &Build) -> Vec<String> {
    let mut lines = format_chapters(&build.chapters);
    lines.push(String::new());
    lines.extend(format_toc(&build.document.toc));
    lines.push(String::new());
    lines.push(summary_line(
        "Checked",
        build.chapters.len(),
        build.document.toc.len(),
        build.warnings.len(),
    ));
    lines
}

/// Print the check report to stdout.
pub fn print_check_report(build: &Build) {
    for line in format_check_report(build) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;
    use crate::types::ChapterId;
    use std::path::PathBuf;

    fn summaries() -> Vec<ChapterSummary> {
        vec![
            ChapterSummary {
                ordinal: 1,
                title: "Introduction".to_string(),
                file_name: "01_Intro.md".to_string(),
                blocks: 1,
            },
            ChapterSummary {
                ordinal: 2,
                title: "Retrieval Basics".to_string(),
                file_name: "02_Retrieval_Basics.md".to_string(),
                blocks: 30,
            },
        ]
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "block"), "1 block");
        assert_eq!(plural(0, "block"), "0 blocks");
    }

    #[test]
    fn chapters_show_source_as_context() {
        assert_eq!(
            format_chapters(&summaries()),
            vec![
                "Chapters",
                "01 Introduction (1 block)",
                "    Source: 01_Intro.md",
                "02 Retrieval Basics (30 blocks)",
                "    Source: 02_Retrieval_Basics.md",
            ]
        );
    }

    #[test]
    fn toc_lines_show_anchor() {
        let toc = vec![TocEntry {
            chapter_id: ChapterId {
                ordinal: 1,
                slug: "intro".to_string(),
            },
            title: "Introduction".to_string(),
            anchor_id: "introduction".to_string(),
            order: 0,
        }];
        assert_eq!(
            format_toc(&toc),
            vec!["Contents", "    Introduction → #introduction"]
        );
    }

    #[test]
    fn warnings_prefixed() {
        let warnings = vec![
            Diagnostic::new("02_Data.md", Some(41), WarningKind::EmptyDiagram),
            Diagnostic::new("notes.md", None, WarningKind::NonConformingFile),
        ];
        let lines = format_warnings(&warnings);
        assert_eq!(
            lines[0],
            "warning: 02_Data.md:41: empty diagram block left verbatim"
        );
        assert!(lines[1].starts_with("warning: notes.md: "));
    }

    #[test]
    fn build_report_lists_outputs_relative() {
        let out = PathBuf::from("/tmp/dist");
        let report = BuildReport {
            chapters: summaries(),
            toc: Vec::new(),
            warnings: vec![Diagnostic::new(
                "01_Intro.md",
                Some(3),
                WarningKind::EmptyDiagram,
            )],
            html_path: out.join("book.html"),
            pdf_path: Some(out.join("book.pdf")),
            assets_copied: 3,
        };
        let lines = format_build_report(&report, &out);
        assert!(lines.contains(&"    book.html".to_string()));
        assert!(lines.contains(&"    book.pdf".to_string()));
        assert!(lines.contains(&"    assets/ (3 files)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Compiled 2 chapters, 0 TOC entries, 1 warning"
        );
    }

    #[test]
    fn build_report_omits_missing_outputs() {
        let out = PathBuf::from("/tmp/dist");
        let report = BuildReport {
            chapters: summaries(),
            toc: Vec::new(),
            warnings: Vec::new(),
            html_path: out.join("book.html"),
            pdf_path: None,
            assets_copied: 0,
        };
        let lines = format_build_report(&report, &out);
        assert!(!lines.iter().any(|l| l.contains("book.pdf")));
        assert!(!lines.iter().any(|l| l.contains("assets/")));
    }
}
