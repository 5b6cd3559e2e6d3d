//! Recoverable build warnings.
//!
//! Warnings never stop a build on their own. Each one is tied to the file
//! (and, where known, the line) it came from so an author can fix the source
//! Markdown directly. `--strict` turns any warning into a fatal error; that
//! escalation happens in [`crate::compile`], not here.

use thiserror::Error;

/// What went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// A `.md` file in the source directory that does not match `NN_Title.md`.
    #[error("not a chapter file (expected NN_Title.md), ignored")]
    NonConformingFile,
    /// A fence, diagram or callout still open at end of file.
    #[error("unterminated {block}, closed at end of file")]
    UnterminatedBlock { block: &'static str },
    /// A table row with a different cell count than the header.
    #[error(
        "table row {} has {} cells, header has {}; {}",
        .row,
        .found,
        .expected,
        ragged_action(.found, .expected)
    )]
    RaggedTable {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown callout kind '{0}', rendered as a note")]
    UnknownCalloutKind(String),
    /// A diagram directive with nothing in it. Emitted verbatim anyway.
    #[error("empty diagram block left verbatim")]
    EmptyDiagram,
    /// A block that could not be rendered and fell back to escaped text.
    #[error("could not render {block}: {reason}")]
    RenderError { block: &'static str, reason: String },
    /// A link to a chapter or anchor that does not exist in the book.
    #[error("link target '{0}' does not resolve to any chapter anchor")]
    BrokenReference(String),
}

fn ragged_action(found: &usize, expected: &usize) -> &'static str {
    if found < expected { "padded" } else { "truncated" }
}

/// A warning located in the source tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{}: {}", .file, location(.line), .kind)]
pub struct Diagnostic {
    /// Source file name (`03_Retrieval.md`).
    pub file: String,
    /// 1-based line, when the warning is tied to a block.
    pub line: Option<usize>,
    pub kind: WarningKind,
}

/// `:LINE` when the line is known.
fn location(line: &Option<usize>) -> String {
    line.map(|line| format!(":{line}")).unwrap_or_default()
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, line: Option<usize>, kind: WarningKind) -> Self {
        Self {
            file: file.into(),
            line,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_with_line() {
        let d = Diagnostic::new(
            "02_Next.md",
            Some(14),
            WarningKind::UnterminatedBlock {
                block: "code fence",
            },
        );
        assert_eq!(
            d.to_string(),
            "02_Next.md:14: unterminated code fence, closed at end of file"
        );
    }

    #[test]
    fn diagnostic_without_line() {
        let d = Diagnostic::new("notes.md", None, WarningKind::NonConformingFile);
        assert!(d.to_string().starts_with("notes.md: not a chapter file"));
    }

    #[test]
    fn ragged_table_message_names_action() {
        let short = WarningKind::RaggedTable {
            row: 2,
            expected: 3,
            found: 1,
        };
        let long = WarningKind::RaggedTable {
            row: 3,
            expected: 3,
            found: 5,
        };
        assert!(short.to_string().ends_with("padded"));
        assert!(long.to_string().ends_with("truncated"));
    }
}
