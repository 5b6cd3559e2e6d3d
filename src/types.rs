//! Shared types passed between pipeline stages.
//!
//! Chapters flow through the pipeline as immutable values: the loader
//! produces [`ChapterSource`]s, parsing and anchor resolution turn them into
//! [`Chapter`]s, and rendering turns those into [`RenderedChapter`]s that the
//! assembler consumes.

use crate::diagnostics::Diagnostic;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Identity of a chapter: its ordinal from the filename plus a slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChapterId {
    pub ordinal: u32,
    pub slug: String,
}

impl ChapterId {
    /// The `id` of the `<section>` wrapping this chapter in the compiled document.
    pub fn section_anchor(&self) -> String {
        format!("chapter-{:02}", self.ordinal)
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}", self.ordinal, self.slug)
    }
}

/// A chapter file as discovered on disk, before parsing.
#[derive(Debug, Clone)]
pub struct ChapterSource {
    pub id: ChapterId,
    /// Title derived from the filename (`01_Getting_Started.md` → "Getting Started").
    pub file_title: String,
    pub path: PathBuf,
    /// Bare file name, used in diagnostics.
    pub file_name: String,
    pub raw_source: String,
}

/// A parsed chapter. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub id: ChapterId,
    /// First level-1 heading, or the filename title when there is none.
    pub title: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub file_name: String,
    #[serde(skip)]
    pub raw_source: String,
    pub blocks: Vec<Block>,
}

impl Chapter {
    /// Level-1 headings in source order as `(text, anchor_id)` pairs.
    pub fn top_level_headings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blocks.iter().filter_map(|b| match &b.content {
            ContentBlock::Heading {
                level: 1,
                text,
                anchor_id,
            } => Some((text.as_str(), anchor_id.as_str())),
            _ => None,
        })
    }
}

/// A content block together with the 1-based source line it starts on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub line: usize,
    #[serde(flatten)]
    pub content: ContentBlock,
}

/// The block grammar. Every construct the parser recognizes maps to exactly
/// one variant; the renderer dispatches on this tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph {
        text: String,
    },
    Heading {
        level: u8,
        text: String,
        anchor_id: String,
    },
    CodeFence {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
    Callout {
        kind: CalloutKind,
        text: String,
    },
    DiagramDirective {
        language: String,
        raw_spec: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    Quote {
        text: String,
    },
    Rule,
}

impl ContentBlock {
    /// Short name used in diagnostics and the render-error marker.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Paragraph { .. } => "paragraph",
            Self::Heading { .. } => "heading",
            Self::CodeFence { .. } => "code fence",
            Self::Table { .. } => "table",
            Self::Callout { .. } => "callout",
            Self::DiagramDirective { .. } => "diagram",
            Self::List { .. } => "list",
            Self::Quote { .. } => "quote",
            Self::Rule => "rule",
        }
    }

    /// Best-effort plain text of the block, shown escaped when rendering fails.
    pub fn source_text(&self) -> String {
        match self {
            Self::Paragraph { text }
            | Self::Heading { text, .. }
            | Self::CodeFence { text, .. }
            | Self::Callout { text, .. }
            | Self::Quote { text } => text.clone(),
            Self::DiagramDirective { raw_spec, .. } => raw_spec.clone(),
            Self::Table { rows } => rows
                .iter()
                .map(|row| format!("| {} |", row.join(" | ")))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::List { items, .. } => items
                .iter()
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Rule => "---".to_string(),
        }
    }
}

/// Styled callout boxes recognized in blockquotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalloutKind {
    KeyTakeaways,
    WarStory,
    Note,
    /// Declared with `[!KIND]` but not one of the known kinds.
    Other(String),
}

impl CalloutKind {
    /// Recognize a callout keyword (case-insensitive, spaces, dashes and
    /// underscores interchangeable). Returns `None` for unknown keywords.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let normalized: String = keyword
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "key_takeaways" | "key_takeaway" | "takeaways" => Some(Self::KeyTakeaways),
            "war_story" => Some(Self::WarStory),
            "note" => Some(Self::Note),
            _ => None,
        }
    }

    /// Heading printed at the top of the rendered box.
    pub fn label(&self) -> &str {
        match self {
            Self::KeyTakeaways => "Key Takeaways",
            Self::WarStory => "War Story",
            Self::Note => "Note",
            Self::Other(name) => name,
        }
    }
}

/// HTML produced for a single block.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFragment {
    pub html: String,
    pub warnings: Vec<crate::diagnostics::WarningKind>,
}

/// A chapter after rendering: its HTML body plus every warning raised while
/// parsing and rendering it.
#[derive(Debug, Clone)]
pub struct RenderedChapter {
    pub id: ChapterId,
    pub title: String,
    pub file_name: String,
    /// Level-1 headings as `(text, anchor_id)`, copied from the parsed chapter.
    pub headings: Vec<(String, String)>,
    /// Every `id` the rendered headings carry, in block order.
    pub anchors: Vec<String>,
    pub html: String,
    pub warnings: Vec<Diagnostic>,
}

/// One line of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub chapter_id: ChapterId,
    pub title: String,
    pub anchor_id: String,
    /// 0-based position in the TOC.
    pub order: usize,
}

/// The assembled book.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub html: String,
    pub toc: Vec<TocEntry>,
}
