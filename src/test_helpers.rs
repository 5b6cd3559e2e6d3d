//! Shared test utilities for the bookc test suite.
//!
//! Provides fixture setup, in-memory chapter builders, and lookups over
//! pipeline data (`Chapter`, `RenderedChapter`, `TocEntry`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let loaded = load_chapters(tmp.path()).unwrap();
//!
//! let source = chapter_source(1, "Intro", "# Intro\n\nHello.");
//! assert_eq!(source.file_name, "01_Intro.md");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::naming::slugify;
use crate::types::{ChapterId, ChapterSource, RenderedChapter, TocEntry};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/book/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/book");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `(file_name, content)` pairs into `dir`.
pub fn write_chapters(dir: &Path, chapters: &[(&str, &str)]) {
    for (name, content) in chapters {
        std::fs::write(dir.join(name), content).unwrap();
    }
}

// =========================================================================
// In-memory builders
// =========================================================================

/// A chapter source as the loader would produce for `NN_Title.md`.
///
/// Spaces in `title` become underscores in the file name.
pub fn chapter_source(ordinal: u32, title: &str, raw: &str) -> ChapterSource {
    let file_name = format!("{:02}_{}.md", ordinal, title.replace(' ', "_"));
    ChapterSource {
        id: ChapterId {
            ordinal,
            slug: slugify(title),
        },
        file_title: title.to_string(),
        path: file_name.clone().into(),
        file_name,
        raw_source: raw.to_string(),
    }
}

// =========================================================================
// Lookups - panic with a clear message on miss
// =========================================================================

/// Find a rendered chapter by ordinal. Panics if not found.
pub fn find_rendered(chapters: &[RenderedChapter], ordinal: u32) -> &RenderedChapter {
    chapters
        .iter()
        .find(|c| c.id.ordinal == ordinal)
        .unwrap_or_else(|| {
            let ordinals: Vec<u32> = chapters.iter().map(|c| c.id.ordinal).collect();
            panic!("chapter {ordinal} not found. Available: {ordinals:?}")
        })
}

/// TOC titles in order.
pub fn toc_titles(toc: &[TocEntry]) -> Vec<&str> {
    toc.iter().map(|e| e.title.as_str()).collect()
}

/// The HTML of the `<section>` with the given id. Panics if absent.
pub fn section_html<'a>(html: &'a str, section_id: &str) -> &'a str {
    let open = format!(r#"<section class="chapter" id="{section_id}""#);
    let start = html
        .find(&open)
        .unwrap_or_else(|| panic!("section '{section_id}' not found"));
    let end = html[start..]
        .find("</section>")
        .map(|i| start + i)
        .unwrap_or_else(|| panic!("section '{section_id}' not closed"));
    &html[start..end]
}
