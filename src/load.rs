//! Content loader: discovers chapter files in the source directory.
//!
//! Stage 1 of the bookc pipeline. Only the top level of the source directory
//! is scanned:
//!
//! ```text
//! book/
//! ├── book.toml                 # Configuration (optional)
//! ├── 01_Intro.md               # Chapter 1
//! ├── 02_Retrieval_Basics.md    # Chapter 2
//! ├── 10_War-Stories.md         # Chapter 10 (numeric, not lexical, order)
//! ├── notes.md                  # Ignored with a warning
//! └── assets/                   # Copied verbatim by the compiler
//!     └── schema.sql
//! ```
//!
//! Chapters are ordered by the numeric prefix. Two files with the same
//! ordinal (`01_A.md`, `1_B.md`) are a hard error rather than a silent
//! tie-break.

use crate::diagnostics::{Diagnostic, WarningKind};
use crate::naming::parse_chapter_name;
use crate::types::{ChapterId, ChapterSource};
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no chapter files (NN_Title.md) found in {0}")]
    NoContentFound(PathBuf),
    #[error("chapters {first} and {second} both use ordinal {ordinal}")]
    OrderingConflict {
        ordinal: u32,
        first: String,
        second: String,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Loader output: chapters in book order plus loader warnings.
#[derive(Debug)]
pub struct LoadedBook {
    pub chapters: Vec<ChapterSource>,
    pub warnings: Vec<Diagnostic>,
}

/// Discover and read every chapter file in `source_dir`.
pub fn load_chapters(source_dir: &Path) -> Result<LoadedBook, LoadError> {
    if !source_dir.is_dir() {
        return Err(LoadError::NoContentFound(source_dir.to_path_buf()));
    }

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LoadError::Io { path, source }
    };

    let mut file_names = Vec::new();
    for entry in fs::read_dir(source_dir).map_err(io_err(source_dir))? {
        let entry = entry.map_err(io_err(source_dir))?;
        if !entry.file_type().map_err(io_err(&entry.path()))?.is_file() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str() {
            Some(name) => file_names.push((name.to_string(), true)),
            None => file_names.push((name.to_string_lossy().into_owned(), false)),
        }
    }
    file_names.sort();

    let mut warnings = Vec::new();
    let mut by_ordinal: BTreeMap<u32, (String, ChapterId, String)> = BTreeMap::new();

    for (file_name, utf8) in file_names {
        if !is_markdown(&file_name) {
            continue;
        }
        let parsed = if utf8 {
            parse_chapter_name(&file_name)
        } else {
            None
        };
        let Some(parsed) = parsed else {
            debug!("skipping non-chapter markdown file {file_name}");
            warnings.push(Diagnostic::new(
                &file_name,
                None,
                WarningKind::NonConformingFile,
            ));
            continue;
        };
        if let Some((first, _, _)) = by_ordinal.get(&parsed.ordinal) {
            return Err(LoadError::OrderingConflict {
                ordinal: parsed.ordinal,
                first: first.clone(),
                second: file_name,
            });
        }
        let id = ChapterId {
            ordinal: parsed.ordinal,
            slug: parsed.slug,
        };
        by_ordinal.insert(parsed.ordinal, (file_name, id, parsed.display_title));
    }

    if by_ordinal.is_empty() {
        return Err(LoadError::NoContentFound(source_dir.to_path_buf()));
    }

    let chapters = by_ordinal
        .into_values()
        .map(|(file_name, id, file_title)| {
            let path = source_dir.join(&file_name);
            let raw_source = fs::read_to_string(&path).map_err(io_err(&path))?;
            debug!("loaded {file_name} ({} bytes)", raw_source.len());
            Ok::<_, LoadError>(ChapterSource {
                id,
                file_title,
                path,
                file_name,
                raw_source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LoadedBook { chapters, warnings })
}

fn is_markdown(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("md"))
}
