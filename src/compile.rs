//! Build orchestration.
//!
//! Runs the stages in order and owns every filesystem write:
//!
//! ```text
//! load ─→ parse (parallel) ─→ resolve anchors ─→ render (parallel) ─→ assemble
//!                                                                        │
//!            output_dir/book.html  ←── write ←── copy assets ←───────────┘
//!            output_dir/book.pdf   ←── export (--pdf)
//! ```
//!
//! Parsing and rendering run on the current rayon pool (sized by `main`).
//! Nothing is written until assembly has succeeded, so a fatal error leaves
//! the output directory untouched. With `strict`, any warning is fatal.

use crate::anchor::{LinkMap, ParsedChapter, resolve_anchors};
use crate::assemble::{AssembleError, AssembleOptions, assemble};
use crate::config::{self, BookConfig, ConfigError};
use crate::diagnostics::Diagnostic;
use crate::export::{self, ExportError, ExportOptions};
use crate::load::{LoadError, load_chapters};
use crate::parse::Grammar;
use crate::render::render_chapters;
use crate::types::{Chapter, CompiledDocument, RenderedChapter, TocEntry};
use log::{debug, info};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{} warning(s) treated as errors (--strict)", .0.len())]
    Strict(Vec<Diagnostic>),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Flags that change how a build behaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Escalate every warning to a fatal error.
    pub strict: bool,
    /// Stamp `<meta name="build-time">` into the document.
    pub timestamp: bool,
    /// Also export a PDF next to the HTML.
    pub pdf: bool,
}

/// Chapters after parsing and anchor resolution.
#[derive(Debug)]
pub struct ParsedBook {
    pub chapters: Vec<Chapter>,
    pub links: LinkMap,
    /// Loader and parse warnings, in book order.
    pub warnings: Vec<Diagnostic>,
}

/// An assembled document that has not been written anywhere yet.
#[derive(Debug)]
pub struct Build {
    pub chapters: Vec<ChapterSummary>,
    pub document: CompiledDocument,
    pub warnings: Vec<Diagnostic>,
}

/// One line of the build summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSummary {
    pub ordinal: u32,
    pub title: String,
    pub file_name: String,
    pub blocks: usize,
}

/// What a finished `compile` produced.
#[derive(Debug)]
pub struct BuildReport {
    pub chapters: Vec<ChapterSummary>,
    pub toc: Vec<TocEntry>,
    pub warnings: Vec<Diagnostic>,
    pub html_path: PathBuf,
    pub pdf_path: Option<PathBuf>,
    pub assets_copied: usize,
}

/// Load the book config, applying a `--jobs` override.
pub fn prepare_config(
    source_dir: &Path,
    explicit: Option<&Path>,
    jobs: Option<usize>,
) -> Result<BookConfig, CompileError> {
    let mut config = config::load_config(source_dir, explicit)?;
    if let Some(jobs) = jobs {
        config.processing.max_threads = Some(jobs);
        config.validate()?;
    }
    Ok(config)
}

/// Load and parse every chapter, then make anchors unique book-wide.
pub fn parse_book(source_dir: &Path, config: &BookConfig) -> Result<ParsedBook, CompileError> {
    let loaded = load_chapters(source_dir)?;
    info!("loaded {} chapters from {}", loaded.chapters.len(), source_dir.display());

    let grammar = Grammar::new(&config.render.diagram_languages);
    let (parsed, parse_warnings): (Vec<ParsedChapter>, Vec<Vec<Diagnostic>>) = loaded
        .chapters
        .into_par_iter()
        .map(|source| {
            let output = grammar.parse(&source.raw_source);
            let warnings: Vec<Diagnostic> = output
                .warnings
                .into_iter()
                .map(|w| Diagnostic::new(&source.file_name, Some(w.line), w.kind))
                .collect();
            debug!("parsed {}: {} blocks", source.file_name, output.blocks.len());
            (
                ParsedChapter {
                    source,
                    blocks: output.blocks,
                },
                warnings,
            )
        })
        .unzip();

    let (chapters, links) = resolve_anchors(parsed);

    let mut warnings = loaded.warnings;
    warnings.extend(parse_warnings.into_iter().flatten());
    Ok(ParsedBook {
        chapters,
        links,
        warnings,
    })
}

/// Run every stage up to and including assembly. Writes nothing.
pub fn build(
    source_dir: &Path,
    config: &BookConfig,
    options: &BuildOptions,
) -> Result<Build, CompileError> {
    let ParsedBook {
        chapters,
        links,
        warnings: early_warnings,
    } = parse_book(source_dir, config)?;

    let rendered = render_chapters(&chapters, &links);

    let warnings = merge_warnings(early_warnings, &chapters, &rendered);
    if options.strict && !warnings.is_empty() {
        return Err(CompileError::Strict(warnings));
    }

    let build_time = options.timestamp.then(unix_now).flatten();
    let document = assemble(&rendered, &AssembleOptions { config, build_time })?;

    let chapters = chapters
        .iter()
        .map(|c| ChapterSummary {
            ordinal: c.id.ordinal,
            title: c.title.clone(),
            file_name: c.file_name.clone(),
            blocks: c.blocks.len(),
        })
        .collect();

    Ok(Build {
        chapters,
        document,
        warnings,
    })
}

/// Build the book and write it to `output_dir`.
pub fn compile(
    source_dir: &Path,
    output_dir: &Path,
    config: &BookConfig,
    options: &BuildOptions,
) -> Result<BuildReport, CompileError> {
    let Build {
        chapters,
        document,
        warnings,
    } = build(source_dir, config, options)?;

    fs::create_dir_all(output_dir).map_err(io_err(output_dir))?;

    let assets_copied = copy_assets(
        &source_dir.join(&config.output.assets_dir),
        &output_dir.join(&config.output.assets_dir),
    )?;

    let html_path = output_dir.join(&config.output.html_file);
    fs::write(&html_path, &document.html).map_err(io_err(&html_path))?;
    info!("wrote {}", html_path.display());

    let pdf_path = if options.pdf {
        let pdf_path = output_dir.join(&config.output.pdf_file);
        let bytes = export::export_pdf(&html_path, &ExportOptions::from_config(&config.export))?;
        export::write_pdf(&bytes, &pdf_path)?;
        Some(pdf_path)
    } else {
        None
    };

    Ok(BuildReport {
        chapters,
        toc: document.toc,
        warnings,
        html_path,
        pdf_path,
        assets_copied,
    })
}

/// File-level warnings first, then each chapter's parse and render
/// warnings merged by line.
fn merge_warnings(
    early: Vec<Diagnostic>,
    chapters: &[Chapter],
    rendered: &[RenderedChapter],
) -> Vec<Diagnostic> {
    let (mut merged, mut located): (Vec<_>, Vec<_>) =
        early.into_iter().partition(|d| d.line.is_none());

    for (chapter, rendered) in chapters.iter().zip(rendered) {
        let (mut mine, rest): (Vec<_>, Vec<_>) = located
            .into_iter()
            .partition(|d| d.file == chapter.file_name);
        located = rest;
        mine.extend(rendered.warnings.iter().cloned());
        mine.sort_by_key(|d| d.line);
        merged.extend(mine);
    }
    merged.extend(located);
    merged
}

/// Copy the assets directory verbatim. A missing directory copies nothing.
fn copy_assets(src: &Path, dst: &Path) -> Result<usize, CompileError> {
    if !src.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| CompileError::Io {
            path: src.to_path_buf(),
            source: e.into(),
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(io_err(&target))?;
            copied += 1;
        }
    }
    debug!("copied {copied} asset files to {}", dst.display());
    Ok(copied)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CompileError {
    let path = path.to_path_buf();
    move |source| CompileError::Io { path, source }
}

fn unix_now() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}
