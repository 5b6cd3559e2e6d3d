//! Document assembly.
//!
//! Stage 4 of the bookc pipeline. Takes the rendered chapters, in book order,
//! and produces the single HTML document: title block, table of contents, one
//! `<section>` per chapter with previous/next links, and the shared template
//! around it.
//!
//! ## Document Structure
//!
//! ```text
//! <!DOCTYPE html>
//! <html lang="..">
//!   <head>    meta, theme + book.css + print.css inline, library includes
//!   <body>
//!     <header class="book-header">   title, author, description
//!     <nav class="toc">              one entry per level-1 heading
//!     <main class="book">
//!       <section class="chapter" id="chapter-01"> ... <nav class="chapter-nav">
//!       <section class="chapter" id="chapter-02"> ...
//!     <script>                       highlight / diagram libraries, book.js
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/book.css`: Layout and typography (colors injected from config)
//! - `static/print.css`: Page breaks between chapters for PDF export
//! - `static/book.js`: Starts highlighting and diagram rendering
//!
//! Assembly is pure: the same chapters and options produce byte-identical
//! output. The only time-dependent part is the optional build-time meta tag.

use crate::config::{self, BookConfig};
use crate::types::{CompiledDocument, RenderedChapter, TocEntry};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::HashMap;
use thiserror::Error;

const CSS_STATIC: &str = include_str!("../static/book.css");
const CSS_PRINT: &str = include_str!("../static/print.css");
const JS: &str = include_str!("../static/book.js");

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssembleError {
    #[error("TOC anchor '{anchor}' from {chapter} appears {occurrences} times in the document, expected once")]
    DanglingAnchor {
        anchor: String,
        chapter: String,
        occurrences: usize,
    },
}

/// Inputs to assembly besides the chapters themselves.
#[derive(Debug, Clone, Copy)]
pub struct AssembleOptions<'a> {
    pub config: &'a BookConfig,
    /// Unix timestamp for `<meta name="build-time">`. `None` leaves it out.
    pub build_time: Option<u64>,
}

/// Assemble rendered chapters into the final document.
///
/// Fails with [`AssembleError::DanglingAnchor`] when a TOC entry's anchor is
/// missing from the body or present more than once.
pub fn assemble(
    chapters: &[RenderedChapter],
    options: &AssembleOptions<'_>,
) -> Result<CompiledDocument, AssembleError> {
    let toc = build_toc(chapters);
    check_anchors(&toc, chapters)?;
    let body = render_chapters_body(chapters).into_string();

    let config = options.config;
    let css = format!(
        "{}\n\n{}\n\n{}\n\n{}",
        config::generate_theme_css(&config.theme),
        CSS_STATIC,
        config::generate_page_css(&config.export),
        CSS_PRINT
    );

    let content = html! {
        (title_block(config))
        (render_toc(&toc))
        main.book {
            (PreEscaped(body))
        }
    };

    let html = base_document(config, &css, options.build_time, content).into_string();
    Ok(CompiledDocument { html, toc })
}

/// Table of contents: every level-1 heading in chapter order. A chapter
/// without one contributes a single entry pointing at its section.
pub fn build_toc(chapters: &[RenderedChapter]) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    for chapter in chapters {
        if chapter.headings.is_empty() {
            toc.push((chapter, chapter.title.clone(), chapter.id.section_anchor()));
        } else {
            for (text, anchor) in &chapter.headings {
                toc.push((chapter, text.clone(), anchor.clone()));
            }
        }
    }
    toc.into_iter()
        .enumerate()
        .map(|(order, (chapter, title, anchor_id))| TocEntry {
            chapter_id: chapter.id.clone(),
            title,
            anchor_id,
            order,
        })
        .collect()
}

/// Count the ids the body actually carries (section ids plus rendered
/// heading ids) and require exactly one per TOC anchor. Text that merely
/// mentions `id="..."` does not count.
fn check_anchors(toc: &[TocEntry], chapters: &[RenderedChapter]) -> Result<(), AssembleError> {
    let mut emitted: HashMap<String, usize> = HashMap::new();
    for chapter in chapters {
        *emitted.entry(chapter.id.section_anchor()).or_default() += 1;
        for anchor in &chapter.anchors {
            *emitted.entry(anchor.clone()).or_default() += 1;
        }
    }

    for entry in toc {
        let occurrences = emitted.get(&entry.anchor_id).copied().unwrap_or(0);
        if occurrences != 1 {
            let chapter = chapters
                .iter()
                .find(|c| c.id == entry.chapter_id)
                .map(|c| c.file_name.clone())
                .unwrap_or_else(|| entry.chapter_id.to_string());
            return Err(AssembleError::DanglingAnchor {
                anchor: entry.anchor_id.clone(),
                chapter,
                occurrences,
            });
        }
    }
    Ok(())
}

fn render_chapters_body(chapters: &[RenderedChapter]) -> Markup {
    html! {
        @for (i, chapter) in chapters.iter().enumerate() {
            @let prev = i.checked_sub(1).and_then(|p| chapters.get(p));
            @let next = chapters.get(i + 1);
            section.chapter id=(chapter.id.section_anchor()) data-chapter=(chapter.id.to_string()) {
                (PreEscaped(&chapter.html))
                (chapter_nav(prev, next))
            }
        }
    }
}

/// Previous/next links at the bottom of a chapter.
fn chapter_nav(prev: Option<&RenderedChapter>, next: Option<&RenderedChapter>) -> Markup {
    html! {
        nav.chapter-nav aria-label="Chapter navigation" {
            @if let Some(prev) = prev {
                a.prev href={ "#" (prev.id.section_anchor()) } rel="prev" {
                    "← " (prev.title)
                }
            }
            @if let Some(next) = next {
                a.next href={ "#" (next.id.section_anchor()) } rel="next" {
                    (next.title) " →"
                }
            }
        }
    }
}

fn title_block(config: &BookConfig) -> Markup {
    let book = &config.book;
    html! {
        header.book-header {
            h1.book-title { (book.title) }
            @if !book.author.is_empty() {
                p.book-author { (book.author) }
            }
            @if !book.description.is_empty() {
                p.book-description { (book.description) }
            }
        }
    }
}

fn render_toc(toc: &[TocEntry]) -> Markup {
    html! {
        nav.toc aria-label="Table of contents" {
            h2 { "Contents" }
            ol {
                @for entry in toc {
                    li data-chapter=(entry.chapter_id.to_string()) {
                        a href={ "#" (entry.anchor_id) } { (entry.title) }
                    }
                }
            }
        }
    }
}

fn base_document(
    config: &BookConfig,
    css: &str,
    build_time: Option<u64>,
    content: Markup,
) -> Markup {
    let book = &config.book;
    let render = &config.render;
    html! {
        (DOCTYPE)
        html lang=(book.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (book.title) }
                @if !book.author.is_empty() {
                    meta name="author" content=(book.author);
                }
                @if !book.description.is_empty() {
                    meta name="description" content=(book.description);
                }
                meta name="generator" content={ "bookc " (env!("CARGO_PKG_VERSION")) };
                @if let Some(timestamp) = build_time {
                    meta name="build-time" content=(timestamp);
                }
                @if !render.highlight_stylesheet.is_empty() {
                    link rel="stylesheet" href=(render.highlight_stylesheet);
                }
                style { (PreEscaped(css)) }
            }
            body {
                (content)
                @if !render.highlight_script.is_empty() {
                    script src=(render.highlight_script) {}
                }
                @if !render.diagram_script.is_empty() {
                    script src=(render.diagram_script) {}
                }
                script { (PreEscaped(JS)) }
            }
        }
    }
}
