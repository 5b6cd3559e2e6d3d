//! # bookc
//!
//! A book compiler for technical writing. A directory of numbered Markdown
//! chapters goes in; one self-contained HTML document (and optionally a PDF)
//! comes out.
//!
//! # Architecture: Staged Pipeline
//!
//! ```text
//! 1. Load      source dir  →  ChapterSource[]    (NN_Title.md discovery, ordering)
//! 2. Parse     raw text    →  Block[]            (per chapter, in parallel)
//! 3. Anchors   Block[]     →  Chapter[]          (book-wide unique ids, link map)
//! 4. Render    Chapter     →  RenderedChapter    (per chapter, in parallel)
//! 5. Assemble  chapters    →  CompiledDocument   (TOC, navigation, template)
//! 6. Export    book.html   →  book.pdf           (headless Chrome, --pdf only)
//! ```
//!
//! Every stage is a function from immutable input to new output. Parsing
//! and rendering have no shared mutable state, so they parallelize per
//! chapter with rayon; collecting indexed parallel iterators keeps book
//! order no matter which worker finishes first. The one stage that must
//! see every chapter at once (anchor resolution) runs sequentially in
//! between.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`load`] | Stage 1: discovers and orders chapter files |
//! | [`parse`] | Stage 2: line-oriented block parser (fences, tables, callouts, diagrams) |
//! | [`anchor`] | Stage 3: document-wide anchor registry and cross-chapter link map |
//! | [`render`] | Stage 4: one HTML shape per block, render-error fallback |
//! | [`inline`] | Inline Markdown via pulldown-cmark with raw HTML escaped |
//! | [`assemble`] | Stage 5: TOC, chapter sections, maud document template |
//! | [`export`] | Stage 6: PDF via a [`export::PdfRenderer`], timeout, cancel, retry |
//! | [`compile`] | Runs the stages, strict mode, writes output and assets |
//! | [`config`] | `book.toml` loading, validation, merging, and CSS generation |
//! | [`diagnostics`] | Recoverable warnings tied to file and line |
//! | [`naming`] | `NN_Title.md` filename convention and slugs |
//! | [`types`] | Shared types passed between stages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Warnings Over Failures
//!
//! A book is long and most mistakes are local: a ragged table row, an
//! unclosed fence, a callout kind nobody recognizes. Those become
//! [`diagnostics::Diagnostic`]s with a file and line, and the block renders
//! as best it can. Only structural problems (no chapters, two chapters with
//! the same number, a TOC anchor that does not resolve) stop the build.
//! `--strict` makes every warning fatal for CI.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/): templates are
//! checked at compile time, and every interpolation is escaped unless it is
//! explicitly wrapped in `PreEscaped`. Raw HTML in chapter sources is
//! always escaped.
//!
//! ## Client-Side Diagrams and Highlighting
//!
//! Diagram specs and code are emitted verbatim (escaped) with the language
//! as a class. Mermaid and highlight.js do the drawing in the browser, and
//! the PDF export waits for them, so the binary needs no diagram toolchain.

pub mod anchor;
pub mod assemble;
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod export;
pub mod inline;
pub mod load;
pub mod naming;
pub mod output;
pub mod parse;
pub mod render;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
