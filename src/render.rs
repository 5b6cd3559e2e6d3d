//! Block renderer and chapter converter.
//!
//! Every [`ContentBlock`] variant maps to one HTML shape, built with maud so
//! that all interpolated text is escaped. Text that carries inline Markdown
//! (paragraphs, list items, table cells, callout bodies) goes through
//! [`crate::inline`] first and is embedded as pre-escaped HTML.
//!
//! ## Output shapes
//!
//! | Block | HTML |
//! |---|---|
//! | Paragraph | `<p>` |
//! | Heading | `<hN id="anchor">` |
//! | CodeFence | `<pre class="code-block"><code class="language-X" data-lang="X">` |
//! | Table | `<table>` with `<thead>` from the first row |
//! | Callout | `<aside class="callout callout-KIND">` with a title line |
//! | DiagramDirective | `<div class="diagram"><pre class="LANG">` raw spec `</pre></div>` |
//! | List / Quote / Rule | `<ul>`/`<ol>`, `<blockquote>`, `<hr>` |
//!
//! ## Failure policy
//!
//! A block that cannot be rendered (an empty table, a heading level outside
//! 1-6, a list without items) becomes a `<div class="render-error">` holding
//! the block's escaped source and a [`WarningKind::RenderError`]. The rest of
//! the chapter renders normally.

use crate::anchor::LinkMap;
use crate::diagnostics::{Diagnostic, WarningKind};
use crate::inline::{LinkScope, render_inline};
use crate::types::{CalloutKind, Chapter, ContentBlock, RenderedChapter, RenderedFragment};
use maud::{Markup, PreEscaped, html};
use rayon::prelude::*;

/// Render a single block. Never fails: malformed blocks produce a visible
/// render-error fragment instead.
pub fn render(block: &ContentBlock, scope: Option<LinkScope<'_>>) -> RenderedFragment {
    let mut warnings = Vec::new();
    let markup = match try_render(block, scope, &mut warnings) {
        Ok(markup) => markup,
        Err(reason) => {
            warnings.push(WarningKind::RenderError {
                block: block.kind_name(),
                reason: reason.clone(),
            });
            render_error(block, &reason)
        }
    };
    RenderedFragment {
        html: markup.into_string(),
        warnings,
    }
}

/// Render all blocks of a chapter, in order, into one HTML string.
pub fn render_chapter(chapter: &Chapter, links: &LinkMap) -> RenderedChapter {
    let scope = LinkScope {
        links,
        file_name: &chapter.file_name,
    };
    let mut html = String::new();
    let mut warnings = Vec::new();
    let mut anchors = Vec::new();
    for block in &chapter.blocks {
        let fragment = render(&block.content, Some(scope));
        if let ContentBlock::Heading { anchor_id, .. } = &block.content {
            let fell_back = fragment
                .warnings
                .iter()
                .any(|w| matches!(w, WarningKind::RenderError { .. }));
            if !fell_back {
                anchors.push(anchor_id.clone());
            }
        }
        html.push_str(&fragment.html);
        html.push('\n');
        warnings.extend(
            fragment
                .warnings
                .into_iter()
                .map(|kind| Diagnostic::new(&chapter.file_name, Some(block.line), kind)),
        );
    }

    RenderedChapter {
        id: chapter.id.clone(),
        title: chapter.title.clone(),
        file_name: chapter.file_name.clone(),
        headings: chapter
            .top_level_headings()
            .map(|(text, anchor)| (text.to_string(), anchor.to_string()))
            .collect(),
        anchors,
        html,
        warnings,
    }
}

/// Render chapters on the current rayon pool. The result is in the same
/// order as `chapters`, whatever order the workers finish in.
pub fn render_chapters(chapters: &[Chapter], links: &LinkMap) -> Vec<RenderedChapter> {
    chapters
        .par_iter()
        .map(|chapter| render_chapter(chapter, links))
        .collect()
}

fn try_render(
    block: &ContentBlock,
    scope: Option<LinkScope<'_>>,
    warnings: &mut Vec<WarningKind>,
) -> Result<Markup, String> {
    match block {
        ContentBlock::Paragraph { text } => {
            let inner = render_inline(text, scope, warnings);
            Ok(html! { p { (PreEscaped(inner)) } })
        }
        ContentBlock::Heading {
            level,
            text,
            anchor_id,
        } => render_heading(*level, text, anchor_id),
        ContentBlock::CodeFence { language, text } => Ok(render_code(language.as_deref(), text)),
        ContentBlock::Table { rows } => render_table(rows, scope, warnings),
        ContentBlock::Callout { kind, text } => Ok(render_callout(kind, text, scope, warnings)),
        ContentBlock::DiagramDirective { language, raw_spec } => {
            if raw_spec.trim().is_empty() {
                warnings.push(WarningKind::EmptyDiagram);
            }
            Ok(render_diagram(language, raw_spec))
        }
        ContentBlock::List { ordered, items } => {
            if items.is_empty() {
                return Err("list has no items".to_string());
            }
            let items: Vec<String> = items
                .iter()
                .map(|item| render_inline(item, scope, warnings))
                .collect();
            Ok(render_list(*ordered, &items))
        }
        ContentBlock::Quote { text } => {
            let paragraphs = render_paragraphs(text, scope, warnings);
            Ok(html! { blockquote { (paragraphs) } })
        }
        ContentBlock::Rule => Ok(html! { hr; }),
    }
}

fn render_heading(level: u8, text: &str, anchor_id: &str) -> Result<Markup, String> {
    let markup = match level {
        1 => html! { h1 id=(anchor_id) { (text) } },
        2 => html! { h2 id=(anchor_id) { (text) } },
        3 => html! { h3 id=(anchor_id) { (text) } },
        4 => html! { h4 id=(anchor_id) { (text) } },
        5 => html! { h5 id=(anchor_id) { (text) } },
        6 => html! { h6 id=(anchor_id) { (text) } },
        other => return Err(format!("heading level {other} is outside 1-6")),
    };
    Ok(markup)
}

/// Keep only characters that are safe and meaningful in a CSS class name.
fn language_class(language: &str) -> String {
    language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn render_code(language: Option<&str>, text: &str) -> Markup {
    let language = language.map(language_class).filter(|l| !l.is_empty());
    let class = language.as_ref().map(|l| format!("language-{l}"));
    html! {
        pre.code-block {
            code class=[class] data-lang=[language] { (text) }
        }
    }
}

fn render_table(
    rows: &[Vec<String>],
    scope: Option<LinkScope<'_>>,
    warnings: &mut Vec<WarningKind>,
) -> Result<Markup, String> {
    let Some((header, body)) = rows.split_first() else {
        return Err("table has no rows".to_string());
    };
    let width = header.len();
    if width == 0 {
        return Err("table header has no cells".to_string());
    }

    let header: Vec<String> = header
        .iter()
        .map(|cell| render_inline(cell, scope, warnings))
        .collect();

    let mut body_rows = Vec::with_capacity(body.len());
    for (idx, row) in body.iter().enumerate() {
        if row.len() != width {
            warnings.push(WarningKind::RaggedTable {
                // Row 1 is the header.
                row: idx + 2,
                expected: width,
                found: row.len(),
            });
        }
        let cells: Vec<String> = (0..width)
            .map(|i| match row.get(i) {
                Some(cell) => render_inline(cell, scope, warnings),
                None => String::new(),
            })
            .collect();
        body_rows.push(cells);
    }

    Ok(html! {
        table {
            thead {
                tr {
                    @for cell in &header {
                        th { (PreEscaped(cell)) }
                    }
                }
            }
            @if !body_rows.is_empty() {
                tbody {
                    @for row in &body_rows {
                        tr {
                            @for cell in row {
                                td { (PreEscaped(cell)) }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// How a callout kind is drawn. One entry per kind; unknown kinds share the
/// note style.
struct CalloutStyle {
    class: &'static str,
    /// Render list-looking lines as a `<ul>` (the Key Takeaways box).
    list_box: bool,
}

fn callout_style(kind: &CalloutKind) -> CalloutStyle {
    match kind {
        CalloutKind::KeyTakeaways => CalloutStyle {
            class: "callout callout-key-takeaways",
            list_box: true,
        },
        CalloutKind::WarStory => CalloutStyle {
            class: "callout callout-war-story",
            list_box: false,
        },
        CalloutKind::Note | CalloutKind::Other(_) => CalloutStyle {
            class: "callout callout-note",
            list_box: false,
        },
    }
}

fn render_callout(
    kind: &CalloutKind,
    text: &str,
    scope: Option<LinkScope<'_>>,
    warnings: &mut Vec<WarningKind>,
) -> Markup {
    if let CalloutKind::Other(name) = kind {
        warnings.push(WarningKind::UnknownCalloutKind(name.clone()));
    }
    let style = callout_style(kind);
    let other_kind = match kind {
        CalloutKind::Other(name) => Some(name.as_str()),
        _ => None,
    };

    let body = if style.list_box {
        render_list_box(text, scope, warnings)
    } else {
        render_paragraphs(text, scope, warnings)
    };

    html! {
        aside class=(style.class) role="note" data-kind=[other_kind] {
            p.callout-title { (kind.label()) }
            (body)
        }
    }
}

/// Split text on blank lines and render each chunk as a `<p>`.
fn render_paragraphs(
    text: &str,
    scope: Option<LinkScope<'_>>,
    warnings: &mut Vec<WarningKind>,
) -> Markup {
    let paragraphs: Vec<String> = split_paragraphs(text)
        .map(|chunk| render_inline(chunk, scope, warnings))
        .collect();
    html! {
        @for paragraph in &paragraphs {
            p { (PreEscaped(paragraph)) }
        }
    }
}

/// Key Takeaways body: runs of `-`/`*`/`N.` lines become list items, other
/// lines stay paragraphs.
fn render_list_box(
    text: &str,
    scope: Option<LinkScope<'_>>,
    warnings: &mut Vec<WarningKind>,
) -> Markup {
    let mut parts: Vec<(bool, Vec<String>)> = Vec::new();
    for chunk in split_paragraphs(text) {
        let mut items: Vec<String> = Vec::new();
        let mut prose: Vec<&str> = Vec::new();
        for line in chunk.lines() {
            match strip_list_marker(line) {
                Some(item) => {
                    if !prose.is_empty() {
                        parts.push((false, vec![render_inline(&prose.join("\n"), scope, warnings)]));
                        prose.clear();
                    }
                    items.push(render_inline(item, scope, warnings));
                }
                None => {
                    if !items.is_empty() {
                        parts.push((true, std::mem::take(&mut items)));
                    }
                    prose.push(line);
                }
            }
        }
        if !items.is_empty() {
            parts.push((true, items));
        }
        if !prose.is_empty() {
            parts.push((false, vec![render_inline(&prose.join("\n"), scope, warnings)]));
        }
    }

    html! {
        @for (is_list, chunks) in &parts {
            @if *is_list {
                ul {
                    @for item in chunks {
                        li { (PreEscaped(item)) }
                    }
                }
            } @else {
                @for chunk in chunks {
                    p { (PreEscaped(chunk)) }
                }
            }
        }
    }
}

fn strip_list_marker(line: &str) -> Option<&str> {
    let line = line.trim_start();
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest.trim());
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        return line[digits..]
            .strip_prefix(". ")
            .or_else(|| line[digits..].strip_prefix(") "))
            .map(str::trim);
    }
    None
}

fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
}

fn render_diagram(language: &str, raw_spec: &str) -> Markup {
    let language = language_class(language);
    html! {
        div.diagram data-diagram=(language) {
            pre class=(language) { (raw_spec) }
        }
    }
}

fn render_list(ordered: bool, items: &[String]) -> Markup {
    html! {
        @if ordered {
            ol {
                @for item in items {
                    li { (PreEscaped(item)) }
                }
            }
        } @else {
            ul {
                @for item in items {
                    li { (PreEscaped(item)) }
                }
            }
        }
    }
}

fn render_error(block: &ContentBlock, reason: &str) -> Markup {
    html! {
        div.render-error data-block=(block.kind_name()) {
            p.render-error-marker { "Render error (" (block.kind_name()) "): " (reason) }
            pre { (block.source_text()) }
        }
    }
}
