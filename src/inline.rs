//! Inline Markdown rendering for block text.
//!
//! The block parser only decides where blocks start and end; the text inside
//! a paragraph, list item, table cell or callout still carries inline
//! Markdown (`**bold**`, `` `code` ``, `[links](...)`). That text goes through
//! pulldown-cmark with two adjustments:
//!
//! - **Raw HTML is never passed through.** `Html`/`InlineHtml` events are
//!   turned into `Text` events, so pulldown-cmark escapes them like any
//!   other text.
//! - **Block structure is flattened.** Paragraph, heading, list and quote
//!   tags are dropped; only their inline content is kept. Nesting is handled
//!   by the block parser (which doesn't support it), not here.
//!
//! Links pointing at other chapters are rewritten through the [`LinkMap`].

use crate::anchor::LinkMap;
use crate::diagnostics::WarningKind;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};

/// Where the text being rendered lives, for link resolution.
#[derive(Debug, Clone, Copy)]
pub struct LinkScope<'a> {
    pub links: &'a LinkMap,
    pub file_name: &'a str,
}

/// Render inline Markdown to HTML. Warnings (broken cross-references) are
/// appended to `warnings`.
pub fn render_inline(
    text: &str,
    scope: Option<LinkScope<'_>>,
    warnings: &mut Vec<WarningKind>,
) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH);
    let events = parser.filter_map(|event| match event {
        Event::Start(tag) if is_block_tag(&tag) => None,
        Event::End(tag) if is_block_tag_end(tag) => None,
        Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: rewrite_link(dest_url, scope, warnings),
            title,
            id,
        })),
        other => Some(other),
    });

    let mut out = String::with_capacity(text.len() + text.len() / 4);
    html::push_html(&mut out, events);
    out.trim_end().to_string()
}

fn is_block_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading { .. }
            | Tag::BlockQuote(_)
            | Tag::List(_)
            | Tag::Item
            | Tag::CodeBlock(_)
    )
}

fn is_block_tag_end(tag: TagEnd) -> bool {
    matches!(
        tag,
        TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::CodeBlock
    )
}

/// A link target that refers to a chapter file or an in-document anchor.
fn is_book_reference(target: &str) -> bool {
    if target.starts_with('#') {
        return true;
    }
    if target.contains("://") || target.starts_with("mailto:") {
        return false;
    }
    let path = target.split('#').next().unwrap_or(target);
    path.to_ascii_lowercase().ends_with(".md")
}

fn rewrite_link<'a>(
    dest: CowStr<'a>,
    scope: Option<LinkScope<'_>>,
    warnings: &mut Vec<WarningKind>,
) -> CowStr<'a> {
    if dest.trim_start().to_ascii_lowercase().starts_with("javascript:") {
        return CowStr::Borrowed("#");
    }
    let Some(scope) = scope else {
        return dest;
    };
    if !is_book_reference(&dest) {
        return dest;
    }
    match scope.links.resolve(scope.file_name, &dest) {
        Some(href) => CowStr::from(href),
        None => {
            warnings.push(WarningKind::BrokenReference(dest.to_string()));
            dest
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{ParsedChapter, resolve_anchors};
    use crate::parse::parse;
    use crate::test_helpers::chapter_source;

    fn inline(text: &str) -> String {
        let mut warnings = Vec::new();
        let html = render_inline(text, None, &mut warnings);
        assert!(warnings.is_empty());
        html
    }

    fn two_chapter_links() -> LinkMap {
        let chapters = [(1, "Intro", "# Intro\n## Setup"), (2, "Next", "# Next")]
            .into_iter()
            .map(|(n, title, raw)| ParsedChapter {
                source: chapter_source(n, title, raw),
                blocks: parse(raw).blocks,
            })
            .collect();
        resolve_anchors(chapters).1
    }

    #[test]
    fn emphasis_and_code() {
        assert_eq!(
            inline("Use **bold** and `x < y`."),
            "Use <strong>bold</strong> and <code>x &lt; y</code>."
        );
    }

    #[test]
    fn no_paragraph_wrapper() {
        assert!(!inline("plain").contains("<p>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = inline("before <script>alert(1)</script> after");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn block_html_is_escaped() {
        let html = inline("<div onclick=\"x()\">hi</div>");
        assert!(!html.contains("<div"));
        assert!(html.contains("&lt;div"));
    }

    #[test]
    fn javascript_links_neutralized() {
        let html = inline("[click](javascript:alert(1))");
        assert!(html.contains(r##"href="#""##));
    }

    #[test]
    fn external_links_untouched() {
        let links = LinkMap::default();
        let scope = LinkScope {
            links: &links,
            file_name: "01_Intro.md",
        };
        let mut warnings = Vec::new();
        let html = render_inline("[docs](https://example.com/a.md)", Some(scope), &mut warnings);
        assert!(html.contains(r#"href="https://example.com/a.md""#));
        assert!(warnings.is_empty());
    }

    #[test]
    fn chapter_links_rewritten() {
        let links = two_chapter_links();
        let scope = LinkScope {
            links: &links,
            file_name: "02_Next.md",
        };
        let mut warnings = Vec::new();
        let html = render_inline(
            "See [intro](01_Intro.md) and [setup](01_Intro.md#setup).",
            Some(scope),
            &mut warnings,
        );
        assert!(html.contains(r##"href="#chapter-01""##));
        assert!(html.contains(r##"href="#setup""##));
        assert!(warnings.is_empty());
    }

    #[test]
    fn broken_reference_warns_and_keeps_href() {
        let links = two_chapter_links();
        let scope = LinkScope {
            links: &links,
            file_name: "01_Intro.md",
        };
        let mut warnings = Vec::new();
        let html = render_inline("[gone](07_Gone.md)", Some(scope), &mut warnings);
        assert!(html.contains(r#"href="07_Gone.md""#));
        assert_eq!(
            warnings,
            vec![WarningKind::BrokenReference("07_Gone.md".to_string())]
        );
    }
}
