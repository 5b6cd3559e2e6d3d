//! Block parser for the book's Markdown dialect.
//!
//! Splits a chapter's raw text into an ordered list of [`Block`]s. The parser
//! is line-oriented: each line is classified on its own, and a classified
//! opener (fence, blockquote, table row, list item) decides how many of the
//! following lines belong to the same block.
//!
//! ## Grammar
//!
//! | Construct | Recognized by | Ends at |
//! |---|---|---|
//! | Code fence | `` ``` `` or `~~~` (≥3), optional language | matching close delimiter |
//! | Diagram | a fence whose language is a declared diagram language | matching close delimiter |
//! | Heading | 1-6 `#` then a space | end of line |
//! | Callout | `>` + `**Key Takeaways**`, `**War Story**`, `**Note**` or `[!KIND]` | blank line |
//! | Quote | any other `>` line | blank line |
//! | Table | lines starting with `\|` | first line that is not a row |
//! | List | `- `, `* `, `+ `, `1. `, `1) ` | blank line or another construct |
//! | Rule | `---`, `***`, `___` | end of line |
//! | Paragraph | anything else | blank line or another construct |
//!
//! Nesting is not supported. Inside a fence, callout or quote every line is
//! taken literally, so a table inside a callout stays as `|`-delimited text.
//!
//! Fences and callouts still open at end of input are closed there and
//! reported as [`WarningKind::UnterminatedBlock`].

use crate::anchor::AnchorRegistry;
use crate::diagnostics::WarningKind;
use crate::types::{Block, CalloutKind, ContentBlock};

/// A warning raised while parsing, tied to the line the block starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutput {
    pub blocks: Vec<Block>,
    pub warnings: Vec<ParseWarning>,
}

/// Parser configuration: which fence languages are diagrams.
#[derive(Debug, Clone)]
pub struct Grammar {
    diagram_languages: Vec<String>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new(["mermaid"])
    }
}

/// Parse with the default grammar (`mermaid` is the only diagram language).
pub fn parse(raw_text: &str) -> ParseOutput {
    Grammar::default().parse(raw_text)
}

impl Grammar {
    pub fn new<I, S>(diagram_languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            diagram_languages: diagram_languages
                .into_iter()
                .map(|l| l.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    fn is_diagram(&self, language: &str) -> bool {
        let language = language.to_ascii_lowercase();
        self.diagram_languages.iter().any(|l| *l == language)
    }

    /// Split `raw_text` into blocks. Pure: identical input, identical output.
    pub fn parse(&self, raw_text: &str) -> ParseOutput {
        let lines: Vec<&str> = raw_text.lines().collect();
        let mut state = ParseState {
            grammar: self,
            lines: &lines,
            pos: 0,
            anchors: AnchorRegistry::new(),
            out: ParseOutput::default(),
        };
        state.run();
        state.out
    }
}

/// Classification of a single line, independent of its neighbours.
#[derive(Debug, PartialEq)]
enum LineKind<'a> {
    Blank,
    FenceOpen {
        marker: char,
        len: usize,
        info: &'a str,
    },
    Heading {
        level: u8,
        text: &'a str,
    },
    Blockquote,
    TableRow,
    ListItem {
        ordered: bool,
        rest: &'a str,
    },
    Rule,
    Text,
}

fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    if indent > 3 {
        return LineKind::Text;
    }
    if let Some((marker, len, info)) = fence_open(trimmed) {
        return LineKind::FenceOpen { marker, len, info };
    }
    if let Some((level, text)) = atx_heading(trimmed) {
        return LineKind::Heading { level, text };
    }
    if trimmed.starts_with('>') {
        return LineKind::Blockquote;
    }
    if trimmed.starts_with('|') {
        return LineKind::TableRow;
    }
    if is_rule(trimmed) {
        return LineKind::Rule;
    }
    if let Some((ordered, rest)) = list_item(trimmed) {
        return LineKind::ListItem { ordered, rest };
    }
    LineKind::Text
}

fn fence_open(trimmed: &str) -> Option<(char, usize, &str)> {
    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|&c| c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some((marker, len, info))
}

fn is_fence_close(line: &str, marker: char, open_len: usize) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().take_while(|&c| c == marker).count();
    len >= open_len && len == trimmed.chars().count()
}

fn atx_heading(trimmed: &str) -> Option<(u8, &str)> {
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim();
    // Optional closing sequence: `## Title ##`
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.is_empty() {
        ""
    } else if without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end()
    } else {
        text
    };
    Some((level as u8, text))
}

fn is_rule(trimmed: &str) -> bool {
    let Some(marker) = trimmed.chars().next() else {
        return false;
    };
    if !matches!(marker, '-' | '*' | '_') {
        return false;
    }
    let mut count = 0;
    for c in trimmed.chars() {
        if c == marker {
            count += 1;
        } else if !c.is_whitespace() {
            return false;
        }
    }
    count >= 3
}

fn list_item(trimmed: &str) -> Option<(bool, &str)> {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(bullet) {
            return Some((false, rest.trim()));
        }
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if (1..=9).contains(&digits) {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest
            .strip_prefix(". ")
            .or_else(|| rest.strip_prefix(") "))
        {
            return Some((true, rest.trim()));
        }
    }
    None
}

/// Strip the `>` marker and one following space from a blockquote line.
/// Lazy continuation lines (no marker) are returned trimmed.
fn strip_quote_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('>') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest).trim_end(),
        None => trimmed.trim_end(),
    }
}

/// Recognize a callout keyword at the start of a blockquote's first line.
///
/// Returns the kind and whatever text follows the keyword on that line.
fn detect_callout(content: &str) -> Option<(CalloutKind, &str)> {
    let content = content.trim_start_matches('#').trim();

    if let Some(rest) = content.strip_prefix("[!") {
        let (kind, tail) = rest.split_once(']')?;
        let kind = kind.trim();
        if kind.is_empty() {
            return None;
        }
        let kind = CalloutKind::from_keyword(kind)
            .unwrap_or_else(|| CalloutKind::Other(kind.to_string()));
        return Some((kind, tail.trim()));
    }

    if let Some(rest) = content.strip_prefix("**") {
        let (inner, tail) = rest.split_once("**")?;
        let inner = inner.trim().trim_end_matches(':');
        let kind = CalloutKind::from_keyword(inner)?;
        let tail = tail.trim_start().strip_prefix(':').unwrap_or(tail);
        return Some((kind, tail.trim()));
    }

    if let Some((head, tail)) = content.split_once(':')
        && let Some(kind) = CalloutKind::from_keyword(head)
    {
        return Some((kind, tail.trim()));
    }
    CalloutKind::from_keyword(content).map(|kind| (kind, ""))
}

/// Split a table row on unescaped `|`, dropping the outer pipes.
fn split_cells(line: &str) -> Vec<String> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = match t.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => t,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = t.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn is_delimiter_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty()
                && cell.contains('-')
                && cell.chars().all(|c| matches!(c, '-' | ':' | ' '))
        })
}

struct ParseState<'g, 'l> {
    grammar: &'g Grammar,
    lines: &'l [&'l str],
    pos: usize,
    anchors: AnchorRegistry,
    out: ParseOutput,
}

impl ParseState<'_, '_> {
    fn run(&mut self) {
        while self.pos < self.lines.len() {
            let start = self.pos;
            let line = self.lines[start];
            match classify(line) {
                LineKind::Blank => self.pos += 1,
                LineKind::FenceOpen { marker, len, info } => self.fence(marker, len, info),
                LineKind::Heading { level, text } => {
                    let anchor_id = self.anchors.claim(text);
                    self.push(
                        start,
                        ContentBlock::Heading {
                            level,
                            text: text.to_string(),
                            anchor_id,
                        },
                    );
                    self.pos += 1;
                }
                LineKind::Blockquote => self.blockquote(),
                LineKind::TableRow => self.table(),
                LineKind::ListItem { .. } => self.list(),
                LineKind::Rule => {
                    self.push(start, ContentBlock::Rule);
                    self.pos += 1;
                }
                LineKind::Text => self.paragraph(),
            }
        }
    }

    fn push(&mut self, start: usize, content: ContentBlock) {
        self.out.blocks.push(Block {
            line: start + 1,
            content,
        });
    }

    fn warn(&mut self, start: usize, kind: WarningKind) {
        self.out.warnings.push(ParseWarning {
            line: start + 1,
            kind,
        });
    }

    fn fence(&mut self, marker: char, open_len: usize, info: &str) {
        let start = self.pos;
        let language = info.split_whitespace().next().map(str::to_string);
        let is_diagram = language
            .as_deref()
            .is_some_and(|lang| self.grammar.is_diagram(lang));

        self.pos += 1;
        let mut body = Vec::new();
        let mut closed = false;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if is_fence_close(line, marker, open_len) {
                closed = true;
                break;
            }
            body.push(line);
        }
        let text = body.join("\n");

        if !closed {
            let block = if is_diagram { "diagram" } else { "code fence" };
            self.warn(start, WarningKind::UnterminatedBlock { block });
        }

        let content = match language {
            Some(language) if is_diagram => ContentBlock::DiagramDirective {
                language: language.to_ascii_lowercase(),
                raw_spec: text,
            },
            language => ContentBlock::CodeFence { language, text },
        };
        self.push(start, content);
    }

    fn blockquote(&mut self) {
        let start = self.pos;
        let first = strip_quote_marker(self.lines[start]);
        let callout = detect_callout(first);

        let mut body: Vec<&str> = Vec::new();
        if let Some((_, tail)) = callout.as_ref() {
            if !tail.is_empty() {
                body.push(*tail);
            }
        } else {
            body.push(first);
        }

        self.pos += 1;
        let mut terminated = false;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                terminated = true;
                break;
            }
            body.push(strip_quote_marker(line));
            self.pos += 1;
        }

        let text = trim_blank_edges(&body).join("\n");
        match callout {
            Some((kind, _)) => {
                if !terminated {
                    self.warn(start, WarningKind::UnterminatedBlock { block: "callout" });
                }
                self.push(start, ContentBlock::Callout { kind, text });
            }
            None => self.push(start, ContentBlock::Quote { text }),
        }
    }

    fn table(&mut self) {
        let start = self.pos;
        let mut rows = Vec::new();
        while self.pos < self.lines.len() && classify(self.lines[self.pos]) == LineKind::TableRow {
            let cells = split_cells(self.lines[self.pos]);
            // Only the row under the header (or a headerless leading one) is
            // a delimiter; later all-dash rows are data.
            let delimiter = self.pos - start < 2 && is_delimiter_row(&cells);
            if !delimiter {
                rows.push(cells);
            }
            self.pos += 1;
        }
        self.push(start, ContentBlock::Table { rows });
    }

    fn list(&mut self) {
        let start = self.pos;
        let mut ordered_list = None;
        let mut items: Vec<String> = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            match classify(line) {
                LineKind::ListItem { ordered, rest } => {
                    ordered_list.get_or_insert(ordered);
                    items.push(rest.to_string());
                }
                // Indented lines continue the previous item; nested markers
                // deeper than three spaces are kept literally.
                LineKind::Text if line.starts_with([' ', '\t']) => {
                    if let Some(last) = items.last_mut() {
                        last.push('\n');
                        last.push_str(line.trim());
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }
        self.push(
            start,
            ContentBlock::List {
                ordered: ordered_list.unwrap_or(false),
                items,
            },
        );
    }

    fn paragraph(&mut self) {
        let start = self.pos;
        let mut lines = vec![self.lines[start].trim()];
        self.pos += 1;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            match classify(line) {
                LineKind::Text => lines.push(line.trim()),
                _ => break,
            }
            self.pos += 1;
        }
        self.push(
            start,
            ContentBlock::Paragraph {
                text: lines.join("\n"),
            },
        );
    }
}

fn trim_blank_edges<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => &lines[first..=last],
        _ => &[],
    }
}
