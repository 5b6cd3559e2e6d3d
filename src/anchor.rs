//! Anchor ids and cross-chapter link resolution.
//!
//! All chapters end up in a single HTML document, so every `id` must be
//! unique across the whole book, not just within one chapter. Parsing assigns
//! chapter-local anchors; [`resolve_anchors`] then walks the chapters in book
//! order and claims each anchor from one shared [`AnchorRegistry`], adding a
//! numeric suffix where two chapters use the same heading text.
//!
//! The same pass records every chapter's anchors in a [`LinkMap`], so the
//! renderer can rewrite `03_Retrieval.md#chunking` into `#chunking` (or
//! `#chunking-1`, if that heading was disambiguated).

use crate::naming::slugify;
use crate::types::{Block, Chapter, ChapterSource, ContentBlock};
use std::collections::{HashMap, HashSet};

/// Hands out unique anchor ids.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    used: HashSet<String>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an exact id. Returns `false` if it was already taken.
    pub fn reserve(&mut self, id: &str) -> bool {
        self.used.insert(id.to_string())
    }

    /// Derive an anchor from heading text and claim it.
    ///
    /// Text with no alphanumeric characters falls back to `section`.
    pub fn claim(&mut self, text: &str) -> String {
        let slug = slugify(text);
        if slug.is_empty() {
            self.claim_id("section")
        } else {
            self.claim_id(&slug)
        }
    }

    /// Claim `base`, or the first free `base-N` (N = 1, 2, ...).
    pub fn claim_id(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ChapterLinks {
    section: String,
    /// Chapter-local anchor → document-wide anchor.
    headings: HashMap<String, String>,
}

/// Resolves link targets written in chapter sources to in-document anchors.
#[derive(Debug, Clone, Default)]
pub struct LinkMap {
    chapters: HashMap<String, ChapterLinks>,
}

impl LinkMap {
    /// Resolve `target` as written in `current_file`.
    ///
    /// Understands `#local-anchor`, `NN_Title.md` and `NN_Title.md#anchor`
    /// (an optional leading `./` is ignored). Returns the rewritten href
    /// (`#anchor`) or `None` when the chapter or anchor does not exist.
    pub fn resolve(&self, current_file: &str, target: &str) -> Option<String> {
        let (file, fragment) = match target.split_once('#') {
            Some((file, fragment)) => (file, Some(fragment)),
            None => (target, None),
        };
        let file = file.strip_prefix("./").unwrap_or(file);
        let file = if file.is_empty() { current_file } else { file };

        let links = self.chapters.get(file)?;
        let anchor = match fragment {
            None | Some("") => &links.section,
            Some(fragment) if fragment == links.section => &links.section,
            Some(fragment) => links.headings.get(fragment)?,
        };
        Some(format!("#{anchor}"))
    }
}

/// A chapter source together with its parsed blocks.
#[derive(Debug, Clone)]
pub struct ParsedChapter {
    pub source: ChapterSource,
    pub blocks: Vec<Block>,
}

/// Make heading anchors unique across the book and build the [`LinkMap`].
///
/// Chapters must already be in book order; the first chapter to use a
/// heading keeps the bare anchor. Section anchors (`chapter-NN`) are reserved
/// before any heading so a heading can never shadow one.
pub fn resolve_anchors(parsed: Vec<ParsedChapter>) -> (Vec<Chapter>, LinkMap) {
    let mut registry = AnchorRegistry::new();
    for chapter in &parsed {
        registry.reserve(&chapter.source.id.section_anchor());
    }

    let mut link_map = LinkMap::default();
    let mut chapters = Vec::with_capacity(parsed.len());

    for ParsedChapter { source, blocks } in parsed {
        let mut links = ChapterLinks {
            section: source.id.section_anchor(),
            headings: HashMap::new(),
        };

        let blocks: Vec<Block> = blocks
            .into_iter()
            .map(|block| match block.content {
                ContentBlock::Heading {
                    level,
                    text,
                    anchor_id,
                } => {
                    let global = registry.claim_id(&anchor_id);
                    links.headings.insert(anchor_id, global.clone());
                    Block {
                        line: block.line,
                        content: ContentBlock::Heading {
                            level,
                            text,
                            anchor_id: global,
                        },
                    }
                }
                _ => block,
            })
            .collect();

        let title = blocks
            .iter()
            .find_map(|b| match &b.content {
                ContentBlock::Heading { level: 1, text, .. } if !text.is_empty() => {
                    Some(text.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| source.file_title.clone());

        link_map.chapters.insert(source.file_name.clone(), links);
        chapters.push(Chapter {
            id: source.id,
            title,
            path: source.path,
            file_name: source.file_name,
            raw_source: source.raw_source,
            blocks,
        });
    }

    (chapters, link_map)
}
