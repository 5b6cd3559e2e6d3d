//! Filename parsing for the `NN_Title.md` chapter convention.
//!
//! Every chapter file carries a numeric prefix that fixes its position in the
//! book, an underscore, and a title:
//!
//! - `01_Intro.md` → ordinal 1, title "Intro", slug `intro`
//! - `07_Scaling_Vector_Search.md` → ordinal 7, title "Scaling Vector Search"
//! - `12_War-Stories.md` → ordinal 12, title "War Stories"
//!
//! Anything else (`README.md`, `notes.md`, `Intro_01.md`) is not a chapter.

/// Result of parsing a chapter file stem like `07_Scaling_Vector_Search`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedChapterName {
    /// Numeric prefix (`7` from `07_...`).
    pub ordinal: u32,
    /// Display title: name part with `_` and `-` converted to spaces.
    pub display_title: String,
    /// URL-safe slug of the title.
    pub slug: String,
}

/// Parse a chapter file name (with or without the `.md` extension).
///
/// Returns `None` when the name does not follow `NN_Title(.md)`: no numeric
/// prefix, no underscore after it, an empty title, or another extension.
pub fn parse_chapter_name(file_name: &str) -> Option<ParsedChapterName> {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("md") => stem,
        Some(_) => return None,
        None => file_name,
    };

    let (prefix, name) = stem.split_once('_')?;
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let ordinal = prefix.parse::<u32>().ok()?;

    let display_title = name
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if display_title.is_empty() {
        return None;
    }

    Some(ParsedChapterName {
        ordinal,
        slug: slugify(&display_title),
        display_title,
    })
}

/// Lowercase `text` and collapse every run of non-alphanumeric characters
/// into a single `-`, trimming leading and trailing dashes.
///
/// Used for chapter slugs and heading anchors alike. Returns an empty string
/// when `text` has no alphanumeric characters.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_chapter_name() {
        let p = parse_chapter_name("01_Intro.md").unwrap();
        assert_eq!(p.ordinal, 1);
        assert_eq!(p.display_title, "Intro");
        assert_eq!(p.slug, "intro");
    }

    #[test]
    fn underscores_become_spaces() {
        let p = parse_chapter_name("07_Scaling_Vector_Search.md").unwrap();
        assert_eq!(p.ordinal, 7);
        assert_eq!(p.display_title, "Scaling Vector Search");
        assert_eq!(p.slug, "scaling-vector-search");
    }

    #[test]
    fn dashes_become_spaces() {
        let p = parse_chapter_name("12_War-Stories.md").unwrap();
        assert_eq!(p.display_title, "War Stories");
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert!(parse_chapter_name("03_Appendix.MD").is_some());
    }

    #[test]
    fn stem_without_extension() {
        assert_eq!(parse_chapter_name("02_Next").unwrap().ordinal, 2);
    }

    #[test]
    fn unpadded_ordinal() {
        assert_eq!(parse_chapter_name("1_One.md").unwrap().ordinal, 1);
    }

    #[test]
    fn non_chapter_names_rejected() {
        assert_eq!(parse_chapter_name("README.md"), None);
        assert_eq!(parse_chapter_name("Intro_01.md"), None);
        assert_eq!(parse_chapter_name("01-Intro.md"), None);
        assert_eq!(parse_chapter_name("01_.md"), None);
        assert_eq!(parse_chapter_name("01_Intro.txt"), None);
        assert_eq!(parse_chapter_name("_Intro.md"), None);
    }

    #[test]
    fn slugify_collapses_runs() {
        assert_eq!(slugify("Hello,  World!"), "hello-world");
        assert_eq!(slugify("  --Trim me--  "), "trim-me");
        assert_eq!(slugify("RAG vs. Fine-Tuning (2024)"), "rag-vs-fine-tuning-2024");
    }

    #[test]
    fn slugify_empty_for_punctuation() {
        assert_eq!(slugify("!!!"), "");
    }
}
