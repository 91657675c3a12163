// src/checker/markdown.rs
// =============================================================================
// This module understands just enough Markdown to help the extractor.
//
// Two jobs:
// - Find link destinations that are NOT absolute URLs ([docs](docs/a.md)).
//   Absolute URLs are found by a plain text scan in extract.rs, but relative
//   ones only exist inside Markdown link syntax, so we need a real parser.
// - Find link syntax that looks broken (only with --validate-markdown).
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Can tell us the byte range each event came from (into_offset_iter)
//
// Rust concepts:
// - Iterators: For processing sequences of items
// - Pattern matching: To identify link events
// - LazyLock: A static that is initialized on first use
// =============================================================================

use pulldown_cmark::{Event, LinkType, Parser, Tag};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

use super::extract::Location;

// `[a](x)[b](y)`: the `)` of one link runs straight into the `[` of the next.
// The destination may hold one level of balanced parens: `(.../Rust_(lang))`
#[allow(clippy::expect_used)]
static MISSING_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\]\((?:[^()\s]|\([^()\s]*\))+\)\[").expect("static regex is valid")
});

// `[a] (https://x)`: whitespace between text and destination, so no link is rendered
#[allow(clippy::expect_used)]
static DETACHED_DESTINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\][ \t]+\((?:https?://|/|\./|\.\./)").expect("static regex is valid")
});

/// A link destination found in Markdown link syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Byte offset of the destination in the document
    pub offset: usize,
    /// Destination exactly as the parser reported it
    pub raw: String,
}

/// What is wrong with a piece of Markdown link syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxIssue {
    /// Two inline links with no space between them: `[a](x)[b](y)`
    MissingSpace,
    /// Link text and destination separated by whitespace: `[a] (x)`
    DetachedDestination,
}

/// A Markdown syntax warning. Never affects whether a check succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkdownDiagnostic {
    pub issue: SyntaxIssue,
    pub location: Location,
    /// The offending text
    pub snippet: String,
}

// Finds every link/image destination that is not an absolute URL
//
// Skipped:
// - absolute URLs (http, https, mailto:, tel:, ...): http(s) ones are
//   picked up by the text scan, the rest are not checkable
// - email autolinks (<someone@example.com>): the parser reports the bare
//   address, which would otherwise look like a relative path
// - fragments (#section) which point into the same document
// - empty destinations
pub fn relative_link_targets(markdown: &str) -> Vec<LinkTarget> {
    let mut targets = Vec::new();

    // into_offset_iter() pairs each event with the byte range it came from
    for (event, range) in Parser::new(markdown).into_offset_iter() {
        let dest_url = match event {
            Event::Start(Tag::Link(LinkType::Email, _, _)) => continue,
            Event::Start(Tag::Link(_link_type, dest_url, _title)) => dest_url,
            Event::Start(Tag::Image(_link_type, dest_url, _title)) => dest_url,
            _ => continue,
        };

        let dest = dest_url.trim();
        if dest.is_empty() || dest.starts_with('#') || Url::parse(dest).is_ok() {
            continue;
        }

        let source = &markdown[range.clone()];
        let offset = locate_destination(source, dest)
            .map(|pos| range.start + pos)
            .unwrap_or(range.start);

        targets.push(LinkTarget {
            offset,
            raw: dest.to_string(),
        });
    }

    targets
}

// Position of the destination inside the source of one link
//
// The last `](` is where an inline destination starts; nested images put
// their own `](` earlier in the range. Reference links keep the destination
// in the definition, in which case this returns None.
fn locate_destination(source: &str, dest: &str) -> Option<usize> {
    if let Some(open) = source.rfind("](") {
        if let Some(pos) = source[open..].find(dest) {
            return Some(open + pos);
        }
    }
    source.find(dest)
}

// Finds suspicious link syntax
//
// Returns (byte offset, issue, snippet) triples in document order.
// The caller turns offsets into line/column locations.
pub fn syntax_issues(markdown: &str) -> Vec<(usize, SyntaxIssue, String)> {
    let mut issues: Vec<(usize, SyntaxIssue, String)> = MISSING_SPACE
        .find_iter(markdown)
        // Point at the `)` that should be followed by a space
        .map(|m| (m.end() - 2, SyntaxIssue::MissingSpace, m.as_str().to_string()))
        .chain(
            DETACHED_DESTINATION
                .find_iter(markdown)
                .map(|m| (m.start(), SyntaxIssue::DetachedDestination, m.as_str().to_string())),
        )
        .collect();

    issues.sort_by_key(|(offset, _, _)| *offset);
    issues
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why not use a regex for relative links too?
//    - Markdown has many link forms: inline, reference, images, nested
//    - A CommonMark parser already knows all of them
//    - Regexes are fine for the simple "does this look wrong" checks
//
// 2. What is Range<usize>?
//    - start..end, a half-open range of byte offsets
//    - &text[range] slices the original text
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_inline_link() {
        let markdown = "See [docs](docs/guide.md) for details";
        let targets = relative_link_targets(markdown);
        assert_eq!(
            targets,
            vec![LinkTarget {
                offset: 11,
                raw: "docs/guide.md".to_string()
            }]
        );
    }

    #[test]
    fn test_skip_absolute_and_special_links() {
        let markdown = r#"
- [Rust](https://www.rust-lang.org)
- [email](mailto:test@example.com)
- [top](#top)
        "#;
        assert!(relative_link_targets(markdown).is_empty());
    }

    #[test]
    fn test_relative_image_inside_link() {
        let markdown = "[![logo](img/logo.png)](/about)";
        let targets = relative_link_targets(markdown);
        let raws: Vec<_> = targets.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(raws, vec!["/about", "img/logo.png"]);
        assert_eq!(targets[0].offset, markdown.find("/about").unwrap());
        assert_eq!(targets[1].offset, markdown.find("img/").unwrap());
    }

    #[test]
    fn test_missing_space_between_links() {
        let markdown = "[a](https://a.example)[b](https://b.example)";
        let issues = syntax_issues(markdown);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0, markdown.find(")[").unwrap());
        assert_eq!(issues[0].1, SyntaxIssue::MissingSpace);
    }

    #[test]
    fn test_email_autolink_is_not_relative() {
        let markdown = "Maintainer: <someone@example.com>, guide: [intro](intro.md)";
        let raws: Vec<_> = relative_link_targets(markdown)
            .into_iter()
            .map(|t| t.raw)
            .collect();
        assert_eq!(raws, vec!["intro.md"]);
    }

    #[test]
    fn test_missing_space_after_destination_with_parens() {
        let markdown = "[a](https://w.example/Rust_(lang))[b](https://b.example)";
        let issues = syntax_issues(markdown);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0, markdown.find(")[").unwrap());
        assert_eq!(issues[0].1, SyntaxIssue::MissingSpace);
    }

    #[test]
    fn test_separated_links_are_fine() {
        let markdown = "[a](https://a.example) [b](https://b.example)";
        assert!(syntax_issues(markdown).is_empty());
    }

    #[test]
    fn test_detached_destination() {
        let markdown = "Read [the guide] (https://guide.example)";
        let issues = syntax_issues(markdown);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].1, SyntaxIssue::DetachedDestination);
        assert_eq!(issues[0].0, markdown.find("] (").unwrap());
    }
}
