// src/checker/extract.rs
// =============================================================================
// This module finds every URL mentioned in a document.
//
// Key functionality:
// - Scans the text for absolute http:// and https:// URLs
// - Asks the Markdown helper for relative link destinations and resolves
//   them against the base URL (if one is configured)
// - Records where each URL appeared (line, column, byte offset)
// - Optionally collects Markdown syntax warnings
//
// Extraction is pure: the same text and base URL always give the same
// occurrences with the same locations.
//
// Rust concepts:
// - Binary search: To turn byte offsets into line numbers quickly
// - Slices (&str): Borrow parts of the document without copying
// =============================================================================

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, trace};
use url::Url;

use super::markdown::{self, MarkdownDiagnostic};
use crate::error::CheckError;

// http:// or https:// (any case) followed by characters that can appear in a URL.
// Brackets and quotes end a URL so Markdown and HTML wrappers are not captured.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i:https?)://[^\s<>"'`\[\]{}|\\^]+"#).expect("static regex is valid")
});

/// Where in the document something was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    /// 1-based line number
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
    /// 0-based byte offset into the document
    pub offset: usize,
}

/// One mention of a URL in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Normalized URL, used for grouping and probing
    pub url: String,
    /// The text as it appeared in the document
    pub raw_text: String,
    pub location: Location,
}

/// Everything the extractor found in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// Occurrences in document order
    pub occurrences: Vec<Occurrence>,
    /// Markdown warnings (empty unless markdown validation is on)
    pub diagnostics: Vec<MarkdownDiagnostic>,
}

// Turns raw bytes into text, dropping invalid UTF-8 sequences
//
// Files in the wild are not always clean UTF-8. Rather than refusing them
// we keep every valid chunk and silently drop the garbage between them.
pub fn decode_document(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

// Extracts all URL occurrences from a document
//
// Parameters:
//   text: the document (already decoded)
//   base: resolves relative links; None leaves them unresolved
//   markdown: also collect Markdown syntax diagnostics
//
// Returns: the occurrences sorted by position, or an error when the text
// is not a text document at all (contains NUL bytes)
pub fn extract_links(
    text: &str,
    base: Option<&Url>,
    markdown: bool,
) -> Result<Extraction, CheckError> {
    if let Some(pos) = text.find('\0') {
        let location = LineIndex::new(text).locate(pos);
        return Err(CheckError::extraction(format!(
            "NUL byte at line {}, column {}: document is not text",
            location.line, location.column
        )));
    }

    let index = LineIndex::new(text);
    let mut occurrences = Vec::new();

    // Absolute URLs anywhere in the text
    for found in URL_PATTERN.find_iter(text) {
        let raw = clean_url_trailing(found.as_str());
        let url = normalize_absolute(raw);
        trace!(%url, offset = found.start(), "found absolute URL");
        occurrences.push(Occurrence {
            url,
            raw_text: raw.to_string(),
            location: index.locate(found.start()),
        });
    }

    // Relative destinations from Markdown links and images
    for target in markdown::relative_link_targets(text) {
        let url = match base {
            Some(base) => match base.join(&target.raw) {
                Ok(resolved) => resolved.to_string(),
                Err(e) => {
                    debug!(raw = %target.raw, error = %e, "relative URL does not resolve");
                    target.raw.clone()
                }
            },
            None => target.raw.clone(),
        };
        trace!(%url, raw = %target.raw, "found relative URL");
        occurrences.push(Occurrence {
            url,
            raw_text: target.raw,
            location: index.locate(target.offset),
        });
    }

    // Both scans are already ordered; merge them into document order
    occurrences.sort_by_key(|o| o.location.offset);

    let diagnostics = if markdown {
        markdown::syntax_issues(text)
            .into_iter()
            .map(|(offset, issue, snippet)| MarkdownDiagnostic {
                issue,
                location: index.locate(offset),
                snippet,
            })
            .collect()
    } else {
        Vec::new()
    };

    debug!(
        occurrences = occurrences.len(),
        diagnostics = diagnostics.len(),
        "extraction finished"
    );

    Ok(Extraction {
        occurrences,
        diagnostics,
    })
}

// Normalizes an absolute URL with the url crate
//
// Example: "HTTP://Example.com" -> "http://example.com/"
// A token that looks like a URL but doesn't parse is kept as-is; the
// prober will report it as unresolvable.
fn normalize_absolute(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}

// Strips punctuation that ends a sentence rather than the URL
//
// "see http://a.example/x." -> "http://a.example/x"
// "(http://a.example/x)"   -> "http://a.example/x"
// "http://w.example/A_(b)" -> unchanged, the parens are balanced
fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '*' => {
                result = &result[..result.len() - 1];
            }
            ')' => {
                let open = result.matches('(').count();
                let close = result.matches(')').count();
                if close > open {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

// Maps byte offsets to line/column
//
// Stores the byte offset where every line starts, so finding the line of
// an offset is a binary search instead of a rescan of the document.
struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    fn locate(&self, offset: usize) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.text[line_start..offset].chars().count() + 1;

        Location {
            line: line + 1,
            column,
            offset,
        }
    }
}
