//! Readable-text extraction from WordProcessingML fragments
//!
//! Word splits visually contiguous text into many `<w:t>` runs, sometimes
//! mid-word, sometimes with significant whitespace flagged via
//! `xml:space="preserve"`. Extraction walks the runs in order, re-joins them
//! with word-boundary spacing, then normalizes tabs/breaks and collapses
//! space runs.

use once_cell::sync::Lazy;
use regex::Regex;

// The name boundary (whitespace or ">") keeps prefix-sharing tags like
// <w:tc>, <w:tbl> and <w:tabs> from being taken for text runs.
static TEXT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:t(\s[^>]*)?>(.*?)</w:t>").unwrap());
// Run-level tab marker only: property-level <w:tab w:val=.../> carries attributes.
static TAB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<w:tab\s*/>").unwrap());
static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<w:(?:br|cr)\b[^>]*/>").unwrap());
// Tag-shaped substrings with a namespace prefix, as they appear once an
// accidentally escaped element (e.g. a checkbox field tag) is entity-decoded.
// A bare comparison operator like "< 5" never matches: the first character
// after "<" must start a prefixed name.
static ESCAPED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*:[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").unwrap());

/// Decode the XML entities that appear inside `<w:t>` content.
pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Escape a replacement value before splicing it into document XML.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn starts_with_closing_punct(s: &str) -> bool {
    matches!(s.chars().next(), Some(',' | '.' | ';' | ':' | '!' | '?' | ')'))
}

fn needs_space(prev: &str, next: &str) -> bool {
    if prev.is_empty() {
        return false;
    }
    if prev.ends_with(char::is_whitespace) || prev.ends_with('(') {
        return false;
    }
    !starts_with_closing_punct(next)
}

/// Join the text runs of a fragment, honoring preserve-space runs verbatim
/// and inserting single word-boundary spaces between trimmed runs.
///
/// This is the concatenation stage only; tab/break markers must already be
/// inlined and the final space collapse happens in [`extract_text`].
fn concatenate_runs(fragment: &str) -> String {
    let mut out = String::new();
    for cap in TEXT_RUN_RE.captures_iter(fragment) {
        let attrs = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        let content = decode_entities(&cap[2]);
        let content = ESCAPED_TAG_RE.replace_all(&content, "");
        if attrs.contains("xml:space=\"preserve\"") || attrs.contains("xml:space='preserve'") {
            out.push_str(&content);
        } else {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                continue;
            }
            if needs_space(&out, trimmed) {
                out.push(' ');
            }
            out.push_str(trimmed);
        }
    }
    out
}

fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_blank = false;
    for c in s.chars() {
        if c == ' ' || c == '\t' {
            in_blank = true;
        } else {
            if in_blank {
                out.push(' ');
                in_blank = false;
            }
            out.push(c);
        }
    }
    if in_blank {
        out.push(' ');
    }
    out.trim().to_string()
}

/// Extract normalized human-readable text from any XML fragment (a paragraph,
/// a table cell, or a whole body).
pub fn extract_text(fragment: &str) -> String {
    // Inline tab and break markers as preserve-space runs so they keep their
    // position relative to the surrounding text runs.
    let prepared = TAB_RE.replace_all(fragment, "<w:t xml:space=\"preserve\">\t</w:t>");
    let prepared = BR_RE.replace_all(&prepared, "<w:t xml:space=\"preserve\">\n</w:t>");
    collapse_spaces(&concatenate_runs(&prepared))
}
