//! Balanced-tag scanning over raw WordProcessingML
//!
//! Naive regex over `<w:p>...</w:p>` or `<w:tbl>...</w:tbl>` breaks as soon
//! as a table nests another table or a cell carries its own paragraphs. The
//! scanner below keeps a depth counter over same-name open/close tags, which
//! is the source of truth for every block boundary in the crate.

use log::debug;

/// Find the next occurrence of `<tag` at or after `from` that is a real tag
/// open (followed by whitespace, `>`, or `/`), not a longer tag name sharing
/// the prefix (e.g. `<w:p` vs `<w:pPr`).
fn find_tag_open(xml: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = format!("<{}", tag);
    let mut cursor = from;
    while let Some(rel) = xml[cursor..].find(&needle) {
        let at = cursor + rel;
        let after = at + needle.len();
        match xml.as_bytes().get(after) {
            Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') | Some(b'>') | Some(b'/') => {
                return Some(at)
            }
            _ => cursor = after,
        }
    }
    None
}

/// True when the tag opening at `at` is self-closing (`<w:p/>`).
fn is_self_closing(xml: &str, at: usize) -> Option<usize> {
    let close = xml[at..].find('>').map(|i| at + i)?;
    if xml.as_bytes().get(close.wrapping_sub(1)) == Some(&b'/') {
        Some(close + 1)
    } else {
        None
    }
}

/// Extract the complete element named `tag` starting exactly at `start`.
///
/// Returns the full slice (opening tag through matching closing tag) and the
/// index one past the element. Returns `None` when no matching closing tag
/// exists; callers treat that as a skip-and-advance condition, never a crash.
pub fn extract_outer_element<'a>(xml: &'a str, tag: &str, start: usize) -> Option<(&'a str, usize)> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    if !xml[start..].starts_with(&open) {
        return None;
    }
    // A self-closing element is complete on its own.
    if let Some(end) = is_self_closing(xml, start) {
        if xml[start + open.len()..end]
            .bytes()
            .all(|b| b != b'<')
        {
            return Some((&xml[start..end], end));
        }
    }

    let mut depth = 0usize;
    let mut cursor = start;
    loop {
        let next_open = find_tag_open(xml, tag, cursor);
        let next_close = xml[cursor..].find(&close).map(|i| cursor + i);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                if let Some(past) = is_self_closing(xml, o) {
                    // A nested self-closing sibling never changes the depth.
                    cursor = past;
                } else {
                    depth += 1;
                    cursor = o + open.len();
                }
            }
            (_, Some(c)) => {
                depth = depth.saturating_sub(1);
                cursor = c + close.len();
                if depth == 0 {
                    return Some((&xml[start..cursor], cursor));
                }
            }
            (_, None) => {
                debug!("unclosed <{}> element at offset {}", tag, start);
                return None;
            }
        }
    }
}

/// A top-level body element located by the block walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBlock<'a> {
    Paragraph { offset: usize, xml: &'a str },
    Table { offset: usize, xml: &'a str },
}

impl<'a> RawBlock<'a> {
    pub fn offset(&self) -> usize {
        match self {
            RawBlock::Paragraph { offset, .. } | RawBlock::Table { offset, .. } => *offset,
        }
    }
}

/// Walk the body XML and return top-level `<w:p>`/`<w:tbl>` elements in
/// document order. Paragraphs inside tables are consumed by their table span
/// and never surface as standalone blocks. Malformed elements (no closing
/// tag) are skipped past their opening tag.
pub fn scan_blocks(xml: &str) -> Vec<RawBlock<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0usize;
    loop {
        let next_p = find_tag_open(xml, "w:p", cursor);
        let next_tbl = find_tag_open(xml, "w:tbl", cursor);
        let (at, tag) = match (next_p, next_tbl) {
            (Some(p), Some(t)) if t < p => (t, "w:tbl"),
            (Some(p), _) => (p, "w:p"),
            (None, Some(t)) => (t, "w:tbl"),
            (None, None) => break,
        };
        match extract_outer_element(xml, tag, at) {
            Some((slice, end)) => {
                if tag == "w:tbl" {
                    blocks.push(RawBlock::Table { offset: at, xml: slice });
                } else {
                    blocks.push(RawBlock::Paragraph { offset: at, xml: slice });
                }
                cursor = end;
            }
            None => {
                // Skip the malformed opening tag and keep scanning.
                cursor = at + tag.len() + 1;
            }
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_tables_return_outer_span() {
        let xml = "<w:tbl><w:tbl></w:tbl></w:tbl>";
        let (slice, end) = extract_outer_element(xml, "w:tbl", 0).unwrap();
        assert_eq!(slice, xml);
        assert_eq!(end, xml.len());
    }

    #[test]
    fn test_prefix_sharing_tags_not_confused() {
        let xml = "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:t>x</w:t></w:r></w:p>";
        let (slice, _) = extract_outer_element(xml, "w:p", 0).unwrap();
        assert_eq!(slice, xml);
    }

    #[test]
    fn test_self_closing_paragraph() {
        let xml = "<w:p/><w:p><w:r><w:t>a</w:t></w:r></w:p>";
        let (slice, end) = extract_outer_element(xml, "w:p", 0).unwrap();
        assert_eq!(slice, "<w:p/>");
        let (second, _) = extract_outer_element(xml, "w:p", end).unwrap();
        assert!(second.contains("<w:t>a</w:t>"));
    }

    #[test]
    fn test_unclosed_element_returns_none() {
        let xml = "<w:tbl><w:tr></w:tr>";
        assert_eq!(extract_outer_element(xml, "w:tbl", 0), None);
    }

    #[test]
    fn test_table_interior_paragraphs_not_top_level() {
        let xml = "<w:p><w:r><w:t>avant</w:t></w:r></w:p>\
                   <w:tbl><w:tr><w:tc><w:p><w:r><w:t>dedans</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
                   <w:p><w:r><w:t>apres</w:t></w:r></w:p>";
        let blocks = scan_blocks(xml);
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[0], RawBlock::Paragraph { .. }));
        assert!(matches!(blocks[1], RawBlock::Table { .. }));
        assert!(matches!(blocks[2], RawBlock::Paragraph { .. }));
    }

    #[test]
    fn test_malformed_block_skipped() {
        // Unclosed table followed by a good paragraph: the paragraph and the
        // table's interior paragraph both surface, the document keeps parsing.
        let xml = "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>perdu</w:t></w:r></w:p></w:tc></w:tr>\
                   <w:p><w:r><w:t>ok</w:t></w:r></w:p>";
        let blocks = scan_blocks(xml);
        assert!(blocks
            .iter()
            .any(|b| matches!(b, RawBlock::Paragraph { xml, .. } if xml.contains("ok"))));
    }
}
