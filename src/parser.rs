//! Document-level assembler
//!
//! Orchestrates the block walker, detectors and section engine into one
//! [`ParsedDocument`]. Parsing is a pure function of the body XML: every
//! intermediate structure is freshly allocated per call.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FsopError;
use crate::fields::{
    detect_checkboxes, detect_header_fields, detect_text_fields, find_placeholders, has_checkbox,
    has_pass_fail, tagged_measures, ParaText,
};
use crate::sections::segment_sections;
use crate::table::parse_table;
use crate::types::{Block, DocumentMetadata, ParsedDocument, Table, TextField};
use crate::xml::scan::{scan_blocks, RawBlock};
use crate::xml::text::extract_text;

static PAGE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:br[^>]*w:type="page""#).unwrap());
static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bFSOP[-_ ]?[A-Z0-9][A-Z0-9\-/]*\b").unwrap());

/// Above this, per-paragraph diagnostics are suppressed; parsing itself is
/// unbounded.
const PARAGRAPH_LOG_CAP: usize = 5_000;

/// Parse the main body XML of an FSOP document.
///
/// Fails only on structural absence (missing document/body markers); every
/// heuristic miss degrades to an empty collection instead.
pub fn parse_document(xml: &str) -> Result<ParsedDocument, FsopError> {
    if !xml.contains("<w:document") {
        return Err(FsopError::InvalidXml("missing <w:document> root".into()));
    }
    if !xml.contains("<w:body") {
        return Err(FsopError::InvalidXml("missing <w:body> element".into()));
    }

    let raw_blocks = scan_blocks(xml);

    let mut blocks: Vec<Block> = Vec::with_capacity(raw_blocks.len());
    let mut paragraphs: Vec<ParaText> = Vec::new();
    let mut tables: Vec<(usize, Table)> = Vec::new();

    for raw in &raw_blocks {
        match raw {
            RawBlock::Paragraph { offset, xml: pxml } => {
                let text = extract_text(pxml);
                let index = paragraphs.len();
                if PAGE_BREAK_RE.is_match(pxml) {
                    blocks.push(Block::PageBreak);
                    if text.is_empty() {
                        // A pure page-break paragraph carries no content.
                        continue;
                    }
                }
                blocks.push(Block::Paragraph {
                    id: index,
                    text: text.clone(),
                    has_checkbox: has_checkbox(&text),
                    has_pass_fail: has_pass_fail(&text),
                });
                paragraphs.push(ParaText {
                    index,
                    offset: *offset,
                    text,
                });
            }
            RawBlock::Table { offset, xml: txml } => {
                let table = Table {
                    id: tables.len(),
                    rows: parse_table(txml),
                };
                blocks.push(Block::Table(table.clone()));
                tables.push((*offset, table));
            }
        }
    }

    if paragraphs.len() > PARAGRAPH_LOG_CAP {
        warn!(
            "large document: {} paragraphs, suppressing per-paragraph diagnostics",
            paragraphs.len()
        );
    } else {
        debug!(
            "scanned {} paragraphs and {} tables",
            paragraphs.len(),
            tables.len()
        );
    }

    let document_text = paragraphs
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let placeholders = find_placeholders(xml, &document_text);
    let tagged = tagged_measures(&placeholders);
    let header_fields = detect_header_fields(&document_text);
    let checkboxes = detect_checkboxes(&paragraphs);

    let mut text_fields: Vec<TextField> = Vec::new();
    for p in &paragraphs {
        text_fields.extend(detect_text_fields(&p.text, p.index));
    }

    let sections = segment_sections(&paragraphs, &tables, &checkboxes);
    if sections.is_empty() {
        debug!("no sections detected; returning degenerate but valid result");
    }

    let document_title = paragraphs
        .iter()
        .map(|p| p.text.trim())
        .find(|t| !t.is_empty())
        .map(str::to_string);
    let reference = REFERENCE_RE
        .find(&document_text)
        .map(|m| m.as_str().to_string())
        .or_else(|| {
            header_fields
                .iter()
                .find(|f| f.key == "silog_reference" && !f.is_empty)
                .map(|f| f.value.clone())
        });

    let metadata = DocumentMetadata {
        paragraph_count: paragraphs.len(),
        table_count: tables.len(),
        checkbox_count: checkboxes.len(),
        section_count: sections.len(),
        parsed_at: Some(chrono::Utc::now()),
    };

    Ok(ParsedDocument {
        placeholders,
        header_fields,
        text_fields,
        checkboxes,
        sections,
        blocks,
        document_title,
        reference,
        tagged_measures: tagged,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SectionType;

    fn body(content: &str) -> String {
        format!("<w:document><w:body>{}</w:body></w:document>", content)
    }

    fn p(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    #[test]
    fn test_missing_body_is_fatal() {
        let err = parse_document("<w:document></w:document>").unwrap_err();
        assert!(matches!(err, FsopError::InvalidXml(_)));
    }

    #[test]
    fn test_blocks_preserve_document_order() {
        let xml = body(&format!(
            "{}<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cellule</w:t></w:r></w:p></w:tc></w:tr></w:tbl>{}",
            p("avant"),
            p("après")
        ));
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.blocks.len(), 3);
        assert!(matches!(doc.blocks[0], Block::Paragraph { .. }));
        assert!(matches!(doc.blocks[1], Block::Table(_)));
        assert!(matches!(doc.blocks[2], Block::Paragraph { .. }));
        // The table-interior paragraph never leaks out as a block.
        assert_eq!(doc.metadata.paragraph_count, 2);
    }

    #[test]
    fn test_placeholders_deduplicated_sorted() {
        let xml = body(&format!("{}{}{}", p("{{LT}}"), p("{{SN}}"), p("{{LT}}")));
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.placeholders, vec!["{{LT}}", "{{SN}}"]);
    }

    #[test]
    fn test_tagged_measures_detected() {
        let xml = body(&p("mesure {{TAG_LONGUEUR}} ici"));
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.tagged_measures.len(), 1);
        assert_eq!(doc.tagged_measures[0].tag, "TAG_LONGUEUR");
    }

    #[test]
    fn test_table_fallback_three_tables_three_sections() {
        let tbl = "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        let xml = body(&format!("{}{}{}{}", p("texte sans numérotation"), tbl, tbl, tbl));
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(
            doc.sections.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(doc
            .sections
            .iter()
            .all(|s| s.section_type == SectionType::Table));
    }

    #[test]
    fn test_page_break_block() {
        let xml = body(&format!(
            "{}<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>{}",
            p("page un"),
            p("page deux")
        ));
        let doc = parse_document(&xml).unwrap();
        assert!(doc.blocks.iter().any(|b| matches!(b, Block::PageBreak)));
        assert_eq!(doc.metadata.paragraph_count, 2);
    }

    #[test]
    fn test_reference_extracted() {
        let xml = body(&p("Document FSOP-1234-A indice B"));
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.reference.as_deref(), Some("FSOP-1234-A"));
    }

    #[test]
    fn test_zero_sections_is_valid_result() {
        let xml = body(&p("un simple paragraphe"));
        let doc = parse_document(&xml).unwrap();
        assert!(doc.sections.is_empty());
        assert_eq!(doc.metadata.paragraph_count, 1);
    }
}
