//! FSOP parsing and injection core
//!
//! This crate reverse-engineers semi-structured Word (DOCX) quality-control
//! forms into a semantic model (placeholders, header fields, checkboxes,
//! PASS/FAIL fields, tables with merged cells, numbered sections) and
//! injects filled values back. It scans the raw WordProcessingML XML
//! directly, without a DOM, for resilience to the malformed documents real
//! authoring tools produce.
//!
//! # Example
//!
//! ```rust,no_run
//! use fsop_core::{parse_fsop, ParsedDocument};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file_data = std::fs::read("form.docx")?;
//!     let document = parse_fsop(&file_data)?;
//!     println!("{} sections", document.sections.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fields;
pub mod inject;
pub mod opc;
pub mod parser;
pub mod sections;
pub mod table;
pub mod types;
pub mod xml;

pub use error::FsopError;
pub use inject::{
    inject_document_xml, CheckboxState, InjectionInstructions, TableCellValue, TextFieldValue,
};
pub use parser::parse_document;
pub use types::{
    Block, Cell, Checkbox, DocumentMetadata, HeaderField, ParsedDocument, Section, SectionType,
    Table, TaggedMeasure, TextField,
};

/// Parse an FSOP form from raw .docx bytes.
pub fn parse_fsop(file_data: &[u8]) -> Result<ParsedDocument, FsopError> {
    let xml = opc::read_document_xml(file_data)?;
    parser::parse_document(&xml)
}

/// Parse an FSOP form from an already-extracted body XML string.
pub fn parse_document_xml(xml: &str) -> Result<ParsedDocument, FsopError> {
    parser::parse_document(xml)
}

/// Inject instruction values into a .docx and return the rebuilt archive.
pub fn inject_fsop(
    file_data: &[u8],
    instructions: &InjectionInstructions,
) -> Result<Vec<u8>, FsopError> {
    let xml = opc::read_document_xml(file_data)?;
    let mutated = inject::inject_document_xml(&xml, instructions)?;
    opc::write_document_xml(file_data, &mutated)
}

/// Serialize a parse result to JSON.
pub fn document_to_json(document: &ParsedDocument) -> Result<String, FsopError> {
    serde_json::to_string(document).map_err(|e| FsopError::Serialization(e.to_string()))
}

/// Deserialize a parse result from JSON.
pub fn document_from_json(json: &str) -> Result<ParsedDocument, FsopError> {
    serde_json::from_str(json).map_err(|e| FsopError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(content: &str) -> String {
        format!("<w:document><w:body>{}</w:body></w:document>", content)
    }

    #[test]
    fn test_parse_empty_bytes_fails() {
        assert!(parse_fsop(&[]).is_err());
    }

    #[test]
    fn test_parse_and_serialize_round_trip() {
        let xml = body(
            "<w:p><w:r><w:t>1- Montage du cordon {{LT}}</w:t></w:r></w:p>\
             <w:p><w:r><w:t>☐ Sertissage effectué</w:t></w:r></w:p>",
        );
        let doc = parse_document_xml(&xml).unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.checkboxes.len(), 1);
        assert_eq!(doc.placeholders, vec!["{{LT}}"]);

        let json = document_to_json(&doc).unwrap();
        let back = document_from_json(&json).unwrap();
        assert_eq!(back.sections.len(), 1);
        assert_eq!(back.placeholders, doc.placeholders);
    }

    #[test]
    fn test_parse_then_inject_document_xml() {
        let xml = body("<w:p><w:r><w:t>lot {{LT}} Continuité : PASS FAIL</w:t></w:r></w:p>");
        let mut instr = InjectionInstructions::default();
        instr.placeholders.insert("LT".into(), "LT-889".into());
        instr.pass_fail.insert("Continuité".into(), "PASS".into());
        let out = inject_document_xml(&xml, &instr).unwrap();
        let doc = parse_document_xml(&out).unwrap();
        assert!(doc.placeholders.is_empty());
        assert!(doc
            .blocks
            .iter()
            .any(|b| matches!(b, Block::Paragraph { text, .. } if text.contains("LT-889"))));
        assert_eq!(
            inject::pass_fail_outcome(&out, "Continuité").as_deref(),
            Some("PASS")
        );
    }
}
