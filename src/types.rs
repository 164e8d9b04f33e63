//! Data model for parsed FSOP documents
//!
//! Every type here is a plain serializable record: no methods beyond
//! constructors/helpers, no interior mutability, safe to hand to a UI or
//! Excel-sync consumer as JSON verbatim.

use serde::{Deserialize, Serialize};

fn default_span() -> u32 {
    1
}

fn is_default_span(v: &u32) -> bool {
    *v == 1
}

/// A single table cell after merge resolution.
///
/// `colspan`/`rowspan` default to 1; a vertically-continued cell never
/// appears on its own, it only widens the `rowspan` of the cell that
/// restarted the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    #[serde(default = "default_span", skip_serializing_if = "is_default_span")]
    pub colspan: u32,
    #[serde(default = "default_span", skip_serializing_if = "is_default_span")]
    pub rowspan: u32,
    /// Shading fill color as `#RRGGBB`, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Cell {
            text: text.into(),
            colspan: 1,
            rowspan: 1,
            fill: None,
        }
    }
}

/// A resolved table: a 2-D grid of cells in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: usize,
    pub rows: Vec<Vec<Cell>>,
}

/// Top-level body content in document reading order.
///
/// Paragraphs nested inside tables are never emitted as standalone blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph {
        id: usize,
        text: String,
        has_checkbox: bool,
        has_pass_fail: bool,
    },
    Table(Table),
    PageBreak,
}

/// A known document-header field (launch number, cordon number, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderField {
    pub key: String,
    pub label: String,
    pub value: String,
    /// The placeholder token conventionally bound to this field, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// True when the captured value is blank or only underscores/dashes
    pub is_empty: bool,
}

/// A checkbox detected in a top-level paragraph.
///
/// The authoritative ordering is `(paragraph_index, position)` ascending;
/// consumers render checkboxes in this order and treat any deviation from
/// reading order as document corruption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkbox {
    pub id: usize,
    pub label: String,
    pub checked: bool,
    /// Character offset of the glyph in the source XML
    pub position: usize,
    /// 0-based index among all scanned top-level paragraphs
    pub paragraph_index: usize,
}

/// A blank "label : ____" fill-in field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    pub label: String,
    pub paragraph_index: usize,
}

/// Derived section content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Text,
    PassFail,
    Table,
    Checkboxes,
    TextFields,
    Mixed,
}

/// A numbered document section with its associated fields.
///
/// Id 0 is reserved for an optional unnumbered "General" preface section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: u32,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    /// PASS/FAIL field labels, in document order
    pub fields: Vec<String>,
    /// First associated table, when any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    pub tables: Vec<Table>,
    pub checkboxes: Vec<Checkbox>,
    pub text_fields: Vec<TextField>,
    /// Index of the heading paragraph among top-level paragraphs
    pub paragraph_index: usize,
}

/// A placeholder destined for the external measurement workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedMeasure {
    pub tag: String,
    pub placeholder: String,
    pub detected: bool,
}

/// Parse-level counters and provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub paragraph_count: usize,
    pub table_count: usize,
    pub checkbox_count: usize,
    pub section_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Root aggregate of a single parse call.
///
/// Freshly allocated per parse; read-only once returned; no shared state
/// across parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub placeholders: Vec<String>,
    pub header_fields: Vec<HeaderField>,
    pub text_fields: Vec<TextField>,
    pub checkboxes: Vec<Checkbox>,
    pub sections: Vec<Section>,
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub tagged_measures: Vec<TaggedMeasure>,
    pub metadata: DocumentMetadata,
}
