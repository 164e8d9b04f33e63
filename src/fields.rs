//! Placeholder, header-field, checkbox and blank-field detection
//!
//! All detectors work on normalized paragraph text produced by
//! [`crate::xml::text::extract_text`]; the raw XML is only consulted for
//! placeholder tokens (which survive verbatim inside `<w:t>` runs).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Checkbox, HeaderField, TaggedMeasure, TextField};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([A-Z0-9_]+)\}\}").unwrap());
static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(☐|☑|✓|□|\[\s?\]|\[[xX]\])[ \t]*([^☐☑✓□\[\n]*)").unwrap());
static TEXT_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^:\n_]{2,}?)\s*:\s*_{3,}").unwrap());
static PASS_FAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9A-Za-zÀ-ÖØ-öø-ÿ][0-9A-Za-zÀ-ÖØ-öø-ÿ()'’./ \-]*?)\s*:\s*(?i:PASS)\s*/?\s*(?i:FAIL)")
        .unwrap()
});
static BLANK_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s_\-]*$").unwrap());

/// A top-level paragraph after block scanning: index among all scanned
/// paragraphs, character offset of the paragraph in the body XML, and its
/// normalized text.
#[derive(Debug, Clone)]
pub struct ParaText {
    pub index: usize,
    pub offset: usize,
    pub text: String,
}

/// The fixed catalog of known document-header labels and their conventional
/// placeholder bindings.
pub const HEADER_CATALOG: &[(&str, &str, Option<&str>)] = &[
    ("launch_number", "N° de lancement", Some("{{LT}}")),
    ("cordon_number", "N° de cordon", Some("{{CORDON}}")),
    ("silog_reference", "Référence SILOG", Some("{{REF_SILOG}}")),
    ("serial_number", "N° de série", Some("{{SN}}")),
];

/// True when a captured field value is blank or only underscores/dashes.
pub fn is_blank_value(value: &str) -> bool {
    BLANK_VALUE_RE.is_match(value)
}

/// Find every `{{NAME}}` placeholder in the raw XML and the normalized text
/// (the latter catches tokens split across runs). Deduplicated and sorted.
pub fn find_placeholders(raw_xml: &str, document_text: &str) -> Vec<String> {
    let mut found: Vec<String> = PLACEHOLDER_RE
        .find_iter(raw_xml)
        .chain(PLACEHOLDER_RE.find_iter(document_text))
        .map(|m| m.as_str().to_string())
        .collect();
    found.sort();
    found.dedup();
    found
}

/// Placeholders prefixed `TAG_` are measures destined for the external
/// measurement workbook.
pub fn tagged_measures(placeholders: &[String]) -> Vec<TaggedMeasure> {
    placeholders
        .iter()
        .filter_map(|p| {
            let name = p.trim_start_matches("{{").trim_end_matches("}}");
            name.strip_prefix("TAG_").map(|_| TaggedMeasure {
                tag: name.to_string(),
                placeholder: p.clone(),
                detected: true,
            })
        })
        .collect()
}

fn header_label_pattern(label: &str) -> String {
    // Tolerate the degree-sign variants authors mix up, on an otherwise
    // literal label.
    let mut pattern = String::from("(?i)");
    for c in label.chars() {
        match c {
            '°' | 'º' => pattern.push_str("[°º]?"),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push_str(r"\s*:?\s*([^\n]*)");
    pattern
}

/// Detect the known header fields in the full document text.
pub fn detect_header_fields(document_text: &str) -> Vec<HeaderField> {
    let mut out = Vec::new();
    for &(key, label, placeholder) in HEADER_CATALOG {
        let re = match Regex::new(&header_label_pattern(label)) {
            Ok(re) => re,
            Err(_) => continue,
        };
        if let Some(cap) = re.captures(document_text) {
            let value = cap[1].trim().to_string();
            out.push(HeaderField {
                key: key.to_string(),
                label: label.to_string(),
                is_empty: is_blank_value(&value),
                value,
                placeholder: placeholder.map(str::to_string),
            });
        }
    }
    out
}

fn glyph_is_checked(glyph: &str) -> bool {
    matches!(glyph, "☑" | "✓") || glyph.eq_ignore_ascii_case("[x]")
}

/// Scan top-level paragraphs for checkbox glyphs.
///
/// `paragraph_index` is the index among *all* scanned paragraphs and
/// `position` the character offset of the glyph in the source, so the
/// `(paragraph_index, position)` ordering reproduces reading order exactly.
pub fn detect_checkboxes(paragraphs: &[ParaText]) -> Vec<Checkbox> {
    let mut out = Vec::new();
    for para in paragraphs {
        for cap in CHECKBOX_RE.captures_iter(&para.text) {
            let glyph = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let label = cap.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            if label.is_empty() {
                continue;
            }
            out.push(Checkbox {
                id: out.len(),
                label: label.to_string(),
                checked: glyph_is_checked(glyph),
                position: para.offset + cap.get(1).map(|m| m.start()).unwrap_or(0),
                paragraph_index: para.index,
            });
        }
    }
    out.sort_by_key(|c| (c.paragraph_index, c.position));
    for (i, c) in out.iter_mut().enumerate() {
        c.id = i;
    }
    out
}

/// Extract PASS/FAIL field labels from a text span. Each distinct label,
/// including numbered repeats of the same equipment label, is one entry.
pub fn pass_fail_labels(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cap in PASS_FAIL_RE.captures_iter(text) {
        let label = cap[1].trim().to_string();
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

/// True when a paragraph contains at least one PASS/FAIL shaped field.
pub fn has_pass_fail(text: &str) -> bool {
    PASS_FAIL_RE.is_match(text)
}

/// Per glyph occurrence in a text span, whether it carries a nonempty label.
/// Only labeled glyphs receive detection ids, so consumers addressing
/// checkboxes by rank must apply the same filter.
pub fn glyph_label_flags(text: &str) -> Vec<bool> {
    CHECKBOX_RE
        .captures_iter(text)
        .map(|cap| {
            cap.get(2)
                .map(|m| !m.as_str().trim().is_empty())
                .unwrap_or(false)
        })
        .collect()
}

/// True when a paragraph starts a checkbox entry.
pub fn has_checkbox(text: &str) -> bool {
    CHECKBOX_RE
        .captures(text)
        .and_then(|c| c.get(2))
        .map(|m| !m.as_str().trim().is_empty())
        .unwrap_or(false)
}

/// Detect `label : ____` blank fill-in fields in a text span.
pub fn detect_text_fields(text: &str, paragraph_index: usize) -> Vec<TextField> {
    TEXT_FIELD_RE
        .captures_iter(text)
        .map(|cap| TextField {
            label: cap[1].trim().to_string(),
            paragraph_index,
        })
        .filter(|f| !f.label.is_empty())
        .collect()
}
