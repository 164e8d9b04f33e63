//! Injection engine
//!
//! Mutates the body XML in place from five independent instruction maps:
//! placeholder values, table cell values, PASS/FAIL selections, checkbox
//! states and blank-field values. A missing or empty map skips that phase.
//! Checkbox injection is positional: the Nth glyph occurrence in detection
//! scan order is the only one touched.

use std::collections::HashMap;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FsopError;
use crate::fields::glyph_label_flags;
use crate::xml::scan::{extract_outer_element, scan_blocks, RawBlock};
use crate::xml::text::{escape_xml, extract_text};

// The name boundary (whitespace or ">") keeps <w:tc>/<w:tbl> from matching.
static CELL_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:t(\s[^>]*)?>(.*?)</w:t>").unwrap());
static TEXT_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^:<>\n_]{2,}?)\s*:\s*_{3,}").unwrap());
static XML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z0-9:._\-]+)((?:[^>])*?)(/?)>").unwrap());

/// One table cell update, addressed the way extraction traverses: table
/// index, data-row index (0 is the first row after the header) and cell
/// index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCellValue {
    pub table: usize,
    pub row: usize,
    pub col: usize,
    pub value: String,
}

/// Positional checkbox update: `index` is the glyph's rank in detection scan
/// order (top-level paragraphs, document order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckboxState {
    pub index: usize,
    pub checked: bool,
}

/// Value for the Nth `label : ____` blank field in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFieldValue {
    pub index: usize,
    pub value: String,
}

/// The five independent injection maps. All default to empty; an empty map
/// means "skip that phase".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InjectionInstructions {
    #[serde(default)]
    pub placeholders: HashMap<String, String>,
    #[serde(default)]
    pub table_cells: Vec<TableCellValue>,
    /// PASS/FAIL outcome per field label
    #[serde(default)]
    pub pass_fail: HashMap<String, String>,
    #[serde(default)]
    pub checkboxes: Vec<CheckboxState>,
    #[serde(default)]
    pub text_fields: Vec<TextFieldValue>,
}

impl InjectionInstructions {
    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
            && self.table_cells.is_empty()
            && self.pass_fail.is_empty()
            && self.checkboxes.is_empty()
            && self.text_fields.is_empty()
    }
}

fn placeholder_token(key: &str) -> String {
    if key.starts_with("{{") {
        key.to_string()
    } else {
        format!("{{{{{}}}}}", key)
    }
}

fn inject_placeholders(xml: String, values: &HashMap<String, String>) -> String {
    let mut out = xml;
    for (key, value) in values {
        let token = placeholder_token(key);
        out = out.replace(&token, &escape_xml(value));
    }
    out
}

/// Absolute spans of the direct `tag` children of `xml[base..]`, skipping
/// nested same-name elements.
fn child_spans(xml: &str, tag: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let needle = format!("<{}", tag);
    let mut spans = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let rel = match xml[cursor..end].find(&needle) {
            Some(r) => r,
            None => break,
        };
        let at = cursor + rel;
        let after = at + needle.len();
        let boundary = matches!(
            xml.as_bytes().get(after),
            Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') | Some(b'>') | Some(b'/')
        );
        if !boundary {
            cursor = after;
            continue;
        }
        match extract_outer_element(xml, tag, at) {
            Some((_, elem_end)) => {
                spans.push((at, elem_end));
                cursor = elem_end;
            }
            None => cursor = after,
        }
    }
    spans
}

/// Replace the first text run's content inside the addressed cell, keeping
/// the run's attributes. Appends a fresh run only when the cell has no text
/// run at all.
fn inject_table_cell(xml: String, cell: &TableCellValue) -> String {
    let tables: Vec<(usize, usize)> = {
        let mut spans = Vec::new();
        for block in scan_blocks(&xml) {
            if let RawBlock::Table { offset, xml: txml } = block {
                spans.push((offset, offset + txml.len()));
            }
        }
        spans
    };
    let &(tbl_start, tbl_end) = match tables.get(cell.table) {
        Some(span) => span,
        None => {
            warn!("table {} not found; cell injection skipped", cell.table);
            return xml;
        }
    };

    let body_start = xml[tbl_start..tbl_end]
        .find('>')
        .map(|i| tbl_start + i + 1)
        .unwrap_or(tbl_start);
    let rows = child_spans(&xml, "w:tr", body_start, tbl_end);
    // Row key 0 addresses the first data row; physical row 0 is the header.
    let &(row_start, row_end) = match rows.get(cell.row + 1) {
        Some(span) => span,
        None => {
            warn!(
                "table {} row {} not found; cell injection skipped",
                cell.table, cell.row
            );
            return xml;
        }
    };

    let row_body = xml[row_start..row_end]
        .find('>')
        .map(|i| row_start + i + 1)
        .unwrap_or(row_start);
    let cells = child_spans(&xml, "w:tc", row_body, row_end);
    let &(cell_start, cell_end) = match cells.get(cell.col) {
        Some(span) => span,
        None => {
            warn!(
                "table {} row {} col {} not found; cell injection skipped",
                cell.table, cell.row, cell.col
            );
            return xml;
        }
    };

    let escaped = escape_xml(&cell.value);
    let cell_xml = &xml[cell_start..cell_end];
    if let Some(cap) = CELL_TEXT_RE.captures(cell_xml) {
        let attrs = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        let inner = cap.get(0).unwrap();
        let replacement = format!("<w:t{}>{}</w:t>", attrs, escaped);
        let abs_start = cell_start + inner.start();
        let abs_end = cell_start + inner.end();
        format!("{}{}{}", &xml[..abs_start], replacement, &xml[abs_end..])
    } else if let Some(close) = cell_xml.rfind("</w:tc>") {
        let insert_at = cell_start + close;
        let run = format!("<w:r><w:t>{}</w:t></w:r>", escaped);
        format!("{}{}{}", &xml[..insert_at], run, &xml[insert_at..])
    } else {
        xml
    }
}

/// Label-scoped PASS/FAIL replacement. Both outcome words are matched
/// case-insensitively so the result is the same regardless of prior state.
fn inject_pass_fail(xml: String, selections: &HashMap<String, String>) -> String {
    let mut out = xml;
    for (label, outcome) in selections {
        let outcome = outcome.trim().to_uppercase();
        if outcome != "PASS" && outcome != "FAIL" {
            warn!("ignoring PASS/FAIL selection {:?} for {:?}", outcome, label);
            continue;
        }
        let pattern = format!(
            r"(?i)({}\s*:?\s*)((?:PASS|FAIL)(?:\s*/?\s*(?:PASS|FAIL))?)",
            regex::escape(label)
        );
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };
        if !re.is_match(&out) {
            warn!("PASS/FAIL label {:?} not found in document", label);
            continue;
        }
        out = re
            .replace_all(&out, |caps: &regex::Captures| {
                format!("{}{}", &caps[1], outcome)
            })
            .into_owned();
    }
    out
}

const UNCHECKED_GLYPHS: &[&str] = &["☐", "□", "[ ]", "[]"];
const CHECKED_GLYPHS: &[&str] = &["☑", "✓", "[x]", "[X]"];

/// Absolute offsets of every labeled checkbox glyph inside top-level
/// paragraphs, in the exact order detection assigns ids. Bare glyphs with no
/// label never receive an id, so they are not addressable here either.
fn checkbox_glyph_spans(xml: &str) -> Vec<(usize, usize, bool)> {
    let mut spans = Vec::new();
    for block in scan_blocks(xml) {
        if let RawBlock::Paragraph { offset, xml: pxml } = block {
            let mut local: Vec<(usize, usize, bool)> = Vec::new();
            for glyph in UNCHECKED_GLYPHS {
                let mut from = 0;
                while let Some(rel) = pxml[from..].find(*glyph) {
                    let at = from + rel;
                    local.push((offset + at, glyph.len(), false));
                    from = at + glyph.len();
                }
            }
            for glyph in CHECKED_GLYPHS {
                let mut from = 0;
                while let Some(rel) = pxml[from..].find(*glyph) {
                    let at = from + rel;
                    local.push((offset + at, glyph.len(), true));
                    from = at + glyph.len();
                }
            }
            local.sort_by_key(|&(at, _, _)| at);
            // Detection only assigns ids to labeled glyphs; mirror that
            // filter rank by rank so indexes line up.
            let labeled = glyph_label_flags(&extract_text(pxml));
            for (rank, span) in local.into_iter().enumerate() {
                if labeled.get(rank).copied().unwrap_or(false) {
                    spans.push(span);
                }
            }
        }
    }
    spans
}

/// Positional glyph swap: only the addressed occurrence is rewritten.
fn inject_checkboxes(xml: String, states: &[CheckboxState]) -> String {
    let spans = checkbox_glyph_spans(&xml);
    // Last instruction wins per index.
    let mut wanted: HashMap<usize, bool> = HashMap::new();
    for st in states {
        wanted.insert(st.index, st.checked);
    }

    let mut edits: Vec<(usize, usize, &str)> = Vec::new();
    for (&index, &checked) in &wanted {
        let &(at, len, currently_checked) = match spans.get(index) {
            Some(s) => s,
            None => {
                warn!("checkbox index {} not found; skipped", index);
                continue;
            }
        };
        if currently_checked == checked {
            continue;
        }
        let glyph = &xml[at..at + len];
        let new = match (glyph, checked) {
            ("[ ]" | "[]", true) => "[x]",
            ("[x]" | "[X]", false) => "[ ]",
            (_, true) => "☑",
            (_, false) => "☐",
        };
        edits.push((at, len, new));
    }

    edits.sort_by_key(|&(at, _, _)| std::cmp::Reverse(at));
    let mut out = xml;
    for (at, len, new) in edits {
        out.replace_range(at..at + len, new);
    }
    out
}

/// Replace the Nth `label : ____` occurrence with `label: value`.
fn inject_text_fields(xml: String, values: &[TextFieldValue]) -> String {
    let mut wanted: HashMap<usize, &str> = HashMap::new();
    for v in values {
        wanted.insert(v.index, v.value.as_str());
    }

    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    for (i, cap) in TEXT_FIELD_RE.captures_iter(&xml).enumerate() {
        if let Some(&value) = wanted.get(&i) {
            let whole = cap.get(0).unwrap();
            let label = cap[1].trim().to_string();
            edits.push((
                whole.start(),
                whole.end(),
                format!("{}: {}", label, escape_xml(value)),
            ));
            wanted.remove(&i);
        }
    }
    for index in wanted.keys() {
        warn!("text field occurrence {} not found; skipped", index);
    }

    edits.sort_by_key(|&(at, _, _)| std::cmp::Reverse(at));
    let mut out = xml;
    for (at, end, new) in edits {
        out.replace_range(at..end, &new);
    }
    out
}

/// Post-mutation validation. Only a missing root/body marker is fatal: some
/// authoring tools emit technically unbalanced but renderable XML, so tag
/// mismatches are logged and tolerated.
fn validate(xml: &str) -> Result<(), FsopError> {
    if xml.trim().is_empty() {
        return Err(FsopError::InjectionFailed("empty result".into()));
    }
    let opens = xml.bytes().filter(|&b| b == b'<').count();
    let closes = xml.bytes().filter(|&b| b == b'>').count();
    if opens == 0 || closes == 0 {
        return Err(FsopError::InjectionFailed("no markup in result".into()));
    }

    let mut stack: Vec<&str> = Vec::new();
    for cap in XML_TAG_RE.captures_iter(xml) {
        let closing = !cap[1].is_empty();
        let self_closing = !cap[4].is_empty();
        let name = cap.get(2).unwrap().as_str();
        if name.starts_with('?') || name.starts_with('!') {
            continue;
        }
        if closing {
            match stack.pop() {
                Some(open) if open == name => {}
                Some(open) => warn!("tag mismatch: <{}> closed by </{}>", open, name),
                None => warn!("stray closing tag </{}>", name),
            }
        } else if !self_closing {
            stack.push(name);
        }
    }
    if !stack.is_empty() {
        warn!("{} unclosed tags after injection", stack.len());
    }

    if !xml.contains("<w:document") || !xml.contains("<w:body") {
        return Err(FsopError::InjectionFailed(
            "essential document markers missing".into(),
        ));
    }
    Ok(())
}

/// Apply all instruction phases to the body XML and validate the result.
pub fn inject_document_xml(
    xml: &str,
    instructions: &InjectionInstructions,
) -> Result<String, FsopError> {
    let mut out = xml.to_string();
    out = inject_placeholders(out, &instructions.placeholders);
    for cell in &instructions.table_cells {
        out = inject_table_cell(out, cell);
    }
    out = inject_pass_fail(out, &instructions.pass_fail);
    out = inject_checkboxes(out, &instructions.checkboxes);
    out = inject_text_fields(out, &instructions.text_fields);
    validate(&out)?;
    Ok(out)
}

/// Read back the current outcome word following a PASS/FAIL label.
pub fn pass_fail_outcome(xml: &str, label: &str) -> Option<String> {
    let pattern = format!(
        r"(?i){}\s*:?\s*((?:PASS|FAIL)(?:\s*/?\s*(?:PASS|FAIL))?)",
        regex::escape(label)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(xml).map(|c| c[1].trim().to_uppercase())
}
