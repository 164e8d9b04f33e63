//! Table matrix builder
//!
//! Converts a `<w:tbl>` fragment into a 2-D cell grid, resolving horizontal
//! merges (`gridSpan`) and vertical merges (`vMerge restart/continue`) into
//! `colspan`/`rowspan`, and picking up shading fills.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Cell;
use crate::xml::scan::extract_outer_element;
use crate::xml::text::extract_text;

static GRID_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:gridSpan[^>]*w:val="(\d+)""#).unwrap());
static VMERGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:vMerge(?:\s+[^>]*?w:val="([^"]*)")?\s*/?>"#).unwrap());
static SHD_FILL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:shd[^>]*w:fill="([0-9A-Fa-f]{6})""#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VMerge {
    None,
    Restart,
    Continue,
}

/// Cell properties live in the `<w:tcPr>` that opens the cell, before any
/// nested content.
fn cell_properties(cell_xml: &str) -> (u32, VMerge, Option<String>) {
    let props = match cell_xml.find("<w:tcPr") {
        Some(at) => extract_outer_element(cell_xml, "w:tcPr", at)
            .map(|(xml, _)| xml)
            .unwrap_or(""),
        None => "",
    };

    let colspan = GRID_SPAN_RE
        .captures(props)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(1);

    // A bare <w:vMerge/> means "continue" per the OOXML spec.
    let vmerge = match VMERGE_RE.captures(props) {
        Some(c) => match c.get(1).map(|m| m.as_str()) {
            Some("restart") => VMerge::Restart,
            _ => VMerge::Continue,
        },
        None => VMerge::None,
    };

    let fill = SHD_FILL_RE
        .captures(props)
        .map(|c| format!("#{}", c[1].to_uppercase()));

    (colspan, vmerge, fill)
}

/// Iterate the immediate child elements named `tag` of `xml`, yielding their
/// slices in order. Balanced extraction skips nested same-name elements
/// (rows of a nested table stay inside their cell span).
fn child_elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let needle = format!("<{}", tag);
    let mut cursor = 0usize;
    while let Some(rel) = xml[cursor..].find(&needle) {
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
            Some((slice, end)) => {
                out.push(slice);
                cursor = end;
            }
            None => cursor = after,
        }
    }
    out
}

/// Build the resolved cell grid for a `<w:tbl>` fragment.
pub fn parse_table(tbl_xml: &str) -> Vec<Vec<Cell>> {
    let mut grid: Vec<Vec<Cell>> = Vec::new();
    // Logical column -> (grid row, cell index) of the cell that restarted the
    // merge currently spanning that column.
    let mut merges: HashMap<usize, (usize, usize)> = HashMap::new();

    // Skip the table's own opening tag so nested tables' rows are the only
    // thing balanced extraction has to fend off.
    let body_start = tbl_xml.find('>').map(|i| i + 1).unwrap_or(0);
    let body = &tbl_xml[body_start..];

    for row_xml in child_elements(body, "w:tr") {
        let mut out_row: Vec<Cell> = Vec::new();
        let mut col = 0usize;

        let row_body_start = row_xml.find('>').map(|i| i + 1).unwrap_or(0);
        for cell_xml in child_elements(&row_xml[row_body_start..], "w:tc") {
            let (colspan, vmerge, fill) = cell_properties(cell_xml);

            if vmerge == VMerge::Continue {
                if let Some(&(orow, oidx)) = merges.get(&col) {
                    grid[orow][oidx].rowspan += 1;
                }
                col += colspan as usize;
                continue;
            }

            // A non-continuing cell at a tracked column ends that merge.
            merges.remove(&col);

            let cell = Cell {
                text: extract_text(cell_xml),
                colspan,
                rowspan: 1,
                fill,
            };
            if vmerge == VMerge::Restart {
                merges.insert(col, (grid.len(), out_row.len()));
            }
            out_row.push(cell);
            col += colspan as usize;
        }

        grid.push(out_row);
    }

    grid
}
