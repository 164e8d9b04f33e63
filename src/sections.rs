//! Section segmentation engine
//!
//! Partitions the top-level paragraph stream into numbered sections and
//! attaches each section's PASS/FAIL fields, tables, checkboxes and blank
//! fill-in fields. Real forms are authored inconsistently, so matching runs
//! as a ladder: strict numbered headings, looser numbered shapes, a
//! vocabulary fallback, and finally one synthesized section per table.
//! The ladder order is part of the contract; later stages assume earlier
//! ones already failed.

use std::collections::BTreeMap;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::fields::{detect_text_fields, pass_fail_labels, ParaText};
use crate::types::{Checkbox, Section, SectionType, Table, TextField};

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})\s*[-–.\s]+\s*(.*\S)\s*$").unwrap());
static NUM_STRICT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})\s*[-–]\s*(.*\S)\s*$").unwrap());
static NUM_LOOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})[\s\-–.:]+(.*\S)\s*$").unwrap());
static NUM_TIGHT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})([A-Za-zÀ-ÖØ-öø-ÿ].*\S)\s*$").unwrap());
static HAS_LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-zÀ-ÖØ-öø-ÿ]").unwrap());
static THREE_LETTERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-zÀ-ÖØ-öø-ÿ]{3}").unwrap());
// A bare measurement like "12,5 mm <" is not a section title.
static MEASUREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d.,]+\s*[A-Za-zΩµ°]{0,5}\s*[<>≤≥=]").unwrap());
// Manufacturing-order / revision reference shape used by title continuations.
static REFERENCE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:OF|LT|N[°º]?|REV|IND)[\s:.]*[A-Z0-9][A-Z0-9\-/.]*\s*$").unwrap()
});
static LOWER_UPPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").unwrap());
static AVEC_BEFORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-zÀ-ÖØ-öø-ÿ])avec\b").unwrap());
static AVEC_AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bavec([A-Za-zÀ-ÖØ-öø-ÿ])").unwrap());

/// Words that conventionally open a section title on these forms.
const SECTION_VOCAB: &[&str] = &[
    "VERIFICATION",
    "VÉRIFICATION",
    "CONTROLE",
    "CONTRÔLE",
    "MONTAGE",
    "ASSEMBLAGE",
    "CABLAGE",
    "CÂBLAGE",
    "SERTISSAGE",
    "SOUDURE",
    "MARQUAGE",
    "CONDITIONNEMENT",
    "EMBALLAGE",
    "PREPARATION",
    "PRÉPARATION",
    "INTEGRATION",
    "INTÉGRATION",
    "TEST",
    "ESSAI",
];

/// Labels whose checkboxes belong to the final packaging section.
const PACKAGING_VOCAB: &[&str] = &[
    "emballage",
    "conditionnement",
    "étiquette",
    "etiquette",
    "carton",
    "sachet",
    "protection",
    "colisage",
];

/// Header keywords that mark a table as a pure document-header table.
const HEADER_TABLE_KEYWORDS: &[&str] = &["lancement", "silog", "rédacteur", "redacteur", "approbateur"];

/// First-row keywords of the component/lot table backing the preface section.
const COMPONENT_TABLE_KEYWORDS: &[&str] = &[
    "composant",
    "désignation",
    "designation",
    "lot",
    "quantité",
    "quantite",
];

/// Section numbers that always take a table even when PASS/FAIL shapes were
/// detected in their range (known false-positive band on these forms).
const TABLE_OVERRIDE_BAND: std::ops::RangeInclusive<u32> = 4..=6;

const MIN_VOCAB_TITLE_LEN: usize = 10;
const MIN_LAST_RESORT_TITLE_LEN: usize = 5;
const TITLE_SEARCH_WINDOW: usize = 10_000;
const TITLE_SEARCH_WINDOW_WIDE: usize = 30_000;
const FINAL_SECTION_CHECKBOX_LOOKBACK: usize = 20;

#[derive(Debug, Clone)]
struct TitleEntry {
    title: String,
    paragraph_index: usize,
}

#[derive(Debug, Clone)]
struct SectionMatch {
    number: u32,
    title: String,
    paragraph_index: usize,
}

fn starts_with_vocab(text: &str) -> bool {
    let upper = text.trim_start().to_uppercase();
    SECTION_VOCAB.iter().any(|w| upper.starts_with(w))
}

fn contains_vocab(text: &str) -> bool {
    let upper = text.to_uppercase();
    SECTION_VOCAB.iter().any(|w| upper.contains(w))
}

/// Repair the spacing defects common in hand-authored headings.
fn normalize_title(title: &str) -> String {
    let t = LOWER_UPPER_RE.replace_all(title, "$1 $2");
    let t = AVEC_BEFORE_RE.replace_all(&t, "$1 avec");
    let t = AVEC_AFTER_RE.replace_all(&t, "avec $1");
    t.trim().to_string()
}

/// Absorb up to two short reference-shaped continuation lines into a title
/// that ends with a colon. Returns the final title.
fn absorb_continuations(title: &str, paragraphs: &[ParaText], after: usize) -> String {
    let mut out = title.to_string();
    if !out.trim_end().ends_with(':') {
        return out;
    }
    let mut absorbed = 0;
    for para in paragraphs.iter().filter(|p| p.index > after) {
        if absorbed >= 2 {
            break;
        }
        let line = para.text.trim();
        if line.is_empty() {
            continue;
        }
        if line.len() <= 40 && REFERENCE_LINE_RE.is_match(line) {
            out.push(' ');
            out.push_str(line);
            absorbed += 1;
        } else {
            break;
        }
    }
    out
}

/// First pass: harvest a map of section number -> best-known title.
fn harvest_titles(paragraphs: &[ParaText]) -> BTreeMap<u32, TitleEntry> {
    let mut titles: BTreeMap<u32, TitleEntry> = BTreeMap::new();
    let mut next_sequential: u32 = 1;

    for para in paragraphs {
        let text = para.text.trim();
        if text.is_empty() {
            continue;
        }

        let (number, raw_title) = if let Some(cap) = HEADING_RE.captures(text) {
            let remainder = cap[2].to_string();
            if !HAS_LETTER_RE.is_match(&remainder) {
                continue;
            }
            (cap[1].parse::<u32>().unwrap_or(0), remainder)
        } else if starts_with_vocab(text) && text.len() >= MIN_VOCAB_TITLE_LEN {
            // Unnumbered heading opened by a known vocabulary word: give it
            // the next sequential number.
            (next_sequential, text.to_string())
        } else {
            continue;
        };
        if number == 0 {
            continue;
        }

        let title = normalize_title(&raw_title);
        let title = absorb_continuations(&title, paragraphs, para.index);
        next_sequential = number.max(next_sequential) + 1;

        titles.entry(number).or_insert(TitleEntry {
            title,
            paragraph_index: para.index,
        });
    }

    titles
}

/// Validate a numbered candidate's title remainder.
fn valid_remainder(remainder: &str) -> bool {
    if !HAS_LETTER_RE.is_match(remainder) {
        return false;
    }
    if MEASUREMENT_RE.is_match(remainder) {
        return false;
    }
    if remainder
        .trim_start()
        .chars()
        .next()
        .map(|c| c.is_alphabetic())
        .unwrap_or(false)
    {
        return true;
    }
    if starts_with_vocab(remainder) || contains_vocab(remainder) {
        return true;
    }
    THREE_LETTERS_RE.is_match(remainder) && remainder.trim().len() >= MIN_LAST_RESORT_TITLE_LEN
}

/// Second pass: match sections with the three-pattern numbering ladder.
fn match_sections(
    paragraphs: &[ParaText],
    titles: &BTreeMap<u32, TitleEntry>,
) -> Vec<SectionMatch> {
    let mut matches: Vec<SectionMatch> = Vec::new();

    for para in paragraphs {
        let text = para.text.trim();
        if text.is_empty() {
            continue;
        }

        let candidate = [&*NUM_STRICT_RE, &*NUM_LOOSE_RE, &*NUM_TIGHT_RE]
            .iter()
            .find_map(|re| re.captures(text))
            .and_then(|cap| {
                let number = cap[1].parse::<u32>().ok()?;
                let remainder = cap[2].to_string();
                valid_remainder(&remainder).then_some((number, remainder))
            });

        let (number, remainder) = match candidate {
            Some(c) => c,
            None => continue,
        };

        let title = normalize_title(&remainder);
        let title = absorb_continuations(&title, paragraphs, para.index);
        // The harvesting pass produced the more complete title when it saw
        // the same number.
        let title = titles
            .get(&number)
            .map(|t| t.title.clone())
            .unwrap_or(title);

        matches.push(SectionMatch {
            number,
            title,
            paragraph_index: para.index,
        });
    }

    matches
}

/// Fallback (a): synthesize matches straight from the harvested title map.
fn matches_from_titles(titles: &BTreeMap<u32, TitleEntry>) -> Vec<SectionMatch> {
    titles
        .iter()
        .map(|(&number, entry)| SectionMatch {
            number,
            title: entry.title.clone(),
            paragraph_index: entry.paragraph_index,
        })
        .collect()
}

/// Fallback (b): paragraphs carrying a recurring domain keyword, matched by
/// the loose numbered pattern or looked up in the title map.
fn matches_from_keywords(
    paragraphs: &[ParaText],
    titles: &BTreeMap<u32, TitleEntry>,
) -> Vec<SectionMatch> {
    let mut matches = Vec::new();
    let mut next = 1u32;
    for para in paragraphs {
        let text = para.text.trim();
        if text.is_empty() || !contains_vocab(text) {
            continue;
        }
        if let Some(cap) = NUM_LOOSE_RE.captures(text) {
            if let Ok(number) = cap[1].parse::<u32>() {
                matches.push(SectionMatch {
                    number,
                    title: normalize_title(&cap[2]),
                    paragraph_index: para.index,
                });
                next = number + 1;
                continue;
            }
        }
        if let Some((&number, entry)) = titles.iter().find(|(_, e)| e.paragraph_index == para.index)
        {
            matches.push(SectionMatch {
                number,
                title: entry.title.clone(),
                paragraph_index: para.index,
            });
            next = number + 1;
        } else if text.len() >= MIN_VOCAB_TITLE_LEN {
            matches.push(SectionMatch {
                number: next,
                title: normalize_title(text),
                paragraph_index: para.index,
            });
            next += 1;
        }
    }
    matches
}

/// Recover a heading near a table for fallback (c): scan the preceding XML
/// window for the last heading-shaped paragraph, widening once before giving
/// up.
fn title_near_table(table_offset: usize, paragraphs: &[ParaText]) -> Option<String> {
    for window in [TITLE_SEARCH_WINDOW, TITLE_SEARCH_WINDOW_WIDE] {
        let from = table_offset.saturating_sub(window);
        let found = paragraphs
            .iter()
            .rev()
            .filter(|p| p.offset >= from && p.offset < table_offset)
            .find(|p| {
                let t = p.text.trim();
                !t.is_empty() && (HEADING_RE.is_match(t) || starts_with_vocab(t))
            })
            .map(|p| match HEADING_RE.captures(p.text.trim()) {
                Some(cap) => normalize_title(&cap[2]),
                None => normalize_title(p.text.trim()),
            });
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Fallback (c): one section per table.
fn sections_from_tables(paragraphs: &[ParaText], tables: &[(usize, Table)]) -> Vec<Section> {
    tables
        .iter()
        .enumerate()
        .map(|(i, (offset, table))| {
            let number = (i + 1) as u32;
            let title = title_near_table(*offset, paragraphs)
                .unwrap_or_else(|| format!("Section {}", number));
            Section {
                id: number,
                title,
                section_type: SectionType::Table,
                fields: Vec::new(),
                table: Some(table.clone()),
                tables: vec![table.clone()],
                checkboxes: Vec::new(),
                text_fields: Vec::new(),
                paragraph_index: 0,
            }
        })
        .collect()
}

fn is_header_table(table: &Table) -> bool {
    let first_row_text = match table.rows.first() {
        Some(row) => row
            .iter()
            .map(|c| c.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" "),
        None => return false,
    };
    HEADER_TABLE_KEYWORDS
        .iter()
        .any(|k| first_row_text.contains(k))
}

fn significant_words(label: &str) -> Vec<String> {
    label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Keep in-range checkboxes that the section text actually mentions: whole
/// label containment first, then word-overlap scoring at half the
/// significant words. When nothing matches, keep everything in range.
fn filter_checkboxes(in_range: Vec<Checkbox>, section_text: &str) -> Vec<Checkbox> {
    let lower = section_text.to_lowercase();
    let mut kept: Vec<Checkbox> = in_range
        .iter()
        .filter(|cb| {
            let label = cb.label.to_lowercase();
            if lower.contains(&label) {
                return true;
            }
            let words = significant_words(&cb.label);
            if words.is_empty() {
                return false;
            }
            let hits = words.iter().filter(|w| lower.contains(w.as_str())).count();
            hits * 2 >= words.len()
        })
        .cloned()
        .collect();
    if kept.is_empty() {
        kept = in_range;
    }
    kept.sort_by_key(|c| (c.paragraph_index, c.position));
    kept
}

fn derive_type(section: &Section) -> SectionType {
    let has_fields = !section.fields.is_empty();
    let has_table = section.table.is_some() || !section.tables.is_empty();
    match (has_fields, has_table) {
        (true, true) => SectionType::Mixed,
        (true, false) => SectionType::PassFail,
        (false, true) => SectionType::Table,
        (false, false) => {
            if !section.checkboxes.is_empty() {
                SectionType::Checkboxes
            } else if !section.text_fields.is_empty() {
                SectionType::TextFields
            } else {
                SectionType::Text
            }
        }
    }
}

/// Attach fields, tables, checkboxes and blank fields to matched sections.
fn associate_fields(
    matches: &[SectionMatch],
    paragraphs: &[ParaText],
    tables: &[(usize, Table)],
    checkboxes: &[Checkbox],
) -> Vec<Section> {
    let mut ordered: Vec<&SectionMatch> = matches.iter().collect();
    ordered.sort_by_key(|m| m.paragraph_index);

    let data_tables: Vec<&(usize, Table)> =
        tables.iter().filter(|(_, t)| !is_header_table(t)).collect();

    let mut sections = Vec::with_capacity(ordered.len());
    let mut next_table = 0usize;

    for (i, m) in ordered.iter().enumerate() {
        let range_end = ordered
            .get(i + 1)
            .map(|n| n.paragraph_index)
            .unwrap_or(usize::MAX);
        let range = m.paragraph_index..range_end;

        let in_range: Vec<&ParaText> = paragraphs
            .iter()
            .filter(|p| range.contains(&p.index))
            .collect();
        let section_text = in_range
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut fields = pass_fail_labels(&section_text);

        // Positional table assignment, with the override band discarding
        // PASS/FAIL false positives in favor of the table.
        let override_band = TABLE_OVERRIDE_BAND.contains(&m.number);
        let mut table = None;
        if fields.is_empty() || override_band {
            if override_band && !fields.is_empty() {
                debug!(
                    "section {}: discarding {} PASS/FAIL fields in favor of table",
                    m.number,
                    fields.len()
                );
                fields.clear();
            }
            if let Some((_, t)) = data_tables.get(next_table) {
                table = Some(t.clone());
                next_table += 1;
            }
        }

        // Tables physically inside the paragraph span of this section.
        let offset_start = in_range.first().map(|p| p.offset).unwrap_or(usize::MAX);
        let offset_end = paragraphs
            .iter()
            .find(|p| p.index == range_end)
            .map(|p| p.offset)
            .unwrap_or(usize::MAX);
        let mut in_span: Vec<Table> = data_tables
            .iter()
            .filter(|(off, _)| *off >= offset_start && *off < offset_end)
            .map(|(_, t)| t.clone())
            .collect();
        if in_span.is_empty() {
            if let Some(t) = &table {
                in_span.push(t.clone());
            }
        }

        let boxes_in_range: Vec<Checkbox> = checkboxes
            .iter()
            .filter(|c| range.contains(&c.paragraph_index))
            .cloned()
            .collect();
        let mut boxes = filter_checkboxes(boxes_in_range, &section_text);

        // The packaging section closes most forms; when the last section
        // caught nothing, pull in trailing packaging-labeled checkboxes.
        let is_last = i + 1 == ordered.len();
        if is_last && boxes.is_empty() {
            boxes = checkboxes
                .iter()
                .rev()
                .take(FINAL_SECTION_CHECKBOX_LOOKBACK)
                .filter(|c| {
                    let label = c.label.to_lowercase();
                    PACKAGING_VOCAB.iter().any(|k| label.contains(k))
                })
                .cloned()
                .collect();
            boxes.sort_by_key(|c| (c.paragraph_index, c.position));
        }

        let mut text_fields: Vec<TextField> = detect_text_fields(&m.title, m.paragraph_index);
        for p in &in_range {
            text_fields.extend(detect_text_fields(&p.text, p.index));
        }

        let mut section = Section {
            id: m.number,
            title: m.title.clone(),
            section_type: SectionType::Text,
            fields,
            table,
            tables: in_span,
            checkboxes: boxes,
            text_fields,
            paragraph_index: m.paragraph_index,
        };
        section.section_type = derive_type(&section);
        sections.push(section);
    }

    sections
}

/// Synthesize the optional id-0 "General" preface section.
fn preface_section(
    matches: &[SectionMatch],
    paragraphs: &[ParaText],
    tables: &[(usize, Table)],
) -> Option<Section> {
    let first_index = matches.iter().map(|m| m.paragraph_index).min()?;
    let para = paragraphs.iter().find(|p| {
        if p.index >= first_index {
            return false;
        }
        let lower = p.text.to_lowercase();
        lower.contains("général") || lower.contains("general") || lower.contains("composant")
    })?;
    let component_table = tables.iter().map(|(_, t)| t).find(|t| {
        t.rows.first().map_or(false, |row| {
            let text = row
                .iter()
                .map(|c| c.text.to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            COMPONENT_TABLE_KEYWORDS.iter().any(|k| text.contains(k))
        })
    })?;
    Some(Section {
        id: 0,
        title: para.text.trim().to_string(),
        section_type: SectionType::Table,
        fields: Vec::new(),
        table: Some(component_table.clone()),
        tables: vec![component_table.clone()],
        checkboxes: Vec::new(),
        text_fields: Vec::new(),
        paragraph_index: para.index,
    })
}

/// Sort by id ascending and drop duplicate ids, keeping the first occurrence.
fn finalize(mut sections: Vec<Section>) -> Vec<Section> {
    sections.sort_by_key(|s| s.id);
    let mut out: Vec<Section> = Vec::with_capacity(sections.len());
    for s in sections {
        if out.last().map(|p: &Section| p.id) == Some(s.id) {
            warn!("duplicate section id {} dropped (kept first occurrence)", s.id);
            continue;
        }
        out.push(s);
    }
    out
}

/// Run the full segmentation pipeline over the scanned document.
///
/// `tables` carries each top-level table with its character offset in the
/// body XML, in document order.
pub fn segment_sections(
    paragraphs: &[ParaText],
    tables: &[(usize, Table)],
    checkboxes: &[Checkbox],
) -> Vec<Section> {
    let titles = harvest_titles(paragraphs);
    let mut matches = match_sections(paragraphs, &titles);

    if matches.is_empty() && !titles.is_empty() {
        debug!("no numbered sections matched; synthesizing from title map");
        matches = matches_from_titles(&titles);
    }
    if matches.is_empty() {
        debug!("title map empty; trying keyword fallback");
        matches = matches_from_keywords(paragraphs, &titles);
    }
    if matches.is_empty() {
        if tables.is_empty() {
            debug!("no sections and no tables; returning empty section list");
            return Vec::new();
        }
        debug!("no sections found; synthesizing one section per table");
        return finalize(sections_from_tables(paragraphs, tables));
    }

    let mut sections = associate_fields(&matches, paragraphs, tables, checkboxes);
    if let Some(preface) = preface_section(&matches, paragraphs, tables) {
        sections.push(preface);
    }
    finalize(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn para(index: usize, offset: usize, text: &str) -> ParaText {
        ParaText {
            index,
            offset,
            text: text.to_string(),
        }
    }

    fn table_with_header(id: usize, header: &[&str]) -> Table {
        Table {
            id,
            rows: vec![header.iter().map(|t| Cell::new(*t)).collect()],
        }
    }

    #[test]
    fn test_numbered_sections_in_order() {
        let paragraphs = vec![
            para(0, 0, "1- Préparation du poste"),
            para(1, 100, "instructions"),
            para(2, 200, "2- Contrôle visuel"),
        ];
        let sections = segment_sections(&paragraphs, &[], &[]);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].id, 1);
        assert_eq!(sections[0].title, "Préparation du poste");
        assert_eq!(sections[1].id, 2);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let paragraphs = vec![
            para(0, 0, "5- Montage du connecteur"),
            para(1, 100, "5- Montage répété par erreur"),
        ];
        let sections = segment_sections(&paragraphs, &[], &[]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, 5);
        assert_eq!(sections[0].title, "Montage du connecteur");
    }

    #[test]
    fn test_measurement_value_rejected_as_title() {
        let paragraphs = vec![para(0, 0, "12,5 mm < 15"), para(1, 50, "3- Soudure")];
        let sections = segment_sections(&paragraphs, &[], &[]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, 3);
    }

    #[test]
    fn test_spacing_defects_normalized() {
        let paragraphs = vec![para(0, 0, "2- MontageavecCordon")];
        let sections = segment_sections(&paragraphs, &[], &[]);
        assert_eq!(sections[0].title, "Montage avec Cordon");
    }

    #[test]
    fn test_colon_title_absorbs_reference_lines() {
        let paragraphs = vec![
            para(0, 0, "4- Repérage du câble selon :"),
            para(1, 50, "OF 2024-118"),
            para(2, 90, "IND B"),
            para(3, 130, "texte libre assez long pour ne pas être absorbé"),
        ];
        let sections = segment_sections(&paragraphs, &[], &[]);
        assert_eq!(sections[0].title, "Repérage du câble selon : OF 2024-118 IND B");
    }

    #[test]
    fn test_pass_fail_association() {
        let paragraphs = vec![
            para(0, 0, "7- Contrôle électrique"),
            para(1, 60, "Connecteur 1 (coté A) : PASS FAIL"),
            para(2, 120, "Connecteur 2 (coté B) : PASS FAIL"),
            para(3, 180, "8- Marquage"),
        ];
        let sections = segment_sections(&paragraphs, &[], &[]);
        let s7 = sections.iter().find(|s| s.id == 7).unwrap();
        assert_eq!(s7.fields.len(), 2);
        assert_eq!(s7.section_type, SectionType::PassFail);
        let s8 = sections.iter().find(|s| s.id == 8).unwrap();
        assert!(s8.fields.is_empty());
    }

    #[test]
    fn test_checkbox_association_and_order() {
        let paragraphs = vec![
            para(0, 0, "1- Câblage"),
            para(1, 60, "☐ Câblage du toron effectué"),
            para(2, 120, "☐ Contrôle du câblage fait"),
            para(3, 180, "9- Divers"),
        ];
        let checkboxes = vec![
            Checkbox {
                id: 0,
                label: "Contrôle du câblage fait".into(),
                checked: false,
                position: 120,
                paragraph_index: 2,
            },
            Checkbox {
                id: 1,
                label: "Câblage du toron effectué".into(),
                checked: false,
                position: 60,
                paragraph_index: 1,
            },
        ];
        let sections = segment_sections(&paragraphs, &[], &checkboxes);
        let s1 = sections.iter().find(|s| s.id == 1).unwrap();
        assert_eq!(s1.checkboxes.len(), 2);
        assert_eq!(s1.checkboxes[0].paragraph_index, 1);
        assert_eq!(s1.checkboxes[1].paragraph_index, 2);
        assert_eq!(s1.section_type, SectionType::Checkboxes);
    }

    #[test]
    fn test_table_fallback_one_section_per_table() {
        let paragraphs = vec![para(0, 0, "du texte sans aucune numérotation")];
        let tables = vec![
            (10, table_with_header(0, &["a"])),
            (20, table_with_header(1, &["b"])),
            (30, table_with_header(2, &["c"])),
        ];
        let sections = segment_sections(&paragraphs, &tables, &[]);
        assert_eq!(sections.len(), 3);
        assert_eq!(
            sections.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(sections.iter().all(|s| s.section_type == SectionType::Table));
    }

    #[test]
    fn test_header_table_not_assigned_to_sections() {
        let paragraphs = vec![
            para(0, 0, "1- Préparation"),
            para(1, 100, "2- Montage"),
        ];
        let tables = vec![
            (5, table_with_header(0, &["N° de lancement", "Référence SILOG"])),
            (150, table_with_header(1, &["Repère", "Valeur"])),
        ];
        let sections = segment_sections(&paragraphs, &tables, &[]);
        // The first data table (not the header table) goes to section 1.
        let s1 = sections.iter().find(|s| s.id == 1).unwrap();
        assert_eq!(s1.table.as_ref().unwrap().rows[0][0].text, "Repère");
    }

    #[test]
    fn test_override_band_discards_pass_fail() {
        let paragraphs = vec![
            para(0, 0, "5- Relevé des mesures"),
            para(1, 60, "Cote A : PASS FAIL"),
        ];
        let tables = vec![(100, table_with_header(0, &["Repère", "Valeur"]))];
        let sections = segment_sections(&paragraphs, &tables, &[]);
        let s5 = sections.iter().find(|s| s.id == 5).unwrap();
        assert!(s5.fields.is_empty());
        assert!(s5.table.is_some());
        assert_eq!(s5.section_type, SectionType::Table);
    }

    #[test]
    fn test_preface_section_id_zero() {
        let paragraphs = vec![
            para(0, 0, "Généralités sur les composants utilisés"),
            para(1, 100, "1- Montage"),
        ];
        let tables = vec![(50, table_with_header(0, &["Composant", "Lot", "Quantité"]))];
        let sections = segment_sections(&paragraphs, &tables, &[]);
        assert_eq!(sections[0].id, 0);
        assert_eq!(sections[0].section_type, SectionType::Table);
    }

    #[test]
    fn test_vocabulary_heading_without_number() {
        let paragraphs = vec![
            para(0, 0, "VERIFICATION DES COMPOSANTS AVANT MONTAGE"),
            para(1, 100, "texte descriptif"),
        ];
        let sections = segment_sections(&paragraphs, &[], &[]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, 1);
    }

    #[test]
    fn test_empty_document_degrades_to_empty() {
        let sections = segment_sections(&[], &[], &[]);
        assert!(sections.is_empty());
    }
}
