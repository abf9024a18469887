//! Excel `.xlsx` workbooks flattened to CSV, one block per sheet.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::container::{has_entry, natural_cmp, open_archive, read_entry};
use super::{run_blocking, Extractor};
use crate::error::ExtractionError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEETS_DIR: &str = "xl/worksheets/";

/// Largest sheet Excel can address: row 1048576, column XFD.
const MAX_ROWS: u32 = 1_048_576;
const MAX_COLUMNS: u32 = 16_384;

pub struct SheetExtractor;

#[async_trait]
impl Extractor for SheetExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        run_blocking(bytes, extract_text).await
    }
}

/// Renders every sheet as CSV in workbook order, separated by blank lines.
pub fn extract_text(content: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(content)?;
    let sheet_paths = sheet_paths(&mut archive)?;

    let shared_strings = if has_entry(&mut archive, SHARED_STRINGS_PART) {
        let xml = read_entry(&mut archive, SHARED_STRINGS_PART)?;
        parse_shared_strings(&xml)
            .map_err(|e| ExtractionError::malformed_xml(SHARED_STRINGS_PART, e))?
    } else {
        Vec::new()
    };

    let mut fragments = Vec::with_capacity(sheet_paths.len());
    for path in &sheet_paths {
        let xml = read_entry(&mut archive, path)?;
        let grid = parse_sheet(&xml, &shared_strings)
            .map_err(|e| ExtractionError::malformed_xml(path, e))?;
        tracing::debug!(sheet = %path, rows = grid.row_count(), "Parsed worksheet");
        fragments.push(grid.to_csv());
    }

    Ok(fragments.join("\n\n").trim().to_string())
}

/// Populated cells of one sheet, addressed by zero-based row and column.
#[derive(Debug, Default)]
pub struct SheetGrid {
    rows: BTreeMap<u32, BTreeMap<u32, String>>,
}

impl SheetGrid {
    fn insert(&mut self, row: u32, col: u32, value: String) {
        if value.is_empty() {
            return;
        }
        self.rows.entry(row).or_default().insert(col, value);
    }

    /// Number of rows holding at least one populated cell.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Populated rows only, each padded to the sheet's populated column span.
    pub fn to_csv(&self) -> String {
        let min_col = self.rows.values().filter_map(|r| r.keys().next()).min().copied();
        let max_col = self.rows.values().filter_map(|r| r.keys().next_back()).max().copied();
        let (Some(min_col), Some(max_col)) = (min_col, max_col) else {
            return String::new();
        };

        self.rows
            .values()
            .map(|cells| {
                (min_col..=max_col)
                    .map(|col| cells.get(&col).map(|v| csv_field(v)).unwrap_or(Cow::Borrowed("")))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Quotes a field when it contains the delimiter, a quote or a line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn sheet_paths(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<Vec<String>, ExtractionError> {
    let workbook = read_entry(archive, WORKBOOK_PART)?;
    let sheet_ids = parse_workbook_sheets(&workbook)
        .map_err(|e| ExtractionError::malformed_xml(WORKBOOK_PART, e))?;

    if has_entry(archive, WORKBOOK_RELS_PART) {
        let rels = read_entry(archive, WORKBOOK_RELS_PART)?;
        let targets = parse_relationships(&rels)
            .map_err(|e| ExtractionError::malformed_xml(WORKBOOK_RELS_PART, e))?;

        let paths = sheet_ids
            .iter()
            .filter_map(|id| match targets.get(id) {
                Some(target) => Some(resolve_target(target)),
                None => {
                    tracing::warn!("Workbook sheet {} has no relationship target, skipping", id);
                    None
                }
            })
            .collect();
        return Ok(paths);
    }

    tracing::warn!("Workbook has no relationships part, falling back to worksheet folder order");
    let mut paths: Vec<String> = archive
        .file_names()
        .filter(|p| p.starts_with(WORKSHEETS_DIR) && p.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    paths.sort_by(|a, b| natural_cmp(a, b));
    Ok(paths)
}

// Targets are relative to xl/ unless absolute within the package.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn attribute(e: &BytesStart<'_>, matches: impl Fn(&[u8]) -> bool) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| matches(a.key.as_ref()))
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Relationship ids of the workbook's sheets, in declared order.
fn parse_workbook_sheets(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut ids = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                if let Some(id) = attribute(e, |key| key.ends_with(b":id")) {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(ids)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attribute(e, |key| key == b"Id");
                let target = attribute(e, |key| key == b"Target");
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(ref t) if in_text && !in_phonetic => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

#[derive(Default)]
struct CellState {
    row: u32,
    col: u32,
    cell_type: Option<String>,
    value: String,
    inline: String,
}

impl CellState {
    fn resolve(&self, shared_strings: &[String]) -> String {
        match self.cell_type.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared_strings.get(idx))
                .cloned()
                .unwrap_or_default(),
            Some("inlineStr") => self.inline.clone(),
            Some("b") => match self.value.trim() {
                "1" => "TRUE".to_string(),
                "0" => "FALSE".to_string(),
                other => other.to_string(),
            },
            _ => self.value.clone(),
        }
    }
}

/// Parses one worksheet part into its populated cells.
pub fn parse_sheet(xml: &str, shared_strings: &[String]) -> Result<SheetGrid, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut grid = SheetGrid::default();

    let mut next_row: u32 = 0;
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = attribute(e, |key| key == b"r")
                        .and_then(|r| r.trim().parse::<u32>().ok())
                        .map(|r| r.saturating_sub(1))
                        .unwrap_or(next_row);
                    next_col = 0;
                }
                b"c" => {
                    cell = cell_position(e, current_row, next_col).map(|(row, col)| CellState {
                        row,
                        col,
                        cell_type: attribute(e, |key| key == b"t"),
                        ..CellState::default()
                    });
                }
                b"v" => in_value = true,
                b"rPh" => in_phonetic = true,
                b"t" if cell.is_some() => in_inline_text = true,
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some((_, col)) = cell_position(e, current_row, next_col) {
                        next_col = col.saturating_add(1);
                    }
                }
                b"row" => {
                    next_row = attribute(e, |key| key == b"r")
                        .and_then(|r| r.trim().parse::<u32>().ok())
                        .unwrap_or_else(|| next_row.saturating_add(1));
                }
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"row" => next_row = current_row.saturating_add(1),
                b"c" => {
                    if let Some(state) = cell.take() {
                        next_col = state.col.saturating_add(1);
                        grid.insert(state.row, state.col, state.resolve(shared_strings));
                    }
                }
                b"v" => in_value = false,
                b"rPh" => in_phonetic = false,
                b"t" => in_inline_text = false,
                _ => {}
            },
            Event::Text(ref t) => {
                if let Some(state) = cell.as_mut() {
                    if in_value {
                        state.value.push_str(&t.unescape()?);
                    } else if in_inline_text && !in_phonetic {
                        state.inline.push_str(&t.unescape()?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(grid)
}

// Cells addressed outside the sheet bounds are dropped.
fn cell_position(e: &BytesStart<'_>, current_row: u32, next_col: u32) -> Option<(u32, u32)> {
    match attribute(e, |key| key == b"r") {
        Some(reference) => parse_cell_reference(&reference),
        None if current_row < MAX_ROWS && next_col < MAX_COLUMNS => Some((current_row, next_col)),
        None => None,
    }
}

/// `"B3"` → `(2, 1)`, zero-based row and column. `None` for malformed
/// references and for anything past `XFD1048576`.
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim().trim_start_matches('$');
    let split = reference.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let col = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            acc.checked_mul(26)?
                .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
        })?;
    let row: u32 = digits.trim_start_matches('$').parse().ok()?;
    if row == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
        return None;
    }
    Some((row - 1, col - 1))
}
