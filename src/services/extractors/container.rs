//! Zip containers whose text lives in a set of XML parts.
//!
//! Slide decks, Numbers worksheets and Pages documents are all read the same
//! way: pick the entries selected by the layout, pull out the text of every
//! innermost element and join the results. The scrape is deliberately
//! tag-agnostic, so non-content strings such as style identifiers can end
//! up in the output.

use std::cmp::Ordering;
use std::io::{Cursor, Read};

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use zip::ZipArchive;

use super::{run_blocking, Extractor};
use crate::error::ExtractionError;
use crate::models::ContainerLayout;

static INNERMOST_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>([^<]+)</[^>]*>").expect("static regex"));

static SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide\d+\.xml$").expect("static regex"));

static XML_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.xml$").expect("static regex"));

static PAGES_INDEX_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^index\.xml$").expect("static regex"));

fn path_prefix(layout: ContainerLayout) -> &'static str {
    match layout {
        ContainerLayout::SlideDeck => "ppt/slides/",
        ContainerLayout::NumbersWorksheet => "Index/Worksheet/",
        ContainerLayout::PagesDocument => "",
    }
}

fn path_pattern(layout: ContainerLayout) -> &'static Regex {
    match layout {
        ContainerLayout::SlideDeck => &SLIDE_PART,
        ContainerLayout::NumbersWorksheet => &XML_PART,
        ContainerLayout::PagesDocument => &PAGES_INDEX_PART,
    }
}

/// Whether `path` is one of the parts scraped for `layout`.
pub fn is_selected(layout: ContainerLayout, path: &str) -> bool {
    path.starts_with(path_prefix(layout)) && path_pattern(layout).is_match(path)
}

pub struct ZipXmlExtractor {
    layout: ContainerLayout,
}

impl ZipXmlExtractor {
    pub fn new(layout: ContainerLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl Extractor for ZipXmlExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        let layout = self.layout;
        run_blocking(bytes, move |content| extract_text(content, layout)).await
    }
}

pub fn extract_text(content: &[u8], layout: ContainerLayout) -> Result<String, ExtractionError> {
    let mut archive = open_archive(content)?;

    let mut selected: Vec<String> = archive
        .file_names()
        .filter(|path| is_selected(layout, path))
        .map(str::to_string)
        .collect();
    selected.sort_by(|a, b| natural_cmp(a, b));

    tracing::debug!(layout = ?layout, parts = selected.len(), "Scraping container parts");

    let mut sections = Vec::with_capacity(selected.len());
    for path in &selected {
        let xml = read_entry(&mut archive, path)?;
        sections.push(scrape_innermost_text(&xml));
    }

    Ok(sections.join("\n\n").trim().to_string())
}

/// Text between every start tag and its matching end tag, in document order,
/// joined with single spaces. Whitespace-only gaps between tags are skipped.
pub fn scrape_innermost_text(xml: &str) -> String {
    INNERMOST_ELEMENT
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|fragment| !fragment.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn open_archive(content: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, ExtractionError> {
    ZipArchive::new(Cursor::new(content)).map_err(|e| {
        tracing::debug!("Failed to open ZIP archive: {}", e);
        ExtractionError::container()
    })
}

pub(crate) fn has_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> bool {
    archive.by_name(path).is_ok()
}

/// Reads an entry as text, replacing invalid UTF-8.
pub(crate) fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    path: &str,
) -> Result<String, ExtractionError> {
    let mut entry = archive
        .by_name(path)
        .map_err(|_| ExtractionError::missing_part(path))?;
    let mut buf = Vec::new();
    entry
        .read_to_end(&mut buf)
        .map_err(|e| ExtractionError::new(format!("could not read {}: {}", path, e)))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NameChunk<'a> {
    Number(u64),
    Text(&'a str),
}

fn name_chunks(name: &str) -> Vec<NameChunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let bytes = name.as_bytes();
    while start < bytes.len() {
        let digit = bytes[start].is_ascii_digit();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() == digit {
            end += 1;
        }
        let chunk = &name[start..end];
        chunks.push(if digit {
            NameChunk::Number(chunk.parse().unwrap_or(u64::MAX))
        } else {
            NameChunk::Text(chunk)
        });
        start = end;
    }
    chunks
}

/// Orders `slide2.xml` before `slide10.xml`.
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    name_chunks(a).cmp(&name_chunks(b)).then_with(|| a.cmp(b))
}
