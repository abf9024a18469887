//! Fixtures shared by the test binaries.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use filetext::services::{Extractor, FileRegistry, PipelineObserver};
use filetext::{Config, ErrorCategory, ExtractionError, FileStatus};

pub fn test_config() -> Config {
    Config {
        max_file_size_bytes: 2 * 1024 * 1024,
        max_concurrent_extractions: 4,
        session_quota_bytes: 1024 * 1024,
        session_dir: std::env::temp_dir().join("filetext-tests"),
    }
}

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (path, content) in entries {
        writer.start_file(*path, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn slide_xml(text: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
            r#"<p:cSld><p:spTree><p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US"/>"#,
            r#"<a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        ),
        text
    )
}

/// A deck whose slides are stored out of order inside the archive.
pub fn pptx_bytes(slides: &[&str]) -> Vec<u8> {
    let parts: Vec<(String, String)> = slides
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| (format!("ppt/slides/slide{}.xml", i + 1), slide_xml(text)))
        .collect();

    let mut entries: Vec<(&str, &str)> = vec![
        ("[Content_Types].xml", "<Types/>"),
        ("ppt/presentation.xml", "<p:presentation/>"),
        ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"),
    ];
    entries.extend(parts.iter().map(|(p, c)| (p.as_str(), c.as_str())));
    zip_bytes(&entries)
}

pub const DOCX_DOCUMENT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>"#,
    r#"<w:r><w:rPr><w:b/></w:rPr><w:t>Hello</w:t></w:r>"#,
    r#"<w:r><w:tab/><w:t xml:space="preserve">world &amp; co</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>Second</w:t><w:br/><w:t>line</w:t></w:r></w:p>"#,
    r#"</w:body></w:document>"#
);

pub fn docx_bytes(document: &str) -> Vec<u8> {
    zip_bytes(&[
        ("[Content_Types].xml", "<Types/>"),
        ("word/document.xml", document),
        ("word/styles.xml", "<w:styles><w:style><w:name>Normal</w:name></w:style></w:styles>"),
    ])
}

pub const WORKBOOK_XML: &str = concat!(
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheets><sheet name="Summary" sheetId="2" r:id="rId2"/>"#,
    r#"<sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#
);

pub const WORKBOOK_RELS_XML: &str = concat!(
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>"#,
    r#"<Relationship Id="rId3" Type="styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#
);

pub const SHARED_STRINGS_XML: &str = concat!(
    r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<si><t>name</t></si><si><t>note</t></si>"#,
    r#"<si><r><t xml:space="preserve">say </t></r><r><t>"hi"</t></r></si>"#,
    r#"<si><t>total</t></si>"#,
    r#"</sst>"#
);

pub const DATA_SHEET_XML: &str = concat!(
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>"#,
    r#"<row r="2"><c r="A2" t="inlineStr"><is><t>a,b</t></is></c><c r="B2"><v>42</v></c></row>"#,
    r#"<row r="3"><c r="A3" s="1"/></row>"#,
    r#"<row r="4"><c r="A4" t="s"><v>2</v></c><c r="B4" t="b"><v>1</v></c></row>"#,
    r#"</sheetData></worksheet>"#
);

pub const SUMMARY_SHEET_XML: &str = concat!(
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    r#"<row r="1"><c r="B1" t="s"><v>3</v></c><c r="C1"><f>SUM(Data!B2)</f><v>3</v></c></row>"#,
    r#"</sheetData></worksheet>"#
);

pub const EMPTY_SHEET_XML: &str = concat!(
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<sheetData/></worksheet>"#
);

pub fn xlsx_bytes() -> Vec<u8> {
    zip_bytes(&[
        ("[Content_Types].xml", "<Types/>"),
        ("xl/workbook.xml", WORKBOOK_XML),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML),
        ("xl/sharedStrings.xml", SHARED_STRINGS_XML),
        ("xl/worksheets/sheet1.xml", DATA_SHEET_XML),
        ("xl/worksheets/sheet2.xml", SUMMARY_SHEET_XML),
    ])
}

pub fn single_sheet_xlsx(sheet_xml: &str) -> Vec<u8> {
    zip_bytes(&[
        (
            "xl/workbook.xml",
            r#"<workbook xmlns:r="r"><sheets><sheet name="Only" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/></Relationships>"#,
        ),
        ("xl/worksheets/sheet1.xml", sheet_xml),
    ])
}

/// A PDF with one page per entry; `None` gives a page without any text.
pub fn pdf_bytes(pages: &[Option<&str>]) -> Vec<u8> {
    let pages: Vec<Vec<Operation>> = pages
        .iter()
        .map(|page| match page {
            Some(text) => text_object(vec![Operation::new(
                "Tj",
                vec![Object::string_literal(*text)],
            )]),
            None => vec![],
        })
        .collect();
    pdf_from_operations(pages)
}

/// Wraps the operations in a `BT`/`ET` block set in the page font.
pub fn text_object(body: Vec<Operation>) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(24)]),
        Operation::new("Td", vec![Object::Integer(100), Object::Integer(600)]),
    ];
    operations.extend(body);
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// A PDF whose pages carry the given content stream operations verbatim.
pub fn pdf_from_operations(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Minimal RFC 4180 reader, enough to check what the sheet extractor emits.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    if text.is_empty() {
        return rows;
    }

    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => row.push(std::mem::take(&mut field)),
            ('\n', false) => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            (c, _) => field.push(c),
        }
    }
    row.push(field);
    rows.push(row);
    rows
}

/// Counts invocations and echoes the bytes back as text.
#[derive(Default)]
pub struct CountingExtractor {
    pub calls: AtomicUsize,
}

impl CountingExtractor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for CountingExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Holds every extraction until the test releases a permit.
pub struct GatedExtractor {
    pub gate: Arc<Semaphore>,
    pub calls: AtomicUsize,
}

impl GatedExtractor {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }
}

#[async_trait]
impl Extractor for GatedExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ExtractionError::new(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Sleeps for the number of milliseconds given on the first line of the
/// content, then returns the rest.
pub struct DelayedExtractor;

#[async_trait]
impl Extractor for DelayedExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let (delay, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        let millis: u64 = delay.trim().parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(rest.to_string())
    }
}

pub struct FailingExtractor;

#[async_trait]
impl Extractor for FailingExtractor {
    async fn extract(&self, _bytes: Bytes) -> Result<String, ExtractionError> {
        Err(ExtractionError::new("parser exploded"))
    }
}

/// Keeps every notification for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    pub changes: Mutex<Vec<Vec<(String, FileStatus)>>>,
    pub errors: Mutex<Vec<(ErrorCategory, String)>>,
}

impl RecordingObserver {
    pub fn change_count(&self) -> usize {
        self.changes.lock().len()
    }

    pub fn last_change(&self) -> Vec<(String, FileStatus)> {
        self.changes.lock().last().cloned().unwrap_or_default()
    }

    pub fn error_categories(&self) -> Vec<ErrorCategory> {
        self.errors.lock().iter().map(|(c, _)| *c).collect()
    }
}

impl PipelineObserver for RecordingObserver {
    fn records_changed(&self, registry: &FileRegistry) {
        let listing = registry
            .entries_in_order()
            .map(|(name, record)| (name.to_string(), record.status()))
            .collect();
        self.changes.lock().push(listing);
    }

    fn error_occurred(&self, category: ErrorCategory, message: &str) {
        self.errors.lock().push((category, message.to_string()));
    }
}
