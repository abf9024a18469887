use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use super::{run_blocking, Extractor};
use crate::error::ExtractionError;

// TJ offsets below this (in thousandths of an em) read as a word gap.
const WORD_GAP_OFFSET: f32 = -100.0;

pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        run_blocking(bytes, extract_text).await
    }
}

/// Concatenates the text runs of every page.
///
/// Every string shown by `Tj`, `TJ`, `'` or `"` is one run. Runs on a page
/// are joined with single spaces and pages are separated by a blank line. A
/// document without any text yields an empty string.
pub fn extract_text(content: &[u8]) -> Result<String, ExtractionError> {
    let start = Instant::now();

    let doc = Document::load_mem(content).map_err(|e| {
        tracing::warn!("PDF structure validation failed: {}", e);
        ExtractionError::pdf(e)
    })?;

    let pages = doc.get_pages();
    tracing::debug!("PDF document loaded, {} pages", pages.len());

    let mut page_texts = Vec::with_capacity(pages.len());
    for page_id in pages.values() {
        page_texts.push(page_runs(&doc, *page_id)?.join(" "));
    }

    let text = page_texts.join("\n\n").trim().to_string();

    tracing::debug!(
        "PDF processing completed in {}ms, extracted {} characters",
        start.elapsed().as_millis(),
        text.len()
    );

    Ok(text)
}

fn page_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<String>, ExtractionError> {
    let encodings: BTreeMap<Vec<u8>, &str> = doc
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect();

    let data = doc.get_page_content(page_id).map_err(ExtractionError::pdf)?;
    let content = Content::decode(&data).map_err(ExtractionError::pdf)?;

    let mut encoding: Option<&str> = None;
    let mut runs = Vec::new();
    for operation in &content.operations {
        let shown = match operation.operator.as_str() {
            "Tf" => {
                encoding = operation
                    .operands
                    .first()
                    .and_then(|font| font.as_name().ok())
                    .and_then(|name| encodings.get(name).copied());
                None
            }
            "Tj" | "TJ" | "'" => operation.operands.first(),
            "\"" => operation.operands.get(2),
            _ => None,
        };

        if let Some(operand) = shown {
            let run = decode_run(encoding, operand);
            let run = run.trim();
            if !run.is_empty() {
                runs.push(run.to_string());
            }
        }
    }
    Ok(runs)
}

fn decode_run(encoding: Option<&str>, operand: &Object) -> String {
    match operand {
        Object::String(bytes, _) => Document::decode_text(encoding, bytes),
        Object::Array(items) => {
            let mut run = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => run.push_str(&Document::decode_text(encoding, bytes)),
                    other => {
                        if other.as_float().map_or(false, |offset| offset < WORD_GAP_OFFSET) {
                            run.push(' ');
                        }
                    }
                }
            }
            run
        }
        _ => String::new(),
    }
}
