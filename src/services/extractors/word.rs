use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::container::{open_archive, read_entry};
use super::{run_blocking, Extractor};
use crate::error::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Word `.docx` documents.
pub struct WordExtractor;

#[async_trait]
impl Extractor for WordExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        run_blocking(bytes, extract_text).await
    }
}

/// Raw text of the main document part, one blank line between paragraphs.
pub fn extract_text(content: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(content)?;
    let xml = read_entry(&mut archive, DOCUMENT_PART)?;
    raw_text(&xml).map_err(|e| ExtractionError::malformed_xml(DOCUMENT_PART, e))
}

// Text boxes nest whole paragraphs inside a run, so runs and paragraphs are
// tracked by depth. A box's paragraphs are emitted before the paragraph that
// anchors it. `mc:Fallback` repeats the box content for older readers and is
// skipped.
fn raw_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    // Bottom entry collects text outside any paragraph.
    let mut open: Vec<String> = vec![String::new()];
    let mut run_depth = 0u32;
    let mut text_depth = 0u32;
    let mut fallback_depth = 0u32;

    loop {
        let in_run = run_depth > 0 && fallback_depth == 0;
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"Fallback" => fallback_depth += 1,
                b"r" => run_depth += 1,
                b"t" => text_depth += 1,
                b"p" if fallback_depth == 0 => open.push(String::new()),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                // Tab stops in paragraph properties share the name.
                b"tab" if in_run => push_to(&mut open, "\t"),
                b"br" | b"cr" if in_run => push_to(&mut open, "\n"),
                b"p" if fallback_depth == 0 => paragraphs.push(String::new()),
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"Fallback" => fallback_depth = fallback_depth.saturating_sub(1),
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => text_depth = text_depth.saturating_sub(1),
                b"p" if fallback_depth == 0 && open.len() > 1 => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Text(ref t) if in_run && text_depth > 0 => push_to(&mut open, &t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Unclosed paragraphs, innermost first, then loose text.
    while let Some(rest) = open.pop() {
        if !rest.is_empty() {
            paragraphs.push(rest);
        }
    }

    Ok(paragraphs.join("\n\n").trim().to_string())
}

fn push_to(open: &mut [String], text: &str) {
    if let Some(paragraph) = open.last_mut() {
        paragraph.push_str(text);
    }
}
