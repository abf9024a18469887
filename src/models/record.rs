use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCategory;

/// Zip layouts whose text is scraped from a fixed set of XML parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerLayout {
    /// PowerPoint decks: `ppt/slides/slide<N>.xml`.
    SlideDeck,
    /// Apple Numbers: `Index/Worksheet/*.xml`.
    NumbersWorksheet,
    /// Apple Pages: root `index.xml`.
    PagesDocument,
}

/// Strategy used to pull text out of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "layout")]
pub enum ExtractorKind {
    PlainText,
    PortableDocument,
    OfficeOpenXmlWord,
    OfficeOpenXmlSheet,
    DelimitedZipXml(ContainerLayout),
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::PlainText => "plain_text",
            ExtractorKind::PortableDocument => "portable_document",
            ExtractorKind::OfficeOpenXmlWord => "office_open_xml_word",
            ExtractorKind::OfficeOpenXmlSheet => "office_open_xml_sheet",
            ExtractorKind::DelimitedZipXml(ContainerLayout::SlideDeck) => "slide_deck",
            ExtractorKind::DelimitedZipXml(ContainerLayout::NumbersWorksheet) => "numbers_worksheet",
            ExtractorKind::DelimitedZipXml(ContainerLayout::PagesDocument) => "pages_document",
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Queued,
    Loading,
    Ready,
    Error,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Ready | FileStatus::Error)
    }
}

/// Extraction state for one uploaded file, keyed by its name.
///
/// Only the pipeline moves a record between states. A `Ready` record never
/// carries an error message, and an `Error` record always carries one with
/// empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    name: String,
    size_bytes: u64,
    declared_type: String,
    kind: Option<ExtractorKind>,
    status: FileStatus,
    #[serde(default)]
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_category: Option<ErrorCategory>,
    added_at: DateTime<Utc>,
    // Identifies the submission that owns this record; never persisted.
    #[serde(skip)]
    ticket: u64,
}

impl FileRecord {
    pub fn queued(
        name: impl Into<String>,
        size_bytes: u64,
        declared_type: impl Into<String>,
        kind: Option<ExtractorKind>,
    ) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            declared_type: declared_type.into(),
            kind,
            status: FileStatus::Queued,
            text: String::new(),
            error_message: None,
            error_category: None,
            added_at: Utc::now(),
            ticket: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn kind(&self) -> Option<ExtractorKind> {
        self.kind
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    /// Extracted text; empty unless the record is `Ready`.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn error_category(&self) -> Option<ErrorCategory> {
        self.error_category
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    pub fn is_ready(&self) -> bool {
        self.status == FileStatus::Ready
    }

    /// Upper-cased extension, shown next to the file name.
    pub fn type_label(&self) -> String {
        self.name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    pub(crate) fn start_loading(&mut self, ticket: u64) {
        self.status = FileStatus::Loading;
        self.ticket = ticket;
    }

    pub(crate) fn mark_ready(&mut self, text: String) {
        self.status = FileStatus::Ready;
        self.text = text;
        self.error_message = None;
        self.error_category = None;
    }

    pub(crate) fn mark_failed(&mut self, category: ErrorCategory, message: impl Into<String>) {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "could not extract text".to_string();
        }
        self.status = FileStatus::Error;
        self.text.clear();
        self.error_message = Some(message);
        self.error_category = Some(category);
    }
}
