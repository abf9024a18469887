//! Decides which extractor handles a file, from its declared MIME type and
//! its extension.
//!
//! The two tables below are the compatibility surface with whatever hands us
//! files. Browsers routinely report an empty or generic type for less common
//! formats, so the declared type only wins when it appears in
//! [`MIME_TABLE`]; otherwise the extension decides.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::{ContainerLayout, ExtractorKind};

/// Reason attached to every rejection.
pub const UNSUPPORTED_REASON: &str = "unsupported file type";

const TEXT_MIME_PREFIX: &str = "text/";

/// Declared types that carry no information about the content.
const GENERIC_MIME_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Exact MIME matches.
pub const MIME_TABLE: &[(&str, ExtractorKind)] = &[
    ("application/json", ExtractorKind::PlainText),
    ("application/javascript", ExtractorKind::PlainText),
    ("application/pdf", ExtractorKind::PortableDocument),
    ("application/msword", ExtractorKind::OfficeOpenXmlWord),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ExtractorKind::OfficeOpenXmlWord,
    ),
    ("application/vnd.ms-excel", ExtractorKind::OfficeOpenXmlSheet),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ExtractorKind::OfficeOpenXmlSheet,
    ),
    (
        "application/vnd.ms-powerpoint",
        ExtractorKind::DelimitedZipXml(ContainerLayout::SlideDeck),
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ExtractorKind::DelimitedZipXml(ContainerLayout::SlideDeck),
    ),
];

/// Extension fallback, consulted when the declared type is uninformative.
pub const EXTENSION_TABLE: &[(&str, ExtractorKind)] = &[
    // Office & PDF
    ("doc", ExtractorKind::OfficeOpenXmlWord),
    ("docx", ExtractorKind::OfficeOpenXmlWord),
    ("xls", ExtractorKind::OfficeOpenXmlSheet),
    ("xlsx", ExtractorKind::OfficeOpenXmlSheet),
    ("ppt", ExtractorKind::DelimitedZipXml(ContainerLayout::SlideDeck)),
    ("pptx", ExtractorKind::DelimitedZipXml(ContainerLayout::SlideDeck)),
    ("numbers", ExtractorKind::DelimitedZipXml(ContainerLayout::NumbersWorksheet)),
    ("pages", ExtractorKind::DelimitedZipXml(ContainerLayout::PagesDocument)),
    ("pdf", ExtractorKind::PortableDocument),
    // Plain text & data
    ("txt", ExtractorKind::PlainText),
    ("text", ExtractorKind::PlainText),
    ("log", ExtractorKind::PlainText),
    ("csv", ExtractorKind::PlainText),
    ("tsv", ExtractorKind::PlainText),
    ("md", ExtractorKind::PlainText),
    ("markdown", ExtractorKind::PlainText),
    ("rst", ExtractorKind::PlainText),
    // Code
    ("js", ExtractorKind::PlainText),
    ("mjs", ExtractorKind::PlainText),
    ("cjs", ExtractorKind::PlainText),
    ("ts", ExtractorKind::PlainText),
    ("tsx", ExtractorKind::PlainText),
    ("jsx", ExtractorKind::PlainText),
    ("py", ExtractorKind::PlainText),
    ("java", ExtractorKind::PlainText),
    ("rb", ExtractorKind::PlainText),
    ("go", ExtractorKind::PlainText),
    ("c", ExtractorKind::PlainText),
    ("h", ExtractorKind::PlainText),
    ("cpp", ExtractorKind::PlainText),
    ("cc", ExtractorKind::PlainText),
    ("hpp", ExtractorKind::PlainText),
    ("cs", ExtractorKind::PlainText),
    ("php", ExtractorKind::PlainText),
    ("rs", ExtractorKind::PlainText),
    ("swift", ExtractorKind::PlainText),
    ("kt", ExtractorKind::PlainText),
    ("sh", ExtractorKind::PlainText),
    ("bash", ExtractorKind::PlainText),
    ("sql", ExtractorKind::PlainText),
    // Markup & config
    ("html", ExtractorKind::PlainText),
    ("htm", ExtractorKind::PlainText),
    ("css", ExtractorKind::PlainText),
    ("scss", ExtractorKind::PlainText),
    ("less", ExtractorKind::PlainText),
    ("xml", ExtractorKind::PlainText),
    ("json", ExtractorKind::PlainText),
    ("yaml", ExtractorKind::PlainText),
    ("yml", ExtractorKind::PlainText),
    ("toml", ExtractorKind::PlainText),
    ("ini", ExtractorKind::PlainText),
    ("cfg", ExtractorKind::PlainText),
    ("conf", ExtractorKind::PlainText),
    ("env", ExtractorKind::PlainText),
];

static MIME_LOOKUP: Lazy<HashMap<&'static str, ExtractorKind>> =
    Lazy::new(|| MIME_TABLE.iter().copied().collect());

static EXTENSION_LOOKUP: Lazy<HashMap<&'static str, ExtractorKind>> =
    Lazy::new(|| EXTENSION_TABLE.iter().copied().collect());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Accepted(ExtractorKind),
    Rejected(String),
}

/// Resolves the extractor for a file. Pure.
pub fn classify(name: &str, declared_type: &str) -> Classification {
    let mime = normalize_mime(declared_type);

    if mime.starts_with(TEXT_MIME_PREFIX) {
        return Classification::Accepted(ExtractorKind::PlainText);
    }

    if !GENERIC_MIME_TYPES.contains(&mime.as_str()) {
        if let Some(kind) = MIME_LOOKUP.get(mime.as_str()) {
            return Classification::Accepted(*kind);
        }
    }

    match extension(name).and_then(|ext| EXTENSION_LOOKUP.get(ext.as_str())) {
        Some(kind) => Classification::Accepted(*kind),
        None => Classification::Rejected(UNSUPPORTED_REASON.to_string()),
    }
}

/// Lower-cased suffix after the last `.`, if the name has one.
pub fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

// Drops parameters such as "; charset=utf-8".
fn normalize_mime(declared_type: &str) -> String {
    declared_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
