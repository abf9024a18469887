//! Format-specific text extractors.
//!
//! Every format is a plain `fn(&[u8]) -> Result<String, ExtractionError>`;
//! the [`Extractor`] trait wraps it so the pipeline can run any of them as an
//! async task and tests can substitute their own.

pub mod container;
pub mod pdf;
pub mod plain_text;
pub mod sheet;
pub mod word;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ExtractionError;
use crate::models::{ContainerLayout, ExtractorKind};

pub use container::ZipXmlExtractor;
pub use pdf::PdfExtractor;
pub use plain_text::PlainTextExtractor;
pub use sheet::SheetExtractor;
pub use word::WordExtractor;

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError>;
}

/// Runs a parsing function on the blocking pool so the control task keeps
/// accepting files while large documents are parsed.
pub(crate) async fn run_blocking<F>(bytes: Bytes, parse: F) -> Result<String, ExtractionError>
where
    F: FnOnce(&[u8]) -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || parse(&bytes))
        .await
        .map_err(|e| ExtractionError::new(format!("extraction task failed: {}", e)))?
}

/// One extractor per [`ExtractorKind`].
#[derive(Clone)]
pub struct ExtractorSet {
    extractors: HashMap<ExtractorKind, Arc<dyn Extractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        let mut extractors: HashMap<ExtractorKind, Arc<dyn Extractor>> = HashMap::new();
        extractors.insert(ExtractorKind::PlainText, Arc::new(PlainTextExtractor));
        extractors.insert(ExtractorKind::PortableDocument, Arc::new(PdfExtractor::new()));
        extractors.insert(ExtractorKind::OfficeOpenXmlWord, Arc::new(WordExtractor));
        extractors.insert(ExtractorKind::OfficeOpenXmlSheet, Arc::new(SheetExtractor));
        for layout in [
            ContainerLayout::SlideDeck,
            ContainerLayout::NumbersWorksheet,
            ContainerLayout::PagesDocument,
        ] {
            extractors.insert(
                ExtractorKind::DelimitedZipXml(layout),
                Arc::new(ZipXmlExtractor::new(layout)),
            );
        }
        Self { extractors }
    }

    /// Replaces the extractor used for `kind`.
    pub fn with_extractor(mut self, kind: ExtractorKind, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.insert(kind, extractor);
        self
    }

    pub fn get(&self, kind: ExtractorKind) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(&kind).cloned()
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self::new()
    }
}
