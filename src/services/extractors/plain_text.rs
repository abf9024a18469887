use async_trait::async_trait;
use bytes::Bytes;

use super::Extractor;
use crate::error::ExtractionError;

/// Source code, config and other text files.
pub struct PlainTextExtractor;

/// Decodes as UTF-8, substituting U+FFFD for invalid sequences.
pub fn extract_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        Ok(extract_text(&bytes))
    }
}
