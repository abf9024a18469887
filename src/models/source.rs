use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

/// A file handed to the pipeline by the front end.
///
/// Metadata is read synchronously at submission time; the content is only
/// read once an extractor has been scheduled.
#[async_trait]
pub trait FileSource: Send + Sync {
    fn name(&self) -> &str;

    /// Declared MIME type. May be empty or wrong.
    fn mime_type(&self) -> &str;

    fn size(&self) -> u64;

    async fn read_bytes(&self) -> std::io::Result<Bytes>;
}

/// File whose content is already held in memory.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub size: u64,
    pub content: Bytes,
    pub mime_type: String,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            content,
            mime_type: String::new(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Overrides the reported size, for sources that report a size
    /// different from the bytes they end up yielding.
    pub fn with_reported_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}

#[async_trait]
impl FileSource for IncomingFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_bytes(&self) -> std::io::Result<Bytes> {
        Ok(self.content.clone())
    }
}

/// File on the local disk, read lazily with `tokio::fs`.
///
/// Local paths carry no MIME type, so classification relies on the
/// extension.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl DiskFile {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            size: metadata.len(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        ""
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_bytes(&self) -> std::io::Result<Bytes> {
        tokio::fs::read(&self.path).await.map(Bytes::from)
    }
}

#[async_trait]
impl<T: FileSource + ?Sized> FileSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn mime_type(&self) -> &str {
        (**self).mime_type()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    async fn read_bytes(&self) -> std::io::Result<Bytes> {
        (**self).read_bytes().await
    }
}
