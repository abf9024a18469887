use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// User-facing failure category, carried by error records and banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UnsupportedFormat,
    TooLarge,
    ExtractionFailure,
    PersistenceFailure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UnsupportedFormat => "unsupported_format",
            ErrorCategory::TooLarge => "too_large",
            ErrorCategory::ExtractionFailure => "extraction_failure",
            ErrorCategory::PersistenceFailure => "persistence_failure",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported file type: {name}")]
    UnsupportedFormat { name: String, reason: String },

    #[error("File too large: {name} is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("Failed to process {name}: {message}")]
    ExtractionFailed { name: String, message: String },

    #[error("Session storage failed: {message}")]
    PersistenceFailed { message: String },

    #[error("Session quota exceeded: snapshot is {size} bytes, quota is {quota} bytes")]
    QuotaExceeded { size: usize, quota: usize },

    #[error("File not found: {name}")]
    NotFound { name: String },

    #[error("No extracted text available for {name}")]
    NothingToCopy { name: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::ExtractionFailed { .. } => "EXTRACTION_FAILED",
            AppError::PersistenceFailed { .. } => "PERSISTENCE_FAILED",
            AppError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::NothingToCopy { .. } => "NOTHING_TO_COPY",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Maps the error onto the category shown to the user, if it has one.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            AppError::UnsupportedFormat { .. } => Some(ErrorCategory::UnsupportedFormat),
            AppError::FileTooLarge { .. } => Some(ErrorCategory::TooLarge),
            AppError::ExtractionFailed { .. } => Some(ErrorCategory::ExtractionFailure),
            AppError::PersistenceFailed { .. } | AppError::QuotaExceeded { .. } => {
                Some(ErrorCategory::PersistenceFailure)
            }
            AppError::NotFound { .. }
            | AppError::NothingToCopy { .. }
            | AppError::Internal { .. } => None,
        }
    }

    /// Short reason stored on a failed file record.
    pub fn record_message(&self) -> String {
        match self {
            AppError::UnsupportedFormat { reason, .. } => reason.clone(),
            AppError::FileTooLarge { .. } => "file too large".to_string(),
            AppError::ExtractionFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Diagnostic produced by an extractor that could not turn bytes into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExtractionError {
    message: String,
}

impl ExtractionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn pdf(cause: impl std::fmt::Display) -> Self {
        Self::new(format!("PDF extraction failed: {}", cause))
    }

    pub fn container() -> Self {
        Self::new("could not open container")
    }

    pub fn missing_part(path: &str) -> Self {
        Self::new(format!("could not find {} in container", path))
    }

    pub fn malformed_xml(path: &str, cause: impl std::fmt::Display) -> Self {
        Self::new(format!("malformed XML in {}: {}", path, cause))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// Convert common errors to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::PersistenceFailed {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::PersistenceFailed {
            message: format!("JSON error: {}", err),
        }
    }
}

// Helper methods for creating specific errors
impl AppError {
    pub fn unsupported(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::UnsupportedFormat {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn extraction(name: impl Into<String>, err: &ExtractionError) -> Self {
        AppError::ExtractionFailed {
            name: name.into(),
            message: err.message().to_string(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        AppError::PersistenceFailed {
            message: message.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        AppError::NotFound { name: name.into() }
    }

    pub fn nothing_to_copy(name: impl Into<String>) -> Self {
        AppError::NothingToCopy { name: name.into() }
    }
}
