//! filetext
//!
//! Pulls plain text out of local files (text and source code, PDF, Word,
//! Excel, PowerPoint, Numbers and Pages) and keeps a per-file record of
//! each extraction for a front end to list and copy from.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorCategory, ExtractionError};
pub use models::{ContainerLayout, ExtractorKind, FileRecord, FileSource, FileStatus, IncomingFile};
pub use services::{ExtractionPipeline, FileRegistry, PipelineObserver, SubmitOutcome};
