pub mod record;
pub mod source;

pub use record::{ContainerLayout, ExtractorKind, FileRecord, FileStatus};
pub use source::{DiskFile, FileSource, IncomingFile};
