pub mod classifier;
pub mod clipboard;
pub mod extractors;
pub mod pipeline;
pub mod registry;
pub mod session;

pub use classifier::{classify, Classification};
pub use extractors::{Extractor, ExtractorSet};
pub use pipeline::{ExtractionPipeline, PipelineObserver, SubmitOutcome};
pub use registry::FileRegistry;
pub use session::{FileSessionStore, MemorySessionStore, SessionCodec, SessionStore};
