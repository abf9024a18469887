//! Drives files from submission to a settled record.
//!
//! The pipeline owns the registry and is its only writer. Extractions run as
//! tokio tasks that never see the registry; they report back over a channel
//! and the owner applies each completion in [`ExtractionPipeline::settle_next`].
//! A completion is applied only if the record it was started for still
//! exists, so removing a file mid-extraction simply drops the result.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, STORAGE_KEY};
use crate::error::{AppError, AppResult, ErrorCategory, ExtractionError};
use crate::models::{ExtractorKind, FileRecord, FileSource, FileStatus};
use crate::services::classifier::{classify, Classification};
use crate::services::extractors::{Extractor, ExtractorSet};
use crate::services::registry::FileRegistry;
use crate::services::session::{SessionCodec, SessionStore};

/// Receives registry changes and error banners. Implemented by front ends.
pub trait PipelineObserver: Send + Sync {
    /// Called with the whole registry, in listing order, after any change.
    fn records_changed(&self, registry: &FileRegistry);

    /// Called once per failure worth surfacing to the user.
    fn error_occurred(&self, _category: ErrorCategory, _message: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A record with the same name already exists.
    Skipped,
    /// Recorded straight away as an error; nothing was scheduled.
    Rejected(ErrorCategory),
    /// Extraction started; the record is `Loading`.
    Scheduled(ExtractorKind),
}

struct Completion {
    name: String,
    ticket: u64,
    run_id: String,
    processing_time_ms: u64,
    outcome: Result<String, ExtractionError>,
}

struct SessionPersistence {
    store: Arc<dyn SessionStore>,
    codec: SessionCodec,
}

pub struct ExtractionPipeline {
    max_file_size_bytes: u64,
    session_quota_bytes: usize,
    registry: FileRegistry,
    extractors: ExtractorSet,
    observers: Vec<Arc<dyn PipelineObserver>>,
    session: Option<SessionPersistence>,
    permits: Arc<Semaphore>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
    next_ticket: u64,
}

impl ExtractionPipeline {
    pub fn new(config: &Config) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            session_quota_bytes: config.session_quota_bytes,
            registry: FileRegistry::new(),
            extractors: ExtractorSet::new(),
            observers: Vec::new(),
            session: None,
            permits: Arc::new(Semaphore::new(config.max_concurrent_extractions)),
            completions_tx,
            completions_rx,
            in_flight: 0,
            next_ticket: 0,
        }
    }

    pub fn with_extractors(mut self, extractors: ExtractorSet) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session = Some(SessionPersistence {
            store,
            codec: SessionCodec::new(self.session_quota_bytes),
        });
        self
    }

    pub fn subscribe(&mut self, observer: Arc<dyn PipelineObserver>) {
        self.observers.push(observer);
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    /// Extractions started but not yet settled, including ones whose record
    /// has since been removed.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Replaces the registry with the last session snapshot. A missing or
    /// unreadable snapshot leaves an empty registry.
    pub fn restore(&mut self) -> usize {
        let Some(session) = &self.session else {
            return self.registry.len();
        };

        let blob = match session.store.read(STORAGE_KEY) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Failed to read session snapshot");
                self.report(&e);
                None
            }
        };
        self.registry = session.codec.load(blob.as_deref());
        self.notify_changed();
        self.registry.len()
    }

    /// Accepts one file. Must be called from within a tokio runtime.
    pub fn submit<F>(&mut self, file: F) -> SubmitOutcome
    where
        F: FileSource + 'static,
    {
        let outcome = self.accept(Box::new(file));
        if outcome != SubmitOutcome::Skipped {
            self.notify_changed();
            self.persist();
        }
        outcome
    }

    /// Accepts several files at once, notifying and persisting once for the
    /// whole batch. Extractions run independently of each other.
    pub fn submit_batch<I, F>(&mut self, files: I) -> Vec<SubmitOutcome>
    where
        I: IntoIterator<Item = F>,
        F: FileSource + 'static,
    {
        let outcomes: Vec<SubmitOutcome> = files
            .into_iter()
            .map(|file| self.accept(Box::new(file)))
            .collect();

        let scheduled = outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Scheduled(_)))
            .count();
        info!(
            submitted = outcomes.len(),
            scheduled = scheduled,
            "Batch accepted"
        );

        if outcomes.iter().any(|o| *o != SubmitOutcome::Skipped) {
            self.notify_changed();
            self.persist();
        }
        outcomes
    }

    /// Deletes a record whatever its state. An extraction still running for
    /// it keeps running, and its result is discarded.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(record) = self.registry.delete(name) else {
            return false;
        };
        info!(file_name = %name, status = ?record.status(), "File removed");
        self.notify_changed();
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        let removed = self.registry.len();
        self.registry.clear();
        info!(removed = removed, "All files cleared");
        self.notify_changed();
        self.persist();
    }

    /// Waits for the next extraction to finish and applies it. Returns
    /// `false` when nothing is in flight.
    pub async fn settle_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        let Some(completion) = self.completions_rx.recv().await else {
            return false;
        };
        self.in_flight -= 1;
        self.apply(completion);
        true
    }

    /// Settles every extraction currently in flight.
    pub async fn run_until_idle(&mut self) {
        while self.settle_next().await {}
    }

    /// Writes the current registry to the session store.
    pub fn snapshot(&self) -> AppResult<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let blob = session.codec.save(&self.registry)?;
        session.store.write(STORAGE_KEY, &blob)?;
        debug!(bytes = blob.len(), files = self.registry.len(), "Session snapshot saved");
        Ok(())
    }

    fn accept(&mut self, file: Box<dyn FileSource>) -> SubmitOutcome {
        let name = file.name().to_string();

        if self.registry.contains(&name) {
            debug!(file_name = %name, "File already present, skipping");
            return SubmitOutcome::Skipped;
        }

        let size = file.size();
        let declared_type = file.mime_type().to_string();

        if size > self.max_file_size_bytes {
            let err = AppError::FileTooLarge {
                name: name.clone(),
                size,
                limit: self.max_file_size_bytes,
            };
            return self.reject(FileRecord::queued(&name, size, declared_type, None), err);
        }

        let kind = match classify(&name, &declared_type) {
            Classification::Accepted(kind) => kind,
            Classification::Rejected(reason) => {
                let err = AppError::unsupported(&name, reason);
                return self.reject(FileRecord::queued(&name, size, declared_type, None), err);
            }
        };

        let record = FileRecord::queued(&name, size, declared_type, Some(kind));
        let Some(extractor) = self.extractors.get(kind) else {
            let err = AppError::ExtractionFailed {
                name: name.clone(),
                message: format!("no extractor available for {}", kind),
            };
            return self.reject(record, err);
        };

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let mut record = record;
        record.start_loading(ticket);
        self.registry.insert(record);
        self.spawn_extraction(name, ticket, kind, file, extractor);

        SubmitOutcome::Scheduled(kind)
    }

    fn reject(&mut self, mut record: FileRecord, err: AppError) -> SubmitOutcome {
        let category = err.category().unwrap_or(ErrorCategory::ExtractionFailure);
        warn!(
            file_name = %record.name(),
            error_code = err.error_code(),
            "File rejected: {}",
            err
        );
        record.mark_failed(category, err.record_message());
        self.registry.insert(record);
        self.report(&err);
        SubmitOutcome::Rejected(category)
    }

    fn spawn_extraction(
        &mut self,
        name: String,
        ticket: u64,
        kind: ExtractorKind,
        file: Box<dyn FileSource>,
        extractor: Arc<dyn Extractor>,
    ) {
        let run_id = Uuid::new_v4().to_string()[..8].to_string();
        let permits = Arc::clone(&self.permits);
        let tx = self.completions_tx.clone();

        info!(
            run_id = %run_id,
            file_name = %name,
            file_size = file.size(),
            kind = %kind,
            "Starting text extraction"
        );

        self.in_flight += 1;
        tokio::spawn(async move {
            let start = Instant::now();
            let _permit = permits.acquire_owned().await.ok();

            // Run in a child task so a panicking extractor still reports.
            let outcome = match tokio::spawn(async move {
                let bytes = file
                    .read_bytes()
                    .await
                    .map_err(|e| ExtractionError::new(format!("could not read file: {}", e)))?;
                extractor.extract(bytes).await
            })
            .await
            {
                Ok(outcome) => outcome,
                Err(e) => Err(ExtractionError::new(format!("extraction task failed: {}", e))),
            };

            let completion = Completion {
                name,
                ticket,
                run_id,
                processing_time_ms: start.elapsed().as_millis() as u64,
                outcome,
            };
            // The receiver lives as long as the pipeline.
            let _ = tx.send(completion);
        });
    }

    fn apply(&mut self, completion: Completion) {
        let Completion {
            name,
            ticket,
            run_id,
            processing_time_ms,
            outcome,
        } = completion;

        let Some(record) = self
            .registry
            .get_mut(&name)
            .filter(|r| r.ticket() == ticket && r.status() == FileStatus::Loading)
        else {
            debug!(run_id = %run_id, file_name = %name, "File removed during extraction, discarding result");
            return;
        };

        let failure = match outcome {
            Ok(text) => {
                info!(
                    run_id = %run_id,
                    file_name = %name,
                    text_length = text.len(),
                    processing_time_ms = processing_time_ms,
                    "Text extraction completed"
                );
                record.mark_ready(text);
                None
            }
            Err(e) => {
                error!(
                    run_id = %run_id,
                    file_name = %name,
                    processing_time_ms = processing_time_ms,
                    error = %e,
                    "Text extraction failed"
                );
                record.mark_failed(ErrorCategory::ExtractionFailure, e.message());
                Some(AppError::extraction(&name, &e))
            }
        };

        if let Some(err) = failure {
            self.report(&err);
        }
        self.notify_changed();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.snapshot() {
            warn!(error_code = e.error_code(), "Failed to save session snapshot: {}", e);
            self.report(&e);
        }
    }

    fn notify_changed(&self) {
        for observer in &self.observers {
            observer.records_changed(&self.registry);
        }
    }

    fn report(&self, err: &AppError) {
        let Some(category) = err.category() else {
            return;
        };
        let message = err.to_string();
        for observer in &self.observers {
            observer.error_occurred(category, &message);
        }
    }
}
