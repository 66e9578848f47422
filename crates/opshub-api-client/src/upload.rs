//! Presigned multi-file attachment upload.
//!
//! One batch runs in three steps:
//!
//! 1. negotiate: a single call sends every file's name, type and size and
//!    receives one presigned destination per file;
//! 2. upload: each bound file is PUT directly to its destination, all files
//!    concurrently, with per-file byte progress;
//! 3. complete: every successful PUT is followed by a completion call for its
//!    attachment.
//!
//! Per-file failures are isolated: a failed PUT marks that file only and never
//! cancels siblings. The batch waits for every file to settle and then invokes
//! the caller's refresh exactly once. Nothing is retried, and attachments whose
//! PUT failed are left pending on the server.

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use futures::StreamExt;
use opshub_core::models::{FileMetadata, UploadDestination};
use opshub_core::validation::mime_for_filename;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::io::ReaderStream;

use crate::{ensure_success, ApiClient, ApiError};

/// Receives the cumulative number of bytes sent so far.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

impl LocalFile {
    /// Stat a regular file and derive its upload metadata.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            )
            .into());
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid file name: {}", path.display()),
                )
            })?
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            mime_type: mime_for_filename(&filename).to_string(),
            filename,
            size: meta.len(),
        })
    }

    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Uploading,
    Completed,
    Failed(String),
    /// The server returned no destination for this file.
    Unassigned,
}

impl UploadState {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            UploadState::Completed | UploadState::Failed(_) | UploadState::Unassigned
        )
    }
}

/// Client-side state of one file in a batch.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub file: LocalFile,
    pub destination: Option<UploadDestination>,
    /// 0..=100, never decreases.
    pub progress: u8,
    pub state: UploadState,
}

impl UploadTask {
    pub fn new(file: LocalFile) -> Self {
        Self {
            file,
            destination: None,
            progress: 0,
            state: UploadState::Pending,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            UploadState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Raise progress. Lower values and updates after settling are ignored.
    pub fn advance(&mut self, percent: u8) -> bool {
        if self.state.is_settled() || percent <= self.progress {
            return false;
        }
        self.progress = percent.min(100);
        true
    }
}

/// Rounded percentage of `loaded` over `total`. An empty file counts as done.
pub fn progress_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (loaded as f64 * 100.0 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Monotonic percentage shared between a PUT body stream and its task.
struct ProgressTracker {
    total: u64,
    last: AtomicU8,
}

impl ProgressTracker {
    fn new(total: u64) -> Self {
        Self {
            total,
            last: AtomicU8::new(0),
        }
    }

    /// New percentage if it moved forward.
    fn record(&self, loaded: u64) -> Option<u8> {
        let pct = progress_percent(loaded, self.total);
        let prev = self.last.fetch_max(pct, Ordering::Relaxed);
        (pct > prev).then_some(pct)
    }

    fn current(&self) -> u8 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Lifecycle notifications for live rendering. `task` is the file's index in
/// the selection, which stays unambiguous when filenames repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Negotiated {
        task: usize,
        filename: String,
        attachment_id: i64,
    },
    Progress {
        task: usize,
        filename: String,
        percent: u8,
    },
    Completed {
        task: usize,
        filename: String,
        attachment_id: i64,
    },
    Failed {
        task: usize,
        filename: String,
        reason: String,
    },
}

/// Terminal state of one file once its batch has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRow {
    pub filename: String,
    pub size: u64,
    pub progress: u8,
    pub state: UploadState,
    pub attachment_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub rows: Vec<UploadRow>,
}

impl BatchReport {
    fn from_tasks(tasks: &[UploadTask]) -> Self {
        let rows = tasks
            .iter()
            .map(|t| UploadRow {
                filename: t.file.filename.clone(),
                size: t.file.size,
                progress: t.progress,
                state: t.state.clone(),
                attachment_id: t.destination.as_ref().map(|d| d.attachment_id),
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, UploadState::Completed))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UploadState::Failed(_)))
    }

    pub fn unassigned(&self) -> usize {
        self.count(|s| matches!(s, UploadState::Unassigned))
    }

    pub fn all_succeeded(&self) -> bool {
        self.completed() == self.rows.len()
    }

    fn count(&self, pred: impl Fn(&UploadState) -> bool) -> usize {
        self.rows.iter().filter(|r| pred(&r.state)).count()
    }
}

/// Backend operations the orchestrator depends on.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Request one destination per file in a single call.
    async fn negotiate(
        &self,
        lesson_id: i64,
        files: &[FileMetadata],
    ) -> Result<Vec<UploadDestination>, ApiError>;

    /// PUT the file's bytes to its presigned destination.
    async fn put_file(
        &self,
        destination: &UploadDestination,
        file: &LocalFile,
        on_progress: ProgressFn,
    ) -> Result<(), ApiError>;

    /// Tell the backend the attachment's bytes are in place.
    async fn complete(&self, attachment_id: i64) -> Result<(), ApiError>;
}

#[async_trait]
impl UploadBackend for ApiClient {
    async fn negotiate(
        &self,
        lesson_id: i64,
        files: &[FileMetadata],
    ) -> Result<Vec<UploadDestination>, ApiError> {
        self.generate_upload_urls(lesson_id, files).await
    }

    async fn put_file(
        &self,
        destination: &UploadDestination,
        file: &LocalFile,
        on_progress: ProgressFn,
    ) -> Result<(), ApiError> {
        let handle = tokio::fs::File::open(&file.path).await?;
        let mut sent: u64 = 0;
        let body = ReaderStream::new(handle).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                on_progress(sent);
            }
            chunk
        });

        // Presigned URLs carry their own authorization; no bearer header here.
        let response = self
            .client()
            .put(&destination.upload_url)
            .header(CONTENT_TYPE, file.mime_type.as_str())
            .header(CONTENT_LENGTH, file.size)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn complete(&self, attachment_id: i64) -> Result<(), ApiError> {
        self.complete_upload(attachment_id).await?;
        Ok(())
    }
}

/// Runs upload batches against an [`UploadBackend`].
pub struct UploadOrchestrator<B> {
    backend: B,
    events: Option<UnboundedSender<UploadEvent>>,
}

impl<B: UploadBackend> UploadOrchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Upload `files` as attachments of `lesson_id`.
    ///
    /// `refresh` runs exactly once after the batch settles, whether files
    /// succeeded, failed, or negotiation itself failed. An empty selection
    /// does nothing and does not refresh.
    ///
    /// Returns the negotiation error if no destinations could be obtained;
    /// per-file failures are reported in the [`BatchReport`] instead.
    pub async fn upload<R, Fut>(
        &self,
        lesson_id: i64,
        files: Vec<LocalFile>,
        refresh: R,
    ) -> Result<BatchReport, ApiError>
    where
        R: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if files.is_empty() {
            tracing::debug!(lesson_id, "No files selected, nothing to upload");
            return Ok(BatchReport::default());
        }

        let mut tasks: Vec<UploadTask> = files.into_iter().map(UploadTask::new).collect();
        let result = self.run_batch(lesson_id, &mut tasks).await;

        refresh().await;

        let report = BatchReport::from_tasks(&tasks);
        match result {
            Ok(()) => {
                tracing::info!(
                    lesson_id,
                    completed = report.completed(),
                    failed = report.failed(),
                    unassigned = report.unassigned(),
                    "Upload batch settled"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(lesson_id, error = %e, "Could not prepare files for upload");
                Err(e)
            }
        }
    }

    async fn run_batch(&self, lesson_id: i64, tasks: &mut [UploadTask]) -> Result<(), ApiError> {
        let metadata: Vec<FileMetadata> = tasks.iter().map(|t| t.file.metadata()).collect();
        let destinations = self.backend.negotiate(lesson_id, &metadata).await?;

        self.bind_destinations(tasks, destinations);

        let jobs = tasks
            .iter_mut()
            .enumerate()
            .filter(|(_, task)| task.destination.is_some())
            .map(|(index, task)| self.run_task(index, task));
        join_all(jobs).await;
        Ok(())
    }

    /// Correlate destinations with tasks by filename. Each destination binds
    /// the first unbound task of that name; destinations for unknown names or
    /// repeated URLs are dropped.
    fn bind_destinations(&self, tasks: &mut [UploadTask], destinations: Vec<UploadDestination>) {
        let mut seen_urls = HashSet::new();
        for destination in destinations {
            if !seen_urls.insert(destination.upload_url.clone()) {
                tracing::warn!(
                    filename = %destination.filename,
                    attachment_id = destination.attachment_id,
                    "Ignoring duplicate upload destination"
                );
                continue;
            }
            let slot = tasks
                .iter_mut()
                .enumerate()
                .find(|(_, t)| t.destination.is_none() && t.file.filename == destination.filename);
            match slot {
                Some((index, task)) => {
                    self.emit(UploadEvent::Negotiated {
                        task: index,
                        filename: destination.filename.clone(),
                        attachment_id: destination.attachment_id,
                    });
                    task.destination = Some(destination);
                }
                None => tracing::warn!(
                    filename = %destination.filename,
                    "Ignoring upload destination for a file that was not selected"
                ),
            }
        }

        for (index, task) in tasks.iter_mut().enumerate() {
            if task.destination.is_none() {
                task.state = UploadState::Unassigned;
                self.emit(UploadEvent::Failed {
                    task: index,
                    filename: task.file.filename.clone(),
                    reason: "No upload destination returned".to_string(),
                });
            }
        }
    }

    async fn run_task(&self, index: usize, task: &mut UploadTask) {
        let Some(destination) = task.destination.clone() else {
            return;
        };
        task.state = UploadState::Uploading;

        let tracker = Arc::new(ProgressTracker::new(task.file.size));
        let on_progress: ProgressFn = {
            let tracker = Arc::clone(&tracker);
            let events = self.events.clone();
            let filename = task.file.filename.clone();
            Arc::new(move |loaded| {
                if let (Some(percent), Some(tx)) = (tracker.record(loaded), &events) {
                    let _ = tx.send(UploadEvent::Progress {
                        task: index,
                        filename: filename.clone(),
                        percent,
                    });
                }
            })
        };

        let outcome = match self
            .backend
            .put_file(&destination, &task.file, on_progress)
            .await
        {
            Ok(()) => self
                .backend
                .complete(destination.attachment_id)
                .await
                .map_err(|e| format!("Could not finalize upload: {}", e)),
            Err(e) => Err(format!("Upload failed: {}", e)),
        };

        task.advance(tracker.current());
        match outcome {
            Ok(()) => {
                task.advance(100);
                task.state = UploadState::Completed;
                tracing::debug!(
                    filename = %task.file.filename,
                    attachment_id = destination.attachment_id,
                    "Upload complete"
                );
                self.emit(UploadEvent::Completed {
                    task: index,
                    filename: task.file.filename.clone(),
                    attachment_id: destination.attachment_id,
                });
            }
            Err(reason) => {
                tracing::warn!(filename = %task.file.filename, %reason, "Upload failed");
                task.state = UploadState::Failed(reason.clone());
                self.emit(UploadEvent::Failed {
                    task: index,
                    filename: task.file.filename.clone(),
                    reason,
                });
            }
        }
    }

    fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
