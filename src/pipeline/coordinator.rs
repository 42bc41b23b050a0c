//! Pipeline coordinator: one background task per session.
//!
//! A session runs in two phases. Segmenting extracts every window's artifact
//! (0 to 30 %), then Transcribing runs the engine on each in index order
//! (30 to 100 %). Cancellation is checked before each unit of work in both
//! phases; a unit already in flight always completes.

use crate::defaults;
use crate::error::{LongscribeError, Result};
use crate::pipeline::executor::{SegmentExecutor, producer_outcome};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::transcript::finalize;
use crate::pipeline::types::TranscriptFragment;
use crate::segment::artifact::{ScopedFile, SegmentArtifact};
use crate::segment::planner::{SegmentWindow, plan};
use crate::segment::producer::SegmentProducer;
use crate::session::progress::{ProgressReporter, segmentation_progress, transcription_progress};
use crate::session::state::{SessionState, SessionStatus};
use crate::session::store::SessionStore;
use crate::stt::engine::TranscriptionEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Tuning of a session run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Fixed window length in seconds
    pub segment_length_secs: f64,
    /// Wall-clock budget of one engine attempt
    pub attempt_timeout: Duration,
    /// Engine attempts per segment (first try included)
    pub max_attempts: u32,
    /// Base delay between attempts, doubled after each
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_length_secs: defaults::SEGMENT_LENGTH_SECS as f64,
            attempt_timeout: Duration::from_secs(defaults::ATTEMPT_TIMEOUT_SECS),
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(defaults::RETRY_DELAY_MS),
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts).with_base_delay(self.retry_delay)
    }
}

/// The media a session transcribes.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMedia {
    path: PathBuf,
    owned: bool,
}

impl SourceMedia {
    /// A permanent copy handed to the pipeline; deleted when the session ends.
    pub fn owned(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: true,
        }
    }

    /// A caller's file; left in place.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    fn into_guard(self) -> ScopedFile {
        if self.owned {
            ScopedFile::new(self.path)
        } else {
            ScopedFile::borrowed(self.path)
        }
    }
}

/// A request to transcribe one long input.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub source: SourceMedia,
    pub model: String,
    pub total_duration_secs: f64,
}

impl SubmitRequest {
    pub fn new(source: SourceMedia, model: impl Into<String>, total_duration_secs: f64) -> Self {
        Self {
            source,
            model: model.into(),
            total_duration_secs,
        }
    }
}

/// Handle to a submitted session.
///
/// Dropping the handle detaches the session; it keeps running.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    task: JoinHandle<SessionStatus>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end and returns its final status.
    pub async fn wait(self) -> SessionStatus {
        self.task.await.unwrap_or(SessionStatus::Error)
    }
}

/// Entry point for submitting, polling and cancelling sessions.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<SessionStore>,
    executor: Arc<SegmentExecutor>,
    config: PipelineConfig,
}

impl Coordinator {
    pub fn new(
        store: Arc<SessionStore>,
        producer: Arc<dyn SegmentProducer>,
        engine: Arc<dyn TranscriptionEngine>,
        config: PipelineConfig,
    ) -> Self {
        let executor = SegmentExecutor::new(
            producer,
            engine,
            config.attempt_timeout,
            config.retry_policy(),
        );
        Self {
            store,
            executor: Arc::new(executor),
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn reporter(&self) -> ProgressReporter {
        ProgressReporter::new(Arc::clone(&self.store))
    }

    /// Registers a session and starts it in the background.
    ///
    /// Returns immediately; the session is visible to pollers in the
    /// `Planning` state before this returns. Must be called from within a
    /// Tokio runtime.
    pub fn submit(&self, request: SubmitRequest) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let state = SessionState::new(&id, &request.model, request.total_duration_secs);
        let cancel = self.store.create(state);

        tracing::info!(
            session_id = %id,
            source = %request.source.path().display(),
            model = %request.model,
            duration_secs = request.total_duration_secs,
            "session submitted"
        );

        let run = SessionRun {
            id: id.clone(),
            store: Arc::clone(&self.store),
            executor: Arc::clone(&self.executor),
            segment_length_secs: self.config.segment_length_secs,
            model: request.model,
            total_duration_secs: request.total_duration_secs,
            source: request.source.into_guard(),
            cancel,
        };
        let span = tracing::info_span!("session", session_id = %id);
        let inner = tokio::spawn(run.run().instrument(span));

        let store = Arc::clone(&self.store);
        let session_id = id.clone();
        let task = tokio::spawn(async move {
            match inner.await {
                Ok(status) => status,
                Err(e) => {
                    let fault = LongscribeError::Coordinator {
                        message: if e.is_panic() {
                            "pipeline task panicked".to_string()
                        } else {
                            "pipeline task aborted".to_string()
                        },
                    };
                    tracing::error!(session_id = %session_id, error = %fault, "session task died");
                    store.update(&session_id, |state| state.fail(fault.to_string()));
                    SessionStatus::Error
                }
            }
        });

        SessionHandle { id, task }
    }

    /// Snapshot of a session, or `None` if unknown or cancelled.
    pub fn poll_progress(&self, session_id: &str) -> Option<SessionState> {
        self.store.get(session_id)
    }

    /// Cancels a session. Returns true if a live session was removed.
    pub fn cancel(&self, session_id: &str) -> bool {
        let removed = self.store.cancel(session_id);
        if removed {
            tracing::info!(session_id, "cancellation requested");
        }
        removed
    }
}

/// Everything the background task of one session owns.
struct SessionRun {
    id: String,
    store: Arc<SessionStore>,
    executor: Arc<SegmentExecutor>,
    segment_length_secs: f64,
    model: String,
    total_duration_secs: f64,
    /// Released (deleted if owned) when the run ends, however it ends.
    source: ScopedFile,
    cancel: CancellationToken,
}

impl SessionRun {
    async fn run(self) -> SessionStatus {
        match self.drive().await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(error = %e, "session failed");
                let message = e.to_string();
                match self.store.update(&self.id, |state| state.fail(message)) {
                    Some(()) => SessionStatus::Error,
                    None => self.cancelled(),
                }
            }
        }
    }

    async fn drive(&self) -> Result<SessionStatus> {
        let windows = self.plan()?;
        let total = windows.len();
        if !self.mutate(|state| {
            state.total_segments = total;
            state.transition(SessionStatus::Segmenting)
        })? {
            return Ok(self.cancelled());
        }
        tracing::info!(segments = total, "segmenting");

        let Some(artifacts) = self.segment(&windows).await? else {
            return Ok(self.cancelled());
        };

        if !self.mutate(|state| state.transition(SessionStatus::Transcribing))? {
            return Ok(self.cancelled());
        }
        tracing::info!("transcribing");

        self.transcribe(&windows, artifacts).await
    }

    fn plan(&self) -> Result<Vec<SegmentWindow>> {
        let duration = self.total_duration_secs;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(LongscribeError::Planning {
                message: format!("Invalid audio duration: {}", duration),
            });
        }
        if !self.source.path().exists() {
            return Err(LongscribeError::Planning {
                message: format!("Source media not found: {}", self.source.path().display()),
            });
        }
        plan(duration, self.segment_length_secs)
    }

    /// Phase one. Returns `None` if cancelled; artifacts produced so far are
    /// dropped (and deleted) on that path.
    async fn segment(&self, windows: &[SegmentWindow]) -> Result<Option<Vec<Option<SegmentArtifact>>>> {
        let total = windows.len();
        let mut artifacts = Vec::with_capacity(total);

        for window in windows {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            let failed = match self.executor.produce(self.source.path(), window).await {
                Ok(artifact) => {
                    artifacts.push(Some(artifact));
                    None
                }
                Err(e) => {
                    artifacts.push(None);
                    Some(TranscriptFragment::new(window, producer_outcome(window, &e)))
                }
            };

            let progress = segmentation_progress(window.number(), total);
            let alive = self.mutate(|state| {
                state.current_segment = window.number();
                if let Some(fragment) = failed {
                    state.fragments.push(fragment);
                }
                state.advance_progress(progress);
                Ok(())
            })?;
            if !alive {
                return Ok(None);
            }
        }
        Ok(Some(artifacts))
    }

    /// Phase two. Windows whose producer failed already have a fragment
    /// and only advance progress.
    async fn transcribe(
        &self,
        windows: &[SegmentWindow],
        artifacts: Vec<Option<SegmentArtifact>>,
    ) -> Result<SessionStatus> {
        let total = windows.len();
        if total == 0 {
            return Err(LongscribeError::Coordinator {
                message: "no segments to transcribe".to_string(),
            });
        }
        let mut remaining = artifacts.into_iter();

        for window in windows {
            let artifact = remaining.next().flatten();
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            let fragment = match artifact {
                Some(artifact) => {
                    if !self.mutate(|state| {
                        state.current_segment = window.number();
                        Ok(())
                    })? {
                        return Ok(self.cancelled());
                    }
                    let outcome = self.executor.transcribe(artifact, &self.model).await;
                    Some(TranscriptFragment::new(window, outcome))
                }
                None => None,
            };

            let done = window.number();
            let alive = self.mutate(|state| {
                if let Some(fragment) = fragment {
                    state.fragments.push(fragment);
                }
                if done == total {
                    finalize(state)
                } else {
                    state.advance_progress(transcription_progress(done, total));
                    Ok(())
                }
            })?;
            if !alive {
                return Ok(self.cancelled());
            }
        }

        if let Some(state) = self.store.get(&self.id) {
            tracing::info!(
                segments = total,
                successful = state.successful_segments.unwrap_or(0),
                success_rate = state.success_rate.unwrap_or(0.0),
                "session completed"
            );
        }
        Ok(SessionStatus::Completed)
    }

    /// Applies a fallible mutation. `Ok(false)` means the session is gone.
    fn mutate(&self, mutation: impl FnOnce(&mut SessionState) -> Result<()>) -> Result<bool> {
        match self.store.update(&self.id, mutation) {
            Some(result) => result.map(|()| true),
            None => Ok(false),
        }
    }

    fn cancelled(&self) -> SessionStatus {
        tracing::info!("session cancelled");
        SessionStatus::Cancelled
    }
}
