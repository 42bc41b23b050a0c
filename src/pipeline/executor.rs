//! Segment executor: drives one window through producer and engine.
//!
//! Producer failures are final. Engine failures and timeouts are retried
//! within the attempt budget. The artifact is deleted on every exit path,
//! including when the executing future itself is dropped.

use crate::error::{LongscribeError, Result};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::types::{FailureReason, SegmentOutcome};
use crate::segment::artifact::SegmentArtifact;
use crate::segment::planner::SegmentWindow;
use crate::segment::producer::SegmentProducer;
use crate::stt::engine::TranscriptionEngine;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub struct SegmentExecutor {
    producer: Arc<dyn SegmentProducer>,
    engine: Arc<dyn TranscriptionEngine>,
    attempt_timeout: Duration,
    retry: RetryPolicy,
}

impl SegmentExecutor {
    pub fn new(
        producer: Arc<dyn SegmentProducer>,
        engine: Arc<dyn TranscriptionEngine>,
        attempt_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            producer,
            engine,
            attempt_timeout,
            retry,
        }
    }

    /// Producer and engine in sequence.
    pub async fn execute(&self, source: &Path, window: &SegmentWindow, model: &str) -> SegmentOutcome {
        match self.produce(source, window).await {
            Ok(artifact) => self.transcribe(artifact, model).await,
            Err(e) => producer_outcome(window, &e),
        }
    }

    /// Materialize the artifact for `window`.
    ///
    /// A zero-size file counts as a producer failure and is removed.
    pub async fn produce(&self, source: &Path, window: &SegmentWindow) -> Result<SegmentArtifact> {
        let path = self.producer.produce(source, window).await?;
        let artifact = SegmentArtifact::new(*window, path);
        let empty = artifact.is_empty().map_err(|e| LongscribeError::Producer {
            message: format!("Cannot inspect segment artifact: {}", e),
        })?;
        if empty {
            return Err(LongscribeError::Producer {
                message: format!(
                    "{} produced an empty artifact for segment {}",
                    self.producer.name(),
                    window.number()
                ),
            });
        }
        Ok(artifact)
    }

    /// Run the engine on `artifact` with timeout and retries. Consumes the
    /// artifact; it is deleted before this returns.
    pub async fn transcribe(&self, artifact: SegmentArtifact, model: &str) -> SegmentOutcome {
        let window = *artifact.window();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let call = self
                .engine
                .transcribe(artifact.path(), model, window.start_offset_secs);

            let error = match timeout(self.attempt_timeout, call).await {
                Ok(Ok(text)) => {
                    let text = text.trim();
                    if text.is_empty() {
                        tracing::warn!(segment = window.number(), "engine returned no text");
                        return SegmentOutcome::failed(
                            FailureReason::EmptyOutput,
                            "engine returned no text",
                            attempt,
                        );
                    }
                    tracing::debug!(segment = window.number(), attempt, "segment transcribed");
                    return SegmentOutcome::Success {
                        text: text.to_string(),
                    };
                }
                Ok(Err(e)) => e,
                Err(_) => LongscribeError::Timeout {
                    limit: self.attempt_timeout,
                },
            };

            let reason = FailureReason::from_error(&error);
            tracing::warn!(
                segment = window.number(),
                attempt,
                max_attempts = self.retry.max_attempts(),
                engine = self.engine.name(),
                error = %error,
                "transcription attempt failed"
            );

            if !self.retry.should_retry(attempt, reason) {
                return SegmentOutcome::failed(reason, error.to_string(), attempt);
            }
            self.retry.wait_before_retry(attempt).await;
        }
    }
}

/// Outcome recorded for a window whose artifact could not be produced.
pub fn producer_outcome(window: &SegmentWindow, error: &LongscribeError) -> SegmentOutcome {
    tracing::warn!(segment = window.number(), error = %error, "segment production failed");
    SegmentOutcome::failed(FailureReason::ProducerError, error.to_string(), 0)
}
