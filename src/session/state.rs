//! Session state machine and the mutable per-session aggregate.

use crate::error::{LongscribeError, Result};
use crate::pipeline::types::TranscriptFragment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a session.
///
/// ```text
/// Planning -> Segmenting -> Transcribing -> Completed
///     \            \             \
///      +------------+-------------+--> Error | Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Planning,
    Segmenting,
    Transcribing,
    Completed,
    Error,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Error | Cancelled) => true,
            (Planning, Segmenting) | (Segmenting, Transcribing) | (Transcribing, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Segmenting => "segmenting",
            Self::Transcribing => "transcribing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a poller can observe about one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub model: String,
    pub status: SessionStatus,
    pub total_duration_secs: f64,
    pub total_segments: usize,
    /// 1-based number of the last segment dispatched (0 before any).
    pub current_segment: usize,
    /// Fragments in completion order.
    pub fragments: Vec<TranscriptFragment>,
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
    pub final_transcript: Option<String>,
    pub success_rate: Option<f64>,
    pub successful_segments: Option<usize>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, model: impl Into<String>, total_duration_secs: f64) -> Self {
        Self {
            session_id: session_id.into(),
            model: model.into(),
            status: SessionStatus::Planning,
            total_duration_secs,
            total_segments: 0,
            current_segment: 0,
            fragments: Vec::new(),
            progress_percent: 0.0,
            created_at: Utc::now(),
            error: None,
            final_transcript: None,
            success_rate: None,
            successful_segments: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, rejecting backward or post-terminal transitions.
    pub fn transition(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LongscribeError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Raise progress to `percent`; never lowers it.
    pub fn advance_progress(&mut self, percent: f64) {
        let clamped = percent.clamp(0.0, 100.0);
        if clamped > self.progress_percent {
            self.progress_percent = clamped;
        }
    }

    /// Marks the session failed. No-op once terminal.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = SessionStatus::Error;
        self.error = Some(message.into());
    }
}
