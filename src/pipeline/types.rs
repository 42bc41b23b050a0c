//! Data types for per-segment results.

use crate::error::LongscribeError;
use crate::process::head;
use crate::segment::planner::SegmentWindow;
use serde::{Deserialize, Serialize};

/// Maximum characters of producer diagnostics shown in a fragment line.
const PRODUCER_DETAIL_CHARS: usize = 100;

/// Why a segment produced no usable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The segment audio could not be extracted (not retried).
    ProducerError,
    /// The engine failed on every attempt.
    EngineError,
    /// The last attempt exceeded the wall-clock budget.
    Timeout,
    /// The engine succeeded but returned only whitespace.
    EmptyOutput,
}

impl FailureReason {
    /// Classifies an error raised while processing a segment.
    pub fn from_error(error: &LongscribeError) -> Self {
        match error {
            LongscribeError::Timeout { .. } => Self::Timeout,
            LongscribeError::Producer { .. } | LongscribeError::ProducerToolNotFound { .. } => {
                Self::ProducerError
            }
            _ => Self::EngineError,
        }
    }

    /// Whether another engine attempt may help.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::EngineError | Self::Timeout)
    }
}

/// Result of driving one window through producer and engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentOutcome {
    Success {
        text: String,
    },
    Failed {
        reason: FailureReason,
        detail: String,
        /// Engine attempts made (0 when the producer failed).
        attempts: u32,
    },
}

impl SegmentOutcome {
    pub fn failed(reason: FailureReason, detail: impl Into<String>, attempts: u32) -> Self {
        Self::Failed {
            reason,
            detail: detail.into(),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failed { reason, .. } => Some(*reason),
        }
    }
}

/// Timestamped result for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptFragment {
    pub index: usize,
    pub start_offset_secs: f64,
    /// `MM:SS` position of the segment within the source.
    pub rendered_label: String,
    pub outcome: SegmentOutcome,
}

impl TranscriptFragment {
    pub fn new(window: &SegmentWindow, outcome: SegmentOutcome) -> Self {
        Self {
            index: window.index,
            start_offset_secs: window.start_offset_secs,
            rendered_label: format_timestamp(window.start_offset_secs),
            outcome,
        }
    }

    /// One-based segment number.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Transcript line: the label followed by the text or a failure marker.
    pub fn line(&self) -> String {
        let n = self.number();
        let body = match &self.outcome {
            SegmentOutcome::Success { text } => text.clone(),
            SegmentOutcome::Failed {
                reason,
                detail,
                attempts,
            } => match reason {
                FailureReason::EngineError => {
                    format!("SEGMENT {n} FAILED AFTER {attempts} ATTEMPTS")
                }
                FailureReason::Timeout => {
                    format!("SEGMENT {n} TIMED OUT AFTER {attempts} ATTEMPTS")
                }
                FailureReason::EmptyOutput => format!("SEGMENT {n} PRODUCED NO TEXT"),
                FailureReason::ProducerError => {
                    format!("SEGMENT {n} ERROR: {}", head(detail, PRODUCER_DETAIL_CHARS))
                }
            },
        };
        format!("[{}] {}", self.rendered_label, body)
    }
}

/// Renders an offset as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_timestamp(offset_secs: f64) -> String {
    let total = if offset_secs.is_finite() && offset_secs > 0.0 {
        offset_secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::planner::plan;

    fn fragment(index: usize, outcome: SegmentOutcome) -> TranscriptFragment {
        TranscriptFragment::new(&plan(7200.0, 300.0).unwrap()[index], outcome)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(300.0), "05:00");
        assert_eq!(format_timestamp(615.9), "10:15");
        assert_eq!(format_timestamp(6000.0), "100:00");
        assert_eq!(format_timestamp(-1.0), "00:00");
    }

    #[test]
    fn test_success_line() {
        let f = fragment(
            2,
            SegmentOutcome::Success {
                text: "closing remarks".to_string(),
            },
        );
        assert_eq!(f.line(), "[10:00] closing remarks");
        assert!(f.is_success());
    }

    #[test]
    fn test_engine_failure_line() {
        let f = fragment(
            1,
            SegmentOutcome::failed(FailureReason::EngineError, "exit status 1", 2),
        );
        assert_eq!(f.line(), "[05:00] SEGMENT 2 FAILED AFTER 2 ATTEMPTS");
    }

    #[test]
    fn test_timeout_line() {
        let f = fragment(
            0,
            SegmentOutcome::failed(FailureReason::Timeout, "exceeded 300s", 2),
        );
        assert_eq!(f.line(), "[00:00] SEGMENT 1 TIMED OUT AFTER 2 ATTEMPTS");
    }

    #[test]
    fn test_producer_failure_line_truncates_detail() {
        let detail = "x".repeat(250);
        let f = fragment(3, SegmentOutcome::failed(FailureReason::ProducerError, detail, 0));
        let line = f.line();
        assert!(line.starts_with("[15:00] SEGMENT 4 ERROR: "));
        assert_eq!(line.len(), "[15:00] SEGMENT 4 ERROR: ".len() + 100);
    }

    #[test]
    fn test_empty_output_line() {
        let f = fragment(0, SegmentOutcome::failed(FailureReason::EmptyOutput, "", 1));
        assert_eq!(f.line(), "[00:00] SEGMENT 1 PRODUCED NO TEXT");
    }

    #[test]
    fn test_failure_reason_from_error() {
        assert_eq!(
            FailureReason::from_error(&LongscribeError::Timeout {
                limit: std::time::Duration::from_secs(300),
            }),
            FailureReason::Timeout
        );
        assert_eq!(
            FailureReason::from_error(&LongscribeError::Producer {
                message: "bad input".to_string()
            }),
            FailureReason::ProducerError
        );
        assert_eq!(
            FailureReason::from_error(&LongscribeError::EngineToolNotFound {
                program: "uv".to_string()
            }),
            FailureReason::EngineError
        );
        assert!(FailureReason::Timeout.is_retryable());
        assert!(!FailureReason::ProducerError.is_retryable());
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let outcome = SegmentOutcome::failed(FailureReason::Timeout, "slow", 2);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "failed");
        assert_eq!(json["reason"], "timeout");
        assert_eq!(json["attempts"], 2);
    }
}
