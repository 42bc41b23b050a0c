//! Long-input transcription pipeline.
//!
//! A session plans fixed-length windows, extracts each one, runs the engine
//! on it with retries and a hard timeout, and assembles the results into an
//! ordered transcript while publishing progress to the session store.

pub mod coordinator;
pub mod executor;
pub mod retry;
pub mod transcript;
pub mod types;

pub use coordinator::{Coordinator, PipelineConfig, SessionHandle, SourceMedia, SubmitRequest};
pub use executor::SegmentExecutor;
pub use retry::RetryPolicy;
pub use transcript::{assemble, success_rate};
pub use types::{FailureReason, SegmentOutcome, TranscriptFragment, format_timestamp};
