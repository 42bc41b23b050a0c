//! longscribe - transcription of long recordings in bounded segments
//!
//! Splits an input into fixed-length windows, runs each through an external
//! engine with retries and a hard timeout, and assembles an ordered
//! transcript while publishing pollable progress per session.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod segment;
pub mod session;
pub mod stt;

// Collaborator traits (producer -> engine)
pub use segment::producer::{FfmpegProducer, MockProducer, SegmentProducer};
pub use stt::command::CommandEngine;
pub use stt::engine::{MockEngine, MockReply, TranscriptionEngine};

// Pipeline entry points
pub use pipeline::coordinator::{
    Coordinator, PipelineConfig, SessionHandle, SourceMedia, SubmitRequest,
};
pub use pipeline::types::{FailureReason, SegmentOutcome, TranscriptFragment};
pub use segment::planner::{SegmentWindow, plan, requires_segmentation};

// Sessions
pub use session::{ProgressReporter, SessionState, SessionStatus, SessionStore};

// Error handling
pub use error::{LongscribeError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_has_hash_only_when_built_in_git() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            let hash_part = ver.split('+').nth(1).unwrap_or("");
            assert_eq!(hash_part.len(), 7, "unexpected hash in {}", ver);
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
