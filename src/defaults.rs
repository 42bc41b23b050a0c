//! Default configuration constants for longscribe.
//!
//! Shared between the configuration file defaults and the pipeline so that
//! both agree on the reference behavior.

/// Fixed length of one segment window in seconds.
pub const SEGMENT_LENGTH_SECS: u64 = 300;

/// Wall-clock budget for one transcription attempt, in seconds.
pub const ATTEMPT_TIMEOUT_SECS: u64 = 300;

/// Maximum number of engine attempts per segment (first try included).
pub const MAX_ATTEMPTS: u32 = 2;

/// Delay before a retried attempt, in milliseconds. Zero retries immediately.
pub const RETRY_DELAY_MS: u64 = 0;

/// Upper bound on the windows one session may plan.
pub const MAX_SEGMENTS: usize = 100_000;

/// Default transcription model identifier handed to the engine.
pub const DEFAULT_MODEL: &str = "kyutai/stt-2.6b-en";

/// Sample rate of produced segment artifacts in Hz (mono, 16-bit PCM).
pub const SAMPLE_RATE: u32 = 16000;

/// Share of the progress bar owned by the segmentation phase, in percent.
///
/// Transcription owns the remaining band up to 100.
pub const SEGMENTATION_BAND: f64 = 30.0;

/// Default segment producer binary.
pub const FFMPEG_BIN: &str = "ffmpeg";

/// Default duration probe binary.
pub const FFPROBE_BIN: &str = "ffprobe";

/// Default transcription engine program.
pub const ENGINE_PROGRAM: &str = "uv";

/// Default engine argument template.
///
/// Placeholders: `{model}`, `{offset}` (segment start in seconds), `{input}`
/// (artifact path).
pub const ENGINE_ARGS: &[&str] = &[
    "run",
    "scripts/stt_from_file_pytorch.py",
    "--hf-repo",
    "{model}",
    "--offset-seconds",
    "{offset}",
    "{input}",
];

/// Name of the artifact directory created under the system temp dir.
pub const WORK_DIR_NAME: &str = "longscribe";

/// Polling interval used by the CLI while following a session, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 500;
