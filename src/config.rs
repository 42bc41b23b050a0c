use crate::defaults;
use crate::error::{LongscribeError, Result};
use crate::pipeline::coordinator::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub segmenter: SegmenterConfig,
    pub engine: EngineConfig,
}

/// Segment planning and extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    pub segment_length_secs: u64,
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Directory for intermediate segment artifacts (default: system temp dir)
    pub work_dir: Option<PathBuf>,
}

/// Transcription engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub model: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub attempt_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            segment_length_secs: defaults::SEGMENT_LENGTH_SECS,
            ffmpeg: defaults::FFMPEG_BIN.to_string(),
            ffprobe: defaults::FFPROBE_BIN.to_string(),
            work_dir: None,
        }
    }
}

impl SegmenterConfig {
    /// Work directory, falling back to `<tmp>/longscribe`.
    pub fn resolved_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(defaults::WORK_DIR_NAME))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            program: defaults::ENGINE_PROGRAM.to_string(),
            args: defaults::ENGINE_ARGS.iter().map(|s| s.to_string()).collect(),
            working_dir: None,
            attempt_timeout_secs: defaults::ATTEMPT_TIMEOUT_SECS,
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LongscribeError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                LongscribeError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(LongscribeError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - LONGSCRIBE_MODEL → engine.model
    /// - LONGSCRIBE_ENGINE_PROGRAM → engine.program
    /// - LONGSCRIBE_WORK_DIR → segmenter.work_dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("LONGSCRIBE_MODEL")
            && !model.is_empty()
        {
            self.engine.model = model;
        }

        if let Ok(program) = std::env::var("LONGSCRIBE_ENGINE_PROGRAM")
            && !program.is_empty()
        {
            self.engine.program = program;
        }

        if let Ok(dir) = std::env::var("LONGSCRIBE_WORK_DIR")
            && !dir.is_empty()
        {
            self.segmenter.work_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.segmenter.segment_length_secs == 0 {
            return Err(invalid("segmenter.segment_length_secs", "must be positive"));
        }
        if self.engine.max_attempts == 0 {
            return Err(invalid("engine.max_attempts", "must be at least 1"));
        }
        if self.engine.attempt_timeout_secs == 0 {
            return Err(invalid("engine.attempt_timeout_secs", "must be positive"));
        }
        if self.engine.program.trim().is_empty() {
            return Err(invalid("engine.program", "must not be empty"));
        }
        Ok(())
    }

    /// Pipeline tuning derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            segment_length_secs: self.segmenter.segment_length_secs as f64,
            attempt_timeout: Duration::from_secs(self.engine.attempt_timeout_secs),
            max_attempts: self.engine.max_attempts,
            retry_delay: Duration::from_millis(self.engine.retry_delay_ms),
        }
    }

    /// Serialize back to TOML (for `config show`).
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LongscribeError::ConfigSerialize {
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/longscribe/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("longscribe").join("config.toml"))
            .ok_or_else(|| LongscribeError::Other("Could not determine config directory".to_string()))
    }
}

fn invalid(key: &str, message: &str) -> LongscribeError {
    LongscribeError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
