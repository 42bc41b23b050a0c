//! Transcription engine backed by an external command.
//!
//! The command line is an argument template; `{model}`, `{offset}` and
//! `{input}` are substituted per call. The engine prints the transcription
//! on stdout and signals failure with a non-zero exit status.

use crate::config::EngineConfig;
use crate::error::{LongscribeError, Result};
use crate::process::run_tool;
use crate::segment::planner::format_seconds;
use crate::stt::engine::TranscriptionEngine;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            // An empty string in the config file means "inherit".
            working_dir: config
                .working_dir
                .clone()
                .filter(|dir| !dir.as_os_str().is_empty()),
        }
    }

    /// Run the engine from this directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Expand the argument template for one call.
    pub fn expand_args(&self, artifact: &Path, model: &str, offset_secs: f64) -> Vec<String> {
        let offset = format_seconds(offset_secs);
        let input = artifact.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{model}", model)
                    .replace("{offset}", &offset)
                    .replace("{input}", &input)
            })
            .collect()
    }
}

#[async_trait]
impl TranscriptionEngine for CommandEngine {
    async fn transcribe(&self, artifact: &Path, model: &str, offset_secs: f64) -> Result<String> {
        let args = self.expand_args(artifact, model, offset_secs);
        let output = run_tool(&self.program, &args, self.working_dir.as_deref())
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    LongscribeError::EngineToolNotFound {
                        program: self.program.clone(),
                    }
                } else {
                    LongscribeError::Engine {
                        message: format!("Failed to execute {}: {}", self.program, e),
                    }
                }
            })?;

        if !output.success() {
            return Err(LongscribeError::Engine {
                message: output.failure_message(&self.program),
            });
        }

        Ok(output.stdout.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.program
    }
}
