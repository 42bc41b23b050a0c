//! Command-line interface for longscribe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Transcribe long recordings in bounded segments
#[derive(Parser, Debug)]
#[command(
    name = "longscribe",
    version,
    about = "Transcribe long recordings in bounded segments"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress progress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug logs, -vv: trace logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a duration string into seconds.
///
/// Accepts bare numbers (seconds, fractions allowed) and anything
/// `humantime` understands (`90s`, `12m`, `1h30m`).
fn parse_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        return if secs.is_finite() && secs > 0.0 {
            Ok(secs)
        } else {
            Err(format!("duration must be positive, got {}", s))
        };
    }
    humantime::parse_duration(s)
        .map_err(|e| e.to_string())
        .and_then(|d| {
            if d.is_zero() {
                Err("duration must be positive".to_string())
            } else {
                Ok(d.as_secs_f64())
            }
        })
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a media file
    Transcribe {
        /// Audio or video file to transcribe
        file: PathBuf,

        /// Model identifier passed to the engine
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// Total duration (skips probing). Examples: 700, 11m40s
        #[arg(long, value_name = "DURATION", value_parser = parse_secs)]
        duration: Option<f64>,

        /// Print the final session state as JSON instead of the transcript
        #[arg(long)]
        json: bool,

        /// Write the transcript to this file
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the duration of a media file and its segment plan
    Probe {
        /// Audio or video file to inspect
        file: PathBuf,
    },

    /// Show the segment plan for a duration
    Plan {
        /// Total duration. Examples: 700, 2h
        #[arg(value_parser = parse_secs)]
        duration: f64,

        /// Segment length (default: from config)
        #[arg(long, value_name = "DURATION", value_parser = parse_secs)]
        segment_length: Option<f64>,
    },

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file location
    Path,
    /// Print the effective configuration as TOML
    Show,
}
