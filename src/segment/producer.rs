//! Segment producers: materialize one window of the source as a decoded
//! mono 16 kHz 16-bit PCM WAV file.

use crate::config::SegmenterConfig;
use crate::defaults::SAMPLE_RATE;
use crate::error::{LongscribeError, Result};
use crate::process::{ToolOutput, run_tool};
use crate::segment::artifact::ScopedFile;
use crate::segment::planner::{SegmentWindow, format_seconds};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Extracts the audio of one window into its own file.
///
/// Object-safe, Send + Sync so one producer can serve many sessions.
#[async_trait]
pub trait SegmentProducer: Send + Sync {
    /// Produce the artifact for `window` from `source`.
    ///
    /// Returns the path of the written file. The caller owns the file from
    /// then on and deletes it when done.
    async fn produce(&self, source: &Path, window: &SegmentWindow) -> Result<PathBuf>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Producer backed by the `ffmpeg` command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegProducer {
    ffmpeg: String,
    ffprobe: String,
    work_dir: PathBuf,
}

impl FfmpegProducer {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>, work_dir: PathBuf) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            work_dir,
        }
    }

    pub fn from_config(config: &SegmenterConfig) -> Self {
        Self::new(&config.ffmpeg, &config.ffprobe, config.resolved_work_dir())
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Arguments for extracting `window` of `source` into `output`.
    pub fn segment_args(source: &Path, window: &SegmentWindow, output: &Path) -> Vec<String> {
        vec![
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format_seconds(window.start_offset_secs),
            "-t".to_string(),
            format_seconds(window.length_secs),
            "-i".to_string(),
            source.display().to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            output.display().to_string(),
        ]
    }

    /// Arguments for asking `ffprobe` for the container duration.
    pub fn probe_args(source: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "csv=p=0".to_string(),
            source.display().to_string(),
        ]
    }

    /// Determines the total duration of `source` in seconds.
    ///
    /// Any failure is a planning fault: without a duration no plan exists.
    pub async fn probe_duration(&self, source: &Path) -> Result<f64> {
        let output = run_tool(&self.ffprobe, &Self::probe_args(source), None)
            .await
            .map_err(|e| tool_error(&self.ffprobe, e))?;
        if !output.success() {
            return Err(LongscribeError::Planning {
                message: format!(
                    "Could not determine audio duration: {}",
                    output.failure_message(&self.ffprobe)
                ),
            });
        }
        parse_duration(&output.stdout)
    }

    fn check(&self, output: &ToolOutput, path: &Path) -> Result<()> {
        if !output.success() {
            return Err(LongscribeError::Producer {
                message: output.failure_message(&self.ffmpeg),
            });
        }
        if !path.exists() {
            return Err(LongscribeError::Producer {
                message: format!("{} reported success but wrote no file", self.ffmpeg),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SegmentProducer for FfmpegProducer {
    async fn produce(&self, source: &Path, window: &SegmentWindow) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let output_path = self
            .work_dir
            .join(format!("segment_{}.wav", Uuid::new_v4()));

        // Removes a partial file if extraction fails midway.
        let guard = ScopedFile::new(&output_path);

        let output = run_tool(
            &self.ffmpeg,
            &Self::segment_args(source, window, &output_path),
            None,
        )
        .await
        .map_err(|e| tool_error(&self.ffmpeg, e))?;
        self.check(&output, &output_path)?;

        tracing::debug!(
            segment = window.number(),
            path = %output_path.display(),
            "segment extracted"
        );
        Ok(guard.keep())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn tool_error(tool: &str, e: io::Error) -> LongscribeError {
    if e.kind() == io::ErrorKind::NotFound {
        LongscribeError::ProducerToolNotFound {
            tool: tool.to_string(),
        }
    } else {
        LongscribeError::Producer {
            message: format!("Failed to execute {}: {}", tool, e),
        }
    }
}

/// Parses the `ffprobe` duration output (`"700.123000\n"`).
pub fn parse_duration(stdout: &str) -> Result<f64> {
    let trimmed = stdout.trim();
    let duration: f64 = trimmed.parse().map_err(|_| LongscribeError::Planning {
        message: format!("Could not determine audio duration from {:?}", trimmed),
    })?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(LongscribeError::Planning {
            message: format!("Invalid audio duration: {}", duration),
        });
    }
    Ok(duration)
}

/// Scripted producer for tests: writes short silent WAV files.
#[derive(Debug)]
pub struct MockProducer {
    work_dir: PathBuf,
    samples_per_window: usize,
    failing: HashSet<usize>,
    empty: HashSet<usize>,
    calls: Mutex<Vec<usize>>,
}

impl MockProducer {
    /// Create a producer writing into `work_dir` (created on demand).
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            samples_per_window: 1600,
            failing: HashSet::new(),
            empty: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail production of the window with this index.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    /// Produce a zero-byte file for the window with this index.
    pub fn with_empty_at(mut self, index: usize) -> Self {
        self.empty.insert(index);
        self
    }

    /// Window indices produced so far, in call order.
    pub fn calls(&self) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn write_silence(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).map_err(|e| {
            LongscribeError::Producer {
                message: format!("Failed to create WAV file: {}", e),
            }
        })?;
        for _ in 0..self.samples_per_window {
            writer
                .write_sample(0i16)
                .map_err(|e| LongscribeError::Producer {
                    message: format!("Failed to write WAV samples: {}", e),
                })?;
        }
        writer.finalize().map_err(|e| LongscribeError::Producer {
            message: format!("Failed to finalize WAV file: {}", e),
        })
    }
}

#[async_trait]
impl SegmentProducer for MockProducer {
    async fn produce(&self, _source: &Path, window: &SegmentWindow) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(window.index);

        if self.failing.contains(&window.index) {
            return Err(LongscribeError::Producer {
                message: format!("mock producer failure for segment {}", window.number()),
            });
        }

        std::fs::create_dir_all(&self.work_dir)?;
        let path = self
            .work_dir
            .join(format!("segment_{:03}_{}.wav", window.index, Uuid::new_v4()));
        if self.empty.contains(&window.index) {
            std::fs::File::create(&path)?;
        } else {
            self.write_silence(&path)?;
        }
        Ok(path)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::planner::plan;
    use tempfile::TempDir;

    #[test]
    fn test_parse_duration_ffprobe_output() {
        assert_eq!(parse_duration("700.123000\n").unwrap(), 700.123);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        let err = parse_duration("N/A\n").unwrap_err();
        assert!(matches!(err, LongscribeError::Planning { .. }));
    }

    #[test]
    fn test_parse_duration_rejects_non_positive() {
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("-3.5").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_segment_args_seek_and_format() {
        let window = plan(700.0, 300.0).unwrap()[2];
        let args = FfmpegProducer::segment_args(
            Path::new("/in/talk.mp3"),
            &window,
            Path::new("/work/out.wav"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-ss 600 -t 300 -i /in/talk.mp3"), "{joined}");
        assert!(joined.contains("-acodec pcm_s16le -ar 16000 -ac 1"), "{joined}");
        assert_eq!(args.last().map(String::as_str), Some("/work/out.wav"));
    }

    #[test]
    fn test_probe_args_end_with_source() {
        let args = FfmpegProducer::probe_args(Path::new("/in/talk.mp3"));
        assert!(args.contains(&"format=duration".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/in/talk.mp3"));
    }

    #[tokio::test]
    async fn test_ffmpeg_missing_binary_maps_to_tool_not_found() {
        let dir = TempDir::new().unwrap();
        let producer = FfmpegProducer::new(
            "longscribe-missing-ffmpeg",
            "longscribe-missing-ffprobe",
            dir.path().to_path_buf(),
        );
        let window = plan(10.0, 300.0).unwrap()[0];
        let err = producer
            .produce(Path::new("/nonexistent.mp3"), &window)
            .await
            .unwrap_err();
        assert!(matches!(err, LongscribeError::ProducerToolNotFound { .. }));
        // No partial artifact left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_mock_producer_writes_valid_wav() {
        let dir = TempDir::new().unwrap();
        let producer = MockProducer::new(dir.path());
        let window = plan(10.0, 300.0).unwrap()[0];
        let path = producer.produce(Path::new("in.wav"), &window).await.unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 1600);
        assert_eq!(producer.calls(), vec![0]);
    }

    #[tokio::test]
    async fn test_mock_producer_scripted_failure_and_empty() {
        let dir = TempDir::new().unwrap();
        let producer = MockProducer::new(dir.path())
            .with_failure_at(1)
            .with_empty_at(2);
        let windows = plan(700.0, 300.0).unwrap();

        assert!(producer.produce(Path::new("in"), &windows[1]).await.is_err());
        let empty = producer.produce(Path::new("in"), &windows[2]).await.unwrap();
        assert_eq!(std::fs::metadata(empty).unwrap().len(), 0);
        assert_eq!(producer.calls(), vec![1, 2]);
    }
}
