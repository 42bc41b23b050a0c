//! Terminal rendering for the CLI.
//!
//! Progress and fragments go to stderr; stdout only carries the transcript.

use crate::pipeline::types::{FailureReason, TranscriptFragment, format_timestamp};
use crate::segment::planner::SegmentWindow;
use crate::session::state::{SessionState, SessionStatus};

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Clear the current terminal line (replaces the progress line)
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

/// One-line progress summary, e.g. `[ 65.0%] transcribing 2/4`.
pub fn format_progress(state: &SessionState) -> String {
    let mut line = format!("[{:>5.1}%] {}", state.progress_percent, state.status);
    if state.total_segments > 0 && !state.status.is_terminal() {
        line.push_str(&format!(" {}/{}", state.current_segment, state.total_segments));
    }
    line
}

/// Overwrite the progress line in place.
pub fn render_progress(state: &SessionState, color: bool) {
    clear_line();
    if color {
        eprint!("{DIM}{}{RESET}", format_progress(state));
    } else {
        eprint!("{}", format_progress(state));
    }
}

fn fragment_color(fragment: &TranscriptFragment) -> &'static str {
    match fragment.outcome.failure_reason() {
        None => GREEN,
        Some(FailureReason::Timeout | FailureReason::EmptyOutput) => YELLOW,
        Some(FailureReason::EngineError | FailureReason::ProducerError) => RED,
    }
}

/// A fragment as shown live, with its label coloured by outcome.
pub fn format_fragment(fragment: &TranscriptFragment, color: bool) -> String {
    let line = fragment.line();
    if !color {
        return line;
    }
    let label_end = fragment.rendered_label.len() + 2;
    match (line.get(..label_end), line.get(label_end..)) {
        (Some(label), Some(rest)) => {
            let paint = fragment_color(fragment);
            if fragment.is_success() {
                format!("{paint}{label}{RESET}{rest}")
            } else {
                format!("{paint}{label}{rest}{RESET}")
            }
        }
        _ => line,
    }
}

/// Final summary: status, segment counts and success rate.
pub fn format_summary(state: &SessionState) -> String {
    match state.status {
        SessionStatus::Completed => format!(
            "Completed: {} of {} segments transcribed ({:.2}% success)",
            state.successful_segments.unwrap_or(0),
            state.total_segments,
            state.success_rate.unwrap_or(0.0)
        ),
        SessionStatus::Error => format!(
            "Failed: {}",
            state.error.as_deref().unwrap_or("unknown error")
        ),
        other => format!("Session ended in state {}", other),
    }
}

/// Plan table lines: number, start and end offset of each window.
pub fn format_plan(windows: &[SegmentWindow]) -> Vec<String> {
    windows
        .iter()
        .map(|w| {
            format!(
                "{:>4}  {} - {}",
                w.number(),
                format_timestamp(w.start_offset_secs),
                format_timestamp(w.end_offset_secs())
            )
        })
        .collect()
}
