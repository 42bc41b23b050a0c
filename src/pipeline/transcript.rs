//! Final transcript assembly.

use crate::error::Result;
use crate::pipeline::types::TranscriptFragment;
use crate::session::state::{SessionState, SessionStatus};

/// Separator between fragment lines in the final transcript.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Percentage of successful fragments; 0 when there are none.
pub fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    successful as f64 / total as f64 * 100.0
}

/// Joins fragment lines in segment order, whatever order they completed in.
pub fn assemble<'a>(fragments: impl IntoIterator<Item = &'a TranscriptFragment>) -> String {
    let mut ordered: Vec<&TranscriptFragment> = fragments.into_iter().collect();
    ordered.sort_by_key(|f| f.index);
    ordered
        .iter()
        .map(|f| f.line())
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

/// Moves `state` to `Completed` and fills in the final figures.
///
/// The transition is checked first so a rejected finalization leaves the
/// state untouched.
pub fn finalize(state: &mut SessionState) -> Result<()> {
    state.transition(SessionStatus::Completed)?;
    let successful = state.fragments.iter().filter(|f| f.is_success()).count();
    state.successful_segments = Some(successful);
    state.success_rate = Some(success_rate(successful, state.fragments.len()));
    state.final_transcript = Some(assemble(&state.fragments));
    state.advance_progress(100.0);
    Ok(())
}
