//! Progress accounting.
//!
//! Segmentation fills the first band (0 to 30 %), transcription the rest.
//! Failed segments count toward progress like successful ones.

use crate::defaults::SEGMENTATION_BAND;
use crate::session::state::SessionState;
use crate::session::store::SessionStore;
use std::sync::Arc;

/// Progress after `produced` of `total` segments have been extracted.
pub fn segmentation_progress(produced: usize, total: usize) -> f64 {
    if total == 0 {
        return SEGMENTATION_BAND;
    }
    SEGMENTATION_BAND * ratio(produced, total)
}

/// Progress after `executed` of `total` segments have been transcribed.
pub fn transcription_progress(executed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    SEGMENTATION_BAND + (100.0 - SEGMENTATION_BAND) * ratio(executed, total)
}

fn ratio(done: usize, total: usize) -> f64 {
    (done.min(total) as f64) / (total as f64)
}

/// Read-only view of sessions for pollers.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    store: Arc<SessionStore>,
}

impl ProgressReporter {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Current state of the session, or `None` if unknown or cancelled.
    pub fn snapshot(&self, session_id: &str) -> Option<SessionState> {
        self.store.get(session_id)
    }
}
