//! Session bookkeeping shared between the pipeline task and pollers.

pub mod progress;
pub mod state;
pub mod store;

pub use progress::ProgressReporter;
pub use state::{SessionState, SessionStatus};
pub use store::SessionStore;
