//! Speech-to-text engines that turn one segment artifact into text.

pub mod command;
pub mod engine;

pub use command::CommandEngine;
pub use engine::{EngineCall, MockEngine, MockReply, TranscriptionEngine};
