//! Segmentation: planning windows and materializing them as audio files.

pub mod artifact;
pub mod planner;
pub mod producer;

pub use artifact::{ScopedFile, SegmentArtifact};
pub use planner::{SegmentWindow, plan, requires_segmentation};
pub use producer::{FfmpegProducer, MockProducer, SegmentProducer};
