// THEORY:
// This file is the main entry point for the `gesture_vision` library crate.
// It exposes `GesturePipeline` and its configuration as the high-level
// interface: feed it one distance frame at a time, read back the blobs it
// found, label them, and commit them to the dataset.
//
// The layers underneath (`core_modules`) stay public so tools can drive a single
// stage directly, e.g. re-running feature extraction over a saved mask.

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use pipeline::{FrameOutcome, GesturePipeline, PipelineConfig};
