//! Frame ingestion sources.
//!
//! This module provides the two ways frames enter the pipeline:
//! - Live cameras (`CameraSource`): endless feeds for the monitoring daemon.
//! - Recorded clips (`ClipSource`): finite sequences for offline scans.
//!
//! Both default to a `stub://` backend that renders a synthetic door scene,
//! so every binary runs without hardware. Network cameras are optional and
//! feature-gated (ingest-http).
//!
//! The ingestion layer is responsible for:
//! - Decoding whatever the backend yields into the packed RGB8 `Frame`
//! - Numbering frames from 0 and attaching non-decreasing timestamps
//! - Rate pacing for live backends
//!
//! The ingestion layer MUST NOT:
//! - Classify frames or touch detection state
//! - Reorder or renumber frames once emitted
//! - Buffer more than the frame currently being decoded

pub mod camera;
pub mod file;
pub mod scene;

pub use camera::{CameraConfig, CameraSource, CameraStats};
pub use file::{ClipConfig, ClipSource, ClipStats};

use crate::frame::Frame;

/// A decoded frame with its position in the stream.
#[derive(Clone, Debug)]
pub struct SourcedFrame {
    pub frame: Frame,
    /// Consecutive index, starting at 0.
    pub index: u64,
    /// Seconds since the start of the stream. Never decreases.
    pub timestamp_s: f64,
}
