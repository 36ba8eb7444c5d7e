//! Recorded clip frame source.
//!
//! `ClipSource` feeds offline scans. Two backends:
//! - `stub://<name>?frames=<n>` renders a finite synthetic clip whose door
//!   opens for the middle third of the frames.
//! - a local directory of still images (jpg/jpeg/png), played back in
//!   lexicographic file-name order. Decoding real container formats is left
//!   to external tooling; `ffmpeg` dumps any video into such a directory.
//!
//! Clips are finite: `next_frame` returns `None` after the last frame.
//! Timestamps are derived from the frame index and the configured playback
//! rate, so a scan of the same clip always reports the same times.

use anyhow::{anyhow, Context, Result};
use image::GenericImageView;
use std::path::PathBuf;

use super::scene;
use super::SourcedFrame;
use crate::frame::Frame;

/// Configuration for a recorded clip.
#[derive(Clone, Debug)]
pub struct ClipConfig {
    /// Local directory of frames, or stub:// for a synthetic clip.
    pub path: String,
    /// Playback rate used to derive timestamps from frame indices.
    pub fps: u32,
    /// Synthetic frame width in pixels.
    pub width: u32,
    /// Synthetic frame height in pixels.
    pub height: u32,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Recorded clip frame source.
pub struct ClipSource {
    backend: ClipBackend,
}

enum ClipBackend {
    Synthetic(SyntheticClipSource),
    Directory(ImageSequenceSource),
}

impl ClipSource {
    pub fn new(config: ClipConfig) -> Result<Self> {
        if config.path.trim().is_empty() {
            return Err(anyhow!("clip path is empty"));
        }
        if config.path.starts_with("stub://") {
            return Ok(Self {
                backend: ClipBackend::Synthetic(SyntheticClipSource::new(config)?),
            });
        }
        if config.path.contains("://") {
            return Err(anyhow!(
                "clip playback only supports local paths (no URL schemes)"
            ));
        }
        Ok(Self {
            backend: ClipBackend::Directory(ImageSequenceSource::new(config)),
        })
    }

    /// Open the clip. For directories this scans and orders the frame files.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            ClipBackend::Synthetic(source) => source.connect(),
            ClipBackend::Directory(source) => source.connect(),
        }
    }

    /// Decode the next frame, or `None` once the clip is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<SourcedFrame>> {
        match &mut self.backend {
            ClipBackend::Synthetic(source) => source.next_frame(),
            ClipBackend::Directory(source) => source.next_frame(),
        }
    }

    /// Total number of frames, once known. Directories know after `connect`.
    pub fn total_frames(&self) -> Option<u64> {
        match &self.backend {
            ClipBackend::Synthetic(source) => Some(source.total),
            ClipBackend::Directory(source) => source.total_frames(),
        }
    }

    /// Get playback statistics.
    pub fn stats(&self) -> ClipStats {
        match &self.backend {
            ClipBackend::Synthetic(source) => source.stats(),
            ClipBackend::Directory(source) => source.stats(),
        }
    }
}

/// Statistics for a clip source.
#[derive(Clone, Debug)]
pub struct ClipStats {
    pub frames_emitted: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic clip (stub://)
// ----------------------------------------------------------------------------

struct SyntheticClipSource {
    config: ClipConfig,
    total: u64,
    cursor: u64,
}

impl SyntheticClipSource {
    fn new(config: ClipConfig) -> Result<Self> {
        let total = stub_frame_count(&config.path)?;
        Ok(Self {
            config,
            total,
            cursor: 0,
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "ClipSource: opened {} (synthetic, {} frames)",
            self.config.path,
            self.total
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<SourcedFrame>> {
        if self.cursor >= self.total {
            return Ok(None);
        }
        let index = self.cursor;
        self.cursor += 1;

        let frame = scene::paint(
            self.config.width,
            self.config.height,
            scene::scripted_open(index, self.total),
        );
        let fps = self.config.fps.max(1);
        Ok(Some(SourcedFrame {
            frame,
            index,
            timestamp_s: index as f64 / fps as f64,
        }))
    }

    fn stats(&self) -> ClipStats {
        ClipStats {
            frames_emitted: self.cursor,
            path: self.config.path.clone(),
        }
    }
}

/// Parse the optional `?frames=<n>` suffix of a stub clip path.
fn stub_frame_count(path: &str) -> Result<u64> {
    let Some((_, query)) = path.split_once('?') else {
        return Ok(90);
    };
    let mut total = 90u64;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("frames", value)) => {
                total = value
                    .parse::<u64>()
                    .with_context(|| format!("parse frame count in {}", path))?;
            }
            Some((key, _)) => {
                return Err(anyhow!("unknown stub clip option '{}' in {}", key, path));
            }
            None => {
                return Err(anyhow!("malformed stub query '{}' in {}", pair, path));
            }
        }
    }
    Ok(total)
}

// ----------------------------------------------------------------------------
// Image sequence directory
// ----------------------------------------------------------------------------

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

struct ImageSequenceSource {
    config: ClipConfig,
    files: Vec<PathBuf>,
    connected: bool,
    cursor: usize,
}

impl ImageSequenceSource {
    fn new(config: ClipConfig) -> Self {
        Self {
            config,
            files: Vec::new(),
            connected: false,
            cursor: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.config.path)
            .with_context(|| format!("open clip directory {}", self.config.path))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.context("read clip directory entry")?.path();
            if path.is_file() && has_frame_extension(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!(
                "no frame images (jpg/jpeg/png) found in {}",
                self.config.path
            ));
        }
        files.sort();

        log::info!(
            "ClipSource: opened {} ({} frames)",
            self.config.path,
            files.len()
        );
        self.files = files;
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<SourcedFrame>> {
        if !self.connected {
            return Err(anyhow!("clip source not connected; call connect() first"));
        }
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };

        let image =
            image::open(path).with_context(|| format!("decode frame {}", path.display()))?;
        let (width, height) = image.dimensions();
        let rgb = image.into_rgb8();
        let frame = Frame::from_raw(width, height, rgb.into_raw()).ok_or_else(|| {
            anyhow!("decoded frame {} has inconsistent dimensions", path.display())
        })?;

        let index = self.cursor as u64;
        self.cursor += 1;

        let fps = self.config.fps.max(1);
        Ok(Some(SourcedFrame {
            frame,
            index,
            timestamp_s: index as f64 / fps as f64,
        }))
    }

    fn total_frames(&self) -> Option<u64> {
        if self.connected {
            Some(self.files.len() as u64)
        } else {
            None
        }
    }

    fn stats(&self) -> ClipStats {
        ClipStats {
            frames_emitted: self.cursor as u64,
            path: self.config.path.clone(),
        }
    }
}

fn has_frame_extension(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FRAME_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
