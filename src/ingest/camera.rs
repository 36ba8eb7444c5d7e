//! Live camera frame source.
//!
//! `CameraSource` feeds the monitoring daemon. Two backends:
//! - `stub://<name>` renders the synthetic door scene, with optional sensor
//!   noise via `stub://<name>?noise=<amplitude>`. This is the default and
//!   needs no hardware.
//! - `http(s)://` polls a JPEG snapshot endpoint (feature: ingest-http),
//!   decoding each snapshot in-memory.
//!
//! A camera is effectively endless: `next_frame` keeps producing until the
//! caller stops asking. Frame indices count up from 0 and timestamps never
//! decrease.

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::scene;
use super::SourcedFrame;

/// Configuration for a live camera.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Source URL. Supported schemes: stub:// (synthetic), http(s):// with
    /// the ingest-http feature.
    pub url: String,
    /// Target frame rate (frames per second). Network backends pace
    /// themselves to this rate; the synthetic backend uses it for
    /// timestamping only.
    pub target_fps: u32,
    /// Synthetic frame width in pixels.
    pub width: u32,
    /// Synthetic frame height in pixels.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "stub://door".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Live camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "ingest-http")]
    Http(HttpCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(anyhow!("camera url is empty"));
        }
        if config.url.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)?),
            });
        }
        if config.url.starts_with("http://") || config.url.starts_with("https://") {
            #[cfg(feature = "ingest-http")]
            {
                return Ok(Self {
                    backend: CameraBackend::Http(HttpCameraSource::new(config)),
                });
            }
            #[cfg(not(feature = "ingest-http"))]
            {
                return Err(anyhow!(
                    "http camera sources require the ingest-http feature"
                ));
            }
        }
        Err(anyhow!(
            "unsupported camera url '{}'; expected stub:// or http(s)://",
            config.url
        ))
    }

    /// Connect to the camera.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-http")]
            CameraBackend::Http(source) => source.connect(),
        }
    }

    /// Capture the next frame. Cameras produce indefinitely, so this only
    /// returns `None` if a backend ever reports end of stream.
    pub fn next_frame(&mut self) -> Result<Option<SourcedFrame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-http")]
            CameraBackend::Http(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "ingest-http")]
            CameraBackend::Http(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-http")]
            CameraBackend::Http(source) => source.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub source: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://)
// ----------------------------------------------------------------------------

struct SyntheticCameraSource {
    config: CameraConfig,
    noise_amplitude: u8,
    rng: StdRng,
    frame_count: u64,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        let noise_amplitude = stub_noise_amplitude(&config.url)?;
        let rng = StdRng::seed_from_u64(scene::seed_for(&config.url));
        Ok(Self {
            config,
            noise_amplitude,
            rng,
            frame_count: 0,
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic, noise {})",
            self.config.url,
            self.noise_amplitude
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<SourcedFrame>> {
        let index = self.frame_count;
        let mut frame = scene::paint(
            self.config.width,
            self.config.height,
            scene::cycle_open(index),
        );
        scene::apply_noise(&mut frame, &mut self.rng, self.noise_amplitude);
        self.frame_count += 1;

        let fps = self.config.target_fps.max(1);
        Ok(Some(SourcedFrame {
            frame,
            index,
            timestamp_s: index as f64 / fps as f64,
        }))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

/// Parse the optional `?noise=<amplitude>` suffix of a stub camera url.
fn stub_noise_amplitude(url: &str) -> Result<u8> {
    let Some((_, query)) = url.split_once('?') else {
        return Ok(0);
    };
    let mut amplitude = 0u8;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("noise", value)) => {
                amplitude = value
                    .parse::<u8>()
                    .with_context(|| format!("parse noise amplitude in {}", url))?;
            }
            Some((key, _)) => {
                return Err(anyhow!("unknown stub camera option '{}' in {}", key, url));
            }
            None => {
                return Err(anyhow!("malformed stub query '{}' in {}", pair, url));
            }
        }
    }
    Ok(amplitude)
}

// ----------------------------------------------------------------------------
// HTTP snapshot source (feature: ingest-http)
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-http")]
mod http {
    use std::io::Read;
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Context, Result};
    use image::GenericImageView;

    use super::{CameraConfig, CameraStats};
    use crate::frame::Frame;
    use crate::ingest::SourcedFrame;

    const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

    /// Polls a JPEG snapshot URL at the configured rate. Suits cameras that
    /// expose a `/jpg` style still endpoint.
    pub(super) struct HttpCameraSource {
        config: CameraConfig,
        connected_at: Option<Instant>,
        last_frame_at: Option<Instant>,
        frame_count: u64,
    }

    impl HttpCameraSource {
        pub(super) fn new(config: CameraConfig) -> Self {
            Self {
                config,
                connected_at: None,
                last_frame_at: None,
                frame_count: 0,
            }
        }

        pub(super) fn connect(&mut self) -> Result<()> {
            url::Url::parse(&self.config.url).context("parse camera url")?;
            let snapshot = fetch_snapshot(&self.config.url)?;
            let probe = decode_snapshot(&snapshot)?;
            log::info!(
                "CameraSource: connected to {} ({}x{} snapshots)",
                self.config.url,
                probe.width(),
                probe.height()
            );
            self.connected_at = Some(Instant::now());
            Ok(())
        }

        pub(super) fn next_frame(&mut self) -> Result<Option<SourcedFrame>> {
            let connected_at = self
                .connected_at
                .ok_or_else(|| anyhow!("camera source not connected; call connect() first"))?;

            // Pace snapshot polling to the target rate.
            let min_interval = frame_interval(self.config.target_fps);
            if let Some(last) = self.last_frame_at {
                let since = last.elapsed();
                if since < min_interval {
                    std::thread::sleep(min_interval - since);
                }
            }

            let snapshot = fetch_snapshot(&self.config.url)?;
            let frame = decode_snapshot(&snapshot)?;
            let index = self.frame_count;
            self.frame_count += 1;
            self.last_frame_at = Some(Instant::now());

            Ok(Some(SourcedFrame {
                frame,
                index,
                timestamp_s: connected_at.elapsed().as_secs_f64(),
            }))
        }

        pub(super) fn is_healthy(&self) -> bool {
            let Some(connected_at) = self.connected_at else {
                return false;
            };
            let Some(last_frame_at) = self.last_frame_at else {
                return connected_at.elapsed() <= Duration::from_secs(5);
            };
            last_frame_at.elapsed() <= health_grace(self.config.target_fps)
        }

        pub(super) fn stats(&self) -> CameraStats {
            CameraStats {
                frames_captured: self.frame_count,
                source: self.config.url.clone(),
            }
        }
    }

    fn fetch_snapshot(url: &str) -> Result<Vec<u8>> {
        let response = ureq::get(url)
            .call()
            .with_context(|| format!("fetch snapshot from {}", url))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_JPEG_BYTES as u64 + 1)
            .read_to_end(&mut bytes)
            .context("read snapshot body")?;
        if bytes.is_empty() {
            return Err(anyhow!("empty snapshot from {}", url));
        }
        if bytes.len() > MAX_JPEG_BYTES {
            return Err(anyhow!("snapshot from {} exceeds {} bytes", url, MAX_JPEG_BYTES));
        }
        Ok(bytes)
    }

    fn decode_snapshot(bytes: &[u8]) -> Result<Frame> {
        let image = image::load_from_memory(bytes).context("decode snapshot")?;
        let (width, height) = image.dimensions();
        let rgb = image.into_rgb8();
        Frame::from_raw(width, height, rgb.into_raw())
            .ok_or_else(|| anyhow!("decoded snapshot has inconsistent dimensions"))
    }

    fn frame_interval(target_fps: u32) -> Duration {
        if target_fps == 0 {
            Duration::from_millis(0)
        } else {
            Duration::from_millis((1000 / target_fps).max(1) as u64)
        }
    }

    fn health_grace(target_fps: u32) -> Duration {
        let base_ms = if target_fps == 0 {
            2_000
        } else {
            (1000 / target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

#[cfg(feature = "ingest-http")]
use http::HttpCameraSource;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(url: &str) -> CameraConfig {
        CameraConfig {
            url: url.to_string(),
            target_fps: 10,
            width: 96,
            height: 72,
        }
    }

    #[test]
    fn rejects_empty_and_unknown_urls() {
        assert!(CameraSource::new(stub_config("")).is_err());
        assert!(CameraSource::new(stub_config("rtsp://cam/stream")).is_err());
        assert!(CameraSource::new(stub_config("door.mp4")).is_err());
    }

    #[test]
    fn rejects_bad_stub_options() {
        assert!(CameraSource::new(stub_config("stub://door?noise=many")).is_err());
        assert!(CameraSource::new(stub_config("stub://door?speed=2")).is_err());
        assert!(CameraSource::new(stub_config("stub://door?noise")).is_err());
        assert!(CameraSource::new(stub_config("stub://door?noise=3")).is_ok());
    }

    #[test]
    fn synthetic_frames_count_up_with_steady_timestamps() {
        let mut source = CameraSource::new(stub_config("stub://door")).unwrap();
        source.connect().unwrap();

        let first = source.next_frame().unwrap().unwrap();
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(first.timestamp_s, 0.0);
        assert_eq!(second.timestamp_s, 0.1);
        assert_eq!(first.frame.dimensions(), (96, 72));
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn noiseless_stub_repeats_the_closed_scene_exactly() {
        let mut source = CameraSource::new(stub_config("stub://door")).unwrap();
        let a = source.next_frame().unwrap().unwrap();
        let b = source.next_frame().unwrap().unwrap();
        assert_eq!(a.frame, b.frame);
    }

    #[test]
    fn stub_cycle_contains_open_episodes() {
        let mut source = CameraSource::new(stub_config("stub://door")).unwrap();
        let closed = source.next_frame().unwrap().unwrap().frame;

        // Walk into the scheduled open episode.
        let mut last = closed.clone();
        for _ in 0..120 {
            last = source.next_frame().unwrap().unwrap().frame;
        }
        let door = scene::door_region(96, 72);
        assert_ne!(last.pixel(door.x, door.y), closed.pixel(door.x, door.y));
    }

    #[test]
    fn noisy_stub_stays_near_the_clean_scene() {
        let mut source = CameraSource::new(stub_config("stub://door?noise=2")).unwrap();
        let noisy = source.next_frame().unwrap().unwrap().frame;
        let clean = scene::paint(96, 72, false);
        for y in 0..72 {
            for x in 0..96 {
                let n = noisy.pixel(x, y);
                let c = clean.pixel(x, y);
                for ch in 0..3 {
                    assert!(n[ch].abs_diff(c[ch]) <= 2);
                }
            }
        }
    }
}
