//! doorwatchd - Door state monitoring daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured camera source (stub or HTTP snapshot)
//! 2. Calibrates a reference image of the closed door after a warmup period
//! 3. Classifies every frame against the reference (open vs closed)
//! 4. Records state transitions to the in-memory history
//! 5. Prints the session history on shutdown (optionally exports JSON)

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use doorwatch::{
    CameraConfig, CameraSource, DetectionEngine, DoorwatchConfig, RecordPolicy, Roi,
};

fn main() -> Result<()> {
    // Initialize logging (simple stderr for MVP)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = DoorwatchConfig::load()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .expect("error setting Ctrl-C handler");
    }

    let camera_config = CameraConfig {
        url: cfg.camera.url.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    };
    let mut source = CameraSource::new(camera_config)?;
    source.connect()?;

    let mut engine = DetectionEngine::with_settings(
        cfg.detection.threshold_percentage,
        cfg.detection.sensitivity_step,
    );

    // Let exposure settle before taking the baseline.
    for _ in 0..cfg.detection.warmup_frames {
        if source.next_frame()?.is_none() {
            return Err(anyhow!("camera stream ended during warmup"));
        }
    }

    let Some(first) = source.next_frame()? else {
        return Err(anyhow!("camera produced no frame to calibrate against"));
    };
    let roi = match cfg.detection.roi {
        Some(roi) => roi,
        None => Roi::new(0, 0, first.frame.width(), first.frame.height())?,
    };
    engine.set_roi(roi.x, roi.y, roi.width, roi.height)?;
    engine.calibrate(&first.frame)?;

    log::info!("doorwatchd running. watching {}", source.stats().source);
    log::info!(
        "roi={} threshold={:.2}% fps={}",
        roi,
        engine.threshold_percentage(),
        cfg.camera.target_fps
    );

    // Pace the loop at roughly target_fps.
    let frame_pause = Duration::from_millis(1000 / u64::from(cfg.camera.target_fps));
    let mut last_health_log = Instant::now();
    let mut last_state = engine.state();
    let mut frames_processed = 0u64;
    let mut transition_count = 0u64;

    while !shutdown.load(Ordering::SeqCst) {
        let Some(sourced) = source.next_frame()? else {
            log::info!("camera stream ended");
            break;
        };

        let sample = match engine.process_frame(
            &sourced.frame,
            sourced.index,
            sourced.timestamp_s,
            RecordPolicy::TransitionsOnly,
        ) {
            Ok(sample) => sample,
            Err(e) => {
                log::warn!("frame {} skipped: {}", sourced.index, e);
                continue;
            }
        };
        frames_processed += 1;

        if sample.state != last_state {
            transition_count += 1;
            log::info!(
                "door {} at frame {} ({:.2}% change, threshold {:.2}%)",
                sample.state,
                sample.frame_index,
                sample.change_percentage,
                engine.threshold_percentage()
            );
            last_state = sample.state;
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::info!(
                "camera health={} frames={} source={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.source
            );
            last_health_log = Instant::now();
        }

        std::thread::sleep(frame_pause);
    }

    log::info!(
        "stopping. {} frames processed, {} transitions, final state {}",
        frames_processed,
        transition_count,
        engine.state()
    );

    {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        engine.history().write_table(&mut out)?;
    }

    if let Some(path) = &cfg.history.export_path {
        let json = engine.history().to_json()?;
        std::fs::write(path, json)
            .map_err(|e| anyhow!("failed to write history export {}: {}", path.display(), e))?;
        log::info!("history exported to {}", path.display());
    }

    engine.reset();
    Ok(())
}
