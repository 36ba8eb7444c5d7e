//! demo - end-to-end synthetic door watch, no camera or clip required
//!
//! Builds the stub clip, calibrates on the closed door, scans the whole
//! sequence, prints the recorded history, then walks the sensitivity
//! controls.

use anyhow::{anyhow, Result};
use clap::Parser;

use doorwatch::ingest::scene;
use doorwatch::{
    clamp_to_band, ClipConfig, ClipSource, DetectionEngine, RecordPolicy, SensitivityDirection,
    DEFAULT_SENSITIVITY_STEP, DEFAULT_THRESHOLD_PERCENTAGE,
};

const DEMO_CLIP_NAME: &str = "demo-door";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames (the door opens during the middle third).
    #[arg(long, default_value_t = 90)]
    frames: u32,
    /// Frames per second for synthetic timestamps.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Change percentage above which the door counts as open.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_PERCENTAGE)]
    threshold: f64,
    /// Step used for the sensitivity walkthrough.
    #[arg(long, default_value_t = DEFAULT_SENSITIVITY_STEP)]
    step: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    stage("build synthetic clip");
    let clip_config = ClipConfig {
        path: format!("stub://{}?frames={}", DEMO_CLIP_NAME, args.frames),
        fps: args.fps,
        ..ClipConfig::default()
    };
    let mut source = ClipSource::new(clip_config)?;
    source.connect()?;

    stage("calibrate on the closed door");
    let mut engine = DetectionEngine::with_settings(args.threshold, args.step);
    let Some(first) = source.next_frame()? else {
        return Err(anyhow!("synthetic clip produced no frames"));
    };
    let roi = scene::door_region(first.frame.width(), first.frame.height());
    engine.set_roi(roi.x, roi.y, roi.width, roi.height)?;
    engine.calibrate(&first.frame)?;

    stage("scan the clip");
    engine.process_frame(
        &first.frame,
        first.index,
        first.timestamp_s,
        RecordPolicy::EveryFrame,
    )?;
    let mut frames_processed = 1u64;
    while let Some(sourced) = source.next_frame()? {
        engine.process_frame(
            &sourced.frame,
            sourced.index,
            sourced.timestamp_s,
            RecordPolicy::EveryFrame,
        )?;
        frames_processed += 1;
    }

    stage("print the recorded history");
    {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        engine.history().write_table(&mut out)?;
    }

    stage("walk the sensitivity controls");
    let raised = engine.adjust_sensitivity(SensitivityDirection::Increase);
    println!("  one step less sensitive: threshold {:.2}%", raised);
    let restored = engine.adjust_sensitivity(SensitivityDirection::Decrease);
    println!("  one step back: threshold {:.2}%", restored);
    for _ in 0..20 {
        engine.adjust_sensitivity(SensitivityDirection::Decrease);
    }
    let clamped = clamp_to_band(engine.threshold_percentage());
    engine.set_threshold_percentage(clamped);
    println!(
        "  twenty steps down, clamped to the working band: {:.2}%",
        engine.threshold_percentage()
    );

    println!("demo summary:");
    println!("  frames processed: {}", frames_processed);
    println!("  samples recorded: {}", engine.history().len());
    println!("  transitions: {}", engine.history().transition_count());
    println!("  final state: {}", engine.state());
    println!("next steps:");
    println!("  cargo run --bin scan_video -- \"stub://door?frames=120\" --out history.json");
    println!("  cargo run --bin doorwatchd");
    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
