//! scan_video - scan a recorded clip and report door open/closed episodes

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use doorwatch::{
    ClipConfig, ClipSource, DetectionEngine, DetectionState, HistoryLog, RecordPolicy, Roi,
    DEFAULT_SENSITIVITY_STEP, DEFAULT_THRESHOLD_PERCENTAGE,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Clip to scan: a directory of image frames, or stub://<name>?frames=N.
    clip: String,
    /// Monitored rectangle as WIDTHxHEIGHT+X+Y. Defaults to the full frame.
    #[arg(long, value_name = "GEOMETRY")]
    roi: Option<String>,
    /// Change percentage above which the door counts as open.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_PERCENTAGE)]
    threshold: f64,
    /// Frame rate the clip was recorded at (sets sample timestamps).
    #[arg(long, default_value_t = 30)]
    fps: u32,
    /// Write the history as JSON to this path.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let roi = args.roi.as_deref().map(Roi::parse_geometry).transpose()?;

    let clip_config = ClipConfig {
        path: args.clip.clone(),
        fps: args.fps,
        ..ClipConfig::default()
    };
    let mut source = ClipSource::new(clip_config)?;
    {
        let _stage = ui.stage("Open clip");
        source.connect()?;
    }

    let mut engine = DetectionEngine::with_settings(args.threshold, DEFAULT_SENSITIVITY_STEP);
    let first = {
        let _stage = ui.stage("Calibrate reference");
        let Some(first) = source.next_frame()? else {
            return Err(anyhow!("clip {} contains no frames", args.clip));
        };
        let roi = match roi {
            Some(roi) => roi,
            None => Roi::new(0, 0, first.frame.width(), first.frame.height())?,
        };
        engine.set_roi(roi.x, roi.y, roi.width, roi.height)?;
        engine.calibrate(&first.frame)?;
        first
    };

    let mut progress = ui.scan(source.total_frames(), "Scan clip");
    engine.process_frame(
        &first.frame,
        first.index,
        first.timestamp_s,
        RecordPolicy::EveryFrame,
    )?;
    progress.tick();
    while let Some(sourced) = source.next_frame()? {
        if let Err(e) = engine.process_frame(
            &sourced.frame,
            sourced.index,
            sourced.timestamp_s,
            RecordPolicy::EveryFrame,
        ) {
            log::warn!("frame {} skipped: {}", sourced.index, e);
        }
        progress.tick();
    }
    progress.finish();

    {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        engine.history().write_table(&mut out)?;
    }

    let history = engine.history();
    log::info!(
        "scanned {} frames: {} transitions, {} open episodes, final state {}",
        history.len(),
        history.transition_count(),
        open_episode_count(history),
        engine.state()
    );

    if let Some(path) = &args.out {
        let json = history.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| anyhow!("failed to write history to {}: {}", path.display(), e))?;
        println!("history written to {}", path.display());
    }
    Ok(())
}

/// Number of maximal runs of OPEN samples in the history.
fn open_episode_count(history: &HistoryLog) -> usize {
    let opened_after_start = history
        .samples()
        .windows(2)
        .filter(|pair| {
            pair[1].state == DetectionState::Open && pair[0].state != DetectionState::Open
        })
        .count();
    let open_at_start = history
        .samples()
        .first()
        .is_some_and(|sample| sample.state == DetectionState::Open);
    opened_after_start + usize::from(open_at_start)
}
