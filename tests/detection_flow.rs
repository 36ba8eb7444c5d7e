use doorwatch::ingest::scene;
use doorwatch::{
    ClipConfig, ClipSource, DetectionEngine, DetectionState, Frame, RecordPolicy, SourcedFrame,
};

/// Play a whole synthetic clip into memory.
fn collect_stub(frames: u32, fps: u32) -> Vec<SourcedFrame> {
    let mut source = ClipSource::new(ClipConfig {
        path: format!("stub://integration?frames={}", frames),
        fps,
        ..ClipConfig::default()
    })
    .expect("clip source");
    source.connect().expect("connect");
    let mut out = Vec::new();
    while let Some(sourced) = source.next_frame().expect("next frame") {
        out.push(sourced);
    }
    out
}

fn engine_calibrated_on(first: &SourcedFrame) -> DetectionEngine {
    let door = scene::door_region(first.frame.width(), first.frame.height());
    let mut engine = DetectionEngine::new();
    engine
        .set_roi(door.x, door.y, door.width, door.height)
        .expect("set roi");
    engine.calibrate(&first.frame).expect("calibrate");
    engine
}

#[test]
fn batch_scan_records_the_full_timeline() {
    // 12 frames: the door is open for the middle third (frames 4..8).
    let frames = collect_stub(12, 6);
    assert_eq!(frames.len(), 12);

    let mut engine = engine_calibrated_on(&frames[0]);
    for sourced in &frames {
        engine
            .process_frame(
                &sourced.frame,
                sourced.index,
                sourced.timestamp_s,
                RecordPolicy::EveryFrame,
            )
            .expect("process frame");
    }

    let history = engine.history();
    assert_eq!(history.len(), 12);
    assert_eq!(history.transition_count(), 2);
    for (i, sample) in history.samples().iter().enumerate() {
        let expected = if (4..8).contains(&i) {
            DetectionState::Open
        } else {
            DetectionState::Closed
        };
        assert_eq!(sample.state, expected, "frame {}", i);
        assert_eq!(sample.frame_index, i as u64);
    }
    assert_eq!(history.samples()[4].timestamp_s, 4.0 / 6.0);
    assert_eq!(engine.state(), DetectionState::Closed);
}

#[test]
fn live_scan_records_only_the_transitions() {
    let frames = collect_stub(12, 6);
    let mut engine = engine_calibrated_on(&frames[0]);
    for sourced in &frames {
        engine
            .process_frame(
                &sourced.frame,
                sourced.index,
                sourced.timestamp_s,
                RecordPolicy::TransitionsOnly,
            )
            .expect("process frame");
    }

    let history = engine.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.samples()[0].frame_index, 4);
    assert_eq!(history.samples()[0].state, DetectionState::Open);
    assert_eq!(history.samples()[1].frame_index, 8);
    assert_eq!(history.samples()[1].state, DetectionState::Closed);
}

#[test]
fn ten_percent_change_against_black_reference_opens() {
    let mut engine = DetectionEngine::new();
    engine.set_roi(100, 100, 300, 400).expect("set roi");
    engine
        .calibrate(&Frame::filled(640, 520, [0, 0, 0]))
        .expect("calibrate");

    // Every monitored channel moves by 26/255, about ten percent.
    let mut frame = Frame::filled(640, 520, [0, 0, 0]);
    let roi = engine.roi().expect("roi");
    frame.fill_region(&roi, [26, 26, 26]);

    let sample = engine
        .process_frame(&frame, 1, 0.1, RecordPolicy::TransitionsOnly)
        .expect("process frame");

    assert_eq!(sample.state, DetectionState::Open);
    assert!(
        (sample.change_percentage - 10.0).abs() < 0.25,
        "got {}",
        sample.change_percentage
    );
    assert_eq!(engine.history().len(), 1);
    assert_eq!(engine.history().last(), Some(&sample));
    assert_eq!(engine.state(), DetectionState::Open);
}
