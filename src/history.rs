//! Session history.
//!
//! Every processed frame produces a `ChangeSample`; which samples get kept
//! is the caller's choice per call:
//!
//! - `RecordPolicy::EveryFrame`: offline scans keep a complete trace.
//! - `RecordPolicy::TransitionsOnly`: long-running monitors keep only the
//!   moments the door state flipped, so memory stays flat over days.
//!
//! The log itself is append-only. Rows come out in insertion order, as an
//! aligned text table for terminals or as JSON for downstream tooling.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::DetectionState;

// ----------------------------------------------------------------------------
// ChangeSample
// ----------------------------------------------------------------------------

/// One measurement: which frame, when, how different, and the resulting state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeSample {
    pub frame_index: u64,
    pub timestamp_s: f64,
    pub change_percentage: f64,
    pub state: DetectionState,
}

/// Which samples a processing call should append to the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordPolicy {
    /// Append every processed frame.
    EveryFrame,
    /// Append only frames whose state differs from the previous frame's.
    TransitionsOnly,
}

// ----------------------------------------------------------------------------
// HistoryLog
// ----------------------------------------------------------------------------

/// Append-only record of a detection session.
#[derive(Clone, Debug, Default)]
pub struct HistoryLog {
    samples: Vec<ChangeSample>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn append(&mut self, sample: ChangeSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples, oldest first.
    pub fn samples(&self) -> &[ChangeSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&ChangeSample> {
        self.samples.last()
    }

    /// Number of adjacent sample pairs whose state differs.
    pub fn transition_count(&self) -> usize {
        self.samples
            .windows(2)
            .filter(|pair| pair[0].state != pair[1].state)
            .count()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Render the log as an aligned text table.
    pub fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "{:>8}  {:>10}  {:<12}  {:>8}",
            "frame", "time_s", "state", "change%"
        )?;
        writeln!(out, "{:->8}  {:->10}  {:->12}  {:->8}", "", "", "", "")?;
        if self.samples.is_empty() {
            writeln!(out, "(no samples recorded)")?;
            return Ok(());
        }
        for sample in &self.samples {
            writeln!(
                out,
                "{:>8}  {:>10.2}  {:<12}  {:>8.2}",
                sample.frame_index, sample.timestamp_s, sample.state, sample.change_percentage
            )?;
        }
        Ok(())
    }

    /// Serialize all samples as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.samples)?)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(frame_index: u64, change: f64, state: DetectionState) -> ChangeSample {
        ChangeSample {
            frame_index,
            timestamp_s: frame_index as f64 / 10.0,
            change_percentage: change,
            state,
        }
    }

    #[test]
    fn samples_come_back_in_insertion_order() {
        let mut log = HistoryLog::new();
        log.append(sample(0, 0.0, DetectionState::Closed));
        log.append(sample(1, 12.5, DetectionState::Open));
        log.append(sample(2, 0.4, DetectionState::Closed));

        let indices: Vec<u64> = log.samples().iter().map(|s| s.frame_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(log.last().unwrap().frame_index, 2);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn transition_count_ignores_repeats() {
        let mut log = HistoryLog::new();
        for (i, state) in [
            DetectionState::Closed,
            DetectionState::Closed,
            DetectionState::Open,
            DetectionState::Open,
            DetectionState::Closed,
        ]
        .into_iter()
        .enumerate()
        {
            log.append(sample(i as u64, 0.0, state));
        }
        assert_eq!(log.transition_count(), 2);
    }

    #[test]
    fn clear_discards_everything() {
        let mut log = HistoryLog::new();
        log.append(sample(0, 1.0, DetectionState::Closed));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.transition_count(), 0);
    }

    #[test]
    fn table_lists_every_row() {
        let mut log = HistoryLog::new();
        log.append(sample(0, 0.0, DetectionState::Closed));
        log.append(sample(7, 42.1234, DetectionState::Open));

        let mut out = Vec::new();
        log.write_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("frame"));
        assert!(text.contains("CLOSED"));
        assert!(text.contains("OPEN"));
        assert!(text.contains("42.12"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn empty_table_says_so() {
        let log = HistoryLog::new();
        let mut out = Vec::new();
        log.write_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(no samples recorded)"));
    }

    #[test]
    fn json_round_trips() {
        let mut log = HistoryLog::new();
        log.append(sample(3, 9.875, DetectionState::Open));
        let json = log.to_json().unwrap();

        let parsed: Vec<ChangeSample> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_slice(), log.samples());
        assert!(json.contains("\"OPEN\""));
        assert!(json.contains("\"frame_index\": 3"));
    }
}
