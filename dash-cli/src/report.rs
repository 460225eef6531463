//! JSON reports for decode and replay runs

use crate::script::PulseEvent;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use dash_decoder::{GearShiftState, LapRecord, VehicleState};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Result of decoding one screenshot
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<VehicleState>,
    /// Digit slots whose segment pattern was not a digit (read as 0)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_slots: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameReport {
    pub fn failed(file: PathBuf, error: &anyhow::Error) -> Self {
        Self {
            file,
            state: None,
            unrecognized_slots: Vec::new(),
            error: Some(format!("{:#}", error)),
        }
    }
}

/// Summary of a replay run
#[derive(Debug, Default, Serialize)]
pub struct ReplayReport {
    pub frames: usize,
    pub decoded: usize,
    pub skipped: usize,
    pub outside_cockpit: usize,
    pub interrupted: bool,
    pub final_state: Option<VehicleState>,
    pub shift_state: Option<GearShiftState>,
    pub pulses: Vec<PulseEvent>,
    pub laps: Vec<LapRecord>,
}

/// Write `value` as pretty JSON to `output`, or stdout when `None`
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
            log::info!("Report written to {:?}", path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}

/// File name for a lap export started at `at`
pub fn laps_file_name(at: DateTime<Local>) -> String {
    format!("laps_{}.json", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write completed laps into `dir`, returning the file written
pub fn export_laps(dir: &Path, laps: &[LapRecord], started: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create lap directory: {:?}", dir))?;
    let path = dir.join(laps_file_name(started));
    write_json(&laps, Some(&path))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_laps_file_name() {
        let at = Local.with_ymd_and_hms(2025, 1, 21, 14, 30, 45).unwrap();
        assert_eq!(laps_file_name(at), "laps_2025-01-21_14-30-45.json");
    }

    #[test]
    fn test_export_laps() {
        let dir = tempfile::tempdir().unwrap();
        let laps = vec![LapRecord {
            lap: 0,
            lap_time: 83.456,
            fuel: 37.0,
            recorded_at: Utc::now(),
        }];

        let path = export_laps(&dir.path().join("laps"), &laps, Local::now()).unwrap();
        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written[0]["lap_time"], 83.456);
    }

    #[test]
    fn test_failed_frame_omits_state() {
        let report = FrameReport::failed(PathBuf::from("a.png"), &anyhow::anyhow!("broken"));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("state").is_none());
        assert_eq!(json["error"], "broken");
    }
}
