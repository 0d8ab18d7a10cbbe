//! CSV spawn loader.
//!
//! # CSV format
//!
//! One row per vehicle.  Only `tick`, `start_segment` and `goal_segment`
//! are required; vehicle columns fall back to [`VehicleSpec::default`].
//!
//! ```csv
//! tick,start_segment,goal_segment,lane,offset_m,speed_mps,length_m,max_speed_mps
//! 0,0,5,0,0.0,8.0,,
//! 0,2,7,0,,,,
//! 40,4,1,0,0.0,0.0,6.0,12.0
//! ```
//!
//! Rows may appear in any order; the queue orders them by tick and keeps
//! file order within a tick.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use tf_agent::{AgentInit, Kinematics, VehicleSpec};
use tf_core::{SegmentId, Tick};

use crate::{ScheduleError, SpawnRequest};

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SpawnRecord {
    tick:           u64,
    start_segment:  u32,
    goal_segment:   u32,
    #[serde(default)]
    lane:           Option<u8>,
    #[serde(default)]
    offset_m:       Option<f32>,
    #[serde(default)]
    speed_mps:      Option<f32>,
    #[serde(default)]
    length_m:       Option<f32>,
    #[serde(default)]
    max_speed_mps:  Option<f32>,
    #[serde(default)]
    max_accel_mps2: Option<f32>,
    #[serde(default)]
    max_brake_mps2: Option<f32>,
}

impl SpawnRecord {
    fn into_request(self) -> SpawnRequest {
        let d = VehicleSpec::default();
        let vehicle = VehicleSpec {
            length_m:       self.length_m.unwrap_or(d.length_m),
            max_speed_mps:  self.max_speed_mps.unwrap_or(d.max_speed_mps),
            max_accel_mps2: self.max_accel_mps2.unwrap_or(d.max_accel_mps2),
            max_brake_mps2: self.max_brake_mps2.unwrap_or(d.max_brake_mps2),
        };
        let start = Kinematics {
            segment:   SegmentId(self.start_segment),
            offset_m:  self.offset_m.unwrap_or(0.0),
            lane:      self.lane.unwrap_or(0),
            speed_mps: self.speed_mps.unwrap_or(0.0),
        };
        SpawnRequest::new(Tick(self.tick), AgentInit { start, goal: SegmentId(self.goal_segment), vehicle })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load spawn requests from a CSV file, in file order.
pub fn load_spawns_csv(path: &Path) -> Result<Vec<SpawnRequest>, ScheduleError> {
    let file = std::fs::File::open(path)?;
    load_spawns_reader(file)
}

/// Like [`load_spawns_csv`] but accepts any `Read` source.
pub fn load_spawns_reader<R: Read>(reader: R) -> Result<Vec<SpawnRequest>, ScheduleError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for (row, result) in csv_reader.deserialize::<SpawnRecord>().enumerate() {
        let record = result.map_err(|e| ScheduleError::Parse(format!("row {}: {e}", row + 1)))?;
        let request = record.into_request();
        request.validate()?;
        out.push(request);
    }
    tracing::debug!(count = out.len(), "spawn list loaded");
    Ok(out)
}
