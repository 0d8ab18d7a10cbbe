//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `agent_snapshots.csv`
//! - `tick_summaries.csv`
//! - `agent_metrics.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{AgentMetricsRow, AgentSnapshotRow, OutputResult, TickSummaryRow};

pub const SNAPSHOT_HEADER: [&str; 9] =
    ["agent_id", "tick", "status", "segment", "offset_m", "lane", "speed_mps", "accel_mps2", "reservation"];

pub const SUMMARY_HEADER: [&str; 14] = [
    "tick",
    "sim_time_ms",
    "live",
    "waiting",
    "spawned",
    "completed",
    "removed",
    "collisions",
    "yields",
    "stops",
    "timeouts",
    "deadlocks",
    "reservations",
    "elapsed_us",
];

pub const METRICS_HEADER: [&str; 13] = [
    "agent_id",
    "spawn_tick",
    "completion_tick",
    "distance_m",
    "wait_ticks",
    "average_wait",
    "yields",
    "stops",
    "timeouts",
    "collisions",
    "violations",
    "replans",
    "total_reward",
];

/// Writes simulation output to CSV files.
pub struct CsvWriter {
    snapshots: Writer<File>,
    summaries: Writer<File>,
    metrics:   Writer<File>,
}

impl CsvWriter {
    /// Open (or create) the CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut snapshots = Writer::from_path(dir.join("agent_snapshots.csv"))?;
        snapshots.write_record(SNAPSHOT_HEADER)?;

        let mut summaries = Writer::from_path(dir.join("tick_summaries.csv"))?;
        summaries.write_record(SUMMARY_HEADER)?;

        let mut metrics = Writer::from_path(dir.join("agent_metrics.csv"))?;
        metrics.write_record(METRICS_HEADER)?;

        Ok(Self { snapshots, summaries, metrics })
    }
}

/// Empty field for `None`.
fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

impl OutputWriter for CsvWriter {
    fn write_snapshots(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()> {
        for row in rows {
            self.snapshots.write_record(&[
                row.agent_id.to_string(),
                row.tick.to_string(),
                row.status.to_string(),
                row.segment.to_string(),
                format!("{:.3}", row.offset_m),
                row.lane.to_string(),
                format!("{:.3}", row.speed_mps),
                format!("{:.3}", row.accel_mps2),
                opt(row.reservation),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        let fields = [
            row.tick,
            row.sim_time_ms,
            row.live,
            row.waiting,
            row.spawned,
            row.completed,
            row.removed,
            row.collisions,
            row.yields,
            row.stops,
            row.timeouts,
            row.deadlocks,
            row.reservations,
            row.elapsed_us,
        ];
        self.summaries.write_record(fields.iter().map(u64::to_string))?;
        Ok(())
    }

    fn write_agent_metrics(&mut self, rows: &[AgentMetricsRow]) -> OutputResult<()> {
        for row in rows {
            self.metrics.write_record(&[
                row.agent_id.to_string(),
                row.spawn_tick.to_string(),
                opt(row.completion_tick),
                format!("{:.3}", row.distance_m),
                row.wait_ticks.to_string(),
                format!("{:.3}", row.average_wait),
                row.yields.to_string(),
                row.stops.to_string(),
                row.timeouts.to_string(),
                row.collisions.to_string(),
                row.violations.to_string(),
                row.replans.to_string(),
                format!("{:.4}", row.total_reward),
            ])?;
        }
        Ok(())
    }

    /// Flushes every file.  Rows written after an earlier `finish` (such as
    /// end-of-run metrics) reach disk on the next call.
    fn finish(&mut self) -> OutputResult<()> {
        self.snapshots.flush()?;
        self.summaries.flush()?;
        self.metrics.flush()?;
        Ok(())
    }
}
