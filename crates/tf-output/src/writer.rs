//! The `OutputWriter` trait implemented by all backend writers.

use crate::{AgentMetricsRow, AgentSnapshotRow, OutputResult, TickSummaryRow};

/// Trait implemented by the CSV and SQLite writers.
///
/// All methods are infallible from the observer's perspective; errors are
/// stored internally and retrieved with
/// [`SimOutputObserver::take_error`][crate::SimOutputObserver::take_error].
pub trait OutputWriter {
    /// Write a batch of agent snapshots.
    fn write_snapshots(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()>;

    /// Write one tick summary row.
    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Write end-of-run per-agent totals.
    fn write_agent_metrics(&mut self, rows: &[AgentMetricsRow]) -> OutputResult<()>;

    /// Flush everything written so far to disk.
    ///
    /// Safe to call more than once; writes may continue afterwards and are
    /// flushed by the next call.
    fn finish(&mut self) -> OutputResult<()>;
}
