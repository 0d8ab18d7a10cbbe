//! `tf-output`: simulation output writers for the rust_traffic engine.
//!
//! Two backends are provided behind Cargo features:
//!
//! | Feature   | Backend | Files created                                                     |
//! |-----------|---------|-------------------------------------------------------------------|
//! | *(none)*  | CSV     | `agent_snapshots.csv`, `tick_summaries.csv`, `agent_metrics.csv`  |
//! | `sqlite`  | SQLite  | `output.db`                                                       |
//!
//! Both backends implement [`OutputWriter`] and are driven by
//! [`SimOutputObserver`], which implements `tf_sim::SimObserver`.  Per-agent
//! totals are written once, after the run, with
//! [`SimOutputObserver::write_metrics`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use tf_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output")).unwrap();
//! let mut obs = SimOutputObserver::new(writer, &config.sim);
//! sim.run(&mut obs).unwrap();
//! obs.write_metrics(&sim.metrics);
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{AgentMetricsRow, AgentSnapshotRow, TickSummaryRow};
pub use writer::OutputWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
