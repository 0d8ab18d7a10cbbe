//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory with
//! three tables: `agent_snapshots`, `tick_summaries` and `agent_metrics`.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::OutputWriter;
use crate::{AgentMetricsRow, AgentSnapshotRow, OutputResult, TickSummaryRow};

/// Writes simulation output to an SQLite database.
pub struct SqliteWriter {
    conn: Connection,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS agent_snapshots (
                 agent_id    INTEGER NOT NULL,
                 tick        INTEGER NOT NULL,
                 status      TEXT    NOT NULL,
                 segment     INTEGER NOT NULL,
                 offset_m    REAL    NOT NULL,
                 lane        INTEGER NOT NULL,
                 speed_mps   REAL    NOT NULL,
                 accel_mps2  REAL    NOT NULL,
                 reservation INTEGER
             );
             CREATE TABLE IF NOT EXISTS tick_summaries (
                 tick         INTEGER PRIMARY KEY,
                 sim_time_ms  INTEGER NOT NULL,
                 live         INTEGER NOT NULL,
                 waiting      INTEGER NOT NULL,
                 spawned      INTEGER NOT NULL,
                 completed    INTEGER NOT NULL,
                 removed      INTEGER NOT NULL,
                 collisions   INTEGER NOT NULL,
                 yields       INTEGER NOT NULL,
                 stops        INTEGER NOT NULL,
                 timeouts     INTEGER NOT NULL,
                 deadlocks    INTEGER NOT NULL,
                 reservations INTEGER NOT NULL,
                 elapsed_us   INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS agent_metrics (
                 agent_id        INTEGER PRIMARY KEY,
                 spawn_tick      INTEGER NOT NULL,
                 completion_tick INTEGER,
                 distance_m      REAL    NOT NULL,
                 wait_ticks      INTEGER NOT NULL,
                 average_wait    REAL    NOT NULL,
                 yields          INTEGER NOT NULL,
                 stops           INTEGER NOT NULL,
                 timeouts        INTEGER NOT NULL,
                 collisions      INTEGER NOT NULL,
                 violations      INTEGER NOT NULL,
                 replans         INTEGER NOT NULL,
                 total_reward    REAL    NOT NULL
             );",
        )?;

        Ok(Self { conn })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_snapshots(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO agent_snapshots \
                 (agent_id, tick, status, segment, offset_m, lane, speed_mps, accel_mps2, reservation) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.agent_id,
                    row.tick as i64,
                    row.status,
                    row.segment,
                    row.offset_m as f64,
                    row.lane,
                    row.speed_mps as f64,
                    row.accel_mps2 as f64,
                    row.reservation,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO tick_summaries \
             (tick, sim_time_ms, live, waiting, spawned, completed, removed, collisions, \
              yields, stops, timeouts, deadlocks, reservations, elapsed_us) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            rusqlite::params![
                row.tick as i64,
                row.sim_time_ms as i64,
                row.live as i64,
                row.waiting as i64,
                row.spawned as i64,
                row.completed as i64,
                row.removed as i64,
                row.collisions as i64,
                row.yields as i64,
                row.stops as i64,
                row.timeouts as i64,
                row.deadlocks as i64,
                row.reservations as i64,
                row.elapsed_us as i64,
            ],
        )?;
        Ok(())
    }

    fn write_agent_metrics(&mut self, rows: &[AgentMetricsRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO agent_metrics \
                 (agent_id, spawn_tick, completion_tick, distance_m, wait_ticks, average_wait, \
                  yields, stops, timeouts, collisions, violations, replans, total_reward) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.agent_id,
                    row.spawn_tick as i64,
                    row.completion_tick.map(|t| t as i64),
                    row.distance_m,
                    row.wait_ticks as i64,
                    row.average_wait,
                    row.yields as i64,
                    row.stops as i64,
                    row.timeouts as i64,
                    row.collisions,
                    row.violations,
                    row.replans,
                    row.total_reward,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Rows are committed as they are written; this folds the WAL back
    /// into `output.db`.
    fn finish(&mut self) -> OutputResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
