//! `SimOutputObserver<W>`: bridges `SimObserver` to an `OutputWriter`.

use tf_agent::AgentStore;
use tf_core::{SimConfig, Tick};
use tf_sim::{Metrics, SimObserver, TickSummary};

use crate::row::{AgentMetricsRow, AgentSnapshotRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes agent snapshots and tick summaries to any
/// [`OutputWriter`] backend (CSV, SQLite, …).
///
/// Errors from the writer are stored internally because `SimObserver` methods
/// have no return value.  After `sim.run()` returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:           W,
    tick_duration_ms: u32,
    last_error:       Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    /// Create an observer backed by `writer`, using `config` for simulated
    /// time stamps.
    pub fn new(writer: W, config: &SimConfig) -> Self {
        Self { writer, tick_duration_ms: config.tick_duration_ms, last_error: None }
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the sim).
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Write per-agent totals and flush.  Call once after the run.
    pub fn write_metrics(&mut self, metrics: &Metrics) {
        let rows: Vec<AgentMetricsRow> = metrics
            .agents()
            .iter()
            .enumerate()
            .map(|(i, m)| AgentMetricsRow {
                agent_id:        i as u32,
                spawn_tick:      m.spawn_tick.0,
                completion_tick: m.completion_tick.map(|t| t.0),
                distance_m:      m.distance_m,
                wait_ticks:      m.wait_ticks,
                average_wait:    m.average_wait_ticks(),
                yields:          m.yields,
                stops:           m.stops,
                timeouts:        m.timeouts,
                collisions:      m.collisions,
                violations:      m.violations,
                replans:         m.replans,
                total_reward:    m.total_reward,
            })
            .collect();
        let result = self.writer.write_agent_metrics(&rows).and_then(|_| self.writer.finish());
        self.store_err(result);
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            tracing::error!(error = %e, "output write failed");
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_tick_end(&mut self, s: &TickSummary) {
        let row = TickSummaryRow {
            tick:         s.tick.0,
            sim_time_ms:  s.tick.0 * self.tick_duration_ms as u64,
            live:         s.live as u64,
            waiting:      s.waiting as u64,
            spawned:      s.spawned as u64,
            completed:    s.completed as u64,
            removed:      s.removed as u64,
            collisions:   s.collisions as u64,
            yields:       s.yields as u64,
            stops:        s.stops as u64,
            timeouts:     s.timeouts as u64,
            deadlocks:    s.deadlocks as u64,
            reservations: s.reservations as u64,
            elapsed_us:   s.elapsed_us,
        };
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
    }

    fn on_snapshot(&mut self, tick: Tick, agents: &AgentStore) {
        let rows: Vec<AgentSnapshotRow> = agents
            .live_ids()
            .map(|a| {
                let i = a.index();
                let res = agents.reservation[i];
                AgentSnapshotRow {
                    agent_id:    a.0,
                    tick:        tick.0,
                    status:      agents.status[i].as_str(),
                    segment:     agents.segment[i].0,
                    offset_m:    agents.offset_m[i],
                    lane:        agents.lane[i],
                    speed_mps:   agents.speed_mps[i],
                    accel_mps2:  agents.accel_mps2[i],
                    reservation: res.is_valid().then_some(res.0),
                }
            })
            .collect();

        if !rows.is_empty() {
            let result = self.writer.write_snapshots(&rows);
            self.store_err(result);
        }
    }

    fn on_sim_end(&mut self, _final_tick: Tick) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
