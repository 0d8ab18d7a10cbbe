//! Per-agent counters and per-tick summaries.

use serde::Serialize;

use tf_core::{AgentId, Tick};

/// Running totals for one agent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AgentMetrics {
    pub spawn_tick:      Tick,
    pub completion_tick: Option<Tick>,
    pub collisions:      u32,
    /// Ticks spent Active at (near) zero speed, or Waiting.
    pub wait_ticks:      u64,
    /// Separate stretches of waiting.
    pub wait_episodes:   u32,
    pub yields:          u64,
    pub stops:           u64,
    pub timeouts:        u64,
    pub violations:      u32,
    pub replans:         u32,
    pub distance_m:      f64,
    pub total_reward:    f64,
    waiting:             bool,
}

impl AgentMetrics {
    pub fn new(spawn_tick: Tick) -> Self {
        Self { spawn_tick, ..Self::default() }
    }

    /// Mean length of a waiting stretch, in ticks.
    pub fn average_wait_ticks(&self) -> f64 {
        if self.wait_episodes == 0 {
            0.0
        } else {
            self.wait_ticks as f64 / self.wait_episodes as f64
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completion_tick.is_some()
    }

    /// Ticks from spawn to completion.
    pub fn travel_ticks(&self) -> Option<u64> {
        self.completion_tick.map(|t| t.since(self.spawn_tick))
    }

    pub(crate) fn record_wait(&mut self, waiting: bool) {
        if waiting {
            self.wait_ticks += 1;
            if !self.waiting {
                self.wait_episodes += 1;
            }
        }
        self.waiting = waiting;
    }
}

/// What happened during one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickSummary {
    pub tick:         Tick,
    pub live:         usize,
    pub active:       usize,
    pub waiting:      usize,
    pub spawned:      usize,
    /// Spawns pushed to a later tick for lack of entry space.
    pub deferred:     usize,
    pub completed:    usize,
    pub removed:      usize,
    pub collisions:   usize,
    pub accepts:      usize,
    pub yields:       usize,
    pub stops:        usize,
    pub timeouts:     usize,
    pub malformed:    usize,
    pub replans:      usize,
    pub deadlocks:    usize,
    pub reservations: usize,
    pub elapsed_us:   u64,
    /// Wall time exceeded the tick duration.
    pub overrun:      bool,
}

/// Whole-run totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GlobalMetrics {
    pub ticks:      u64,
    pub spawned:    u64,
    pub completed:  u64,
    pub removed:    u64,
    pub collisions: u64,
    pub deadlocks:  u64,
    pub timeouts:   u64,
    pub replans:    u64,
    pub overruns:   u64,
}

impl GlobalMetrics {
    pub(crate) fn add(&mut self, s: &TickSummary) {
        self.ticks += 1;
        self.spawned += s.spawned as u64;
        self.completed += s.completed as u64;
        self.removed += s.removed as u64;
        self.collisions += s.collisions as u64;
        self.deadlocks += s.deadlocks as u64;
        self.timeouts += s.timeouts as u64;
        self.replans += s.replans as u64;
        self.overruns += s.overrun as u64;
    }
}

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    agents:     Vec<AgentMetrics>,
    pub global: GlobalMetrics,
}

impl Metrics {
    pub fn agent(&self, agent: AgentId) -> Option<&AgentMetrics> {
        self.agents.get(agent.index())
    }

    pub(crate) fn agent_mut(&mut self, agent: AgentId) -> Option<&mut AgentMetrics> {
        self.agents.get_mut(agent.index())
    }

    pub fn agents(&self) -> &[AgentMetrics] {
        &self.agents
    }

    pub(crate) fn agents_mut(&mut self) -> &mut [AgentMetrics] {
        &mut self.agents
    }

    pub(crate) fn register(&mut self, agent: AgentId, spawn_tick: Tick) {
        if self.agents.len() <= agent.index() {
            self.agents.resize_with(agent.index() + 1, AgentMetrics::default);
        }
        self.agents[agent.index()] = AgentMetrics::new(spawn_tick);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
