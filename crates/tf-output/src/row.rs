//! Plain data row types written by output backends.

/// One agent's committed state at a given tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshotRow {
    pub agent_id:    u32,
    pub tick:        u64,
    /// `AgentStatus::as_str`, e.g. `"active"`.
    pub status:      &'static str,
    pub segment:     u32,
    pub offset_m:    f32,
    pub lane:        u8,
    pub speed_mps:   f32,
    pub accel_mps2:  f32,
    /// Held reservation id; `None` when the agent holds none.
    pub reservation: Option<u32>,
}

/// Counts for one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummaryRow {
    pub tick:         u64,
    pub sim_time_ms:  u64,
    pub live:         u64,
    pub waiting:      u64,
    pub spawned:      u64,
    pub completed:    u64,
    pub removed:      u64,
    pub collisions:   u64,
    pub yields:       u64,
    pub stops:        u64,
    pub timeouts:     u64,
    pub deadlocks:    u64,
    pub reservations: u64,
    pub elapsed_us:   u64,
}

/// End-of-run totals for one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentMetricsRow {
    pub agent_id:        u32,
    pub spawn_tick:      u64,
    /// `None` if the agent never reached its goal.
    pub completion_tick: Option<u64>,
    pub distance_m:      f64,
    pub wait_ticks:      u64,
    pub average_wait:    f64,
    pub yields:          u64,
    pub stops:           u64,
    pub timeouts:        u64,
    pub collisions:      u32,
    pub violations:      u32,
    pub replans:         u32,
    pub total_reward:    f64,
}
