//! Agent lifecycle status.

/// Where an agent is in its lifecycle.
///
/// ```text
/// spawn ──► Active ◄──► Waiting        (no feasible route)
///             │
///             ├──► Completed           (reached goal)
///             └──► Removed             (collision / despawn)
/// ```
///
/// `Completed` and `Removed` are terminal: the slot is kept for metrics but
/// the agent no longer takes part in any tick phase.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentStatus {
    /// Following a route.
    #[default]
    Active,
    /// Parked at its spawn position until a route becomes feasible.
    Waiting,
    /// Reached its goal segment.
    Completed,
    /// Removed after a terminal collision or an explicit despawn.
    Removed,
}

impl AgentStatus {
    /// `true` for `Completed` and `Removed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Removed)
    }

    /// `true` for agents that occupy road space (`Active` or `Waiting`).
    #[inline]
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }

    /// Label used in CSV/SQLite output.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Active    => "active",
            AgentStatus::Waiting   => "waiting",
            AgentStatus::Completed => "completed",
            AgentStatus::Removed   => "removed",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
