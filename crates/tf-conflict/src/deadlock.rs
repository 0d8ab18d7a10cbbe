//! Consecutive-denial counters.

use std::collections::BTreeMap;

use tf_core::AgentId;

/// Counts, per agent, how many ticks in a row it was refused entry to a
/// junction for any reason other than a red signal.
#[derive(Clone, Debug, Default)]
pub struct DeadlockTracker {
    counts:    BTreeMap<AgentId, u32>,
    threshold: u32,
    detected:  u64,
}

impl DeadlockTracker {
    pub fn new(threshold: u32) -> Self {
        Self { threshold, ..Self::default() }
    }

    #[inline]
    pub fn count(&self, agent: AgentId) -> u32 {
        self.counts.get(&agent).copied().unwrap_or(0)
    }

    #[inline]
    pub fn is_deadlocked(&self, agent: AgentId) -> bool {
        self.count(agent) >= self.threshold
    }

    /// Count one more denial.  Returns `true` exactly when this denial
    /// flags the agent.
    pub fn record_denied(&mut self, agent: AgentId) -> bool {
        let c = self.counts.entry(agent).or_insert(0);
        *c = c.saturating_add(1);
        let flagged = *c == self.threshold;
        if flagged {
            self.detected += 1;
        }
        flagged
    }

    pub fn reset(&mut self, agent: AgentId) {
        self.counts.remove(&agent);
    }

    /// Agents currently at or above the threshold, ascending.
    pub fn deadlocked(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.counts.iter().filter(|&(_, &c)| c >= self.threshold).map(|(&a, _)| a)
    }

    /// Deadlocks detected since construction or `clear`.
    pub fn detected_total(&self) -> u64 {
        self.detected
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.detected = 0;
    }
}
