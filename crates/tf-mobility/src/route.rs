//! Per-agent route plans and progress cursors.

use tf_core::{AgentId, SegmentId};
use tf_network::{RoadNetwork, RoutePlan};

use crate::{MobilityError, MobilityResult};

/// `RoutePlan` + cursor for every agent slot, indexed by `AgentId`.
///
/// The cursor is the index of the agent's current segment in its plan, so
/// `plan.get(cursor) == current segment` holds for every Active agent.
/// Plans are replaced wholesale; the store never edits one.
#[derive(Debug, Default)]
pub struct RouteStore {
    plans:    Vec<Option<RoutePlan>>,
    cursor:   Vec<usize>,
    /// Network revision the plan was last validated against.
    revision: Vec<u64>,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make room for agent slots `0..count`.
    pub fn grow_to(&mut self, count: usize) {
        if self.plans.len() < count {
            self.plans.resize(count, None);
            self.cursor.resize(count, 0);
            self.revision.resize(count, 0);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Install `plan` for `agent`, starting at its head.
    pub fn assign(&mut self, agent: AgentId, plan: RoutePlan, revision: u64) {
        self.grow_to(agent.index() + 1);
        let i = agent.index();
        self.plans[i] = Some(plan);
        self.cursor[i] = 0;
        self.revision[i] = revision;
    }

    /// Forget `agent`'s plan (terminal or waiting agents).
    pub fn remove(&mut self, agent: AgentId) -> Option<RoutePlan> {
        self.plans.get_mut(agent.index()).and_then(Option::take)
    }

    #[inline]
    pub fn plan(&self, agent: AgentId) -> Option<&RoutePlan> {
        self.plans.get(agent.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn cursor(&self, agent: AgentId) -> usize {
        self.cursor.get(agent.index()).copied().unwrap_or(0)
    }

    #[inline]
    pub fn has_route(&self, agent: AgentId) -> bool {
        self.plan(agent).is_some()
    }

    pub fn current(&self, agent: AgentId) -> Option<SegmentId> {
        self.plan(agent)?.get(self.cursor(agent))
    }

    /// Segment after the current one; `None` on the goal segment or without
    /// a plan.
    pub fn next_segment(&self, agent: AgentId) -> Option<SegmentId> {
        self.plan(agent)?.get(self.cursor(agent) + 1)
    }

    /// Segments still ahead, current one included.
    pub fn remaining(&self, agent: AgentId) -> &[SegmentId] {
        match self.plan(agent) {
            Some(p) => &p.segments()[self.cursor(agent).min(p.len())..],
            None => &[],
        }
    }

    /// Move the cursor onto `segment`, which must be the next route segment.
    pub fn advance(&mut self, agent: AgentId, segment: SegmentId) -> MobilityResult<()> {
        let expected = self.next_segment(agent).ok_or(MobilityError::NoRoute(agent))?;
        if expected != segment {
            return Err(MobilityError::RouteMismatch { agent, expected, actual: segment });
        }
        self.cursor[agent.index()] += 1;
        Ok(())
    }

    #[inline]
    pub fn revision_of(&self, agent: AgentId) -> u64 {
        self.revision.get(agent.index()).copied().unwrap_or(0)
    }

    /// `true` if the plan predates the network's current revision.
    pub fn is_stale(&self, agent: AgentId, network: &RoadNetwork) -> bool {
        self.has_route(agent) && self.revision_of(agent) != network.revision()
    }

    /// Re-check the plan against `network`; refreshes the stored revision
    /// when still valid.
    pub fn revalidate(&mut self, agent: AgentId, network: &RoadNetwork) -> bool {
        let ok = self
            .plan(agent)
            .is_some_and(|p| p.is_valid_from(network, self.cursor(agent)));
        if ok {
            self.revision[agent.index()] = network.revision();
        }
        ok
    }
}
