//! Router + route store + the propose/commit cycle used by `tf-sim`.

use tf_agent::AgentStore;
use tf_core::{AgentId, SegmentId};
use tf_network::{CostModel, NetworkResult, RoadNetwork, RoutePlan, Router, RoutingConfig};
use tf_policy::Action;

use crate::{integrate, Candidate, Limit, MobilityError, MobilityResult, RouteStore};

/// Wraps a [`Router`] and a [`RouteStore`].
///
/// # Type parameter
///
/// `R` must implement [`Router`] (e.g. [`tf_network::DijkstraRouter`]).
/// Swap it at compile time for a different routing algorithm with no runtime
/// overhead.
pub struct MobilityEngine<R: Router> {
    pub router: R,
    pub routes: RouteStore,
}

impl<R: Router> MobilityEngine<R> {
    pub fn new(router: R) -> Self {
        Self { router, routes: RouteStore::new() }
    }

    // ── Routing ───────────────────────────────────────────────────────────

    /// Plan `agent`'s route from `from` to `goal` and install it.
    ///
    /// On failure the previous plan is left untouched; the caller decides
    /// whether the agent waits.
    pub fn plan_route(
        &mut self,
        network: &RoadNetwork,
        agent:   AgentId,
        from:    SegmentId,
        goal:    SegmentId,
        costs:   &dyn CostModel,
    ) -> NetworkResult<()> {
        let plan = self.router.plan(network, agent, from, goal, costs)?;
        tracing::debug!(agent = %agent, from = %from, goal = %goal, hops = plan.len(), cost_ms = plan.total_ms(), "route planned");
        self.routes.assign(agent, plan, network.revision());
        Ok(())
    }

    /// A strictly better route for `agent` under `costs`, if switching is
    /// worth it according to `config`'s hysteresis ratio.
    pub fn better_route(
        &self,
        network: &RoadNetwork,
        agent:   AgentId,
        costs:   &dyn CostModel,
        config:  &RoutingConfig,
    ) -> NetworkResult<Option<RoutePlan>> {
        let Some(plan) = self.routes.plan(agent) else {
            return Ok(None);
        };
        let cursor = self.routes.cursor(agent);
        let Some(from) = plan.get(cursor) else {
            return Ok(None);
        };
        if from == plan.goal() {
            return Ok(None);
        }
        let current = plan.remaining_cost_under(network, cursor, costs);
        let best = self.router.plan(network, agent, from, plan.goal(), costs)?;
        if best.segments() != self.routes.remaining(agent) && config.should_switch(current, best.total_ms()) {
            Ok(Some(best))
        } else {
            Ok(None)
        }
    }

    // ── Integration ───────────────────────────────────────────────────────

    /// Unconstrained candidate for `agent` under `action`.
    pub fn propose(
        &self,
        network: &RoadNetwork,
        agents:  &AgentStore,
        agent:   AgentId,
        action:  Action,
        dt_secs: f32,
    ) -> MobilityResult<Candidate> {
        self.integrate_limited(network, agents, agent, action, Limit::NONE, dt_secs)
    }

    /// Re-integrate `agent` from its committed state under `limit`.
    pub fn integrate_limited(
        &self,
        network: &RoadNetwork,
        agents:  &AgentStore,
        agent:   AgentId,
        action:  Action,
        limit:   Limit,
        dt_secs: f32,
    ) -> MobilityResult<Candidate> {
        let start = agents.kinematics(agent)?;
        let current = self.routes.current(agent).ok_or(MobilityError::NoRoute(agent))?;
        if current != start.segment {
            return Err(MobilityError::RouteMismatch { agent, expected: current, actual: start.segment });
        }
        let vehicle = &agents.vehicle[agent.index()];
        integrate(network, agent, vehicle, start, self.routes.next_segment(agent), action, limit, dt_secs)
    }

    /// Write `cand` into the agent store and move the route cursor if it
    /// crossed a junction.
    pub fn commit(&mut self, agents: &mut AgentStore, cand: &Candidate) -> MobilityResult<()> {
        agents.set_kinematics(cand.agent, cand.next, cand.accel_mps2)?;
        if cand.crossed {
            self.routes.advance(cand.agent, cand.next.segment)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }
}
