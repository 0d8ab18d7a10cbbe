//! Routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! `tf-sim` calls routing via the [`Router`] trait, so applications can swap
//! in custom implementations (A*, contraction hierarchies) without touching
//! the engine core.
//!
//! # Cost units
//!
//! Costs are integer **milliseconds** supplied by a [`CostModel`].  A route's
//! cost is the sum of the costs of every segment entered after the starting
//! one; the segment the agent already occupies is free.
//!
//! # Tie-break
//!
//! Among equal-cost routes the lexicographically smallest segment-id
//! sequence wins.  [`DijkstraRouter`] runs Dijkstra *backwards* from the goal
//! to get exact cost-to-go for every segment, then walks forwards taking the
//! smallest-id successor that stays on a shortest path.  The result depends
//! only on topology, open flags and the cost table.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tf_core::{AgentId, SegmentId};

use crate::cost::CostModel;
use crate::network::RoadNetwork;
use crate::{NetworkError, NetworkResult};

// ── RoutePlan ─────────────────────────────────────────────────────────────────

/// An ordered list of segments from the agent's current segment to its goal.
///
/// Replaced wholesale on replan; never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    segments:      Vec<SegmentId>,
    /// `cumulative_ms[i]` = cost of entering `segments[1..=i]`.  Index 0 is 0.
    cumulative_ms: Vec<u32>,
}

impl RoutePlan {
    /// A plan that stays on `seg` (the agent is already on its goal).
    pub fn trivial(seg: SegmentId) -> Self {
        Self { segments: vec![seg], cumulative_ms: vec![0] }
    }

    /// Build a plan from a segment list, pricing it with `costs`.
    ///
    /// Fails with `InvalidTopology` if the list is empty or two consecutive
    /// segments are not adjacent.
    pub fn from_segments(
        network:  &RoadNetwork,
        segments: Vec<SegmentId>,
        costs:    &dyn CostModel,
    ) -> NetworkResult<Self> {
        let Some(&first) = segments.first() else {
            return Err(NetworkError::InvalidTopology("empty route".into()));
        };
        network.segment(first)?;
        let mut cumulative_ms = Vec::with_capacity(segments.len());
        cumulative_ms.push(0u32);
        for pair in segments.windows(2) {
            if !network.neighbors(pair[0])?.contains(&pair[1]) {
                return Err(NetworkError::InvalidTopology(format!(
                    "{} does not lead to {}",
                    pair[0], pair[1]
                )));
            }
            let prev = *cumulative_ms.last().unwrap_or(&0);
            cumulative_ms.push(prev.saturating_add(costs.segment_cost_ms(network, pair[1])));
        }
        Ok(Self { segments, cumulative_ms })
    }

    #[inline]
    pub fn segments(&self) -> &[SegmentId] {
        &self.segments
    }

    #[inline]
    pub fn cumulative_ms(&self) -> &[u32] {
        &self.cumulative_ms
    }

    /// The segment the plan starts on.
    #[inline]
    pub fn head(&self) -> SegmentId {
        self.segments[0]
    }

    /// The goal segment.
    #[inline]
    pub fn goal(&self) -> SegmentId {
        self.segments[self.segments.len() - 1]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`: a plan holds at least its head segment.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<SegmentId> {
        self.segments.get(i).copied()
    }

    /// Total cost of the plan in milliseconds.
    #[inline]
    pub fn total_ms(&self) -> u32 {
        self.cumulative_ms[self.cumulative_ms.len() - 1]
    }

    /// Cost of the part of the plan still ahead of position `cursor`.
    pub fn remaining_ms(&self, cursor: usize) -> u32 {
        let at = self.cumulative_ms.get(cursor).copied().unwrap_or(self.total_ms());
        self.total_ms() - at
    }

    /// Re-price the remainder from `cursor` under a different cost table.
    pub fn remaining_cost_under(&self, network: &RoadNetwork, cursor: usize, costs: &dyn CostModel) -> u32 {
        self.segments
            .iter()
            .skip(cursor + 1)
            .fold(0u32, |acc, &s| acc.saturating_add(costs.segment_cost_ms(network, s)))
    }

    /// `true` if every segment after `cursor` is open and each step is still a
    /// legal move.
    pub fn is_valid_from(&self, network: &RoadNetwork, cursor: usize) -> bool {
        if cursor >= self.segments.len() {
            return false;
        }
        let rest = &self.segments[cursor..];
        rest.iter().skip(1).all(|&s| network.is_open(s))
            && rest
                .windows(2)
                .all(|p| network.neighbors(p[0]).is_ok_and(|n| n.contains(&p[1])))
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so the simulation can hold them
/// alongside the policy in a parallel decision phase.
pub trait Router: Send + Sync + 'static {
    /// Compute a route for `agent` from the segment it is on to `goal`.
    ///
    /// `from` may itself be closed (the agent is already on it); every other
    /// segment of the result is open.  Returns [`NetworkError::Infeasible`]
    /// when no open path exists.
    fn plan(
        &self,
        network: &RoadNetwork,
        agent:   AgentId,
        from:    SegmentId,
        goal:    SegmentId,
        costs:   &dyn CostModel,
    ) -> NetworkResult<RoutePlan>;
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Backward Dijkstra over the segment graph with a lexicographic forward walk.
#[derive(Copy, Clone, Debug, Default)]
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn plan(
        &self,
        network: &RoadNetwork,
        agent:   AgentId,
        from:    SegmentId,
        goal:    SegmentId,
        costs:   &dyn CostModel,
    ) -> NetworkResult<RoutePlan> {
        network.segment(from)?;
        network.segment(goal)?;
        if from == goal {
            return Ok(RoutePlan::trivial(from));
        }
        if !network.is_open(goal) {
            return Err(NetworkError::Infeasible { agent, from, goal });
        }

        let dist = cost_to_go(network, from, goal, costs);
        if dist[from.index()] == u64::MAX {
            return Err(NetworkError::Infeasible { agent, from, goal });
        }

        // Forward walk: smallest successor id on a shortest path.
        let mut segments = vec![from];
        let mut cumulative_ms = vec![0u32];
        let mut cur = from;
        let mut spent: u64 = 0;
        while cur != goal {
            let here = dist[cur.index()];
            let next = network.successors(cur).iter().copied().find(|&n| {
                let d = dist[n.index()];
                d != u64::MAX && network.is_open(n) && d + step_cost(network, costs, n) == here
            });
            let Some(next) = next else {
                // Unreachable with a consistent cost table.
                return Err(NetworkError::Infeasible { agent, from, goal });
            };
            spent += step_cost(network, costs, next);
            segments.push(next);
            cumulative_ms.push(spent.min(u32::MAX as u64) as u32);
            cur = next;
        }

        Ok(RoutePlan { segments, cumulative_ms })
    }
}

/// `dist[s]` = cheapest cost from the end of `s` to the end of `goal`.
/// Unreached segments hold `u64::MAX`.  Stops once `from` is settled.
fn cost_to_go(network: &RoadNetwork, from: SegmentId, goal: SegmentId, costs: &dyn CostModel) -> Vec<u64> {
    let mut dist = vec![u64::MAX; network.segment_count()];
    dist[goal.index()] = 0;

    // Secondary key SegmentId keeps heap order deterministic.
    let mut heap: BinaryHeap<Reverse<(u64, SegmentId)>> = BinaryHeap::new();
    heap.push(Reverse((0, goal)));

    while let Some(Reverse((d, seg))) = heap.pop() {
        if d > dist[seg.index()] {
            continue;
        }
        if seg == from {
            break;
        }
        let step = step_cost(network, costs, seg);
        for &p in network.predecessors(seg) {
            // Only the starting segment may be closed.
            if p != from && !network.is_open(p) {
                continue;
            }
            let nd = d + step;
            if nd < dist[p.index()] {
                dist[p.index()] = nd;
                heap.push(Reverse((nd, p)));
            }
        }
    }
    dist
}

#[inline]
fn step_cost(network: &RoadNetwork, costs: &dyn CostModel, seg: SegmentId) -> u64 {
    costs.segment_cost_ms(network, seg).max(1) as u64
}
