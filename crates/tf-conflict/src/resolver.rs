//! The per-tick conflict resolver.
//!
//! # Algorithm
//!
//! For every candidate the resolver first applies the local checks:
//!
//! * **Following**: a vehicle may not advance closer than `min_gap_m` to the
//!   committed rear of the vehicle ahead (same segment and lane, or the
//!   rearmost vehicle of the next route segment).  Violators keep their
//!   `Accept` but are re-integrated with an advance cap.
//! * **Lane changes**: the target lane must have `length + min_gap_m` of
//!   room around the agent.  Among agents claiming the same gap the lower
//!   id wins; losers are lane-locked.
//!
//! Then, per junction, the **contenders** (front vehicles about to reach
//! their stop line) are ranked by
//!
//! ```text
//! (deadlock-escalated first, signal-allowed first, arrival_ms, agent id)
//! ```
//!
//! and granted a reservation in that order when their movement conflicts
//! with neither a live reservation nor an earlier grant of the same tick, and
//! the outgoing segment has room (spillback guard).  Refused contenders get
//! `Yield` (they can stop at the line) or `Stop` (they cannot, brake hard).
//!
//! # Deadlock escalation
//!
//! An agent refused for `deadlock_ticks` consecutive ticks on a green or
//! uncontrolled approach is flagged.  While flagged it ranks first at its
//! junction, every other contender there is forced to yield, and the
//! spillback guard is waived for it.  Live reservations are still honoured;
//! they last at most `max_reservation_ticks < deadlock_ticks`, which bounds
//! the wait of a flagged agent.

use std::collections::{BTreeMap, BTreeSet};

use tf_agent::AgentStore;
use tf_control::TrafficControl;
use tf_core::{AgentId, AgentStatus, JunctionId, ReservationId, Tick};
use tf_mobility::{BrakeMode, Candidate, Limit};
use tf_network::{Movement, RoadNetwork};

use crate::{
    ConflictConfig, ConflictError, ConflictResult, DeadlockTracker, LaneIndex, Reservation,
    ReservationBook,
};

// ── Outputs ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Accept,
    /// Hold at the stop line with comfortable braking.
    Yield,
    /// Past the comfortable stopping point: brake hard.  The agent still
    /// stops at the line; its reported acceleration is capped at the
    /// vehicle's braking limit.
    Stop,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Yield  => "yield",
            Decision::Stop   => "stop",
        }
    }
}

/// Why a contender was refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// Red signal on the approach.
    Signal,
    /// A conflicting movement is reserved.
    Reserved,
    /// The outgoing segment has no room.
    Spillback,
    /// Another contender at the junction is deadlock-escalated.
    Escalation,
}

/// The resolver's ruling on one candidate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Verdict {
    pub decision: Decision,
    /// Constraints for re-integration; `Limit::NONE` keeps the candidate.
    pub limit:    Limit,
    pub reason:   Option<DenyReason>,
}

impl Verdict {
    const ACCEPT: Verdict = Verdict { decision: Decision::Accept, limit: Limit::NONE, reason: None };

    /// `true` if the candidate must be integrated again under `limit`.
    #[inline]
    pub fn needs_reintegration(&self) -> bool {
        !self.limit.is_none()
    }
}

/// A reservation to be created at commit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub agent:    AgentId,
    pub junction: JunctionId,
    pub movement: Movement,
    pub start:    Tick,
    pub end:      Tick,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Arrival {
    movement: Movement,
    at_ms:    u64,
}

/// Everything `resolve` decided for one tick.  Apply it with
/// [`Resolver::commit`].
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub tick:      Tick,
    /// One entry per candidate.
    pub verdicts:  BTreeMap<AgentId, Verdict>,
    pub grants:    Vec<Grant>,
    /// Flagged agents that ranked first at their junction this tick.
    pub escalated: Vec<AgentId>,
    arrivals:      BTreeMap<AgentId, Arrival>,
}

impl Resolution {
    pub fn verdict(&self, agent: AgentId) -> Option<&Verdict> {
        self.verdicts.get(&agent)
    }

    pub fn decision(&self, agent: AgentId) -> Option<Decision> {
        self.verdicts.get(&agent).map(|v| v.decision)
    }

    /// Count of each decision: `(accept, yield, stop)`.
    pub fn tally(&self) -> (usize, usize, usize) {
        self.verdicts.values().fold((0, 0, 0), |(a, y, s), v| match v.decision {
            Decision::Accept => (a + 1, y, s),
            Decision::Yield  => (a, y + 1, s),
            Decision::Stop   => (a, y, s + 1),
        })
    }
}

/// What `commit` changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitReport {
    pub granted:    Vec<(AgentId, ReservationId)>,
    /// Released because the agent cleared the junction or left the route.
    pub released:   Vec<Reservation>,
    pub expired:    Vec<Reservation>,
    /// Agents flagged Deadlocked this tick.
    pub deadlocked: Vec<AgentId>,
}

/// Read-only view of the world handed to [`Resolver::resolve`].
#[derive(Copy, Clone)]
pub struct ResolveInput<'a> {
    pub network:    &'a RoadNetwork,
    pub control:    &'a TrafficControl,
    /// Committed state from the end of the previous tick.
    pub agents:     &'a AgentStore,
    pub candidates: &'a BTreeMap<AgentId, Candidate>,
    pub tick:       Tick,
    pub dt_ms:      u32,
}

// ── Resolver ──────────────────────────────────────────────────────────────────

struct Contender {
    agent:     AgentId,
    movement:  Movement,
    arrival:   u64,
    allowed:   bool,
    escalated: bool,
    dist_m:    f32,
    speed_mps: f32,
    stop_m:    f32,
    length_m:  f32,
    lane:      u8,
}

pub struct Resolver {
    config:   ConflictConfig,
    book:     ReservationBook,
    deadlock: DeadlockTracker,
    arrivals: BTreeMap<AgentId, Arrival>,
}

impl Resolver {
    pub fn new(config: ConflictConfig) -> ConflictResult<Self> {
        config.validate()?;
        Ok(Self {
            book:     ReservationBook::new(config.history_limit),
            deadlock: DeadlockTracker::new(config.deadlock_ticks),
            arrivals: BTreeMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &ConflictConfig {
        &self.config
    }

    pub fn book(&self) -> &ReservationBook {
        &self.book
    }

    pub fn deadlock(&self) -> &DeadlockTracker {
        &self.deadlock
    }

    pub fn holds_reservation(&self, agent: AgentId, tick: Tick) -> bool {
        self.book.held_by(agent).is_some_and(|r| r.is_live_at(tick))
    }

    /// Decide every candidate.  Pure: state is only read.
    pub fn resolve(&self, input: ResolveInput<'_>) -> ConflictResult<Resolution> {
        let lanes = LaneIndex::build(input.agents);
        let locked = self.rejected_lane_changes(&input, &lanes);

        let mut verdicts = BTreeMap::new();
        for (&agent, c) in input.candidates {
            let mut limit = Limit::NONE;
            if locked.contains(&agent) {
                limit.lane_lock = true;
            }
            let lane = if limit.lane_lock { c.start.lane } else { c.target_lane() };
            if let Some(cap) = self.follow_limit(&input, &lanes, c, lane)? {
                limit = limit.merge(cap);
            }
            verdicts.insert(agent, Verdict { limit, ..Verdict::ACCEPT });
        }

        let mut resolution = Resolution {
            tick: input.tick,
            verdicts,
            grants: Vec::new(),
            escalated: Vec::new(),
            arrivals: BTreeMap::new(),
        };

        for (junction, contenders) in self.contenders(&input, &lanes, &locked)? {
            self.resolve_junction(&input, &lanes, junction, contenders, &mut resolution)?;
        }
        Ok(resolution)
    }

    /// Apply `resolution` after the simulation committed kinematics.
    /// `agents` must already hold the post-tick positions.
    pub fn commit(
        &mut self,
        resolution: Resolution,
        network:    &RoadNetwork,
        agents:     &AgentStore,
    ) -> ConflictResult<CommitReport> {
        let tick = resolution.tick;
        let mut report = CommitReport::default();

        for g in &resolution.grants {
            let id = self.book.insert(g.junction, g.movement, g.agent, g.start, g.end);
            tracing::debug!(agent = %g.agent, junction = %g.junction, start = g.start.0, end = g.end.0, "reservation granted");
            report.granted.push((g.agent, id));
        }

        for (&agent, v) in &resolution.verdicts {
            match (v.decision, v.reason) {
                (Decision::Accept, _) | (_, Some(DenyReason::Signal)) => self.deadlock.reset(agent),
                _ => {
                    if self.deadlock.record_denied(agent) {
                        tracing::warn!(agent = %agent, tick = tick.0, "agent deadlocked, escalating");
                        report.deadlocked.push(agent);
                    }
                }
            }
        }
        for &agent in &resolution.escalated {
            tracing::warn!(agent = %agent, tick = tick.0, "deadlock escalation granted");
        }
        self.arrivals = resolution.arrivals;

        let cleared: Vec<AgentId> = self
            .book
            .iter()
            .filter(|r| self.has_cleared(r, agents))
            .map(|r| r.agent)
            .collect();
        for agent in cleared {
            if let Some(r) = self.book.release_agent(agent, tick) {
                report.released.push(r);
            }
        }
        report.expired = self.book.expire(tick.offset(1));

        self.book.check_invariant(network).map_err(|msg| {
            tracing::error!(tick = tick.0, %msg, "reservation invariant violated");
            ConflictError::InvariantViolation(msg)
        })?;
        Ok(report)
    }

    /// Drop every trace of `agent` (removed, completed, or rerouted).
    pub fn forget(&mut self, agent: AgentId, tick: Tick) -> Option<Reservation> {
        self.deadlock.reset(agent);
        self.arrivals.remove(&agent);
        self.book.release_agent(agent, tick)
    }

    pub fn reset(&mut self) {
        self.book.clear();
        self.deadlock.clear();
        self.arrivals.clear();
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn has_cleared(&self, r: &Reservation, agents: &AgentStore) -> bool {
        let a = r.agent;
        if !agents.contains(a) || agents.status[a.index()] != AgentStatus::Active {
            return true;
        }
        let seg = agents.segment[a.index()];
        if seg == r.movement.to {
            agents.offset_m[a.index()] >= self.config.clear_distance_m
        } else {
            seg != r.movement.from
        }
    }

    /// Expected ms until the front bumper reaches the line.
    fn eta_ms(&self, dist_m: f32, speed_mps: f32) -> u64 {
        if dist_m <= self.config.stop_line_tolerance_m {
            return 0;
        }
        let v = speed_mps.max(self.config.min_crossing_speed_mps);
        (dist_m / v * 1000.0).ceil() as u64
    }

    /// Reservation length in ticks for a contender.
    fn occupancy_ticks(&self, c: &Contender, dt_ms: u32) -> u64 {
        let travel = c.dist_m + self.config.clear_distance_m + c.length_m;
        let v = c.speed_mps.max(self.config.min_crossing_speed_mps);
        let ticks = (travel / v * 1000.0 / dt_ms.max(1) as f32).ceil() as u64 + 1;
        ticks.min(self.config.max_reservation_ticks).max(1)
    }

    /// Agents whose lane change would cut in too close.
    fn rejected_lane_changes(&self, input: &ResolveInput<'_>, lanes: &LaneIndex) -> BTreeSet<AgentId> {
        let gap = self.config.min_gap_m;
        let dt = input.dt_ms as f32 / 1000.0;
        let mut claimed: BTreeMap<(tf_core::SegmentId, u8), Vec<(f32, f32)>> = BTreeMap::new();
        let mut rejected = BTreeSet::new();

        for (&agent, c) in input.candidates {
            if c.lane_delta == 0 {
                continue;
            }
            let seg = c.start.segment;
            let target = c.target_lane();
            let me = c.start.offset_m;
            let my_len = input.agents.vehicle[agent.index()].length_m;

            let clear_of_existing = lanes.lane(seg, target).iter().filter(|o| o.agent != agent).all(|o| {
                if o.offset_m >= me {
                    o.offset_m - me >= o.length_m + gap
                } else {
                    me - o.offset_m >= my_len + gap + o.speed_mps * dt
                }
            });
            let key = (seg, target);
            let clear_of_claims = claimed
                .get(&key)
                .is_none_or(|list| list.iter().all(|&(off, len)| {
                    if off >= me { off - me >= len + gap } else { me - off >= my_len + gap }
                }));

            if clear_of_existing && clear_of_claims {
                claimed.entry(key).or_default().push((me, my_len));
            } else {
                rejected.insert(agent);
            }
        }
        rejected
    }

    /// Advance cap behind the nearest vehicle ahead, if the candidate would
    /// otherwise close in.
    fn follow_limit(
        &self,
        input: &ResolveInput<'_>,
        lanes: &LaneIndex,
        c:     &Candidate,
        lane:  u8,
    ) -> ConflictResult<Option<Limit>> {
        let gap = self.config.min_gap_m;
        let seg = input.network.segment(c.start.segment)?;

        let mut room: Option<(f32, f32)> = None;
        let mut tighten = |m: f32, v: f32| {
            room = Some(match room {
                Some((r, s)) if r <= m => (r, s),
                _ => (m, v),
            });
        };

        let check = [c.start.lane, lane];
        let n = if lane == c.start.lane { 1 } else { 2 };
        for &l in &check[..n] {
            if let Some(o) = lanes.leader(c.start.segment, l, c.start.offset_m, c.agent) {
                tighten(o.rear_m() - gap - c.start.offset_m, o.speed_mps);
            } else if let Some(next) = c.route_next {
                let next_lanes = input.network.segment(next)?.lanes;
                if let Some(o) = lanes.rearmost(next, l.min(next_lanes.saturating_sub(1))) {
                    tighten(seg.length_m - c.start.offset_m + o.rear_m() - gap, o.speed_mps);
                }
            }
        }

        Ok(match room {
            Some((max, speed)) if c.distance_m > max => Some(Limit {
                max_advance_m: Some(max.max(0.0)),
                speed_cap: Some(speed),
                ..Limit::NONE
            }),
            _ => None,
        })
    }

    /// Front vehicles close to their stop line, grouped by junction.
    fn contenders(
        &self,
        input:  &ResolveInput<'_>,
        lanes:  &LaneIndex,
        locked: &BTreeSet<AgentId>,
    ) -> ConflictResult<BTreeMap<JunctionId, Vec<Contender>>> {
        let now_ms = input.tick.0 * input.dt_ms as u64;
        let mut out: BTreeMap<JunctionId, Vec<Contender>> = BTreeMap::new();

        for (&agent, c) in input.candidates {
            let Some(movement) = c.movement() else { continue };
            if input.agents.status[agent.index()] != AgentStatus::Active {
                continue;
            }
            if !lanes.is_front(c.start.segment, c.start.lane, agent) {
                continue;
            }
            let seg = input.network.segment(c.start.segment)?;
            let dist_m = (seg.length_m - c.start.offset_m).max(0.0);
            let eta = self.eta_ms(dist_m, c.start.speed_mps);
            let near = dist_m <= self.config.approach_zone_m && eta <= self.config.approach_horizon_ms;
            if !(c.crossed || near) {
                continue;
            }
            if self.book.held_by(agent).is_some_and(|r| r.movement == movement && r.is_live_at(input.tick)) {
                continue;
            }

            let junction = seg.to;
            let arrival = self
                .arrivals
                .get(&agent)
                .filter(|a| a.movement == movement)
                .map_or(now_ms + eta, |a| a.at_ms);
            let vehicle = &input.agents.vehicle[agent.index()];
            out.entry(junction).or_default().push(Contender {
                agent,
                movement,
                arrival,
                allowed: input.control.is_allowed(junction, c.start.segment, input.tick),
                escalated: self.deadlock.is_deadlocked(agent),
                dist_m,
                speed_mps: c.start.speed_mps,
                stop_m: vehicle.stopping_distance(c.start.speed_mps),
                length_m: vehicle.length_m,
                lane: if locked.contains(&agent) { c.start.lane } else { c.target_lane() },
            });
        }
        Ok(out)
    }

    fn resolve_junction(
        &self,
        input:      &ResolveInput<'_>,
        lanes:      &LaneIndex,
        junction:   JunctionId,
        mut list:   Vec<Contender>,
        resolution: &mut Resolution,
    ) -> ConflictResult<()> {
        list.sort_by_key(|c| (!c.escalated, !c.allowed, c.arrival, c.agent));
        let j = input.network.junction(junction)?;
        let escalation = list.first().is_some_and(|c| c.escalated && c.allowed);
        let mut granted: Vec<Movement> = Vec::new();

        for (rank, c) in list.iter().enumerate() {
            let leads_escalation = escalation && rank == 0;
            let reason = if !c.allowed {
                Some(DenyReason::Signal)
            } else if escalation && rank > 0 {
                Some(DenyReason::Escalation)
            } else if self
                .book
                .at_junction(junction)
                .any(|r| r.agent != c.agent && r.is_live_at(input.tick) && j.conflicts(r.movement, c.movement))
                || granted.iter().any(|&g| j.conflicts(g, c.movement))
            {
                Some(DenyReason::Reserved)
            } else if !leads_escalation && !self.has_entry_space(input, lanes, c)? {
                Some(DenyReason::Spillback)
            } else {
                None
            };

            match reason {
                None => {
                    let ticks = self.occupancy_ticks(c, input.dt_ms);
                    resolution.grants.push(Grant {
                        agent:    c.agent,
                        junction,
                        movement: c.movement,
                        start:    input.tick,
                        end:      input.tick.offset(ticks),
                    });
                    granted.push(c.movement);
                    if leads_escalation {
                        resolution.escalated.push(c.agent);
                    }
                }
                Some(reason) => {
                    let (decision, mode) = if c.stop_m <= c.dist_m {
                        (Decision::Yield, BrakeMode::Comfort)
                    } else {
                        (Decision::Stop, BrakeMode::Hard)
                    };
                    if let Some(v) = resolution.verdicts.get_mut(&c.agent) {
                        v.decision = decision;
                        v.reason = Some(reason);
                        v.limit = v.limit.merge(Limit::hold(mode));
                    }
                    resolution.arrivals.insert(c.agent, Arrival { movement: c.movement, at_ms: c.arrival });
                    tracing::debug!(
                        agent = %c.agent, junction = %junction, decision = decision.as_str(), ?reason,
                        "contender refused"
                    );
                }
            }
        }
        Ok(())
    }

    /// Spillback guard: the outgoing lane must have room for the vehicle.
    fn has_entry_space(&self, input: &ResolveInput<'_>, lanes: &LaneIndex, c: &Contender) -> ConflictResult<bool> {
        let out = input.network.segment(c.movement.to)?;
        let lane = c.lane.min(out.lanes.saturating_sub(1));
        Ok(lanes
            .rearmost(c.movement.to, lane)
            .is_none_or(|o| o.rear_m() >= c.length_m + self.config.min_gap_m))
    }
}
