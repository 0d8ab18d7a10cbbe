//! The `Sim` struct and its tick loop.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tf_agent::{AgentInit, AgentRngs, AgentStore};
use tf_conflict::{LaneIndex, ResolveInput, Resolver, Verdict};
use tf_control::{QueueCounts, TrafficControl};
use tf_core::{AgentId, AgentStatus, ReservationId, SegmentId, SimClock, Tick};
use tf_mobility::{Candidate, MobilityEngine};
use tf_network::{CongestionCosts, NetworkError, RoadNetwork, Router};
use tf_policy::{
    evaluate, Action, Decided, DecisionOutcome, Observation, Policy, RewardModel, RewardSignal, TimeoutMonitor,
};
use tf_schedule::{RandomSpawner, SpawnQueue, SpawnRequest};

use crate::budget::{decide_within, Job};
use crate::observe::{AgentIndex, ObserveInput};
use crate::snapshot::{AgentSnapshot, WorldSnapshot};
use crate::{AgentMetrics, CollisionPolicy, EngineConfig, Metrics, SimError, SimObserver, SimResult, TickSummary};

/// Below this speed an Active agent counts as waiting.
const STOPPED_MPS: f32 = 0.1;

#[cfg(feature = "fx-hash")]
type AgentMap<V> = rustc_hash::FxHashMap<AgentId, V>;
#[cfg(not(feature = "fx-hash"))]
type AgentMap<V> = std::collections::HashMap<AgentId, V>;

/// When a Waiting agent next tries to plan.
#[derive(Copy, Clone, Debug)]
struct Retry {
    at:       Tick,
    revision: u64,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The main simulation runner.
///
/// `Sim<P, R>` holds all simulation state and drives the fixed-step tick:
///
/// 1. **Spawn**: due requests enter if their entry gap is clear, otherwise
///    they are deferred one tick.  New agents are routed immediately.
/// 2. **Signals**: approach queues are counted and controllers advance.
/// 3. **Observe** (sequential): one [`Observation`] per Active agent from
///    the committed state.
/// 4. **Decide** (optionally parallel with the `parallel` feature): the
///    policy is evaluated under the decision budget.
/// 5. **Propose**: each action is integrated into a candidate state.
/// 6. **Resolve**: the [`Resolver`] accepts, yields or stops every
///    candidate.
/// 7. **Commit** (sequential, ascending `AgentId`): denied agents are
///    re-integrated under their limits and all kinematics are written.
///    Completions, reservations and collisions follow.
/// 8. **Replan**: stale, congested and waiting agents are rerouted.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<P: Policy, R: Router> {
    pub config:   EngineConfig,
    pub clock:    SimClock,
    pub network:  RoadNetwork,
    pub control:  TrafficControl,
    /// Committed agent state (SoA arrays).
    pub agents:   AgentStore,
    /// Per-agent deterministic RNGs, separated for the split-borrow pattern.
    pub rngs:     AgentRngs,
    pub mobility: MobilityEngine<R>,
    pub resolver: Resolver,
    pub spawns:   SpawnQueue,
    pub metrics:  Metrics,
    /// Shared so budgeted decisions can run off the simulation thread.
    pub policy:   Arc<P>,

    reward:         Box<dyn RewardModel>,
    spawner:        Option<RandomSpawner>,
    initial_spawns: Vec<SpawnRequest>,
    last_actions:   Vec<Option<Action>>,
    last_verdicts:  BTreeMap<AgentId, Verdict>,
    last_rewards:   Vec<(AgentId, f32)>,
    timeouts:       TimeoutMonitor,
    retry:          AgentMap<Retry>,
    /// Overlapping pairs seen last tick, so a lasting overlap counts once.
    contacts:       BTreeSet<(AgentId, AgentId)>,
    paused:         bool,
}

impl<P: Policy, R: Router> Sim<P, R> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        config:   EngineConfig,
        network:  RoadNetwork,
        control:  TrafficControl,
        agents:   AgentStore,
        rngs:     AgentRngs,
        resolver: Resolver,
        spawns:   Vec<SpawnRequest>,
        spawner:  Option<RandomSpawner>,
        reward:   Box<dyn RewardModel>,
        policy:   P,
        router:   R,
    ) -> Self {
        Self {
            clock: config.sim.make_clock(),
            config,
            network,
            control,
            agents,
            rngs,
            mobility: MobilityEngine::new(router),
            resolver,
            spawns: SpawnQueue::from_requests(spawns.iter().copied()),
            metrics: Metrics::default(),
            policy: Arc::new(policy),
            reward,
            spawner,
            initial_spawns: spawns,
            last_actions: Vec::new(),
            last_verdicts: BTreeMap::new(),
            last_rewards: Vec::new(),
            timeouts: TimeoutMonitor::new(),
            retry: AgentMap::default(),
            contacts: BTreeSet::new(),
            paused: false,
        }
    }

    // ── Run control ───────────────────────────────────────────────────────

    /// Run from the current tick to `config.sim.end_tick()`, or until paused.
    ///
    /// Calls observer hooks at every tick boundary.  Use
    /// [`NoopObserver`][crate::NoopObserver] if you don't need callbacks.
    /// A paused simulation returns immediately; call [`resume`](Self::resume)
    /// first.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let end = self.config.sim.end_tick();
        while !self.paused {
            if self.clock.current_tick >= end {
                observer.on_sim_end(self.clock.current_tick);
                break;
            }
            self.step(observer)?;
            if observer.wants_pause() {
                tracing::info!(tick = self.clock.current_tick.0, "paused by observer");
                self.paused = true;
            }
        }
        Ok(())
    }

    /// Run exactly `n` ticks from the current position (ignores the end tick
    /// and the pause flag).
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Process one tick and advance the clock.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<TickSummary> {
        let now = self.clock.current_tick;
        observer.on_tick_start(now);
        let summary = self.process_tick(now)?;
        self.metrics.global.add(&summary);
        observer.on_tick_end(&summary);
        if !self.last_rewards.is_empty() {
            observer.on_rewards(now, &self.last_rewards);
        }
        let every = self.config.sim.output_interval_ticks;
        if every > 0 && now.0.is_multiple_of(every) {
            observer.on_snapshot(now, &self.agents);
        }
        self.clock.advance();
        Ok(summary)
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Return to tick zero: no agents, no reservations, every segment open,
    /// scheduled spawns replayed from the start.
    pub fn reset(&mut self) -> SimResult<()> {
        let closed: Vec<SegmentId> =
            self.network.segments().iter().map(|s| s.id).filter(|&s| !self.network.is_open(s)).collect();
        for seg in closed {
            self.network.reopen_segment(seg)?;
        }
        self.clock.reset();
        self.agents.clear();
        self.rngs.clear();
        self.mobility.clear();
        self.resolver.reset();
        self.control.reset();
        self.spawns = SpawnQueue::from_requests(self.initial_spawns.iter().copied());
        if let Some(s) = self.spawner.as_mut() {
            s.reset();
        }
        self.metrics.clear();
        self.last_actions.clear();
        self.last_verdicts.clear();
        self.last_rewards.clear();
        self.timeouts.clear();
        self.retry.clear();
        self.contacts.clear();
        self.paused = false;
        tracing::info!("simulation reset");
        Ok(())
    }

    // ── External requests ─────────────────────────────────────────────────

    /// Place a new agent now, outside the spawn schedule.
    ///
    /// Fails with [`SimError::SpawnBlocked`] when another vehicle occupies
    /// the entry gap.  An agent with no feasible route is admitted as
    /// `Waiting`.
    pub fn inject(&mut self, init: AgentInit) -> SimResult<AgentId> {
        self.check_spawn(&init)?;
        if !self.entry_clear(&init) {
            return Err(SimError::SpawnBlocked(init.start.segment));
        }
        let occupancy = self.agents.occupancy(self.network.segment_count());
        let costs = CongestionCosts::new(&self.network, &self.config.routing, &occupancy);
        self.admit(init, self.clock.current_tick, &costs)
    }

    /// Take `agent` off the network.  Its reservation is voided at once.
    pub fn remove(&mut self, agent: AgentId) -> SimResult<()> {
        let now = self.clock.current_tick;
        if !self.agents.status_of(agent)?.is_live() {
            return Err(SimError::NotLive(agent));
        }
        self.retire(agent, AgentStatus::Removed, now)?;
        tracing::info!(agent = %agent, tick = now.0, "agent removed");
        Ok(())
    }

    /// Close `segment` to new routes.  Agents already on it may leave.
    pub fn close_segment(&mut self, segment: SegmentId) -> SimResult<bool> {
        Ok(self.network.close_segment(segment)?)
    }

    pub fn reopen_segment(&mut self, segment: SegmentId) -> SimResult<bool> {
        Ok(self.network.reopen_segment(segment)?)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick
    }

    pub fn agent_metrics(&self, agent: AgentId) -> Option<&AgentMetrics> {
        self.metrics.agent(agent)
    }

    /// The resolver's verdict for `agent` in the last tick, if it moved.
    pub fn last_verdict(&self, agent: AgentId) -> Option<&Verdict> {
        self.last_verdicts.get(&agent)
    }

    pub fn last_rewards(&self) -> &[(AgentId, f32)] {
        &self.last_rewards
    }

    pub fn route(&self, agent: AgentId) -> &[SegmentId] {
        self.mobility.routes.remaining(agent)
    }

    pub fn timeout_rate(&self) -> f64 {
        self.timeouts.rate()
    }

    pub fn snapshot(&self) -> SimResult<WorldSnapshot> {
        let tick = self.clock.current_tick;
        let mut agents = Vec::with_capacity(self.agents.count);
        for a in self.agents.agent_ids() {
            let i = a.index();
            let res = self.agents.reservation[i];
            agents.push(AgentSnapshot {
                agent:       a,
                status:      self.agents.status[i],
                segment:     self.agents.segment[i],
                offset_m:    self.agents.offset_m[i],
                lane:        self.agents.lane[i],
                speed_mps:   self.agents.speed_mps[i],
                accel_mps2:  self.agents.accel_mps2[i],
                position:    self.network.position(self.agents.segment[i], self.agents.offset_m[i], self.agents.lane[i])?,
                reservation: (res != ReservationId::INVALID).then_some(res),
            });
        }
        let signals = self
            .control
            .junctions()
            .filter_map(|j| self.control.phase(j, tick).map(|p| (j, p)))
            .collect();
        let closed = self.network.segments().iter().map(|s| s.id).filter(|&s| !self.network.is_open(s)).collect();
        Ok(WorldSnapshot {
            tick,
            agents,
            reservations: self.resolver.book().iter().copied().collect(),
            signals,
            closed,
        })
    }

    // ── Core tick processing ──────────────────────────────────────────────

    fn process_tick(&mut self, now: Tick) -> SimResult<TickSummary> {
        let started = Instant::now();
        let dt = self.clock.dt_secs();
        let mut summary = TickSummary { tick: now, ..TickSummary::default() };

        // ── Phase 1: spawns ───────────────────────────────────────────────
        self.spawn_due(now, &mut summary)?;

        // ── Phase 2: signals ──────────────────────────────────────────────
        //
        // Controllers advance before anyone observes, so observations and
        // the resolver see the same phase.
        let queues = self.queue_counts()?;
        self.control.advance(now, &queues);

        // ── Phase 3: observations (sequential) ────────────────────────────
        let active: Vec<AgentId> = self.agents.active_ids().collect();
        let observations = self.observe_all(now, &active)?;

        // ── Phase 4: decisions ────────────────────────────────────────────
        let decided = self.decide_all(&active, &observations);
        for (&agent, d) in active.iter().zip(&decided) {
            self.last_actions[agent.index()] = Some(d.action);
            match d.outcome {
                DecisionOutcome::Ok => {}
                DecisionOutcome::Timeout => {
                    summary.timeouts += 1;
                    if let Some(m) = self.metrics.agent_mut(agent) {
                        m.timeouts += 1;
                    }
                }
                DecisionOutcome::Malformed => summary.malformed += 1,
            }
        }

        // ── Phase 5: propose ──────────────────────────────────────────────
        let mut candidates = BTreeMap::new();
        for (&agent, d) in active.iter().zip(&decided) {
            let cand = self.mobility.propose(&self.network, &self.agents, agent, d.action, dt)?;
            candidates.insert(agent, cand);
        }

        // ── Phase 6: resolve ──────────────────────────────────────────────
        let resolution = self.resolver.resolve(ResolveInput {
            network:    &self.network,
            control:    &self.control,
            agents:     &self.agents,
            candidates: &candidates,
            tick:       now,
            dt_ms:      self.config.sim.tick_duration_ms,
        })?;
        let (accepts, yields, stops) = resolution.tally();
        summary.accepts = accepts;
        summary.yields = yields;
        summary.stops = stops;

        // ── Phase 7: commit kinematics (ascending AgentId) ────────────────
        let mut committed: Vec<Candidate> = Vec::with_capacity(candidates.len());
        let mut violations: BTreeSet<AgentId> = BTreeSet::new();
        for (&agent, d) in active.iter().zip(&decided) {
            let Some(verdict) = resolution.verdict(agent).copied() else {
                continue;
            };
            let cand = if verdict.needs_reintegration() {
                self.mobility.integrate_limited(&self.network, &self.agents, agent, d.action, verdict.limit, dt)?
            } else {
                candidates[&agent]
            };
            if cand.crossed {
                let junction = self.network.segment(cand.start.segment)?.to;
                if !self.control.is_allowed(junction, cand.start.segment, now) {
                    tracing::warn!(agent = %agent, junction = %junction, tick = now.0, "crossed against the signal");
                    violations.insert(agent);
                }
            }
            self.mobility.commit(&mut self.agents, &cand)?;
            if let Some(m) = self.metrics.agent_mut(agent) {
                m.distance_m += cand.distance_m as f64;
                match verdict.decision {
                    tf_conflict::Decision::Accept => {}
                    tf_conflict::Decision::Yield => m.yields += 1,
                    tf_conflict::Decision::Stop => m.stops += 1,
                }
                if violations.contains(&agent) {
                    m.violations += 1;
                }
            }
            committed.push(cand);
        }
        self.last_verdicts = resolution.verdicts.clone();

        for cand in &committed {
            if cand.completed {
                self.agents.finish(cand.agent, AgentStatus::Completed, now)?;
                self.mobility.routes.remove(cand.agent);
                if let Some(m) = self.metrics.agent_mut(cand.agent) {
                    m.completion_tick = Some(now);
                }
                summary.completed += 1;
                tracing::debug!(agent = %cand.agent, tick = now.0, "agent completed");
            }
        }

        // ── Phase 8: reservations ─────────────────────────────────────────
        //
        // An invariant violation is fatal and propagates from here.
        let report = self.resolver.commit(resolution, &self.network, &self.agents)?;
        for &(agent, id) in &report.granted {
            if self.agents.status[agent.index()].is_live() {
                self.agents.reservation[agent.index()] = id;
            }
        }
        for r in report.released.iter().chain(&report.expired) {
            let slot = &mut self.agents.reservation[r.agent.index()];
            if *slot == r.id {
                *slot = ReservationId::INVALID;
            }
        }
        summary.deadlocks = report.deadlocked.len();
        for cand in committed.iter().filter(|c| c.completed) {
            self.resolver.forget(cand.agent, now);
        }

        // ── Phase 9: collisions ───────────────────────────────────────────
        let collided = self.detect_collisions(now, &mut summary)?;

        // ── Phase 10: replanning ──────────────────────────────────────────
        self.replan(now, &mut summary)?;

        // ── Phase 11: bookkeeping ─────────────────────────────────────────
        self.timeouts.record(now, active.len() as u64, summary.timeouts as u64, self.config.decision.rate_window_ticks);
        if let Some(rate) = self.timeouts.exceeded(&self.config.decision) {
            let limit = self.config.decision.max_timeout_rate;
            tracing::error!(tick = now.0, rate, limit, "decision timeout rate exceeded");
            return Err(SimError::TimeoutRate { rate, limit });
        }

        self.last_rewards.clear();
        for cand in &committed {
            let signal = RewardSignal {
                progress_m:  cand.distance_m,
                collided:    collided.contains(&cand.agent),
                violation:   violations.contains(&cand.agent),
                harsh_brake: self.config.reward.is_harsh(cand.accel_mps2),
                completed:   cand.completed,
            };
            let r = self.reward.reward(&signal);
            if let Some(m) = self.metrics.agent_mut(cand.agent) {
                m.total_reward += r as f64;
            }
            self.last_rewards.push((cand.agent, r));
        }

        for a in self.agents.live_ids() {
            let i = a.index();
            let waiting = self.agents.status[i] == AgentStatus::Waiting || self.agents.speed_mps[i] < STOPPED_MPS;
            if let Some(m) = self.metrics.agents_mut().get_mut(i) {
                m.record_wait(waiting);
            }
            match self.agents.status[i] {
                AgentStatus::Waiting => summary.waiting += 1,
                _ => summary.active += 1,
            }
            summary.live += 1;
        }
        summary.reservations = self.resolver.book().len();
        summary.elapsed_us = started.elapsed().as_micros() as u64;
        if started.elapsed() > Duration::from_millis(self.config.sim.tick_duration_ms as u64) {
            summary.overrun = true;
            tracing::warn!(tick = now.0, elapsed_us = summary.elapsed_us, "tick exceeded its wall-clock budget");
        }
        Ok(summary)
    }

    // ── Spawning ──────────────────────────────────────────────────────────

    fn spawn_due(&mut self, now: Tick, summary: &mut TickSummary) -> SimResult<()> {
        let mut due = self.spawns.drain_due(now);
        if let Some(spawner) = self.spawner.as_mut() {
            due.extend(spawner.poll(now, self.agents.live_count()));
        }
        if due.is_empty() {
            return Ok(());
        }

        let occupancy = self.agents.occupancy(self.network.segment_count());
        let costs = CongestionCosts::new(&self.network, &self.config.routing, &occupancy);
        for req in due {
            if let Err(e) = req.validate().map_err(SimError::from).and_then(|_| self.check_spawn(&req.init)) {
                tracing::warn!(tick = now.0, error = %e, "spawn request dropped");
                continue;
            }
            if !self.entry_clear(&req.init) {
                tracing::debug!(segment = %req.init.start.segment, tick = now.0, "spawn deferred, entry occupied");
                self.spawns.push(SpawnRequest { tick: now.offset(1), ..req });
                summary.deferred += 1;
                continue;
            }
            self.admit(req.init, now, &costs)?;
            summary.spawned += 1;
        }
        Ok(())
    }

    fn check_spawn(&self, init: &AgentInit) -> SimResult<()> {
        let invalid = |reason: String| SimError::InvalidSpawn { segment: init.start.segment, reason };
        let seg = self.network.segment(init.start.segment).map_err(|e| invalid(e.to_string()))?;
        self.network.segment(init.goal).map_err(|e| invalid(e.to_string()))?;
        if init.start.lane >= seg.lanes {
            return Err(invalid(format!("lane {} out of range ({} lanes)", init.start.lane, seg.lanes)));
        }
        if !(0.0..=seg.length_m).contains(&init.start.offset_m) {
            return Err(invalid(format!("offset {} outside [0, {}]", init.start.offset_m, seg.length_m)));
        }
        if !init.vehicle.is_valid() || !(init.start.speed_mps >= 0.0) {
            return Err(invalid("invalid vehicle or negative speed".into()));
        }
        Ok(())
    }

    /// No live vehicle overlaps the new body plus the minimum gap.
    fn entry_clear(&self, init: &AgentInit) -> bool {
        let gap = self.config.conflict.min_gap_m;
        let front = init.start.offset_m;
        let rear = front - init.vehicle.length_m;
        self.agents.live_ids().all(|a| {
            let i = a.index();
            if self.agents.segment[i] != init.start.segment || self.agents.lane[i] != init.start.lane {
                return true;
            }
            let o_front = self.agents.offset_m[i];
            let o_rear = o_front - self.agents.vehicle[i].length_m;
            o_rear >= front + gap || o_front + gap <= rear
        })
    }

    fn admit(&mut self, init: AgentInit, now: Tick, costs: &CongestionCosts) -> SimResult<AgentId> {
        let agent = self.agents.spawn(init, now);
        let count = self.agents.count;
        self.rngs.grow_to(count);
        self.mobility.routes.grow_to(count);
        self.last_actions.resize(count, None);
        self.metrics.register(agent, now);

        match self.mobility.plan_route(&self.network, agent, init.start.segment, init.goal, costs) {
            Ok(()) => {
                tracing::debug!(agent = %agent, segment = %init.start.segment, goal = %init.goal, tick = now.0, "agent spawned");
            }
            Err(e) if e.is_infeasible() => {
                tracing::info!(agent = %agent, goal = %init.goal, "no feasible route at spawn, waiting");
                self.agents.set_waiting(agent)?;
                self.schedule_retry(agent, now);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(agent)
    }

    // ── Signals ───────────────────────────────────────────────────────────

    /// Live vehicles within the approach zone of each signalised approach.
    fn queue_counts(&self) -> SimResult<QueueCounts> {
        let mut queues = QueueCounts::new();
        if self.control.is_empty() {
            return Ok(queues);
        }
        let zone = self.config.conflict.approach_zone_m;
        for a in self.agents.live_ids() {
            let i = a.index();
            let seg = self.network.segment(self.agents.segment[i])?;
            if self.control.is_controlled(seg.to) && seg.length_m - self.agents.offset_m[i] <= zone {
                *queues.entry(seg.id).or_default() += 1;
            }
        }
        Ok(queues)
    }

    // ── Observation and decision ──────────────────────────────────────────

    fn observe_all(&self, now: Tick, active: &[AgentId]) -> SimResult<Vec<Observation>> {
        let lanes = LaneIndex::build(&self.agents);
        let index = AgentIndex::build(&self.network, &self.agents)?;
        let occupancy = self.agents.occupancy(self.network.segment_count());
        let input = ObserveInput {
            network:   &self.network,
            agents:    &self.agents,
            routes:    &self.mobility.routes,
            control:   &self.control,
            resolver:  &self.resolver,
            lanes:     &lanes,
            index:     &index,
            occupancy: &occupancy,
            config:    &self.config.observation,
            tick:      now,
        };
        active.iter().map(|&a| input.observe(a)).collect()
    }

    /// Evaluate the policy for every Active agent.
    ///
    /// With a decision budget the phase returns by the deadline whatever the
    /// policy does (see the `budget` module).  Without one, the calls run in
    /// place, on Rayon's thread pool with the `parallel` Cargo feature.
    /// Results come back in `active` order either way.
    fn decide_all(&mut self, active: &[AgentId], observations: &[Observation]) -> Vec<Decided> {
        if let Some(ms) = self.config.decision.budget_ms {
            let jobs = active
                .iter()
                .zip(observations)
                .map(|(&agent, obs)| Job {
                    agent,
                    obs: obs.clone(),
                    rng: self.rngs.get_mut(agent).clone(),
                    last: self.last_actions[agent.index()],
                })
                .collect();
            let answers = decide_within(&self.policy, jobs, &self.config.decision, Duration::from_millis(ms));
            return active
                .iter()
                .zip(answers)
                .map(|(&agent, answer)| {
                    if let Some(rng) = answer.rng {
                        *self.rngs.get_mut(agent) = rng;
                    }
                    answer.decided
                })
                .collect();
        }

        // Explicit field borrows so the borrow checker sees disjoint access.
        let policy: &P = &self.policy;
        let config = &self.config.decision;
        let last = self.last_actions.as_slice();
        let rngs = &mut self.rngs;

        #[cfg(not(feature = "parallel"))]
        {
            active
                .iter()
                .zip(observations)
                .map(|(&agent, obs)| evaluate(policy, obs, rngs.get_mut(agent), config, last[agent.index()]))
                .collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            // `active` is ascending with unique ids (from `active_ids`).
            let rng_refs = rngs.get_many_mut(active);

            active
                .par_iter()
                .zip(rng_refs.into_par_iter())
                .zip(observations.par_iter())
                .map(|((&agent, rng), obs)| evaluate(policy, obs, rng, config, last[agent.index()]))
                .collect()
        }
    }

    // ── Collisions ────────────────────────────────────────────────────────

    fn detect_collisions(&mut self, now: Tick, summary: &mut TickSummary) -> SimResult<BTreeSet<AgentId>> {
        let pairs: BTreeSet<(AgentId, AgentId)> =
            LaneIndex::build(&self.agents).overlapping_pairs().into_iter().collect();
        let mut collided = BTreeSet::new();
        for &(a, b) in pairs.difference(&self.contacts) {
            tracing::warn!(a = %a, b = %b, tick = now.0, "collision");
            summary.collisions += 1;
            for agent in [a, b] {
                collided.insert(agent);
                if let Some(m) = self.metrics.agent_mut(agent) {
                    m.collisions += 1;
                }
            }
        }
        if self.config.collision == CollisionPolicy::Terminal {
            for &agent in &collided {
                self.retire(agent, AgentStatus::Removed, now)?;
                summary.removed += 1;
            }
            self.contacts.clear();
        } else {
            self.contacts = pairs;
        }
        Ok(collided)
    }

    /// Make `agent` terminal and drop its route, reservation and retry slot.
    fn retire(&mut self, agent: AgentId, status: AgentStatus, now: Tick) -> SimResult<()> {
        self.agents.finish(agent, status, now)?;
        self.mobility.routes.remove(agent);
        self.resolver.forget(agent, now);
        self.retry.remove(&agent);
        Ok(())
    }

    // ── Replanning ────────────────────────────────────────────────────────

    fn schedule_retry(&mut self, agent: AgentId, now: Tick) {
        let retry = Retry { at: now.offset(self.config.routing.waiting_retry_ticks), revision: self.network.revision() };
        self.retry.insert(agent, retry);
    }

    /// No feasible route: stop in place and retry later.
    fn park(&mut self, agent: AgentId, now: Tick) -> SimResult<()> {
        tracing::info!(agent = %agent, tick = now.0, "route became infeasible, waiting");
        self.agents.set_waiting(agent)?;
        self.resolver.forget(agent, now);
        self.agents.reservation[agent.index()] = ReservationId::INVALID;
        self.schedule_retry(agent, now);
        Ok(())
    }

    fn replan(&mut self, now: Tick, summary: &mut TickSummary) -> SimResult<()> {
        let revision = self.network.revision();
        let interval = self.config.routing.replan_interval_ticks;
        let occupancy = self.agents.occupancy(self.network.segment_count());
        let costs = CongestionCosts::new(&self.network, &self.config.routing, &occupancy);
        let live: Vec<AgentId> = self.agents.live_ids().collect();

        for agent in live {
            let i = agent.index();
            let goal = self.agents.goal[i];
            let here = self.agents.segment[i];

            if self.agents.status[i] == AgentStatus::Waiting {
                let due = self.retry.get(&agent).is_none_or(|r| r.revision != revision || now >= r.at);
                if !due {
                    continue;
                }
                match self.mobility.plan_route(&self.network, agent, here, goal, &costs) {
                    Ok(()) => {
                        self.agents.set_active(agent)?;
                        self.retry.remove(&agent);
                        self.count_replan(agent, summary);
                        tracing::info!(agent = %agent, tick = now.0, "route found, resuming");
                    }
                    Err(e) if e.is_infeasible() => self.schedule_retry(agent, now),
                    Err(e) => return Err(e.into()),
                }
                continue;
            }

            let before = self.mobility.routes.next_segment(agent);
            let mut changed = false;
            if self.mobility.routes.is_stale(agent, &self.network) {
                if !self.mobility.routes.revalidate(agent, &self.network) {
                    match self.mobility.plan_route(&self.network, agent, here, goal, &costs) {
                        Ok(()) => changed = true,
                        Err(e) if e.is_infeasible() => {
                            self.park(agent, now)?;
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            } else if interval > 0 {
                let age = now.since(self.agents.spawn_tick[i]);
                if age > 0 && age.is_multiple_of(interval) {
                    match self.mobility.better_route(&self.network, agent, &costs, &self.config.routing) {
                        Ok(Some(plan)) => {
                            tracing::debug!(agent = %agent, tick = now.0, "switching to a less congested route");
                            self.mobility.routes.assign(agent, plan, revision);
                            changed = true;
                        }
                        Ok(None) => {}
                        Err(NetworkError::Infeasible { .. }) => {}
                        Err(e) => return Err(e.into()),
                    }
                }
            }

            if changed {
                self.count_replan(agent, summary);
                self.drop_stale_reservation(agent, before, now);
            }
        }
        Ok(())
    }

    fn count_replan(&mut self, agent: AgentId, summary: &mut TickSummary) {
        summary.replans += 1;
        if let Some(m) = self.metrics.agent_mut(agent) {
            m.replans += 1;
        }
    }

    /// A reservation for a movement the new route no longer takes is
    /// released before the agent reaches the junction.
    fn drop_stale_reservation(&mut self, agent: AgentId, before: Option<SegmentId>, now: Tick) {
        let after = self.mobility.routes.next_segment(agent);
        if before == after {
            return;
        }
        let here = self.agents.segment[agent.index()];
        let stale = self
            .resolver
            .book()
            .held_by(agent)
            .is_some_and(|r| r.movement.from == here && Some(r.movement.to) != after);
        if stale {
            self.resolver.forget(agent, now);
            self.agents.reservation[agent.index()] = ReservationId::INVALID;
            tracing::debug!(agent = %agent, tick = now.0, "reservation released after reroute");
        }
    }
}
