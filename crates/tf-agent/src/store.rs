//! Core agent storage: `AgentStore` (SoA data) and `AgentRngs` (per-agent RNG).
//!
//! # Why two structs?
//!
//! The parallel decision phase needs `&mut AgentRngs` (exclusive access to
//! each agent's RNG) and `&AgentStore` (shared read access to world state)
//! simultaneously.  Keeping RNGs in a separate struct lets the borrow checker
//! see the two borrows as disjoint:
//!
//! ```ignore
//! // tf-sim decision phase (simplified):
//! let store: &AgentStore = &sim.agents;
//! let rng_refs = sim.rngs.get_many_mut(&live);
//! live.par_iter().zip(rng_refs).map(|(&a, rng)| policy.decide(&obs[a], rng));
//! ```

use tf_core::{AgentId, AgentRng, AgentStatus, ReservationId, SegmentId, Tick, TfError, TfResult};

use crate::{AgentInit, Kinematics, VehicleSpec};

// ── AgentRngs ─────────────────────────────────────────────────────────────────

/// Per-agent deterministic RNG state, separated from [`AgentStore`] to enable
/// simultaneous `&mut AgentRngs` + `&AgentStore` borrows.
pub struct AgentRngs {
    pub inner: Vec<AgentRng>,
    seed:      u64,
}

impl AgentRngs {
    pub(crate) fn new(count: usize, global_seed: u64) -> Self {
        let mut rngs = Self { inner: Vec::with_capacity(count), seed: global_seed };
        rngs.grow_to(count);
        rngs
    }

    /// Seed RNGs for every agent id below `count` that has none yet.
    ///
    /// Agent `i` always receives `AgentRng::new(seed, i)`, regardless of when
    /// it was spawned.
    pub fn grow_to(&mut self, count: usize) {
        let start = self.inner.len() as u32;
        self.inner
            .extend((start..count as u32).map(|i| AgentRng::new(self.seed, AgentId(i))));
    }

    /// Drop every RNG (used by `Sim::reset`).
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Mutable reference to one agent's RNG.
    #[inline]
    pub fn get_mut(&mut self, agent: AgentId) -> &mut AgentRng {
        &mut self.inner[agent.index()]
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Return mutable references to the RNGs for a set of agents.
    ///
    /// # Precondition (enforced by caller)
    ///
    /// `agents` must contain no duplicate `AgentId`s and all indices must be
    /// in-bounds.  Both hold for the ascending live-agent list the
    /// simulation builds each tick.
    pub fn get_many_mut(&mut self, agents: &[AgentId]) -> Vec<&mut AgentRng> {
        debug_assert!(agents.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(agents.last().is_none_or(|a| a.index() < self.inner.len()));
        let ptr = self.inner.as_mut_ptr();
        // SAFETY: `agents` is strictly ascending (so unique) and in bounds.
        // Each pointer therefore aliases a distinct element of `self.inner`.
        agents
            .iter()
            .map(|a| unsafe { &mut *ptr.add(a.index()) })
            .collect()
    }
}

// ── AgentStore ────────────────────────────────────────────────────────────────

/// Structure-of-Arrays storage for all agent state.
///
/// Every `Vec` field has exactly `count` elements; the `AgentId` value is the
/// index into all of them.  Fields are `pub` for cheap reads by the
/// simulation phases; writes happen only during the sequential commit.
pub struct AgentStore {
    /// Number of agent slots ever allocated.
    pub count: usize,

    pub status: Vec<AgentStatus>,

    // ── Kinematic state ───────────────────────────────────────────────────
    pub segment:    Vec<SegmentId>,
    /// Distance from the start of `segment`, in `[0, length]`.
    pub offset_m:   Vec<f32>,
    pub lane:       Vec<u8>,
    pub speed_mps:  Vec<f32>,
    /// Acceleration applied during the last committed tick.
    pub accel_mps2: Vec<f32>,

    pub vehicle: Vec<VehicleSpec>,
    pub goal:    Vec<SegmentId>,

    /// Junction reservation currently held.  `ReservationId::INVALID` when
    /// none.
    pub reservation: Vec<ReservationId>,

    pub spawn_tick:  Vec<Tick>,
    /// Tick the agent became terminal; `None` while live.
    pub finish_tick: Vec<Option<Tick>>,
}

impl AgentStore {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            count:       0,
            status:      Vec::with_capacity(cap),
            segment:     Vec::with_capacity(cap),
            offset_m:    Vec::with_capacity(cap),
            lane:        Vec::with_capacity(cap),
            speed_mps:   Vec::with_capacity(cap),
            accel_mps2:  Vec::with_capacity(cap),
            vehicle:     Vec::with_capacity(cap),
            goal:        Vec::with_capacity(cap),
            reservation: Vec::with_capacity(cap),
            spawn_tick:  Vec::with_capacity(cap),
            finish_tick: Vec::with_capacity(cap),
        }
    }

    /// `true` if no agent was ever spawned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append a new agent and return its id.  The agent starts `Active`.
    pub fn spawn(&mut self, init: AgentInit, tick: Tick) -> AgentId {
        let id = AgentId(self.count as u32);
        self.status.push(AgentStatus::Active);
        self.segment.push(init.start.segment);
        self.offset_m.push(init.start.offset_m);
        self.lane.push(init.start.lane);
        self.speed_mps.push(init.start.speed_mps);
        self.accel_mps2.push(0.0);
        self.vehicle.push(init.vehicle);
        self.goal.push(init.goal);
        self.reservation.push(ReservationId::INVALID);
        self.spawn_tick.push(tick);
        self.finish_tick.push(None);
        self.count += 1;
        id
    }

    /// Drop every agent (used by `Sim::reset`).
    pub fn clear(&mut self) {
        *self = Self::with_capacity(0);
    }

    #[inline]
    pub fn contains(&self, agent: AgentId) -> bool {
        agent.index() < self.count
    }

    fn check(&self, agent: AgentId) -> TfResult<usize> {
        if self.contains(agent) {
            Ok(agent.index())
        } else {
            Err(TfError::AgentNotFound(agent))
        }
    }

    pub fn status_of(&self, agent: AgentId) -> TfResult<AgentStatus> {
        Ok(self.status[self.check(agent)?])
    }

    /// Iterator over all `AgentId`s in ascending index order.
    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.count as u32).map(AgentId)
    }

    /// Ascending ids of agents that still occupy road space.
    pub fn live_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agent_ids().filter(|a| self.status[a.index()].is_live())
    }

    /// Ascending ids of agents currently following a route.
    pub fn active_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agent_ids().filter(|a| self.status[a.index()] == AgentStatus::Active)
    }

    pub fn live_count(&self) -> usize {
        self.status.iter().filter(|s| s.is_live()).count()
    }

    // ── Kinematics ────────────────────────────────────────────────────────

    pub fn kinematics(&self, agent: AgentId) -> TfResult<Kinematics> {
        let i = self.check(agent)?;
        Ok(Kinematics {
            segment:   self.segment[i],
            offset_m:  self.offset_m[i],
            lane:      self.lane[i],
            speed_mps: self.speed_mps[i],
        })
    }

    /// Write a committed kinematic state.
    pub fn set_kinematics(&mut self, agent: AgentId, k: Kinematics, accel_mps2: f32) -> TfResult<()> {
        let i = self.check(agent)?;
        self.segment[i] = k.segment;
        self.offset_m[i] = k.offset_m;
        self.lane[i] = k.lane;
        self.speed_mps[i] = k.speed_mps;
        self.accel_mps2[i] = accel_mps2;
        Ok(())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Mark `agent` as `Waiting` (no feasible route) and zero its speed.
    pub fn set_waiting(&mut self, agent: AgentId) -> TfResult<()> {
        let i = self.check(agent)?;
        if self.status[i] == AgentStatus::Active {
            self.status[i] = AgentStatus::Waiting;
            self.speed_mps[i] = 0.0;
            self.accel_mps2[i] = 0.0;
        }
        Ok(())
    }

    /// Return a `Waiting` agent to `Active`.
    pub fn set_active(&mut self, agent: AgentId) -> TfResult<()> {
        let i = self.check(agent)?;
        if self.status[i] == AgentStatus::Waiting {
            self.status[i] = AgentStatus::Active;
        }
        Ok(())
    }

    /// Mark `agent` terminal with `status` at `tick`, dropping its
    /// reservation handle.  Returns the previous status.
    ///
    /// Terminal agents stay terminal: finishing twice is a no-op.
    pub fn finish(&mut self, agent: AgentId, status: AgentStatus, tick: Tick) -> TfResult<AgentStatus> {
        debug_assert!(status.is_terminal());
        let i = self.check(agent)?;
        let prev = self.status[i];
        if prev.is_live() {
            self.status[i] = status;
            self.finish_tick[i] = Some(tick);
            self.speed_mps[i] = 0.0;
            self.accel_mps2[i] = 0.0;
            self.reservation[i] = ReservationId::INVALID;
        }
        Ok(prev)
    }

    /// Per-segment count of live agents, indexed by `SegmentId`.
    pub fn occupancy(&self, segment_count: usize) -> Vec<u32> {
        let mut occ = vec![0u32; segment_count];
        for a in self.live_ids() {
            if let Some(slot) = occ.get_mut(self.segment[a.index()].index()) {
                *slot += 1;
            }
        }
        occ
    }
}
