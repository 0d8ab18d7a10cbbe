//! The reservation arena.
//!
//! Agents hold a `ReservationId` (a slot index), the book indexes live
//! reservations by junction and by agent.  Nothing points back at agents, so
//! removing an agent is a single `release_agent` call.

use std::collections::{BTreeMap, VecDeque};

use tf_core::{AgentId, JunctionId, ReservationId, Tick};
use tf_network::{Movement, RoadNetwork};

/// A claimed slot in a junction: `agent` may drive `movement` during
/// ticks `[start, end)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub id:       ReservationId,
    pub junction: JunctionId,
    pub movement: Movement,
    pub agent:    AgentId,
    pub start:    Tick,
    /// Exclusive.
    pub end:      Tick,
}

impl Reservation {
    #[inline]
    pub fn is_live_at(&self, tick: Tick) -> bool {
        self.start <= tick && tick < self.end
    }

    /// `true` if the half-open intervals share at least one tick.
    #[inline]
    pub fn overlaps(&self, other: &Reservation) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Default)]
pub struct ReservationBook {
    slots:         Vec<Option<Reservation>>,
    free:          Vec<ReservationId>,
    by_junction:   BTreeMap<JunctionId, Vec<ReservationId>>,
    by_agent:      BTreeMap<AgentId, ReservationId>,
    /// Closed reservations with their effective end, oldest first.
    history:       VecDeque<Reservation>,
    history_limit: usize,
}

impl ReservationBook {
    pub fn new(history_limit: usize) -> Self {
        Self { history_limit, ..Self::default() }
    }

    /// Number of live reservations.
    pub fn len(&self) -> usize {
        self.by_agent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_agent.is_empty()
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn held_by(&self, agent: AgentId) -> Option<&Reservation> {
        self.by_agent.get(&agent).and_then(|&id| self.get(id))
    }

    /// Live reservations at `junction`, in id order of insertion.
    pub fn at_junction(&self, junction: JunctionId) -> impl Iterator<Item = &Reservation> + '_ {
        self.by_junction
            .get(&junction)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.get(id))
    }

    /// Every live reservation, ascending agent id.
    pub fn iter(&self) -> impl Iterator<Item = &Reservation> + '_ {
        self.by_agent.values().filter_map(|&id| self.get(id))
    }

    pub fn history(&self) -> &VecDeque<Reservation> {
        &self.history
    }

    /// Record a new reservation.  An agent holds at most one: a previous
    /// one ends where the new one starts.
    pub fn insert(
        &mut self,
        junction: JunctionId,
        movement: Movement,
        agent:    AgentId,
        start:    Tick,
        end:      Tick,
    ) -> ReservationId {
        if let Some(&old) = self.by_agent.get(&agent) {
            self.close(old, Some(start));
        }
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots.push(None);
                ReservationId((self.slots.len() - 1) as u32)
            }
        };
        self.slots[id.index()] = Some(Reservation { id, junction, movement, agent, start, end });
        self.by_junction.entry(junction).or_default().push(id);
        self.by_agent.insert(agent, id);
        id
    }

    /// Release `id` after the agent's last use of it at `last_tick`.
    pub fn release(&mut self, id: ReservationId, last_tick: Tick) -> Option<Reservation> {
        self.close(id, Some(last_tick.offset(1)))
    }

    pub fn release_agent(&mut self, agent: AgentId, last_tick: Tick) -> Option<Reservation> {
        let id = *self.by_agent.get(&agent)?;
        self.release(id, last_tick)
    }

    /// Drop reservations that are no longer live at `now`.
    pub fn expire(&mut self, now: Tick) -> Vec<Reservation> {
        let stale: Vec<ReservationId> = self.iter().filter(|r| r.end <= now).map(|r| r.id).collect();
        stale.into_iter().filter_map(|id| self.close(id, None)).collect()
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.history_limit);
    }

    /// Check that no two live reservations at one junction are for
    /// conflicting movements with overlapping intervals.
    pub fn check_invariant(&self, network: &RoadNetwork) -> Result<(), String> {
        for (&j, ids) in &self.by_junction {
            let Ok(junction) = network.junction(j) else {
                return Err(format!("reservation at unknown {j}"));
            };
            let live: Vec<&Reservation> = ids.iter().filter_map(|&id| self.get(id)).collect();
            for (i, a) in live.iter().enumerate() {
                for b in &live[i + 1..] {
                    if junction.conflicts(a.movement, b.movement) && a.overlaps(b) {
                        return Err(format!(
                            "{} ({}→{}) and {} ({}→{}) overlap at {j}",
                            a.agent, a.movement.from, a.movement.to, b.agent, b.movement.from, b.movement.to
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove `id`, recording it in the history with its end clipped to
    /// `end_at` when given.
    fn close(&mut self, id: ReservationId, end_at: Option<Tick>) -> Option<Reservation> {
        let mut r = self.slots.get_mut(id.index())?.take()?;
        if let Some(end_at) = end_at {
            r.end = r.end.min(end_at).max(r.start);
        }
        if let Some(list) = self.by_junction.get_mut(&r.junction) {
            list.retain(|&x| x != id);
            if list.is_empty() {
                self.by_junction.remove(&r.junction);
            }
        }
        self.by_agent.remove(&r.agent);
        self.free.push(id);
        if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(r);
        }
        Some(r)
    }
}
