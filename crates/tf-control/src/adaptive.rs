//! Queue-actuated signal controller.
//!
//! Each tick the controller sees how many vehicles queue on every approach.
//! The current green is held for at least `min_green_ticks` and at most
//! `max_green_ticks`; in between it ends early once its own approaches are
//! empty while another phase has demand.  Any red approach that has queued
//! for `max_wait_ticks` forces a change so no approach starves.
//!
//! The next phase is the one serving the starving approach if there is one,
//! otherwise the one with the largest total queue.  Waits of approaches that
//! receive green are reset.

use std::collections::BTreeMap;

use tf_core::{SegmentId, Tick};

use crate::control::QueueCounts;
use crate::phase::{PhaseSpec, SignalPhase};
use crate::{ControlError, ControlResult};

/// Timing bounds for [`AdaptivePhase`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdaptiveConfig {
    pub min_green_ticks: u64,
    pub max_green_ticks: u64,
    pub clearance_ticks: u64,
    /// A red approach with a queue for this long forces the next change.
    pub max_wait_ticks:  u64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_green_ticks: 50,
            max_green_ticks: 300,
            clearance_ticks: 30,
            max_wait_ticks:  600,
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self) -> ControlResult<()> {
        if self.min_green_ticks == 0 || self.min_green_ticks > self.max_green_ticks {
            return Err(ControlError::InvalidTiming(format!(
                "need 0 < min_green ({}) <= max_green ({})",
                self.min_green_ticks, self.max_green_ticks
            )));
        }
        if self.max_wait_ticks == 0 {
            return Err(ControlError::InvalidTiming("max_wait_ticks must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct State {
    current:     usize,
    green_since: Tick,
    /// `(until, next)` while in all-red clearance.
    clearance:   Option<(Tick, usize)>,
    /// Consecutive queued ticks per red approach.
    wait:        BTreeMap<SegmentId, u64>,
    last_tick:   Option<Tick>,
}

impl State {
    fn initial() -> Self {
        Self { current: 0, green_since: Tick::ZERO, clearance: None, wait: BTreeMap::new(), last_tick: None }
    }
}

/// Adaptive controller; see the module docs.
#[derive(Clone, Debug)]
pub struct AdaptivePhase {
    phases: Vec<PhaseSpec>,
    config: AdaptiveConfig,
    state:  State,
}

impl AdaptivePhase {
    pub fn new(mut phases: Vec<PhaseSpec>, config: AdaptiveConfig) -> ControlResult<Self> {
        if phases.is_empty() {
            return Err(ControlError::NoPhases);
        }
        config.validate()?;
        phases.iter_mut().for_each(PhaseSpec::normalise);
        Ok(Self { phases, config, state: State::initial() })
    }

    pub fn phases(&self) -> &[PhaseSpec] {
        &self.phases
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Index of the phase currently green, `None` during clearance.
    pub fn current_phase(&self) -> Option<usize> {
        match self.state.clearance {
            Some(_) => None,
            None => Some(self.state.current),
        }
    }

    /// Ticks `approach` has been queued at red.
    pub fn wait_of(&self, approach: SegmentId) -> u64 {
        self.state.wait.get(&approach).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.state = State::initial();
    }

    pub fn allowed(&self) -> &[SegmentId] {
        match self.state.clearance {
            Some(_) => &[],
            None => &self.phases[self.state.current].green,
        }
    }

    pub fn phase_view(&self) -> SignalPhase {
        match self.state.clearance {
            Some(_) => SignalPhase { label: None, green: Vec::new(), clearance: true },
            None => {
                let p = &self.phases[self.state.current];
                SignalPhase { label: Some(p.label.clone()), green: p.green.clone(), clearance: false }
            }
        }
    }

    fn queue(queues: &QueueCounts, s: SegmentId) -> u32 {
        queues.get(&s).copied().unwrap_or(0)
    }

    fn demand(&self, phase: usize, queues: &QueueCounts) -> u64 {
        self.phases[phase].green.iter().map(|&s| Self::queue(queues, s) as u64).sum()
    }

    /// Feed this tick's queue counts and step the state machine.
    pub fn advance(&mut self, tick: Tick, queues: &QueueCounts) {
        let dt = self.state.last_tick.map_or(1, |last| tick.since(last));
        if self.state.last_tick.is_some_and(|last| tick <= last) {
            return;
        }
        self.state.last_tick = Some(tick);

        // ── Wait accounting ───────────────────────────────────────────────
        let green: &[SegmentId] = match self.state.clearance {
            Some(_) => &[],
            None => &self.phases[self.state.current].green,
        };
        let approaches: Vec<SegmentId> = {
            let mut all: Vec<SegmentId> = self.phases.iter().flat_map(|p| p.green.iter().copied()).collect();
            all.sort_unstable();
            all.dedup();
            all
        };
        for s in approaches {
            let waiting = Self::queue(queues, s) > 0 && green.binary_search(&s).is_err();
            if waiting {
                *self.state.wait.entry(s).or_insert(0) += dt;
            } else {
                self.state.wait.remove(&s);
            }
        }

        // ── Clearance ─────────────────────────────────────────────────────
        if let Some((until, next)) = self.state.clearance {
            if tick >= until {
                self.start_green(next, tick);
            }
            return;
        }

        let elapsed = tick.since(self.state.green_since);
        if elapsed < self.config.min_green_ticks || self.phases.len() < 2 {
            return;
        }

        let current = self.state.current;
        let other_demand = (0..self.phases.len()).any(|p| p != current && self.demand(p, queues) > 0);
        if !other_demand {
            return;
        }

        let starving = self
            .state
            .wait
            .iter()
            .filter(|&(_, &w)| w >= self.config.max_wait_ticks)
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&s, _)| s);

        let switch = elapsed >= self.config.max_green_ticks
            || starving.is_some()
            || self.demand(current, queues) == 0;
        if !switch {
            return;
        }

        let n = self.phases.len();
        let cyclic = (1..n).map(|k| (current + k) % n);
        let next = match starving {
            Some(s) => cyclic
                .clone()
                .find(|&p| self.phases[p].green.binary_search(&s).is_ok())
                .unwrap_or((current + 1) % n),
            None => {
                // Highest demand; earliest in cyclic order wins ties.
                let mut best = (current + 1) % n;
                let mut best_demand = 0;
                for p in cyclic {
                    let d = self.demand(p, queues);
                    if d > best_demand {
                        best = p;
                        best_demand = d;
                    }
                }
                best
            }
        };

        if self.config.clearance_ticks > 0 && self.phases[current].loses_green_to(&self.phases[next]) {
            self.state.clearance = Some((tick + self.config.clearance_ticks, next));
            tracing::debug!(%tick, from = current, to = next, "signal clearance");
        } else {
            self.start_green(next, tick);
        }
    }

    fn start_green(&mut self, next: usize, tick: Tick) {
        self.state.clearance = None;
        self.state.current = next;
        self.state.green_since = tick;
        for s in &self.phases[next].green {
            self.state.wait.remove(s);
        }
        tracing::info!(%tick, phase = %self.phases[next].label, "signal phase change");
    }
}
