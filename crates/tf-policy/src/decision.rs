//! Budgeted policy evaluation and fallback substitution.
//!
//! # Timeouts
//!
//! When `DecisionConfig::budget_ms` is set, each `decide` call is timed with
//! a wall clock and an answer that arrives late is discarded.  The engine
//! also stops waiting at the deadline, so a policy that never returns costs
//! the tick no more than its budget.  Wall-clock
//! budgets make runs depend on machine speed, so `budget_ms = None` (the
//! default) only honours timeouts the policy reports itself, which keeps
//! replays bit-identical.
//!
//! Timeouts are counted in a rolling window by [`TimeoutMonitor`]; a rate
//! above `max_timeout_rate` aborts the run.

use std::collections::VecDeque;
use std::time::Instant;

use tf_core::{AgentRng, Tick, TfError};

use crate::{Action, DecisionError, Observation, Policy};

/// Action substituted when a decision is discarded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FallbackAction {
    /// Full braking.
    #[default]
    Brake,
    /// Zero acceleration, keep lane.
    MaintainSpeed,
    /// Repeat the previous tick's accepted action (lane changes dropped).
    /// Brakes if there is none.
    LastAction,
}

impl FallbackAction {
    pub fn action(self, obs: &Observation, last: Option<Action>) -> Action {
        let brake = Action::accel(-obs.ego.vehicle.max_brake_mps2);
        match self {
            FallbackAction::Brake => brake,
            FallbackAction::MaintainSpeed => Action::KEEP,
            FallbackAction::LastAction => last.map_or(brake, |a| Action { lane_delta: 0, ..a }),
        }
    }
}

/// Decision-phase tuning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecisionConfig {
    /// Per-call wall-clock budget.  `None` disables measurement.
    pub budget_ms:         Option<u64>,
    pub fallback:          FallbackAction,
    /// Abort when timeouts exceed this share of decisions in the window.
    pub max_timeout_rate:  f64,
    pub rate_window_ticks: u64,
    /// Minimum decisions in the window before the rate is enforced.
    pub min_decisions:     u64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            budget_ms:         None,
            fallback:          FallbackAction::Brake,
            max_timeout_rate:  0.05,
            rate_window_ticks: 100,
            min_decisions:     200,
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<(), TfError> {
        if !(0.0..=1.0).contains(&self.max_timeout_rate) {
            return Err(TfError::Config("max_timeout_rate must be in [0, 1]".into()));
        }
        if self.rate_window_ticks == 0 {
            return Err(TfError::Config("rate_window_ticks must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecisionOutcome {
    Ok,
    Timeout,
    Malformed,
}

/// The action the engine will integrate, and how it was obtained.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Decided {
    pub action:  Action,
    pub outcome: DecisionOutcome,
}

/// Ask `policy` for an action, enforcing the budget and validating the
/// answer.  Never fails: rejected answers become the fallback action.
pub fn evaluate<P: Policy>(
    policy: &P,
    obs:    &Observation,
    rng:    &mut AgentRng,
    config: &DecisionConfig,
    last:   Option<Action>,
) -> Decided {
    let started = config.budget_ms.map(|_| Instant::now());
    let answer = policy.decide(obs, rng);
    let late = match (started, config.budget_ms) {
        (Some(t0), Some(budget)) => t0.elapsed().as_millis() as u64 > budget,
        _ => false,
    };

    let outcome = match answer {
        _ if late => Err(DecisionError::Timeout),
        Ok(a) => a.validate().map(|_| a),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(action) => Decided { action, outcome: DecisionOutcome::Ok },
        Err(e) => {
            tracing::debug!(agent = %obs.agent, tick = obs.tick.0, error = %e, "decision discarded");
            let kind = match e {
                DecisionError::Timeout => DecisionOutcome::Timeout,
                DecisionError::Malformed(_) => DecisionOutcome::Malformed,
            };
            Decided { action: config.fallback.action(obs, last), outcome: kind }
        }
    }
}

// ── TimeoutMonitor ────────────────────────────────────────────────────────────

/// Rolling timeout rate over the last `rate_window_ticks` ticks.
#[derive(Clone, Debug, Default)]
pub struct TimeoutMonitor {
    window:         VecDeque<(Tick, u64, u64)>,
    in_window:      (u64, u64),
    total_timeouts: u64,
}

impl TimeoutMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tick's totals and drop ticks that fell out of the window.
    pub fn record(&mut self, tick: Tick, decisions: u64, timeouts: u64, window_ticks: u64) {
        self.window.push_back((tick, decisions, timeouts));
        self.in_window.0 += decisions;
        self.in_window.1 += timeouts;
        self.total_timeouts += timeouts;
        while let Some(&(t, d, to)) = self.window.front() {
            if tick.since(t) < window_ticks {
                break;
            }
            self.window.pop_front();
            self.in_window.0 -= d;
            self.in_window.1 -= to;
        }
    }

    /// Timeout share of decisions currently in the window.
    pub fn rate(&self) -> f64 {
        if self.in_window.0 == 0 {
            0.0
        } else {
            self.in_window.1 as f64 / self.in_window.0 as f64
        }
    }

    /// `Some(rate)` if the configured limit is exceeded.
    pub fn exceeded(&self, config: &DecisionConfig) -> Option<f64> {
        let rate = self.rate();
        (self.in_window.0 >= config.min_decisions && rate > config.max_timeout_rate).then_some(rate)
    }

    pub fn total_timeouts(&self) -> u64 {
        self.total_timeouts
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
