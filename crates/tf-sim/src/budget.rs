//! Wall-clock bounded decision phase.
//!
//! With `DecisionConfig::budget_ms` set, every `decide` call runs off the
//! simulation thread (on Rayon's pool with the `parallel` feature, otherwise
//! on a short-lived named thread) and reports back over a channel.  The tick
//! waits until the shared deadline and no longer: agents whose answer is
//! missing get the fallback action.  A late answer is dropped together with
//! its RNG, so the agent's RNG does not advance for that tick.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tf_core::{AgentId, AgentRng};
use tf_policy::{evaluate, Action, Decided, DecisionConfig, DecisionOutcome, Observation, Policy};

/// One agent's decision inputs, owned so the call may outlive the tick.
pub(crate) struct Job {
    pub agent: AgentId,
    pub obs:   Observation,
    pub rng:   AgentRng,
    pub last:  Option<Action>,
}

pub(crate) struct Answer {
    pub decided: Decided,
    /// The advanced RNG; `None` when the deadline passed first.
    pub rng:     Option<AgentRng>,
}

/// Evaluate `jobs` and return one answer per job, in job order, no later
/// than `budget` after the call.
pub(crate) fn decide_within<P: Policy>(
    policy: &Arc<P>,
    jobs:   Vec<Job>,
    config: &DecisionConfig,
    budget: Duration,
) -> Vec<Answer> {
    let deadline = Instant::now() + budget;
    let fallbacks: Vec<(AgentId, Action)> =
        jobs.iter().map(|j| (j.agent, config.fallback.action(&j.obs, j.last))).collect();

    let (tx, rx) = mpsc::channel::<(usize, Decided, AgentRng)>();
    for (slot, job) in jobs.into_iter().enumerate() {
        let tx = tx.clone();
        let policy = Arc::clone(policy);
        let config = config.clone();
        let agent = job.agent;
        let task = move || {
            let Job { obs, mut rng, last, .. } = job;
            let decided = evaluate(&*policy, &obs, &mut rng, &config, last);
            // The receiver is gone once the deadline has passed.
            let _ = tx.send((slot, decided, rng));
        };
        spawn(agent, task);
    }
    drop(tx);

    let mut arrived: Vec<Option<(Decided, AgentRng)>> = fallbacks.iter().map(|_| None).collect();
    let mut pending = arrived.len();
    while pending > 0 {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok((slot, decided, rng)) => {
                arrived[slot] = Some((decided, rng));
                pending -= 1;
            }
            Err(_) => break,
        }
    }

    arrived
        .into_iter()
        .zip(fallbacks)
        .map(|(got, (agent, fallback))| match got {
            Some((decided, rng)) => Answer { decided, rng: Some(rng) },
            None => {
                tracing::debug!(agent = %agent, budget_ms = budget.as_millis() as u64, "decision missed the deadline");
                Answer { decided: Decided { action: fallback, outcome: DecisionOutcome::Timeout }, rng: None }
            }
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn spawn<F: FnOnce() + Send + 'static>(_agent: AgentId, task: F) {
    rayon::spawn(task);
}

#[cfg(not(feature = "parallel"))]
fn spawn<F: FnOnce() + Send + 'static>(agent: AgentId, task: F) {
    // A thread that cannot start simply never answers, which the caller
    // treats as a timeout.
    if let Err(e) = std::thread::Builder::new().name("tf-decide".into()).spawn(task) {
        tracing::warn!(agent = %agent, error = %e, "could not start decision thread");
    }
}
