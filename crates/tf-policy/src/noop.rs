//! A policy that never changes anything.

use tf_core::AgentRng;

use crate::{Action, DecisionError, Observation, Policy};

/// Always returns [`Action::KEEP`]: hold speed, stay in lane.
///
/// Useful in tests where only the resolver and signals should shape motion.
pub struct NoopPolicy;

impl Policy for NoopPolicy {
    fn decide(&self, _obs: &Observation, _rng: &mut AgentRng) -> Result<Action, DecisionError> {
        Ok(Action::KEEP)
    }
}
