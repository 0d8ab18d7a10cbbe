//! The `Policy` trait: the engine's decision extension point.

use tf_core::AgentRng;

use crate::{Action, DecisionError, Observation};

/// Pluggable driving policy.
///
/// # Thread safety
///
/// With the `parallel` feature of `tf-sim`, `decide` runs for many agents at
/// once on Rayon's pool, so implementations must be `Send + Sync`.  Anything
/// that varies per agent arrives through the observation or the RNG.
///
/// # Errors
///
/// Returning `Err` is never fatal.  [`DecisionError::Timeout`] lets remote
/// or learned policies report that they gave up; the engine counts it like a
/// measured overrun and substitutes the fallback action.
///
/// # Example
///
/// ```rust
/// use tf_core::AgentRng;
/// use tf_policy::{Action, DecisionError, Observation, Policy};
///
/// /// Creeps forward at a fixed gentle acceleration.
/// struct Creep;
///
/// impl Policy for Creep {
///     fn decide(&self, _obs: &Observation, _rng: &mut AgentRng) -> Result<Action, DecisionError> {
///         Ok(Action::accel(0.5))
///     }
/// }
/// ```
pub trait Policy: Send + Sync + 'static {
    fn decide(&self, obs: &Observation, rng: &mut AgentRng) -> Result<Action, DecisionError>;
}
