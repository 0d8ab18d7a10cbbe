//! `tf-policy`: the engine's boundary with decision-making collaborators.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | [`observation`] | `Observation` (bounded per-agent snapshot), `ObservationConfig` |
//! | [`action`]      | `Action` (target acceleration, lane delta)                    |
//! | [`policy`]      | `Policy` trait                                                |
//! | [`decision`]    | Budgeted evaluation, `FallbackAction`, `TimeoutMonitor`       |
//! | [`noop`]        | `NoopPolicy`: always keeps speed                              |
//! | [`cruise`]      | `CruisePolicy`: car-following reference driver                |
//! | [`reward`]      | `RewardModel` trait, `LinearReward`, `RewardConfig`           |
//! | [`error`]       | `DecisionError`                                               |
//!
//! # Design notes
//!
//! Policies are pure functions of an [`Observation`] and a per-agent RNG.
//! The simulation builds every observation from the previous tick's
//! committed state before calling any policy, so decisions can run in
//! parallel and in any order without changing the result.
//!
//! A policy that answers late or returns nonsense never stalls the engine:
//! [`decision::evaluate`] substitutes the configured [`FallbackAction`].

pub mod action;
pub mod cruise;
pub mod decision;
pub mod error;
pub mod noop;
pub mod observation;
pub mod policy;
pub mod reward;


pub use action::Action;
pub use cruise::{CruiseConfig, CruisePolicy};
pub use decision::{evaluate, Decided, DecisionConfig, DecisionOutcome, FallbackAction, TimeoutMonitor};
pub use error::DecisionError;
pub use noop::NoopPolicy;
pub use observation::{EgoState, LeaderInfo, Observation, ObservationConfig, VisibleAgent};
pub use policy::Policy;
pub use reward::{LinearReward, RewardConfig, RewardModel, RewardSignal};
