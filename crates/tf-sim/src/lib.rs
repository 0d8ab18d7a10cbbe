//! `tf-sim`: fixed-step tick orchestrator for the rust_traffic engine.
//!
//! # Tick pipeline
//!
//! ```text
//! for tick in 0..config.sim.total_ticks:
//!   ① Spawn    : due requests enter if the entry gap is clear, else defer.
//!   ② Signals  : count approach queues, advance controllers.
//!   ③ Observe  : one Observation per Active agent (sequential, read-only).
//!   ④ Decide   : Policy::decide under the budget
//!                (parallel with the `parallel` feature).
//!   ⑤ Propose  : integrate each action into a candidate state.
//!   ⑥ Resolve  : Resolver::resolve: Accept / Yield / Stop per candidate.
//!   ⑦ Commit   : re-integrate denied agents, write kinematics in
//!                ascending AgentId order, complete, collide.
//!   ⑧ Replan   : stale routes, congestion switches, waiting retries.
//! ```
//!
//! Every phase that writes state runs sequentially in ascending `AgentId`
//! order, so a run is a pure function of its inputs and seed.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Runs the decision phase on Rayon's thread pool.          |
//! | `fx-hash`  | FxHash maps for per-tick agent lookups.                  |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use tf_network::DijkstraRouter;
//! use tf_policy::CruisePolicy;
//! use tf_sim::{NoopObserver, Scenario, SimBuilder};
//!
//! let loaded = Scenario::from_path("four_way.json".as_ref())?.load()?;
//! let mut sim = SimBuilder::from_scenario(loaded, CruisePolicy::default(), DijkstraRouter)
//!     .build()?;
//! sim.run(&mut NoopObserver)?;
//! ```

mod budget;
pub mod builder;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observe;
pub mod observer;
pub mod scenario;
pub mod sim;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use config::{CollisionPolicy, EngineConfig};
pub use error::{SimError, SimResult};
pub use metrics::{AgentMetrics, GlobalMetrics, Metrics, TickSummary};
pub use observe::{AgentIndex, ObserveInput};
pub use observer::{NoopObserver, SimObserver};
pub use scenario::{
    LoadedScenario, NetworkSpec, RandomSpec, Scenario, ScenarioError, ScenarioResult, SegmentSpec, SignalSpec,
    SpawnSpec,
};
pub use sim::Sim;
pub use snapshot::{AgentSnapshot, WorldSnapshot};
