//! Fluent builder for constructing a [`Sim`].

use tf_agent::AgentStoreBuilder;
use tf_control::TrafficControl;
use tf_conflict::Resolver;
use tf_network::{RoadNetwork, Router};
use tf_policy::{LinearReward, Policy, RewardModel};
use tf_schedule::{RandomSpawner, SpawnRequest};

use crate::{EngineConfig, LoadedScenario, Sim, SimError, SimResult};

/// Fluent builder for [`Sim<P, R>`].
///
/// # Required inputs
///
/// - [`EngineConfig`]: tick rate, seed, routing, conflict and decision tuning
/// - [`RoadNetwork`]: the static graph
/// - `P: Policy`: the decision maker shared by every agent
/// - `R: Router`: the routing algorithm (e.g. [`tf_network::DijkstraRouter`])
///
/// # Optional inputs (have defaults)
///
/// | Method                 | Default                                  |
/// |------------------------|------------------------------------------|
/// | `.control(c)`          | No signalised junctions                  |
/// | `.spawns(v)`           | No scheduled spawns                      |
/// | `.random_spawner(s)`   | None                                     |
/// | `.reward_model(m)`     | `LinearReward` over `config.reward`      |
/// | `.capacity(n)`         | 0 (agent arrays grow on spawn)           |
///
/// # Example
///
/// ```rust,ignore
/// let (network, fw) = four_way(100.0, 1, 13.9)?;
/// let mut sim = SimBuilder::new(EngineConfig::default(), network, CruisePolicy::default(), DijkstraRouter)
///     .spawns(vec![SpawnRequest::new(Tick(0), init)])
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder<P: Policy, R: Router> {
    config:   EngineConfig,
    network:  RoadNetwork,
    control:  TrafficControl,
    spawns:   Vec<SpawnRequest>,
    spawner:  Option<RandomSpawner>,
    reward:   Option<Box<dyn RewardModel>>,
    capacity: usize,
    policy:   P,
    router:   R,
}

impl<P: Policy, R: Router> SimBuilder<P, R> {
    /// Create a builder with all required inputs.
    pub fn new(config: EngineConfig, network: RoadNetwork, policy: P, router: R) -> Self {
        Self {
            config,
            network,
            control:  TrafficControl::new(),
            spawns:   Vec::new(),
            spawner:  None,
            reward:   None,
            capacity: 0,
            policy,
            router,
        }
    }

    /// Start from a loaded scenario: its config, network, signals and spawn
    /// sources.
    pub fn from_scenario(scenario: LoadedScenario, policy: P, router: R) -> Self {
        let mut b = Self::new(scenario.config, scenario.network, policy, router).control(scenario.control);
        b.spawns = scenario.spawns;
        b.spawner = scenario.spawner;
        b
    }

    /// Signal controllers.  Must have been built against the same network.
    pub fn control(mut self, control: TrafficControl) -> Self {
        self.control = control;
        self
    }

    /// Scheduled spawns; they are replayed on every [`Sim::reset`].
    pub fn spawns(mut self, spawns: Vec<SpawnRequest>) -> Self {
        self.spawns = spawns;
        self
    }

    pub fn random_spawner(mut self, spawner: RandomSpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Replace the default reward model.
    pub fn reward_model(mut self, model: impl RewardModel) -> Self {
        self.reward = Some(Box::new(model));
        self
    }

    /// Pre-allocate agent storage for `n` agents.
    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    /// Validate inputs and return a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim<P, R>> {
        self.config.validate()?;
        if self.network.is_empty() {
            return Err(SimError::Config("road network has no segments".into()));
        }

        for r in &self.spawns {
            r.validate()?;
            for seg in [r.init.start.segment, r.init.goal] {
                if let Err(e) = self.network.segment(seg) {
                    return Err(SimError::InvalidSpawn { segment: seg, reason: e.to_string() });
                }
            }
        }

        let resolver = Resolver::new(self.config.conflict.clone())?;
        let (agents, rngs) = AgentStoreBuilder::new(self.config.sim.seed).capacity(self.capacity).build();
        let reward = self
            .reward
            .unwrap_or_else(|| Box::new(LinearReward::new(self.config.reward.clone())));

        tracing::info!(
            segments = self.network.segment_count(),
            signals = self.control.len(),
            spawns = self.spawns.len(),
            ticks = self.config.sim.total_ticks,
            tick_ms = self.config.sim.tick_duration_ms,
            "simulation built"
        );

        Ok(Sim::assemble(
            self.config,
            self.network,
            self.control,
            agents,
            rngs,
            resolver,
            self.spawns,
            self.spawner,
            reward,
            self.policy,
            self.router,
        ))
    }
}
