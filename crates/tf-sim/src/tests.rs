//! Integration tests for tf-sim.

use tf_agent::{AgentInit, Kinematics, VehicleSpec};
use tf_core::{AgentRng, JunctionId, Point, SegmentId, Tick};
use tf_network::{four_way, DijkstraRouter, FourWay, RoadNetwork, RoadNetworkBuilder};
use tf_policy::{Action, DecisionError, NoopPolicy, Observation, Policy};
use tf_schedule::SpawnRequest;

use crate::{EngineConfig, Sim, SimBuilder};

// ── Helpers ───────────────────────────────────────────────────────────────────

const N: usize = 0;
const E: usize = 1;
const S: usize = 2;
const W: usize = 3;

fn test_config(total_ticks: u64) -> EngineConfig {
    let mut c = EngineConfig::default();
    c.sim.total_ticks = total_ticks;
    c.sim.seed = 42;
    c.sim.output_interval_ticks = 10;
    c
}

fn init(start: SegmentId, offset_m: f32, speed_mps: f32, goal: SegmentId) -> AgentInit {
    AgentInit {
        start: Kinematics { segment: start, offset_m, lane: 0, speed_mps },
        goal,
        vehicle: VehicleSpec::default(),
    }
}

fn at(tick: u64, init: AgentInit) -> SpawnRequest {
    SpawnRequest::new(Tick(tick), init)
}

fn cross() -> (RoadNetwork, FourWay) {
    four_way(100.0, 1, 10.0).unwrap()
}

/// P → A, then A → B → D or A → C → D, then D → Q.
///
/// Segments: 0 P→A, 1 A→B, 2 B→D, 3 A→C, 4 C→D, 5 D→Q.  The route through
/// B is shorter.
fn diamond() -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();
    let p = b.add_junction(Point::new(-100.0, 0.0));
    let a = b.add_junction(Point::new(0.0, 0.0));
    let bj = b.add_junction(Point::new(100.0, 0.0));
    let c = b.add_junction(Point::new(100.0, 80.0));
    let d = b.add_junction(Point::new(200.0, 0.0));
    let q = b.add_junction(Point::new(300.0, 0.0));
    b.add_segment(p, a, 1, 10.0);
    b.add_segment(a, bj, 1, 10.0);
    b.add_segment(bj, d, 1, 10.0);
    b.add_segment(a, c, 1, 10.0);
    b.add_segment(c, d, 1, 10.0);
    b.add_segment(d, q, 1, 10.0);
    b.build().unwrap()
}

fn seg(i: u32) -> SegmentId {
    SegmentId(i)
}

/// Constant acceleration, for driving into held stop lines.
struct Accelerate(f32);

impl Policy for Accelerate {
    fn decide(&self, _obs: &Observation, _rng: &mut AgentRng) -> Result<Action, DecisionError> {
        Ok(Action::accel(self.0))
    }
}

fn noop_sim(network: RoadNetwork, spawns: Vec<SpawnRequest>, ticks: u64) -> Sim<NoopPolicy, DijkstraRouter> {
    SimBuilder::new(test_config(ticks), network, NoopPolicy, DijkstraRouter)
        .spawns(spawns)
        .build()
        .unwrap()
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;
    use crate::SimError;

    #[test]
    fn builds_with_defaults() {
        let (net, _) = cross();
        let sim = noop_sim(net, vec![], 10);
        assert!(sim.agents.is_empty());
        assert_eq!(sim.current_tick(), Tick(0));
        assert!(!sim.is_paused());
    }

    #[test]
    fn zero_threads_rejected() {
        let (net, _) = cross();
        let mut config = test_config(10);
        config.sim.num_threads = Some(0);
        let err = SimBuilder::new(config, net, NoopPolicy, DijkstraRouter).build().err().unwrap();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn bad_tick_duration_rejected() {
        let (net, _) = cross();
        let mut config = test_config(10);
        config.sim.tick_duration_ms = 0;
        assert!(SimBuilder::new(config, net, NoopPolicy, DijkstraRouter).build().is_err());
    }

    #[test]
    fn unknown_spawn_segment_rejected() {
        let (net, fw) = cross();
        let err = SimBuilder::new(test_config(10), net, NoopPolicy, DijkstraRouter)
            .spawns(vec![at(0, init(seg(99), 0.0, 0.0, fw.outbound[S]))])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::InvalidSpawn { .. }));
    }

    #[test]
    fn empty_network_rejected() {
        let err = SimBuilder::new(test_config(10), RoadNetwork::empty(), NoopPolicy, DijkstraRouter)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::Config(_)));
    }
}

// ── Running ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use tf_core::AgentStatus;

    use super::*;
    use crate::{NoopObserver, SimObserver, TickSummary};

    #[test]
    fn lone_agent_completes_its_route() {
        let (net, fw) = cross();
        let mut sim = noop_sim(net, vec![at(0, init(fw.inbound[N], 0.0, 10.0, fw.outbound[S]))], 400);
        sim.run(&mut NoopObserver).unwrap();

        let a = tf_core::AgentId(0);
        assert_eq!(sim.agents.status[0], AgentStatus::Completed);
        let m = sim.agent_metrics(a).unwrap();
        assert!(m.is_completed());
        assert!(m.distance_m > 150.0);
        assert_eq!(sim.metrics.global.completed, 1);
        assert!(sim.resolver.book().is_empty());
        assert_eq!(sim.current_tick(), Tick(400));
    }

    #[test]
    fn blocked_entry_defers_spawn() {
        let (net, fw) = cross();
        let req = init(fw.inbound[N], 0.0, 10.0, fw.outbound[S]);
        let mut sim = noop_sim(net, vec![at(0, req), at(0, req)], 100);

        let first = sim.step(&mut NoopObserver).unwrap();
        assert_eq!(first.spawned, 1);
        assert_eq!(first.deferred, 1);
        assert_eq!(sim.spawns.len(), 1);

        sim.run_ticks(19, &mut NoopObserver).unwrap();
        assert_eq!(sim.agents.count, 2);
        assert_eq!(sim.metrics.global.spawned, 2);
        // The follower entered only once the leader's rear cleared the gap.
        let gap = sim.agents.offset_m[0] - VehicleSpec::default().length_m - sim.agents.offset_m[1];
        assert!(gap >= sim.config.conflict.min_gap_m - 1e-3);
    }

    #[test]
    fn stationary_agent_accumulates_wait() {
        let (net, fw) = cross();
        let mut sim = noop_sim(net, vec![at(0, init(fw.inbound[W], 10.0, 0.0, fw.outbound[E]))], 10);
        sim.run(&mut NoopObserver).unwrap();
        let m = sim.agent_metrics(tf_core::AgentId(0)).unwrap();
        assert_eq!(m.wait_ticks, 10);
        assert_eq!(m.wait_episodes, 1);
        assert_eq!(m.average_wait_ticks(), 10.0);
    }

    #[test]
    fn rewards_follow_progress() {
        let (net, fw) = cross();
        let mut sim = noop_sim(net, vec![at(0, init(fw.inbound[E], 0.0, 10.0, fw.outbound[W]))], 10);
        sim.step(&mut NoopObserver).unwrap();
        let rewards = sim.last_rewards();
        assert_eq!(rewards.len(), 1);
        // 1 m at the default progress weight of 0.1.
        assert!((rewards[0].1 - 0.1).abs() < 1e-4);
    }

    /// Asks for a pause once, after its tenth tick.
    #[derive(Default)]
    struct PauseOnce {
        ticks:  usize,
        paused: bool,
        ends:   usize,
    }

    impl SimObserver for PauseOnce {
        fn on_tick_end(&mut self, _summary: &TickSummary) {
            self.ticks += 1;
        }

        fn wants_pause(&mut self) -> bool {
            if !self.paused && self.ticks == 10 {
                self.paused = true;
                return true;
            }
            false
        }

        fn on_sim_end(&mut self, _final_tick: Tick) {
            self.ends += 1;
        }
    }

    #[test]
    fn observer_pauses_and_run_resumes() {
        let (net, _) = cross();
        let mut sim = noop_sim(net, vec![], 20);
        let mut obs = PauseOnce::default();

        sim.run(&mut obs).unwrap();
        assert!(sim.is_paused());
        assert_eq!(sim.current_tick(), Tick(10));
        assert_eq!(obs.ends, 0);

        // Paused: run is a no-op.
        sim.run(&mut obs).unwrap();
        assert_eq!(sim.current_tick(), Tick(10));

        sim.resume();
        sim.run(&mut obs).unwrap();
        assert_eq!(sim.current_tick(), Tick(20));
        assert_eq!(obs.ticks, 20);
        assert_eq!(obs.ends, 1);
    }

    #[test]
    fn snapshots_follow_output_interval() {
        struct Count(usize);
        impl SimObserver for Count {
            fn on_snapshot(&mut self, _tick: Tick, _agents: &tf_agent::AgentStore) {
                self.0 += 1;
            }
        }
        let (net, _) = cross();
        let mut sim = noop_sim(net, vec![], 25);
        let mut obs = Count(0);
        sim.run(&mut obs).unwrap();
        // Ticks 0, 10 and 20.
        assert_eq!(obs.0, 3);
    }
}

// ── Signals ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod signal_tests {
    use tf_control::{Controller, ControllerSpec, PhaseSpec, TrafficControl};
    use tf_conflict::Decision;

    use super::*;

    fn ns_ew(net: &RoadNetwork, fw: &FourWay) -> TrafficControl {
        let spec = ControllerSpec::Fixed {
            phases:          vec![
                PhaseSpec::new("NS", vec![fw.inbound[N], fw.inbound[S]], 30),
                PhaseSpec::new("EW", vec![fw.inbound[E], fw.inbound[W]], 30),
            ],
            clearance_ticks: 5,
            offset_ticks:    0,
        };
        let mut control = TrafficControl::new();
        control.insert(net, fw.center, Controller::from_spec(spec).unwrap()).unwrap();
        control
    }

    #[test]
    fn red_approach_waits_for_its_green() {
        let (net, fw) = cross();
        let control = ns_ew(&net, &fw);
        let mut sim = SimBuilder::new(test_config(200), net, Accelerate(1.0), DijkstraRouter)
            .control(control)
            .spawns(vec![at(0, init(fw.inbound[E], 99.7, 0.0, fw.outbound[W]))])
            .build()
            .unwrap();
        let a = tf_core::AgentId(0);

        for t in 0..35 {
            sim.step(&mut crate::NoopObserver).unwrap();
            let v = sim.last_verdict(a).unwrap();
            assert_ne!(v.decision, Decision::Accept, "accepted on red at tick {t}");
            assert_eq!(sim.agents.segment[0], fw.inbound[E]);
        }
        // Deadlock counters ignore signal holds.
        assert_eq!(sim.resolver.deadlock().count(a), 0);

        sim.step(&mut crate::NoopObserver).unwrap();
        assert_eq!(sim.last_verdict(a).unwrap().decision, Decision::Accept);

        sim.run_ticks(100, &mut crate::NoopObserver).unwrap();
        assert_ne!(sim.agents.segment[0], fw.inbound[E]);
        assert_eq!(sim.agent_metrics(a).unwrap().violations, 0);
    }

    #[test]
    fn snapshot_lists_signal_phase() {
        let (net, fw) = cross();
        let control = ns_ew(&net, &fw);
        let sim = SimBuilder::new(test_config(10), net, NoopPolicy, DijkstraRouter)
            .control(control)
            .build()
            .unwrap();
        let snap = sim.snapshot().unwrap();
        assert_eq!(snap.signals.len(), 1);
        assert_eq!(snap.signals[0].0, JunctionId(0));
        assert!(snap.signals[0].1.green.contains(&fw.inbound[N]));
    }
}

// ── Closures and replanning ───────────────────────────────────────────────────

#[cfg(test)]
mod replan_tests {
    use tf_core::{AgentId, AgentStatus};

    use super::*;
    use crate::NoopObserver;

    fn parked_trio() -> Sim<NoopPolicy, DijkstraRouter> {
        let spawns = [10.0, 30.0, 50.0].map(|off| at(0, init(seg(0), off, 0.0, seg(5))));
        noop_sim(diamond(), spawns.to_vec(), 100)
    }

    #[test]
    fn routes_start_on_the_short_branch() {
        let mut sim = parked_trio();
        sim.step(&mut NoopObserver).unwrap();
        for i in 0..3 {
            assert_eq!(sim.route(AgentId(i)), &[seg(0), seg(1), seg(2), seg(5)]);
        }
    }

    #[test]
    fn closure_reroutes_every_affected_agent() {
        let mut sim = parked_trio();
        sim.step(&mut NoopObserver).unwrap();
        assert!(sim.close_segment(seg(1)).unwrap());

        let summary = sim.step(&mut NoopObserver).unwrap();
        assert_eq!(summary.replans, 3);
        for i in 0..3 {
            let a = AgentId(i);
            assert_eq!(sim.route(a), &[seg(0), seg(3), seg(4), seg(5)]);
            assert!(!sim.route(a).contains(&seg(1)));
            assert_eq!(sim.agent_metrics(a).unwrap().replans, 1);
        }
        assert_eq!(sim.snapshot().unwrap().closed, vec![seg(1)]);
    }

    #[test]
    fn no_route_waits_until_reopened() {
        let mut sim = parked_trio();
        sim.step(&mut NoopObserver).unwrap();
        sim.close_segment(seg(1)).unwrap();
        sim.close_segment(seg(3)).unwrap();

        let summary = sim.step(&mut NoopObserver).unwrap();
        assert_eq!(summary.waiting, 3);
        assert!(sim.agents.status.iter().all(|&s| s == AgentStatus::Waiting));

        // Nothing changes while the network stays closed.
        sim.step(&mut NoopObserver).unwrap();
        assert_eq!(sim.agents.active_ids().count(), 0);

        sim.reopen_segment(seg(3)).unwrap();
        sim.step(&mut NoopObserver).unwrap();
        for i in 0..3 {
            let a = AgentId(i);
            assert_eq!(sim.agents.status[a.index()], AgentStatus::Active);
            assert_eq!(sim.route(a), &[seg(0), seg(3), seg(4), seg(5)]);
        }
    }

    #[test]
    fn spawn_without_route_waits() {
        let mut net = diamond();
        net.close_segment(seg(5)).unwrap();
        let mut sim = noop_sim(net, vec![at(0, init(seg(0), 0.0, 0.0, seg(5)))], 10);
        let summary = sim.step(&mut NoopObserver).unwrap();
        assert_eq!(summary.spawned, 1);
        assert_eq!(sim.agents.status[0], AgentStatus::Waiting);
    }
}

// ── External requests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod request_tests {
    use tf_core::{AgentId, AgentStatus};

    use super::*;
    use crate::{NoopObserver, SimError};

    #[test]
    fn inject_checks_entry_and_bounds() {
        let (net, fw) = cross();
        let mut sim = noop_sim(net, vec![], 10);
        let a = sim.inject(init(fw.inbound[N], 20.0, 0.0, fw.outbound[S])).unwrap();
        assert_eq!(a, AgentId(0));

        let blocked = sim.inject(init(fw.inbound[N], 22.0, 0.0, fw.outbound[S])).err().unwrap();
        assert!(matches!(blocked, SimError::SpawnBlocked(_)));

        let mut bad = init(fw.inbound[N], 50.0, 0.0, fw.outbound[S]);
        bad.start.lane = 3;
        assert!(matches!(sim.inject(bad).err().unwrap(), SimError::InvalidSpawn { .. }));

        let past_end = init(fw.inbound[N], 150.0, 0.0, fw.outbound[S]);
        assert!(matches!(sim.inject(past_end).err().unwrap(), SimError::InvalidSpawn { .. }));
    }

    #[test]
    fn remove_voids_reservation_at_once() {
        let (net, fw) = cross();
        let mut sim = noop_sim(net, vec![at(0, init(fw.inbound[N], 80.0, 10.0, fw.outbound[S]))], 100);
        sim.step(&mut NoopObserver).unwrap();
        let a = AgentId(0);
        assert!(sim.snapshot().unwrap().agent(a).unwrap().reservation.is_some());
        assert_eq!(sim.resolver.book().len(), 1);

        sim.remove(a).unwrap();
        assert_eq!(sim.agents.status[0], AgentStatus::Removed);
        assert!(sim.resolver.book().is_empty());
        assert!(matches!(sim.remove(a).err().unwrap(), SimError::NotLive(_)));
    }
}

// ── Determinism and reset ─────────────────────────────────────────────────────

#[cfg(test)]
mod determinism_tests {
    use proptest::prelude::*;
    use tf_policy::CruisePolicy;
    use tf_schedule::{RandomSpawnConfig, RandomSpawner};

    use super::*;
    use crate::{NoopObserver, WorldSnapshot};

    fn busy(seed: u64, ticks: u64) -> Sim<CruisePolicy, DijkstraRouter> {
        let (net, fw) = cross();
        let routes = vec![
            (fw.inbound[N], fw.outbound[S]),
            (fw.inbound[E], fw.outbound[W]),
            (fw.inbound[S], fw.outbound[N]),
            (fw.inbound[W], fw.outbound[E]),
            (fw.inbound[N], fw.outbound[E]),
        ];
        let spawner = RandomSpawner::new(
            RandomSpawnConfig { period_ticks: 10, max_live: 12, initial: 4, ..RandomSpawnConfig::default() },
            routes,
            seed,
        )
        .unwrap();
        let mut config = test_config(ticks);
        config.sim.seed = seed;
        SimBuilder::new(config, net, CruisePolicy::default(), DijkstraRouter)
            .random_spawner(spawner)
            .build()
            .unwrap()
    }

    fn run_to_end(sim: &mut Sim<CruisePolicy, DijkstraRouter>) -> WorldSnapshot {
        sim.run(&mut NoopObserver).unwrap();
        sim.snapshot().unwrap()
    }

    #[test]
    fn same_seed_same_world() {
        let a = run_to_end(&mut busy(7, 300));
        let b = run_to_end(&mut busy(7, 300));
        assert!(a.agents.len() > 4);
        assert_eq!(a, b);
    }

    #[test]
    fn reset_replays_the_run() {
        let mut sim = busy(3, 200);
        let first = run_to_end(&mut sim);
        let first_metrics = sim.metrics.global.clone();

        sim.reset().unwrap();
        assert_eq!(sim.current_tick(), Tick(0));
        assert!(sim.agents.is_empty());
        assert!(sim.resolver.book().is_empty());

        let second = run_to_end(&mut sim);
        assert_eq!(first, second);
        assert_eq!(first_metrics.spawned, sim.metrics.global.spawned);
        assert_eq!(first_metrics.completed, sim.metrics.global.completed);
        assert_eq!(first_metrics.replans, sim.metrics.global.replans);
    }

    #[test]
    fn reset_reopens_segments() {
        let mut sim = busy(1, 50);
        sim.close_segment(seg(1)).unwrap();
        sim.reset().unwrap();
        assert!(sim.network.is_open(seg(1)));
        assert!(sim.snapshot().unwrap().closed.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        /// Whatever the seed, no run trips the reservation invariant and no
        /// agent leaves its segment bounds.
        #[test]
        fn random_traffic_stays_consistent(seed in 0u64..1_000) {
            let mut sim = busy(seed, 250);
            sim.run(&mut NoopObserver).unwrap();
            for a in sim.agents.live_ids() {
                let i = a.index();
                let len = sim.network.segment(sim.agents.segment[i]).unwrap().length_m;
                prop_assert!(sim.agents.offset_m[i] >= 0.0 && sim.agents.offset_m[i] <= len + 1e-3);
            }
            prop_assert!(sim.resolver.book().check_invariant(&sim.network).is_ok());
        }
    }
}

// ── Timeouts ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod timeout_tests {
    use std::time::Duration;

    use tf_policy::FallbackAction;

    use super::*;
    use crate::{NoopObserver, SimError};

    struct Slow;

    impl Policy for Slow {
        fn decide(&self, _obs: &Observation, _rng: &mut AgentRng) -> Result<Action, DecisionError> {
            std::thread::sleep(Duration::from_millis(3));
            Ok(Action::accel(1.0))
        }
    }

    /// Answers long after any sensible budget.
    struct Stall;

    impl Policy for Stall {
        fn decide(&self, _obs: &Observation, _rng: &mut AgentRng) -> Result<Action, DecisionError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Action::accel(1.0))
        }
    }

    struct Broken;

    impl Policy for Broken {
        fn decide(&self, _obs: &Observation, _rng: &mut AgentRng) -> Result<Action, DecisionError> {
            Ok(Action::accel(f32::NAN))
        }
    }

    #[test]
    fn sustained_timeouts_halt_the_run() {
        let (net, fw) = cross();
        let mut config = test_config(100);
        config.decision.budget_ms = Some(1);
        config.decision.min_decisions = 5;
        config.decision.max_timeout_rate = 0.5;
        let mut sim = SimBuilder::new(config, net, Slow, DijkstraRouter)
            .spawns(vec![at(0, init(fw.inbound[N], 0.0, 5.0, fw.outbound[S]))])
            .build()
            .unwrap();

        let err = sim.run(&mut NoopObserver).err().unwrap();
        assert!(matches!(err, SimError::TimeoutRate { .. }));
        assert!(err.is_fatal());
        assert_eq!(sim.agent_metrics(tf_core::AgentId(0)).unwrap().timeouts, 5);
    }

    #[test]
    fn budget_bounds_the_decision_phase() {
        let (net, fw) = cross();
        let mut config = test_config(10);
        config.decision.budget_ms = Some(10);
        config.decision.fallback = FallbackAction::MaintainSpeed;
        let mut sim = SimBuilder::new(config, net, Stall, DijkstraRouter)
            .spawns(vec![at(0, init(fw.inbound[N], 0.0, 5.0, fw.outbound[S]))])
            .build()
            .unwrap();

        let t0 = std::time::Instant::now();
        let summary = sim.step(&mut NoopObserver).unwrap();
        let elapsed = t0.elapsed();

        assert!(elapsed < Duration::from_millis(250), "step took {elapsed:?} on a 10 ms budget");
        assert_eq!(summary.timeouts, 1);
        assert_eq!(sim.agent_metrics(tf_core::AgentId(0)).unwrap().timeouts, 1);
        assert!((sim.agents.speed_mps[0] - 5.0).abs() < 1e-4);
    }

    #[test]
    fn fast_policy_meets_the_budget() {
        let (net, fw) = cross();
        let mut config = test_config(10);
        config.decision.budget_ms = Some(200);
        let mut sim = SimBuilder::new(config, net, Accelerate(1.0), DijkstraRouter)
            .spawns(vec![at(0, init(fw.inbound[N], 0.0, 5.0, fw.outbound[S]))])
            .build()
            .unwrap();

        let summary = sim.step(&mut NoopObserver).unwrap();
        assert_eq!(summary.timeouts, 0);
        assert!(sim.agents.speed_mps[0] > 5.0);
    }

    #[test]
    fn malformed_actions_fall_back() {
        let (net, fw) = cross();
        let mut config = test_config(10);
        config.decision.fallback = FallbackAction::MaintainSpeed;
        let mut sim = SimBuilder::new(config, net, Broken, DijkstraRouter)
            .spawns(vec![at(0, init(fw.inbound[N], 0.0, 5.0, fw.outbound[S]))])
            .build()
            .unwrap();
        let summary = sim.step(&mut NoopObserver).unwrap();
        assert_eq!(summary.malformed, 1);
        assert!((sim.agents.speed_mps[0] - 5.0).abs() < 1e-4);
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::fs;

    use tf_control::ControlError;
    use tf_core::AgentStatus;

    use super::*;
    use crate::{NoopObserver, Scenario, ScenarioError};

    const CROSSROADS: &str = r#"{
        "config":  { "sim": { "tick_duration_ms": 100, "total_ticks": 3000, "seed": 7 } },
        "network": { "kind": "four_way", "arm_m": 120.0, "lanes": 1, "speed_limit_mps": 13.9 },
        "signals": [
            { "junction": 0, "controller": { "kind": "fixed", "clearance_ticks": 30,
              "phases": [ { "label": "NS", "green": [0, 4], "duration_ticks": 250 },
                          { "label": "EW", "green": [2, 6], "duration_ticks": 250 } ] } }
        ],
        "spawns":    [ { "tick": 0, "start": 0, "goal": 5, "speed_mps": 10.0 },
                       { "tick": 5, "start": 2, "goal": 7 } ],
        "spawn_csv": "spawns.csv",
        "random":    { "routes": [[0, 5], [6, 3]], "period_ticks": 20, "max_live": 8 }
    }"#;

    const SPAWNS_CSV: &str = "tick,start_segment,goal_segment\n40,4,1\n0,6,3\n";

    #[test]
    fn crossroads_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crossroads.json");
        fs::write(&path, CROSSROADS).unwrap();
        fs::write(dir.path().join("spawns.csv"), SPAWNS_CSV).unwrap();

        let scenario = Scenario::from_path(&path).unwrap();
        assert_eq!(scenario.spawn_csv.as_deref(), Some(dir.path().join("spawns.csv").as_path()));

        let loaded = scenario.load().unwrap();
        assert_eq!(loaded.config.sim.seed, 7);
        assert_eq!(loaded.config.sim.total_ticks, 3000);
        assert_eq!(loaded.network.segment_count(), 8);
        assert_eq!(loaded.control.len(), 1);
        assert!(loaded.control.is_controlled(JunctionId(0)));
        assert!(loaded.spawner.is_some());

        // Two inline spawns plus two from the CSV file.
        assert_eq!(loaded.spawns.len(), 4);
        assert!(loaded.spawns.iter().any(|r| r.tick == Tick(40) && r.init.start.segment == seg(4)));
        assert!(loaded.spawns.iter().any(|r| r.init.start.segment == seg(0) && r.init.start.speed_mps == 10.0));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scenario::from_path(&dir.path().join("absent.json")).err().unwrap();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(Scenario::from_json_str("{ \"network\": "), Err(ScenarioError::Json(_))));
        // Well-formed, but the network is required.
        assert!(matches!(Scenario::from_json_str("{}"), Err(ScenarioError::Json(_))));
    }

    #[test]
    fn green_on_an_exit_segment_is_rejected() {
        let text = CROSSROADS.replace("\"green\": [0, 4]", "\"green\": [0, 1]").replace("\"spawn_csv\": \"spawns.csv\",", "");
        let err = Scenario::from_json_str(&text).unwrap().load().err().unwrap();
        assert!(matches!(
            err,
            ScenarioError::Control(ControlError::NotAnApproach { segment, .. }) if segment == seg(1)
        ));
    }

    #[test]
    fn missing_spawn_csv_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crossroads.json");
        fs::write(&path, CROSSROADS).unwrap();
        let err = Scenario::from_path(&path).unwrap().load().err().unwrap();
        assert!(matches!(err, ScenarioError::Schedule(_)));
    }

    #[test]
    fn explicit_network_runs_to_completion() {
        // 0 ⇄ 1 ⇄ 2 along the x axis: segments 0: 0→1, 1: 1→0, 2: 1→2, 3: 2→1.
        let text = r#"{
            "config":  { "sim": { "total_ticks": 400 } },
            "network": { "kind": "explicit",
                         "junctions": [[0.0, 0.0], [100.0, 0.0], [200.0, 0.0]],
                         "segments": [ { "from": 0, "to": 1, "speed_limit_mps": 10.0, "two_way": true },
                                       { "from": 1, "to": 2, "speed_limit_mps": 10.0, "two_way": true } ] },
            "spawns":  [ { "tick": 0, "start": 0, "goal": 2, "speed_mps": 10.0 } ]
        }"#;
        let loaded = Scenario::from_json_str(text).unwrap().load().unwrap();
        assert_eq!(loaded.network.segment_count(), 4);
        assert_eq!(loaded.network.segment(seg(1)).unwrap().from, JunctionId(1));
        assert!(loaded.control.is_empty());

        let mut sim = SimBuilder::from_scenario(loaded, NoopPolicy, DijkstraRouter).build().unwrap();
        sim.step(&mut NoopObserver).unwrap();
        assert_eq!(sim.route(tf_core::AgentId(0)), &[seg(0), seg(2)]);
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.agents.status[0], AgentStatus::Completed);
        assert_eq!(sim.metrics.global.completed, 1);
    }
}
